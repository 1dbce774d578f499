use common::ToPrettyString;
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::watch;

/// Whether enough data has arrived to draw anything.
#[derive(
  Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize,
)]
#[serde(rename_all = "snake_case")]
pub enum FeedState {
  /// No complete reading has been produced yet.
  #[default]
  Waiting,

  /// At least one complete reading has been produced. Terminal for the
  /// lifetime of a mount.
  Ready,
}

impl fmt::Display for FeedState {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Waiting => write!(f, "waiting"),
      Self::Ready => write!(f, "ready"),
    }
  }
}

impl ToPrettyString for FeedState {
  fn to_pretty_string(&self) -> String {
    match self {
      Self::Waiting => "\x1b[33mwaiting\x1b[0m",
      Self::Ready => "\x1b[32mready\x1b[0m",
    }
    .to_owned()
  }
}

/// The writing half of the one-time `Waiting -> Ready` transition.
#[derive(Debug)]
pub struct Readiness {
  sender: watch::Sender<FeedState>,
}

/// The observing half of [`Readiness`]. Cheap to clone.
pub type ReadinessWatch = watch::Receiver<FeedState>;

impl Readiness {
  /// Creates a readiness flag in the `Waiting` state along with a watch on it.
  pub fn new() -> (Self, ReadinessWatch) {
    let (sender, receiver) = watch::channel(FeedState::Waiting);
    (Readiness { sender }, receiver)
  }

  /// Moves to `Ready`. Returns `true` only for the call that made the
  /// transition; observers are notified exactly once.
  pub fn mark_ready(&self) -> bool {
    self.sender.send_if_modified(|state| {
      if *state == FeedState::Ready {
        false
      } else {
        *state = FeedState::Ready;
        true
      }
    })
  }

  /// The current state.
  pub fn state(&self) -> FeedState {
    *self.sender.borrow()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn transitions_exactly_once() {
    let (readiness, mut watch) = Readiness::new();

    assert_eq!(readiness.state(), FeedState::Waiting);
    assert!(!watch.has_changed().unwrap());

    assert!(readiness.mark_ready());
    assert!(watch.has_changed().unwrap());
    assert_eq!(*watch.borrow_and_update(), FeedState::Ready);

    assert!(!readiness.mark_ready());
    assert!(!watch.has_changed().unwrap());
    assert_eq!(readiness.state(), FeedState::Ready);
  }

  #[test]
  fn clones_of_the_watch_see_ready() {
    let (readiness, watch) = Readiness::new();
    let late = watch.clone();
    readiness.mark_ready();

    assert_eq!(*late.borrow(), FeedState::Ready);
  }
}
