use std::{
  sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
  },
  time::Duration,
};
use tokio::{
  sync::mpsc,
  task::JoinHandle,
  time::{self, Instant},
};

/// The timing rules of a leading + trailing throttle, without any notion of a
/// clock or a task.
///
/// The first value offered in a quiet period passes straight through and opens
/// a window of `interval`. Values offered while the window is open are held,
/// newest replacing older, and the held value passes when the window expires,
/// which opens a new window. A window that expires with nothing held closes
/// and the gate is quiet again.
///
/// A value equal to the one that opened the current window is never held:
/// offering it again leaves nothing to release at the end of the window.
#[derive(Debug)]
pub struct Gate<T> {
  interval: Duration,
  window_end: Option<Instant>,
  released: Option<T>,
  pending: Option<T>,
}

impl<T: Clone + PartialEq> Gate<T> {
  /// Creates a quiet gate.
  pub fn new(interval: Duration) -> Self {
    Gate {
      interval,
      window_end: None,
      released: None,
      pending: None,
    }
  }

  /// Offers a value at `now`. Returns the value if it may run immediately.
  pub fn offer(&mut self, now: Instant, value: T) -> Option<T> {
    match self.window_end {
      Some(end) if now < end => {
        // the newest value wins, and if it is what already ran this window
        // there is nothing left to run
        if self.released.as_ref() == Some(&value) {
          self.pending = None;
        } else {
          self.pending = Some(value);
        }

        None
      }
      _ => {
        // an expired window that was never polled loses its held value to
        // the newer one
        self.pending = None;
        self.window_end = Some(now + self.interval);
        self.released = Some(value.clone());
        Some(value)
      }
    }
  }

  /// Polls the gate at `now`. Returns the held value if its window expired.
  pub fn expire(&mut self, now: Instant) -> Option<T> {
    match self.window_end {
      Some(end) if now >= end => {
        let pending = self.pending.take();
        self.window_end = pending.as_ref().map(|_| now + self.interval);
        self.released.clone_from(&pending);
        pending
      }
      _ => None,
    }
  }

  /// The instant at which the open window expires, if there is one.
  pub fn deadline(&self) -> Option<Instant> {
    self.window_end
  }
}

/// Runs a callback on a dedicated task at most once per interval, following
/// the rules of [`Gate`].
///
/// Values are handed to the task in order, so the callback never sees them
/// reordered, only coalesced. Cancelling is best-effort with respect to a
/// callback already in flight; once [`Throttle::cancel`] returns, no further
/// callback starts.
#[derive(Debug)]
pub struct Throttle<T> {
  sender: mpsc::UnboundedSender<T>,
  alive: Arc<AtomicBool>,
  task: JoinHandle<()>,
}

impl<T: Clone + PartialEq + Send + 'static> Throttle<T> {
  /// Spawns the throttling task onto the current tokio runtime.
  pub fn spawn<F>(interval: Duration, mut callback: F) -> Self
  where
    F: FnMut(T) + Send + 'static,
  {
    let (sender, mut receiver) = mpsc::unbounded_channel::<T>();
    let alive = Arc::new(AtomicBool::new(true));
    let task_alive = alive.clone();

    let task = tokio::spawn(async move {
      let mut gate = Gate::new(interval);

      loop {
        let received = match gate.deadline() {
          Some(deadline) => tokio::select! {
            received = receiver.recv() => match received {
              Some(value) => Some(value),
              None => break,
            },
            _ = time::sleep_until(deadline) => None,
          },
          None => match receiver.recv().await {
            Some(value) => Some(value),
            None => break,
          },
        };

        let now = Instant::now();
        let ready = match received {
          Some(value) => gate.offer(now, value),
          None => gate.expire(now),
        };

        if let Some(value) = ready {
          if !task_alive.load(Ordering::Acquire) {
            break;
          }

          callback(value);
        }
      }
    });

    Throttle {
      sender,
      alive,
      task,
    }
  }

  /// Hands a value to the throttle. Returns `false` if the throttle has been
  /// cancelled and the value was discarded.
  pub fn call(&self, value: T) -> bool {
    self.is_alive() && self.sender.send(value).is_ok()
  }
}

impl<T> Throttle<T> {
  /// Stops the throttle. A value held for the end of the current window is
  /// dropped.
  pub fn cancel(&self) {
    self.alive.store(false, Ordering::Release);
    self.task.abort();
  }

  /// Whether the throttle still accepts values.
  pub fn is_alive(&self) -> bool {
    self.alive.load(Ordering::Acquire)
  }
}

impl<T> Drop for Throttle<T> {
  fn drop(&mut self) {
    self.cancel();
  }
}
