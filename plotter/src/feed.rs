use crate::{
  fusion::CompletedReading,
  state::{FeedState, ReadinessWatch},
};
use common::comm::FeedPoint;
use jeflog::warn;
use std::{
  collections::VecDeque,
  sync::{Arc, Mutex, PoisonError},
};

/// Anything that can draw feed points, such as a live chart series.
pub trait ChartSurface: Send {
  /// Appends one point to the drawn series.
  fn add_point(&mut self, point: FeedPoint);
}

/// An in-memory series of feed points which keeps at most `retention` of the
/// most recent ones. A retention of zero keeps everything.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Series {
  points: VecDeque<FeedPoint>,
  retention: usize,
  appended: u64,
}

impl Series {
  /// Creates an empty series with the given retention.
  pub fn new(retention: usize) -> Self {
    Series {
      points: VecDeque::new(),
      retention,
      appended: 0,
    }
  }

  /// Appends a point, evicting the oldest one if the series is full.
  pub fn push(&mut self, point: FeedPoint) {
    if self.retention != 0 && self.points.len() == self.retention {
      self.points.pop_front();
    }

    self.points.push_back(point);
    self.appended += 1;
  }

  /// Number of retained points.
  pub fn len(&self) -> usize {
    self.points.len()
  }

  /// Whether no point is retained.
  pub fn is_empty(&self) -> bool {
    self.points.is_empty()
  }

  /// Number of points ever appended, retained or not.
  pub fn appended(&self) -> u64 {
    self.appended
  }

  /// Retained points, oldest first.
  pub fn points(&self) -> impl Iterator<Item = &FeedPoint> {
    self.points.iter()
  }

  /// The `count` most recent points, oldest first.
  pub fn last(&self, count: usize) -> Vec<FeedPoint> {
    let skip = self.points.len().saturating_sub(count);
    self.points.iter().skip(skip).copied().collect()
  }
}

impl ChartSurface for Series {
  fn add_point(&mut self, point: FeedPoint) {
    self.push(point);
  }
}

impl ChartSurface for Arc<Mutex<Series>> {
  fn add_point(&mut self, point: FeedPoint) {
    self.lock().unwrap_or_else(PoisonError::into_inner).push(point);
  }
}

/// What happened to a reading handed to [`FeedSink::push`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Delivery {
  /// The reading reached the surface, along with anything deferred before it.
  Appended,

  /// The surface is not attached or the feed is not ready yet; the reading is
  /// queued until it is.
  Deferred,

  /// The sink was torn down and the reading was dropped.
  Discarded,
}

enum Surface {
  Unattached,
  Attached(Box<dyn ChartSurface>),
  TornDown,
}

/// Forwards completed readings to a chart surface as feed points.
///
/// Readings pushed before a surface is attached, or before the feed is ready,
/// are queued in order and flushed as soon as both hold. The queue is bounded;
/// when it is full the oldest reading gives way. Tearing the sink down drops
/// the queue and every later reading.
pub struct FeedSink {
  surface: Surface,
  readiness: ReadinessWatch,
  pending: VecDeque<CompletedReading>,
  pending_capacity: usize,
  darken: f64,
}

impl FeedSink {
  /// Creates an unattached sink.
  ///
  /// `darken` is the brighten factor applied to a reading's color for the
  /// edge of its marker, and `pending_capacity` bounds the deferred queue.
  pub fn new(
    readiness: ReadinessWatch,
    darken: f64,
    pending_capacity: usize,
  ) -> Self {
    FeedSink {
      surface: Surface::Unattached,
      readiness,
      pending: VecDeque::new(),
      pending_capacity: pending_capacity.max(1),
      darken,
    }
  }

  /// Hands a reading to the sink.
  pub fn push(&mut self, reading: CompletedReading) -> Delivery {
    if self.is_torn_down() {
      return Delivery::Discarded;
    }

    if self.pending.len() >= self.pending_capacity {
      self.pending.pop_front();
      warn!(
        "Deferred feed queue is full ({} readings), dropping the oldest.",
        self.pending_capacity
      );
    }

    self.pending.push_back(reading);

    if self.flush() > 0 {
      Delivery::Appended
    } else {
      Delivery::Deferred
    }
  }

  /// Attaches the surface and flushes whatever was deferred, returning how
  /// many points were appended. A torn-down sink ignores the surface.
  pub fn attach(&mut self, surface: Box<dyn ChartSurface>) -> usize {
    if self.is_torn_down() {
      return 0;
    }

    self.surface = Surface::Attached(surface);
    self.flush()
  }

  /// Appends every deferred reading if the surface is attached and the feed
  /// is ready. Returns how many points were appended.
  pub fn flush(&mut self) -> usize {
    let Surface::Attached(surface) = &mut self.surface else {
      return 0;
    };

    if *self.readiness.borrow() != FeedState::Ready {
      return 0;
    }

    let count = self.pending.len();

    for reading in self.pending.drain(..) {
      surface.add_point(reading.to_feed_point(self.darken));
    }

    count
  }

  /// Drops the surface and the deferred queue for good.
  pub fn teardown(&mut self) {
    self.surface = Surface::TornDown;
    self.pending.clear();
  }

  /// Whether the sink has been torn down.
  pub fn is_torn_down(&self) -> bool {
    matches!(self.surface, Surface::TornDown)
  }

  /// Number of readings waiting for the surface.
  pub fn pending(&self) -> usize {
    self.pending.len()
  }
}
