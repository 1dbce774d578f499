use crate::{
  bus::{Bus, Subscription},
  config::Config,
  feed::{ChartSurface, Delivery, FeedSink},
  fusion::FusionEngine,
  palette::Palette,
  state::{FeedState, Readiness, ReadinessWatch},
  throttle::Throttle,
};
use common::{
  comm::{BusMessage, MessageKind},
  ToPrettyString,
};
use jeflog::{fail, pass};
use std::sync::{
  atomic::{AtomicBool, Ordering},
  Arc,
  Mutex,
  MutexGuard,
  PoisonError,
};

/// One mounted position/power display: a fusion engine fed from the bus
/// through a throttle, and a feed sink forwarding its readings to a chart.
///
/// Every mount owns its own engine, so two mounts never share state. Must be
/// created inside a tokio runtime.
pub struct Monitor {
  subscription: Subscription,
  throttle: Arc<Throttle<BusMessage>>,
  alive: Arc<AtomicBool>,
  sink: Arc<Mutex<FeedSink>>,
  readiness: ReadinessWatch,
}

fn lock(sink: &Mutex<FeedSink>) -> MutexGuard<'_, FeedSink> {
  sink.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Monitor {
  /// Subscribes a fresh engine to the configured topic of `bus`.
  pub fn mount(bus: &Bus, config: &Config) -> Self {
    let palette = Palette::generate(config.scheme, config.shade_count);
    let (readiness, watch) = Readiness::new();
    let mut engine = FusionEngine::new(palette, config.power_offset, readiness);

    let sink = Arc::new(Mutex::new(FeedSink::new(
      watch.clone(),
      config.darken,
      config.pending_capacity,
    )));

    let alive = Arc::new(AtomicBool::new(true));

    let throttle = {
      let sink = sink.clone();
      let alive = alive.clone();

      Throttle::spawn(config.throttle_interval, move |message: BusMessage| {
        // the throttle timer may outlive the mount by one run
        if !alive.load(Ordering::Acquire) {
          return;
        }

        let was_waiting = engine.state() == FeedState::Waiting;

        let reading = match engine.ingest(&message) {
          Ok(Some(reading)) => reading,
          Ok(None) => return,
          Err(error) => {
            fail!("Failed to fuse \x1b[1m{}\x1b[0m message: {error}", message.kind());
            return;
          }
        };

        if was_waiting {
          pass!("Feed is now {}.", FeedState::Ready.to_pretty_string());
        }

        if lock(&sink).push(reading) == Delivery::Appended {
          pass!(
            "Plotted ({}, {}) at {} dBm {}",
            reading.position_x,
            reading.position_y,
            reading.power,
            reading.color.to_pretty_string(),
          );
        }
      })
    };

    let throttle = Arc::new(throttle);

    let subscription = {
      let throttle = throttle.clone();

      bus.subscribe(
        &config.topic,
        &[MessageKind::Sfp, MessageKind::Motors],
        move |message| {
          throttle.call(message.clone());
        },
      )
    };

    Monitor {
      subscription,
      throttle,
      alive,
      sink,
      readiness: watch,
    }
  }

  /// Attaches the chart surface, flushing readings deferred so far. Returns
  /// how many points were flushed.
  pub fn attach(&self, surface: Box<dyn ChartSurface>) -> usize {
    lock(&self.sink).attach(surface)
  }

  /// A watch on the `Waiting -> Ready` transition.
  pub fn readiness(&self) -> ReadinessWatch {
    self.readiness.clone()
  }

  /// The current feed state.
  pub fn state(&self) -> FeedState {
    *self.readiness.borrow()
  }

  /// Number of readings waiting for the surface.
  pub fn pending(&self) -> usize {
    lock(&self.sink).pending()
  }

  /// Whether the mount still processes messages.
  pub fn is_mounted(&self) -> bool {
    self.alive.load(Ordering::Acquire)
  }

  /// Stops the subscription before returning, then makes sure no message
  /// still travelling through the throttle reaches the engine or the chart.
  pub fn unmount(&mut self) {
    self.subscription.stop();
    self.alive.store(false, Ordering::Release);
    self.throttle.cancel();
    lock(&self.sink).teardown();
  }
}

impl Drop for Monitor {
  fn drop(&mut self) {
    if self.is_mounted() {
      self.unmount();
    }
  }
}
