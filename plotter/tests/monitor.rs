//! Mount-level scenarios: messages published on the bus travel through the
//! throttle and the fusion engine and end up as points on a chart surface.
//!
//! Time is paused, so throttle windows elapse only when a test sleeps.

use common::comm::{motors::MotorState, sfp::SfpModule, BusMessage};
use plotter::{
  bus::Bus,
  config::Config,
  feed::Series,
  monitor::Monitor,
  palette::{Palette, Scheme},
  state::FeedState,
};
use std::{
  sync::{Arc, Mutex},
  time::Duration,
};

const TOPIC: &str = "status";

fn motors(x: f64, y: f64) -> BusMessage {
  BusMessage::Motors {
    motor: MotorState {
      current_x: x,
      current_y: y,
      ..MotorState::default()
    },
  }
}

fn sfp(rx_power_db: f64) -> BusMessage {
  let module = SfpModule {
    rx_power_db,
    ..SfpModule::default()
  };

  BusMessage::Sfp {
    sfp: [("1".to_owned(), module)].into_iter().collect(),
  }
}

async fn settle() {
  for _ in 0..8 {
    tokio::task::yield_now().await;
  }
}

/// Sleeps past the end of the current throttle window.
async fn next_window() {
  tokio::time::sleep(Duration::from_millis(310)).await;
  settle().await;
}

fn surface() -> Arc<Mutex<Series>> {
  Arc::new(Mutex::new(Series::new(0)))
}

#[tokio::test(start_paused = true)]
async fn first_complete_reading_becomes_one_point() {
  let bus = Bus::new();
  let monitor = Monitor::mount(&bus, &Config::default());

  bus.publish(TOPIC, &motors(1.0, 2.0));
  bus.publish(TOPIC, &sfp(-9.6));
  settle().await;
  assert_eq!(monitor.state(), FeedState::Waiting);

  next_window().await;
  assert_eq!(monitor.state(), FeedState::Ready);
  assert_eq!(monitor.pending(), 1);

  let series = surface();
  assert_eq!(monitor.attach(Box::new(series.clone())), 1);

  let first = Palette::generate(Scheme::Jet, 50).colors()[0];
  let points = series.lock().unwrap().last(10);

  assert_eq!(points.len(), 1);
  assert_eq!((points[0].x, points[0].y, points[0].z), (1.0, 2.0, -10));
  assert_eq!(points[0].color_start, first);
  assert_eq!(points[0].color_end, first.brighten(-0.2));
}

#[tokio::test(start_paused = true)]
async fn motors_alone_keep_waiting() {
  let bus = Bus::new();
  let monitor = Monitor::mount(&bus, &Config::default());
  let series = surface();
  monitor.attach(Box::new(series.clone()));

  for step in 0..10 {
    bus.publish(TOPIC, &motors(f64::from(step), 0.0));
    next_window().await;
  }

  assert_eq!(monitor.state(), FeedState::Waiting);
  assert!(series.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn only_changes_are_plotted() {
  let bus = Bus::new();
  let monitor = Monitor::mount(&bus, &Config::default());
  let series = surface();
  monitor.attach(Box::new(series.clone()));

  let messages = [
    motors(0.0, 0.0),
    sfp(-3.2),
    sfp(-2.9),
    motors(0.0, 0.0),
    motors(100.0, 0.0),
    sfp(-5.0),
  ];

  for message in &messages {
    bus.publish(TOPIC, message);
    next_window().await;
  }

  let plotted = series
    .lock()
    .unwrap()
    .points()
    .map(|point| (point.x, point.z))
    .collect::<Vec<_>>();

  assert_eq!(plotted, [(0.0, -3), (100.0, -3), (100.0, -5)]);
}

#[tokio::test(start_paused = true)]
async fn repeated_position_in_one_window_plots_once() {
  let bus = Bus::new();
  let monitor = Monitor::mount(&bus, &Config::default());
  let series = surface();
  monitor.attach(Box::new(series.clone()));

  bus.publish(TOPIC, &sfp(-4.0));
  next_window().await;

  bus.publish(TOPIC, &motors(1.0, 2.0));
  bus.publish(TOPIC, &motors(1.0, 2.0));
  next_window().await;
  next_window().await;

  let series = series.lock().unwrap();
  assert_eq!(series.appended(), 1);
  assert_eq!(series.last(1)[0].x, 1.0);
}

#[tokio::test(start_paused = true)]
async fn bursts_are_coalesced_to_the_latest_message() {
  let bus = Bus::new();
  let monitor = Monitor::mount(&bus, &Config::default());
  let series = surface();
  monitor.attach(Box::new(series.clone()));

  bus.publish(TOPIC, &sfp(-4.0));
  settle().await;

  // only the last position of the burst reaches the engine
  for x in 1..=5 {
    bus.publish(TOPIC, &motors(f64::from(x), 0.0));
  }

  next_window().await;

  let plotted = series.lock().unwrap().last(10);
  assert_eq!(plotted.len(), 1);
  assert_eq!(plotted[0].x, 5.0);
}

#[tokio::test(start_paused = true)]
async fn unmount_stops_everything_in_flight() {
  let bus = Bus::new();
  let mut monitor = Monitor::mount(&bus, &Config::default());
  let series = surface();
  monitor.attach(Box::new(series.clone()));

  bus.publish(TOPIC, &motors(1.0, 2.0));
  settle().await;

  // held for the end of the window when the mount goes away
  bus.publish(TOPIC, &sfp(-9.6));
  monitor.unmount();

  assert!(!monitor.is_mounted());
  assert_eq!(bus.subscriber_count(TOPIC), 0);
  assert_eq!(bus.publish(TOPIC, &sfp(-1.0)), 0);

  next_window().await;
  next_window().await;

  assert_eq!(monitor.state(), FeedState::Waiting);
  assert!(series.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn mounts_do_not_share_state() {
  let bus = Bus::new();
  let first = Monitor::mount(&bus, &Config::default());

  bus.publish(TOPIC, &motors(1.0, 2.0));
  settle().await;

  let second = Monitor::mount(&bus, &Config::default());
  bus.publish(TOPIC, &sfp(-9.6));
  next_window().await;

  assert_eq!(first.state(), FeedState::Ready);
  assert_eq!(second.state(), FeedState::Waiting);
}
