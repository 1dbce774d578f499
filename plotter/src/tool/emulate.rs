use anyhow::anyhow;
use clap::ArgMatches;
use common::comm::{
  motors::MotorState,
  sfp::{SfpModule, SfpReport},
  BusMessage,
};
use jeflog::{pass, task};
use rand::Rng;
use std::{
  f64::consts::FRAC_PI_2,
  net::UdpSocket,
  thread,
  time::{Duration, Instant},
};

/// Walks outward from a starting position in a square spiral: straight lines
/// of `step`-sized moves with a quarter turn after each line, the lines
/// growing by two moves after every second turn.
#[derive(Clone, Debug, PartialEq)]
pub struct SpiralScan {
  x: f64,
  y: f64,
  step: f64,
  angle: f64,
  points_per_line: u32,
  point: u32,
  line: u32,
}

impl SpiralScan {
  /// Starts a scan at `(x, y)`.
  pub fn new(x: f64, y: f64, step: f64) -> Self {
    SpiralScan {
      x,
      y,
      step,
      angle: 0.0,
      points_per_line: 2,
      point: 0,
      line: 0,
    }
  }
}

impl Iterator for SpiralScan {
  type Item = (f64, f64);

  fn next(&mut self) -> Option<Self::Item> {
    // motors move in whole steps
    self.x = (self.x + self.angle.cos() * self.step).round();
    self.y = (self.y + self.angle.sin() * self.step).round();
    self.point += 1;

    if self.point == self.points_per_line {
      self.point = 0;
      self.angle += FRAC_PI_2;
      self.line += 1;
    }

    if self.line == 2 {
      self.line = 0;
      self.points_per_line += 2;
    }

    Some((self.x, self.y))
  }
}

/// Receive power at `position` for a link best aligned at `optimum`, falling
/// off by 1.5 dB per `step` of misalignment down to a -40 dBm floor.
pub fn received_power(position: (f64, f64), optimum: (f64, f64), step: f64) -> f64 {
  let distance = (position.0 - optimum.0).hypot(position.1 - optimum.1) / step;
  (-2.0 - 1.5 * distance).max(-40.0)
}

fn motors(x: f64, y: f64) -> BusMessage {
  BusMessage::Motors {
    motor: MotorState {
      current_x: x,
      current_y: y,
      ..MotorState::default()
    },
  }
}

fn sfp(rx_power_db: f64, temperature_c: f64) -> BusMessage {
  let mut report = SfpReport::new();
  report.insert(
    "1".to_owned(),
    SfpModule {
      rx_power_db,
      tx_power_db: Some(-1.0),
      temperature_c: Some(temperature_c),
    },
  );

  BusMessage::Sfp { sfp: report }
}

/// How long to scan for, given in seconds. Negative and non-finite values are
/// rejected.
fn scan_duration(seconds: Option<f64>) -> anyhow::Result<Option<Duration>> {
  seconds
    .map(|seconds| {
      Duration::try_from_secs_f64(seconds).map_err(|_| {
        anyhow!("Duration must be a non-negative number of seconds, got {seconds}.")
      })
    })
    .transpose()
}

/// Tool function which emulates the SFP and motor drivers of a unit scanning
/// for its peer, sending their status messages as UDP datagrams.
pub fn emulate(args: &ArgMatches) -> anyhow::Result<()> {
  let target = args
    .get_one::<String>("target")
    .map_or("localhost:7201", String::as_str);
  let frequency = args.get_one::<f64>("frequency").copied().unwrap_or(10.0);
  let step = args.get_one::<f64>("step").copied().unwrap_or(100.0);
  let duration = scan_duration(args.get_one::<f64>("duration").copied())?;

  let socket = UdpSocket::bind("0.0.0.0:0")?;
  socket.connect(target)?;

  let mut rng = rand::thread_rng();
  let optimum = (
    (rng.gen_range(-5.0..5.0) * step).round(),
    (rng.gen_range(-5.0..5.0) * step).round(),
  );

  task!("Emulating drivers towards \x1b[1m{target}\x1b[0m at {frequency} Hz.");

  let period = Duration::from_secs_f64(1.0 / frequency.max(0.001));
  let started = Instant::now();
  let mut sent = 0_u64;

  for (x, y) in SpiralScan::new(0.0, 0.0, step) {
    if duration.is_some_and(|duration| started.elapsed() >= duration) {
      break;
    }

    let power = received_power((x, y), optimum, step) + rng.gen_range(-0.3..0.3);
    let temperature = 40.0 + rng.gen_range(-0.5..0.5);

    socket.send(&serde_json::to_vec(&motors(x, y))?)?;
    socket.send(&serde_json::to_vec(&sfp(power, temperature))?)?;
    sent += 2;

    thread::sleep(period);
  }

  pass!("Sent {sent} messages, optimum was at ({}, {}).", optimum.0, optimum.1);
  Ok(())
}
