use crate::{
  palette::Palette,
  state::{FeedState, Readiness},
};
use common::comm::{BusMessage, Color, FeedPoint};
use serde::Serialize;
use std::{error::Error, fmt};

/// The most recent value of every tracked quantity, any of which may still be
/// unknown.
///
/// `color` is only ever set once position and power are both known; none of
/// the fields return to unknown once set.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PartialReading {
  /// Last reported X position.
  pub position_x: Option<f64>,

  /// Last reported Y position.
  pub position_y: Option<f64>,

  /// Last receive power, rounded to whole dBm.
  pub power: Option<i32>,

  /// Color derived from `power` at the last emission.
  pub color: Option<Color>,
}

impl PartialReading {
  /// Whether both position and power are known.
  pub fn is_complete(&self) -> bool {
    self.position_x.is_some() && self.position_y.is_some() && self.power.is_some()
  }
}

/// A reading with every quantity known, ready to be drawn.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct CompletedReading {
  /// X position.
  pub position_x: f64,

  /// Y position.
  pub position_y: f64,

  /// Receive power, in whole dBm.
  pub power: i32,

  /// Color of the power value.
  pub color: Color,
}

impl CompletedReading {
  /// Builds the chart point for this reading, with the marker edge shifted by
  /// `darken` relative to its center.
  pub fn to_feed_point(&self, darken: f64) -> FeedPoint {
    FeedPoint {
      x: self.position_x,
      y: self.position_y,
      z: self.power,
      color_start: self.color,
      color_end: self.color.brighten(darken),
    }
  }
}

/// A message that passed decoding but still cannot be fused.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FusionError {
  /// An SFP report that lists no modules.
  NoSfpModule,

  /// A receive power that is NaN or infinite.
  NonFinitePower(f64),
}

impl fmt::Display for FusionError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::NoSfpModule => write!(f, "SFP report contains no modules"),
      Self::NonFinitePower(value) => {
        write!(f, "SFP receive power {value} is not a finite number")
      }
    }
  }
}

impl Error for FusionError {}

/// Rounds a receive power to the nearest whole dBm, halves toward positive
/// infinity.
pub fn round_power(rx_power_db: f64) -> Result<i32, FusionError> {
  if !rx_power_db.is_finite() {
    return Err(FusionError::NonFinitePower(rx_power_db));
  }

  Ok((rx_power_db + 0.5).floor() as i32)
}

/// Merges SFP and motor messages into completed, colorized readings.
///
/// An engine belongs to exactly one mount. It emits a reading for every
/// message that changes the tracked state while position and power are both
/// known, and marks the mount ready on the first such emission.
#[derive(Debug)]
pub struct FusionEngine {
  palette: Palette,
  power_offset: i32,
  partial: PartialReading,
  readiness: Readiness,
}

impl FusionEngine {
  /// Creates an engine with nothing known yet.
  ///
  /// `power_offset` is added to the power before the palette lookup, so that
  /// with an offset of 10 a power of -10 dBm selects the first color.
  pub fn new(palette: Palette, power_offset: i32, readiness: Readiness) -> Self {
    FusionEngine {
      palette,
      power_offset,
      partial: PartialReading::default(),
      readiness,
    }
  }

  /// Applies one message, returning a completed reading if the message
  /// changed the tracked state and the state is complete.
  ///
  /// Only the first module of an SFP report is consulted. The state is left
  /// untouched when an error is returned.
  pub fn ingest(
    &mut self,
    message: &BusMessage,
  ) -> Result<Option<CompletedReading>, FusionError> {
    let changed = match message {
      BusMessage::Sfp { sfp } => {
        // TODO: choose a module explicitly once multi-module units exist
        let (_, module) = sfp.first().ok_or(FusionError::NoSfpModule)?;
        let power = round_power(module.rx_power_db)?;

        if self.partial.power == Some(power) {
          false
        } else {
          self.partial.power = Some(power);
          true
        }
      }
      BusMessage::Motors { motor } => {
        if self.partial.position_x == Some(motor.current_x)
          && self.partial.position_y == Some(motor.current_y)
        {
          false
        } else {
          self.partial.position_x = Some(motor.current_x);
          self.partial.position_y = Some(motor.current_y);
          true
        }
      }
    };

    if !changed {
      return Ok(None);
    }

    let PartialReading {
      position_x: Some(position_x),
      position_y: Some(position_y),
      power: Some(power),
      ..
    } = self.partial
    else {
      return Ok(None);
    };

    let shifted = f64::from(power) + f64::from(self.power_offset);
    let color = self.palette.color_for(shifted);
    self.partial.color = Some(color);
    self.readiness.mark_ready();

    Ok(Some(CompletedReading {
      position_x,
      position_y,
      power,
      color,
    }))
  }

  /// The tracked state.
  pub fn partial(&self) -> &PartialReading {
    &self.partial
  }

  /// Whether a reading has been emitted yet.
  pub fn state(&self) -> FeedState {
    self.readiness.state()
  }

  /// The palette colors are drawn from.
  pub fn palette(&self) -> &Palette {
    &self.palette
  }
}
