use serde::{Deserialize, Serialize};

/// The state of the X/Y motor pair as reported by the motor driver.
///
/// Positions are in motor steps. Only the current position is required; the
/// target position is reported while a move is in progress.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct MotorState {
  /// Current position along the X axis.
  pub current_x: f64,

  /// Current position along the Y axis.
  pub current_y: f64,

  /// Commanded position along the X axis.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub next_x: Option<f64>,

  /// Commanded position along the Y axis.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub next_y: Option<f64>,
}
