use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Deals with all communication regarding the SFP module driver.
pub mod sfp;

/// Deals with all communication regarding the motor driver.
pub mod motors;

mod gui;
pub use gui::*;

/// The discriminator carried in the `type` field of every bus message.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
  /// Readings from the SFP module driver.
  Sfp,

  /// Position reports from the motor driver.
  Motors,
}

impl fmt::Display for MessageKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Sfp => write!(f, "sfp"),
      Self::Motors => write!(f, "motors"),
    }
  }
}

impl FromStr for MessageKind {
  type Err = ();

  fn from_str(string: &str) -> Result<Self, Self::Err> {
    match string {
      "sfp" => Ok(Self::Sfp),
      "motors" => Ok(Self::Motors),
      _ => Err(()),
    }
  }
}

/// A single message published on the telemetry bus.
///
/// Messages are JSON objects tagged by their `type` field, so a report from
/// the SFP driver looks like
/// `{"type": "sfp", "sfp": {"1": {"rx_power_db": -9.6}}}` and one from the
/// motor driver like `{"type": "motors", "motor": {"current_x": 1, ...}}`.
/// Anything that does not decode into one of these shapes is rejected at the
/// bus boundary.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BusMessage {
  /// Readings of every SFP module, keyed by module identifier in the order
  /// the driver reported them.
  Sfp {
    /// The per-module readings.
    sfp: sfp::SfpReport,
  },

  /// The state of the X/Y motors.
  Motors {
    /// The motor state.
    motor: motors::MotorState,
  },
}

impl BusMessage {
  /// Returns the kind of this message, as used for subscription filters.
  pub fn kind(&self) -> MessageKind {
    match self {
      Self::Sfp { .. } => MessageKind::Sfp,
      Self::Motors { .. } => MessageKind::Motors,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn decodes_sfp_message_in_reported_order() -> anyhow::Result<()> {
    let message = serde_json::from_str::<BusMessage>(
      r#"{
        "type": "sfp",
        "sfp": {
          "9": { "rx_power_db": -3.2, "tx_power_db": 1.0 },
          "1": { "rx_power_db": -9.6 }
        }
      }"#,
    )?;

    let BusMessage::Sfp { sfp } = &message else {
      panic!("expected an sfp message, got {message:?}");
    };

    let ids = sfp.keys().map(String::as_str).collect::<Vec<_>>();
    assert_eq!(ids, ["9", "1"]);
    assert_eq!(sfp["9"].tx_power_db, Some(1.0));
    assert_eq!(sfp["1"].tx_power_db, None);
    assert_eq!(message.kind(), MessageKind::Sfp);

    Ok(())
  }

  #[test]
  fn decodes_motor_message_with_extra_fields() -> anyhow::Result<()> {
    let message = serde_json::from_str::<BusMessage>(
      r#"{
        "type": "motors",
        "motor": { "current_x": 1, "current_y": 2, "next_x": 5, "speed": 3 }
      }"#,
    )?;

    let BusMessage::Motors { motor } = message else {
      panic!("expected a motors message");
    };

    assert_eq!(motor.current_x, 1.0);
    assert_eq!(motor.current_y, 2.0);
    assert_eq!(motor.next_x, Some(5.0));
    assert_eq!(motor.next_y, None);

    Ok(())
  }

  #[test]
  fn rejects_messages_missing_fields() {
    let missing_y = r#"{"type": "motors", "motor": {"current_x": 1}}"#;
    assert!(serde_json::from_str::<BusMessage>(missing_y).is_err());

    let missing_power = r#"{"type": "sfp", "sfp": {"1": {"tx_power_db": 0}}}"#;
    assert!(serde_json::from_str::<BusMessage>(missing_power).is_err());

    let unknown = r#"{"type": "gps", "fix": {}}"#;
    assert!(serde_json::from_str::<BusMessage>(unknown).is_err());
  }

  #[test]
  fn message_kind_round_trips_through_strings() {
    for kind in [MessageKind::Sfp, MessageKind::Motors] {
      assert_eq!(kind.to_string().parse::<MessageKind>(), Ok(kind));
    }

    assert!("status".parse::<MessageKind>().is_err());
  }
}
