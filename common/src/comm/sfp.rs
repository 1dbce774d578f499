use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// String that identifies one SFP module, such as its slot number.
pub type ModuleId = String;

/// Readings of every SFP module keyed by module identifier.
///
/// The map keeps the order in which the driver reported the modules, which is
/// what "the first module" refers to elsewhere.
pub type SfpReport = IndexMap<ModuleId, SfpModule>;

/// The diagnostic readings of a single SFP module.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct SfpModule {
  /// Optical receive power, in dBm.
  pub rx_power_db: f64,

  /// Optical transmit power, in dBm.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub tx_power_db: Option<f64>,

  /// Module temperature, in degrees Celsius.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub temperature_c: Option<f64>,
}
