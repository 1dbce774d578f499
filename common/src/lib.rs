#![warn(missing_docs)]

//! Common consists of the shared types passed between the telemetry bus, the
//! plotter and whatever draws the plotter's points. More specifically, the
//! messages published by the SFP and motor drivers and the colorized points
//! handed to a chart are all stored here.

/// All structs and definitions related to communication between different
/// subsystems.
pub mod comm;

/// Trait providing a method to create a pretty, terminal-friendly
/// representation of the underlying.
pub trait ToPrettyString {
  /// Provides a representation of the underlying which is preferable when
  /// displaying to the console but not as a raw string.
  ///
  /// ANSI codes such as color codes, for example, can be used in a "pretty
  /// string" but would be atypical in a `fmt::Display` implementation.
  fn to_pretty_string(&self) -> String;
}
