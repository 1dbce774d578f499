#![warn(missing_docs)]
#![warn(clippy::correctness)]

//! Plotter fuses the receive power reported by an SFP module driver with the
//! position reported by a motor driver into a live stream of colorized
//! points, one per meaningful change, for a 3D scatter display.

/// The in-process telemetry bus and its UDP bridge.
pub mod bus;

/// Tunables and their defaults.
pub mod config;

/// The point feed sink and the chart surfaces it draws on.
pub mod feed;

/// The reading fusion engine.
pub mod fusion;

/// One mounted display, tying bus, throttle, engine and feed together.
pub mod monitor;

/// Discrete color palettes for power values.
pub mod palette;

/// Components related to the server which acts as the display's chart
/// surface.
pub mod server;

/// The one-time readiness transition.
pub mod state;

/// Leading and trailing edge rate limiting.
pub mod throttle;

/// Everything related to the Plotter command line tool.
pub mod tool;
