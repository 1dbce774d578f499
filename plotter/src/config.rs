use crate::palette::Scheme;
use anyhow::anyhow;
use clap::{parser::MatchesError, ArgMatches};
use std::{any::Any, time::Duration};

/// Topic the SFP and motor drivers publish their status on.
pub const DEFAULT_TOPIC: &str = "status";

/// Number of shades in the palette, one less than the number of colors.
pub const DEFAULT_SHADE_COUNT: usize = 50;

/// Added to the power before the palette lookup, mapping -10 dBm to the first
/// color.
pub const DEFAULT_POWER_OFFSET: i32 = 10;

/// Minimum time between two runs of the fusion logic.
pub const DEFAULT_THROTTLE_INTERVAL: Duration = Duration::from_millis(300);

/// Brighten factor for the edge of every point marker.
pub const DEFAULT_DARKEN: f64 = -0.2;

/// Points kept on the chart surface. Zero keeps everything.
pub const DEFAULT_RETENTION: usize = 4_096;

/// Readings kept while the chart surface is not attached.
pub const DEFAULT_PENDING_CAPACITY: usize = 256;

/// Port of the chart surface's HTTP server.
pub const DEFAULT_HTTP_PORT: u16 = 7200;

/// Port telemetry datagrams are received on.
pub const DEFAULT_BUS_PORT: u16 = 7201;

/// Everything a mount and its surroundings can be tuned with.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
  /// Bus topic to subscribe to.
  pub topic: String,

  /// Color scheme of the palette.
  pub scheme: Scheme,

  /// Number of palette shades.
  pub shade_count: usize,

  /// Offset added to the power before the palette lookup.
  pub power_offset: i32,

  /// Throttle window of the fusion logic.
  pub throttle_interval: Duration,

  /// Brighten factor for marker edges.
  pub darken: f64,

  /// Points kept on the chart surface; zero keeps everything.
  pub retention: usize,

  /// Readings kept while the surface is not attached.
  pub pending_capacity: usize,

  /// HTTP port of the chart surface.
  pub http_port: u16,

  /// UDP port for telemetry.
  pub bus_port: u16,
}

impl Default for Config {
  fn default() -> Self {
    Config {
      topic: DEFAULT_TOPIC.to_owned(),
      scheme: Scheme::default(),
      shade_count: DEFAULT_SHADE_COUNT,
      power_offset: DEFAULT_POWER_OFFSET,
      throttle_interval: DEFAULT_THROTTLE_INTERVAL,
      darken: DEFAULT_DARKEN,
      retention: DEFAULT_RETENTION,
      pending_capacity: DEFAULT_PENDING_CAPACITY,
      http_port: DEFAULT_HTTP_PORT,
      bus_port: DEFAULT_BUS_PORT,
    }
  }
}

/// Looks up an optional argument. Arguments the command does not define read
/// as absent, but a value of the wrong type is an error.
fn argument<'a, T>(args: &'a ArgMatches, id: &str) -> anyhow::Result<Option<&'a T>>
where
  T: Any + Clone + Send + Sync + 'static,
{
  match args.try_get_one::<T>(id) {
    Ok(value) => Ok(value),
    Err(MatchesError::UnknownArgument { .. }) => Ok(None),
    Err(error) => Err(error.into()),
  }
}

impl Config {
  /// Builds a configuration from the defaults, overridden by whichever
  /// arguments were given on the command line.
  pub fn from_args(args: &ArgMatches) -> anyhow::Result<Self> {
    let mut config = Config::default();

    if let Some(topic) = argument::<String>(args, "topic")? {
      config.topic = topic.clone();
    }

    if let Some(scheme) = argument::<String>(args, "scheme")? {
      config.scheme = scheme
        .parse()
        .map_err(|_| anyhow!("Unknown palette scheme '{scheme}'."))?;
    }

    if let Some(shades) = argument::<usize>(args, "shades")? {
      config.shade_count = *shades;
    }

    if let Some(offset) = argument::<i32>(args, "offset")? {
      config.power_offset = *offset;
    }

    if let Some(interval) = argument::<u64>(args, "interval")? {
      config.throttle_interval = Duration::from_millis(*interval);
    }

    if let Some(retention) = argument::<usize>(args, "retention")? {
      config.retention = *retention;
    }

    if let Some(port) = argument::<u16>(args, "port")? {
      config.http_port = *port;
    }

    if let Some(port) = argument::<u16>(args, "bus_port")? {
      config.bus_port = *port;
    }

    Ok(config)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use clap::{Arg, Command};

  fn command() -> Command {
    Command::new("serve")
      .arg(Arg::new("scheme").long("scheme"))
      .arg(
        Arg::new("interval")
          .long("interval")
          .value_parser(clap::value_parser!(u64)),
      )
      .arg(
        Arg::new("retention")
          .long("retention")
          .value_parser(clap::value_parser!(usize)),
      )
  }

  #[test]
  fn defaults_match_reference_configuration() {
    let config = Config::default();

    assert_eq!(config.shade_count, 50);
    assert_eq!(config.power_offset, 10);
    assert_eq!(config.throttle_interval, Duration::from_millis(300));
    assert_eq!(config.darken, -0.2);
    assert_eq!(config.topic, "status");
  }

  #[test]
  fn arguments_override_defaults() -> anyhow::Result<()> {
    let matches = command().try_get_matches_from([
      "serve",
      "--scheme",
      "hot",
      "--interval",
      "50",
      "--retention",
      "0",
    ])?;

    let config = Config::from_args(&matches)?;
    assert_eq!(config.scheme, Scheme::Hot);
    assert_eq!(config.throttle_interval, Duration::from_millis(50));
    assert_eq!(config.retention, 0);

    // arguments that the command does not define keep their defaults
    assert_eq!(config.http_port, DEFAULT_HTTP_PORT);

    Ok(())
  }

  #[test]
  fn mistyped_arguments_are_errors() -> anyhow::Result<()> {
    // parsed as a string where a count is expected
    let command = command().arg(Arg::new("shades").long("shades"));
    let matches = command.try_get_matches_from(["serve", "--shades", "12"])?;

    assert!(Config::from_args(&matches).is_err());
    Ok(())
  }

  #[test]
  fn unknown_scheme_is_rejected() -> anyhow::Result<()> {
    let matches = command().try_get_matches_from(["serve", "--scheme", "neon"])?;
    assert!(Config::from_args(&matches).is_err());

    Ok(())
  }
}
