use crate::{config::Config, palette::Palette};
use clap::ArgMatches;
use common::ToPrettyString;

/// Tool function which prints every color of the configured palette along
/// with the power it represents.
pub fn palette(args: &ArgMatches) -> anyhow::Result<()> {
  let config = Config::from_args(args)?;
  let palette = Palette::generate(config.scheme, config.shade_count);

  println!(
    "\x1b[1m{}\x1b[0m, {} shades, offset {}",
    palette.scheme(),
    palette.shade_count(),
    config.power_offset
  );

  for (index, color) in palette.colors().iter().enumerate() {
    let power = index as i64 - i64::from(config.power_offset);
    println!("{index:>4} {power:>5} dBm  {}", color.to_pretty_string());
  }

  Ok(())
}
