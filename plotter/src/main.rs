use clap::{builder::PossibleValuesParser, Arg, Command};
use jeflog::fail;
use plotter::tool;
use std::process;

fn main() -> anyhow::Result<()> {
  let palette_args = [
    Arg::new("scheme")
      .long("scheme")
      .required(false)
      .value_parser(PossibleValuesParser::new(["jet", "hot", "greys"])),
    Arg::new("shades")
      .long("shades")
      .required(false)
      .value_parser(clap::value_parser!(usize)),
    Arg::new("offset")
      .long("offset")
      .required(false)
      .allow_negative_numbers(true)
      .value_parser(clap::value_parser!(i32)),
  ];

  let matches = Command::new("plotter")
    .about("Plotter command line tool")
    .subcommand_required(true)
    .subcommand(
      Command::new("serve")
        .about("Fuses position and power telemetry and serves the plotted points.")
        .args(palette_args.clone())
        .arg(Arg::new("topic").long("topic").required(false))
        .arg(
          Arg::new("interval")
            .long("interval")
            .short('i')
            .required(false)
            .help("Throttle window of the fusion logic, in milliseconds.")
            .value_parser(clap::value_parser!(u64)),
        )
        .arg(
          Arg::new("retention")
            .long("retention")
            .required(false)
            .help("Points kept for late viewers, 0 for all of them.")
            .value_parser(clap::value_parser!(usize)),
        )
        .arg(
          Arg::new("port")
            .long("port")
            .short('p')
            .required(false)
            .value_parser(clap::value_parser!(u16)),
        )
        .arg(
          Arg::new("bus_port")
            .long("bus-port")
            .required(false)
            .value_parser(clap::value_parser!(u16)),
        ),
    )
    .subcommand(
      Command::new("emulate")
        .about("Emulates the SFP and motor drivers of a unit scanning for its peer.")
        .arg(
          Arg::new("target")
            .required(false)
            .default_value("localhost:7201"),
        )
        .arg(
          Arg::new("frequency")
            .required(false)
            .default_value("10.0")
            .short('f')
            .value_parser(clap::value_parser!(f64)),
        )
        .arg(
          Arg::new("duration")
            .required(false)
            .short('t')
            .value_parser(clap::value_parser!(f64)),
        )
        .arg(
          Arg::new("step")
            .long("step")
            .required(false)
            .default_value("100.0")
            .value_parser(clap::value_parser!(f64)),
        ),
    )
    .subcommand(
      Command::new("palette")
        .about("Prints the palette used to color power values.")
        .args(palette_args),
    )
    .get_matches();

  match matches.subcommand() {
    Some(("serve", args)) => tool::serve(args)?,
    Some(("emulate", args)) => tool::emulate(args)?,
    Some(("palette", args)) => tool::palette(args)?,
    _ => {
      fail!("Invalid command. Please check the command you entered.");
      process::exit(1);
    }
  };

  Ok(())
}
