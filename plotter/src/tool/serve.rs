use crate::{bus, config::Config, monitor::Monitor, server::Server};
use clap::ArgMatches;
use jeflog::{fail, pass, task, warn};
use tokio::net::TcpListener;

/// Resolves once the process is asked to stop.
async fn shutdown_signal() {
  if let Err(error) = tokio::signal::ctrl_c().await {
    warn!("Failed to listen for Ctrl-C, serving until killed: {error}");
    std::future::pending::<()>().await;
  }
}

/// Mounts the position/power display and serves its points.
///
/// Telemetry datagrams received on the bus port are published on the
/// in-process bus the mount subscribes to, and the HTTP server acts as the
/// mount's chart surface. The surface is attached once the server is bound,
/// so readings fused before that are deferred rather than lost.
pub fn serve(args: &ArgMatches) -> anyhow::Result<()> {
  let config = Config::from_args(args)?;

  tokio::runtime::Builder::new_multi_thread()
    .enable_all()
    .build()?
    .block_on(async move {
      let bus = bus::Bus::new();
      let mut monitor = Monitor::mount(&bus, &config);

      task!(
        "Mounted display on topic \x1b[1m{}\x1b[0m with a {} palette of {} shades.",
        config.topic,
        config.scheme,
        config.shade_count,
      );

      let listener_bus = bus.clone();
      let topic = config.topic.clone();
      let bus_port = config.bus_port;

      tokio::spawn(async move {
        if let Err(error) = bus::listen(listener_bus, topic, bus_port).await {
          fail!("Telemetry listener stopped: {error}");
        }
      });

      let server = Server::new(monitor.readiness(), config.retention);
      let listener = TcpListener::bind(("0.0.0.0", config.http_port)).await?;
      pass!("Serving points on port \x1b[1m{}\x1b[0m.", config.http_port);

      let flushed = monitor.attach(Box::new(server.surface()));
      if flushed > 0 {
        pass!("Flushed {flushed} deferred points.");
      }

      server.serve(listener, shutdown_signal()).await?;
      monitor.unmount();

      pass!("Display unmounted.");
      anyhow::Ok(())
    })
}
