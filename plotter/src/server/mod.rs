/// Server error components.
pub mod error;

/// All server API route functions.
pub mod routes;

use crate::{
  feed::{ChartSurface, Series},
  state::ReadinessWatch,
};
use axum::Router;
use common::comm::FeedPoint;
pub use error::{ServerError as Error, ServerResult as Result};
use std::{
  future::Future,
  io,
  net::SocketAddr,
  sync::{Arc, Mutex, MutexGuard, PoisonError},
};
use tokio::{net::TcpListener, sync::broadcast};
use tower_http::cors::{self, CorsLayer};

/// How many points a slow WebSocket peer may fall behind before it starts
/// skipping them.
const FORWARD_BACKLOG: usize = 1_024;

/// Contains all of the server's shared state.
#[derive(Clone, Debug)]
pub struct Shared {
  /// Every retained point, in the order it was plotted.
  pub series: Arc<Mutex<Series>>,

  /// Announces every point as it is plotted.
  pub points: broadcast::Sender<FeedPoint>,

  /// Whether anything has been plotted yet.
  pub readiness: ReadinessWatch,
}

impl Shared {
  /// Locks the retained series.
  pub fn series(&self) -> MutexGuard<'_, Series> {
    self.series.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// Returns the retained points together with a receiver of every point
  /// plotted afterwards, so that no point is missed or seen twice.
  pub fn snapshot_and_subscribe(
    &self,
  ) -> (Vec<FeedPoint>, broadcast::Receiver<FeedPoint>) {
    let series = self.series();
    let receiver = self.points.subscribe();

    (series.points().copied().collect(), receiver)
  }
}

/// The chart surface backing the server: points are retained in the shared
/// series and announced to every forwarding connection.
#[derive(Clone, Debug)]
pub struct ForwardingSurface {
  shared: Shared,
}

impl ChartSurface for ForwardingSurface {
  fn add_point(&mut self, point: FeedPoint) {
    let mut series = self.shared.series();
    series.push(point);

    // nobody listening is fine, the point is still retained. the lock is held
    // across the send so snapshot_and_subscribe sees each point exactly once.
    _ = self.shared.points.send(point);
  }
}

/// The server, constructed with all route functions ready.
#[derive(Clone, Debug)]
pub struct Server {
  /// The shared state of the server, to be passed to route functions.
  pub shared: Shared,
}

impl Server {
  /// Constructs a new `Server` retaining at most `retention` points, or all
  /// of them if `retention` is zero.
  pub fn new(readiness: ReadinessWatch, retention: usize) -> Self {
    let (points, _) = broadcast::channel(FORWARD_BACKLOG);

    let shared = Shared {
      series: Arc::new(Mutex::new(Series::new(retention))),
      points,
      readiness,
    };

    Server { shared }
  }

  /// A chart surface drawing into this server.
  pub fn surface(&self) -> ForwardingSurface {
    ForwardingSurface {
      shared: self.shared.clone(),
    }
  }

  /// Builds the router with permissive CORS.
  pub fn router(&self) -> Router {
    use axum::routing::get;

    let cors = CorsLayer::new()
      .allow_methods(cors::Any)
      .allow_headers(cors::Any)
      .allow_origin(cors::Any);

    Router::new()
      .route("/feed/status", get(routes::get_status))
      .route("/feed/points", get(routes::get_points))
      .route("/feed/forward", get(routes::forward_points))
      .layer(cors)
      .with_state(self.shared.clone())
  }

  /// Serves the route functions on `listener` until `shutdown` completes.
  ///
  /// The graceful shutdown waits for open forwarding connections to close, so
  /// the function may return some time after `shutdown` has.
  pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> io::Result<()>
  where
    F: Future<Output = ()> + Send + 'static,
  {
    let router = self
      .router()
      .into_make_service_with_connect_info::<SocketAddr>();

    axum::serve(listener, router)
      .with_graceful_shutdown(shutdown)
      .await
  }
}
