use crate::{
  server::{self, error::bad_request, Shared},
  state::FeedState,
};
use axum::{
  extract::{
    ws::{self, WebSocket},
    ConnectInfo,
    Query,
    State,
    WebSocketUpgrade,
  },
  response::Response,
  Json,
};
use common::comm::FeedPoint;
use futures_util::{stream::SplitSink, SinkExt, StreamExt};
use jeflog::warn;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::sync::broadcast::error::RecvError;

/// Response struct for the feed status.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct StatusResponse {
  /// `waiting` until the first point is plotted, `ready` afterwards.
  pub state: FeedState,

  /// Number of retained points.
  pub points: usize,

  /// Number of points plotted since the server started.
  pub appended: u64,
}

/// Query struct for point requests.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct PointsQuery {
  /// Only return this many of the most recent points.
  pub last: Option<usize>,
}

/// Route function which reports whether the feed is ready and how many points
/// it holds. A display shows its waiting indicator while the state is
/// `waiting`.
pub async fn get_status(State(shared): State<Shared>) -> Json<StatusResponse> {
  let state = *shared.readiness.borrow();
  let series = shared.series();

  Json(StatusResponse {
    state,
    points: series.len(),
    appended: series.appended(),
  })
}

/// Route function which returns the retained points in chart form, oldest
/// first.
pub async fn get_points(
  State(shared): State<Shared>,
  Query(query): Query<PointsQuery>,
) -> server::Result<Json<Vec<FeedPoint>>> {
  let series = shared.series();

  let points = match query.last {
    Some(0) => return Err(bad_request("'last' must be at least 1")),
    Some(count) => series.last(count),
    None => series.points().copied().collect(),
  };

  Ok(Json(points))
}

async fn send_point(
  writer: &mut SplitSink<WebSocket, ws::Message>,
  point: &FeedPoint,
) -> anyhow::Result<()> {
  let json = serde_json::to_string(point)?;
  writer.send(ws::Message::Text(json)).await?;
  Ok(())
}

/// Route function which accepts a WebSocket connection, replays the retained
/// points and then forwards every new point as it is plotted.
pub async fn forward_points(
  ws: WebSocketUpgrade,
  State(shared): State<Shared>,
  ConnectInfo(peer): ConnectInfo<SocketAddr>,
) -> Response {
  ws.on_upgrade(move |socket| async move {
    let (mut writer, mut reader) = socket.split();
    let (backlog, mut points) = shared.snapshot_and_subscribe();

    // spawn separate task for forwarding while the "main" task waits
    // until it can abort this task when the user wants to close
    let forwarding_handle = tokio::spawn(async move {
      for point in &backlog {
        if send_point(&mut writer, point).await.is_err() {
          _ = writer.close().await;
          return;
        }
      }

      loop {
        let point = match points.recv().await {
          Ok(point) => point,
          Err(RecvError::Lagged(skipped)) => {
            warn!(
              "Forwarding to peer \x1b[1m{peer}\x1b[0m fell behind, skipped {skipped} points."
            );
            continue;
          }
          Err(RecvError::Closed) => break,
        };

        // attempt to forward the point and break if connection is severed.
        if send_point(&mut writer, &point).await.is_err() {
          warn!("Forwarding connection with peer \x1b[1m{peer}\x1b[0m severed.");
          _ = writer.close().await;
          break;
        }
      }
    });

    // wait until reader from socket receives a ws::Message::Close or a None,
    // indicating that the stream is no longer readable
    while !matches!(reader.next().await, Some(Ok(ws::Message::Close(_))) | None)
    {
    }

    // cancel the forwarding stream upon receipt of a close message
    forwarding_handle.abort();
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{feed::ChartSurface, server::Server, state::Readiness};
  use common::comm::Color;

  fn point(z: i32) -> FeedPoint {
    FeedPoint {
      x: 1.0,
      y: 2.0,
      z,
      color_start: Color::new(0, 0, 131),
      color_end: Color::new(0, 0, 80),
    }
  }

  #[tokio::test]
  async fn status_follows_readiness() {
    let (readiness, watch) = Readiness::new();
    let server = Server::new(watch, 0);

    let Json(status) = get_status(State(server.shared.clone())).await;
    assert_eq!(status.state, FeedState::Waiting);
    assert_eq!(status.points, 0);

    readiness.mark_ready();
    server.surface().add_point(point(-10));

    let Json(status) = get_status(State(server.shared.clone())).await;
    assert_eq!(
      status,
      StatusResponse {
        state: FeedState::Ready,
        points: 1,
        appended: 1,
      }
    );
  }

  #[tokio::test]
  async fn points_can_be_limited_to_the_most_recent() {
    let (_readiness, watch) = Readiness::new();
    let server = Server::new(watch, 0);
    let mut surface = server.surface();

    for z in 0..5 {
      surface.add_point(point(z));
    }

    let all = get_points(State(server.shared.clone()), Query(PointsQuery::default()))
      .await
      .map(|Json(points)| points.len());
    assert!(matches!(all, Ok(5)));

    let last = get_points(
      State(server.shared.clone()),
      Query(PointsQuery { last: Some(2) }),
    )
    .await
    .map(|Json(points)| points);
    assert!(matches!(last.as_deref(), Ok([first, second]) if first.z == 3 && second.z == 4));

    let none = get_points(
      State(server.shared.clone()),
      Query(PointsQuery { last: Some(0) }),
    )
    .await;
    assert!(none.is_err());
  }
}
