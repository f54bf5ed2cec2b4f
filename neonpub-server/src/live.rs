use std::time::Duration;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Path, WebSocketUpgrade,
    },
    response::Response,
    routing::get,
    Json,
};
use futures_util::{stream::SplitSink, SinkExt, StreamExt};
use log::debug;
use neonpub_collab::RoomConnectionHandle;
use tokio::time::timeout;

use crate::{
    context::ServerContext,
    errors::ServerResult,
    serialized::{Display, ToSerialized},
    Router,
};

type Outgoing = SplitSink<WebSocket, Message>;

/// Sent by clients to keep the connection alive
const PING: &str = "ping";
const PONG: &str = "pong";

#[utoipa::path(
    get,
    path = "/v1/live/{code}",
    tag = "live",
    params(
        ("code" = String, Path, description = "Join code of the venue")
    ),
    responses(
        (
            status = 101,
            description = "A websocket pushing every event of the venue as JSON `{type, data}`. Answers `ping` with `pong`."
        ),
        (status = 404, description = "No venue has this code")
    )
)]
async fn live(
    ws: WebSocketUpgrade,
    context: ServerContext,
    Path(code): Path<String>,
) -> ServerResult<Response> {
    let connection = context.collab.rooms.connect(&code).await?;
    let write_timeout = context.collab.config().channel_write_timeout;

    Ok(ws.on_upgrade(move |socket| serve(socket, connection, write_timeout)))
}

/// Pushes events into the socket until either side goes away
async fn serve(socket: WebSocket, mut connection: RoomConnectionHandle, write_timeout: Duration) {
    let (mut outgoing, mut incoming) = socket.split();

    loop {
        tokio::select! {
            event = connection.recv() => {
                let Some(text) = event else {
                    debug!("Channel {} was pruned", connection.id());
                    break;
                };

                if !send(&mut outgoing, Message::Text(text), write_timeout).await {
                    break;
                }
            }
            message = incoming.next() => match message {
                Some(Ok(Message::Text(text))) if text.trim() == PING => {
                    if !send(&mut outgoing, Message::Text(PONG.to_string()), write_timeout).await {
                        break;
                    }
                }
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            }
        }
    }
}

/// Writes a message within the timeout. Returns whether the socket is still usable.
async fn send(outgoing: &mut Outgoing, message: Message, write_timeout: Duration) -> bool {
    match timeout(write_timeout, outgoing.send(message)).await {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            debug!("Socket write failed: {}", e);
            false
        }
        Err(_) => {
            debug!("Socket write timed out after {:?}", write_timeout);
            false
        }
    }
}

#[utoipa::path(
    get,
    path = "/v1/display/{code}",
    tag = "live",
    params(
        ("code" = String, Path, description = "Join code of the venue")
    ),
    responses(
        (status = 200, body = Display),
        (status = 404, description = "No venue has this code")
    )
)]
async fn display(context: ServerContext, Path(code): Path<String>) -> ServerResult<Json<Display>> {
    let snapshot = context.collab.screens.snapshot(&code).await?;

    Ok(Json(snapshot.to_serialized()))
}

pub fn router() -> Router {
    Router::new()
        .route("/live/:code", get(live))
        .route("/display/:code", get(display))
}
