//! WebSocket upgrade handler

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::app::{AppState, Session};
use crate::util::rate_limit::ClientRateLimiter;
use crate::util::time::unix_millis;
use crate::ws::protocol::{ClientMsg, FeedMsg};

/// Direct replies queued per connection
const REPLY_BUFFER: usize = 32;

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    let conn_id = Uuid::new_v4();
    info!(conn_id = %conn_id, "WebSocket upgrade");
    ws.on_upgrade(move |socket| handle_socket(socket, conn_id, state))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, conn_id: Uuid, state: AppState) {
    let (mut ws_sink, ws_stream) = socket.split();

    // Subscribe before the welcome so nothing published in between is lost
    let feed_rx = state.session.subscribe_feed();

    let welcome = FeedMsg::Welcome {
        session_id: state.session.id(),
        server_time: unix_millis(),
        elapsed: state.session.elapsed_time(),
    };

    if let Err(e) = send_msg(&mut ws_sink, &welcome).await {
        error!(conn_id = %conn_id, error = %e, "Failed to send welcome");
        return;
    }

    run_session(conn_id, &state.session, ws_sink, ws_stream, feed_rx).await;

    info!(conn_id = %conn_id, "WebSocket connection closed");
}

/// Run the WebSocket session with read/write split
async fn run_session(
    conn_id: Uuid,
    session: &Session,
    mut ws_sink: SplitSink<WebSocket, Message>,
    mut ws_stream: SplitStream<WebSocket>,
    mut feed_rx: broadcast::Receiver<FeedMsg>,
) {
    let rate_limiter = ClientRateLimiter::new();
    let (reply_tx, mut reply_rx) = mpsc::channel::<FeedMsg>(REPLY_BUFFER);

    // Writer task: feed and direct replies -> WebSocket
    let writer_handle = tokio::spawn(async move {
        loop {
            let msg = tokio::select! {
                reply = reply_rx.recv() => match reply {
                    Some(msg) => msg,
                    None => break,
                },
                feed = feed_rx.recv() => match feed {
                    Ok(msg) => msg,
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(conn_id = %conn_id, lagged_count = n, "Client lagged, skipping {} messages", n);
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        debug!(conn_id = %conn_id, "Feed closed");
                        break;
                    }
                },
            };

            let last = matches!(msg, FeedMsg::SessionStopped { .. });
            if let Err(e) = send_msg(&mut ws_sink, &msg).await {
                debug!(conn_id = %conn_id, error = %e, "WebSocket send failed");
                break;
            }
            if last {
                let _ = ws_sink.close().await;
                break;
            }
        }
    });

    // Reader loop: WebSocket -> replies
    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                if !rate_limiter.check() {
                    warn!(conn_id = %conn_id, "Rate limited client message");
                    continue;
                }

                let reply = match serde_json::from_str::<ClientMsg>(&text) {
                    Ok(client_msg) => handle_client_msg(session, client_msg),
                    Err(e) => {
                        warn!(conn_id = %conn_id, error = %e, "Failed to parse client message");
                        FeedMsg::Error {
                            code: "bad_message".to_string(),
                            message: e.to_string(),
                        }
                    }
                };

                if reply_tx.send(reply).await.is_err() {
                    debug!(conn_id = %conn_id, "Writer closed");
                    break;
                }
            }
            Ok(Message::Binary(_)) => {
                warn!(conn_id = %conn_id, "Received binary message, ignoring");
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Ok(Message::Close(_)) => {
                info!(conn_id = %conn_id, "Client initiated close");
                break;
            }
            Err(e) => {
                error!(conn_id = %conn_id, error = %e, "WebSocket error");
                break;
            }
        }
    }

    writer_handle.abort();
}

/// Reply to one client message
pub fn handle_client_msg(session: &Session, msg: ClientMsg) -> FeedMsg {
    match msg {
        ClientMsg::Ping { t } => FeedMsg::Pong { t },
        ClientMsg::SelectDriver { driver_number } => FeedMsg::DriverDetail {
            detail: session.driver_detail(driver_number),
        },
    }
}

/// Send a message over WebSocket
async fn send_msg(sink: &mut SplitSink<WebSocket, Message>, msg: &FeedMsg) -> Result<(), String> {
    let json = serde_json::to_string(msg).map_err(|e| e.to_string())?;
    sink.send(Message::Text(json))
        .await
        .map_err(|e| e.to_string())
}
