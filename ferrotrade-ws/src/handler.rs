use crate::hub::{Hub, Session};
use crate::subscription::{ClientMessage, ServerMessage};
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Extension, State};
use axum::response::IntoResponse;
use ferrotrade_integration::Id;
use futures::{SinkExt, StreamExt};
use tracing::{debug, warn};

/// Shared axum state for the WebSocket route: just the hub, cloned per connection.
#[derive(Clone)]
pub struct WsState {
    pub hub: Hub,
}

/// The authenticated caller a connection was upgraded under. An upstream auth layer in the
/// control plane's router is responsible for verifying the client's credentials and inserting
/// this extension before the request reaches [`upgrade`].
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedUser(pub Id);

/// Upgrades an inbound HTTP request to a WebSocket connection authenticated as `user`.
pub async fn upgrade(
    State(state): State<WsState>,
    Extension(AuthenticatedUser(user)): Extension<AuthenticatedUser>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| serve(socket, state.hub, user))
}

async fn serve(socket: WebSocket, hub: Hub, user: Id) {
    let (mut sink, mut stream) = socket.split();
    let mut session = Session::new(hub, user);
    debug!(session_id = %session.id, %user, "websocket session opened");

    loop {
        tokio::select! {
            event = session.recv() => {
                let Some(event) = event else { break };
                let (server_message, should_close) = match event {
                    crate::subscription::HubEvent::Data { topic, payload } => {
                        (ServerMessage::Event { topic, payload }, false)
                    }
                    crate::subscription::HubEvent::Evicted { reason } => {
                        (ServerMessage::Evicted { reason }, true)
                    }
                };
                if send_json(&mut sink, &server_message).await.is_err() {
                    break;
                }
                if should_close {
                    break;
                }
            }
            frame = stream.next() => {
                let Some(frame) = frame else { break };
                match frame {
                    Ok(Message::Text(text)) => {
                        match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(message) => {
                                let reply = session.handle(message);
                                if send_json(&mut sink, &reply).await.is_err() {
                                    break;
                                }
                            }
                            Err(err) => {
                                let reply = ServerMessage::Error { message: err.to_string() };
                                if send_json(&mut sink, &reply).await.is_err() {
                                    break;
                                }
                            }
                        }
                    }
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(err) => {
                        warn!(session_id = %session.id, error = %err, "websocket stream error");
                        break;
                    }
                }
            }
        }
    }

    debug!(session_id = %session.id, "websocket session closed");
}

async fn send_json(
    sink: &mut futures::stream::SplitSink<WebSocket, Message>,
    message: &ServerMessage,
) -> Result<(), axum::Error> {
    let text = serde_json::to_string(message).expect("ServerMessage always serializes");
    sink.send(Message::Text(text)).await
}
