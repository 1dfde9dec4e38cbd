//! WebSocket upgrade handler

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::app::AppState;
use crate::game::SessionId;
use crate::session::Intent;
use crate::util::rate_limit::PlayerRateLimiter;
use crate::util::time::unix_millis;
use crate::ws::protocol::{ClientMsg, ServerMsg};

/// What to do with one inbound text frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameAction {
    /// Hand the intent to the coordinator
    Forward(Intent),
    /// Answer the sender directly, no state change
    Reply(ServerMsg),
}

/// Decide how to handle one text frame from a client.
///
/// Frames over the rate limit and frames that fail to decode are answered
/// with an `error` to the sender only.
pub fn on_text(text: &str, rate_limiter: &PlayerRateLimiter) -> FrameAction {
    if !rate_limiter.check_input() {
        return FrameAction::Reply(ServerMsg::error(
            "rate_limited",
            "Too many messages, this one was dropped",
        ));
    }

    match serde_json::from_str::<ClientMsg>(text) {
        Ok(ClientMsg::Ping { t }) => FrameAction::Reply(ServerMsg::Pong { t }),
        Ok(client_msg) => match Intent::from_client(client_msg) {
            Some(intent) => FrameAction::Forward(intent),
            None => FrameAction::Reply(ServerMsg::error("bad_message", "Unsupported message")),
        },
        Err(e) => FrameAction::Reply(ServerMsg::error("bad_message", e.to_string())),
    }
}

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, state: AppState) {
    let (session_id, outbound_rx) = state.registry.register();
    info!(session_id = %session_id, "New WebSocket connection");

    state.registry.send(
        session_id,
        ServerMsg::Welcome {
            session_id,
            server_time: unix_millis(),
        },
    );

    let (ws_sink, ws_stream) = socket.split();
    run_session(session_id, &state, ws_sink, ws_stream, outbound_rx).await;

    // Cleanup on disconnect
    if let Err(e) = state.coordinator.send(session_id, Intent::Disconnect) {
        error!(session_id = %session_id, error = %e, "Failed to report disconnect");
    }
    state.registry.unregister(session_id);

    info!(session_id = %session_id, "WebSocket connection closed");
}

/// Run the WebSocket session with read/write split
async fn run_session(
    session_id: SessionId,
    state: &AppState,
    mut ws_sink: futures::stream::SplitSink<WebSocket, Message>,
    mut ws_stream: futures::stream::SplitStream<WebSocket>,
    mut outbound_rx: mpsc::UnboundedReceiver<ServerMsg>,
) {
    let rate_limiter = PlayerRateLimiter::new(state.config.input_rate_limit);

    // Spawn writer task: outbound events -> WebSocket
    let writer_handle = tokio::spawn(async move {
        while let Some(msg) = outbound_rx.recv().await {
            if let Err(e) = send_msg(&mut ws_sink, &msg).await {
                debug!(session_id = %session_id, error = %e, "WebSocket send failed");
                break;
            }
        }
        debug!(session_id = %session_id, "Outbound channel closed");
    });

    // Reader loop: WebSocket -> coordinator
    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Text(text)) => match on_text(&text, &rate_limiter) {
                FrameAction::Forward(intent) => {
                    if state.coordinator.send(session_id, intent).is_err() {
                        debug!(session_id = %session_id, "Coordinator channel closed");
                        break;
                    }
                }
                FrameAction::Reply(reply) => {
                    if let ServerMsg::Error { code, message } = &reply {
                        warn!(session_id = %session_id, code = %code, error = %message, "Rejected client message");
                    }
                    state.registry.send(session_id, reply);
                }
            },
            Ok(Message::Binary(_)) => {
                warn!(session_id = %session_id, "Received binary message, ignoring");
            }
            Ok(Message::Ping(_)) => {
                debug!(session_id = %session_id, "Received ping");
            }
            Ok(Message::Pong(_)) => {
                debug!(session_id = %session_id, "Received pong");
            }
            Ok(Message::Close(_)) => {
                info!(session_id = %session_id, "Client initiated close");
                break;
            }
            Err(e) => {
                error!(session_id = %session_id, error = %e, "WebSocket error");
                break;
            }
        }
    }

    writer_handle.abort();
}

/// Send a message over WebSocket
async fn send_msg(
    sink: &mut futures::stream::SplitSink<WebSocket, Message>,
    msg: &ServerMsg,
) -> Result<(), String> {
    let json = serde_json::to_string(msg).map_err(|e| e.to_string())?;
    sink.send(Message::Text(json))
        .await
        .map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use serde_json::json;
    use tokio::net::TcpListener;
    use tokio_tungstenite::{connect_async, tungstenite, MaybeTlsStream, WebSocketStream};

    use crate::config::Config;
    use crate::game::{Move, RoomId};
    use crate::http::build_router;

    type Client = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

    fn error_code(action: &FrameAction) -> Option<&str> {
        match action {
            FrameAction::Reply(ServerMsg::Error { code, .. }) => Some(code),
            _ => None,
        }
    }

    #[test]
    fn test_intent_frames_forwarded() {
        let limiter = PlayerRateLimiter::default();
        let a = SessionId::new();
        let b = SessionId::new();

        assert_eq!(
            on_text(r#"{"type":"join-queue"}"#, &limiter),
            FrameAction::Forward(Intent::JoinQueue)
        );

        let frame = json!({ "type": "submit-move", "roomId": [a, b], "move": "rock" }).to_string();
        assert_eq!(
            on_text(&frame, &limiter),
            FrameAction::Forward(Intent::SubmitMove {
                room_id: RoomId::new(a, b),
                mv: Move::Rock,
            })
        );
    }

    #[test]
    fn test_ping_answered_with_pong() {
        let limiter = PlayerRateLimiter::default();
        assert_eq!(
            on_text(r#"{"type":"ping","t":42}"#, &limiter),
            FrameAction::Reply(ServerMsg::Pong { t: 42 })
        );
    }

    #[test]
    fn test_bad_frames_answered_with_error() {
        let limiter = PlayerRateLimiter::default();
        let unknown_move = json!({
            "type": "submit-move",
            "roomId": [SessionId::new(), SessionId::new()],
            "move": "lizard",
        })
        .to_string();

        assert_eq!(error_code(&on_text(&unknown_move, &limiter)), Some("bad_message"));
        assert_eq!(error_code(&on_text("not json", &limiter)), Some("bad_message"));
        assert_eq!(error_code(&on_text(r#"{"type":"fly"}"#, &limiter)), Some("bad_message"));
    }

    #[test]
    fn test_frame_over_rate_limit_answered_with_error() {
        let limiter = PlayerRateLimiter::new(1);
        let a = SessionId::new();
        let b = SessionId::new();

        assert_eq!(
            on_text(r#"{"type":"join-queue"}"#, &limiter),
            FrameAction::Forward(Intent::JoinQueue)
        );

        let frame = json!({ "type": "submit-move", "roomId": [a, b], "move": "paper" }).to_string();
        assert_eq!(error_code(&on_text(&frame, &limiter)), Some("rate_limited"));
    }

    async fn spawn_server() -> String {
        let config = Config::from_lookup(|_| None).unwrap();
        let (state, coordinator) = AppState::new(config);
        tokio::spawn(coordinator.run());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, build_router(state)).await.unwrap();
        });

        format!("ws://{}/ws", addr)
    }

    async fn send(client: &mut Client, value: serde_json::Value) {
        client
            .send(tungstenite::Message::Text(value.to_string()))
            .await
            .unwrap();
    }

    async fn next_msg(client: &mut Client) -> ServerMsg {
        loop {
            let frame = tokio::time::timeout(Duration::from_secs(5), client.next())
                .await
                .expect("timed out waiting for server message")
                .expect("connection closed")
                .unwrap();

            if let tungstenite::Message::Text(text) = frame {
                return serde_json::from_str(&text).unwrap();
            }
        }
    }

    async fn connect(url: &str) -> (Client, SessionId) {
        let (mut client, _) = connect_async(url).await.unwrap();
        match next_msg(&mut client).await {
            ServerMsg::Welcome { session_id, .. } => (client, session_id),
            other => panic!("expected welcome, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_websocket_session_lifecycle() {
        let url = spawn_server().await;

        let (mut a, a_id) = connect(&url).await;
        send(&mut a, json!({ "type": "join-queue" })).await;
        assert_eq!(next_msg(&mut a).await, ServerMsg::Waiting);

        let (mut b, b_id) = connect(&url).await;
        assert_ne!(a_id, b_id);
        send(&mut b, json!({ "type": "join-queue" })).await;

        let matched = ServerMsg::Matched {
            room_id: RoomId::new(a_id, b_id),
            players: [a_id, b_id],
        };
        assert_eq!(next_msg(&mut a).await, matched);
        assert_eq!(next_msg(&mut b).await, matched);

        send(&mut a, json!({ "type": "ping", "t": 7 })).await;
        assert_eq!(next_msg(&mut a).await, ServerMsg::Pong { t: 7 });

        // Rejected move reaches only the sender and records nothing
        send(
            &mut a,
            json!({ "type": "submit-move", "roomId": [a_id, b_id], "move": "lizard" }),
        )
        .await;
        let ServerMsg::Error { code, .. } = next_msg(&mut a).await else {
            panic!("expected error reply");
        };
        assert_eq!(code, "bad_message");

        send(
            &mut b,
            json!({ "type": "submit-move", "roomId": [a_id, b_id], "move": "rock" }),
        )
        .await;
        assert!(matches!(next_msg(&mut a).await, ServerMsg::OpponentMoved { .. }));

        // Closing one side dissolves the room for the other
        a.close(None).await.unwrap();
        assert_eq!(next_msg(&mut b).await, ServerMsg::OpponentLeft);
    }
}
