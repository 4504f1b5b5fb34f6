//! HTTP and WebSocket surface.
//!
//! Each WebSocket connection gets an outbound [`PlayerHandle`] whose messages
//! are written to the socket as JSON text frames. Inbound frames are parsed
//! as [`ClientMessage`] and dispatched to the [`Matchmaker`]; refusals come
//! back to the same connection as [`ServerMessage::Rejected`].

use axum::{
    Json, Router,
    body::Body,
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
};
use derive_new::new;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tower::ServiceBuilder;
use tracing::{debug, info, instrument, warn};

use crate::db::GameRepository;
use crate::error::Rejection;
use crate::protocol::{ClientMessage, PlayerHandle, ServerMessage, notify};
use crate::registry::Matchmaker;

/// Rows returned by `/leaderboard` when no limit is given.
pub const DEFAULT_LEADERBOARD_LIMIT: usize = 10;

/// Shared state for every route.
#[derive(Debug, Clone, new)]
pub struct AppState {
    matchmaker: Matchmaker,
    repository: Option<GameRepository>,
}

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/leaderboard", get(leaderboard_handler))
        .route("/health", get(|| async { "ok" }))
        .layer(ServiceBuilder::new().map_request(|req: Request<Body>| {
            info!(method = %req.method(), uri = %req.uri(), "Incoming HTTP request");
            req
        }))
        .with_state(state)
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state.matchmaker))
}

#[instrument(skip_all)]
async fn handle_socket(socket: WebSocket, matchmaker: Matchmaker) {
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();
    info!("WebSocket connection opened");

    let writer = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            let json = match serde_json::to_string(&message) {
                Ok(json) => json,
                Err(e) => {
                    warn!(error = %e, "Failed to encode server message");
                    continue;
                }
            };
            if sink.send(Message::Text(json.into())).await.is_err() {
                debug!("Socket closed while sending");
                break;
            }
        }
    });

    let mut connection = Connection::new(matchmaker, tx);
    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Message::Text(text)) => connection.handle_text(text.as_str()),
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                debug!(error = %e, "WebSocket read failed");
                break;
            }
        }
    }

    connection.closed();
    writer.abort();
    info!("WebSocket connection closed");
}

/// One player connection, bound to a display name after a join or rejoin.
#[derive(Debug)]
struct Connection {
    matchmaker: Matchmaker,
    handle: PlayerHandle,
    name: Option<String>,
}

impl Connection {
    fn new(matchmaker: Matchmaker, handle: PlayerHandle) -> Self {
        Self {
            matchmaker,
            handle,
            name: None,
        }
    }

    fn handle_text(&mut self, text: &str) {
        let message: ClientMessage = match serde_json::from_str(text) {
            Ok(message) => message,
            Err(e) => {
                debug!(error = %e, "Malformed client message");
                self.reject(format!("malformed message: {}", e));
                return;
            }
        };
        if let Err(rejection) = self.dispatch(message) {
            self.reject(rejection.to_string());
        }
    }

    #[instrument(skip(self), fields(player = self.name.as_deref().unwrap_or("-")))]
    fn dispatch(&mut self, message: ClientMessage) -> Result<(), Rejection> {
        match message {
            ClientMessage::Join { name } => {
                self.ensure_unbound_or(&name)?;
                self.matchmaker.enqueue(&name, self.handle.clone())?;
                self.name = Some(name);
            }
            ClientMessage::Move { session_id, column } => {
                let name = self.name.as_deref().ok_or(Rejection::NotInSession)?;
                self.matchmaker.apply_move(name, &session_id, column)?;
            }
            ClientMessage::Rejoin { name, session_id } => {
                self.ensure_unbound_or(&name)?;
                self.matchmaker
                    .rejoin(&name, &session_id, self.handle.clone())?;
                self.name = Some(name);
            }
            ClientMessage::Leave => {
                if let Some(name) = self.name.take() {
                    self.matchmaker.remove_player(&name);
                }
            }
        }
        Ok(())
    }

    /// A connection speaks for one name until it sends `leave`.
    fn ensure_unbound_or(&self, name: &str) -> Result<(), Rejection> {
        match self.name.as_deref() {
            Some(bound) if bound != name => {
                warn!(bound, requested = name, "Connection tried to switch identity");
                Err(Rejection::AlreadyJoined(bound.to_string()))
            }
            _ => Ok(()),
        }
    }

    fn reject(&self, reason: String) {
        notify(&self.handle, ServerMessage::Rejected { reason });
    }

    fn closed(&mut self) {
        if let Some(name) = self.name.take() {
            self.matchmaker.handle_connection_closed(&name, &self.handle);
        }
    }
}

#[derive(Debug, Deserialize)]
struct LeaderboardQuery {
    limit: Option<usize>,
}

async fn leaderboard_handler(
    State(state): State<AppState>,
    Query(query): Query<LeaderboardQuery>,
) -> Response {
    let Some(repository) = state.repository.clone() else {
        return (StatusCode::NOT_FOUND, "persistence is disabled").into_response();
    };
    let limit = query.limit.unwrap_or(DEFAULT_LEADERBOARD_LIMIT);

    match tokio::task::spawn_blocking(move || repository.leaderboard(limit)).await {
        Ok(Ok(entries)) => Json(entries).into_response(),
        Ok(Err(e)) => {
            warn!(error = %e, "Leaderboard query failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.message).into_response()
        }
        Err(e) => {
            warn!(error = %e, "Leaderboard task failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
