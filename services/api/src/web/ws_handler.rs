//! services/api/src/web/ws_handler.rs
//!
//! This is the main entry point and control loop for a live feed WebSocket
//! connection. Each connection owns one `FeedSession`.

use crate::web::{
    middleware::CurrentUser,
    protocol::{ClientMessage, ServerMessage},
    state::AppState,
};
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
    Extension,
};
use futures::{stream::SplitSink, SinkExt, StreamExt};
use huella_core::feed::{FeedFilters, FeedSession, SearchDebounce};
use huella_core::UserId;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{error, info, warn};

/// The public feed.
pub async fn feed_ws_handler(
    ws: WebSocketUpgrade,
    State(app_state): State<Arc<AppState>>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, app_state, None))
}

/// The signed-in user's own reports. Client filters cannot widen it.
pub async fn my_feed_ws_handler(
    ws: WebSocketUpgrade,
    State(app_state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, app_state, Some(user.id)))
}

fn scoped(mut filters: FeedFilters, author: Option<UserId>) -> FeedFilters {
    filters.author_id = author;
    filters
}

fn snapshot(session: &FeedSession) -> ServerMessage {
    ServerMessage::Snapshot {
        generation: session.generation(),
        reports: session.visible().into_iter().cloned().collect(),
        has_more: session.has_more(),
    }
}

async fn send_message(
    sender: &mut SplitSink<WebSocket, Message>,
    message: &ServerMessage,
) -> Result<(), axum::Error> {
    match serde_json::to_string(message) {
        Ok(json) => sender.send(Message::Text(json.into())).await,
        Err(e) => {
            error!("Failed to serialize server message: {:?}", e);
            Ok(())
        }
    }
}

async fn handle_client_message(
    message: ClientMessage,
    session: &mut FeedSession,
    debounce: &mut SearchDebounce,
    author: Option<UserId>,
) -> Option<ServerMessage> {
    match message {
        ClientMessage::SetFilters(filters) => {
            // The snapshot for the new filters arrives through the event channel.
            session.set_filters(scoped(filters, author)).await;
            None
        }
        ClientMessage::LoadMore => match session.load_more().await {
            Ok(added) => {
                info!(added, "Appended a feed page.");
                Some(ServerMessage::PageAppended {
                    reports: session.visible().into_iter().cloned().collect(),
                    has_more: session.has_more(),
                })
            }
            Err(e) => Some(ServerMessage::Error {
                message: e.to_string(),
            }),
        },
        ClientMessage::Search { query } => {
            debounce.push(&query, Instant::now());
            None
        }
    }
}

async fn handle_socket(socket: WebSocket, app_state: Arc<AppState>, author: Option<UserId>) {
    info!(author = ?author, "New feed WebSocket connection established.");

    let (mut sender, mut receiver) = socket.split();
    let (mut session, mut events) =
        FeedSession::new(app_state.reports.clone(), app_state.config.feed_page_size);
    let mut debounce = SearchDebounce::new(app_state.config.search_debounce);

    session.set_filters(scoped(FeedFilters::default(), author)).await;

    // --- Main Message Loop ---
    loop {
        let deadline = debounce.deadline();
        let outgoing = tokio::select! {
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    match serde_json::from_str::<ClientMessage>(&text) {
                        Ok(message) => {
                            handle_client_message(message, &mut session, &mut debounce, author).await
                        }
                        Err(e) => {
                            warn!("Ignoring malformed client message: {}", e);
                            Some(ServerMessage::Error {
                                message: "Mensaje no reconocido".to_string(),
                            })
                        }
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => None,
                Some(Err(e)) => {
                    warn!("WebSocket receive failed: {:?}", e);
                    break;
                }
            },
            Some(event) = events.recv() => match session.apply_event(event) {
                Ok(true) => Some(snapshot(&session)),
                Ok(false) => None,
                Err(e) => Some(ServerMessage::Error {
                    message: e.to_string(),
                }),
            },
            // The sleep future is built even when the branch is disabled.
            _ = tokio::time::sleep_until(
                deadline.unwrap_or_else(|| Instant::now() + Duration::from_secs(3600))
            ), if deadline.is_some() => {
                match debounce.take_due(Instant::now()) {
                    Some(query) => {
                        session.set_search(query);
                        Some(snapshot(&session))
                    }
                    None => None,
                }
            }
        };

        if let Some(message) = outgoing {
            if send_message(&mut sender, &message).await.is_err() {
                warn!("Client went away while sending.");
                break;
            }
        }
    }

    session.close().await;
    info!(author = ?author, "Feed WebSocket connection closed.");
}
