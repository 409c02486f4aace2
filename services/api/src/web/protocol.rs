//! services/api/src/web/protocol.rs
//!
//! Defines the WebSocket message protocol between the browser client and the API
//! server for the live report feeds.

use huella_core::{FeedFilters, Report};
use serde::{Deserialize, Serialize};

//=========================================================================================
// Messages Sent FROM the Client (Browser) TO the Server
//=========================================================================================

/// Represents the structured text messages a client can send to the server.
#[derive(Deserialize, Debug)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Replaces the active filters. The current subscription is closed and a
    /// new one is opened; a fresh `snapshot` follows.
    SetFilters(FeedFilters),

    /// Fetches the page after the last loaded record.
    LoadMore,

    /// Narrows the loaded records by free text. Applied after a short pause
    /// in typing.
    Search { query: String },
}

//=========================================================================================
// Messages Sent FROM the Server TO the Client (Browser)
//=========================================================================================
// NOTE: every message carries the whole visible list (the loaded records narrowed by
// the current search text), not a diff.
//=========================================================================================

/// Represents the structured text messages the server can send to the client.
#[derive(Serialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Page one was (re)loaded, or the search text changed.
    Snapshot {
        generation: u64,
        reports: Vec<Report>,
        has_more: bool,
    },

    /// A further page was appended by `load_more`.
    PageAppended { reports: Vec<Report>, has_more: bool },

    /// A load failed; the client shows the message.
    Error { message: String },
}
