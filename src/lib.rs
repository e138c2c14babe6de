#![recursion_limit = "256"]
//! MCP server for Music Assistant
//!
//! Exposes the players, queues and music library of a Music Assistant server
//! as tools an assistant can call over the Model Context Protocol. It
//! supports:
//!
//! - Listing players with volume, state and grouping
//! - Volume, mute and transport control
//! - Grouping players for synchronised playback
//! - Queue inspection, reordering and transfer
//! - Catalog search and provider browsing
//!
//! Every tool call validates its arguments, resolves identifiers against live
//! server state and returns either structured data with a short summary, or a
//! classified error.
//!
//! # Quick Start
//!
//! ```no_run
//! use music_assistant_mcp::{Config, Dispatcher, SessionManager, WsConnector};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::new("http://192.168.1.50:8095", None);
//!     let dispatcher = Dispatcher::new(SessionManager::new(config, WsConnector));
//!
//!     let players = dispatcher.call("ma_list_players", json!({})).await?;
//!     println!("{}", players.summary);
//!
//!     dispatcher
//!         .call("ma_volume", json!({ "player_id": "Kitchen", "level": 25 }))
//!         .await?;
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - **Server**: JSON-RPC framing over stdio
//! - **Tools**: argument validation, resolution and result shaping
//! - **Resolver**: id and name lookup against live state
//! - **Session**: connection lifecycle, reconnection and command serialisation
//! - **Client**: typed Music Assistant commands
//! - **Connection**: low-level WebSocket protocol handling
//! - **Protocol**: JSON message structures
//! - **Types**: domain types and data structures

pub mod client;
pub mod config;
mod connection;
pub mod error;
pub mod protocol;
pub mod resolver;
pub mod server;
pub mod session;
pub mod tools;
pub mod types;

// Public exports
pub use client::{MusicApi, QueueCommand, RemoteClient};
pub use config::Config;
pub use error::{ErrorKind, FailedStep, MaError, Result};
pub use protocol::ServerInfo;
pub use server::McpServer;
pub use session::{ConnectionState, Connector, Session, SessionEvent, SessionManager, WsConnector};
pub use tools::{Dispatcher, ToolOutput};
pub use types::{
    MediaItem, MediaRef, MediaType, PlaybackState, Player, PlayerId, PlayerQueue, PlayerSource, QueueId, QueueItem,
    QueueOption, RepeatMode, SearchResults,
};
