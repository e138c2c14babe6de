//! Tool dispatch
//!
//! Every tool runs the same sequence: validate arguments, acquire the
//! session, resolve identifiers against live state, call the server, and
//! normalise the result. No state is kept between calls.

mod args;
mod catalog;
mod music;
mod playback;
mod players;
mod queue;

pub use args::{
    parse_args, BrowseArgs, GroupArgs, PlayMediaArgs, PlaybackArgs, QueueArgs, QueueItemArgs, SearchArgs,
    TransferQueueArgs, VolumeArgs,
};
pub use catalog::{tool_definitions, TOOL_NAMES};

use crate::error::{MaError, Result};
use crate::session::SessionManager;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Successful tool result: structured data plus a short readable summary
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ToolOutput {
    pub summary: String,
    pub data: Value,
}

impl ToolOutput {
    pub fn new(summary: impl Into<String>, data: Value) -> Self {
        Self {
            summary: summary.into(),
            data,
        }
    }
}

/// Structured failure body returned to the assistant
pub fn failure_body(err: &MaError) -> Value {
    let mut body = json!({
        "kind": err.kind(),
        "message": err.to_string(),
    });
    match err {
        MaError::PartialFailure { succeeded, failed, .. } => {
            body["succeeded"] = json!(succeeded);
            body["failed"] = json!(failed);
        }
        MaError::Validation { field, .. } => {
            body["field"] = json!(field);
        }
        MaError::Ambiguous { candidates, .. } => {
            body["candidates"] = json!(candidates);
        }
        _ => {}
    }
    body
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct NoArgs {}

/// Routes tool calls to their handlers over a shared session manager
pub struct Dispatcher {
    sessions: SessionManager,
}

impl Dispatcher {
    pub fn new(sessions: SessionManager) -> Self {
        Self { sessions }
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    /// Run a tool by its MCP name with a raw argument object
    pub async fn call(&self, name: &str, arguments: Value) -> Result<ToolOutput> {
        tracing::debug!("{}: validating {}", name, arguments);

        let result = self.route(name, arguments).await;

        match &result {
            Ok(output) => tracing::info!("{} succeeded: {}", name, output.summary),
            Err(e) => tracing::warn!("{} failed ({}): {}", name, e.kind(), e),
        }
        result
    }

    async fn route(&self, name: &str, arguments: Value) -> Result<ToolOutput> {
        match name {
            "ma_list_players" => {
                parse_args::<NoArgs>(arguments)?;
                self.list_players().await
            }
            "ma_volume" => self.volume(parse_args(arguments)?).await,
            "ma_group" => self.group(parse_args(arguments)?).await,
            "ma_playback" => self.playback(parse_args(arguments)?).await,
            "ma_play_media" => self.play_media(parse_args(arguments)?).await,
            "ma_queue" => self.queue(parse_args(arguments)?).await,
            "ma_queue_item" => self.queue_item(parse_args(arguments)?).await,
            "ma_transfer_queue" => self.transfer_queue(parse_args(arguments)?).await,
            "ma_search" => self.search(parse_args(arguments)?).await,
            "ma_browse" => self.browse(parse_args(arguments)?).await,
            other => Err(MaError::validation("name", format!("unknown tool `{}`", other))),
        }
    }
}
