use crate::error::MaError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Remote error codes with a dedicated meaning on this side
pub mod error_code {
    pub const MEDIA_NOT_FOUND: i64 = 2;
    pub const LOGIN_FAILED: i64 = 6;
    pub const PLAYER_UNAVAILABLE: i64 = 10;
    pub const UNPLAYABLE_MEDIA: i64 = 13;
    pub const INVALID_PROVIDER_URI: i64 = 14;
    pub const AUTHENTICATION_REQUIRED: i64 = 20;
    pub const INSUFFICIENT_PERMISSIONS: i64 = 21;
}

/// Command sent to the server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub message_id: String,
    pub command: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub args: Option<Value>,
}

impl Request {
    /// Create a new request for the given command, e.g. `players/all`
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            message_id: Uuid::new_v4().simple().to_string(),
            command: command.into(),
            args: None,
        }
    }

    /// Set the command arguments
    pub fn with_args(mut self, args: Value) -> Self {
        self.args = Some(args);
        self
    }

    pub fn id(&self) -> &str {
        &self.message_id
    }
}

/// First frame the server sends after the socket opens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerInfo {
    pub server_id: String,
    pub server_version: String,
    pub schema_version: i64,
    #[serde(default)]
    pub min_supported_schema_version: Option<i64>,
    #[serde(default)]
    pub base_url: Option<String>,
}

/// Frame received from the server
#[derive(Debug, Clone)]
pub enum Incoming {
    ServerInfo(ServerInfo),
    Result {
        message_id: String,
        result: Value,
        partial: bool,
    },
    Error {
        message_id: String,
        code: i64,
        details: String,
    },
    Event {
        event: String,
        object_id: Option<String>,
    },
}

#[derive(Deserialize)]
struct ResultFrame {
    message_id: String,
    #[serde(default)]
    result: Value,
    #[serde(default)]
    partial: bool,
}

#[derive(Deserialize)]
struct ErrorFrame {
    message_id: String,
    error_code: i64,
    #[serde(default)]
    details: Option<String>,
}

#[derive(Deserialize)]
struct EventFrame {
    event: String,
    #[serde(default)]
    object_id: Option<String>,
}

impl Incoming {
    /// Classify a raw text frame by its shape
    pub fn parse(text: &str) -> Result<Self, MaError> {
        let value: Value = serde_json::from_str(text)?;
        let obj = value
            .as_object()
            .ok_or_else(|| MaError::InvalidResponse("frame is not a JSON object".to_string()))?;

        if obj.contains_key("error_code") {
            let frame: ErrorFrame = serde_json::from_value(value)?;
            return Ok(Incoming::Error {
                message_id: frame.message_id,
                code: frame.error_code,
                details: frame.details.unwrap_or_default(),
            });
        }
        if obj.contains_key("message_id") {
            let frame: ResultFrame = serde_json::from_value(value)?;
            return Ok(Incoming::Result {
                message_id: frame.message_id,
                result: frame.result,
                partial: frame.partial,
            });
        }
        if obj.contains_key("event") {
            let frame: EventFrame = serde_json::from_value(value)?;
            return Ok(Incoming::Event {
                event: frame.event,
                object_id: frame.object_id,
            });
        }
        if obj.contains_key("server_id") {
            return Ok(Incoming::ServerInfo(serde_json::from_value(value)?));
        }

        Err(MaError::InvalidResponse(format!("unrecognised frame: {}", text)))
    }
}

/// Translate a remote error frame into the local taxonomy
pub fn map_remote_error(code: i64, details: String) -> MaError {
    match code {
        error_code::MEDIA_NOT_FOUND
        | error_code::UNPLAYABLE_MEDIA
        | error_code::INVALID_PROVIDER_URI => MaError::InvalidMedia(details),
        error_code::PLAYER_UNAVAILABLE => MaError::NotFound(details),
        error_code::LOGIN_FAILED
        | error_code::AUTHENTICATION_REQUIRED
        | error_code::INSUFFICIENT_PERMISSIONS => MaError::Auth(details),
        _ => MaError::Rejected { code, detail: details },
    }
}
