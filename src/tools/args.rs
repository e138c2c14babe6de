//! Tool arguments and their validation
//!
//! Everything in here is checked before a session is acquired, so a rejected
//! argument never reaches the server.

use crate::client::QueueCommand;
use crate::error::{MaError, Result};
use crate::types::{MediaRef, MediaType, QueueOption, RepeatMode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

pub const SEARCH_DEFAULT_LIMIT: usize = 10;
pub const SEARCH_MAX_LIMIT: usize = 50;
pub const BROWSE_DEFAULT_LIMIT: usize = 20;
pub const BROWSE_MAX_LIMIT: usize = 100;
pub const QUEUE_DEFAULT_LIMIT: usize = 20;
pub const QUEUE_MAX_LIMIT: usize = 100;

/// Deserialize a tool's argument object, naming the field on failure where serde tells us
pub fn parse_args<T: DeserializeOwned>(arguments: Value) -> Result<T> {
    let arguments = if arguments.is_null() {
        Value::Object(Default::default())
    } else {
        arguments
    };
    serde_json::from_value(arguments).map_err(|e| {
        let message = e.to_string();
        let field = ["missing field `", "unknown field `"]
            .iter()
            .find_map(|prefix| message.strip_prefix(prefix))
            .and_then(|rest| rest.split('`').next())
            .unwrap_or("arguments")
            .to_string();
        MaError::Validation { field, message }
    })
}

/// Parse a closed enumeration from its wire string
fn parse_choice<T: DeserializeOwned>(field: &str, raw: &str, allowed: &str) -> Result<T> {
    serde_json::from_value(Value::String(raw.trim().to_lowercase()))
        .map_err(|_| MaError::validation(field, format!("`{}` is not one of {}", raw, allowed)))
}

fn require_reference(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(MaError::validation(field, "must not be empty"));
    }
    Ok(())
}

fn bounded_limit(field: &str, value: Option<i64>, default: usize, max: usize) -> Result<usize> {
    match value {
        None => Ok(default),
        Some(v) if v >= 1 && (v as usize) <= max => Ok(v as usize),
        Some(v) => Err(MaError::validation(field, format!("{} is outside 1-{}", v, max))),
    }
}

fn non_negative(field: &str, value: Option<i64>) -> Result<usize> {
    match value {
        None => Ok(0),
        Some(v) if v >= 0 => Ok(v as usize),
        Some(v) => Err(MaError::validation(field, format!("{} must not be negative", v))),
    }
}

/// Accepts either a single value or a list
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::One(value) => vec![value],
            OneOrMany::Many(values) => values,
        }
    }
}

// ========== Volume ==========

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VolumeArgs {
    pub player_id: String,
    #[serde(default)]
    pub level: Option<i64>,
    #[serde(default)]
    pub adjust: Option<Value>,
    #[serde(default)]
    pub mute: Option<bool>,
}

/// One volume change per call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeChange {
    Absolute(u8),
    StepUp,
    StepDown,
    Relative(i64),
    Mute(bool),
}

impl VolumeArgs {
    pub fn validate(&self) -> Result<VolumeChange> {
        require_reference("player_id", &self.player_id)?;

        let given: Vec<&str> = [
            ("level", self.level.is_some()),
            ("adjust", self.adjust.is_some()),
            ("mute", self.mute.is_some()),
        ]
        .iter()
        .filter(|(_, present)| *present)
        .map(|(name, _)| *name)
        .collect();

        match given.as_slice() {
            [] => {
                return Err(MaError::validation(
                    "level",
                    "provide one of level (0-100), adjust ('up', 'down' or a signed step) or mute",
                ))
            }
            [_] => {}
            [first, second, ..] => {
                return Err(MaError::validation(
                    *second,
                    format!("cannot be combined with `{}`; provide exactly one mode", first),
                ))
            }
        }

        if let Some(level) = self.level {
            if !(0..=100).contains(&level) {
                return Err(MaError::validation("level", format!("{} is outside 0-100", level)));
            }
            return Ok(VolumeChange::Absolute(level as u8));
        }

        if let Some(adjust) = &self.adjust {
            return match adjust {
                Value::String(s) if s.eq_ignore_ascii_case("up") => Ok(VolumeChange::StepUp),
                Value::String(s) if s.eq_ignore_ascii_case("down") => Ok(VolumeChange::StepDown),
                Value::Number(n) => match n.as_i64() {
                    Some(delta) if delta != 0 && (-100..=100).contains(&delta) => {
                        Ok(VolumeChange::Relative(delta))
                    }
                    _ => Err(MaError::validation("adjust", "step must be a non-zero integer in -100..100")),
                },
                _ => Err(MaError::validation("adjust", "expected 'up', 'down' or a signed integer step")),
            };
        }

        Ok(VolumeChange::Mute(self.mute.unwrap_or(false)))
    }
}

// ========== Group ==========

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupAction {
    Join,
    #[serde(alias = "ungroup")]
    Leave,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GroupArgs {
    pub action: String,
    pub player_ids: OneOrMany<String>,
    #[serde(default)]
    pub target_player_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupRequest {
    Join { sources: Vec<String>, target: String },
    Leave { players: Vec<String> },
}

impl GroupArgs {
    pub fn validate(self) -> Result<GroupRequest> {
        let action: GroupAction = parse_choice("action", &self.action, "join, leave")?;

        let mut players: Vec<String> = Vec::new();
        for id in self.player_ids.into_vec() {
            require_reference("player_ids", &id)?;
            let id = id.trim().to_string();
            if !players.contains(&id) {
                players.push(id);
            }
        }
        if players.is_empty() {
            return Err(MaError::validation("player_ids", "list at least one player"));
        }

        match action {
            GroupAction::Join => {
                let target = self
                    .target_player_id
                    .map(|t| t.trim().to_string())
                    .filter(|t| !t.is_empty())
                    .ok_or_else(|| MaError::validation("target_player_id", "required for join"))?;
                if players.contains(&target) {
                    return Err(MaError::validation(
                        "target_player_id",
                        format!("`{}` cannot join itself", target),
                    ));
                }
                Ok(GroupRequest::Join {
                    sources: players,
                    target,
                })
            }
            GroupAction::Leave => Ok(GroupRequest::Leave { players }),
        }
    }
}

// ========== Playback ==========

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackCommand {
    Play,
    Pause,
    Stop,
    #[serde(alias = "play_pause")]
    Toggle,
    Next,
    Previous,
    Seek,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlaybackArgs {
    #[serde(alias = "player_id")]
    pub queue_id: String,
    pub command: String,
    /// Seek position in seconds
    #[serde(default)]
    pub position: Option<f64>,
}

/// Validated playback request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackRequest {
    Seek(u64),
    Command(QueueCommand),
}

impl PlaybackArgs {
    pub fn validate(&self) -> Result<PlaybackRequest> {
        require_reference("queue_id", &self.queue_id)?;
        let command: PlaybackCommand = parse_choice(
            "command",
            &self.command,
            "play, pause, stop, toggle, next, previous, seek",
        )?;

        let remote = match command {
            PlaybackCommand::Seek => {
                return match self.position {
                    None => Err(MaError::validation("position", "seek requires a position in seconds")),
                    Some(p) if !p.is_finite() || p < 0.0 => Err(MaError::validation(
                        "position",
                        format!("{} is not a valid position in seconds", p),
                    )),
                    Some(p) => Ok(PlaybackRequest::Seek(p.floor() as u64)),
                };
            }
            PlaybackCommand::Play => QueueCommand::Play,
            PlaybackCommand::Pause => QueueCommand::Pause,
            PlaybackCommand::Stop => QueueCommand::Stop,
            PlaybackCommand::Toggle => QueueCommand::PlayPause,
            PlaybackCommand::Next => QueueCommand::Next,
            PlaybackCommand::Previous => QueueCommand::Previous,
        };

        if self.position.is_some() {
            return Err(MaError::validation("position", "only valid with the seek command"));
        }
        Ok(PlaybackRequest::Command(remote))
    }
}

// ========== Play media ==========

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlayMediaArgs {
    #[serde(alias = "player_id")]
    pub queue_id: String,
    pub media: OneOrMany<String>,
    #[serde(default)]
    pub option: Option<String>,
    #[serde(default)]
    pub radio_mode: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayMediaRequest {
    pub media: Vec<MediaRef>,
    pub option: QueueOption,
    pub radio_mode: bool,
}

impl PlayMediaArgs {
    pub fn validate(self) -> Result<PlayMediaRequest> {
        require_reference("queue_id", &self.queue_id)?;
        let option = match &self.option {
            Some(raw) => parse_choice("option", raw, "play, replace, next, add")?,
            None => QueueOption::default(),
        };

        let raw = self.media.into_vec();
        if raw.is_empty() {
            return Err(MaError::validation("media", "provide at least one media URI"));
        }
        let media = raw
            .iter()
            .map(|uri| MediaRef::parse(uri))
            .collect::<Result<Vec<_>>>()?;

        Ok(PlayMediaRequest {
            media,
            option,
            radio_mode: self.radio_mode,
        })
    }
}

// ========== Queue ==========

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueAction {
    Get,
    Shuffle,
    Repeat,
    Clear,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QueueArgs {
    #[serde(alias = "player_id")]
    pub queue_id: String,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub shuffle: Option<bool>,
    #[serde(default)]
    pub repeat: Option<String>,
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub offset: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueRequest {
    Get { limit: usize, offset: usize },
    Shuffle(bool),
    Repeat(RepeatMode),
    Clear,
}

impl QueueArgs {
    pub fn validate(&self) -> Result<QueueRequest> {
        require_reference("queue_id", &self.queue_id)?;
        let action = match &self.action {
            Some(raw) => parse_choice("action", raw, "get, shuffle, repeat, clear")?,
            None => QueueAction::Get,
        };

        if action != QueueAction::Shuffle && self.shuffle.is_some() {
            return Err(MaError::validation("shuffle", "only valid with action 'shuffle'"));
        }
        if action != QueueAction::Repeat && self.repeat.is_some() {
            return Err(MaError::validation("repeat", "only valid with action 'repeat'"));
        }

        match action {
            QueueAction::Get => Ok(QueueRequest::Get {
                limit: bounded_limit("limit", self.limit, QUEUE_DEFAULT_LIMIT, QUEUE_MAX_LIMIT)?,
                offset: non_negative("offset", self.offset)?,
            }),
            QueueAction::Shuffle => self
                .shuffle
                .map(QueueRequest::Shuffle)
                .ok_or_else(|| MaError::validation("shuffle", "required (true or false) for action 'shuffle'")),
            QueueAction::Repeat => {
                let raw = self
                    .repeat
                    .as_deref()
                    .ok_or_else(|| MaError::validation("repeat", "required (off, one, all) for action 'repeat'"))?;
                Ok(QueueRequest::Repeat(parse_choice("repeat", raw, "off, one, all")?))
            }
            QueueAction::Clear => Ok(QueueRequest::Clear),
        }
    }
}

// ========== Queue item ==========

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueItemAction {
    Move,
    MoveUp,
    MoveDown,
    MoveNext,
    Remove,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QueueItemArgs {
    #[serde(alias = "player_id")]
    pub queue_id: String,
    pub item_id: String,
    pub action: String,
    /// Destination index for `move`
    #[serde(default)]
    pub position: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueItemRequest {
    MoveTo(usize),
    MoveUp,
    MoveDown,
    MoveNext,
    Remove,
}

impl QueueItemArgs {
    pub fn validate(&self) -> Result<QueueItemRequest> {
        require_reference("queue_id", &self.queue_id)?;
        require_reference("item_id", &self.item_id)?;
        let action: QueueItemAction = parse_choice(
            "action",
            &self.action,
            "move, move_up, move_down, move_next, remove",
        )?;

        match (action, self.position) {
            (QueueItemAction::Move, None) => {
                Err(MaError::validation("position", "move requires a destination index"))
            }
            (QueueItemAction::Move, Some(p)) if p < 0 => {
                Err(MaError::validation("position", format!("{} must not be negative", p)))
            }
            (QueueItemAction::Move, Some(p)) => Ok(QueueItemRequest::MoveTo(p as usize)),
            (_, Some(_)) => Err(MaError::validation("position", "only valid with action 'move'")),
            (QueueItemAction::MoveUp, None) => Ok(QueueItemRequest::MoveUp),
            (QueueItemAction::MoveDown, None) => Ok(QueueItemRequest::MoveDown),
            (QueueItemAction::MoveNext, None) => Ok(QueueItemRequest::MoveNext),
            (QueueItemAction::Remove, None) => Ok(QueueItemRequest::Remove),
        }
    }
}

// ========== Transfer ==========

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransferQueueArgs {
    pub source_queue_id: String,
    pub target_queue_id: String,
}

impl TransferQueueArgs {
    pub fn validate(&self) -> Result<()> {
        require_reference("source_queue_id", &self.source_queue_id)?;
        require_reference("target_queue_id", &self.target_queue_id)?;
        if self.source_queue_id.trim() == self.target_queue_id.trim() {
            return Err(MaError::validation("target_queue_id", "must differ from source_queue_id"));
        }
        Ok(())
    }
}

// ========== Search / browse ==========

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SearchArgs {
    pub query: String,
    #[serde(default, alias = "media_type")]
    pub media_types: Option<OneOrMany<String>>,
    #[serde(default)]
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub query: String,
    pub media_types: Vec<MediaType>,
    pub limit: usize,
}

impl SearchArgs {
    pub fn validate(self) -> Result<SearchRequest> {
        let query = self.query.trim().to_string();
        if query.is_empty() {
            return Err(MaError::validation("query", "must not be empty"));
        }

        let mut media_types = Vec::new();
        for raw in self.media_types.map(OneOrMany::into_vec).unwrap_or_default() {
            let media_type: MediaType = parse_choice("media_types", &raw, "artist, album, track, playlist, radio")?;
            if !MediaType::SEARCHABLE.contains(&media_type) {
                return Err(MaError::validation(
                    "media_types",
                    format!("`{}` is not one of artist, album, track, playlist, radio", raw),
                ));
            }
            if !media_types.contains(&media_type) {
                media_types.push(media_type);
            }
        }
        if media_types.is_empty() {
            media_types = MediaType::SEARCHABLE.to_vec();
        }

        Ok(SearchRequest {
            query,
            media_types,
            limit: bounded_limit("limit", self.limit, SEARCH_DEFAULT_LIMIT, SEARCH_MAX_LIMIT)?,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BrowseArgs {
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub offset: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowseRequest {
    pub path: Option<String>,
    pub limit: usize,
    pub offset: usize,
}

impl BrowseArgs {
    pub fn validate(self) -> Result<BrowseRequest> {
        Ok(BrowseRequest {
            path: self.path.map(|p| p.trim().to_string()).filter(|p| !p.is_empty()),
            limit: bounded_limit("limit", self.limit, BROWSE_DEFAULT_LIMIT, BROWSE_MAX_LIMIT)?,
            offset: non_negative("offset", self.offset)?,
        })
    }
}
