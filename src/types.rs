use crate::error::{MaError, Result};
use serde::{Deserialize, Serialize};

/// Player identifier
pub type PlayerId = String;

/// Queue identifier
pub type QueueId = String;

/// Playback state as reported by the server
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    #[default]
    Idle,
    Playing,
    Paused,
    Buffering,
    #[serde(other)]
    Unknown,
}

/// A speaker or zone
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Player {
    pub player_id: PlayerId,
    #[serde(alias = "display_name")]
    pub name: String,
    #[serde(default = "default_true")]
    pub available: bool,
    #[serde(default)]
    pub volume_level: Option<u8>,
    #[serde(default)]
    pub volume_muted: Option<bool>,
    #[serde(default)]
    pub state: PlaybackState,
    /// Leader this player follows, if it is a group member
    #[serde(default)]
    pub synced_to: Option<PlayerId>,
    /// Followers, if this player leads a group
    #[serde(default, alias = "group_members")]
    pub group_childs: Vec<PlayerId>,
    #[serde(default)]
    pub active_source: Option<String>,
    #[serde(default)]
    pub source_list: Vec<PlayerSource>,
}

/// An input a player can switch to (line-in, TV, a streaming service)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlayerSource {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

fn default_true() -> bool {
    true
}

impl Player {
    /// Followers excluding the leader itself (the server lists the leader as a child)
    pub fn followers(&self) -> Vec<&PlayerId> {
        self.group_childs
            .iter()
            .filter(|id| **id != self.player_id)
            .collect()
    }

    pub fn is_group_leader(&self) -> bool {
        !self.followers().is_empty()
    }

    /// Leader named by this player's own `synced_to`, if any
    pub fn group_leader(&self) -> Option<&PlayerId> {
        self.synced_to.as_ref().filter(|id| **id != self.player_id)
    }

    /// Friendly name of an external source; `None` while Music Assistant itself is playing
    pub fn active_source_name(&self) -> Option<&str> {
        let source = self.active_source.as_deref().filter(|s| *s != self.player_id)?;
        let named = self
            .source_list
            .iter()
            .find(|s| s.id == source && !s.name.is_empty())
            .map(|s| s.name.as_str());
        Some(named.unwrap_or(source))
    }
}

/// Repeat mode of a queue
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RepeatMode {
    #[default]
    Off,
    One,
    All,
}

impl RepeatMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RepeatMode::Off => "off",
            RepeatMode::One => "one",
            RepeatMode::All => "all",
        }
    }
}

/// A playback queue, usually sharing its id with a player
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlayerQueue {
    pub queue_id: QueueId,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub shuffle_enabled: bool,
    #[serde(default)]
    pub repeat_mode: RepeatMode,
    #[serde(default)]
    pub current_index: Option<usize>,
    /// Number of items in the queue
    #[serde(default)]
    pub items: usize,
    #[serde(default)]
    pub current_item: Option<QueueItem>,
    #[serde(default)]
    pub state: PlaybackState,
}

/// One entry in a queue
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueueItem {
    pub queue_item_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub duration: Option<u64>,
    #[serde(default)]
    pub media_item: Option<MediaItem>,
}

impl QueueItem {
    pub fn uri(&self) -> Option<&str> {
        self.media_item.as_ref().and_then(|m| m.uri.as_deref())
    }
}

/// Catalog media types
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Artist,
    Album,
    Track,
    Playlist,
    Radio,
    Folder,
    /// Browse roots: the library and each provider
    Library,
    Provider,
    #[serde(other)]
    Unknown,
}

impl MediaType {
    /// Types a search may be filtered by
    pub const SEARCHABLE: [MediaType; 5] = [
        MediaType::Artist,
        MediaType::Album,
        MediaType::Track,
        MediaType::Playlist,
        MediaType::Radio,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Artist => "artist",
            MediaType::Album => "album",
            MediaType::Track => "track",
            MediaType::Playlist => "playlist",
            MediaType::Radio => "radio",
            MediaType::Folder => "folder",
            MediaType::Library => "library",
            MediaType::Provider => "provider",
            MediaType::Unknown => "unknown",
        }
    }
}

/// Name-only reference to a related item (artist of a track, album of a track)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ItemRef {
    pub name: String,
}

/// Media item from search or browse
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MediaItem {
    #[serde(default)]
    pub item_id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default = "unknown_media_type")]
    pub media_type: MediaType,
    #[serde(default)]
    pub artists: Vec<ItemRef>,
    #[serde(default)]
    pub album: Option<ItemRef>,
    #[serde(default)]
    pub is_folder: bool,
    #[serde(default)]
    pub path: Option<String>,
}

fn unknown_media_type() -> MediaType {
    MediaType::Unknown
}

impl MediaItem {
    /// Whether browsing into this item yields further children
    pub fn is_browsable(&self) -> bool {
        self.is_folder
            || matches!(
                self.media_type,
                MediaType::Folder | MediaType::Library | MediaType::Provider
            )
    }

    /// Path to pass back to browse for a folder node
    pub fn browse_path(&self) -> Option<String> {
        let raw = self.path.as_deref().or(self.uri.as_deref())?;
        Some(raw.replacen("://folder/", "://", 1))
    }
}

/// Search results grouped by media type
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct SearchResults {
    #[serde(default)]
    pub artists: Vec<MediaItem>,
    #[serde(default)]
    pub albums: Vec<MediaItem>,
    #[serde(default)]
    pub tracks: Vec<MediaItem>,
    #[serde(default)]
    pub playlists: Vec<MediaItem>,
    #[serde(default)]
    pub radio: Vec<MediaItem>,
}

impl SearchResults {
    /// All results in a stable type order, tagged with their type
    pub fn flatten(&self) -> Vec<(MediaType, &MediaItem)> {
        let groups: [(MediaType, &Vec<MediaItem>); 5] = [
            (MediaType::Artist, &self.artists),
            (MediaType::Album, &self.albums),
            (MediaType::Track, &self.tracks),
            (MediaType::Playlist, &self.playlists),
            (MediaType::Radio, &self.radio),
        ];
        groups
            .into_iter()
            .flat_map(|(kind, items)| items.iter().map(move |item| (kind, item)))
            .collect()
    }
}

/// How play_media treats the existing queue
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum QueueOption {
    /// Replace the queue and start playing immediately
    #[default]
    Play,
    /// Replace queue contents
    Replace,
    /// Insert after the current item
    Next,
    /// Append to the end
    Add,
}

impl QueueOption {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueueOption::Play => "play",
            QueueOption::Replace => "replace",
            QueueOption::Next => "next",
            QueueOption::Add => "add",
        }
    }
}

/// Opaque playable reference such as `spotify://track/abc` or `library://album/12`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct MediaRef(String);

impl MediaRef {
    /// Accept any `scheme://rest` string; the rest is never inspected
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        match trimmed.split_once("://") {
            Some((scheme, rest)) if !scheme.is_empty() && !rest.is_empty() => {
                Ok(Self(trimmed.to_string()))
            }
            _ => Err(MaError::InvalidMedia(format!(
                "`{}` is not a media URI; use a URI returned by ma_search or ma_browse",
                raw
            ))),
        }
    }

    /// Provider prefix, used only to make error messages meaningful
    pub fn provider(&self) -> &str {
        self.0.split("://").next().unwrap_or_default()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for MediaRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
