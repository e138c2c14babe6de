use crate::config::Config;
use crate::connection::Connection;
use crate::error::Result;
use crate::protocol::{Request, ServerInfo};
use crate::types::{MediaItem, MediaRef, MediaType, Player, PlayerQueue, QueueItem, QueueOption, RepeatMode, SearchResults};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

/// Fire-and-forget transport commands addressed to a queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueCommand {
    Play,
    Pause,
    Stop,
    PlayPause,
    Next,
    Previous,
}

impl QueueCommand {
    fn endpoint(&self) -> &'static str {
        match self {
            QueueCommand::Play => "player_queues/play",
            QueueCommand::Pause => "player_queues/pause",
            QueueCommand::Stop => "player_queues/stop",
            QueueCommand::PlayPause => "player_queues/play_pause",
            QueueCommand::Next => "player_queues/next",
            QueueCommand::Previous => "player_queues/previous",
        }
    }
}

/// Typed surface of the remote controller
///
/// Every method takes entities that were already resolved against live state.
/// Implementations only marshal; they never resolve identifiers or retry.
#[async_trait]
pub trait MusicApi: Send + Sync {
    async fn players(&self) -> Result<Vec<Player>>;
    async fn queues(&self) -> Result<Vec<PlayerQueue>>;
    async fn queue_items(&self, queue: &PlayerQueue, limit: usize, offset: usize) -> Result<Vec<QueueItem>>;

    async fn volume_set(&self, player: &Player, level: u8) -> Result<()>;
    async fn volume_up(&self, player: &Player) -> Result<()>;
    async fn volume_down(&self, player: &Player) -> Result<()>;
    async fn volume_mute(&self, player: &Player, muted: bool) -> Result<()>;

    /// Make `members` follow `leader`
    async fn group_many(&self, leader: &Player, members: &[Player]) -> Result<()>;
    async fn ungroup_many(&self, players: &[Player]) -> Result<()>;

    async fn queue_command(&self, queue: &PlayerQueue, command: QueueCommand) -> Result<()>;
    async fn seek(&self, queue: &PlayerQueue, position_secs: u64) -> Result<()>;
    async fn play_media(&self, queue: &PlayerQueue, media: &[MediaRef], option: QueueOption, radio_mode: bool) -> Result<()>;
    async fn shuffle(&self, queue: &PlayerQueue, enabled: bool) -> Result<()>;
    async fn repeat(&self, queue: &PlayerQueue, mode: RepeatMode) -> Result<()>;
    async fn clear_queue(&self, queue: &PlayerQueue) -> Result<()>;
    /// Move an item by `pos_shift` places; negative moves towards the front,
    /// zero makes it play next
    async fn move_item(&self, queue: &PlayerQueue, item: &QueueItem, pos_shift: i64) -> Result<()>;
    async fn delete_item(&self, queue: &PlayerQueue, item: &QueueItem) -> Result<()>;
    async fn transfer_queue(&self, source: &PlayerQueue, target: &PlayerQueue) -> Result<()>;

    async fn search(&self, query: &str, media_types: &[MediaType], limit: usize) -> Result<SearchResults>;
    async fn browse(&self, path: Option<&str>) -> Result<Vec<MediaItem>>;

    /// Whether the underlying transport is still usable
    fn is_connected(&self) -> bool;
    async fn disconnect(&self);
}

/// Music Assistant client over the server's WebSocket API
pub struct RemoteClient {
    connection: Connection,
}

impl RemoteClient {
    /// Connect and authenticate using the given configuration
    pub async fn connect(config: &Config) -> Result<Self> {
        let connection =
            Connection::connect(&config.ws_url(), config.token.as_deref(), config.request_timeout).await?;
        Ok(Self { connection })
    }

    pub fn server_info(&self) -> &ServerInfo {
        self.connection.server_info()
    }

    async fn command(&self, command: &str, args: Value) -> Result<Value> {
        self.connection
            .send_request(Request::new(command).with_args(args))
            .await
    }

    async fn fetch<T: DeserializeOwned>(&self, command: &str, args: Value) -> Result<T> {
        let result = self.command(command, args).await?;
        Ok(serde_json::from_value(result)?)
    }
}

#[async_trait]
impl MusicApi for RemoteClient {
    // ========== State ==========

    async fn players(&self) -> Result<Vec<Player>> {
        self.fetch("players/all", json!({})).await
    }

    async fn queues(&self) -> Result<Vec<PlayerQueue>> {
        self.fetch("player_queues/all", json!({})).await
    }

    async fn queue_items(&self, queue: &PlayerQueue, limit: usize, offset: usize) -> Result<Vec<QueueItem>> {
        self.fetch(
            "player_queues/items",
            json!({ "queue_id": queue.queue_id, "limit": limit, "offset": offset }),
        )
        .await
    }

    // ========== Volume ==========

    async fn volume_set(&self, player: &Player, level: u8) -> Result<()> {
        self.command(
            "players/cmd/volume_set",
            json!({ "player_id": player.player_id, "volume_level": level }),
        )
        .await?;
        Ok(())
    }

    async fn volume_up(&self, player: &Player) -> Result<()> {
        self.command("players/cmd/volume_up", json!({ "player_id": player.player_id }))
            .await?;
        Ok(())
    }

    async fn volume_down(&self, player: &Player) -> Result<()> {
        self.command("players/cmd/volume_down", json!({ "player_id": player.player_id }))
            .await?;
        Ok(())
    }

    async fn volume_mute(&self, player: &Player, muted: bool) -> Result<()> {
        self.command(
            "players/cmd/volume_mute",
            json!({ "player_id": player.player_id, "muted": muted }),
        )
        .await?;
        Ok(())
    }

    // ========== Grouping ==========

    async fn group_many(&self, leader: &Player, members: &[Player]) -> Result<()> {
        let child_ids: Vec<&str> = members.iter().map(|p| p.player_id.as_str()).collect();
        self.command(
            "players/cmd/group_many",
            json!({ "target_player": leader.player_id, "child_player_ids": child_ids }),
        )
        .await?;
        Ok(())
    }

    async fn ungroup_many(&self, players: &[Player]) -> Result<()> {
        let ids: Vec<&str> = players.iter().map(|p| p.player_id.as_str()).collect();
        self.command("players/cmd/ungroup_many", json!({ "player_ids": ids }))
            .await?;
        Ok(())
    }

    // ========== Playback ==========

    async fn queue_command(&self, queue: &PlayerQueue, command: QueueCommand) -> Result<()> {
        self.command(command.endpoint(), json!({ "queue_id": queue.queue_id }))
            .await?;
        Ok(())
    }

    async fn seek(&self, queue: &PlayerQueue, position_secs: u64) -> Result<()> {
        self.command(
            "player_queues/seek",
            json!({ "queue_id": queue.queue_id, "position": position_secs }),
        )
        .await?;
        Ok(())
    }

    async fn play_media(&self, queue: &PlayerQueue, media: &[MediaRef], option: QueueOption, radio_mode: bool) -> Result<()> {
        self.command(
            "player_queues/play_media",
            json!({
                "queue_id": queue.queue_id,
                "media": media,
                "option": option.as_str(),
                "radio_mode": radio_mode
            }),
        )
        .await?;
        Ok(())
    }

    // ========== Queue ==========

    async fn shuffle(&self, queue: &PlayerQueue, enabled: bool) -> Result<()> {
        self.command(
            "player_queues/shuffle",
            json!({ "queue_id": queue.queue_id, "shuffle_enabled": enabled }),
        )
        .await?;
        Ok(())
    }

    async fn repeat(&self, queue: &PlayerQueue, mode: RepeatMode) -> Result<()> {
        self.command(
            "player_queues/repeat",
            json!({ "queue_id": queue.queue_id, "repeat_mode": mode.as_str() }),
        )
        .await?;
        Ok(())
    }

    async fn clear_queue(&self, queue: &PlayerQueue) -> Result<()> {
        self.command("player_queues/clear", json!({ "queue_id": queue.queue_id }))
            .await?;
        Ok(())
    }

    async fn move_item(&self, queue: &PlayerQueue, item: &QueueItem, pos_shift: i64) -> Result<()> {
        self.command(
            "player_queues/move_item",
            json!({
                "queue_id": queue.queue_id,
                "queue_item_id": item.queue_item_id,
                "pos_shift": pos_shift
            }),
        )
        .await?;
        Ok(())
    }

    async fn delete_item(&self, queue: &PlayerQueue, item: &QueueItem) -> Result<()> {
        self.command(
            "player_queues/delete_item",
            json!({ "queue_id": queue.queue_id, "item_id_or_index": item.queue_item_id }),
        )
        .await?;
        Ok(())
    }

    async fn transfer_queue(&self, source: &PlayerQueue, target: &PlayerQueue) -> Result<()> {
        self.command(
            "player_queues/transfer",
            json!({
                "source_queue_id": source.queue_id,
                "target_queue_id": target.queue_id
            }),
        )
        .await?;
        Ok(())
    }

    // ========== Library ==========

    async fn search(&self, query: &str, media_types: &[MediaType], limit: usize) -> Result<SearchResults> {
        let types: Vec<&str> = media_types.iter().map(|t| t.as_str()).collect();
        self.fetch(
            "music/search",
            json!({ "search_query": query, "media_types": types, "limit": limit }),
        )
        .await
    }

    async fn browse(&self, path: Option<&str>) -> Result<Vec<MediaItem>> {
        let result = self.command("music/browse", json!({ "path": path })).await?;
        if result.is_null() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_value(result)?)
    }

    fn is_connected(&self) -> bool {
        self.connection.is_connected()
    }

    async fn disconnect(&self) {
        self.connection.close().await;
    }
}
