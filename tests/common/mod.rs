//! In-memory Music Assistant used by the integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use music_assistant_mcp::{
    Config, Connector, Dispatcher, MaError, MediaItem, MediaRef, MediaType, MusicApi, Player, PlayerQueue,
    QueueCommand, QueueItem, QueueOption, RepeatMode, Result, SearchResults, SessionManager,
};
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;

#[derive(Default)]
pub struct State {
    pub players: Vec<Player>,
    pub queues: Vec<PlayerQueue>,
    pub items: HashMap<String, Vec<QueueItem>>,
    pub search: SearchResults,
    pub browse: HashMap<String, Vec<MediaItem>>,
    /// Players that acknowledge a join but never follow
    pub stubborn: HashSet<String>,
    /// Every remote mutation, in order
    pub log: Vec<String>,
    /// Report group membership only on the leader's `group_childs`
    pub leader_only_groups: bool,
    /// Answer every item page from the start of the queue
    pub ignore_offset: bool,
    /// While set, `volume_set` logs its arrival and waits for a permit
    pub volume_gate: Option<Arc<Semaphore>>,
    next_item: u32,
}

#[derive(Default)]
pub struct FakeMusicAssistant {
    pub state: Mutex<State>,
    connected: AtomicBool,
    /// Fail the next read with a dropped socket
    drop_next: AtomicBool,
}

pub fn player(id: &str, name: &str) -> Player {
    serde_json::from_value(json!({
        "player_id": id,
        "name": name,
        "volume_level": 30,
        "volume_muted": false,
        "state": "idle",
    }))
    .unwrap()
}

pub fn track(name: &str, uri: &str) -> MediaItem {
    serde_json::from_value(json!({
        "item_id": name,
        "name": name,
        "uri": uri,
        "media_type": "track",
        "artists": [{ "name": "The Band" }],
        "album": { "name": "First Album" },
    }))
    .unwrap()
}

pub fn folder(name: &str, uri: &str) -> MediaItem {
    serde_json::from_value(json!({
        "name": name,
        "uri": uri,
        "media_type": "folder",
        "is_folder": true,
    }))
    .unwrap()
}

impl FakeMusicAssistant {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// A player with a queue of the same id
    pub fn add_player(&self, id: &str, name: &str) {
        let mut state = self.state.lock().unwrap();
        state.players.push(player(id, name));
        state.queues.push(
            serde_json::from_value(json!({ "queue_id": id, "display_name": name, "active": true })).unwrap(),
        );
        state.items.insert(id.to_string(), Vec::new());
    }

    pub fn add_items(&self, queue_id: &str, names: &[&str]) {
        let mut state = self.state.lock().unwrap();
        for name in names {
            state.next_item += 1;
            let item = QueueItem {
                queue_item_id: format!("qi{}", state.next_item),
                name: name.to_string(),
                duration: Some(180),
                media_item: Some(track(name, &format!("library://track/{}", name))),
            };
            state.items.entry(queue_id.to_string()).or_default().push(item);
        }
    }

    pub fn player(&self, id: &str) -> Player {
        let state = self.state.lock().unwrap();
        state.players.iter().find(|p| p.player_id == id).cloned().unwrap()
    }

    pub fn item_names(&self, queue_id: &str) -> Vec<String> {
        let state = self.state.lock().unwrap();
        state.items[queue_id].iter().map(|i| i.name.clone()).collect()
    }

    pub fn item_id(&self, queue_id: &str, index: usize) -> String {
        let state = self.state.lock().unwrap();
        state.items[queue_id][index].queue_item_id.clone()
    }

    pub fn log(&self) -> Vec<String> {
        self.state.lock().unwrap().log.clone()
    }

    /// Hold every `volume_set` until the returned gate gets permits
    pub fn gate_volume(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        self.state.lock().unwrap().volume_gate = Some(gate.clone());
        gate
    }

    pub fn drop_connection_on_next_read(&self) {
        self.drop_next.store(true, Ordering::SeqCst);
    }

    fn record(&self, entry: String) {
        self.state.lock().unwrap().log.push(entry);
    }

    fn check_link(&self) -> Result<()> {
        if self.drop_next.swap(false, Ordering::SeqCst) {
            self.connected.store(false, Ordering::SeqCst);
        }
        if self.connected.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(MaError::ConnectionClosed)
        }
    }

    fn detach(state: &mut State, id: &str) {
        for p in state.players.iter_mut() {
            if p.player_id == id {
                p.synced_to = None;
                p.group_childs.clear();
                continue;
            }
            p.group_childs.retain(|c| c != id);
            if p.synced_to.as_deref() == Some(id) {
                p.synced_to = None;
            }
            if p.followers().is_empty() {
                p.group_childs.clear();
            }
        }
    }
}

#[async_trait]
impl MusicApi for FakeMusicAssistant {
    async fn players(&self) -> Result<Vec<Player>> {
        self.check_link()?;
        Ok(self.state.lock().unwrap().players.clone())
    }

    async fn queues(&self) -> Result<Vec<PlayerQueue>> {
        self.check_link()?;
        let state = self.state.lock().unwrap();
        Ok(state
            .queues
            .iter()
            .map(|q| {
                let mut q = q.clone();
                q.items = state.items.get(&q.queue_id).map_or(0, Vec::len);
                q
            })
            .collect())
    }

    async fn queue_items(&self, queue: &PlayerQueue, limit: usize, offset: usize) -> Result<Vec<QueueItem>> {
        self.check_link()?;
        let state = self.state.lock().unwrap();
        let offset = if state.ignore_offset { 0 } else { offset };
        Ok(state.items[&queue.queue_id]
            .iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn volume_set(&self, player: &Player, level: u8) -> Result<()> {
        self.check_link()?;
        let gate = self.state.lock().unwrap().volume_gate.clone();
        if let Some(gate) = gate {
            self.record(format!("volume_set waiting {}", player.player_id));
            let _permit = gate.acquire().await;
        }
        let mut state = self.state.lock().unwrap();
        state.log.push(format!("volume_set {} {}", player.player_id, level));
        if let Some(p) = state.players.iter_mut().find(|p| p.player_id == player.player_id) {
            p.volume_level = Some(level);
        }
        Ok(())
    }

    async fn volume_up(&self, player: &Player) -> Result<()> {
        self.record(format!("volume_up {}", player.player_id));
        Ok(())
    }

    async fn volume_down(&self, player: &Player) -> Result<()> {
        self.record(format!("volume_down {}", player.player_id));
        Ok(())
    }

    async fn volume_mute(&self, player: &Player, muted: bool) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.log.push(format!("volume_mute {} {}", player.player_id, muted));
        if let Some(p) = state.players.iter_mut().find(|p| p.player_id == player.player_id) {
            p.volume_muted = Some(muted);
        }
        Ok(())
    }

    async fn group_many(&self, leader: &Player, members: &[Player]) -> Result<()> {
        self.check_link()?;
        let mut state = self.state.lock().unwrap();
        let ids: Vec<String> = members.iter().map(|m| m.player_id.clone()).collect();
        state.log.push(format!("group_many {} {:?}", leader.player_id, ids));

        let joining: Vec<String> = ids.into_iter().filter(|id| !state.stubborn.contains(id)).collect();
        let leader_only = state.leader_only_groups;
        for p in state.players.iter_mut() {
            if joining.contains(&p.player_id) && !leader_only {
                p.synced_to = Some(leader.player_id.clone());
            }
            if p.player_id == leader.player_id {
                if p.group_childs.is_empty() {
                    p.group_childs.push(leader.player_id.clone());
                }
                for id in &joining {
                    if !p.group_childs.contains(id) {
                        p.group_childs.push(id.clone());
                    }
                }
            }
        }
        Ok(())
    }

    async fn ungroup_many(&self, players: &[Player]) -> Result<()> {
        self.check_link()?;
        let mut state = self.state.lock().unwrap();
        let ids: Vec<String> = players.iter().map(|p| p.player_id.clone()).collect();
        state.log.push(format!("ungroup_many {:?}", ids));
        for id in &ids {
            Self::detach(&mut state, id);
        }
        Ok(())
    }

    async fn queue_command(&self, queue: &PlayerQueue, command: QueueCommand) -> Result<()> {
        self.check_link()?;
        self.record(format!("queue_command {} {:?}", queue.queue_id, command));
        Ok(())
    }

    async fn seek(&self, queue: &PlayerQueue, position_secs: u64) -> Result<()> {
        self.check_link()?;
        self.record(format!("seek {} {}", queue.queue_id, position_secs));
        Ok(())
    }

    async fn play_media(&self, queue: &PlayerQueue, media: &[MediaRef], option: QueueOption, radio_mode: bool) -> Result<()> {
        self.check_link()?;
        if let Some(bad) = media.iter().find(|m| m.provider() == "bogus") {
            return Err(MaError::InvalidMedia(format!("{} is not available", bad)));
        }
        let mut state = self.state.lock().unwrap();
        state.log.push(format!(
            "play_media {} {:?} {} {}",
            queue.queue_id,
            media.iter().map(|m| m.as_str()).collect::<Vec<_>>(),
            option.as_str(),
            radio_mode
        ));
        let mut added = Vec::new();
        for m in media {
            state.next_item += 1;
            added.push(QueueItem {
                queue_item_id: format!("qi{}", state.next_item),
                name: m.as_str().to_string(),
                duration: None,
                media_item: Some(track(m.as_str(), m.as_str())),
            });
        }
        let items = state.items.entry(queue.queue_id.clone()).or_default();
        if matches!(option, QueueOption::Play | QueueOption::Replace) {
            items.clear();
        }
        items.extend(added);
        Ok(())
    }

    async fn shuffle(&self, queue: &PlayerQueue, enabled: bool) -> Result<()> {
        self.check_link()?;
        let mut state = self.state.lock().unwrap();
        state.log.push(format!("shuffle {} {}", queue.queue_id, enabled));
        if let Some(q) = state.queues.iter_mut().find(|q| q.queue_id == queue.queue_id) {
            q.shuffle_enabled = enabled;
        }
        Ok(())
    }

    async fn repeat(&self, queue: &PlayerQueue, mode: RepeatMode) -> Result<()> {
        self.check_link()?;
        let mut state = self.state.lock().unwrap();
        state.log.push(format!("repeat {} {}", queue.queue_id, mode.as_str()));
        if let Some(q) = state.queues.iter_mut().find(|q| q.queue_id == queue.queue_id) {
            q.repeat_mode = mode;
        }
        Ok(())
    }

    async fn clear_queue(&self, queue: &PlayerQueue) -> Result<()> {
        self.check_link()?;
        let mut state = self.state.lock().unwrap();
        state.log.push(format!("clear {}", queue.queue_id));
        state.items.entry(queue.queue_id.clone()).or_default().clear();
        Ok(())
    }

    async fn move_item(&self, queue: &PlayerQueue, item: &QueueItem, pos_shift: i64) -> Result<()> {
        self.check_link()?;
        let mut state = self.state.lock().unwrap();
        state.log.push(format!("move_item {} {} {}", queue.queue_id, item.queue_item_id, pos_shift));
        let items = state.items.entry(queue.queue_id.clone()).or_default();
        let Some(from) = items.iter().position(|i| i.queue_item_id == item.queue_item_id) else {
            return Err(MaError::NotFound(item.queue_item_id.clone()));
        };
        let to = if pos_shift == 0 {
            1.min(items.len() - 1)
        } else {
            (from as i64 + pos_shift).clamp(0, items.len() as i64 - 1) as usize
        };
        let moved = items.remove(from);
        items.insert(to, moved);
        Ok(())
    }

    async fn delete_item(&self, queue: &PlayerQueue, item: &QueueItem) -> Result<()> {
        self.check_link()?;
        let mut state = self.state.lock().unwrap();
        state.log.push(format!("delete_item {} {}", queue.queue_id, item.queue_item_id));
        state
            .items
            .entry(queue.queue_id.clone())
            .or_default()
            .retain(|i| i.queue_item_id != item.queue_item_id);
        Ok(())
    }

    async fn transfer_queue(&self, source: &PlayerQueue, target: &PlayerQueue) -> Result<()> {
        self.check_link()?;
        let mut state = self.state.lock().unwrap();
        state.log.push(format!("transfer {} {}", source.queue_id, target.queue_id));
        let moved = state.items.insert(source.queue_id.clone(), Vec::new()).unwrap_or_default();
        state.items.insert(target.queue_id.clone(), moved);
        Ok(())
    }

    async fn search(&self, _query: &str, _media_types: &[MediaType], _limit: usize) -> Result<SearchResults> {
        self.check_link()?;
        Ok(self.state.lock().unwrap().search.clone())
    }

    async fn browse(&self, path: Option<&str>) -> Result<Vec<MediaItem>> {
        self.check_link()?;
        let state = self.state.lock().unwrap();
        Ok(state.browse.get(path.unwrap_or("")).cloned().unwrap_or_default())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }
}

/// Hands out the same fake on every connect, marking it connected again
pub struct FakeConnector {
    pub api: Arc<FakeMusicAssistant>,
    pub connects: Arc<AtomicU32>,
}

#[async_trait]
impl Connector for FakeConnector {
    async fn connect(&self, _config: &Config) -> Result<Arc<dyn MusicApi>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        self.api.connected.store(true, Ordering::SeqCst);
        Ok(self.api.clone() as Arc<dyn MusicApi>)
    }
}

pub struct Harness {
    pub api: Arc<FakeMusicAssistant>,
    pub connects: Arc<AtomicU32>,
    pub dispatcher: Dispatcher,
}

impl Harness {
    pub fn new(api: Arc<FakeMusicAssistant>) -> Self {
        let connects = Arc::new(AtomicU32::new(0));
        let connector = FakeConnector {
            api: api.clone(),
            connects: connects.clone(),
        };
        let config = Config::new("http://ma.test:8095", None);
        Self {
            api,
            connects,
            dispatcher: Dispatcher::new(SessionManager::new(config, connector)),
        }
    }

    pub fn connects(&self) -> u32 {
        self.connects.load(Ordering::SeqCst)
    }
}
