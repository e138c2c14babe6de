//! Identifier resolution against live server state
//!
//! Callers pass loose references: a player id, a display name, or a queue id.
//! Resolution is exact-id first, then case-insensitive exact name. Several
//! name matches are never narrowed down; they come back as `Ambiguous`.
//!
//! The pure `find_*` functions work on snapshots. The async `resolve_*`
//! wrappers fetch a fresh snapshot through the session on every call.

use crate::error::{MaError, Result};
use crate::session::Session;
use crate::types::{Player, PlayerId, PlayerQueue, QueueItem};

const ITEM_PAGE: usize = 500;

/// Outcome of matching a reference against a snapshot
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution<T> {
    Found(T),
    /// Ids of every candidate that matched
    Ambiguous(Vec<String>),
    NotFound,
}

impl<T> Resolution<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Resolution<U> {
        match self {
            Resolution::Found(value) => Resolution::Found(f(value)),
            Resolution::Ambiguous(ids) => Resolution::Ambiguous(ids),
            Resolution::NotFound => Resolution::NotFound,
        }
    }

    /// Turn into a tool error; `what` names the entity kind for the message
    pub fn into_result(self, what: &str, reference: &str) -> Result<T> {
        match self {
            Resolution::Found(value) => Ok(value),
            Resolution::Ambiguous(candidates) => Err(MaError::Ambiguous {
                reference: reference.to_string(),
                candidates,
            }),
            Resolution::NotFound => Err(MaError::NotFound(format!(
                "{} `{}` not found. Use ma_list_players to see available ids.",
                what, reference
            ))),
        }
    }
}

/// A group leader with its current followers
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerGroup {
    pub leader: Player,
    pub members: Vec<Player>,
}

pub fn find_player<'a>(players: &'a [Player], reference: &str) -> Resolution<&'a Player> {
    let reference = reference.trim();
    if reference.is_empty() {
        return Resolution::NotFound;
    }

    if let Some(player) = players.iter().find(|p| p.player_id == reference) {
        return Resolution::Found(player);
    }

    let wanted = reference.to_lowercase();
    let matches: Vec<&Player> = players
        .iter()
        .filter(|p| p.name.to_lowercase() == wanted)
        .collect();

    match matches.as_slice() {
        [] => Resolution::NotFound,
        [only] => Resolution::Found(*only),
        many => Resolution::Ambiguous(many.iter().map(|p| p.player_id.clone()).collect()),
    }
}

/// Player reference first (queue ids conventionally equal player ids), then queue id.
/// An ambiguous player name only counts once the queue-id lookup misses too.
pub fn find_queue<'a>(
    players: &[Player],
    queues: &'a [PlayerQueue],
    reference: &str,
) -> Resolution<&'a PlayerQueue> {
    let mut ambiguous = None;
    match find_player(players, reference) {
        Resolution::Found(player) => {
            if let Some(queue) = queues.iter().find(|q| q.queue_id == player.player_id) {
                return Resolution::Found(queue);
            }
        }
        Resolution::Ambiguous(ids) => ambiguous = Some(ids),
        Resolution::NotFound => {}
    }

    let reference = reference.trim();
    match (queues.iter().find(|q| q.queue_id == reference), ambiguous) {
        (Some(queue), _) => Resolution::Found(queue),
        (None, Some(ids)) => Resolution::Ambiguous(ids),
        (None, None) => Resolution::NotFound,
    }
}

/// Leader `player` follows in this snapshot: its own `synced_to`, otherwise
/// any other player listing it among its followers
pub fn leader_of<'a>(players: &'a [Player], player: &'a Player) -> Option<&'a PlayerId> {
    player.group_leader().or_else(|| {
        players
            .iter()
            .find(|p| p.player_id != player.player_id && p.followers().contains(&&player.player_id))
            .map(|p| &p.player_id)
    })
}

/// Players following `leader` in this snapshot, in snapshot order
pub fn members_of<'a>(players: &'a [Player], leader: &Player) -> Vec<&'a Player> {
    players
        .iter()
        .filter(|p| p.player_id != leader.player_id)
        .filter(|p| leader_of(players, p) == Some(&leader.player_id))
        .collect()
}

/// Whether `player` leads or follows a group in this snapshot
pub fn is_grouped(players: &[Player], player: &Player) -> bool {
    leader_of(players, player).is_some() || !members_of(players, player).is_empty()
}

/// The group `reference` leads or belongs to; an ungrouped player is a group of one
pub fn find_group(players: &[Player], reference: &str) -> Resolution<PlayerGroup> {
    let player = match find_player(players, reference) {
        Resolution::Found(player) => player,
        Resolution::Ambiguous(ids) => return Resolution::Ambiguous(ids),
        Resolution::NotFound => return Resolution::NotFound,
    };

    let leader = leader_of(players, player)
        .and_then(|id| players.iter().find(|p| &p.player_id == id))
        .unwrap_or(player);

    Resolution::Found(PlayerGroup {
        leader: leader.clone(),
        members: members_of(players, leader).into_iter().cloned().collect(),
    })
}

pub async fn resolve_player(session: &Session<'_>, reference: &str) -> Result<Player> {
    let players = session.observe(session.api().players().await).await?;
    find_player(&players, reference)
        .map(Player::clone)
        .into_result("Player", reference)
}

/// Resolve several references against one snapshot
pub fn find_players(players: &[Player], references: &[String]) -> Result<Vec<Player>> {
    references
        .iter()
        .map(|r| {
            find_player(players, r)
                .map(Player::clone)
                .into_result("Player", r)
        })
        .collect()
}

pub async fn resolve_queue(session: &Session<'_>, reference: &str) -> Result<PlayerQueue> {
    let players = session.observe(session.api().players().await).await?;
    let queues = session.observe(session.api().queues().await).await?;
    find_queue(&players, &queues, reference)
        .map(PlayerQueue::clone)
        .into_result("Queue", reference)
}

pub async fn resolve_group(session: &Session<'_>, reference: &str) -> Result<PlayerGroup> {
    let players = session.observe(session.api().players().await).await?;
    find_group(&players, reference).into_result("Player", reference)
}

/// Locate a queue item by id, returning it with its current position.
/// Paging stops at the queue's reported length even if the server ignores `offset`.
pub async fn resolve_queue_item(
    session: &Session<'_>,
    queue: &PlayerQueue,
    item_id: &str,
) -> Result<(QueueItem, usize)> {
    let mut offset = 0;
    loop {
        let page = session
            .observe(session.api().queue_items(queue, ITEM_PAGE, offset).await)
            .await?;
        if let Some(index) = page.iter().position(|item| item.queue_item_id == item_id) {
            return Ok((page[index].clone(), offset + index));
        }
        offset += page.len();
        if page.len() < ITEM_PAGE || offset >= queue.items {
            break;
        }
    }

    Err(MaError::NotFound(format!(
        "Queue item `{}` is not in queue `{}`. Use ma_queue to list current item ids.",
        item_id, queue.queue_id
    )))
}
