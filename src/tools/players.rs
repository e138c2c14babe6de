use super::args::{GroupArgs, GroupRequest, VolumeArgs, VolumeChange};
use super::{Dispatcher, ToolOutput};
use crate::error::{FailedStep, MaError, Result};
use crate::resolver::{find_players, is_grouped, leader_of, members_of, resolve_group, resolve_player};
use crate::session::Session;
use crate::types::Player;
use serde_json::{json, Value};
use std::time::Duration;
use tokio::time::sleep;

/// Group state can trail the server's acknowledgement
const VERIFY_ATTEMPTS: u32 = 5;
const VERIFY_INTERVAL: Duration = Duration::from_millis(300);

fn player_json(players: &[Player], player: &Player) -> Value {
    let members: Vec<&str> = members_of(players, player)
        .into_iter()
        .map(|p| p.player_id.as_str())
        .collect();
    json!({
        "player_id": player.player_id,
        "name": player.name,
        "available": player.available,
        "state": player.state,
        "volume_level": player.volume_level,
        "muted": player.volume_muted.unwrap_or(false),
        "group_leader": leader_of(players, player),
        "group_members": members,
        "active_source": player.active_source_name(),
    })
}

fn player_line(players: &[Player], player: &Player) -> String {
    let mut parts = vec![format!("{:?}", player.state).to_lowercase()];
    if let Some(level) = player.volume_level {
        parts.push(format!("{}%", level));
    }
    if player.volume_muted == Some(true) {
        parts.push("muted".to_string());
    }
    let members = members_of(players, player);
    if !members.is_empty() {
        parts.push(format!("leads {} member(s)", members.len()));
    } else if let Some(leader) = leader_of(players, player) {
        parts.push(format!("synced to {}", leader));
    }
    if let Some(source) = player.active_source_name() {
        parts.push(format!("source {}", source));
    }
    if !player.available {
        parts.push("unavailable".to_string());
    }
    format!("{} ({}): {}", player.name, player.player_id, parts.join(", "))
}

impl Dispatcher {
    /// All players with volume, state and grouping, read live
    pub async fn list_players(&self) -> Result<ToolOutput> {
        let session = self.sessions.acquire().await?;
        let players = session.observe(session.api().players().await).await?;

        if players.is_empty() {
            return Ok(ToolOutput::new(
                "No players found. Ensure Music Assistant has player providers configured.",
                json!({ "players": [] }),
            ));
        }

        let lines: Vec<String> = players.iter().map(|p| player_line(&players, p)).collect();
        Ok(ToolOutput::new(
            format!("{} player(s):\n{}", players.len(), lines.join("\n")),
            json!({ "players": players.iter().map(|p| player_json(&players, p)).collect::<Vec<_>>() }),
        ))
    }

    pub async fn volume(&self, args: VolumeArgs) -> Result<ToolOutput> {
        let change = args.validate()?;

        let session = self.sessions.acquire().await?;
        let _commands = session.lock_commands().await;
        let player = resolve_player(&session, &args.player_id).await?;
        let api = session.api();

        let (summary, data) = match change {
            VolumeChange::Absolute(level) => {
                session.observe(api.volume_set(&player, level).await).await?;
                (
                    format!("Volume set to {}% on {}", level, player.name),
                    json!({ "volume_level": level }),
                )
            }
            VolumeChange::StepUp => {
                session.observe(api.volume_up(&player).await).await?;
                (format!("Volume increased on {}", player.name), json!({}))
            }
            VolumeChange::StepDown => {
                session.observe(api.volume_down(&player).await).await?;
                (format!("Volume decreased on {}", player.name), json!({}))
            }
            VolumeChange::Relative(delta) => {
                let current = player.volume_level.ok_or_else(|| {
                    MaError::validation(
                        "adjust",
                        format!("{} does not report a volume level; set an absolute level", player.name),
                    )
                })?;
                let level = (current as i64 + delta).clamp(0, 100) as u8;
                session.observe(api.volume_set(&player, level).await).await?;
                (
                    format!("Volume changed from {}% to {}% on {}", current, level, player.name),
                    json!({ "previous_level": current, "volume_level": level }),
                )
            }
            VolumeChange::Mute(muted) => {
                session.observe(api.volume_mute(&player, muted).await).await?;
                (
                    format!("{} {}", player.name, if muted { "muted" } else { "unmuted" }),
                    json!({ "muted": muted }),
                )
            }
        };

        let mut data = data;
        data["player_id"] = json!(player.player_id);
        Ok(ToolOutput::new(summary, data))
    }

    pub async fn group(&self, args: GroupArgs) -> Result<ToolOutput> {
        match args.validate()? {
            GroupRequest::Join { sources, target } => self.join_group(sources, target).await,
            GroupRequest::Leave { players } => self.leave_group(players).await,
        }
    }

    async fn join_group(&self, sources: Vec<String>, target: String) -> Result<ToolOutput> {
        let session = self.sessions.acquire().await?;
        let _commands = session.lock_commands().await;

        let mut references = sources;
        references.push(target);
        let snapshot = session.observe(session.api().players().await).await?;
        let resolved = find_players(&snapshot, &references)?;
        let (leader, requested) = resolved
            .split_last()
            .ok_or_else(|| MaError::validation("player_ids", "list at least one player"))?;

        let mut members: Vec<Player> = Vec::new();
        for player in requested {
            if player.player_id == leader.player_id {
                return Err(MaError::validation(
                    "target_player_id",
                    format!("{} cannot join itself", leader.name),
                ));
            }
            if !members.iter().any(|m| m.player_id == player.player_id) {
                members.push(player.clone());
            }
        }

        let (already, pending): (Vec<Player>, Vec<Player>) = members
            .iter()
            .cloned()
            .partition(|p| follows(&snapshot, p, leader));

        // Members of another group (and leaders of one) leave it first; the
        // server does not promise to do both steps atomically
        let mut must_leave: Vec<Player> = pending
            .iter()
            .filter(|p| is_grouped(&snapshot, p))
            .cloned()
            .collect();
        if leader_of(&snapshot, leader).is_some() {
            must_leave.push(leader.clone());
        }
        if !must_leave.is_empty() {
            tracing::info!(
                "Removing {} player(s) from their current group before joining {}",
                must_leave.len(),
                leader.player_id
            );
            session.observe(session.api().ungroup_many(&must_leave).await).await?;
        }

        let join_error = if pending.is_empty() {
            tracing::debug!("All players already follow {}", leader.player_id);
            None
        } else {
            match session.observe(session.api().group_many(leader, &pending).await).await {
                Ok(()) => None,
                Err(e) if e.is_transport() => return Err(e),
                Err(e) => Some(e),
            }
        };

        let attempts = if join_error.is_some() { 1 } else { VERIFY_ATTEMPTS };
        let missing = verify_members(&session, leader, &members, attempts).await?;

        let succeeded: Vec<String> = members
            .iter()
            .filter(|m| !missing.iter().any(|id| *id == m.player_id))
            .map(|m| m.player_id.clone())
            .collect();

        if missing.is_empty() {
            let group = resolve_group(&session, &leader.player_id).await?;
            let names: Vec<&str> = members.iter().map(|m| m.name.as_str()).collect();
            let joined: Vec<&String> = succeeded
                .iter()
                .filter(|id| !already.iter().any(|p| p.player_id == **id))
                .collect();
            return Ok(ToolOutput::new(
                format!(
                    "[{}] joined the group led by {} ({} member(s) in total)",
                    names.join(", "),
                    leader.name,
                    group.members.len()
                ),
                json!({
                    "leader": group.leader.player_id,
                    "joined": joined,
                    "already_joined": already.iter().map(|p| &p.player_id).collect::<Vec<_>>(),
                    "group_members": group.members.iter().map(|p| &p.player_id).collect::<Vec<_>>(),
                }),
            ));
        }

        if succeeded.is_empty() {
            if let Some(e) = join_error {
                return Err(e);
            }
        }

        let reason = match &join_error {
            Some(e) => e.to_string(),
            None => format!("not following {} after the join was acknowledged", leader.player_id),
        };
        Err(MaError::PartialFailure {
            summary: format!(
                "{} of {} player(s) joined the group led by {}; failed: {}",
                succeeded.len(),
                members.len(),
                leader.name,
                missing.join(", ")
            ),
            succeeded,
            failed: missing
                .into_iter()
                .map(|target| FailedStep {
                    target,
                    reason: reason.clone(),
                })
                .collect(),
        })
    }

    async fn leave_group(&self, references: Vec<String>) -> Result<ToolOutput> {
        let session = self.sessions.acquire().await?;
        let _commands = session.lock_commands().await;
        let snapshot = session.observe(session.api().players().await).await?;
        let players = find_players(&snapshot, &references)?;

        let grouped: Vec<Player> = players
            .iter()
            .filter(|p| is_grouped(&snapshot, p))
            .cloned()
            .collect();

        if !grouped.is_empty() {
            session.observe(session.api().ungroup_many(&grouped).await).await?;
        }

        let ids: Vec<&str> = players.iter().map(|p| p.player_id.as_str()).collect();
        let summary = if grouped.is_empty() {
            format!("[{}] were not in a group", ids.join(", "))
        } else {
            format!("[{}] removed from their groups", ids.join(", "))
        };
        Ok(ToolOutput::new(
            summary,
            json!({
                "players": ids,
                "ungrouped": grouped.iter().map(|p| &p.player_id).collect::<Vec<_>>(),
            }),
        ))
    }
}

fn follows(players: &[Player], player: &Player, leader: &Player) -> bool {
    leader_of(players, player) == Some(&leader.player_id)
}

/// Re-read live state until every member follows the leader; returns the ids that do not
async fn verify_members(
    session: &Session<'_>,
    leader: &Player,
    members: &[Player],
    attempts: u32,
) -> Result<Vec<String>> {
    let mut missing = Vec::new();
    for attempt in 1..=attempts {
        let players = session.observe(session.api().players().await).await?;
        missing = members
            .iter()
            .filter(|m| {
                players
                    .iter()
                    .find(|p| p.player_id == m.player_id)
                    .map_or(true, |p| !follows(&players, p, leader))
            })
            .map(|m| m.player_id.clone())
            .collect();

        if missing.is_empty() {
            break;
        }
        if attempt < attempts {
            tracing::debug!("Waiting for {} player(s) to follow {}", missing.len(), leader.player_id);
            sleep(VERIFY_INTERVAL).await;
        }
    }
    Ok(missing)
}
