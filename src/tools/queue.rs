use super::args::{QueueArgs, QueueItemArgs, QueueItemRequest, QueueRequest, TransferQueueArgs};
use super::{Dispatcher, ToolOutput};
use crate::error::{MaError, Result};
use crate::resolver::{resolve_queue, resolve_queue_item};
use crate::session::Session;
use crate::types::{PlayerQueue, QueueItem};
use serde_json::{json, Value};

fn queue_json(queue: &PlayerQueue) -> Value {
    json!({
        "queue_id": queue.queue_id,
        "display_name": queue.display_name,
        "active": queue.active,
        "state": queue.state,
        "shuffle_enabled": queue.shuffle_enabled,
        "repeat_mode": queue.repeat_mode.as_str(),
        "current_index": queue.current_index,
        "current_item": queue.current_item.as_ref().map(|item| item_json(item, queue.current_index)),
        "total_items": queue.items,
    })
}

fn item_json(item: &QueueItem, index: Option<usize>) -> Value {
    json!({
        "queue_item_id": item.queue_item_id,
        "name": item.name,
        "uri": item.uri(),
        "duration": item.duration,
        "index": index,
    })
}

fn queue_name(queue: &PlayerQueue) -> &str {
    queue.display_name.as_deref().unwrap_or(&queue.queue_id)
}

/// Re-read a queue after a mutation so the reply reflects server state
async fn refreshed(session: &Session<'_>, queue: &PlayerQueue) -> Result<PlayerQueue> {
    resolve_queue(session, &queue.queue_id).await
}

impl Dispatcher {
    pub async fn queue(&self, args: QueueArgs) -> Result<ToolOutput> {
        match args.validate()? {
            QueueRequest::Get { limit, offset } => self.queue_contents(&args.queue_id, limit, offset).await,
            change => self.change_queue(&args.queue_id, change).await,
        }
    }

    async fn queue_contents(&self, reference: &str, limit: usize, offset: usize) -> Result<ToolOutput> {
        let session = self.sessions.acquire().await?;
        let queue = resolve_queue(&session, reference).await?;
        let items = session
            .observe(session.api().queue_items(&queue, limit, offset).await)
            .await?;

        let mut summary = format!(
            "{}: {} item(s), shuffle {}, repeat {}",
            queue_name(&queue),
            queue.items,
            if queue.shuffle_enabled { "on" } else { "off" },
            queue.repeat_mode.as_str()
        );
        if let Some(current) = &queue.current_item {
            summary.push_str(&format!("\nNow: {}", current.name));
        }
        for (i, item) in items.iter().enumerate() {
            summary.push_str(&format!("\n{}. {} [{}]", offset + i, item.name, item.queue_item_id));
        }

        let mut data = queue_json(&queue);
        data["offset"] = json!(offset);
        data["items"] = json!(items
            .iter()
            .enumerate()
            .map(|(i, item)| item_json(item, Some(offset + i)))
            .collect::<Vec<_>>());
        Ok(ToolOutput::new(summary, data))
    }

    async fn change_queue(&self, reference: &str, change: QueueRequest) -> Result<ToolOutput> {
        let session = self.sessions.acquire().await?;
        let _commands = session.lock_commands().await;
        let queue = resolve_queue(&session, reference).await?;
        let api = session.api();

        let done = match change {
            QueueRequest::Shuffle(enabled) => {
                session.observe(api.shuffle(&queue, enabled).await).await?;
                format!("Shuffle {}", if enabled { "enabled" } else { "disabled" })
            }
            QueueRequest::Repeat(mode) => {
                session.observe(api.repeat(&queue, mode).await).await?;
                format!("Repeat set to {}", mode.as_str())
            }
            QueueRequest::Clear => {
                session.observe(api.clear_queue(&queue).await).await?;
                "Cleared queue".to_string()
            }
            QueueRequest::Get { .. } => "No change".to_string(),
        };

        let fresh = refreshed(&session, &queue).await?;
        Ok(ToolOutput::new(
            format!("{} on {}", done, queue_name(&fresh)),
            queue_json(&fresh),
        ))
    }

    pub async fn queue_item(&self, args: QueueItemArgs) -> Result<ToolOutput> {
        let request = args.validate()?;

        let session = self.sessions.acquire().await?;
        let _commands = session.lock_commands().await;
        let queue = resolve_queue(&session, &args.queue_id).await?;
        let (item, index) = resolve_queue_item(&session, &queue, args.item_id.trim()).await?;
        let last = queue.items.max(index + 1) - 1;

        let shift = match request {
            QueueItemRequest::Remove => {
                session.observe(session.api().delete_item(&queue, &item).await).await?;
                return Ok(ToolOutput::new(
                    format!("Removed {} from {}", item.name, queue_name(&queue)),
                    json!({
                        "queue_id": queue.queue_id,
                        "removed": item_json(&item, Some(index)),
                    }),
                ));
            }
            QueueItemRequest::MoveTo(position) => {
                let shift = position.min(last) as i64 - index as i64;
                (shift != 0).then_some(shift)
            }
            QueueItemRequest::MoveUp => (index > 0).then_some(-1),
            QueueItemRequest::MoveDown => (index < last).then_some(1),
            // The server reads a zero shift as "play next"
            QueueItemRequest::MoveNext => Some(0),
        };

        let Some(pos_shift) = shift else {
            return Ok(ToolOutput::new(
                format!("{} is already at position {}", item.name, index),
                json!({
                    "queue_id": queue.queue_id,
                    "item": item_json(&item, Some(index)),
                    "moved": false,
                }),
            ));
        };

        session
            .observe(session.api().move_item(&queue, &item, pos_shift).await)
            .await?;

        let summary = if request == QueueItemRequest::MoveNext {
            format!("{} will play next on {}", item.name, queue_name(&queue))
        } else {
            format!(
                "Moved {} from position {} to {}",
                item.name,
                index,
                index as i64 + pos_shift
            )
        };
        Ok(ToolOutput::new(
            summary,
            json!({
                "queue_id": queue.queue_id,
                "item": item_json(&item, Some(index)),
                "pos_shift": pos_shift,
                "moved": true,
            }),
        ))
    }

    pub async fn transfer_queue(&self, args: TransferQueueArgs) -> Result<ToolOutput> {
        args.validate()?;

        let session = self.sessions.acquire().await?;
        let _commands = session.lock_commands().await;
        let source = resolve_queue(&session, &args.source_queue_id).await?;
        let target = resolve_queue(&session, &args.target_queue_id).await?;
        if source.queue_id == target.queue_id {
            return Err(MaError::validation(
                "target_queue_id",
                format!("`{}` and `{}` are the same queue", args.source_queue_id, args.target_queue_id),
            ));
        }

        session
            .observe(session.api().transfer_queue(&source, &target).await)
            .await?;

        Ok(ToolOutput::new(
            format!("Transferred queue from {} to {}", queue_name(&source), queue_name(&target)),
            json!({
                "source_queue_id": source.queue_id,
                "target_queue_id": target.queue_id,
            }),
        ))
    }
}
