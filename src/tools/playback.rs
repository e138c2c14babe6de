use super::args::{PlayMediaArgs, PlaybackArgs, PlaybackRequest};
use super::{Dispatcher, ToolOutput};
use crate::client::QueueCommand;
use crate::error::Result;
use crate::resolver::resolve_queue;
use crate::types::QueueOption;
use serde_json::json;

impl Dispatcher {
    /// Transport control; acknowledged commands are not polled for the resulting state
    pub async fn playback(&self, args: PlaybackArgs) -> Result<ToolOutput> {
        let request = args.validate()?;

        let session = self.sessions.acquire().await?;
        let _commands = session.lock_commands().await;
        let queue = resolve_queue(&session, &args.queue_id).await?;
        let api = session.api();
        let target = queue.display_name.as_deref().unwrap_or(&queue.queue_id);

        let (summary, position) = match request {
            PlaybackRequest::Seek(position) => {
                session.observe(api.seek(&queue, position).await).await?;
                (format!("Seeked to {}s on {}", position, target), Some(position))
            }
            PlaybackRequest::Command(command) => {
                session.observe(api.queue_command(&queue, command).await).await?;
                let done = match command {
                    QueueCommand::Play => "Playing",
                    QueueCommand::Pause => "Paused",
                    QueueCommand::Stop => "Stopped",
                    QueueCommand::PlayPause => "Toggled play/pause on",
                    QueueCommand::Next => "Skipped to next track on",
                    QueueCommand::Previous => "Went to previous track on",
                };
                (format!("{} {}", done, target), None)
            }
        };

        Ok(ToolOutput::new(
            summary,
            json!({
                "queue_id": queue.queue_id,
                "command": args.command.trim().to_lowercase(),
                "position": position,
            }),
        ))
    }

    pub async fn play_media(&self, args: PlayMediaArgs) -> Result<ToolOutput> {
        let queue_ref = args.queue_id.clone();
        let request = args.validate()?;

        let session = self.sessions.acquire().await?;
        let _commands = session.lock_commands().await;
        let queue = resolve_queue(&session, &queue_ref).await?;

        tracing::debug!(
            "play_media on {} ({}) from provider(s) {:?}",
            queue.queue_id,
            request.option.as_str(),
            request.media.iter().map(|m| m.provider()).collect::<Vec<_>>()
        );
        session
            .observe(
                session
                    .api()
                    .play_media(&queue, &request.media, request.option, request.radio_mode)
                    .await,
            )
            .await?;

        let action = match request.option {
            QueueOption::Play => "Playing",
            QueueOption::Replace => "Replaced queue with",
            QueueOption::Next => "Added as next",
            QueueOption::Add => "Added to queue",
        };
        let radio = if request.radio_mode { " (radio mode enabled)" } else { "" };
        let target = queue.display_name.as_deref().unwrap_or(&queue.queue_id);

        Ok(ToolOutput::new(
            format!("{} {} item(s) on {}{}", action, request.media.len(), target, radio),
            json!({
                "queue_id": queue.queue_id,
                "option": request.option.as_str(),
                "media": request.media,
                "radio_mode": request.radio_mode,
            }),
        ))
    }
}
