use super::args::{BrowseArgs, SearchArgs};
use super::{Dispatcher, ToolOutput};
use crate::error::Result;
use crate::types::{MediaItem, MediaType};
use serde_json::{json, Value};
use std::collections::HashMap;

fn search_hit(media_type: MediaType, item: &MediaItem) -> Value {
    json!({
        "media_type": media_type.as_str(),
        "name": item.name,
        "uri": item.uri,
        "artist": item.artists.first().map(|a| &a.name),
        "album": item.album.as_ref().map(|a| &a.name),
    })
}

fn search_line(media_type: MediaType, item: &MediaItem) -> String {
    let mut line = format!("[{}] {}", media_type.as_str(), item.name);
    if matches!(media_type, MediaType::Track | MediaType::Album) {
        if let Some(artist) = item.artists.first() {
            line.push_str(&format!(" by {}", artist.name));
        }
    }
    if media_type == MediaType::Track {
        if let Some(album) = &item.album {
            line.push_str(&format!(" ({})", album.name));
        }
    }
    if let Some(uri) = &item.uri {
        line.push_str(&format!(" `{}`", uri));
    }
    line
}

impl Dispatcher {
    /// Catalog search across providers; read-only, so it never takes the command lock
    pub async fn search(&self, args: SearchArgs) -> Result<ToolOutput> {
        let request = args.validate()?;

        let session = self.sessions.acquire().await?;
        let results = session
            .observe(
                session
                    .api()
                    .search(&request.query, &request.media_types, request.limit)
                    .await,
            )
            .await?;

        // Providers do not always honour the limit
        let mut seen: HashMap<MediaType, usize> = HashMap::new();
        let hits: Vec<(MediaType, &MediaItem)> = results
            .flatten()
            .into_iter()
            .filter(|(kind, _)| request.media_types.contains(kind))
            .filter(|(kind, _)| {
                let count = seen.entry(*kind).or_default();
                *count += 1;
                *count <= request.limit
            })
            .collect();

        if hits.is_empty() {
            return Ok(ToolOutput::new(
                format!("No results found for '{}'", request.query),
                json!({ "query": request.query, "results": [] }),
            ));
        }

        let lines: Vec<String> = hits.iter().map(|(kind, item)| search_line(*kind, item)).collect();
        Ok(ToolOutput::new(
            format!(
                "{} result(s) for '{}':\n{}\nUse a URI with ma_play_media to play it.",
                hits.len(),
                request.query,
                lines.join("\n")
            ),
            json!({
                "query": request.query,
                "results": hits.iter().map(|(kind, item)| search_hit(*kind, item)).collect::<Vec<_>>(),
            }),
        ))
    }

    /// Walk the provider hierarchy; the root lists providers
    pub async fn browse(&self, args: BrowseArgs) -> Result<ToolOutput> {
        let request = args.validate()?;

        let session = self.sessions.acquire().await?;
        let all = session
            .observe(session.api().browse(request.path.as_deref()).await)
            .await?;
        let total = all.len();
        let location = request.path.as_deref().unwrap_or("providers");

        let page: Vec<&MediaItem> = all.iter().skip(request.offset).take(request.limit).collect();
        let end = request.offset + page.len();
        let has_more = end < total;

        let (folders, media): (Vec<&MediaItem>, Vec<&MediaItem>) =
            page.into_iter().partition(|item| item.is_browsable());

        let mut summary = if total == 0 {
            format!("No items found at {}", location)
        } else if request.offset >= total {
            format!("Offset {} exceeds the {} item(s) at {}", request.offset, total, location)
        } else {
            format!("{}: showing {}-{} of {}", location, request.offset + 1, end, total)
        };
        for folder in &folders {
            summary.push_str(&format!(
                "\n[folder] {} -> {}",
                folder.name,
                folder.browse_path().unwrap_or_default()
            ));
        }
        for item in &media {
            summary.push_str(&format!(
                "\n[{}] {} `{}`",
                item.media_type.as_str(),
                item.name,
                item.uri.as_deref().unwrap_or("-")
            ));
        }
        if has_more {
            summary.push_str(&format!("\nUse offset={} to see more.", end));
        }

        Ok(ToolOutput::new(
            summary,
            json!({
                "path": request.path,
                "folders": folders
                    .iter()
                    .map(|f| json!({ "name": f.name, "path": f.browse_path(), "media_type": f.media_type }))
                    .collect::<Vec<_>>(),
                "items": media
                    .iter()
                    .map(|m| json!({ "name": m.name, "uri": m.uri, "media_type": m.media_type }))
                    .collect::<Vec<_>>(),
                "offset": request.offset,
                "total": total,
                "has_more": has_more,
            }),
        ))
    }
}
