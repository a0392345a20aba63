use async_trait::async_trait;
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use serde_json::json;
use std::path::Path;

use crate::config::DiscordConfig;
use crate::image_cache::mime_for;
use crate::models::TransitionKind;
use crate::plugins::traits::{NotificationEvent, NotificationResult, NotifierPlugin};
use crate::utils::error::{AppError, Result};

pub struct DiscordNotifier {
    client: Client,
    config: DiscordConfig,
}

impl DiscordNotifier {
    pub fn new(client: Client, config: DiscordConfig) -> Self {
        Self { client, config }
    }

    fn get_embed_color(&self, kind: &TransitionKind) -> u32 {
        match kind {
            TransitionKind::Restock => 0x00ff00, // Green for restocks
            TransitionKind::Sellout => 0xff3333,
        }
    }

    fn get_emoji(&self, kind: &TransitionKind) -> &str {
        match kind {
            TransitionKind::Restock => "✅",
            TransitionKind::Sellout => "❌",
        }
    }

    fn create_embed(&self, event: &NotificationEvent, image_name: Option<&str>) -> serde_json::Value {
        let mut embed = json!({
            "title": format!("{} {}", self.get_emoji(&event.kind), event.title),
            "description": event.body,
            "url": event.target_url,
            "color": self.get_embed_color(&event.kind),
            "timestamp": event.observed_at.to_rfc3339(),
            "fields": [
                { "name": "👟 Size", "value": event.size_label, "inline": true },
                { "name": "🏪 Store", "value": format!("[{}]({})", event.provider, event.target_url), "inline": true }
            ],
            "footer": { "text": self.config.username }
        });

        if let Some(name) = image_name {
            embed["thumbnail"] = json!({ "url": format!("attachment://{}", name) });
        }

        embed
    }

    fn create_webhook_payload(&self, event: &NotificationEvent, image_name: Option<&str>) -> serde_json::Value {
        let mut payload = json!({
            "username": self.config.username,
            "embeds": [self.create_embed(event, image_name)]
        });

        if let Some(avatar_url) = &self.config.avatar_url {
            payload["avatar_url"] = json!(avatar_url);
        }

        payload
    }

    fn webhook_url(&self) -> String {
        if self.config.webhook_url.contains('?') {
            format!("{}&wait=true", self.config.webhook_url)
        } else {
            format!("{}?wait=true", self.config.webhook_url)
        }
    }
}

#[async_trait]
impl NotifierPlugin for DiscordNotifier {
    fn name(&self) -> &str {
        "Discord Notifier"
    }

    fn plugin_type(&self) -> &str {
        "discord"
    }

    fn supports_attachments(&self) -> bool {
        true
    }

    async fn notify(&self, event: &NotificationEvent, attachment: Option<&Path>) -> Result<NotificationResult> {
        let channel = self.plugin_type();

        let image = match attachment {
            Some(path) => match tokio::fs::read(path).await {
                Ok(bytes) => {
                    let name = path
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_else(|| "image.png".to_string());
                    Some((name, bytes, mime_for(path)))
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), "Posting Discord embed without image: {}", e);
                    None
                }
            },
            None => None,
        };

        let payload = self.create_webhook_payload(event, image.as_ref().map(|(name, _, _)| name.as_str()));
        let request = self.client.post(self.webhook_url());

        let request = match image {
            Some((name, bytes, mime)) => {
                let file = Part::bytes(bytes)
                    .file_name(name)
                    .mime_str(mime)
                    .map_err(|e| AppError::delivery(channel, e))?;
                let form = Form::new()
                    .text("payload_json", payload.to_string())
                    .part("files[0]", file);
                request.multipart(form)
            }
            None => request.json(&payload),
        };

        let response = request.send().await.map_err(|e| AppError::delivery(channel, e))?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::delivery(channel, format!("HTTP {}: {}", status, body)));
        }

        let message_id = response
            .json::<serde_json::Value>()
            .await
            .ok()
            .and_then(|v| v.get("id").and_then(|id| id.as_str()).map(str::to_string));

        Ok(NotificationResult::delivered(channel, message_id))
    }
}
