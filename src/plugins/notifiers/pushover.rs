use async_trait::async_trait;
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::path::Path;

use crate::config::PushoverConfig;
use crate::image_cache::mime_for;
use crate::plugins::traits::{NotificationEvent, NotificationResult, NotifierPlugin};
use crate::utils::error::{AppError, Result};

#[derive(Debug, Deserialize)]
struct PushoverResponse {
    status: i64,
    #[serde(default)]
    request: Option<String>,
    #[serde(default)]
    errors: Vec<String>,
}

pub struct PushoverNotifier {
    client: Client,
    api_url: String,
    app_token: String,
    user_token: String,
    sound: Option<String>,
}

impl PushoverNotifier {
    pub fn new(client: Client, config: &PushoverConfig) -> Result<Self> {
        let token = |value: &Option<String>, name: &str| {
            value
                .clone()
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| AppError::Validation(format!("Pushover requires {}", name)))
        };

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            app_token: token(&config.app_token, "app_token")?,
            user_token: token(&config.user_token, "user_token")?,
            sound: config.sound.clone(),
        })
    }

    fn form(&self, event: &NotificationEvent) -> Form {
        let mut form = Form::new()
            .text("token", self.app_token.clone())
            .text("user", self.user_token.clone())
            .text("title", event.title.clone())
            .text("message", event.body.clone())
            .text("url", event.target_url.clone());

        if let Some(sound) = &self.sound {
            form = form.text("sound", sound.clone());
        }

        form
    }
}

#[async_trait]
impl NotifierPlugin for PushoverNotifier {
    fn name(&self) -> &str {
        "Pushover Notifier"
    }

    fn plugin_type(&self) -> &str {
        "pushover"
    }

    fn supports_attachments(&self) -> bool {
        true
    }

    async fn notify(&self, event: &NotificationEvent, attachment: Option<&Path>) -> Result<NotificationResult> {
        let channel = self.plugin_type();
        let mut form = self.form(event);

        if let Some(path) = attachment {
            match tokio::fs::read(path).await {
                Ok(bytes) => {
                    let file_name = path
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_else(|| "image".to_string());
                    let part = Part::bytes(bytes)
                        .file_name(file_name)
                        .mime_str(mime_for(path))
                        .map_err(|e| AppError::delivery(channel, e))?;
                    form = form.part("attachment", part);
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), "Sending Pushover message without image: {}", e);
                }
            }
        }

        let response = self
            .client
            .post(&self.api_url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| AppError::delivery(channel, e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| AppError::delivery(channel, e))?;

        if !status.is_success() {
            return Err(AppError::delivery(channel, format!("HTTP {}: {}", status, body)));
        }

        let parsed: PushoverResponse = serde_json::from_str(&body)
            .map_err(|e| AppError::delivery(channel, format!("unexpected response: {}", e)))?;

        if parsed.status != 1 {
            return Err(AppError::delivery(
                channel,
                format!("status {}: {}", parsed.status, parsed.errors.join("; ")),
            ));
        }

        Ok(NotificationResult::delivered(channel, parsed.request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ProviderKind, TransitionKind};
    use chrono::Utc;
    use tempfile::TempDir;
    use uuid::Uuid;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn event() -> NotificationEvent {
        NotificationEvent {
            id: Uuid::new_v4(),
            kind: TransitionKind::Restock,
            product_title: "Dunk Low".to_string(),
            provider: ProviderKind::Zalando,
            size_label: "42".to_string(),
            title: "Dunk Low available 👟".to_string(),
            body: "Size 42 now available at zalando".to_string(),
            target_url: "https://www.zalando.de/dunk.html".to_string(),
            include_image: true,
            image: None,
            observed_at: Utc::now(),
        }
    }

    fn notifier(server: &MockServer) -> PushoverNotifier {
        let config = PushoverConfig {
            enabled: true,
            app_token: Some("app-token".to_string()),
            user_token: Some("user-token".to_string()),
            sound: Some("cashregister".to_string()),
            api_url: format!("{}/1/messages.json", server.uri()),
        };
        PushoverNotifier::new(Client::new(), &config).unwrap()
    }

    #[tokio::test]
    async fn test_sends_form_with_attachment() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/1/messages.json"))
            .and(body_string_contains("app-token"))
            .and(body_string_contains("Size 42 now available at zalando"))
            .and(body_string_contains("name=\"attachment\""))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"status":1,"request":"req-123"}"#))
            .expect(1)
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let image = dir.path().join("dunk-low.png");
        std::fs::write(&image, b"png-bytes").unwrap();

        let result = notifier(&server).notify(&event(), Some(&image)).await.unwrap();
        assert!(result.success);
        assert_eq!(result.message_id.as_deref(), Some("req-123"));
    }

    #[tokio::test]
    async fn test_api_rejection_is_delivery_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"status":0,"errors":["user identifier is invalid"]}"#))
            .mount(&server)
            .await;

        let err = notifier(&server).notify(&event(), None).await.unwrap_err();
        assert!(matches!(err, AppError::ChannelDelivery { .. }));
        assert!(err.to_string().contains("user identifier is invalid"));
    }

    #[tokio::test]
    async fn test_http_error_is_delivery_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        assert!(notifier(&server).notify(&event(), None).await.is_err());
    }

    #[test]
    fn test_missing_token_rejected() {
        let config = PushoverConfig {
            enabled: true,
            app_token: Some("app".to_string()),
            user_token: Some("  ".to_string()),
            sound: None,
            api_url: crate::config::PUSHOVER_API_URL.to_string(),
        };
        assert!(PushoverNotifier::new(Client::new(), &config).is_err());
    }
}
