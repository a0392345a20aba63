use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

use crate::models::{ProviderKind, TransitionKind};
use crate::utils::error::Result;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImageSource {
    pub cache_key: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationEvent {
    pub id: Uuid,
    pub kind: TransitionKind,
    pub product_title: String,
    pub provider: ProviderKind,
    pub size_label: String,
    pub title: String,
    pub body: String,
    pub target_url: String,
    pub include_image: bool,
    pub image: Option<ImageSource>,
    pub observed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationResult {
    pub channel: String,
    pub success: bool,
    pub message_id: Option<String>,
    pub error: Option<String>,
}

impl NotificationResult {
    pub fn delivered(channel: &str, message_id: Option<String>) -> Self {
        Self {
            channel: channel.to_string(),
            success: true,
            message_id,
            error: None,
        }
    }

    pub fn failed(channel: &str, error: impl ToString) -> Self {
        Self {
            channel: channel.to_string(),
            success: false,
            message_id: None,
            error: Some(error.to_string()),
        }
    }
}

/// Trait for implementing notification channels (desktop, Pushover, etc.)
#[async_trait]
pub trait NotifierPlugin: Send + Sync {
    fn name(&self) -> &str;
    fn plugin_type(&self) -> &str;

    /// Whether the channel can make use of a cached product image.
    fn supports_attachments(&self) -> bool {
        false
    }

    async fn notify(&self, event: &NotificationEvent, attachment: Option<&Path>) -> Result<NotificationResult>;
}
