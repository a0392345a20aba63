use futures::future::join_all;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::config::AppConfig;
use crate::fetcher::HttpFetcher;
use crate::image_cache::ImageCache;
use crate::plugins::notifiers::channels_from_config;
use crate::plugins::traits::{NotificationEvent, NotificationResult, NotifierPlugin};
use crate::utils::error::Result;

pub type NotifierPluginArc = Arc<dyn NotifierPlugin>;

/// Fans each event out to every configured channel.
///
/// Channels run as independent tasks. A failing or slow channel is logged and
/// never holds back its siblings; each event is attempted at most once per channel.
pub struct NotificationDispatcher {
    channels: Vec<NotifierPluginArc>,
    image_cache: Option<ImageCache>,
    fetcher: HttpFetcher,
    link_url: Option<String>,
    send_timeout: Duration,
}

impl NotificationDispatcher {
    pub fn new(fetcher: HttpFetcher, send_timeout: Duration) -> Self {
        Self {
            channels: Vec::new(),
            image_cache: None,
            fetcher,
            link_url: None,
            send_timeout,
        }
    }

    pub fn with_image_cache(mut self, cache: ImageCache) -> Self {
        self.image_cache = Some(cache);
        self
    }

    /// Every notification links here instead of the provider page.
    pub fn with_link_url(mut self, link_url: Option<String>) -> Self {
        self.link_url = link_url;
        self
    }

    pub fn register_channel(&mut self, channel: NotifierPluginArc) {
        tracing::debug!(channel = channel.plugin_type(), "Registered notification channel");
        self.channels.push(channel);
    }

    pub fn channel_types(&self) -> Vec<String> {
        self.channels.iter().map(|c| c.plugin_type().to_string()).collect()
    }

    pub fn from_config(config: &AppConfig, fetcher: HttpFetcher) -> Result<Self> {
        let notifications = &config.notifications;
        let channels = channels_from_config(notifications, fetcher.client().clone())?;

        let mut dispatcher = Self::new(fetcher, notifications.timeout()).with_link_url(notifications.link_url.clone());
        if config.image_cache.enabled {
            dispatcher = dispatcher.with_image_cache(ImageCache::new(&config.image_cache.directory));
        }

        for channel in channels {
            dispatcher.register_channel(channel);
        }

        if dispatcher.channels.is_empty() {
            tracing::warn!("No notification channels enabled; transitions will only be logged");
        }

        Ok(dispatcher)
    }

    /// Start delivering `event` in the background.
    ///
    /// The handle resolves to one outcome per channel. Callers that do not care
    /// about outcomes may drop it.
    pub fn fan_out(self: &Arc<Self>, event: NotificationEvent) -> JoinHandle<Vec<NotificationResult>> {
        let dispatcher = Arc::clone(self);
        tokio::spawn(async move { dispatcher.deliver(event).await })
    }

    pub async fn deliver(&self, mut event: NotificationEvent) -> Vec<NotificationResult> {
        if let Some(link) = &self.link_url {
            event.target_url = link.clone();
        }

        tracing::info!(
            product = %event.product_title,
            provider = %event.provider,
            size = %event.size_label,
            kind = ?event.kind,
            "{}: {}",
            event.title,
            event.body
        );
        metrics::counter!("size_watcher_events_total", "kind" => format!("{:?}", event.kind).to_lowercase())
            .increment(1);

        let attachment = if self.channels.iter().any(|c| c.supports_attachments()) {
            self.resolve_attachment(&event).await
        } else {
            None
        };

        let event = Arc::new(event);
        let send_timeout = self.send_timeout;

        let handles: Vec<_> = self
            .channels
            .iter()
            .map(|channel| {
                let channel = Arc::clone(channel);
                let event = Arc::clone(&event);
                let attachment = attachment.clone().filter(|_| channel.supports_attachments());

                tokio::spawn(async move {
                    let name = channel.plugin_type().to_string();
                    match tokio::time::timeout(send_timeout, channel.notify(&event, attachment.as_deref())).await {
                        Ok(Ok(result)) => result,
                        Ok(Err(e)) => NotificationResult::failed(&name, e),
                        Err(_) => NotificationResult::failed(&name, format!("timed out after {:?}", send_timeout)),
                    }
                })
            })
            .collect();

        let results: Vec<NotificationResult> = join_all(handles)
            .await
            .into_iter()
            .zip(self.channels.iter())
            .map(|(joined, channel)| {
                joined.unwrap_or_else(|e| NotificationResult::failed(channel.plugin_type(), format!("task failed: {}", e)))
            })
            .collect();

        for result in &results {
            let outcome = if result.success { "delivered" } else { "failed" };
            metrics::counter!(
                "size_watcher_deliveries_total",
                "channel" => result.channel.clone(),
                "outcome" => outcome
            )
            .increment(1);

            match &result.error {
                Some(error) if !result.success => {
                    tracing::warn!(channel = %result.channel, event_id = %event.id, "Notification failed: {}", error)
                }
                _ => tracing::debug!(channel = %result.channel, event_id = %event.id, "Notification delivered"),
            }
        }

        results
    }

    /// Cached image for the event's product, downloading it on a miss. Any
    /// failure leaves the notification text-only.
    async fn resolve_attachment(&self, event: &NotificationEvent) -> Option<PathBuf> {
        if !event.include_image {
            return None;
        }

        let cache = self.image_cache.as_ref()?;
        let source = event.image.as_ref()?;

        match cache.get_or_fetch(&source.cache_key, &source.url, &self.fetcher).await {
            Ok(path) => Some(path),
            Err(e) => {
                tracing::warn!(url = %source.url, "Product image unavailable, sending text-only: {}", e);
                None
            }
        }
    }
}
