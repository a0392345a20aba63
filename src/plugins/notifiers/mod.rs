// Notification channel implementations
pub mod desktop;
pub mod discord;
pub mod email;
pub mod pushover;

pub use desktop::DesktopNotifier;
pub use discord::DiscordNotifier;
pub use email::EmailNotifier;
pub use pushover::PushoverNotifier;

use reqwest::Client;
use std::sync::Arc;

use crate::config::NotificationsConfig;
use crate::plugins::traits::NotifierPlugin;
use crate::utils::error::Result;

/// Build every enabled channel from configuration. Credentials are handed to
/// each channel here and nowhere else.
pub fn channels_from_config(config: &NotificationsConfig, client: Client) -> Result<Vec<Arc<dyn NotifierPlugin>>> {
    let mut channels: Vec<Arc<dyn NotifierPlugin>> = Vec::new();

    if config.desktop.enabled {
        channels.push(Arc::new(DesktopNotifier::new(config.desktop.clone())));
    }

    if let Some(pushover) = config.pushover.as_ref().filter(|p| p.enabled) {
        channels.push(Arc::new(PushoverNotifier::new(client.clone(), pushover)?));
    }

    if let Some(discord) = &config.discord {
        channels.push(Arc::new(DiscordNotifier::new(client.clone(), discord.clone())));
    }

    if let Some(email) = &config.email {
        channels.push(Arc::new(EmailNotifier::new(email)?));
    }

    Ok(channels)
}
