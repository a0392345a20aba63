use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::env;
use std::time::Duration;
use url::Url;
use validator::Validate;

use crate::models::{FirstPollPolicy, ProviderKind};

pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36";
pub const PUSHOVER_API_URL: &str = "https://api.pushover.net/1/messages.json";

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AppConfig {
    #[serde(alias = "loop_interval")]
    #[validate(range(min = 1, message = "poll_interval_seconds must be greater than 0"))]
    pub poll_interval_seconds: u64,
    #[serde(default)]
    pub first_poll: FirstPollPolicy,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub image_cache: ImageCacheConfig,
    #[serde(default)]
    pub notifications: NotificationsConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[validate(length(min = 1, message = "at least one product must be configured"))]
    pub products: Vec<ProductConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ProductConfig {
    #[validate(length(min = 1, message = "product title must not be empty"))]
    pub title: String,
    #[serde(default, alias = "img")]
    pub image: Option<String>,
    #[validate(length(min = 1, message = "at least one size must be watched"))]
    pub sizes: Vec<String>,
    #[validate(length(min = 1, message = "at least one provider is required"))]
    pub providers: Vec<ProviderConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ProviderConfig {
    pub id: ProviderKind,
    #[validate(url(message = "provider url must be a valid URL"))]
    pub url: String,
    /// Vendor record to pick when a page lists several (colourways etc.).
    #[serde(default)]
    pub product_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_seconds: u64,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 5,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageCacheConfig {
    pub enabled: bool,
    pub directory: String,
}

impl Default for ImageCacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            directory: "data/images".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsConfig {
    /// Replaces the provider URL as the click-through link of every notification.
    #[serde(default)]
    pub link_url: Option<String>,
    #[serde(default = "default_send_timeout")]
    pub timeout_seconds: u64,
    #[serde(default)]
    pub desktop: DesktopConfig,
    #[serde(default)]
    pub pushover: Option<PushoverConfig>,
    #[serde(default)]
    pub discord: Option<DiscordConfig>,
    #[serde(default)]
    pub email: Option<SmtpConfig>,
}

fn default_send_timeout() -> u64 {
    10
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            link_url: None,
            timeout_seconds: default_send_timeout(),
            desktop: DesktopConfig::default(),
            pushover: None,
            discord: None,
            email: None,
        }
    }
}

impl NotificationsConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DesktopConfig {
    pub enabled: bool,
    pub sound: Option<String>,
    pub group: String,
}

impl Default for DesktopConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sound: Some("Sosumi".to_string()),
            group: "size-watcher".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushoverConfig {
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    #[serde(default)]
    pub app_token: Option<String>,
    #[serde(default)]
    pub user_token: Option<String>,
    #[serde(default)]
    pub sound: Option<String>,
    #[serde(default = "default_pushover_url")]
    pub api_url: String,
}

fn enabled_by_default() -> bool {
    true
}

fn default_pushover_url() -> String {
    PUSHOVER_API_URL.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscordConfig {
    pub webhook_url: String,
    #[serde(default = "default_discord_username")]
    pub username: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

fn default_discord_username() -> String {
    "Size Watcher".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    pub from_address: String,
    #[serde(default = "default_discord_username")]
    pub from_name: String,
    pub to_address: String,
    #[serde(default = "enabled_by_default")]
    pub use_tls: bool,
}

fn default_smtp_port() -> u16 {
    587
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: 9001,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub directory: Option<String>,
    pub file_prefix: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: None,
            file_prefix: "size-watcher.log".to_string(),
        }
    }
}

impl AppConfig {
    /// Load from a config file (TOML or JSON, by extension) overlaid with
    /// `SIZEWATCH__*` environment variables.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::with_name(path))
            .add_source(Environment::with_prefix("SIZEWATCH").separator("__"))
            .build()?;

        Self::finish(s.try_deserialize()?, |key| env::var(key).ok())
    }

    pub fn from_content(content: &str, format: FileFormat) -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::from_str(content, format))
            .build()?;

        Self::finish(s.try_deserialize()?, |_| None)
    }

    fn finish(
        mut config: AppConfig,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        config.apply_credential_fallbacks(lookup);
        config.validate()?;
        Ok(config)
    }

    /// Pushover tokens historically lived in `.env`; honour those names when the
    /// file leaves them out.
    pub fn apply_credential_fallbacks(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(pushover) = self.notifications.pushover.as_mut() {
            if pushover.app_token.is_none() {
                pushover.app_token = lookup("PUSHOVER_APP_TOKEN");
            }
            if pushover.user_token.is_none() {
                pushover.user_token = lookup("PUSHOVER_USER_TOKEN");
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        Validate::validate(self).map_err(|e| ConfigError::Message(e.to_string()))?;

        if self.http.timeout_seconds == 0 {
            return Err(ConfigError::Message("http.timeout_seconds must be greater than 0".into()));
        }

        if self.notifications.timeout_seconds == 0 {
            return Err(ConfigError::Message("notifications.timeout_seconds must be greater than 0".into()));
        }

        for product in &self.products {
            Validate::validate(product)
                .map_err(|e| ConfigError::Message(format!("product '{}': {}", product.title, e)))?;

            let mut seen = HashSet::new();
            for size in &product.sizes {
                if size.trim().is_empty() {
                    return Err(ConfigError::Message(format!(
                        "product '{}': size labels must not be empty",
                        product.title
                    )));
                }
                if !seen.insert(size.trim()) {
                    return Err(ConfigError::Message(format!(
                        "product '{}': duplicate size '{}'",
                        product.title, size
                    )));
                }
            }

            for provider in &product.providers {
                Validate::validate(provider).map_err(|e| {
                    ConfigError::Message(format!("product '{}': {}: {}", product.title, provider.id, e))
                })?;
            }
        }

        if let Some(link) = &self.notifications.link_url {
            if Url::parse(link).is_err() {
                return Err(ConfigError::Message("Invalid notifications.link_url format".into()));
            }
        }

        if let Some(pushover) = &self.notifications.pushover {
            if pushover.enabled {
                let missing = |v: &Option<String>| v.as_deref().map_or(true, |s| s.trim().is_empty());
                if missing(&pushover.app_token) || missing(&pushover.user_token) {
                    return Err(ConfigError::Message(
                        "Pushover requires app_token and user_token".into(),
                    ));
                }
            }
        }

        if let Some(discord) = &self.notifications.discord {
            if Url::parse(&discord.webhook_url).is_err() {
                return Err(ConfigError::Message("Invalid Discord webhook URL format".into()));
            }
        }

        if let Some(email) = &self.notifications.email {
            if email.port == 0 {
                return Err(ConfigError::Message("SMTP port must be greater than 0".into()));
            }
            if !email.from_address.contains('@') || !email.to_address.contains('@') {
                return Err(ConfigError::Message("SMTP from/to addresses must be email addresses".into()));
            }
        }

        if self.metrics.enabled && self.metrics.port == 0 {
            return Err(ConfigError::Message("Metrics port must be greater than 0".into()));
        }

        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_seconds)
    }

    /// Number of (product, provider) pairings this config produces.
    pub fn pairing_count(&self) -> usize {
        self.products.iter().map(|p| p.providers.len()).sum()
    }
}
