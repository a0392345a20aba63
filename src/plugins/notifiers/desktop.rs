use async_trait::async_trait;
use std::path::Path;
use tokio::process::Command;

use crate::config::DesktopConfig;
use crate::plugins::traits::{NotificationEvent, NotificationResult, NotifierPlugin};
use crate::utils::error::{AppError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DesktopBackend {
    /// `terminal-notifier` on macOS
    TerminalNotifier,
    /// `notify-send` on freedesktop systems
    NotifySend,
}

impl DesktopBackend {
    pub fn current() -> Self {
        if cfg!(target_os = "macos") {
            DesktopBackend::TerminalNotifier
        } else {
            DesktopBackend::NotifySend
        }
    }

    pub fn program(&self) -> &'static str {
        match self {
            DesktopBackend::TerminalNotifier => "terminal-notifier",
            DesktopBackend::NotifySend => "notify-send",
        }
    }
}

pub struct DesktopNotifier {
    config: DesktopConfig,
    backend: DesktopBackend,
}

impl DesktopNotifier {
    pub fn new(config: DesktopConfig) -> Self {
        Self {
            config,
            backend: DesktopBackend::current(),
        }
    }

    pub fn with_backend(config: DesktopConfig, backend: DesktopBackend) -> Self {
        Self { config, backend }
    }

    pub fn command_args(&self, event: &NotificationEvent, image: Option<&Path>) -> Vec<String> {
        let mut args = Vec::new();

        match self.backend {
            DesktopBackend::TerminalNotifier => {
                args.extend(["-title".to_string(), event.title.clone()]);
                args.extend(["-message".to_string(), event.body.clone()]);
                if let Some(sound) = &self.config.sound {
                    args.extend(["-sound".to_string(), sound.clone()]);
                }
                args.extend(["-group".to_string(), self.config.group.clone()]);
                args.extend(["-open".to_string(), event.target_url.clone()]);
                if let Some(image) = image {
                    args.extend(["-contentImage".to_string(), image.display().to_string()]);
                }
            }
            DesktopBackend::NotifySend => {
                args.extend(["--app-name".to_string(), self.config.group.clone()]);
                if let Some(image) = image {
                    args.extend(["--icon".to_string(), image.display().to_string()]);
                }
                args.push(event.title.clone());
                args.push(format!("{}\n{}", event.body, event.target_url));
            }
        }

        args
    }
}

#[async_trait]
impl NotifierPlugin for DesktopNotifier {
    fn name(&self) -> &str {
        "Desktop Notifier"
    }

    fn plugin_type(&self) -> &str {
        "desktop"
    }

    fn supports_attachments(&self) -> bool {
        true
    }

    async fn notify(&self, event: &NotificationEvent, attachment: Option<&Path>) -> Result<NotificationResult> {
        let program = self.backend.program();
        let output = Command::new(program)
            .args(self.command_args(event, attachment))
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| AppError::delivery(self.plugin_type(), format!("failed to run {}: {}", program, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AppError::delivery(
                self.plugin_type(),
                format!("{} exited with {}: {}", program, output.status, stderr.trim()),
            ));
        }

        Ok(NotificationResult::delivered(self.plugin_type(), None))
    }
}
