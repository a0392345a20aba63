use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::path::Path;

use crate::config::SmtpConfig;
use crate::image_cache::mime_for;
use crate::models::TransitionKind;
use crate::plugins::traits::{NotificationEvent, NotificationResult, NotifierPlugin};
use crate::utils::error::{AppError, Result};

pub struct EmailNotifier {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
}

impl EmailNotifier {
    pub fn new(config: &SmtpConfig) -> Result<Self> {
        let builder = if config.use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
                .map_err(|e| AppError::Validation(format!("Invalid SMTP relay '{}': {}", config.host, e)))?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
        };

        let builder = builder.port(config.port);
        let builder = match (&config.username, &config.password) {
            (Some(username), Some(password)) => builder.credentials(Credentials::new(username.clone(), password.clone())),
            _ => builder,
        };

        Ok(Self {
            mailer: builder.build(),
            from: Mailbox::new(Some(config.from_name.clone()), parse_address(&config.from_address)?),
            to: Mailbox::new(None, parse_address(&config.to_address)?),
        })
    }

    fn format_subject(&self, event: &NotificationEvent) -> String {
        match event.kind {
            TransitionKind::Restock => format!("🔔 Restock: {} size {}", event.product_title, event.size_label),
            TransitionKind::Sellout => format!("Sold out: {} size {}", event.product_title, event.size_label),
        }
    }

    fn format_text_body(&self, event: &NotificationEvent) -> String {
        let mut text = String::new();

        text.push_str(&format!("{}\n\n", event.title));
        text.push_str(&format!("{}\n\n", event.body));
        text.push_str(&format!("Product: {}\n", event.product_title));
        text.push_str(&format!("Size: {}\n", event.size_label));
        text.push_str(&format!("Store: {}\n", event.provider));
        text.push_str(&format!("URL: {}\n", event.target_url));

        text
    }

    pub fn build_message(&self, event: &NotificationEvent, image: Option<(String, Vec<u8>, &str)>) -> Result<Message> {
        let builder = Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(self.format_subject(event));

        let text = self.format_text_body(event);

        let message = match image {
            Some((name, bytes, mime)) => {
                let content_type = ContentType::parse(mime)
                    .map_err(|e| AppError::delivery(self.plugin_type(), format!("bad content type {}: {}", mime, e)))?;
                builder.multipart(
                    MultiPart::mixed()
                        .singlepart(SinglePart::plain(text))
                        .singlepart(Attachment::new(name).body(bytes, content_type)),
                )
            }
            None => builder.header(ContentType::TEXT_PLAIN).body(text),
        };

        message.map_err(|e| AppError::delivery(self.plugin_type(), e))
    }
}

fn parse_address(address: &str) -> Result<Address> {
    address
        .parse::<Address>()
        .map_err(|e| AppError::Validation(format!("Invalid email address '{}': {}", address, e)))
}

#[async_trait]
impl NotifierPlugin for EmailNotifier {
    fn name(&self) -> &str {
        "Email Notifier"
    }

    fn plugin_type(&self) -> &str {
        "email"
    }

    fn supports_attachments(&self) -> bool {
        true
    }

    async fn notify(&self, event: &NotificationEvent, attachment: Option<&Path>) -> Result<NotificationResult> {
        let image = match attachment {
            Some(path) => match tokio::fs::read(path).await {
                Ok(bytes) => {
                    let name = path
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_else(|| "image".to_string());
                    Some((name, bytes, mime_for(path)))
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), "Sending email without image: {}", e);
                    None
                }
            },
            None => None,
        };

        let email = self.build_message(event, image)?;

        let response = self
            .mailer
            .send(email)
            .await
            .map_err(|e| AppError::delivery(self.plugin_type(), e))?;

        let message_id = response.message().next().map(str::to_string);
        Ok(NotificationResult::delivered(self.plugin_type(), message_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProviderKind;
    use chrono::Utc;
    use uuid::Uuid;

    fn create_test_event(kind: TransitionKind) -> NotificationEvent {
        NotificationEvent {
            id: Uuid::new_v4(),
            kind,
            product_title: "Air Max 1".to_string(),
            provider: ProviderKind::Nike,
            size_label: "44".to_string(),
            title: "Air Max 1 available".to_string(),
            body: "Size 44 now available at nike".to_string(),
            target_url: "https://www.nike.com/de/t/air-max-1".to_string(),
            include_image: true,
            image: None,
            observed_at: Utc::now(),
        }
    }

    fn create_test_config() -> SmtpConfig {
        SmtpConfig {
            host: "localhost".to_string(),
            port: 2525,
            username: None,
            password: None,
            from_address: "watcher@example.com".to_string(),
            from_name: "Size Watcher".to_string(),
            to_address: "recipient@example.com".to_string(),
            use_tls: false,
        }
    }

    #[test]
    fn test_email_notifier_metadata() {
        let notifier = EmailNotifier::new(&create_test_config()).unwrap();
        assert_eq!(notifier.name(), "Email Notifier");
        assert_eq!(notifier.plugin_type(), "email");
    }

    #[test]
    fn test_subject_formatting() {
        let notifier = EmailNotifier::new(&create_test_config()).unwrap();

        let subject = notifier.format_subject(&create_test_event(TransitionKind::Restock));
        assert!(subject.contains("Restock"));
        assert!(subject.contains("Air Max 1 size 44"));

        let subject = notifier.format_subject(&create_test_event(TransitionKind::Sellout));
        assert!(subject.starts_with("Sold out"));
    }

    #[test]
    fn test_text_body_formatting() {
        let notifier = EmailNotifier::new(&create_test_config()).unwrap();
        let body = notifier.format_text_body(&create_test_event(TransitionKind::Restock));

        assert!(body.contains("Size 44 now available at nike"));
        assert!(body.contains("Store: nike"));
        assert!(body.contains("URL: https://www.nike.com/de/t/air-max-1"));
    }

    #[test]
    fn test_message_with_attachment() {
        let notifier = EmailNotifier::new(&create_test_config()).unwrap();
        let message = notifier
            .build_message(
                &create_test_event(TransitionKind::Restock),
                Some(("air-max-1.png".to_string(), vec![1, 2, 3], "image/png")),
            )
            .unwrap();

        let raw = String::from_utf8_lossy(&message.formatted()).into_owned();
        assert!(raw.contains("recipient@example.com"));
        assert!(raw.contains("multipart/mixed"));
        assert!(raw.contains("air-max-1.png"));
    }

    #[test]
    fn test_invalid_address_rejected() {
        let mut config = create_test_config();
        config.to_address = "not an address".to_string();
        assert!(EmailNotifier::new(&config).is_err());
    }
}
