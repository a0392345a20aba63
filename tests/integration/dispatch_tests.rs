use super::*;
use chrono::Utc;
use size_watcher::NotificationDispatcher;
use size_watcher::config::{DiscordConfig, PushoverConfig};
use size_watcher::fetcher::HttpFetcher;
use size_watcher::image_cache::ImageCache;
use size_watcher::models::{ProviderKind, TransitionKind};
use size_watcher::plugins::notifiers::{DiscordNotifier, PushoverNotifier};
use size_watcher::plugins::traits::{ImageSource, NotificationEvent};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn restock_event(image_url: String) -> NotificationEvent {
    NotificationEvent {
        id: Uuid::new_v4(),
        kind: TransitionKind::Restock,
        product_title: "Air Max 1".to_string(),
        provider: ProviderKind::Nike,
        size_label: "44".to_string(),
        title: "Air Max 1 available 👟".to_string(),
        body: "Size 44 now available at nike".to_string(),
        target_url: "https://www.nike.com/de/t/air-max-1".to_string(),
        include_image: true,
        image: Some(ImageSource {
            cache_key: "air-max-1".to_string(),
            url: image_url,
        }),
        observed_at: Utc::now(),
    }
}

fn dispatcher(server: &MockServer, cache_dir: &TempDir) -> Arc<NotificationDispatcher> {
    let fetcher = HttpFetcher::with_timeout("SizeWatcher-Test/1.0", Duration::from_secs(2)).unwrap();
    let client = fetcher.client().clone();

    let pushover = PushoverNotifier::new(
        client.clone(),
        &PushoverConfig {
            enabled: true,
            app_token: Some("app".to_string()),
            user_token: Some("user".to_string()),
            sound: None,
            api_url: format!("{}/1/messages.json", server.uri()),
        },
    )
    .unwrap();
    let discord = DiscordNotifier::new(
        client,
        DiscordConfig {
            webhook_url: format!("{}/hook", server.uri()),
            username: "Size Watcher".to_string(),
            avatar_url: None,
        },
    );

    let mut dispatcher = NotificationDispatcher::new(fetcher, Duration::from_secs(2))
        .with_image_cache(ImageCache::new(cache_dir.path()))
        .with_link_url(Some("https://www.nike.com/de/launch".to_string()));
    dispatcher.register_channel(Arc::new(discord));
    dispatcher.register_channel(Arc::new(pushover));

    Arc::new(dispatcher)
}

#[tokio::test]
async fn test_failed_channel_leaves_sibling_delivered() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/1/messages.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"status":1,"request":"abc"}"#))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/am1.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(PNG_BYTES))
        .expect(1)
        .mount(&server)
        .await;

    let cache_dir = TempDir::new()?;
    let dispatcher = dispatcher(&server, &cache_dir);

    let results = dispatcher
        .fan_out(restock_event(format!("{}/am1.png", server.uri())))
        .await?;

    assert_eq!(results.len(), 2);
    let discord = results.iter().find(|r| r.channel == "discord").unwrap();
    let pushover = results.iter().find(|r| r.channel == "pushover").unwrap();
    assert!(!discord.success);
    assert!(pushover.success);
    assert_eq!(pushover.message_id.as_deref(), Some("abc"));

    assert!(cache_dir.path().join("air-max-1.png").exists());

    let pushes = requests_to(&server, "/1/messages.json").await;
    let body = String::from_utf8_lossy(&pushes[0].body).into_owned();
    assert!(body.contains("https://www.nike.com/de/launch"));
    assert!(body.contains("name=\"attachment\""));

    Ok(())
}

#[tokio::test]
async fn test_unreachable_image_sends_text_only() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    accept_webhook(&server, "/hook").await;
    Mock::given(method("POST"))
        .and(path("/1/messages.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"status":1,"request":"abc"}"#))
        .mount(&server)
        .await;

    let cache_dir = TempDir::new()?;
    let dispatcher = dispatcher(&server, &cache_dir);

    let results = dispatcher
        .fan_out(restock_event(format!("{}/missing.png", server.uri())))
        .await?;

    assert!(results.iter().all(|r| r.success));

    let pushes = requests_to(&server, "/1/messages.json").await;
    let body = String::from_utf8_lossy(&pushes[0].body).into_owned();
    assert!(!body.contains("name=\"attachment\""));

    Ok(())
}
