// Integration tests for Size Watcher
// Vendor pages and notification endpoints are served by wiremock

pub mod dispatch_tests;
pub mod poll_cycle_tests;

use config::FileFormat;
use serde_json::json;
use size_watcher::AppConfig;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

pub const PNG_BYTES: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0x0D];

/// Nike product page embedding one product record.
pub fn nike_page(product_id: &str, sizes: &[(&str, bool)]) -> String {
    let skus: Vec<_> = sizes
        .iter()
        .enumerate()
        .map(|(i, (label, _))| json!({ "skuId": format!("sku-{}", i), "nikeSize": "9", "localizedSize": label }))
        .collect();
    let available: Vec<_> = sizes
        .iter()
        .enumerate()
        .map(|(i, (_, avail))| json!({ "skuId": format!("sku-{}", i), "available": avail }))
        .collect();

    let state = json!({
        "Threads": {
            "products": {
                product_id: {
                    "id": product_id,
                    "styleColor": product_id,
                    "title": "Air Max 1",
                    "skus": skus,
                    "availableSkus": available
                }
            }
        }
    });

    format!(
        "<html><head><script>window.INITIAL_REDUX_STATE={};</script></head><body></body></html>",
        state
    )
}

/// Zalando product page with one GraphQL cache script.
pub fn zalando_page(entity_id: &str, sizes: &[(&str, &str)]) -> String {
    let simples: Vec<_> = sizes
        .iter()
        .map(|(size, quantity)| json!({ "size": size, "offer": { "stock": { "quantity": quantity } } }))
        .collect();

    let cache = json!({
        "graphqlCache": {
            "q1": { "data": { "context": { "entity_id": entity_id, "name": "Air Max 1", "simples": simples } } }
        }
    });

    format!(
        r#"<html><body><script data-re-asset="true" class="re-1-12" type="application/json">{}</script></body></html>"#,
        cache
    )
}

pub async fn serve_page(server: &MockServer, page_path: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(page_path))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

pub async fn accept_webhook(server: &MockServer, hook_path: &str) {
    Mock::given(method("POST"))
        .and(path(hook_path))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"id":"42"}"#))
        .mount(server)
        .await;
}

/// Requests the server received on `request_path`, oldest first.
pub async fn requests_to(server: &MockServer, request_path: &str) -> Vec<Request> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|r| r.url.path() == request_path)
        .collect()
}

/// Config watching one product on the given providers, notifying only through
/// a Discord webhook on `server`.
pub fn test_config(server: &MockServer, sizes: &[&str], providers: serde_json::Value) -> AppConfig {
    let config = json!({
        "poll_interval_seconds": 60,
        "http": { "timeout_seconds": 2, "user_agent": "SizeWatcher-Test/1.0" },
        "image_cache": { "enabled": false },
        "notifications": {
            "timeout_seconds": 2,
            "desktop": { "enabled": false },
            "discord": { "webhook_url": format!("{}/hook", server.uri()) }
        },
        "products": [{
            "title": "Air Max 1",
            "sizes": sizes,
            "providers": providers
        }]
    });

    AppConfig::from_content(&config.to_string(), FileFormat::Json).unwrap()
}
