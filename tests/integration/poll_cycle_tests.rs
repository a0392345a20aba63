use super::*;
use serde_json::json;
use size_watcher::PollLoop;
use size_watcher::scheduler::PairingStatus;
use wiremock::MockServer;

fn body_text(request: &wiremock::Request) -> String {
    String::from_utf8_lossy(&request.body).into_owned()
}

#[tokio::test]
async fn test_restock_hold_sellout_through_nike_page() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    accept_webhook(&server, "/hook").await;
    serve_page(&server, "/t/air-max-1", nike_page("FD9082-100", &[("42", false), ("44", true)])).await;

    let config = test_config(
        &server,
        &["42", "44"],
        json!([{ "id": "nike", "url": format!("{}/t/air-max-1", server.uri()) }]),
    );
    let mut poll_loop = PollLoop::from_config(&config)?;

    // poll 1: 44 comes into stock
    let report = poll_loop.run_cycle().await;
    assert_eq!(report.events, 1);
    let results = report.wait_for_deliveries().await;
    assert!(results.iter().all(|r| r.success));

    let hooks = requests_to(&server, "/hook").await;
    assert_eq!(hooks.len(), 1);
    assert!(body_text(&hooks[0]).contains("Size 44 now available at nike"));

    // poll 2: nothing changed
    let report = poll_loop.run_cycle().await;
    assert_eq!(report.events, 0);
    assert_eq!(requests_to(&server, "/hook").await.len(), 1);

    // poll 3: 44 sells out
    server.reset().await;
    accept_webhook(&server, "/hook").await;
    serve_page(&server, "/t/air-max-1", nike_page("FD9082-100", &[("42", false), ("44", false)])).await;

    let report = poll_loop.run_cycle().await;
    assert_eq!(report.events, 1);
    report.wait_for_deliveries().await;

    let hooks = requests_to(&server, "/hook").await;
    assert_eq!(hooks.len(), 1);
    assert!(body_text(&hooks[0]).contains("Size 44 no longer available at nike"));

    Ok(())
}

#[tokio::test]
async fn test_broken_vendor_page_does_not_stop_other_provider() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    accept_webhook(&server, "/hook").await;
    serve_page(&server, "/nike", "<html><body>Access Denied</body></html>".to_string()).await;
    serve_page(&server, "/zalando", zalando_page("NI112O0LD-A11", &[("42", "OUT_OF_STOCK"), ("44", "ONE")])).await;

    let config = test_config(
        &server,
        &["42", "44"],
        json!([
            { "id": "nike", "url": format!("{}/nike", server.uri()) },
            { "id": "zalando", "url": format!("{}/zalando", server.uri()) }
        ]),
    );
    let mut poll_loop = PollLoop::from_config(&config)?;

    let report = poll_loop.run_cycle().await;
    assert_eq!(report.checked, 2);
    assert_eq!(report.failed, 1);
    assert_eq!(report.events, 1);
    report.wait_for_deliveries().await;

    let stats = poll_loop.stats();
    assert_eq!(stats[0].status, PairingStatus::Error);
    assert!(stats[0].last_error.as_ref().unwrap().contains("INITIAL_REDUX_STATE"));
    assert_eq!(stats[1].status, PairingStatus::Active);

    let nike = &poll_loop.pairings()[0];
    assert!(nike.tracker().sizes().iter().all(|s| !s.previously_available));

    let hooks = requests_to(&server, "/hook").await;
    assert_eq!(hooks.len(), 1);
    assert!(body_text(&hooks[0]).contains("zalando"));

    Ok(())
}

#[tokio::test]
async fn test_vendor_error_status_is_retried_next_cycle() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    accept_webhook(&server, "/hook").await;
    wiremock::Mock::given(wiremock::matchers::method("GET"))
        .respond_with(wiremock::ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let config = test_config(
        &server,
        &["44"],
        json!([{ "id": "nike", "url": format!("{}/t/air-max-1", server.uri()) }]),
    );
    let mut poll_loop = PollLoop::from_config(&config)?;

    let report = poll_loop.run_cycle().await;
    assert_eq!(report.failed, 1);
    assert!(poll_loop.stats()[0].last_error.as_ref().unwrap().contains("503"));

    server.reset().await;
    accept_webhook(&server, "/hook").await;
    serve_page(&server, "/t/air-max-1", nike_page("FD9082-100", &[("44", true)])).await;

    let report = poll_loop.run_cycle().await;
    assert_eq!(report.failed, 0);
    assert_eq!(report.events, 1);
    assert_eq!(poll_loop.stats()[0].status, PairingStatus::Active);
    assert!(poll_loop.stats()[0].last_error.is_none());

    Ok(())
}

#[tokio::test]
async fn test_suppressed_first_poll_only_seeds_state() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    accept_webhook(&server, "/hook").await;
    serve_page(&server, "/zalando", zalando_page("ZA1", &[("44", "MANY")])).await;

    let mut config = test_config(
        &server,
        &["44"],
        json!([{ "id": "zalando", "url": format!("{}/zalando", server.uri()) }]),
    );
    config.first_poll = size_watcher::models::FirstPollPolicy::Suppress;
    let mut poll_loop = PollLoop::from_config(&config)?;

    assert_eq!(poll_loop.run_cycle().await.events, 0);
    assert_eq!(poll_loop.pairings()[0].tracker().available_sizes(), vec!["44"]);
    assert!(requests_to(&server, "/hook").await.is_empty());

    Ok(())
}
