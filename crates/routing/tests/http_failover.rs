//! Failover across real HTTP backends served by mock servers.
#![allow(clippy::unwrap_used, clippy::expect_used)]

use {
    mockito::Server,
    onika_config::{BackendConfig, OnikaConfig},
    onika_providers::GenerationRequest,
    onika_routing::FailoverRouter,
    secrecy::Secret,
};

fn backend(id: &str, label: &str, server: &Server) -> BackendConfig {
    BackendConfig {
        id: id.into(),
        label: label.into(),
        endpoint: format!("{}/v1/chat/completions", server.url()),
        model: "m-1".into(),
        api_key: Some(Secret::new(format!("sk-{id}"))),
        ..BackendConfig::default()
    }
}

#[tokio::test]
async fn rate_limited_primary_falls_through_to_secondary() {
    let mut primary = Server::new_async().await;
    let throttled = primary
        .mock("POST", "/v1/chat/completions")
        .with_status(429)
        .with_body(r#"{"error":"slow down"}"#)
        .expect(1)
        .create_async()
        .await;

    let mut secondary = Server::new_async().await;
    let answered = secondary
        .mock("POST", "/v1/chat/completions")
        .match_header("authorization", "Bearer sk-second")
        .with_status(200)
        .with_body(r#"{"choices":[{"message":{"content":"T2"}}]}"#)
        .expect(1)
        .create_async()
        .await;

    let mut config = OnikaConfig::default();
    config.backends = vec![
        backend("first", "PrimaryLabel", &primary),
        backend("second", "SecondaryLabel", &secondary),
    ];
    config.router.order = vec!["first".into(), "second".into()];
    config.router.min_interval_ms = 0;
    config.router.retry_backoff_ms = 0;
    let router = FailoverRouter::from_config(&config).unwrap();

    let request = GenerationRequest::builder().user("write about rivers").build();
    let generation = router.generate_default(&request).await.unwrap();

    assert_eq!(generation.text, "T2");
    assert_eq!(generation.backend_id, "second");
    assert_eq!(generation.backend_label, "SecondaryLabel");
    assert_eq!(generation.attempts, 2);
    assert_eq!(router.last_used().as_deref(), Some("second"));
    throttled.assert_async().await;
    answered.assert_async().await;
}
