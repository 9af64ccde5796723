use std::{future::Future, net::SocketAddr, sync::Arc};

use {
    axum::{
        Json, Router,
        body::Bytes,
        extract::State,
        http::StatusCode,
        response::IntoResponse,
        routing::get,
    },
    onika_chat::AssistantService,
    onika_telegram::BotContext,
    teloxide::types::Update,
    tower_http::trace::TraceLayer,
    tracing::{debug, error, info, warn},
};

#[cfg(feature = "metrics")]
use onika_metrics::{MetricsHandle, counter, http as http_metrics, labels};

/// Shared state for every route.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<AssistantService>,
    /// `None` when no bot token is configured; webhook deliveries are then
    /// refused with 503.
    pub telegram: Option<BotContext>,
    pub version: String,
    #[cfg(feature = "metrics")]
    pub metrics_handle: Option<MetricsHandle>,
}

impl AppState {
    pub fn new(service: Arc<AssistantService>, telegram: Option<BotContext>) -> Self {
        Self {
            service,
            telegram,
            version: env!("CARGO_PKG_VERSION").to_string(),
            #[cfg(feature = "metrics")]
            metrics_handle: None,
        }
    }

    #[cfg(feature = "metrics")]
    #[must_use]
    pub fn with_metrics(mut self, handle: MetricsHandle) -> Self {
        self.metrics_handle = Some(handle);
        self
    }
}

/// Build the router with all routes.
pub fn build_app(state: AppState) -> Router {
    let router = Router::new()
        .route("/", get(root_handler).post(webhook_handler))
        .route("/health", get(health_handler))
        .route("/webhook", axum::routing::post(webhook_handler));

    #[cfg(feature = "prometheus")]
    let router = router.route(
        "/metrics",
        get(crate::metrics_routes::prometheus_metrics_handler),
    );

    router.layer(TraceLayer::new_for_http()).with_state(state)
}

/// Bind and serve until `shutdown` resolves.
pub async fn start_gateway(
    bind: &str,
    port: u16,
    state: AppState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{bind}:{port}").parse()?;
    let app = build_app(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "gateway listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    info!("gateway stopped");
    Ok(())
}

// ── Handlers ─────────────────────────────────────────────────────────────────

async fn root_handler(State(state): State<AppState>) -> impl IntoResponse {
    format!("{} Bot is running!", state.service.persona().name)
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let report = state.service.status();
    let backends: Vec<_> = report
        .backends
        .iter()
        .map(|b| {
            serde_json::json!({
                "id": b.id,
                "label": b.label,
                "configured": b.configured,
            })
        })
        .collect();
    let healthy = report.backends.iter().any(|b| b.configured);
    Json(serde_json::json!({
        "status": if healthy { "ok" } else { "degraded" },
        "name": state.service.persona().name,
        "version": state.version,
        "telegram": state.telegram.is_some(),
        "backends": backends,
        "last_used": report.last_used,
        "search": report.search_available,
        "voice": report.voice_available,
        "active_sessions": report.active_sessions,
    }))
}

/// Telegram delivers one `Update` per POST. Handling runs on its own task so
/// Telegram gets its 200 right away and never redelivers a slow update.
async fn webhook_handler(State(state): State<AppState>, body: Bytes) -> impl IntoResponse {
    let update: Update = match serde_json::from_slice(&body) {
        Ok(update) => update,
        Err(e) => {
            warn!(error = %e, "rejecting malformed webhook body");
            #[cfg(feature = "metrics")]
            counter!(http_metrics::WEBHOOK_REJECTED_TOTAL, labels::REASON => "malformed")
                .increment(1);
            return (StatusCode::BAD_REQUEST, format!("invalid update: {e}"));
        },
    };

    let Some(ctx) = state.telegram.clone() else {
        #[cfg(feature = "metrics")]
        counter!(http_metrics::WEBHOOK_REJECTED_TOTAL, labels::REASON => "no_bot").increment(1);
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            "telegram is not configured".to_string(),
        );
    };

    #[cfg(feature = "metrics")]
    counter!(http_metrics::WEBHOOK_UPDATES_TOTAL).increment(1);
    debug!(update_id = update.id.0, "webhook update received");

    tokio::spawn(async move {
        if let Err(e) = onika_telegram::handle_update(&ctx, update).await {
            error!(error = %e, "error handling webhook update");
        }
    });
    (StatusCode::OK, "OK".to_string())
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        axum::{body::Body, http::Request},
        onika_config::OnikaConfig,
        onika_routing::FailoverRouter,
        onika_sessions::SessionStore,
        teloxide::Bot,
        tower::ServiceExt,
    };

    fn service() -> Arc<AssistantService> {
        let router = FailoverRouter::from_config(&OnikaConfig::default()).unwrap();
        Arc::new(AssistantService::new(
            Arc::new(router),
            Arc::new(SessionStore::default()),
        ))
    }

    fn unreachable_bot(service: Arc<AssistantService>) -> BotContext {
        let url = reqwest::Url::parse("http://127.0.0.1:9/").unwrap();
        BotContext::new(Bot::new("test-token").set_api_url(url), service)
    }

    async fn body_string(response: axum::response::Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn post(uri: &str, body: &'static str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    const UPDATE: &str = r#"{
        "update_id": 42,
        "message": {
            "message_id": 1,
            "date": 0,
            "chat": { "id": 1, "type": "private" },
            "text": "hi"
        }
    }"#;

    #[tokio::test]
    async fn root_reports_persona_name() {
        let app = build_app(AppState::new(service(), None));
        let response = app
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "ÖNIKA LI Bot is running!");
    }

    #[tokio::test]
    async fn health_lists_backends_in_order() {
        let app = build_app(AppState::new(service(), None));
        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(json["name"], "ÖNIKA LI");
        assert_eq!(json["telegram"], false);
        assert_eq!(json["active_sessions"], 0);
        assert!(json["backends"].as_array().is_some());
        assert!(json["last_used"].is_null());
    }

    #[tokio::test]
    async fn malformed_webhook_body_is_rejected() {
        let service = service();
        let app = build_app(AppState::new(
            service.clone(),
            Some(unreachable_bot(service)),
        ));
        let response = app.oneshot(post("/webhook", "not json")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_string(response).await.starts_with("invalid update"));
    }

    #[tokio::test]
    async fn webhook_without_bot_is_unavailable() {
        let app = build_app(AppState::new(service(), None));
        let response = app.oneshot(post("/webhook", UPDATE)).await.unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn webhook_accepts_update_on_both_paths() {
        let service = service();
        let state = AppState::new(service.clone(), Some(unreachable_bot(service)));
        for path in ["/", "/webhook"] {
            let response = build_app(state.clone())
                .oneshot(post(path, UPDATE))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(body_string(response).await, "OK");
        }
    }
}
