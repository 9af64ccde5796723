//! Long-running modes: polling and webhook serving.

use std::sync::Arc;

use {
    anyhow::{Context, Result, bail},
    onika_chat::AssistantService,
    onika_config::OnikaConfig,
    onika_gateway::AppState,
    teloxide::Bot,
    tokio_util::sync::CancellationToken,
    tracing::{info, warn},
};

fn service(config: &OnikaConfig) -> Result<Arc<AssistantService>> {
    Ok(Arc::new(AssistantService::from_config(config)?))
}

fn app_state(config: &OnikaConfig, state: AppState) -> AppState {
    #[cfg(feature = "metrics")]
    {
        let recorder = onika_metrics::MetricsRecorderConfig {
            enabled: config.metrics.enabled,
            global_labels: Vec::new(),
        };
        match onika_metrics::init_metrics(recorder) {
            Ok(handle) => return state.with_metrics(handle),
            Err(e) => warn!(error = %e, "metrics recorder not installed"),
        }
    }
    #[cfg(not(feature = "metrics"))]
    let _ = config;
    state
}

fn bot(config: &OnikaConfig) -> Result<Bot> {
    let Some(token) = config.telegram.resolve_token() else {
        bail!("no Telegram token: set telegram.token or TELEGRAM_TOKEN");
    };
    onika_telegram::build_bot(&token)
}

/// Cancel `token` on ctrl-c.
fn cancel_on_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl-c");
            return;
        }
        info!("ctrl-c received, shutting down");
        token.cancel();
    });
}

/// Long-poll Telegram, with the HTTP server alongside for health checks.
pub async fn poll(config: OnikaConfig) -> Result<()> {
    let service = service(&config)?;
    let ctx = onika_telegram::connect(bot(&config)?, service.clone()).await?;
    let polling = onika_telegram::start_polling(ctx.clone()).await?;

    let shutdown = polling.cancel_token();
    cancel_on_ctrl_c(shutdown.clone());

    let state = app_state(&config, AppState::new(service, Some(ctx)));
    let served = onika_gateway::start_gateway(
        &config.server.bind,
        config.server.port,
        state,
        shutdown.clone().cancelled_owned(),
    )
    .await;

    // The server can also stop on its own (bind failure); take polling down with it.
    polling.shutdown().await;
    served
}

/// Serve webhook deliveries until ctrl-c.
pub async fn gateway(config: OnikaConfig, register: bool) -> Result<()> {
    let service = service(&config)?;
    let ctx = match config.telegram.resolve_token() {
        Some(_) => {
            let ctx = onika_telegram::connect(bot(&config)?, service.clone()).await?;
            if register {
                let url = config
                    .telegram
                    .webhook_url
                    .as_deref()
                    .context("--register needs telegram.webhook_url")?;
                onika_telegram::register_webhook(&ctx.bot, url).await?;
            }
            Some(ctx)
        },
        None => {
            warn!("no Telegram token configured, webhook deliveries will be refused");
            None
        },
    };

    let shutdown = CancellationToken::new();
    cancel_on_ctrl_c(shutdown.clone());

    let state = app_state(&config, AppState::new(service, ctx));
    onika_gateway::start_gateway(
        &config.server.bind,
        config.server.port,
        state,
        shutdown.cancelled_owned(),
    )
    .await
}

pub async fn set_webhook(config: &OnikaConfig, url: Option<String>) -> Result<()> {
    let Some(url) = url.or_else(|| config.telegram.webhook_url.clone()) else {
        bail!("no webhook URL: pass one or set telegram.webhook_url");
    };
    let bot = bot(config)?;
    let status = onika_telegram::register_webhook(&bot, &url).await?;
    println!("webhook: {}", status.url.as_deref().unwrap_or("(none)"));
    println!("pending updates: {}", status.pending_update_count);
    Ok(())
}
