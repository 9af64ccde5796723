use std::{sync::Arc, time::Duration};

use {
    onika_chat::AssistantService,
    secrecy::{ExposeSecret, Secret},
    teloxide::{ApiError, RequestError, prelude::*, types::AllowedUpdate},
    tokio::task::JoinHandle,
    tokio_util::sync::CancellationToken,
    tracing::{debug, error, info, warn},
};

use crate::{
    commands,
    handlers::{self, BotContext},
};

/// Long-poll timeout in seconds.
const POLL_TIMEOUT_SECS: u32 = 30;

/// Pause after a failed `getUpdates` before trying again.
const POLL_ERROR_BACKOFF: Duration = Duration::from_secs(5);

/// Build a bot whose HTTP client outlives the long-polling timeout, so the
/// client doesn't abort a request before Telegram answers it.
pub fn build_bot(token: &Secret<String>) -> anyhow::Result<Bot> {
    let client = teloxide::net::default_reqwest_settings()
        .timeout(Duration::from_secs(u64::from(POLL_TIMEOUT_SECS) + 15))
        .build()?;
    Ok(Bot::with_client(token.expose_secret(), client))
}

/// Verify the token, learn our username and register the command menu.
pub async fn connect(bot: Bot, service: Arc<AssistantService>) -> anyhow::Result<BotContext> {
    let me = bot.get_me().await?;
    if let Err(e) = bot.set_my_commands(commands::bot_commands()).await {
        warn!("failed to register bot commands: {e}");
    }
    info!(username = ?me.username, "telegram bot connected");
    Ok(BotContext::new(bot, service).with_username(me.username.clone()))
}

/// A running polling loop.
pub struct PollingHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl PollingHandle {
    /// Token that stops the loop when cancelled.
    #[must_use]
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Stop polling and wait for the loop to exit.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            warn!(error = %e, "telegram polling task panicked");
        }
    }

    /// Wait until the loop exits on its own.
    pub async fn join(self) {
        if let Err(e) = self.task.await {
            warn!(error = %e, "telegram polling task panicked");
        }
    }
}

/// Start long polling.
///
/// Clears any registered webhook first, since Telegram refuses `getUpdates`
/// while one is set. Each update is handled on its own task; handler
/// errors are logged and never stop the loop.
pub async fn start_polling(ctx: BotContext) -> anyhow::Result<PollingHandle> {
    ctx.bot.delete_webhook().send().await?;
    info!("webhook cleared, starting telegram polling loop");

    let cancel = CancellationToken::new();
    let loop_cancel = cancel.clone();
    let task = tokio::spawn(async move {
        let mut offset: i32 = 0;
        loop {
            let request = ctx
                .bot
                .get_updates()
                .offset(offset)
                .timeout(POLL_TIMEOUT_SECS)
                .allowed_updates(vec![AllowedUpdate::Message, AllowedUpdate::CallbackQuery]);

            let result = tokio::select! {
                () = loop_cancel.cancelled() => {
                    info!("telegram polling stopped");
                    break;
                },
                result = request.send() => result,
            };

            match result {
                Ok(updates) => {
                    debug!(count = updates.len(), "got telegram updates");
                    for update in updates {
                        offset = update.id.as_offset();
                        let ctx = ctx.clone();
                        tokio::spawn(async move {
                            if let Err(e) = handlers::handle_update(&ctx, update).await {
                                error!(error = %e, "error handling telegram update");
                            }
                        });
                    }
                },
                Err(RequestError::Api(ApiError::TerminatedByOtherGetUpdates)) => {
                    warn!(
                        "telegram polling disabled: another instance is already running with this token"
                    );
                    loop_cancel.cancel();
                    break;
                },
                Err(e) => {
                    warn!(error = %e, "telegram getUpdates failed");
                    tokio::select! {
                        () = loop_cancel.cancelled() => break,
                        () = tokio::time::sleep(POLL_ERROR_BACKOFF) => {},
                    }
                },
            }
        }
    });

    Ok(PollingHandle { cancel, task })
}
