//! Webhook registration with the Bot API.

use {
    teloxide::{payloads::SetWebhookSetters, prelude::*, types::AllowedUpdate},
    tracing::info,
};

use crate::error::{Error, Result};

/// What Telegram reports about the registered webhook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookStatus {
    pub url: Option<String>,
    pub pending_update_count: u32,
}

/// Point Telegram at `url` for message and callback updates, then read back
/// the registration.
pub async fn register_webhook(bot: &Bot, url: &str) -> Result<WebhookStatus> {
    let parsed = reqwest::Url::parse(url)
        .map_err(|e| Error::message(format!("invalid webhook url {url}: {e}")))?;
    bot.set_webhook(parsed)
        .allowed_updates(vec![AllowedUpdate::Message, AllowedUpdate::CallbackQuery])
        .await?;
    let status = webhook_info(bot).await?;
    info!(
        url = ?status.url,
        pending = status.pending_update_count,
        "telegram webhook registered"
    );
    Ok(status)
}

pub async fn webhook_info(bot: &Bot) -> Result<WebhookStatus> {
    let info = bot.get_webhook_info().await?;
    Ok(WebhookStatus {
        url: info.url.map(|u| u.to_string()),
        pending_update_count: info.pending_update_count,
    })
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, crate::test_support::MockTelegram, serde_json::json};

    #[tokio::test]
    async fn register_sets_allowed_updates_and_reports_pending() {
        let server = MockTelegram::start().await;

        let status = register_webhook(&server.bot, "https://bot.example.com/webhook")
            .await
            .unwrap();
        assert_eq!(status.pending_update_count, 3);
        assert_eq!(
            status.url.as_deref(),
            Some("https://bot.example.com/webhook")
        );

        let calls = server.calls("SetWebhook");
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0]["url"], "https://bot.example.com/webhook");
        assert_eq!(calls[0]["allowed_updates"], json!(["message", "callback_query"]));
        server.stop().await;
    }

    #[tokio::test]
    async fn invalid_url_is_rejected_locally() {
        let server = MockTelegram::start().await;
        let err = register_webhook(&server.bot, "not a url").await.unwrap_err();
        assert!(err.to_string().contains("invalid webhook url"));
        assert!(!server.called("SetWebhook"));
        server.stop().await;
    }
}
