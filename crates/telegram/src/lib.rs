//! Telegram front end for the assistant.
//!
//! Parses slash commands, turns voice notes into text, renders replies as
//! Telegram HTML and receives updates by long polling or through a webhook.

pub mod bot;
pub mod commands;
pub mod error;
pub mod format;
pub mod handlers;
pub mod markdown;
pub mod webhook;

#[cfg(test)]
mod test_support;

pub use {
    bot::{PollingHandle, build_bot, connect, start_polling},
    commands::{Command, bot_commands},
    error::{Error, Result},
    handlers::{BotContext, handle_update},
    webhook::{WebhookStatus, register_webhook, webhook_info},
};
