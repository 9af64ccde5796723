use std::{future::Future, sync::Arc, time::Duration};

use {
    bytes::Bytes,
    onika_chat::{AssistantService, Reply},
    onika_common::RequesterId,
    onika_voice::AudioFormat,
    teloxide::{
        RequestError,
        payloads::SendMessageSetters,
        prelude::*,
        types::{ChatAction, ParseMode, UpdateKind},
    },
    tracing::{debug, info, warn},
};

#[cfg(feature = "metrics")]
use onika_metrics::{counter, labels, telegram as tg_metrics};

use crate::{
    commands::{self, Command},
    error::{Context, Error, Result},
    format,
    markdown::{TELEGRAM_MAX_MESSAGE_LEN, chunk_message, html_to_plain},
};

/// How often a send is retried when Telegram answers with `retry_after`.
const RETRY_AFTER_MAX_RETRIES: usize = 3;

/// Everything a handler needs: the bot handle and the assistant behind it.
#[derive(Clone)]
pub struct BotContext {
    pub bot: Bot,
    pub service: Arc<AssistantService>,
    /// Our username without `@`, used to accept `/cmd@username`.
    pub bot_username: Option<String>,
}

impl BotContext {
    #[must_use]
    pub fn new(bot: Bot, service: Arc<AssistantService>) -> Self {
        Self {
            bot,
            service,
            bot_username: None,
        }
    }

    #[must_use]
    pub fn with_username(mut self, username: Option<String>) -> Self {
        self.bot_username = username;
        self
    }

    fn persona_name(&self) -> &str {
        &self.service.persona().name
    }

    fn layer_of(&self, backend_id: &str) -> Option<usize> {
        format::layer_number(&self.service.backend_statuses(), backend_id)
    }
}

/// Handle one update from either the polling loop or the webhook.
pub async fn handle_update(ctx: &BotContext, update: Update) -> Result<()> {
    match update.kind {
        UpdateKind::Message(msg) => handle_message(ctx, msg).await,
        UpdateKind::CallbackQuery(query) => {
            debug!(callback_data = ?query.data, "acknowledging callback query");
            ctx.bot.answer_callback_query(query.id).await?;
            Ok(())
        },
        other => {
            debug!("ignoring non-message update: {other:?}");
            Ok(())
        },
    }
}

/// Handle a single inbound message.
pub async fn handle_message(ctx: &BotContext, msg: Message) -> Result<()> {
    #[cfg(feature = "metrics")]
    counter!(tg_metrics::MESSAGES_RECEIVED_TOTAL).increment(1);

    let chat_id = msg.chat.id;
    let requester = msg
        .from
        .as_ref()
        .map(|u| RequesterId::from(u.id.0))
        .unwrap_or_else(|| RequesterId::from(chat_id.0));

    if let Some(text) = msg.text() {
        if let Some(command) = commands::parse(text, ctx.bot_username.as_deref()) {
            info!(chat_id = chat_id.0, command = command.name(), "telegram command");
            #[cfg(feature = "metrics")]
            counter!(tg_metrics::COMMANDS_TOTAL, labels::COMMAND => command.name().to_string())
                .increment(1);
            return handle_command(ctx, chat_id, &requester, command).await;
        }
        return handle_text(ctx, chat_id, &requester, text).await;
    }

    if let Some((file_id, audio_format)) = extract_voice_file(&msg) {
        return handle_voice(ctx, chat_id, &requester, &file_id, audio_format).await;
    }

    debug!(chat_id = chat_id.0, "ignoring message without text or audio");
    Ok(())
}

async fn handle_command(
    ctx: &BotContext,
    chat_id: ChatId,
    requester: &RequesterId,
    command: Command,
) -> Result<()> {
    let service = &ctx.service;
    let name = ctx.persona_name();

    let reply = match command {
        Command::Start => format::welcome(name, &service.status()),
        Command::Help => format::help(name),
        Command::Status => format::status(name, &service.status()),
        Command::Hello => {
            send_typing(ctx, chat_id).await;
            match service.hello().await {
                Ok(generation) => {
                    format::hello(name, &generation, ctx.layer_of(&generation.backend_id))
                },
                Err(e) => failure_text(&e),
            }
        },
        Command::Create(topic) => {
            let shown = match topic.trim() {
                "" => service.persona().default_topic.as_str(),
                t => t,
            };
            send_html(&ctx.bot, chat_id, &format::generating(name, shown)).await?;
            send_typing(ctx, chat_id).await;
            match service.generate_from_topic(requester, &topic).await {
                Ok(artifact) => {
                    format::artifact(&artifact, ctx.layer_of(&artifact.backend_id))
                },
                Err(e) => failure_text(&e),
            }
        },
        Command::Modify(instruction) if instruction.is_empty() => format::MODIFY_USAGE.into(),
        Command::Modify(instruction) => {
            send_typing(ctx, chat_id).await;
            match service.modify_last(requester, &instruction).await {
                Ok(artifact) => {
                    format::artifact(&artifact, ctx.layer_of(&artifact.backend_id))
                },
                Err(e) => failure_text(&e),
            }
        },
        Command::Search(query) if query.is_empty() => format::SEARCH_USAGE.into(),
        Command::Search(query) => match service.search(&query).await {
            Ok(results) => format::search_results(&query, &results),
            Err(e) => failure_text(&e),
        },
        Command::Radar => {
            let topic = service.persona().default_topic.clone();
            match service.search(&topic).await {
                Ok(results) => format::radar(name, &topic, &results),
                Err(e) => failure_text(&e),
            }
        },
        Command::Unknown(other) => format::unknown_command(&other),
    };

    send_html(&ctx.bot, chat_id, &reply).await
}

async fn handle_text(
    ctx: &BotContext,
    chat_id: ChatId,
    requester: &RequesterId,
    text: &str,
) -> Result<()> {
    send_typing(ctx, chat_id).await;
    let reply = match ctx.service.handle_text(requester, text).await {
        Ok(Reply::Artifact(artifact)) => {
            format::artifact(&artifact, ctx.layer_of(&artifact.backend_id))
        },
        Ok(Reply::Search { query, results }) => format::search_results(&query, &results),
        Ok(Reply::Chat(generation)) => {
            format::chat(&generation, ctx.layer_of(&generation.backend_id))
        },
        Err(e) => failure_text(&e),
    };
    send_html(&ctx.bot, chat_id, &reply).await
}

async fn handle_voice(
    ctx: &BotContext,
    chat_id: ChatId,
    requester: &RequesterId,
    file_id: &str,
    audio_format: AudioFormat,
) -> Result<()> {
    if !ctx.service.status().voice_available {
        let text = failure_text(&onika_chat::Error::VoiceUnavailable);
        return send_html(&ctx.bot, chat_id, &text).await;
    }

    send_typing(ctx, chat_id).await;
    let audio = match download_telegram_file(&ctx.bot, file_id).await {
        Ok(audio) => audio,
        Err(e) => {
            warn!(chat_id = chat_id.0, error = %e, "failed to download voice file");
            let text = failure_text(&onika_chat::Error::Transcription(e.to_string()));
            return send_html(&ctx.bot, chat_id, &text).await;
        },
    };
    debug!(
        chat_id = chat_id.0,
        format = audio_format.extension(),
        size = audio.len(),
        "downloaded voice file, transcribing"
    );

    match ctx.service.transcribe(audio, audio_format).await {
        Ok(text) => {
            send_html(&ctx.bot, chat_id, &format::transcribed(&text)).await?;
            handle_text(ctx, chat_id, requester, &text).await
        },
        Err(e) => {
            warn!(chat_id = chat_id.0, error = %e, "voice transcription failed");
            send_html(&ctx.bot, chat_id, &failure_text(&e)).await
        },
    }
}

fn failure_text(err: &onika_chat::Error) -> String {
    warn!(error = %err, "request failed");
    #[cfg(feature = "metrics")]
    counter!(tg_metrics::ERRORS_TOTAL, labels::ERROR_TYPE => error_kind(err)).increment(1);
    format::error(err)
}

#[cfg(feature = "metrics")]
fn error_kind(err: &onika_chat::Error) -> &'static str {
    match err {
        onika_chat::Error::NoPriorArtifact => "no_prior_artifact",
        onika_chat::Error::Backend(_) => "backend",
        onika_chat::Error::Routing(_) => "exhausted",
        onika_chat::Error::Search(_) | onika_chat::Error::SearchDisabled => "search",
        onika_chat::Error::VoiceUnavailable | onika_chat::Error::Transcription(_) => "voice",
    }
}

async fn send_typing(ctx: &BotContext, chat_id: ChatId) {
    if let Err(e) = ctx.bot.send_chat_action(chat_id, ChatAction::Typing).await {
        debug!(chat_id = chat_id.0, error = %e, "failed to send typing action");
    }
}

/// Send `html` in chunks, falling back to plain text for any chunk Telegram
/// refuses to parse.
pub async fn send_html(bot: &Bot, chat_id: ChatId, html: &str) -> Result<()> {
    for chunk in chunk_message(html, TELEGRAM_MAX_MESSAGE_LEN) {
        let sent = with_retry_after(chat_id, || {
            let request = bot
                .send_message(chat_id, chunk.clone())
                .parse_mode(ParseMode::Html);
            async move { request.await }
        })
        .await;
        if let Err(e) = sent {
            warn!(
                chat_id = chat_id.0,
                error = %e,
                "telegram HTML send failed, retrying as plain text"
            );
            let plain = html_to_plain(&chunk);
            with_retry_after(chat_id, || {
                let request = bot.send_message(chat_id, plain.clone());
                async move { request.await }
            })
            .await?;
        }
    }
    Ok(())
}

async fn with_retry_after<T, F, Fut>(
    chat_id: ChatId,
    mut request: F,
) -> std::result::Result<T, RequestError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, RequestError>>,
{
    let mut retries = 0usize;
    loop {
        match request().await {
            Ok(value) => return Ok(value),
            Err(RequestError::RetryAfter(wait)) if retries < RETRY_AFTER_MAX_RETRIES => {
                retries += 1;
                let wait: Duration = wait.duration();
                warn!(
                    chat_id = chat_id.0,
                    retries,
                    retry_after_secs = wait.as_secs(),
                    "telegram rate limited, waiting before retry"
                );
                tokio::time::sleep(wait).await;
            },
            Err(e) => return Err(e),
        }
    }
}

/// File id and container format of a voice note or audio file.
fn extract_voice_file(msg: &Message) -> Option<(String, AudioFormat)> {
    if let Some(voice) = msg.voice() {
        return Some((voice.file.id.clone(), AudioFormat::Ogg));
    }
    let audio = msg.audio()?;
    let audio_format = audio
        .mime_type
        .as_ref()
        .and_then(|m| AudioFormat::from_mime(m.as_ref()))
        .unwrap_or(AudioFormat::Mp3);
    Some((audio.file.id.clone(), audio_format))
}

/// Download a file by id through the bot's API host.
async fn download_telegram_file(bot: &Bot, file_id: &str) -> Result<Bytes> {
    let file = bot.get_file(file_id).await?;

    // https://api.telegram.org/file/bot<token>/<file_path>
    let url = bot
        .api_url()
        .join(&format!("file/bot{}/{}", bot.token(), file.path))
        .map_err(|e| Error::message(format!("invalid file url: {e}")))?;

    let response = reqwest::get(url).await?;
    if !response.status().is_success() {
        return Err(Error::Download {
            status: response.status().as_u16(),
        });
    }
    let data = response.bytes().await.context("reading voice file")?;
    Ok(data)
}
