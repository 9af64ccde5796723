//! Reply texts, rendered as Telegram HTML.

use {
    onika_chat::{Artifact, Error as ChatError, StatusReport},
    onika_routing::{BackendStatus, Generation},
    onika_tools::SearchResult,
};

use crate::markdown::escape_html;

const RULE: &str = "━━━━━━━━━━━━━━";

/// Shown when every backend failed.
pub const ALL_LAYERS_DOWN: &str = "⚠️ 所有AI层都暂时不可用，请稍后再试。";

/// 1-based position of `backend_id` in the failover order.
#[must_use]
pub fn layer_number(backends: &[BackendStatus], backend_id: &str) -> Option<usize> {
    backends
        .iter()
        .position(|b| b.id == backend_id)
        .map(|i| i + 1)
}

fn layer_tag(layer: Option<usize>) -> String {
    layer.map_or_else(|| "Layer ?".to_string(), |n| format!("Layer {n}"))
}

#[must_use]
pub fn welcome(name: &str, report: &StatusReport) -> String {
    let mut lines = Vec::with_capacity(report.backends.len());
    let mut primary_seen = false;
    for (i, backend) in report.backends.iter().enumerate() {
        let label = escape_html(&backend.label);
        let line = if !backend.configured {
            format!("❌ Layer {} ({label}) - 未配置", i + 1)
        } else if primary_seen {
            format!("✅ Layer {} ({label}) - 备用", i + 1)
        } else {
            primary_seen = true;
            format!("✅ Layer {} ({label}) - 运行中", i + 1)
        };
        lines.push(line);
    }

    format!(
        "🎸 <b>{} 已激活</b>\n{RULE}\n多层AI融合体 · 故障自愈 · 自动切换\n\n<b>当前状态：</b>\n{}\n\n输入 /help 查看所有指令\n直接发消息即可对话！",
        escape_html(name),
        lines.join("\n"),
    )
}

#[must_use]
pub fn help(name: &str) -> String {
    format!(
        "🎸 <b>{} 指令列表</b>\n{RULE}\n\n\
         <b>基础指令：</b>\n\
         /start - 启动系统\n\
         /status - 查看各层状态\n\
         /hello - 测试AI对话\n\
         /help - 显示帮助\n\n\
         <b>内容创作：</b>\n\
         /create [主题] - 生成内容\n\
         /modify &lt;修改要求&gt; - 修改上一次生成的内容\n\
         /search &lt;关键词&gt; - 网络搜索\n\
         /radar - 启动信息雷达\n\n\
         <b>直接发消息 = AI对话</b>\n\
         也可以发送语音\n\n\
         <i>故障时会自动切换备用模型</i>",
        escape_html(name)
    )
}

#[must_use]
pub fn status(name: &str, report: &StatusReport) -> String {
    let mut out = format!("🎸 <b>{} 系统状态</b>\n{RULE}\n\n<b>🧠 意识层：</b>\n", escape_html(name));
    for (i, backend) in report.backends.iter().enumerate() {
        let active = report.last_used.as_deref() == Some(backend.id.as_str());
        out.push_str(&format!(
            "{} Layer {} ({}) {}\n",
            if active { "🟢" } else { "⚪" },
            i + 1,
            escape_html(&backend.label),
            if backend.configured { "✅ 就绪" } else { "❌ 未配置" },
        ));
    }

    let current = report
        .last_used
        .as_deref()
        .and_then(|id| layer_number(&report.backends, id))
        .map_or_else(|| "尚未调用".to_string(), |n| format!("Layer {n}"));
    let healthy = report.backends.iter().any(|b| b.configured);
    out.push_str(&format!(
        "\n<b>📊 当前使用：</b>{current}\n\
         <b>🔎 网络搜索：</b>{}\n\
         <b>🎙 语音识别：</b>{}\n\
         <b>💾 活跃会话：</b>{}\n\
         <b>系统健康：</b>{}",
        if report.search_available { "✅" } else { "⏸️ 未启用" },
        if report.voice_available { "✅" } else { "⏸️ 未启用" },
        report.active_sessions,
        if healthy { "✅ 正常" } else { "⚠️ 无可用AI层" },
    ));
    out
}

#[must_use]
pub fn hello(name: &str, generation: &Generation, layer: Option<usize>) -> String {
    format!(
        "🎸 {} 回应\n{RULE}\n{}\n\n<i>（由 {} 生成）</i>",
        escape_html(name),
        escape_html(&generation.text),
        layer_tag(layer),
    )
}

#[must_use]
pub fn generating(name: &str, topic: &str) -> String {
    format!(
        "🎸 <b>{} 生成中...</b>\n主题：{}\n{RULE}",
        escape_html(name),
        escape_html(topic)
    )
}

#[must_use]
pub fn artifact(artifact: &Artifact, layer: Option<usize>) -> String {
    let mut out = escape_html(&artifact.text);
    out.push_str(&format!("\n\n<i>— 由 {} 生成", layer_tag(layer)));
    if !artifact.sources.is_empty() {
        out.push_str(&format!(" · 参考了 {} 条网络信息", artifact.sources.len()));
    }
    out.push_str("</i>");
    if let Some(location) = &artifact.location {
        out.push_str(&format!("\n📁 <code>{}</code>", escape_html(location)));
    }
    out
}

/// Free conversation reply; fallback layers are called out.
#[must_use]
pub fn chat(generation: &Generation, layer: Option<usize>) -> String {
    let mut out = escape_html(&generation.text);
    if let Some(n) = layer.filter(|&n| n > 1) {
        out.push_str(&format!("\n\n<i>— Layer {n} (备用)</i>"));
    }
    out
}

#[must_use]
pub fn search_results(query: &str, results: &[SearchResult]) -> String {
    let mut out = format!("🔎 <b>{}</b>\n{RULE}\n", escape_html(query));
    if results.is_empty() {
        out.push_str("没有找到相关结果。");
        return out;
    }
    for (i, r) in results.iter().enumerate() {
        out.push_str(&format!(
            "\n{}. <a href=\"{}\">{}</a>\n",
            i + 1,
            escape_html(&r.url),
            escape_html(&r.title)
        ));
        if !r.description.is_empty() {
            out.push_str(&format!("   {}\n", escape_html(&r.description)));
        }
    }
    out
}

#[must_use]
pub fn radar(name: &str, topic: &str, results: &[SearchResult]) -> String {
    format!(
        "🎸 <b>{} 信息雷达</b>\n{}",
        escape_html(name),
        search_results(topic, results)
    )
}

#[must_use]
pub fn transcribed(text: &str) -> String {
    format!("🎙 <i>{}</i>", escape_html(text))
}

#[must_use]
pub fn unknown_command(name: &str) -> String {
    format!("未知指令 /{}，输入 /help 查看所有指令", escape_html(name))
}

pub const MODIFY_USAGE: &str = "用法：/modify &lt;修改要求&gt;";

pub const SEARCH_USAGE: &str = "用法：/search &lt;关键词&gt;";

/// Requester-facing text for a failed request.
#[must_use]
pub fn error(err: &ChatError) -> String {
    match err {
        ChatError::Routing(onika_routing::Error::AllBackendsExhausted { last_reason }) => {
            format!("{ALL_LAYERS_DOWN}\n<i>{}</i>", escape_html(last_reason))
        },
        ChatError::NoPriorArtifact => "⚠️ 还没有可修改的内容，先用 /create 生成一段吧。".into(),
        ChatError::SearchDisabled => "⚠️ 网络搜索未启用。".into(),
        ChatError::Search(_) => "⚠️ 搜索暂时不可用，请稍后再试。".into(),
        ChatError::VoiceUnavailable => "⚠️ 语音识别未配置，请直接发送文字。".into(),
        ChatError::Transcription(_) => "⚠️ 语音识别失败，请重试或直接发送文字。".into(),
        ChatError::Backend(_) => "⚠️ 出了点问题，请稍后再试。".into(),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn report(last_used: Option<&str>) -> StatusReport {
        StatusReport {
            backends: vec![
                BackendStatus {
                    id: "moonshot".into(),
                    label: "Kimi".into(),
                    configured: true,
                },
                BackendStatus {
                    id: "anthropic".into(),
                    label: "Claude".into(),
                    configured: true,
                },
                BackendStatus {
                    id: "groq".into(),
                    label: "Groq".into(),
                    configured: false,
                },
            ],
            last_used: last_used.map(String::from),
            search_available: true,
            voice_available: false,
            active_sessions: 3,
        }
    }

    fn generation(text: &str, id: &str) -> Generation {
        Generation {
            text: text.into(),
            backend_id: id.into(),
            backend_label: id.into(),
            attempts: 1,
        }
    }

    #[test]
    fn layer_numbers_follow_order() {
        let r = report(None);
        assert_eq!(layer_number(&r.backends, "moonshot"), Some(1));
        assert_eq!(layer_number(&r.backends, "groq"), Some(3));
        assert_eq!(layer_number(&r.backends, "missing"), None);
    }

    #[test]
    fn welcome_marks_primary_and_fallbacks() {
        let text = welcome("ÖNIKA LI", &report(None));
        assert!(text.starts_with("🎸 <b>ÖNIKA LI 已激活</b>"));
        assert!(text.contains("✅ Layer 1 (Kimi) - 运行中"));
        assert!(text.contains("✅ Layer 2 (Claude) - 备用"));
        assert!(text.contains("❌ Layer 3 (Groq) - 未配置"));
    }

    #[test]
    fn status_highlights_last_used() {
        let text = status("ÖNIKA LI", &report(Some("anthropic")));
        assert!(text.contains("⚪ Layer 1 (Kimi)"));
        assert!(text.contains("🟢 Layer 2 (Claude)"));
        assert!(text.contains("<b>📊 当前使用：</b>Layer 2"));
        assert!(text.contains("<b>💾 活跃会话：</b>3"));
        assert!(text.contains("✅ 正常"));

        let idle = status("ÖNIKA LI", &report(None));
        assert!(idle.contains("尚未调用"));
    }

    #[test]
    fn chat_reply_notes_fallback_layer() {
        let g = generation("a < b", "anthropic");
        assert_eq!(chat(&g, Some(1)), "a &lt; b");
        assert_eq!(chat(&g, Some(2)), "a &lt; b\n\n<i>— Layer 2 (备用)</i>");
    }

    #[test]
    fn artifact_mentions_sources() {
        let a = Artifact {
            text: "riff".into(),
            topic: "t".into(),
            backend_id: "moonshot".into(),
            backend_label: "Kimi".into(),
            location: None,
            sources: vec![SearchResult {
                title: "x".into(),
                url: "https://x".into(),
                description: String::new(),
            }],
        };
        assert_eq!(
            artifact(&a, Some(1)),
            "riff\n\n<i>— 由 Layer 1 生成 · 参考了 1 条网络信息</i>"
        );
    }

    #[test]
    fn artifact_echoes_stored_location() {
        let a = Artifact {
            text: "riff".into(),
            topic: "t".into(),
            backend_id: "groq".into(),
            backend_label: "Llama".into(),
            location: Some("articles/r&b_20261016_120000.md".into()),
            sources: Vec::new(),
        };
        assert_eq!(
            artifact(&a, Some(2)),
            "riff\n\n<i>— 由 Layer 2 生成</i>\n📁 <code>articles/r&amp;b_20261016_120000.md</code>"
        );
    }

    #[test]
    fn search_results_are_escaped_links() {
        let text = search_results("a&b", &[SearchResult {
            title: "<Title>".into(),
            url: "https://e.com/?a=1&b=2".into(),
            description: "desc".into(),
        }]);
        assert!(text.contains("🔎 <b>a&amp;b</b>"));
        assert!(text.contains("1. <a href=\"https://e.com/?a=1&amp;b=2\">&lt;Title&gt;</a>"));
        assert!(text.contains("   desc"));
        assert!(search_results("q", &[]).contains("没有找到相关结果"));
    }

    #[test]
    fn exhausted_error_carries_reason() {
        let err = ChatError::Routing(onika_routing::Error::AllBackendsExhausted {
            last_reason: "groq: rate limited".into(),
        });
        let text = error(&err);
        assert!(text.starts_with(ALL_LAYERS_DOWN));
        assert!(text.contains("groq: rate limited"));
    }
}
