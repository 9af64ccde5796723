//! Prompt construction for each entry point.

use {
    onika_providers::GenerationRequest,
    onika_tools::{SearchResult, format_context},
};

/// Question used by the self-introduction command.
pub const HELLO_PROMPT: &str = "用一句话介绍你自己";

/// Marker recorded when a generation ran without search context.
pub const NO_WEB_CONTEXT: &str = "(no web context)";

/// Ask for persona-styled content about `topic`, with search results as
/// reference material when there are any.
#[must_use]
pub fn generation(system_prompt: &str, topic: &str, results: &[SearchResult]) -> GenerationRequest {
    let mut user = format!("生成一段关于'{topic}'的摇滚风格内容，100字左右，带emoji");
    if !results.is_empty() {
        user.push_str("\n\n参考以下最新网络信息：\n");
        user.push_str(&format_context(results));
    }
    GenerationRequest::builder()
        .system(system_prompt)
        .user(user)
        .build()
}

/// Apply `instruction` to `prior`, keeping the persona's voice.
///
/// The prior text travels inside the user turn; some backends reject a
/// conversation that opens with an assistant turn.
#[must_use]
pub fn modification(system_prompt: &str, prior: &str, instruction: &str) -> GenerationRequest {
    GenerationRequest::builder()
        .system(system_prompt)
        .user(format!(
            "原文：\n{prior}\n\n修改要求：{instruction}\n\n只输出修改后的完整内容。"
        ))
        .build()
}

/// Plain conversation turn.
#[must_use]
pub fn chat(system_prompt: &str, message: &str) -> GenerationRequest {
    GenerationRequest::builder()
        .system(system_prompt)
        .user(message)
        .build()
}

#[cfg(test)]
mod tests {
    use {super::*, onika_providers::Role};

    #[test]
    fn generation_without_results_has_no_reference_block() {
        let req = generation("persona", "今日摇滚热点", &[]);
        assert_eq!(req.turns().len(), 2);
        assert!(req.turns()[1].content.contains("'今日摇滚热点'"));
        assert!(!req.turns()[1].content.contains("参考"));
    }

    #[test]
    fn generation_injects_numbered_context() {
        let results = vec![SearchResult {
            title: "Festival lineup".into(),
            url: "https://example.com".into(),
            description: "headliners".into(),
        }];
        let req = generation("persona", "festival", &results);
        let user = &req.turns()[1].content;
        assert!(user.contains("1. Festival lineup (https://example.com)"));
        assert!(user.contains("headliners"));
    }

    #[test]
    fn modification_embeds_prior_and_instruction() {
        let req = modification("persona", "old text", "更短");
        let roles: Vec<Role> = req.turns().iter().map(|t| t.role).collect();
        assert_eq!(roles, vec![Role::System, Role::User]);
        let user = &req.turns()[1].content;
        assert!(user.contains("原文：\nold text"));
        assert!(user.contains("修改要求：更短"));
    }
}
