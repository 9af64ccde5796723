//! Generation request types shared by every backend.

use serde::{Deserialize, Serialize};

/// Who authored a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// One role-tagged turn of a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

impl ChatTurn {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Sampling overrides. Unset fields fall back to the backend's defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SamplingParams {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

/// A request for text generation.
///
/// Built once through [`GenerationRequestBuilder`] and never mutated, so the
/// router can hand the same request to several backends in turn.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    turns: Vec<ChatTurn>,
    backend_hint: Option<String>,
    sampling: SamplingParams,
}

impl GenerationRequest {
    #[must_use]
    pub fn builder() -> GenerationRequestBuilder {
        GenerationRequestBuilder::default()
    }

    #[must_use]
    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    /// Backend id the caller would like tried first.
    #[must_use]
    pub fn backend_hint(&self) -> Option<&str> {
        self.backend_hint.as_deref()
    }

    #[must_use]
    pub fn sampling(&self) -> SamplingParams {
        self.sampling
    }

    /// All system turns joined with blank lines, or `None` when there are none.
    #[must_use]
    pub fn system_prompt(&self) -> Option<String> {
        let parts: Vec<&str> = self
            .turns
            .iter()
            .filter(|t| t.role == Role::System)
            .map(|t| t.content.as_str())
            .collect();
        (!parts.is_empty()).then(|| parts.join("\n\n"))
    }
}

/// Consuming builder for [`GenerationRequest`].
#[derive(Debug, Default)]
pub struct GenerationRequestBuilder {
    turns: Vec<ChatTurn>,
    backend_hint: Option<String>,
    sampling: SamplingParams,
}

impl GenerationRequestBuilder {
    #[must_use]
    pub fn turn(mut self, turn: ChatTurn) -> Self {
        self.turns.push(turn);
        self
    }

    #[must_use]
    pub fn system(self, content: impl Into<String>) -> Self {
        self.turn(ChatTurn::system(content))
    }

    #[must_use]
    pub fn user(self, content: impl Into<String>) -> Self {
        self.turn(ChatTurn::user(content))
    }

    #[must_use]
    pub fn assistant(self, content: impl Into<String>) -> Self {
        self.turn(ChatTurn::assistant(content))
    }

    #[must_use]
    pub fn backend_hint(mut self, id: impl Into<String>) -> Self {
        self.backend_hint = Some(id.into());
        self
    }

    #[must_use]
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.sampling.temperature = Some(temperature);
        self
    }

    #[must_use]
    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.sampling.max_tokens = Some(max_tokens);
        self
    }

    #[must_use]
    pub fn build(self) -> GenerationRequest {
        GenerationRequest {
            turns: self.turns,
            backend_hint: self.backend_hint,
            sampling: self.sampling,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_keeps_turn_order() {
        let req = GenerationRequest::builder()
            .system("persona")
            .user("hi")
            .assistant("hello")
            .user("again")
            .build();
        let roles: Vec<Role> = req.turns().iter().map(|t| t.role).collect();
        assert_eq!(roles, vec![
            Role::System,
            Role::User,
            Role::Assistant,
            Role::User
        ]);
        assert!(req.backend_hint().is_none());
    }

    #[test]
    fn system_prompt_joins_system_turns() {
        let req = GenerationRequest::builder()
            .system("a")
            .user("x")
            .system("b")
            .build();
        assert_eq!(req.system_prompt().as_deref(), Some("a\n\nb"));

        let bare = GenerationRequest::builder().user("x").build();
        assert!(bare.system_prompt().is_none());
    }

    #[test]
    fn sampling_and_hint() {
        let req = GenerationRequest::builder()
            .user("x")
            .backend_hint("groq")
            .temperature(0.2)
            .build();
        assert_eq!(req.backend_hint(), Some("groq"));
        assert_eq!(req.sampling().temperature, Some(0.2));
        assert_eq!(req.sampling().max_tokens, None);
    }

    #[test]
    fn role_serializes_lowercase() {
        let json = serde_json::to_string(&ChatTurn::assistant("ok")).unwrap_or_default();
        assert_eq!(json, r#"{"role":"assistant","content":"ok"}"#);
    }
}
