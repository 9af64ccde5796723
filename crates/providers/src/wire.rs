//! Request bodies for each [`WireFormat`].

use serde_json::{Value, json};

use crate::{
    descriptor::{BackendDescriptor, WireFormat},
    model::{GenerationRequest, Role},
};

/// Build the JSON body for `request` in the descriptor's wire format.
#[must_use]
pub fn build_body(descriptor: &BackendDescriptor, request: &GenerationRequest) -> Value {
    let sampling = request.sampling();
    let temperature = sampling.temperature.unwrap_or(descriptor.temperature);
    let max_tokens = sampling.max_tokens.unwrap_or(descriptor.max_tokens);

    match descriptor.wire {
        WireFormat::OpenAiChat => {
            let messages: Vec<Value> = request
                .turns()
                .iter()
                .map(|t| json!({"role": t.role.as_str(), "content": t.content}))
                .collect();
            json!({
                "model": descriptor.model,
                "messages": messages,
                "temperature": temperature,
                "max_tokens": max_tokens,
            })
        },
        WireFormat::AnthropicMessages => {
            let messages: Vec<Value> = request
                .turns()
                .iter()
                .filter(|t| t.role != Role::System)
                .map(|t| json!({"role": t.role.as_str(), "content": t.content}))
                .collect();
            let mut body = json!({
                "model": descriptor.model,
                "messages": messages,
                "temperature": temperature,
                "max_tokens": max_tokens,
            });
            if let Some(system) = request.system_prompt() {
                body["system"] = Value::String(system);
            }
            body
        },
    }
}

#[cfg(test)]
mod tests {
    use {super::*, onika_config::OnikaConfig};

    fn descriptor(id: &str) -> BackendDescriptor {
        let cfg = OnikaConfig::default();
        let Some(Ok(desc)) = cfg.backend(id).map(BackendDescriptor::from_config) else {
            panic!("no descriptor for {id}");
        };
        desc
    }

    #[test]
    fn openai_body_keeps_system_in_messages() {
        let req = GenerationRequest::builder()
            .system("persona")
            .user("写首歌")
            .build();
        let body = build_body(&descriptor("moonshot"), &req);
        assert_eq!(body["model"], "moonshot-v1-8k");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "写首歌");
        assert!(body.get("system").is_none());
        assert_eq!(body["max_tokens"], 1024);
    }

    #[test]
    fn anthropic_body_lifts_system() {
        let req = GenerationRequest::builder()
            .system("persona")
            .user("hi")
            .build();
        let body = build_body(&descriptor("anthropic"), &req);
        assert_eq!(body["system"], "persona");
        assert_eq!(body["messages"].as_array().map(Vec::len), Some(1));
        assert_eq!(body["messages"][0]["role"], "user");
    }

    #[test]
    fn request_sampling_overrides_descriptor() {
        let req = GenerationRequest::builder()
            .user("hi")
            .temperature(0.25)
            .max_tokens(64)
            .build();
        let body = build_body(&descriptor("groq"), &req);
        assert_eq!(body["temperature"], 0.25);
        assert_eq!(body["max_tokens"], 64);
    }
}
