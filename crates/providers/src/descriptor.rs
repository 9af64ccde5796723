//! Static description of a generation backend.

use std::{fmt, str::FromStr, time::Duration};

use {onika_config::BackendConfig, serde_json::Value};

pub use onika_config::{AuthScheme, WireFormat};

use crate::error::{Error, Result};

/// One step of a [`ResponsePath`].
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Field(String),
    Index(usize),
}

/// Where the generated text lives in a JSON response body, e.g.
/// `choices[0].message.content`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponsePath {
    raw: String,
    segments: Vec<Segment>,
}

impl ResponsePath {
    /// Follow the path and return the string at its end, if any.
    #[must_use]
    pub fn extract<'a>(&self, body: &'a Value) -> Option<&'a str> {
        let mut cur = body;
        for seg in &self.segments {
            cur = match seg {
                Segment::Field(name) => cur.get(name.as_str())?,
                Segment::Index(i) => cur.get(*i)?,
            };
        }
        cur.as_str()
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for ResponsePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for ResponsePath {
    type Err = Error;

    fn from_str(raw: &str) -> Result<Self> {
        let invalid = || Error::InvalidResponsePath(raw.to_string());
        let mut segments = Vec::new();

        for part in raw.split('.') {
            let (name, mut rest) = match part.find('[') {
                Some(pos) => (&part[..pos], &part[pos..]),
                None => (part, ""),
            };
            if !name.is_empty() {
                segments.push(Segment::Field(name.to_string()));
            } else if rest.is_empty() {
                return Err(invalid());
            }
            while !rest.is_empty() {
                let close = rest.find(']').ok_or_else(invalid)?;
                let index = rest
                    .get(1..close)
                    .and_then(|s| s.parse::<usize>().ok())
                    .ok_or_else(invalid)?;
                segments.push(Segment::Index(index));
                rest = &rest[close + 1..];
                if !rest.is_empty() && !rest.starts_with('[') {
                    return Err(invalid());
                }
            }
        }

        if segments.is_empty() {
            return Err(invalid());
        }
        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }
}

/// Immutable per-backend settings. Built once at startup and shared behind
/// an `Arc`.
#[derive(Debug, Clone)]
pub struct BackendDescriptor {
    pub id: String,
    pub label: String,
    pub endpoint: String,
    pub model: String,
    pub auth: AuthScheme,
    pub wire: WireFormat,
    pub response_path: ResponsePath,
    pub timeout: Duration,
    pub headers: Vec<(String, String)>,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl BackendDescriptor {
    /// Build a descriptor from its configuration entry.
    pub fn from_config(config: &BackendConfig) -> Result<Self> {
        let response_path = config.response_path().parse()?;
        let mut headers: Vec<(String, String)> = config
            .headers
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        headers.sort();

        let label = if config.label.trim().is_empty() {
            config.id.clone()
        } else {
            config.label.clone()
        };

        Ok(Self {
            id: config.id.clone(),
            label,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            auth: config.auth.clone(),
            wire: config.wire,
            response_path,
            timeout: Duration::from_secs(config.timeout_secs.max(1)),
            headers,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }
}

#[cfg(test)]
mod tests {
    use {super::*, serde_json::json};

    fn path(raw: &str) -> ResponsePath {
        raw.parse().unwrap_or_else(|e| panic!("{raw}: {e}"))
    }

    #[test]
    fn extracts_openai_content() {
        let body = json!({"choices": [{"message": {"role": "assistant", "content": "hey"}}]});
        assert_eq!(path("choices[0].message.content").extract(&body), Some("hey"));
    }

    #[test]
    fn extracts_anthropic_text() {
        let body = json!({"content": [{"type": "text", "text": "摇滚"}]});
        assert_eq!(path("content[0].text").extract(&body), Some("摇滚"));
    }

    #[test]
    fn missing_field_or_non_string_is_none() {
        let body = json!({"choices": []});
        assert_eq!(path("choices[0].message.content").extract(&body), None);
        let body = json!({"choices": [{"message": {"content": null}}]});
        assert_eq!(path("choices[0].message.content").extract(&body), None);
    }

    #[test]
    fn nested_indices() {
        let body = json!({"a": [[1, "x"]]});
        assert_eq!(path("a[0][1]").extract(&body), Some("x"));
    }

    #[test]
    fn rejects_malformed_paths() {
        for raw in ["", "a..b", "a[x]", "a[0", "a[0]b", "."] {
            assert!(raw.parse::<ResponsePath>().is_err(), "{raw} should fail");
        }
    }

    #[test]
    fn descriptor_from_default_config() {
        let cfg = onika_config::OnikaConfig::default();
        let anthropic = cfg.backend("anthropic").map(BackendDescriptor::from_config);
        let Some(Ok(desc)) = anthropic else {
            panic!("anthropic descriptor");
        };
        assert_eq!(desc.wire, WireFormat::AnthropicMessages);
        assert_eq!(desc.response_path.as_str(), "content[0].text");
        assert_eq!(desc.timeout, Duration::from_secs(60));
        assert!(
            desc.headers
                .contains(&("anthropic-version".into(), "2023-06-01".into()))
        );
    }

    #[test]
    fn blank_label_falls_back_to_id() {
        let cfg = BackendConfig {
            id: "local".into(),
            endpoint: "http://localhost/v1/chat/completions".into(),
            model: "m".into(),
            ..Default::default()
        };
        let desc = BackendDescriptor::from_config(&cfg).unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(desc.label, "local");
    }
}
