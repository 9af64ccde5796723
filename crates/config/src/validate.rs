//! Semantic validation of a loaded configuration.
//!
//! Parsing already enforces the schema's shape; this pass catches settings
//! that parse fine but would make the router or the bot misbehave.

use std::collections::HashSet;

use crate::schema::OnikaConfig;

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
        }
    }
}

/// A single validation diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Dotted path, e.g. "router.order[1]".
    pub path: String,
    pub message: String,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}: {}", self.severity, self.path, self.message)
    }
}

/// Result of validating a configuration.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
}

impl ValidationResult {
    /// Returns `true` if any diagnostic is an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// Count diagnostics by severity.
    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }

    fn push(&mut self, severity: Severity, path: impl Into<String>, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic {
            severity,
            path: path.into(),
            message: message.into(),
        });
    }
}

/// Validate a configuration.
pub fn validate(config: &OnikaConfig) -> ValidationResult {
    let mut result = ValidationResult::default();

    let mut seen = HashSet::new();
    for (i, backend) in config.backends.iter().enumerate() {
        let path = format!("backends[{i}]");
        if backend.id.trim().is_empty() {
            result.push(Severity::Error, format!("{path}.id"), "backend id is empty");
        } else if !seen.insert(backend.id.as_str()) {
            result.push(
                Severity::Error,
                format!("{path}.id"),
                format!("duplicate backend id '{}'", backend.id),
            );
        }
        if !backend.endpoint.starts_with("http://") && !backend.endpoint.starts_with("https://") {
            result.push(
                Severity::Error,
                format!("{path}.endpoint"),
                format!("'{}' is not an http(s) URL", backend.endpoint),
            );
        }
        if backend.model.trim().is_empty() {
            result.push(Severity::Error, format!("{path}.model"), "model is empty");
        }
        if backend.timeout_secs == 0 {
            result.push(
                Severity::Error,
                format!("{path}.timeout_secs"),
                "timeout must be at least one second",
            );
        }
        if backend.api_key.is_none() && backend.api_key_env.is_none() {
            result.push(
                Severity::Warning,
                format!("{path}.api_key"),
                format!("backend '{}' has no credential source and will be skipped", backend.id),
            );
        }
    }

    if config.router.order.is_empty() {
        result.push(Severity::Error, "router.order", "no backends in the failover order");
    }
    for (i, id) in config.router.order.iter().enumerate() {
        if config.backend(id).is_none() {
            result.push(
                Severity::Error,
                format!("router.order[{i}]"),
                format!("unknown backend id '{id}'"),
            );
        }
    }
    if config.router.retry_attempts == 0 {
        result.push(
            Severity::Error,
            "router.retry_attempts",
            "must be at least 1 (attempts are counted in total)",
        );
    }

    if config.search.result_count == 0 || config.search.result_count > 20 {
        result.push(
            Severity::Warning,
            "search.result_count",
            "clamped to the 1..=20 range",
        );
    }
    if config.search.description_max_chars == 0 {
        result.push(
            Severity::Warning,
            "search.description_max_chars",
            "descriptions will be dropped entirely",
        );
    }

    if config.sessions.max_entries == 0 {
        result.push(
            Severity::Error,
            "sessions.max_entries",
            "modify would never find a prior artifact",
        );
    }

    result
}
