//! Logging sanitization (spec §4.9) and correlation helpers.
//!
//! Kept as its own crate, mirroring the teacher's `restflow-telemetry`
//! separation between "what we log" and "how we execute" — every other crate
//! depends on this one for `sanitize_input`/`redact_value`, never on a global
//! logger singleton (spec §9: "ambient observability singletons -> builder
//! injection").

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

const MAX_INPUT_LEN: usize = 1000;

static SENSITIVE_KEY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)password|token|secret|key|auth").expect("valid regex"));

/// Truncates an input string longer than 1000 characters, appending an
/// ellipsis, per spec §4.9.
pub fn sanitize_input(input: &str) -> String {
    if input.chars().count() > MAX_INPUT_LEN {
        let truncated: String = input.chars().take(MAX_INPUT_LEN).collect();
        format!("{truncated}...")
    } else {
        input.to_string()
    }
}

/// Recursively redacts object keys matching `password|token|secret|key|auth`
/// (case-insensitive) to `"[REDACTED]"`, and truncates long string leaves.
pub fn redact_value(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut out = serde_json::Map::with_capacity(map.len());
            for (k, v) in map {
                if SENSITIVE_KEY.is_match(k) {
                    out.insert(k.clone(), Value::String("[REDACTED]".to_string()));
                } else {
                    out.insert(k.clone(), redact_value(v));
                }
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(redact_value).collect()),
        Value::String(s) => Value::String(sanitize_input(s)),
        other => other.clone(),
    }
}

/// A correlation bundle attached to `tracing` spans/events at subsystem
/// boundaries, so logs are joinable without a global logging context.
#[derive(Debug, Clone)]
pub struct CorrelationFields {
    pub correlation_id: String,
    pub tenant_id: String,
    pub operation_id: Option<String>,
}

impl CorrelationFields {
    pub fn new(correlation_id: impl Into<String>, tenant_id: impl Into<String>) -> Self {
        Self {
            correlation_id: correlation_id.into(),
            tenant_id: tenant_id.into(),
            operation_id: None,
        }
    }

    pub fn with_operation_id(mut self, operation_id: impl Into<String>) -> Self {
        self.operation_id = Some(operation_id.into());
        self
    }

    pub fn log_event(&self, level: tracing::Level, message: &str) {
        match level {
            tracing::Level::ERROR => tracing::error!(
                correlation_id = %self.correlation_id,
                tenant_id = %self.tenant_id,
                operation_id = self.operation_id.as_deref().unwrap_or(""),
                "{message}"
            ),
            tracing::Level::WARN => tracing::warn!(
                correlation_id = %self.correlation_id,
                tenant_id = %self.tenant_id,
                operation_id = self.operation_id.as_deref().unwrap_or(""),
                "{message}"
            ),
            tracing::Level::DEBUG => tracing::debug!(
                correlation_id = %self.correlation_id,
                tenant_id = %self.tenant_id,
                operation_id = self.operation_id.as_deref().unwrap_or(""),
                "{message}"
            ),
            _ => tracing::info!(
                correlation_id = %self.correlation_id,
                tenant_id = %self.tenant_id,
                operation_id = self.operation_id.as_deref().unwrap_or(""),
                "{message}"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn truncates_long_input() {
        let long = "a".repeat(1500);
        let sanitized = sanitize_input(&long);
        assert_eq!(sanitized.chars().count(), MAX_INPUT_LEN + 3);
        assert!(sanitized.ends_with("..."));
    }

    #[test]
    fn leaves_short_input_untouched() {
        assert_eq!(sanitize_input("hello"), "hello");
    }

    #[test]
    fn redacts_sensitive_keys() {
        let value = json!({
            "username": "alice",
            "password": "hunter2",
            "nested": { "api_key": "sk-1234", "note": "fine" },
        });
        let redacted = redact_value(&value);
        assert_eq!(redacted["username"], json!("alice"));
        assert_eq!(redacted["password"], json!("[REDACTED]"));
        assert_eq!(redacted["nested"]["api_key"], json!("[REDACTED]"));
        assert_eq!(redacted["nested"]["note"], json!("fine"));
    }
}
