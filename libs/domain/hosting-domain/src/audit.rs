//! Audit entries and the redaction / path-classification rules the audit
//! pipeline (L2) applies before a captured request body is persisted
//! (spec §4.2).

use crate::ids::ApiKeyId;
use serde::{Deserialize, Serialize};

/// Top-level body fields whose values are replaced with `"[REDACTED]"`
/// before the audit row is written.
pub const SENSITIVE_FIELDS: &[&str] = &[
    "password",
    "key_pem",
    "cert_pem",
    "chain_pem",
    "api_key",
    "secret",
    "token",
];

/// Maximum captured-body size, in bytes, before the audit pipeline falls
/// back to recording only the byte length.
pub const MAX_CAPTURED_BODY_BYTES: usize = 16 * 1024;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub api_key_id: Option<ApiKeyId>,
    pub method: String,
    pub path: String,
    pub resource_type: Option<String>,
    pub resource_id: Option<String>,
    pub status_code: u16,
    /// Either the redacted structured body, or `{"byte_length": N}` when
    /// the body was unstructured or over the size cap.
    pub redacted_body: serde_json::Value,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Redacts `SENSITIVE_FIELDS` in a structured top-level body, or falls
/// back to a byte-length marker if the body isn't an object or exceeds
/// `MAX_CAPTURED_BODY_BYTES`.
pub fn redact_body(raw_body: &[u8]) -> serde_json::Value {
    if raw_body.len() > MAX_CAPTURED_BODY_BYTES {
        return serde_json::json!({ "byte_length": raw_body.len() });
    }

    match serde_json::from_slice::<serde_json::Value>(raw_body) {
        Ok(serde_json::Value::Object(mut map)) => {
            for field in SENSITIVE_FIELDS {
                if let Some(value) = map.get_mut(*field) {
                    *value = serde_json::Value::String("[REDACTED]".to_string());
                }
            }
            serde_json::Value::Object(map)
        }
        _ => serde_json::json!({ "byte_length": raw_body.len() }),
    }
}

/// Derives `(resource_type, resource_id)` from a request path. The
/// trailing segment preceding an opaque identifier becomes the resource
/// type; a further opaque segment following it becomes the resource id.
/// Repeated nested segments use the last such pair (spec §4.2).
pub fn classify_path(path: &str) -> (Option<String>, Option<String>) {
    let segments: Vec<&str> = path
        .trim_start_matches('/')
        .split('/')
        .filter(|s| !s.is_empty())
        .collect();

    let mut resource_type = None;
    let mut resource_id = None;

    let mut i = 0;
    while i < segments.len() {
        if !is_opaque_identifier(segments[i]) {
            let ty = segments[i].to_string();
            if i + 1 < segments.len() && is_opaque_identifier(segments[i + 1]) {
                resource_type = Some(ty);
                resource_id = Some(segments[i + 1].to_string());
                i += 2;
                continue;
            } else {
                resource_type = Some(ty);
                resource_id = None;
            }
        }
        i += 1;
    }

    (resource_type, resource_id)
}

fn is_opaque_identifier(segment: &str) -> bool {
    !segment.is_empty()
        && segment
            .chars()
            .all(|c| c.is_ascii_hexdigit() || c == '-')
        && segment.chars().any(|c| c.is_ascii_digit() || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redacts_top_level_sensitive_fields() {
        let body = br#"{"name":"ci","password":"hunter2"}"#;
        let redacted = redact_body(body);
        assert_eq!(redacted["name"], "ci");
        assert_eq!(redacted["password"], "[REDACTED]");
    }

    #[test]
    fn oversized_body_falls_back_to_length() {
        let body = vec![b'a'; MAX_CAPTURED_BODY_BYTES + 1];
        let redacted = redact_body(&body);
        assert_eq!(redacted["byte_length"], MAX_CAPTURED_BODY_BYTES + 1);
    }

    #[test]
    fn classifies_nested_resource_path() {
        let (ty, id) = classify_path("/api/v1/tenants/3f2e-aaaa/webroots/11-22");
        assert_eq!(ty.as_deref(), Some("webroots"));
        assert_eq!(id.as_deref(), Some("11-22"));
    }

    #[test]
    fn classifies_collection_path_without_id() {
        let (ty, id) = classify_path("/api/v1/tenants");
        assert_eq!(ty.as_deref(), Some("tenants"));
        assert_eq!(id, None);
    }
}
