//! L2: buffers, sanitizes, and durably writes an append-only log of
//! mutating requests without blocking the caller (spec §4.2).
//!
//! A bounded `mpsc` channel stands in for the single-producer-many-
//! handlers fan-in SPEC_FULL.md calls for: the request hook is the one
//! producer, a single consumer task drains it into the store. When the
//! channel is full the entry is dropped and `dropped` is incremented --
//! never block the request path.

use axum::body::{to_bytes, Body};
use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use hosting_domain::{classify_path, redact_body, AuditEntry, Identity};
use hosting_store::MetadataStore;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, warn};

const QUEUE_CAPACITY: usize = 1024;
const MAX_BODY_CAPTURE_BYTES: usize = 64 * 1024;

#[derive(Clone)]
pub struct AuditQueue {
    sender: mpsc::Sender<AuditEntry>,
    dropped: Arc<AtomicU64>,
}

impl AuditQueue {
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    fn try_enqueue(&self, entry: AuditEntry) {
        if self.sender.try_send(entry).is_err() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            warn!(dropped_total = self.dropped_count(), "audit queue full, dropping entry");
        }
    }
}

/// Spawns the single consumer and returns the producer handle to install
/// into `AppState`. Call once at startup, after the store is connected.
pub fn spawn(store: MetadataStore) -> AuditQueue {
    let (sender, mut receiver) = mpsc::channel::<AuditEntry>(QUEUE_CAPACITY);
    let dropped = Arc::new(AtomicU64::new(0));

    tokio::spawn(async move {
        while let Some(entry) = receiver.recv().await {
            let repo = match store.audit() {
                Ok(repo) => repo,
                Err(e) => {
                    error!(error = %e, "audit consumer could not open a connection");
                    continue;
                }
            };
            if let Err(e) = repo.insert(&entry).await {
                error!(error = %e, "audit consumer failed to persist entry");
            }
        }
    });

    AuditQueue { sender, dropped }
}

/// Request-hook middleware: for mutating methods, captures and redacts the
/// body, classifies the path, and enqueues without awaiting the write.
pub async fn audit_hook(State(state): State<crate::state::AppState>, req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let should_capture = matches!(method.as_str(), "POST" | "PUT" | "PATCH" | "DELETE");

    if !should_capture {
        return next.run(req).await;
    }

    let path = req.uri().path().to_string();
    let identity = req.extensions().get::<Identity>().map(|i| i.api_key_id);
    let (parts, body) = req.into_parts();

    let body_bytes = to_bytes(body, MAX_BODY_CAPTURE_BYTES).await.unwrap_or_default();
    let redacted_body = redact_body(&body_bytes);
    let req = Request::from_parts(parts, Body::from(body_bytes));

    let response = next.run(req).await;
    let status_code = response.status().as_u16();

    let (resource_type, resource_id) = classify_path(&path);
    let entry = AuditEntry {
        api_key_id: identity,
        method: method.to_string(),
        path,
        resource_type,
        resource_id,
        status_code,
        redacted_body,
        created_at: chrono::Utc::now(),
    };
    state.audit.try_enqueue(entry);

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use hosting_domain::ApiKeyId;
    use std::time::Duration;

    fn sample_entry(api_key_id: Option<ApiKeyId>) -> AuditEntry {
        AuditEntry {
            api_key_id,
            method: "POST".to_string(),
            path: "/api/v1/tenants".to_string(),
            resource_type: Some("tenants".to_string()),
            resource_id: None,
            status_code: 202,
            redacted_body: serde_json::json!({"name": "acme"}),
            created_at: chrono::Utc::now(),
        }
    }

    #[tokio::test]
    async fn enqueued_entry_is_durably_persisted_by_the_consumer() {
        let store = MetadataStore::connect(":memory:", None).await.unwrap();
        let queue = spawn(store.clone());

        let api_key_id = ApiKeyId::new();
        queue.try_enqueue(sample_entry(Some(api_key_id)));

        // The consumer task runs on its own schedule; give it a moment.
        tokio::time::sleep(Duration::from_millis(100)).await;

        let recent = store.audit().unwrap().list_recent(10).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].api_key_id, Some(api_key_id));
        assert_eq!(recent[0].path, "/api/v1/tenants");
        assert_eq!(recent[0].status_code, 202);
    }

    #[tokio::test]
    async fn a_full_queue_drops_entries_and_counts_them_instead_of_blocking() {
        let store = MetadataStore::connect(":memory:", None).await.unwrap();
        let queue = spawn(store);

        for _ in 0..(QUEUE_CAPACITY + 50) {
            queue.try_enqueue(sample_entry(None));
        }

        assert!(queue.dropped_count() > 0);
    }
}
