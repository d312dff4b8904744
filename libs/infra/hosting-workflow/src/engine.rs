//! M1: the workflow runtime adapter. Each run is a `workflow_runs` row
//! plus an append-only `workflow_events` log; `start` is idempotent via
//! the store's uniqueness constraint, `signal` wakes a suspended
//! in-memory task, and `await_result` blocks the caller until the run
//! reaches a terminal event.

use crate::activity::ActivityRegistry;
use crate::errors::WorkflowError;
use crate::events::WorkflowEvent;
use crate::orchestration::Orchestration;
use futures::future::BoxFuture;
use hosting_store::MetadataStore;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::{broadcast, Mutex};
use tracing::{error, info, instrument, warn};

pub type WorkflowFn =
    Arc<dyn Fn(Arc<Orchestration>, serde_json::Value) -> BoxFuture<'static, Result<serde_json::Value, WorkflowError>> + Send + Sync>;

type CompletionMsg = Result<serde_json::Value, String>;

/// A signal channel is created lazily per `(workflow_id, signal_name)` the
/// first time either `signal` or `await_signal` touches it, so whichever
/// side arrives first doesn't race the other.
#[derive(Default)]
struct SignalHub {
    channels: Mutex<HashMap<(String, String), broadcast::Sender<serde_json::Value>>>,
}

impl SignalHub {
    async fn sender(&self, workflow_id: &str, name: &str) -> broadcast::Sender<serde_json::Value> {
        let mut channels = self.channels.lock().await;
        channels
            .entry((workflow_id.to_string(), name.to_string()))
            .or_insert_with(|| broadcast::channel(64).0)
            .clone()
    }
}

#[derive(Default)]
struct CompletionHub {
    channels: Mutex<HashMap<String, broadcast::Sender<CompletionMsg>>>,
}

impl CompletionHub {
    async fn sender(&self, workflow_id: &str) -> broadcast::Sender<CompletionMsg> {
        let mut channels = self.channels.lock().await;
        channels.entry(workflow_id.to_string()).or_insert_with(|| broadcast::channel(4).0).clone()
    }
}

pub struct WorkflowEngine {
    store: MetadataStore,
    activities: Arc<ActivityRegistry>,
    workflows: RwLock<HashMap<String, WorkflowFn>>,
    signals: SignalHub,
    completions: CompletionHub,
    callback_http: reqwest::Client,
}

impl WorkflowEngine {
    pub fn new(store: MetadataStore, activities: ActivityRegistry) -> Arc<Self> {
        Arc::new(Self {
            store,
            activities: Arc::new(activities),
            workflows: RwLock::new(HashMap::new()),
            signals: SignalHub::default(),
            completions: CompletionHub::default(),
            callback_http: reqwest::Client::new(),
        })
    }

    pub fn register_workflow(&self, kind: impl Into<String>, workflow: WorkflowFn) {
        self.workflows.write().expect("workflow registry lock poisoned").insert(kind.into(), workflow);
    }

    pub(crate) async fn subscribe_signal(&self, workflow_id: &str, name: &str) -> broadcast::Receiver<serde_json::Value> {
        self.signals.sender(workflow_id, name).await.subscribe()
    }

    /// Starts `workflow_id` running `workflow_kind`. A duplicate start
    /// with the same id is idempotent: the insert is a no-op and this
    /// returns `Ok(())` without spawning a second task.
    #[instrument(skip(self, args, callback_url), fields(workflow_id, workflow_kind))]
    pub async fn start(
        self: &Arc<Self>,
        workflow_kind: &str,
        workflow_id: &str,
        args: serde_json::Value,
        callback_url: Option<String>,
    ) -> Result<(), WorkflowError> {
        let workflow_fn = self
            .workflows
            .read()
            .expect("workflow registry lock poisoned")
            .get(workflow_kind)
            .cloned()
            .ok_or_else(|| WorkflowError::UnknownWorkflowKind(workflow_kind.to_string()))?;

        let newly_started = self.store.workflows()?.try_start(workflow_id, workflow_kind, callback_url.as_deref()).await?;
        if !newly_started {
            info!(workflow_id, workflow_kind, "start is a no-op: run already exists");
            return Ok(());
        }

        self.log_event(workflow_id, &WorkflowEvent::Started { workflow_kind: workflow_kind.to_string(), args: args.clone() }).await?;

        let orchestration = Arc::new(Orchestration {
            workflow_id: workflow_id.to_string(),
            store: self.store.clone(),
            activities: self.activities.clone(),
            engine: self.clone(),
            signal_receivers: Mutex::new(HashMap::new()),
        });

        let engine = self.clone();
        let workflow_id_owned = workflow_id.to_string();
        let callback_url = callback_url.clone();

        tokio::spawn(async move {
            let outcome = workflow_fn(orchestration, args).await;
            engine.finish(&workflow_id_owned, outcome, callback_url).await;
        });

        Ok(())
    }

    async fn finish(
        self: &Arc<Self>,
        workflow_id: &str,
        outcome: Result<serde_json::Value, WorkflowError>,
        callback_url: Option<String>,
    ) {
        let (status, event, completion_msg) = match &outcome {
            Ok(result) => ("completed", WorkflowEvent::Completed { result: result.clone() }, Ok(result.clone())),
            Err(err) => {
                let message = err.to_string();
                ("failed", WorkflowEvent::Failed { message: message.clone() }, Err(message))
            }
        };

        if let Err(e) = self.log_event(workflow_id, &event).await {
            error!(workflow_id, error = %e, "failed to log terminal workflow event");
        }

        let result_json = match &completion_msg {
            Ok(value) => Some(value.to_string()),
            Err(message) => Some(message.clone()),
        };
        if let Ok(repo) = self.store.workflows() {
            if let Err(e) = repo.update_run_status(workflow_id, status, result_json.as_deref()).await {
                error!(workflow_id, error = %e, "failed to persist terminal workflow status");
            }
        }

        let sender = self.completions.sender(workflow_id).await;
        let _ = sender.send(completion_msg);

        if let Some(url) = callback_url {
            self.deliver_callback(workflow_id, &url, &outcome).await;
        }
    }

    async fn log_event(&self, workflow_id: &str, event: &WorkflowEvent) -> Result<(), WorkflowError> {
        let payload = event.encode()?;
        self.store.workflows()?.append_event(workflow_id, event.event_type(), &payload).await?;
        Ok(())
    }

    /// Delivers a named signal to a running workflow. Durably logged
    /// first, then fanned out to any in-memory task currently suspended
    /// on `await_signal(name)`.
    #[instrument(skip(self, payload), fields(workflow_id, signal = name))]
    pub async fn signal(&self, workflow_id: &str, name: &str, payload: serde_json::Value) -> Result<(), WorkflowError> {
        self.log_event(workflow_id, &WorkflowEvent::SignalReceived { name: name.to_string(), payload: payload.clone() }).await?;
        let sender = self.signals.sender(workflow_id, name).await;
        let _ = sender.send(payload);
        Ok(())
    }

    /// Blocks until `workflow_id` reaches a terminal state or `timeout`
    /// elapses. If the run already completed before this call, the
    /// stored run status is consulted directly instead of waiting on a
    /// broadcast that already fired.
    #[instrument(skip(self), fields(workflow_id))]
    pub async fn await_result(&self, workflow_id: &str, timeout: Duration) -> Result<serde_json::Value, WorkflowError> {
        // Subscribe before consulting the persisted status: `finish`
        // updates the row and then broadcasts, in that order, so a
        // receiver created before the status check can never miss the
        // notification for a run that completes between the two steps.
        let mut receiver = self.completions.sender(workflow_id).await.subscribe();

        if let Ok(run) = self.store.workflows()?.get_run(workflow_id).await {
            match run.status.as_str() {
                "completed" => {
                    return Ok(run.result.and_then(|raw| serde_json::from_str(&raw).ok()).unwrap_or(serde_json::Value::Null));
                }
                "failed" => {
                    let message = run.result.unwrap_or_else(|| "workflow failed".to_string());
                    return Err(WorkflowError::Activity(hosting_domain::ActivityError::Terminal(message)));
                }
                _ => {}
            }
        }

        match tokio::time::timeout(timeout, receiver.recv()).await {
            Ok(Ok(Ok(value))) => Ok(value),
            Ok(Ok(Err(message))) => Err(WorkflowError::Activity(hosting_domain::ActivityError::Terminal(message))),
            Ok(Err(_)) => Err(WorkflowError::NotFound(workflow_id.to_string())),
            Err(_) => Err(WorkflowError::AwaitTimeout(workflow_id.to_string())),
        }
    }

    async fn deliver_callback(&self, workflow_id: &str, url: &str, outcome: &Result<serde_json::Value, WorkflowError>) {
        let body = match outcome {
            Ok(result) => serde_json::json!({ "workflow_id": workflow_id, "status": "completed", "result": result }),
            Err(err) => serde_json::json!({ "workflow_id": workflow_id, "status": "failed", "status_message": err.to_string() }),
        };

        // Best-effort with bounded retry (spec §6.1): three attempts,
        // short fixed backoff. A callback failure never fails the
        // workflow itself.
        for attempt in 1..=3u32 {
            match self.callback_http.post(url).json(&body).send().await {
                Ok(response) if response.status().is_success() => return,
                Ok(response) => warn!(workflow_id, url, status = %response.status(), attempt, "callback rejected"),
                Err(e) => warn!(workflow_id, url, error = %e, attempt, "callback delivery failed"),
            }
            tokio::time::sleep(Duration::from_millis(250 * attempt as u64)).await;
        }
        error!(workflow_id, url, "callback delivery exhausted retries");
    }

    /// H4: creates or updates a periodic trigger by stable id. Idempotent
    /// on restart -- re-registering the same id just updates the cron
    /// expression, never errors.
    #[instrument(skip(self, args), fields(schedule_id = id))]
    pub async fn schedule(&self, id: &str, cron: &str, workflow_kind: &str, args: &serde_json::Value) -> Result<(), WorkflowError> {
        self.store.workflows()?.upsert_schedule(id, cron, workflow_kind, &args.to_string()).await?;
        Ok(())
    }

    pub fn store(&self) -> &MetadataStore {
        &self.store
    }

    pub fn activities(&self) -> &Arc<ActivityRegistry> {
        &self.activities
    }
}
