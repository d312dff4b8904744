//! The handle workflow closures receive. Every side effect -- running an
//! activity, waiting on a timer, waiting on a signal, starting a child
//! workflow -- goes through here and is logged as an event before the
//! underlying work runs, so replay never re-runs an already-committed
//! step (spec §4.4, "Workflow runtime adapter" implementation notes in
//! SPEC_FULL.md).

use crate::activity::{ActivityRegistry, RetryPolicy};
use crate::engine::WorkflowEngine;
use crate::errors::WorkflowError;
use crate::events::WorkflowEvent;
use hosting_store::MetadataStore;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex};
use tracing::instrument;

pub struct Orchestration {
    pub(crate) workflow_id: String,
    pub(crate) store: MetadataStore,
    pub(crate) activities: Arc<ActivityRegistry>,
    pub(crate) engine: Arc<WorkflowEngine>,
    /// One persistent receiver per signal name, created on first await
    /// and held for the lifetime of the run. A `broadcast::Receiver`
    /// buffers messages sent while nothing is polling it, but only if it
    /// already existed when they were sent -- subscribing fresh on every
    /// `await_signal` call (as this used to) meant any signal sent while
    /// the workflow was off doing something else (e.g. `start_child`
    /// awaiting a saga) had no receiver to buffer into and was dropped.
    pub(crate) signal_receivers: Mutex<HashMap<String, broadcast::Receiver<serde_json::Value>>>,
}

impl Orchestration {
    /// Appends `event` to this run's log. The seq is allocated by
    /// `append_event` itself (`MAX(seq)+1` in the same statement as the
    /// insert) -- the engine's own `Started`/`SignalReceived`/terminal
    /// events go through the identical path, so there is one seq source
    /// for the whole run, never two independently-counting ones.
    async fn append(&self, event: &WorkflowEvent) -> Result<(), WorkflowError> {
        self.store.workflows()?.append_event(&self.workflow_id, event.event_type(), &event.encode()?).await?;
        Ok(())
    }

    /// Runs `name` to completion (with retry/backoff), logging the
    /// schedule and outcome as events. Process-crash recovery is out of
    /// scope for the current adapter (see DESIGN.md): a run only survives
    /// for the lifetime of the tokio task `WorkflowEngine::start` spawned
    /// for it, so this always invokes the activity rather than consulting
    /// the event log for a memoized result.
    #[instrument(skip(self, args), fields(workflow_id = %self.workflow_id, activity = name))]
    pub async fn run_activity(&self, name: &str, args: serde_json::Value) -> Result<serde_json::Value, WorkflowError> {
        self.append(&WorkflowEvent::ActivityScheduled { name: name.to_string(), args: args.clone() }).await?;

        match self.activities.invoke_with_retry(name, args, RetryPolicy::default()).await {
            Ok(result) => {
                self.append(&WorkflowEvent::ActivityCompleted { result: result.clone() }).await?;
                Ok(result)
            }
            Err(activity_err) => {
                self.append(&WorkflowEvent::ActivityFailed { message: activity_err.to_string() }).await?;
                Err(WorkflowError::Activity(activity_err))
            }
        }
    }

    #[instrument(skip(self), fields(workflow_id = %self.workflow_id))]
    pub async fn timer(&self, duration: Duration) -> Result<(), WorkflowError> {
        tokio::time::sleep(duration).await;
        self.append(&WorkflowEvent::TimerFired { millis: duration.as_millis() as u64 }).await
    }

    /// Suspends until `name` is signaled for this workflow. The receiver
    /// for `name` is created once and kept for the run's lifetime (see
    /// `signal_receivers`), so a signal sent while this workflow was busy
    /// elsewhere (running an activity, awaiting a child) is still
    /// buffered and delivered on the next call rather than lost.
    #[instrument(skip(self), fields(workflow_id = %self.workflow_id, signal = name))]
    pub async fn await_signal(&self, name: &str) -> Result<serde_json::Value, WorkflowError> {
        let mut receivers = self.signal_receivers.lock().await;
        if !receivers.contains_key(name) {
            let receiver = self.engine.subscribe_signal(&self.workflow_id, name).await;
            receivers.insert(name.to_string(), receiver);
        }
        let receiver = receivers.get_mut(name).expect("just inserted if absent");
        let payload = receiver.recv().await.map_err(|_| WorkflowError::NotFound(self.workflow_id.clone()))?;
        Ok(payload)
    }

    /// Starts `workflow_kind` as a child with its own identifier and
    /// awaits its terminal result. Ordering with user-initiated operations
    /// on the same entity is preserved because the parent (the per-tenant
    /// serializer) never calls resource workflows directly -- only through
    /// this path (spec §4.6).
    #[instrument(skip(self, args), fields(workflow_id = %self.workflow_id, child_kind = workflow_kind, child_id = child_workflow_id))]
    pub async fn start_child(
        &self,
        workflow_kind: &str,
        child_workflow_id: &str,
        args: serde_json::Value,
    ) -> Result<serde_json::Value, WorkflowError> {
        self.append(&WorkflowEvent::ChildStarted {
            workflow_id: child_workflow_id.to_string(),
            workflow_kind: workflow_kind.to_string(),
        })
        .await?;

        self.engine.clone().start(workflow_kind, child_workflow_id, args, None).await?;
        self.engine.await_result(child_workflow_id, Duration::from_secs(600)).await
    }

    pub fn workflow_id(&self) -> &str {
        &self.workflow_id
    }

    pub(crate) fn store(&self) -> &MetadataStore {
        &self.store
    }

    /// Truncates this run's event log to its most recent `keep_last`
    /// entries. Used by long-lived workflows (the per-tenant serializer)
    /// that never reach a terminal event on their own.
    pub(crate) async fn compact_history(&self, keep_last: i64) -> Result<(), WorkflowError> {
        self.store.workflows()?.truncate_events(&self.workflow_id, keep_last).await?;
        Ok(())
    }
}
