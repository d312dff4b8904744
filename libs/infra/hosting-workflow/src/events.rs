//! The append-only event vocabulary every workflow run is replayed from.
//! Encoded with `bincode` for the on-disk form -- this log never leaves
//! the process boundary, unlike the JSON node-agent wire format (spec
//! §6.6).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum WorkflowEvent {
    Started { workflow_kind: String, args: serde_json::Value },
    ActivityScheduled { name: String, args: serde_json::Value },
    ActivityCompleted { result: serde_json::Value },
    ActivityFailed { message: String },
    SignalReceived { name: String, payload: serde_json::Value },
    TimerFired { millis: u64 },
    ChildStarted { workflow_id: String, workflow_kind: String },
    Completed { result: serde_json::Value },
    Failed { message: String },
    Cancelled,
}

impl WorkflowEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            WorkflowEvent::Started { .. } => "started",
            WorkflowEvent::ActivityScheduled { .. } => "activity_scheduled",
            WorkflowEvent::ActivityCompleted { .. } => "activity_completed",
            WorkflowEvent::ActivityFailed { .. } => "activity_failed",
            WorkflowEvent::SignalReceived { .. } => "signal_received",
            WorkflowEvent::TimerFired { .. } => "timer_fired",
            WorkflowEvent::ChildStarted { .. } => "child_started",
            WorkflowEvent::Completed { .. } => "completed",
            WorkflowEvent::Failed { .. } => "failed",
            WorkflowEvent::Cancelled => "cancelled",
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, crate::errors::WorkflowError> {
        bincode::serialize(self).map_err(|e| crate::errors::WorkflowError::Encoding(e.to_string()))
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, crate::errors::WorkflowError> {
        bincode::deserialize(bytes).map_err(|e| crate::errors::WorkflowError::Encoding(e.to_string()))
    }
}
