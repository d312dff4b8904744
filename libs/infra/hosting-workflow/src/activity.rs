//! L3: the registry of side-effecting operations, keyed by name, with
//! typed retryable/terminal classification and exponential backoff.
//! Activities themselves are opaque closures -- this crate does not know
//! about MySQL, PowerDNS, nginx, etc. (spec §1 non-goals); it only knows
//! how to invoke one, time it out, and retry it.

use futures::future::BoxFuture;
use hosting_domain::ActivityError;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{instrument, warn};

pub type ActivityResult = Result<serde_json::Value, ActivityError>;
pub type ActivityFn = Arc<dyn Fn(serde_json::Value) -> BoxFuture<'static, ActivityResult> + Send + Sync>;

/// Per-attempt and total-schedule timeouts, defaulting to the values in
/// spec §5. Long-running activities (image pulls, backups) override both.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub per_attempt_timeout: Duration,
    pub total_timeout: Duration,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            per_attempt_timeout: Duration::from_secs(60),
            total_timeout: Duration::from_secs(600),
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(30),
        }
    }
}

#[derive(Default)]
pub struct ActivityRegistry {
    activities: HashMap<String, ActivityFn>,
}

impl ActivityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, activity: ActivityFn) {
        self.activities.insert(name.into(), activity);
    }

    /// Retries `name` with `policy` until it succeeds, returns terminal,
    /// or the total-schedule timeout elapses (itself a retryable outcome
    /// for the caller, which maps to `TransientInfrastructure`).
    #[instrument(skip(self, args, policy), fields(activity = name))]
    pub async fn invoke_with_retry(
        &self,
        name: &str,
        args: serde_json::Value,
        policy: RetryPolicy,
    ) -> Result<serde_json::Value, ActivityError> {
        let activity = self
            .activities
            .get(name)
            .ok_or_else(|| ActivityError::Terminal(format!("no activity registered as '{name}'")))?
            .clone();

        let deadline = tokio::time::Instant::now() + policy.total_timeout;
        let mut backoff = policy.initial_backoff;

        loop {
            let attempt = tokio::time::timeout(policy.per_attempt_timeout, activity(args.clone())).await;

            let outcome = match attempt {
                Ok(result) => result,
                Err(_) => Err(ActivityError::Retryable(format!("activity '{name}' timed out after {:?}", policy.per_attempt_timeout))),
            };

            match outcome {
                Ok(value) => return Ok(value),
                Err(ActivityError::Terminal(message)) => return Err(ActivityError::Terminal(message)),
                Err(ActivityError::Retryable(message)) => {
                    if tokio::time::Instant::now() >= deadline {
                        return Err(ActivityError::Retryable(format!(
                            "activity '{name}' exhausted total schedule timeout; last error: {message}"
                        )));
                    }
                    warn!(activity = name, %message, backoff_ms = backoff.as_millis() as u64, "activity attempt failed, retrying");
                    tokio::time::sleep(backoff).await;
                    backoff = (backoff * 2).min(policy.max_backoff);
                }
            }
        }
    }
}
