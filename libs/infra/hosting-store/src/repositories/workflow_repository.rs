//! Persistence for the in-process workflow engine (M1): the run header,
//! its append-only event log, and the registered cron schedules (H4).
//!
//! This crate doesn't depend on `hosting-workflow` -- the engine owns the
//! richer in-memory shapes (event enums, replay state) and maps them onto
//! these plain rows at the boundary.

use super::parse_timestamp;
use crate::errors::StoreError;
use libsql::{params, Connection, Row};
use tracing::instrument;

#[derive(Debug, Clone)]
pub struct WorkflowRunRow {
    pub workflow_id: String,
    pub workflow_kind: String,
    pub status: String,
    pub callback_url: Option<String>,
    pub result: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone)]
pub struct WorkflowEventRow {
    pub seq: i64,
    pub event_type: String,
    pub payload: Vec<u8>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone)]
pub struct ScheduleRow {
    pub id: String,
    pub cron: String,
    pub workflow_kind: String,
    pub args: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

pub struct WorkflowRepository {
    connection: Connection,
}

impl WorkflowRepository {
    pub fn new(connection: Connection) -> Self {
        Self { connection }
    }

    /// Inserts a new run header. Returns `Ok(false)` instead of erroring if
    /// `workflow_id` already exists, so callers can implement idempotent
    /// `start` (spec §4.6) without a separate existence check racing the
    /// insert.
    #[instrument(skip(self))]
    pub async fn try_start(&self, workflow_id: &str, workflow_kind: &str, callback_url: Option<&str>) -> Result<bool, StoreError> {
        let now = chrono::Utc::now().to_rfc3339();
        let result = self
            .connection
            .execute(
                "INSERT INTO workflow_runs (workflow_id, workflow_kind, status, callback_url, result, created_at, updated_at)
                 VALUES (?1, ?2, 'running', ?3, NULL, ?4, ?4)
                 ON CONFLICT(workflow_id) DO NOTHING",
                params![workflow_id.to_string(), workflow_kind.to_string(), callback_url.map(str::to_string), now],
            )
            .await?;
        Ok(result > 0)
    }

    #[instrument(skip(self))]
    pub async fn get_run(&self, workflow_id: &str) -> Result<WorkflowRunRow, StoreError> {
        let mut rows = self
            .connection
            .query(
                "SELECT workflow_id, workflow_kind, status, callback_url, result, created_at, updated_at
                 FROM workflow_runs WHERE workflow_id = ?1",
                params![workflow_id.to_string()],
            )
            .await?;
        let row = rows.next().await?.ok_or(StoreError::NotFound)?;
        Self::map_run_row(row)
    }

    #[instrument(skip(self))]
    pub async fn update_run_status(&self, workflow_id: &str, status: &str, result: Option<&str>) -> Result<(), StoreError> {
        let affected = self
            .connection
            .execute(
                "UPDATE workflow_runs SET status = ?1, result = ?2, updated_at = ?3 WHERE workflow_id = ?4",
                params![
                    status.to_string(),
                    result.map(str::to_string),
                    chrono::Utc::now().to_rfc3339(),
                    workflow_id.to_string(),
                ],
            )
            .await?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    /// Not called by the orchestrator today; the engine has no
    /// restart-resume path (see DESIGN.md). Kept for an operator script
    /// that wants to audit runs stuck `running` after a crash.
    #[instrument(skip(self))]
    pub async fn list_running(&self) -> Result<Vec<WorkflowRunRow>, StoreError> {
        let mut rows = self
            .connection
            .query(
                "SELECT workflow_id, workflow_kind, status, callback_url, result, created_at, updated_at
                 FROM workflow_runs WHERE status = 'running' ORDER BY created_at",
                (),
            )
            .await?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().await? {
            out.push(Self::map_run_row(row)?);
        }
        Ok(out)
    }

    /// Appends the next event for `workflow_id`, computing its `seq` as
    /// `MAX(seq)+1` over the existing log in the same statement as the
    /// insert. This is the *only* place a seq is allocated -- every
    /// caller (the engine's own `Started`/`SignalReceived`/terminal
    /// events and `Orchestration`'s activity/timer/child events) shares
    /// this one source, so two independent counters can never collide
    /// under the `UNIQUE(workflow_id, seq)` constraint. Returns the
    /// allocated seq.
    #[instrument(skip(self, payload))]
    pub async fn append_event(&self, workflow_id: &str, event_type: &str, payload: &[u8]) -> Result<i64, StoreError> {
        let mut rows = self
            .connection
            .query(
                "INSERT INTO workflow_events (workflow_id, seq, event_type, payload, created_at)
                 SELECT ?1, COALESCE(MAX(seq), -1) + 1, ?2, ?3, ?4
                 FROM workflow_events WHERE workflow_id = ?1
                 RETURNING seq",
                params![workflow_id.to_string(), event_type.to_string(), payload.to_vec(), chrono::Utc::now().to_rfc3339()],
            )
            .await
            .map_err(|e| match e {
                libsql::Error::SqliteFailure(_, msg) if msg.contains("UNIQUE") => {
                    StoreError::Conflict(format!("duplicate event append raced for workflow {workflow_id}"))
                }
                other => StoreError::Query(other),
            })?;
        let row = rows.next().await?.ok_or_else(|| StoreError::Mapping("append_event returned no row".to_string()))?;
        Ok(row.get(0)?)
    }

    /// The full event log for `workflow_id`, in sequence order -- what the
    /// engine replays to rebuild a workflow's state after a restart.
    #[instrument(skip(self))]
    pub async fn list_events(&self, workflow_id: &str) -> Result<Vec<WorkflowEventRow>, StoreError> {
        let mut rows = self
            .connection
            .query(
                "SELECT seq, event_type, payload, created_at FROM workflow_events
                 WHERE workflow_id = ?1 ORDER BY seq",
                params![workflow_id.to_string()],
            )
            .await?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().await? {
            out.push(WorkflowEventRow {
                seq: row.get(0)?,
                event_type: row.get(1)?,
                payload: row.get(2)?,
                created_at: parse_timestamp(&row.get::<String>(3)?)?,
            });
        }
        Ok(out)
    }

    /// Drops all but the most recent `keep_last` events for `workflow_id`.
    /// Used by the per-tenant serializer's continue-as-new cycle (spec
    /// §4.5) to keep its history bounded across a long-lived run.
    #[instrument(skip(self))]
    pub async fn truncate_events(&self, workflow_id: &str, keep_last: i64) -> Result<(), StoreError> {
        self.connection
            .execute(
                "DELETE FROM workflow_events WHERE workflow_id = ?1 AND seq NOT IN (
                     SELECT seq FROM workflow_events WHERE workflow_id = ?1 ORDER BY seq DESC LIMIT ?2
                 )",
                params![workflow_id.to_string(), keep_last],
            )
            .await?;
        Ok(())
    }

    #[instrument(skip(self, args))]
    pub async fn upsert_schedule(&self, id: &str, cron: &str, workflow_kind: &str, args: &str) -> Result<(), StoreError> {
        self.connection
            .execute(
                "INSERT INTO schedules (id, cron, workflow_kind, args, created_at) VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(id) DO UPDATE SET cron = excluded.cron, workflow_kind = excluded.workflow_kind, args = excluded.args",
                params![id.to_string(), cron.to_string(), workflow_kind.to_string(), args.to_string(), chrono::Utc::now().to_rfc3339()],
            )
            .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn list_schedules(&self) -> Result<Vec<ScheduleRow>, StoreError> {
        let mut rows = self
            .connection
            .query("SELECT id, cron, workflow_kind, args, created_at FROM schedules ORDER BY id", ())
            .await?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().await? {
            out.push(ScheduleRow {
                id: row.get(0)?,
                cron: row.get(1)?,
                workflow_kind: row.get(2)?,
                args: row.get(3)?,
                created_at: parse_timestamp(&row.get::<String>(4)?)?,
            });
        }
        Ok(out)
    }

    fn map_run_row(row: Row) -> Result<WorkflowRunRow, StoreError> {
        Ok(WorkflowRunRow {
            workflow_id: row.get(0)?,
            workflow_kind: row.get(1)?,
            status: row.get(2)?,
            callback_url: row.get(3)?,
            result: row.get(4)?,
            created_at: parse_timestamp(&row.get::<String>(5)?)?,
            updated_at: parse_timestamp(&row.get::<String>(6)?)?,
        })
    }
}
