//! Node health reports (overwritten per node) and the per-node drift
//! event ring buffer (append-only, capped, FIFO eviction).

use super::{parse_json, parse_timestamp};
use crate::errors::StoreError;
use hosting_domain::{DriftEvent, NodeHealthReport, NodeId};
use libsql::{params, Connection, Row};
use tracing::instrument;

pub struct HealthRepository {
    connection: Connection,
}

impl HealthRepository {
    pub fn new(connection: Connection) -> Self {
        Self { connection }
    }

    #[instrument(skip(self, report))]
    pub async fn upsert_health(&self, report: &NodeHealthReport) -> Result<(), StoreError> {
        self.connection
            .execute(
                "INSERT INTO node_health (node_id, status, checks, reconciliation, reported_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(node_id) DO UPDATE SET
                     status = excluded.status,
                     checks = excluded.checks,
                     reconciliation = excluded.reconciliation,
                     reported_at = excluded.reported_at",
                params![
                    report.node_id.to_string(),
                    report.status.clone(),
                    serde_json::to_string(&report.checks).map_err(|e| StoreError::Mapping(e.to_string()))?,
                    report
                        .reconciliation
                        .as_ref()
                        .map(serde_json::to_string)
                        .transpose()
                        .map_err(|e| StoreError::Mapping(e.to_string()))?,
                    report.reported_at.to_rfc3339(),
                ],
            )
            .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn get_health(&self, node_id: NodeId) -> Result<NodeHealthReport, StoreError> {
        let mut rows = self
            .connection
            .query(
                "SELECT node_id, status, checks, reconciliation, reported_at FROM node_health WHERE node_id = ?1",
                params![node_id.to_string()],
            )
            .await?;
        let row = rows.next().await?.ok_or(StoreError::NotFound)?;
        Self::map_health_row(row)
    }

    #[instrument(skip(self))]
    pub async fn list_all_health(&self) -> Result<Vec<NodeHealthReport>, StoreError> {
        let mut rows = self
            .connection
            .query("SELECT node_id, status, checks, reconciliation, reported_at FROM node_health", ())
            .await?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().await? {
            out.push(Self::map_health_row(row)?);
        }
        Ok(out)
    }

    /// Appends a drift event and evicts the oldest rows for this node past
    /// `DriftEvent::RING_CAPACITY`.
    #[instrument(skip(self, event))]
    pub async fn append_drift(&self, event: &DriftEvent) -> Result<(), StoreError> {
        let transaction = self.connection.transaction().await?;

        transaction
            .execute(
                "INSERT INTO drift_events (node_id, summary, detail, observed_at) VALUES (?1, ?2, ?3, ?4)",
                params![
                    event.node_id.to_string(),
                    event.summary.clone(),
                    event.detail.to_string(),
                    event.observed_at.to_rfc3339(),
                ],
            )
            .await?;

        transaction
            .execute(
                "DELETE FROM drift_events WHERE node_id = ?1 AND id NOT IN (
                    SELECT id FROM drift_events WHERE node_id = ?1 ORDER BY id DESC LIMIT ?2
                 )",
                params![event.node_id.to_string(), DriftEvent::RING_CAPACITY as i64],
            )
            .await?;

        transaction.commit().await?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn list_drift(&self, node_id: NodeId, limit: u32) -> Result<Vec<DriftEvent>, StoreError> {
        let mut rows = self
            .connection
            .query(
                "SELECT node_id, summary, detail, observed_at FROM drift_events
                 WHERE node_id = ?1 ORDER BY id DESC LIMIT ?2",
                params![node_id.to_string(), limit as i64],
            )
            .await?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().await? {
            out.push(Self::map_drift_row(row)?);
        }
        Ok(out)
    }

    fn map_health_row(row: Row) -> Result<NodeHealthReport, StoreError> {
        let checks_raw: String = row.get(2)?;
        let reconciliation_raw: Option<String> = row.get(3)?;
        Ok(NodeHealthReport {
            node_id: uuid::Uuid::parse_str(&row.get::<String>(0)?)
                .map_err(|e| StoreError::Mapping(e.to_string()))?
                .into(),
            status: row.get(1)?,
            checks: serde_json::from_str(&checks_raw).map_err(|e| StoreError::Mapping(e.to_string()))?,
            reconciliation: reconciliation_raw
                .map(|raw| serde_json::from_str(&raw))
                .transpose()
                .map_err(|e| StoreError::Mapping(e.to_string()))?,
            reported_at: parse_timestamp(&row.get::<String>(4)?)?,
        })
    }

    fn map_drift_row(row: Row) -> Result<DriftEvent, StoreError> {
        let detail_raw: String = row.get(2)?;
        Ok(DriftEvent {
            node_id: uuid::Uuid::parse_str(&row.get::<String>(0)?)
                .map_err(|e| StoreError::Mapping(e.to_string()))?
                .into(),
            summary: row.get(1)?,
            detail: parse_json(&detail_raw)?,
            observed_at: parse_timestamp(&row.get::<String>(3)?)?,
        })
    }
}
