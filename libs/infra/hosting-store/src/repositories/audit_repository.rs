//! Audit log persistence. The audit pipeline (L2) calls `insert` off the
//! hot path, after its bounded queue has already dropped anything that
//! couldn't be enqueued -- this repository just needs to be fast and
//! never block the caller longer than one round trip.

use super::{parse_json, parse_timestamp};
use crate::errors::StoreError;
use hosting_domain::{ApiKeyId, AuditEntry};
use libsql::{params, Connection, Row};
use tracing::instrument;

pub struct AuditRepository {
    connection: Connection,
}

impl AuditRepository {
    pub fn new(connection: Connection) -> Self {
        Self { connection }
    }

    #[instrument(skip(self, entry))]
    pub async fn insert(&self, entry: &AuditEntry) -> Result<(), StoreError> {
        self.connection
            .execute(
                "INSERT INTO audit_logs (
                    api_key_id, method, path, resource_type, resource_id,
                    status_code, redacted_body, created_at
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    entry.api_key_id.map(|id| id.to_string()),
                    entry.method.clone(),
                    entry.path.clone(),
                    entry.resource_type.clone(),
                    entry.resource_id.clone(),
                    entry.status_code as i64,
                    entry.redacted_body.to_string(),
                    entry.created_at.to_rfc3339(),
                ],
            )
            .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn list_recent(&self, limit: u32) -> Result<Vec<AuditEntry>, StoreError> {
        let mut rows = self
            .connection
            .query(
                &format!("SELECT {COLUMNS} FROM audit_logs ORDER BY created_at DESC LIMIT ?1"),
                params![limit as i64],
            )
            .await?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().await? {
            out.push(Self::map_row(row)?);
        }
        Ok(out)
    }

    #[instrument(skip(self))]
    pub async fn list_by_resource(&self, resource_type: &str, resource_id: &str) -> Result<Vec<AuditEntry>, StoreError> {
        let mut rows = self
            .connection
            .query(
                &format!("SELECT {COLUMNS} FROM audit_logs WHERE resource_type = ?1 AND resource_id = ?2 ORDER BY created_at DESC"),
                params![resource_type.to_string(), resource_id.to_string()],
            )
            .await?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().await? {
            out.push(Self::map_row(row)?);
        }
        Ok(out)
    }

    /// Deletes rows older than `cutoff`. The `H4` scheduled retention job
    /// runs this on its own cadence; callers don't need a transaction
    /// since a partial purge is still a correct purge.
    #[instrument(skip(self))]
    pub async fn purge_older_than(&self, cutoff: chrono::DateTime<chrono::Utc>) -> Result<usize, StoreError> {
        let affected = self
            .connection
            .execute("DELETE FROM audit_logs WHERE created_at < ?1", params![cutoff.to_rfc3339()])
            .await?;
        Ok(affected as usize)
    }

    fn map_row(row: Row) -> Result<AuditEntry, StoreError> {
        let api_key_id: Option<String> = row.get(0)?;
        let redacted_body_raw: String = row.get(6)?;
        Ok(AuditEntry {
            api_key_id: api_key_id
                .map(|raw| uuid::Uuid::parse_str(&raw).map(ApiKeyId::from))
                .transpose()
                .map_err(|e| StoreError::Mapping(e.to_string()))?,
            method: row.get(1)?,
            path: row.get(2)?,
            resource_type: row.get(3)?,
            resource_id: row.get(4)?,
            status_code: row.get::<i64>(5)? as u16,
            redacted_body: parse_json(&redacted_body_raw)?,
            created_at: parse_timestamp(&row.get::<String>(7)?)?,
        })
    }
}

const COLUMNS: &str = "api_key_id, method, path, resource_type, resource_id, status_code, redacted_body, created_at";
