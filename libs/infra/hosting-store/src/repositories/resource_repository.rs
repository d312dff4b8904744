//! The generic resource envelope: every tenant-owned resource kind lives
//! in one table, keyed by `kind`, with an opaque JSON payload.

use super::{enum_to_string, parse_enum, parse_json, parse_timestamp};
use crate::errors::StoreError;
use hosting_domain::{Resource, ResourceId, ResourceKind, ResourceStatus, TenantId};
use libsql::{params, Connection, Row};
use tracing::instrument;

pub struct ResourceRepository {
    connection: Connection,
}

impl ResourceRepository {
    pub fn new(connection: Connection) -> Self {
        Self { connection }
    }

    #[instrument(skip(self, resource))]
    pub async fn create(&self, resource: &Resource) -> Result<(), StoreError> {
        self.connection
            .execute(
                "INSERT INTO resources (
                    id, tenant_id, parent_id, kind, payload, status, status_message,
                    created_at, updated_at
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    resource.id.to_string(),
                    resource.tenant_id.to_string(),
                    resource.parent_id.map(|id| id.to_string()),
                    enum_to_string(&resource.kind)?,
                    resource.payload.to_string(),
                    enum_to_string(&resource.status)?,
                    resource.status_message.clone(),
                    resource.created_at.to_rfc3339(),
                    resource.updated_at.to_rfc3339(),
                ],
            )
            .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: ResourceId) -> Result<Resource, StoreError> {
        let mut rows = self
            .connection
            .query(&format!("SELECT {COLUMNS} FROM resources WHERE id = ?1"), params![id.to_string()])
            .await?;
        let row = rows.next().await?.ok_or(StoreError::NotFound)?;
        Self::map_row(row)
    }

    #[instrument(skip(self))]
    pub async fn list_by_tenant(&self, tenant_id: TenantId, kind: Option<ResourceKind>) -> Result<Vec<Resource>, StoreError> {
        let mut rows = match kind {
            Some(kind) => {
                self.connection
                    .query(
                        &format!("SELECT {COLUMNS} FROM resources WHERE tenant_id = ?1 AND kind = ?2 ORDER BY created_at"),
                        params![tenant_id.to_string(), enum_to_string(&kind)?],
                    )
                    .await?
            }
            None => {
                self.connection
                    .query(
                        &format!("SELECT {COLUMNS} FROM resources WHERE tenant_id = ?1 ORDER BY created_at"),
                        params![tenant_id.to_string()],
                    )
                    .await?
            }
        };

        let mut out = Vec::new();
        while let Some(row) = rows.next().await? {
            out.push(Self::map_row(row)?);
        }
        Ok(out)
    }

    /// Scans every tenant for resources of `kind`, used by the scheduled
    /// retention jobs (backups, expired certificates) that operate
    /// across the whole fleet rather than one tenant at a time.
    #[instrument(skip(self))]
    pub async fn list_by_kind(&self, kind: ResourceKind) -> Result<Vec<Resource>, StoreError> {
        let mut rows = self
            .connection
            .query(
                &format!("SELECT {COLUMNS} FROM resources WHERE kind = ?1 ORDER BY created_at"),
                params![enum_to_string(&kind)?],
            )
            .await?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().await? {
            out.push(Self::map_row(row)?);
        }
        Ok(out)
    }

    #[instrument(skip(self))]
    pub async fn list_by_parent(&self, parent_id: ResourceId) -> Result<Vec<Resource>, StoreError> {
        let mut rows = self
            .connection
            .query(
                &format!("SELECT {COLUMNS} FROM resources WHERE parent_id = ?1 ORDER BY created_at"),
                params![parent_id.to_string()],
            )
            .await?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().await? {
            out.push(Self::map_row(row)?);
        }
        Ok(out)
    }

    #[instrument(skip(self))]
    pub async fn update_payload(&self, id: ResourceId, payload: &serde_json::Value) -> Result<(), StoreError> {
        let affected = self
            .connection
            .execute(
                "UPDATE resources SET payload = ?1, updated_at = ?2 WHERE id = ?3",
                params![payload.to_string(), chrono::Utc::now().to_rfc3339(), id.to_string()],
            )
            .await?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn update_status(
        &self,
        id: ResourceId,
        status: ResourceStatus,
        status_message: Option<String>,
    ) -> Result<(), StoreError> {
        let affected = self
            .connection
            .execute(
                "UPDATE resources SET status = ?1, status_message = ?2, updated_at = ?3 WHERE id = ?4",
                params![
                    enum_to_string(&status)?,
                    status_message,
                    chrono::Utc::now().to_rfc3339(),
                    id.to_string(),
                ],
            )
            .await?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: ResourceId) -> Result<(), StoreError> {
        let affected = self
            .connection
            .execute("DELETE FROM resources WHERE id = ?1", params![id.to_string()])
            .await?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    /// Deletes `root` and every descendant reachable through `parent_id`,
    /// deepest first, in one transaction. Resource workflows call this
    /// only after each descendant's own side-effecting teardown activity
    /// has already run -- this just clears the metadata store's view.
    #[instrument(skip(self))]
    pub async fn delete_subtree(&self, root: ResourceId) -> Result<usize, StoreError> {
        let transaction = self.connection.transaction().await?;

        let mut frontier = vec![root];
        let mut ordered = Vec::new();
        while let Some(parent_id) = frontier.pop() {
            ordered.push(parent_id);
            let mut rows = transaction
                .query(
                    "SELECT id FROM resources WHERE parent_id = ?1",
                    params![parent_id.to_string()],
                )
                .await?;
            while let Some(row) = rows.next().await? {
                let child_id: String = row.get(0)?;
                let child_id = uuid::Uuid::parse_str(&child_id)
                    .map_err(|e| StoreError::Mapping(e.to_string()))?
                    .into();
                frontier.push(child_id);
            }
        }

        for id in ordered.iter().rev() {
            transaction
                .execute("DELETE FROM resources WHERE id = ?1", params![id.to_string()])
                .await?;
        }

        transaction.commit().await?;
        Ok(ordered.len())
    }

    fn map_row(row: Row) -> Result<Resource, StoreError> {
        let parent_id: Option<String> = row.get(2)?;
        let kind: String = row.get(3)?;
        let payload_raw: String = row.get(4)?;
        let status: String = row.get(5)?;
        Ok(Resource {
            id: uuid::Uuid::parse_str(&row.get::<String>(0)?)
                .map_err(|e| StoreError::Mapping(e.to_string()))?
                .into(),
            tenant_id: uuid::Uuid::parse_str(&row.get::<String>(1)?)
                .map_err(|e| StoreError::Mapping(e.to_string()))?
                .into(),
            parent_id: parent_id
                .map(|raw| uuid::Uuid::parse_str(&raw).map(Into::into))
                .transpose()
                .map_err(|e| StoreError::Mapping(e.to_string()))?,
            kind: parse_enum(&kind)?,
            payload: parse_json(&payload_raw)?,
            status: parse_enum(&status)?,
            status_message: row.get(6)?,
            created_at: parse_timestamp(&row.get::<String>(7)?)?,
            updated_at: parse_timestamp(&row.get::<String>(8)?)?,
        })
    }
}

const COLUMNS: &str = "id, tenant_id, parent_id, kind, payload, status, status_message, created_at, updated_at";
