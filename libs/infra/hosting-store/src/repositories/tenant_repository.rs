//! Tenants, including uid allocation (spec §4.4: process-wide-unique,
//! never reused).

use super::{enum_to_string, parse_enum, parse_timestamp};
use crate::errors::StoreError;
use hosting_domain::{BrandId, ClusterId, RegionId, ShardId, Tenant, TenantId, TenantStatus};
use libsql::{params, Connection, Row};
use tracing::instrument;

pub struct TenantRepository {
    connection: Connection,
}

impl TenantRepository {
    pub fn new(connection: Connection) -> Self {
        Self { connection }
    }

    /// Allocates the next uid and inserts the tenant row in one transaction.
    #[instrument(skip(self, tenant))]
    pub async fn create(&self, tenant: &Tenant) -> Result<(), StoreError> {
        let transaction = self.connection.transaction().await?;

        transaction
            .execute(
                "INSERT INTO uid_allocator (id, next_uid) VALUES (0, ?1)
                 ON CONFLICT(id) DO UPDATE SET next_uid = excluded.next_uid
                 WHERE excluded.next_uid > next_uid",
                params![(tenant.uid as i64) + 1],
            )
            .await?;

        let insert_result = transaction
            .execute(
                "INSERT INTO tenants (
                    id, brand_id, region_id, cluster_id, shard_id, name, uid,
                    sftp_enabled, ssh_enabled, disk_quota_mb, status, status_message,
                    created_at, updated_at
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
                params![
                    tenant.id.to_string(),
                    tenant.brand_id.to_string(),
                    tenant.region_id.to_string(),
                    tenant.cluster_id.to_string(),
                    tenant.shard_id.to_string(),
                    tenant.name.clone(),
                    tenant.uid as i64,
                    tenant.sftp_enabled as i64,
                    tenant.ssh_enabled as i64,
                    tenant.disk_quota_mb as i64,
                    enum_to_string(&tenant.status)?,
                    tenant.status_message.clone(),
                    tenant.created_at.to_rfc3339(),
                    tenant.updated_at.to_rfc3339(),
                ],
            )
            .await;

        match insert_result {
            Ok(_) => {
                transaction.commit().await?;
                Ok(())
            }
            Err(libsql::Error::SqliteFailure(_, msg)) if msg.contains("UNIQUE") => {
                transaction.rollback().await.ok();
                Err(StoreError::Conflict(format!(
                    "tenant name '{}' already exists for this brand",
                    tenant.name
                )))
            }
            Err(other) => {
                transaction.rollback().await.ok();
                Err(StoreError::Query(other))
            }
        }
    }

    /// Reserves the next uid without creating a tenant row yet, for callers
    /// that need the uid before the rest of the create payload is ready.
    #[instrument(skip(self))]
    pub async fn reserve_next_uid(&self) -> Result<u32, StoreError> {
        let transaction = self.connection.transaction().await?;
        let mut rows = transaction
            .query("SELECT next_uid FROM uid_allocator WHERE id = 0", ())
            .await?;
        let next_uid: i64 = match rows.next().await? {
            Some(row) => row.get(0)?,
            None => 10_000,
        };
        transaction
            .execute(
                "INSERT INTO uid_allocator (id, next_uid) VALUES (0, ?1)
                 ON CONFLICT(id) DO UPDATE SET next_uid = excluded.next_uid",
                params![next_uid + 1],
            )
            .await?;
        transaction.commit().await?;
        Ok(next_uid as u32)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: TenantId) -> Result<Tenant, StoreError> {
        let mut rows = self
            .connection
            .query(&format!("SELECT {COLUMNS} FROM tenants WHERE id = ?1"), params![id.to_string()])
            .await?;
        let row = rows.next().await?.ok_or(StoreError::NotFound)?;
        Self::map_row(row)
    }

    #[instrument(skip(self))]
    pub async fn get_by_brand_and_name(&self, brand_id: BrandId, name: &str) -> Result<Tenant, StoreError> {
        let mut rows = self
            .connection
            .query(
                &format!("SELECT {COLUMNS} FROM tenants WHERE brand_id = ?1 AND name = ?2"),
                params![brand_id.to_string(), name.to_string()],
            )
            .await?;
        let row = rows.next().await?.ok_or(StoreError::NotFound)?;
        Self::map_row(row)
    }

    /// Lists tenants, optionally restricted to `brand_ids` -- callers must
    /// pass `Identity::brand_filter()` through here rather than filtering
    /// client-side (spec §4.1).
    #[instrument(skip(self, brand_ids))]
    pub async fn list(&self, brand_ids: Option<&[String]>) -> Result<Vec<Tenant>, StoreError> {
        let rows = match brand_ids {
            None => {
                self.connection
                    .query(&format!("SELECT {COLUMNS} FROM tenants ORDER BY created_at"), ())
                    .await?
            }
            Some(ids) if ids.is_empty() => return Ok(Vec::new()),
            Some(ids) => {
                let placeholders: Vec<String> = (1..=ids.len()).map(|i| format!("?{i}")).collect();
                let sql = format!(
                    "SELECT {COLUMNS} FROM tenants WHERE brand_id IN ({}) ORDER BY created_at",
                    placeholders.join(", ")
                );
                let params: Vec<libsql::Value> = ids.iter().map(|id| libsql::Value::Text(id.clone())).collect();
                self.connection.query(&sql, params).await?
            }
        };

        let mut rows = rows;
        let mut out = Vec::new();
        while let Some(row) = rows.next().await? {
            out.push(Self::map_row(row)?);
        }
        Ok(out)
    }

    #[instrument(skip(self))]
    pub async fn list_by_shard(&self, shard_id: ShardId) -> Result<Vec<Tenant>, StoreError> {
        let mut rows = self
            .connection
            .query(
                &format!("SELECT {COLUMNS} FROM tenants WHERE shard_id = ?1 ORDER BY created_at"),
                params![shard_id.to_string()],
            )
            .await?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().await? {
            out.push(Self::map_row(row)?);
        }
        Ok(out)
    }

    #[instrument(skip(self))]
    pub async fn update_status(
        &self,
        id: TenantId,
        status: TenantStatus,
        status_message: Option<String>,
    ) -> Result<(), StoreError> {
        let affected = self
            .connection
            .execute(
                "UPDATE tenants SET status = ?1, status_message = ?2, updated_at = ?3 WHERE id = ?4",
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
    pub async fn update_quota(&self, id: TenantId, disk_quota_mb: u64) -> Result<(), StoreError> {
        let affected = self
            .connection
            .execute(
                "UPDATE tenants SET disk_quota_mb = ?1, updated_at = ?2 WHERE id = ?3",
                params![disk_quota_mb as i64, chrono::Utc::now().to_rfc3339(), id.to_string()],
            )
            .await?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    fn map_row(row: Row) -> Result<Tenant, StoreError> {
        let status: String = row.get(10)?;
        Ok(Tenant {
            id: uuid::Uuid::parse_str(&row.get::<String>(0)?)
                .map_err(|e| StoreError::Mapping(e.to_string()))?
                .into(),
            brand_id: uuid::Uuid::parse_str(&row.get::<String>(1)?)
                .map_err(|e| StoreError::Mapping(e.to_string()))?
                .into(),
            region_id: uuid::Uuid::parse_str(&row.get::<String>(2)?)
                .map_err(|e| StoreError::Mapping(e.to_string()))?
                .into(),
            cluster_id: uuid::Uuid::parse_str(&row.get::<String>(3)?)
                .map_err(|e| StoreError::Mapping(e.to_string()))?
                .into(),
            shard_id: uuid::Uuid::parse_str(&row.get::<String>(4)?)
                .map_err(|e| StoreError::Mapping(e.to_string()))?
                .into(),
            name: row.get(5)?,
            uid: row.get::<i64>(6)? as u32,
            sftp_enabled: row.get::<i64>(7)? != 0,
            ssh_enabled: row.get::<i64>(8)? != 0,
            disk_quota_mb: row.get::<i64>(9)? as u64,
            status: parse_enum(&status)?,
            status_message: row.get(11)?,
            created_at: parse_timestamp(&row.get::<String>(12)?)?,
            updated_at: parse_timestamp(&row.get::<String>(13)?)?,
        })
    }
}

const COLUMNS: &str = "id, brand_id, region_id, cluster_id, shard_id, name, uid, \
    sftp_enabled, ssh_enabled, disk_quota_mb, status, status_message, created_at, updated_at";
