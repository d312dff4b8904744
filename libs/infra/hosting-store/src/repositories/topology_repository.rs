//! Shards, nodes, and the node<->shard membership edges.

use super::{enum_to_string, parse_enum, parse_json};
use crate::errors::StoreError;
use hosting_domain::{ClusterId, Node, NodeId, NodeLiveness, NodeShardMembership, Shard, ShardId, ShardRole, ShardStatus};
use libsql::{params, Connection, Row};
use tracing::instrument;

pub struct TopologyRepository {
    connection: Connection,
}

impl TopologyRepository {
    pub fn new(connection: Connection) -> Self {
        Self { connection }
    }

    #[instrument(skip(self, shard))]
    pub async fn create_shard(&self, shard: &Shard) -> Result<(), StoreError> {
        self.connection
            .execute(
                "INSERT INTO shards (id, cluster_id, role, name, status, status_message, role_config)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    shard.id.to_string(),
                    shard.cluster_id.to_string(),
                    enum_to_string(&shard.role)?,
                    shard.name.clone(),
                    enum_to_string(&shard.status)?,
                    shard.status_message.clone(),
                    shard.role_config.to_string(),
                ],
            )
            .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn get_shard(&self, id: ShardId) -> Result<Shard, StoreError> {
        let mut rows = self
            .connection
            .query(
                "SELECT id, cluster_id, role, name, status, status_message, role_config FROM shards WHERE id = ?1",
                params![id.to_string()],
            )
            .await?;
        let row = rows.next().await?.ok_or(StoreError::NotFound)?;
        Self::map_shard_row(row)
    }

    #[instrument(skip(self))]
    pub async fn list_shards_by_cluster(&self, cluster_id: ClusterId) -> Result<Vec<Shard>, StoreError> {
        let mut rows = self
            .connection
            .query(
                "SELECT id, cluster_id, role, name, status, status_message, role_config
                 FROM shards WHERE cluster_id = ?1 ORDER BY name",
                params![cluster_id.to_string()],
            )
            .await?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().await? {
            out.push(Self::map_shard_row(row)?);
        }
        Ok(out)
    }

    #[instrument(skip(self))]
    pub async fn list_shards_by_role(&self, cluster_id: ClusterId, role: ShardRole) -> Result<Vec<Shard>, StoreError> {
        let mut rows = self
            .connection
            .query(
                "SELECT id, cluster_id, role, name, status, status_message, role_config
                 FROM shards WHERE cluster_id = ?1 AND role = ?2 ORDER BY name",
                params![cluster_id.to_string(), enum_to_string(&role)?],
            )
            .await?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().await? {
            out.push(Self::map_shard_row(row)?);
        }
        Ok(out)
    }

    #[instrument(skip(self))]
    pub async fn update_shard_status(
        &self,
        id: ShardId,
        status: ShardStatus,
        status_message: Option<String>,
    ) -> Result<(), StoreError> {
        let affected = self
            .connection
            .execute(
                "UPDATE shards SET status = ?1, status_message = ?2 WHERE id = ?3",
                params![enum_to_string(&status)?, status_message, id.to_string()],
            )
            .await?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    #[instrument(skip(self, node))]
    pub async fn upsert_node(&self, node: &Node) -> Result<(), StoreError> {
        self.connection
            .execute(
                "INSERT INTO nodes (id, hostname, liveness, last_health_at) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(id) DO UPDATE SET
                     hostname = excluded.hostname,
                     liveness = excluded.liveness,
                     last_health_at = excluded.last_health_at",
                params![
                    node.id.to_string(),
                    node.hostname.clone(),
                    enum_to_string(&node.liveness)?,
                    node.last_health_at.map(|t| t.to_rfc3339()),
                ],
            )
            .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn get_node(&self, id: NodeId) -> Result<Node, StoreError> {
        let mut rows = self
            .connection
            .query(
                "SELECT id, hostname, liveness, last_health_at FROM nodes WHERE id = ?1",
                params![id.to_string()],
            )
            .await?;
        let row = rows.next().await?.ok_or(StoreError::NotFound)?;
        Self::map_node_row(row)
    }

    #[instrument(skip(self))]
    pub async fn set_node_liveness(&self, id: NodeId, liveness: NodeLiveness) -> Result<(), StoreError> {
        let affected = self
            .connection
            .execute(
                "UPDATE nodes SET liveness = ?1, last_health_at = ?2 WHERE id = ?3",
                params![
                    enum_to_string(&liveness)?,
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
    pub async fn list_stale_nodes(&self, cutoff: chrono::DateTime<chrono::Utc>) -> Result<Vec<Node>, StoreError> {
        let mut rows = self
            .connection
            .query(
                "SELECT id, hostname, liveness, last_health_at FROM nodes
                 WHERE last_health_at IS NULL OR last_health_at < ?1
                 ORDER BY hostname",
                params![cutoff.to_rfc3339()],
            )
            .await?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().await? {
            out.push(Self::map_node_row(row)?);
        }
        Ok(out)
    }

    /// Members of `shard_id`, ordered by `shard_index` -- the ordering the
    /// projector and convergence loop rely on for deterministic addressing
    /// (e.g. picking the primary database node).
    #[instrument(skip(self))]
    pub async fn list_memberships_by_shard(&self, shard_id: ShardId) -> Result<Vec<NodeShardMembership>, StoreError> {
        let mut rows = self
            .connection
            .query(
                "SELECT node_id, shard_id, shard_role, shard_index FROM node_shard_memberships
                 WHERE shard_id = ?1 ORDER BY shard_index",
                params![shard_id.to_string()],
            )
            .await?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().await? {
            out.push(Self::map_membership_row(row)?);
        }
        Ok(out)
    }

    #[instrument(skip(self))]
    pub async fn list_memberships_by_node(&self, node_id: NodeId) -> Result<Vec<NodeShardMembership>, StoreError> {
        let mut rows = self
            .connection
            .query(
                "SELECT node_id, shard_id, shard_role, shard_index FROM node_shard_memberships
                 WHERE node_id = ?1 ORDER BY shard_index",
                params![node_id.to_string()],
            )
            .await?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().await? {
            out.push(Self::map_membership_row(row)?);
        }
        Ok(out)
    }

    /// Assigns the next free `shard_index` for a new membership in `shard_id`.
    /// Index stability for existing members is preserved -- this only ever
    /// appends.
    #[instrument(skip(self))]
    pub async fn add_membership(&self, shard_id: ShardId, node_id: NodeId, role: ShardRole) -> Result<u32, StoreError> {
        let transaction = self.connection.transaction().await?;

        let mut rows = transaction
            .query(
                "SELECT COALESCE(MAX(shard_index), -1) FROM node_shard_memberships WHERE shard_id = ?1",
                params![shard_id.to_string()],
            )
            .await?;
        let max_index: i64 = rows.next().await?.ok_or(StoreError::Mapping("missing aggregate row".into()))?.get(0)?;
        let next_index = (max_index + 1) as u32;

        transaction
            .execute(
                "INSERT INTO node_shard_memberships (node_id, shard_id, shard_role, shard_index)
                 VALUES (?1, ?2, ?3, ?4)",
                params![node_id.to_string(), shard_id.to_string(), enum_to_string(&role)?, next_index],
            )
            .await?;

        transaction.commit().await?;
        Ok(next_index)
    }

    #[instrument(skip(self))]
    pub async fn remove_membership(&self, shard_id: ShardId, node_id: NodeId) -> Result<(), StoreError> {
        let affected = self
            .connection
            .execute(
                "DELETE FROM node_shard_memberships WHERE shard_id = ?1 AND node_id = ?2",
                params![shard_id.to_string(), node_id.to_string()],
            )
            .await?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    fn map_shard_row(row: Row) -> Result<Shard, StoreError> {
        let role: String = row.get(2)?;
        let status: String = row.get(4)?;
        let role_config_raw: String = row.get(6)?;
        Ok(Shard {
            id: uuid::Uuid::parse_str(&row.get::<String>(0)?)
                .map_err(|e| StoreError::Mapping(e.to_string()))?
                .into(),
            cluster_id: uuid::Uuid::parse_str(&row.get::<String>(1)?)
                .map_err(|e| StoreError::Mapping(e.to_string()))?
                .into(),
            role: parse_enum(&role)?,
            name: row.get(3)?,
            status: parse_enum(&status)?,
            status_message: row.get(5)?,
            role_config: parse_json(&role_config_raw)?,
        })
    }

    fn map_node_row(row: Row) -> Result<Node, StoreError> {
        let liveness: String = row.get(2)?;
        let last_health_at: Option<String> = row.get(3)?;
        Ok(Node {
            id: uuid::Uuid::parse_str(&row.get::<String>(0)?)
                .map_err(|e| StoreError::Mapping(e.to_string()))?
                .into(),
            hostname: row.get(1)?,
            liveness: parse_enum(&liveness)?,
            last_health_at: last_health_at.map(|raw| super::parse_timestamp(&raw)).transpose()?,
        })
    }

    fn map_membership_row(row: Row) -> Result<NodeShardMembership, StoreError> {
        let role: String = row.get(2)?;
        let index: i64 = row.get(3)?;
        Ok(NodeShardMembership {
            node_id: uuid::Uuid::parse_str(&row.get::<String>(0)?)
                .map_err(|e| StoreError::Mapping(e.to_string()))?
                .into(),
            shard_id: uuid::Uuid::parse_str(&row.get::<String>(1)?)
                .map_err(|e| StoreError::Mapping(e.to_string()))?
                .into(),
            shard_role: parse_enum(&role)?,
            shard_index: index as u32,
        })
    }
}
