//! Schema bootstrap. Every statement is `CREATE TABLE IF NOT EXISTS`, so
//! re-running it on an already-provisioned store is a no-op.
//!
//! Tenant-owned resources (webroots, fqdns, databases, ...) share one
//! `resources` table keyed by `kind` rather than twenty-odd bespoke
//! tables -- spec §1 scopes the concrete relational schema out of core
//! requirements, leaving only the operations in §6, and the resource
//! envelope in `hosting_domain::resource` is what those operations need.

use crate::errors::StoreError;
use libsql::Connection;
use tracing::instrument;

const TABLES: &[(&str, &str)] = &[
    ("brands", r#"
        CREATE TABLE IF NOT EXISTS brands (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            base_hostname TEXT NOT NULL,
            ns1 TEXT NOT NULL,
            ns2 TEXT NOT NULL,
            hostmaster_email TEXT NOT NULL
        );
    "#),
    ("regions", r#"
        CREATE TABLE IF NOT EXISTS regions (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL UNIQUE
        );
    "#),
    ("clusters", r#"
        CREATE TABLE IF NOT EXISTS clusters (
            id TEXT PRIMARY KEY,
            region_id TEXT NOT NULL,
            name TEXT NOT NULL,
            brand_ids TEXT NOT NULL DEFAULT '[]'
        );
    "#),
    ("shards", r#"
        CREATE TABLE IF NOT EXISTS shards (
            id TEXT PRIMARY KEY,
            cluster_id TEXT NOT NULL,
            role TEXT NOT NULL,
            name TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'active',
            status_message TEXT,
            role_config TEXT NOT NULL DEFAULT '{}'
        );
    "#),
    ("nodes", r#"
        CREATE TABLE IF NOT EXISTS nodes (
            id TEXT PRIMARY KEY,
            hostname TEXT NOT NULL,
            liveness TEXT NOT NULL DEFAULT 'unknown',
            last_health_at TEXT
        );
    "#),
    ("node_shard_memberships", r#"
        CREATE TABLE IF NOT EXISTS node_shard_memberships (
            node_id TEXT NOT NULL,
            shard_id TEXT NOT NULL,
            shard_role TEXT NOT NULL,
            shard_index INTEGER NOT NULL,
            PRIMARY KEY (node_id, shard_id)
        );
    "#),
    ("tenants", r#"
        CREATE TABLE IF NOT EXISTS tenants (
            id TEXT PRIMARY KEY,
            brand_id TEXT NOT NULL,
            region_id TEXT NOT NULL,
            cluster_id TEXT NOT NULL,
            shard_id TEXT NOT NULL,
            name TEXT NOT NULL,
            uid INTEGER NOT NULL UNIQUE,
            sftp_enabled INTEGER NOT NULL DEFAULT 0,
            ssh_enabled INTEGER NOT NULL DEFAULT 0,
            disk_quota_mb INTEGER NOT NULL DEFAULT 0,
            status TEXT NOT NULL DEFAULT 'pending',
            status_message TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE(brand_id, name)
        );
    "#),
    ("uid_allocator", r#"
        CREATE TABLE IF NOT EXISTS uid_allocator (
            id INTEGER PRIMARY KEY CHECK (id = 0),
            next_uid INTEGER NOT NULL
        );
    "#),
    ("resources", r#"
        CREATE TABLE IF NOT EXISTS resources (
            id TEXT PRIMARY KEY,
            tenant_id TEXT NOT NULL,
            parent_id TEXT,
            kind TEXT NOT NULL,
            payload TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending',
            status_message TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
    "#),
    ("resources_tenant_idx", r#"
        CREATE INDEX IF NOT EXISTS resources_tenant_idx ON resources(tenant_id, kind);
    "#),
    ("resources_parent_idx", r#"
        CREATE INDEX IF NOT EXISTS resources_parent_idx ON resources(parent_id);
    "#),
    ("api_keys", r#"
        CREATE TABLE IF NOT EXISTS api_keys (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            key_hash TEXT NOT NULL UNIQUE,
            scopes TEXT NOT NULL DEFAULT '[]',
            brands TEXT NOT NULL DEFAULT '[]',
            revoked_at TEXT
        );
    "#),
    ("audit_logs", r#"
        CREATE TABLE IF NOT EXISTS audit_logs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            api_key_id TEXT,
            method TEXT NOT NULL,
            path TEXT NOT NULL,
            resource_type TEXT,
            resource_id TEXT,
            status_code INTEGER NOT NULL,
            redacted_body TEXT NOT NULL,
            created_at TEXT NOT NULL
        );
    "#),
    ("audit_logs_created_idx", r#"
        CREATE INDEX IF NOT EXISTS audit_logs_created_idx ON audit_logs(created_at);
    "#),
    ("node_health", r#"
        CREATE TABLE IF NOT EXISTS node_health (
            node_id TEXT PRIMARY KEY,
            status TEXT NOT NULL,
            checks TEXT NOT NULL DEFAULT '[]',
            reconciliation TEXT,
            reported_at TEXT NOT NULL
        );
    "#),
    ("drift_events", r#"
        CREATE TABLE IF NOT EXISTS drift_events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            node_id TEXT NOT NULL,
            summary TEXT NOT NULL,
            detail TEXT NOT NULL DEFAULT '{}',
            observed_at TEXT NOT NULL
        );
    "#),
    ("drift_events_node_idx", r#"
        CREATE INDEX IF NOT EXISTS drift_events_node_idx ON drift_events(node_id, id);
    "#),
    ("workflow_runs", r#"
        CREATE TABLE IF NOT EXISTS workflow_runs (
            workflow_id TEXT PRIMARY KEY,
            workflow_kind TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'running',
            callback_url TEXT,
            result TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
    "#),
    ("workflow_events", r#"
        CREATE TABLE IF NOT EXISTS workflow_events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            workflow_id TEXT NOT NULL,
            seq INTEGER NOT NULL,
            event_type TEXT NOT NULL,
            payload BLOB NOT NULL,
            created_at TEXT NOT NULL,
            UNIQUE(workflow_id, seq)
        );
    "#),
    ("schedules", r#"
        CREATE TABLE IF NOT EXISTS schedules (
            id TEXT PRIMARY KEY,
            cron TEXT NOT NULL,
            workflow_kind TEXT NOT NULL,
            args TEXT NOT NULL DEFAULT '{}',
            created_at TEXT NOT NULL
        );
    "#),
];

#[instrument(skip(conn))]
pub async fn apply_schema(conn: &Connection) -> Result<(), StoreError> {
    for (name, statement) in TABLES {
        conn.execute_batch(statement)
            .await
            .map_err(|e| StoreError::Connection(format!("schema step '{name}' failed: {e}")))?;
    }
    Ok(())
}
