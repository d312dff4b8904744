//! Connection management for the metadata store.
//!
//! `CORE_DATABASE_URL` is either a `libsql://`/`https://` remote, a local
//! file path, or an in-memory URL (`:memory:`) used by tests. In-memory
//! mode keeps a live anchor connection open for the lifetime of the
//! `MetadataStore` so the schema stays resident -- libSQL drops an
//! in-memory database once its last connection closes.

use crate::errors::StoreError;
use crate::repositories::{
    ApiKeyRepository, AuditRepository, BrandRepository, HealthRepository, ResourceRepository,
    TenantRepository, TopologyRepository, WorkflowRepository,
};
use crate::schema::apply_schema;
use libsql::{Builder, Connection, Database};
use std::sync::Arc;
use tracing::{info, instrument};

#[derive(Clone)]
pub struct MetadataStore {
    database: Arc<Database>,
    _memory_anchor: Option<Arc<Connection>>,
}

impl MetadataStore {
    #[instrument(skip(auth_token))]
    pub async fn connect(database_url: &str, auth_token: Option<String>) -> Result<Self, StoreError> {
        if database_url.is_empty() {
            return Err(StoreError::Configuration("CORE_DATABASE_URL is empty".into()));
        }

        let is_remote = database_url.starts_with("libsql://") || database_url.starts_with("https://");
        let is_memory = database_url.contains(":memory:") || database_url.contains("mode=memory");

        let database = if is_remote {
            let token = auth_token
                .ok_or_else(|| StoreError::Configuration("remote store requires an auth token".into()))?;
            Builder::new_remote(database_url.to_string(), token)
                .build()
                .await
        } else {
            Builder::new_local(database_url).build().await
        }
        .map_err(|e| StoreError::Connection(e.to_string()))?;

        let database = Arc::new(database);

        let anchor = if is_memory {
            let conn = database.connect().map_err(|e| StoreError::Connection(e.to_string()))?;
            apply_schema(&conn).await?;
            Some(Arc::new(conn))
        } else {
            let conn = database.connect().map_err(|e| StoreError::Connection(e.to_string()))?;
            apply_schema(&conn).await?;
            None
        };

        info!(%database_url, "metadata store connected");

        Ok(Self {
            database,
            _memory_anchor: anchor,
        })
    }

    pub fn connection(&self) -> Result<Connection, StoreError> {
        self.database.connect().map_err(|e| StoreError::Connection(e.to_string()))
    }

    pub fn brands(&self) -> Result<BrandRepository, StoreError> {
        Ok(BrandRepository::new(self.connection()?))
    }

    pub fn topology(&self) -> Result<TopologyRepository, StoreError> {
        Ok(TopologyRepository::new(self.connection()?))
    }

    pub fn tenants(&self) -> Result<TenantRepository, StoreError> {
        Ok(TenantRepository::new(self.connection()?))
    }

    pub fn resources(&self) -> Result<ResourceRepository, StoreError> {
        Ok(ResourceRepository::new(self.connection()?))
    }

    pub fn api_keys(&self) -> Result<ApiKeyRepository, StoreError> {
        Ok(ApiKeyRepository::new(self.connection()?))
    }

    pub fn audit(&self) -> Result<AuditRepository, StoreError> {
        Ok(AuditRepository::new(self.connection()?))
    }

    pub fn health(&self) -> Result<HealthRepository, StoreError> {
        Ok(HealthRepository::new(self.connection()?))
    }

    pub fn workflows(&self) -> Result<WorkflowRepository, StoreError> {
        Ok(WorkflowRepository::new(self.connection()?))
    }
}
