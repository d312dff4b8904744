//! API keys. Lookup is always by hash -- the raw credential never touches
//! this layer or the store.

use super::{parse_timestamp, string_list_to_json};
use crate::errors::StoreError;
use hosting_domain::{ApiKey, ApiKeyId};
use libsql::{params, Connection, Row};
use tracing::instrument;

pub struct ApiKeyRepository {
    connection: Connection,
}

impl ApiKeyRepository {
    pub fn new(connection: Connection) -> Self {
        Self { connection }
    }

    #[instrument(skip(self, key))]
    pub async fn create(&self, key: &ApiKey) -> Result<(), StoreError> {
        self.connection
            .execute(
                "INSERT INTO api_keys (id, name, key_hash, scopes, brands, revoked_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    key.id.to_string(),
                    key.name.clone(),
                    key.key_hash.clone(),
                    string_list_to_json(&key.scopes),
                    string_list_to_json(&key.brands),
                    key.revoked_at.map(|t| t.to_rfc3339()),
                ],
            )
            .await
            .map_err(|e| match e {
                libsql::Error::SqliteFailure(_, msg) if msg.contains("UNIQUE") => {
                    StoreError::Conflict("key hash collision".to_string())
                }
                other => StoreError::Query(other),
            })?;
        Ok(())
    }

    /// Looks up a non-revoked key by its hashed credential. Callers pass
    /// `hash_credential(raw)`, never the raw secret.
    #[instrument(skip(self, key_hash))]
    pub async fn find_by_hash(&self, key_hash: &str) -> Result<ApiKey, StoreError> {
        let mut rows = self
            .connection
            .query(
                &format!("SELECT {COLUMNS} FROM api_keys WHERE key_hash = ?1 AND revoked_at IS NULL"),
                params![key_hash.to_string()],
            )
            .await?;
        let row = rows.next().await?.ok_or(StoreError::NotFound)?;
        Self::map_row(row)
    }

    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<ApiKey>, StoreError> {
        let mut rows = self.connection.query(&format!("SELECT {COLUMNS} FROM api_keys ORDER BY name"), ()).await?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().await? {
            out.push(Self::map_row(row)?);
        }
        Ok(out)
    }

    #[instrument(skip(self))]
    pub async fn revoke(&self, id: ApiKeyId) -> Result<(), StoreError> {
        let affected = self
            .connection
            .execute(
                "UPDATE api_keys SET revoked_at = ?1 WHERE id = ?2 AND revoked_at IS NULL",
                params![chrono::Utc::now().to_rfc3339(), id.to_string()],
            )
            .await?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    fn map_row(row: Row) -> Result<ApiKey, StoreError> {
        let scopes_raw: String = row.get(3)?;
        let brands_raw: String = row.get(4)?;
        let revoked_at: Option<String> = row.get(5)?;
        Ok(ApiKey {
            id: uuid::Uuid::parse_str(&row.get::<String>(0)?)
                .map_err(|e| StoreError::Mapping(e.to_string()))?
                .into(),
            name: row.get(1)?,
            key_hash: row.get(2)?,
            scopes: super::parse_string_list(&scopes_raw)?,
            brands: super::parse_string_list(&brands_raw)?,
            revoked_at: revoked_at.map(|raw| parse_timestamp(&raw)).transpose()?,
        })
    }
}

const COLUMNS: &str = "id, name, key_hash, scopes, brands, revoked_at";
