//! Brands, regions, and clusters -- the top of the topology tree.

use super::{id_list_to_json, parse_id_list};
use crate::errors::StoreError;
use hosting_domain::{Brand, BrandId, Cluster, ClusterId, Region, RegionId};
use libsql::{params, Connection};
use tracing::instrument;

pub struct BrandRepository {
    connection: Connection,
}

impl BrandRepository {
    pub fn new(connection: Connection) -> Self {
        Self { connection }
    }

    #[instrument(skip(self, brand))]
    pub async fn create_brand(&self, brand: &Brand) -> Result<(), StoreError> {
        self.connection
            .execute(
                "INSERT INTO brands (id, name, base_hostname, ns1, ns2, hostmaster_email)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    brand.id.to_string(),
                    brand.name.clone(),
                    brand.base_hostname.clone(),
                    brand.ns1.clone(),
                    brand.ns2.clone(),
                    brand.hostmaster_email.clone(),
                ],
            )
            .await
            .map_err(|e| match e {
                libsql::Error::SqliteFailure(_, msg) if msg.contains("UNIQUE") => {
                    StoreError::Conflict(format!("brand name '{}' already in use", brand.name))
                }
                other => StoreError::Query(other),
            })?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn get_brand(&self, id: BrandId) -> Result<Brand, StoreError> {
        let mut rows = self
            .connection
            .query(
                "SELECT id, name, base_hostname, ns1, ns2, hostmaster_email FROM brands WHERE id = ?1",
                params![id.to_string()],
            )
            .await?;

        let row = rows.next().await?.ok_or(StoreError::NotFound)?;
        Self::map_row(row)
    }

    #[instrument(skip(self))]
    pub async fn list_brands(&self) -> Result<Vec<Brand>, StoreError> {
        let mut rows = self
            .connection
            .query(
                "SELECT id, name, base_hostname, ns1, ns2, hostmaster_email FROM brands ORDER BY name",
                (),
            )
            .await?;

        let mut out = Vec::new();
        while let Some(row) = rows.next().await? {
            out.push(Self::map_row(row)?);
        }
        Ok(out)
    }

    #[instrument(skip(self, region))]
    pub async fn create_region(&self, region: &Region) -> Result<(), StoreError> {
        self.connection
            .execute(
                "INSERT INTO regions (id, name) VALUES (?1, ?2)",
                params![region.id.to_string(), region.name.clone()],
            )
            .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn get_region(&self, id: RegionId) -> Result<Region, StoreError> {
        let mut rows = self
            .connection
            .query("SELECT id, name FROM regions WHERE id = ?1", params![id.to_string()])
            .await?;
        let row = rows.next().await?.ok_or(StoreError::NotFound)?;
        Ok(Region {
            id: uuid::Uuid::parse_str(&row.get::<String>(0)?)
                .map_err(|e| StoreError::Mapping(e.to_string()))?
                .into(),
            name: row.get(1)?,
        })
    }

    #[instrument(skip(self))]
    pub async fn list_regions(&self) -> Result<Vec<Region>, StoreError> {
        let mut rows = self.connection.query("SELECT id, name FROM regions ORDER BY name", ()).await?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().await? {
            out.push(Region {
                id: uuid::Uuid::parse_str(&row.get::<String>(0)?)
                    .map_err(|e| StoreError::Mapping(e.to_string()))?
                    .into(),
                name: row.get(1)?,
            });
        }
        Ok(out)
    }

    #[instrument(skip(self, cluster))]
    pub async fn create_cluster(&self, cluster: &Cluster) -> Result<(), StoreError> {
        self.connection
            .execute(
                "INSERT INTO clusters (id, region_id, name, brand_ids) VALUES (?1, ?2, ?3, ?4)",
                params![
                    cluster.id.to_string(),
                    cluster.region_id.to_string(),
                    cluster.name.clone(),
                    id_list_to_json(&cluster.brand_ids),
                ],
            )
            .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn get_cluster(&self, id: ClusterId) -> Result<Cluster, StoreError> {
        let mut rows = self
            .connection
            .query(
                "SELECT id, region_id, name, brand_ids FROM clusters WHERE id = ?1",
                params![id.to_string()],
            )
            .await?;
        let row = rows.next().await?.ok_or(StoreError::NotFound)?;
        Self::map_cluster_row(row)
    }

    #[instrument(skip(self))]
    pub async fn list_clusters_by_region(&self, region_id: RegionId) -> Result<Vec<Cluster>, StoreError> {
        let mut rows = self
            .connection
            .query(
                "SELECT id, region_id, name, brand_ids FROM clusters WHERE region_id = ?1 ORDER BY name",
                params![region_id.to_string()],
            )
            .await?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().await? {
            out.push(Self::map_cluster_row(row)?);
        }
        Ok(out)
    }

    fn map_row(row: libsql::Row) -> Result<Brand, StoreError> {
        Ok(Brand {
            id: uuid::Uuid::parse_str(&row.get::<String>(0)?)
                .map_err(|e| StoreError::Mapping(e.to_string()))?
                .into(),
            name: row.get(1)?,
            base_hostname: row.get(2)?,
            ns1: row.get(3)?,
            ns2: row.get(4)?,
            hostmaster_email: row.get(5)?,
        })
    }

    fn map_cluster_row(row: libsql::Row) -> Result<Cluster, StoreError> {
        let brand_ids_raw: String = row.get(3)?;
        Ok(Cluster {
            id: uuid::Uuid::parse_str(&row.get::<String>(0)?)
                .map_err(|e| StoreError::Mapping(e.to_string()))?
                .into(),
            region_id: uuid::Uuid::parse_str(&row.get::<String>(1)?)
                .map_err(|e| StoreError::Mapping(e.to_string()))?
                .into(),
            name: row.get(2)?,
            brand_ids: parse_id_list(&brand_ids_raw)?,
        })
    }
}
