//! Brands, regions, and clusters -- the platform-admin-only topology root.
//! `brand:*` scopes are only ever granted to platform-admin keys in
//! practice, but the check here is the same `has_scope` every other
//! handler uses.

use crate::authz::require_scope;
use crate::error::ApiResult;
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::{Extension, Json};
use hosting_domain::{Brand, BrandId, Cluster, ClusterId, Identity, Region, RegionId};
use serde::Deserialize;

#[derive(Deserialize)]
pub struct CreateBrandBody {
    pub name: String,
    pub base_hostname: String,
    pub ns1: String,
    pub ns2: String,
    pub hostmaster_email: String,
}

pub async fn list_brands(State(state): State<AppState>, Extension(identity): Extension<Identity>) -> ApiResult<Json<Vec<Brand>>> {
    require_scope(&identity, "brand", "read")?;
    let brands = state.store.brands()?.list_brands().await?;
    Ok(Json(brands))
}

pub async fn create_brand(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(body): Json<CreateBrandBody>,
) -> ApiResult<Json<Brand>> {
    require_scope(&identity, "brand", "write")?;
    let brand = Brand {
        id: BrandId::new(),
        name: body.name,
        base_hostname: body.base_hostname,
        ns1: body.ns1,
        ns2: body.ns2,
        hostmaster_email: body.hostmaster_email,
    };
    state.store.brands()?.create_brand(&brand).await?;
    Ok(Json(brand))
}

#[derive(Deserialize)]
pub struct CreateRegionBody {
    pub name: String,
}

pub async fn list_regions(State(state): State<AppState>, Extension(identity): Extension<Identity>) -> ApiResult<Json<Vec<Region>>> {
    require_scope(&identity, "region", "read")?;
    Ok(Json(state.store.brands()?.list_regions().await?))
}

pub async fn create_region(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(body): Json<CreateRegionBody>,
) -> ApiResult<Json<Region>> {
    require_scope(&identity, "region", "write")?;
    let region = Region { id: RegionId::new(), name: body.name };
    state.store.brands()?.create_region(&region).await?;
    Ok(Json(region))
}

#[derive(Deserialize)]
pub struct CreateClusterBody {
    pub region_id: RegionId,
    pub name: String,
    pub brand_ids: Vec<BrandId>,
}

pub async fn list_clusters_by_region(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(region_id): Path<RegionId>,
) -> ApiResult<Json<Vec<Cluster>>> {
    require_scope(&identity, "cluster", "read")?;
    Ok(Json(state.store.brands()?.list_clusters_by_region(region_id).await?))
}

pub async fn create_cluster(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(body): Json<CreateClusterBody>,
) -> ApiResult<Json<Cluster>> {
    require_scope(&identity, "cluster", "write")?;
    let cluster = Cluster { id: ClusterId::new(), region_id: body.region_id, name: body.name, brand_ids: body.brand_ids };
    state.store.brands()?.create_cluster(&cluster).await?;
    Ok(Json(cluster))
}
