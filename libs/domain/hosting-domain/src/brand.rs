//! Brand: the top-level ownership boundary for multi-white-label
//! deployments. Every tenant belongs to exactly one brand.

use crate::ids::BrandId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Brand {
    pub id: BrandId,
    pub name: String,
    pub base_hostname: String,
    pub ns1: String,
    pub ns2: String,
    pub hostmaster_email: String,
}
