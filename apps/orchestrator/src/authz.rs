//! The two policy checks every mutating handler applies (spec §4.1):
//! scope, then brand ownership. A scope failure is `403` -- the caller
//! is known and definitely lacks permission. A brand-ownership failure
//! is `404` instead: per the brand-isolation scenario in spec §7/§8, a
//! resource outside the caller's brands must be indistinguishable from
//! one that doesn't exist at all.

use crate::error::ApiError;
use hosting_domain::{BrandId, Identity, OrchestrationError};

pub fn require_scope(identity: &Identity, resource: &str, action: &str) -> Result<(), ApiError> {
    if identity.has_scope(resource, action) {
        Ok(())
    } else {
        Err(OrchestrationError::AuthnAuthz.into())
    }
}

/// A brand-access failure surfaces as `NotFound`, not `403` -- per spec
/// §7/§8's brand-isolation scenario, a resource outside the caller's
/// brands must be indistinguishable from one that doesn't exist.
pub fn require_brand_access(identity: &Identity, brand_id: BrandId) -> Result<(), ApiError> {
    if identity.has_brand_access(brand_id) {
        Ok(())
    } else {
        Err(OrchestrationError::NotFound.into())
    }
}
