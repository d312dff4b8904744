//! API keys and the identity/authorization policy predicates (spec §4.1).

use crate::ids::{ApiKeyId, BrandId};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKey {
    pub id: ApiKeyId,
    pub name: String,
    pub key_hash: String,
    pub scopes: Vec<String>,
    /// Either an explicit brand-id list or `["*"]` for a platform admin.
    pub brands: Vec<String>,
    pub revoked_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Hashes a raw credential with the fixed 32-byte digest used to look up
/// keys. Hex-encoded so it can be compared against the stored `key_hash`
/// column directly.
pub fn hash_credential(raw: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    hex::encode(hasher.finalize())
}

/// The resolved caller identity attached to a request's context.
#[derive(Debug, Clone)]
pub struct Identity {
    pub api_key_id: ApiKeyId,
    pub scopes: Vec<String>,
    pub brands: Vec<String>,
}

impl Identity {
    pub fn has_scope(&self, resource: &str, action: &str) -> bool {
        let wanted = format!("{resource}:{action}");
        self.scopes.iter().any(|s| s == "*:*" || *s == wanted)
    }

    pub fn has_brand_access(&self, brand_id: BrandId) -> bool {
        let wanted = brand_id.to_string();
        self.brands.iter().any(|b| b == "*" || *b == wanted)
    }

    pub fn is_platform_admin(&self) -> bool {
        self.brands.iter().any(|b| b == "*")
    }

    /// The brand filter to apply to a list query: `None` means "no
    /// filter" (platform admin sees everything); `Some(ids)` means
    /// "restrict to these brands". Every list query must consult this --
    /// a missing filter is a security bug (spec §4.1).
    pub fn brand_filter(&self) -> Option<&[String]> {
        if self.is_platform_admin() {
            None
        } else {
            Some(&self.brands)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use uuid::Uuid;

    fn identity_with(brands: Vec<String>) -> Identity {
        Identity { api_key_id: ApiKeyId::new(), scopes: vec!["*:*".to_string()], brands }
    }

    proptest! {
        /// An identity's brand filter never grants access to a brand
        /// outside its own list, and a wildcard identity's filter never
        /// restricts anything -- `has_brand_access` and `brand_filter`
        /// must agree for every brand id, not just ones in the fixture.
        #[test]
        fn brand_filter_matches_has_brand_access(
            owned in prop::collection::vec(any::<u128>(), 0..5),
            probe in any::<u128>(),
        ) {
            let brands: Vec<String> = owned.iter().map(|n| Uuid::from_u128(*n).to_string()).collect();
            let identity = identity_with(brands.clone());
            let probe_id = BrandId::from(Uuid::from_u128(probe));

            match identity.brand_filter() {
                None => prop_assert!(identity.is_platform_admin()),
                Some(filter) => {
                    prop_assert_eq!(filter, brands.as_slice());
                    let in_filter = filter.iter().any(|b| *b == probe_id.to_string());
                    prop_assert_eq!(identity.has_brand_access(probe_id), in_filter);
                }
            }
        }

        #[test]
        fn wildcard_identity_has_access_to_any_brand(probe in any::<u128>()) {
            let identity = identity_with(vec!["*".to_string()]);
            prop_assert!(identity.is_platform_admin());
            prop_assert!(identity.brand_filter().is_none());
            prop_assert!(identity.has_brand_access(BrandId::from(Uuid::from_u128(probe))));
        }
    }
}
