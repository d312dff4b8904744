//! Newtype identifiers for every addressable entity in the control plane.
//!
//! Keeping these as distinct types (rather than passing `Uuid` or `String`
//! around everywhere) makes it a compile error to, say, pass a `ShardId`
//! where a `TenantId` is expected.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! entity_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }
    };
}

entity_id!(BrandId);
entity_id!(RegionId);
entity_id!(ClusterId);
entity_id!(ShardId);
entity_id!(NodeId);
entity_id!(TenantId);
entity_id!(ResourceId);
entity_id!(ApiKeyId);
