//! # Identifier Newtypes
//!
//! Newtype wrappers for every identifier namespace the engine touches.
//! You cannot pass a `DeviceId` where a `ProviderId` is expected, which
//! matters because devices, providers, policies, rules and geographies are
//! all UUIDs on the wire.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! uuid_identifier {
    ($(#[$meta:meta])* $ty:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $ty(Uuid);

        impl $ty {
            /// Create a new random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Create an identifier from an existing UUID.
            pub fn from_uuid(id: Uuid) -> Self {
                Self(id)
            }

            /// Access the underlying UUID.
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $ty {
            fn default() -> Self {
                Self::new()
            }
        }

        impl From<Uuid> for $ty {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $ty {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::from_str(s).map(Self)
            }
        }
    };
}

uuid_identifier!(
    /// Identifier of a regulatory policy.
    PolicyId
);

uuid_identifier!(
    /// Identifier of a single rule inside a policy.
    RuleId
);

uuid_identifier!(
    /// Identifier of a published geography.
    GeographyId
);

uuid_identifier!(
    /// Identifier of a vehicle.
    DeviceId
);

uuid_identifier!(
    /// Identifier of a mobility provider (operator).
    ProviderId
);

uuid_identifier!(
    /// Identifier of one compliance snapshot.
    SnapshotId
);

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn new_ids_are_distinct() {
        assert_ne!(DeviceId::new(), DeviceId::new());
    }

    #[test]
    fn display_and_parse_agree() {
        let id = PolicyId::new();
        let parsed = PolicyId::from_str(&id.to_string()).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(ProviderId::from_str("not-a-uuid").is_err());
    }

    #[test]
    fn serializes_as_bare_uuid_string() {
        let uuid = Uuid::parse_str("3c9604d6-b5ee-11e8-96f8-529269fb1459").unwrap();
        let id = GeographyId::from_uuid(uuid);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"3c9604d6-b5ee-11e8-96f8-529269fb1459\"");
        let back: GeographyId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
