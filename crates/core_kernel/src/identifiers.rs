//! Strongly-typed identifiers for domain entities
//!
//! Using newtype wrappers around UUIDs provides type safety and prevents
//! accidental mixing of different identifier types (a ChargeId can never be
//! passed where a ClaimId is expected).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

macro_rules! define_id {
    ($name:ident, $prefix:literal) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new random identifier
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Creates a new time-ordered identifier (v7)
            pub fn new_v7() -> Self {
                Self(Uuid::now_v7())
            }

            /// Creates from an existing UUID
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the underlying UUID
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }

            /// Returns the identifier prefix for display
            pub fn prefix() -> &'static str {
                $prefix
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}-{}", $prefix, self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                // Strip prefix if present
                let uuid_str = s.strip_prefix(concat!($prefix, "-")).unwrap_or(s);
                Ok(Self(Uuid::parse_str(uuid_str)?))
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Uuid {
                id.0
            }
        }
    };
}

// Coverage domain identifiers
define_id!(ProviderId, "PRV");
define_id!(PlanId, "PLN");
define_id!(RuleId, "RUL");
define_id!(RuleHistoryId, "RULH");
define_id!(ChangeBatchId, "CHB");

// Tariff domain identifiers
define_id!(TariffId, "TRF");
define_id!(MappingId, "MAP");

// Claims domain identifiers
define_id!(ChargeId, "CHG");
define_id!(ClaimId, "CLM");
define_id!(ClaimItemId, "CLMI");
define_id!(BatchId, "BAT");
define_id!(BatchItemId, "BATI");

// Collaborator identifiers (registration and staff are external systems,
// but their keys flow through charges, claims, and audit rows)
define_id!(PatientId, "PAT");
define_id!(VisitId, "VIS");
define_id!(EnrollmentId, "ENR");
define_id!(UserId, "USR");
