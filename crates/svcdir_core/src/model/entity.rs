//! Entity identities and the entity-kind lookup table.
//!
//! # Invariants
//! - `RootId` is stable for the lifetime of one logical entity.
//! - `VersionId` identifies exactly one snapshot under one root.
//! - Nil UUIDs are never valid identifiers.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identity shared by every version of one logical entity.
pub type RootId = Uuid;

/// Identity of one version snapshot.
pub type VersionId = Uuid;

/// Content entity families that share the versioning model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Service,
    #[serde(rename = "channel")]
    ServiceChannel,
    Organization,
    GeneralDescription,
}

impl EntityKind {
    /// All known kinds in stable order.
    pub const ALL: [EntityKind; 4] = [
        EntityKind::Service,
        EntityKind::ServiceChannel,
        EntityKind::Organization,
        EntityKind::GeneralDescription,
    ];

    /// Stable storage/wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Service => "service",
            Self::ServiceChannel => "channel",
            Self::Organization => "organization",
            Self::GeneralDescription => "general_description",
        }
    }

    /// Parses a storage/wire name.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "service" => Some(Self::Service),
            "channel" => Some(Self::ServiceChannel),
            "organization" => Some(Self::Organization),
            "general_description" => Some(Self::GeneralDescription),
            _ => None,
        }
    }
}
