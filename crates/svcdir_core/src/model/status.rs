//! Per-language publishing status and its transition table.
//!
//! # Responsibility
//! - Define the authoritative status enum stored per (version, language).
//! - Encode which status changes are legal, independent of storage.
//!
//! # Invariants
//! - `Deleted` is terminal: no transition leaves it.
//! - `OldPublished` is only reachable by demotion from `Published`.
//! - Only `Draft` and `Modified` records accept content edits.

use serde::{Deserialize, Serialize};

/// Authoritative per-language publishing status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishingStatus {
    /// Never published in this language.
    Draft,
    /// Edited copy of content that was published before.
    Modified,
    /// Live for public viewers inside its validity window.
    Published,
    /// Superseded by a newer published version.
    OldPublished,
    /// Soft-retired tombstone.
    Deleted,
}

impl PublishingStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Modified => "modified",
            Self::Published => "published",
            Self::OldPublished => "old_published",
            Self::Deleted => "deleted",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "draft" => Some(Self::Draft),
            "modified" => Some(Self::Modified),
            "published" => Some(Self::Published),
            "old_published" => Some(Self::OldPublished),
            "deleted" => Some(Self::Deleted),
            _ => None,
        }
    }

    /// Whether content of a record in this status may still be changed.
    pub fn is_editable(self) -> bool {
        matches!(self, Self::Draft | Self::Modified)
    }

    pub fn is_terminal(self) -> bool {
        self == Self::Deleted
    }

    /// Whether this status has ever been visible to the public.
    pub fn was_published(self) -> bool {
        matches!(self, Self::Published | Self::OldPublished)
    }

    /// Returns whether `self -> to` is an allowed status change.
    ///
    /// Same-status writes are allowed only for editable states (content
    /// updates and re-scheduling keep the status).
    pub fn can_transition_to(self, to: PublishingStatus) -> bool {
        use PublishingStatus::*;
        match (self, to) {
            (Deleted, _) => false,
            (Draft, Draft) | (Modified, Modified) => true,
            (Draft | Modified, Published) => true,
            (Published, OldPublished) | (Published, Modified) => true,
            (_, Deleted) => true,
            _ => false,
        }
    }
}

/// Status annotation rendered to editors.
///
/// `Scheduled` is not stored; it is derived from an editable status plus a
/// future `valid_from`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayStatus {
    Draft,
    Modified,
    Scheduled,
    Published,
    OldPublished,
    Deleted,
}

impl From<PublishingStatus> for DisplayStatus {
    fn from(value: PublishingStatus) -> Self {
        match value {
            PublishingStatus::Draft => Self::Draft,
            PublishingStatus::Modified => Self::Modified,
            PublishingStatus::Published => Self::Published,
            PublishingStatus::OldPublished => Self::OldPublished,
            PublishingStatus::Deleted => Self::Deleted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::PublishingStatus::{self, *};

    const ALL: [PublishingStatus; 5] = [Draft, Modified, Published, OldPublished, Deleted];

    #[test]
    fn deleted_is_terminal() {
        for to in ALL {
            assert!(!Deleted.can_transition_to(to), "deleted -> {to:?}");
        }
    }

    #[test]
    fn every_live_status_can_be_deleted() {
        for from in [Draft, Modified, Published, OldPublished] {
            assert!(from.can_transition_to(Deleted), "{from:?} -> deleted");
        }
    }

    #[test]
    fn old_published_is_reachable_only_from_published() {
        for from in ALL {
            assert_eq!(from.can_transition_to(OldPublished), from == Published);
        }
    }

    #[test]
    fn publish_requires_editable_source() {
        assert!(Draft.can_transition_to(Published));
        assert!(Modified.can_transition_to(Published));
        assert!(!OldPublished.can_transition_to(Published));
        assert!(!Published.can_transition_to(Draft));
    }

    #[test]
    fn storage_names_roundtrip() {
        for status in ALL {
            assert_eq!(PublishingStatus::parse(status.as_str()), Some(status));
        }
    }
}
