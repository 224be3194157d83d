//! Version roots and version snapshots.
//!
//! # Invariants
//! - `seq` is strictly increasing per root; the highest `seq` is the head.
//! - Version numbers are unique per root: drafts bump the minor part, the
//!   first publication of a version takes the next major with minor `0`.
//! - The overall status of a version is derived, never stored.

use crate::model::entity::{EntityKind, RootId, VersionId};
use crate::model::status::PublishingStatus;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Identity anchor of one logical entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionRoot {
    pub root_id: RootId,
    pub kind: EntityKind,
    pub created_by: String,
    pub created_at: i64,
}

/// `major.minor` numbering shown to editors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VersionNumber {
    pub major: u32,
    pub minor: u32,
}

impl VersionNumber {
    pub const FIRST_DRAFT: VersionNumber = VersionNumber { major: 0, minor: 1 };

    /// Number of a new draft derived from the current head.
    pub fn next_draft(self) -> Self {
        Self {
            major: self.major,
            minor: self.minor + 1,
        }
    }

    /// Number given to a version on its first publication.
    pub fn published(max_major_in_root: u32) -> Self {
        Self {
            major: max_major_in_root + 1,
            minor: 0,
        }
    }
}

impl Display for VersionNumber {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// One snapshot of a root's content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    pub version_id: VersionId,
    pub root_id: RootId,
    /// 1-based position in the root's version chain.
    pub seq: i64,
    pub number: VersionNumber,
    pub base_version_id: Option<VersionId>,
    pub created_by: String,
    pub created_at: i64,
    pub modified_by: String,
    pub modified_at: i64,
}

/// Derives a version-level status from its per-language statuses.
///
/// Priority: published > modified > draft > old published > deleted. A
/// version without languages counts as draft.
pub fn derive_overall_status<I>(statuses: I) -> PublishingStatus
where
    I: IntoIterator<Item = PublishingStatus>,
{
    let seen = statuses.into_iter().collect::<Vec<_>>();
    if seen.is_empty() {
        return PublishingStatus::Draft;
    }

    [
        PublishingStatus::Published,
        PublishingStatus::Modified,
        PublishingStatus::Draft,
        PublishingStatus::OldPublished,
    ]
    .into_iter()
    .find(|candidate| seen.contains(candidate))
    .unwrap_or(PublishingStatus::Deleted)
}

#[cfg(test)]
mod tests {
    use super::{derive_overall_status, VersionNumber};
    use crate::model::status::PublishingStatus::*;

    #[test]
    fn overall_status_prefers_published_language() {
        assert_eq!(derive_overall_status([Draft, Published, Deleted]), Published);
        assert_eq!(derive_overall_status([OldPublished, Modified]), Modified);
        assert_eq!(derive_overall_status([Deleted, OldPublished]), OldPublished);
        assert_eq!(derive_overall_status([Deleted]), Deleted);
        assert_eq!(derive_overall_status([]), Draft);
    }

    #[test]
    fn numbering_follows_draft_and_publish_rules() {
        let first = VersionNumber::FIRST_DRAFT;
        assert_eq!(first.to_string(), "0.1");
        assert_eq!(first.next_draft().to_string(), "0.2");
        assert_eq!(VersionNumber::published(0).to_string(), "1.0");
        assert_eq!(VersionNumber::published(1).next_draft().to_string(), "2.1");
    }
}
