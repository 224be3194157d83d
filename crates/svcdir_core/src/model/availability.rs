//! Language availability record: status and validity window per language.
//!
//! # Invariants
//! - `row_stamp` increases on every committed write; writers compare it to
//!   detect stale reads.
//! - `valid_to`, when set, is not earlier than `valid_from`.
//! - A scheduled record keeps its editable status until the scheduler
//!   commits it; scheduling is visible only through `valid_from`.

use crate::model::entity::VersionId;
use crate::model::language::LanguageCode;
use crate::model::status::{DisplayStatus, PublishingStatus};
use crate::model::translation::TranslationOrderId;
use serde::{Deserialize, Serialize};

/// Per-version, per-language publishing record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageAvailability {
    pub version_id: VersionId,
    pub language: LanguageCode,
    pub status: PublishingStatus,
    /// Epoch ms. Start of public visibility (or scheduled start).
    pub valid_from: Option<i64>,
    /// Epoch ms. End of public visibility; drives archiving.
    pub valid_to: Option<i64>,
    /// Epoch ms of the last content review, used by the archive policy.
    pub last_reviewed_at: Option<i64>,
    pub modified_by: String,
    /// Epoch ms.
    pub modified_at: i64,
    pub row_stamp: i64,
    /// Weak reference to the latest translation order touching this slice.
    pub translation_order_id: Option<TranslationOrderId>,
}

impl LanguageAvailability {
    /// Editable record waiting for the scheduler to publish it.
    pub fn is_scheduled(&self, now_ms: i64) -> bool {
        self.status.is_editable() && self.valid_from.is_some_and(|from| from > now_ms)
    }

    /// Whether a public viewer may see this record at `now_ms`.
    pub fn is_publicly_visible(&self, now_ms: i64) -> bool {
        self.status == PublishingStatus::Published
            && self.valid_from.map_or(true, |from| from <= now_ms)
            && self.valid_to.map_or(true, |to| now_ms <= to)
    }

    /// Status annotation for editor views.
    pub fn display_status(&self, now_ms: i64) -> DisplayStatus {
        let scheduled = self.valid_from.is_some_and(|from| from > now_ms);
        match self.status {
            PublishingStatus::Draft | PublishingStatus::Modified if scheduled => {
                DisplayStatus::Scheduled
            }
            PublishingStatus::Published if scheduled => DisplayStatus::Scheduled,
            other => other.into(),
        }
    }
}
