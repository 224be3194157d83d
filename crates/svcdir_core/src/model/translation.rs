//! Translation order model.
//!
//! # Invariants
//! - An order targets one version and at least one target language distinct
//!   from its source language.
//! - The order state is derived from per-language states: it stays open
//!   until every target language resolved to `Delivered` or `Failed`.

use crate::model::entity::VersionId;
use crate::model::language::LanguageCode;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity of one translation order.
pub type TranslationOrderId = Uuid;

/// Lifecycle state shared by orders and their target languages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TranslationState {
    Ordered,
    InProgress,
    Delivered,
    Failed,
}

impl TranslationState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ordered => "ordered",
            Self::InProgress => "in_progress",
            Self::Delivered => "delivered",
            Self::Failed => "failed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "ordered" => Some(Self::Ordered),
            "in_progress" => Some(Self::InProgress),
            "delivered" => Some(Self::Delivered),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    /// Still waiting for the external translation pipeline.
    pub fn is_outstanding(self) -> bool {
        matches!(self, Self::Ordered | Self::InProgress)
    }
}

/// Per-target-language progress of one order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationTarget {
    pub language: LanguageCode,
    pub state: TranslationState,
    pub resolved_at: Option<i64>,
    pub failure_reason: Option<String>,
}

/// Tracked request to translate a version into additional languages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationOrder {
    pub order_id: TranslationOrderId,
    pub version_id: VersionId,
    pub source_language: LanguageCode,
    pub state: TranslationState,
    pub targets: Vec<TranslationTarget>,
    pub ordered_by: String,
    pub ordered_at: i64,
    pub delivered_at: Option<i64>,
}

impl TranslationOrder {
    pub fn target(&self, language: &LanguageCode) -> Option<&TranslationTarget> {
        self.targets.iter().find(|target| &target.language == language)
    }
}

/// Derives the order state from target states.
///
/// `current` is kept while any target is outstanding, except that an
/// `Ordered` order with resolved targets moves to `InProgress`.
pub fn derive_order_state(
    current: TranslationState,
    targets: &[TranslationTarget],
) -> TranslationState {
    let outstanding = targets.iter().filter(|t| t.state.is_outstanding()).count();
    if outstanding == targets.len() {
        return current;
    }
    if outstanding > 0 {
        return TranslationState::InProgress;
    }
    if targets
        .iter()
        .any(|target| target.state == TranslationState::Delivered)
    {
        TranslationState::Delivered
    } else {
        TranslationState::Failed
    }
}
