//! Version selection for viewers.
//!
//! # Responsibility
//! - Pick the version of one (root, language) a given viewer should see.
//!
//! # Invariants
//! - Public viewers only see `Published` records inside their validity
//!   window (bounds inclusive).
//! - Editors see the newest non-deleted record, scheduled ones included.
//! - Selection never writes.

use crate::model::availability::LanguageAvailability;
use crate::model::content::LanguageContent;
use crate::model::entity::{RootId, VersionId};
use crate::model::language::LanguageCode;
use crate::model::status::{DisplayStatus, PublishingStatus};
use crate::model::version::VersionNumber;
use crate::repo::version_repo::{
    require_root, require_version, ChainEntry, SqliteVersionRepository, VersionRepository,
};
use crate::service::chain::read_tx;
use crate::service::error::CoreResult;
use crate::service::ServiceContext;
use log::{debug, warn};
use rusqlite::Connection;
use serde::Serialize;

/// Who is asking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewerContext {
    Public,
    Editor,
}

/// Version picked for a viewer, with its content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedVersion {
    pub root_id: RootId,
    pub version_id: VersionId,
    pub seq: i64,
    pub number: VersionNumber,
    pub language: LanguageCode,
    pub status: PublishingStatus,
    pub display_status: DisplayStatus,
    pub valid_from: Option<i64>,
    pub valid_to: Option<i64>,
    pub row_stamp: i64,
    pub content: LanguageContent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum Resolution {
    Available(ResolvedVersion),
    NotAvailable,
}

impl Resolution {
    pub fn available(&self) -> Option<&ResolvedVersion> {
        match self {
            Self::Available(resolved) => Some(resolved),
            Self::NotAvailable => None,
        }
    }
}

pub struct SelectionService<'conn> {
    conn: &'conn Connection,
    ctx: ServiceContext,
}

impl<'conn> SelectionService<'conn> {
    pub fn new(conn: &'conn Connection, ctx: ServiceContext) -> Self {
        Self { conn, ctx }
    }

    /// Resolves what `viewer` sees for `language` of `root_id` right now.
    ///
    /// # Errors
    /// - `NotFound` when the root does not exist.
    pub fn resolve_for_viewer(
        &self,
        root_id: RootId,
        language: &LanguageCode,
        viewer: ViewerContext,
    ) -> CoreResult<Resolution> {
        let now = self.ctx.clock.now_ms();
        let tx = read_tx(self.conn)?;
        let repo = SqliteVersionRepository::new(&tx);
        require_root(&repo, root_id)?;

        if !self.ctx.lookup.is_supported(language) {
            return Ok(Resolution::NotAvailable);
        }

        let chain = repo.list_chain(root_id, language)?;
        let picked = match viewer {
            ViewerContext::Public => pick_public(root_id, language, &chain, now),
            ViewerContext::Editor => chain
                .iter()
                .rev()
                .find(|entry| entry.availability.status != PublishingStatus::Deleted),
        };
        let Some(entry) = picked else {
            debug!(
                "event=resolve module=selection status=not_available root_id={root_id} language={language} viewer={viewer:?}"
            );
            return Ok(Resolution::NotAvailable);
        };

        let record = &entry.availability;
        let version = require_version(&repo, record.version_id)?;
        let content = repo
            .get_content(record.version_id, language)?
            .unwrap_or_default();
        Ok(Resolution::Available(resolved(
            root_id, entry.seq, version.number, record, now, content,
        )))
    }
}

/// Publicly visible record; anomalies with several candidates prefer the
/// latest `modified_at`, then the highest `seq`.
fn pick_public<'a>(
    root_id: RootId,
    language: &LanguageCode,
    chain: &'a [ChainEntry],
    now: i64,
) -> Option<&'a ChainEntry> {
    let candidates = chain
        .iter()
        .filter(|entry| entry.availability.is_publicly_visible(now))
        .collect::<Vec<_>>();
    if candidates.len() > 1 {
        warn!(
            "event=resolve_anomaly module=selection status=inconsistent root_id={root_id} language={language} candidates={}",
            candidates.len()
        );
    }
    candidates
        .into_iter()
        .max_by_key(|entry| (entry.availability.modified_at, entry.seq))
}

fn resolved(
    root_id: RootId,
    seq: i64,
    number: VersionNumber,
    record: &LanguageAvailability,
    now: i64,
    content: LanguageContent,
) -> ResolvedVersion {
    ResolvedVersion {
        root_id,
        version_id: record.version_id,
        seq,
        number,
        language: record.language.clone(),
        status: record.status,
        display_status: record.display_status(now),
        valid_from: record.valid_from,
        valid_to: record.valid_to,
        row_stamp: record.row_stamp,
        content,
    }
}

#[cfg(test)]
mod tests {
    use super::pick_public;
    use crate::model::availability::LanguageAvailability;
    use crate::model::language::LanguageCode;
    use crate::model::status::PublishingStatus;
    use crate::repo::version_repo::ChainEntry;
    use uuid::Uuid;

    fn entry(seq: i64, status: PublishingStatus, modified_at: i64) -> ChainEntry {
        ChainEntry {
            seq,
            availability: LanguageAvailability {
                version_id: Uuid::new_v4(),
                language: LanguageCode::parse("fi").unwrap(),
                status,
                valid_from: Some(0),
                valid_to: None,
                last_reviewed_at: None,
                modified_by: "editor".to_string(),
                modified_at,
                row_stamp: 1,
                translation_order_id: None,
            },
        }
    }

    #[test]
    fn anomaly_prefers_most_recent_modification() {
        let chain = vec![
            entry(1, PublishingStatus::Published, 50),
            entry(2, PublishingStatus::Published, 10),
            entry(3, PublishingStatus::Modified, 90),
        ];
        let fi = LanguageCode::parse("fi").unwrap();
        let picked = pick_public(Uuid::new_v4(), &fi, &chain, 100).unwrap();
        assert_eq!(picked.seq, 1);
    }

    #[test]
    fn equal_modification_falls_back_to_highest_seq() {
        let chain = vec![
            entry(1, PublishingStatus::Published, 10),
            entry(2, PublishingStatus::Published, 10),
        ];
        let fi = LanguageCode::parse("fi").unwrap();
        let picked = pick_public(Uuid::new_v4(), &fi, &chain, 100).unwrap();
        assert_eq!(picked.seq, 2);
    }

    #[test]
    fn nothing_public_yields_none() {
        let chain = vec![entry(1, PublishingStatus::OldPublished, 10)];
        let fi = LanguageCode::parse("fi").unwrap();
        assert!(pick_public(Uuid::new_v4(), &fi, &chain, 100).is_none());
    }
}
