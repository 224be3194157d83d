//! Version chain use-cases: roots, draft versions and language content.
//!
//! # Responsibility
//! - Create roots and draft versions, copying a base version forward.
//! - Store validated per-language content on the chain head.
//! - Answer "query language availability" reads.
//!
//! # Invariants
//! - A root has at most one editable version, and it is always the head.
//! - Copied languages never carry a validity window; they must be published
//!   again.
//! - Superseding a version drops its pending schedules.
//! - `Deleted` languages are not copied unless the whole base version is
//!   deleted, which restores them as `Modified`.

use crate::model::availability::LanguageAvailability;
use crate::model::content::LanguageContent;
use crate::model::entity::{EntityKind, RootId, VersionId};
use crate::model::language::LanguageCode;
use crate::model::status::PublishingStatus;
use crate::model::version::{derive_overall_status, Version, VersionNumber, VersionRoot};
use crate::repo::version_repo::{
    require_root, require_version, SqliteVersionRepository, StatusTransitionRecord,
    VersionRepository,
};
use crate::service::chain::{
    ensure_supported, immediate_tx, read_tx, version_is_editable, write_language_content, Change,
};
use crate::service::error::{log_failure, CoreError, CoreResult};
use crate::service::ServiceContext;
use log::info;
use rusqlite::Connection;
use uuid::Uuid;

/// Versioning facade over one connection.
pub struct VersioningService<'conn> {
    conn: &'conn Connection,
    ctx: ServiceContext,
}

impl<'conn> VersioningService<'conn> {
    pub fn new(conn: &'conn Connection, ctx: ServiceContext) -> Self {
        Self { conn, ctx }
    }

    /// Creates a root without versions.
    pub fn create_root(&self, kind: EntityKind, actor: &str) -> CoreResult<RootId> {
        let tx = immediate_tx(self.conn)?;
        let root = VersionRoot {
            root_id: Uuid::new_v4(),
            kind,
            created_by: actor.to_string(),
            created_at: self.ctx.clock.now_ms(),
        };
        SqliteVersionRepository::new(&tx).insert_root(&root)?;
        tx.commit()?;

        info!(
            "event=root_create module=versioning status=ok root_id={} kind={}",
            root.root_id,
            kind.as_str()
        );
        Ok(root.root_id)
    }

    /// Returns the root's editable head, creating a new version when needed.
    ///
    /// `base` defaults to the current head.
    ///
    /// # Errors
    /// - `NotFound` when the root or base version is missing.
    /// - `InvalidTransition` when an editable head exists and a different
    ///   base is requested.
    pub fn create_draft_version(
        &self,
        root_id: RootId,
        base: Option<VersionId>,
        actor: &str,
    ) -> CoreResult<VersionId> {
        let result = self.in_write_tx(|repo| {
            create_draft_in(repo, root_id, base, actor, self.ctx.clock.now_ms())
        });
        if let Err(err) = &result {
            log_failure("version_create", "versioning", err);
        }
        result
    }

    /// Stores `content` for `language` on the head version.
    ///
    /// # Errors
    /// - `Validation` for unsupported languages or content missing mandatory
    ///   fields (every issue is listed).
    /// - `InvalidTransition` when the version is not the head or the language
    ///   is not editable.
    pub fn set_language_content(
        &self,
        version_id: VersionId,
        language: &LanguageCode,
        content: &LanguageContent,
        actor: &str,
    ) -> CoreResult<LanguageAvailability> {
        let result = self.in_write_tx(|repo| {
            let version = require_version(repo, version_id)?;
            self.set_content_in(repo, &version, language, content, actor)
        });
        match &result {
            Ok(record) => info!(
                "event=content_set module=versioning status=ok version_id={version_id} language={language} row_stamp={}",
                record.row_stamp
            ),
            Err(err) => log_failure("content_set", "versioning", err),
        }
        result
    }

    /// Creates or reuses the editable head and stores `content` on it in one
    /// transaction.
    pub fn edit_language_content(
        &self,
        root_id: RootId,
        language: &LanguageCode,
        content: &LanguageContent,
        actor: &str,
    ) -> CoreResult<VersionId> {
        let result = self.in_write_tx(|repo| {
            let version_id = create_draft_in(repo, root_id, None, actor, self.ctx.clock.now_ms())?;
            let version = require_version(repo, version_id)?;
            self.set_content_in(repo, &version, language, content, actor)?;
            Ok(version_id)
        });
        if let Err(err) = &result {
            log_failure("content_edit", "versioning", err);
        }
        result
    }

    pub fn get_root(&self, root_id: RootId) -> CoreResult<VersionRoot> {
        Ok(require_root(&SqliteVersionRepository::new(self.conn), root_id)?)
    }

    pub fn get_version(&self, version_id: VersionId) -> CoreResult<Version> {
        Ok(require_version(
            &SqliteVersionRepository::new(self.conn),
            version_id,
        )?)
    }

    /// Versions of a root in chain order.
    pub fn list_versions(&self, root_id: RootId) -> CoreResult<Vec<Version>> {
        let tx = read_tx(self.conn)?;
        let repo = SqliteVersionRepository::new(&tx);
        require_root(&repo, root_id)?;
        Ok(repo.list_versions(root_id)?)
    }

    /// Status derived from all language statuses of the version.
    pub fn version_status(&self, version_id: VersionId) -> CoreResult<PublishingStatus> {
        let records = self.language_availabilities(version_id)?;
        Ok(derive_overall_status(
            records.iter().map(|record| record.status),
        ))
    }

    pub fn is_editable(&self, version_id: VersionId) -> CoreResult<bool> {
        let tx = read_tx(self.conn)?;
        let repo = SqliteVersionRepository::new(&tx);
        let version = require_version(&repo, version_id)?;
        version_is_editable(&repo, &version)
    }

    pub fn language_availability(
        &self,
        version_id: VersionId,
        language: &LanguageCode,
    ) -> CoreResult<Option<LanguageAvailability>> {
        let repo = SqliteVersionRepository::new(self.conn);
        require_version(&repo, version_id)?;
        Ok(repo.get_availability(version_id, language)?)
    }

    /// Every language record of the version, ordered by language code.
    pub fn language_availabilities(
        &self,
        version_id: VersionId,
    ) -> CoreResult<Vec<LanguageAvailability>> {
        let tx = read_tx(self.conn)?;
        let repo = SqliteVersionRepository::new(&tx);
        require_version(&repo, version_id)?;
        Ok(repo.list_availabilities(version_id)?)
    }

    pub fn language_content(
        &self,
        version_id: VersionId,
        language: &LanguageCode,
    ) -> CoreResult<Option<LanguageContent>> {
        let repo = SqliteVersionRepository::new(self.conn);
        require_version(&repo, version_id)?;
        Ok(repo.get_content(version_id, language)?)
    }

    /// Runs `op` inside one immediate transaction, committing on success.
    fn in_write_tx<T, F>(&self, op: F) -> CoreResult<T>
    where
        F: FnOnce(&SqliteVersionRepository<'_>) -> CoreResult<T>,
    {
        let tx = immediate_tx(self.conn)?;
        let value = op(&SqliteVersionRepository::new(&tx))?;
        tx.commit()?;
        Ok(value)
    }

    fn set_content_in<R: VersionRepository + ?Sized>(
        &self,
        repo: &R,
        version: &Version,
        language: &LanguageCode,
        content: &LanguageContent,
        actor: &str,
    ) -> CoreResult<LanguageAvailability> {
        ensure_supported(&self.ctx.lookup, language)?;
        let root = require_root(repo, version.root_id)?;
        content.validate(language, &self.ctx.config.validation.rules_for(root.kind))?;
        write_language_content(
            repo,
            &root,
            version,
            language,
            content,
            Change {
                actor,
                at: self.ctx.clock.now_ms(),
                reason: "content_edited",
            },
        )
    }
}

fn create_draft_in<R: VersionRepository + ?Sized>(
    repo: &R,
    root_id: RootId,
    base: Option<VersionId>,
    actor: &str,
    now: i64,
) -> CoreResult<VersionId> {
    require_root(repo, root_id)?;

    let base_version = match base {
        Some(base_id) => {
            let version = require_version(repo, base_id)?;
            if version.root_id != root_id {
                return Err(CoreError::not_found(format!(
                    "version {base_id} in root {root_id}"
                )));
            }
            Some(version)
        }
        None => None,
    };

    let Some(latest) = repo.latest_version(root_id)? else {
        let version = new_version(root_id, 1, VersionNumber::FIRST_DRAFT, None, actor, now);
        repo.insert_version(&version)?;
        info!(
            "event=version_create module=versioning status=ok root_id={root_id} version_id={} number={} copied_languages=0",
            version.version_id, version.number
        );
        return Ok(version.version_id);
    };

    let base_version = base_version.unwrap_or_else(|| latest.clone());
    if version_is_editable(repo, &latest)? {
        if base_version.version_id == latest.version_id {
            info!(
                "event=version_create module=versioning status=reused root_id={root_id} version_id={}",
                latest.version_id
            );
            return Ok(latest.version_id);
        }
        return Err(CoreError::invalid_transition(format!(
            "root {root_id} already has editable version {}",
            latest.version_id
        )));
    }

    let version = new_version(
        root_id,
        repo.next_seq(root_id)?,
        latest.number.next_draft(),
        Some(base_version.version_id),
        actor,
        now,
    );
    repo.insert_version(&version)?;
    let cleared = clear_schedules(repo, &latest, actor, now)?;

    let base_records = repo.list_availabilities(base_version.version_id)?;
    let restore = !base_records.is_empty()
        && base_records
            .iter()
            .all(|record| record.status == PublishingStatus::Deleted);
    let base_content = repo.list_content(base_version.version_id)?;

    let mut copied = 0usize;
    for source in &base_records {
        let status = match source.status {
            PublishingStatus::Draft => PublishingStatus::Draft,
            PublishingStatus::Modified
            | PublishingStatus::Published
            | PublishingStatus::OldPublished => PublishingStatus::Modified,
            PublishingStatus::Deleted if restore => PublishingStatus::Modified,
            PublishingStatus::Deleted => continue,
        };

        let record = LanguageAvailability {
            version_id: version.version_id,
            language: source.language.clone(),
            status,
            valid_from: None,
            valid_to: None,
            last_reviewed_at: source.last_reviewed_at,
            modified_by: actor.to_string(),
            modified_at: now,
            row_stamp: 1,
            translation_order_id: None,
        };
        repo.insert_availability(root_id, &record)?;
        if let Some(content) = base_content.get(&source.language) {
            repo.upsert_content(version.version_id, &source.language, content)?;
        }
        repo.record_transition(&StatusTransitionRecord {
            version_id: version.version_id,
            language: source.language.clone(),
            from_status: None,
            to_status: status,
            actor: actor.to_string(),
            at: now,
            reason: if restore {
                "restored_from_base".to_string()
            } else {
                "copied_from_base".to_string()
            },
        })?;
        copied += 1;
    }

    info!(
        "event=version_create module=versioning status=ok root_id={root_id} version_id={} number={} base_version_id={} copied_languages={copied} cleared_schedules={cleared}",
        version.version_id, version.number, base_version.version_id
    );
    Ok(version.version_id)
}

/// Drops the pending schedules of a version that is being superseded.
fn clear_schedules<R: VersionRepository + ?Sized>(
    repo: &R,
    version: &Version,
    actor: &str,
    now: i64,
) -> CoreResult<usize> {
    let mut cleared = 0usize;
    for record in repo.list_availabilities(version.version_id)? {
        if !record.status.is_editable() || record.valid_from.is_none() {
            continue;
        }
        let mut updated = record.clone();
        updated.valid_from = None;
        updated.modified_by = actor.to_string();
        updated.modified_at = now;
        repo.update_availability(&updated, record.row_stamp)?;
        cleared += 1;
    }
    Ok(cleared)
}

fn new_version(
    root_id: RootId,
    seq: i64,
    number: VersionNumber,
    base_version_id: Option<VersionId>,
    actor: &str,
    now: i64,
) -> Version {
    Version {
        version_id: Uuid::new_v4(),
        root_id,
        seq,
        number,
        base_version_id,
        created_by: actor.to_string(),
        created_at: now,
        modified_by: actor.to_string(),
        modified_at: now,
    }
}
