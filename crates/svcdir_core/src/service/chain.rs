//! Shared write steps over one root's version chain.
//!
//! # Invariants
//! - Every helper runs on a connection that is already inside the caller's
//!   transaction or savepoint.
//! - Status changes go through [`change_status`], which enforces the
//!   transition table, bumps `row_stamp` and writes the audit row.

use crate::lookup::LanguageLookup;
use crate::model::availability::LanguageAvailability;
use crate::model::content::{FieldIssue, FieldProblem, LanguageContent, ValidationError};
use crate::model::entity::RootId;
use crate::model::language::LanguageCode;
use crate::model::status::PublishingStatus;
use crate::model::version::{Version, VersionRoot};
use crate::repo::version_repo::{StatusTransitionRecord, VersionRepository};
use crate::service::error::{CoreError, CoreResult};
use crate::service::publishing_service::TransitionEvent;
use rusqlite::{Connection, Transaction, TransactionBehavior};

/// Opens the single writer transaction used by a mutating call.
pub(crate) fn immediate_tx(conn: &Connection) -> CoreResult<Transaction<'_>> {
    Ok(Transaction::new_unchecked(
        conn,
        TransactionBehavior::Immediate,
    )?)
}

/// Opens a read transaction so multi-query reads see one snapshot.
pub(crate) fn read_tx(conn: &Connection) -> CoreResult<Transaction<'_>> {
    Ok(Transaction::new_unchecked(
        conn,
        TransactionBehavior::Deferred,
    )?)
}

/// Who changes what, when and why.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Change<'a> {
    pub actor: &'a str,
    pub at: i64,
    pub reason: &'a str,
}

pub(crate) fn ensure_supported(lookup: &LanguageLookup, language: &LanguageCode) -> CoreResult<()> {
    if lookup.is_supported(language) {
        return Ok(());
    }
    Err(CoreError::Validation(ValidationError::general(vec![
        FieldIssue::new(
            "language",
            FieldProblem::Unsupported {
                value: language.to_string(),
            },
        ),
    ])))
}

/// Head of the chain with only editable languages.
pub(crate) fn version_is_editable<R: VersionRepository + ?Sized>(
    repo: &R,
    version: &Version,
) -> CoreResult<bool> {
    let is_head = repo
        .latest_version(version.root_id)?
        .is_some_and(|latest| latest.version_id == version.version_id);
    if !is_head {
        return Ok(false);
    }
    Ok(repo
        .list_availabilities(version.version_id)?
        .iter()
        .all(|record| record.status.is_editable()))
}

pub(crate) fn ensure_head<R: VersionRepository + ?Sized>(
    repo: &R,
    version: &Version,
) -> CoreResult<()> {
    match repo.latest_version(version.root_id)? {
        Some(latest) if latest.version_id == version.version_id => Ok(()),
        Some(latest) => Err(CoreError::invalid_transition(format!(
            "version {} is superseded by {} ({})",
            version.version_id, latest.version_id, latest.number
        ))),
        None => Err(CoreError::not_found(format!("version {}", version.version_id))),
    }
}

pub(crate) fn load_availability<R: VersionRepository + ?Sized>(
    repo: &R,
    version: &Version,
    language: &LanguageCode,
) -> CoreResult<LanguageAvailability> {
    repo.get_availability(version.version_id, language)?
        .ok_or_else(|| {
            CoreError::not_found(format!(
                "language `{language}` on version {}",
                version.version_id
            ))
        })
}

/// Moves `record` to `to`, guarded by `expected_stamp`.
///
/// `adjust` edits the other fields of the new record before it is written.
pub(crate) fn change_status<R, F>(
    repo: &R,
    root_id: RootId,
    record: &LanguageAvailability,
    to: PublishingStatus,
    expected_stamp: i64,
    change: Change<'_>,
    adjust: F,
) -> CoreResult<(LanguageAvailability, TransitionEvent)>
where
    R: VersionRepository + ?Sized,
    F: FnOnce(&mut LanguageAvailability),
{
    if !record.status.can_transition_to(to) {
        return Err(CoreError::invalid_transition(format!(
            "language `{}` on version {} cannot move from {} to {}",
            record.language,
            record.version_id,
            record.status.as_str(),
            to.as_str()
        )));
    }

    let mut updated = record.clone();
    updated.status = to;
    updated.modified_by = change.actor.to_string();
    updated.modified_at = change.at;
    adjust(&mut updated);
    updated.row_stamp = repo.update_availability(&updated, expected_stamp)?;

    let transition = StatusTransitionRecord {
        version_id: record.version_id,
        language: record.language.clone(),
        from_status: Some(record.status),
        to_status: to,
        actor: change.actor.to_string(),
        at: change.at,
        reason: change.reason.to_string(),
    };
    if record.status != to {
        repo.record_transition(&transition)?;
    }

    Ok((
        updated,
        TransitionEvent {
            root_id,
            transition,
        },
    ))
}

/// Stores `content` for `language` on the chain head.
///
/// Creates the availability when absent (`Modified` when the root already
/// published this language, `Draft` otherwise) and clears any pending
/// schedule on an existing editable record.
pub(crate) fn write_language_content<R: VersionRepository + ?Sized>(
    repo: &R,
    root: &VersionRoot,
    version: &Version,
    language: &LanguageCode,
    content: &LanguageContent,
    change: Change<'_>,
) -> CoreResult<LanguageAvailability> {
    ensure_head(repo, version)?;

    let record = match repo.get_availability(version.version_id, language)? {
        None => {
            let status = if repo.language_ever_published(root.root_id, language)? {
                PublishingStatus::Modified
            } else {
                PublishingStatus::Draft
            };
            let record = LanguageAvailability {
                version_id: version.version_id,
                language: language.clone(),
                status,
                valid_from: None,
                valid_to: None,
                last_reviewed_at: None,
                modified_by: change.actor.to_string(),
                modified_at: change.at,
                row_stamp: 1,
                translation_order_id: None,
            };
            repo.insert_availability(root.root_id, &record)?;
            repo.record_transition(&StatusTransitionRecord {
                version_id: version.version_id,
                language: language.clone(),
                from_status: None,
                to_status: status,
                actor: change.actor.to_string(),
                at: change.at,
                reason: change.reason.to_string(),
            })?;
            record
        }
        Some(existing) if existing.status.is_editable() => {
            let mut updated = existing.clone();
            updated.valid_from = None;
            updated.modified_by = change.actor.to_string();
            updated.modified_at = change.at;
            updated.row_stamp = repo.update_availability(&updated, existing.row_stamp)?;
            updated
        }
        Some(existing) => {
            return Err(CoreError::invalid_transition(format!(
                "language `{language}` on version {} is {}; create a draft version first",
                version.version_id,
                existing.status.as_str()
            )));
        }
    };

    repo.upsert_content(version.version_id, language, content)?;
    repo.touch_version(version.version_id, change.actor, change.at)?;
    Ok(record)
}
