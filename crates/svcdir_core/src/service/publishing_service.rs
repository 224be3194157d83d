//! Publishing state machine.
//!
//! # Responsibility
//! - Move language availabilities between publishing states on request and
//!   from the periodic scheduler/archive jobs.
//! - Report per-language outcomes for batch requests.
//! - Announce committed status changes to registered observers.
//!
//! # Invariants
//! - At most one `Published` record per (root, language) at any commit; the
//!   previous one is demoted to `OldPublished` in the same transaction.
//! - Each language of a batch runs in its own savepoint: a failing language
//!   never undoes a succeeding one.
//! - A caller-supplied stamp that differs from storage fails with
//!   `ConcurrencyConflict` before anything else is evaluated.
//! - Republishing an already published record is a no-op.
//! - Only the chain head publishes; a superseded version never demotes a
//!   newer publication.

use crate::lookup::LanguageLookup;
use crate::model::availability::LanguageAvailability;
use crate::model::content::{FieldIssue, FieldProblem, FieldRules, ValidationError};
use crate::model::entity::{RootId, VersionId};
use crate::model::language::LanguageCode;
use crate::model::status::PublishingStatus;
use crate::model::version::{Version, VersionNumber, VersionRoot};
use crate::repo::translation_repo::{SqliteTranslationRepository, TranslationRepository};
use crate::repo::version_repo::{
    require_root, require_version, SqliteVersionRepository, StatusTransitionRecord,
    VersionRepository,
};
use crate::service::chain::{
    change_status, ensure_head, ensure_supported, immediate_tx, load_availability, read_tx,
    Change,
};
use crate::service::error::{log_failure, CoreError, CoreResult, ErrorKind};
use crate::service::ServiceContext;
use log::{error, info, warn};
use rusqlite::{Connection, Transaction};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Actor recorded for changes made by the periodic jobs.
pub const SYSTEM_ACTOR: &str = "system";

/// One committed status change, as announced to observers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransitionEvent {
    pub root_id: RootId,
    pub transition: StatusTransitionRecord,
}

/// Read-only consumer of committed status changes (search indexing,
/// notification feeds).
pub trait TransitionObserver: Send + Sync {
    fn on_transition(&self, event: &TransitionEvent);
}

/// Input of [`PublishingService::request_publish`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishRequest {
    pub version_id: VersionId,
    pub languages: Vec<LanguageCode>,
    /// Epoch ms. A future value schedules instead of publishing now.
    pub scheduled_at: Option<i64>,
    /// Stamps the caller read; a mismatch is a concurrency conflict.
    pub expected_stamps: BTreeMap<LanguageCode, i64>,
    pub override_translation_gate: bool,
    pub actor: String,
}

impl PublishRequest {
    pub fn new(
        version_id: VersionId,
        languages: Vec<LanguageCode>,
        actor: impl Into<String>,
    ) -> Self {
        Self {
            version_id,
            languages,
            scheduled_at: None,
            expected_stamps: BTreeMap::new(),
            override_translation_gate: false,
            actor: actor.into(),
        }
    }

    pub fn schedule_at(mut self, at: i64) -> Self {
        self.scheduled_at = Some(at);
        self
    }

    pub fn expect_stamp(mut self, language: LanguageCode, stamp: i64) -> Self {
        self.expected_stamps.insert(language, stamp);
        self
    }

    pub fn with_gate_override(mut self) -> Self {
        self.override_translation_gate = true;
        self
    }
}

/// Result for one language of a batch.
#[derive(Debug)]
pub enum LanguageOutcome {
    Published {
        valid_from: i64,
        row_stamp: i64,
        /// Version whose record was demoted to `OldPublished`.
        demoted: Option<VersionId>,
    },
    Scheduled {
        valid_from: i64,
        row_stamp: i64,
    },
    Deleted {
        row_stamp: i64,
    },
    Unchanged,
    Failed(CoreError),
}

#[derive(Debug)]
pub struct LanguageResult {
    pub language: LanguageCode,
    pub outcome: LanguageOutcome,
}

/// Per-language report of a batch transition.
#[derive(Debug)]
pub struct TransitionResult {
    pub version_id: VersionId,
    /// In request order.
    pub languages: Vec<LanguageResult>,
}

impl TransitionResult {
    /// True when no language failed.
    pub fn success(&self) -> bool {
        self.failures().is_empty()
    }

    pub fn outcome(&self, language: &LanguageCode) -> Option<&LanguageOutcome> {
        self.languages
            .iter()
            .find(|result| &result.language == language)
            .map(|result| &result.outcome)
    }

    pub fn failures(&self) -> Vec<(&LanguageCode, &CoreError)> {
        self.languages
            .iter()
            .filter_map(|result| match &result.outcome {
                LanguageOutcome::Failed(err) => Some((&result.language, err)),
                _ => None,
            })
            .collect()
    }

    /// Languages that failed because of a stale read.
    pub fn conflicts(&self) -> Vec<&LanguageCode> {
        self.failures()
            .into_iter()
            .filter(|(_, err)| err.kind() == ErrorKind::ConcurrencyConflict)
            .map(|(language, _)| language)
            .collect()
    }

    pub fn validation_errors(&self) -> Vec<&ValidationError> {
        self.failures()
            .into_iter()
            .filter_map(|(_, err)| match err {
                CoreError::Validation(validation) => Some(validation),
                _ => None,
            })
            .collect()
    }
}

/// Record handled by a periodic job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobItem {
    pub version_id: VersionId,
    pub language: LanguageCode,
    pub status: PublishingStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobFailure {
    pub version_id: VersionId,
    pub language: LanguageCode,
    pub kind: ErrorKind,
    pub message: String,
}

/// Summary of one periodic job run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobReport {
    pub job: &'static str,
    pub now: i64,
    pub committed: Vec<JobItem>,
    pub failed: Vec<JobFailure>,
}

impl JobReport {
    fn new(job: &'static str, now: i64) -> Self {
        Self {
            job,
            now,
            committed: Vec::new(),
            failed: Vec::new(),
        }
    }

    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    fn record_failure(&mut self, record: &LanguageAvailability, err: &CoreError) {
        error!(
            "event={} module=publishing status=error version_id={} language={} kind={} error={}",
            self.job,
            record.version_id,
            record.language,
            err.kind().as_str(),
            err
        );
        self.failed.push(JobFailure {
            version_id: record.version_id,
            language: record.language.clone(),
            kind: err.kind(),
            message: err.to_string(),
        });
    }
}

/// Publishing facade over one connection.
pub struct PublishingService<'conn> {
    conn: &'conn Connection,
    ctx: ServiceContext,
    observers: Vec<Arc<dyn TransitionObserver>>,
}

impl<'conn> PublishingService<'conn> {
    pub fn new(conn: &'conn Connection, ctx: ServiceContext) -> Self {
        Self {
            conn,
            ctx,
            observers: Vec::new(),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn TransitionObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Publishes or schedules the requested languages of one version.
    ///
    /// # Errors
    /// - `Validation` when the language list is empty or repeats a language.
    /// - `NotFound` when the version does not exist.
    /// - Per-language failures are reported inside [`TransitionResult`].
    pub fn request_publish(&self, request: &PublishRequest) -> CoreResult<TransitionResult> {
        check_language_list(&request.languages)?;

        let now = self.ctx.clock.now_ms();
        let mut tx = immediate_tx(self.conn)?;
        let (root, version) = load_version_and_root(&tx, request.version_id)?;
        let rules = self.ctx.config.validation.rules_for(root.kind);

        let mut events = Vec::new();
        let mut results = Vec::with_capacity(request.languages.len());
        for language in &request.languages {
            let step = PublishStep {
                scheduled_at: request.scheduled_at,
                expected_stamp: request.expected_stamps.get(language).copied(),
                override_gate: request.override_translation_gate,
                change: Change {
                    actor: &request.actor,
                    at: now,
                    reason: "publish_requested",
                },
            };
            let outcome = in_savepoint(&mut tx, &mut events, |conn, events| {
                publish_language(
                    conn,
                    &self.ctx.lookup,
                    &rules,
                    &root,
                    &version,
                    language,
                    &step,
                    events,
                )
            });
            results.push(LanguageResult {
                language: language.clone(),
                outcome: log_outcome("publish", version.version_id, language, outcome),
            });
        }
        tx.commit()?;
        self.notify(&events);

        Ok(TransitionResult {
            version_id: version.version_id,
            languages: results,
        })
    }

    /// Commits every scheduled record whose `valid_from` is at or before `now`.
    ///
    /// Safe to run repeatedly: committed records are no longer due.
    pub fn commit_due_schedules(&self, now: i64) -> CoreResult<JobReport> {
        let mut tx = immediate_tx(self.conn)?;
        let due = SqliteVersionRepository::new(&tx).list_due_schedules(now)?;

        let mut report = JobReport::new("schedule_commit", now);
        let mut events = Vec::new();
        for record in &due {
            let outcome = in_savepoint(&mut tx, &mut events, |conn, events| {
                let (root, version) = load_version_and_root(conn, record.version_id)?;
                let rules = self.ctx.config.validation.rules_for(root.kind);
                let step = PublishStep {
                    scheduled_at: record.valid_from,
                    expected_stamp: Some(record.row_stamp),
                    override_gate: false,
                    change: Change {
                        actor: SYSTEM_ACTOR,
                        at: now,
                        reason: "scheduled_publish",
                    },
                };
                publish_language(
                    conn,
                    &self.ctx.lookup,
                    &rules,
                    &root,
                    &version,
                    &record.language,
                    &step,
                    events,
                )
            });
            match outcome {
                Ok(LanguageOutcome::Published { .. }) => report.committed.push(JobItem {
                    version_id: record.version_id,
                    language: record.language.clone(),
                    status: PublishingStatus::Published,
                }),
                Ok(_) => {}
                Err(err) => report.record_failure(record, &err),
            }
        }
        tx.commit()?;
        self.notify(&events);

        info!(
            "event=schedule_commit module=publishing status={} now={now} due={} committed={} failed={}",
            if report.is_clean() { "ok" } else { "partial" },
            due.len(),
            report.committed.len(),
            report.failed.len()
        );
        Ok(report)
    }

    /// Deletes published/old-published records whose validity ended and
    /// that were not reviewed within the configured window.
    pub fn archive_expired(&self, now: i64) -> CoreResult<JobReport> {
        let reviewed_before = now.saturating_sub(self.ctx.config.publishing.review_window_ms());
        let mut tx = immediate_tx(self.conn)?;
        let candidates =
            SqliteVersionRepository::new(&tx).list_archive_candidates(now, reviewed_before)?;

        let mut report = JobReport::new("archive_sweep", now);
        let mut events = Vec::new();
        for record in &candidates {
            let outcome = in_savepoint(&mut tx, &mut events, |conn, events| {
                let repo = SqliteVersionRepository::new(conn);
                let version = require_version(&repo, record.version_id)?;
                let (_, event) = change_status(
                    &repo,
                    version.root_id,
                    record,
                    PublishingStatus::Deleted,
                    record.row_stamp,
                    Change {
                        actor: SYSTEM_ACTOR,
                        at: now,
                        reason: "archived",
                    },
                    |_| {},
                )?;
                events.push(event);
                Ok(())
            });
            match outcome {
                Ok(()) => report.committed.push(JobItem {
                    version_id: record.version_id,
                    language: record.language.clone(),
                    status: PublishingStatus::Deleted,
                }),
                Err(err) => report.record_failure(record, &err),
            }
        }
        tx.commit()?;
        self.notify(&events);

        info!(
            "event=archive_sweep module=publishing status={} now={now} candidates={} archived={} failed={}",
            if report.is_clean() { "ok" } else { "partial" },
            candidates.len(),
            report.committed.len(),
            report.failed.len()
        );
        Ok(report)
    }

    /// Takes a published language offline for editing (`Published -> Modified`).
    ///
    /// # Errors
    /// - `InvalidTransition` when the record is not published or a newer
    ///   version already carries the language.
    pub fn withdraw(
        &self,
        version_id: VersionId,
        language: &LanguageCode,
        expected_stamp: Option<i64>,
        actor: &str,
    ) -> CoreResult<LanguageAvailability> {
        let now = self.ctx.clock.now_ms();
        let result = self.single_change(|repo, events| {
            let version = require_version(repo, version_id)?;
            let record = load_availability(repo, &version, language)?;
            check_stamp(&record, expected_stamp)?;
            if record.status != PublishingStatus::Published {
                return Err(CoreError::invalid_transition(format!(
                    "language `{language}` on version {version_id} is {}, not published",
                    record.status.as_str()
                )));
            }
            let newer = repo
                .list_chain(version.root_id, language)?
                .into_iter()
                .find(|entry| {
                    entry.seq > version.seq
                        && entry.availability.status != PublishingStatus::Deleted
                });
            if let Some(entry) = newer {
                return Err(CoreError::invalid_transition(format!(
                    "version {} already carries `{language}`",
                    entry.availability.version_id
                )));
            }

            let (updated, event) = change_status(
                repo,
                version.root_id,
                &record,
                PublishingStatus::Modified,
                record.row_stamp,
                Change {
                    actor,
                    at: now,
                    reason: "withdrawn",
                },
                |updated| updated.valid_from = None,
            )?;
            events.push(event);
            Ok(updated)
        });
        log_single("withdraw", version_id, language, &result);
        result
    }

    /// Deletes the given languages of a version.
    pub fn delete_languages(
        &self,
        version_id: VersionId,
        languages: &[LanguageCode],
        actor: &str,
    ) -> CoreResult<TransitionResult> {
        check_language_list(languages)?;

        let now = self.ctx.clock.now_ms();
        let mut tx = immediate_tx(self.conn)?;
        let (root, version) = load_version_and_root(&tx, version_id)?;

        let mut events = Vec::new();
        let mut results = Vec::with_capacity(languages.len());
        for language in languages {
            let outcome = in_savepoint(&mut tx, &mut events, |conn, events| {
                let repo = SqliteVersionRepository::new(conn);
                let record = load_availability(&repo, &version, language)?;
                if record.status == PublishingStatus::Deleted {
                    return Ok(LanguageOutcome::Unchanged);
                }
                let (updated, event) = change_status(
                    &repo,
                    root.root_id,
                    &record,
                    PublishingStatus::Deleted,
                    record.row_stamp,
                    Change {
                        actor,
                        at: now,
                        reason: "deleted",
                    },
                    |_| {},
                )?;
                events.push(event);
                Ok(LanguageOutcome::Deleted {
                    row_stamp: updated.row_stamp,
                })
            });
            results.push(LanguageResult {
                language: language.clone(),
                outcome: log_outcome("delete", version_id, language, outcome),
            });
        }
        tx.commit()?;
        self.notify(&events);

        Ok(TransitionResult {
            version_id,
            languages: results,
        })
    }

    /// Deletes every language of a version.
    pub fn delete_version(
        &self,
        version_id: VersionId,
        actor: &str,
    ) -> CoreResult<TransitionResult> {
        let languages = {
            let tx = read_tx(self.conn)?;
            let repo = SqliteVersionRepository::new(&tx);
            require_version(&repo, version_id)?;
            repo.list_availabilities(version_id)?
                .into_iter()
                .map(|record| record.language)
                .collect::<Vec<_>>()
        };
        if languages.is_empty() {
            return Ok(TransitionResult {
                version_id,
                languages: Vec::new(),
            });
        }
        self.delete_languages(version_id, &languages, actor)
    }

    /// Sets or clears the end of the validity window.
    pub fn set_validity_end(
        &self,
        version_id: VersionId,
        language: &LanguageCode,
        valid_to: Option<i64>,
        expected_stamp: Option<i64>,
        actor: &str,
    ) -> CoreResult<LanguageAvailability> {
        let now = self.ctx.clock.now_ms();
        let result = self.single_change(|repo, _| {
            let version = require_version(repo, version_id)?;
            let record = load_availability(repo, &version, language)?;
            check_stamp(&record, expected_stamp)?;
            if record.status.is_terminal() {
                return Err(CoreError::invalid_transition(format!(
                    "language `{language}` on version {version_id} is deleted"
                )));
            }
            if let (Some(from), Some(to)) = (record.valid_from, valid_to) {
                if to < from {
                    return Err(window_error(language));
                }
            }

            let mut updated = record.clone();
            updated.valid_to = valid_to;
            updated.modified_by = actor.to_string();
            updated.modified_at = now;
            updated.row_stamp = repo.update_availability(&updated, record.row_stamp)?;
            Ok(updated)
        });
        log_single("validity_end_set", version_id, language, &result);
        result
    }

    /// Records a content review, which exempts an expired publication from
    /// archiving for the review window.
    pub fn mark_reviewed(
        &self,
        version_id: VersionId,
        language: &LanguageCode,
        reviewed_at: i64,
        actor: &str,
    ) -> CoreResult<LanguageAvailability> {
        let now = self.ctx.clock.now_ms();
        let result = self.single_change(|repo, _| {
            let version = require_version(repo, version_id)?;
            let record = load_availability(repo, &version, language)?;
            if record.status.is_terminal() {
                return Err(CoreError::invalid_transition(format!(
                    "language `{language}` on version {version_id} is deleted"
                )));
            }

            let mut updated = record.clone();
            updated.last_reviewed_at = Some(reviewed_at);
            updated.modified_by = actor.to_string();
            updated.modified_at = now;
            updated.row_stamp = repo.update_availability(&updated, record.row_stamp)?;
            Ok(updated)
        });
        log_single("review_mark", version_id, language, &result);
        result
    }

    /// Status changes of a version in commit order.
    pub fn history(&self, version_id: VersionId) -> CoreResult<Vec<StatusTransitionRecord>> {
        let tx = read_tx(self.conn)?;
        let repo = SqliteVersionRepository::new(&tx);
        require_version(&repo, version_id)?;
        Ok(repo.list_transitions(version_id)?)
    }

    fn single_change<T, F>(&self, op: F) -> CoreResult<T>
    where
        F: FnOnce(&SqliteVersionRepository<'_>, &mut Vec<TransitionEvent>) -> CoreResult<T>,
    {
        let tx = immediate_tx(self.conn)?;
        let mut events = Vec::new();
        let value = op(&SqliteVersionRepository::new(&tx), &mut events)?;
        tx.commit()?;
        self.notify(&events);
        Ok(value)
    }

    fn notify(&self, events: &[TransitionEvent]) {
        for event in events {
            for observer in &self.observers {
                observer.on_transition(event);
            }
        }
    }
}

/// Parameters of one language's publish step.
struct PublishStep<'a> {
    scheduled_at: Option<i64>,
    expected_stamp: Option<i64>,
    override_gate: bool,
    change: Change<'a>,
}

#[allow(clippy::too_many_arguments)]
fn publish_language(
    conn: &Connection,
    lookup: &LanguageLookup,
    rules: &FieldRules,
    root: &VersionRoot,
    version: &Version,
    language: &LanguageCode,
    step: &PublishStep<'_>,
    events: &mut Vec<TransitionEvent>,
) -> CoreResult<LanguageOutcome> {
    ensure_supported(lookup, language)?;
    let repo = SqliteVersionRepository::new(conn);
    let record = load_availability(&repo, version, language)?;
    check_stamp(&record, step.expected_stamp)?;

    let now = step.change.at;
    let future = step.scheduled_at.filter(|at| *at > now);
    match record.status {
        PublishingStatus::Published if future.is_some() => {
            return Err(CoreError::invalid_transition(format!(
                "language `{language}` on version {} is already published; withdraw it before scheduling",
                version.version_id
            )));
        }
        PublishingStatus::Published => return Ok(LanguageOutcome::Unchanged),
        PublishingStatus::OldPublished | PublishingStatus::Deleted => {
            error!(
                "event=publish_defect module=publishing status=error version_id={} language={language} from={}",
                version.version_id,
                record.status.as_str()
            );
            return Err(CoreError::invalid_transition(format!(
                "language `{language}` on version {} is {} and cannot be published",
                version.version_id,
                record.status.as_str()
            )));
        }
        PublishingStatus::Draft | PublishingStatus::Modified => ensure_head(&repo, version)?,
    }

    repo.get_content(version.version_id, language)?
        .unwrap_or_default()
        .validate(language, rules)?;

    if !step.override_gate {
        let outstanding = SqliteTranslationRepository::new(conn)
            .outstanding_for(version.version_id, language)?;
        if let Some(order_id) = outstanding.first() {
            return Err(CoreError::TranslationGateBlocked {
                language: language.clone(),
                reason: format!("translation order {order_id} is outstanding"),
            });
        }
    }

    let valid_from = step.scheduled_at.unwrap_or(now);
    if record.valid_to.is_some_and(|to| to < valid_from) {
        return Err(window_error(language));
    }

    if future.is_some() {
        let mut updated = record.clone();
        updated.valid_from = Some(valid_from);
        updated.modified_by = step.change.actor.to_string();
        updated.modified_at = now;
        let row_stamp = repo.update_availability(&updated, record.row_stamp)?;
        return Ok(LanguageOutcome::Scheduled {
            valid_from,
            row_stamp,
        });
    }

    let mut demoted = None;
    for entry in repo.list_chain(root.root_id, language)? {
        let other = entry.availability;
        if other.status != PublishingStatus::Published || other.version_id == version.version_id {
            continue;
        }
        let (_, event) = change_status(
            &repo,
            root.root_id,
            &other,
            PublishingStatus::OldPublished,
            other.row_stamp,
            Change {
                reason: "superseded",
                ..step.change
            },
            |_| {},
        )?;
        events.push(event);
        demoted = Some(other.version_id);
    }

    let first_publish = !repo
        .list_transitions(version.version_id)?
        .iter()
        .any(|transition| transition.to_status == PublishingStatus::Published);
    if first_publish {
        let number = VersionNumber::published(repo.max_major(root.root_id)?);
        repo.update_version_number(version.version_id, number)?;
        info!(
            "event=version_renumber module=publishing status=ok version_id={} number={number}",
            version.version_id
        );
    }

    let (updated, event) = change_status(
        &repo,
        root.root_id,
        &record,
        PublishingStatus::Published,
        record.row_stamp,
        step.change,
        |updated| updated.valid_from = Some(valid_from),
    )?;
    events.push(event);
    repo.touch_version(version.version_id, step.change.actor, now)?;

    Ok(LanguageOutcome::Published {
        valid_from,
        row_stamp: updated.row_stamp,
        demoted,
    })
}

/// Runs `op` in a savepoint; its events are kept only when it succeeds.
fn in_savepoint<T, F>(
    tx: &mut Transaction<'_>,
    events: &mut Vec<TransitionEvent>,
    op: F,
) -> CoreResult<T>
where
    F: FnOnce(&Connection, &mut Vec<TransitionEvent>) -> CoreResult<T>,
{
    let savepoint = tx.savepoint()?;
    let mut pending = Vec::new();
    let conn: &Connection = &savepoint;
    let value = op(conn, &mut pending)?;
    savepoint.commit()?;
    events.extend(pending);
    Ok(value)
}

fn load_version_and_root(
    conn: &Connection,
    version_id: VersionId,
) -> CoreResult<(VersionRoot, Version)> {
    let repo = SqliteVersionRepository::new(conn);
    let version = require_version(&repo, version_id)?;
    let root = require_root(&repo, version.root_id)?;
    Ok((root, version))
}

fn check_stamp(record: &LanguageAvailability, expected: Option<i64>) -> CoreResult<()> {
    match expected {
        Some(stamp) if stamp != record.row_stamp => {
            warn!(
                "event=stale_write module=publishing status=conflict version_id={} language={} expected_stamp={stamp} actual_stamp={}",
                record.version_id, record.language, record.row_stamp
            );
            Err(CoreError::ConcurrencyConflict {
                version_id: record.version_id,
                language: record.language.clone(),
            })
        }
        _ => Ok(()),
    }
}

fn check_language_list(languages: &[LanguageCode]) -> CoreResult<()> {
    if languages.is_empty() {
        return Err(ValidationError::general(vec![FieldIssue::new(
            "languages",
            FieldProblem::Missing,
        )])
        .into());
    }
    let mut seen = BTreeSet::new();
    let duplicates = languages
        .iter()
        .filter(|language| !seen.insert(*language))
        .map(|language| {
            FieldIssue::new(
                "languages",
                FieldProblem::Duplicate {
                    value: language.to_string(),
                },
            )
        })
        .collect::<Vec<_>>();
    if duplicates.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::general(duplicates).into())
    }
}

fn window_error(language: &LanguageCode) -> CoreError {
    ValidationError::for_language(
        language.clone(),
        vec![FieldIssue::new(
            "valid_to",
            FieldProblem::Invalid {
                reason: "ends before valid_from".to_string(),
            },
        )],
    )
    .into()
}

fn log_outcome(
    event: &str,
    version_id: VersionId,
    language: &LanguageCode,
    outcome: CoreResult<LanguageOutcome>,
) -> LanguageOutcome {
    match outcome {
        Ok(outcome) => {
            let status = match &outcome {
                LanguageOutcome::Published { .. } => "published",
                LanguageOutcome::Scheduled { .. } => "scheduled",
                LanguageOutcome::Deleted { .. } => "deleted",
                LanguageOutcome::Unchanged => "unchanged",
                LanguageOutcome::Failed(_) => "failed",
            };
            info!(
                "event={event} module=publishing status={status} version_id={version_id} language={language}"
            );
            outcome
        }
        Err(err) => {
            log_failure(event, "publishing", &err);
            LanguageOutcome::Failed(err)
        }
    }
}

fn log_single<T>(
    event: &str,
    version_id: VersionId,
    language: &LanguageCode,
    result: &CoreResult<T>,
) {
    match result {
        Ok(_) => info!(
            "event={event} module=publishing status=ok version_id={version_id} language={language}"
        ),
        Err(err) => log_failure(event, "publishing", err),
    }
}
