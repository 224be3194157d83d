//! Translation order tracking.
//!
//! # Responsibility
//! - Open translation orders for target languages of one version.
//! - Apply per-language deliveries from the external translation pipeline.
//! - Answer the publish gate query for outstanding orders.
//!
//! # Invariants
//! - At most one outstanding order per (version, target language).
//! - Live or scheduled content is never targeted without `overwrite_live`.
//! - Orders are opened only on the chain head and only for target languages
//!   that a delivery could still write.
//! - Each delivered language is applied in its own savepoint; an order stays
//!   open until every target language is resolved.

use crate::model::content::{FieldIssue, FieldProblem, FieldRules, LanguageContent, ValidationError};
use crate::model::entity::VersionId;
use crate::model::language::LanguageCode;
use crate::model::status::PublishingStatus;
use crate::model::translation::{
    derive_order_state, TranslationOrder, TranslationOrderId, TranslationState, TranslationTarget,
};
use crate::model::version::{Version, VersionRoot};
use crate::repo::translation_repo::{SqliteTranslationRepository, TranslationRepository};
use crate::repo::version_repo::{
    require_root, require_version, SqliteVersionRepository, VersionRepository,
};
use crate::service::chain::{ensure_head, immediate_tx, write_language_content, Change};
use crate::service::error::{log_failure, CoreError, CoreResult, ErrorKind};
use crate::service::ServiceContext;
use log::info;
use rusqlite::{Connection, Transaction};
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

/// Input of [`TranslationService::request_translation`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationRequest {
    pub version_id: VersionId,
    pub source_language: LanguageCode,
    pub target_languages: Vec<LanguageCode>,
    /// Allows targeting languages that are live or scheduled.
    pub overwrite_live: bool,
    pub actor: String,
}

/// What the pipeline returned for one target language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LanguageDelivery {
    Delivered(LanguageContent),
    Failed(String),
}

/// Result of applying one language of a delivery.
#[derive(Debug)]
pub enum DeliveryOutcome {
    /// Content stored; the language is now `status` on the version.
    Delivered { status: PublishingStatus },
    /// Target resolved as failed with `reason`.
    Failed { reason: String },
    /// Target was already resolved.
    Unchanged,
    /// Delivery refused; the target stays outstanding.
    Rejected(CoreError),
}

#[derive(Debug)]
pub struct DeliveryReport {
    pub order_id: TranslationOrderId,
    /// Order state after the delivery.
    pub state: TranslationState,
    pub languages: BTreeMap<LanguageCode, DeliveryOutcome>,
}

pub struct TranslationService<'conn> {
    conn: &'conn Connection,
    ctx: ServiceContext,
}

impl<'conn> TranslationService<'conn> {
    pub fn new(conn: &'conn Connection, ctx: ServiceContext) -> Self {
        Self { conn, ctx }
    }

    /// Opens an order translating `source_language` into the targets.
    ///
    /// # Errors
    /// - `NotFound` when the version does not exist.
    /// - `Validation` for a missing source or an invalid target list.
    /// - `TranslationGateBlocked` when a target is live or scheduled without
    ///   `overwrite_live`, or already has an outstanding order.
    /// - `InvalidTransition` when the version is superseded or a target is
    ///   no longer editable on it.
    pub fn request_translation(
        &self,
        request: &TranslationRequest,
    ) -> CoreResult<TranslationOrderId> {
        let result = self.request_translation_in(request);
        match &result {
            Ok(order_id) => info!(
                "event=translation_order module=translation status=ok order_id={order_id} version_id={} source={} targets={}",
                request.version_id,
                request.source_language,
                request.target_languages.len()
            ),
            Err(err) => log_failure("translation_order", "translation", err),
        }
        result
    }

    /// Marks an order as accepted by the pipeline (`Ordered -> InProgress`).
    pub fn mark_in_progress(&self, order_id: TranslationOrderId) -> CoreResult<TranslationOrder> {
        let tx = immediate_tx(self.conn)?;
        let order = {
            let repo = SqliteTranslationRepository::new(&tx);
            let mut order = repo
                .get_order(order_id)?
                .ok_or_else(|| CoreError::not_found(format!("translation order {order_id}")))?;
            match order.state {
                TranslationState::InProgress => return Ok(order),
                TranslationState::Delivered | TranslationState::Failed => {
                    return Err(CoreError::invalid_transition(format!(
                        "translation order {order_id} is already {}",
                        order.state.as_str()
                    )));
                }
                TranslationState::Ordered => {}
            }
            for target in &mut order.targets {
                if target.state == TranslationState::Ordered {
                    target.state = TranslationState::InProgress;
                    repo.update_target(order_id, target)?;
                }
            }
            order.state = TranslationState::InProgress;
            repo.update_order_state(order_id, order.state, None)?;
            order
        };
        tx.commit()?;

        info!("event=translation_progress module=translation status=ok order_id={order_id}");
        Ok(order)
    }

    /// Applies per-language results of an order.
    ///
    /// Languages outside the order are rejected individually.
    pub fn on_translation_delivered(
        &self,
        order_id: TranslationOrderId,
        deliveries: &BTreeMap<LanguageCode, LanguageDelivery>,
        actor: &str,
    ) -> CoreResult<DeliveryReport> {
        let now = self.ctx.clock.now_ms();
        let mut tx = immediate_tx(self.conn)?;
        let (mut order, root, version) = {
            let translations = SqliteTranslationRepository::new(&tx);
            let versions = SqliteVersionRepository::new(&tx);
            let order = translations
                .get_order(order_id)?
                .ok_or_else(|| CoreError::not_found(format!("translation order {order_id}")))?;
            let version = require_version(&versions, order.version_id)?;
            let root = require_root(&versions, version.root_id)?;
            (order, root, version)
        };
        let rules = self.ctx.config.validation.rules_for(root.kind);

        let mut outcomes = BTreeMap::new();
        for (language, delivery) in deliveries {
            let Some(index) = order
                .targets
                .iter()
                .position(|target| &target.language == language)
            else {
                outcomes.insert(
                    language.clone(),
                    DeliveryOutcome::Rejected(CoreError::Validation(ValidationError::for_language(
                        language.clone(),
                        vec![FieldIssue::new(
                            "language",
                            FieldProblem::Invalid {
                                reason: format!("not targeted by order {order_id}"),
                            },
                        )],
                    ))),
                );
                continue;
            };
            if !order.targets[index].state.is_outstanding() {
                outcomes.insert(language.clone(), DeliveryOutcome::Unchanged);
                continue;
            }

            let outcome = match delivery {
                LanguageDelivery::Failed(reason) => DeliveryOutcome::Failed {
                    reason: reason.clone(),
                },
                LanguageDelivery::Delivered(content) => {
                    let applied = apply_delivery(
                        &mut tx,
                        &rules,
                        &root,
                        &version,
                        order_id,
                        language,
                        content,
                        Change {
                            actor,
                            at: now,
                            reason: "translation_delivered",
                        },
                    );
                    match applied {
                        Ok(status) => DeliveryOutcome::Delivered { status },
                        Err(err) if err.kind() == ErrorKind::InvalidTransition => {
                            DeliveryOutcome::Failed {
                                reason: err.to_string(),
                            }
                        }
                        Err(err) => DeliveryOutcome::Rejected(err),
                    }
                }
            };

            let target = &mut order.targets[index];
            match &outcome {
                DeliveryOutcome::Delivered { .. } => {
                    target.state = TranslationState::Delivered;
                    target.resolved_at = Some(now);
                }
                DeliveryOutcome::Failed { reason } => {
                    target.state = TranslationState::Failed;
                    target.resolved_at = Some(now);
                    target.failure_reason = Some(reason.clone());
                }
                DeliveryOutcome::Unchanged | DeliveryOutcome::Rejected(_) => {}
            }
            if target.resolved_at.is_some() {
                SqliteTranslationRepository::new(&tx).update_target(order_id, target)?;
            }
            log_delivery(order_id, language, &outcome);
            outcomes.insert(language.clone(), outcome);
        }

        let state = derive_order_state(order.state, &order.targets);
        let delivered_at = (!state.is_outstanding()).then_some(now);
        if state != order.state {
            SqliteTranslationRepository::new(&tx).update_order_state(order_id, state, delivered_at)?;
        }
        tx.commit()?;

        info!(
            "event=translation_delivery module=translation status=ok order_id={order_id} state={} languages={}",
            state.as_str(),
            outcomes.len()
        );
        Ok(DeliveryReport {
            order_id,
            state,
            languages: outcomes,
        })
    }

    pub fn get_order(&self, order_id: TranslationOrderId) -> CoreResult<TranslationOrder> {
        SqliteTranslationRepository::new(self.conn)
            .get_order(order_id)?
            .ok_or_else(|| CoreError::not_found(format!("translation order {order_id}")))
    }

    /// Outstanding orders that block publishing `language` of the version.
    pub fn outstanding_for(
        &self,
        version_id: VersionId,
        language: &LanguageCode,
    ) -> CoreResult<Vec<TranslationOrderId>> {
        Ok(SqliteTranslationRepository::new(self.conn).outstanding_for(version_id, language)?)
    }

    fn request_translation_in(
        &self,
        request: &TranslationRequest,
    ) -> CoreResult<TranslationOrderId> {
        let now = self.ctx.clock.now_ms();
        let tx = immediate_tx(self.conn)?;
        let order_id = {
            let versions = SqliteVersionRepository::new(&tx);
            let translations = SqliteTranslationRepository::new(&tx);
            let version = require_version(&versions, request.version_id)?;
            self.check_request(&versions, request)?;
            ensure_head(&versions, &version)?;

            for target in &request.target_languages {
                let live = versions
                    .list_chain(version.root_id, target)?
                    .iter()
                    .any(|entry| entry.availability.is_publicly_visible(now));
                let current = versions.get_availability(version.version_id, target)?;
                let scheduled = current
                    .as_ref()
                    .is_some_and(|record| record.is_scheduled(now));
                if (live || scheduled) && !request.overwrite_live {
                    return Err(CoreError::TranslationGateBlocked {
                        language: target.clone(),
                        reason: if live {
                            "language is published; set overwrite_live to replace it".to_string()
                        } else {
                            "language is scheduled; set overwrite_live to replace it".to_string()
                        },
                    });
                }
                if let Some(record) = current.filter(|record| !record.status.is_editable()) {
                    return Err(CoreError::invalid_transition(format!(
                        "language `{target}` on version {} is {}; create a draft version first",
                        version.version_id,
                        record.status.as_str()
                    )));
                }
                if let Some(existing) = translations
                    .outstanding_for(version.version_id, target)?
                    .first()
                {
                    return Err(CoreError::TranslationGateBlocked {
                        language: target.clone(),
                        reason: format!("translation order {existing} is outstanding"),
                    });
                }
            }

            let order = TranslationOrder {
                order_id: Uuid::new_v4(),
                version_id: version.version_id,
                source_language: request.source_language.clone(),
                state: TranslationState::Ordered,
                targets: request
                    .target_languages
                    .iter()
                    .map(|language| TranslationTarget {
                        language: language.clone(),
                        state: TranslationState::Ordered,
                        resolved_at: None,
                        failure_reason: None,
                    })
                    .collect(),
                ordered_by: request.actor.clone(),
                ordered_at: now,
                delivered_at: None,
            };
            translations.insert_order(&order)?;
            for target in &request.target_languages {
                if versions
                    .get_availability(version.version_id, target)?
                    .is_some()
                {
                    versions.set_translation_order(version.version_id, target, order.order_id)?;
                }
            }
            order.order_id
        };
        tx.commit()?;
        Ok(order_id)
    }

    /// Collects every problem of the source and target list at once.
    fn check_request<R: VersionRepository + ?Sized>(
        &self,
        versions: &R,
        request: &TranslationRequest,
    ) -> CoreResult<()> {
        let mut issues = Vec::new();

        let source = &request.source_language;
        if !self.ctx.lookup.is_supported(source) {
            issues.push(FieldIssue::new(
                "source_language",
                FieldProblem::Unsupported {
                    value: source.to_string(),
                },
            ));
        } else {
            let source_live = versions
                .get_availability(request.version_id, source)?
                .is_some_and(|record| record.status != PublishingStatus::Deleted);
            let has_content = versions
                .get_content(request.version_id, source)?
                .is_some();
            if !source_live || !has_content {
                issues.push(FieldIssue::new("source_language", FieldProblem::Missing));
            }
        }

        if request.target_languages.is_empty() {
            issues.push(FieldIssue::new("target_languages", FieldProblem::Missing));
        }
        let mut seen = BTreeSet::new();
        for target in &request.target_languages {
            let value = target.to_string();
            if !self.ctx.lookup.is_supported(target) {
                issues.push(FieldIssue::new(
                    "target_languages",
                    FieldProblem::Unsupported { value },
                ));
            } else if target == source {
                issues.push(FieldIssue::new(
                    "target_languages",
                    FieldProblem::Invalid {
                        reason: format!("`{value}` is the source language"),
                    },
                ));
            } else if !seen.insert(target) {
                issues.push(FieldIssue::new(
                    "target_languages",
                    FieldProblem::Duplicate { value },
                ));
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::general(issues).into())
        }
    }
}

/// Stores delivered content in its own savepoint.
#[allow(clippy::too_many_arguments)]
fn apply_delivery(
    tx: &mut Transaction<'_>,
    rules: &FieldRules,
    root: &VersionRoot,
    version: &Version,
    order_id: TranslationOrderId,
    language: &LanguageCode,
    content: &LanguageContent,
    change: Change<'_>,
) -> CoreResult<PublishingStatus> {
    content.validate(language, rules)?;
    let savepoint = tx.savepoint()?;
    let status = {
        let repo = SqliteVersionRepository::new(&savepoint);
        let record = write_language_content(&repo, root, version, language, content, change)?;
        repo.set_translation_order(version.version_id, language, order_id)?;
        record.status
    };
    savepoint.commit()?;
    Ok(status)
}

fn log_delivery(order_id: TranslationOrderId, language: &LanguageCode, outcome: &DeliveryOutcome) {
    match outcome {
        DeliveryOutcome::Rejected(err) => log_failure("translation_language", "translation", err),
        other => info!(
            "event=translation_language module=translation status={} order_id={order_id} language={language}",
            match other {
                DeliveryOutcome::Delivered { .. } => "delivered",
                DeliveryOutcome::Failed { .. } => "failed",
                _ => "unchanged",
            }
        ),
    }
}
