//! Translation order repository contracts and SQLite implementation.
//!
//! # Invariants
//! - An order row and its target rows are written together by the caller's
//!   transaction.
//! - Targets are returned ordered by language code.

use crate::model::entity::VersionId;
use crate::model::language::LanguageCode;
use crate::model::translation::{
    TranslationOrder, TranslationOrderId, TranslationState, TranslationTarget,
};
use crate::repo::{parse_language, parse_uuid, RepoError, RepoResult};
use rusqlite::{params, Connection, Row};

/// Repository interface for translation orders.
pub trait TranslationRepository {
    fn insert_order(&self, order: &TranslationOrder) -> RepoResult<()>;
    fn get_order(&self, order_id: TranslationOrderId) -> RepoResult<Option<TranslationOrder>>;
    fn update_order_state(
        &self,
        order_id: TranslationOrderId,
        state: TranslationState,
        delivered_at: Option<i64>,
    ) -> RepoResult<()>;
    fn update_target(&self, order_id: TranslationOrderId, target: &TranslationTarget)
        -> RepoResult<()>;
    /// Orders on `version_id` that still wait for `language`.
    fn outstanding_for(
        &self,
        version_id: VersionId,
        language: &LanguageCode,
    ) -> RepoResult<Vec<TranslationOrderId>>;
}

/// SQLite-backed translation order repository.
pub struct SqliteTranslationRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTranslationRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn load_targets(&self, order_id: TranslationOrderId) -> RepoResult<Vec<TranslationTarget>> {
        let mut stmt = self.conn.prepare(
            "SELECT language, state, resolved_at, failure_reason
             FROM translation_order_targets
             WHERE order_id = ?1
             ORDER BY language ASC;",
        )?;
        let mut rows = stmt.query([order_id.to_string()])?;
        let mut targets = Vec::new();
        while let Some(row) = rows.next()? {
            targets.push(parse_target_row(row)?);
        }
        Ok(targets)
    }
}

impl TranslationRepository for SqliteTranslationRepository<'_> {
    fn insert_order(&self, order: &TranslationOrder) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO translation_orders (
                order_id,
                version_id,
                source_language,
                state,
                ordered_by,
                ordered_at,
                delivered_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                order.order_id.to_string(),
                order.version_id.to_string(),
                order.source_language.as_str(),
                order.state.as_str(),
                order.ordered_by.as_str(),
                order.ordered_at,
                order.delivered_at,
            ],
        )?;

        let mut stmt = self.conn.prepare(
            "INSERT INTO translation_order_targets (
                order_id,
                language,
                state,
                resolved_at,
                failure_reason
            ) VALUES (?1, ?2, ?3, ?4, ?5);",
        )?;
        for target in &order.targets {
            stmt.execute(params![
                order.order_id.to_string(),
                target.language.as_str(),
                target.state.as_str(),
                target.resolved_at,
                target.failure_reason.as_deref(),
            ])?;
        }
        Ok(())
    }

    fn get_order(&self, order_id: TranslationOrderId) -> RepoResult<Option<TranslationOrder>> {
        let mut stmt = self.conn.prepare(
            "SELECT order_id, version_id, source_language, state, ordered_by, ordered_at, delivered_at
             FROM translation_orders
             WHERE order_id = ?1;",
        )?;
        let mut rows = stmt.query([order_id.to_string()])?;
        let Some(row) = rows.next()? else {
            return Ok(None);
        };

        let order_text: String = row.get("order_id")?;
        let version_text: String = row.get("version_id")?;
        let source_text: String = row.get("source_language")?;
        let state_text: String = row.get("state")?;
        let mut order = TranslationOrder {
            order_id: parse_uuid(&order_text, "translation_orders.order_id")?,
            version_id: parse_uuid(&version_text, "translation_orders.version_id")?,
            source_language: parse_language(&source_text, "translation_orders.source_language")?,
            state: parse_state(&state_text, "translation_orders.state")?,
            targets: Vec::new(),
            ordered_by: row.get("ordered_by")?,
            ordered_at: row.get("ordered_at")?,
            delivered_at: row.get("delivered_at")?,
        };
        order.targets = self.load_targets(order.order_id)?;
        Ok(Some(order))
    }

    fn update_order_state(
        &self,
        order_id: TranslationOrderId,
        state: TranslationState,
        delivered_at: Option<i64>,
    ) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE translation_orders
             SET state = ?2,
                 delivered_at = ?3
             WHERE order_id = ?1;",
            params![order_id.to_string(), state.as_str(), delivered_at],
        )?;
        if changed == 0 {
            return Err(RepoError::OrderNotFound(order_id));
        }
        Ok(())
    }

    fn update_target(
        &self,
        order_id: TranslationOrderId,
        target: &TranslationTarget,
    ) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE translation_order_targets
             SET state = ?3,
                 resolved_at = ?4,
                 failure_reason = ?5
             WHERE order_id = ?1
               AND language = ?2;",
            params![
                order_id.to_string(),
                target.language.as_str(),
                target.state.as_str(),
                target.resolved_at,
                target.failure_reason.as_deref(),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::OrderNotFound(order_id));
        }
        Ok(())
    }

    fn outstanding_for(
        &self,
        version_id: VersionId,
        language: &LanguageCode,
    ) -> RepoResult<Vec<TranslationOrderId>> {
        let mut stmt = self.conn.prepare(
            "SELECT o.order_id
             FROM translation_orders o
             INNER JOIN translation_order_targets t ON t.order_id = o.order_id
             WHERE o.version_id = ?1
               AND t.language = ?2
               AND t.state IN ('ordered', 'in_progress')
             ORDER BY o.ordered_at ASC, o.order_id ASC;",
        )?;
        let mut rows = stmt.query(params![version_id.to_string(), language.as_str()])?;
        let mut ids = Vec::new();
        while let Some(row) = rows.next()? {
            let text: String = row.get(0)?;
            ids.push(parse_uuid(&text, "translation_orders.order_id")?);
        }
        Ok(ids)
    }
}

fn parse_target_row(row: &Row<'_>) -> RepoResult<TranslationTarget> {
    let language_text: String = row.get("language")?;
    let state_text: String = row.get("state")?;
    Ok(TranslationTarget {
        language: parse_language(&language_text, "translation_order_targets.language")?,
        state: parse_state(&state_text, "translation_order_targets.state")?,
        resolved_at: row.get("resolved_at")?,
        failure_reason: row.get("failure_reason")?,
    })
}

fn parse_state(value: &str, column: &'static str) -> RepoResult<TranslationState> {
    TranslationState::parse(value)
        .ok_or_else(|| RepoError::InvalidData(format!("invalid state `{value}` in {column}")))
}
