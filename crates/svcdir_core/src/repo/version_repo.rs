//! Version chain repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist roots, versions, language content and language availability.
//! - Record the status transition audit trail.
//!
//! # Invariants
//! - Version chains are listed in `seq ASC` order.
//! - Availability updates always bump `row_stamp` and are guarded by the
//!   stamp the caller read.
//! - Storage keeps at most one `published` row per (root, language) through
//!   a partial unique index; callers demote before they promote.

use crate::model::availability::LanguageAvailability;
use crate::model::content::LanguageContent;
use crate::model::entity::{EntityKind, RootId, VersionId};
use crate::model::language::LanguageCode;
use crate::model::status::PublishingStatus;
use crate::model::translation::TranslationOrderId;
use crate::model::version::{Version, VersionNumber, VersionRoot};
use crate::repo::{parse_language, parse_uuid, RepoError, RepoResult};
use rusqlite::{params, Connection, Row};
use serde::Serialize;
use std::collections::BTreeMap;

const VERSION_SELECT_SQL: &str = "SELECT
    version_id,
    root_id,
    seq,
    version_major,
    version_minor,
    base_version_id,
    created_by,
    created_at,
    modified_by,
    modified_at
FROM versions";

const AVAILABILITY_SELECT_SQL: &str = "SELECT
    a.version_id AS version_id,
    a.language AS language,
    a.status AS status,
    a.valid_from AS valid_from,
    a.valid_to AS valid_to,
    a.last_reviewed_at AS last_reviewed_at,
    a.modified_by AS modified_by,
    a.modified_at AS modified_at,
    a.row_stamp AS row_stamp,
    a.translation_order_id AS translation_order_id,
    v.seq AS seq
FROM language_availabilities a
INNER JOIN versions v ON v.version_id = a.version_id";

/// One language availability together with its position in the chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainEntry {
    pub seq: i64,
    pub availability: LanguageAvailability,
}

/// Audit row written for every committed status change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusTransitionRecord {
    pub version_id: VersionId,
    pub language: LanguageCode,
    /// `None` when the availability record was created by this transition.
    pub from_status: Option<PublishingStatus>,
    pub to_status: PublishingStatus,
    pub actor: String,
    pub at: i64,
    pub reason: String,
}

/// Repository interface for version chains and their language slices.
pub trait VersionRepository {
    fn insert_root(&self, root: &VersionRoot) -> RepoResult<()>;
    fn get_root(&self, root_id: RootId) -> RepoResult<Option<VersionRoot>>;

    fn insert_version(&self, version: &Version) -> RepoResult<()>;
    fn get_version(&self, version_id: VersionId) -> RepoResult<Option<Version>>;
    /// Lists all versions of one root in chain order.
    fn list_versions(&self, root_id: RootId) -> RepoResult<Vec<Version>>;
    /// Returns the chain head (highest `seq`).
    fn latest_version(&self, root_id: RootId) -> RepoResult<Option<Version>>;
    fn next_seq(&self, root_id: RootId) -> RepoResult<i64>;
    fn max_major(&self, root_id: RootId) -> RepoResult<u32>;
    fn update_version_number(&self, version_id: VersionId, number: VersionNumber)
        -> RepoResult<()>;
    fn touch_version(&self, version_id: VersionId, actor: &str, at: i64) -> RepoResult<()>;

    fn get_content(
        &self,
        version_id: VersionId,
        language: &LanguageCode,
    ) -> RepoResult<Option<LanguageContent>>;
    fn list_content(&self, version_id: VersionId)
        -> RepoResult<BTreeMap<LanguageCode, LanguageContent>>;
    fn upsert_content(
        &self,
        version_id: VersionId,
        language: &LanguageCode,
        content: &LanguageContent,
    ) -> RepoResult<()>;

    fn get_availability(
        &self,
        version_id: VersionId,
        language: &LanguageCode,
    ) -> RepoResult<Option<LanguageAvailability>>;
    fn list_availabilities(&self, version_id: VersionId) -> RepoResult<Vec<LanguageAvailability>>;
    /// Lists one language across the whole chain of a root, `seq ASC`.
    fn list_chain(&self, root_id: RootId, language: &LanguageCode) -> RepoResult<Vec<ChainEntry>>;
    fn insert_availability(&self, root_id: RootId, record: &LanguageAvailability)
        -> RepoResult<()>;
    /// Writes `record` if the stored stamp still equals `expected_stamp`.
    ///
    /// Returns the new stamp.
    fn update_availability(
        &self,
        record: &LanguageAvailability,
        expected_stamp: i64,
    ) -> RepoResult<i64>;
    /// Whether any version of the root has ever published `language`.
    fn language_ever_published(&self, root_id: RootId, language: &LanguageCode)
        -> RepoResult<bool>;
    /// Editable records whose scheduled `valid_from` is at or before `now`.
    fn list_due_schedules(&self, now: i64) -> RepoResult<Vec<LanguageAvailability>>;
    /// Published/old-published records past `valid_to` and not reviewed
    /// since `reviewed_before`.
    fn list_archive_candidates(
        &self,
        now: i64,
        reviewed_before: i64,
    ) -> RepoResult<Vec<LanguageAvailability>>;
    fn set_translation_order(
        &self,
        version_id: VersionId,
        language: &LanguageCode,
        order_id: TranslationOrderId,
    ) -> RepoResult<()>;

    fn record_transition(&self, record: &StatusTransitionRecord) -> RepoResult<()>;
    fn list_transitions(&self, version_id: VersionId) -> RepoResult<Vec<StatusTransitionRecord>>;
}

/// SQLite-backed version repository.
///
/// `conn` may be a plain connection, a transaction or a savepoint.
pub struct SqliteVersionRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteVersionRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl VersionRepository for SqliteVersionRepository<'_> {
    fn insert_root(&self, root: &VersionRoot) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO version_roots (root_id, kind, created_by, created_at)
             VALUES (?1, ?2, ?3, ?4);",
            params![
                root.root_id.to_string(),
                root.kind.as_str(),
                root.created_by.as_str(),
                root.created_at,
            ],
        )?;
        Ok(())
    }

    fn get_root(&self, root_id: RootId) -> RepoResult<Option<VersionRoot>> {
        let mut stmt = self.conn.prepare(
            "SELECT root_id, kind, created_by, created_at
             FROM version_roots
             WHERE root_id = ?1;",
        )?;
        let mut rows = stmt.query([root_id.to_string()])?;
        if let Some(row) = rows.next()? {
            let kind_text: String = row.get("kind")?;
            let kind = EntityKind::parse(&kind_text).ok_or_else(|| {
                RepoError::InvalidData(format!(
                    "invalid entity kind `{kind_text}` in version_roots.kind"
                ))
            })?;
            let root_text: String = row.get("root_id")?;
            return Ok(Some(VersionRoot {
                root_id: parse_uuid(&root_text, "version_roots.root_id")?,
                kind,
                created_by: row.get("created_by")?,
                created_at: row.get("created_at")?,
            }));
        }
        Ok(None)
    }

    fn insert_version(&self, version: &Version) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO versions (
                version_id,
                root_id,
                seq,
                version_major,
                version_minor,
                base_version_id,
                created_by,
                created_at,
                modified_by,
                modified_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10);",
            params![
                version.version_id.to_string(),
                version.root_id.to_string(),
                version.seq,
                version.number.major,
                version.number.minor,
                version.base_version_id.map(|id| id.to_string()),
                version.created_by.as_str(),
                version.created_at,
                version.modified_by.as_str(),
                version.modified_at,
            ],
        )?;
        Ok(())
    }

    fn get_version(&self, version_id: VersionId) -> RepoResult<Option<Version>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{VERSION_SELECT_SQL} WHERE version_id = ?1;"))?;
        let mut rows = stmt.query([version_id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_version_row(row)?));
        }
        Ok(None)
    }

    fn list_versions(&self, root_id: RootId) -> RepoResult<Vec<Version>> {
        let mut stmt = self.conn.prepare(&format!(
            "{VERSION_SELECT_SQL} WHERE root_id = ?1 ORDER BY seq ASC;"
        ))?;
        let mut rows = stmt.query([root_id.to_string()])?;
        let mut versions = Vec::new();
        while let Some(row) = rows.next()? {
            versions.push(parse_version_row(row)?);
        }
        Ok(versions)
    }

    fn latest_version(&self, root_id: RootId) -> RepoResult<Option<Version>> {
        let mut stmt = self.conn.prepare(&format!(
            "{VERSION_SELECT_SQL} WHERE root_id = ?1 ORDER BY seq DESC LIMIT 1;"
        ))?;
        let mut rows = stmt.query([root_id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_version_row(row)?));
        }
        Ok(None)
    }

    fn next_seq(&self, root_id: RootId) -> RepoResult<i64> {
        let next = self.conn.query_row(
            "SELECT COALESCE(MAX(seq), 0) + 1 FROM versions WHERE root_id = ?1;",
            [root_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(next)
    }

    fn max_major(&self, root_id: RootId) -> RepoResult<u32> {
        let max = self.conn.query_row(
            "SELECT COALESCE(MAX(version_major), 0) FROM versions WHERE root_id = ?1;",
            [root_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(max)
    }

    fn update_version_number(
        &self,
        version_id: VersionId,
        number: VersionNumber,
    ) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE versions
             SET version_major = ?2,
                 version_minor = ?3
             WHERE version_id = ?1;",
            params![version_id.to_string(), number.major, number.minor],
        )?;
        if changed == 0 {
            return Err(RepoError::VersionNotFound(version_id));
        }
        Ok(())
    }

    fn touch_version(&self, version_id: VersionId, actor: &str, at: i64) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE versions
             SET modified_by = ?2,
                 modified_at = ?3
             WHERE version_id = ?1;",
            params![version_id.to_string(), actor, at],
        )?;
        if changed == 0 {
            return Err(RepoError::VersionNotFound(version_id));
        }
        Ok(())
    }

    fn get_content(
        &self,
        version_id: VersionId,
        language: &LanguageCode,
    ) -> RepoResult<Option<LanguageContent>> {
        let mut stmt = self.conn.prepare(
            "SELECT language, name, short_description, description, extra_json
             FROM language_content
             WHERE version_id = ?1
               AND language = ?2;",
        )?;
        let mut rows = stmt.query(params![version_id.to_string(), language.as_str()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_content_row(row)?.1));
        }
        Ok(None)
    }

    fn list_content(
        &self,
        version_id: VersionId,
    ) -> RepoResult<BTreeMap<LanguageCode, LanguageContent>> {
        let mut stmt = self.conn.prepare(
            "SELECT language, name, short_description, description, extra_json
             FROM language_content
             WHERE version_id = ?1
             ORDER BY language ASC;",
        )?;
        let mut rows = stmt.query([version_id.to_string()])?;
        let mut content = BTreeMap::new();
        while let Some(row) = rows.next()? {
            let (language, value) = parse_content_row(row)?;
            content.insert(language, value);
        }
        Ok(content)
    }

    fn upsert_content(
        &self,
        version_id: VersionId,
        language: &LanguageCode,
        content: &LanguageContent,
    ) -> RepoResult<()> {
        let extra_json = serde_json::to_string(&content.extra)
            .map_err(|err| RepoError::InvalidData(format!("unserializable extra fields: {err}")))?;
        self.conn.execute(
            "INSERT INTO language_content (
                version_id,
                language,
                name,
                short_description,
                description,
                extra_json
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT (version_id, language) DO UPDATE SET
                name = excluded.name,
                short_description = excluded.short_description,
                description = excluded.description,
                extra_json = excluded.extra_json;",
            params![
                version_id.to_string(),
                language.as_str(),
                content.name.as_str(),
                content.short_description.as_str(),
                content.description.as_str(),
                extra_json,
            ],
        )?;
        Ok(())
    }

    fn get_availability(
        &self,
        version_id: VersionId,
        language: &LanguageCode,
    ) -> RepoResult<Option<LanguageAvailability>> {
        let mut stmt = self.conn.prepare(&format!(
            "{AVAILABILITY_SELECT_SQL}
             WHERE a.version_id = ?1
               AND a.language = ?2;"
        ))?;
        let mut rows = stmt.query(params![version_id.to_string(), language.as_str()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_chain_row(row)?.availability));
        }
        Ok(None)
    }

    fn list_availabilities(&self, version_id: VersionId) -> RepoResult<Vec<LanguageAvailability>> {
        let mut stmt = self.conn.prepare(&format!(
            "{AVAILABILITY_SELECT_SQL}
             WHERE a.version_id = ?1
             ORDER BY a.language ASC;"
        ))?;
        let mut rows = stmt.query([version_id.to_string()])?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(parse_chain_row(row)?.availability);
        }
        Ok(records)
    }

    fn list_chain(&self, root_id: RootId, language: &LanguageCode) -> RepoResult<Vec<ChainEntry>> {
        let mut stmt = self.conn.prepare(&format!(
            "{AVAILABILITY_SELECT_SQL}
             WHERE a.root_id = ?1
               AND a.language = ?2
             ORDER BY v.seq ASC;"
        ))?;
        let mut rows = stmt.query(params![root_id.to_string(), language.as_str()])?;
        let mut entries = Vec::new();
        while let Some(row) = rows.next()? {
            entries.push(parse_chain_row(row)?);
        }
        Ok(entries)
    }

    fn insert_availability(
        &self,
        root_id: RootId,
        record: &LanguageAvailability,
    ) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO language_availabilities (
                version_id,
                root_id,
                language,
                status,
                valid_from,
                valid_to,
                last_reviewed_at,
                modified_by,
                modified_at,
                row_stamp,
                translation_order_id
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11);",
            params![
                record.version_id.to_string(),
                root_id.to_string(),
                record.language.as_str(),
                record.status.as_str(),
                record.valid_from,
                record.valid_to,
                record.last_reviewed_at,
                record.modified_by.as_str(),
                record.modified_at,
                record.row_stamp,
                record.translation_order_id.map(|id| id.to_string()),
            ],
        )?;
        Ok(())
    }

    fn update_availability(
        &self,
        record: &LanguageAvailability,
        expected_stamp: i64,
    ) -> RepoResult<i64> {
        let changed = self.conn.execute(
            "UPDATE language_availabilities
             SET status = ?3,
                 valid_from = ?4,
                 valid_to = ?5,
                 last_reviewed_at = ?6,
                 modified_by = ?7,
                 modified_at = ?8,
                 translation_order_id = ?9,
                 row_stamp = row_stamp + 1
             WHERE version_id = ?1
               AND language = ?2
               AND row_stamp = ?10;",
            params![
                record.version_id.to_string(),
                record.language.as_str(),
                record.status.as_str(),
                record.valid_from,
                record.valid_to,
                record.last_reviewed_at,
                record.modified_by.as_str(),
                record.modified_at,
                record.translation_order_id.map(|id| id.to_string()),
                expected_stamp,
            ],
        )?;

        if changed == 0 {
            if self
                .get_availability(record.version_id, &record.language)?
                .is_none()
            {
                return Err(RepoError::AvailabilityNotFound {
                    version_id: record.version_id,
                    language: record.language.clone(),
                });
            }
            return Err(RepoError::StaleWrite {
                version_id: record.version_id,
                language: record.language.clone(),
                expected_stamp,
            });
        }

        Ok(expected_stamp + 1)
    }

    fn language_ever_published(
        &self,
        root_id: RootId,
        language: &LanguageCode,
    ) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM language_availabilities
                WHERE root_id = ?1
                  AND language = ?2
                  AND status IN ('published', 'old_published')
            ) OR EXISTS(
                SELECT 1
                FROM status_transitions t
                INNER JOIN versions v ON v.version_id = t.version_id
                WHERE v.root_id = ?1
                  AND t.language = ?2
                  AND t.to_status = 'published'
            );",
            params![root_id.to_string(), language.as_str()],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    fn list_due_schedules(&self, now: i64) -> RepoResult<Vec<LanguageAvailability>> {
        let mut stmt = self.conn.prepare(&format!(
            "{AVAILABILITY_SELECT_SQL}
             WHERE a.status IN ('draft', 'modified')
               AND a.valid_from IS NOT NULL
               AND a.valid_from <= ?1
             ORDER BY a.valid_from ASC, a.version_id ASC, a.language ASC;"
        ))?;
        let mut rows = stmt.query([now])?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(parse_chain_row(row)?.availability);
        }
        Ok(records)
    }

    fn list_archive_candidates(
        &self,
        now: i64,
        reviewed_before: i64,
    ) -> RepoResult<Vec<LanguageAvailability>> {
        let mut stmt = self.conn.prepare(&format!(
            "{AVAILABILITY_SELECT_SQL}
             WHERE a.status IN ('published', 'old_published')
               AND a.valid_to IS NOT NULL
               AND a.valid_to < ?1
               AND (a.last_reviewed_at IS NULL OR a.last_reviewed_at < ?2)
             ORDER BY a.valid_to ASC, a.version_id ASC, a.language ASC;"
        ))?;
        let mut rows = stmt.query(params![now, reviewed_before])?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(parse_chain_row(row)?.availability);
        }
        Ok(records)
    }

    fn set_translation_order(
        &self,
        version_id: VersionId,
        language: &LanguageCode,
        order_id: TranslationOrderId,
    ) -> RepoResult<()> {
        self.conn.execute(
            "UPDATE language_availabilities
             SET translation_order_id = ?3
             WHERE version_id = ?1
               AND language = ?2;",
            params![
                version_id.to_string(),
                language.as_str(),
                order_id.to_string()
            ],
        )?;
        Ok(())
    }

    fn record_transition(&self, record: &StatusTransitionRecord) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO status_transitions (
                version_id,
                language,
                from_status,
                to_status,
                actor,
                at,
                reason
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                record.version_id.to_string(),
                record.language.as_str(),
                record.from_status.map(PublishingStatus::as_str),
                record.to_status.as_str(),
                record.actor.as_str(),
                record.at,
                record.reason.as_str(),
            ],
        )?;
        Ok(())
    }

    fn list_transitions(&self, version_id: VersionId) -> RepoResult<Vec<StatusTransitionRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT version_id, language, from_status, to_status, actor, at, reason
             FROM status_transitions
             WHERE version_id = ?1
             ORDER BY transition_id ASC;",
        )?;
        let mut rows = stmt.query([version_id.to_string()])?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            let version_text: String = row.get("version_id")?;
            let language_text: String = row.get("language")?;
            let from_status = row
                .get::<_, Option<String>>("from_status")?
                .map(|value| parse_status(&value, "status_transitions.from_status"))
                .transpose()?;
            let to_text: String = row.get("to_status")?;
            records.push(StatusTransitionRecord {
                version_id: parse_uuid(&version_text, "status_transitions.version_id")?,
                language: parse_language(&language_text, "status_transitions.language")?,
                from_status,
                to_status: parse_status(&to_text, "status_transitions.to_status")?,
                actor: row.get("actor")?,
                at: row.get("at")?,
                reason: row.get("reason")?,
            });
        }
        Ok(records)
    }
}

/// Loads a root or fails with [`RepoError::RootNotFound`].
pub fn require_root<R: VersionRepository + ?Sized>(
    repo: &R,
    root_id: RootId,
) -> RepoResult<VersionRoot> {
    repo.get_root(root_id)?
        .ok_or(RepoError::RootNotFound(root_id))
}

/// Loads a version or fails with [`RepoError::VersionNotFound`].
pub fn require_version<R: VersionRepository + ?Sized>(
    repo: &R,
    version_id: VersionId,
) -> RepoResult<Version> {
    repo.get_version(version_id)?
        .ok_or(RepoError::VersionNotFound(version_id))
}

fn parse_version_row(row: &Row<'_>) -> RepoResult<Version> {
    let version_text: String = row.get("version_id")?;
    let root_text: String = row.get("root_id")?;
    let base_version_id = row
        .get::<_, Option<String>>("base_version_id")?
        .map(|value| parse_uuid(&value, "versions.base_version_id"))
        .transpose()?;

    Ok(Version {
        version_id: parse_uuid(&version_text, "versions.version_id")?,
        root_id: parse_uuid(&root_text, "versions.root_id")?,
        seq: row.get("seq")?,
        number: VersionNumber {
            major: row.get("version_major")?,
            minor: row.get("version_minor")?,
        },
        base_version_id,
        created_by: row.get("created_by")?,
        created_at: row.get("created_at")?,
        modified_by: row.get("modified_by")?,
        modified_at: row.get("modified_at")?,
    })
}

fn parse_chain_row(row: &Row<'_>) -> RepoResult<ChainEntry> {
    let version_text: String = row.get("version_id")?;
    let language_text: String = row.get("language")?;
    let status_text: String = row.get("status")?;
    let translation_order_id = row
        .get::<_, Option<String>>("translation_order_id")?
        .map(|value| parse_uuid(&value, "language_availabilities.translation_order_id"))
        .transpose()?;

    Ok(ChainEntry {
        seq: row.get("seq")?,
        availability: LanguageAvailability {
            version_id: parse_uuid(&version_text, "language_availabilities.version_id")?,
            language: parse_language(&language_text, "language_availabilities.language")?,
            status: parse_status(&status_text, "language_availabilities.status")?,
            valid_from: row.get("valid_from")?,
            valid_to: row.get("valid_to")?,
            last_reviewed_at: row.get("last_reviewed_at")?,
            modified_by: row.get("modified_by")?,
            modified_at: row.get("modified_at")?,
            row_stamp: row.get("row_stamp")?,
            translation_order_id,
        },
    })
}

fn parse_content_row(row: &Row<'_>) -> RepoResult<(LanguageCode, LanguageContent)> {
    let language_text: String = row.get("language")?;
    let extra_text: String = row.get("extra_json")?;
    let extra = serde_json::from_str(&extra_text).map_err(|err| {
        RepoError::InvalidData(format!("invalid language_content.extra_json: {err}"))
    })?;

    Ok((
        parse_language(&language_text, "language_content.language")?,
        LanguageContent {
            name: row.get("name")?,
            short_description: row.get("short_description")?,
            description: row.get("description")?,
            extra,
        },
    ))
}

fn parse_status(value: &str, column: &'static str) -> RepoResult<PublishingStatus> {
    PublishingStatus::parse(value)
        .ok_or_else(|| RepoError::InvalidData(format!("invalid status `{value}` in {column}")))
}
