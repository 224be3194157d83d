//! Repository contracts and SQLite implementations.
//!
//! # Responsibility
//! - Keep SQL details inside the persistence boundary.
//! - Map rows to typed model values with explicit conversion functions.
//!
//! # Invariants
//! - Read paths reject invalid persisted data instead of masking it.
//! - Availability writes are guarded by `row_stamp`; a guarded write that
//!   matches no row fails with [`RepoError::StaleWrite`].
//! - Repositories never open transactions themselves; callers pass a
//!   connection that is already inside the transaction they want.

use crate::db::DbError;
use crate::model::entity::{RootId, VersionId};
use crate::model::language::LanguageCode;
use crate::model::translation::TranslationOrderId;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub mod translation_repo;
pub mod version_repo;

pub type RepoResult<T> = Result<T, RepoError>;

/// Persistence-layer error.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    RootNotFound(RootId),
    VersionNotFound(VersionId),
    OrderNotFound(TranslationOrderId),
    AvailabilityNotFound {
        version_id: VersionId,
        language: LanguageCode,
    },
    /// Guarded write found a different `row_stamp` than expected.
    StaleWrite {
        version_id: VersionId,
        language: LanguageCode,
        expected_stamp: i64,
    },
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::RootNotFound(id) => write!(f, "root not found: {id}"),
            Self::VersionNotFound(id) => write!(f, "version not found: {id}"),
            Self::OrderNotFound(id) => write!(f, "translation order not found: {id}"),
            Self::AvailabilityNotFound {
                version_id,
                language,
            } => write!(
                f,
                "language `{language}` not found on version {version_id}"
            ),
            Self::StaleWrite {
                version_id,
                language,
                expected_stamp,
            } => write!(
                f,
                "stale write on version {version_id} language `{language}` (expected stamp {expected_stamp})"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

pub(crate) fn parse_uuid(value: &str, column: &'static str) -> RepoResult<Uuid> {
    match Uuid::parse_str(value) {
        Ok(id) if !id.is_nil() => Ok(id),
        _ => Err(RepoError::InvalidData(format!(
            "invalid uuid `{value}` in {column}"
        ))),
    }
}

pub(crate) fn parse_language(value: &str, column: &'static str) -> RepoResult<LanguageCode> {
    LanguageCode::parse(value).map_err(|_| {
        RepoError::InvalidData(format!("invalid language code `{value}` in {column}"))
    })
}

#[cfg(test)]
mod tests {
    use super::{parse_language, parse_uuid, RepoError};
    use uuid::Uuid;

    #[test]
    fn parse_uuid_rejects_nil_and_garbage() {
        let id = Uuid::new_v4();
        assert_eq!(parse_uuid(&id.to_string(), "versions.version_id").unwrap(), id);
        assert!(matches!(
            parse_uuid(&Uuid::nil().to_string(), "versions.version_id"),
            Err(RepoError::InvalidData(_))
        ));
        assert!(matches!(
            parse_uuid("not-a-uuid", "versions.version_id"),
            Err(RepoError::InvalidData(message)) if message.contains("versions.version_id")
        ));
    }

    #[test]
    fn parse_language_normalizes_stored_codes() {
        assert_eq!(parse_language("FI", "languages.code").unwrap().as_str(), "fi");
        assert!(parse_language("finnish", "languages.code").is_err());
    }
}
