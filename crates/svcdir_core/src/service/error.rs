//! Service-level error taxonomy.
//!
//! # Invariants
//! - Every service failure maps to exactly one [`ErrorKind`].
//! - Only `InvalidTransition` and `Storage` are fatal; the rest are expected
//!   outcomes callers can act on.

use crate::model::content::ValidationError;
use crate::model::entity::VersionId;
use crate::model::language::LanguageCode;
use crate::repo::RepoError;
use log::{error, info};
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type CoreResult<T> = Result<T, CoreError>;

/// Stable error category exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    ConcurrencyConflict,
    InvalidTransition,
    TranslationGateBlocked,
    NotFound,
    Storage,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::ConcurrencyConflict => "concurrency_conflict",
            Self::InvalidTransition => "invalid_transition",
            Self::TranslationGateBlocked => "translation_gate_blocked",
            Self::NotFound => "not_found",
            Self::Storage => "storage",
        }
    }
}

/// Error returned by core use-case services.
#[derive(Debug)]
pub enum CoreError {
    /// Input or stored content failed validation; lists every issue.
    Validation(ValidationError),
    /// The record changed since the caller read it.
    ConcurrencyConflict {
        version_id: VersionId,
        language: LanguageCode,
    },
    /// Requested status change is not allowed from the current state.
    InvalidTransition(String),
    /// An outstanding translation or live content blocks the operation.
    TranslationGateBlocked {
        language: LanguageCode,
        reason: String,
    },
    NotFound(String),
    Storage(RepoError),
}

impl CoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::ConcurrencyConflict { .. } => ErrorKind::ConcurrencyConflict,
            Self::InvalidTransition(_) => ErrorKind::InvalidTransition,
            Self::TranslationGateBlocked { .. } => ErrorKind::TranslationGateBlocked,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Storage(_) => ErrorKind::Storage,
        }
    }

    /// Whether this error signals a defect or infrastructure failure.
    pub fn is_fatal(&self) -> bool {
        matches!(self.kind(), ErrorKind::InvalidTransition | ErrorKind::Storage)
    }

    pub(crate) fn invalid_transition(message: impl Into<String>) -> Self {
        Self::InvalidTransition(message.into())
    }

    pub(crate) fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }
}

impl Display for CoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::ConcurrencyConflict {
                version_id,
                language,
            } => write!(
                f,
                "language `{language}` on version {version_id} was changed by another writer"
            ),
            Self::InvalidTransition(message) => write!(f, "invalid transition: {message}"),
            Self::TranslationGateBlocked { language, reason } => {
                write!(f, "translation gate blocked for `{language}`: {reason}")
            }
            Self::NotFound(message) => write!(f, "not found: {message}"),
            Self::Storage(err) => write!(f, "storage failure: {err}"),
        }
    }
}

impl Error for CoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Storage(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for CoreError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<RepoError> for CoreError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::RootNotFound(id) => Self::NotFound(format!("root {id}")),
            RepoError::VersionNotFound(id) => Self::NotFound(format!("version {id}")),
            RepoError::OrderNotFound(id) => Self::NotFound(format!("translation order {id}")),
            RepoError::AvailabilityNotFound {
                version_id,
                language,
            } => Self::NotFound(format!("language `{language}` on version {version_id}")),
            RepoError::StaleWrite {
                version_id,
                language,
                ..
            } => Self::ConcurrencyConflict {
                version_id,
                language,
            },
            other => Self::Storage(other),
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Storage(RepoError::from(value))
    }
}

/// Logs a failed operation at a level matching its severity.
pub(crate) fn log_failure(event: &str, module: &str, err: &CoreError) {
    if err.is_fatal() {
        error!(
            "event={event} module={module} status=error kind={} error={err}",
            err.kind().as_str()
        );
    } else {
        info!(
            "event={event} module={module} status=rejected kind={}",
            err.kind().as_str()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::{CoreError, ErrorKind};
    use crate::model::content::ValidationError;
    use crate::model::language::LanguageCode;
    use crate::repo::RepoError;
    use uuid::Uuid;

    #[test]
    fn stale_write_maps_to_concurrency_conflict() {
        let err = CoreError::from(RepoError::StaleWrite {
            version_id: Uuid::new_v4(),
            language: LanguageCode::parse("fi").unwrap(),
            expected_stamp: 3,
        });
        assert_eq!(err.kind(), ErrorKind::ConcurrencyConflict);
        assert!(!err.is_fatal());
    }

    #[test]
    fn missing_rows_map_to_not_found() {
        let err = CoreError::from(RepoError::VersionNotFound(Uuid::new_v4()));
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn only_defects_and_storage_are_fatal() {
        assert!(CoreError::invalid_transition("deleted is terminal").is_fatal());
        assert!(CoreError::Storage(RepoError::InvalidData("x".to_string())).is_fatal());
        assert!(!CoreError::Validation(ValidationError::general(Vec::new())).is_fatal());
        assert!(!CoreError::not_found("root").is_fatal());
    }
}
