//! Core configuration.
//!
//! # Responsibility
//! - Describe storage location, logging settings, publishing policy and
//!   per-entity-kind content rules.
//! - Load them from a JSON document with defaults for omitted keys.
//!
//! # Invariants
//! - A config returned by [`CoreConfig::load`] or
//!   [`CoreConfig::from_json_str`] has passed [`CoreConfig::validate`].

use crate::model::content::{ContentField, FieldRules};
use crate::model::entity::EntityKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

const DAY_MS: i64 = 24 * 60 * 60 * 1000;
/// Upper bound for `archive_review_window_days` (100 years).
pub const MAX_REVIEW_WINDOW_DAYS: i64 = 36_500;

/// Top-level configuration document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// SQLite database file.
    pub database_path: PathBuf,
    /// One of `trace|debug|info|warn|error`.
    pub log_level: String,
    /// Absolute directory for rolling log files. Logging stays off when unset.
    pub log_dir: Option<PathBuf>,
    pub publishing: PublishingPolicy,
    pub validation: ValidationConfig,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("svcdir.sqlite3"),
            log_level: crate::logging::default_log_level().to_string(),
            log_dir: None,
            publishing: PublishingPolicy::default(),
            validation: ValidationConfig::default(),
        }
    }
}

impl CoreConfig {
    /// Reads and validates a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|err| ConfigError::Io {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
        Self::from_json_str(&raw)
    }

    /// Parses and validates a JSON config document.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(raw).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("database_path cannot be empty".to_string()));
        }
        if !(0..=MAX_REVIEW_WINDOW_DAYS).contains(&self.publishing.archive_review_window_days) {
            return Err(ConfigError::Invalid(format!(
                "publishing.archive_review_window_days must be between 0 and {MAX_REVIEW_WINDOW_DAYS}"
            )));
        }
        for (kind, rules) in &self.validation.rules {
            if !rules.mandatory.contains(&ContentField::Name) {
                return Err(ConfigError::Invalid(format!(
                    "validation.rules.{}: `name` must stay mandatory",
                    kind.as_str()
                )));
            }
            for field in ContentField::ALL {
                if rules.max_chars(field) == 0 {
                    return Err(ConfigError::Invalid(format!(
                        "validation.rules.{}: max length of `{}` must be > 0",
                        kind.as_str(),
                        field.as_str()
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Scheduling and archiving policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PublishingPolicy {
    /// Expired publications reviewed within this many days are not archived.
    pub archive_review_window_days: i64,
}

impl PublishingPolicy {
    pub fn review_window_ms(&self) -> i64 {
        self.archive_review_window_days.saturating_mul(DAY_MS)
    }
}

impl Default for PublishingPolicy {
    fn default() -> Self {
        Self {
            archive_review_window_days: 30,
        }
    }
}

/// Content rules keyed by entity kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    pub rules: BTreeMap<EntityKind, FieldRules>,
}

impl ValidationConfig {
    /// Rules for `kind`, falling back to [`FieldRules::default`].
    pub fn rules_for(&self, kind: EntityKind) -> FieldRules {
        self.rules.get(&kind).cloned().unwrap_or_default()
    }
}

impl Default for ValidationConfig {
    fn default() -> Self {
        let mut rules = BTreeMap::new();
        rules.insert(
            EntityKind::Service,
            FieldRules::with_mandatory(&ContentField::ALL),
        );
        rules.insert(
            EntityKind::GeneralDescription,
            FieldRules::with_mandatory(&ContentField::ALL),
        );
        rules.insert(
            EntityKind::ServiceChannel,
            FieldRules::with_mandatory(&[ContentField::Name, ContentField::ShortDescription]),
        );
        rules.insert(
            EntityKind::Organization,
            FieldRules::with_mandatory(&[ContentField::Name]),
        );
        Self { rules }
    }
}

/// Configuration load/validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Io { path: PathBuf, message: String },
    Parse(String),
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, message } => {
                write!(f, "failed to read config `{}`: {message}", path.display())
            }
            Self::Parse(message) => write!(f, "invalid config document: {message}"),
            Self::Invalid(message) => write!(f, "invalid config value: {message}"),
        }
    }
}

impl Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::{ConfigError, CoreConfig, PublishingPolicy, MAX_REVIEW_WINDOW_DAYS};
    use crate::model::content::ContentField;
    use crate::model::entity::EntityKind;

    #[test]
    fn empty_document_yields_defaults() {
        let config = CoreConfig::from_json_str("{}").expect("defaults should validate");
        assert_eq!(config, CoreConfig::default());
        assert_eq!(config.publishing.archive_review_window_days, 30);
    }

    #[test]
    fn service_rules_require_all_text_fields_by_default() {
        let config = CoreConfig::default();
        let rules = config.validation.rules_for(EntityKind::Service);
        assert_eq!(rules.mandatory, ContentField::ALL.to_vec());
    }

    #[test]
    fn partial_override_keeps_other_sections() {
        let config = CoreConfig::from_json_str(
            r#"{"publishing": {"archive_review_window_days": 7}, "log_level": "warn"}"#,
        )
        .unwrap();
        assert_eq!(config.publishing.archive_review_window_days, 7);
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.validation, CoreConfig::default().validation);
    }

    #[test]
    fn rules_without_mandatory_name_are_rejected() {
        let err = CoreConfig::from_json_str(
            r#"{"validation": {"rules": {"organization": {"mandatory": []}}}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(message) if message.contains("name")));
    }

    #[test]
    fn review_window_is_bounded() {
        let err = CoreConfig::from_json_str(
            r#"{"publishing": {"archive_review_window_days": 9223372036854775807}}"#,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid(message) if message.contains("archive_review_window_days")
        ));

        let config = CoreConfig::from_json_str(&format!(
            r#"{{"publishing": {{"archive_review_window_days": {MAX_REVIEW_WINDOW_DAYS}}}}}"#
        ))
        .unwrap();
        assert_eq!(
            config.publishing.review_window_ms(),
            MAX_REVIEW_WINDOW_DAYS * 24 * 60 * 60 * 1000
        );

        let unchecked = PublishingPolicy {
            archive_review_window_days: i64::MAX,
        };
        assert_eq!(unchecked.review_window_ms(), i64::MAX);
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        assert!(matches!(
            CoreConfig::from_json_str("{"),
            Err(ConfigError::Parse(_))
        ));
    }
}
