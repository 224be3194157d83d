//! Per-language content payload and field validation.
//!
//! # Responsibility
//! - Carry the translatable text fields of one (version, language) slice.
//! - Report every missing/invalid field at once as a structured list.
//!
//! # Invariants
//! - Validation never short-circuits on the first issue.
//! - Blank (whitespace-only) values count as missing.

use crate::model::language::LanguageCode;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Text fields of one language slice of a version.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LanguageContent {
    pub name: String,
    pub short_description: String,
    pub description: String,
    /// Domain-specific fields carried opaquely by the core.
    pub extra: BTreeMap<String, String>,
}

impl LanguageContent {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_short_description(mut self, value: impl Into<String>) -> Self {
        self.short_description = value.into();
        self
    }

    pub fn with_description(mut self, value: impl Into<String>) -> Self {
        self.description = value.into();
        self
    }

    fn field(&self, field: ContentField) -> &str {
        match field {
            ContentField::Name => &self.name,
            ContentField::ShortDescription => &self.short_description,
            ContentField::Description => &self.description,
        }
    }

    /// Validates this slice against `rules`, collecting every issue.
    pub fn validate(
        &self,
        language: &LanguageCode,
        rules: &FieldRules,
    ) -> Result<(), ValidationError> {
        let mut issues = Vec::new();
        for field in ContentField::ALL {
            let value = self.field(field);
            if rules.mandatory.contains(&field) && value.trim().is_empty() {
                issues.push(FieldIssue::new(field.as_str(), FieldProblem::Missing));
                continue;
            }
            let max = rules.max_chars(field);
            let actual = value.chars().count();
            if actual > max {
                issues.push(FieldIssue::new(
                    field.as_str(),
                    FieldProblem::TooLong { max, actual },
                ));
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::for_language(language.clone(), issues))
        }
    }
}

/// Named text fields subject to validation rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentField {
    Name,
    ShortDescription,
    Description,
}

impl ContentField {
    pub const ALL: [ContentField; 3] = [
        ContentField::Name,
        ContentField::ShortDescription,
        ContentField::Description,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::ShortDescription => "short_description",
            Self::Description => "description",
        }
    }
}

/// Mandatory-field and length rules for one entity kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldRules {
    pub mandatory: Vec<ContentField>,
    pub max_name_chars: usize,
    pub max_short_description_chars: usize,
    pub max_description_chars: usize,
}

impl FieldRules {
    pub fn max_chars(&self, field: ContentField) -> usize {
        match field {
            ContentField::Name => self.max_name_chars,
            ContentField::ShortDescription => self.max_short_description_chars,
            ContentField::Description => self.max_description_chars,
        }
    }

    pub fn with_mandatory(mandatory: &[ContentField]) -> Self {
        Self {
            mandatory: mandatory.to_vec(),
            ..Self::default()
        }
    }
}

impl Default for FieldRules {
    fn default() -> Self {
        Self {
            mandatory: vec![ContentField::Name],
            max_name_chars: 100,
            max_short_description_chars: 150,
            max_description_chars: 2500,
        }
    }
}

/// Problem detected on one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "problem", rename_all = "snake_case")]
pub enum FieldProblem {
    Missing,
    TooLong { max: usize, actual: usize },
    Unsupported { value: String },
    Duplicate { value: String },
    Invalid { reason: String },
}

/// One field-level validation issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldIssue {
    pub field: String,
    #[serde(flatten)]
    pub problem: FieldProblem,
}

impl FieldIssue {
    pub fn new(field: impl Into<String>, problem: FieldProblem) -> Self {
        Self {
            field: field.into(),
            problem,
        }
    }
}

/// Structured validation failure, optionally scoped to one language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    pub language: Option<LanguageCode>,
    pub issues: Vec<FieldIssue>,
}

impl ValidationError {
    pub fn for_language(language: LanguageCode, issues: Vec<FieldIssue>) -> Self {
        Self {
            language: Some(language),
            issues,
        }
    }

    pub fn general(issues: Vec<FieldIssue>) -> Self {
        Self {
            language: None,
            issues,
        }
    }

    /// Field names reported as missing.
    pub fn missing_fields(&self) -> Vec<&str> {
        self.issues
            .iter()
            .filter(|issue| issue.problem == FieldProblem::Missing)
            .map(|issue| issue.field.as_str())
            .collect()
    }
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let fields = self
            .issues
            .iter()
            .map(|issue| issue.field.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        match &self.language {
            Some(language) => write!(f, "validation failed for `{language}`: {fields}"),
            None => write!(f, "validation failed: {fields}"),
        }
    }
}

impl Error for ValidationError {}
