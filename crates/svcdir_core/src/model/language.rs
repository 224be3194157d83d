//! Language code value type.
//!
//! # Invariants
//! - Codes are lowercase ISO 639 style identifiers of 2 or 3 ASCII letters.
//! - Shape is checked here; membership in the supported set is checked by
//!   [`crate::lookup::LanguageLookup`].

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

static LANGUAGE_CODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z]{2,3}$").expect("valid language code regex"));

/// Normalized language code such as `fi`, `sv` or `smn`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct LanguageCode(String);

impl LanguageCode {
    /// Parses and normalizes a language code (trim + lowercase).
    pub fn parse(value: &str) -> Result<Self, LanguageCodeError> {
        let normalized = value.trim().to_ascii_lowercase();
        if normalized.is_empty() {
            return Err(LanguageCodeError::Empty);
        }
        if !LANGUAGE_CODE_RE.is_match(&normalized) {
            return Err(LanguageCodeError::Malformed(value.to_string()));
        }
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for LanguageCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for LanguageCode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Language code parse errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LanguageCodeError {
    Empty,
    Malformed(String),
}

impl Display for LanguageCodeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "language code cannot be empty"),
            Self::Malformed(value) => {
                write!(f, "language code `{value}` must be 2-3 lowercase letters")
            }
        }
    }
}

impl Error for LanguageCodeError {}
