//! Supported-language lookup service.
//!
//! # Responsibility
//! - Hold a read-only snapshot of the `languages` lookup table.
//! - Validate language membership for the versioning and translation paths.
//!
//! # Invariants
//! - Readers always observe one complete snapshot.
//! - `refresh` swaps the snapshot atomically and bumps `generation`.
//! - Callers refresh after changing the `languages` table; nothing reloads
//!   implicitly.

use crate::model::content::{FieldIssue, FieldProblem, ValidationError};
use crate::model::language::LanguageCode;
use crate::repo::{parse_language, RepoResult};
use log::info;
use rusqlite::Connection;
use std::sync::{Arc, RwLock};

#[derive(Debug)]
struct LanguageSnapshot {
    generation: u64,
    /// Active codes in display order.
    languages: Vec<LanguageCode>,
}

/// Injected cache over the supported-language table.
#[derive(Debug)]
pub struct LanguageLookup {
    snapshot: RwLock<Arc<LanguageSnapshot>>,
}

impl LanguageLookup {
    /// Builds the lookup from the active rows of `languages`.
    pub fn load(conn: &Connection) -> RepoResult<Self> {
        let languages = read_languages(conn)?;
        info!(
            "event=lookup_load module=lookup status=ok languages={} generation=1",
            languages.len()
        );
        Ok(Self {
            snapshot: RwLock::new(Arc::new(LanguageSnapshot {
                generation: 1,
                languages,
            })),
        })
    }

    /// Re-reads the table and swaps in a new snapshot.
    ///
    /// Returns the new generation.
    pub fn refresh(&self, conn: &Connection) -> RepoResult<u64> {
        let languages = read_languages(conn)?;
        let mut guard = self
            .snapshot
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let generation = guard.generation + 1;
        let count = languages.len();
        *guard = Arc::new(LanguageSnapshot {
            generation,
            languages,
        });
        info!(
            "event=lookup_refresh module=lookup status=ok languages={count} generation={generation}"
        );
        Ok(generation)
    }

    pub fn is_supported(&self, language: &LanguageCode) -> bool {
        self.current().languages.contains(language)
    }

    /// Parses `raw` and checks it against the supported set.
    pub fn parse(&self, raw: &str) -> Result<LanguageCode, ValidationError> {
        let unsupported = || {
            ValidationError::general(vec![FieldIssue::new(
                "language",
                FieldProblem::Unsupported {
                    value: raw.to_string(),
                },
            )])
        };
        let language = LanguageCode::parse(raw).map_err(|_| unsupported())?;
        if !self.is_supported(&language) {
            return Err(unsupported());
        }
        Ok(language)
    }

    /// Supported codes in display order.
    pub fn languages(&self) -> Vec<LanguageCode> {
        self.current().languages.clone()
    }

    pub fn generation(&self) -> u64 {
        self.current().generation
    }

    fn current(&self) -> Arc<LanguageSnapshot> {
        let guard = self
            .snapshot
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(&guard)
    }
}

fn read_languages(conn: &Connection) -> RepoResult<Vec<LanguageCode>> {
    let mut stmt = conn.prepare(
        "SELECT code
         FROM languages
         WHERE is_active = 1
         ORDER BY display_order ASC, code ASC;",
    )?;
    let mut rows = stmt.query([])?;
    let mut languages = Vec::new();
    while let Some(row) = rows.next()? {
        let code: String = row.get(0)?;
        languages.push(parse_language(&code, "languages.code")?);
    }
    Ok(languages)
}

#[cfg(test)]
mod tests {
    use super::LanguageLookup;
    use crate::db::open_db_in_memory;
    use crate::model::content::FieldProblem;

    #[test]
    fn seeded_languages_load_in_display_order() {
        let conn = open_db_in_memory().unwrap();
        let lookup = LanguageLookup::load(&conn).unwrap();
        let codes = lookup
            .languages()
            .iter()
            .map(|code| code.as_str().to_string())
            .collect::<Vec<_>>();
        assert_eq!(codes, vec!["fi", "sv", "en", "se", "smn", "sms"]);
        assert_eq!(lookup.generation(), 1);
    }

    #[test]
    fn parse_rejects_unknown_codes_as_validation_error() {
        let conn = open_db_in_memory().unwrap();
        let lookup = LanguageLookup::load(&conn).unwrap();
        assert_eq!(lookup.parse(" SV ").unwrap().as_str(), "sv");

        let err = lookup.parse("de").unwrap_err();
        assert_eq!(
            err.issues[0].problem,
            FieldProblem::Unsupported {
                value: "de".to_string()
            }
        );
        assert!(lookup.parse("not-a-code").is_err());
    }

    #[test]
    fn refresh_picks_up_table_changes() {
        let conn = open_db_in_memory().unwrap();
        let lookup = LanguageLookup::load(&conn).unwrap();
        conn.execute(
            "INSERT INTO languages (code, display_order) VALUES ('de', 6);",
            [],
        )
        .unwrap();
        conn.execute("UPDATE languages SET is_active = 0 WHERE code = 'sms';", [])
            .unwrap();

        let de = crate::model::language::LanguageCode::parse("de").unwrap();
        assert!(!lookup.is_supported(&de));

        assert_eq!(lookup.refresh(&conn).unwrap(), 2);
        assert!(lookup.is_supported(&de));
        assert!(lookup.parse("sms").is_err());
        assert_eq!(lookup.generation(), 2);
    }
}
