//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into the versioning, publishing,
//!   selection and translation use-cases.
//! - Own transaction scope: every mutating call runs in one
//!   `BEGIN IMMEDIATE` transaction on the service's connection.
//!
//! # Invariants
//! - Only the publishing and translation services change availability
//!   status; versioning only creates records and edits editable ones.

use crate::clock::{Clock, SystemClock};
use crate::config::CoreConfig;
use crate::lookup::LanguageLookup;
use crate::repo::RepoResult;
use rusqlite::Connection;
use std::sync::Arc;

mod chain;
pub mod error;
pub mod publishing_service;
pub mod selection_service;
pub mod translation_service;
pub mod versioning_service;

/// Shared collaborators injected into every service.
#[derive(Clone)]
pub struct ServiceContext {
    pub lookup: Arc<LanguageLookup>,
    pub config: Arc<CoreConfig>,
    pub clock: Arc<dyn Clock>,
}

impl ServiceContext {
    pub fn new(
        lookup: Arc<LanguageLookup>,
        config: Arc<CoreConfig>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            lookup,
            config,
            clock,
        }
    }

    /// Loads the language lookup from `conn` and uses the wall clock.
    pub fn bootstrap(conn: &Connection, config: CoreConfig) -> RepoResult<Self> {
        Ok(Self::new(
            Arc::new(LanguageLookup::load(conn)?),
            Arc::new(config),
            Arc::new(SystemClock),
        ))
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}
