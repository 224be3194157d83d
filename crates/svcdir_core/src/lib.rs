//! Versioned, multi-language publishing core for the service directory.
//! This crate is the single source of truth for publishing invariants.

pub mod clock;
pub mod config;
pub mod db;
pub mod logging;
pub mod lookup;
pub mod model;
pub mod repo;
pub mod service;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{ConfigError, CoreConfig};
pub use db::{open_db, open_db_in_memory, DbError};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use lookup::LanguageLookup;
pub use model::availability::LanguageAvailability;
pub use model::content::{ContentField, FieldIssue, FieldProblem, LanguageContent, ValidationError};
pub use model::entity::{EntityKind, RootId, VersionId};
pub use model::language::LanguageCode;
pub use model::status::{DisplayStatus, PublishingStatus};
pub use model::translation::{TranslationOrder, TranslationOrderId, TranslationState};
pub use model::version::{Version, VersionNumber, VersionRoot};
pub use repo::version_repo::StatusTransitionRecord;
pub use service::error::{CoreError, CoreResult, ErrorKind};
pub use service::publishing_service::{
    JobReport, LanguageOutcome, PublishRequest, PublishingService, TransitionEvent,
    TransitionObserver, TransitionResult,
};
pub use service::selection_service::{Resolution, ResolvedVersion, SelectionService, ViewerContext};
pub use service::translation_service::{
    DeliveryOutcome, DeliveryReport, LanguageDelivery, TranslationRequest, TranslationService,
};
pub use service::versioning_service::VersioningService;
pub use service::ServiceContext;

/// Minimal health-check API.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
