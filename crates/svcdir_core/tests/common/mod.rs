#![allow(dead_code)]

use rusqlite::Connection;
use std::sync::Arc;
use svcdir_core::{
    open_db_in_memory, CoreConfig, EntityKind, FixedClock, LanguageCode, LanguageContent,
    PublishRequest, PublishingService, RootId, ServiceContext, VersionId, VersioningService,
};

pub const EDITOR: &str = "editor@example.fi";
pub const T0: i64 = 1_700_000_000_000;

pub struct Fixture {
    pub conn: Connection,
    pub ctx: ServiceContext,
    pub clock: Arc<FixedClock>,
}

impl Fixture {
    pub fn new() -> Self {
        let conn = open_db_in_memory().unwrap();
        Self::on(conn)
    }

    pub fn on(conn: Connection) -> Self {
        let clock = Arc::new(FixedClock::new(T0));
        let ctx = ServiceContext::bootstrap(&conn, CoreConfig::default())
            .unwrap()
            .with_clock(clock.clone());
        Self { conn, ctx, clock }
    }

    pub fn versioning(&self) -> VersioningService<'_> {
        VersioningService::new(&self.conn, self.ctx.clone())
    }

    pub fn publishing(&self) -> PublishingService<'_> {
        PublishingService::new(&self.conn, self.ctx.clone())
    }

    pub fn service_root(&self) -> RootId {
        self.versioning()
            .create_root(EntityKind::Service, EDITOR)
            .unwrap()
    }

    /// Head version of a new service root with content in `languages`.
    pub fn drafted(&self, languages: &[&str]) -> (RootId, VersionId) {
        let root_id = self.service_root();
        let version_id = self
            .versioning()
            .create_draft_version(root_id, None, EDITOR)
            .unwrap();
        for code in languages {
            self.versioning()
                .set_language_content(version_id, &lang(code), &content(code), EDITOR)
                .unwrap();
        }
        (root_id, version_id)
    }

    pub fn publish_now(&self, version_id: VersionId, languages: &[&str]) {
        let request = PublishRequest::new(
            version_id,
            languages.iter().map(|code| lang(code)).collect(),
            EDITOR,
        );
        let result = self.publishing().request_publish(&request).unwrap();
        assert!(result.success(), "publish failed: {:?}", result.failures());
    }
}

pub fn lang(code: &str) -> LanguageCode {
    LanguageCode::parse(code).unwrap()
}

/// Content passing the default service rules.
pub fn content(tag: &str) -> LanguageContent {
    LanguageContent::new(format!("Service {tag}"))
        .with_short_description(format!("Short {tag}"))
        .with_description(format!("Description {tag}"))
}
