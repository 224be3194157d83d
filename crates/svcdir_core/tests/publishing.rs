mod common;

use common::{content, lang, Fixture, EDITOR, T0};
use std::sync::{Arc, Mutex};
use svcdir_core::{
    open_db, DisplayStatus, ErrorKind, LanguageOutcome, PublishRequest, PublishingStatus,
    RootId, SelectionService, TransitionEvent, TransitionObserver, ViewerContext,
};

const DAY_MS: i64 = 24 * 60 * 60 * 1000;

fn published_count(fx: &Fixture, root_id: RootId, code: &str) -> i64 {
    fx.conn
        .query_row(
            "SELECT COUNT(*) FROM language_availabilities
             WHERE root_id = ?1 AND language = ?2 AND status = 'published';",
            rusqlite::params![root_id.to_string(), code],
            |row| row.get(0),
        )
        .unwrap()
}

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<TransitionEvent>>,
}

impl TransitionObserver for Recorder {
    fn on_transition(&self, event: &TransitionEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

#[test]
fn first_publish_renumbers_and_goes_live_now() {
    let fx = Fixture::new();
    let (root_id, v1) = fx.drafted(&["fi"]);

    let request = PublishRequest::new(v1, vec![lang("fi")], EDITOR);
    let result = fx.publishing().request_publish(&request).unwrap();

    assert!(result.success());
    match result.outcome(&lang("fi")) {
        Some(LanguageOutcome::Published {
            valid_from,
            demoted,
            ..
        }) => {
            assert_eq!(*valid_from, T0);
            assert_eq!(*demoted, None);
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(fx.versioning().get_version(v1).unwrap().number.to_string(), "1.0");
    assert_eq!(published_count(&fx, root_id, "fi"), 1);
}

#[test]
fn publishing_new_version_demotes_previous_one() {
    let fx = Fixture::new();
    let (root_id, v1) = fx.drafted(&["fi"]);
    fx.publish_now(v1, &["fi"]);

    let v2 = fx
        .versioning()
        .edit_language_content(root_id, &lang("fi"), &content("fi v2"), EDITOR)
        .unwrap();
    assert_eq!(
        fx.versioning()
            .language_availability(v2, &lang("fi"))
            .unwrap()
            .unwrap()
            .status,
        PublishingStatus::Modified
    );

    fx.clock.advance(1_000);
    let result = fx
        .publishing()
        .request_publish(&PublishRequest::new(v2, vec![lang("fi")], EDITOR))
        .unwrap();
    assert!(matches!(
        result.outcome(&lang("fi")),
        Some(LanguageOutcome::Published { demoted: Some(id), .. }) if *id == v1
    ));

    let old = fx
        .versioning()
        .language_availability(v1, &lang("fi"))
        .unwrap()
        .unwrap();
    assert_eq!(old.status, PublishingStatus::OldPublished);
    assert_eq!(published_count(&fx, root_id, "fi"), 1);
    assert_eq!(fx.versioning().get_version(v2).unwrap().number.to_string(), "2.0");
    assert_eq!(fx.versioning().get_version(v1).unwrap().number.to_string(), "1.0");

    let reasons = fx
        .publishing()
        .history(v1)
        .unwrap()
        .into_iter()
        .map(|record| (record.to_status, record.reason))
        .collect::<Vec<_>>();
    assert_eq!(
        reasons,
        [
            (PublishingStatus::Draft, "content_edited".to_string()),
            (PublishingStatus::Published, "publish_requested".to_string()),
            (PublishingStatus::OldPublished, "superseded".to_string()),
        ]
    );
}

#[test]
fn republishing_published_language_is_unchanged() {
    let fx = Fixture::new();
    let (_, v1) = fx.drafted(&["fi"]);
    fx.publish_now(v1, &["fi"]);
    let before = fx.publishing().history(v1).unwrap().len();

    let result = fx
        .publishing()
        .request_publish(&PublishRequest::new(v1, vec![lang("fi")], EDITOR))
        .unwrap();

    assert!(matches!(
        result.outcome(&lang("fi")),
        Some(LanguageOutcome::Unchanged)
    ));
    assert_eq!(fx.publishing().history(v1).unwrap().len(), before);
}

#[test]
fn batch_reports_each_language_separately() {
    let fx = Fixture::new();
    let (_, v1) = fx.drafted(&["fi"]);

    let request = PublishRequest::new(v1, vec![lang("fi"), lang("sv"), lang("de")], EDITOR);
    let result = fx.publishing().request_publish(&request).unwrap();

    assert!(!result.success());
    assert!(matches!(
        result.outcome(&lang("fi")),
        Some(LanguageOutcome::Published { .. })
    ));
    let failures = result
        .failures()
        .into_iter()
        .map(|(language, err)| (language.to_string(), err.kind()))
        .collect::<Vec<_>>();
    assert_eq!(
        failures,
        [
            ("sv".to_string(), ErrorKind::NotFound),
            ("de".to_string(), ErrorKind::Validation),
        ]
    );
}

#[test]
fn empty_or_repeated_language_list_is_rejected() {
    let fx = Fixture::new();
    let (_, v1) = fx.drafted(&["fi"]);

    let empty = fx
        .publishing()
        .request_publish(&PublishRequest::new(v1, Vec::new(), EDITOR))
        .unwrap_err();
    assert_eq!(empty.kind(), ErrorKind::Validation);

    let repeated = fx
        .publishing()
        .request_publish(&PublishRequest::new(v1, vec![lang("fi"), lang("fi")], EDITOR))
        .unwrap_err();
    assert_eq!(repeated.kind(), ErrorKind::Validation);
}

#[test]
fn stale_stamp_is_a_concurrency_conflict() {
    let fx = Fixture::new();
    let (_, v1) = fx.drafted(&["fi"]);
    let read = fx
        .versioning()
        .language_availability(v1, &lang("fi"))
        .unwrap()
        .unwrap();
    fx.versioning()
        .set_language_content(v1, &lang("fi"), &content("newer"), EDITOR)
        .unwrap();

    let request =
        PublishRequest::new(v1, vec![lang("fi")], EDITOR).expect_stamp(lang("fi"), read.row_stamp);
    let result = fx.publishing().request_publish(&request).unwrap();

    assert_eq!(result.conflicts(), vec![&lang("fi")]);
    let record = fx
        .versioning()
        .language_availability(v1, &lang("fi"))
        .unwrap()
        .unwrap();
    assert_eq!(record.status, PublishingStatus::Draft);
}

#[test]
fn second_writer_on_stale_read_loses() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("svcdir.sqlite3");
    let first = Fixture::on(open_db(&path).unwrap());
    let second = Fixture::on(open_db(&path).unwrap());

    let (root_id, v1) = first.drafted(&["fi"]);
    let stamp_first = first
        .versioning()
        .language_availability(v1, &lang("fi"))
        .unwrap()
        .unwrap()
        .row_stamp;
    let stamp_second = second
        .versioning()
        .language_availability(v1, &lang("fi"))
        .unwrap()
        .unwrap()
        .row_stamp;
    assert_eq!(stamp_first, stamp_second);

    let winner = first
        .publishing()
        .request_publish(
            &PublishRequest::new(v1, vec![lang("fi")], "first").expect_stamp(lang("fi"), stamp_first),
        )
        .unwrap();
    let loser = second
        .publishing()
        .request_publish(
            &PublishRequest::new(v1, vec![lang("fi")], "second")
                .expect_stamp(lang("fi"), stamp_second),
        )
        .unwrap();

    assert!(winner.success());
    assert_eq!(loser.conflicts(), vec![&lang("fi")]);
    assert_eq!(published_count(&second, root_id, "fi"), 1);
}

#[test]
fn scheduled_publish_is_committed_when_due() {
    let fx = Fixture::new();
    let (root_id, v1) = fx.drafted(&["fi"]);
    let at = T0 + 10_000;

    let result = fx
        .publishing()
        .request_publish(&PublishRequest::new(v1, vec![lang("fi")], EDITOR).schedule_at(at))
        .unwrap();
    assert!(matches!(
        result.outcome(&lang("fi")),
        Some(LanguageOutcome::Scheduled { valid_from, .. }) if *valid_from == at
    ));
    let pending = fx
        .versioning()
        .language_availability(v1, &lang("fi"))
        .unwrap()
        .unwrap();
    assert_eq!(pending.status, PublishingStatus::Draft);
    assert_eq!(pending.display_status(T0), DisplayStatus::Scheduled);

    let early = fx.publishing().commit_due_schedules(at - 1).unwrap();
    assert!(early.committed.is_empty());
    assert_eq!(published_count(&fx, root_id, "fi"), 0);

    let due = fx.publishing().commit_due_schedules(at).unwrap();
    assert!(due.is_clean());
    assert_eq!(due.committed.len(), 1);
    assert_eq!(due.committed[0].status, PublishingStatus::Published);

    let live = fx
        .versioning()
        .language_availability(v1, &lang("fi"))
        .unwrap()
        .unwrap();
    assert_eq!(live.status, PublishingStatus::Published);
    assert_eq!(live.valid_from, Some(at));

    let last = fx.publishing().history(v1).unwrap().pop().unwrap();
    assert_eq!(last.actor, "system");
    assert_eq!(last.reason, "scheduled_publish");

    let again = fx.publishing().commit_due_schedules(at + 1).unwrap();
    assert!(again.committed.is_empty());
}

#[test]
fn editing_content_cancels_pending_schedule() {
    let fx = Fixture::new();
    let (_, v1) = fx.drafted(&["fi"]);
    fx.publishing()
        .request_publish(&PublishRequest::new(v1, vec![lang("fi")], EDITOR).schedule_at(T0 + 5_000))
        .unwrap();

    let record = fx
        .versioning()
        .set_language_content(v1, &lang("fi"), &content("rewrite"), EDITOR)
        .unwrap();
    assert_eq!(record.valid_from, None);

    let report = fx.publishing().commit_due_schedules(T0 + 5_000).unwrap();
    assert!(report.committed.is_empty());
}

#[test]
fn scheduling_already_published_language_is_refused() {
    let fx = Fixture::new();
    let (_, v1) = fx.drafted(&["fi"]);
    fx.publish_now(v1, &["fi"]);

    let result = fx
        .publishing()
        .request_publish(&PublishRequest::new(v1, vec![lang("fi")], EDITOR).schedule_at(T0 + 1_000))
        .unwrap();

    let failures = result.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].1.kind(), ErrorKind::InvalidTransition);
}

#[test]
fn superseded_version_cannot_publish_over_newer_one() {
    let fx = Fixture::new();
    let (root_id, v1) = fx.drafted(&["fi", "sv"]);
    fx.publish_now(v1, &["fi"]);
    let v2 = fx
        .versioning()
        .create_draft_version(root_id, None, EDITOR)
        .unwrap();
    fx.publish_now(v2, &["sv"]);

    let result = fx
        .publishing()
        .request_publish(&PublishRequest::new(v1, vec![lang("sv")], EDITOR))
        .unwrap();

    let failures = result.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].1.kind(), ErrorKind::InvalidTransition);
    let v1_sv = fx
        .versioning()
        .language_availability(v1, &lang("sv"))
        .unwrap()
        .unwrap();
    assert_eq!(v1_sv.status, PublishingStatus::Draft);
    let v2_sv = fx
        .versioning()
        .language_availability(v2, &lang("sv"))
        .unwrap()
        .unwrap();
    assert_eq!(v2_sv.status, PublishingStatus::Published);
    assert_eq!(published_count(&fx, root_id, "sv"), 1);

    let public = SelectionService::new(&fx.conn, fx.ctx.clone())
        .resolve_for_viewer(root_id, &lang("sv"), ViewerContext::Public)
        .unwrap();
    assert_eq!(public.available().unwrap().version_id, v2);
}

#[test]
fn superseding_a_version_drops_its_pending_schedules() {
    let fx = Fixture::new();
    let (root_id, v1) = fx.drafted(&["fi", "sv"]);
    fx.publish_now(v1, &["fi"]);
    let at = T0 + 1_000;
    fx.publishing()
        .request_publish(&PublishRequest::new(v1, vec![lang("sv")], EDITOR).schedule_at(at))
        .unwrap();

    let v2 = fx
        .versioning()
        .create_draft_version(root_id, None, EDITOR)
        .unwrap();
    let v1_sv = fx
        .versioning()
        .language_availability(v1, &lang("sv"))
        .unwrap()
        .unwrap();
    assert_eq!(v1_sv.valid_from, None);

    let report = fx.publishing().commit_due_schedules(at).unwrap();
    assert!(report.is_clean());
    assert!(report.committed.is_empty());
    assert_eq!(published_count(&fx, root_id, "sv"), 0);
    let v2_sv = fx
        .versioning()
        .language_availability(v2, &lang("sv"))
        .unwrap()
        .unwrap();
    assert_eq!(v2_sv.status, PublishingStatus::Draft);
    assert_eq!(v2_sv.valid_from, None);
}

#[test]
fn validity_end_before_start_blocks_publish() {
    let fx = Fixture::new();
    let (_, v1) = fx.drafted(&["fi"]);
    fx.publishing()
        .set_validity_end(v1, &lang("fi"), Some(T0 - 1), None, EDITOR)
        .unwrap();

    let result = fx
        .publishing()
        .request_publish(&PublishRequest::new(v1, vec![lang("fi")], EDITOR))
        .unwrap();

    assert_eq!(result.validation_errors().len(), 1);
}

#[test]
fn withdraw_returns_language_to_modified() {
    let fx = Fixture::new();
    let (root_id, v1) = fx.drafted(&["fi"]);
    fx.publish_now(v1, &["fi"]);

    let withdrawn = fx
        .publishing()
        .withdraw(v1, &lang("fi"), None, EDITOR)
        .unwrap();
    assert_eq!(withdrawn.status, PublishingStatus::Modified);
    assert_eq!(withdrawn.valid_from, None);
    assert_eq!(published_count(&fx, root_id, "fi"), 0);

    fx.publish_now(v1, &["fi"]);
    assert_eq!(fx.versioning().get_version(v1).unwrap().number.to_string(), "1.0");
}

#[test]
fn withdraw_is_refused_when_newer_version_carries_language() {
    let fx = Fixture::new();
    let (root_id, v1) = fx.drafted(&["fi"]);
    fx.publish_now(v1, &["fi"]);
    fx.versioning()
        .create_draft_version(root_id, None, EDITOR)
        .unwrap();

    let err = fx
        .publishing()
        .withdraw(v1, &lang("fi"), None, EDITOR)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidTransition);
}

#[test]
fn deleted_language_cannot_be_published_and_delete_is_idempotent() {
    let fx = Fixture::new();
    let (_, v1) = fx.drafted(&["fi"]);

    let first = fx
        .publishing()
        .delete_languages(v1, &[lang("fi")], EDITOR)
        .unwrap();
    assert!(matches!(
        first.outcome(&lang("fi")),
        Some(LanguageOutcome::Deleted { .. })
    ));
    let second = fx
        .publishing()
        .delete_languages(v1, &[lang("fi")], EDITOR)
        .unwrap();
    assert!(matches!(
        second.outcome(&lang("fi")),
        Some(LanguageOutcome::Unchanged)
    ));

    let publish = fx
        .publishing()
        .request_publish(&PublishRequest::new(v1, vec![lang("fi")], EDITOR))
        .unwrap();
    assert_eq!(publish.failures()[0].1.kind(), ErrorKind::InvalidTransition);
}

#[test]
fn archive_sweep_deletes_expired_unreviewed_publications() {
    let fx = Fixture::new();
    let (_, v1) = fx.drafted(&["fi", "sv"]);
    fx.publish_now(v1, &["fi", "sv"]);
    let end = T0 + 1_000;
    for code in ["fi", "sv"] {
        fx.publishing()
            .set_validity_end(v1, &lang(code), Some(end), None, EDITOR)
            .unwrap();
    }
    fx.publishing()
        .mark_reviewed(v1, &lang("sv"), end, EDITOR)
        .unwrap();

    let at_end = fx.publishing().archive_expired(end).unwrap();
    assert!(at_end.committed.is_empty());

    let after = fx.publishing().archive_expired(end + 1).unwrap();
    assert!(after.is_clean());
    let archived = after
        .committed
        .iter()
        .map(|item| item.language.to_string())
        .collect::<Vec<_>>();
    assert_eq!(archived, ["fi"]);
    assert_eq!(
        fx.versioning()
            .language_availability(v1, &lang("fi"))
            .unwrap()
            .unwrap()
            .status,
        PublishingStatus::Deleted
    );

    let window_passed = fx.publishing().archive_expired(end + 31 * DAY_MS).unwrap();
    assert_eq!(window_passed.committed.len(), 1);
    assert_eq!(window_passed.committed[0].language, lang("sv"));
}

#[test]
fn observers_see_committed_transitions_only() {
    let fx = Fixture::new();
    let recorder = Arc::new(Recorder::default());
    let (root_id, v1) = fx.drafted(&["fi"]);
    fx.publish_now(v1, &["fi"]);
    let v2 = fx
        .versioning()
        .edit_language_content(root_id, &lang("fi"), &content("v2"), EDITOR)
        .unwrap();

    let publishing = fx.publishing().with_observer(recorder.clone());
    publishing
        .request_publish(&PublishRequest::new(v2, vec![lang("fi"), lang("de")], EDITOR))
        .unwrap();

    let events = recorder.events.lock().unwrap();
    let seen = events
        .iter()
        .map(|event| {
            (
                event.root_id,
                event.transition.version_id,
                event.transition.to_status,
            )
        })
        .collect::<Vec<_>>();
    assert_eq!(
        seen,
        [
            (root_id, v1, PublishingStatus::OldPublished),
            (root_id, v2, PublishingStatus::Published),
        ]
    );
}
