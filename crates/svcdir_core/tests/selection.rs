mod common;

use common::{content, lang, Fixture, EDITOR, T0};
use svcdir_core::{
    DisplayStatus, ErrorKind, PublishRequest, PublishingStatus, Resolution, SelectionService,
    ViewerContext,
};
use uuid::Uuid;

fn resolve(fx: &Fixture, root_id: Uuid, code: &str, viewer: ViewerContext) -> Resolution {
    SelectionService::new(&fx.conn, fx.ctx.clone())
        .resolve_for_viewer(root_id, &lang(code), viewer)
        .unwrap()
}

#[test]
fn public_keeps_seeing_published_version_while_editor_sees_draft() {
    let fx = Fixture::new();
    let (root_id, v1) = fx.drafted(&["fi"]);
    fx.publish_now(v1, &["fi"]);
    let v2 = fx
        .versioning()
        .edit_language_content(root_id, &lang("fi"), &content("fi v2"), EDITOR)
        .unwrap();

    let public = resolve(&fx, root_id, "fi", ViewerContext::Public);
    let seen = public.available().expect("public should see v1");
    assert_eq!(seen.version_id, v1);
    assert_eq!(seen.status, PublishingStatus::Published);
    assert_eq!(seen.content, content("fi"));

    let editor = resolve(&fx, root_id, "fi", ViewerContext::Editor);
    let seen = editor.available().expect("editor should see v2");
    assert_eq!(seen.version_id, v2);
    assert_eq!(seen.status, PublishingStatus::Modified);
    assert_eq!(seen.content, content("fi v2"));
}

#[test]
fn public_switches_to_new_version_once_published() {
    let fx = Fixture::new();
    let (root_id, v1) = fx.drafted(&["fi"]);
    fx.publish_now(v1, &["fi"]);
    let v2 = fx
        .versioning()
        .edit_language_content(root_id, &lang("fi"), &content("fi v2"), EDITOR)
        .unwrap();
    fx.publish_now(v2, &["fi"]);

    let public = resolve(&fx, root_id, "fi", ViewerContext::Public);
    let seen = public.available().unwrap();
    assert_eq!(seen.version_id, v2);
    assert_eq!(seen.number.to_string(), "2.0");
}

#[test]
fn scheduled_language_is_hidden_from_public_until_due() {
    let fx = Fixture::new();
    let (root_id, v1) = fx.drafted(&["sv"]);
    let at = T0 + 60_000;
    fx.publishing()
        .request_publish(&PublishRequest::new(v1, vec![lang("sv")], EDITOR).schedule_at(at))
        .unwrap();

    assert_eq!(
        resolve(&fx, root_id, "sv", ViewerContext::Public),
        Resolution::NotAvailable
    );
    let editor = resolve(&fx, root_id, "sv", ViewerContext::Editor);
    assert_eq!(
        editor.available().unwrap().display_status,
        DisplayStatus::Scheduled
    );

    fx.publishing().commit_due_schedules(at).unwrap();
    fx.clock.set(at);
    let public = resolve(&fx, root_id, "sv", ViewerContext::Public);
    assert_eq!(public.available().unwrap().valid_from, Some(at));
}

#[test]
fn expired_publication_is_hidden_from_public_only() {
    let fx = Fixture::new();
    let (root_id, v1) = fx.drafted(&["fi"]);
    fx.publish_now(v1, &["fi"]);
    let end = T0 + 1_000;
    fx.publishing()
        .set_validity_end(v1, &lang("fi"), Some(end), None, EDITOR)
        .unwrap();

    fx.clock.set(end);
    assert!(resolve(&fx, root_id, "fi", ViewerContext::Public)
        .available()
        .is_some());

    fx.clock.set(end + 1);
    assert_eq!(
        resolve(&fx, root_id, "fi", ViewerContext::Public),
        Resolution::NotAvailable
    );
    assert!(resolve(&fx, root_id, "fi", ViewerContext::Editor)
        .available()
        .is_some());
}

#[test]
fn editor_skips_deleted_head_language() {
    let fx = Fixture::new();
    let (root_id, v1) = fx.drafted(&["fi"]);
    fx.publish_now(v1, &["fi"]);
    let v2 = fx
        .versioning()
        .create_draft_version(root_id, None, EDITOR)
        .unwrap();
    fx.publishing()
        .delete_languages(v2, &[lang("fi")], EDITOR)
        .unwrap();

    let editor = resolve(&fx, root_id, "fi", ViewerContext::Editor);
    assert_eq!(editor.available().unwrap().version_id, v1);
    let public = resolve(&fx, root_id, "fi", ViewerContext::Public);
    assert_eq!(public.available().unwrap().version_id, v1);
}

#[test]
fn missing_or_unsupported_language_is_not_available() {
    let fx = Fixture::new();
    let (root_id, v1) = fx.drafted(&["fi"]);
    fx.publish_now(v1, &["fi"]);

    assert_eq!(
        resolve(&fx, root_id, "en", ViewerContext::Public),
        Resolution::NotAvailable
    );
    assert_eq!(
        resolve(&fx, root_id, "de", ViewerContext::Editor),
        Resolution::NotAvailable
    );
}

#[test]
fn unknown_root_is_not_found() {
    let fx = Fixture::new();

    let err = SelectionService::new(&fx.conn, fx.ctx.clone())
        .resolve_for_viewer(Uuid::new_v4(), &lang("fi"), ViewerContext::Public)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn resolution_serializes_with_result_tag() {
    let fx = Fixture::new();
    let (root_id, _) = fx.drafted(&["fi"]);

    let hidden = serde_json::to_value(resolve(&fx, root_id, "fi", ViewerContext::Public)).unwrap();
    assert_eq!(hidden["result"], "not_available");

    let draft = serde_json::to_value(resolve(&fx, root_id, "fi", ViewerContext::Editor)).unwrap();
    assert_eq!(draft["result"], "available");
    assert_eq!(draft["status"], "draft");
}
