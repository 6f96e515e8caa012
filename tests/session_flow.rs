mod common;

use serde_json::json;
use std::collections::BTreeMap;
use tokio::sync::broadcast::error::TryRecvError;

use common::{ScriptedTransport, edit_form, html_response, json_response, page, title_args};
use reledit::RelEditError;
use reledit::events::RegionEvent;
use reledit::models::{Content, Reload, SwapMode, SwapOutcome};
use reledit::session::{SessionState, SubmitOutcome};

fn new_title() -> BTreeMap<String, String> {
    BTreeMap::from([("title-subject:42".to_string(), "New title".to_string())])
}

#[tokio::test]
async fn successful_edition_refreshes_the_region() {
    let transport = ScriptedTransport::new();
    let (page, doc) = page(transport.clone());

    transport.html(&edit_form("d1", "f1", "false"));
    let outcome = page
        .sessions
        .load_inline_edition_form(title_args("d1", "f1"))
        .await
        .unwrap();
    assert_eq!(outcome, SwapOutcome::Applied);
    assert_eq!(page.sessions.state("d1"), SessionState::Editing);
    assert!(doc.is_visible("d1-form"));
    assert!(!doc.is_visible("d1-value"));
    assert!(!doc.is_visible("d1"));

    let open = &transport.calls()[0];
    assert_eq!(open.param("fname"), Some("reledit_form"));
    assert_eq!(open.param("eid"), Some("42"));
    assert_eq!(open.param("divid"), Some("d1"));
    assert_eq!(open.param("vid"), Some("edition"));
    assert_eq!(open.param("action"), Some("update"));

    let mut events = page.engine.events().subscribe();
    transport.json(json!({"status": "ok"}));
    transport.html("<div id=\"d1\">New title</div>");
    let outcome = page.sessions.submit("d1", &new_title()).await.unwrap();

    let params = match outcome {
        SubmitOutcome::Refreshed(params) => params,
        other => panic!("expected a refresh, got {other:?}"),
    };
    assert_eq!(params.div_id, "d1");
    assert_eq!(params.form_id, "f1");
    assert_eq!(params.reload, Reload::No);

    // submission carries hidden and user fields
    let calls = transport.calls();
    assert_eq!(calls.len(), 3);
    assert_eq!(calls[1].url, "http://localhost:8080/validateform");
    assert_eq!(calls[1].param("__reledit|divid"), Some("d1"));
    assert_eq!(calls[1].param("title-subject:42"), Some("New title"));

    // exactly one refresh of d1
    let refreshes: Vec<_> = calls[2..]
        .iter()
        .filter(|call| call.param("fname") == Some("reledit_form") && call.param("divid") == Some("d1"))
        .collect();
    assert_eq!(refreshes.len(), 1);
    assert_eq!(refreshes[0].param("eid"), Some("42"));

    assert_eq!(doc.content("d1").unwrap(), "<div id=\"d1\">New title</div>");
    assert_eq!(page.sessions.state("d1"), SessionState::Closed);
    assert!(doc.is_visible("d1"));
    assert!(doc.is_visible("d1-value"));
    assert!(!doc.is_visible("d1-form"));

    let mut reloaded = Vec::new();
    loop {
        match events.try_recv() {
            Ok(RegionEvent::RelEditReloaded { params }) => reloaded.push(params),
            Ok(_) => {}
            Err(TryRecvError::Empty) => break,
            Err(err) => panic!("event channel: {err}"),
        }
    }
    assert_eq!(reloaded.len(), 1);
    assert_eq!(reloaded[0].div_id, "d1");
}

#[tokio::test]
async fn reload_url_navigates_without_swapping() {
    let transport = ScriptedTransport::new();
    let (page, doc) = page(transport.clone());

    transport.html(&edit_form("d1", "f1", "false"));
    page.sessions
        .load_inline_edition_form(title_args("d1", "f1"))
        .await
        .unwrap();
    let writes = doc.content_writes();

    transport.json(json!({"status": "ok", "reload": "/entity/42"}));
    let outcome = page.sessions.submit("d1", &new_title()).await.unwrap();

    assert_eq!(outcome, SubmitOutcome::Navigated("/entity/42".to_string()));
    assert_eq!(doc.location().as_deref(), Some("/entity/42"));
    assert_eq!(doc.content_writes(), writes);
    assert_eq!(transport.call_count(), 2);
    assert_eq!(page.sessions.state("d1"), SessionState::Closed);
}

#[tokio::test]
async fn reload_field_reloads_the_page() {
    let transport = ScriptedTransport::new();
    let (page, doc) = page(transport.clone());

    transport.html(&edit_form("d1", "f1", "true"));
    page.sessions
        .load_inline_edition_form(title_args("d1", "f1"))
        .await
        .unwrap();

    transport.json(json!({"status": "ok"}));
    let outcome = page.sessions.submit("d1", &new_title()).await.unwrap();
    assert_eq!(outcome, SubmitOutcome::PageReloaded);
    assert_eq!(doc.reload_count(), 1);
    assert_eq!(transport.call_count(), 2);
}

#[tokio::test]
async fn delete_confirmation_reloads_the_page() {
    let transport = ScriptedTransport::new();
    let (page, doc) = page(transport.clone());

    transport.html(&edit_form("d1", "deleteconf", "false"));
    page.sessions
        .load_inline_edition_form(title_args("d1", "deleteconf"))
        .await
        .unwrap();

    transport.json(json!({"status": "ok", "reload": true}));
    let outcome = page.sessions.submit("d1", &BTreeMap::new()).await.unwrap();
    assert_eq!(outcome, SubmitOutcome::PageReloaded);
    assert_eq!(doc.reload_count(), 1);
    assert_eq!(doc.location(), None);
}

#[tokio::test]
async fn failed_form_load_leaves_the_session_closed() {
    let transport = ScriptedTransport::new();
    let (page, doc) = page(transport.clone());

    transport.fail(RelEditError::Network("timeout".into()));
    let err = page
        .sessions
        .load_inline_edition_form(title_args("d1", "f1"))
        .await
        .unwrap_err();
    assert_eq!(err, RelEditError::Network("timeout".to_string()));
    assert_eq!(page.sessions.state("d1"), SessionState::Closed);
    assert_eq!(doc.content_writes(), 0);
    assert!(!doc.is_visible("d1-form"));
    assert!(doc.is_visible("d1-value"));
}

#[tokio::test]
async fn failed_submission_keeps_the_form_open() {
    let transport = ScriptedTransport::new();
    let (page, doc) = page(transport.clone());

    transport.html(&edit_form("d1", "f1", "false"));
    page.sessions
        .load_inline_edition_form(title_args("d1", "f1"))
        .await
        .unwrap();

    transport.fail(RelEditError::Network("connection reset".into()));
    let err = page.sessions.submit("d1", &new_title()).await.unwrap_err();
    assert_eq!(err, RelEditError::Network("connection reset".to_string()));
    assert_eq!(page.sessions.state("d1"), SessionState::Editing);
    assert!(doc.is_visible("d1-form"));

    transport.json(json!({"status": "error", "reason": "title is required"}));
    let err = page.sessions.submit("d1", &BTreeMap::new()).await.unwrap_err();
    assert_eq!(err, RelEditError::ServerReported("title is required".to_string()));
    assert_eq!(page.sessions.state("d1"), SessionState::Editing);

    transport.json(json!({"status": "error", "error": "validation failed", "reason": "title is required"}));
    let err = page.sessions.submit("d1", &BTreeMap::new()).await.unwrap_err();
    assert_eq!(err, RelEditError::ServerReported("validation failed".to_string()));
    assert_eq!(page.sessions.state("d1"), SessionState::Editing);

    // the user retries
    transport.json(json!({"status": "ok"}));
    transport.html("<div id=\"d1\">New title</div>");
    let outcome = page.sessions.submit("d1", &new_title()).await.unwrap();
    assert!(matches!(outcome, SubmitOutcome::Refreshed(_)));
    assert_eq!(page.sessions.state("d1"), SessionState::Closed);
}

#[tokio::test]
async fn cancel_is_idempotent() {
    let transport = ScriptedTransport::new();
    let (page, doc) = page(transport.clone());
    doc.push_message("title is required");

    transport.html(&edit_form("d1", "f1", "false"));
    page.sessions
        .load_inline_edition_form(title_args("d1", "f1"))
        .await
        .unwrap();

    assert!(page.sessions.cancel("d1").await.unwrap());
    assert_eq!(page.sessions.state("d1"), SessionState::Closed);
    assert!(doc.messages().is_empty());
    assert!(doc.is_visible("d1-value"));
    assert!(!doc.is_visible("d1-form"));
    let after_first = doc.calls();

    assert!(!page.sessions.cancel("d1").await.unwrap());
    assert_eq!(doc.calls(), after_first);
    assert_eq!(page.sessions.state("d1"), SessionState::Closed);
}

#[tokio::test]
async fn cancel_without_session_is_a_no_op() {
    let transport = ScriptedTransport::new();
    let (page, doc) = page(transport.clone());
    assert!(!page.sessions.cancel("nowhere").await.unwrap());
    assert!(doc.calls().is_empty());
}

#[tokio::test]
async fn reopening_replaces_the_pending_form() {
    let transport = ScriptedTransport::new();
    let (page, doc) = page(transport.clone());

    let first_reply = transport.later();
    let second_reply = transport.later();

    let p = page.clone();
    let first = tokio::spawn(async move {
        p.sessions.load_inline_edition_form(title_args("d1", "f1")).await
    });
    transport.wait_for_calls(1).await;
    let p = page.clone();
    let second = tokio::spawn(async move {
        p.sessions.load_inline_edition_form(title_args("d1", "f2")).await
    });
    transport.wait_for_calls(2).await;

    second_reply
        .send(Ok(html_response(&edit_form("d1", "f2", "false"))))
        .unwrap();
    assert_eq!(second.await.unwrap().unwrap(), SwapOutcome::Applied);
    first_reply
        .send(Ok(html_response(&edit_form("d1", "f1", "false"))))
        .unwrap();
    assert_eq!(first.await.unwrap().unwrap(), SwapOutcome::Superseded);

    let form = doc.content("d1-reledit").unwrap();
    assert!(form.contains("id=\"f2\""));
    assert!(!form.contains("id=\"f1\""));
    assert_eq!(doc.content_writes(), 1);
    assert_eq!(page.sessions.state("d1"), SessionState::Editing);
    assert_eq!(page.sessions.args("d1").unwrap().form_id, "f2");
}

#[tokio::test]
async fn cancelled_form_load_is_dropped() {
    let transport = ScriptedTransport::new();
    let (page, doc) = page(transport.clone());

    let reply = transport.later();
    let p = page.clone();
    let open = tokio::spawn(async move {
        p.sessions.load_inline_edition_form(title_args("d1", "f1")).await
    });
    transport.wait_for_calls(1).await;

    assert!(!page.sessions.cancel("d1").await.unwrap());
    reply
        .send(Ok(html_response(&edit_form("d1", "f1", "false"))))
        .unwrap();
    assert_eq!(open.await.unwrap().unwrap(), SwapOutcome::Superseded);

    assert_eq!(doc.content("d1-reledit"), None);
    assert_eq!(page.sessions.state("d1"), SessionState::Closed);
}

#[tokio::test]
async fn submit_needs_an_open_form() {
    let transport = ScriptedTransport::new();
    let (page, _) = page(transport.clone());

    let err = page.sessions.submit("d1", &BTreeMap::new()).await.unwrap_err();
    assert_eq!(err, RelEditError::NoSession("d1".to_string()));
    assert_eq!(transport.call_count(), 0);
}

#[tokio::test]
async fn superseded_refresh_still_restores_the_value() {
    let transport = ScriptedTransport::new();
    let (page, doc) = page(transport.clone());

    transport.html(&edit_form("d1", "f1", "false"));
    page.sessions
        .load_inline_edition_form(title_args("d1", "f1"))
        .await
        .unwrap();

    transport.json(json!({"status": "ok"}));
    let refresh_reply = transport.later();
    let p = page.clone();
    let submit = tokio::spawn(async move { p.sessions.submit("d1", &new_title()).await });
    transport.wait_for_calls(3).await;

    page.engine
        .swap("d1", Content::Markup("other".to_string()), SwapMode::Replace)
        .await
        .unwrap();
    refresh_reply
        .send(Ok(html_response("<div id=\"d1\">New title</div>")))
        .unwrap();
    assert_eq!(submit.await.unwrap().unwrap(), SubmitOutcome::Superseded);

    assert_eq!(doc.content("d1").unwrap(), "other");
    assert_eq!(page.sessions.state("d1"), SessionState::Closed);
    assert!(doc.is_visible("d1"));
    assert!(doc.is_visible("d1-value"));
    assert!(!doc.is_visible("d1-form"));
}

#[tokio::test]
async fn reopened_form_cannot_land_during_submission() {
    let transport = ScriptedTransport::new();
    let (page, doc) = page(transport.clone());

    transport.html(&edit_form("d1", "f1", "false"));
    page.sessions
        .load_inline_edition_form(title_args("d1", "f1"))
        .await
        .unwrap();

    let reopen_reply = transport.later();
    let submit_reply = transport.later();
    transport.html("<div id=\"d1\">New title</div>");

    let p = page.clone();
    let reopen = tokio::spawn(async move {
        p.sessions.load_inline_edition_form(title_args("d1", "f2")).await
    });
    transport.wait_for_calls(2).await;
    let p = page.clone();
    let submit = tokio::spawn(async move { p.sessions.submit("d1", &new_title()).await });
    transport.wait_for_calls(3).await;
    assert_eq!(page.sessions.state("d1"), SessionState::Submitting);

    reopen_reply
        .send(Ok(html_response(&edit_form("d1", "f2", "false"))))
        .unwrap();
    assert_eq!(reopen.await.unwrap().unwrap(), SwapOutcome::Superseded);
    assert_eq!(page.sessions.state("d1"), SessionState::Submitting);
    assert!(doc.content("d1-reledit").unwrap().contains("id=\"f1\""));

    // a second submission is refused while the first is in flight
    let err = page.sessions.submit("d1", &new_title()).await.unwrap_err();
    assert!(matches!(err, RelEditError::InvalidState { .. }));

    submit_reply.send(Ok(json_response(json!({"status": "ok"})))).unwrap();
    let outcome = submit.await.unwrap().unwrap();
    assert!(matches!(outcome, SubmitOutcome::Refreshed(_)));
    assert_eq!(transport.calls()[2].param("__reledit|formid"), Some("f1"));
    assert_eq!(page.sessions.state("d1"), SessionState::Closed);
}
