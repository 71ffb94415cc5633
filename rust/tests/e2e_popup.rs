//! End-to-end popup tests: acquire → decide → render → act, driven through `FfiPopup`.

use std::sync::Arc;
use std::time::Duration;

use popup_core::{ButtonRole, ConfigSource, FfiPopup, PopupUpdate, PresentOutcome};

#[path = "support/mod.rs"]
mod support;

use support::{Collector, Fixture, HostEvent};

const UPDATE_OK: &str = r#"{"title":"Update","positiveButton":{"text":"OK","action":"dismiss"}}"#;

const UPDATE_2_3_0: &str = r#"{
    "title": "Version 2.3.0",
    "message": "<b>New</b> features",
    "version": "2.3.0",
    "positiveButton": {"text": "Download", "action": "open_url", "data": "https://example.com/dl"},
    "negativeButton": {"text": "Later", "action": "ignore_version", "data": "2.3.0"}
}"#;

fn titled(title: &str) -> String {
    serde_json::json!({ "title": title }).to_string()
}

#[test]
fn scenario_a_ok_button_only_dismisses() {
    let f = Fixture::new();
    f.fetcher.push_sealed(UPDATE_OK);
    f.present();
    let state = f.settle();

    let shown = f.host.shown();
    assert_eq!(shown.len(), 1);
    assert_eq!(shown[0].title.plain, "Update");
    assert_eq!(shown[0].buttons.len(), 1);
    assert_eq!(shown[0].buttons[0].role, ButtonRole::Positive);
    assert_eq!(shown[0].buttons[0].label, "OK");
    let dialog_id = shown[0].dialog_id;
    assert_eq!(
        state.last_outcome,
        Some(PresentOutcome::Shown {
            dialog_id,
            source: ConfigSource::Live
        })
    );

    f.popup.button_pressed(dialog_id, ButtonRole::Positive);
    let state = f.settle();
    assert!(state.live_dialog.is_none());
    assert_eq!(
        f.host.events(),
        vec![
            HostEvent::Shown(shown[0].clone()),
            HostEvent::Dismissed(dialog_id)
        ]
    );
}

#[test]
fn scenario_b_ignored_version_is_not_shown_again() {
    let f = Fixture::new();
    f.fetcher.push_sealed(UPDATE_2_3_0);
    f.present();
    let state = f.settle();
    let dialog_id = state.live_dialog.expect("dialog shown").dialog_id;

    f.popup.button_pressed(dialog_id, ButtonRole::Negative);
    let state = f.settle();
    assert!(state.live_dialog.is_none());
    assert!(f.host.events().contains(&HostEvent::Dismissed(dialog_id)));

    f.fetcher.push_sealed(UPDATE_2_3_0);
    f.present();
    let state = f.settle();
    assert_eq!(f.host.shown().len(), 1);
    assert_eq!(
        state.last_outcome,
        Some(PresentOutcome::Suppressed {
            version: "2.3.0".into(),
            source: ConfigSource::Live
        })
    );

    // The ignored set outlives the instance.
    let reopened = FfiPopup::new(f.dir.path().to_string_lossy().to_string());
    f.attach(&reopened);
    f.fetcher.push_sealed(UPDATE_2_3_0);
    reopened.present(Some(Arc::new(f.host.clone())));
    assert!(reopened.wait_idle(Duration::from_secs(10)));
    assert!(matches!(
        reopened.state().last_outcome,
        Some(PresentOutcome::Suppressed { .. })
    ));
    assert_eq!(f.host.shown().len(), 1);
}

#[test]
fn scenario_c_decrypt_failure_renders_cache_and_keeps_it() {
    let f = Fixture::new();
    f.fetcher.push_sealed(&titled("cached"));
    f.present();
    f.settle();

    f.decryptor.set_failing(true);
    f.fetcher.push_sealed(&titled("newer"));
    f.present();
    let state = f.settle();
    let shown = f.host.shown();
    assert_eq!(shown.len(), 2);
    assert_eq!(shown[1].title.plain, "cached");
    assert!(matches!(
        state.last_outcome,
        Some(PresentOutcome::Shown {
            source: ConfigSource::Cache,
            ..
        })
    ));

    // A later offline run still sees the original cache, not "newer".
    f.decryptor.set_failing(false);
    f.fetcher.push_err("offline");
    f.present();
    f.settle();
    let shown = f.host.shown();
    assert_eq!(shown.len(), 3);
    assert_eq!(shown[2].title.plain, "cached");
}

#[test]
fn fetch_failure_with_empty_cache_shows_nothing() {
    let f = Fixture::new();
    f.fetcher.push_err("connection refused");
    f.present();
    let state = f.settle();

    assert!(f.host.events().is_empty());
    assert!(state.live_dialog.is_none());
    assert!(matches!(
        state.last_outcome,
        Some(PresentOutcome::Skipped { .. })
    ));
    assert_eq!(state.shown_count, 0);
}

#[test]
fn back_to_back_presentations_keep_one_dialog_on_screen() {
    let f = Fixture::new();
    for title in ["one", "two", "three"] {
        f.fetcher.push_sealed(&titled(title));
    }
    for _ in 0..3 {
        f.present();
    }
    let state = f.settle();

    let shown = f.host.shown();
    let titles: Vec<_> = shown.iter().map(|d| d.title.plain.as_str()).collect();
    assert_eq!(titles, vec!["one", "two", "three"]);

    // Each earlier dialog is dismissed before its successor is shown.
    let events = f.host.events();
    for pair in shown.windows(2) {
        let dismissed = events
            .iter()
            .position(|e| *e == HostEvent::Dismissed(pair[0].dialog_id))
            .expect("predecessor dismissed");
        let next_shown = events
            .iter()
            .position(|e| *e == HostEvent::Shown(pair[1].clone()))
            .expect("successor shown");
        assert!(dismissed < next_shown);
    }
    assert_eq!(
        state.live_dialog.map(|l| l.dialog_id),
        Some(shown[2].dialog_id)
    );
    assert_eq!(state.shown_count, 3);
}

#[test]
fn finishing_host_is_never_touched() {
    let f = Fixture::new();
    f.fetcher.push_sealed(UPDATE_OK);
    f.host.set_finishing(true);
    f.present();
    let state = f.settle();

    assert!(f.host.events().is_empty());
    assert_eq!(f.fetcher.calls(), 0);
    assert_eq!(
        state.last_outcome,
        Some(PresentOutcome::Skipped {
            reason: "host finishing".into()
        })
    );
}

#[test]
fn missing_host_is_a_skip() {
    let f = Fixture::new();
    f.popup.present(None);
    let state = f.settle();
    assert_eq!(f.fetcher.calls(), 0);
    assert!(matches!(
        state.last_outcome,
        Some(PresentOutcome::Skipped { .. })
    ));
}

#[test]
fn copy_action_confirms_and_dismisses() {
    let f = Fixture::new();
    f.fetcher.push_sealed(
        r#"{"neutralButton":{"text":"Copy code","action":"copy_text","data":"WELCOME10"}}"#,
    );
    f.present();
    let dialog_id = f.settle().live_dialog.expect("shown").dialog_id;

    f.popup.button_pressed(dialog_id, ButtonRole::Neutral);
    let state = f.settle();
    let events = f.host.events();
    assert_eq!(
        &events[1..],
        &[
            HostEvent::Copied("WELCOME10".into()),
            HostEvent::Toast("已复制到剪贴板".into()),
            HostEvent::Dismissed(dialog_id),
        ]
    );
    assert!(state.live_dialog.is_none());
}

#[test]
fn open_url_action_opens_link() {
    let f = Fixture::new();
    f.fetcher.push_sealed(UPDATE_2_3_0);
    f.present();
    let dialog_id = f.settle().live_dialog.expect("shown").dialog_id;

    f.popup.button_pressed(dialog_id, ButtonRole::Positive);
    f.settle();
    let events = f.host.events();
    assert!(events.contains(&HostEvent::OpenedUrl("https://example.com/dl".into())));
    assert_eq!(events.last(), Some(&HostEvent::Dismissed(dialog_id)));
}

#[test]
fn user_cancel_forgets_the_dialog() {
    let f = Fixture::new();
    f.fetcher.push_sealed(UPDATE_OK);
    f.present();
    let dialog_id = f.settle().live_dialog.expect("shown").dialog_id;

    f.popup.dialog_cancelled(dialog_id);
    let state = f.settle();
    assert!(state.live_dialog.is_none());
    assert!(!f.host.events().contains(&HostEvent::Dismissed(dialog_id)));

    // A late press for the cancelled dialog does nothing.
    f.popup.button_pressed(dialog_id, ButtonRole::Positive);
    f.settle();
    assert_eq!(f.host.events().len(), 1);
}

#[test]
fn styles_reach_the_host_after_show() {
    let f = Fixture::new();
    f.fetcher.push_sealed(
        r##"{"title":"Sale","positiveButton":{"text":"OK"},
            "style":{"titleColor":"#FF3B30","positiveButtonColor":"#80007AFF"}}"##,
    );
    f.present();
    let dialog_id = f.settle().live_dialog.expect("shown").dialog_id;

    let events = f.host.events();
    assert!(matches!(events[0], HostEvent::Shown(_)));
    assert_eq!(
        &events[1..],
        &[
            HostEvent::Color(dialog_id, popup_core::StyleTarget::Title, 0xFFFF_3B30),
            HostEvent::Color(dialog_id, popup_core::StyleTarget::PositiveButton, 0x8000_7AFF),
        ]
    );
}

#[test]
fn version_field_is_configurable() {
    let f = Fixture::build(serde_json::json!({ "version_field": "build" }), &["9"]);
    f.fetcher
        .push_sealed(r#"{"title":"Build 9","build":"9","version":"1.0"}"#);
    f.present();
    let state = f.settle();
    assert_eq!(
        state.last_outcome,
        Some(PresentOutcome::Suppressed {
            version: "9".into(),
            source: ConfigSource::Live
        })
    );
    assert!(f.host.events().is_empty());
}

#[test]
fn listener_sees_monotonic_full_states() {
    let f = Fixture::new();
    let collector = Collector::default();
    f.popup.listen_for_updates(Box::new(collector.clone()));

    f.fetcher.push_sealed(UPDATE_OK);
    f.present();
    f.settle();

    support::wait_until("live dialog update", Duration::from_secs(5), || {
        collector.updates.lock().unwrap().iter().any(|u| match u {
            PopupUpdate::FullState(s) => s.live_dialog.is_some(),
        })
    });
    let revs: Vec<u64> = collector
        .updates
        .lock()
        .unwrap()
        .iter()
        .map(PopupUpdate::rev)
        .collect();
    assert!(revs.windows(2).all(|w| w[0] < w[1]), "{revs:?}");
}
