pub(crate) mod config;
mod dispatch;
pub(crate) mod pipeline;
mod render;
pub(crate) mod store;

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, RwLock};

use flume::Sender;

use crate::dialog::ButtonSpec;
use crate::host::{ButtonRole, SharedHost};
use crate::scheduler::ForegroundQueue;
use crate::state::{LiveDialogState, PopupState, PresentOutcome};
use crate::updates::{CoreMsg, PopupUpdate};

use store::SharedStore;

/// The one dialog currently on screen. Owned by the actor; replaced, never shared.
struct LiveDialog {
    dialog_id: u64,
    host: SharedHost,
    title: String,
    buttons: Vec<ButtonSpec>,
}

impl LiveDialog {
    fn button(&self, role: ButtonRole) -> Option<&ButtonSpec> {
        self.buttons.iter().find(|b| b.role == role)
    }
}

/// Foreground actor: every dialog construction, mutation and teardown happens here.
pub(crate) struct PopupCore {
    pub(crate) state: PopupState,
    rev: u64,

    update_sender: Sender<PopupUpdate>,
    shared_state: Arc<RwLock<PopupState>>,
    foreground: ForegroundQueue<CoreMsg>,
    store: SharedStore,

    live: Option<LiveDialog>,
    next_dialog_id: u64,
}

impl PopupCore {
    pub(crate) fn new(
        update_sender: Sender<PopupUpdate>,
        shared_state: Arc<RwLock<PopupState>>,
        store: SharedStore,
        foreground: ForegroundQueue<CoreMsg>,
    ) -> Self {
        let this = Self {
            state: PopupState::empty(),
            rev: 0,
            update_sender,
            shared_state,
            foreground,
            store,
            live: None,
            next_dialog_id: 1,
        };
        let snapshot = this.state.clone();
        this.commit_state_snapshot(&snapshot);
        this
    }

    pub(crate) fn handle_message(&mut self, msg: CoreMsg) {
        tracing::debug!(msg = msg.tag(), "core message");
        match msg {
            CoreMsg::Render { host, spec, source } => self.render(host, *spec, source),
            CoreMsg::ButtonPressed { dialog_id, role } => {
                self.handle_button_pressed(dialog_id, role)
            }
            CoreMsg::DialogCancelled { dialog_id } => self.handle_dialog_cancelled(dialog_id),
            CoreMsg::Outcome(outcome) => self.record_outcome(outcome),
            CoreMsg::Barrier(ack) => {
                let _ = ack.send(());
            }
        }
    }

    fn next_dialog_id(&mut self) -> u64 {
        let id = self.next_dialog_id;
        self.next_dialog_id = self.next_dialog_id.saturating_add(1);
        id
    }

    fn next_rev(&mut self) -> u64 {
        self.rev += 1;
        self.state.rev = self.rev;
        self.rev
    }

    fn commit_state_snapshot(&self, snapshot: &PopupState) {
        match self.shared_state.write() {
            Ok(mut g) => *g = snapshot.clone(),
            Err(poison) => *poison.into_inner() = snapshot.clone(),
        }
    }

    fn emit_state(&mut self) {
        self.state.live_dialog = self.live.as_ref().map(|l| LiveDialogState {
            dialog_id: l.dialog_id,
            title: l.title.clone(),
        });
        self.next_rev();
        let snapshot = self.state.clone();
        self.commit_state_snapshot(&snapshot);
        let _ = self.update_sender.send(PopupUpdate::FullState(snapshot));
    }

    fn record_outcome(&mut self, outcome: PresentOutcome) {
        tracing::info!(?outcome, "presentation finished");
        if matches!(outcome, PresentOutcome::Shown { .. }) {
            self.state.shown_count = self.state.shown_count.saturating_add(1);
        }
        self.state.last_outcome = Some(outcome);
        self.emit_state();
    }

    /// Tears down the live dialog if it is `dialog_id`. Host failures are logged, never raised.
    fn dismiss_dialog(&mut self, dialog_id: u64) {
        let Some(live) = self.live.take_if(|l| l.dialog_id == dialog_id) else {
            tracing::debug!(dialog_id, "dismiss: dialog not live");
            return;
        };
        match host_call("dismiss_dialog", || live.host.dismiss_dialog(dialog_id)) {
            Some(Err(e)) => tracing::warn!(%e, dialog_id, "dismiss failed"),
            Some(Ok(())) | None => {}
        }
        self.emit_state();
    }

    fn dismiss_live(&mut self) {
        if let Some(dialog_id) = self.live.as_ref().map(|l| l.dialog_id) {
            self.dismiss_dialog(dialog_id);
        }
    }

    fn handle_dialog_cancelled(&mut self, dialog_id: u64) {
        // The host already closed it; just forget it.
        if self.live.take_if(|l| l.dialog_id == dialog_id).is_some() {
            tracing::info!(dialog_id, "dialog cancelled by user");
            self.emit_state();
        }
    }
}

/// Runs one host callback. A panic (a foreign exception on a method with no
/// error type) is logged and becomes `None`.
fn host_call<T>(call: &'static str, f: impl FnOnce() -> T) -> Option<T> {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::error!(call, "host callback panicked");
            None
        }
    }
}


#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::test_support::{CoreHarness, FakeHost, HostCall};
    use crate::dialog::DialogSpec;
    use crate::host::SharedHost;
    use crate::state::{ConfigSource, PresentOutcome};
    use crate::updates::CoreMsg;

    fn render_msg(host: &Arc<FakeHost>, title: &str) -> CoreMsg {
        let host: SharedHost = host.clone();
        CoreMsg::Render {
            host,
            spec: Box::new(DialogSpec {
                title: title.into(),
                ..DialogSpec::default()
            }),
            source: ConfigSource::Live,
        }
    }

    #[test]
    fn outcome_messages_update_the_snapshot() {
        let harness = CoreHarness::start();
        harness.post(CoreMsg::Outcome(PresentOutcome::Skipped {
            reason: "cache empty".into(),
        }));
        let state = harness.flush();
        assert_eq!(
            state.last_outcome,
            Some(PresentOutcome::Skipped {
                reason: "cache empty".into()
            })
        );
        assert_eq!(state.shown_count, 0);
        assert!(state.rev > 0);
    }

    #[test]
    fn cancelled_dialog_is_forgotten_without_a_second_dismiss() {
        let harness = CoreHarness::start();
        let host = Arc::new(FakeHost::default());
        harness.post(render_msg(&host, "a"));
        let state = harness.flush();
        let dialog_id = state.live_dialog.expect("live").dialog_id;

        harness.post(CoreMsg::DialogCancelled { dialog_id });
        let state = harness.flush();
        assert!(state.live_dialog.is_none());
        assert!(!host.calls().contains(&HostCall::Dismiss(dialog_id)));
    }

    #[test]
    fn stale_cancel_does_not_touch_the_live_dialog() {
        let harness = CoreHarness::start();
        let host = Arc::new(FakeHost::default());
        harness.post(render_msg(&host, "first"));
        harness.post(render_msg(&host, "second"));
        let state = harness.flush();
        let live = state.live_dialog.expect("live");
        assert_eq!(live.title, "second");

        harness.post(CoreMsg::DialogCancelled {
            dialog_id: live.dialog_id - 1,
        });
        let state = harness.flush();
        assert_eq!(state.live_dialog.map(|l| l.title), Some("second".into()));
    }
}
