// ActionDispatcher: run a button's effect, then always dismiss.

use std::panic::{catch_unwind, AssertUnwindSafe};

use super::PopupCore;
use crate::actions::ActionKind;
use crate::host::{ButtonRole, HostError, SharedHost};

pub(crate) const NOTICE_LINK_FAILED: &str = "无法打开链接";
pub(crate) const NOTICE_COPIED: &str = "已复制到剪贴板";
pub(crate) const NOTICE_COPY_FAILED: &str = "复制失败";

#[derive(Debug, thiserror::Error)]
enum ActionError {
    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("open url: {0}")]
    OpenUrl(HostError),
    #[error("clipboard: {0}")]
    Clipboard(HostError),
    #[error("store: {0}")]
    Store(#[from] super::store::StoreError),
}

impl ActionError {
    /// Transient notice for the user, if this failure deserves one.
    fn notice(&self) -> Option<&'static str> {
        match self {
            ActionError::InvalidUrl(_) | ActionError::OpenUrl(_) => Some(NOTICE_LINK_FAILED),
            ActionError::Clipboard(HostError::Unavailable { .. }) => None,
            ActionError::Clipboard(_) => Some(NOTICE_COPY_FAILED),
            ActionError::Store(_) => None,
        }
    }
}

impl PopupCore {
    pub(super) fn handle_button_pressed(&mut self, dialog_id: u64, role: ButtonRole) {
        let Some(live) = self.live.as_ref().filter(|l| l.dialog_id == dialog_id) else {
            tracing::debug!(dialog_id, role = role.tag(), "press for a dialog that is not live");
            return;
        };
        let host = live.host.clone();
        let (action, data) = match live.button(role) {
            Some(button) => (button.action, button.data.clone()),
            None => {
                tracing::warn!(dialog_id, role = role.tag(), "press for an unconfigured button");
                (ActionKind::Dismiss, String::new())
            }
        };
        self.dispatch(&host, action, &data, dialog_id);
    }

    /// Runs the effect of `action`; the dialog is dismissed afterwards whatever happened.
    pub(super) fn dispatch(
        &mut self,
        host: &SharedHost,
        action: ActionKind,
        data: &str,
        dialog_id: u64,
    ) {
        tracing::info!(dialog_id, action = action.tag(), "dispatch");
        // Effect and notice share one guard; dismissal runs after it no matter what.
        let body = catch_unwind(AssertUnwindSafe(|| {
            if let Err(e) = self.run_effect(host, action, data) {
                tracing::warn!(%e, action = action.tag(), "action effect failed");
                if let Some(notice) = e.notice() {
                    host.show_toast(notice.to_string());
                }
            }
        }));
        if body.is_err() {
            tracing::error!(action = action.tag(), "action panicked");
        }
        self.dismiss_dialog(dialog_id);
    }

    fn run_effect(
        &self,
        host: &SharedHost,
        action: ActionKind,
        data: &str,
    ) -> Result<(), ActionError> {
        if action.needs_data() && data.trim().is_empty() {
            tracing::warn!(action = action.tag(), "action has no data; only dismissing");
            return Ok(());
        }
        match action {
            ActionKind::OpenUrl => {
                let url = url::Url::parse(data.trim())?;
                host.open_url(url.to_string())
                    .map_err(ActionError::OpenUrl)
            }
            ActionKind::CopyText => {
                host.copy_to_clipboard(data.to_string())
                    .map_err(ActionError::Clipboard)?;
                host.show_toast(NOTICE_COPIED.to_string());
                Ok(())
            }
            ActionKind::IgnoreVersion => {
                self.store.add_ignored_version(data.trim())?;
                tracing::info!(version = data.trim(), "version ignored");
                Ok(())
            }
            ActionKind::Dismiss => Ok(()),
        }
    }
}
