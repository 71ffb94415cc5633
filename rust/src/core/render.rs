// DialogRenderer: spec -> native dialog, single-flight replacement, post-show styling.

use super::{host_call, LiveDialog, PopupCore};
use crate::dialog::{html, DialogSpec, DialogStyle};
use crate::host::{NativeButton, NativeDialog, SharedHost, StyleTarget};
use crate::state::{ConfigSource, PresentOutcome};
use crate::updates::CoreMsg;

impl PopupCore {
    /// Dismiss previous → show new → adopt new → style, all inside one foreground task.
    pub(super) fn render(&mut self, host: SharedHost, spec: DialogSpec, source: ConfigSource) {
        if !self.foreground.is_current() {
            tracing::debug!("render requested off the foreground thread; redirecting");
            self.foreground.post(CoreMsg::Render {
                host,
                spec: Box::new(spec),
                source,
            });
            return;
        }

        self.dismiss_live();

        if host_call("is_finishing", || host.is_finishing()).unwrap_or(true) {
            tracing::info!("host finishing before render; not showing");
            self.record_outcome(PresentOutcome::Skipped {
                reason: "host finishing".into(),
            });
            return;
        }

        let dialog_id = self.next_dialog_id();
        let native = build_native_dialog(dialog_id, &spec);
        let title = native.title.plain.clone();
        let shown = match host_call("show_dialog", || host.show_dialog(native)) {
            Some(Ok(())) => Ok(()),
            Some(Err(e)) => Err(e.to_string()),
            None => Err("host panicked".to_string()),
        };
        if let Err(e) = shown {
            tracing::warn!(%e, dialog_id, "host refused to show dialog");
            self.record_outcome(PresentOutcome::Skipped {
                reason: format!("show failed: {e}"),
            });
            return;
        }
        tracing::info!(
            dialog_id,
            source = source.tag(),
            buttons = spec.buttons.len(),
            "dialog shown"
        );

        // Adopt first; styling is best effort.
        self.live = Some(LiveDialog {
            dialog_id,
            host: host.clone(),
            title,
            buttons: spec.buttons.clone(),
        });
        if let Some(style) = spec.style.as_ref() {
            apply_style(&host, dialog_id, style, &spec);
        }
        self.record_outcome(PresentOutcome::Shown { dialog_id, source });
    }
}

pub(super) fn build_native_dialog(dialog_id: u64, spec: &DialogSpec) -> NativeDialog {
    let buttons = spec
        .buttons
        .iter()
        .filter(|b| !b.text.is_empty())
        .map(|b| NativeButton {
            role: b.role,
            label: b.text.clone(),
        })
        .collect();
    NativeDialog {
        dialog_id,
        title: html::render_or_plain(&spec.title),
        message: html::render_or_plain(&spec.message),
        buttons,
        cancelable: spec.behavior.cancelable,
        canceled_on_touch_outside: spec.behavior.cancelable,
        dim_amount: (!spec.behavior.dim_background).then_some(0.0),
    }
}

/// Best effort: each override is tried on its own; a failure skips only that one.
fn apply_style(host: &SharedHost, dialog_id: u64, style: &DialogStyle, spec: &DialogSpec) {
    let mut overrides = vec![
        (StyleTarget::Title, style.title_color),
        (StyleTarget::Message, style.message_color),
    ];
    for button in &spec.buttons {
        overrides.push((button.role.style_target(), style.button_color(button.role)));
    }
    for (target, color) in overrides {
        let Some(color) = color else {
            continue;
        };
        match host_call("apply_color", || host.apply_color(dialog_id, target, color.argb())) {
            Some(Ok(())) => {}
            Some(Err(e)) => tracing::warn!(%e, dialog_id, ?target, "style override skipped"),
            None => tracing::warn!(dialog_id, ?target, "style override panicked; skipped"),
        }
    }
}
