use crate::dialog::DialogSpec;
use crate::host::{ButtonRole, SharedHost};
use crate::state::{ConfigSource, PopupState, PresentOutcome};

#[derive(uniffi::Enum, Clone, Debug)]
pub enum PopupUpdate {
    /// Always a full snapshot; the state is small.
    FullState(PopupState),
}

impl PopupUpdate {
    pub fn rev(&self) -> u64 {
        match self {
            PopupUpdate::FullState(s) => s.rev,
        }
    }
}

/// Messages for the foreground actor.
pub(crate) enum CoreMsg {
    Render {
        host: SharedHost,
        spec: Box<DialogSpec>,
        source: ConfigSource,
    },
    ButtonPressed {
        dialog_id: u64,
        role: ButtonRole,
    },
    DialogCancelled {
        dialog_id: u64,
    },
    /// Result of a run that ended without rendering.
    Outcome(PresentOutcome),
    /// Acknowledged once every earlier message has been handled.
    Barrier(flume::Sender<()>),
}

impl CoreMsg {
    pub(crate) fn tag(&self) -> &'static str {
        match self {
            CoreMsg::Render { .. } => "Render",
            CoreMsg::ButtonPressed { .. } => "ButtonPressed",
            CoreMsg::DialogCancelled { .. } => "DialogCancelled",
            CoreMsg::Outcome(_) => "Outcome",
            CoreMsg::Barrier(_) => "Barrier",
        }
    }
}
