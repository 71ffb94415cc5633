/// Where the configuration for a presentation came from.
#[derive(uniffi::Enum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSource {
    Live,
    Cache,
}

impl ConfigSource {
    pub fn tag(self) -> &'static str {
        match self {
            ConfigSource::Live => "live",
            ConfigSource::Cache => "cache",
        }
    }
}

/// How the most recent `present_popup` call ended.
#[derive(uniffi::Enum, Debug, Clone, PartialEq, Eq)]
pub enum PresentOutcome {
    Shown {
        dialog_id: u64,
        source: ConfigSource,
    },
    Suppressed {
        version: String,
        source: ConfigSource,
    },
    /// Nothing shown and nothing to suppress: precondition, fallback or host failure.
    Skipped {
        reason: String,
    },
}

#[derive(uniffi::Record, Debug, Clone, PartialEq, Eq)]
pub struct LiveDialogState {
    pub dialog_id: u64,
    pub title: String,
}

#[derive(uniffi::Record, Debug, Clone, PartialEq, Eq)]
pub struct PopupState {
    pub rev: u64,
    pub live_dialog: Option<LiveDialogState>,
    pub last_outcome: Option<PresentOutcome>,
    /// Dialogs shown since start, including ones later replaced.
    pub shown_count: u64,
}

impl PopupState {
    pub fn empty() -> Self {
        Self {
            rev: 0,
            live_dialog: None,
            last_outcome: None,
            shown_count: 0,
        }
    }
}
