/// What a dialog button does when pressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActionKind {
    OpenUrl,
    CopyText,
    IgnoreVersion,
    #[default]
    Dismiss,
}

impl ActionKind {
    /// Parses the configuration's action name. Unknown names fall back to `Dismiss`.
    pub fn from_wire(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "open_url" => ActionKind::OpenUrl,
            "copy_text" => ActionKind::CopyText,
            "ignore_version" => ActionKind::IgnoreVersion,
            _ => ActionKind::Dismiss,
        }
    }

    /// Log-safe action tag (never includes the action's data).
    pub fn tag(&self) -> &'static str {
        match self {
            ActionKind::OpenUrl => "open_url",
            ActionKind::CopyText => "copy_text",
            ActionKind::IgnoreVersion => "ignore_version",
            ActionKind::Dismiss => "dismiss",
        }
    }

    /// Whether the action does nothing without a payload.
    pub fn needs_data(&self) -> bool {
        !matches!(self, ActionKind::Dismiss)
    }
}
