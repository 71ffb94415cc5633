//! Native dialog bridge.
//!
//! The host (Kotlin/Swift) owns the actual modal widget. The core describes
//! what to show with a [`NativeDialog`] and asks for styling, link opening,
//! clipboard writes and toasts through [`PopupHost`]. Apart from the
//! `is_finishing` check at entry, every method is called from the foreground
//! actor thread only.

use std::sync::Arc;

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum HostError {
    /// The capability does not exist on this device (e.g. no clipboard service).
    #[error("host capability unavailable: {reason}")]
    Unavailable { reason: String },
    #[error("host call failed: {reason}")]
    Failed { reason: String },
}

impl From<uniffi::UnexpectedUniFFICallbackError> for HostError {
    fn from(e: uniffi::UnexpectedUniFFICallbackError) -> Self {
        Self::Failed { reason: e.reason }
    }
}

#[uniffi::export(callback_interface)]
pub trait PopupHost: Send + Sync + 'static {
    /// True once the host screen is being torn down; nothing may be shown on it.
    fn is_finishing(&self) -> bool;
    fn show_dialog(&self, dialog: NativeDialog) -> Result<(), HostError>;
    fn dismiss_dialog(&self, dialog_id: u64) -> Result<(), HostError>;
    fn apply_color(&self, dialog_id: u64, target: StyleTarget, argb: u32)
        -> Result<(), HostError>;
    fn open_url(&self, url: String) -> Result<(), HostError>;
    fn copy_to_clipboard(&self, text: String) -> Result<(), HostError>;
    fn show_toast(&self, message: String);
}

pub(crate) type SharedHost = Arc<dyn PopupHost>;

#[derive(uniffi::Enum, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ButtonRole {
    Positive,
    Negative,
    Neutral,
}

impl ButtonRole {
    pub const ALL: [ButtonRole; 3] = [
        ButtonRole::Positive,
        ButtonRole::Negative,
        ButtonRole::Neutral,
    ];

    pub fn tag(self) -> &'static str {
        match self {
            ButtonRole::Positive => "positive",
            ButtonRole::Negative => "negative",
            ButtonRole::Neutral => "neutral",
        }
    }

    pub(crate) fn style_target(self) -> StyleTarget {
        match self {
            ButtonRole::Positive => StyleTarget::PositiveButton,
            ButtonRole::Negative => StyleTarget::NegativeButton,
            ButtonRole::Neutral => StyleTarget::NeutralButton,
        }
    }
}

#[derive(uniffi::Enum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StyleTarget {
    Title,
    Message,
    PositiveButton,
    NegativeButton,
    NeutralButton,
}

/// One run of text sharing the same emphasis. Line breaks are `\n` inside `text`.
#[derive(uniffi::Record, Debug, Clone, PartialEq, Eq)]
pub struct TextSpan {
    pub text: String,
    pub bold: bool,
    pub italic: bool,
}

#[derive(uniffi::Record, Debug, Clone, PartialEq, Eq)]
pub struct DialogText {
    /// Text with markup removed; what a plain label should display.
    pub plain: String,
    pub spans: Vec<TextSpan>,
}

impl DialogText {
    pub fn plain(text: impl Into<String>) -> Self {
        let text = text.into();
        let spans = if text.is_empty() {
            vec![]
        } else {
            vec![TextSpan {
                text: text.clone(),
                bold: false,
                italic: false,
            }]
        };
        Self { plain: text, spans }
    }
}

#[derive(uniffi::Record, Debug, Clone, PartialEq, Eq)]
pub struct NativeButton {
    pub role: ButtonRole,
    pub label: String,
}

#[derive(uniffi::Record, Debug, Clone, PartialEq)]
pub struct NativeDialog {
    pub dialog_id: u64,
    pub title: DialogText,
    pub message: DialogText,
    pub buttons: Vec<NativeButton>,
    pub cancelable: bool,
    pub canceled_on_touch_outside: bool,
    /// `None` keeps the platform's default background dim.
    pub dim_amount: Option<f32>,
}
