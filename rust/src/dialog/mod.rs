//! Declarative dialog schema: the validated, defaulted form of a popup config.

mod decision;
pub(crate) mod html;
mod parse;

pub use decision::{should_show, IgnoredVersionSet};
pub use parse::{parse, ParseError};

use crate::actions::ActionKind;
use crate::host::ButtonRole;

pub const DEFAULT_TITLE: &str = "提示";
pub const MAX_BUTTONS: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogSpec {
    pub title: String,
    pub message: String,
    /// Materialized buttons only, in positive/negative/neutral order.
    pub buttons: Vec<ButtonSpec>,
    pub behavior: DialogBehavior,
    pub style: Option<DialogStyle>,
    pub version: Option<String>,
}

impl Default for DialogSpec {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            message: String::new(),
            buttons: vec![],
            behavior: DialogBehavior::default(),
            style: None,
            version: None,
        }
    }
}

impl DialogSpec {
    pub fn button(&self, role: ButtonRole) -> Option<&ButtonSpec> {
        self.buttons.iter().find(|b| b.role == role)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ButtonSpec {
    pub role: ButtonRole,
    pub text: String,
    pub action: ActionKind,
    pub data: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DialogBehavior {
    pub cancelable: bool,
    pub dim_background: bool,
}

impl Default for DialogBehavior {
    fn default() -> Self {
        Self {
            cancelable: true,
            dim_background: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DialogStyle {
    pub title_color: Option<Color>,
    pub message_color: Option<Color>,
    pub positive_button_color: Option<Color>,
    pub negative_button_color: Option<Color>,
    pub neutral_button_color: Option<Color>,
}

impl DialogStyle {
    pub fn is_empty(&self) -> bool {
        *self == DialogStyle::default()
    }

    pub fn button_color(&self, role: ButtonRole) -> Option<Color> {
        match role {
            ButtonRole::Positive => self.positive_button_color,
            ButtonRole::Negative => self.negative_button_color,
            ButtonRole::Neutral => self.neutral_button_color,
        }
    }
}

/// Packed `0xAARRGGBB`, the layout Android's color ints and the iOS bridge both take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color(pub u32);

impl Color {
    /// Accepts `#RRGGBB` (opaque) and `#AARRGGBB`.
    pub fn parse(s: &str) -> Option<Color> {
        let hex = s.trim().strip_prefix('#')?;
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        let value = u32::from_str_radix(hex, 16).ok()?;
        match hex.len() {
            6 => Some(Color(0xFF00_0000 | value)),
            8 => Some(Color(value)),
            _ => None,
        }
    }

    pub fn argb(self) -> u32 {
        self.0
    }
}
