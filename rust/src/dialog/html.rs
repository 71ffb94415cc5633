// Restricted HTML subset for dialog title/message: bold, italic, line break.

use scraper::{ElementRef, Html, Node};

use crate::host::{DialogText, TextSpan};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub(crate) enum HtmlError {
    #[error("unsupported element <{0}>")]
    UnsupportedElement(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Emphasis {
    bold: bool,
    italic: bool,
}

/// Renders markup into styled spans. Anything outside the subset is an error;
/// callers fall back to [`render_or_plain`].
pub(crate) fn render(markup: &str) -> Result<DialogText, HtmlError> {
    if !markup.contains('<') && !markup.contains('&') {
        return Ok(DialogText::plain(markup));
    }
    let fragment = Html::parse_fragment(markup);
    let mut out = SpanBuilder::default();
    // Fragments are wrapped in a synthetic <html> root; walk its children.
    walk_children(fragment.root_element(), Emphasis::default(), &mut out)?;
    Ok(out.finish())
}

pub(crate) fn render_or_plain(markup: &str) -> DialogText {
    match render(markup) {
        Ok(text) => text,
        Err(e) => {
            tracing::debug!(%e, "markup rendering failed; using plain text");
            DialogText::plain(markup)
        }
    }
}

fn walk_children(
    element: ElementRef<'_>,
    emphasis: Emphasis,
    out: &mut SpanBuilder,
) -> Result<(), HtmlError> {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_text(text, emphasis),
            Node::Element(el) => {
                let nested = match el.name() {
                    "br" => {
                        out.push_break(emphasis);
                        continue;
                    }
                    "b" | "strong" => Emphasis {
                        bold: true,
                        ..emphasis
                    },
                    "i" | "em" => Emphasis {
                        italic: true,
                        ..emphasis
                    },
                    other => return Err(HtmlError::UnsupportedElement(other.to_string())),
                };
                if let Some(child_el) = ElementRef::wrap(child) {
                    walk_children(child_el, nested, out)?;
                }
            }
            // Comments and the like carry no visible text.
            _ => {}
        }
    }
    Ok(())
}

struct SpanBuilder {
    spans: Vec<TextSpan>,
    line_start: bool,
    last_was_space: bool,
}

impl Default for SpanBuilder {
    fn default() -> Self {
        Self {
            spans: vec![],
            line_start: true,
            last_was_space: false,
        }
    }
}

impl SpanBuilder {
    /// HTML whitespace collapsing: a run becomes one space, dropped at line starts.
    fn push_text(&mut self, raw: &str, emphasis: Emphasis) {
        let mut collapsed = String::with_capacity(raw.len());
        for c in raw.chars() {
            if c.is_whitespace() {
                if self.line_start || self.last_was_space {
                    continue;
                }
                collapsed.push(' ');
                self.last_was_space = true;
            } else {
                collapsed.push(c);
                self.last_was_space = false;
                self.line_start = false;
            }
        }
        if !collapsed.is_empty() {
            self.append(collapsed, emphasis);
        }
    }

    fn push_break(&mut self, emphasis: Emphasis) {
        self.append("\n".to_string(), emphasis);
        self.line_start = true;
        self.last_was_space = false;
    }

    fn append(&mut self, text: String, emphasis: Emphasis) {
        if let Some(last) = self.spans.last_mut() {
            if last.bold == emphasis.bold && last.italic == emphasis.italic {
                last.text.push_str(&text);
                return;
            }
        }
        self.spans.push(TextSpan {
            text,
            bold: emphasis.bold,
            italic: emphasis.italic,
        });
    }

    fn finish(mut self) -> DialogText {
        while let Some(last) = self.spans.last_mut() {
            let trimmed = last.text.trim_end_matches(' ').len();
            last.text.truncate(trimmed);
            if !last.text.is_empty() {
                break;
            }
            self.spans.pop();
        }
        let plain = self.spans.iter().map(|s| s.text.as_str()).collect();
        DialogText {
            plain,
            spans: self.spans,
        }
    }
}
