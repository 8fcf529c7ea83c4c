//! Markdown to HTML rendering and table-of-contents extraction.

mod headings;
pub mod toc;

use pulldown_cmark::{html, Options as CmarkOptions, Parser};

pub use headings::{HeadingAnchors, HeadingIds};

/// Rendering switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Options {
    /// Render straight quotes and dashes as typographic ones.
    pub smart_punctuation: bool,
    /// Emit an `<a class="anchor">` self-link after each heading's opening tag.
    pub heading_anchors: bool,
}

impl Default for Options {
    fn default() -> Self {
        Options { smart_punctuation: true, heading_anchors: true }
    }
}

impl Options {
    fn cmark(&self) -> CmarkOptions {
        let mut options = CmarkOptions::ENABLE_TABLES
            | CmarkOptions::ENABLE_FOOTNOTES
            | CmarkOptions::ENABLE_STRIKETHROUGH
            | CmarkOptions::ENABLE_TASKLISTS
            | CmarkOptions::ENABLE_HEADING_ATTRIBUTES;

        if self.smart_punctuation {
            options |= CmarkOptions::ENABLE_SMART_PUNCTUATION;
        }

        options
    }
}

/// Renders `source` as HTML. Every heading is given an `id`: the explicit one
/// (`# Title {#id}`) if present, otherwise a slug of its text.
pub fn render(source: &str, options: &Options) -> String {
    let events = HeadingIds::new(Parser::new_ext(source, options.cmark()));

    let mut output = String::with_capacity(source.len() + source.len() / 2);
    if options.heading_anchors {
        html::push_html(&mut output, HeadingAnchors::new(events));
    } else {
        html::push_html(&mut output, events);
    }

    output
}
