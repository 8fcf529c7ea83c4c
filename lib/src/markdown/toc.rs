//! Builds a table of contents from rendered HTML.

use std::fmt::Write;

use memchr::memmem;

use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heading {
    pub level: u8,
    pub id: String,
    pub title: String,
}

/// Renders a nested `<ol>` linking to every heading in `html` that has an
/// `id`. Returns an empty string if there are none.
pub fn render(html: &str) -> Result<String> {
    let headings = headings(html)?;
    if headings.is_empty() {
        return Ok(String::new());
    }

    // Levels of the currently open lists, innermost last.
    let mut open: Vec<u8> = vec![];
    let mut out = String::new();
    for heading in &headings {
        match open.last() {
            Some(&level) if heading.level <= level => {
                out.push_str("</li>");
                while open.len() > 1 && open.last().map_or(false, |&l| heading.level < l) {
                    open.pop();
                    out.push_str("</ol>");

                    // Deeper than the parent: nest under the still-open item.
                    if open.last().map_or(false, |&l| heading.level > l) {
                        open.push(heading.level);
                        out.push_str("<ol>");
                        break;
                    }

                    out.push_str("</li>");
                }
            }
            _ => {
                open.push(heading.level);
                out.push_str("<ol>");
            }
        }

        let _ = write!(out, r##"<li><a href="#{}">{}</a>"##, heading.id, heading.title);
    }

    out.push_str("</li>");
    while open.pop().is_some() {
        out.push_str("</ol>");
        if !open.is_empty() {
            out.push_str("</li>");
        }
    }

    Ok(out)
}

/// Finds every `<h1>`..`<h6>` element carrying an `id` attribute, in document
/// order. Tags inside a heading are dropped from its title.
pub fn headings(html: &str) -> Result<Vec<Heading>> {
    let bytes = html.as_bytes();
    let mut headings = vec![];
    let mut cursor = 0;
    while let Some(offset) = memmem::find(&bytes[cursor..], b"<h") {
        let start = cursor + offset;
        cursor = start + 2;

        let level = match bytes.get(start + 2) {
            Some(c @ b'1'..=b'6') => c - b'0',
            _ => continue,
        };

        if !matches!(bytes.get(start + 3), Some(b'>' | b' ' | b'\t' | b'\n')) {
            continue;
        }

        let Some(tag_end) = memchr::memchr(b'>', &bytes[start..]).map(|i| start + i) else {
            return err!("unterminated heading tag", "offset" => start);
        };

        let close = format!("</h{level}>");
        let Some(close_start) = memmem::find(&bytes[tag_end..], close.as_bytes()).map(|i| tag_end + i) else {
            return err! {
                "heading is missing its closing tag",
                "expected" => close,
                "offset" => start,
            };
        };

        cursor = close_start + close.len();
        if let Some(id) = attribute(&html[start + 3..tag_end], "id") {
            let title = strip_tags(&html[tag_end + 1..close_start]);
            headings.push(Heading { level, id: id.to_string(), title: title.trim().to_string() });
        }
    }

    Ok(headings)
}

fn attribute<'a>(attrs: &'a str, name: &str) -> Option<&'a str> {
    let mut rest = attrs;
    while let Some(i) = rest.find(name) {
        let preceded_by_space = i == 0 || rest.as_bytes()[i - 1].is_ascii_whitespace();
        let after = &rest[i + name.len()..];
        rest = after;
        if !preceded_by_space {
            continue;
        }

        let Some(value) = after.trim_start().strip_prefix('=') else { continue };
        let value = value.trim_start();
        let quote = match value.chars().next() {
            Some(q @ ('"' | '\'')) => q,
            _ => return value.split(|c: char| c.is_whitespace()).next(),
        };

        return value[1..].split(quote).next();
    }

    None
}

fn strip_tags(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }

    out
}
