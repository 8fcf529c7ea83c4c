use std::collections::VecDeque;

use pulldown_cmark::{CowStr, Event, Tag, TagEnd};
use rustc_hash::FxHashMap;

use crate::util::slugify;

/// Assigns a slug `id` to every heading that doesn't have one. Repeated slugs
/// are suffixed with `-1`, `-2`, and so on.
pub struct HeadingIds<'a, I: Iterator<Item = Event<'a>>> {
    stack: VecDeque<Event<'a>>,
    seen: FxHashMap<String, usize>,
    inner: I,
}

impl<'a, I: Iterator<Item = Event<'a>>> HeadingIds<'a, I> {
    pub fn new(inner: I) -> Self {
        HeadingIds { inner, seen: FxHashMap::default(), stack: VecDeque::with_capacity(4) }
    }

    /// `slug`, or `slug-N` for the first `N` not already taken.
    fn unique(&mut self, slug: String) -> String {
        let mut id = slug.clone();
        if let Some(&next) = self.seen.get(&slug) {
            let mut n = next;
            while self.seen.contains_key(&id) {
                id = format!("{slug}-{n}");
                n += 1;
            }

            self.seen.insert(slug, n);
        }

        self.seen.insert(id.clone(), 1);
        id
    }
}

impl<'a, I: Iterator<Item = Event<'a>>> Iterator for HeadingIds<'a, I> {
    type Item = Event<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(event) = self.stack.pop_front() {
            return Some(event);
        }

        match self.inner.next()? {
            Event::Start(Tag::Heading { level, id: None, classes, attrs }) => {
                let mut text = String::new();
                loop {
                    let event = self.inner.next()?;
                    if let Event::Text(ref s) | Event::Code(ref s) = event {
                        text.push_str(s);
                    } else if let Event::SoftBreak | Event::HardBreak = event {
                        text.push(' ');
                    } else if let Event::End(TagEnd::Heading(..)) = event {
                        break;
                    }

                    self.stack.push_back(event);
                }

                let id = self.unique(slugify(&text));
                self.stack.push_back(Event::End(TagEnd::Heading(level)));
                Some(Event::Start(Tag::Heading { level, id: Some(id.into()), classes, attrs }))
            },
            Event::Start(Tag::Heading { level, id: Some(id), classes, attrs }) => {
                self.seen.entry(id.to_string()).or_insert(1);
                Some(Event::Start(Tag::Heading { level, id: Some(id), classes, attrs }))
            }
            event => Some(event)
        }
    }
}

/// Inserts an empty self-link as the first child of every heading with an id.
pub struct HeadingAnchors<'a, I: Iterator<Item = Event<'a>>> {
    pending: Option<CowStr<'a>>,
    inner: I,
}

impl<'a, I: Iterator<Item = Event<'a>>> HeadingAnchors<'a, I> {
    pub fn new(inner: I) -> Self {
        HeadingAnchors { inner, pending: None }
    }
}

impl<'a, I: Iterator<Item = Event<'a>>> Iterator for HeadingAnchors<'a, I> {
    type Item = Event<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(id) = self.pending.take() {
            let html = format!(r##"<a class="anchor" title="anchor" href="#{id}"></a>"##);
            return Some(Event::Html(html.into()));
        }

        let event = self.inner.next()?;
        if let Event::Start(Tag::Heading { id: Some(ref id), .. }) = event {
            self.pending = Some(id.clone());
        }

        Some(event)
    }
}
