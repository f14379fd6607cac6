//! Markdown to HTML, on top of pulldown-cmark.
//!
//! The parser already covers tables, footnotes, definition lists, heading
//! attributes and smart punctuation. This module rewrites its event stream
//! for the GitHub-like output the stylesheets expect:
//!
//! - soft line breaks become `<br />`,
//! - every heading gets a unique slug `id` (no permalink anchors),
//! - code blocks are replaced by highlighted `codehilite` blocks,
//! - footnote definitions are pulled out of the flow and rendered as one
//!   trailing `<div class="footnote">` with back-references.

use crate::{escape_html, highlighting};
use log::debug;
use pulldown_cmark::{html, CodeBlockKind, CowStr, Event, Options, Parser, Tag, TagEnd};
use std::collections::HashMap;

/// The parser extensions enabled for every conversion.
pub fn markdown_options() -> Options {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);
    options.insert(Options::ENABLE_SMART_PUNCTUATION);
    options.insert(Options::ENABLE_HEADING_ATTRIBUTES);
    options.insert(Options::ENABLE_DEFINITION_LIST);
    options
}

/// Turns heading text into an anchor id, the way table-of-contents
/// extensions do: transliterate to ASCII, lowercase, keep word characters,
/// join words with `-`.
pub fn slugify(text: &str) -> String {
    let ascii = deunicode::deunicode(text).to_lowercase();
    let mut slug = String::with_capacity(ascii.len());
    let mut pending_dash = false;
    for c in ascii.chars() {
        if c.is_ascii_alphanumeric() || c == '_' {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        } else if c == '-' || c.is_whitespace() {
            pending_dash = true;
        }
    }
    slug
}

/// Hands out unique heading ids for one document.
#[derive(Debug, Default)]
pub struct HeadingAnchors {
    used: HashMap<String, usize>,
}

impl HeadingAnchors {
    /// Returns `base`, or `base_1`, `base_2`… when it was already taken.
    pub fn unique(&mut self, base: &str) -> String {
        let base = if base.is_empty() { "section" } else { base };
        let mut candidate = base.to_string();
        while let Some(count) = self.used.get_mut(&candidate) {
            *count += 1;
            candidate = format!("{}_{}", base, count);
        }
        self.used.insert(candidate.clone(), 0);
        candidate
    }

    fn reserve(&mut self, id: &str) {
        self.used.entry(id.to_string()).or_insert(0);
    }
}

/// Footnote numbering and reference bookkeeping for one document.
#[derive(Debug, Default)]
struct Footnotes<'a> {
    /// Definitions in document order.
    definitions: Vec<(CowStr<'a>, Vec<Event<'a>>)>,
    /// Labels in order of first reference; position + 1 is the number.
    order: Vec<String>,
    references: HashMap<String, usize>,
}

impl<'a> Footnotes<'a> {
    fn is_defined(&self, label: &str) -> bool {
        self.definitions.iter().any(|(l, _)| l.as_ref() == label)
    }

    fn number(&self, label: &str) -> Option<usize> {
        self.order.iter().position(|l| l == label).map(|i| i + 1)
    }

    /// Renders a reference, numbering the label on first use.
    fn reference(&mut self, label: &str) -> String {
        if self.number(label).is_none() {
            self.order.push(label.to_string());
        }
        let number = self.number(label).unwrap_or(self.order.len());
        let count = self.references.entry(label.to_string()).or_insert(0);
        *count += 1;
        let id = if *count == 1 {
            format!("fnref:{}", label)
        } else {
            format!("fnref{}:{}", count, label)
        };
        format!(
            "<sup id=\"{}\"><a class=\"footnote-ref\" href=\"#fn:{}\">{}</a></sup>",
            escape_html(&id),
            escape_html(label),
            number
        )
    }
}

/// Moves footnote definitions out of the event stream.
fn split_footnotes(events: Vec<Event<'_>>) -> (Vec<Event<'_>>, Footnotes<'_>) {
    let mut body = Vec::with_capacity(events.len());
    let mut footnotes = Footnotes::default();
    let mut current: Option<(CowStr, Vec<Event>)> = None;

    for event in events {
        match event {
            Event::Start(Tag::FootnoteDefinition(label)) => {
                current = Some((label, Vec::new()));
            }
            Event::End(TagEnd::FootnoteDefinition) => {
                if let Some(definition) = current.take() {
                    footnotes.definitions.push(definition);
                }
            }
            event => match current.as_mut() {
                Some((_, inner)) => inner.push(event),
                None => body.push(event),
            },
        }
    }

    (body, footnotes)
}

fn heading_text(events: &[Event]) -> String {
    let mut text = String::new();
    for event in events {
        match event {
            Event::Text(t) | Event::Code(t) => text.push_str(t),
            _ => {}
        }
    }
    text
}

/// Applies the GitHub-style rewrites to a run of events.
fn rewrite<'a>(
    events: Vec<Event<'a>>,
    anchors: &mut HeadingAnchors,
    footnotes: &mut Footnotes<'a>,
) -> Vec<Event<'a>> {
    let mut out = Vec::with_capacity(events.len());
    let mut iter = events.into_iter();

    while let Some(event) = iter.next() {
        match event {
            Event::SoftBreak => out.push(Event::HardBreak),
            Event::Start(Tag::Heading {
                level,
                id,
                classes,
                attrs,
            }) => {
                let mut inner = Vec::new();
                for e in iter.by_ref() {
                    if matches!(e, Event::End(TagEnd::Heading(_))) {
                        break;
                    }
                    inner.push(e);
                }
                let id = match id {
                    Some(explicit) => {
                        anchors.reserve(&explicit);
                        explicit
                    }
                    None => CowStr::from(anchors.unique(&slugify(&heading_text(&inner)))),
                };
                out.push(Event::Start(Tag::Heading {
                    level,
                    id: Some(id),
                    classes,
                    attrs,
                }));
                out.extend(rewrite(inner, anchors, footnotes));
                out.push(Event::End(TagEnd::Heading(level)));
            }
            Event::Start(Tag::CodeBlock(kind)) => {
                let mut code = String::new();
                for e in iter.by_ref() {
                    match e {
                        Event::End(TagEnd::CodeBlock) => break,
                        Event::Text(t) => code.push_str(&t),
                        _ => {}
                    }
                }
                let info = match &kind {
                    CodeBlockKind::Fenced(info) if !info.trim().is_empty() => Some(info.as_ref()),
                    _ => None,
                };
                out.push(Event::Html(CowStr::from(highlighting::highlight_block(
                    &code, info,
                ))));
            }
            Event::FootnoteReference(label) => {
                if footnotes.is_defined(&label) {
                    out.push(Event::InlineHtml(CowStr::from(footnotes.reference(&label))));
                } else {
                    debug!("Footnote [^{}] has no definition", label);
                    out.push(Event::Text(CowStr::from(format!("[^{}]", label))));
                }
            }
            event => out.push(event),
        }
    }

    out
}

/// Places the back-reference link at the end of the note's last paragraph.
fn with_backref<'a>(mut events: Vec<Event<'a>>, label: &str, number: usize) -> Vec<Event<'a>> {
    let backref = Event::InlineHtml(CowStr::from(format!(
        "&#160;<a class=\"footnote-backref\" href=\"#fnref:{}\" title=\"Jump back to footnote {} in the text\">&#8617;</a>",
        escape_html(label),
        number
    )));
    match events
        .iter()
        .rposition(|e| matches!(e, Event::End(TagEnd::Paragraph)))
    {
        Some(pos) => events.insert(pos, backref),
        None => events.push(backref),
    }
    events
}

fn render_footnotes<'a>(
    out: &mut String,
    mut footnotes: Footnotes<'a>,
    anchors: &mut HeadingAnchors,
) {
    if footnotes.definitions.is_empty() {
        return;
    }

    let mut definitions: HashMap<String, Vec<Event<'a>>> = HashMap::new();
    let mut document_order = Vec::new();
    for (label, events) in std::mem::take(&mut footnotes.definitions) {
        document_order.push(label.to_string());
        definitions.insert(label.to_string(), events);
    }
    // Keep lookups working for references made from inside other notes.
    footnotes.definitions = document_order
        .iter()
        .map(|l| (CowStr::from(l.clone()), Vec::new()))
        .collect();

    out.push_str("<div class=\"footnote\">\n<hr />\n<ol>\n");

    // Notes can reference notes, which grows `order` while we walk it. Once
    // the referenced notes run out, the next unreferenced definition (in
    // document order) takes the following number, so list positions and
    // reference numbers always agree.
    let mut index = 0;
    loop {
        if index == footnotes.order.len() {
            let next = document_order
                .iter()
                .find(|l| footnotes.number(l).is_none())
                .cloned();
            match next {
                Some(label) => footnotes.order.push(label),
                None => break,
            }
        }
        let label = footnotes.order[index].clone();
        index += 1;
        let Some(events) = definitions.remove(&label) else {
            continue;
        };
        let events = rewrite(events, anchors, &mut footnotes);
        let events = if footnotes.references.contains_key(&label) {
            with_backref(events, &label, index)
        } else {
            events
        };
        out.push_str(&format!("<li id=\"fn:{}\">\n", escape_html(&label)));
        html::push_html(out, events.into_iter());
        out.push_str("</li>\n");
    }

    out.push_str("</ol>\n</div>\n");
}

/// Converts Markdown source to an HTML body fragment.
///
/// # Examples
/// ```
/// let html = md_pdf::markdown::markdown_to_html("# Hello\n\n| a | b |\n|---|---|\n| 1 | 2 |\n");
/// assert!(html.contains("<h1 id=\"hello\">Hello</h1>"));
/// assert!(html.contains("<table>"));
/// ```
pub fn markdown_to_html(markdown: &str) -> String {
    let events: Vec<Event> = Parser::new_ext(markdown, markdown_options()).collect();
    let mut anchors = HeadingAnchors::default();
    // Explicit ids win over generated slugs wherever they appear.
    for event in &events {
        if let Event::Start(Tag::Heading { id: Some(id), .. }) = event {
            anchors.reserve(id);
        }
    }
    let (body, mut footnotes) = split_footnotes(events);

    let body = rewrite(body, &mut anchors, &mut footnotes);

    let mut out = String::with_capacity(markdown.len() * 2);
    html::push_html(&mut out, body.into_iter());
    render_footnotes(&mut out, footnotes, &mut anchors);
    out
}
