//! Small HTML text helpers shared by the link collector and the extractor.

use once_cell::sync::Lazy;
use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};

static MAIN: Lazy<Selector> = Lazy::new(|| Selector::parse("main").expect("valid selector"));

/// Subtrees that never contribute article text.
pub const STRIPPED_TAGS: &[&str] = &["script", "style", "nav", "footer", "header", "form", "aside"];

/// Collapse whitespace runs (including non-breaking spaces) to single spaces.
pub fn clean_text(s: &str) -> String {
    s.replace('\u{a0}', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn is_stripped(tag: &str) -> bool {
    STRIPPED_TAGS.contains(&tag)
}

fn push_visible_text(el: ElementRef<'_>, out: &mut String) {
    for child in el.children() {
        match child.value() {
            Node::Text(text) => {
                out.push(' ');
                out.push_str(text);
            }
            Node::Element(element) if !is_stripped(element.name()) => {
                if let Some(child_el) = ElementRef::wrap(child) {
                    push_visible_text(child_el, out);
                }
            }
            _ => {}
        }
    }
}

/// Whitespace-normalized text of `el`, skipping stripped subtrees inside it.
pub fn visible_text(el: ElementRef<'_>) -> String {
    let mut raw = String::new();
    push_visible_text(el, &mut raw);
    clean_text(&raw)
}

/// True when `el` sits inside a stripped subtree below `root`.
pub fn inside_stripped(el: ElementRef<'_>, root: ElementRef<'_>) -> bool {
    if is_stripped(el.value().name()) {
        return true;
    }
    for ancestor in el.ancestors() {
        if ancestor.id() == root.id() {
            break;
        }
        if let Some(ancestor_el) = ElementRef::wrap(ancestor) {
            if is_stripped(ancestor_el.value().name()) {
                return true;
            }
        }
    }
    false
}

/// The `<main>` element, or the document root when there is none.
pub fn primary_region(document: &Html) -> ElementRef<'_> {
    document
        .select(&MAIN)
        .next()
        .unwrap_or_else(|| document.root_element())
}
