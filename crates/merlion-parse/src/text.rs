//! Text extraction and content cleanup.
//!
//! Amendment notes (`class="amendNote"`) are editorial annotations, not
//! substantive text, so every extraction skips those subtrees.

use std::sync::LazyLock;

use ego_tree::NodeRef;
use regex::Regex;
use scraper::{ElementRef, Node};

/// A parenthesized token split across lines by table layout:
/// `"(\n a \n)"` folds back to `"(a)"`.
static SPLIT_PAREN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(\s*\n\s*([a-zA-Z0-9]+)\s*\n\s*\)").expect("static regex"));

static EXCESS_NEWLINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("static regex"));

/// Collect the element's text nodes, trimmed, joined with newlines.
pub fn element_text(el: ElementRef<'_>) -> String {
    element_text_with(el, "\n")
}

/// Collect the element's text nodes, trimmed, joined with `sep`.
pub fn element_text_with(el: ElementRef<'_>, sep: &str) -> String {
    let mut parts = Vec::new();
    for child in el.children() {
        collect(child, &mut parts);
    }
    parts.join(sep)
}

fn collect(node: NodeRef<'_, Node>, parts: &mut Vec<String>) {
    match node.value() {
        Node::Text(text) => {
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                parts.push(trimmed.to_string());
            }
        }
        Node::Element(el) if el.classes().any(|c| c == "amendNote") => {}
        _ => {
            for child in node.children() {
                collect(child, parts);
            }
        }
    }
}

/// Normalise extracted section content.
///
/// Folds split parentheses, collapses runs of 3+ newlines to exactly 2,
/// and when the numbering token opens the content on a line of its own,
/// folds it into the first line with a single space.
pub fn clean_content(raw: &str, number: Option<&str>) -> String {
    let folded = SPLIT_PAREN.replace_all(raw, "($1)");
    let collapsed = EXCESS_NEWLINES.replace_all(&folded, "\n\n");
    let mut content = collapsed.into_owned();

    if let Some(num) = number
        && let Some(rest) = content.strip_prefix(num)
        && let Some(rest) = rest.strip_prefix('\n')
    {
        content = format!("{num} {rest}");
    }

    content.trim().to_string()
}
