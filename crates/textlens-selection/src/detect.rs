//! Selection classification.
//!
//! Two tag families feed one set. Structural tags come from the elements
//! around the selection (anchor ancestry and the fragment's top-level
//! elements). Content tags come from pattern heuristics over the text.
//! The word/sentence/paragraph fallback only applies when no specific tag
//! fired; `long_text` is independent of both.

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::clean::count_words;
use crate::html::{self, Element, Node};
use crate::types::{ElementInfo, SelectionType};

/// Word count at which a selection is also `long_text`.
pub const LONG_TEXT_WORDS: usize = 50;

const ERROR_KEYWORDS: &[&str] = &[
    "error",
    "exception",
    "failed",
    "warning",
    "traceback",
    "uncaught",
    "undefined",
    "nullpointer",
    "segmentation fault",
];

static TERMINAL_PROMPT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\$|❯|>>>|PS [A-Za-z]:\\[^>]*>|[A-Za-z]:\\[^>]*>|[\w.-]+@[\w.-]+(:\S*)?\s*[$#%])\s+\S")
        .expect("Invalid terminal prompt regex")
});
static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").expect("Invalid email regex")
});
static URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\bhttps?://[^\s<>"]+|\bwww\.[^\s<>"]+\.[a-z]{2,}"#).expect("Invalid url regex")
});
static SENTENCE_END: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[.!?]+(\s|$)").expect("Invalid sentence regex"));

/// Weak markdown signals; two must match.
static MARKDOWN_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?m)^#{1,6}\s+\S",
        r"\*\*[^*\n]+\*\*",
        r"(?m)^\s*[-*+]\s+\S",
        r"(?m)^\s*\d+\.\s+\S",
        r"\[[^\]\n]+\]\([^)\s]+\)",
        r"`[^`\n]+`",
        r"(?m)^```",
        r"(?m)^>\s",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("Invalid markdown regex"))
    .collect()
});

/// Classify a selection. The result is never empty.
///
/// `ancestors` are the elements enclosing the selection anchor, nearest
/// first; `anchor_text` is the full text of the enclosing link, if any.
pub fn detect_selection_types(
    text: &str,
    fragment_html: &str,
    ancestors: &[ElementInfo],
    anchor_text: Option<&str>,
) -> BTreeSet<SelectionType> {
    let fragment = html::parse_fragment(fragment_html);
    let mut types = detect_structural(text, &fragment, ancestors, anchor_text);
    types.extend(detect_content(text, &types));
    types
}

/// Structural tags from the anchor ancestry and the fragment.
pub fn detect_structural(
    text: &str,
    fragment: &[Node],
    ancestors: &[ElementInfo],
    anchor_text: Option<&str>,
) -> BTreeSet<SelectionType> {
    let mut types = BTreeSet::new();
    let selected = text.trim();

    for ancestor in ancestors {
        if let Some(kind) = structural_kind(&ancestor.tag, &ancestor.classes) {
            if kind == SelectionType::Link {
                let full = ancestor.text.as_deref().or(anchor_text);
                if !full.is_some_and(|t| !selected.is_empty() && t.trim() == selected) {
                    continue;
                }
            }
            types.insert(kind);
        }
    }

    for element in html::top_level_elements(fragment) {
        if let Some(kind) = structural_kind(&element.tag, &element.classes()) {
            if kind == SelectionType::Link && !link_matches(element, selected) {
                continue;
            }
            types.insert(kind);
        }
    }

    types
}

fn link_matches(element: &Element, selected: &str) -> bool {
    !selected.is_empty() && html::collapse_whitespace(&element.text_content()) == html::collapse_whitespace(selected)
}

fn structural_kind(tag: &str, classes: &[String]) -> Option<SelectionType> {
    let kind = match tag {
        "table" | "thead" | "tbody" | "tfoot" | "tr" | "td" | "th" => SelectionType::Table,
        "ul" | "ol" | "li" => SelectionType::List,
        "pre" | "code" => SelectionType::Code,
        "math" | "mjx-container" => SelectionType::Math,
        "blockquote" | "q" => SelectionType::Quote,
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => SelectionType::Header,
        "dl" | "dt" | "dd" => SelectionType::DefinitionList,
        "a" => SelectionType::Link,
        _ => return class_kind(classes),
    };
    Some(kind)
}

fn class_kind(classes: &[String]) -> Option<SelectionType> {
    classes.iter().find_map(|class| {
        let lower = class.to_ascii_lowercase();
        if lower.starts_with("language-")
            || lower.starts_with("lang-")
            || matches!(lower.as_str(), "highlight" | "hljs" | "code-block" | "sourcecode")
        {
            Some(SelectionType::Code)
        } else if lower.starts_with("katex") || lower.starts_with("mathjax") {
            Some(SelectionType::Math)
        } else {
            None
        }
    })
}

/// Content tags from the text alone.
///
/// `structural` is consulted for the URL rule (suppressed by `link`) and
/// for fallback suppression.
pub fn detect_content(text: &str, structural: &BTreeSet<SelectionType>) -> BTreeSet<SelectionType> {
    let mut types = BTreeSet::new();
    let trimmed = text.trim();

    if is_json(trimmed) {
        types.insert(SelectionType::Json);
    }
    if trimmed.contains("\\(") || trimmed.contains("\\[") {
        types.insert(SelectionType::Latex);
    }
    if is_terminal_output(trimmed) {
        types.insert(SelectionType::TerminalOutput);
    }
    if has_error_keyword(trimmed) {
        types.insert(SelectionType::ErrorMessage);
    }
    if EMAIL.is_match(trimmed) {
        types.insert(SelectionType::Email);
    }
    if !structural.contains(&SelectionType::Link) && URL.is_match(trimmed) {
        types.insert(SelectionType::Url);
    }
    if is_markdown(trimmed) {
        types.insert(SelectionType::Markdown);
    }

    let words = count_words(trimmed);
    if words >= LONG_TEXT_WORDS {
        types.insert(SelectionType::LongText);
    }

    let specific = types
        .iter()
        .chain(structural.iter())
        .any(SelectionType::is_specific);
    if !specific {
        types.insert(fallback_kind(trimmed, words));
    }

    types
}

fn fallback_kind(text: &str, words: usize) -> SelectionType {
    let terminators = SENTENCE_END.find_iter(text).count();
    if words <= 3 && terminators == 0 {
        SelectionType::Word
    } else if terminators <= 1 && text.chars().count() < 200 {
        SelectionType::Sentence
    } else {
        SelectionType::Paragraph
    }
}

pub fn is_json(text: &str) -> bool {
    (text.starts_with('{') || text.starts_with('['))
        && serde_json::from_str::<serde_json::Value>(text).is_ok()
}

pub fn is_terminal_output(text: &str) -> bool {
    text.lines()
        .find(|line| !line.trim().is_empty())
        .is_some_and(|first| TERMINAL_PROMPT.is_match(first.trim_start()))
}

pub fn has_error_keyword(text: &str) -> bool {
    let lower = text.to_lowercase();
    ERROR_KEYWORDS.iter().any(|keyword| lower.contains(keyword))
}

pub fn is_markdown(text: &str) -> bool {
    MARKDOWN_PATTERNS
        .iter()
        .filter(|pattern| pattern.is_match(text))
        .take(2)
        .count()
        >= 2
}

#[cfg(test)]
#[path = "detect_tests.rs"]
mod tests;
