//! LLM-oriented formatting.
//!
//! [`FORMAT_RULES`] is scanned top to bottom; the first rule sharing a tag
//! with the selection formats it and nothing else runs. When no rule
//! matches, the cleaned text passes through unchanged.

mod code;
mod list;
mod table;

use std::collections::BTreeSet;

use crate::clean::preserve_layout;
use crate::html::{self, Node};
use crate::types::SelectionType;

pub use code::{detect_language, language_hint, normalize_language};
pub use list::reconstruct_list;
pub use table::{reconstruct_table, table_fallback};

/// Default word ceiling for long text.
pub const DEFAULT_MAX_WORDS: usize = 1000;

/// Everything a formatter may look at.
#[derive(Debug, Clone, Copy)]
pub struct FormatInput<'a> {
    /// Cleaned text.
    pub text: &'a str,
    /// Raw selected text, layout intact.
    pub original_text: &'a str,
    /// Selected HTML fragment.
    pub html: &'a str,
    /// Language hint from `language-*` classes, if any.
    pub language_hint: Option<&'a str>,
    pub max_words: usize,
}

impl<'a> FormatInput<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            text,
            original_text: text,
            html: "",
            language_hint: None,
            max_words: DEFAULT_MAX_WORDS,
        }
    }

    fn fragment(&self) -> Vec<Node> {
        html::parse_fragment(self.html)
    }

    /// Text for code-like selections: raw layout if available.
    fn code_text(&self) -> String {
        let layout = preserve_layout(self.original_text);
        if layout.is_empty() {
            self.text.to_string()
        } else {
            layout
        }
    }
}

/// One row of the formatter table.
pub struct FormatRule {
    pub name: &'static str,
    pub tags: &'static [SelectionType],
    pub format: fn(&FormatInput<'_>) -> String,
}

/// Formatter priority, highest first.
pub static FORMAT_RULES: &[FormatRule] = &[
    FormatRule {
        name: "json",
        tags: &[SelectionType::Json],
        format: format_json,
    },
    FormatRule {
        name: "code",
        tags: &[SelectionType::Code],
        format: format_code,
    },
    FormatRule {
        name: "diagnostic",
        tags: &[SelectionType::ErrorMessage, SelectionType::TerminalOutput],
        format: format_plain_block,
    },
    FormatRule {
        name: "table",
        tags: &[SelectionType::Table],
        format: format_table,
    },
    FormatRule {
        name: "math",
        tags: &[SelectionType::Math],
        format: format_math,
    },
    FormatRule {
        name: "list",
        tags: &[SelectionType::List],
        format: format_list,
    },
    FormatRule {
        name: "long_text",
        tags: &[SelectionType::LongText],
        format: format_long_text,
    },
];

/// The rule that applies to a tag set, if any.
pub fn matching_rule(types: &BTreeSet<SelectionType>) -> Option<&'static FormatRule> {
    FORMAT_RULES
        .iter()
        .find(|rule| rule.tags.iter().any(|tag| types.contains(tag)))
}

/// Format a selection for the model.
pub fn format_for_llm(input: &FormatInput<'_>, types: &BTreeSet<SelectionType>) -> String {
    match matching_rule(types) {
        Some(rule) => (rule.format)(input),
        None => input.text.to_string(),
    }
}

fn fence(language: &str, body: &str) -> String {
    format!("```{}\n{}\n```", language, body)
}

fn format_json(input: &FormatInput<'_>) -> String {
    // String values keep their exact whitespace, so parse the raw selection
    // before the whitespace-collapsed text.
    let pretty = [input.original_text, input.text]
        .into_iter()
        .find_map(|text| serde_json::from_str::<serde_json::Value>(text.trim()).ok())
        .and_then(|value| serde_json::to_string_pretty(&value).ok());
    match pretty {
        Some(pretty) => fence("json", &pretty),
        None => fence("", &input.code_text()),
    }
}

fn format_code(input: &FormatInput<'_>) -> String {
    let body = input.code_text();
    let language = input
        .language_hint
        .and_then(normalize_language)
        .unwrap_or_else(|| detect_language(&body));
    fence(language, &body)
}

fn format_plain_block(input: &FormatInput<'_>) -> String {
    fence("", &input.code_text())
}

fn format_table(input: &FormatInput<'_>) -> String {
    reconstruct_table(&input.fragment()).unwrap_or_else(|| table_fallback(input.text))
}

fn format_math(input: &FormatInput<'_>) -> String {
    if has_latex_delimiters(input.text) || input.html.trim().is_empty() {
        input.text.to_string()
    } else {
        fence("mathml", input.html.trim())
    }
}

fn has_latex_delimiters(text: &str) -> bool {
    ["\\(", "\\[", "$$"].iter().any(|d| text.contains(d))
}

fn format_list(input: &FormatInput<'_>) -> String {
    reconstruct_list(&input.fragment()).unwrap_or_else(|| input.text.to_string())
}

fn format_long_text(input: &FormatInput<'_>) -> String {
    truncate_words(input.text, input.max_words)
}

/// Cut text after `max_words` words, appending a truncation marker.
pub fn truncate_words(text: &str, max_words: usize) -> String {
    let total = text.split_whitespace().count();
    if total <= max_words {
        return text.to_string();
    }

    let mut seen = 0;
    let mut in_word = false;
    let mut end = 0;
    for (i, c) in text.char_indices() {
        if c.is_whitespace() {
            in_word = false;
            continue;
        }
        if !in_word {
            if seen == max_words {
                break;
            }
            seen += 1;
            in_word = true;
        }
        end = i + c.len_utf8();
    }

    format!(
        "{}\n\n[Truncated: showing the first {} of {} words]",
        &text[..end],
        max_words,
        total
    )
}

#[cfg(test)]
#[path = "format_tests.rs"]
mod tests;
