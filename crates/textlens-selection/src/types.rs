//! Selection data model.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Classification tag of a selection.
///
/// Structural tags come from the DOM around the selection, content tags
/// from the text itself. `Word`, `Sentence` and `Paragraph` form the
/// fallback family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionType {
    // Structural
    Table,
    List,
    Code,
    Math,
    Quote,
    Header,
    DefinitionList,
    Link,
    // Content
    Json,
    Latex,
    TerminalOutput,
    ErrorMessage,
    Email,
    Url,
    Markdown,
    LongText,
    Word,
    Sentence,
    Paragraph,
}

impl SelectionType {
    pub const ALL: [SelectionType; 19] = [
        Self::Table,
        Self::List,
        Self::Code,
        Self::Math,
        Self::Quote,
        Self::Header,
        Self::DefinitionList,
        Self::Link,
        Self::Json,
        Self::Latex,
        Self::TerminalOutput,
        Self::ErrorMessage,
        Self::Email,
        Self::Url,
        Self::Markdown,
        Self::LongText,
        Self::Word,
        Self::Sentence,
        Self::Paragraph,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Table => "table",
            Self::List => "list",
            Self::Code => "code",
            Self::Math => "math",
            Self::Quote => "quote",
            Self::Header => "header",
            Self::DefinitionList => "definition_list",
            Self::Link => "link",
            Self::Json => "json",
            Self::Latex => "latex",
            Self::TerminalOutput => "terminal_output",
            Self::ErrorMessage => "error_message",
            Self::Email => "email",
            Self::Url => "url",
            Self::Markdown => "markdown",
            Self::LongText => "long_text",
            Self::Word => "word",
            Self::Sentence => "sentence",
            Self::Paragraph => "paragraph",
        }
    }

    /// Derived from the DOM ancestry or fragment structure.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::Table
                | Self::List
                | Self::Code
                | Self::Math
                | Self::Quote
                | Self::Header
                | Self::DefinitionList
                | Self::Link
        )
    }

    /// Member of the word/sentence/paragraph fallback family.
    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Word | Self::Sentence | Self::Paragraph)
    }

    /// A tag that suppresses the fallback family.
    pub fn is_specific(&self) -> bool {
        !self.is_fallback() && *self != Self::LongText
    }
}

impl fmt::Display for SelectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SelectionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        let normalized = match normalized.as_str() {
            "code_block" => "code",
            "text" => "paragraph",
            other => other,
        };
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == normalized)
            .ok_or_else(|| format!("unknown selection type: {}", s))
    }
}

/// Everything known about one qualifying selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionData {
    /// Cleaned text.
    pub text: String,
    pub original_text: String,
    pub original_html: String,
    pub page_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_title: Option<String>,
    pub word_count: usize,
    pub char_count: usize,
    pub context_types: BTreeSet<SelectionType>,
    pub data_types: BTreeSet<SelectionType>,
    pub llm_formatted_text: String,
}

impl SelectionData {
    /// Union of structural and content tags.
    pub fn types(&self) -> BTreeSet<SelectionType> {
        self.context_types.union(&self.data_types).copied().collect()
    }

    pub fn has_type(&self, selection_type: SelectionType) -> bool {
        self.context_types.contains(&selection_type) || self.data_types.contains(&selection_type)
    }
}

/// Page the selection was made on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageInfo {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl PageInfo {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// An element enclosing the selection anchor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementInfo {
    /// Lowercase tag name.
    pub tag: String,
    #[serde(default)]
    pub classes: Vec<String>,
    /// Full text content of the element.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl ElementInfo {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into().to_ascii_lowercase(),
            classes: Vec::new(),
            text: None,
        }
    }

    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.classes.push(class.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn has_class(&self, predicate: impl Fn(&str) -> bool) -> bool {
        self.classes.iter().any(|c| predicate(c))
    }
}

/// Platform selection object, as exposed by the host page.
pub trait PlatformSelection {
    /// Raw selected text.
    fn text(&self) -> String;

    /// Serialized HTML of the selected range.
    fn html(&self) -> String;

    /// Elements enclosing the anchor node, nearest first.
    fn ancestors(&self) -> Vec<ElementInfo>;

    /// Full text of the nearest enclosing link, if any.
    fn anchor_text(&self) -> Option<String> {
        self.ancestors()
            .into_iter()
            .find(|e| e.tag == "a")
            .and_then(|e| e.text)
    }
}

/// A captured selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionSnapshot {
    pub text: String,
    #[serde(default)]
    pub html: String,
    #[serde(default)]
    pub ancestors: Vec<ElementInfo>,
}

impl SelectionSnapshot {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn with_html(mut self, html: impl Into<String>) -> Self {
        self.html = html.into();
        self
    }

    /// Append an ancestor; call nearest first.
    pub fn with_ancestor(mut self, ancestor: ElementInfo) -> Self {
        self.ancestors.push(ancestor);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

impl PlatformSelection for SelectionSnapshot {
    fn text(&self) -> String {
        self.text.clone()
    }

    fn html(&self) -> String {
        self.html.clone()
    }

    fn ancestors(&self) -> Vec<ElementInfo> {
        self.ancestors.clone()
    }
}
