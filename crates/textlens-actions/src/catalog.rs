//! Built-in action catalog.

use textlens_protocols::ParamOverrides;
use textlens_selection::SelectionType;

use crate::category::PageCategory;
use crate::definition::ActionDefinition;

use PageCategory::*;
use SelectionType as T;

/// Ordered, read-only list of actions.
#[derive(Debug, Clone, Default)]
pub struct ActionCatalog {
    actions: Vec<ActionDefinition>,
}

impl ActionCatalog {
    /// The catalog shipped with the extension.
    pub fn builtin() -> Self {
        Self::from_definitions(builtin_actions())
    }

    pub fn from_definitions(actions: Vec<ActionDefinition>) -> Self {
        Self { actions }
    }

    pub fn get(&self, id: &str) -> Option<&ActionDefinition> {
        self.actions.iter().find(|a| a.id == id)
    }

    /// Actions in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = &ActionDefinition> {
        self.actions.iter()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

const PROSE: &[SelectionType] = &[T::Sentence, T::Paragraph, T::LongText, T::Quote, T::Markdown];
const TECHNICAL: &[PageCategory] = &[General, Development, Documentation, Reference];

fn low_temperature(temperature: f32) -> ParamOverrides {
    ParamOverrides::temperature(temperature)
}

fn builtin_actions() -> Vec<ActionDefinition> {
    vec![
        ActionDefinition::new("summarize", "Summarize")
            .with_description("Condense the selection into a short summary")
            .for_types(&[T::Paragraph, T::LongText, T::Markdown, T::Quote, T::List])
            .with_prompts(SUMMARIZE_SYSTEM, SUMMARIZE_USER)
            .with_emoji("📝")
            .highlighted(),
        ActionDefinition::new("explain", "Explain")
            .with_description("Explain the selection in plain language")
            .for_types(&[T::Word, T::Sentence, T::Paragraph, T::Quote, T::Header, T::Markdown])
            .with_prompts(EXPLAIN_SYSTEM, EXPLAIN_USER)
            .with_emoji("💡")
            .highlighted(),
        ActionDefinition::new("translate", "Translate")
            .with_description("Translate the selection into your preferred language")
            .for_types(&[
                T::Word,
                T::Sentence,
                T::Paragraph,
                T::LongText,
                T::Quote,
                T::Header,
                T::List,
            ])
            .with_prompts(TRANSLATE_SYSTEM, TRANSLATE_USER)
            .with_params(low_temperature(0.3))
            .with_emoji("🌐"),
        ActionDefinition::new("simplify", "Simplify")
            .with_description("Rewrite the selection so anyone can follow it")
            .for_types(PROSE)
            .in_categories(&[General, News, Academic, Documentation, Reference])
            .with_prompts(SIMPLIFY_SYSTEM, SIMPLIFY_USER)
            .with_emoji("🧒"),
        ActionDefinition::new("key_points", "Key Points")
            .with_description("List the main points of the selection")
            .for_types(&[T::Paragraph, T::LongText, T::List, T::Markdown])
            .with_prompts(KEY_POINTS_SYSTEM, KEY_POINTS_USER)
            .with_emoji("🔑"),
        ActionDefinition::new("fix_grammar", "Fix Grammar")
            .with_description("Correct spelling and grammar")
            .for_types(&[T::Sentence, T::Paragraph])
            .in_categories(&[General, Social, Documentation])
            .with_prompts(FIX_GRAMMAR_SYSTEM, FIX_GRAMMAR_USER)
            .with_params(low_temperature(0.2))
            .with_emoji("✏️"),
        ActionDefinition::new("explain_code", "Explain Code")
            .with_description("Walk through what the code does")
            .for_types(&[T::Code])
            .in_categories(TECHNICAL)
            .with_prompts(EXPLAIN_CODE_SYSTEM, EXPLAIN_CODE_USER)
            .with_params(low_temperature(0.2))
            .with_emoji("👨‍💻")
            .highlighted(),
        ActionDefinition::new("debug_error", "Debug Error")
            .with_description("Find the likely cause of an error and how to fix it")
            .for_types(&[T::ErrorMessage, T::TerminalOutput])
            .in_categories(TECHNICAL)
            .with_prompts(DEBUG_ERROR_SYSTEM, DEBUG_ERROR_USER)
            .with_params(low_temperature(0.2))
            .with_emoji("🐛")
            .highlighted(),
        ActionDefinition::new("format_json", "Explain JSON")
            .with_description("Describe the structure of a JSON document")
            .for_types(&[T::Json])
            .in_categories(TECHNICAL)
            .with_prompts(FORMAT_JSON_SYSTEM, FORMAT_JSON_USER)
            .with_params(low_temperature(0.1))
            .with_emoji("🧾"),
        ActionDefinition::new("explain_math", "Explain Math")
            .with_description("Explain a formula step by step")
            .for_types(&[T::Math, T::Latex])
            .in_categories(&[General, Academic, Documentation, Reference])
            .with_prompts(EXPLAIN_MATH_SYSTEM, EXPLAIN_MATH_USER)
            .with_params(low_temperature(0.2))
            .with_emoji("➗"),
        ActionDefinition::new("analyze_table", "Analyze Table")
            .with_description("Describe trends and outliers in tabular data")
            .for_types(&[T::Table])
            .with_prompts(ANALYZE_TABLE_SYSTEM, ANALYZE_TABLE_USER)
            .with_emoji("📊")
            .highlighted(),
        ActionDefinition::new("define", "Define")
            .with_description("Give a dictionary-style definition")
            .for_types(&[T::Word])
            .with_prompts(DEFINE_SYSTEM, DEFINE_USER)
            .with_params(low_temperature(0.3))
            .with_emoji("📖")
            .highlighted(),
        ActionDefinition::new("extract_contacts", "Extract Contacts")
            .with_description("Pull names, emails and links into a list")
            .for_types(&[T::Email, T::Url, T::Link])
            .in_categories(&[General, Social, Shopping, News])
            .with_prompts(EXTRACT_CONTACTS_SYSTEM, EXTRACT_CONTACTS_USER)
            .with_params(low_temperature(0.1))
            .with_emoji("📇"),
        ActionDefinition::new("open_link_summary", "Summarize Link")
            .with_description("Say what the linked page is likely about")
            .for_types(&[T::Link, T::Url])
            .with_prompts(LINK_SUMMARY_SYSTEM, LINK_SUMMARY_USER)
            .with_emoji("🔗"),
    ]
}

const SUMMARIZE_SYSTEM: &str = "You are a concise assistant. Summarize text accurately without adding information that is not in it.";
const SUMMARIZE_USER: &str = r#"Summarize the following text from "{{page_title}}" in a few sentences:

{{text}}"#;

const EXPLAIN_SYSTEM: &str = "You explain things clearly to a curious non-expert. Keep answers short and concrete.";
const EXPLAIN_USER: &str = r#"Explain what this means:

{{text}}"#;

const TRANSLATE_SYSTEM: &str = "You are a professional translator. Translate into {{language}}. Output only the translation.";
const TRANSLATE_USER: &str = "{{text}}";

const SIMPLIFY_SYSTEM: &str = "Rewrite text using short sentences and everyday words. Keep the meaning.";
const SIMPLIFY_USER: &str = r#"Simplify this:

{{text}}"#;

const KEY_POINTS_SYSTEM: &str = "Extract the key points of a text as a Markdown bullet list.";
const KEY_POINTS_USER: &str = r#"List the key points:

{{text}}"#;

const FIX_GRAMMAR_SYSTEM: &str = "Correct grammar, spelling and punctuation. Output only the corrected text.";
const FIX_GRAMMAR_USER: &str = "{{text}}";

const EXPLAIN_CODE_SYSTEM: &str = "You are a senior engineer. Explain code precisely: what it does, how, and anything surprising.";
const EXPLAIN_CODE_USER: &str = r#"Explain this code:

{{text}}"#;

const DEBUG_ERROR_SYSTEM: &str = "You are an expert debugger. Identify the most likely cause of an error and give concrete steps to fix it.";
const DEBUG_ERROR_USER: &str = r#"I got this output on {{page_url}}:

{{text}}

What went wrong and how do I fix it?"#;

const FORMAT_JSON_SYSTEM: &str = "Describe the structure of JSON documents: top-level shape, important fields, and value types.";
const FORMAT_JSON_USER: &str = r#"Describe this JSON:

{{text}}"#;

const EXPLAIN_MATH_SYSTEM: &str = "You are a patient math tutor. Explain formulas step by step and define every symbol.";
const EXPLAIN_MATH_USER: &str = r#"Explain this expression:

{{text}}"#;

const ANALYZE_TABLE_SYSTEM: &str = "You analyze tabular data. Point out trends, comparisons and outliers.";
const ANALYZE_TABLE_USER: &str = r#"Analyze this table:

{{text}}"#;

const DEFINE_SYSTEM: &str = "You are a dictionary. Give the part of speech, a one-line definition and one example sentence.";
const DEFINE_USER: &str = "Define: {{text}}";

const EXTRACT_CONTACTS_SYSTEM: &str = "Extract every person, email address, phone number and link into a Markdown list. Do not invent entries.";
const EXTRACT_CONTACTS_USER: &str = "{{text}}";

const LINK_SUMMARY_SYSTEM: &str = "Given a link and the page it appears on, say briefly what the link most likely points to.";
const LINK_SUMMARY_USER: &str = r#"Link: {{text}}
Found on: {{page_title}} ({{page_url}})"#;
