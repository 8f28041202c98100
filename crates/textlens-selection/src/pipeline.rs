//! Selection analysis entry point.

use std::collections::BTreeSet;

use tracing::debug;

use crate::clean::{clean_text, count_chars, count_words};
use crate::detect::{detect_content, detect_structural};
use crate::format::{self, FormatInput, DEFAULT_MAX_WORDS};
use crate::html::{self, Node};
use crate::types::{ElementInfo, PageInfo, PlatformSelection, SelectionData, SelectionType};

/// Pipeline tuning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Word ceiling for long-text formatting.
    pub max_words: usize,
    /// Cleaned selections shorter than this are ignored.
    pub min_chars: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_words: DEFAULT_MAX_WORDS,
            min_chars: 1,
        }
    }
}

/// Turns platform selections into [`SelectionData`].
///
/// Pure: the same selection and page always produce the same result.
#[derive(Debug, Clone, Default)]
pub struct SelectionPipeline {
    config: PipelineConfig,
}

impl SelectionPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Analyze a selection. `None` for empty or too-short selections.
    pub fn analyze(
        &self,
        selection: &dyn PlatformSelection,
        page: &PageInfo,
    ) -> Option<SelectionData> {
        let original_text = selection.text();
        if original_text.trim().is_empty() {
            return None;
        }

        let text = clean_text(&original_text);
        let char_count = count_chars(&text);
        if char_count == 0 || char_count < self.config.min_chars {
            debug!("Selection ignored after cleaning ({} chars)", char_count);
            return None;
        }

        let original_html = selection.html();
        let ancestors = selection.ancestors();
        let anchor_text = selection.anchor_text();
        let fragment = html::parse_fragment(&original_html);

        let context_types = detect_structural(&text, &fragment, &ancestors, anchor_text.as_deref());
        let data_types = detect_content(&text, &context_types);
        let all_types: BTreeSet<SelectionType> = context_types.union(&data_types).copied().collect();

        let hint = language_hint(&ancestors, &fragment);
        let input = FormatInput {
            text: &text,
            original_text: &original_text,
            html: &original_html,
            language_hint: hint.as_deref(),
            max_words: self.config.max_words,
        };
        let llm_formatted_text = format::format_for_llm(&input, &all_types);

        debug!(
            "Selection analyzed: {} words, types {:?}",
            count_words(&text),
            all_types
        );

        Some(SelectionData {
            word_count: count_words(&text),
            char_count,
            original_text,
            original_html,
            page_url: page.url.clone(),
            page_title: page.title.clone(),
            context_types,
            data_types,
            llm_formatted_text,
            text,
        })
    }
}

/// Analyze with the default configuration.
pub fn analyze(selection: &dyn PlatformSelection, page: &PageInfo) -> Option<SelectionData> {
    SelectionPipeline::new().analyze(selection, page)
}

/// `language-*` hint from the ancestry, then from code in the fragment.
fn language_hint(ancestors: &[ElementInfo], fragment: &[Node]) -> Option<String> {
    let from_ancestors = ancestors
        .iter()
        .find_map(|a| format::language_hint(&a.classes).map(str::to_string));
    from_ancestors.or_else(|| {
        ["code", "pre"].iter().find_map(|tag| {
            html::find_in(fragment, tag)
                .and_then(|e| format::language_hint(&e.classes()).map(str::to_string))
        })
    })
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
