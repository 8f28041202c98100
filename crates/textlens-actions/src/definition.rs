//! Action definitions and prompt rendering.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use textlens_protocols::{
    ChatMessage, InferenceParameters, InferenceRequest, ParamOverrides, Settings,
};
use textlens_selection::{SelectionData, SelectionType};

use crate::category::PageCategory;

/// One entry of the action catalog. Read-only at runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionDefinition {
    pub id: String,
    pub name: String,
    pub description: String,
    /// The action applies when any of these tags is present.
    pub selection_types: Vec<SelectionType>,
    /// Pages the action is offered on.
    pub page_categories: Vec<PageCategory>,
    pub system_prompt: String,
    /// User message template; `{{text}}` is the formatted selection.
    pub user_prompt: String,
    #[serde(default)]
    pub llm_params: ParamOverrides,
    pub emoji: String,
    #[serde(default)]
    pub highlight: bool,
}

impl ActionDefinition {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            selection_types: Vec::new(),
            page_categories: PageCategory::ALL.to_vec(),
            system_prompt: String::new(),
            user_prompt: "{{text}}".to_string(),
            llm_params: ParamOverrides::default(),
            emoji: String::new(),
            highlight: false,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn for_types(mut self, types: &[SelectionType]) -> Self {
        self.selection_types = types.to_vec();
        self
    }

    pub fn in_categories(mut self, categories: &[PageCategory]) -> Self {
        self.page_categories = categories.to_vec();
        self
    }

    pub fn with_prompts(mut self, system: &str, user: &str) -> Self {
        self.system_prompt = system.to_string();
        self.user_prompt = user.to_string();
        self
    }

    pub fn with_params(mut self, params: ParamOverrides) -> Self {
        self.llm_params = params;
        self
    }

    pub fn with_emoji(mut self, emoji: &str) -> Self {
        self.emoji = emoji.to_string();
        self
    }

    pub fn highlighted(mut self) -> Self {
        self.highlight = true;
        self
    }

    /// Whether this action is offered for the given tags on the given page.
    pub fn applies_to<'a>(
        &self,
        types: impl IntoIterator<Item = &'a SelectionType>,
        category: PageCategory,
    ) -> bool {
        self.page_categories.contains(&category)
            && types.into_iter().any(|t| self.selection_types.contains(t))
    }

    /// Render both prompts into a chat request for the selection.
    pub fn build_request(
        &self,
        selection: &SelectionData,
        vars: &PromptVars,
        base: &InferenceParameters,
    ) -> InferenceRequest {
        let variables = vars.variables(selection);
        let mut messages = Vec::with_capacity(2);
        let system = render(&self.system_prompt, &variables);
        if !system.trim().is_empty() {
            messages.push(ChatMessage::system(system));
        }
        messages.push(ChatMessage::user(render(&self.user_prompt, &variables)));

        InferenceRequest::new(messages)
            .with_parameters(base.merged(&self.llm_params))
            .with_action(self.id.clone())
    }
}

/// Values substituted into prompt templates besides the selection itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptVars {
    /// Target language for translation.
    pub language: String,
    /// Extra `{{name}}` placeholders.
    pub extra: HashMap<String, String>,
}

impl Default for PromptVars {
    fn default() -> Self {
        Self {
            language: "English".to_string(),
            extra: HashMap::new(),
        }
    }
}

impl PromptVars {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            language: settings.preferred_language.clone(),
            ..Self::default()
        }
    }

    pub fn with_var(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(name.into(), value.into());
        self
    }

    fn variables(&self, selection: &SelectionData) -> HashMap<String, String> {
        let mut variables = self.extra.clone();
        variables.insert("text".to_string(), selection.llm_formatted_text.clone());
        variables.insert("language".to_string(), self.language.clone());
        variables.insert("page_url".to_string(), selection.page_url.clone());
        variables.insert(
            "page_title".to_string(),
            selection.page_title.clone().unwrap_or_default(),
        );
        variables
    }
}

/// Replace `{{name}}` placeholders in one pass. Unknown placeholders stay
/// as written; substituted values are never re-scanned.
pub fn render(template: &str, variables: &HashMap<String, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            out.push_str(&rest[start..]);
            return out;
        };
        match variables.get(after[..end].trim()) {
            Some(value) => out.push_str(value),
            None => out.push_str(&rest[start..start + end + 4]),
        }
        rest = &after[end + 2..];
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
#[path = "definition_tests.rs"]
mod tests;
