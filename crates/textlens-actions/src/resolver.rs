//! Action resolution.

use std::collections::BTreeSet;

use tracing::debug;

use textlens_selection::SelectionType;

use crate::catalog::ActionCatalog;
use crate::category::PageCategory;
use crate::definition::ActionDefinition;

/// Actions offered for a selection, in catalog order.
///
/// An action applies when one of its selection types is in `types` and
/// its page categories include `category`.
pub fn get_applicable_actions<'a>(
    catalog: &'a ActionCatalog,
    types: &BTreeSet<SelectionType>,
    category: PageCategory,
) -> Vec<&'a ActionDefinition> {
    let actions: Vec<_> = catalog
        .iter()
        .filter(|action| action.applies_to(types, category))
        .collect();
    debug!(
        "{} action(s) apply to {:?} on a {} page",
        actions.len(),
        types,
        category
    );
    actions
}

/// Highlighted actions first; relative order is otherwise kept.
pub fn prioritized<'a>(mut actions: Vec<&'a ActionDefinition>) -> Vec<&'a ActionDefinition> {
    actions.sort_by_key(|action| !action.highlight);
    actions
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(actions: &[&ActionDefinition]) -> Vec<String> {
        actions.iter().map(|a| a.id.clone()).collect()
    }

    fn types(list: &[SelectionType]) -> BTreeSet<SelectionType> {
        list.iter().copied().collect()
    }

    #[test]
    fn test_code_on_development_page() {
        let catalog = ActionCatalog::builtin();
        let actions = get_applicable_actions(&catalog, &types(&[SelectionType::Code]), PageCategory::Development);
        assert_eq!(ids(&actions), vec!["explain_code"]);
    }

    #[test]
    fn test_category_filters() {
        let catalog = ActionCatalog::builtin();
        let actions = get_applicable_actions(&catalog, &types(&[SelectionType::Code]), PageCategory::Shopping);
        assert!(actions.is_empty());
    }

    #[test]
    fn test_catalog_order_kept() {
        let catalog = ActionCatalog::builtin();
        let actions = get_applicable_actions(
            &catalog,
            &types(&[SelectionType::Sentence]),
            PageCategory::General,
        );
        assert_eq!(
            ids(&actions),
            vec!["explain", "translate", "simplify", "fix_grammar"]
        );
    }

    #[test]
    fn test_any_type_intersects() {
        let catalog = ActionCatalog::builtin();
        let actions = get_applicable_actions(
            &catalog,
            &types(&[SelectionType::Word, SelectionType::Email]),
            PageCategory::General,
        );
        let ids = ids(&actions);
        assert!(ids.contains(&"define".to_string()));
        assert!(ids.contains(&"extract_contacts".to_string()));
    }

    #[test]
    fn test_no_types_no_actions() {
        let catalog = ActionCatalog::builtin();
        assert!(get_applicable_actions(&catalog, &BTreeSet::new(), PageCategory::General).is_empty());
    }

    #[test]
    fn test_prioritized_is_stable() {
        let catalog = ActionCatalog::builtin();
        let actions = get_applicable_actions(
            &catalog,
            &types(&[SelectionType::Word]),
            PageCategory::General,
        );
        assert_eq!(ids(&actions), vec!["explain", "translate", "define"]);
        assert_eq!(ids(&prioritized(actions)), vec!["explain", "define", "translate"]);
    }
}
