//! Selection subcommand handlers for TextLens.

use std::collections::BTreeSet;
use std::path::Path;

use serde_json::json;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};

use textlens_actions::{get_applicable_actions, prioritized, ActionCatalog, PageCategory};
use textlens_config::Config;
use textlens_selection::{
    PageInfo, SelectionData, SelectionPipeline, SelectionSnapshot, SelectionType,
    SelectionWatcher,
};

use crate::cli::{OutputFormat, SelectionArgs};

impl SelectionArgs {
    /// Build the snapshot, reading `--html` from disk when it names a file.
    pub(crate) fn snapshot(&self) -> Result<SelectionSnapshot, std::io::Error> {
        let mut snapshot = SelectionSnapshot::new(self.text.clone());
        if let Some(html) = &self.html {
            let path = Path::new(html);
            let fragment = if path.is_file() {
                debug!("Reading HTML fragment from {}", path.display());
                std::fs::read_to_string(path)?
            } else {
                html.clone()
            };
            snapshot = snapshot.with_html(fragment);
        }
        Ok(self
            .ancestors
            .iter()
            .cloned()
            .fold(snapshot, |snapshot, ancestor| snapshot.with_ancestor(ancestor)))
    }

    pub(crate) fn page(&self) -> PageInfo {
        let page = PageInfo::new(self.url.clone());
        match &self.title {
            Some(title) => page.with_title(title.clone()),
            None => page,
        }
    }
}

/// Classify one selection and print the result.
pub(crate) fn handle_analyze(
    config: &Config,
    selection: &SelectionArgs,
    category: PageCategory,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let pipeline = SelectionPipeline::with_config(config.pipeline_config());
    let Some(data) = pipeline.analyze(&selection.snapshot()?, &selection.page()) else {
        println!("No qualifying selection.");
        return Ok(());
    };

    let catalog = ActionCatalog::builtin();
    let actions = prioritized(get_applicable_actions(&catalog, &data.types(), category));

    match format {
        OutputFormat::Json => {
            let ids: Vec<&str> = actions.iter().map(|a| a.id.as_str()).collect();
            let output = json!({ "selection": data, "actions": ids });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Text => {
            print_selection(&data);
            println!();
            if actions.is_empty() {
                println!("No actions for category '{}'.", category);
            } else {
                println!("Actions ({}):", category);
                for action in actions {
                    let marker = if action.highlight { "*" } else { " " };
                    println!("  {} {:<18} {}", marker, action.id, action.name);
                }
            }
        }
    }
    Ok(())
}

fn join_types(types: &BTreeSet<SelectionType>) -> String {
    if types.is_empty() {
        return "-".to_string();
    }
    types.iter().map(|t| t.as_str()).collect::<Vec<_>>().join(", ")
}

fn print_selection(data: &SelectionData) {
    println!("Context types: {}", join_types(&data.context_types));
    println!("Content types: {}", join_types(&data.data_types));
    println!("Words: {}  Characters: {}", data.word_count, data.char_count);
    println!("{}", "-".repeat(60));
    println!("{}", data.llm_formatted_text);
    println!("{}", "-".repeat(60));
}

/// List the actions offered for the given types.
pub(crate) fn handle_actions(
    types: &[SelectionType],
    category: PageCategory,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let catalog = ActionCatalog::builtin();
    let actions: Vec<_> = if types.is_empty() {
        catalog
            .iter()
            .filter(|a| a.page_categories.contains(&category))
            .collect()
    } else {
        let types: BTreeSet<SelectionType> = types.iter().copied().collect();
        prioritized(get_applicable_actions(&catalog, &types, category))
    };

    if actions.is_empty() {
        println!("No actions found.");
        return Ok(());
    }

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&actions)?),
        OutputFormat::Text => {
            println!("{:<18} {:<24} {}", "ID", "NAME", "TYPES");
            println!("{}", "-".repeat(80));
            for action in actions {
                let types: BTreeSet<SelectionType> =
                    action.selection_types.iter().copied().collect();
                println!("{:<18} {:<24} {}", action.id, action.name, join_types(&types));
            }
        }
    }
    Ok(())
}

/// Feed stdin lines through the debounced watcher.
///
/// A blank line clears the selection. Lines arriving faster than the
/// debounce interval collapse into one analysis.
pub(crate) async fn handle_watch(
    config: &Config,
    url: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let watcher_config = config.watcher_config();
    let debounce = watcher_config.debounce;
    let watcher = SelectionWatcher::spawn(
        SelectionPipeline::with_config(config.pipeline_config()),
        watcher_config,
    );

    let mut updates = watcher.subscribe();
    let printer = tokio::spawn(async move {
        while updates.changed().await.is_ok() {
            let current = updates.borrow_and_update().clone();
            match current {
                Some(data) => {
                    print_selection(&data);
                    println!();
                }
                None => println!("(selection cleared)"),
            }
        }
    });

    info!("Watching stdin, debounce {}ms", debounce.as_millis());
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            watcher.clear();
        } else {
            watcher.update(SelectionSnapshot::new(line), PageInfo::new(url));
        }
    }

    // Let the last pending selection settle before shutting down.
    tokio::time::sleep(debounce * 2).await;
    drop(watcher);
    printer.abort();
    Ok(())
}
