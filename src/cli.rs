//! CLI definitions for TextLens.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use textlens_actions::PageCategory;
use textlens_selection::{ElementInfo, SelectionType};

/// TextLens CLI.
#[derive(Parser)]
#[command(name = "textlens")]
#[command(about = "Classify selected text and run quick language-model actions on it")]
#[command(version)]
pub(crate) struct Cli {
    /// Configuration file path (defaults to config/textlens.toml when present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Classify a selection and show its formatted text
    Analyze {
        #[command(flatten)]
        selection: SelectionArgs,

        /// Page category used to list applicable actions
        #[arg(long, default_value = "general", value_parser = parse_category)]
        category: PageCategory,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// List actions offered for a set of selection types
    Actions {
        /// Comma-separated selection types (word, code, table, ...); all actions when omitted
        #[arg(long, value_delimiter = ',', value_parser = parse_selection_type)]
        types: Vec<SelectionType>,

        /// Page category
        #[arg(long, default_value = "general", value_parser = parse_category)]
        category: PageCategory,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Run an action on a selection against the built-in echo engine
    Ask {
        /// Action ID (see `textlens actions`)
        #[arg(long)]
        action: String,

        #[command(flatten)]
        selection: SelectionArgs,

        /// Page category the action must be offered in
        #[arg(long, default_value = "general", value_parser = parse_category)]
        category: PageCategory,

        /// Model to load instead of the configured one
        #[arg(long)]
        model: Option<String>,

        /// Delay between echoed tokens, in milliseconds
        #[arg(long, default_value_t = 20)]
        token_delay_ms: u64,
    },

    /// Read selections from stdin, one per line, and print each settled analysis
    Watch {
        /// URL of the page the selections come from
        #[arg(long, default_value = "")]
        url: String,
    },
}

/// A selection given on the command line.
#[derive(clap::Args)]
pub(crate) struct SelectionArgs {
    /// Selected plain text
    #[arg(long)]
    pub text: String,

    /// Selected HTML fragment, inline or a path to a file
    #[arg(long)]
    pub html: Option<String>,

    /// Anchor ancestors nearest first, as `tag` or `tag.class1.class2`
    #[arg(long = "ancestor", value_parser = parse_ancestor)]
    pub ancestors: Vec<ElementInfo>,

    /// Page URL
    #[arg(long, default_value = "")]
    pub url: String,

    /// Page title
    #[arg(long)]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

fn parse_category(value: &str) -> Result<PageCategory, String> {
    value.parse().map_err(|e: textlens_actions::ActionError| e.to_string())
}

fn parse_selection_type(value: &str) -> Result<SelectionType, String> {
    value.parse()
}

pub(crate) fn parse_ancestor(value: &str) -> Result<ElementInfo, String> {
    let mut parts = value.split('.');
    let tag = parts.next().unwrap_or_default().trim();
    if tag.is_empty() {
        return Err(format!("ancestor needs a tag name: '{}'", value));
    }
    Ok(parts
        .filter(|class| !class.is_empty())
        .fold(ElementInfo::new(tag), |element, class| element.with_class(class)))
}
