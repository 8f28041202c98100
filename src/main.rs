//! TextLens - selection classification and quick language-model actions
//!
//! Main entry point for the TextLens CLI.

use std::path::Path;
use std::time::Duration;

use clap::Parser;
use tracing::{error, warn};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use textlens_config::{Config, ConfigLoader, ConfigValidator};

mod adapters;
mod cli;
mod cmd_ask;
mod cmd_selection;

use cli::{Cli, Commands};
use cmd_ask::AskOptions;

fn init_tracing(level: &str, log_dir: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // Console output goes to stderr so stdout stays clean for answers.
    let console = fmt::layer()
        .with_target(true)
        .with_ansi(true)
        .with_writer(std::io::stderr);

    let file = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let file_appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix("textlens")
                .filename_suffix("log")
                .max_log_files(30)
                .build(dir)?;
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

            // Keep the writer flushing for the program duration.
            static GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
                std::sync::OnceLock::new();
            let _ = GUARD.set(guard);

            Some(fmt::layer().with_writer(non_blocking).with_ansi(false).boxed())
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console)
        .with(file)
        .init();

    Ok(())
}

fn report_validation(config: &Config) -> bool {
    let result = ConfigValidator::validate(config);
    for warning in &result.warnings {
        warn!("Config {}: {}", warning.path, warning.message);
    }
    for err in &result.errors {
        error!("Config {}: {}", err.path, err.message);
    }
    result.is_valid()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = ConfigLoader::load_or_default(cli.config.as_deref())?;
    init_tracing(&config.logging.level, config.log_dir().as_deref())?;

    if !report_validation(&config) {
        return Err("invalid configuration".into());
    }

    match &cli.command {
        Commands::Analyze {
            selection,
            category,
            format,
        } => cmd_selection::handle_analyze(&config, selection, *category, *format),
        Commands::Actions {
            types,
            category,
            format,
        } => cmd_selection::handle_actions(types, *category, *format),
        Commands::Ask {
            action,
            selection,
            category,
            model,
            token_delay_ms,
        } => {
            let options = AskOptions {
                action: action.as_str(),
                selection,
                category: *category,
                model: model.clone(),
                token_delay: Duration::from_millis(*token_delay_ms),
            };
            cmd_ask::handle_ask(&config, options).await
        }
        Commands::Watch { url } => cmd_selection::handle_watch(&config, url).await,
    }
}
