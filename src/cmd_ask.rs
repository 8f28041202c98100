//! `ask` subcommand: one action run end to end over the in-memory hub.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use textlens_actions::{ActionCatalog, ActionError, PageCategory, PromptVars};
use textlens_config::Config;
use textlens_core::{ContextId, MemoryHub, MessageBus};
use textlens_protocols::event::LoadStatus;
use textlens_protocols::{EventPayload, InferenceParameters};
use textlens_runtime::{
    BackgroundService, EngineSession, InferenceCallbacks, InferenceController, InferenceStatus,
    ModelLoader,
};
use textlens_selection::SelectionPipeline;

use crate::adapters::EchoEngine;
use crate::cli::SelectionArgs;

pub(crate) struct AskOptions<'a> {
    pub action: &'a str,
    pub selection: &'a SelectionArgs,
    pub category: PageCategory,
    pub model: Option<String>,
    pub token_delay: Duration,
}

/// Run an action and stream its answer to stdout.
pub(crate) async fn handle_ask(
    config: &Config,
    options: AskOptions<'_>,
) -> Result<(), Box<dyn std::error::Error>> {
    let catalog = ActionCatalog::builtin();
    let action = catalog
        .get(options.action)
        .ok_or_else(|| ActionError::UnknownAction(options.action.to_string()))?;

    let pipeline = SelectionPipeline::with_config(config.pipeline_config());
    let selection = options.selection;
    let Some(data) = pipeline.analyze(&selection.snapshot()?, &selection.page()) else {
        return Err("selection is empty".into());
    };
    if !action.applies_to(&data.types(), options.category) {
        return Err(ActionError::NotApplicable {
            action: action.id.clone(),
        }
        .into());
    }

    // Background context hosting the engine.
    let hub = MemoryHub::new();
    let engine = Arc::new(EchoEngine::new(options.token_delay));
    let session = Arc::new(EngineSession::new(engine));
    let background = BackgroundService::new(
        MessageBus::new(hub.context(ContextId::Background), "background"),
        session,
        config.background_config(),
    );
    background.start();

    // Popup context driving the request.
    let popup = MessageBus::new(hub.context(ContextId::Popup), "popup");
    popup
        .publish(EventPayload::SettingsUpdate(config.settings.clone()), None)
        .await?;
    let settings = background.settings();

    let model_id = options
        .model
        .clone()
        .unwrap_or_else(|| settings.selected_model.clone());
    ModelLoader::new(popup.clone(), config.loader_config())
        .load_model(&model_id, |progress| {
            if progress.status == LoadStatus::Loading {
                eprintln!(
                    "[{:>3.0}%] {}",
                    progress.progress * 100.0,
                    progress.text.as_deref().unwrap_or("Loading")
                );
            }
        })
        .await?;
    info!("Model {} ready", model_id);

    let base = InferenceParameters {
        temperature: settings.temperature,
        top_p: settings.top_p,
        ..InferenceParameters::default()
    };
    let mut request = action.build_request(&data, &PromptVars::from_settings(&settings), &base);
    if let Some(model) = options.model {
        request = request.with_model(model);
    }

    let controller = InferenceController::new(popup, config.controller_config());
    let callbacks = InferenceCallbacks::new()
        .on_update(|token| {
            let mut stdout = std::io::stdout().lock();
            let _ = stdout.write_all(token.as_bytes());
            let _ = stdout.flush();
        })
        .on_complete(|complete| {
            if let Some(usage) = &complete.usage {
                debug!(
                    "Usage: {} prompt + {} completion tokens",
                    usage.prompt_tokens, usage.completion_tokens
                );
            }
        });
    let request_id = controller.run_inference(request, callbacks)?;
    debug!("Running {} as {}", action.id, request_id);

    let mut state = controller.watch_state();
    let finished = tokio::select! {
        result = state.wait_for(|s| s.status.is_terminal()) => Some(result?.clone()),
        _ = tokio::signal::ctrl_c() => None,
    };
    println!();

    let outcome: Result<(), Box<dyn std::error::Error>> = match finished {
        None => {
            warn!("Interrupted, stopping inference");
            controller.cancel_inference().await;
            Ok(())
        }
        Some(state) if state.status == InferenceStatus::Error => Err(state
            .error
            .unwrap_or_else(|| "inference failed".to_string())
            .into()),
        Some(_) => Ok(()),
    };

    background.shutdown();
    outcome
}
