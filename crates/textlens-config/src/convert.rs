//! Conversions into component configurations.

use std::path::PathBuf;
use std::time::Duration;

use textlens_runtime::{BackgroundConfig, ControllerConfig, LoaderConfig};
use textlens_selection::{PipelineConfig, WatcherConfig};

use crate::loader::ConfigLoader;
use crate::schema::Config;

impl Config {
    pub fn controller_config(&self) -> ControllerConfig {
        ControllerConfig {
            connection_name: self.inference.connection_name.clone(),
            timeout: Duration::from_secs(self.inference.timeout_seconds),
            completion_grace: Duration::from_millis(self.inference.completion_grace_ms),
            stop_ack_timeout: Duration::from_millis(self.inference.stop_ack_timeout_ms),
        }
    }

    pub fn loader_config(&self) -> LoaderConfig {
        LoaderConfig {
            connection_name: self.inference.connection_name.clone(),
            load_timeout: Duration::from_secs(self.inference.load_timeout_seconds),
        }
    }

    pub fn background_config(&self) -> BackgroundConfig {
        BackgroundConfig {
            connection_name: self.inference.connection_name.clone(),
            default_model: self.model.default_model.clone(),
            settings: self.settings.clone(),
        }
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            max_words: self.selection.max_words,
            min_chars: self.selection.min_chars,
        }
    }

    /// Debounce comes from the settings record when it differs from the
    /// configured value, so a user change wins over the file.
    pub fn watcher_config(&self) -> WatcherConfig {
        let default_debounce = textlens_protocols::Settings::default().debounce_ms;
        let debounce_ms = if self.settings.debounce_ms != default_debounce {
            self.settings.debounce_ms
        } else {
            self.selection.debounce_ms
        };
        WatcherConfig {
            debounce: Duration::from_millis(debounce_ms),
        }
    }

    /// Log directory with `~` expanded.
    pub fn log_dir(&self) -> Option<PathBuf> {
        self.logging
            .file_dir
            .as_ref()
            .map(|dir| PathBuf::from(ConfigLoader::expand_path(&dir.to_string_lossy())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_components() {
        let config = Config::default();
        assert_eq!(config.controller_config(), ControllerConfig::default());
        assert_eq!(config.loader_config(), LoaderConfig::default());
        assert_eq!(config.pipeline_config(), PipelineConfig::default());
        assert_eq!(config.watcher_config(), WatcherConfig::default());
    }

    #[test]
    fn test_inference_timing() {
        let config = ConfigLoader::load_str(
            r#"
            [inference]
            connection_name = "custom"
            timeout_seconds = 30
            load_timeout_seconds = 10
            completion_grace_ms = 5
            "#,
        )
        .unwrap();

        let controller = config.controller_config();
        assert_eq!(controller.connection_name, "custom");
        assert_eq!(controller.timeout, Duration::from_secs(30));
        assert_eq!(controller.completion_grace, Duration::from_millis(5));
        assert_eq!(config.loader_config().load_timeout, Duration::from_secs(10));
        assert_eq!(config.background_config().connection_name, "custom");
    }

    #[test]
    fn test_background_model() {
        let config = ConfigLoader::load_str(
            r#"
            [model]
            default_model = "tiny"

            [settings]
            selected_model = "bigger"
            "#,
        )
        .unwrap();
        let background = config.background_config();
        assert_eq!(background.default_model, "tiny");
        assert_eq!(background.settings.selected_model, "bigger");
    }

    #[test]
    fn test_watcher_debounce_precedence() {
        let config = ConfigLoader::load_str("[selection]\ndebounce_ms = 400").unwrap();
        assert_eq!(config.watcher_config().debounce, Duration::from_millis(400));

        let config = ConfigLoader::load_str(
            "[selection]\ndebounce_ms = 400\n[settings]\ndebounce_ms = 100",
        )
        .unwrap();
        assert_eq!(config.watcher_config().debounce, Duration::from_millis(100));
    }

    #[test]
    fn test_log_dir_expanded() {
        let config = ConfigLoader::load_str("[logging]\nfile_dir = \"~/logs\"").unwrap();
        let dir = config.log_dir().unwrap();
        assert!(!dir.to_string_lossy().starts_with('~'));
        assert!(Config::default().log_dir().is_none());
    }
}
