//! Configuration validation.

use crate::schema::Config;

/// Validation result.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }
}

/// A validation error.
#[derive(Debug)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// A validation warning.
#[derive(Debug)]
pub struct ValidationWarning {
    pub path: String,
    pub message: String,
}

impl ValidationWarning {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration.
    pub fn validate(config: &Config) -> ValidationResult {
        let mut result = ValidationResult::default();

        Self::validate_logging(config, &mut result);
        Self::validate_inference(config, &mut result);
        Self::validate_model(config, &mut result);
        Self::validate_selection(config, &mut result);

        result
    }

    fn validate_logging(config: &Config, result: &mut ValidationResult) {
        if config.logging.level.trim().is_empty() {
            result.add_error(ValidationError::new(
                "logging.level",
                "Log level cannot be empty",
            ));
        }
    }

    fn validate_inference(config: &Config, result: &mut ValidationResult) {
        let inference = &config.inference;

        if inference.connection_name.trim().is_empty() {
            result.add_error(ValidationError::new(
                "inference.connection_name",
                "Connection name cannot be empty",
            ));
        }

        if inference.timeout_seconds == 0 {
            result.add_error(ValidationError::new(
                "inference.timeout_seconds",
                "timeout_seconds must be greater than 0",
            ));
        }

        if inference.load_timeout_seconds == 0 {
            result.add_error(ValidationError::new(
                "inference.load_timeout_seconds",
                "load_timeout_seconds must be greater than 0",
            ));
        }

        // The load handshake is the shorter of the two bounds.
        if inference.timeout_seconds > 0 && inference.load_timeout_seconds >= inference.timeout_seconds {
            result.add_error(ValidationError::new(
                "inference.load_timeout_seconds",
                "load_timeout_seconds must be shorter than timeout_seconds",
            ));
        }

        if inference.timeout_seconds > 3600 {
            result.add_warning(ValidationWarning::new(
                "inference.timeout_seconds",
                "timeout_seconds is very high (>1h), a stuck request will hold the consumer that long",
            ));
        }

        if inference.stop_ack_timeout_ms == 0 {
            result.add_warning(ValidationWarning::new(
                "inference.stop_ack_timeout_ms",
                "stop_ack_timeout_ms is 0, cancellation will not wait for the background",
            ));
        }
    }

    fn validate_model(config: &Config, result: &mut ValidationResult) {
        if config.model.default_model.trim().is_empty() {
            result.add_error(ValidationError::new(
                "model.default_model",
                "Default model cannot be empty",
            ));
        }

        let settings = &config.settings;
        if !(0.0..=2.0).contains(&settings.temperature) {
            result.add_error(ValidationError::new(
                "settings.temperature",
                "temperature must be between 0 and 2",
            ));
        }
        if !(0.0..=1.0).contains(&settings.top_p) || settings.top_p == 0.0 {
            result.add_error(ValidationError::new(
                "settings.top_p",
                "top_p must be in (0, 1]",
            ));
        }
    }

    fn validate_selection(config: &Config, result: &mut ValidationResult) {
        if config.selection.max_words == 0 {
            result.add_error(ValidationError::new(
                "selection.max_words",
                "max_words must be greater than 0",
            ));
        }

        if config.selection.debounce_ms > 2000 {
            result.add_warning(ValidationWarning::new(
                "selection.debounce_ms",
                "debounce_ms is above 2s, selections will feel unresponsive",
            ));
        }
    }
}

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;
