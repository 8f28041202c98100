//! Configuration errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Environment variable not set: {0}")]
    EnvVarNotSet(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_error() {
        let err = ConfigError::NotFound("textlens.toml".to_string());
        assert!(err.to_string().contains("textlens.toml"));
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_invalid_value_error() {
        let err = ConfigError::InvalidValue {
            field: "inference.timeout_seconds".to_string(),
            message: "must be positive".to_string(),
        };
        let display = err.to_string();
        assert!(display.contains("inference.timeout_seconds"));
        assert!(display.contains("must be positive"));
    }

    #[test]
    fn test_env_var_not_set_error() {
        let err = ConfigError::EnvVarNotSet("MODEL_ID".to_string());
        assert!(err.to_string().contains("MODEL_ID"));
        assert!(err.to_string().contains("not set"));
    }

    #[test]
    fn test_io_error_from() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = ConfigError::from(io_err);
        assert!(err.to_string().contains("denied"));
    }
}
