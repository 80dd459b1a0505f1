//! Configuration file loader.

use super::error::{ConfigError, ConfigResult};
use super::types::AppConfig;
use super::validation::Validator;
use std::path::Path;

/// Configuration loader with validation support.
#[derive(Debug, Default)]
pub struct ConfigLoader {
    /// Validators to run on loaded configuration.
    validators: Vec<Box<dyn Validator>>,
}

impl ConfigLoader {
    /// Create a new configuration loader.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a validator to the loader.
    #[must_use]
    pub fn with_validator<V: Validator + 'static>(mut self, validator: V) -> Self {
        self.validators.push(Box::new(validator));
        self
    }

    /// Load configuration from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file does not exist
    /// - The file cannot be read
    /// - The TOML is malformed
    /// - Validation fails
    pub fn load<P: AsRef<Path>>(&self, path: P) -> ConfigResult<AppConfig> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        self.load_str(&content)
    }

    /// Load configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The TOML is malformed
    /// - Validation fails
    pub fn load_str(&self, content: &str) -> ConfigResult<AppConfig> {
        let config: AppConfig = toml::from_str(content)?;
        self.validate(&config)?;
        Ok(config)
    }

    /// Validate a configuration against all registered validators.
    fn validate(&self, config: &AppConfig) -> ConfigResult<()> {
        for validator in &self.validators {
            let result = validator.validate(config);
            if !result.is_valid() {
                let errors: Vec<String> = result
                    .errors_only()
                    .iter()
                    .map(|e| format!("{}: {}", e.field, e.message))
                    .collect();
                return Err(ConfigError::ValidationError(errors.join("; ")));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BasicValidator;
    use tempfile::tempdir;

    const PROXY: &str = r#"
        [proxy]
        target = "127.0.0.1:8080"
        session_ticket_key = "secret"

        [proxy.identity]
        cert = "proxy.pem"
        key = "proxy.key"
        ca = "ca.pem"

        [proxy.distribution]
        backends = ["127.0.0.1:2408"]

        [proxy.hosts."www.example.com"]
        key_server = "127.0.0.1:2407"
    "#;

    #[test]
    fn test_load_from_string() {
        let loader = ConfigLoader::new().with_validator(BasicValidator::new());
        let config = loader.load_str(PROXY).unwrap();
        assert_eq!(config.proxy().unwrap().target, "127.0.0.1:8080");
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.toml");
        std::fs::write(&config_path, PROXY).unwrap();

        let loader = ConfigLoader::new();
        let config = loader.load(&config_path).unwrap();
        assert_eq!(config.proxy().unwrap().hosts.len(), 1);
    }

    #[test]
    fn test_load_nonexistent_file() {
        let loader = ConfigLoader::new();
        let result = loader.load("/nonexistent/path/config.toml");
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_malformed_toml() {
        let loader = ConfigLoader::new();
        assert!(matches!(
            loader.load_str("[proxy"),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_validation_failure_is_reported() {
        let loader = ConfigLoader::new().with_validator(BasicValidator::new());
        let result = loader.load_str(&PROXY.replace(r#"backends = ["127.0.0.1:2408"]"#, "backends = []"));

        match result {
            Err(ConfigError::ValidationError(message)) => {
                assert!(message.contains("proxy.distribution.backends"));
            },
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
