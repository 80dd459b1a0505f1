//! Configuration validation system.

use std::collections::HashMap;
use std::net::SocketAddr;

use super::types::AppConfig;

/// A single validation error.
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// The field path that failed validation.
    pub field: String,
    /// Error message.
    pub message: String,
    /// Severity level.
    pub severity: ValidationSeverity,
}

impl ValidationError {
    /// Create a new error.
    pub fn error(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            severity: ValidationSeverity::Error,
        }
    }

    /// Create a new warning.
    pub fn warning(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            severity: ValidationSeverity::Warning,
        }
    }
}

/// Severity of validation issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationSeverity {
    /// Error - configuration is invalid.
    Error,
    /// Warning - configuration may have issues.
    Warning,
}

/// Result of configuration validation.
#[derive(Debug, Default)]
pub struct ValidationResult {
    errors: Vec<ValidationError>,
}

impl ValidationResult {
    /// Create a new empty (valid) result.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an error to the result.
    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    /// Check if the validation passed (no errors).
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self
            .errors
            .iter()
            .any(|e| e.severity == ValidationSeverity::Error)
    }

    /// Get all validation issues.
    #[must_use]
    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    /// Get only errors (not warnings).
    #[must_use]
    pub fn errors_only(&self) -> Vec<&ValidationError> {
        self.errors
            .iter()
            .filter(|e| e.severity == ValidationSeverity::Error)
            .collect()
    }

    /// Get only warnings.
    #[must_use]
    pub fn warnings(&self) -> Vec<&ValidationError> {
        self.errors
            .iter()
            .filter(|e| e.severity == ValidationSeverity::Warning)
            .collect()
    }
}

/// Trait for configuration validators.
pub trait Validator: std::fmt::Debug + Send + Sync {
    /// Validate a configuration and return any errors.
    fn validate(&self, config: &AppConfig) -> ValidationResult;
}

/// Built-in validator for basic configuration checks.
#[derive(Debug, Default)]
pub struct BasicValidator;

impl BasicValidator {
    /// Create a new basic validator.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn validate_proxy(config: &AppConfig, result: &mut ValidationResult) {
        let Some(proxy) = &config.proxy else {
            return;
        };

        if proxy.target.is_empty() {
            result.add_error(ValidationError::error(
                "proxy.target",
                "Backend target cannot be empty",
            ));
        }

        if proxy.session_ticket_key.is_empty() {
            result.add_error(ValidationError::error(
                "proxy.session_ticket_key",
                "Session ticket key cannot be empty",
            ));
        }

        // Key servers must be verified
        if proxy.identity.ca.is_none() {
            result.add_error(ValidationError::error(
                "proxy.identity.ca",
                "A CA bundle is required to verify key servers",
            ));
        }

        if proxy.distribution.backends.is_empty() {
            result.add_error(ValidationError::error(
                "proxy.distribution.backends",
                "At least one distribution backend is required",
            ));
        }

        if proxy.hosts.is_empty() {
            result.add_error(ValidationError::error(
                "proxy.hosts",
                "At least one hostname is required",
            ));
        }

        for (hostname, host) in &proxy.hosts {
            if hostname.is_empty() {
                result.add_error(ValidationError::error(
                    "proxy.hosts",
                    "Hostname cannot be empty",
                ));
            }
            if host.key_server.is_empty() {
                result.add_error(ValidationError::error(
                    format!("proxy.hosts.{hostname}.key_server"),
                    "Key server address cannot be empty",
                ));
            }
        }
    }

    fn validate_key_server(config: &AppConfig, result: &mut ValidationResult) {
        let Some(key_server) = &config.key_server else {
            return;
        };

        if key_server.distribution.allow.is_empty() {
            result.add_error(ValidationError::error(
                "key_server.distribution.allow",
                "Allow-list cannot be empty",
            ));
        }

        if key_server.identity.ca.is_none() {
            result.add_error(ValidationError::warning(
                "key_server.identity.ca",
                "No CA configured, client certificates will not be required",
            ));
        }

        if key_server.signing.keys.is_empty() {
            result.add_error(ValidationError::error(
                "key_server.signing.keys",
                "At least one key pair is required",
            ));
        }
    }
}

impl Validator for BasicValidator {
    fn validate(&self, config: &AppConfig) -> ValidationResult {
        let mut result = ValidationResult::new();

        if config.proxy.is_none() && config.key_server.is_none() {
            result.add_error(ValidationError::error(
                "",
                "Configuration must contain a [proxy] or [key_server] section",
            ));
        }

        Self::validate_proxy(config, &mut result);
        Self::validate_key_server(config, &mut result);

        result
    }
}

/// Validator that checks for listener address conflicts.
#[derive(Debug, Default)]
pub struct PortConflictValidator;

impl PortConflictValidator {
    /// Create a new port conflict validator.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Validator for PortConflictValidator {
    fn validate(&self, config: &AppConfig) -> ValidationResult {
        let mut result = ValidationResult::new();
        let mut listeners: Vec<(&str, SocketAddr)> = Vec::new();

        if let Some(proxy) = &config.proxy {
            listeners.push(("proxy.listen", proxy.listen));
        }
        if let Some(key_server) = &config.key_server {
            listeners.push(("key_server.distribution.listen", key_server.distribution.listen));
            listeners.push(("key_server.signing.listen", key_server.signing.listen));
        }

        let mut used_ports: HashMap<u16, &str> = HashMap::new();
        for (field, addr) in listeners {
            if let Some(existing) = used_ports.insert(addr.port(), field) {
                result.add_error(ValidationError::error(
                    field,
                    format!("Port {} is already used by {existing}", addr.port()),
                ));
            }
        }

        result
    }
}
