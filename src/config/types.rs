//! Configuration types.

use serde::{Deserialize, Serialize};

use super::error::{ConfigError, ConfigResult};
use crate::modules::distribution::DistributionServerConfig;
use crate::modules::signing::SigningServerConfig;
use crate::modules::tls_terminator::ProxyConfig;
use crate::modules::transport::IdentityConfig;

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// TLS termination proxy.
    #[serde(default)]
    pub proxy: Option<ProxyConfig>,

    /// Key server: certificate distribution and signing.
    #[serde(default)]
    pub key_server: Option<KeyServerConfig>,
}

impl AppConfig {
    /// The `[proxy]` section.
    ///
    /// # Errors
    ///
    /// Returns an error if the section is absent.
    pub fn proxy(&self) -> ConfigResult<&ProxyConfig> {
        self.proxy.as_ref().ok_or_else(|| ConfigError::MissingSection {
            section: "proxy".to_string(),
        })
    }

    /// The `[key_server]` section.
    ///
    /// # Errors
    ///
    /// Returns an error if the section is absent.
    pub fn key_server(&self) -> ConfigResult<&KeyServerConfig> {
        self.key_server
            .as_ref()
            .ok_or_else(|| ConfigError::MissingSection {
                section: "key_server".to_string(),
            })
    }
}

/// Key server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyServerConfig {
    /// Server identity for both listeners. When `ca` is set, clients must
    /// present a certificate issued by it.
    pub identity: IdentityConfig,

    /// Certificate distribution listener.
    #[serde(default)]
    pub distribution: DistributionServerConfig,

    /// Signing listener.
    #[serde(default)]
    pub signing: SigningServerConfig,
}

/// Logging configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    pub level: LogLevel,

    /// Log format (json, pretty, compact).
    pub format: LogFormat,
}

/// Log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level (most verbose).
    Trace,
    /// Debug level.
    Debug,
    /// Info level (default).
    #[default]
    Info,
    /// Warning level.
    Warn,
    /// Error level (least verbose).
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Trace => write!(f, "trace"),
            Self::Debug => write!(f, "debug"),
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Log format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON format (machine-readable).
    Json,
    /// Pretty format with colors (default).
    #[default]
    Pretty,
    /// Compact single-line format.
    Compact,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config.logging.level, LogLevel::Info);
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert!(matches!(
            config.proxy(),
            Err(ConfigError::MissingSection { .. })
        ));
        assert!(config.key_server().is_err());
    }

    #[test]
    fn test_key_server_section() {
        let config: AppConfig = toml::from_str(
            r#"
            [logging]
            level = "debug"
            format = "json"

            [key_server.identity]
            cert = "/etc/keyless/keys.pem"
            key = "/etc/keyless/keys.key"

            [key_server.distribution]
            allow = ["10.0.1.1"]

            [[key_server.signing.keys]]
            certificate = "/etc/keyless/www.pem"
            key = "/etc/keyless/www.key"
        "#,
        )
        .unwrap();

        assert_eq!(config.logging.level.to_string(), "debug");
        assert_eq!(config.logging.format, LogFormat::Json);

        let key_server = config.key_server().unwrap();
        assert!(key_server.identity.ca.is_none());
        assert_eq!(key_server.distribution.listen.port(), 2408);
        assert_eq!(key_server.signing.listen.port(), 2407);
        assert_eq!(key_server.signing.keys.len(), 1);
    }
}
