//! # Configuration System
//!
//! TOML configuration for both roles of the binary. A file may carry a
//! `[proxy]` section, a `[key_server]` section or both; the subcommand picks
//! which one is used.
//!
//! ## Example Configuration
//!
//! ```toml
//! [logging]
//! level = "info"
//! format = "json"
//!
//! [proxy]
//! listen = "0.0.0.0:443"
//! target = "127.0.0.1:8080"
//! session_ticket_key = "fleet-wide secret"
//!
//! [proxy.identity]
//! cert = "/etc/keyless/proxy.pem"
//! key = "/etc/keyless/proxy.key"
//! ca = "/etc/keyless/ca.pem"
//!
//! [proxy.distribution]
//! backends = ["10.0.0.1:2408", "10.0.0.2:2408"]
//!
//! [proxy.hosts."www.example.com"]
//! key_server = "10.0.0.1:2407"
//!
//! [key_server.identity]
//! cert = "/etc/keyless/keys.pem"
//! key = "/etc/keyless/keys.key"
//! ca = "/etc/keyless/ca.pem"
//!
//! [key_server.distribution]
//! listen = "0.0.0.0:2408"
//! allow = ["10.0.1.1"]
//!
//! [key_server.distribution.hosts]
//! "www.example.com" = "/etc/keyless/certs/www.example.com.pem"
//!
//! [[key_server.signing.keys]]
//! certificate = "/etc/keyless/certs/www.example.com.pem"
//! key = "/etc/keyless/keys/www.example.com.key"
//! ```

mod error;
mod loader;
mod types;
mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::ConfigLoader;
pub use types::{AppConfig, KeyServerConfig, LogFormat, LogLevel, LoggingConfig};
pub use validation::{
    BasicValidator, PortConflictValidator, ValidationError, ValidationResult, ValidationSeverity,
    Validator,
};
