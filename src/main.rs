//! keyless-ingress binary entry point.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::signal;
use tracing::{info, warn};

use keyless_ingress::config::{AppConfig, BasicValidator, ConfigLoader, PortConflictValidator};
use keyless_ingress::logging;
use keyless_ingress::modules::distribution::DistributionServer;
use keyless_ingress::modules::signing::SigningServer;
use keyless_ingress::modules::tls_terminator::TlsTerminator;
use keyless_ingress::modules::transport::server_config;

/// Split-trust TLS termination
#[derive(Parser, Debug)]
#[command(name = "keyless-ingress")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "keyless.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the TLS termination proxy
    Proxy,

    /// Run the key server (certificate distribution and signing)
    KeyServer,

    /// Validate the configuration file and exit
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = ConfigLoader::new()
        .with_validator(BasicValidator::new())
        .with_validator(PortConflictValidator::new())
        .load(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;

    logging::init(&config.logging).context("failed to initialize logging")?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %cli.config.display(),
        "keyless-ingress starting"
    );

    match cli.command {
        Command::Proxy => run_proxy(&config).await,
        Command::KeyServer => run_key_server(&config).await,
        Command::Check => {
            info!(
                proxy = config.proxy.is_some(),
                key_server = config.key_server.is_some(),
                "Configuration is valid"
            );
            Ok(())
        },
    }
}

async fn run_proxy(config: &AppConfig) -> Result<()> {
    let proxy = config.proxy()?;

    let terminator = Arc::new(TlsTerminator::from_config(proxy)?);
    let listener = TlsTerminator::bind(proxy.listen).await?;

    tokio::select! {
        () = terminator.run(listener) => {},
        result = signal::ctrl_c() => {
            result.context("failed to listen for shutdown signal")?;
            warn!("Shutdown signal received");
        }
    }

    Ok(())
}

async fn run_key_server(config: &AppConfig) -> Result<()> {
    let key_server = config.key_server()?;
    let tls = server_config(&key_server.identity)?;

    let distribution = Arc::new(DistributionServer::from_config(
        &key_server.distribution,
        Arc::clone(&tls),
    )?);
    let signing = Arc::new(SigningServer::from_config(&key_server.signing, tls)?);

    let distribution_listener = DistributionServer::bind(key_server.distribution.listen).await?;
    let signing_listener = SigningServer::bind(key_server.signing.listen).await?;

    info!(
        distribution = %key_server.distribution.listen,
        signing = %key_server.signing.listen,
        keys = signing.key_count(),
        "Key server ready"
    );

    tokio::select! {
        () = distribution.run(distribution_listener) => {},
        () = signing.run(signing_listener) => {},
        result = signal::ctrl_c() => {
            result.context("failed to listen for shutdown signal")?;
            warn!("Shutdown signal received");
        }
    }

    Ok(())
}
