use clap::{Parser, Subcommand};
use mailer::{Mailer, McpMailer};
use metrics_exporter_statsd::StatsdBuilder;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

mod config;

use config::{Config, ConfigError, MetricsConfig};

#[derive(Parser)]
#[command(name = "sendra", about = "Deployment monitoring relay")]
struct Cli {
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand)]
enum CliCommand {
    /// Serve the relay API
    Run {
        #[arg(long, default_value = "sendra.yaml")]
        config: PathBuf,
    },
    /// Load and validate a config file, then exit
    CheckConfig {
        #[arg(long, default_value = "sendra.yaml")]
        config: PathBuf,
    },
}

#[derive(thiserror::Error, Debug)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("could not set up metrics: {0}")]
    Metrics(String),
    #[error(transparent)]
    Relay(#[from] relay::errors::RelayError),
}

fn init_tracing(config: &Config) -> Option<sentry::ClientInitGuard> {
    let guard = config.sentry_dsn().map(|dsn| {
        sentry::init((
            dsn,
            sentry::ClientOptions {
                release: sentry::release_name!(),
                ..Default::default()
            },
        ))
    });

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .with(guard.as_ref().map(|_| sentry::integrations::tracing::layer()))
        .init();

    guard
}

fn init_metrics(config: &MetricsConfig) -> Result<(), CliError> {
    let recorder = StatsdBuilder::from(config.statsd_host.as_str(), config.statsd_port)
        .build(Some("sendra"))
        .map_err(|e| CliError::Metrics(e.to_string()))?;

    metrics::set_global_recorder(recorder)
        .map_err(|_| CliError::Metrics("a metrics recorder is already installed".into()))?;
    shared::metrics_defs::describe_all(relay::metrics_defs::ALL_METRICS);

    tracing::info!(
        host = %config.statsd_host,
        port = config.statsd_port,
        "Reporting metrics to statsd"
    );
    Ok(())
}

/// Connects the messaging tool. A tool that fails to start leaves the relay
/// running without notifications.
async fn connect_mailer(config: &relay::config::Config) -> Option<Arc<dyn Mailer>> {
    let mcp = config.mailer.as_ref()?;

    match McpMailer::connect(mcp).await {
        Ok(mailer) => {
            tracing::info!(command = %mcp.command, "Messaging tool connected");
            Some(Arc::new(mailer))
        }
        Err(e) => {
            tracing::error!(command = %mcp.command, error = %e, "Failed to connect messaging tool");
            None
        }
    }
}

async fn run(config: Config) -> Result<(), CliError> {
    if let Some(metrics) = &config.common.metrics {
        init_metrics(metrics)?;
    }

    let mailer = connect_mailer(&config.relay).await;
    if mailer.is_none() {
        tracing::warn!("Running without a messaging tool, failure notifications are disabled");
    }

    relay::run(config.relay, mailer).await?;
    Ok(())
}

fn main() -> Result<(), CliError> {
    let cli = Cli::parse();

    match cli.command {
        CliCommand::Run { config } => {
            let config = Config::from_file(&config)?;
            let _sentry = init_tracing(&config);

            tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .map_err(|e| CliError::Relay(e.into()))?
                .block_on(run(config))
        }
        CliCommand::CheckConfig { config } => {
            let path = config;
            Config::from_file(&path)?;
            println!("{} is valid", path.display());
            Ok(())
        }
    }
}
