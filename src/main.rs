//! # Vendor Console Main Entry Point

use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use vendor_console::{
    auth::{HostedAuthClient, SessionStore},
    config::ConfigLoader,
    db::{init_pool, run_migrations},
    procedures::DatabaseProcedures,
    provisioning::TableProvisioner,
    server::{AppState, run_server},
    services::VendorService,
    telemetry::init_tracing,
};

#[derive(Parser)]
#[command(name = "vendor-console", version, about = "Vendor tenant console")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Default)]
enum Command {
    /// Run the console web server
    #[default]
    Serve,
    /// Apply database migrations and exit
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration from layered env files and variables
    let config = ConfigLoader::new().load()?;
    init_tracing(&config)?;

    info!(profile = %config.profile, "Loaded configuration");
    if let Ok(redacted_json) = config.redacted_json() {
        info!(config = %redacted_json, "Effective configuration");
    }

    let db = init_pool(&config).await?;

    match cli.command.unwrap_or_default() {
        Command::Migrate => {
            run_migrations(&db).await?;
            info!("Migrations applied");
            Ok(())
        }
        Command::Serve => {
            if config.run_migrations {
                run_migrations(&db).await?;
            }

            let sessions = SessionStore::new(
                HostedAuthClient::from_config(&config),
                !config.is_dev_profile(),
            );
            let provisioner =
                TableProvisioner::new(Arc::new(DatabaseProcedures::new(db.clone())));
            let vendors = VendorService::new(db.clone(), provisioner);
            let state = AppState::new(config, db, sessions, vendors)
                .context("Failed to compile console templates")?;

            let shutdown = CancellationToken::new();
            let signal = shutdown.clone();
            tokio::spawn(async move {
                if let Err(err) = tokio::signal::ctrl_c().await {
                    warn!(error = %err, "Failed to listen for ctrl-c");
                    return;
                }
                info!("Shutdown requested");
                signal.cancel();
            });

            run_server(state, shutdown).await
        }
    }
}
