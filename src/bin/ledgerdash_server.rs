//! ledgerdash-server: invoice dashboard backend
//!
//! Serves the dashboard REST API on top of PostgreSQL. The schema and seed
//! data are bootstrapped lazily by the first query; the server also triggers
//! one bootstrap attempt at startup so problems show up in the logs early.
//!
//! ## Configuration
//! - `ledgerdash.yaml`, `--config PATH` or `LEDGERDASH_CONFIG`
//! - `LEDGERDASH__*` environment overrides, `DATABASE_URL`
//! - `LEDGERDASH_LOG`: tracing filter (default: info)

use std::sync::Arc;

use clap::Parser;
use tracing::{error, info, warn};

use ledgerdash::bootstrap::BootstrapCoordinator;
use ledgerdash::config::Config;
use ledgerdash::gateway::{PgExecutor, QueryGateway};
use ledgerdash::handlers::api::{self, AppState};
use ledgerdash::storage::{self, PostgresCatalog, PostgresDashboardStore};
use ledgerdash::utils::bootstrap::init_tracing;

#[derive(Parser)]
#[command(name = "ledgerdash-server")]
#[command(about = "Invoice dashboard backend")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cli = Cli::parse();
    init_tracing();

    let config = Config::load(cli.config.as_deref()).map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e.to_string()
    })?;

    info!(
        environment = ?config.environment,
        ssl = ?config.ssl(),
        "Starting ledgerdash-server"
    );

    let pool = storage::connect_lazy(&config.database, config.ssl())?;

    let catalog = Arc::new(PostgresCatalog::new(pool.clone()));
    let bootstrap = Arc::new(BootstrapCoordinator::new(
        catalog,
        config.bootstrap.clone(),
    ));

    match bootstrap.ensure_initialized().await {
        Ok(()) => {}
        Err(e) if config.bootstrap.fail_fast => {
            error!(error = %e, "Startup bootstrap failed, exiting");
            return Err(e.into());
        }
        Err(e) => {
            warn!(error = %e, "Startup bootstrap failed, will retry on first query");
        }
    }

    let gateway = Arc::new(QueryGateway::new(PgExecutor::new(pool), bootstrap.clone()));
    let store = Arc::new(PostgresDashboardStore::new(gateway));

    let state = AppState::new(store, bootstrap);
    api::serve(state, &config.server.bind_address()).await
}
