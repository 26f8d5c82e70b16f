use apex_core::{
    config::{self, database},
    errors::Result,
};
use clap::Parser;
use dotenvy::dotenv;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod cli;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; env vars can also be set externally
    dotenv().ok();

    let args = cli::Cli::parse();

    // 3. Load the application configuration
    let app_config = config::load_default_config()
        .inspect_err(|e| error!("Failed to load configuration: {}", e))?;

    // 4. Connect and bring the schema up to date
    let db = database::create_connection()
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    let applied = database::run_migrations(&db)
        .await
        .inspect_err(|e| error!("Failed to run migrations: {}", e))?;
    if !applied.is_empty() {
        info!(?applied, "Database schema updated");
    }

    // 5. Run the requested command
    cli::run(args.command, &db, &app_config).await
}
