//! # Till Migrate
//!
//! Applies the embedded schema migrations to the configured database.
//!
//! ## Usage
//! ```bash
//! # Uses till.toml / TILL_* settings
//! cargo run -p till-db --bin till-migrate
//!
//! # Explicit database file
//! TILL_DATABASE_PATH=./data/till.db cargo run -p till-db --bin till-migrate
//! ```

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use till_db::migrations::migration_status;
use till_db::{Database, TillConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = TillConfig::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_filter)),
        )
        .init();

    info!(database = %config.database_path, "Applying migrations");

    let db = Database::new(config.into_db_config().run_migrations(false)).await?;

    let before = migration_status(db.pool()).await?;
    if let Err(e) = db.run_migrations().await {
        error!(error = %e, "Migration failed");
        db.close().await;
        return Err(e.into());
    }
    let after = migration_status(db.pool()).await?;

    info!(
        total = after.total,
        newly_applied = after.applied.saturating_sub(before.applied),
        current = after.is_current(),
        "Migrations complete"
    );

    db.close().await;
    Ok(())
}
