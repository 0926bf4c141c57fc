//! Migrate and seed commands - schema and event catalog bootstrap

use clap::Args;
use sqlx::PgPool;
use tracing::info;

use crate::infrastructure::storage::{seed_event_types, Migrator, PostgresMigrator};

/// Arguments for the seed-events command
#[derive(Args, Clone, Debug)]
pub struct SeedArgs {
    /// Event type names to add; existing names are left untouched
    #[arg(required = true)]
    pub names: Vec<String>,
}

/// Applies pending migrations
pub async fn run(pool: &PgPool) -> anyhow::Result<()> {
    let migrator = PostgresMigrator::new(pool.clone());
    migrator.run().await?;

    info!(version = ?migrator.version().await?, "Schema is up to date");

    Ok(())
}

/// Applies pending migrations, then inserts the requested event types
pub async fn seed(pool: &PgPool, args: SeedArgs) -> anyhow::Result<()> {
    run(pool).await?;

    let inserted = seed_event_types(pool, &args.names).await?;
    println!(
        "{}",
        serde_json::json!({ "requested": args.names.len(), "inserted": inserted })
    );

    Ok(())
}
