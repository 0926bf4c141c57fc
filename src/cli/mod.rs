//! CLI module for the webhook store
//!
//! Provides subcommands for managing the schema and the stored webhooks:
//! - `migrate` / `seed-events`: schema and event catalog bootstrap
//! - `list`, `get`, `create`, `update`, `delete`, `event-types`: webhook administration

pub mod migrate;
pub mod webhooks;

use clap::{Parser, Subcommand};
use tracing::debug;

use crate::config::AppConfig;
use crate::domain::RequestContext;
use crate::infrastructure::logging;
use crate::infrastructure::webhook::PostgresWebhookRepository;

/// Webhook Store - manage webhooks and their event subscriptions
#[derive(Parser)]
#[command(name = "webhook-store")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Context (tenant) identifier to act on behalf of
    #[arg(long, global = true)]
    pub context: Option<String>,

    /// Database URL (overrides config)
    #[arg(long, global = true)]
    pub database_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create or upgrade the webhook tables
    Migrate,

    /// Add event types to the catalog
    SeedEvents(migrate::SeedArgs),

    #[command(flatten)]
    Webhook(webhooks::WebhookCommand),
}

/// Loads configuration, connects to the database and runs the command
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let mut config = AppConfig::load()?;
    if let Some(url) = cli.database_url {
        config.database.url = url;
    }

    logging::init_logging(&logging::LoggingConfig::from(&config.logging));

    let ctx = RequestContext::from_optional(cli.context);
    debug!(context_id = ?ctx.context_id(), "Resolved caller context");

    let pool = config.database.to_postgres_config().connect().await?;

    match cli.command {
        Command::Migrate => migrate::run(&pool).await?,
        Command::SeedEvents(args) => migrate::seed(&pool, args).await?,
        Command::Webhook(command) => {
            let repo = PostgresWebhookRepository::init(pool.clone()).await?;
            let output = webhooks::execute(&repo, &ctx, command).await?;
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    pool.close().await;

    Ok(())
}
