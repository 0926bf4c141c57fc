//! Database migrations infrastructure

use async_trait::async_trait;
use sqlx::postgres::PgPool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::DomainError;

/// Table holding webhook rows
pub const WEBHOOKS_TABLE_NAME: &str = "webhooks";
/// Table holding the event type catalog
pub const WEBHOOKS_EVENTS_TABLE_NAME: &str = "webhook_events";
/// Join table between webhooks and event types
pub const WEBHOOKS_EVENTS_MAPPING_TABLE_NAME: &str = "webhooks_events_mapping";

/// Trait for running database migrations
#[async_trait]
pub trait Migrator: Send + Sync {
    /// Runs all pending migrations
    async fn run(&self) -> Result<(), DomainError>;

    /// Returns the current migration version
    async fn version(&self) -> Result<Option<i64>, DomainError>;
}

/// PostgreSQL migrator backed by a `_migrations` ledger table
#[derive(Debug)]
pub struct PostgresMigrator {
    pool: PgPool,
    migrations: Vec<Migration>,
}

impl PostgresMigrator {
    pub fn new(pool: PgPool) -> Self {
        Self::with_migrations(pool, webhook_migrations())
    }

    pub fn with_migrations(pool: PgPool, migrations: Vec<Migration>) -> Self {
        Self { pool, migrations }
    }

    /// Creates the migrations table if it doesn't exist
    async fn ensure_migrations_table(&self) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS _migrations (
                version BIGINT PRIMARY KEY,
                description TEXT NOT NULL,
                installed_on TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                success BOOLEAN NOT NULL DEFAULT TRUE
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to create migrations table: {}", e)))?;

        Ok(())
    }

    async fn is_applied(&self, version: i64) -> Result<bool, DomainError> {
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM _migrations WHERE version = $1)")
            .bind(version)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to check migration status: {}", e)))
    }

    /// Runs a single migration and records it in the same transaction
    pub async fn run_migration(&self, migration: &Migration) -> Result<(), DomainError> {
        self.ensure_migrations_table().await?;

        if self.is_applied(migration.version).await? {
            debug!(version = migration.version, "Migration already applied");
            return Ok(());
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DomainError::storage(format!("Failed to begin transaction: {}", e)))?;

        for statement in &migration.statements {
            sqlx::query(statement)
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    DomainError::storage(format!(
                        "Failed to run migration {}: {}",
                        migration.version, e
                    ))
                })?;
        }

        sqlx::query("INSERT INTO _migrations (version, description) VALUES ($1, $2)")
            .bind(migration.version)
            .bind(&migration.description)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                DomainError::storage(format!(
                    "Failed to record migration {}: {}",
                    migration.version, e
                ))
            })?;

        tx.commit()
            .await
            .map_err(|e| DomainError::storage(format!("Failed to commit migration: {}", e)))?;

        info!(
            version = migration.version,
            description = %migration.description,
            "Applied migration"
        );

        Ok(())
    }

    /// Returns the latest applied migration version
    pub async fn current_version(&self) -> Result<Option<i64>, DomainError> {
        self.ensure_migrations_table().await?;

        let version: Option<i64> =
            sqlx::query_scalar("SELECT MAX(version) FROM _migrations WHERE success = TRUE")
                .fetch_one(&self.pool)
                .await
                .map_err(|e| {
                    DomainError::storage(format!("Failed to get migration version: {}", e))
                })?;

        Ok(version)
    }
}

#[async_trait]
impl Migrator for PostgresMigrator {
    async fn run(&self) -> Result<(), DomainError> {
        for migration in &self.migrations {
            self.run_migration(migration).await?;
        }

        Ok(())
    }

    async fn version(&self) -> Result<Option<i64>, DomainError> {
        self.current_version().await
    }
}

/// Represents a database migration
#[derive(Debug, Clone)]
pub struct Migration {
    /// Migration version
    pub version: i64,
    /// Human-readable description
    pub description: String,
    /// Statements applied in order; each one is sent on its own
    pub statements: Vec<String>,
}

impl Migration {
    pub fn new<I, S>(version: i64, description: impl Into<String>, statements: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            version,
            description: description.into(),
            statements: statements.into_iter().map(Into::into).collect(),
        }
    }
}

/// Schema for webhooks, the event catalog and their join table
pub fn webhook_migrations() -> Vec<Migration> {
    vec![
        Migration::new(
            1,
            "Create webhooks table",
            [
                format!(
                    r#"
                    CREATE TABLE IF NOT EXISTS {webhooks} (
                        id UUID PRIMARY KEY,
                        name TEXT NOT NULL,
                        url VARCHAR(255) NOT NULL,
                        global BOOLEAN NOT NULL DEFAULT FALSE,
                        format_type VARCHAR(255) NOT NULL,
                        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                        context_id VARCHAR(255)
                    )
                    "#,
                    webhooks = WEBHOOKS_TABLE_NAME
                ),
                format!(
                    "CREATE INDEX IF NOT EXISTS idx_webhooks_updated_at ON {}(updated_at)",
                    WEBHOOKS_TABLE_NAME
                ),
                format!(
                    "CREATE INDEX IF NOT EXISTS idx_webhooks_global ON {}(global) WHERE global",
                    WEBHOOKS_TABLE_NAME
                ),
            ],
        ),
        Migration::new(
            2,
            "Create webhook event types table",
            [format!(
                r#"
                CREATE TABLE IF NOT EXISTS {events} (
                    id UUID PRIMARY KEY,
                    name TEXT NOT NULL UNIQUE
                )
                "#,
                events = WEBHOOKS_EVENTS_TABLE_NAME
            )],
        ),
        Migration::new(
            3,
            "Create webhook event mapping table",
            [
                format!(
                    r#"
                    CREATE TABLE IF NOT EXISTS {mapping} (
                        webhook_id UUID NOT NULL REFERENCES {webhooks}(id) ON DELETE CASCADE,
                        webhook_event_id UUID NOT NULL REFERENCES {events}(id),
                        PRIMARY KEY (webhook_id, webhook_event_id)
                    )
                    "#,
                    mapping = WEBHOOKS_EVENTS_MAPPING_TABLE_NAME,
                    webhooks = WEBHOOKS_TABLE_NAME,
                    events = WEBHOOKS_EVENTS_TABLE_NAME
                ),
                format!(
                    "CREATE INDEX IF NOT EXISTS idx_webhooks_events_mapping_event ON {}(webhook_event_id)",
                    WEBHOOKS_EVENTS_MAPPING_TABLE_NAME
                ),
            ],
        ),
    ]
}

/// Runs all pending webhook migrations
pub async fn run_webhook_migrations(pool: &PgPool) -> Result<(), DomainError> {
    PostgresMigrator::new(pool.clone()).run().await
}

/// Inserts catalog rows for event names not yet present, returning how many were added
pub async fn seed_event_types<S>(pool: &PgPool, names: &[S]) -> Result<u64, DomainError>
where
    S: AsRef<str>,
{
    let mut inserted = 0u64;

    for name in names {
        let name = name.as_ref();
        let query = format!(
            "INSERT INTO {} (id, name) VALUES ($1, $2) ON CONFLICT (name) DO NOTHING",
            WEBHOOKS_EVENTS_TABLE_NAME
        );

        let result = sqlx::query(&query)
            .bind(Uuid::new_v4())
            .bind(name)
            .execute(pool)
            .await
            .map_err(|e| {
                DomainError::storage(format!("Failed to seed event type '{}': {}", name, e))
            })?;

        inserted += result.rows_affected();
    }

    info!(inserted, requested = names.len(), "Seeded webhook event types");

    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migration_creation() {
        let migration = Migration::new(1, "Test migration", ["CREATE TABLE test"]);

        assert_eq!(migration.version, 1);
        assert_eq!(migration.description, "Test migration");
        assert_eq!(migration.statements, vec!["CREATE TABLE test".to_string()]);
    }

    #[test]
    fn test_webhook_migrations_order() {
        let migrations = webhook_migrations();

        assert_eq!(migrations.len(), 3);

        for i in 1..migrations.len() {
            assert!(
                migrations[i].version > migrations[i - 1].version,
                "Migrations should be in ascending order"
            );
        }
    }

    #[test]
    fn test_mapping_cascades_from_webhooks() {
        let migrations = webhook_migrations();
        let mapping = &migrations[2].statements[0];

        assert!(mapping.contains(WEBHOOKS_EVENTS_MAPPING_TABLE_NAME));
        assert!(mapping.contains("REFERENCES webhooks(id) ON DELETE CASCADE"));
        assert!(mapping.contains("REFERENCES webhook_events(id)"));
    }

    #[test]
    fn test_each_migration_statement_is_single() {
        for migration in webhook_migrations() {
            assert!(!migration.statements.is_empty());

            for statement in &migration.statements {
                assert!(
                    !statement.contains(';'),
                    "migration {} sends more than one statement at once",
                    migration.version
                );
            }
        }
    }
}
