//! Storage infrastructure - PostgreSQL pool and schema management

pub mod migrations;
mod postgres;

pub use migrations::{
    run_webhook_migrations, seed_event_types, Migration, Migrator, PostgresMigrator,
};
pub use postgres::PostgresConfig;
