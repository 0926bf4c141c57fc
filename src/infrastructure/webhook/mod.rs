//! Webhook repository implementations

mod in_memory;
mod postgres_repository;

pub use in_memory::InMemoryWebhookRepository;
pub use postgres_repository::PostgresWebhookRepository;
