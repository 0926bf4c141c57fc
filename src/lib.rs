//! Webhook Store
//!
//! Persistence for webhook configurations and their subscriptions to a
//! catalog of event types:
//! - PostgreSQL store with transactional create/update
//! - In-memory store with the same semantics for tests and local tooling
//! - Explicit caller context for tenant ownership

pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;
pub use domain::{
    ContextId, DomainError, EventType, NewWebhook, RequestContext, Webhook, WebhookId,
    WebhookRepository, WebhookUpdate,
};
pub use infrastructure::webhook::{InMemoryWebhookRepository, PostgresWebhookRepository};

