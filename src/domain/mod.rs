//! Domain layer - Webhook entities, caller context and repository contracts

pub mod context;
pub mod error;
pub mod webhook;

pub use context::{ContextId, RequestContext};
pub use error::DomainError;
pub use webhook::{
    EventType, EventTypeId, NewWebhook, Webhook, WebhookId, WebhookRepository, WebhookUpdate,
};
