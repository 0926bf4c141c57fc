//! Webhook repository trait

use super::{EventType, NewWebhook, Webhook, WebhookId, WebhookUpdate};
use crate::domain::context::RequestContext;
use crate::domain::error::DomainError;
use async_trait::async_trait;

#[cfg(test)]
use mockall::automock;

/// Persistence boundary for webhooks and their event subscriptions.
///
/// Every operation receives the caller's [`RequestContext`]. Only `create`
/// (ownership stamp) and `delete` (ownership filter) act on it; reads and
/// updates are not scoped at this layer.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait WebhookRepository: Send + Sync {
    /// Lists every webhook, most recently updated first
    async fn list(&self, ctx: &RequestContext) -> Result<Vec<Webhook>, DomainError>;

    /// Lists webhooks flagged as global
    async fn list_global(&self, ctx: &RequestContext) -> Result<Vec<Webhook>, DomainError>;

    /// Finds a webhook by ID
    async fn get(
        &self,
        ctx: &RequestContext,
        id: &WebhookId,
    ) -> Result<Option<Webhook>, DomainError>;

    /// Creates a webhook and subscribes it to the known event names in the input
    async fn create(
        &self,
        ctx: &RequestContext,
        input: NewWebhook,
    ) -> Result<Webhook, DomainError>;

    /// Updates the supplied columns and replaces the event subscriptions
    async fn update(
        &self,
        ctx: &RequestContext,
        id: &WebhookId,
        input: WebhookUpdate,
    ) -> Result<Webhook, DomainError>;

    /// Deletes a webhook, returning the number of rows removed
    async fn delete(&self, ctx: &RequestContext, id: &WebhookId) -> Result<u64, DomainError>;

    /// Lists the event type catalog ordered by name
    async fn list_event_types(&self, ctx: &RequestContext) -> Result<Vec<EventType>, DomainError>;
}
