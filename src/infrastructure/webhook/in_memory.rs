//! In-memory webhook repository implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeSet, HashMap};
use std::sync::RwLock;
use tracing::debug;

use crate::domain::context::{ContextId, RequestContext};
use crate::domain::webhook::{
    EventType, EventTypeId, NewWebhook, Webhook, WebhookId, WebhookRepository, WebhookUpdate,
};
use crate::domain::DomainError;

#[derive(Debug, Clone)]
struct StoredWebhook {
    id: WebhookId,
    name: String,
    url: String,
    format_type: String,
    global: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    context_id: Option<ContextId>,
    event_ids: BTreeSet<EventTypeId>,
}

#[derive(Debug, Default)]
struct State {
    webhooks: HashMap<WebhookId, StoredWebhook>,
    event_types: Vec<EventType>,
}

impl State {
    fn resolve_events(&self, names: &[String]) -> BTreeSet<EventTypeId> {
        let resolved: BTreeSet<EventTypeId> = self
            .event_types
            .iter()
            .filter(|e| names.contains(&e.name))
            .map(|e| e.id)
            .collect();

        if resolved.len() < names.len() {
            let unknown: Vec<&String> = names
                .iter()
                .filter(|n| !self.event_types.iter().any(|e| &e.name == *n))
                .collect();

            if !unknown.is_empty() {
                debug!(unknown = ?unknown, "Ignoring unknown event type names");
            }
        }

        resolved
    }

    fn materialize(&self, stored: &StoredWebhook) -> Webhook {
        let events = self
            .event_types
            .iter()
            .filter(|e| stored.event_ids.contains(&e.id))
            .map(|e| e.name.clone())
            .collect();

        Webhook {
            id: stored.id,
            name: stored.name.clone(),
            url: stored.url.clone(),
            format_type: stored.format_type.clone(),
            global: stored.global,
            created_at: stored.created_at,
            updated_at: stored.updated_at,
            context_id: stored.context_id.clone(),
            events,
        }
    }
}

/// In-memory implementation of WebhookRepository
///
/// Mirrors the PostgreSQL store: silent drop of unknown event names,
/// `updated_at` descending order for `list`, and context-filtered deletes.
#[derive(Debug, Default)]
pub struct InMemoryWebhookRepository {
    state: RwLock<State>,
}

impl InMemoryWebhookRepository {
    /// Creates a new repository with an empty event catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a repository whose catalog holds the given event names
    pub fn with_event_types<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let repo = Self::new();
        {
            let mut state = repo.state.write().unwrap_or_else(|e| e.into_inner());

            for name in names {
                let name = name.into();

                if !state.event_types.iter().any(|e| e.name == name) {
                    state.event_types.push(EventType::new(name));
                }
            }
            state.event_types.sort_by(|a, b| a.name.cmp(&b.name));
        }
        repo
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, State>, DomainError> {
        self.state
            .read()
            .map_err(|e| DomainError::storage(format!("Failed to acquire read lock: {}", e)))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, State>, DomainError> {
        self.state
            .write()
            .map_err(|e| DomainError::storage(format!("Failed to acquire write lock: {}", e)))
    }
}

#[async_trait]
impl WebhookRepository for InMemoryWebhookRepository {
    async fn list(&self, _ctx: &RequestContext) -> Result<Vec<Webhook>, DomainError> {
        let state = self.read()?;

        let mut stored: Vec<&StoredWebhook> = state.webhooks.values().collect();
        stored.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));

        Ok(stored.into_iter().map(|w| state.materialize(w)).collect())
    }

    async fn list_global(&self, _ctx: &RequestContext) -> Result<Vec<Webhook>, DomainError> {
        let state = self.read()?;

        let mut stored: Vec<&StoredWebhook> =
            state.webhooks.values().filter(|w| w.global).collect();
        stored.sort_by(|a, b| a.created_at.cmp(&b.created_at));

        Ok(stored.into_iter().map(|w| state.materialize(w)).collect())
    }

    async fn get(
        &self,
        _ctx: &RequestContext,
        id: &WebhookId,
    ) -> Result<Option<Webhook>, DomainError> {
        let state = self.read()?;

        Ok(state.webhooks.get(id).map(|w| state.materialize(w)))
    }

    async fn create(
        &self,
        ctx: &RequestContext,
        input: NewWebhook,
    ) -> Result<Webhook, DomainError> {
        let mut state = self.write()?;

        let id = WebhookId::generate();
        let event_ids = state.resolve_events(&input.events);
        let now = Utc::now();

        let stored = StoredWebhook {
            id,
            name: input.name,
            url: input.url,
            format_type: input.format_type,
            global: input.global,
            created_at: now,
            updated_at: now,
            context_id: ctx.context_id().cloned(),
            event_ids,
        };

        let webhook = state.materialize(&stored);
        state.webhooks.insert(id, stored);

        Ok(webhook)
    }

    async fn update(
        &self,
        _ctx: &RequestContext,
        id: &WebhookId,
        input: WebhookUpdate,
    ) -> Result<Webhook, DomainError> {
        let mut state = self.write()?;

        if !state.webhooks.contains_key(id) {
            return Err(DomainError::not_found(format!("Webhook '{}' not found", id)));
        }

        let event_ids = state.resolve_events(&input.events);

        let stored = state
            .webhooks
            .get_mut(id)
            .ok_or_else(|| DomainError::not_found(format!("Webhook '{}' not found", id)))?;

        stored.event_ids = event_ids;

        if let Some(name) = input.name {
            stored.name = name;
        }
        if let Some(url) = input.url {
            stored.url = url;
        }
        if let Some(format_type) = input.format_type {
            stored.format_type = format_type;
        }
        if let Some(global) = input.global {
            stored.global = global;
        }
        stored.updated_at = Utc::now();

        let stored = stored.clone();
        Ok(state.materialize(&stored))
    }

    async fn delete(&self, ctx: &RequestContext, id: &WebhookId) -> Result<u64, DomainError> {
        let mut state = self.write()?;

        let matches = match (state.webhooks.get(id), ctx.context_id()) {
            (Some(stored), Some(context_id)) => stored.context_id.as_ref() == Some(context_id),
            (Some(_), None) => true,
            (None, _) => false,
        };

        if !matches {
            return Ok(0);
        }

        state.webhooks.remove(id);
        Ok(1)
    }

    async fn list_event_types(&self, _ctx: &RequestContext) -> Result<Vec<EventType>, DomainError> {
        Ok(self.read()?.event_types.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn create_repo() -> InMemoryWebhookRepository {
        InMemoryWebhookRepository::with_event_types(["push", "pull", "merge"])
    }

    fn sorted(mut events: Vec<String>) -> Vec<String> {
        events.sort();
        events
    }

    #[tokio::test]
    async fn test_create_drops_unknown_event_names() {
        let repo = create_repo();
        let ctx = RequestContext::background();

        let created = repo
            .create(
                &ctx,
                NewWebhook::new("w1", "http://x", "json")
                    .with_events(["push", "pull", "deploy", "release"]),
            )
            .await
            .unwrap();

        assert_eq!(sorted(created.events), vec!["pull", "push"]);
    }

    #[tokio::test]
    async fn test_get_after_create_matches_input() {
        let repo = create_repo();
        let ctx = RequestContext::for_context("tenant-a");

        let created = repo
            .create(
                &ctx,
                NewWebhook::new("w1", "http://x", "json")
                    .with_global(true)
                    .with_event("merge"),
            )
            .await
            .unwrap();

        let found = repo.get(&ctx, &created.id).await.unwrap().unwrap();
        assert_eq!(found, created);
        assert_eq!(found.name, "w1");
        assert_eq!(found.url, "http://x");
        assert_eq!(found.format_type, "json");
        assert!(found.global);
        assert_eq!(found.context_id, Some(ContextId::new("tenant-a")));
        assert_eq!(found.events, vec!["merge"]);
        assert_eq!(found.created_at, found.updated_at);
    }

    #[tokio::test]
    async fn test_create_without_context_leaves_context_unset() {
        let repo = create_repo();

        let created = repo
            .create(
                &RequestContext::background(),
                NewWebhook::new("w1", "http://x", "json"),
            )
            .await
            .unwrap();

        assert!(created.context_id.is_none());
        assert!(created.events.is_empty());
    }

    #[tokio::test]
    async fn test_update_replaces_events_wholesale() {
        let repo = create_repo();
        let ctx = RequestContext::background();

        let created = repo
            .create(
                &ctx,
                NewWebhook::new("w1", "http://x", "json").with_events(["push", "pull"]),
            )
            .await
            .unwrap();

        let updated = repo
            .update(
                &ctx,
                &created.id,
                WebhookUpdate::new().with_events(["pull", "merge"]),
            )
            .await
            .unwrap();

        assert_eq!(sorted(updated.events), vec!["merge", "pull"]);
        assert_eq!(updated.name, "w1");
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.created_at, created.created_at);
        assert!(updated.updated_at >= created.updated_at);
    }

    #[tokio::test]
    async fn test_update_applies_supplied_columns_only() {
        let repo = create_repo();
        let ctx = RequestContext::background();

        let created = repo
            .create(&ctx, NewWebhook::new("w1", "http://x", "json"))
            .await
            .unwrap();

        let updated = repo
            .update(
                &ctx,
                &created.id,
                WebhookUpdate::new()
                    .with_url("http://y")
                    .with_global(true),
            )
            .await
            .unwrap();

        assert_eq!(updated.name, "w1");
        assert_eq!(updated.url, "http://y");
        assert_eq!(updated.format_type, "json");
        assert!(updated.global);
    }

    #[tokio::test]
    async fn test_update_missing_webhook_is_not_found() {
        let repo = create_repo();
        let ctx = RequestContext::background();

        let err = repo
            .update(
                &ctx,
                &WebhookId::generate(),
                WebhookUpdate::new().with_events(["push"]),
            )
            .await
            .unwrap_err();

        assert!(err.is_not_found());
        assert!(repo.list(&ctx).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_drops_unknown_event_names() {
        let repo = create_repo();
        let ctx = RequestContext::background();

        let created = repo
            .create(&ctx, NewWebhook::new("w1", "http://x", "json").with_event("push"))
            .await
            .unwrap();

        let updated = repo
            .update(
                &ctx,
                &created.id,
                WebhookUpdate::new().with_events(["merge", "deploy", "release"]),
            )
            .await
            .unwrap();

        assert_eq!(updated.events, vec!["merge"]);

        let found = repo.get(&ctx, &created.id).await.unwrap().unwrap();
        assert_eq!(found.events, vec!["merge"]);
    }

    #[tokio::test]
    async fn test_reads_and_updates_ignore_caller_context() {
        let repo = create_repo();
        let owner = RequestContext::for_context("tenant-a");
        let other = RequestContext::for_context("tenant-b");

        let created = repo
            .create(
                &owner,
                NewWebhook::new("w1", "http://x", "json")
                    .with_global(true)
                    .with_event("push"),
            )
            .await
            .unwrap();

        let found = repo.get(&other, &created.id).await.unwrap().unwrap();
        assert_eq!(found, created);

        let listed = repo.list(&other).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, created.id);

        let globals = repo.list_global(&other).await.unwrap();
        assert_eq!(globals.len(), 1);
        assert_eq!(globals[0].id, created.id);

        let updated = repo
            .update(
                &other,
                &created.id,
                WebhookUpdate::new().with_name("renamed").with_events(["pull"]),
            )
            .await
            .unwrap();

        assert_eq!(updated.name, "renamed");
        assert_eq!(updated.events, vec!["pull"]);
        assert_eq!(updated.context_id, Some(ContextId::new("tenant-a")));
    }

    #[tokio::test]
    async fn test_empty_context_is_treated_as_absent() {
        let repo = create_repo();
        let empty = RequestContext::for_context("");

        let unowned = repo
            .create(&empty, NewWebhook::new("w1", "http://x", "json"))
            .await
            .unwrap();
        assert!(unowned.context_id.is_none());

        let owned = repo
            .create(
                &RequestContext::for_context("tenant-a"),
                NewWebhook::new("w2", "http://y", "json"),
            )
            .await
            .unwrap();

        assert_eq!(repo.delete(&empty, &owned.id).await.unwrap(), 1);
        assert!(repo.get(&empty, &owned.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_is_scoped_to_context() {
        let repo = create_repo();
        let owner = RequestContext::for_context("tenant-a");
        let other = RequestContext::for_context("tenant-b");

        let created = repo
            .create(&owner, NewWebhook::new("w1", "http://x", "json"))
            .await
            .unwrap();

        assert_eq!(repo.delete(&other, &created.id).await.unwrap(), 0);
        assert!(repo.get(&owner, &created.id).await.unwrap().is_some());

        assert_eq!(repo.delete(&owner, &created.id).await.unwrap(), 1);
        assert!(repo.get(&owner, &created.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_without_context_removes_any_webhook() {
        let repo = create_repo();
        let owner = RequestContext::for_context("tenant-a");
        let background = RequestContext::background();

        let created = repo
            .create(&owner, NewWebhook::new("w1", "http://x", "json"))
            .await
            .unwrap();

        assert_eq!(repo.delete(&background, &created.id).await.unwrap(), 1);
        assert_eq!(repo.delete(&background, &created.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_scoped_delete_skips_unowned_webhook() {
        let repo = create_repo();
        let background = RequestContext::background();

        let created = repo
            .create(
                &background,
                NewWebhook::new("g", "http://x", "json").with_global(true),
            )
            .await
            .unwrap();

        let removed = repo
            .delete(&RequestContext::for_context("tenant-a"), &created.id)
            .await
            .unwrap();
        assert_eq!(removed, 0);
    }

    #[tokio::test]
    async fn test_list_global_excludes_non_global() {
        let repo = create_repo();
        let ctx = RequestContext::background();

        repo.create(&ctx, NewWebhook::new("scoped", "http://a", "json"))
            .await
            .unwrap();
        let global = repo
            .create(
                &ctx,
                NewWebhook::new("global", "http://b", "json").with_global(true),
            )
            .await
            .unwrap();

        let result = repo.list_global(&ctx).await.unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].id, global.id);
        assert!(result.iter().all(|w| w.global));
    }

    #[tokio::test]
    async fn test_list_orders_by_most_recently_updated() {
        let repo = create_repo();
        let ctx = RequestContext::background();

        let first = repo
            .create(&ctx, NewWebhook::new("first", "http://a", "json"))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        let second = repo
            .create(&ctx, NewWebhook::new("second", "http://b", "json"))
            .await
            .unwrap();

        let listed = repo.list(&ctx).await.unwrap();
        assert_eq!(listed[0].id, second.id);
        assert_eq!(listed[1].id, first.id);

        tokio::time::sleep(Duration::from_millis(5)).await;
        repo.update(&ctx, &first.id, WebhookUpdate::new().with_name("first-renamed"))
            .await
            .unwrap();

        let listed = repo.list(&ctx).await.unwrap();
        assert_eq!(listed[0].id, first.id);
        assert_eq!(listed[1].id, second.id);
        assert!(listed[0].updated_at > listed[1].updated_at);
    }

    #[tokio::test]
    async fn test_webhook_lifecycle() {
        let repo = create_repo();
        let ctx = RequestContext::background();

        let created = repo
            .create(
                &ctx,
                NewWebhook::new("w1", "http://x", "json").with_events(["push", "pull"]),
            )
            .await
            .unwrap();
        assert_eq!(sorted(created.events.clone()), vec!["pull", "push"]);

        repo.update(&ctx, &created.id, WebhookUpdate::new().with_events(["pull"]))
            .await
            .unwrap();
        let found = repo.get(&ctx, &created.id).await.unwrap().unwrap();
        assert_eq!(found.events, vec!["pull"]);

        assert_eq!(repo.delete(&ctx, &created.id).await.unwrap(), 1);
        assert!(repo.get(&ctx, &created.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_event_types_sorted_and_deduplicated() {
        let repo = InMemoryWebhookRepository::with_event_types(["pull", "push", "pull"]);

        let names: Vec<String> = repo
            .list_event_types(&RequestContext::background())
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();

        assert_eq!(names, vec!["pull", "push"]);
    }
}
