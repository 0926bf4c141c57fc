//! PostgreSQL webhook repository implementation

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::{Postgres, Row, Transaction};
use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::context::{ContextId, RequestContext};
use crate::domain::webhook::{
    EventType, EventTypeId, NewWebhook, Webhook, WebhookId, WebhookRepository, WebhookUpdate,
};
use crate::domain::DomainError;
use crate::infrastructure::storage::migrations::{
    run_webhook_migrations, WEBHOOKS_EVENTS_MAPPING_TABLE_NAME, WEBHOOKS_EVENTS_TABLE_NAME,
    WEBHOOKS_TABLE_NAME,
};

/// PostgreSQL implementation of WebhookRepository
///
/// Webhooks, the event type catalog and their join table live in three
/// relational tables. Event names are aggregated per webhook in the read
/// queries, so each read is a single statement. `create` and `update` run
/// inside one transaction each.
#[derive(Debug, Clone)]
pub struct PostgresWebhookRepository {
    pool: PgPool,
}

impl PostgresWebhookRepository {
    /// Binds the repository to a caller-owned pool and makes sure the schema exists
    pub async fn init(pool: PgPool) -> Result<Self, DomainError> {
        run_webhook_migrations(&pool).await?;

        Ok(Self { pool })
    }

    async fn fetch_one(&self, id: &WebhookId) -> Result<Option<Webhook>, DomainError> {
        let query = select_webhooks_sql("WHERE w.id = $1", "");

        let row = sqlx::query(&query)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to get webhook: {}", e)))?;

        row.as_ref().map(row_to_webhook).transpose()
    }

    async fn begin(&self) -> Result<Transaction<'static, Postgres>, DomainError> {
        self.pool
            .begin()
            .await
            .map_err(|e| DomainError::storage(format!("Failed to begin transaction: {}", e)))
    }
}

#[async_trait]
impl WebhookRepository for PostgresWebhookRepository {
    async fn list(&self, ctx: &RequestContext) -> Result<Vec<Webhook>, DomainError> {
        let query = select_webhooks_sql("", "ORDER BY w.updated_at DESC");

        let rows = sqlx::query(&query)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to list webhooks: {}", e)))?;

        debug!(count = rows.len(), context_id = ?ctx.context_id(), "Listed webhooks");

        rows.iter().map(row_to_webhook).collect()
    }

    async fn list_global(&self, _ctx: &RequestContext) -> Result<Vec<Webhook>, DomainError> {
        let query = select_webhooks_sql("WHERE w.global = TRUE", "ORDER BY w.created_at");

        let rows = sqlx::query(&query)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to list global webhooks: {}", e)))?;

        rows.iter().map(row_to_webhook).collect()
    }

    async fn get(
        &self,
        _ctx: &RequestContext,
        id: &WebhookId,
    ) -> Result<Option<Webhook>, DomainError> {
        self.fetch_one(id).await
    }

    async fn create(
        &self,
        ctx: &RequestContext,
        input: NewWebhook,
    ) -> Result<Webhook, DomainError> {
        let id = WebhookId::generate();
        let event_ids = resolve_event_ids(&self.pool, &input.events).await?;

        let mut tx = self.begin().await?;

        let insert = format!(
            r#"
            INSERT INTO {} (id, name, url, format_type, global, context_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
            WEBHOOKS_TABLE_NAME
        );

        sqlx::query(&insert)
            .bind(id.as_uuid())
            .bind(&input.name)
            .bind(&input.url)
            .bind(&input.format_type)
            .bind(input.global)
            .bind(ctx.context_id().map(ContextId::as_str))
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                if e.to_string().contains("duplicate key") {
                    DomainError::conflict(format!("Webhook '{}' already exists", id))
                } else {
                    DomainError::storage(format!("Failed to create webhook: {}", e))
                }
            })?;

        associate_events(&mut tx, &id, &event_ids).await?;

        tx.commit()
            .await
            .map_err(|e| DomainError::storage(format!("Failed to commit webhook creation: {}", e)))?;

        info!(
            webhook_id = %id,
            context_id = ?ctx.context_id(),
            events = event_ids.len(),
            "Created webhook"
        );

        self.fetch_one(&id).await?.ok_or_else(|| {
            DomainError::internal(format!("Webhook '{}' missing after creation", id))
        })
    }

    async fn update(
        &self,
        ctx: &RequestContext,
        id: &WebhookId,
        input: WebhookUpdate,
    ) -> Result<Webhook, DomainError> {
        let mut tx = self.begin().await?;

        let lock = format!("SELECT id FROM {} WHERE id = $1 FOR UPDATE", WEBHOOKS_TABLE_NAME);
        let existing: Option<Uuid> = sqlx::query_scalar(&lock)
            .bind(id.as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to load webhook: {}", e)))?;

        if existing.is_none() {
            return Err(DomainError::not_found(format!("Webhook '{}' not found", id)));
        }

        let event_ids = resolve_event_ids(&mut *tx, &input.events).await?;

        let clear = format!(
            "DELETE FROM {} WHERE webhook_id = $1",
            WEBHOOKS_EVENTS_MAPPING_TABLE_NAME
        );
        sqlx::query(&clear)
            .bind(id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                DomainError::storage(format!("Failed to clear webhook events: {}", e))
            })?;

        associate_events(&mut tx, id, &event_ids).await?;

        let update = format!(
            r#"
            UPDATE {}
            SET name = COALESCE($2, name),
                url = COALESCE($3, url),
                format_type = COALESCE($4, format_type),
                global = COALESCE($5, global),
                updated_at = NOW()
            WHERE id = $1
            "#,
            WEBHOOKS_TABLE_NAME
        );
        sqlx::query(&update)
            .bind(id.as_uuid())
            .bind(input.name.as_deref())
            .bind(input.url.as_deref())
            .bind(input.format_type.as_deref())
            .bind(input.global)
            .execute(&mut *tx)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to update webhook: {}", e)))?;

        tx.commit()
            .await
            .map_err(|e| DomainError::storage(format!("Failed to commit webhook update: {}", e)))?;

        info!(
            webhook_id = %id,
            context_id = ?ctx.context_id(),
            events = event_ids.len(),
            "Updated webhook"
        );

        self.get(ctx, id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("Webhook '{}' not found", id)))
    }

    async fn delete(&self, ctx: &RequestContext, id: &WebhookId) -> Result<u64, DomainError> {
        let query = format!(
            "DELETE FROM {} WHERE id = $1 AND ($2::VARCHAR IS NULL OR context_id = $2)",
            WEBHOOKS_TABLE_NAME
        );

        let result = sqlx::query(&query)
            .bind(id.as_uuid())
            .bind(ctx.context_id().map(ContextId::as_str))
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to delete webhook: {}", e)))?;

        let removed = result.rows_affected();
        info!(
            webhook_id = %id,
            context_id = ?ctx.context_id(),
            removed,
            "Deleted webhook"
        );

        Ok(removed)
    }

    async fn list_event_types(&self, _ctx: &RequestContext) -> Result<Vec<EventType>, DomainError> {
        let query = format!(
            "SELECT id, name FROM {} ORDER BY name",
            WEBHOOKS_EVENTS_TABLE_NAME
        );

        let rows = sqlx::query(&query)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to list event types: {}", e)))?;

        rows.iter().map(row_to_event_type).collect()
    }
}

/// Builds the webhook read query with event names aggregated per row
fn select_webhooks_sql(filter: &str, order: &str) -> String {
    format!(
        r#"
        SELECT w.id, w.name, w.url, w.format_type, w.global,
               w.created_at, w.updated_at, w.context_id,
               COALESCE(
                   ARRAY_AGG(e.name ORDER BY e.name) FILTER (WHERE e.name IS NOT NULL),
                   ARRAY[]::TEXT[]
               ) AS events
        FROM {webhooks} w
        LEFT JOIN {mapping} m ON m.webhook_id = w.id
        LEFT JOIN {events} e ON e.id = m.webhook_event_id
        {filter}
        GROUP BY w.id
        {order}
        "#,
        webhooks = WEBHOOKS_TABLE_NAME,
        mapping = WEBHOOKS_EVENTS_MAPPING_TABLE_NAME,
        events = WEBHOOKS_EVENTS_TABLE_NAME,
        filter = filter,
        order = order,
    )
}

/// Looks up catalog ids for the given names; names without a match are dropped
async fn resolve_event_ids<'e, E>(executor: E, names: &[String]) -> Result<Vec<Uuid>, DomainError>
where
    E: sqlx::PgExecutor<'e>,
{
    if names.is_empty() {
        return Ok(Vec::new());
    }

    let query = format!(
        "SELECT id, name FROM {} WHERE name = ANY($1)",
        WEBHOOKS_EVENTS_TABLE_NAME
    );

    let rows = sqlx::query(&query)
        .bind(names)
        .fetch_all(executor)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to resolve event types: {}", e)))?;

    let found: Vec<EventType> = rows
        .iter()
        .map(row_to_event_type)
        .collect::<Result<_, _>>()?;

    let unknown: Vec<&String> = names
        .iter()
        .filter(|name| !found.iter().any(|e| &e.name == *name))
        .collect();

    if !unknown.is_empty() {
        debug!(unknown = ?unknown, "Ignoring unknown event type names");
    }

    Ok(found.into_iter().map(|e| *e.id.as_uuid()).collect())
}

async fn associate_events(
    tx: &mut Transaction<'static, Postgres>,
    id: &WebhookId,
    event_ids: &[Uuid],
) -> Result<(), DomainError> {
    let query = format!(
        r#"
        INSERT INTO {} (webhook_id, webhook_event_id)
        SELECT $1, UNNEST($2::UUID[])
        "#,
        WEBHOOKS_EVENTS_MAPPING_TABLE_NAME
    );

    sqlx::query(&query)
        .bind(id.as_uuid())
        .bind(event_ids)
        .execute(&mut **tx)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to set webhook events: {}", e)))?;

    Ok(())
}

fn row_to_webhook(row: &PgRow) -> Result<Webhook, DomainError> {
    let id: Uuid = column(row, "id")?;
    let context_id: Option<String> = column(row, "context_id")?;

    Ok(Webhook {
        id: WebhookId::new(id),
        name: column(row, "name")?,
        url: column(row, "url")?,
        format_type: column(row, "format_type")?,
        global: column(row, "global")?,
        created_at: column(row, "created_at")?,
        updated_at: column(row, "updated_at")?,
        context_id: context_id.map(ContextId::new),
        events: column(row, "events")?,
    })
}

fn row_to_event_type(row: &PgRow) -> Result<EventType, DomainError> {
    let id: Uuid = column(row, "id")?;

    Ok(EventType {
        id: EventTypeId::new(id),
        name: column(row, "name")?,
    })
}

fn column<'r, T>(row: &'r PgRow, name: &str) -> Result<T, DomainError>
where
    T: sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
{
    row.try_get(name)
        .map_err(|e| DomainError::storage(format!("Failed to decode column '{}': {}", name, e)))
}
