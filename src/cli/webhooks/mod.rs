//! Webhook commands - CRUD over the webhook repository

use clap::{Args, Subcommand};
use serde_json::{json, Value};

use crate::domain::{
    DomainError, NewWebhook, RequestContext, WebhookId, WebhookRepository, WebhookUpdate,
};

#[derive(Subcommand, Clone, Debug)]
pub enum WebhookCommand {
    /// List webhooks, most recently updated first
    List {
        /// Only list global webhooks
        #[arg(long)]
        global: bool,
    },

    /// Show a webhook
    Get {
        /// Webhook ID
        id: String,
    },

    /// Create a webhook
    Create(CreateArgs),

    /// Update a webhook and replace its event subscriptions
    Update(UpdateArgs),

    /// Delete a webhook
    Delete {
        /// Webhook ID
        id: String,
    },

    /// List the event type catalog
    EventTypes,
}

/// Arguments for the create command
#[derive(Args, Clone, Debug)]
pub struct CreateArgs {
    #[arg(long)]
    pub name: String,

    #[arg(long)]
    pub url: String,

    #[arg(long)]
    pub format_type: String,

    /// Make the webhook visible regardless of context
    #[arg(long)]
    pub global: bool,

    /// Event type name to subscribe to (repeatable)
    #[arg(long = "event")]
    pub events: Vec<String>,
}

/// Arguments for the update command
#[derive(Args, Clone, Debug)]
pub struct UpdateArgs {
    /// Webhook ID
    pub id: String,

    #[arg(long)]
    pub name: Option<String>,

    #[arg(long)]
    pub url: Option<String>,

    #[arg(long)]
    pub format_type: Option<String>,

    #[arg(long)]
    pub global: Option<bool>,

    /// Event type name to subscribe to (repeatable); omitting it clears all subscriptions
    #[arg(long = "event")]
    pub events: Vec<String>,
}

impl From<CreateArgs> for NewWebhook {
    fn from(args: CreateArgs) -> Self {
        NewWebhook::new(args.name, args.url, args.format_type)
            .with_global(args.global)
            .with_events(args.events)
    }
}

impl From<UpdateArgs> for WebhookUpdate {
    fn from(args: UpdateArgs) -> Self {
        WebhookUpdate {
            name: args.name,
            url: args.url,
            format_type: args.format_type,
            global: args.global,
            events: args.events,
        }
    }
}

/// Runs a webhook command against the repository and returns its JSON output
pub async fn execute<R>(
    repo: &R,
    ctx: &RequestContext,
    command: WebhookCommand,
) -> Result<Value, DomainError>
where
    R: WebhookRepository + ?Sized,
{
    match command {
        WebhookCommand::List { global } => {
            let webhooks = if global {
                repo.list_global(ctx).await?
            } else {
                repo.list(ctx).await?
            };
            to_json(&webhooks)
        }
        WebhookCommand::Get { id } => {
            let id = WebhookId::parse(&id)?;

            match repo.get(ctx, &id).await? {
                Some(webhook) => to_json(&webhook),
                None => Err(DomainError::not_found(format!("Webhook '{}' not found", id))),
            }
        }
        WebhookCommand::Create(args) => {
            let webhook = repo.create(ctx, args.into()).await?;
            to_json(&webhook)
        }
        WebhookCommand::Update(args) => {
            let id = WebhookId::parse(&args.id)?;
            let webhook = repo.update(ctx, &id, args.into()).await?;
            to_json(&webhook)
        }
        WebhookCommand::Delete { id } => {
            let id = WebhookId::parse(&id)?;
            let removed = repo.delete(ctx, &id).await?;
            Ok(json!({ "id": id, "removed": removed }))
        }
        WebhookCommand::EventTypes => {
            let event_types = repo.list_event_types(ctx).await?;
            to_json(&event_types)
        }
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<Value, DomainError> {
    serde_json::to_value(value)
        .map_err(|e| DomainError::internal(format!("Failed to serialize output: {}", e)))
}
