//! Webhook domain module: webhooks and the event types they subscribe to

mod entity;
mod repository;

pub use entity::*;
pub use repository::*;
