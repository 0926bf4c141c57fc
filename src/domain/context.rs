//! Caller context passed explicitly into every store operation

use serde::{Deserialize, Serialize};

/// Tenant / request-scoped identifier that owns non-global webhooks
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContextId(String);

impl ContextId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ContextId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ContextId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ContextId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Context of the caller invoking a store operation.
///
/// Requests coming through a tenant-aware surface carry a [`ContextId`];
/// background jobs and admin tooling use [`RequestContext::background`],
/// which disables context scoping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    context_id: Option<ContextId>,
}

impl RequestContext {
    /// Context without a tenant identifier
    pub fn background() -> Self {
        Self { context_id: None }
    }

    /// Context scoped to the given tenant identifier.
    ///
    /// An empty identifier yields the background context.
    pub fn for_context(context_id: impl Into<ContextId>) -> Self {
        let context_id = context_id.into();

        if context_id.as_str().is_empty() {
            return Self::background();
        }

        Self {
            context_id: Some(context_id),
        }
    }

    /// Builds a context from an optional identifier; empty strings count as absent
    pub fn from_optional(context_id: Option<String>) -> Self {
        context_id.map_or_else(Self::background, Self::for_context)
    }

    pub fn context_id(&self) -> Option<&ContextId> {
        self.context_id.as_ref()
    }
}
