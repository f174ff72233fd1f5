use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use super::{Action, ActionContext, ActionError, ActionResult};

/// Object-safe view of an [`Action`], as stored in the registry.
#[async_trait]
pub trait ActionHandler: Send + Sync {
    fn name(&self) -> &'static str;

    fn timeout(&self) -> Option<Duration>;

    /// Decode and check `params` without executing anything.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::InvalidParams`] when decoding or validation fails.
    fn validate_params(&self, params: &Value) -> Result<(), ActionError>;

    /// Decode the context's params and execute.
    async fn invoke(&self, ctx: ActionContext) -> Result<ActionResult, ActionError>;
}

struct Typed<A>(A);

fn decode<A: Action>(params: &Value) -> Result<A::Params, ActionError> {
    let invalid = |reason: String| ActionError::InvalidParams {
        action: A::NAME.to_string(),
        reason,
    };
    // Rules may omit params entirely.
    let value = if params.is_null() {
        Value::Object(serde_json::Map::new())
    } else {
        params.clone()
    };
    let decoded: A::Params =
        serde_json::from_value(value).map_err(|err| invalid(err.to_string()))?;
    A::validate(&decoded).map_err(invalid)?;
    Ok(decoded)
}

#[async_trait]
impl<A: Action> ActionHandler for Typed<A> {
    fn name(&self) -> &'static str {
        A::NAME
    }

    fn timeout(&self) -> Option<Duration> {
        self.0.timeout()
    }

    fn validate_params(&self, params: &Value) -> Result<(), ActionError> {
        decode::<A>(params).map(drop)
    }

    async fn invoke(&self, ctx: ActionContext) -> Result<ActionResult, ActionError> {
        let params = decode::<A>(&ctx.params)?;
        self.0.execute(&ctx, params).await
    }
}

/// Action handlers keyed by name.
#[derive(Default, Clone)]
pub struct ActionRegistry {
    handlers: BTreeMap<&'static str, Arc<dyn ActionHandler>>,
}

impl std::fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionRegistry")
            .field("actions", &self.names())
            .finish()
    }
}

impl ActionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `action` under [`Action::NAME`], replacing any previous handler.
    pub fn register<A: Action>(&mut self, action: A) -> &mut Self {
        if self
            .handlers
            .insert(A::NAME, Arc::new(Typed(action)))
            .is_some()
        {
            tracing::warn!(action = A::NAME, "replaced previously registered action");
        }
        self
    }

    /// Look up the handler for `name`.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::Unregistered`] for unknown names.
    pub fn handler(&self, name: &str) -> Result<Arc<dyn ActionHandler>, ActionError> {
        self.handlers
            .get(name)
            .cloned()
            .ok_or_else(|| ActionError::Unregistered(name.to_string()))
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Registered action names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.handlers.keys().copied().collect()
    }

    /// Check `params` against the typed contract of action `name`.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::Unregistered`] or [`ActionError::InvalidParams`].
    pub fn validate_params(&self, name: &str, params: &Value) -> Result<(), ActionError> {
        self.handler(name)?.validate_params(params)
    }

    /// Run action `name` for `ctx`.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::Unregistered`] for unknown names, otherwise
    /// whatever the handler returns.
    pub async fn invoke(&self, name: &str, ctx: ActionContext) -> Result<ActionResult, ActionError> {
        self.handler(name)?.invoke(ctx).await
    }
}
