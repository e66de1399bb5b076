//! Handler capability and closure adapters.
//!
//! A [`Handler`] answers two questions: can it handle an event, and what is
//! the result of handling it. Routers, middleware-wrapped handlers and plain
//! closures all implement the same trait, so the pipeline treats them alike.

use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;

use super::InteractionContext;
use crate::error::Result;
use crate::interaction::HandlerResult;

/// Result type for handler functions.
pub type HandlerOutcome = Result<HandlerResult>;

/// Boxed future for handler results.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Trait for interaction handlers.
pub trait Handler: Send + Sync + 'static {
    /// Whether this handler claims the event.
    fn can_handle(&self, ctx: &InteractionContext) -> bool;

    /// Handle the event.
    fn handle(&self, ctx: InteractionContext) -> BoxFuture<'static, HandlerOutcome>;

    /// Name used in logs.
    fn name(&self) -> &str {
        "handler"
    }
}

impl<H: Handler + ?Sized> Handler for Arc<H> {
    fn can_handle(&self, ctx: &InteractionContext) -> bool {
        (**self).can_handle(ctx)
    }

    fn handle(&self, ctx: InteractionContext) -> BoxFuture<'static, HandlerOutcome> {
        (**self).handle(ctx)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Wrapper that turns an async closure into a [`Handler`] claiming every event.
///
/// Used for the leaves a [`Router`](super::Router) dispatches to; the router
/// decides whether the event is claimed.
pub struct FnHandler<F, Fut>
where
    F: Fn(InteractionContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerOutcome> + Send + 'static,
{
    handler: F,
    name: String,
    _phantom: PhantomData<fn() -> Fut>,
}

impl<F, Fut> FnHandler<F, Fut>
where
    F: Fn(InteractionContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerOutcome> + Send + 'static,
{
    /// Create a new closure handler.
    pub fn new(name: impl Into<String>, handler: F) -> Self {
        Self {
            handler,
            name: name.into(),
            _phantom: PhantomData,
        }
    }
}

impl<F, Fut> Handler for FnHandler<F, Fut>
where
    F: Fn(InteractionContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerOutcome> + Send + 'static,
{
    fn can_handle(&self, _ctx: &InteractionContext) -> bool {
        true
    }

    fn handle(&self, ctx: InteractionContext) -> BoxFuture<'static, HandlerOutcome> {
        Box::pin((self.handler)(ctx))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Box a closure as a shared handler.
pub fn handler_fn<F, Fut>(name: impl Into<String>, handler: F) -> Arc<dyn Handler>
where
    F: Fn(InteractionContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerOutcome> + Send + 'static,
{
    Arc::new(FnHandler::new(name, handler))
}
