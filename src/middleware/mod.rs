//! Middleware - cross-cutting behavior composed around handlers.
//!
//! Each [`Middleware`] wraps a handler and returns a new handler that
//! claims exactly the same events. Layers:
//!
//! - [`Recovery`] - converts panics into a generic response
//! - [`Trace`] - structured logging span and duration per dispatch
//! - [`RateLimit`] - fixed-window throttling per identity
//! - [`Authorize`] - rejects events failing a predicate
//! - [`Defer`] - deferred acknowledgment before the platform deadline
//! - [`Translate`] - converts handler errors into ephemeral responses
//!
//! # Ordering
//!
//! A [`MiddlewareStack`] wraps in push order, so the last pushed layer is
//! outermost. [`MiddlewareStack::standard`] pushes the layers innermost
//! first, yielding:
//!
//! ```text
//! Recovery(Trace(RateLimit(Authorize(Defer(Translate(handler))))))
//! ```

mod authorize;
mod defer;
mod rate_limit;
mod recovery;
mod trace;
mod translate;

use std::sync::Arc;

pub use authorize::Authorize;
pub use defer::Defer;
pub use rate_limit::{
    CounterStore, InMemoryCounterStore, RateDecision, RateLimit, RateLimiter,
};
pub use recovery::Recovery;
pub use trace::Trace;
pub use translate::{error_response, Translate};

use crate::config::DispatchConfig;
use crate::handler::Handler;

/// A layer that wraps a handler.
pub trait Middleware: Send + Sync + 'static {
    /// Wrap `next`, returning a handler that claims the same events.
    fn wrap(&self, next: Arc<dyn Handler>) -> Arc<dyn Handler>;

    /// Name used in logs.
    fn name(&self) -> &'static str;
}

/// Ordered middleware; the last pushed layer is outermost.
#[derive(Clone, Default)]
pub struct MiddlewareStack {
    layers: Vec<Arc<dyn Middleware>>,
}

impl MiddlewareStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// The standard chain in its mandated order. `authorize` is optional
    /// and sits between rate limiting and deferral when present.
    pub fn standard(
        config: &DispatchConfig,
        limiter: Option<Arc<RateLimiter>>,
        authorize: Option<Authorize>,
    ) -> Self {
        let mut stack = Self::new()
            .push(Translate::new())
            .push(Defer::from_config(&config.deferral));
        if let Some(authorize) = authorize {
            stack = stack.push(authorize);
        }
        if let Some(limiter) = limiter.filter(|_| config.rate_limit.enabled) {
            stack = stack.push(RateLimit::new(limiter, config.rate_limit.message.clone()));
        }
        stack.push(Trace::new()).push(Recovery::new())
    }

    /// Push a layer outside all current layers.
    pub fn push(mut self, middleware: impl Middleware) -> Self {
        self.layers.push(Arc::new(middleware));
        self
    }

    pub fn push_arc(&mut self, middleware: Arc<dyn Middleware>) {
        self.layers.push(middleware);
    }

    /// Wrap a handler with every layer.
    pub fn wrap(&self, handler: Arc<dyn Handler>) -> Arc<dyn Handler> {
        self.layers
            .iter()
            .fold(handler, |inner, layer| layer.wrap(inner))
    }

    /// Layers, innermost first.
    pub fn layers(&self) -> &[Arc<dyn Middleware>] {
        &self.layers
    }

    /// Layer names, outermost first.
    pub fn names(&self) -> Vec<&'static str> {
        self.layers.iter().rev().map(|l| l.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}
