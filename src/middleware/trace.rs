//! Structured logging around every dispatch.

use std::sync::Arc;

use tracing::Instrument;

use super::Middleware;
use crate::handler::{BoxFuture, Handler, HandlerOutcome, InteractionContext};

/// Opens an `interaction` span and logs outcome and duration.
/// Never alters the result.
#[derive(Debug, Clone, Default)]
pub struct Trace;

impl Trace {
    pub fn new() -> Self {
        Self
    }
}

impl Middleware for Trace {
    fn wrap(&self, next: Arc<dyn Handler>) -> Arc<dyn Handler> {
        Arc::new(TraceHandler { next })
    }

    fn name(&self) -> &'static str {
        "trace"
    }
}

struct TraceHandler {
    next: Arc<dyn Handler>,
}

impl Handler for TraceHandler {
    fn can_handle(&self, ctx: &InteractionContext) -> bool {
        self.next.can_handle(ctx)
    }

    fn handle(&self, ctx: InteractionContext) -> BoxFuture<'static, HandlerOutcome> {
        let route = match ctx.routing_key() {
            Some(key) => format!("{}:{}", key.domain, key.action),
            None => ctx.interaction().route_label(),
        };
        let span = tracing::info_span!(
            "interaction",
            interaction_id = %ctx.interaction().id,
            user_id = %ctx.user_id(),
            scope_id = %ctx.interaction().scope_id,
            route = %route,
            handler = %self.next.name(),
        );
        let next = self.next.clone();

        Box::pin(
            async move {
                let started = ctx.received_at();
                let outcome = next.handle(ctx).await;
                let duration_ms = started.elapsed().as_millis() as u64;
                match &outcome {
                    Ok(result) => tracing::info!(
                        duration_ms,
                        responded = result.response.is_some(),
                        stop_dispatch = result.stop_dispatch,
                        "Interaction handled"
                    ),
                    Err(err) => tracing::warn!(duration_ms, error = %err, "Interaction failed"),
                }
                outcome
            }
            .instrument(span),
        )
    }

    fn name(&self) -> &str {
        self.next.name()
    }
}
