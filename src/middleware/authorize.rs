//! Authorization - rejects events whose requester fails a predicate.
//!
//! Sits outside error translation, so a denial is answered directly with
//! the translated ephemeral response.

use std::sync::Arc;

use super::{error_response, Middleware};
use crate::error::DispatchError;
use crate::handler::{BoxFuture, Handler, HandlerOutcome, InteractionContext};

type Predicate = dyn Fn(&InteractionContext) -> bool + Send + Sync;

/// Denies events for which the predicate returns `false`.
#[derive(Clone)]
pub struct Authorize {
    predicate: Arc<Predicate>,
    message: String,
}

impl Authorize {
    pub fn new<F>(message: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&InteractionContext) -> bool + Send + Sync + 'static,
    {
        Self {
            predicate: Arc::new(predicate),
            message: message.into(),
        }
    }
}

impl Middleware for Authorize {
    fn wrap(&self, next: Arc<dyn Handler>) -> Arc<dyn Handler> {
        Arc::new(AuthorizeHandler {
            next,
            auth: self.clone(),
        })
    }

    fn name(&self) -> &'static str {
        "authorize"
    }
}

struct AuthorizeHandler {
    next: Arc<dyn Handler>,
    auth: Authorize,
}

impl Handler for AuthorizeHandler {
    fn can_handle(&self, ctx: &InteractionContext) -> bool {
        self.next.can_handle(ctx)
    }

    fn handle(&self, ctx: InteractionContext) -> BoxFuture<'static, HandlerOutcome> {
        if (self.auth.predicate)(&ctx) {
            return self.next.handle(ctx);
        }
        tracing::warn!(user_id = %ctx.user_id(), route = %ctx.interaction().route_label(), "Interaction denied");
        let denied = error_response(&DispatchError::unauthorized(self.auth.message.clone()));
        Box::pin(async move { Ok(denied.stop()) })
    }

    fn name(&self) -> &str {
        self.next.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::handler_fn;
    use crate::interaction::{CommandInvocation, HandlerResult, Interaction, Response};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_denied_skips_handler() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let handler = Authorize::new("Admins only.", |ctx| ctx.user_id() == "admin").wrap(handler_fn(
            "h",
            move |_ctx| {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Ok(HandlerResult::respond(Response::text("secret"))) }
            },
        ));

        let ctx = InteractionContext::detached(Interaction::command("u1", "g1", CommandInvocation::new("x")));
        let result = handler.handle(ctx).await.unwrap();
        let response = result.response.unwrap();
        assert!(response.ephemeral);
        assert_eq!(response.text, "Admins only.");
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let ctx = InteractionContext::detached(Interaction::command("admin", "g1", CommandInvocation::new("x")));
        let result = handler.handle(ctx).await.unwrap();
        assert_eq!(result.response.unwrap().text, "secret");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
