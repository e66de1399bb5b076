//! Panic recovery - the outermost layer.
//!
//! A panicking handler is logged with its original message and answered
//! with the generic internal-error response.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;

use super::{error_response, Middleware};
use crate::error::DispatchError;
use crate::handler::{BoxFuture, Handler, HandlerOutcome, InteractionContext};

#[derive(Debug, Clone, Default)]
pub struct Recovery;

impl Recovery {
    pub fn new() -> Self {
        Self
    }
}

impl Middleware for Recovery {
    fn wrap(&self, next: Arc<dyn Handler>) -> Arc<dyn Handler> {
        Arc::new(RecoveryHandler { next })
    }

    fn name(&self) -> &'static str {
        "recovery"
    }
}

struct RecoveryHandler {
    next: Arc<dyn Handler>,
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

impl Handler for RecoveryHandler {
    fn can_handle(&self, ctx: &InteractionContext) -> bool {
        self.next.can_handle(ctx)
    }

    fn handle(&self, ctx: InteractionContext) -> BoxFuture<'static, HandlerOutcome> {
        let next = self.next.clone();
        Box::pin(async move {
            let user_id = ctx.user_id().to_string();
            let route = ctx.interaction().route_label();
            // handle() runs inside the guarded future so panics raised
            // while building the handler future are caught too.
            let guarded = AssertUnwindSafe(async move { next.handle(ctx).await }).catch_unwind();
            match guarded.await {
                Ok(outcome) => outcome,
                Err(panic) => {
                    let panic_msg = panic_message(panic.as_ref());
                    tracing::error!(
                        user_id = %user_id,
                        route = %route,
                        panic_msg = %panic_msg,
                        "Handler panicked"
                    );
                    Ok(error_response(&DispatchError::internal(format!(
                        "handler panicked: {panic_msg}"
                    ))))
                }
            }
        })
    }

    fn name(&self) -> &str {
        self.next.name()
    }
}
