//! Error translation - the single place that decides user-visible error text.

use std::sync::Arc;

use super::Middleware;
use crate::error::{DispatchError, ErrorKind};
use crate::handler::{BoxFuture, Handler, HandlerOutcome, InteractionContext};
use crate::interaction::{HandlerResult, Response};

/// Build the ephemeral result shown to a user for `err`.
///
/// Internal detail never reaches the response text.
pub fn error_response(err: &DispatchError) -> HandlerResult {
    HandlerResult::respond(Response::ephemeral(err.user_message()))
        .with_side_channel("error_kind", serde_json::json!(format!("{:?}", err.kind())))
}

/// Converts handler errors into ephemeral responses; never returns `Err`.
#[derive(Debug, Clone, Default)]
pub struct Translate;

impl Translate {
    pub fn new() -> Self {
        Self
    }
}

impl Middleware for Translate {
    fn wrap(&self, next: Arc<dyn Handler>) -> Arc<dyn Handler> {
        Arc::new(TranslateHandler { next })
    }

    fn name(&self) -> &'static str {
        "translate"
    }
}

struct TranslateHandler {
    next: Arc<dyn Handler>,
}

impl Handler for TranslateHandler {
    fn can_handle(&self, ctx: &InteractionContext) -> bool {
        self.next.can_handle(ctx)
    }

    fn handle(&self, ctx: InteractionContext) -> BoxFuture<'static, HandlerOutcome> {
        let next = self.next.clone();
        Box::pin(async move {
            let user_id = ctx.user_id().to_string();
            match next.handle(ctx).await {
                Ok(result) => Ok(result),
                Err(err) => {
                    match err.kind() {
                        ErrorKind::Internal => {
                            tracing::error!(user_id = %user_id, handler = next.name(), error = %err, "Handler failed");
                        }
                        _ => {
                            tracing::debug!(user_id = %user_id, handler = next.name(), error = %err, "Handler rejected interaction");
                        }
                    }
                    Ok(error_response(&err))
                }
            }
        })
    }

    fn name(&self) -> &str {
        self.next.name()
    }
}
