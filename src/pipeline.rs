//! Pipeline builder and per-event dispatch.
//!
//! The [`PipelineBuilder`] registers global middleware and handlers; the
//! built [`Pipeline`] owns the response lifecycle of each event:
//! 1. Build the [`InteractionContext`] (decoding the routing key once)
//! 2. Offer the event to handlers in registration order
//! 3. Convert handler errors through the error handler
//! 4. Send the resulting response through the [`Responder`]
//! 5. Send the "unrecognized" fallback if nothing claimed the event
//!
//! # Example
//!
//! ```ignore
//! use interaction_dispatch::{Pipeline, Router};
//! use interaction_dispatch::middleware::{Trace, Translate};
//!
//! let pipeline = Pipeline::builder()
//!     .middleware(Translate::new())
//!     .middleware(Trace::new())
//!     .router(Router::new("character").subcommand("show", show_character))
//!     .build();
//!
//! let report = pipeline.execute(interaction, platform_responder).await;
//! ```

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::{DispatchConfig, PipelineConfig};
use crate::error::{DispatchError, Result};
use crate::handler::{Handler, InteractionContext, Router};
use crate::interaction::{HandlerResult, Interaction, Response};
use crate::middleware::{error_response, Middleware, MiddlewareStack};
use crate::responder::{InteractionResponder, Responder};

/// Default maximum concurrently dispatched events for [`Pipeline::spawn`].
pub const DEFAULT_MAX_CONCURRENT_EVENTS: usize = 256;

type ErrorHandler = dyn Fn(&DispatchError) -> HandlerResult + Send + Sync;

/// What happened to one event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Names of the handlers that handled the event, in order.
    pub handled_by: Vec<String>,
    /// Whether anything was sent through the responder.
    pub responded: bool,
    /// Whether the unrecognized fallback was sent.
    pub fallback: bool,
    /// Whether the event was cancelled before completing.
    pub cancelled: bool,
    /// Responder failures, which are logged and otherwise swallowed.
    pub send_errors: Vec<String>,
}

/// Builder for configuring and creating a [`Pipeline`].
pub struct PipelineBuilder {
    handlers: Vec<Arc<dyn Handler>>,
    middleware: MiddlewareStack,
    config: PipelineConfig,
    error_handler: Arc<ErrorHandler>,
    max_concurrent_events: usize,
}

impl PipelineBuilder {
    /// Create a new pipeline builder.
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
            middleware: MiddlewareStack::new(),
            config: PipelineConfig::default(),
            error_handler: Arc::new(error_response),
            max_concurrent_events: DEFAULT_MAX_CONCURRENT_EVENTS,
        }
    }

    /// Start from loaded configuration.
    pub fn from_config(config: &DispatchConfig) -> Self {
        Self::new().config(config.pipeline.clone())
    }

    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Register a global middleware. It wraps handlers registered after
    /// this call, outside every middleware registered before it.
    pub fn middleware(mut self, middleware: impl Middleware) -> Self {
        self.middleware = self.middleware.push(middleware);
        self
    }

    /// Register every layer of a stack, in its order.
    pub fn middleware_stack(mut self, stack: &MiddlewareStack) -> Self {
        for layer in stack.layers() {
            self.middleware.push_arc(layer.clone());
        }
        self
    }

    /// Register a handler, wrapped with the currently registered middleware.
    pub fn register(mut self, handler: impl Handler) -> Self {
        let wrapped = self.middleware.wrap(Arc::new(handler));
        self.handlers.push(wrapped);
        self
    }

    /// Register a router.
    pub fn router(self, router: Router) -> Self {
        self.register(router)
    }

    /// Replace the error handler applied when a handler returns `Err`.
    pub fn error_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&DispatchError) -> HandlerResult + Send + Sync + 'static,
    {
        self.error_handler = Arc::new(handler);
        self
    }

    /// Keep offering events to later handlers after one handled them.
    pub fn continue_after_handled(mut self, enabled: bool) -> Self {
        self.config.continue_after_handled = enabled;
        self
    }

    /// Set the maximum number of concurrently spawned events.
    ///
    /// Default: 256
    pub fn max_concurrent_events(mut self, limit: usize) -> Self {
        self.max_concurrent_events = limit;
        self
    }

    pub fn build(self) -> Pipeline {
        Pipeline {
            handlers: self.handlers,
            config: self.config,
            error_handler: self.error_handler,
            permits: Arc::new(Semaphore::new(self.max_concurrent_events)),
            max_concurrent_events: self.max_concurrent_events,
        }
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Explicitly constructed dispatch pipeline, shared by whatever receives
/// inbound events.
pub struct Pipeline {
    handlers: Vec<Arc<dyn Handler>>,
    config: PipelineConfig,
    error_handler: Arc<ErrorHandler>,
    permits: Arc<Semaphore>,
    max_concurrent_events: usize,
}

impl Pipeline {
    /// Create a new pipeline builder.
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    /// Number of registered handlers.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Dispatch one event to completion.
    pub async fn execute(
        &self,
        interaction: Interaction,
        platform: Arc<dyn InteractionResponder>,
    ) -> DispatchReport {
        self.execute_with_cancel(interaction, platform, CancellationToken::new())
            .await
    }

    /// Dispatch one event; cancelling `cancel` aborts the in-flight handler
    /// and suppresses any further response.
    pub async fn execute_with_cancel(
        &self,
        interaction: Interaction,
        platform: Arc<dyn InteractionResponder>,
        cancel: CancellationToken,
    ) -> DispatchReport {
        let responder = Responder::new(platform);
        let ctx = InteractionContext::new(interaction, responder.clone(), cancel.clone());
        let mut report = DispatchReport::default();

        for handler in &self.handlers {
            if cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }
            if !handler.can_handle(&ctx) {
                continue;
            }

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::debug!(user_id = %ctx.user_id(), handler = handler.name(), "Interaction cancelled");
                    report.cancelled = true;
                    break;
                }
                outcome = handler.handle(ctx.clone()) => outcome,
            };

            let result = match outcome {
                Ok(result) => result,
                Err(err) => (self.error_handler)(&err),
            };
            report.handled_by.push(handler.name().to_string());

            match result.response {
                Some(response) => self.send(&ctx, response, &mut report).await,
                None if !result.already_acknowledged && !responder.has_responded() => {
                    tracing::warn!(handler = handler.name(), "Handler produced no response");
                }
                None => {}
            }

            if result.stop_dispatch || !self.config.continue_after_handled {
                break;
            }
        }

        if !report.cancelled && report.handled_by.is_empty() && !responder.has_responded() {
            tracing::debug!(route = %ctx.interaction().route_label(), "No handler claimed interaction");
            let fallback = Response::ephemeral(self.config.unrecognized_message.clone());
            self.send(&ctx, fallback, &mut report).await;
            report.fallback = true;
        }

        report.responded = responder.has_responded();
        report
    }

    async fn send(&self, ctx: &InteractionContext, mut response: Response, report: &mut DispatchReport) {
        if ctx.is_cancelled() {
            report.cancelled = true;
            return;
        }
        let responder = ctx.responder();
        // Commands cannot be answered in place on their first acknowledgment.
        if ctx.interaction().is_command() && !responder.has_responded() {
            response.update_in_place = false;
        }
        if let Err(e) = responder.respond(&response).await {
            tracing::error!(user_id = %ctx.user_id(), error = %e, "Failed to send response");
            report.send_errors.push(e.to_string());
        }
    }

    /// Dispatch an event on its own task, bounded by the concurrency limit.
    ///
    /// The permit is taken before spawning, so no tasks queue up behind the
    /// limit.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::AtCapacity`] without spawning when every
    /// permit is in use. The event is dropped.
    pub fn spawn(
        self: &Arc<Self>,
        interaction: Interaction,
        platform: Arc<dyn InteractionResponder>,
        cancel: CancellationToken,
    ) -> Result<JoinHandle<DispatchReport>> {
        let permit = match self.permits.clone().try_acquire_owned() {
            Ok(p) => p,
            Err(_) => {
                tracing::warn!(
                    route = %interaction.route_label(),
                    user_id = %interaction.user_id,
                    limit = self.max_concurrent_events,
                    "Dispatch capacity reached, dropping interaction"
                );
                return Err(DispatchError::AtCapacity(self.max_concurrent_events));
            }
        };

        let pipeline = self.clone();
        Ok(tokio::spawn(async move {
            // Permit is held until this task completes
            let _permit = permit;
            pipeline
                .execute_with_cancel(interaction, platform, cancel)
                .await
        }))
    }
}
