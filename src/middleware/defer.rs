//! Deferral - acknowledge before the platform deadline.
//!
//! Under [`DeferralPolicy::Race`] the handler runs concurrently with a
//! timer. If the handler finishes first its result is returned untouched
//! and the pipeline sends it as the initial response. If the timer fires
//! first a deferred acknowledgment is sent, the handler keeps running, and
//! its result later becomes an edit of that acknowledgment (the responder
//! turns the second `respond` into an `edit`).

use std::sync::Arc;
use std::time::Duration;

use super::Middleware;
use crate::codec::KeyMatcher;
use crate::config::{DeferralConfig, DeferralPolicy};
use crate::handler::{BoxFuture, Handler, HandlerOutcome, InteractionContext};

#[derive(Debug, Clone)]
pub struct Defer {
    policy: DeferralPolicy,
    threshold: Duration,
    ephemeral: bool,
    skip: Vec<KeyMatcher>,
}

impl Defer {
    pub fn new(policy: DeferralPolicy, threshold: Duration) -> Self {
        Self {
            policy,
            threshold,
            ephemeral: false,
            skip: Vec::new(),
        }
    }

    pub fn from_config(config: &DeferralConfig) -> Self {
        Self::new(config.policy, config.threshold()).ephemeral(config.ephemeral)
    }

    pub fn ephemeral(mut self, ephemeral: bool) -> Self {
        self.ephemeral = ephemeral;
        self
    }

    /// Never defer component/form events whose routing key matches.
    pub fn skip_when(mut self, matcher: KeyMatcher) -> Self {
        self.skip.push(matcher);
        self
    }

    fn skipped(&self, ctx: &InteractionContext) -> bool {
        ctx.routing_key()
            .map(|key| self.skip.iter().any(|m| m.matches(key)))
            .unwrap_or(false)
    }
}

impl Middleware for Defer {
    fn wrap(&self, next: Arc<dyn Handler>) -> Arc<dyn Handler> {
        Arc::new(DeferHandler {
            next,
            defer: self.clone(),
        })
    }

    fn name(&self) -> &'static str {
        "defer"
    }
}

struct DeferHandler {
    next: Arc<dyn Handler>,
    defer: Defer,
}

async fn acknowledge(ctx: &InteractionContext, ephemeral: bool) {
    if ctx.responder().has_responded() {
        return;
    }
    if let Err(e) = ctx.responder().acknowledge(ephemeral).await {
        tracing::warn!(user_id = %ctx.user_id(), error = %e, "Deferred acknowledgment failed");
    } else {
        tracing::debug!(user_id = %ctx.user_id(), "Deferred acknowledgment sent");
    }
}

impl Handler for DeferHandler {
    fn can_handle(&self, ctx: &InteractionContext) -> bool {
        self.next.can_handle(ctx)
    }

    fn handle(&self, ctx: InteractionContext) -> BoxFuture<'static, HandlerOutcome> {
        if self.defer.skipped(&ctx) {
            return self.next.handle(ctx);
        }

        let next = self.next.clone();
        let policy = self.defer.policy;
        let threshold = self.defer.threshold;
        let ephemeral = self.defer.ephemeral;

        match policy {
            DeferralPolicy::Never => next.handle(ctx),
            DeferralPolicy::Always => Box::pin(async move {
                acknowledge(&ctx, ephemeral).await;
                next.handle(ctx).await
            }),
            DeferralPolicy::Race => Box::pin(async move {
                let mut work = next.handle(ctx.clone());
                tokio::select! {
                    biased;
                    outcome = &mut work => return outcome,
                    _ = tokio::time::sleep(threshold) => {}
                }
                acknowledge(&ctx, ephemeral).await;
                work.await
            }),
        }
    }

    fn name(&self) -> &str {
        self.next.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::handler_fn;
    use crate::interaction::{HandlerResult, Interaction, Response};
    use crate::responder::{RecordingResponder, Responder, ResponderCall};
    use tokio_util::sync::CancellationToken;

    fn ctx_with(custom_id: &str) -> (Arc<RecordingResponder>, InteractionContext) {
        let recording = RecordingResponder::new();
        let ctx = InteractionContext::new(
            Interaction::component("u1", "g1", custom_id, vec![]),
            Responder::new(recording.clone()),
            CancellationToken::new(),
        );
        (recording, ctx)
    }

    fn sleeper(ms: u64) -> Arc<dyn Handler> {
        handler_fn("sleeper", move |_ctx| async move {
            tokio::time::sleep(Duration::from_millis(ms)).await;
            Ok(HandlerResult::respond(Response::text("done")))
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_race_fast_handler_no_deferral() {
        let (recording, ctx) = ctx_with("a:b");
        let handler = Defer::new(DeferralPolicy::Race, Duration::from_millis(500)).wrap(sleeper(100));

        let result = handler.handle(ctx).await.unwrap();
        assert_eq!(result.response.unwrap().text, "done");
        assert!(recording.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_race_slow_handler_defers_once() {
        let (recording, ctx) = ctx_with("a:b");
        let handler = Defer::new(DeferralPolicy::Race, Duration::from_millis(500)).wrap(sleeper(2_000));

        let result = handler.handle(ctx).await.unwrap();
        assert_eq!(result.response.unwrap().text, "done");
        assert_eq!(recording.calls(), vec![ResponderCall::Acknowledge { ephemeral: false }]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_always_and_never() {
        let (recording, ctx) = ctx_with("a:b");
        let handler = Defer::new(DeferralPolicy::Always, Duration::from_millis(500))
            .ephemeral(true)
            .wrap(sleeper(10));
        handler.handle(ctx).await.unwrap();
        assert_eq!(recording.calls(), vec![ResponderCall::Acknowledge { ephemeral: true }]);

        let (recording, ctx) = ctx_with("a:b");
        let handler = Defer::new(DeferralPolicy::Never, Duration::from_millis(500)).wrap(sleeper(5_000));
        handler.handle(ctx).await.unwrap();
        assert!(recording.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_skip_matcher() {
        let (recording, ctx) = ctx_with("create:preview:c1");
        let handler = Defer::new(DeferralPolicy::Always, Duration::from_millis(500))
            .skip_when(KeyMatcher::new("create", "preview"))
            .wrap(sleeper(10));
        handler.handle(ctx).await.unwrap();
        assert!(recording.calls().is_empty());
    }
}
