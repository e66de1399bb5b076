//! Fixed-window rate limiting.
//!
//! Each identity owns a bucket `{window_start, count}`. Expiry is lazy: the
//! first increment after the window elapsed resets the bucket. A periodic
//! sweep only reclaims memory for buckets nobody touched since their window
//! ended.
//!
//! Times are `tokio::time::Instant` so the limiter follows a paused test
//! clock.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::Middleware;
use crate::codec::KeyMatcher;
use crate::handler::{BoxFuture, Handler, HandlerOutcome, InteractionContext};
use crate::interaction::{HandlerResult, Response};

/// Backing store for rate-limit counters.
pub trait CounterStore: Send + Sync + 'static {
    /// Increment the counter for `key` and return the post-increment count.
    /// A bucket whose window elapsed is reset before incrementing.
    fn increment(&self, key: &str, window: Duration, now: Instant) -> u64;

    /// Drop buckets whose window ended before `now`. Returns how many.
    fn sweep(&self, window: Duration, now: Instant) -> usize;

    /// Number of live buckets.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Copy)]
struct Bucket {
    window_start: Instant,
    count: u64,
}

/// In-process counter store guarded by a mutex.
#[derive(Debug, Default)]
pub struct InMemoryCounterStore {
    buckets: Mutex<HashMap<String, Bucket>>,
}

impl InMemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CounterStore for InMemoryCounterStore {
    fn increment(&self, key: &str, window: Duration, now: Instant) -> u64 {
        let mut buckets = self.buckets.lock();
        let bucket = buckets.entry(key.to_string()).or_insert(Bucket {
            window_start: now,
            count: 0,
        });
        if now.saturating_duration_since(bucket.window_start) >= window {
            bucket.window_start = now;
            bucket.count = 0;
        }
        bucket.count += 1;
        bucket.count
    }

    fn sweep(&self, window: Duration, now: Instant) -> usize {
        let mut buckets = self.buckets.lock();
        let before = buckets.len();
        buckets.retain(|_, b| now.saturating_duration_since(b.window_start) < window);
        before - buckets.len()
    }

    fn len(&self) -> usize {
        self.buckets.lock().len()
    }
}

/// Outcome of a rate-limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateDecision {
    pub allowed: bool,
    /// Post-increment count in the current window.
    pub count: u64,
    pub limit: u64,
}

/// Fixed-window limiter over a [`CounterStore`].
pub struct RateLimiter {
    store: Arc<dyn CounterStore>,
    max_requests: u64,
    window: Duration,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn CounterStore>, max_requests: u64, window: Duration) -> Self {
        Self {
            store,
            max_requests,
            window,
        }
    }

    /// Limiter over a fresh [`InMemoryCounterStore`].
    pub fn in_memory(max_requests: u64, window: Duration) -> Self {
        Self::new(Arc::new(InMemoryCounterStore::new()), max_requests, window)
    }

    /// Count a request from `identity` now.
    pub fn check(&self, identity: &str) -> RateDecision {
        self.check_at(identity, Instant::now())
    }

    /// Count a request from `identity` at `now`.
    pub fn check_at(&self, identity: &str, now: Instant) -> RateDecision {
        let count = self.store.increment(identity, self.window, now);
        RateDecision {
            allowed: count <= self.max_requests,
            count,
            limit: self.max_requests,
        }
    }

    /// Reclaim idle buckets.
    pub fn sweep(&self) -> usize {
        self.store.sweep(self.window, Instant::now())
    }

    pub fn store(&self) -> &Arc<dyn CounterStore> {
        &self.store
    }

    /// Sweep every `interval` until `cancel` fires.
    pub fn spawn_sweeper(self: Arc<Self>, interval: Duration, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        let removed = self.sweep();
                        if removed > 0 {
                            tracing::debug!(removed, remaining = self.store.len(), "Swept idle rate-limit buckets");
                        }
                    }
                }
            }
        })
    }
}

type IdentityFn = dyn Fn(&InteractionContext) -> String + Send + Sync;

/// Middleware that throttles identities exceeding the limiter's threshold.
#[derive(Clone)]
pub struct RateLimit {
    limiter: Arc<RateLimiter>,
    identity: Arc<IdentityFn>,
    message: String,
    skip: Vec<KeyMatcher>,
}

impl RateLimit {
    /// Throttle per requesting user.
    pub fn new(limiter: Arc<RateLimiter>, message: impl Into<String>) -> Self {
        Self {
            limiter,
            identity: Arc::new(|ctx: &InteractionContext| ctx.user_id().to_string()),
            message: message.into(),
            skip: Vec::new(),
        }
    }

    /// Use a custom identity, e.g. per scope instead of per user.
    pub fn identity<F>(mut self, extract: F) -> Self
    where
        F: Fn(&InteractionContext) -> String + Send + Sync + 'static,
    {
        self.identity = Arc::new(extract);
        self
    }

    /// Do not count component/form events whose routing key matches.
    pub fn skip_when(mut self, matcher: KeyMatcher) -> Self {
        self.skip.push(matcher);
        self
    }
}

impl Middleware for RateLimit {
    fn wrap(&self, next: Arc<dyn Handler>) -> Arc<dyn Handler> {
        Arc::new(RateLimitHandler {
            next,
            limit: self.clone(),
        })
    }

    fn name(&self) -> &'static str {
        "rate_limit"
    }
}

struct RateLimitHandler {
    next: Arc<dyn Handler>,
    limit: RateLimit,
}

impl Handler for RateLimitHandler {
    fn can_handle(&self, ctx: &InteractionContext) -> bool {
        self.next.can_handle(ctx)
    }

    fn handle(&self, ctx: InteractionContext) -> BoxFuture<'static, HandlerOutcome> {
        let skipped = ctx
            .routing_key()
            .map(|key| self.limit.skip.iter().any(|m| m.matches(key)))
            .unwrap_or(false);
        if skipped {
            return self.next.handle(ctx);
        }

        // Counted once per event, however many handlers claim it
        let identity = (self.limit.identity)(&ctx);
        let limiter = &self.limit.limiter;
        let decision = ctx.rate_decision(Arc::as_ptr(limiter) as usize, || limiter.check(&identity));
        if decision.allowed {
            return self.next.handle(ctx);
        }

        tracing::warn!(
            identity = %identity,
            count = decision.count,
            limit = decision.limit,
            "Rate limit exceeded"
        );
        let throttled = HandlerResult::respond(Response::ephemeral(self.limit.message.clone()))
            .with_side_channel("rate_limited", serde_json::json!(true))
            .stop();
        Box::pin(async move { Ok(throttled) })
    }

    fn name(&self) -> &str {
        self.next.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::handler_fn;
    use crate::interaction::{CommandInvocation, Interaction};

    #[test]
    fn test_n_plus_one_throttled_within_window() {
        let limiter = RateLimiter::in_memory(3, Duration::from_secs(10));
        let t0 = Instant::now();

        for i in 1..=3 {
            let d = limiter.check_at("u1", t0 + Duration::from_secs(i));
            assert!(d.allowed, "request {i} should pass");
        }
        let d = limiter.check_at("u1", t0 + Duration::from_secs(9));
        assert!(!d.allowed);
        assert_eq!(d.count, 4);
    }

    #[test]
    fn test_window_elapsed_resets_lazily() {
        let limiter = RateLimiter::in_memory(2, Duration::from_secs(10));
        let t0 = Instant::now();

        assert!(limiter.check_at("u1", t0).allowed);
        assert!(limiter.check_at("u1", t0).allowed);
        assert!(!limiter.check_at("u1", t0 + Duration::from_secs(5)).allowed);

        // Window measured from the first request in the bucket
        let d = limiter.check_at("u1", t0 + Duration::from_secs(10));
        assert!(d.allowed);
        assert_eq!(d.count, 1);
    }

    #[test]
    fn test_identities_are_independent() {
        let limiter = RateLimiter::in_memory(1, Duration::from_secs(10));
        let t0 = Instant::now();
        assert!(limiter.check_at("u1", t0).allowed);
        assert!(limiter.check_at("u2", t0).allowed);
        assert!(!limiter.check_at("u1", t0).allowed);
    }

    #[test]
    fn test_sweep_reclaims_idle_buckets_only() {
        let store = InMemoryCounterStore::new();
        let window = Duration::from_secs(10);
        let t0 = Instant::now();

        store.increment("idle", window, t0);
        store.increment("active", window, t0 + Duration::from_secs(8));
        assert_eq!(store.len(), 2);

        assert_eq!(store.sweep(window, t0 + Duration::from_secs(12)), 1);
        assert_eq!(store.len(), 1);
        assert_eq!(store.increment("active", window, t0 + Duration::from_secs(12)), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_task() {
        let limiter = Arc::new(RateLimiter::in_memory(5, Duration::from_secs(1)));
        limiter.check("u1");
        limiter.check("u2");

        let cancel = CancellationToken::new();
        let task = limiter.clone().spawn_sweeper(Duration::from_secs(5), cancel.clone());

        tokio::time::sleep(Duration::from_secs(6)).await;
        assert!(limiter.store().is_empty());

        cancel.cancel();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_middleware_throttles_and_skips_handler() {
        let limiter = Arc::new(RateLimiter::in_memory(1, Duration::from_secs(60)));
        let handler = RateLimit::new(limiter, "Slow down.").wrap(handler_fn("h", |_ctx| async {
            Ok(HandlerResult::respond(Response::text("ok")))
        }));
        let ctx = || {
            InteractionContext::detached(Interaction::command("u1", "g1", CommandInvocation::new("x")))
        };

        let first = handler.handle(ctx()).await.unwrap();
        assert_eq!(first.response.unwrap().text, "ok");

        let second = handler.handle(ctx()).await.unwrap();
        let response = second.response.unwrap();
        assert!(response.ephemeral);
        assert_eq!(response.text, "Slow down.");
        assert_eq!(second.side_channel["rate_limited"], serde_json::json!(true));
    }

    #[tokio::test]
    async fn test_middleware_skip_and_custom_identity() {
        let limiter = Arc::new(RateLimiter::in_memory(1, Duration::from_secs(60)));
        let handler = RateLimit::new(limiter.clone(), "Slow down.")
            .identity(|ctx| ctx.interaction().scope_id.clone())
            .skip_when(KeyMatcher::new("create", "preview"))
            .wrap(handler_fn("h", |_ctx| async {
                Ok(HandlerResult::respond(Response::text("ok")))
            }));

        for _ in 0..3 {
            let ctx = InteractionContext::detached(Interaction::component("u1", "g1", "create:preview:c1", vec![]));
            let result = handler.handle(ctx).await.unwrap();
            assert_eq!(result.response.unwrap().text, "ok");
        }
        assert_eq!(limiter.store().len(), 0);

        let ctx = InteractionContext::detached(Interaction::component("u9", "g1", "create:select:c1", vec![]));
        handler.handle(ctx).await.unwrap();
        assert_eq!(limiter.store().len(), 1);
    }
}
