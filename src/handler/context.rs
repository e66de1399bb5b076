//! Per-event context passed to handlers.
//!
//! Carries:
//! - the inbound [`Interaction`]
//! - the routing key decoded from its custom id (component/form events)
//! - the [`Responder`] for acknowledge/respond/edit
//! - a [`CancellationToken`] tied to the event's lifetime
//!
//! # Thread Safety
//!
//! `InteractionContext` is `Clone` and cheap to clone; clones share the
//! responder state and the cancellation token.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::codec::RoutingKey;
use crate::interaction::Interaction;
use crate::middleware::RateDecision;
use crate::responder::{RecordingResponder, Responder};

/// Context passed to interaction handlers.
#[derive(Clone, Debug)]
pub struct InteractionContext {
    interaction: Arc<Interaction>,
    routing_key: Option<Arc<RoutingKey>>,
    responder: Responder,
    cancel: CancellationToken,
    received_at: Instant,
    /// Rate decisions already taken for this event, keyed by limiter.
    rate_decisions: Arc<Mutex<HashMap<usize, RateDecision>>>,
}

impl InteractionContext {
    /// Build the context for one event, decoding its routing key once.
    pub fn new(interaction: Interaction, responder: Responder, cancel: CancellationToken) -> Self {
        let routing_key = interaction.custom_id().and_then(|id| match RoutingKey::decode(id) {
            Ok(key) => Some(Arc::new(key)),
            Err(e) => {
                tracing::debug!(custom_id = %id, error = %e, "Undecodable routing key");
                None
            }
        });

        Self {
            interaction: Arc::new(interaction),
            routing_key,
            responder,
            cancel,
            received_at: Instant::now(),
            rate_decisions: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Create a context backed by a [`RecordingResponder`] (for testing).
    pub fn detached(interaction: Interaction) -> Self {
        Self::new(
            interaction,
            Responder::new(RecordingResponder::new()),
            CancellationToken::new(),
        )
    }

    #[inline]
    pub fn interaction(&self) -> &Interaction {
        &self.interaction
    }

    /// Requesting user.
    #[inline]
    pub fn user_id(&self) -> &str {
        &self.interaction.user_id
    }

    /// Decoded routing key, for component and form events with a valid id.
    #[inline]
    pub fn routing_key(&self) -> Option<&RoutingKey> {
        self.routing_key.as_deref()
    }

    #[inline]
    pub fn responder(&self) -> &Responder {
        &self.responder
    }

    #[inline]
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// When the event entered the pipeline.
    #[inline]
    pub fn received_at(&self) -> Instant {
        self.received_at
    }

    /// The decision `limiter` already took for this event, or the result of
    /// `check`, recorded for every later handler the event reaches.
    pub(crate) fn rate_decision(&self, limiter: usize, check: impl FnOnce() -> RateDecision) -> RateDecision {
        *self.rate_decisions.lock().entry(limiter).or_insert_with(check)
    }
}
