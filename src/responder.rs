//! Responder - the acknowledge/respond/edit lifecycle of one interaction.
//!
//! [`InteractionResponder`] is implemented by the hosting platform adapter.
//! [`Responder`] wraps it and enforces acknowledgment discipline:
//! - at most one initial acknowledgment (defer or respond)
//! - a second `respond` becomes an `edit`
//! - `edit` before any acknowledgment is an error
//!
//! [`RecordingResponder`] is an in-memory platform adapter that records every
//! call, for tests and dry runs.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::{DispatchError, Result};
use crate::interaction::Response;

/// Reference to a follow-up message.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MessageRef(pub String);

impl fmt::Display for MessageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Raw platform operations for answering an interaction.
#[async_trait]
pub trait InteractionResponder: Send + Sync {
    /// Send a deferred acknowledgment ("thinking...").
    async fn acknowledge(&self, ephemeral: bool) -> Result<()>;

    /// Send the initial response.
    async fn respond(&self, response: &Response) -> Result<()>;

    /// Edit the initial response (or the deferred acknowledgment).
    async fn edit(&self, response: &Response) -> Result<()>;

    /// Post an additional message.
    async fn follow_up(&self, response: &Response) -> Result<MessageRef>;

    async fn delete_follow_up(&self, message: &MessageRef) -> Result<()>;

    async fn delete_original(&self) -> Result<()>;
}

/// Tracks acknowledgment state on top of a platform responder.
///
/// `Responder` is `Clone`; clones share state, so middleware and the
/// pipeline observe the same acknowledgment.
#[derive(Clone)]
pub struct Responder {
    inner: Arc<dyn InteractionResponder>,
    state: Arc<ResponderState>,
}

#[derive(Default)]
struct ResponderState {
    responded: AtomicBool,
    deferred: AtomicBool,
    /// Serializes the check-then-send of the initial acknowledgment.
    gate: tokio::sync::Mutex<()>,
}

impl Responder {
    pub fn new(inner: Arc<dyn InteractionResponder>) -> Self {
        Self {
            inner,
            state: Arc::new(ResponderState::default()),
        }
    }

    /// Whether an initial acknowledgment (deferred or not) has been sent.
    #[inline]
    pub fn has_responded(&self) -> bool {
        self.state.responded.load(Ordering::Acquire)
    }

    /// Whether the initial acknowledgment was a deferral.
    #[inline]
    pub fn is_deferred(&self) -> bool {
        self.state.deferred.load(Ordering::Acquire)
    }

    /// Send a deferred acknowledgment.
    ///
    /// Fails if anything was already sent.
    pub async fn acknowledge(&self, ephemeral: bool) -> Result<()> {
        let _gate = self.state.gate.lock().await;
        if self.has_responded() {
            return Err(DispatchError::Responder(
                "interaction already acknowledged".to_string(),
            ));
        }
        self.inner.acknowledge(ephemeral).await?;
        self.state.deferred.store(true, Ordering::Release);
        self.state.responded.store(true, Ordering::Release);
        Ok(())
    }

    /// Send a response; becomes an edit once something was already sent.
    pub async fn respond(&self, response: &Response) -> Result<()> {
        let _gate = self.state.gate.lock().await;
        if self.has_responded() {
            return self.inner.edit(response).await;
        }
        self.inner.respond(response).await?;
        self.state.responded.store(true, Ordering::Release);
        Ok(())
    }

    /// Edit the initial response.
    ///
    /// Editing before responding is a programming error.
    pub async fn edit(&self, response: &Response) -> Result<()> {
        if !self.has_responded() {
            return Err(DispatchError::Responder(
                "edit called before the interaction was acknowledged".to_string(),
            ));
        }
        self.inner.edit(response).await
    }

    /// Alias of [`Responder::respond`], reads better at call sites that do
    /// not care whether this is the first message.
    pub async fn send(&self, response: &Response) -> Result<()> {
        self.respond(response).await
    }

    /// Post a follow-up message. Requires a prior acknowledgment.
    pub async fn follow_up(&self, response: &Response) -> Result<MessageRef> {
        if !self.has_responded() {
            return Err(DispatchError::Responder(
                "follow-up sent before the interaction was acknowledged".to_string(),
            ));
        }
        self.inner.follow_up(response).await
    }

    pub async fn delete_follow_up(&self, message: &MessageRef) -> Result<()> {
        self.inner.delete_follow_up(message).await
    }

    pub async fn delete_original(&self) -> Result<()> {
        if !self.has_responded() {
            return Err(DispatchError::Responder(
                "nothing to delete before the interaction was acknowledged".to_string(),
            ));
        }
        self.inner.delete_original().await
    }
}

impl fmt::Debug for Responder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Responder")
            .field("responded", &self.has_responded())
            .field("deferred", &self.is_deferred())
            .finish()
    }
}

/// A platform call captured by [`RecordingResponder`].
#[derive(Debug, Clone, PartialEq)]
pub enum ResponderCall {
    Acknowledge { ephemeral: bool },
    Respond(Response),
    Edit(Response),
    FollowUp(Response),
    DeleteFollowUp(MessageRef),
    DeleteOriginal,
}

/// Platform adapter that records calls instead of talking to a platform.
#[derive(Debug, Default)]
pub struct RecordingResponder {
    calls: Mutex<Vec<ResponderCall>>,
    next_ref: AtomicU64,
}

impl RecordingResponder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Snapshot of recorded calls, in order.
    pub fn calls(&self) -> Vec<ResponderCall> {
        self.calls.lock().clone()
    }

    /// The response text of the last respond/edit, if any.
    pub fn last_text(&self) -> Option<String> {
        self.calls.lock().iter().rev().find_map(|call| match call {
            ResponderCall::Respond(r) | ResponderCall::Edit(r) => Some(r.text.clone()),
            _ => None,
        })
    }

    fn record(&self, call: ResponderCall) {
        self.calls.lock().push(call);
    }
}

#[async_trait]
impl InteractionResponder for RecordingResponder {
    async fn acknowledge(&self, ephemeral: bool) -> Result<()> {
        self.record(ResponderCall::Acknowledge { ephemeral });
        Ok(())
    }

    async fn respond(&self, response: &Response) -> Result<()> {
        self.record(ResponderCall::Respond(response.clone()));
        Ok(())
    }

    async fn edit(&self, response: &Response) -> Result<()> {
        self.record(ResponderCall::Edit(response.clone()));
        Ok(())
    }

    async fn follow_up(&self, response: &Response) -> Result<MessageRef> {
        self.record(ResponderCall::FollowUp(response.clone()));
        let id = self.next_ref.fetch_add(1, Ordering::Relaxed) + 1;
        Ok(MessageRef(format!("followup-{id}")))
    }

    async fn delete_follow_up(&self, message: &MessageRef) -> Result<()> {
        self.record(ResponderCall::DeleteFollowUp(message.clone()));
        Ok(())
    }

    async fn delete_original(&self) -> Result<()> {
        self.record(ResponderCall::DeleteOriginal);
        Ok(())
    }
}
