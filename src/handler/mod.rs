//! Handler module - handler capability, per-event context and routing.
//!
//! Provides:
//! - [`Handler`] - the `can_handle`/`handle` capability set
//! - [`InteractionContext`] - the event, its responder and cancellation
//! - [`Router`] - resolves one handler per event from exact/wildcard patterns
//!
//! # Example
//!
//! ```ignore
//! use interaction_dispatch::handler::Router;
//! use interaction_dispatch::interaction::{HandlerResult, Response};
//!
//! let router = Router::new("character")
//!     .subcommand("show", |ctx| async move {
//!         Ok(HandlerResult::respond(Response::text("Your character")))
//!     })
//!     .component("*", |ctx| async move {
//!         Ok(HandlerResult::respond(Response::ephemeral("fallback")))
//!     });
//! ```

mod context;
mod registry;
mod router;

pub use context::InteractionContext;
pub use registry::{handler_fn, BoxFuture, FnHandler, Handler, HandlerOutcome};
pub use router::{Pattern, Router, WILDCARD};
