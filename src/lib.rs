//! # interaction-dispatch
//!
//! Dispatch of platform-delivered interaction events (commands, component
//! activations, form submissions) to domain handlers, plus a resumable
//! creation wizard whose position is derived from the draft entity.
//!
//! ## Architecture
//!
//! - **Codec**: routing keys embedded in component custom ids
//! - **Pipeline**: global middleware, handler order, response lifecycle
//! - **Router**: per-domain exact/wildcard pattern resolution
//! - **Flow**: derived-state wizard over an external entity store
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use interaction_dispatch::{DispatchConfig, MiddlewareStack, Pipeline, RateLimiter, Router};
//!
//! let config = DispatchConfig::load(None)?;
//! let limiter = Arc::new(RateLimiter::in_memory(
//!     config.rate_limit.max_requests,
//!     config.rate_limit.window(),
//! ));
//! let stack = MiddlewareStack::standard(&config, Some(limiter), None);
//!
//! let pipeline = Pipeline::builder()
//!     .middleware_stack(&stack)
//!     .router(Router::new("character").subcommand("show", show_character))
//!     .router(creation_flow.router())
//!     .build();
//!
//! let report = pipeline.execute(interaction, platform_responder).await;
//! ```

pub mod codec;
pub mod config;
pub mod creation;
pub mod error;
pub mod flow;
pub mod handler;
pub mod interaction;
pub mod logging;
pub mod middleware;
pub mod pipeline;
pub mod responder;

pub use codec::{KeyMatcher, RoutingKey};
pub use crate::config::DispatchConfig;
pub use creation::CreationFlow;
pub use error::{DispatchError, Result};
pub use flow::FlowController;
pub use handler::{Handler, InteractionContext, Router};
pub use interaction::{CommandInvocation, HandlerResult, Interaction, Response};
pub use middleware::{MiddlewareStack, RateLimiter};
pub use pipeline::{DispatchReport, Pipeline, PipelineBuilder};
pub use responder::{InteractionResponder, Responder};
