//! Dispatch router for one domain.
//!
//! The router maps patterns to handlers. Patterns are normalized at
//! registration time:
//!
//! | Registration            | Pattern                      |
//! |-------------------------|------------------------------|
//! | `command`               | `cmd:<domain>`               |
//! | `subcommand("a b")`     | `cmd:<domain>:a:b`           |
//! | `component("show")`     | `component:show`             |
//! | `modal("name")`         | `modal:name`                 |
//!
//! Any pattern may end in a `*` segment. Resolution tries the exact
//! candidate first, then drops trailing segments one at a time and appends
//! `*`, so the most specific wildcard wins.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use super::{BoxFuture, FnHandler, Handler, HandlerOutcome, InteractionContext};
use crate::error::DispatchError;
use crate::interaction::InteractionKind;

/// Wildcard segment.
pub const WILDCARD: &str = "*";

const PATTERN_SEPARATOR: &str = ":";

/// A typed dispatch-table key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Pattern {
    /// `cmd:<domain>[:<path>...]`
    Command { domain: String, path: Vec<String> },
    /// `component:<action>`
    Component { action: String },
    /// `modal:<action>`
    Modal { action: String },
}

impl Pattern {
    /// Pattern segments, starting with the event-shape tag.
    pub fn segments(&self) -> Vec<&str> {
        match self {
            Pattern::Command { domain, path } => std::iter::once("cmd")
                .chain(std::iter::once(domain.as_str()))
                .chain(path.iter().map(String::as_str))
                .collect(),
            Pattern::Component { action } => vec!["component", action.as_str()],
            Pattern::Modal { action } => vec!["modal", action.as_str()],
        }
    }

    /// Whether the last segment is the wildcard.
    pub fn is_wildcard(&self) -> bool {
        self.segments().last() == Some(&WILDCARD)
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments().join(PATTERN_SEPARATOR))
    }
}

/// Resolves and runs the handler registered for an event in one domain.
pub struct Router {
    domain: String,
    routes: HashMap<String, Arc<dyn Handler>>,
}

impl Router {
    /// Create a router for `domain`.
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            routes: HashMap::new(),
        }
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Register a handler under a pattern. Re-registering replaces.
    pub fn route(mut self, pattern: Pattern, handler: Arc<dyn Handler>) -> Self {
        let key = pattern.to_string();
        if self.routes.insert(key.clone(), handler).is_some() {
            tracing::warn!(domain = %self.domain, pattern = %key, "Replacing registered handler");
        }
        self
    }

    /// Register the bare command `cmd:<domain>`.
    pub fn command<F, Fut>(self, handler: F) -> Self
    where
        F: Fn(InteractionContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerOutcome> + Send + 'static,
    {
        let pattern = Pattern::Command {
            domain: self.domain.clone(),
            path: Vec::new(),
        };
        let name = pattern.to_string();
        self.route(pattern, Arc::new(FnHandler::new(name, handler)))
    }

    /// Register a subcommand path (space separated, may end in `*`).
    pub fn subcommand<F, Fut>(self, path: &str, handler: F) -> Self
    where
        F: Fn(InteractionContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerOutcome> + Send + 'static,
    {
        let pattern = Pattern::Command {
            domain: self.domain.clone(),
            path: path.split_whitespace().map(str::to_string).collect(),
        };
        let name = pattern.to_string();
        self.route(pattern, Arc::new(FnHandler::new(name, handler)))
    }

    /// Register a component action (or `*`).
    pub fn component<F, Fut>(self, action: &str, handler: F) -> Self
    where
        F: Fn(InteractionContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerOutcome> + Send + 'static,
    {
        let pattern = Pattern::Component {
            action: action.to_string(),
        };
        let name = pattern.to_string();
        self.route(pattern, Arc::new(FnHandler::new(name, handler)))
    }

    /// Register a form submission action (or `*`).
    pub fn modal<F, Fut>(self, action: &str, handler: F) -> Self
    where
        F: Fn(InteractionContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerOutcome> + Send + 'static,
    {
        let pattern = Pattern::Modal {
            action: action.to_string(),
        };
        let name = pattern.to_string();
        self.route(pattern, Arc::new(FnHandler::new(name, handler)))
    }

    /// Registered pattern strings, sorted.
    pub fn patterns(&self) -> Vec<String> {
        let mut patterns: Vec<String> = self.routes.keys().cloned().collect();
        patterns.sort();
        patterns
    }

    /// Build the exact candidate pattern for an event, if it belongs to this
    /// router's domain.
    pub fn candidate(&self, ctx: &InteractionContext) -> Option<Pattern> {
        match &ctx.interaction().kind {
            InteractionKind::Command(cmd) => {
                let rest = if cmd.name == self.domain {
                    &cmd.path[..]
                } else if cmd.path.first() == Some(&self.domain) {
                    &cmd.path[1..]
                } else {
                    return None;
                };
                Some(Pattern::Command {
                    domain: self.domain.clone(),
                    path: rest.to_vec(),
                })
            }
            InteractionKind::Component { .. } => {
                let key = ctx.routing_key().filter(|k| k.domain == self.domain)?;
                Some(Pattern::Component {
                    action: key.action.clone(),
                })
            }
            InteractionKind::Modal { .. } => {
                let key = ctx.routing_key().filter(|k| k.domain == self.domain)?;
                Some(Pattern::Modal {
                    action: key.action.clone(),
                })
            }
        }
    }

    /// Resolve the registered pattern for an event: exact first, then the
    /// longest matching wildcard.
    pub fn resolve(&self, ctx: &InteractionContext) -> Option<(String, Arc<dyn Handler>)> {
        let candidate = self.candidate(ctx)?;
        let exact = candidate.to_string();
        if let Some(handler) = self.routes.get(&exact) {
            return Some((exact, handler.clone()));
        }

        let segments = candidate.segments();
        for len in (1..segments.len()).rev() {
            let mut wildcard = segments[..len].join(PATTERN_SEPARATOR);
            wildcard.push_str(PATTERN_SEPARATOR);
            wildcard.push_str(WILDCARD);
            if let Some(handler) = self.routes.get(&wildcard) {
                return Some((wildcard, handler.clone()));
            }
        }
        None
    }
}

impl Handler for Router {
    fn can_handle(&self, ctx: &InteractionContext) -> bool {
        self.resolve(ctx).is_some()
    }

    fn handle(&self, ctx: InteractionContext) -> BoxFuture<'static, HandlerOutcome> {
        match self.resolve(&ctx) {
            Some((pattern, handler)) => {
                tracing::debug!(domain = %self.domain, pattern = %pattern, "Resolved handler");
                handler.handle(ctx)
            }
            None => {
                let candidate = self
                    .candidate(&ctx)
                    .map(|p| p.to_string())
                    .unwrap_or_else(|| ctx.interaction().route_label());
                Box::pin(async move { Err(DispatchError::HandlerNotFound(candidate)) })
            }
        }
    }

    fn name(&self) -> &str {
        &self.domain
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("domain", &self.domain)
            .field("patterns", &self.patterns())
            .finish()
    }
}
