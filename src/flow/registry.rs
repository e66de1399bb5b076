//! Step handler registry.
//!
//! Maps each step type to the function that renders it for an entity and
//! the function that applies validated selections to the entity.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::{CreationStep, StepType};
use crate::error::{DispatchError, Result};

/// Render/apply functions for one step type.
pub trait StepHandler<E>: Send + Sync {
    /// Build the step (options, limits) for the entity's current state.
    fn render(&self, entity: &E) -> CreationStep;

    /// Apply already validated selections.
    fn apply(&self, entity: &mut E, selections: &[String]) -> Result<()>;
}

type RenderFn<E> = dyn Fn(&E) -> CreationStep + Send + Sync;
type ApplyFn<E> = dyn Fn(&mut E, &[String]) -> Result<()> + Send + Sync;

/// Closure-backed [`StepHandler`].
pub struct FnStepHandler<E> {
    render: Box<RenderFn<E>>,
    apply: Box<ApplyFn<E>>,
}

impl<E> FnStepHandler<E> {
    pub fn new<R, A>(render: R, apply: A) -> Self
    where
        R: Fn(&E) -> CreationStep + Send + Sync + 'static,
        A: Fn(&mut E, &[String]) -> Result<()> + Send + Sync + 'static,
    {
        Self {
            render: Box::new(render),
            apply: Box::new(apply),
        }
    }
}

impl<E> StepHandler<E> for FnStepHandler<E> {
    fn render(&self, entity: &E) -> CreationStep {
        (self.render)(entity)
    }

    fn apply(&self, entity: &mut E, selections: &[String]) -> Result<()> {
        (self.apply)(entity, selections)
    }
}

/// Step type to handler table.
pub struct StepHandlerRegistry<E> {
    handlers: HashMap<StepType, Arc<dyn StepHandler<E>>>,
}

impl<E: 'static> StepHandlerRegistry<E> {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register a handler. Re-registering replaces.
    pub fn register(mut self, step_type: impl Into<StepType>, handler: impl StepHandler<E> + 'static) -> Self {
        self.handlers.insert(step_type.into(), Arc::new(handler));
        self
    }

    /// Register closures as a handler.
    pub fn register_fn<R, A>(self, step_type: impl Into<StepType>, render: R, apply: A) -> Self
    where
        R: Fn(&E) -> CreationStep + Send + Sync + 'static,
        A: Fn(&mut E, &[String]) -> Result<()> + Send + Sync + 'static,
    {
        self.register(step_type, FnStepHandler::new(render, apply))
    }

    pub fn get(&self, step_type: &StepType) -> Option<&Arc<dyn StepHandler<E>>> {
        self.handlers.get(step_type)
    }

    pub fn contains(&self, step_type: &StepType) -> bool {
        self.handlers.contains_key(step_type)
    }

    /// Fail unless every declared step type has a handler.
    pub fn validate_coverage(&self, declared: &[StepType]) -> Result<()> {
        let missing: Vec<&str> = declared
            .iter()
            .filter(|t| !t.is_complete() && !self.contains(t))
            .map(StepType::as_str)
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(DispatchError::internal(format!(
                "no step handler registered for: {}",
                missing.join(", ")
            )))
        }
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl<E: 'static> Default for StepHandlerRegistry<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for StepHandlerRegistry<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut types: Vec<&str> = self.handlers.keys().map(StepType::as_str).collect();
        types.sort_unstable();
        f.debug_struct("StepHandlerRegistry").field("step_types", &types).finish()
    }
}
