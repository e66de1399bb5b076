//! Ruleset contract: the ordered step sequence for one game system.
//!
//! The sequence is the single source of truth for declared step types. A
//! step that only applies to some entities (e.g. spells for casters) is
//! declared like any other and simply reports itself complete when it does
//! not apply.

use std::fmt;
use std::sync::Arc;

use super::StepType;

type Predicate<E> = dyn Fn(&E) -> bool + Send + Sync;

/// A step type with its completion predicate.
pub struct StepDefinition<E> {
    pub step_type: StepType,
    is_complete: Arc<Predicate<E>>,
}

impl<E> StepDefinition<E> {
    pub fn new<F>(step_type: impl Into<StepType>, is_complete: F) -> Self
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        Self {
            step_type: step_type.into(),
            is_complete: Arc::new(is_complete),
        }
    }

    pub fn is_complete(&self, entity: &E) -> bool {
        (self.is_complete)(entity)
    }
}

impl<E> Clone for StepDefinition<E> {
    fn clone(&self) -> Self {
        Self {
            step_type: self.step_type.clone(),
            is_complete: self.is_complete.clone(),
        }
    }
}

impl<E> fmt::Debug for StepDefinition<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepDefinition")
            .field("step_type", &self.step_type)
            .finish_non_exhaustive()
    }
}

/// Ordered step definitions.
pub struct StepSequence<E> {
    steps: Vec<StepDefinition<E>>,
}

impl<E> StepSequence<E> {
    pub fn new() -> Self {
        Self { steps: Vec::new() }
    }

    /// Append a step with its completion predicate.
    pub fn step<F>(mut self, step_type: impl Into<StepType>, is_complete: F) -> Self
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.steps.push(StepDefinition::new(step_type, is_complete));
        self
    }

    /// Declared step types, in order.
    pub fn step_types(&self) -> Vec<StepType> {
        self.steps.iter().map(|s| s.step_type.clone()).collect()
    }

    /// First step whose predicate fails for `entity`.
    pub fn first_incomplete(&self, entity: &E) -> Option<&StepDefinition<E>> {
        self.steps.iter().find(|s| !s.is_complete(entity))
    }

    pub fn iter(&self) -> impl Iterator<Item = &StepDefinition<E>> {
        self.steps.iter()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl<E> Default for StepSequence<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Clone for StepSequence<E> {
    fn clone(&self) -> Self {
        Self {
            steps: self.steps.clone(),
        }
    }
}

impl<E> fmt::Debug for StepSequence<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.steps.iter()).finish()
    }
}

/// A game system's creation rules (external collaborator).
pub trait Ruleset<E>: Send + Sync {
    fn name(&self) -> &str;

    /// The ordered step sequence.
    fn sequence(&self) -> StepSequence<E>;
}
