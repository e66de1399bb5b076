//! Flow module - the resumable creation wizard.
//!
//! There is no stored "current step". The controller scans a draft entity
//! against the ruleset's ordered [`StepSequence`] and the first step whose
//! completion predicate fails is the current one. The same snapshot always
//! yields the same step, which keeps retried submissions safe.
//!
//! - [`FlowController`] - derive, validate, apply and preview steps
//! - [`StepHandlerRegistry`] - render/apply functions per step type
//! - [`Ruleset`] / [`StepSequence`] - ordered `(step type, predicate)` pairs
//! - [`DraftEntity`] / [`EntityService`] - the entity being built and its store

mod controller;
mod entity;
mod registry;
mod ruleset;
mod step;

pub use controller::FlowController;
pub use entity::{ensure_owner, DraftEntity, EntityService};
pub use registry::{FnStepHandler, StepHandler, StepHandlerRegistry};
pub use ruleset::{Ruleset, StepDefinition, StepSequence};
pub use step::{CreationStep, StepOption, StepResult, StepType, COMPLETE_STEP};
