//! Flow controller for the creation wizard.
//!
//! There is no stored "current step". The step is derived from the draft on
//! every call: the first definition in the ruleset's sequence whose
//! completion predicate fails is current, and once every predicate passes
//! the terminal [`COMPLETE_STEP`](super::COMPLETE_STEP) is reached. Because
//! derivation is a pure function of the snapshot, replays of an
//! already-applied result are detected as stale and rejected.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use super::{CreationStep, DraftEntity, Ruleset, StepHandler, StepHandlerRegistry, StepResult, StepSequence, StepType};
use crate::error::{DispatchError, Result};

/// Derives, validates and applies wizard steps for one ruleset.
pub struct FlowController<E> {
    ruleset_name: String,
    sequence: StepSequence<E>,
    registry: StepHandlerRegistry<E>,
}

impl<E: DraftEntity> FlowController<E> {
    /// Build a controller, failing fast when a declared step type has no
    /// registered handler.
    pub fn new(ruleset: &dyn Ruleset<E>, registry: StepHandlerRegistry<E>) -> Result<Self> {
        let sequence = ruleset.sequence();
        registry.validate_coverage(&sequence.step_types())?;
        tracing::debug!(
            ruleset = %ruleset.name(),
            steps = sequence.len(),
            "Flow controller ready"
        );
        Ok(Self {
            ruleset_name: ruleset.name().to_string(),
            sequence,
            registry,
        })
    }

    pub fn ruleset_name(&self) -> &str {
        &self.ruleset_name
    }

    /// Declared step types in order.
    pub fn step_types(&self) -> Vec<StepType> {
        self.sequence.step_types()
    }

    pub fn step_handler(&self, step_type: &StepType) -> Option<&Arc<dyn StepHandler<E>>> {
        self.registry.get(step_type)
    }

    /// The step the draft is currently on. Side-effect free.
    pub fn current_step(&self, entity: &E) -> Result<CreationStep> {
        if entity.is_final() {
            return Ok(CreationStep::complete());
        }
        let Some(definition) = self.sequence.first_incomplete(entity) else {
            return Ok(CreationStep::complete());
        };
        let handler = self.registry.get(&definition.step_type).ok_or_else(|| {
            DispatchError::internal(format!("no step handler for {}", definition.step_type))
        })?;
        let mut step = handler.render(entity);
        step.step_type = definition.step_type.clone();
        Ok(step)
    }

    /// True once every predicate passes (or the draft was finalized).
    pub fn is_creation_complete(&self, entity: &E) -> bool {
        entity.is_final() || self.sequence.first_incomplete(entity).is_none()
    }

    /// Validate `result` against the current step, apply it and return the
    /// newly derived step.
    ///
    /// # Errors
    ///
    /// Returns a validation error for stale or invalid selections, or the
    /// step handler's own error. `entity` is left untouched on any error.
    pub fn process_step_result(&self, entity: &mut E, result: &StepResult) -> Result<CreationStep> {
        let step = self.accept(entity, result)?;
        let mut next = entity.clone();
        self.apply(&mut next, &step, result)?;
        *entity = next;
        tracing::debug!(
            entity_id = %entity.id(),
            step_type = %step.step_type,
            "Applied step result"
        );
        self.current_step(entity)
    }

    /// The entity as it would look with `result` applied. `entity` is not
    /// touched.
    pub fn preview_step_result(&self, entity: &E, result: &StepResult) -> Result<E> {
        let step = self.accept(entity, result)?;
        let mut projected = entity.clone();
        self.apply(&mut projected, &step, result)?;
        Ok(projected)
    }

    /// Re-renders the current step. There is no backward navigation.
    pub fn back(&self, entity: &E) -> Result<CreationStep> {
        self.current_step(entity)
    }

    fn accept(&self, entity: &E, result: &StepResult) -> Result<CreationStep> {
        if entity.is_final() {
            return Err(DispatchError::validation("This character is already finished."));
        }
        let step = self.current_step(entity)?;
        if step.step_type.is_complete() {
            return Err(DispatchError::validation(
                "All steps are done. Finish creation to continue.",
            ));
        }
        if step.step_type != result.step_type {
            tracing::debug!(
                entity_id = %entity.id(),
                expected = %step.step_type,
                submitted = %result.step_type,
                "Rejected stale step result"
            );
            return Err(DispatchError::validation(
                "That choice is out of date. Please use the current step.",
            ));
        }
        validate_selections(&step, &result.selections)?;
        Ok(step)
    }

    fn apply(&self, entity: &mut E, step: &CreationStep, result: &StepResult) -> Result<()> {
        let handler = self.registry.get(&step.step_type).ok_or_else(|| {
            DispatchError::internal(format!("no step handler for {}", step.step_type))
        })?;
        handler.apply(entity, &result.selections)
    }
}

fn validate_selections(step: &CreationStep, selections: &[String]) -> Result<()> {
    let count = selections.len();
    if count < step.min_choices || count > step.max_choices {
        let expected = if step.min_choices == step.max_choices {
            format!("exactly {}", step.min_choices)
        } else {
            format!("between {} and {}", step.min_choices, step.max_choices)
        };
        return Err(DispatchError::validation(format!(
            "Please choose {expected} option(s) for {}.",
            step.title
        )));
    }

    let mut seen = HashSet::with_capacity(count);
    for selection in selections {
        if !seen.insert(selection.as_str()) {
            return Err(DispatchError::validation(format!(
                "\"{selection}\" was selected more than once."
            )));
        }
        if step.is_free_text() {
            if selection.trim().is_empty() {
                return Err(DispatchError::validation("Please enter a value."));
            }
        } else if step.option(selection).is_none() {
            return Err(DispatchError::validation(format!(
                "\"{selection}\" is not a valid choice for {}.",
                step.title
            )));
        }
    }
    Ok(())
}

impl<E> fmt::Debug for FlowController<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlowController")
            .field("ruleset", &self.ruleset_name)
            .field("sequence", &self.sequence)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::StepOption;

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Hero {
        name: Option<String>,
        class: Option<String>,
        skills: Vec<String>,
        finished: bool,
    }

    impl DraftEntity for Hero {
        fn id(&self) -> &str {
            "h1"
        }
        fn owner_id(&self) -> &str {
            "u1"
        }
        fn is_final(&self) -> bool {
            self.finished
        }
    }

    struct Rules;

    impl Ruleset<Hero> for Rules {
        fn name(&self) -> &str {
            "test"
        }

        fn sequence(&self) -> StepSequence<Hero> {
            StepSequence::new()
                .step("name", |h: &Hero| h.name.is_some())
                .step("class", |h: &Hero| h.class.is_some())
                .step("skills", |h: &Hero| !h.skills.is_empty())
        }
    }

    fn registry() -> StepHandlerRegistry<Hero> {
        StepHandlerRegistry::new()
            .register_fn(
                "name",
                |_h: &Hero| CreationStep::new("name", "Name"),
                |h: &mut Hero, s: &[String]| {
                    h.name = Some(s[0].trim().to_string());
                    Ok(())
                },
            )
            .register_fn(
                "class",
                |_h: &Hero| {
                    CreationStep::new("class", "Class")
                        .with_option(StepOption::new("rogue", "Rogue"))
                        .with_option(StepOption::new("wizard", "Wizard"))
                },
                |h: &mut Hero, s: &[String]| {
                    h.class = Some(s[0].clone());
                    Ok(())
                },
            )
            .register_fn(
                "skills",
                // Rogues pick more skills
                |h: &Hero| {
                    let picks = if h.class.as_deref() == Some("rogue") { 2 } else { 1 };
                    CreationStep::new("skills", "Skills")
                        .with_options(["stealth", "arcana", "athletics"].map(|k| StepOption::new(k, k)))
                        .choices(picks, picks)
                },
                |h: &mut Hero, s: &[String]| {
                    h.skills = s.to_vec();
                    Ok(())
                },
            )
    }

    fn controller() -> FlowController<Hero> {
        FlowController::new(&Rules, registry()).unwrap()
    }

    #[test]
    fn test_missing_handler_fails_construction() {
        let partial = StepHandlerRegistry::new().register_fn(
            "name",
            |_h: &Hero| CreationStep::new("name", "Name"),
            |_h: &mut Hero, _s: &[String]| Ok(()),
        );
        let err = FlowController::new(&Rules, partial).unwrap_err();
        assert!(err.to_string().contains("class, skills"));
    }

    #[test]
    fn test_current_step_is_pure() {
        let flow = controller();
        let hero = Hero::default();
        assert_eq!(flow.current_step(&hero).unwrap(), flow.current_step(&hero).unwrap());
        assert_eq!(flow.current_step(&hero).unwrap().step_type, StepType::new("name"));
        assert_eq!(hero, Hero::default());
    }

    #[test]
    fn test_walk_to_complete() {
        let flow = controller();
        let mut hero = Hero::default();

        let next = flow
            .process_step_result(&mut hero, &StepResult::single("name", "Vex"))
            .unwrap();
        assert_eq!(next.step_type, StepType::new("class"));

        let next = flow
            .process_step_result(&mut hero, &StepResult::single("class", "wizard"))
            .unwrap();
        assert_eq!((next.min_choices, next.max_choices), (1, 1));

        let next = flow
            .process_step_result(&mut hero, &StepResult::single("skills", "arcana"))
            .unwrap();
        assert!(next.step_type.is_complete());
        assert!(flow.is_creation_complete(&hero));
    }

    #[test]
    fn test_branching_step_depends_on_earlier_choice() {
        let flow = controller();
        let mut hero = Hero {
            name: Some("Vex".into()),
            class: Some("rogue".into()),
            ..Default::default()
        };
        let step = flow.current_step(&hero).unwrap();
        assert_eq!(step.max_choices, 2);

        let err = flow
            .process_step_result(&mut hero, &StepResult::single("skills", "stealth"))
            .unwrap_err();
        assert!(matches!(err, DispatchError::Validation(_)));
    }

    #[test]
    fn test_replayed_result_is_rejected_not_reapplied() {
        let flow = controller();
        let mut hero = Hero::default();
        let result = StepResult::single("name", "Vex");

        flow.process_step_result(&mut hero, &result).unwrap();
        let snapshot = hero.clone();

        let err = flow.process_step_result(&mut hero, &result).unwrap_err();
        assert!(matches!(err, DispatchError::Validation(_)));
        assert_eq!(hero, snapshot);
    }

    #[test]
    fn test_selection_validation() {
        let flow = controller();
        let mut hero = Hero {
            name: Some("Vex".into()),
            class: Some("rogue".into()),
            ..Default::default()
        };
        let cases = [
            vec!["stealth", "stealth"],
            vec!["stealth", "cooking"],
            vec!["stealth", "arcana", "athletics"],
            vec![],
        ];
        for selections in cases {
            let result = StepResult::new("skills", selections.iter().map(|s| s.to_string()).collect());
            assert!(flow.process_step_result(&mut hero, &result).is_err(), "{selections:?}");
        }
        assert!(hero.skills.is_empty());
    }

    #[test]
    fn test_free_text_rejects_blank() {
        let flow = controller();
        let mut hero = Hero::default();
        assert!(flow
            .process_step_result(&mut hero, &StepResult::single("name", "   "))
            .is_err());
    }

    #[test]
    fn test_preview_leaves_entity_untouched() {
        let flow = controller();
        let hero = Hero {
            name: Some("Vex".into()),
            ..Default::default()
        };
        let projected = flow
            .preview_step_result(&hero, &StepResult::single("class", "rogue"))
            .unwrap();
        assert_eq!(projected.class.as_deref(), Some("rogue"));
        assert!(hero.class.is_none());
        assert_eq!(flow.current_step(&projected).unwrap().max_choices, 2);
    }

    #[test]
    fn test_failed_apply_leaves_entity_untouched() {
        let registry = registry().register_fn(
            "name",
            |_h: &Hero| CreationStep::new("name", "Name"),
            |h: &mut Hero, _s: &[String]| {
                h.class = Some("admin".into());
                Err(DispatchError::validation("That name is taken."))
            },
        );
        let flow = FlowController::new(&Rules, registry).unwrap();
        let mut hero = Hero::default();

        let err = flow
            .process_step_result(&mut hero, &StepResult::single("name", "Vex"))
            .unwrap_err();
        assert!(matches!(err, DispatchError::Validation(_)));
        assert_eq!(hero, Hero::default());
        assert_eq!(flow.current_step(&hero).unwrap().step_type, StepType::new("name"));
    }

    #[test]
    fn test_back_rerenders_current_step() {
        let flow = controller();
        let hero = Hero {
            name: Some("Vex".into()),
            ..Default::default()
        };
        assert_eq!(flow.back(&hero).unwrap(), flow.current_step(&hero).unwrap());
    }

    #[test]
    fn test_final_entity_rejects_results() {
        let flow = controller();
        let mut hero = Hero {
            finished: true,
            ..Default::default()
        };
        assert!(flow.current_step(&hero).unwrap().step_type.is_complete());
        assert!(flow
            .process_step_result(&mut hero, &StepResult::single("name", "Vex"))
            .is_err());
    }
}
