//! Step types, rendered steps and submitted results.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Tag of the terminal step reached once every predicate passes.
pub const COMPLETE_STEP: &str = "complete";

/// Step-type tag declared by a ruleset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StepType(String);

impl StepType {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    /// The terminal step type.
    pub fn complete() -> Self {
        Self(COMPLETE_STEP.to_string())
    }

    pub fn is_complete(&self) -> bool {
        self.0 == COMPLETE_STEP
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StepType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StepType {
    fn from(tag: &str) -> Self {
        Self::new(tag)
    }
}

/// One selectable option of a step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepOption {
    pub key: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl StepOption {
    pub fn new(key: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            description: String::new(),
        }
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// A step derived from a draft entity. Recomputed on every request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreationStep {
    pub step_type: StepType,
    pub title: String,
    pub description: String,
    /// Empty for free-text steps.
    pub options: Vec<StepOption>,
    pub min_choices: usize,
    pub max_choices: usize,
    #[serde(default)]
    pub context: BTreeMap<String, serde_json::Value>,
}

impl CreationStep {
    /// A single-choice step.
    pub fn new(step_type: impl Into<StepType>, title: impl Into<String>) -> Self {
        Self {
            step_type: step_type.into(),
            title: title.into(),
            description: String::new(),
            options: Vec::new(),
            min_choices: 1,
            max_choices: 1,
            context: BTreeMap::new(),
        }
    }

    /// The terminal step.
    pub fn complete() -> Self {
        Self {
            min_choices: 0,
            max_choices: 0,
            ..Self::new(StepType::complete(), "Creation complete")
        }
        .describe("Everything is set. Review and finish when ready.")
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_option(mut self, option: StepOption) -> Self {
        self.options.push(option);
        self
    }

    pub fn with_options(mut self, options: impl IntoIterator<Item = StepOption>) -> Self {
        self.options.extend(options);
        self
    }

    pub fn choices(mut self, min: usize, max: usize) -> Self {
        self.min_choices = min;
        self.max_choices = max;
        self
    }

    pub fn with_context(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.context.insert(key.into(), value);
        self
    }

    /// Look up an option by key.
    pub fn option(&self, key: &str) -> Option<&StepOption> {
        self.options.iter().find(|o| o.key == key)
    }

    pub fn is_free_text(&self) -> bool {
        self.options.is_empty()
    }
}

/// A submission for a step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepResult {
    pub step_type: StepType,
    pub selections: Vec<String>,
}

impl StepResult {
    pub fn new(step_type: impl Into<StepType>, selections: Vec<String>) -> Self {
        Self {
            step_type: step_type.into(),
            selections,
        }
    }

    pub fn single(step_type: impl Into<StepType>, selection: impl Into<String>) -> Self {
        Self::new(step_type, vec![selection.into()])
    }
}
