//! Shared fixtures: an in-memory character store and a small ruleset.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use interaction_dispatch::flow::{
    CreationStep, DraftEntity, EntityService, Ruleset, StepHandlerRegistry, StepOption, StepSequence,
};
use interaction_dispatch::{DispatchError, FlowController, Result};

pub const CASTERS: [&str; 2] = ["wizard", "cleric"];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Character {
    pub id: String,
    pub owner_id: String,
    pub scope_id: String,
    pub name: Option<String>,
    pub race: Option<String>,
    pub class: Option<String>,
    pub skills: Vec<String>,
    pub spells: Vec<String>,
    pub finalized: bool,
}

impl Character {
    pub fn is_caster(&self) -> bool {
        self.class.as_deref().map(|c| CASTERS.contains(&c)).unwrap_or(false)
    }

    pub fn skill_picks(&self) -> usize {
        match self.class.as_deref() {
            Some("rogue") => 4,
            _ => 2,
        }
    }
}

impl DraftEntity for Character {
    fn id(&self) -> &str {
        &self.id
    }

    fn owner_id(&self) -> &str {
        &self.owner_id
    }

    fn is_final(&self) -> bool {
        self.finalized
    }

    fn summary(&self) -> String {
        format!(
            "{} ({} {})",
            self.name.as_deref().unwrap_or("Unnamed"),
            self.race.as_deref().unwrap_or("?"),
            self.class.as_deref().unwrap_or("?"),
        )
    }
}

/// Entity store keyed by id, one open draft per owner and scope.
#[derive(Debug, Default)]
pub struct InMemoryEntityService {
    entities: Mutex<HashMap<String, Character>>,
    next_id: AtomicU64,
    pub updates: AtomicU64,
}

impl InMemoryEntityService {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn snapshot(&self, id: &str) -> Option<Character> {
        self.entities.lock().get(id).cloned()
    }

    pub fn insert(&self, character: Character) {
        self.entities.lock().insert(character.id.clone(), character);
    }
}

#[async_trait]
impl EntityService<Character> for InMemoryEntityService {
    async fn get_or_create_draft(&self, owner_id: &str, scope_id: &str) -> Result<Character> {
        let mut entities = self.entities.lock();
        if let Some(draft) = entities
            .values()
            .find(|c| c.owner_id == owner_id && c.scope_id == scope_id && !c.finalized)
        {
            return Ok(draft.clone());
        }
        let id = format!("char-{}", self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        let draft = Character {
            id: id.clone(),
            owner_id: owner_id.to_string(),
            scope_id: scope_id.to_string(),
            ..Default::default()
        };
        entities.insert(id, draft.clone());
        Ok(draft)
    }

    async fn get_entity(&self, id: &str) -> Result<Character> {
        self.snapshot(id)
            .ok_or_else(|| DispatchError::not_found(format!("character {id}")))
    }

    async fn update_entity(&self, entity: &Character) -> Result<Character> {
        self.updates.fetch_add(1, Ordering::Relaxed);
        self.insert(entity.clone());
        Ok(entity.clone())
    }

    async fn finalize_draft(&self, id: &str) -> Result<Character> {
        let mut entities = self.entities.lock();
        let character = entities
            .get_mut(id)
            .ok_or_else(|| DispatchError::not_found(format!("character {id}")))?;
        character.finalized = true;
        Ok(character.clone())
    }
}

pub struct HeroRules;

impl Ruleset<Character> for HeroRules {
    fn name(&self) -> &str {
        "heroes"
    }

    fn sequence(&self) -> StepSequence<Character> {
        StepSequence::new()
            .step("name", |c: &Character| c.name.is_some())
            .step("race", |c: &Character| c.race.is_some())
            .step("class", |c: &Character| c.class.is_some())
            .step("skills", |c: &Character| !c.skills.is_empty())
            .step("spells", |c: &Character| !c.is_caster() || !c.spells.is_empty())
    }
}

fn options(keys: &[&str]) -> Vec<StepOption> {
    keys.iter().map(|k| StepOption::new(*k, k.to_uppercase())).collect()
}

pub fn hero_registry() -> StepHandlerRegistry<Character> {
    StepHandlerRegistry::new()
        .register_fn(
            "name",
            |_c: &Character| CreationStep::new("name", "Name your hero"),
            |c: &mut Character, s: &[String]| {
                c.name = Some(s[0].clone());
                Ok(())
            },
        )
        .register_fn(
            "race",
            |_c: &Character| CreationStep::new("race", "Race").with_options(options(&["elf", "dwarf", "human"])),
            |c: &mut Character, s: &[String]| {
                c.race = Some(s[0].clone());
                Ok(())
            },
        )
        .register_fn(
            "class",
            |_c: &Character| {
                CreationStep::new("class", "Class").with_options(options(&["rogue", "fighter", "wizard", "cleric"]))
            },
            |c: &mut Character, s: &[String]| {
                c.class = Some(s[0].clone());
                Ok(())
            },
        )
        .register_fn(
            "skills",
            |c: &Character| {
                let picks = c.skill_picks();
                CreationStep::new("skills", "Skills")
                    .with_options(options(&["stealth", "arcana", "athletics", "insight", "history", "perception"]))
                    .choices(picks, picks)
                    .with_context("class", serde_json::json!(c.class))
            },
            |c: &mut Character, s: &[String]| {
                c.skills = s.to_vec();
                Ok(())
            },
        )
        .register_fn(
            "spells",
            |_c: &Character| {
                CreationStep::new("spells", "Spells")
                    .with_options(options(&["light", "shield", "bless"]))
                    .choices(1, 2)
            },
            |c: &mut Character, s: &[String]| {
                c.spells = s.to_vec();
                Ok(())
            },
        )
}

pub fn hero_controller() -> Arc<FlowController<Character>> {
    Arc::new(FlowController::new(&HeroRules, hero_registry()).expect("every step has a handler"))
}
