//! Cache of the skills a new rule can be created for.

use std::collections::BTreeSet;

use rotation_assist_core::ActorSkill;
use serde::{Deserialize, Serialize};

/// Skill shown in one slot of the UI skill bar.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkillBarSlot {
    /// Numeric skill identifier.
    pub id: u32,
    /// Display name.
    pub name: Option<String>,
    /// Internal name.
    pub internal_name: Option<String>,
}

/// Skill offered when creating a rule.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SkillBarEntry {
    /// Identifier written into new rules.
    pub skill_id: String,
    /// Label written into new rules.
    pub label: String,
}

/// Skill bar entries refreshed every tick.
#[derive(Debug, Default)]
pub struct SkillBarCache {
    entries: Vec<SkillBarEntry>,
    seen: BTreeSet<u32>,
}

impl SkillBarCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached entries in slot order.
    #[must_use]
    pub fn entries(&self) -> &[SkillBarEntry] {
        &self.entries
    }

    /// Rebuilds the cache from the UI skill bar, falling back to the actor's
    /// skills when the bar is empty.
    pub fn refresh(&mut self, slots: &[SkillBarSlot], actor_skills: &[ActorSkill]) {
        self.entries.clear();

        if !slots.is_empty() {
            self.entries.extend(slots.iter().map(|slot| SkillBarEntry {
                skill_id: slot.id.to_string(),
                label: slot
                    .internal_name
                    .as_deref()
                    .or(slot.name.as_deref())
                    .unwrap_or("Skill")
                    .to_owned(),
            }));
            return;
        }

        self.seen.clear();
        for skill in actor_skills {
            let Some(label) = skill.label() else {
                continue;
            };
            if !self.seen.insert(skill.id) {
                continue;
            }
            self.entries.push(SkillBarEntry {
                skill_id: skill.id.to_string(),
                label: label.to_owned(),
            });
        }
    }
}
