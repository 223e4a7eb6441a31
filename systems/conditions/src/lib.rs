#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure system that decides whether a skill rule's condition holds.
//!
//! Checks run in a fixed order and stop at the first failure, which is
//! reported through [`Verdict::Blocked`] so callers can explain why a rule
//! stayed silent. Missing host data never fails a tick: an absent camera makes
//! cursor checks exclusionary and unknown vitals skip life thresholds.

use std::{collections::HashMap, time::Duration};

use glam::{Vec2, Vec3};
use rotation_assist_core::{
    desktop_position, CameraProjection, Cooldown, EntitySnapshot, EntityView, PlayerSnapshot,
    RuleBook, RuleId, SkillCondition, SkillRule, WindowState,
};

/// Time elapsed since each rule last fired.
///
/// Entries are created the first time a rule's cooldown is checked, and that
/// first check reports ready.
#[derive(Debug, Default)]
pub struct RuleCooldowns {
    timers: HashMap<RuleId, Cooldown>,
}

impl RuleCooldowns {
    /// Creates an empty cooldown ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Advances every tracked timer by the tick delta.
    pub fn advance(&mut self, dt: Duration) {
        for timer in self.timers.values_mut() {
            timer.advance(dt);
        }
    }

    /// Reports whether `min_cooldown` elapsed since the rule last fired.
    pub fn is_ready(&mut self, rule: RuleId, min_cooldown: Duration) -> bool {
        match self.timers.get(&rule) {
            Some(timer) => timer.is_ready(min_cooldown),
            None => {
                let _ = self.timers.insert(rule, Cooldown::new());
                true
            }
        }
    }

    /// Restarts the rule's timer after it fired.
    pub fn mark_fired(&mut self, rule: RuleId) {
        self.timers.entry(rule).or_default().restart();
    }

    /// Time elapsed since the rule fired or was first checked.
    #[must_use]
    pub fn elapsed(&self, rule: RuleId) -> Option<Duration> {
        self.timers.get(&rule).map(Cooldown::elapsed)
    }

    /// Drops timers of rules no longer present in the book.
    pub fn retain_book(&mut self, book: &RuleBook) {
        self.timers.retain(|rule, _| book.contains(*rule));
    }
}

/// Everything a condition may inspect during one tick.
#[derive(Clone, Copy)]
pub struct Scene<'a> {
    /// Attackable monsters in scan range, in host order.
    pub monsters: &'a [&'a EntitySnapshot],
    /// Every entity the host reported, unfiltered.
    pub entities: &'a EntityView,
    /// The local player.
    pub player: &'a PlayerSnapshot,
    /// Effective life percentage, `None` when unknown.
    pub life_percent: Option<f32>,
    /// Cursor position in desktop coordinates.
    pub cursor: Vec2,
    /// Host window placement and focus.
    pub window: WindowState,
    /// Camera projection, when the host has one.
    pub camera: Option<&'a dyn CameraProjection>,
    /// Rules may only fire while the game window is focused.
    pub require_focus: bool,
}

impl Scene<'_> {
    /// Reports whether a world position projects within `radius` pixels of the cursor.
    ///
    /// Positions that cannot be projected are never near the cursor.
    #[must_use]
    pub fn near_cursor(&self, world: Vec3, radius: f32) -> bool {
        self.camera
            .and_then(|camera| desktop_position(camera, &self.window, world))
            .map_or(false, |screen| screen.distance(self.cursor) <= radius)
    }

    fn within_guard(&self, condition: &SkillCondition, world: Vec3, distance: f32) -> bool {
        let radius = condition.deployed_radius() as f32;
        if condition.require_cursor_nearby && self.camera.is_some() {
            self.near_cursor(world, radius)
        } else {
            distance <= radius
        }
    }
}

impl std::fmt::Debug for Scene<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scene")
            .field("monsters", &self.monsters.len())
            .field("entities", &self.entities.len())
            .field("life_percent", &self.life_percent)
            .field("cursor", &self.cursor)
            .field("camera", &self.camera.is_some())
            .finish()
    }
}

/// Check that stopped a rule from firing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BlockReason {
    /// The rule fired too recently.
    Cooldown,
    /// Too few matching monsters near the cursor.
    TooFewNearCursor,
    /// Too few matching monsters within range of the player.
    TooFewInRange,
    /// No unique monster among the matching ones.
    NoBoss,
    /// Player life is below the rule's minimum.
    LowLife,
    /// The game window is not focused.
    Unfocused,
    /// One of the rule's own deployed objects is nearby.
    DeployedObjectNearby,
    /// An entity matching a fallback path is nearby.
    FallbackObjectNearby,
}

/// Outcome of evaluating a rule's condition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Verdict {
    /// Every check passed.
    Fire,
    /// The named check failed.
    Blocked(BlockReason),
}

impl Verdict {
    /// Reports whether the rule should fire.
    #[must_use]
    pub const fn should_fire(self) -> bool {
        matches!(self, Self::Fire)
    }
}

/// Condition evaluator that reuses a scratch buffer of monster indices.
#[derive(Debug, Default)]
pub struct ConditionEvaluator {
    matching: Vec<usize>,
}

impl ConditionEvaluator {
    /// Creates a new evaluator with an empty scratch buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Evaluates the rule's condition against the scene.
    ///
    /// The only state touched is the lazily created cooldown entry.
    pub fn evaluate(
        &mut self,
        id: RuleId,
        rule: &SkillRule,
        cooldowns: &mut RuleCooldowns,
        scene: &Scene<'_>,
    ) -> Verdict {
        let condition = &rule.condition;

        if condition.min_cooldown_ms > 0 && !cooldowns.is_ready(id, condition.min_cooldown()) {
            return Verdict::Blocked(BlockReason::Cooldown);
        }

        self.matching.clear();
        self.matching.extend(
            scene
                .monsters
                .iter()
                .enumerate()
                .filter(|(_, monster)| condition.rarity_filter.admits(monster.rarity))
                .map(|(index, _)| index),
        );

        let min_count = usize::try_from(condition.min_monsters_in_range).unwrap_or(usize::MAX);
        if condition.require_cursor_nearby {
            let radius = condition.cursor_range as f32;
            self.matching
                .retain(|&index| scene.near_cursor(scene.monsters[index].world, radius));
            if min_count > 0 && self.matching.len() < min_count {
                return Verdict::Blocked(BlockReason::TooFewNearCursor);
            }
        } else if min_count > 0 {
            let range = condition.range as f32;
            self.matching
                .retain(|&index| scene.monsters[index].distance <= range);
            if self.matching.len() < min_count {
                return Verdict::Blocked(BlockReason::TooFewInRange);
            }
        }

        if condition.only_if_boss_present
            && !self.matching.iter().any(|&index| {
                scene.monsters[index]
                    .rarity
                    .map_or(false, |rarity| rarity.is_boss())
            })
        {
            return Verdict::Blocked(BlockReason::NoBoss);
        }

        if condition.min_life_percent > 0 {
            if let Some(life) = scene.life_percent.filter(|life| *life > 0.0) {
                if life < condition.min_life_percent as f32 {
                    return Verdict::Blocked(BlockReason::LowLife);
                }
            }
        }

        if scene.require_focus && !scene.window.focused {
            return Verdict::Blocked(BlockReason::Unfocused);
        }

        if condition.skip_if_deployed_object_nearby {
            if owned_object_nearby(rule, scene) {
                return Verdict::Blocked(BlockReason::DeployedObjectNearby);
            }
            if fallback_object_nearby(condition, scene) {
                return Verdict::Blocked(BlockReason::FallbackObjectNearby);
            }
        }

        Verdict::Fire
    }
}

fn owned_object_nearby(rule: &SkillRule, scene: &Scene<'_>) -> bool {
    scene
        .player
        .skills
        .iter()
        .filter(|skill| skill.matches_rule_skill(&rule.skill_id))
        .flat_map(|skill| skill.deployed.iter())
        .any(|object| scene.within_guard(&rule.condition, object.world, object.distance))
}

fn fallback_object_nearby(condition: &SkillCondition, scene: &Scene<'_>) -> bool {
    let fragments = &condition.fallback_entity_path_contains;
    if fragments.is_empty() {
        return false;
    }

    scene
        .entities
        .iter()
        .filter(|entity| entity.path_contains_any(fragments))
        .any(|entity| scene.within_guard(condition, entity.world, entity.distance))
}
