#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure system that fires at most one skill rule per tick.
//!
//! Rules are visited in book order. The first rule with a bound action whose
//! condition holds fires: its press command is emitted, the global timer and
//! the rule's own cooldown restart, and evaluation stops for the tick.

use std::time::Duration;

use rotation_assist_core::{BoundAction, Command, Cooldown, RuleBook, RuleId};
use rotation_assist_system_conditions::{ConditionEvaluator, RuleCooldowns, Scene, Verdict};

/// Rule that fired during a tick.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FiredRule {
    /// Identifier of the rule within its book.
    pub rule: RuleId,
    /// Action the host must perform.
    pub action: BoundAction,
    /// Display name of the rule's skill.
    pub skill_name: String,
}

impl FiredRule {
    /// Command asking the host to perform the rule's action.
    #[must_use]
    pub const fn command(&self) -> Command {
        Command::Press {
            action: self.action,
        }
    }
}

/// Rule scheduler owning the global and per-rule timers.
#[derive(Debug, Default)]
pub struct RuleScheduler {
    global: Cooldown,
    cooldowns: RuleCooldowns,
    evaluator: ConditionEvaluator,
}

impl RuleScheduler {
    /// Creates a scheduler whose timers just restarted.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Advances every timer by the tick delta.
    pub fn advance(&mut self, dt: Duration) {
        self.global.advance(dt);
        self.cooldowns.advance(dt);
    }

    /// Restarts the global timer, e.g. after an area change.
    pub fn restart(&mut self) {
        self.global.restart();
    }

    /// Time elapsed since the last firing or restart.
    #[must_use]
    pub const fn since_last_fire(&self) -> Duration {
        self.global.elapsed()
    }

    /// Evaluates the book and fires the first eligible rule.
    ///
    /// Returns `None` while disabled, while the global cooldown is running,
    /// or when no rule is eligible.
    pub fn tick(
        &mut self,
        enabled: bool,
        global_cooldown: Duration,
        book: &RuleBook,
        scene: &Scene<'_>,
    ) -> Option<FiredRule> {
        self.cooldowns.retain_book(book);

        if !enabled || book.is_empty() || !self.global.is_ready(global_cooldown) {
            return None;
        }

        for (id, rule) in book.iter() {
            let Some(action) = rule.key.action() else {
                continue;
            };

            match self.evaluator.evaluate(id, rule, &mut self.cooldowns, scene) {
                Verdict::Fire => {
                    self.global.restart();
                    self.cooldowns.mark_fired(id);
                    tracing::info!(
                        target: "rotation",
                        skill = %rule.skill_name,
                        action = %action,
                        "fired skill rule"
                    );
                    return Some(FiredRule {
                        rule: id,
                        action,
                        skill_name: rule.skill_name.clone(),
                    });
                }
                Verdict::Blocked(reason) => {
                    tracing::debug!(
                        rule = id.get(),
                        skill = %rule.skill_name,
                        ?reason,
                        "rule blocked"
                    );
                }
            }
        }

        None
    }

    /// Appends the press command of the fired rule, if any, to `out`.
    pub fn handle(
        &mut self,
        enabled: bool,
        global_cooldown: Duration,
        book: &RuleBook,
        scene: &Scene<'_>,
        out: &mut Vec<Command>,
    ) -> Option<FiredRule> {
        let fired = self.tick(enabled, global_cooldown, book, scene)?;
        out.push(fired.command());
        Some(fired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Vec2, Vec3};
    use rotation_assist_core::{
        EntityFlags, EntityId, EntityKind, EntitySnapshot, EntityView, KeyBinding,
        PlayerSnapshot, Rarity, ScreenRect, SkillCondition, SkillRule, VirtualKey, WindowState,
    };

    const GLOBAL: Duration = Duration::from_millis(100);

    fn monster() -> EntitySnapshot {
        EntitySnapshot {
            id: EntityId::new(1),
            kind: EntityKind::Monster,
            world: Vec3::ZERO,
            grid: Vec2::ZERO,
            distance: 20.0,
            flags: EntityFlags::HOSTILE,
            rarity: Some(Rarity::Rare),
            stats: None,
            path: None,
            animated_base_path: None,
        }
    }

    fn scene<'a>(
        monsters: &'a [&'a EntitySnapshot],
        entities: &'a EntityView,
        player: &'a PlayerSnapshot,
    ) -> Scene<'a> {
        Scene {
            monsters,
            entities,
            player,
            life_percent: Some(100.0),
            cursor: Vec2::ZERO,
            window: WindowState {
                rect: ScreenRect::from_origin_and_size(Vec2::ZERO, Vec2::new(800.0, 600.0)),
                focused: true,
            },
            camera: None,
            require_focus: true,
        }
    }

    fn bound_rule(name: &str, key: u16, min_cooldown_ms: u64) -> SkillRule {
        SkillRule {
            skill_name: name.to_owned(),
            key: KeyBinding::bound(BoundAction::Key(VirtualKey::new(key))),
            condition: SkillCondition {
                min_cooldown_ms,
                ..SkillCondition::default()
            },
            ..SkillRule::default()
        }
    }

    #[test]
    fn at_most_one_rule_fires_per_tick() {
        let target = monster();
        let monsters = [&target];
        let entities = EntityView::default();
        let player = PlayerSnapshot::default();
        let scene = scene(&monsters, &entities, &player);

        let mut book = RuleBook::new();
        let first = book.push(bound_rule("First", 0x31, 0));
        let _ = book.push(bound_rule("Second", 0x32, 0));

        let mut scheduler = RuleScheduler::new();
        scheduler.advance(GLOBAL);
        let mut out = Vec::new();
        let fired = scheduler
            .handle(true, GLOBAL, &book, &scene, &mut out)
            .expect("first rule fires");

        assert_eq!(fired.rule, first);
        assert_eq!(
            out,
            vec![Command::Press {
                action: BoundAction::Key(VirtualKey::new(0x31)),
            }]
        );
    }

    #[test]
    fn global_cooldown_spaces_out_firings() {
        let target = monster();
        let monsters = [&target];
        let entities = EntityView::default();
        let player = PlayerSnapshot::default();
        let scene = scene(&monsters, &entities, &player);
        let book = RuleBook::from(vec![bound_rule("Spam", 0x31, 0)]);

        let mut scheduler = RuleScheduler::new();
        assert!(
            scheduler.tick(true, GLOBAL, &book, &scene).is_none(),
            "global timer starts from zero"
        );

        scheduler.advance(GLOBAL);
        assert!(scheduler.tick(true, GLOBAL, &book, &scene).is_some());

        scheduler.advance(Duration::from_millis(99));
        assert!(scheduler.tick(true, GLOBAL, &book, &scene).is_none());

        scheduler.advance(Duration::from_millis(1));
        assert!(scheduler.tick(true, GLOBAL, &book, &scene).is_some());
    }

    #[test]
    fn per_rule_cooldown_lets_lower_priority_rules_fire() {
        let target = monster();
        let monsters = [&target];
        let entities = EntityView::default();
        let player = PlayerSnapshot::default();
        let scene = scene(&monsters, &entities, &player);

        let mut book = RuleBook::new();
        let slow = book.push(bound_rule("Slow", 0x31, 1_000));
        let filler = book.push(bound_rule("Filler", 0x32, 0));

        let mut scheduler = RuleScheduler::new();
        let mut fired = Vec::new();
        for _ in 0..5 {
            scheduler.advance(Duration::from_millis(300));
            if let Some(rule) = scheduler.tick(true, GLOBAL, &book, &scene) {
                fired.push(rule.rule);
            }
        }

        assert_eq!(fired, vec![slow, filler, filler, filler, slow]);
    }

    #[test]
    fn unbound_rules_are_skipped() {
        let target = monster();
        let monsters = [&target];
        let entities = EntityView::default();
        let player = PlayerSnapshot::default();
        let scene = scene(&monsters, &entities, &player);

        let mut unbound = bound_rule("Unbound", 0x31, 0);
        unbound.key = KeyBinding::UNBOUND;
        let mut book = RuleBook::new();
        let _ = book.push(unbound);
        let bound = book.push(bound_rule("Bound", 0x32, 0));

        let mut scheduler = RuleScheduler::new();
        scheduler.advance(GLOBAL);
        let fired = scheduler.tick(true, GLOBAL, &book, &scene);
        assert_eq!(fired.map(|rule| rule.rule), Some(bound));
    }

    #[test]
    fn disabled_scheduler_is_silent() {
        let target = monster();
        let monsters = [&target];
        let entities = EntityView::default();
        let player = PlayerSnapshot::default();
        let scene = scene(&monsters, &entities, &player);
        let book = RuleBook::from(vec![bound_rule("Spam", 0x31, 0)]);

        let mut scheduler = RuleScheduler::new();
        scheduler.advance(GLOBAL);
        let mut out = Vec::new();
        assert!(scheduler
            .handle(false, GLOBAL, &book, &scene, &mut out)
            .is_none());
        assert!(out.is_empty());
    }

    #[test]
    fn blocked_rules_do_not_restart_the_global_timer() {
        let entities = EntityView::default();
        let player = PlayerSnapshot::default();
        let scene = scene(&[], &entities, &player);
        let book = RuleBook::from(vec![bound_rule("Needs monsters", 0x31, 0)]);

        let mut scheduler = RuleScheduler::new();
        scheduler.advance(GLOBAL);
        assert!(scheduler.tick(true, GLOBAL, &book, &scene).is_none());
        assert_eq!(scheduler.since_last_fire(), GLOBAL);

        scheduler.restart();
        assert_eq!(scheduler.since_last_fire(), Duration::ZERO);
    }
}
