#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the rotation assist engine.
//!
//! This crate defines the read-only snapshot surface the host fills once per
//! tick, the declarative rule types users author, and the [`Command`] values
//! systems emit for the host to dispatch. Systems never talk to the host
//! directly: they read snapshots, keep their own timers, and answer with
//! commands.

use std::{collections::BTreeMap, fmt, time::Duration};

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

mod keys;

pub use keys::{BoundAction, KeyBinding, KeyParseError, MouseButton, VirtualKey};

/// Stat key flagging entities that cannot currently take damage.
pub const CANNOT_BE_DAMAGED: &str = "cannot_be_damaged";

/// Unique identifier assigned to an entity by the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(u32);

impl EntityId {
    /// Creates a new entity identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Stable identifier allocated to a rule by its [`RuleBook`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RuleId(u32);

impl RuleId {
    /// Creates a new rule identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the rule identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Integer cell of the passability grid expressed as column and row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GridCell {
    column: i32,
    row: i32,
}

impl GridCell {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(column: i32, row: i32) -> Self {
        Self { column, row }
    }

    /// Truncates a fractional grid position towards zero.
    #[must_use]
    pub fn from_grid_position(position: Vec2) -> Self {
        Self {
            column: position.x as i32,
            row: position.y as i32,
        }
    }

    /// Column index of the cell.
    #[must_use]
    pub const fn column(&self) -> i32 {
        self.column
    }

    /// Row index of the cell.
    #[must_use]
    pub const fn row(&self) -> i32 {
        self.row
    }
}

/// Broad classification the host attaches to every entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// Creatures the player fights.
    Monster,
    /// Ground effects and other transient visual objects.
    Effect,
    /// Anything else the host chose to report.
    Other,
}

/// Rarity tiers reported for monsters, ordered from weakest to strongest.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rarity {
    /// Plain monster.
    Normal,
    /// Magic monster.
    Magic,
    /// Rare monster.
    Rare,
    /// Unique monster. Treated as a boss.
    Unique,
}

impl Rarity {
    /// Reports whether the rarity sits at the top tier.
    #[must_use]
    pub const fn is_boss(self) -> bool {
        matches!(self, Self::Unique)
    }
}

impl fmt::Display for Rarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Normal => "Normal",
            Self::Magic => "Magic",
            Self::Rare => "Rare",
            Self::Unique => "Unique",
        };
        f.write_str(name)
    }
}

/// Rarity requirement applied by a [`SkillCondition`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RarityFilter {
    /// Any entity that reports a rarity.
    #[default]
    Any,
    /// Magic, rare or unique entities.
    MagicOrHigher,
    /// Rare or unique entities.
    RareOrHigher,
    /// Unique entities only.
    UniqueOnly,
}

impl RarityFilter {
    /// Reports whether an entity with the provided rarity passes the filter.
    ///
    /// Entities without a rarity never pass, not even [`RarityFilter::Any`].
    #[must_use]
    pub fn admits(self, rarity: Option<Rarity>) -> bool {
        let Some(rarity) = rarity else {
            return false;
        };

        match self {
            Self::Any => true,
            Self::MagicOrHigher => rarity >= Rarity::Magic,
            Self::RareOrHigher => rarity >= Rarity::Rare,
            Self::UniqueOnly => rarity == Rarity::Unique,
        }
    }
}

/// Stat lookup attached to an entity.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatMap(BTreeMap<String, i32>);

impl StatMap {
    /// Creates an empty stat map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value stored for the stat, if any.
    #[must_use]
    pub fn get(&self, stat: &str) -> Option<i32> {
        self.0.get(stat).copied()
    }

    /// Stores a value for the stat, returning the previous value.
    pub fn insert(&mut self, stat: impl Into<String>, value: i32) -> Option<i32> {
        self.0.insert(stat.into(), value)
    }
}

impl<K: Into<String>> FromIterator<(K, i32)> for StatMap {
    fn from_iter<T: IntoIterator<Item = (K, i32)>>(iter: T) -> Self {
        Self(iter.into_iter().map(|(key, value)| (key.into(), value)).collect())
    }
}

/// Lifecycle and disposition flags reported by the host.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntityFlags {
    /// The host still tracks the entity.
    pub valid: bool,
    /// The entity died.
    pub dead: bool,
    /// The entity is alive.
    pub alive: bool,
    /// The entity is hostile towards the player.
    pub hostile: bool,
    /// The entity can be targeted.
    pub targetable: bool,
    /// The entity is hidden from the player.
    pub hidden: bool,
}

impl EntityFlags {
    /// Flags of a live, hostile, targetable and visible entity.
    pub const HOSTILE: Self = Self {
        valid: true,
        dead: false,
        alive: true,
        hostile: true,
        targetable: true,
        hidden: false,
    };
}

/// Immutable view of a single entity captured for one tick.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    /// Identifier assigned by the host.
    pub id: EntityId,
    /// Classification of the entity.
    pub kind: EntityKind,
    /// Position in world space.
    pub world: Vec3,
    /// Position in (fractional) grid space.
    pub grid: Vec2,
    /// Distance to the player in world units.
    pub distance: f32,
    /// Lifecycle and disposition flags.
    #[serde(default)]
    pub flags: EntityFlags,
    /// Rarity tier, when the entity carries one.
    #[serde(default)]
    pub rarity: Option<Rarity>,
    /// Stat lookup, when available.
    #[serde(default)]
    pub stats: Option<StatMap>,
    /// Metadata path identifying the entity type.
    #[serde(default)]
    pub path: Option<String>,
    /// Path of the animated object the entity is rendered from.
    #[serde(default)]
    pub animated_base_path: Option<String>,
}

impl EntitySnapshot {
    /// Reports whether the entity currently ignores damage.
    #[must_use]
    pub fn is_invulnerable(&self) -> bool {
        self.stats
            .as_ref()
            .and_then(|stats| stats.get(CANNOT_BE_DAMAGED))
            == Some(1)
    }

    /// Reports whether the entity is a live hostile the player can attack.
    #[must_use]
    pub fn is_attackable(&self) -> bool {
        let flags = self.flags;
        flags.valid
            && !flags.dead
            && flags.alive
            && flags.hostile
            && flags.targetable
            && !flags.hidden
            && !self.is_invulnerable()
    }

    /// Reports whether the entity path contains any of the fragments,
    /// ignoring ASCII case. Empty fragments never match.
    #[must_use]
    pub fn path_contains_any(&self, fragments: &[String]) -> bool {
        let Some(path) = self.path.as_deref() else {
            return false;
        };
        fragments
            .iter()
            .any(|fragment| contains_ignore_case(path, fragment))
    }

    /// Animated base path when present, falling back to the entity path.
    #[must_use]
    pub fn base_path(&self) -> Option<&str> {
        self.animated_base_path
            .as_deref()
            .filter(|path| !path.is_empty())
            .or(self.path.as_deref())
    }
}

/// Case-insensitive substring test used for entity path matching.
///
/// Empty needles never match.
#[must_use]
pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }
    haystack
        .to_ascii_lowercase()
        .contains(&needle.to_ascii_lowercase())
}

/// Read-only snapshot of every entity the host reported for a tick.
///
/// The host order is preserved; systems rely on it to break ties.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EntityView {
    snapshots: Vec<EntitySnapshot>,
}

impl EntityView {
    /// Creates a new entity view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(snapshots: Vec<EntitySnapshot>) -> Self {
        Self { snapshots }
    }

    /// Iterator over all captured snapshots in host order.
    pub fn iter(&self) -> impl Iterator<Item = &EntitySnapshot> {
        self.snapshots.iter()
    }

    /// Iterator over the monsters contained in the view.
    pub fn monsters(&self) -> impl Iterator<Item = &EntitySnapshot> {
        self.snapshots
            .iter()
            .filter(|snapshot| snapshot.kind == EntityKind::Monster)
    }

    /// Collects attackable monsters, optionally capped by distance to the player.
    #[must_use]
    pub fn hostile_monsters(&self, range_cap: Option<f32>) -> Vec<&EntitySnapshot> {
        self.monsters()
            .filter(|snapshot| snapshot.is_attackable())
            .filter(|snapshot| range_cap.map_or(true, |cap| snapshot.distance <= cap))
            .collect()
    }

    /// Looks up a snapshot by identifier.
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&EntitySnapshot> {
        self.snapshots.iter().find(|snapshot| snapshot.id == id)
    }

    /// Number of captured snapshots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Reports whether the view contains no snapshots.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

/// Player resource pools.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Vitals {
    /// Current life.
    pub life: i32,
    /// Maximum life.
    pub max_life: i32,
    /// Current energy shield.
    pub energy_shield: i32,
    /// Maximum energy shield.
    pub max_energy_shield: i32,
    /// Current mana.
    pub mana: i32,
    /// Maximum mana.
    pub max_mana: i32,
}

impl Vitals {
    /// Life and energy shield combined, as a percentage of their maxima.
    ///
    /// The denominator is floored at one so empty pools never divide by zero.
    #[must_use]
    pub fn life_percent(&self) -> f32 {
        let current = self.life + self.energy_shield;
        let maximum = (self.max_life + self.max_energy_shield).max(1);
        current as f32 * 100.0 / maximum as f32
    }

    /// Mana as a percentage of maximum mana.
    #[must_use]
    pub fn mana_percent(&self) -> f32 {
        let maximum = self.max_mana.max(1);
        self.mana as f32 * 100.0 / maximum as f32
    }
}

/// Object spawned by a player skill and tracked against that skill.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DeployedObject {
    /// Position in world space.
    pub world: Vec3,
    /// Distance to the player in world units.
    pub distance: f32,
}

/// Skill known to the player's actor component.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActorSkill {
    /// Numeric skill identifier.
    pub id: u32,
    /// Display name.
    pub name: Option<String>,
    /// Internal name.
    pub internal_name: Option<String>,
    /// Objects the skill currently has deployed.
    pub deployed: Vec<DeployedObject>,
}

impl ActorSkill {
    /// Reports whether the skill is the one a rule refers to.
    ///
    /// Rules without a skill identifier match every skill.
    #[must_use]
    pub fn matches_rule_skill(&self, skill_id: &str) -> bool {
        skill_id.is_empty() || self.id.to_string().eq_ignore_ascii_case(skill_id)
    }

    /// Preferred label: internal name, then display name.
    #[must_use]
    pub fn label(&self) -> Option<&str> {
        self.internal_name
            .as_deref()
            .or(self.name.as_deref())
            .filter(|name| !name.trim().is_empty())
    }
}

/// Immutable view of the local player captured for one tick.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerSnapshot {
    /// Position in (fractional) grid space.
    pub grid: Vec2,
    /// Position in world space.
    pub world: Vec3,
    /// Resource pools; absent when the host could not read them.
    pub vitals: Option<Vitals>,
    /// Skills known to the actor.
    pub skills: Vec<ActorSkill>,
}

impl PlayerSnapshot {
    /// Effective life percentage, or `None` when vitals are unknown.
    #[must_use]
    pub fn life_percent(&self) -> Option<f32> {
        self.vitals.as_ref().map(Vitals::life_percent)
    }

    /// Mana percentage, or `None` when vitals are unknown.
    #[must_use]
    pub fn mana_percent(&self) -> Option<f32> {
        self.vitals.as_ref().map(Vitals::mana_percent)
    }
}

/// Axis-aligned screen rectangle measured in pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ScreenRect {
    origin: Vec2,
    size: Vec2,
}

impl ScreenRect {
    /// Creates a rectangle from its top-left corner and size.
    #[must_use]
    pub const fn from_origin_and_size(origin: Vec2, size: Vec2) -> Self {
        Self { origin, size }
    }

    /// Top-left corner of the rectangle.
    #[must_use]
    pub const fn origin(&self) -> Vec2 {
        self.origin
    }

    /// Width and height of the rectangle.
    #[must_use]
    pub const fn size(&self) -> Vec2 {
        self.size
    }

    /// Reports whether the point lies inside the rectangle, edges included.
    #[must_use]
    pub fn contains(&self, point: Vec2) -> bool {
        let max = self.origin + self.size;
        point.x >= self.origin.x && point.x <= max.x && point.y >= self.origin.y && point.y <= max.y
    }
}

/// Host window placement and focus.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WindowState {
    /// Window rectangle in desktop coordinates.
    pub rect: ScreenRect,
    /// Whether the game window has input focus.
    pub focused: bool,
}

/// Camera projection supplied by the host.
pub trait CameraProjection {
    /// Projects a world position into window-relative screen space.
    ///
    /// Returns `None` when the position cannot be projected.
    fn world_to_screen(&self, world: Vec3) -> Option<Vec2>;
}

/// Projects a world position into desktop coordinates of the window.
#[must_use]
pub fn desktop_position(
    camera: &dyn CameraProjection,
    window: &WindowState,
    world: Vec3,
) -> Option<Vec2> {
    camera
        .world_to_screen(world)
        .map(|screen| screen + window.rect.origin())
}

/// Side effects systems ask the host to perform.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Command {
    /// Presses the bound key or clicks the bound mouse button.
    Press {
        /// Action to perform.
        action: BoundAction,
    },
    /// Moves the cursor to the provided desktop position.
    MoveCursor {
        /// Destination in desktop coordinates.
        position: Vec2,
    },
}

/// Monotonic elapsed-time counter advanced by tick deltas.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Cooldown {
    elapsed: Duration,
}

impl Cooldown {
    /// Creates a counter that just restarted.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            elapsed: Duration::ZERO,
        }
    }

    /// Adds the tick delta to the counter.
    pub fn advance(&mut self, dt: Duration) {
        self.elapsed = self.elapsed.saturating_add(dt);
    }

    /// Restarts the counter from zero.
    pub fn restart(&mut self) {
        self.elapsed = Duration::ZERO;
    }

    /// Time accumulated since the last restart.
    #[must_use]
    pub const fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Reports whether at least `threshold` elapsed since the last restart.
    #[must_use]
    pub fn is_ready(&self, threshold: Duration) -> bool {
        self.elapsed >= threshold
    }
}

/// Declarative predicate attached to a [`SkillRule`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkillCondition {
    /// Minimum number of matching monsters; zero disables the count check.
    pub min_monsters_in_range: u32,
    /// Radius around the player used by the count check.
    pub range: u32,
    /// Minimum time between two firings of the rule, in milliseconds.
    pub min_cooldown_ms: u64,
    /// Rarity requirement for counted monsters.
    pub rarity_filter: RarityFilter,
    /// Count monsters around the cursor instead of around the player.
    pub require_cursor_nearby: bool,
    /// Cursor radius in pixels.
    pub cursor_range: u32,
    /// Require a unique monster among the counted ones.
    pub only_if_boss_present: bool,
    /// Minimum effective life percentage; zero disables the check.
    pub min_life_percent: u32,
    /// Hold the rule while one of its deployed objects is nearby.
    pub skip_if_deployed_object_nearby: bool,
    /// Radius around the player used by the deployed object guard.
    pub deployed_object_range: u32,
    /// Path fragments identifying deployed objects the host cannot link to a skill.
    pub fallback_entity_path_contains: Vec<String>,
}

impl Default for SkillCondition {
    fn default() -> Self {
        Self {
            min_monsters_in_range: 1,
            range: 60,
            min_cooldown_ms: 0,
            rarity_filter: RarityFilter::Any,
            require_cursor_nearby: false,
            cursor_range: 120,
            only_if_boss_present: false,
            min_life_percent: 0,
            skip_if_deployed_object_nearby: false,
            deployed_object_range: 120,
            fallback_entity_path_contains: Vec::new(),
        }
    }
}

impl SkillCondition {
    /// Per-rule cooldown as a duration.
    #[must_use]
    pub const fn min_cooldown(&self) -> Duration {
        Duration::from_millis(self.min_cooldown_ms)
    }

    /// Radius used by the deployed object guard.
    ///
    /// Cursor-bound rules reuse the cursor radius.
    #[must_use]
    pub const fn deployed_radius(&self) -> u32 {
        if self.require_cursor_nearby {
            self.cursor_range
        } else {
            self.deployed_object_range
        }
    }
}

/// User-authored rule binding a skill to an action and a condition.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkillRule {
    /// Identifier of the skill; empty matches any skill.
    pub skill_id: String,
    /// Display name of the skill.
    pub skill_name: String,
    /// Key or mouse button pressed when the rule fires.
    pub key: KeyBinding,
    /// Condition gating the rule.
    pub condition: SkillCondition,
}

impl SkillRule {
    /// Creates a rule for the provided skill bound to `Q` with default conditions.
    #[must_use]
    pub fn for_skill(skill_id: impl Into<String>, skill_name: impl Into<String>) -> Self {
        Self {
            skill_id: skill_id.into(),
            skill_name: skill_name.into(),
            key: KeyBinding::bound(BoundAction::Key(VirtualKey::Q)),
            condition: SkillCondition::default(),
        }
    }
}

/// Ordered, user-editable list of rules. Order is evaluation priority.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<SkillRule>", into = "Vec<SkillRule>")]
pub struct RuleBook {
    entries: Vec<(RuleId, SkillRule)>,
    next_id: u32,
}

impl RuleBook {
    /// Creates an empty rule book.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a rule at the lowest priority, returning its identifier.
    pub fn push(&mut self, rule: SkillRule) -> RuleId {
        let id = RuleId::new(self.next_id);
        self.next_id += 1;
        self.entries.push((id, rule));
        id
    }

    /// Appends a default rule for the provided skill.
    pub fn add_for_skill(&mut self, skill_id: &str, skill_name: &str) -> RuleId {
        self.push(SkillRule::for_skill(skill_id, skill_name))
    }

    /// Removes the rule with the provided identifier.
    pub fn remove(&mut self, id: RuleId) -> Option<SkillRule> {
        let index = self.position(id)?;
        Some(self.entries.remove(index).1)
    }

    /// Swaps the rules at two positions. Out-of-range positions are ignored.
    pub fn swap(&mut self, a: usize, b: usize) -> bool {
        if a >= self.entries.len() || b >= self.entries.len() {
            return false;
        }
        self.entries.swap(a, b);
        true
    }

    /// Raises the priority of the rule at `index` by one.
    pub fn move_up(&mut self, index: usize) -> bool {
        index > 0 && self.swap(index, index - 1)
    }

    /// Lowers the priority of the rule at `index` by one.
    pub fn move_down(&mut self, index: usize) -> bool {
        index.checked_add(1).map_or(false, |next| self.swap(index, next))
    }

    /// Iterator over rules in priority order.
    pub fn iter(&self) -> impl Iterator<Item = (RuleId, &SkillRule)> {
        self.entries.iter().map(|(id, rule)| (*id, rule))
    }

    /// Looks up a rule by identifier.
    #[must_use]
    pub fn get(&self, id: RuleId) -> Option<&SkillRule> {
        self.position(id).map(|index| &self.entries[index].1)
    }

    /// Looks up a rule by identifier for editing.
    pub fn get_mut(&mut self, id: RuleId) -> Option<&mut SkillRule> {
        let index = self.position(id)?;
        Some(&mut self.entries[index].1)
    }

    /// Reports whether the book still contains the rule.
    #[must_use]
    pub fn contains(&self, id: RuleId) -> bool {
        self.position(id).is_some()
    }

    /// Number of rules in the book.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Reports whether the book holds no rules.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn position(&self, id: RuleId) -> Option<usize> {
        self.entries.iter().position(|(candidate, _)| *candidate == id)
    }
}

impl From<Vec<SkillRule>> for RuleBook {
    fn from(rules: Vec<SkillRule>) -> Self {
        let mut book = Self::new();
        for rule in rules {
            let _ = book.push(rule);
        }
        book
    }
}

impl From<RuleBook> for Vec<SkillRule> {
    fn from(book: RuleBook) -> Self {
        book.entries.into_iter().map(|(_, rule)| rule).collect()
    }
}
