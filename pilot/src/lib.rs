#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Per-tick orchestration of the rotation assist systems.
//!
//! A [`Pilot`] owns every system and its timers. Each host tick is gated,
//! then runs flask automation, aim assist, the rule scheduler and overlay
//! analytics in that order. Everything the host must do is returned in a
//! [`TickOutcome`]; [`dispatch`] hands those commands to an [`ActionSink`].

mod config;
mod dispatch;
mod skill_bar;

use std::{fmt, time::Duration};

use glam::Vec2;
use rotation_assist_core::{
    BoundAction, CameraProjection, Command, EntityId, EntityView, KeyBinding, PlayerSnapshot,
    RuleBook, RuleId, WindowState,
};
use rotation_assist_system_aim_targeting::{AimControls, AimTargeting};
use rotation_assist_system_analytics::{Analytics, CursorProbe, EffectReport, OverlayStats};
use rotation_assist_system_conditions::Scene;
use rotation_assist_system_flasks::{FlaskAutomation, FlaskPress};
use rotation_assist_system_line_of_sight::{Raycaster, TerrainSource};
use rotation_assist_system_rule_scheduler::{FiredRule, RuleScheduler};
use serde::{Deserialize, Serialize};

pub use config::{
    AimAssistConfig, AnalyticsConfig, ConfigError, FlaskConfig, GeneralConfig, PilotConfig,
    SkillRulesConfig, ENGAGE_RANGE, FLASK_COOLDOWN_MS, FLASK_THRESHOLD, GLOBAL_COOLDOWN_MS,
};
pub use dispatch::{dispatch, ActionSink, DispatchError, DispatchReport};
pub use skill_bar::{SkillBarCache, SkillBarEntry, SkillBarSlot};

/// Game state flags the host reports every tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostState {
    /// A character is in the game world.
    pub in_game: bool,
    /// An area is loading.
    pub loading: bool,
    /// The escape menu is open.
    pub escape_state: bool,
    /// A large, fullscreen or side panel is open.
    pub panels_open: bool,
    /// The chat is open.
    pub chat_open: bool,
    /// The current area is a town.
    pub in_town: bool,
    /// Another plugin currently owns the cursor.
    pub cursor_locked: bool,
}

/// User input flags sampled for the tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputState {
    /// The aim hold key is down.
    pub aim_hold: bool,
    /// The aim toggle key was pressed since the previous tick.
    pub aim_toggle_pressed: bool,
}

impl InputState {
    /// Samples the aim flags from the actions the host reports as held and
    /// newly pressed, using the configured aim bindings.
    ///
    /// Unbound keys never register.
    #[must_use]
    pub fn from_keys(aim: &AimAssistConfig, held: &[BoundAction], pressed: &[BoundAction]) -> Self {
        let is_down = |binding: KeyBinding, keys: &[BoundAction]| {
            binding.action().map_or(false, |action| keys.contains(&action))
        };

        Self {
            aim_hold: is_down(aim.aim_key, held),
            aim_toggle_pressed: is_down(aim.toggle_key, pressed),
        }
    }
}

/// Everything the host provides for one tick.
#[derive(Clone, Copy)]
pub struct TickInput<'a> {
    /// Time elapsed since the previous tick.
    pub dt: Duration,
    /// Game state flags.
    pub host: HostState,
    /// User input flags.
    pub input: InputState,
    /// Window placement and focus.
    pub window: WindowState,
    /// Cursor position in desktop coordinates.
    pub cursor: Vec2,
    /// The local player, when the host has one.
    pub player: Option<&'a PlayerSnapshot>,
    /// Every entity the host reports.
    pub entities: &'a EntityView,
    /// Skills shown on the UI skill bar.
    pub skill_bar: &'a [SkillBarSlot],
    /// Camera projection, when available.
    pub camera: Option<&'a dyn CameraProjection>,
}

impl fmt::Debug for TickInput<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TickInput")
            .field("dt", &self.dt)
            .field("host", &self.host)
            .field("input", &self.input)
            .field("window", &self.window)
            .field("cursor", &self.cursor)
            .field("player", &self.player.is_some())
            .field("entities", &self.entities.len())
            .field("camera", &self.camera.is_some())
            .finish()
    }
}

/// Reason a tick was skipped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PauseReason {
    /// The pilot is disabled.
    Disabled,
    /// No character is in the game world.
    NotInGame,
    /// An area is loading.
    Loading,
    /// The game window lost focus.
    Unfocused,
    /// The escape menu is open.
    EscapeState,
    /// A panel is open.
    PanelsOpen,
    /// The chat is open.
    ChatOpen,
    /// The player is in town.
    InTown,
    /// The host reported no player.
    NoPlayer,
}

impl fmt::Display for PauseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Disabled => "disabled",
            Self::NotInGame => "not in game",
            Self::Loading => "loading",
            Self::Unfocused => "window unfocused",
            Self::EscapeState => "escape menu open",
            Self::PanelsOpen => "panels open",
            Self::ChatOpen => "chat open",
            Self::InTown => "in town",
            Self::NoPlayer => "no player",
        };
        f.write_str(label)
    }
}

/// Whether a tick ran.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TickStatus {
    /// Every system ran.
    Ran,
    /// The tick was skipped.
    Paused(PauseReason),
}

/// Result of one tick.
#[derive(Clone, Debug, PartialEq)]
pub struct TickOutcome {
    /// Whether the tick ran.
    pub status: TickStatus,
    /// Rule fired during the tick.
    pub fired: Option<FiredRule>,
    /// Current aim target: the aim assist pick, else the first scanned monster.
    pub aim_target: Option<EntityId>,
    /// Cursor destination requested by aim assist.
    pub cursor_move: Option<Vec2>,
    /// Flask presses requested during the tick.
    pub flasks: Vec<FlaskPress>,
    /// Monster statistics.
    pub stats: OverlayStats,
    /// Effect tracker reports.
    pub effects: Vec<EffectReport>,
    commands: Vec<Command>,
}

impl TickOutcome {
    fn paused(reason: PauseReason) -> Self {
        Self {
            status: TickStatus::Paused(reason),
            fired: None,
            aim_target: None,
            cursor_move: None,
            flasks: Vec::new(),
            stats: OverlayStats::default(),
            effects: Vec::new(),
            commands: Vec::new(),
        }
    }

    /// Commands for the host in execution order: flasks, cursor move, rule press.
    #[must_use]
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Reports whether the tick was skipped.
    #[must_use]
    pub const fn is_paused(&self) -> bool {
        matches!(self.status, TickStatus::Paused(_))
    }
}

/// Rotation pilot owning every system and the current area's terrain source.
#[derive(Debug)]
pub struct Pilot<T> {
    config: PilotConfig,
    terrain: T,
    raycaster: Raycaster,
    scheduler: RuleScheduler,
    flasks: FlaskAutomation,
    aim: AimTargeting,
    analytics: Analytics,
    skill_bar: SkillBarCache,
}

impl<T: TerrainSource> Pilot<T> {
    /// Creates a pilot for the provided configuration and terrain source.
    pub fn new(config: PilotConfig, terrain: T) -> Self {
        let mut pilot = Self {
            config,
            terrain,
            raycaster: Raycaster::new(),
            scheduler: RuleScheduler::new(),
            flasks: FlaskAutomation::new(),
            aim: AimTargeting::new(),
            analytics: Analytics::new(),
            skill_bar: SkillBarCache::new(),
        };
        if let Err(error) = pilot.raycaster.load_from(&pilot.terrain) {
            tracing::debug!(%error, "terrain not ready yet");
        }
        pilot
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &PilotConfig {
        &self.config
    }

    /// Configuration for editing between ticks.
    pub fn config_mut(&mut self) -> &mut PilotConfig {
        &mut self.config
    }

    /// Rules in priority order.
    #[must_use]
    pub const fn rules(&self) -> &RuleBook {
        &self.config.skill_rules.rules
    }

    /// Rules for editing between ticks.
    pub fn rules_mut(&mut self) -> &mut RuleBook {
        &mut self.config.skill_rules.rules
    }

    /// Skills offered for new rules, refreshed every tick.
    #[must_use]
    pub fn skill_bar(&self) -> &[SkillBarEntry] {
        self.skill_bar.entries()
    }

    /// Appends a default rule for the cached skill bar entry at `index`.
    pub fn add_rule_for_slot(&mut self, index: usize) -> Option<RuleId> {
        let entry = self.skill_bar.entries().get(index)?;
        Some(
            self.config
                .skill_rules
                .rules
                .add_for_skill(&entry.skill_id, &entry.label),
        )
    }

    /// Line-of-sight oracle of the current area.
    #[must_use]
    pub const fn raycaster(&self) -> &Raycaster {
        &self.raycaster
    }

    /// Terrain source of the current area.
    pub fn terrain_mut(&mut self) -> &mut T {
        &mut self.terrain
    }

    /// Restarts timers, clears statistics and reloads the terrain grid.
    pub fn on_area_changed(&mut self) {
        self.flasks.restart();
        self.scheduler.restart();
        self.analytics.clear();
        if let Err(error) = self.raycaster.load_from(&self.terrain) {
            tracing::warn!(%error, "failed to load terrain grid; keeping previous grid");
        }
    }

    /// Runs one tick.
    ///
    /// Timers advance by `dt` even when the tick ends up paused or the
    /// pilot is disabled.
    pub fn on_tick(&mut self, input: &TickInput<'_>) -> TickOutcome {
        self.scheduler.advance(input.dt);
        self.flasks.advance(input.dt);

        if !self.config.enable {
            return TickOutcome::paused(PauseReason::Disabled);
        }

        let controls = AimControls {
            mode_enabled: self.config.aim_assist_mode,
            hold_pressed: input.input.aim_hold,
            toggle_pressed: input.input.aim_toggle_pressed,
            cursor_locked: input.host.cursor_locked,
        };
        self.aim.update_toggle(&controls);

        if let Some(reason) = self.pause_reason(input) {
            tracing::trace!(%reason, "tick paused");
            return TickOutcome::paused(reason);
        }
        let Some(player) = input.player else {
            return TickOutcome::paused(PauseReason::NoPlayer);
        };

        if !self.raycaster.has_grid() {
            if let Err(error) = self.raycaster.load_from(&self.terrain) {
                tracing::trace!(%error, "terrain still unavailable");
            }
        }
        self.raycaster.set_observer(player.grid);

        let scan_range = self.config.scan_range();
        let monsters = input.entities.hostile_monsters(scan_range);
        let life_percent = player.life_percent();
        let mut commands = Vec::new();

        let mut flasks = Vec::new();
        self.flasks.handle(
            &self.config.flasks.life,
            &self.config.flasks.mana,
            life_percent,
            player.mana_percent(),
            &mut flasks,
        );
        commands.extend(flasks.iter().map(FlaskPress::command));

        let aim = self.aim.handle(
            &controls,
            &monsters,
            &self.raycaster,
            scan_range,
            input.camera,
            &input.window,
            &mut commands,
        );
        let cursor_move = aim.and_then(|decision| decision.cursor);
        let aim_target = aim
            .map(|decision| decision.target)
            .or_else(|| monsters.first().copied());
        let cursor = cursor_move.unwrap_or(input.cursor);

        let scene = Scene {
            monsters: &monsters,
            entities: input.entities,
            player,
            life_percent,
            cursor,
            window: input.window,
            camera: input.camera,
            require_focus: self.config.general.require_game_focus,
        };
        let fired = self.scheduler.handle(
            self.config.skill_rules.enable,
            self.config.skill_rules.global_cooldown(),
            &self.config.skill_rules.rules,
            &scene,
            &mut commands,
        );

        self.skill_bar.refresh(input.skill_bar, &player.skills);
        self.analytics.record_monsters(&monsters, aim_target);
        self.analytics.track_effects(
            input.entities,
            &self.config.analytics.trackers,
            &CursorProbe {
                camera: input.camera,
                window: input.window,
                cursor,
            },
        );

        TickOutcome {
            status: TickStatus::Ran,
            fired,
            aim_target: aim_target.map(|target| target.id),
            cursor_move,
            flasks,
            stats: self.analytics.stats(),
            effects: self.analytics.reports().to_vec(),
            commands,
        }
    }

    fn pause_reason(&self, input: &TickInput<'_>) -> Option<PauseReason> {
        let host = &input.host;
        let general = &self.config.general;

        if !host.in_game {
            Some(PauseReason::NotInGame)
        } else if host.loading {
            Some(PauseReason::Loading)
        } else if general.require_game_focus && !input.window.focused {
            Some(PauseReason::Unfocused)
        } else if general.pause_on_escape_state && host.escape_state {
            Some(PauseReason::EscapeState)
        } else if general.pause_when_panels_open && host.panels_open {
            Some(PauseReason::PanelsOpen)
        } else if general.pause_when_chat_open && host.chat_open {
            Some(PauseReason::ChatOpen)
        } else if !general.run_in_town && host.in_town {
            Some(PauseReason::InTown)
        } else {
            None
        }
    }
}
