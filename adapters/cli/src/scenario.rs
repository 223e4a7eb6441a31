//! Scripted host sessions replayed against the pilot.
//!
//! A scenario describes the window, an optional camera, the terrain of each
//! area and a list of frames. Frames only need to state what changed: the
//! host flags, cursor, focus, player and entities carry over from the
//! previous frame when omitted. Keys are scripted as bindings (`"RButton"`,
//! `"F5"`) and turned into aim flags with the configured aim bindings.

use std::{collections::BTreeMap, fs, path::Path, time::Duration};

use anyhow::{bail, Context, Result};
use glam::{Vec2, Vec3};
use rotation_assist_core::{
    BoundAction, CameraProjection, EntitySnapshot, EntityView, KeyBinding, PlayerSnapshot,
    ScreenRect, WindowState,
};
use rotation_assist_pilot::{HostState, SkillBarSlot};
use rotation_assist_system_line_of_sight::{GridDimensions, TerrainSource};
use serde::Deserialize;

const DEFAULT_DT_MS: u64 = 100;

/// Session script loaded from TOML.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct Scenario {
    window: WindowSpec,
    #[serde(default)]
    camera: Option<OrthographicCamera>,
    #[serde(default)]
    areas: BTreeMap<String, AreaSpec>,
    frames: Vec<FrameSpec>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct WindowSpec {
    #[serde(default)]
    origin: Vec2,
    size: Vec2,
    #[serde(default = "focused_by_default")]
    focused: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct AreaSpec {
    rows: Vec<Vec<i32>>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FrameSpec {
    #[serde(default = "default_dt_ms")]
    dt_ms: u64,
    #[serde(default = "single_tick")]
    repeat: u32,
    #[serde(default)]
    enter_area: Option<String>,
    #[serde(default)]
    host: Option<HostState>,
    #[serde(default)]
    held: Vec<KeyBinding>,
    #[serde(default)]
    pressed: Vec<KeyBinding>,
    #[serde(default)]
    focused: Option<bool>,
    #[serde(default)]
    cursor: Option<Vec2>,
    #[serde(default)]
    player: Option<PlayerSnapshot>,
    #[serde(default)]
    entities: Option<Vec<EntitySnapshot>>,
    #[serde(default)]
    skill_bar: Option<Vec<SkillBarSlot>>,
}

fn focused_by_default() -> bool {
    true
}

fn default_dt_ms() -> u64 {
    DEFAULT_DT_MS
}

fn single_tick() -> u32 {
    1
}

/// Camera projecting the world plane onto the window with a fixed scale.
#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct OrthographicCamera {
    /// Window position of the world origin.
    origin: Vec2,
    /// Pixels per world unit.
    scale: f32,
}

impl CameraProjection for OrthographicCamera {
    fn world_to_screen(&self, world: Vec3) -> Option<Vec2> {
        let screen = self.origin + world.truncate() * self.scale;
        screen.is_finite().then_some(screen)
    }
}

/// Terrain of the area the scripted player is in.
#[derive(Clone, Debug, Default)]
pub(crate) struct ScenarioTerrain {
    rows: Vec<Vec<i32>>,
}

impl TerrainSource for ScenarioTerrain {
    fn dimensions(&self) -> Option<GridDimensions> {
        let width = u32::try_from(self.rows.first()?.len()).ok()?;
        let height = u32::try_from(self.rows.len()).ok()?;
        Some(GridDimensions::new(width, height))
    }

    fn targeting_rows(&self) -> Option<&[Vec<i32>]> {
        (!self.rows.is_empty()).then_some(self.rows.as_slice())
    }
}

/// Area entered right before a tick.
#[derive(Debug)]
pub(crate) struct AreaEntry {
    pub(crate) name: String,
    pub(crate) terrain: ScenarioTerrain,
}

/// Fully resolved host state for a single tick.
#[derive(Debug)]
pub(crate) struct ScriptedTick {
    pub(crate) dt: Duration,
    pub(crate) entered: Option<AreaEntry>,
    pub(crate) host: HostState,
    pub(crate) held: Vec<BoundAction>,
    pub(crate) pressed: Vec<BoundAction>,
    pub(crate) window: WindowState,
    pub(crate) cursor: Vec2,
    pub(crate) player: Option<PlayerSnapshot>,
    pub(crate) entities: EntityView,
    pub(crate) skill_bar: Vec<SkillBarSlot>,
}

impl Scenario {
    /// Reads and parses a scenario file.
    pub(crate) fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read scenario at {}", path.display()))?;
        Self::parse(&contents)
            .with_context(|| format!("failed to load scenario at {}", path.display()))
    }

    /// Parses a scenario from TOML.
    pub(crate) fn parse(contents: &str) -> Result<Self> {
        let scenario: Self =
            toml::from_str(contents).context("failed to parse scenario toml contents")?;

        if scenario.frames.is_empty() {
            bail!("scenario contains no frames");
        }
        let size = scenario.window.size;
        if size.x <= 0.0 || size.y <= 0.0 {
            bail!("window size {size} must be positive");
        }
        for (name, area) in &scenario.areas {
            let width = area.rows.first().map_or(0, Vec::len);
            if area.rows.iter().any(|row| row.len() != width) {
                bail!("area `{name}` has rows of different lengths");
            }
        }
        for (index, frame) in scenario.frames.iter().enumerate() {
            if let Some(name) = &frame.enter_area {
                if !scenario.areas.contains_key(name) {
                    bail!("frame {index} enters unknown area `{name}`");
                }
            }
        }

        Ok(scenario)
    }

    /// Camera used for every tick, if the scenario defines one.
    pub(crate) const fn camera(&self) -> Option<&OrthographicCamera> {
        self.camera.as_ref()
    }

    /// Expands repeats and carries omitted state over from earlier frames.
    ///
    /// Area changes and key presses only apply to the first tick of a
    /// repeated frame. Held keys stay down for every repeat.
    pub(crate) fn ticks(&self) -> Vec<ScriptedTick> {
        let rect = ScreenRect::from_origin_and_size(self.window.origin, self.window.size);
        let mut host = HostState::default();
        let mut focused = self.window.focused;
        let mut cursor = rect.origin() + rect.size() * 0.5;
        let mut player: Option<PlayerSnapshot> = None;
        let mut entities: Vec<EntitySnapshot> = Vec::new();
        let mut skill_bar: Vec<SkillBarSlot> = Vec::new();
        let mut ticks = Vec::new();

        for frame in &self.frames {
            host = frame.host.unwrap_or(host);
            focused = frame.focused.unwrap_or(focused);
            cursor = frame.cursor.unwrap_or(cursor);
            if let Some(next) = &frame.player {
                player = Some(next.clone());
            }
            if let Some(next) = &frame.entities {
                entities.clone_from(next);
            }
            if let Some(next) = &frame.skill_bar {
                skill_bar.clone_from(next);
            }

            for repeat in 0..frame.repeat {
                let first = repeat == 0;
                let entered = frame
                    .enter_area
                    .as_ref()
                    .filter(|_| first)
                    .and_then(|name| {
                        let area = self.areas.get(name)?;
                        Some(AreaEntry {
                            name: name.clone(),
                            terrain: ScenarioTerrain {
                                rows: area.rows.clone(),
                            },
                        })
                    });
                let pressed = if first {
                    actions(&frame.pressed)
                } else {
                    Vec::new()
                };

                ticks.push(ScriptedTick {
                    dt: Duration::from_millis(frame.dt_ms),
                    entered,
                    host,
                    held: actions(&frame.held),
                    pressed,
                    window: WindowState { rect, focused },
                    cursor,
                    player: player.clone(),
                    entities: EntityView::from_snapshots(entities.clone()),
                    skill_bar: skill_bar.clone(),
                });
            }
        }

        ticks
    }
}

fn actions(bindings: &[KeyBinding]) -> Vec<BoundAction> {
    bindings.iter().filter_map(KeyBinding::action).collect()
}
