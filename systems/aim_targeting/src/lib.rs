#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure system that picks the aim assist target and requests cursor moves.

use glam::Vec2;
use rotation_assist_core::{
    desktop_position, CameraProjection, Command, EntitySnapshot, WindowState,
};
use rotation_assist_system_line_of_sight::Raycaster;

/// Input state driving aim assist for one tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AimControls {
    /// Aim assist mode is selected in the configuration.
    pub mode_enabled: bool,
    /// The hold key is currently down.
    pub hold_pressed: bool,
    /// The toggle key was pressed since the previous tick.
    pub toggle_pressed: bool,
    /// Another plugin currently owns the cursor.
    pub cursor_locked: bool,
}

/// Target chosen by aim assist along with the cursor destination, if any.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AimDecision<'a> {
    /// Nearest visible attackable monster.
    pub target: &'a EntitySnapshot,
    /// Desktop position the cursor is moved to; `None` when the target does
    /// not project inside the window.
    pub cursor: Option<Vec2>,
}

/// Aim targeting system that reuses a scratch buffer of candidates.
#[derive(Debug, Default)]
pub struct AimTargeting {
    candidates: Vec<Candidate>,
    toggled: bool,
}

impl AimTargeting {
    /// Creates a new aim targeting system with the toggle released.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reports whether the toggle is latched.
    #[must_use]
    pub const fn is_toggled(&self) -> bool {
        self.toggled
    }

    /// Flips the toggle when the toggle key was pressed in aim assist mode.
    pub fn update_toggle(&mut self, controls: &AimControls) {
        if controls.mode_enabled && controls.toggle_pressed {
            self.toggled = !self.toggled;
            tracing::debug!(toggled = self.toggled, "aim assist toggled");
        }
    }

    /// Reports whether aim assist should act this tick.
    #[must_use]
    pub fn is_engaged(&self, controls: &AimControls) -> bool {
        controls.mode_enabled && (controls.hold_pressed || self.toggled)
    }

    /// Selects the nearest attackable monster the observer can see.
    ///
    /// Monsters beyond `engage_range` or without a finite distance are
    /// ignored. Equidistant monsters resolve to the first one in host order.
    pub fn select<'a>(
        &mut self,
        monsters: &[&'a EntitySnapshot],
        raycaster: &Raycaster,
        engage_range: Option<f32>,
    ) -> Option<&'a EntitySnapshot> {
        self.candidates.clear();
        self.candidates.reserve(monsters.len());

        for (order, monster) in monsters.iter().enumerate() {
            if !monster.is_attackable() || !monster.distance.is_finite() {
                continue;
            }
            if engage_range.map_or(false, |range| monster.distance > range) {
                continue;
            }
            self.candidates.push(Candidate {
                order,
                distance: monster.distance,
            });
        }

        let mut best: Option<Candidate> = None;
        for candidate in &self.candidates {
            if !raycaster.is_visible(monsters[candidate.order].grid) {
                continue;
            }

            match &mut best {
                Some(existing) => {
                    if candidate.precedes(existing) {
                        *existing = *candidate;
                    }
                }
                None => best = Some(*candidate),
            }
        }

        best.map(|candidate| monsters[candidate.order])
    }

    /// Picks a target and pushes `Command::MoveCursor` when aim assist is engaged.
    ///
    /// Nothing is selected while aim assist is idle or another plugin holds
    /// the cursor.
    #[allow(clippy::too_many_arguments)]
    pub fn handle<'a>(
        &mut self,
        controls: &AimControls,
        monsters: &[&'a EntitySnapshot],
        raycaster: &Raycaster,
        engage_range: Option<f32>,
        camera: Option<&dyn CameraProjection>,
        window: &WindowState,
        out: &mut Vec<Command>,
    ) -> Option<AimDecision<'a>> {
        if !self.is_engaged(controls) || controls.cursor_locked || monsters.is_empty() {
            return None;
        }

        let target = self.select(monsters, raycaster, engage_range)?;
        let cursor = camera.and_then(|camera| cursor_destination(camera, window, target));
        if let Some(position) = cursor {
            out.push(Command::MoveCursor { position });
        }

        Some(AimDecision { target, cursor })
    }
}

/// Desktop position of the target when it projects inside the window, edges included.
#[must_use]
pub fn cursor_destination(
    camera: &dyn CameraProjection,
    window: &WindowState,
    target: &EntitySnapshot,
) -> Option<Vec2> {
    desktop_position(camera, window, target.world)
        .filter(|position| window.rect.contains(*position))
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Candidate {
    order: usize,
    distance: f32,
}

impl Candidate {
    fn precedes(&self, other: &Self) -> bool {
        if self.distance != other.distance {
            return self.distance < other.distance;
        }

        self.order < other.order
    }
}
