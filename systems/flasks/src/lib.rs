#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure system that presses life and mana flasks below configured thresholds.
//!
//! Both flasks share one timer: any press restarts it, and each flask waits
//! for its own cooldown measured against that shared timer. Life is checked
//! before mana.

use std::{fmt, time::Duration};

use rotation_assist_core::{BoundAction, Command, Cooldown, KeyBinding};
use serde::{Deserialize, Serialize};

/// Trigger settings of one flask.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlaskSettings {
    /// The flask is automated.
    pub enabled: bool,
    /// Key pressed to drink the flask.
    pub key: KeyBinding,
    /// Pool percentage at or below which the flask is used.
    pub threshold_percent: u32,
    /// Minimum time since the last flask press, in milliseconds.
    pub cooldown_ms: u64,
}

impl FlaskSettings {
    /// Default life flask trigger.
    #[must_use]
    pub const fn life() -> Self {
        Self {
            enabled: false,
            key: KeyBinding::UNBOUND,
            threshold_percent: 55,
            cooldown_ms: 1_200,
        }
    }

    /// Default mana flask trigger.
    #[must_use]
    pub const fn mana() -> Self {
        Self {
            threshold_percent: 30,
            ..Self::life()
        }
    }

    /// Cooldown as a duration.
    #[must_use]
    pub const fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }

    fn triggers(&self, percent: Option<f32>, timer: &Cooldown) -> Option<(BoundAction, f32)> {
        if !self.enabled {
            return None;
        }
        let action = self.key.action()?;
        let percent = percent.filter(|value| *value > 0.0)?;
        if percent > self.threshold_percent as f32 || !timer.is_ready(self.cooldown()) {
            return None;
        }
        Some((action, percent))
    }
}

impl Default for FlaskSettings {
    fn default() -> Self {
        Self::life()
    }
}

/// Pool a flask restores.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlaskKind {
    /// Life and energy shield.
    Life,
    /// Mana.
    Mana,
}

impl fmt::Display for FlaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Life => f.write_str("life"),
            Self::Mana => f.write_str("mana"),
        }
    }
}

/// Flask press requested during a tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FlaskPress {
    /// Pool the flask restores.
    pub kind: FlaskKind,
    /// Action the host must perform.
    pub action: BoundAction,
    /// Pool percentage that triggered the press.
    pub percent: f32,
}

impl FlaskPress {
    /// Command asking the host to perform the press.
    #[must_use]
    pub const fn command(&self) -> Command {
        Command::Press {
            action: self.action,
        }
    }
}

/// Flask automation owning the shared flask timer.
#[derive(Debug, Default)]
pub struct FlaskAutomation {
    timer: Cooldown,
}

impl FlaskAutomation {
    /// Creates the system with a freshly restarted timer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Advances the shared timer by the tick delta.
    pub fn advance(&mut self, dt: Duration) {
        self.timer.advance(dt);
    }

    /// Restarts the shared timer, e.g. after an area change.
    pub fn restart(&mut self) {
        self.timer.restart();
    }

    /// Checks the life flask, then the mana flask, appending presses to `out`.
    ///
    /// Unknown or non-positive percentages never trigger a flask.
    pub fn handle(
        &mut self,
        life: &FlaskSettings,
        mana: &FlaskSettings,
        life_percent: Option<f32>,
        mana_percent: Option<f32>,
        out: &mut Vec<FlaskPress>,
    ) {
        let checks = [
            (FlaskKind::Life, life, life_percent),
            (FlaskKind::Mana, mana, mana_percent),
        ];

        for (kind, settings, percent) in checks {
            if let Some((action, percent)) = settings.triggers(percent, &self.timer) {
                self.timer.restart();
                tracing::debug!(%kind, percent, "flask pressed");
                out.push(FlaskPress {
                    kind,
                    action,
                    percent,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rotation_assist_core::VirtualKey;

    fn armed(threshold_percent: u32, cooldown_ms: u64, key: u16) -> FlaskSettings {
        FlaskSettings {
            enabled: true,
            key: KeyBinding::bound(BoundAction::Key(VirtualKey::new(key))),
            threshold_percent,
            cooldown_ms,
        }
    }

    fn ready_system() -> FlaskAutomation {
        let mut system = FlaskAutomation::new();
        system.advance(Duration::from_secs(10));
        system
    }

    #[test]
    fn life_flask_fires_at_threshold() {
        let mut system = ready_system();
        let mut out = Vec::new();

        system.handle(
            &armed(55, 1_200, 0x31),
            &FlaskSettings::mana(),
            Some(55.0),
            Some(100.0),
            &mut out,
        );

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].kind, FlaskKind::Life);
        assert_eq!(
            out[0].command(),
            Command::Press {
                action: BoundAction::Key(VirtualKey::new(0x31))
            }
        );
    }

    #[test]
    fn unknown_or_empty_pools_never_trigger() {
        let mut system = ready_system();
        let mut out = Vec::new();
        let life = armed(55, 1_200, 0x31);
        let mana = armed(30, 1_200, 0x32);

        system.handle(&life, &mana, None, None, &mut out);
        system.handle(&life, &mana, Some(0.0), Some(0.0), &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn disabled_or_unbound_flasks_are_ignored() {
        let mut system = ready_system();
        let mut out = Vec::new();
        let mut unbound = armed(55, 1_200, 0x31);
        unbound.key = KeyBinding::UNBOUND;
        let mut disabled = armed(30, 1_200, 0x32);
        disabled.enabled = false;

        system.handle(&unbound, &disabled, Some(10.0), Some(10.0), &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn flasks_share_one_timer() {
        let mut system = ready_system();
        let mut out = Vec::new();
        let life = armed(55, 1_000, 0x31);
        let mana = armed(30, 500, 0x32);

        system.handle(&life, &mana, Some(20.0), Some(10.0), &mut out);
        assert_eq!(out.len(), 1, "life press restarts the shared timer");
        assert_eq!(out[0].kind, FlaskKind::Life);

        system.advance(Duration::from_millis(500));
        system.handle(&life, &mana, Some(20.0), Some(10.0), &mut out);
        assert_eq!(out.len(), 2);
        assert_eq!(out[1].kind, FlaskKind::Mana);

        system.advance(Duration::from_millis(900));
        system.handle(&life, &mana, Some(20.0), Some(80.0), &mut out);
        assert_eq!(out.len(), 2, "life waits for its own cooldown");

        system.advance(Duration::from_millis(100));
        system.handle(&life, &mana, Some(20.0), Some(80.0), &mut out);
        assert_eq!(out.len(), 3);
        assert_eq!(out[2].kind, FlaskKind::Life);
    }

    #[test]
    fn restart_delays_next_press() {
        let mut system = ready_system();
        system.restart();
        let mut out = Vec::new();

        system.handle(
            &armed(55, 250, 0x31),
            &FlaskSettings::mana(),
            Some(5.0),
            None,
            &mut out,
        );
        assert!(out.is_empty());
    }
}
