//! User configuration of the rotation pilot.

use std::{ops::RangeInclusive, time::Duration};

use rotation_assist_core::{KeyBinding, RuleBook, SkillCondition};
use rotation_assist_system_analytics::{default_trackers, EffectTracker};
use rotation_assist_system_flasks::FlaskSettings;
use serde::{Deserialize, Serialize};

/// Accepted aim assist engage ranges.
pub const ENGAGE_RANGE: RangeInclusive<u64> = 10..=200;
/// Accepted flask thresholds, in percent.
pub const FLASK_THRESHOLD: RangeInclusive<u64> = 1..=100;
/// Accepted flask cooldowns, in milliseconds.
pub const FLASK_COOLDOWN_MS: RangeInclusive<u64> = 250..=8_000;
/// Accepted global rule cooldowns, in milliseconds.
pub const GLOBAL_COOLDOWN_MS: RangeInclusive<u64> = 50..=1_000;

const RULE_MIN_MONSTERS: RangeInclusive<u64> = 0..=20;
const RULE_RANGE: RangeInclusive<u64> = 10..=150;
const RULE_MIN_LIFE: RangeInclusive<u64> = 0..=100;
const RULE_PIXEL_RADIUS: RangeInclusive<u64> = 20..=400;
const RULE_COOLDOWN_MS: RangeInclusive<u64> = 0..=10_000;

/// Configuration value outside its accepted range.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// A top-level setting is out of range.
    #[error("`{field}` must be within {min}..={max}, found {value}")]
    OutOfRange {
        /// Dotted setting name.
        field: &'static str,
        /// Offending value.
        value: u64,
        /// Lowest accepted value.
        min: u64,
        /// Highest accepted value.
        max: u64,
    },
    /// A skill rule condition is out of range.
    #[error("rule {index} (`{skill}`): `{field}` must be within {min}..={max}, found {value}")]
    RuleOutOfRange {
        /// Position of the rule in the book.
        index: usize,
        /// Skill name of the rule.
        skill: String,
        /// Condition field name.
        field: &'static str,
        /// Offending value.
        value: u64,
        /// Lowest accepted value.
        min: u64,
        /// Highest accepted value.
        max: u64,
    },
}

/// Top-level pilot configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PilotConfig {
    /// Master switch; nothing runs while disabled.
    pub enable: bool,
    /// Aim assist mode: caps the scan range and lets aim assist move the cursor.
    pub aim_assist_mode: bool,
    /// Aim assist settings.
    pub aim_assist: AimAssistConfig,
    /// Pause conditions.
    pub general: GeneralConfig,
    /// Flask automation.
    pub flasks: FlaskConfig,
    /// Skill rule automation.
    pub skill_rules: SkillRulesConfig,
    /// Overlay analytics.
    pub analytics: AnalyticsConfig,
}

impl Default for PilotConfig {
    fn default() -> Self {
        Self {
            enable: true,
            aim_assist_mode: false,
            aim_assist: AimAssistConfig::default(),
            general: GeneralConfig::default(),
            flasks: FlaskConfig::default(),
            skill_rules: SkillRulesConfig::default(),
            analytics: AnalyticsConfig::default(),
        }
    }
}

impl PilotConfig {
    /// Checks every ranged setting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check(
            "aim_assist.engage_range",
            u64::from(self.aim_assist.engage_range),
            ENGAGE_RANGE,
        )?;
        let flasks = [
            (
                "flasks.life.threshold_percent",
                "flasks.life.cooldown_ms",
                &self.flasks.life,
            ),
            (
                "flasks.mana.threshold_percent",
                "flasks.mana.cooldown_ms",
                &self.flasks.mana,
            ),
        ];
        for (threshold, cooldown, flask) in flasks {
            check(threshold, u64::from(flask.threshold_percent), FLASK_THRESHOLD)?;
            check(cooldown, flask.cooldown_ms, FLASK_COOLDOWN_MS)?;
        }
        check(
            "skill_rules.global_cooldown_ms",
            self.skill_rules.global_cooldown_ms,
            GLOBAL_COOLDOWN_MS,
        )?;

        for (index, (_, rule)) in self.skill_rules.rules.iter().enumerate() {
            check_condition(&rule.condition).map_err(|(field, value, range)| {
                ConfigError::RuleOutOfRange {
                    index,
                    skill: rule.skill_name.clone(),
                    field,
                    value,
                    min: *range.start(),
                    max: *range.end(),
                }
            })?;
        }

        Ok(())
    }

    /// Scan range cap: the engage range in aim assist mode, unbounded otherwise.
    #[must_use]
    pub fn scan_range(&self) -> Option<f32> {
        self.aim_assist_mode
            .then(|| self.aim_assist.engage_range as f32)
    }
}

/// Aim assist settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AimAssistConfig {
    /// Maximum distance of aim targets and scanned monsters.
    pub engage_range: u32,
    /// Key held to aim. See [`InputState::from_keys`](crate::InputState::from_keys).
    pub aim_key: KeyBinding,
    /// Key toggling aim on and off.
    pub toggle_key: KeyBinding,
}

impl Default for AimAssistConfig {
    fn default() -> Self {
        Self {
            engage_range: 75,
            aim_key: KeyBinding::UNBOUND,
            toggle_key: KeyBinding::UNBOUND,
        }
    }
}

/// Conditions under which the pilot pauses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Keep running in town.
    pub run_in_town: bool,
    /// Only act while the game window is focused.
    pub require_game_focus: bool,
    /// Pause while the escape menu is open.
    pub pause_on_escape_state: bool,
    /// Pause while large or side panels are open.
    pub pause_when_panels_open: bool,
    /// Pause while the chat is open.
    pub pause_when_chat_open: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            run_in_town: false,
            require_game_focus: true,
            pause_on_escape_state: true,
            pause_when_panels_open: true,
            pause_when_chat_open: true,
        }
    }
}

/// Life and mana flask triggers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlaskConfig {
    /// Life flask trigger.
    pub life: FlaskSettings,
    /// Mana flask trigger.
    pub mana: FlaskSettings,
}

impl Default for FlaskConfig {
    fn default() -> Self {
        Self {
            life: FlaskSettings::life(),
            mana: FlaskSettings::mana(),
        }
    }
}

/// Skill rule automation settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkillRulesConfig {
    /// Rules are evaluated.
    pub enable: bool,
    /// Minimum time between two rule firings, in milliseconds.
    pub global_cooldown_ms: u64,
    /// Rules in priority order.
    pub rules: RuleBook,
}

impl Default for SkillRulesConfig {
    fn default() -> Self {
        Self {
            enable: true,
            global_cooldown_ms: 150,
            rules: RuleBook::new(),
        }
    }
}

impl SkillRulesConfig {
    /// Global cooldown as a duration.
    #[must_use]
    pub const fn global_cooldown(&self) -> Duration {
        Duration::from_millis(self.global_cooldown_ms)
    }
}

/// Overlay analytics settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    /// Ground effects reported on the overlay.
    pub trackers: Vec<EffectTracker>,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            trackers: default_trackers(),
        }
    }
}

fn check(field: &'static str, value: u64, range: RangeInclusive<u64>) -> Result<(), ConfigError> {
    if range.contains(&value) {
        return Ok(());
    }
    Err(ConfigError::OutOfRange {
        field,
        value,
        min: *range.start(),
        max: *range.end(),
    })
}

type FieldViolation = (&'static str, u64, RangeInclusive<u64>);

fn check_condition(condition: &SkillCondition) -> Result<(), FieldViolation> {
    let fields = [
        (
            "min_monsters_in_range",
            u64::from(condition.min_monsters_in_range),
            RULE_MIN_MONSTERS,
        ),
        ("range", u64::from(condition.range), RULE_RANGE),
        ("min_cooldown_ms", condition.min_cooldown_ms, RULE_COOLDOWN_MS),
        ("cursor_range", u64::from(condition.cursor_range), RULE_PIXEL_RADIUS),
        ("min_life_percent", u64::from(condition.min_life_percent), RULE_MIN_LIFE),
        (
            "deployed_object_range",
            u64::from(condition.deployed_object_range),
            RULE_PIXEL_RADIUS,
        ),
    ];

    match fields
        .into_iter()
        .find(|(_, value, range)| !range.contains(value))
    {
        Some(violation) => Err(violation),
        None => Ok(()),
    }
}
