//! Key and mouse button bindings as written in rule and flask configuration.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Error returned when a binding name cannot be understood.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("unknown key binding `{0}`")]
pub struct KeyParseError(pub String);

/// Windows virtual-key code of a keyboard key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VirtualKey(u16);

impl VirtualKey {
    /// The `Q` key, default binding for new rules.
    pub const Q: Self = Self(0x51);
    /// The space bar.
    pub const SPACE: Self = Self(0x20);

    /// Wraps a raw virtual-key code.
    #[must_use]
    pub const fn new(code: u16) -> Self {
        Self(code)
    }

    /// Raw virtual-key code.
    #[must_use]
    pub const fn code(&self) -> u16 {
        self.0
    }
}

/// Mouse buttons a binding can click.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MouseButton {
    /// Primary button.
    Left,
    /// Secondary button.
    Right,
    /// Wheel button.
    Middle,
}

/// Input performed when a rule or flask fires.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BoundAction {
    /// Press and release a keyboard key.
    Key(VirtualKey),
    /// Click a mouse button.
    Mouse(MouseButton),
}

const NAMED_KEYS: &[(&str, u16)] = &[
    ("Back", 0x08),
    ("Tab", 0x09),
    ("Enter", 0x0D),
    ("ShiftKey", 0x10),
    ("ControlKey", 0x11),
    ("Menu", 0x12),
    ("Escape", 0x1B),
    ("Space", 0x20),
    ("Left", 0x25),
    ("Up", 0x26),
    ("Right", 0x27),
    ("Down", 0x28),
];

impl FromStr for BoundAction {
    type Err = KeyParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        let unknown = || KeyParseError(trimmed.to_owned());

        match trimmed {
            "LButton" => return Ok(Self::Mouse(MouseButton::Left)),
            "RButton" => return Ok(Self::Mouse(MouseButton::Right)),
            "MButton" => return Ok(Self::Mouse(MouseButton::Middle)),
            _ => {}
        }

        if let Some(&(_, code)) = NAMED_KEYS
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(trimmed))
        {
            return Ok(Self::Key(VirtualKey::new(code)));
        }

        if let Some(hex) = trimmed.strip_prefix("0x") {
            let code = u16::from_str_radix(hex, 16).map_err(|_| unknown())?;
            return Ok(Self::Key(VirtualKey::new(code)));
        }

        let bytes = trimmed.as_bytes();
        match bytes {
            [letter] if letter.is_ascii_alphabetic() => Ok(Self::Key(VirtualKey::new(u16::from(
                letter.to_ascii_uppercase(),
            )))),
            [b'D', digit] if digit.is_ascii_digit() => {
                Ok(Self::Key(VirtualKey::new(u16::from(*digit))))
            }
            _ => {
                if let Some(number) = trimmed.strip_prefix("NumPad") {
                    let index: u16 = number.parse().map_err(|_| unknown())?;
                    if index <= 9 {
                        return Ok(Self::Key(VirtualKey::new(0x60 + index)));
                    }
                }
                if let Some(number) = trimmed.strip_prefix('F') {
                    let index: u16 = number.parse().map_err(|_| unknown())?;
                    if (1..=24).contains(&index) {
                        return Ok(Self::Key(VirtualKey::new(0x70 + index - 1)));
                    }
                }
                Err(unknown())
            }
        }
    }
}

impl fmt::Display for BoundAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let key = match self {
            Self::Mouse(MouseButton::Left) => return f.write_str("LButton"),
            Self::Mouse(MouseButton::Right) => return f.write_str("RButton"),
            Self::Mouse(MouseButton::Middle) => return f.write_str("MButton"),
            Self::Key(key) => key.code(),
        };

        if let Some((name, _)) = NAMED_KEYS.iter().find(|(_, code)| *code == key) {
            return f.write_str(name);
        }

        match key {
            0x30..=0x39 => write!(f, "D{}", key - 0x30),
            0x41..=0x5A => write!(f, "{}", char::from(key as u8)),
            0x60..=0x69 => write!(f, "NumPad{}", key - 0x60),
            0x70..=0x87 => write!(f, "F{}", key - 0x70 + 1),
            _ => write!(f, "0x{key:02X}"),
        }
    }
}

/// Optional binding as stored in configuration; `"None"` leaves it unbound.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct KeyBinding(Option<BoundAction>);

impl KeyBinding {
    /// Binding that never fires.
    pub const UNBOUND: Self = Self(None);

    /// Binding to the provided action.
    #[must_use]
    pub const fn bound(action: BoundAction) -> Self {
        Self(Some(action))
    }

    /// Bound action, if any.
    #[must_use]
    pub const fn action(&self) -> Option<BoundAction> {
        self.0
    }
}

impl FromStr for KeyBinding {
    type Err = KeyParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("none") {
            return Ok(Self::UNBOUND);
        }
        trimmed.parse().map(Self::bound)
    }
}

impl TryFrom<String> for KeyBinding {
    type Error = KeyParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<KeyBinding> for String {
    fn from(binding: KeyBinding) -> Self {
        binding.to_string()
    }
}

impl fmt::Display for KeyBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(action) => action.fmt(f),
            None => f.write_str("None"),
        }
    }
}
