//! Hand-off of tick commands to the host's input layer.

use glam::Vec2;
use rotation_assist_core::{BoundAction, Command};

use crate::TickOutcome;

/// Host input layer receiving the pilot's commands.
pub trait ActionSink {
    /// Presses a key or clicks a mouse button.
    fn press(&mut self, action: BoundAction) -> Result<(), DispatchError>;

    /// Moves the cursor to a desktop position.
    fn move_cursor(&mut self, position: Vec2) -> Result<(), DispatchError>;
}

/// Failure reported by an [`ActionSink`].
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum DispatchError {
    /// The host refused the key press or click.
    #[error("host rejected input `{action}`: {reason}")]
    Press {
        /// Action that could not be performed.
        action: BoundAction,
        /// Host-provided reason.
        reason: String,
    },
    /// The host refused to move the cursor.
    #[error("host rejected cursor move to {position}: {reason}")]
    Cursor {
        /// Requested destination.
        position: Vec2,
        /// Host-provided reason.
        reason: String,
    },
}

/// Summary of a dispatch run.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DispatchReport {
    /// Commands the sink accepted.
    pub delivered: usize,
    /// Commands the sink rejected, in order.
    pub failures: Vec<DispatchError>,
}

impl DispatchReport {
    /// Reports whether every command was delivered.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Delivers the outcome's commands in order.
///
/// A rejected command is logged and recorded; the remaining commands are
/// still delivered.
pub fn dispatch(outcome: &TickOutcome, sink: &mut dyn ActionSink) -> DispatchReport {
    let mut report = DispatchReport::default();

    for command in outcome.commands() {
        let result = match *command {
            Command::Press { action } => sink.press(action),
            Command::MoveCursor { position } => sink.move_cursor(position),
        };

        match result {
            Ok(()) => report.delivered += 1,
            Err(error) => {
                tracing::warn!(%error, "failed to dispatch command");
                report.failures.push(error);
            }
        }
    }

    report
}
