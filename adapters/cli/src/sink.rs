//! Console stand-in for the host input layer.

use std::io::Write;

use glam::Vec2;
use rotation_assist_core::BoundAction;
use rotation_assist_pilot::{ActionSink, DispatchError, TickOutcome, TickStatus};

/// Writes every command and tick summary as a line of text.
#[derive(Debug)]
pub(crate) struct ConsoleSink<W> {
    out: W,
}

impl<W: Write> ConsoleSink<W> {
    /// Creates a sink writing to `out`.
    pub(crate) const fn new(out: W) -> Self {
        Self { out }
    }

    /// Prints the overlay line and rule firing of a tick.
    pub(crate) fn describe(&mut self, tick: usize, outcome: &TickOutcome) -> std::io::Result<()> {
        match outcome.status {
            TickStatus::Paused(reason) => {
                return writeln!(self.out, "tick {tick}: paused ({reason})");
            }
            TickStatus::Ran => writeln!(self.out, "tick {tick}: {}", outcome.stats)?,
        }

        if let Some(fired) = &outcome.fired {
            writeln!(self.out, "  fired {} [{}]", fired.skill_name, fired.action)?;
        }
        for press in &outcome.flasks {
            writeln!(self.out, "  {} flask at {:.0}%", press.kind, press.percent)?;
        }
        for report in outcome.effects.iter().filter(|report| report.count > 0) {
            writeln!(self.out, "  {report}")?;
        }
        Ok(())
    }

    /// Consumes the sink, returning the writer.
    #[cfg(test)]
    fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> ActionSink for ConsoleSink<W> {
    fn press(&mut self, action: BoundAction) -> Result<(), DispatchError> {
        writeln!(self.out, "  -> press {action}").map_err(|error| DispatchError::Press {
            action,
            reason: error.to_string(),
        })
    }

    fn move_cursor(&mut self, position: Vec2) -> Result<(), DispatchError> {
        writeln!(self.out, "  -> cursor {:.0},{:.0}", position.x, position.y).map_err(|error| {
            DispatchError::Cursor {
                position,
                reason: error.to_string(),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rotation_assist_core::{MouseButton, VirtualKey};
    use std::io;

    struct Closed;

    impl Write for Closed {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn writes_one_line_per_command() {
        let mut sink = ConsoleSink::new(Vec::new());
        sink.press(BoundAction::Key(VirtualKey::Q))
            .expect("vec writer never fails");
        sink.press(BoundAction::Mouse(MouseButton::Right))
            .expect("vec writer never fails");
        sink.move_cursor(Vec2::new(440.4, 419.6))
            .expect("vec writer never fails");

        let text = String::from_utf8(sink.into_inner()).expect("output is utf-8");
        assert_eq!(
            text,
            "  -> press Q\n  -> press RButton\n  -> cursor 440,420\n"
        );
    }

    #[test]
    fn write_failures_become_dispatch_errors() {
        let mut sink = ConsoleSink::new(Closed);
        let error = sink
            .press(BoundAction::Key(VirtualKey::SPACE))
            .expect_err("closed writer rejects presses");

        assert!(matches!(error, DispatchError::Press { .. }));
        assert!(error.to_string().contains("pipe closed"));
    }
}
