//! Input sequencing: turns held keys into numbered commands.

use shared::{InputCommand, Symbol};

/// Assigns monotonically increasing sequence numbers to outgoing commands.
pub struct InputTracker {
    next_sequence: u32,
}

impl InputTracker {
    pub fn new() -> Self {
        Self { next_sequence: 1 }
    }

    /// Builds the next command from the keys held this frame, capturing the
    /// frame time and the predicted speed the command was resolved with.
    /// Frames with no keys held produce nothing.
    pub fn capture(&mut self, symbols: Vec<Symbol>, dt: f32, speed: f32) -> Option<InputCommand> {
        if symbols.is_empty() {
            return None;
        }
        let command = InputCommand {
            sequence: self.next_sequence,
            dt,
            speed,
            symbols,
        };
        self.next_sequence += 1;
        Some(command)
    }

    pub fn last_sequence(&self) -> u32 {
        self.next_sequence - 1
    }
}

impl Default for InputTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequences_start_at_one_and_increase() {
        let mut tracker = InputTracker::new();
        let a = tracker.capture(vec![Symbol::Left], 0.045, 75.0).unwrap();
        let b = tracker.capture(vec![Symbol::Down], 0.045, 75.0).unwrap();
        assert_eq!(a.sequence, 1);
        assert_eq!(b.sequence, 2);
        assert_eq!(tracker.last_sequence(), 2);
    }

    #[test]
    fn idle_frames_produce_no_command() {
        let mut tracker = InputTracker::new();
        assert!(tracker.capture(vec![], 0.045, 75.0).is_none());
        assert_eq!(tracker.last_sequence(), 0);
    }

    #[test]
    fn command_captures_dt_and_speed() {
        let mut tracker = InputTracker::new();
        let cmd = tracker
            .capture(vec![Symbol::Right, Symbol::Special], 0.1, 112.5)
            .unwrap();
        assert_eq!(cmd.dt, 0.1);
        assert_eq!(cmd.speed, 112.5);
        assert_eq!(cmd.symbols, vec![Symbol::Right, Symbol::Special]);
    }
}
