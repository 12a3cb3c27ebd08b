use std::time::{Duration, Instant};

/// Quiet period after the last keystroke before the user counts as idle.
pub const TYPING_QUIET_PERIOD: Duration = Duration::from_secs(1);

/// Debounced "user is typing" flag.
///
/// Time is passed in rather than read, so callers and tests control it.
#[derive(Debug, Clone)]
pub struct TypingTracker {
    quiet: Duration,
    last_keystroke: Option<Instant>,
}

impl Default for TypingTracker {
    fn default() -> Self {
        Self::new(TYPING_QUIET_PERIOD)
    }
}

impl TypingTracker {
    pub fn new(quiet: Duration) -> Self {
        Self { quiet, last_keystroke: None }
    }

    pub fn keystroke(&mut self, now: Instant) {
        self.last_keystroke = Some(now);
    }

    pub fn is_typing(&self, now: Instant) -> bool {
        self.last_keystroke
            .is_some_and(|at| now.saturating_duration_since(at) < self.quiet)
    }

    /// When the flag will clear, if it is set.
    pub fn idle_at(&self) -> Option<Instant> {
        self.last_keystroke.map(|at| at + self.quiet)
    }

    pub fn clear(&mut self) {
        self.last_keystroke = None;
    }
}
