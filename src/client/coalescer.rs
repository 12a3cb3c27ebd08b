//! Local edit coalescing.
//!
//! Keystrokes are not sent one by one. Each local change bumps a counter and
//! (re)arms a debounce timer; when the timer fires only the latest content is
//! turned into operations, and only if no newer change arrived meanwhile.

use std::time::{Duration, Instant};

use crate::models::Operation;
use crate::ot::diff;

pub const DEBOUNCE_WINDOW: Duration = Duration::from_millis(500);

/// How local edits are encoded on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RelayMode {
    /// One `content_change` carrying the whole body.
    #[default]
    Coarse,
    /// Insert/delete operations against the last sent content.
    Fine,
}

#[derive(Debug, Clone)]
struct Pending {
    content: String,
    change: u64,
    due: Instant,
}

/// A batch ready to be sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flush {
    pub operations: Vec<Operation>,
    pub timestamp: i64,
    pub change: u64,
}

#[derive(Debug, Clone)]
pub struct EditCoalescer {
    mode: RelayMode,
    window: Duration,
    change: u64,
    pending: Option<Pending>,
    /// Content the peers are assumed to have: last flushed or last rebased.
    base: String,
    last_timestamp: i64,
}

impl EditCoalescer {
    pub fn new(mode: RelayMode, base: impl Into<String>) -> Self {
        Self::with_window(mode, base, DEBOUNCE_WINDOW)
    }

    pub fn with_window(mode: RelayMode, base: impl Into<String>, window: Duration) -> Self {
        Self {
            mode,
            window,
            change: 0,
            pending: None,
            base: base.into(),
            last_timestamp: 0,
        }
    }

    /// Record the editor content after a local change. Returns the change
    /// number assigned to it.
    pub fn record(&mut self, content: impl Into<String>, now: Instant) -> u64 {
        self.change += 1;
        self.pending = Some(Pending {
            content: content.into(),
            change: self.change,
            due: now + self.window,
        });
        self.change
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|p| p.due)
    }

    /// Emit the pending batch if its window has elapsed.
    ///
    /// `wall_ms` is the current wall clock in milliseconds; batch timestamps
    /// are strictly increasing even if the wall clock is not.
    pub fn poll(&mut self, now: Instant, wall_ms: i64) -> Option<Flush> {
        let due = self.pending.as_ref().is_some_and(|p| now >= p.due && p.change == self.change);
        if !due {
            return None;
        }
        let pending = self.pending.take()?;

        let operations = match self.mode {
            RelayMode::Coarse if pending.content == self.base => Vec::new(),
            RelayMode::Coarse => vec![Operation::content_change(pending.content.clone())],
            RelayMode::Fine => diff(&self.base, &pending.content),
        };
        self.base = pending.content;
        if operations.is_empty() {
            return None;
        }

        let timestamp = self.stamp(wall_ms);
        let operations = operations.into_iter().map(|op| op.with_timestamp(timestamp)).collect();
        Some(Flush { operations, timestamp, change: pending.change })
    }

    /// Adopt `content` as what peers have, after a remote change was applied.
    /// Any pending local edit is re-diffed against it on the next flush.
    pub fn rebase(&mut self, content: impl Into<String>) {
        self.base = content.into();
    }

    fn stamp(&mut self, wall_ms: i64) -> i64 {
        self.last_timestamp = wall_ms.max(self.last_timestamp + 1);
        self.last_timestamp
    }
}
