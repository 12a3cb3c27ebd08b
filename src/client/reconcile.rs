//! Decides what an incoming remote batch does to the local buffer.
//!
//! The policy is lossy on purpose. While the user types, remote batches are
//! dropped and the buffer stays byte-for-byte as it was; a snapshot request
//! is the recovery path.

use std::collections::VecDeque;
use tracing::{debug, trace};

use crate::models::{utf16_len, OpKind, Operation, OpsReceived};
use crate::ot::{apply, transform_batch};

/// How many locally sent operations are remembered for transforming
/// concurrent remote ones.
pub const HISTORY_LIMIT: usize = 256;

/// Minimum change for a coarse `content_change` to be applied. A delta is
/// significant when it exceeds either bound.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Significance {
    pub min_chars: usize,
    pub min_ratio: f64,
}

impl Default for Significance {
    fn default() -> Self {
        Self { min_chars: 3, min_ratio: 0.10 }
    }
}

impl Significance {
    pub fn is_significant(&self, current: &str, incoming: &str) -> bool {
        let current_len = utf16_len(current);
        let delta = current_len.abs_diff(utf16_len(incoming));
        if delta > self.min_chars {
            return true;
        }
        if current_len == 0 {
            return delta > 0;
        }
        delta as f64 / current_len as f64 > self.min_ratio
    }
}

/// Outcome of [`Reconciler::reconcile`].
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// The buffer becomes the given content.
    Apply(String),
    /// The batch came from this very session.
    IgnoreEcho,
    /// The user is typing.
    DropTyping,
    /// A coarse change too small to be worth the flicker.
    DropInsignificant,
    /// Nothing would change.
    Unchanged,
}

#[derive(Debug, Clone)]
pub struct Reconciler {
    session_id: String,
    significance: Significance,
    history: VecDeque<Operation>,
}

impl Reconciler {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self::with_significance(session_id, Significance::default())
    }

    pub fn with_significance(session_id: impl Into<String>, significance: Significance) -> Self {
        Self {
            session_id: session_id.into(),
            significance,
            history: VecDeque::new(),
        }
    }

    /// Remember operations this session sent, oldest first.
    pub fn record_local(&mut self, operations: &[Operation]) {
        for op in operations.iter().filter(|op| op.kind != OpKind::ContentChange) {
            if self.history.len() == HISTORY_LIMIT {
                self.history.pop_front();
            }
            self.history.push_back(op.clone());
        }
    }

    /// Sent operations the remote sender cannot have seen yet.
    fn concurrent_with(&self, timestamp: i64) -> Vec<Operation> {
        self.history.iter().filter(|op| op.timestamp > timestamp).cloned().collect()
    }

    pub fn reconcile(&mut self, buffer: &str, batch: &OpsReceived, typing: bool) -> Decision {
        if batch.session_id.as_deref() == Some(self.session_id.as_str()) {
            trace!("Ignoring echo of our own batch");
            return Decision::IgnoreEcho;
        }
        if typing {
            debug!("Dropping {} remote operation(s) from {} while typing", batch.operations.len(), batch.user_id);
            return Decision::DropTyping;
        }

        // The last whole-body replacement wins over anything before it.
        let last_full = batch.operations.iter().rposition(|op| op.kind == OpKind::ContentChange);
        let (mut next, rest) = match last_full {
            Some(i) => {
                let incoming = &batch.operations[i].text;
                if !self.significance.is_significant(buffer, incoming) {
                    debug!("Dropping insignificant content change from {}", batch.user_id);
                    return Decision::DropInsignificant;
                }
                (incoming.clone(), &batch.operations[i + 1..])
            }
            None => (buffer.to_string(), &batch.operations[..]),
        };

        if !rest.is_empty() {
            let local = if last_full.is_some() { Vec::new() } else { self.concurrent_with(batch.timestamp) };
            for op in transform_batch(rest, &local) {
                next = apply(&next, &op);
            }
        }

        if next == buffer {
            Decision::Unchanged
        } else {
            Decision::Apply(next)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn batch(ops: Vec<Operation>, session: Option<&str>, timestamp: i64) -> OpsReceived {
        OpsReceived {
            operations: ops,
            user_id: "u2".into(),
            file_id: "f1".into(),
            project_id: "p1".into(),
            timestamp,
            session_id: session.map(str::to_string),
            received_at: timestamp,
        }
    }

    #[test]
    fn own_session_is_never_applied() {
        let mut r = Reconciler::new("s1");
        let b = batch(vec![Operation::content_change("totally different body")], Some("s1"), 1);
        assert_eq!(r.reconcile("x", &b, false), Decision::IgnoreEcho);
    }

    #[test]
    fn missing_session_is_not_an_echo() {
        let mut r = Reconciler::new("s1");
        let b = batch(vec![Operation::insert(0, "hi ")], None, 1);
        assert_eq!(r.reconcile("there", &b, false), Decision::Apply("hi there".into()));
    }

    #[test]
    fn typing_drops_everything() {
        let mut r = Reconciler::new("s1");
        let b = batch(vec![Operation::insert(0, "remote")], Some("s2"), 1);
        assert_eq!(r.reconcile("local", &b, true), Decision::DropTyping);
    }

    #[test]
    fn small_content_changes_are_noise() {
        let mut r = Reconciler::new("s1");
        let current = "a".repeat(100);
        let b = batch(vec![Operation::content_change("a".repeat(103))], Some("s2"), 1);
        assert_eq!(r.reconcile(&current, &b, false), Decision::DropInsignificant);

        let b = batch(vec![Operation::content_change("a".repeat(104))], Some("s2"), 1);
        assert_eq!(r.reconcile(&current, &b, false), Decision::Apply("a".repeat(104)));
    }

    #[test]
    fn ratio_threshold_applies_to_short_documents() {
        let s = Significance::default();
        assert!(s.is_significant("abcdefghi", "abcdefgh"));
        assert!(!s.is_significant(&"x".repeat(40), &"x".repeat(43)));
        assert!(s.is_significant("", "a"));
        assert!(!s.is_significant("same", "same"));
    }

    #[test]
    fn fine_ops_are_transformed_past_unseen_local_edits() {
        let mut r = Reconciler::new("s1");
        // Local buffer already contains our insert at 0, stamped after the remote batch.
        r.record_local(&[Operation::insert(0, ">> ").with_timestamp(20)]);
        let b = batch(vec![Operation::insert(5, "!").with_timestamp(10)], Some("s2"), 10);
        assert_eq!(r.reconcile(">> hello", &b, false), Decision::Apply(">> hello!".into()));
    }

    #[test]
    fn older_local_edits_are_not_transformed_against() {
        let mut r = Reconciler::new("s1");
        r.record_local(&[Operation::insert(0, ">> ").with_timestamp(5)]);
        let b = batch(vec![Operation::insert(8, "!").with_timestamp(10)], Some("s2"), 10);
        assert_eq!(r.reconcile(">> hello", &b, false), Decision::Apply(">> hello!".into()));
    }

    #[test]
    fn history_is_bounded() {
        let mut r = Reconciler::new("s1");
        let ops: Vec<Operation> = (0..HISTORY_LIMIT + 10).map(|i| Operation::insert(0, "x").with_timestamp(i as i64)).collect();
        r.record_local(&ops);
        assert_eq!(r.history.len(), HISTORY_LIMIT);
        assert_eq!(r.history.front().map(|op| op.timestamp), Some(10));
    }

    #[test]
    fn identical_result_is_unchanged() {
        let mut r = Reconciler::new("s1");
        let b = batch(vec![Operation::delete(3, 0)], Some("s2"), 1);
        assert_eq!(r.reconcile("abc", &b, false), Decision::Unchanged);
    }
}
