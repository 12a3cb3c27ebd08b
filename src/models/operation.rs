use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use std::cmp::Ordering;

/// Kind of edit carried by an [`Operation`].
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum OpKind {
    Insert,
    Delete,
    /// Whole-body replacement used by the coarse relay path.
    ContentChange,
}

/// A single edit.
///
/// `position` and `length` are flat UTF-16 code unit offsets into the
/// document. For inserts `length` equals the UTF-16 length of `text`; for
/// deletes `text` is empty; for content changes `text` is the full new body.
#[skip_serializing_none]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    #[serde(rename = "type")]
    pub kind: OpKind,
    #[serde(default)]
    pub position: usize,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub length: usize,
    #[serde(default)]
    pub timestamp: i64,
    pub user_id: Option<String>,
    pub session_id: Option<String>,
}

impl Operation {
    pub fn insert(position: usize, text: impl Into<String>) -> Self {
        let text = text.into();
        let length = utf16_len(&text);
        Self {
            kind: OpKind::Insert,
            position,
            text,
            length,
            timestamp: 0,
            user_id: None,
            session_id: None,
        }
    }

    pub fn delete(position: usize, length: usize) -> Self {
        Self {
            kind: OpKind::Delete,
            position,
            text: String::new(),
            length,
            timestamp: 0,
            user_id: None,
            session_id: None,
        }
    }

    pub fn content_change(content: impl Into<String>) -> Self {
        let text = content.into();
        let length = utf16_len(&text);
        Self {
            kind: OpKind::ContentChange,
            position: 0,
            text,
            length,
            timestamp: 0,
            user_id: None,
            session_id: None,
        }
    }

    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// End of the range a delete covers. Wire values can be arbitrary, so
    /// this saturates instead of overflowing.
    pub fn end(&self) -> usize {
        self.position.saturating_add(self.length)
    }

    /// UTF-16 length of the inserted text, whatever `length` says.
    pub fn insert_len(&self) -> usize {
        utf16_len(&self.text)
    }

    /// Total order used to break ties between concurrent operations at the
    /// same position. The result is the same whichever side calls it.
    pub fn tie_break(&self, other: &Operation) -> Ordering {
        self.timestamp
            .cmp(&other.timestamp)
            .then_with(|| self.session_id.cmp(&other.session_id))
            .then_with(|| self.user_id.cmp(&other.user_id))
            .then_with(|| self.text.cmp(&other.text))
    }
}

/// Length of `text` in UTF-16 code units.
pub fn utf16_len(text: &str) -> usize {
    text.chars().map(char::len_utf16).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_length_counts_utf16_units() {
        assert_eq!(Operation::insert(0, "abc").length, 3);
        assert_eq!(Operation::insert(0, "é").length, 1);
        assert_eq!(Operation::insert(0, "😀").length, 2);
    }

    #[test]
    fn serializes_with_wire_names() {
        let op = Operation::insert(2, "hi").with_timestamp(7);
        let json = serde_json::to_value(&op).unwrap();
        assert_eq!(json["type"], "insert");
        assert_eq!(json["position"], 2);
        assert_eq!(json["length"], 2);
        assert!(json.get("userId").is_none());
    }

    #[test]
    fn deserializes_sparse_delete() {
        let op: Operation = serde_json::from_str(r#"{"type":"delete","position":4,"length":3}"#).unwrap();
        assert_eq!(op, Operation::delete(4, 3));
    }

    #[test]
    fn end_saturates_on_huge_ranges() {
        assert_eq!(Operation::delete(usize::MAX, 1).end(), usize::MAX);
        assert_eq!(Operation::delete(3, 4).end(), 7);
    }

    #[test]
    fn tie_break_is_antisymmetric() {
        let a = Operation::insert(2, "x").with_timestamp(1);
        let b = Operation::insert(2, "y").with_timestamp(1);
        assert_eq!(a.tie_break(&b), b.tie_break(&a).reverse());
        assert_eq!(a.tie_break(&b), Ordering::Less);
    }
}
