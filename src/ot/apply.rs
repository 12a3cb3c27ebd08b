use crate::models::{OpKind, Operation};

/// Convert a UTF-16 offset into a byte index of `text`.
///
/// Offsets past the end clamp to `text.len()`. An offset that lands between
/// the two halves of a surrogate pair snaps to the start of that character.
pub fn utf16_to_byte(text: &str, pos: usize) -> usize {
    let mut units = 0;
    for (idx, ch) in text.char_indices() {
        if units >= pos {
            return idx;
        }
        units += ch.len_utf16();
        if units > pos {
            return idx;
        }
    }
    text.len()
}

/// Apply one operation to `text`.
pub fn apply(text: &str, op: &Operation) -> String {
    match op.kind {
        OpKind::Insert => {
            let at = utf16_to_byte(text, op.position);
            let mut out = String::with_capacity(text.len() + op.text.len());
            out.push_str(&text[..at]);
            out.push_str(&op.text);
            out.push_str(&text[at..]);
            out
        }
        OpKind::Delete => {
            let start = utf16_to_byte(text, op.position);
            let end = utf16_to_byte(text, op.end()).max(start);
            let mut out = String::with_capacity(text.len() - (end - start));
            out.push_str(&text[..start]);
            out.push_str(&text[end..]);
            out
        }
        OpKind::ContentChange => op.text.clone(),
    }
}

/// Apply a sequence of operations, each against the result of the previous one.
pub fn apply_all<'a, I>(text: &str, ops: I) -> String
where
    I: IntoIterator<Item = &'a Operation>,
{
    ops.into_iter().fold(text.to_string(), |acc, op| apply(&acc, op))
}
