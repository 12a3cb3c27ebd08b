use crate::models::{utf16_len, Operation};

/// Turn the change from `old` to `new` into operations against `old`.
///
/// The common prefix and suffix are trimmed; whatever differs in between
/// becomes at most one delete followed by one insert at the same position.
/// Equal inputs produce no operations.
pub fn diff(old: &str, new: &str) -> Vec<Operation> {
    if old == new {
        return Vec::new();
    }

    let old_chars: Vec<char> = old.chars().collect();
    let new_chars: Vec<char> = new.chars().collect();

    let prefix = old_chars
        .iter()
        .zip(new_chars.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let max_suffix = old_chars.len().min(new_chars.len()) - prefix;
    let suffix = old_chars
        .iter()
        .rev()
        .zip(new_chars.iter().rev())
        .take(max_suffix)
        .take_while(|(a, b)| a == b)
        .count();

    let position: usize = old_chars[..prefix].iter().map(|c| c.len_utf16()).sum();
    let removed: String = old_chars[prefix..old_chars.len() - suffix].iter().collect();
    let inserted: String = new_chars[prefix..new_chars.len() - suffix].iter().collect();

    let mut ops = Vec::with_capacity(2);
    if !removed.is_empty() {
        ops.push(Operation::delete(position, utf16_len(&removed)));
    }
    if !inserted.is_empty() {
        ops.push(Operation::insert(position, inserted));
    }
    ops
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ot::apply_all;

    fn check(old: &str, new: &str) -> Vec<Operation> {
        let ops = diff(old, new);
        assert_eq!(apply_all(old, &ops), new);
        ops
    }

    #[test]
    fn identical_texts_yield_nothing() {
        assert!(diff("same", "same").is_empty());
    }

    #[test]
    fn pure_insert() {
        let ops = check("let x;", "let mut x;");
        assert_eq!(ops, vec![Operation::insert(4, "mut ")]);
    }

    #[test]
    fn pure_delete() {
        let ops = check("hello world", "hello");
        assert_eq!(ops, vec![Operation::delete(5, 6)]);
    }

    #[test]
    fn replacement_is_delete_then_insert() {
        let ops = check("color: red;", "color: blue;");
        assert_eq!(ops.len(), 2);
        assert_eq!(ops[0], Operation::delete(7, 3));
        assert_eq!(ops[1], Operation::insert(7, "blue"));
    }

    #[test]
    fn repeated_characters_do_not_overlap_prefix_and_suffix() {
        check("aaa", "aaaa");
        check("aaaa", "aa");
        check("abab", "ab");
    }

    #[test]
    fn positions_are_utf16() {
        let ops = check("😀a", "😀ba");
        assert_eq!(ops, vec![Operation::insert(2, "b")]);
        check("", "новый текст");
        check("текст", "");
    }
}
