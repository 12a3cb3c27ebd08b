use crate::models::{OpKind, Operation};
use std::cmp::Ordering;

/// Rewrite `op` so it can be applied after `applied`.
///
/// Both operations must have been produced against the same document state.
/// The result is usually a single operation; a delete whose range contains
/// the insertion point of `applied` is split in two so that inserted text
/// survives.
///
/// `content_change` operations on either side are returned unchanged.
pub fn transform(op: &Operation, applied: &Operation) -> Vec<Operation> {
    match (op.kind, applied.kind) {
        (OpKind::Insert, OpKind::Insert) => vec![insert_after_insert(op, applied)],
        (OpKind::Delete, OpKind::Insert) => delete_after_insert(op, applied),
        (OpKind::Insert, OpKind::Delete) => vec![insert_after_delete(op, applied)],
        (OpKind::Delete, OpKind::Delete) => vec![delete_after_delete(op, applied)],
        _ => vec![op.clone()],
    }
}

/// Transform a sequence of pending operations against a sequence of applied
/// ones. Both sequences are read left to right, each element relative to the
/// result of the one before it.
pub fn transform_batch(pending: &[Operation], applied: &[Operation]) -> Vec<Operation> {
    include(pending.to_vec(), applied.to_vec()).0
}

// Returns (pending', applied') such that applied + pending' == pending + applied'.
fn include(pending: Vec<Operation>, applied: Vec<Operation>) -> (Vec<Operation>, Vec<Operation>) {
    if pending.is_empty() || applied.is_empty() {
        return (pending, applied);
    }
    if pending.len() == 1 && applied.len() == 1 {
        let p = &pending[0];
        let a = &applied[0];
        return (transform(p, a), transform(a, p));
    }
    if pending.len() > 1 {
        let mut rest = pending;
        let head = rest.remove(0);
        let (head, applied) = include(vec![head], applied);
        let (mut tail, applied) = include(rest, applied);
        let mut out = head;
        out.append(&mut tail);
        return (out, applied);
    }
    let mut rest = applied;
    let head = rest.remove(0);
    let (pending, head) = include(pending, vec![head]);
    let (pending, mut tail) = include(pending, rest);
    let mut out = head;
    out.append(&mut tail);
    (pending, out)
}

fn shifted(op: &Operation, position: usize) -> Operation {
    Operation { position, ..op.clone() }
}

fn insert_after_insert(op: &Operation, applied: &Operation) -> Operation {
    let applied_first = match applied.position.cmp(&op.position) {
        Ordering::Less => true,
        Ordering::Greater => false,
        Ordering::Equal => applied.tie_break(op) == Ordering::Less,
    };
    if applied_first {
        shifted(op, op.position.saturating_add(applied.insert_len()))
    } else {
        op.clone()
    }
}

fn delete_after_insert(op: &Operation, applied: &Operation) -> Vec<Operation> {
    let at = applied.position;
    if op.position >= at {
        return vec![shifted(op, op.position.saturating_add(applied.insert_len()))];
    }
    if at >= op.end() {
        return vec![op.clone()];
    }
    // The insertion landed strictly inside the range: delete around it.
    let before = Operation { length: at - op.position, ..op.clone() };
    let after = Operation {
        position: op.position.saturating_add(applied.insert_len()),
        length: op.end() - at,
        ..op.clone()
    };
    vec![before, after]
}

fn insert_after_delete(op: &Operation, applied: &Operation) -> Operation {
    if op.position <= applied.position {
        op.clone()
    } else if op.position >= applied.end() {
        shifted(op, op.position - applied.length)
    } else {
        shifted(op, applied.position)
    }
}

fn delete_after_delete(op: &Operation, applied: &Operation) -> Operation {
    if op.end() <= applied.position {
        return op.clone();
    }
    if op.position >= applied.end() {
        return shifted(op, op.position - applied.length);
    }
    let overlap = op.end().min(applied.end()).saturating_sub(op.position.max(applied.position));
    Operation {
        position: op.position.min(applied.position),
        length: op.length.saturating_sub(overlap),
        ..op.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ot::{apply, apply_all};
    use pretty_assertions::assert_eq;

    /// Apply a then b' on one side and b then a' on the other; both must agree.
    fn converge(base: &str, a: &Operation, b: &Operation) -> String {
        let left = apply_all(&apply(base, a), &transform(b, a));
        let right = apply_all(&apply(base, b), &transform(a, b));
        assert_eq!(left, right, "diverged for a={a:?} b={b:?}");
        left
    }

    #[test]
    fn insert_insert_same_position_earlier_wins() {
        let a = Operation::insert(2, "AA").with_timestamp(1);
        let b = Operation::insert(2, "B").with_timestamp(2);
        let b2 = transform(&b, &a);
        assert_eq!(b2.len(), 1);
        assert_eq!(b2[0].position, 2 + a.length);
        assert_eq!(converge("0123", &a, &b), "01AAB23");
    }

    #[test]
    fn insert_insert_tie_is_symmetric() {
        let a = Operation::insert(1, "x").with_timestamp(5);
        let b = Operation::insert(1, "y").with_timestamp(5);
        assert_eq!(converge("ab", &a, &b), "axyb");
        assert_eq!(converge("ab", &b, &a), "axyb");
    }

    #[test]
    fn insert_before_other_insert_is_unchanged() {
        let a = Operation::insert(5, "zz");
        let b = Operation::insert(1, "y");
        assert_eq!(transform(&b, &a), vec![b.clone()]);
        assert_eq!(transform(&a, &b)[0].position, 6);
    }

    #[test]
    fn delete_after_insert_shifts_forward() {
        let a = Operation::insert(1, "xyz");
        let b = Operation::delete(2, 2);
        assert_eq!(transform(&b, &a)[0].position, 5);
        assert_eq!(converge("abcdef", &a, &b), "axyzbef");
    }

    #[test]
    fn delete_starting_at_insert_point_keeps_inserted_text() {
        let a = Operation::insert(2, "++");
        let b = Operation::delete(2, 2);
        assert_eq!(converge("abcdef", &a, &b), "ab++ef");
    }

    #[test]
    fn delete_spanning_insert_point_is_split() {
        let a = Operation::insert(3, "XY");
        let b = Operation::delete(1, 4);
        let out = transform(&b, &a);
        assert_eq!(out, vec![Operation::delete(1, 2), Operation::delete(3, 2)]);
        assert_eq!(converge("abcdefg", &a, &b), "aXYfg");
    }

    #[test]
    fn insert_after_delete_cases() {
        let a = Operation::delete(2, 3);
        assert_eq!(transform(&Operation::insert(1, "q"), &a)[0].position, 1);
        assert_eq!(transform(&Operation::insert(2, "q"), &a)[0].position, 2);
        assert_eq!(transform(&Operation::insert(4, "q"), &a)[0].position, 2);
        assert_eq!(transform(&Operation::insert(7, "q"), &a)[0].position, 4);
    }

    #[test]
    fn insert_inside_deleted_range_converges() {
        let a = Operation::delete(1, 4);
        let b = Operation::insert(3, "!");
        assert_eq!(converge("abcdefg", &a, &b), "a!fg");
    }

    #[test]
    fn delete_delete_overlap_shrinks() {
        let a = Operation::delete(2, 4); // [2,6)
        let b = Operation::delete(4, 4); // [4,8)
        let out = transform(&b, &a);
        assert_eq!(out, vec![Operation::delete(2, 2)]);
        assert_eq!(converge("0123456789", &a, &b), "0189");
    }

    #[test]
    fn delete_delete_contained_collapses_to_zero() {
        let a = Operation::delete(1, 6);
        let b = Operation::delete(2, 3);
        let out = transform(&b, &a);
        assert_eq!(out[0].length, 0);
        assert_eq!(out[0].position, 1);
        assert_eq!(converge("0123456789", &a, &b), "0789");
    }

    #[test]
    fn delete_delete_disjoint() {
        let a = Operation::delete(0, 2);
        let b = Operation::delete(5, 2);
        assert_eq!(transform(&b, &a), vec![Operation::delete(3, 2)]);
        assert_eq!(transform(&a, &b), vec![a.clone()]);
        assert_eq!(converge("0123456789", &a, &b), "234789");
    }

    #[test]
    fn content_change_bypasses_transform() {
        let a = Operation::insert(0, "zzz");
        let b = Operation::content_change("whole");
        assert_eq!(transform(&b, &a), vec![b.clone()]);
        assert_eq!(transform(&a, &b), vec![a.clone()]);
    }

    #[test]
    fn huge_positions_saturate() {
        let far_insert = Operation::insert(usize::MAX, "!");
        let far_delete = Operation::delete(usize::MAX, 1);
        let near = Operation::insert(0, "ab");

        assert_eq!(transform(&far_delete, &near)[0].position, usize::MAX);
        assert_eq!(transform(&far_insert, &near)[0].position, usize::MAX);
        assert_eq!(transform(&far_delete, &Operation::delete(1, usize::MAX)).len(), 1);
        assert_eq!(converge("abc", &near, &far_delete), "ababc");
    }

    #[test]
    fn batches_converge() {
        let base = "fn main() {}";
        let local = vec![Operation::insert(3, "x"), Operation::delete(0, 2)];
        let remote = vec![Operation::insert(11, " body "), Operation::delete(5, 2)];
        let left = apply_all(&apply_all(base, &local), &transform_batch(&remote, &local));
        let right = apply_all(&apply_all(base, &remote), &transform_batch(&local, &remote));
        assert_eq!(left, right);
    }
}
