//! Myers shortest-edit-script over route sequences
//!
//! The greedy forward pass records the furthest-reaching frontier for every
//! edit distance, the backtrack walks those frontiers from the end to the
//! start. A final pass folds remove/insert pairs of equal elements into
//! moves so that reordered elements are never destroyed and recreated.

use crate::script::{EditOp, EditScript};

/// Compute the edit script turning `old` into `new`.
///
/// `eq` is structural equality, not identity. The output is deterministic
/// for a given pair of sequences.
pub fn diff<T, F>(old: &[T], new: &[T], eq: F) -> EditScript
where
    F: Fn(&T, &T) -> bool,
{
    let n = old.len();
    let m = new.len();

    if n == m && old.iter().zip(new).all(|(a, b)| eq(a, b)) {
        let ops = (0..n).map(|i| EditOp::Keep { old: i, new: i }).collect();
        return EditScript::new(n, m, ops);
    }
    if n == 0 {
        let ops = (0..m).map(|new| EditOp::Insert { new }).collect();
        return EditScript::new(n, m, ops);
    }
    if m == 0 {
        let ops = (0..n).map(|old| EditOp::Remove { old }).collect();
        return EditScript::new(n, m, ops);
    }

    let trace = forward(old, new, &eq);
    let ops = backtrack(&trace, n, m);
    let ops = fold_moves(ops, old, new, &eq);

    tracing::trace!(old = n, new = m, ops = ops.len(), "Computed edit script");

    EditScript::new(n, m, ops)
}

/// Frontier snapshots, `trace[d]` being the frontier before step `d`.
fn forward<T, F>(old: &[T], new: &[T], eq: &F) -> Vec<Vec<isize>>
where
    F: Fn(&T, &T) -> bool,
{
    let n = old.len() as isize;
    let m = new.len() as isize;
    let max = n + m;
    let offset = max + 1;
    let mut v = vec![0isize; (2 * max + 3) as usize];
    let mut trace = Vec::new();

    for d in 0..=max {
        trace.push(v.clone());

        let mut k = -d;
        while k <= d {
            let idx = (k + offset) as usize;
            let mut x = if k == -d || (k != d && v[idx - 1] < v[idx + 1]) {
                v[idx + 1]
            } else {
                v[idx - 1] + 1
            };
            let mut y = x - k;

            while x < n && y < m && eq(&old[x as usize], &new[y as usize]) {
                x += 1;
                y += 1;
            }

            v[idx] = x;

            if x >= n && y >= m {
                return trace;
            }
            k += 2;
        }
    }

    trace
}

fn backtrack(trace: &[Vec<isize>], n: usize, m: usize) -> Vec<EditOp> {
    let offset = (n + m) as isize + 1;
    let mut x = n as isize;
    let mut y = m as isize;
    let mut ops = Vec::with_capacity(n.max(m));

    for (d, v) in trace.iter().enumerate().rev() {
        let d = d as isize;
        let k = x - y;
        let idx = (k + offset) as usize;

        let prev_k = if k == -d || (k != d && v[idx - 1] < v[idx + 1]) {
            k + 1
        } else {
            k - 1
        };
        let prev_x = v[(prev_k + offset) as usize];
        let prev_y = prev_x - prev_k;

        while x > prev_x && y > prev_y {
            x -= 1;
            y -= 1;
            ops.push(EditOp::Keep {
                old: x as usize,
                new: y as usize,
            });
        }

        if d > 0 {
            if x == prev_x {
                ops.push(EditOp::Insert {
                    new: prev_y as usize,
                });
            } else {
                ops.push(EditOp::Remove {
                    old: prev_x as usize,
                });
            }
        }

        x = prev_x;
        y = prev_y;
    }

    ops.reverse();
    ops
}

/// Pair each removal with the first unclaimed insertion of an equal element.
fn fold_moves<T, F>(ops: Vec<EditOp>, old: &[T], new: &[T], eq: &F) -> Vec<EditOp>
where
    F: Fn(&T, &T) -> bool,
{
    let inserts: Vec<usize> = ops
        .iter()
        .filter_map(|op| match op {
            EditOp::Insert { new } => Some(*new),
            _ => None,
        })
        .collect();
    if inserts.is_empty() {
        return ops;
    }

    let mut claimed = vec![false; inserts.len()];
    let mut folded = Vec::with_capacity(ops.len());

    for op in &ops {
        match *op {
            EditOp::Remove { old: o } => {
                let partner = inserts
                    .iter()
                    .enumerate()
                    .find(|(slot, &n)| !claimed[*slot] && eq(&old[o], &new[n]));
                match partner {
                    Some((slot, &n)) => {
                        claimed[slot] = true;
                        folded.push(EditOp::Move { old: o, new: n });
                    }
                    None => folded.push(*op),
                }
            }
            _ => folded.push(*op),
        }
    }

    folded.retain(|op| match op {
        EditOp::Insert { new } => inserts
            .iter()
            .position(|n| n == new)
            .map(|slot| !claimed[slot])
            .unwrap_or(true),
        _ => true,
    });

    folded
}
