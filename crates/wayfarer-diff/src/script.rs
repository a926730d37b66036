//! Edit script data structure

use serde::{Deserialize, Serialize};

/// A single step of an edit script.
///
/// Indices in `old` refer to the sequence before the edit, indices in `new`
/// to the sequence after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum EditOp {
    /// Element stays where the surrounding keeps put it
    Keep { old: usize, new: usize },
    /// Fresh element at `new`
    Insert { new: usize },
    /// Element at `old` is dropped
    Remove { old: usize },
    /// Element at `old` is reused at `new`, out of order
    Move { old: usize, new: usize },
}

impl EditOp {
    pub fn is_change(&self) -> bool {
        !matches!(self, EditOp::Keep { .. })
    }
}

/// Ordered list of operations transforming one sequence into another.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditScript {
    old_len: usize,
    new_len: usize,
    ops: Vec<EditOp>,
}

impl EditScript {
    pub(crate) fn new(old_len: usize, new_len: usize, ops: Vec<EditOp>) -> Self {
        Self {
            old_len,
            new_len,
            ops,
        }
    }

    pub fn old_len(&self) -> usize {
        self.old_len
    }

    pub fn new_len(&self) -> usize {
        self.new_len
    }

    /// All operations, keeps included
    pub fn ops(&self) -> &[EditOp] {
        &self.ops
    }

    /// Operations with a visible effect (insert, remove, move)
    pub fn changes(&self) -> impl Iterator<Item = &EditOp> + '_ {
        self.ops.iter().filter(|op| op.is_change())
    }

    /// Number of visible operations
    pub fn len(&self) -> usize {
        self.changes().count()
    }

    /// True when the two sequences were equal element for element.
    pub fn is_empty(&self) -> bool {
        self.changes().next().is_none()
    }

    /// Edit distance in the insert/remove metric, a move counting as both.
    pub fn distance(&self) -> usize {
        self.ops
            .iter()
            .map(|op| match op {
                EditOp::Keep { .. } => 0,
                EditOp::Insert { .. } | EditOp::Remove { .. } => 1,
                EditOp::Move { .. } => 2,
            })
            .sum()
    }

    pub fn inserted(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| matches!(op, EditOp::Insert { .. }))
            .count()
    }

    pub fn removed(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| matches!(op, EditOp::Remove { .. }))
            .count()
    }

    pub fn moved(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| matches!(op, EditOp::Move { .. }))
            .count()
    }

    /// Apply the script to `old`, reusing kept and moved elements.
    ///
    /// `insert` builds the element for a new index, `remove` receives every
    /// dropped element together with its old index. Removals are reported
    /// before insertions are built.
    pub fn apply<T>(
        &self,
        old: Vec<T>,
        mut insert: impl FnMut(usize) -> T,
        mut remove: impl FnMut(usize, T),
    ) -> Vec<T> {
        debug_assert_eq!(old.len(), self.old_len, "script applied to wrong sequence");

        let mut source: Vec<Option<T>> = old.into_iter().map(Some).collect();
        let mut slots: Vec<Option<T>> = (0..self.new_len).map(|_| None).collect();

        for op in &self.ops {
            match *op {
                EditOp::Keep { old, new } | EditOp::Move { old, new } => {
                    slots[new] = source[old].take();
                }
                EditOp::Remove { old } => {
                    if let Some(item) = source[old].take() {
                        remove(old, item);
                    }
                }
                EditOp::Insert { .. } => {}
            }
        }

        for op in &self.ops {
            if let EditOp::Insert { new } = *op {
                slots[new] = Some(insert(new));
            }
        }

        slots.into_iter().flatten().collect()
    }
}
