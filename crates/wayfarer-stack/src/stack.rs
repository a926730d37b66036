//! Navigation stack
//!
//! An ordered, observable history of routes. Every mutation builds the
//! desired sequence, diffs it against the current one and applies the
//! resulting edit script, so entries that survive keep their `EntryId` and
//! their pending result.
//!
//! ```text
//! List     — active element is the last one
//! Indexed  — fixed members, active element chosen by index
//! Custom   — list semantics, mounted by an application adapter
//! ```

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

use wayfarer_diff::{diff, EditOp, EditScript};

use crate::error::StackError;
use crate::guard::ask_permission;
use crate::pending::{Completer, PendingRoute, RouteOutcome, RouteResult};
use crate::route::Route;
use crate::Result;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StackKind {
    List,
    Indexed,
    Custom(String),
}

impl StackKind {
    pub fn is_indexed(&self) -> bool {
        matches!(self, StackKind::Indexed)
    }

    pub fn name(&self) -> &str {
        match self {
            StackKind::List => "list",
            StackKind::Indexed => "indexed",
            StackKind::Custom(name) => name,
        }
    }
}

impl fmt::Display for StackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Identity of a stack entry, stable across keeps and moves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntryId(Uuid);

impl EntryId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Published after every applied mutation.
#[derive(Debug, Clone)]
pub struct StackEvent<R> {
    pub label: String,
    pub kind: StackKind,
    pub script: EditScript,
    /// Routes after the mutation
    pub routes: Vec<R>,
    /// Entry identities after the mutation, parallel to `routes`
    pub entries: Vec<EntryId>,
    pub active: Option<usize>,
}

pub trait StackObserver<R>: Send + Sync {
    fn on_stack_changed(&self, event: &StackEvent<R>);
}

#[derive(Debug)]
struct Entry<R> {
    id: EntryId,
    route: R,
    completer: Completer,
}

enum Slot<R> {
    /// Index of an entry already in the stack
    Existing(usize),
    Fresh(PendingRoute<R>),
}

struct StackState<R> {
    entries: Vec<Entry<R>>,
    /// Only meaningful for indexed stacks
    active: usize,
}

pub struct Stack<R> {
    label: Arc<str>,
    kind: StackKind,
    state: Arc<RwLock<StackState<R>>>,
    observers: Arc<RwLock<Vec<Arc<dyn StackObserver<R>>>>>,
}

impl<R: Route> Stack<R> {
    pub fn new(label: impl Into<String>, kind: StackKind) -> Self {
        let label: String = label.into();
        Self {
            label: Arc::from(label),
            kind,
            state: Arc::new(RwLock::new(StackState {
                entries: Vec::new(),
                active: 0,
            })),
            observers: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn list(label: impl Into<String>) -> Self {
        Self::new(label, StackKind::List)
    }

    pub fn indexed(label: impl Into<String>) -> Self {
        Self::new(label, StackKind::Indexed)
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn kind(&self) -> &StackKind {
        &self.kind
    }

    pub fn observe(&self, observer: Arc<dyn StackObserver<R>>) {
        self.observers.write().push(observer);
    }

    // === Queries ===

    pub fn routes(&self) -> Vec<R> {
        self.state
            .read()
            .entries
            .iter()
            .map(|e| e.route.clone())
            .collect()
    }

    pub fn entries(&self) -> Vec<(EntryId, R)> {
        self.state
            .read()
            .entries
            .iter()
            .map(|e| (e.id, e.route.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.state.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().entries.is_empty()
    }

    pub fn contains(&self, route: &R) -> bool {
        self.position(route).is_some()
    }

    pub fn position(&self, route: &R) -> Option<usize> {
        self.state
            .read()
            .entries
            .iter()
            .position(|e| &e.route == route)
    }

    pub fn active_index(&self) -> Option<usize> {
        let state = self.state.read();
        Self::active_of(&self.kind, &state)
    }

    pub fn active_entry(&self) -> Option<(EntryId, R)> {
        let state = self.state.read();
        Self::active_of(&self.kind, &state).map(|i| {
            let entry = &state.entries[i];
            (entry.id, entry.route.clone())
        })
    }

    pub fn active_route(&self) -> Option<R> {
        self.active_entry().map(|(_, route)| route)
    }

    fn active_of(kind: &StackKind, state: &StackState<R>) -> Option<usize> {
        if state.entries.is_empty() {
            None
        } else if kind.is_indexed() {
            Some(state.active.min(state.entries.len() - 1))
        } else {
            Some(state.entries.len() - 1)
        }
    }

    // === Mutations ===

    /// Append unconditionally; duplicates are allowed.
    pub fn push(&self, route: R) -> RouteResult {
        let (pending, result) = PendingRoute::new(route);
        self.push_pending(pending);
        result
    }

    pub fn push_pending(&self, pending: PendingRoute<R>) {
        self.mutate(|state| {
            let mut next: Vec<Slot<R>> = (0..state.entries.len()).map(Slot::Existing).collect();
            next.push(Slot::Fresh(pending));
            (next, None)
        });
    }

    /// Ask the active route's guard, then remove it.
    ///
    /// Returns `false` without mutating when the guard refuses or defers,
    /// when the stack is empty or indexed, or when the active entry changed
    /// while the guard was pending.
    pub async fn pop(&self, outcome: RouteOutcome) -> Result<bool> {
        if self.kind.is_indexed() {
            return Ok(false);
        }
        let Some((id, route)) = self.active_entry() else {
            return Ok(false);
        };

        let decision = ask_permission(&route).await?;
        if !decision.is_allowed() {
            tracing::info!(stack = %self.label, route = ?route, ?decision, "Pop refused by guard");
            return Ok(false);
        }

        Ok(self.remove_entry(id, outcome))
    }

    /// Remove one entry without consulting its guard.
    pub fn remove_entry(&self, id: EntryId, outcome: RouteOutcome) -> bool {
        let mut found = false;
        self.mutate(|state| {
            let next: Vec<Slot<R>> = state
                .entries
                .iter()
                .enumerate()
                .filter(|(_, e)| {
                    let hit = e.id == id;
                    found |= hit;
                    !hit
                })
                .map(|(i, _)| Slot::Existing(i))
                .collect();
            (next, outcome)
        });
        found
    }

    /// Forced reset followed by a push. Guards are not consulted.
    pub fn replace_all(&self, route: R) -> RouteResult {
        let (pending, result) = PendingRoute::new(route);
        self.replace_all_pending(pending);
        result
    }

    pub fn replace_all_pending(&self, pending: PendingRoute<R>) {
        self.mutate(|_| (vec![Slot::Fresh(pending)], None));
    }

    /// Move an equal route to the top, or push it when absent.
    ///
    /// The previous instance is completed with `None`; the stack never grows
    /// when called repeatedly with equal routes.
    pub fn push_or_move_to_top(&self, route: R) -> RouteResult {
        let (pending, result) = PendingRoute::new(route);
        self.push_or_move_to_top_pending(pending);
        result
    }

    pub fn push_or_move_to_top_pending(&self, pending: PendingRoute<R>) {
        self.mutate(|state| {
            let mut next: Vec<Slot<R>> = state
                .entries
                .iter()
                .enumerate()
                .filter(|(_, e)| &e.route != pending.route())
                .map(|(i, _)| Slot::Existing(i))
                .collect();
            next.push(Slot::Fresh(pending));
            (next, None)
        });
    }

    /// Make an equal member active. Indexed stacks only.
    pub fn activate_route(&self, route: &R) -> Result<()> {
        if !self.kind.is_indexed() {
            return Err(StackError::NotIndexed {
                stack: self.label.to_string(),
                kind: self.kind.to_string(),
            });
        }

        let index = self.position(route).ok_or_else(|| StackError::RouteNotFound {
            stack: self.label.to_string(),
            route: format!("{:?}", route),
        })?;

        self.set_active_index(index)
    }

    pub fn set_active_index(&self, index: usize) -> Result<()> {
        let event = {
            let mut state = self.state.write();
            let len = state.entries.len();
            if index >= len {
                return Err(StackError::IndexOutOfRange {
                    stack: self.label.to_string(),
                    index,
                    len,
                });
            }
            if state.active == index {
                return Ok(());
            }
            state.active = index;
            tracing::debug!(stack = %self.label, index, "Activated index");
            self.event(&state, EditScript::default())
        };

        self.notify(&event);
        Ok(())
    }

    /// Empty the stack, completing every entry with `None`.
    pub fn reset(&self) {
        self.mutate(|_| (Vec::new(), None));
    }

    /// Replace the contents with detached routes (restoration, seeding).
    pub fn restore(&self, routes: Vec<R>) {
        self.mutate(|_| {
            let next = routes
                .into_iter()
                .map(|route| Slot::Fresh(PendingRoute::detached(route)))
                .collect();
            (next, None)
        });
    }

    /// Diff the current entries against `build`'s sequence and apply it.
    ///
    /// `build` returns the desired slots and the outcome handed to removed
    /// entries. Observers are notified after the lock is released.
    fn mutate<F>(&self, build: F) -> EditScript
    where
        F: FnOnce(&StackState<R>) -> (Vec<Slot<R>>, RouteOutcome),
    {
        let (script, event) = {
            let mut state = self.state.write();
            let previous_active = Self::active_of(&self.kind, &state);
            let (next, outcome) = build(&*state);

            let next_routes: Vec<R> = next
                .iter()
                .map(|slot| match slot {
                    Slot::Existing(i) => state.entries[*i].route.clone(),
                    Slot::Fresh(pending) => pending.route().clone(),
                })
                .collect();
            // Existing slots only match their own entry. A fresh slot may
            // take over an equal entry that is leaving the stack.
            let script = {
                let mut referenced = vec![false; state.entries.len()];
                for slot in &next {
                    if let Slot::Existing(i) = slot {
                        referenced[*i] = true;
                    }
                }
                let current: Vec<(Option<usize>, &R)> = state
                    .entries
                    .iter()
                    .enumerate()
                    .map(|(i, e)| (Some(i), &e.route))
                    .collect();
                let desired: Vec<(Option<usize>, &R)> = next
                    .iter()
                    .zip(&next_routes)
                    .map(|(slot, route)| match slot {
                        Slot::Existing(i) => (Some(*i), route),
                        Slot::Fresh(_) => (None, route),
                    })
                    .collect();
                diff(&current, &desired, |a, b| match (a.0, b.0) {
                    (Some(x), Some(y)) => x == y,
                    (Some(i), None) | (None, Some(i)) => !referenced[i] && a.1 == b.1,
                    (None, None) => a.1 == b.1,
                })
            };

            let mut slots: Vec<Option<Slot<R>>> = next.into_iter().map(Some).collect();
            let old = std::mem::take(&mut state.entries);
            let label = &self.label;

            state.entries = script.apply(
                old,
                |new_index| match slots[new_index].take() {
                    Some(Slot::Fresh(pending)) => {
                        let (route, completer) = pending.into_parts();
                        Entry {
                            id: EntryId::new(),
                            route,
                            completer,
                        }
                    }
                    _ => {
                        let (route, completer) =
                            PendingRoute::detached(next_routes[new_index].clone()).into_parts();
                        Entry {
                            id: EntryId::new(),
                            route,
                            completer,
                        }
                    }
                },
                |_, entry| {
                    tracing::trace!(stack = %label, entry = %entry.id, "Completing removed entry");
                    entry.completer.complete(outcome.clone());
                },
            );

            // Kept and moved entries take over a fresh instance aimed at them
            for op in script.ops() {
                if let EditOp::Keep { new, .. } | EditOp::Move { new, .. } = *op {
                    if let Some(Slot::Fresh(pending)) = slots[new].take() {
                        let (route, completer) = pending.into_parts();
                        let entry = &mut state.entries[new];
                        let superseded = std::mem::replace(&mut entry.completer, completer);
                        superseded.complete(None);
                        entry.route = route;
                    }
                }
            }

            if self.kind.is_indexed() && !state.entries.is_empty() {
                state.active = state.active.min(state.entries.len() - 1);
            } else if state.entries.is_empty() {
                state.active = 0;
            }

            let active_changed = previous_active != Self::active_of(&self.kind, &state);
            if script.is_empty() && !active_changed {
                (script, None)
            } else {
                tracing::debug!(
                    stack = %self.label,
                    inserted = script.inserted(),
                    removed = script.removed(),
                    moved = script.moved(),
                    len = state.entries.len(),
                    "Stack mutated"
                );
                let event = self.event(&state, script.clone());
                (script, Some(event))
            }
        };

        if let Some(event) = event {
            self.notify(&event);
        }
        script
    }

    fn event(&self, state: &StackState<R>, script: EditScript) -> StackEvent<R> {
        StackEvent {
            label: self.label.to_string(),
            kind: self.kind.clone(),
            script,
            routes: state.entries.iter().map(|e| e.route.clone()).collect(),
            entries: state.entries.iter().map(|e| e.id).collect(),
            active: Self::active_of(&self.kind, state),
        }
    }

    fn notify(&self, event: &StackEvent<R>) {
        let observers: Vec<_> = self.observers.read().iter().cloned().collect();
        for observer in observers {
            observer.on_stack_changed(event);
        }
    }
}

impl<R> Clone for Stack<R> {
    fn clone(&self) -> Self {
        Self {
            label: Arc::clone(&self.label),
            kind: self.kind.clone(),
            state: Arc::clone(&self.state),
            observers: Arc::clone(&self.observers),
        }
    }
}

impl<R: Route> fmt::Debug for Stack<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stack")
            .field("label", &self.label)
            .field("kind", &self.kind)
            .field("routes", &self.routes())
            .finish()
    }
}
