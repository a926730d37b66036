//! Layout registry and owning-stack resolution
//!
//! A route names the layout type whose stack owns it. Resolving that owner
//! walks the layout chain outward to the root, mounting each layout route
//! in its own parent so exactly one instance of every layout sits in the
//! active hierarchy.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use wayfarer_stack::{LayoutKey, PendingRoute, Route, Stack, StackKind, StackObserver};

use crate::coordinator::Inner;
use crate::error::CoordinatorError;
use crate::Result;

/// How a layout type is built and which stack its children live in.
pub struct LayoutSpec<R> {
    factory: Arc<dyn Fn() -> R + Send + Sync>,
    kind: StackKind,
    members: Vec<R>,
    stack: Option<String>,
}

impl<R: Route> LayoutSpec<R> {
    /// Children form a history; the last one is active
    pub fn list(factory: impl Fn() -> R + Send + Sync + 'static) -> Self {
        Self::new(factory, StackKind::List, Vec::new())
    }

    /// Children are fixed members chosen by index, e.g. tabs
    pub fn indexed(factory: impl Fn() -> R + Send + Sync + 'static, members: Vec<R>) -> Self {
        Self::new(factory, StackKind::Indexed, members)
    }

    /// List semantics, mounted through an application stack adapter
    pub fn custom(factory: impl Fn() -> R + Send + Sync + 'static, kind: impl Into<String>) -> Self {
        Self::new(factory, StackKind::Custom(kind.into()), Vec::new())
    }

    fn new(factory: impl Fn() -> R + Send + Sync + 'static, kind: StackKind, members: Vec<R>) -> Self {
        Self {
            factory: Arc::new(factory),
            kind,
            members,
            stack: None,
        }
    }

    /// Keep the children on a configured auxiliary stack instead of a
    /// dedicated one
    pub fn on_stack(mut self, label: impl Into<String>) -> Self {
        self.stack = Some(label.into());
        self
    }

    pub fn kind(&self) -> &StackKind {
        &self.kind
    }

    pub fn members(&self) -> &[R] {
        &self.members
    }

    pub fn stack_label(&self) -> Option<&str> {
        self.stack.as_deref()
    }

    pub fn instantiate(&self) -> R {
        (self.factory)()
    }
}

impl<R> Clone for LayoutSpec<R>
where
    R: Clone,
{
    fn clone(&self) -> Self {
        Self {
            factory: Arc::clone(&self.factory),
            kind: self.kind.clone(),
            members: self.members.clone(),
            stack: self.stack.clone(),
        }
    }
}

impl<R: fmt::Debug> fmt::Debug for LayoutSpec<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LayoutSpec")
            .field("kind", &self.kind)
            .field("members", &self.members)
            .field("stack", &self.stack)
            .finish()
    }
}

/// Layout specs and stack adapters, frozen once the coordinator is built.
pub(crate) struct LayoutRegistry<R> {
    specs: HashMap<LayoutKey, LayoutSpec<R>>,
    adapters: HashMap<StackKind, Arc<dyn StackObserver<R>>>,
}

impl<R: Route> LayoutRegistry<R> {
    pub fn new() -> Self {
        Self {
            specs: HashMap::new(),
            adapters: HashMap::new(),
        }
    }

    pub fn register_layout(&mut self, key: LayoutKey, spec: LayoutSpec<R>) {
        if self.specs.contains_key(&key) {
            tracing::warn!(layout = %key, "Ignoring duplicate layout registration");
            return;
        }
        self.specs.insert(key, spec);
    }

    pub fn register_adapter(&mut self, kind: StackKind, adapter: Arc<dyn StackObserver<R>>) {
        if self.adapters.insert(kind.clone(), adapter).is_some() {
            debug!(kind = %kind, "Replaced stack adapter");
        }
    }

    pub fn spec(&self, key: LayoutKey) -> Option<&LayoutSpec<R>> {
        self.specs.get(&key)
    }

    pub fn adapter(&self, kind: &StackKind) -> Option<Arc<dyn StackObserver<R>>> {
        self.adapters.get(kind).cloned()
    }

    /// Look a layout up by its serialized name
    pub fn find(&self, name: &str) -> Option<LayoutKey> {
        self.specs.keys().copied().find(|key| key.as_str() == name)
    }

    pub fn keys(&self) -> Vec<LayoutKey> {
        self.specs.keys().copied().collect()
    }

    pub fn specs(&self) -> impl Iterator<Item = (&LayoutKey, &LayoutSpec<R>)> {
        self.specs.iter()
    }

    pub(crate) fn require_adapter(&self, spec: &LayoutSpec<R>) -> Result<()> {
        if spec.stack_label().is_some() || self.adapters.contains_key(spec.kind()) {
            return Ok(());
        }
        tracing::error!(kind = %spec.kind(), "Stack kind has no adapter");
        Err(CoordinatorError::UnregisteredStackAdapter {
            kind: spec.kind().to_string(),
        })
    }
}

impl<R: Route> Inner<R> {
    /// Owner keys of `route`, innermost first.
    ///
    /// Checks every link without touching a stack, so configuration errors
    /// surface before anything is mutated.
    pub(crate) fn owner_chain(&self, route: &R) -> Result<Vec<(LayoutKey, LayoutSpec<R>)>> {
        let mut chain: Vec<(LayoutKey, LayoutSpec<R>)> = Vec::new();
        let mut next = route.owner();
        let mut requested_by = format!("{:?}", route);

        while let Some(key) = next {
            if chain.iter().any(|(seen, _)| *seen == key) {
                let names: Vec<&str> = chain
                    .iter()
                    .map(|(k, _)| k.as_str())
                    .chain(std::iter::once(key.as_str()))
                    .collect();
                return Err(CoordinatorError::LayoutCycle {
                    chain: names.join(" -> "),
                });
            }

            let spec = self.registry.spec(key).ok_or_else(|| {
                tracing::error!(layout = %key, route = %requested_by, "Layout was never registered");
                CoordinatorError::UnregisteredLayout {
                    layout: key.to_string(),
                    route: requested_by.clone(),
                }
            })?;
            self.registry.require_adapter(spec)?;

            let layout_route = spec.instantiate();
            if layout_route.layout() != Some(key) {
                return Err(CoordinatorError::Config(format!(
                    "factory for layout '{}' built {:?}, which is not that layout",
                    key, layout_route
                )));
            }

            next = layout_route.owner();
            requested_by = format!("{:?}", layout_route);
            chain.push((key, spec.clone()));
        }

        Ok(chain)
    }

    /// Resolve the stack `route` belongs in, materializing every missing
    /// layout on the way.
    pub(crate) fn owning_stack(&self, route: &R) -> Result<Stack<R>> {
        let chain = self.owner_chain(route)?;

        let mut parent = self.root.clone();
        for (key, spec) in chain.iter().rev() {
            let stack = self.layout_stack_for(*key, spec)?;
            self.mount(&parent, spec.instantiate())?;
            parent = stack;
        }

        Ok(parent)
    }

    /// Make `layout_route` the active element of `parent`.
    fn mount(&self, parent: &Stack<R>, layout_route: R) -> Result<()> {
        if parent.active_route().as_ref() == Some(&layout_route) {
            return Ok(());
        }

        if parent.kind().is_indexed() {
            parent.activate_route(&layout_route)?;
        } else {
            parent.push_or_move_to_top_pending(PendingRoute::detached(layout_route.clone()));
        }

        tracing::info!(stack = %parent.label(), layout = ?layout_route, "Mounted layout route");
        Ok(())
    }

    /// The stack holding `key`'s children, created on first use.
    pub(crate) fn layout_stack_for(&self, key: LayoutKey, spec: &LayoutSpec<R>) -> Result<Stack<R>> {
        let existing = self.layout_stacks.read().get(&key).cloned();
        if let Some(stack) = existing {
            Self::seed(spec, &stack);
            return Ok(stack);
        }

        let stack = match spec.stack_label() {
            Some(label) => self
                .auxiliary
                .get(label)
                .cloned()
                .ok_or_else(|| CoordinatorError::UnknownStack {
                    label: label.to_string(),
                })?,
            None => {
                self.registry.require_adapter(spec)?;
                let stack = Stack::new(key.as_str(), spec.kind().clone());
                self.attach(&stack);
                debug!(layout = %key, kind = %spec.kind(), "Created layout stack");
                stack
            }
        };

        let stack = self.layout_stacks.write().entry(key).or_insert(stack).clone();
        Self::seed(spec, &stack);
        Ok(stack)
    }

    pub(crate) fn layout_stack(&self, key: LayoutKey) -> Option<Stack<R>> {
        self.layout_stacks.read().get(&key).cloned()
    }

    /// Indexed stacks always hold their members
    fn seed(spec: &LayoutSpec<R>, stack: &Stack<R>) {
        if spec.kind().is_indexed() && stack.is_empty() && !spec.members().is_empty() {
            stack.restore(spec.members().to_vec());
        }
    }

    /// Reset the stack of a layout that left the hierarchy, and those of
    /// any layouts nested inside it.
    pub(crate) fn dispose_layout(&self, key: LayoutKey) {
        let mut queue = vec![key];
        let mut seen = HashSet::new();

        while let Some(key) = queue.pop() {
            if !seen.insert(key) {
                continue;
            }
            let Some(stack) = self.layout_stack(key) else {
                continue;
            };

            let routes = stack.routes();
            stack.reset();
            debug!(layout = %key, routes = routes.len(), "Disposed layout stack");
            queue.extend(routes.iter().filter_map(|route| route.layout()));
        }
    }
}
