//! Navigation coordinator
//!
//! Owns the root stack, the auxiliary stacks and every layout stack. All
//! navigation goes through here so redirects, guards, layout resolution
//! and location sync happen in one place.

use futures_util::future::BoxFuture;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::Mutex;
use tracing::{debug, info};
use url::Url;

use wayfarer_restore::{
    NavigationSnapshot, RestoreError, RouteCodec, SerializedStack,
};
use wayfarer_stack::{
    ask_permission, LayoutKey, Location, PendingRoute, PopDecision, RedirectResolver, Resolved,
    Route, RouteOutcome, RouteParser, RouteResult, Stack, StackEvent, StackKind, StackObserver,
    DeepLinkStrategy,
};

use crate::builder::CoordinatorBuilder;
use crate::config::CoordinatorConfig;
use crate::error::CoordinatorError;
use crate::layout::{LayoutRegistry, LayoutSpec};
use crate::observer::{LocationEvent, LocationListener};
use crate::Result;

/// Application hook for routes whose deep-link strategy is `Custom`.
///
/// The handler gets the coordinator and builds whatever state it wants
/// through the ordinary navigation operations.
pub trait DeepLinkHandler<R>: Send + Sync {
    fn handle(
        &self,
        coordinator: Coordinator<R>,
        route: R,
        location: Option<Location>,
    ) -> BoxFuture<'static, anyhow::Result<()>>;
}

impl<R, F, Fut> DeepLinkHandler<R> for F
where
    F: Fn(Coordinator<R>, R, Option<Location>) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    fn handle(
        &self,
        coordinator: Coordinator<R>,
        route: R,
        location: Option<Location>,
    ) -> BoxFuture<'static, anyhow::Result<()>> {
        Box::pin(self(coordinator, route, location))
    }
}

/// What an external navigation ended up doing
#[derive(Debug)]
pub enum Recovery {
    /// The route was navigated to with its deep-link strategy
    Navigated(RouteResult),
    /// The route was already in the active hierarchy and is on top again
    PoppedTo,
    /// A guard refused popping down to the route; nothing changed
    Refused,
    /// The deep-link handler took over
    Handled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placement {
    Push,
    MoveToTop,
    Replace,
}

enum Decoded<R> {
    Routes(Vec<R>),
    Index(usize),
}

pub(crate) struct Inner<R> {
    pub(crate) config: CoordinatorConfig,
    pub(crate) base: Url,
    pub(crate) root: Stack<R>,
    pub(crate) auxiliary: HashMap<String, Stack<R>>,
    pub(crate) registry: LayoutRegistry<R>,
    pub(crate) layout_stacks: RwLock<HashMap<LayoutKey, Stack<R>>>,
    codec: RouteCodec<R>,
    parser: Arc<dyn RouteParser<R>>,
    deep_link: Option<Arc<dyn DeepLinkHandler<R>>>,
    redirects: RedirectResolver,
    location: RwLock<Option<String>>,
    listeners: RwLock<Vec<Arc<dyn LocationListener>>>,
    /// Held by a navigation from issue until it is applied; waiters are
    /// served in issue order
    sequencer: Mutex<()>,
    /// Bumped by every replace and reset
    generation: AtomicU64,
    /// Open batches; location sync waits until the outermost one closes
    batch: AtomicUsize,
    this: Weak<Inner<R>>,
}

/// Keeps the published location in step with the active hierarchy
struct LocationSync<R> {
    inner: Weak<Inner<R>>,
}

impl<R: Route> StackObserver<R> for LocationSync<R> {
    fn on_stack_changed(&self, _event: &StackEvent<R>) {
        if let Some(inner) = self.inner.upgrade() {
            inner.sync_location();
        }
    }
}

struct Batch<'a, R: Route> {
    inner: &'a Inner<R>,
}

impl<R: Route> Drop for Batch<'_, R> {
    fn drop(&mut self) {
        if self.inner.batch.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.inner.sync_location();
        }
    }
}

impl<R: Route> Inner<R> {
    /// Wire the built-in adapter and location sync into a new stack
    pub(crate) fn attach(&self, stack: &Stack<R>) {
        if let Some(adapter) = self.registry.adapter(stack.kind()) {
            stack.observe(adapter);
        }
        stack.observe(Arc::new(LocationSync {
            inner: self.this.clone(),
        }));
    }

    fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    fn bump_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn batch(&self) -> Batch<'_, R> {
        self.batch.fetch_add(1, Ordering::SeqCst);
        Batch { inner: self }
    }

    /// Root first, then every layout stack whose layout route is active
    fn active_chain(&self) -> Vec<Stack<R>> {
        let mut chain = vec![self.root.clone()];
        let mut visited = Vec::new();

        loop {
            let Some(route) = chain.last().and_then(|stack| stack.active_route()) else {
                break;
            };
            let Some(key) = route.layout() else {
                break;
            };
            if visited.contains(&key) {
                break;
            }
            visited.push(key);

            match self.layout_stack(key) {
                Some(stack) if !stack.is_empty() => chain.push(stack),
                _ => break,
            }
        }

        chain
    }

    fn compute_location(&self) -> Option<String> {
        self.active_chain()
            .iter()
            .rev()
            .find_map(|stack| stack.active_route().and_then(|route| route.location()))
    }

    /// A hierarchy without a location clears the current one silently;
    /// there is nothing to tell the host.
    fn sync_location(&self) {
        if self.batch.load(Ordering::SeqCst) > 0 {
            return;
        }

        let next = self.compute_location();
        let changed = {
            let mut current = self.location.write();
            if *current == next {
                false
            } else {
                *current = next.clone();
                true
            }
        };

        if let (true, Some(location)) = (changed, next) {
            debug!(location = %location, "Location changed");
            self.publish(&LocationEvent::Changed(location));
        }
    }

    /// Ask the host to show the current location again
    fn republish_location(&self) {
        let current = self.location.read().clone();
        if let Some(location) = current {
            debug!(location = %location, "Restoring location");
            self.publish(&LocationEvent::Restored(location));
        }
    }

    fn publish(&self, event: &LocationEvent) {
        let listeners: Vec<_> = self.listeners.read().iter().cloned().collect();
        for listener in listeners {
            listener.on_location(event);
        }
    }

    fn reset_all(&self) {
        self.root.reset();
        for stack in self.auxiliary.values() {
            stack.reset();
        }
        let layouts: Vec<Stack<R>> = self.layout_stacks.read().values().cloned().collect();
        for stack in layouts {
            stack.reset();
        }
    }

    fn place(&self, stack: &Stack<R>, pending: PendingRoute<R>, placement: Placement) -> Result<()> {
        // A pushed layout route needs its own stack ready for children
        if let Some(key) = pending.route().layout() {
            let spec = self.registry.spec(key).ok_or_else(|| CoordinatorError::UnregisteredLayout {
                layout: key.to_string(),
                route: format!("{:?}", pending.route()),
            })?;
            self.layout_stack_for(key, spec)?;
        }

        if stack.kind().is_indexed() {
            stack.activate_route(pending.route())?;
            let route = pending.supersede();
            info!(stack = %stack.label(), route = ?route, "Activated member");
            return Ok(());
        }

        info!(stack = %stack.label(), route = ?pending.route(), ?placement, "Placing route");
        match placement {
            Placement::MoveToTop => stack.push_or_move_to_top_pending(pending),
            Placement::Push | Placement::Replace => stack.push_pending(pending),
        }
        Ok(())
    }
}

pub struct Coordinator<R> {
    inner: Arc<Inner<R>>,
}

impl<R: Route> Coordinator<R> {
    pub fn builder(config: CoordinatorConfig) -> CoordinatorBuilder<R> {
        CoordinatorBuilder::new(config)
    }

    pub(crate) fn from_parts(
        config: CoordinatorConfig,
        base: Url,
        registry: LayoutRegistry<R>,
        codec: RouteCodec<R>,
        parser: Arc<dyn RouteParser<R>>,
        deep_link: Option<Arc<dyn DeepLinkHandler<R>>>,
    ) -> Self {
        let inner = Arc::new_cyclic(|this: &Weak<Inner<R>>| {
            let root = Stack::list(config.root_label.clone());
            let auxiliary = config
                .auxiliary_stacks
                .iter()
                .map(|label| (label.clone(), Stack::list(label.clone())))
                .collect();

            Inner {
                redirects: RedirectResolver::new(config.max_redirects),
                config,
                base,
                root,
                auxiliary,
                registry,
                layout_stacks: RwLock::new(HashMap::new()),
                codec,
                parser,
                deep_link,
                location: RwLock::new(None),
                listeners: RwLock::new(Vec::new()),
                sequencer: Mutex::new(()),
                generation: AtomicU64::new(0),
                batch: AtomicUsize::new(0),
                this: this.clone(),
            }
        });

        inner.attach(&inner.root);
        for stack in inner.auxiliary.values() {
            inner.attach(stack);
        }

        info!(
            root = %inner.config.root_label,
            auxiliary = inner.auxiliary.len(),
            "Coordinator ready"
        );
        Self { inner }
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.inner.config
    }

    // === Queries ===

    pub fn root(&self) -> Stack<R> {
        self.inner.root.clone()
    }

    /// Root or auxiliary stack by label
    pub fn stack(&self, label: &str) -> Option<Stack<R>> {
        if label == self.inner.config.root_label {
            return Some(self.root());
        }
        self.inner.auxiliary.get(label).cloned()
    }

    /// Children of a layout, once the layout has been materialized
    pub fn layout_stack(&self, key: LayoutKey) -> Option<Stack<R>> {
        self.inner.layout_stack(key)
    }

    pub fn active_chain(&self) -> Vec<Stack<R>> {
        self.inner.active_chain()
    }

    /// Active element of the deepest active stack
    pub fn active_route(&self) -> Option<R> {
        self.inner
            .active_chain()
            .last()
            .and_then(|stack| stack.active_route())
    }

    pub fn current_location(&self) -> Option<String> {
        self.inner.location.read().clone()
    }

    pub fn subscribe(&self, listener: Arc<dyn LocationListener>) {
        self.inner.listeners.write().push(listener);
    }

    // === Navigation ===

    /// Redirect, resolve the owning stack and append.
    ///
    /// The returned handle resolves when the route is popped, or to `None`
    /// when it is discarded.
    pub async fn push(&self, route: R) -> Result<RouteResult> {
        self.navigate(route, Placement::Push).await
    }

    /// Like `push`, but an equal route already in the owning stack is moved
    /// to the top instead of duplicated.
    pub async fn push_or_move_to_top(&self, route: R) -> Result<RouteResult> {
        self.navigate(route, Placement::MoveToTop).await
    }

    /// Reset every stack without consulting guards, then push.
    ///
    /// Navigations issued before this call that have not been applied yet
    /// are discarded. Those issued after it wait and apply on top.
    pub async fn replace(&self, route: R) -> Result<RouteResult> {
        self.navigate(route, Placement::Replace).await
    }

    /// Forced reset of every stack
    pub fn reset(&self) {
        self.inner.bump_generation();
        let _batch = self.inner.batch();
        self.inner.reset_all();
        info!("Navigation reset");
    }

    /// Navigations apply in the order they were issued. Redirect futures
    /// run while holding the turn, so they must not navigate themselves.
    async fn navigate(&self, route: R, placement: Placement) -> Result<RouteResult> {
        let generation = match placement {
            Placement::Replace => self.inner.bump_generation(),
            _ => self.inner.generation(),
        };
        let _turn = self.inner.sequencer.lock().await;

        let (pending, result) = PendingRoute::new(route);
        let Resolved {
            pending,
            result: redirected,
            superseded,
        } = self.inner.redirects.resolve(pending).await?;
        let result = redirected.unwrap_or(result);

        if !superseded.is_empty() {
            debug!(from = ?superseded, to = ?pending.route(), "Redirected navigation");
        }

        if self.inner.generation() != generation {
            let route = pending.supersede();
            info!(route = ?route, "Navigation superseded by a later replace");
            return Ok(result);
        }

        // Configuration problems surface before anything is reset
        self.inner.owner_chain(pending.route())?;

        let _batch = self.inner.batch();
        if placement == Placement::Replace {
            self.inner.reset_all();
        }
        let stack = self.inner.owning_stack(pending.route())?;
        self.inner.place(&stack, pending, placement)?;

        Ok(result)
    }

    /// Pop the deepest active route, handing `outcome` to its result.
    ///
    /// Returns `false` when a guard refuses or defers, or when there is
    /// nothing to uncover.
    pub async fn pop(&self, outcome: RouteOutcome) -> Result<bool> {
        Ok(self.pop_with(outcome).await?.unwrap_or(false))
    }

    /// Pop with a tri-state answer: `Some(true)` popped, `Some(false)`
    /// refused or nothing to pop, `None` a guard deferred.
    pub async fn try_pop(&self) -> Result<Option<bool>> {
        self.pop_with(None).await
    }

    async fn pop_with(&self, outcome: RouteOutcome) -> Result<Option<bool>> {
        let _turn = self.inner.sequencer.lock().await;
        let chain = self.inner.active_chain();
        if !chain
            .iter()
            .any(|stack| !stack.kind().is_indexed() && stack.len() > 1)
        {
            debug!("Nothing to pop");
            return Ok(Some(false));
        }

        // Deepest first; a single-element stack takes its layout route with it
        let mut plan = Vec::new();
        for stack in chain.iter().rev() {
            let Some((id, route)) = stack.active_entry() else {
                continue;
            };

            match ask_permission(&route).await? {
                PopDecision::Allow => {}
                PopDecision::Deny => {
                    info!(stack = %stack.label(), route = ?route, "Pop refused by guard");
                    return Ok(Some(false));
                }
                PopDecision::Deferred => {
                    info!(stack = %stack.label(), route = ?route, "Pop deferred by guard");
                    return Ok(None);
                }
            }

            if stack.kind().is_indexed() {
                continue;
            }
            let uncovers = stack.len() > 1;
            plan.push((stack.clone(), id, route));
            if uncovers {
                break;
            }
        }

        if plan
            .iter()
            .any(|(stack, id, _)| stack.active_entry().map(|(active, _)| active) != Some(*id))
        {
            debug!("Active hierarchy changed while guards were pending");
            return Ok(Some(false));
        }

        let _batch = self.inner.batch();
        let mut outcome = outcome;
        for (stack, id, route) in plan {
            stack.remove_entry(id, outcome.take());
            info!(stack = %stack.label(), route = ?route, "Popped route");

            if let Some(key) = route.layout() {
                if !stack.contains(&route) {
                    self.inner.dispose_layout(key);
                }
            }
        }

        Ok(Some(true))
    }

    // === External navigation ===

    /// Apply `route` with its deep-link strategy
    pub async fn recover(&self, route: R) -> Result<Recovery> {
        self.recover_with(route, None).await
    }

    /// Apply an externally supplied location.
    ///
    /// A location matching a route already in the active hierarchy pops
    /// down to it. If a guard refuses, listeners get `LocationEvent::Restored`
    /// so the host can roll its location back.
    pub async fn recover_from_location(&self, uri: &str) -> Result<Recovery> {
        let location = Location::parse(uri, &self.inner.base)?;
        let route = self.inner.parser.parse(&location).await?;
        info!(location = %location, route = ?route, "Recovering from location");

        if let Some(recovery) = self.pop_down_to(&route).await? {
            return Ok(recovery);
        }
        self.recover_with(route, Some(location)).await
    }

    async fn recover_with(&self, route: R, location: Option<Location>) -> Result<Recovery> {
        match route.deep_link() {
            DeepLinkStrategy::Replace => Ok(Recovery::Navigated(self.replace(route).await?)),
            DeepLinkStrategy::Push => Ok(Recovery::Navigated(self.push(route).await?)),
            DeepLinkStrategy::Custom => {
                let handler = self.inner.deep_link.clone().ok_or_else(|| {
                    CoordinatorError::MissingDeepLinkHandler {
                        route: format!("{:?}", route),
                    }
                })?;
                debug!(route = ?route, "Handing deep link to handler");
                handler.handle(self.clone(), route, location).await?;
                Ok(Recovery::Handled)
            }
        }
    }

    /// `None` when `route` is not in the active hierarchy
    async fn pop_down_to(&self, route: &R) -> Result<Option<Recovery>> {
        let Some(stack) = self
            .inner
            .active_chain()
            .into_iter()
            .rev()
            .find(|stack| !stack.kind().is_indexed() && stack.contains(route))
        else {
            return Ok(None);
        };

        loop {
            if stack.active_route().as_ref() == Some(route) {
                return Ok(Some(Recovery::PoppedTo));
            }
            if !stack.contains(route) {
                return Ok(None);
            }

            if self.pop_with(None).await? != Some(true) {
                info!(route = ?route, "External location refused");
                self.inner.republish_location();
                return Ok(Some(Recovery::Refused));
            }
        }
    }

    // === Restoration ===

    pub fn snapshot(&self) -> Result<NavigationSnapshot> {
        let codec = &self.inner.codec;
        let mut snapshot = NavigationSnapshot::new(codec.encode_stack(&self.inner.root)?);

        for (label, stack) in &self.inner.auxiliary {
            snapshot
                .auxiliary
                .insert(label.clone(), codec.encode_stack(stack)?);
        }

        let layouts: Vec<(LayoutKey, Stack<R>)> = self
            .inner
            .layout_stacks
            .read()
            .iter()
            .map(|(key, stack)| (*key, stack.clone()))
            .collect();
        for (key, stack) in layouts {
            let on_auxiliary = self
                .inner
                .registry
                .spec(key)
                .map_or(false, |spec| spec.stack_label().is_some());
            if on_auxiliary || stack.is_empty() {
                continue;
            }
            snapshot
                .layouts
                .insert(key.to_string(), codec.encode_stack(&stack)?);
        }

        debug!(
            auxiliary = snapshot.auxiliary.len(),
            layouts = snapshot.layouts.len(),
            "Captured snapshot"
        );
        Ok(snapshot)
    }

    /// Replace the whole hierarchy with a snapshot.
    ///
    /// Everything is decoded first; a decoding failure leaves the current
    /// state untouched, including navigations still in flight.
    pub async fn restore(&self, snapshot: &NavigationSnapshot) -> Result<()> {
        let generation = self.inner.generation();
        let _turn = self.inner.sequencer.lock().await;
        let root_label = self.inner.config.root_label.clone();

        let root = self.decode_routes(&root_label, &snapshot.root).await?;

        let mut auxiliary = Vec::new();
        for (label, data) in &snapshot.auxiliary {
            let stack = self.inner.auxiliary.get(label).cloned().ok_or_else(|| {
                CoordinatorError::UnknownStack {
                    label: label.clone(),
                }
            })?;
            auxiliary.push((stack, self.decode_routes(label, data).await?));
        }

        let mut layouts = Vec::new();
        for (name, data) in &snapshot.layouts {
            let (key, spec) = self
                .inner
                .registry
                .find(name)
                .and_then(|key| self.inner.registry.spec(key).map(|spec| (key, spec.clone())))
                .ok_or_else(|| CoordinatorError::UnregisteredLayout {
                    layout: name.clone(),
                    route: "a restored snapshot".to_string(),
                })?;
            self.inner.registry.require_adapter(&spec)?;
            let decoded = self.decode_layout(name, &spec, data).await?;
            layouts.push((key, spec, decoded));
        }

        if self.inner.generation() != generation {
            info!("Restore superseded by a later reset");
            return Ok(());
        }

        let _batch = self.inner.batch();
        self.inner.reset_all();
        self.inner.root.restore(root);
        for (stack, routes) in auxiliary {
            stack.restore(routes);
        }
        for (key, spec, decoded) in layouts {
            let stack = self.inner.layout_stack_for(key, &spec)?;
            match decoded {
                Decoded::Routes(routes) => stack.restore(routes),
                Decoded::Index(index) => {
                    stack.restore(spec.members().to_vec());
                    stack.set_active_index(index)?;
                }
            }
        }

        info!(saved_at = %snapshot.saved_at, "Restored navigation snapshot");
        Ok(())
    }

    async fn decode_routes(&self, label: &str, data: &SerializedStack) -> Result<Vec<R>> {
        match data {
            SerializedStack::Routes(elements) => {
                Ok(self.inner.codec.decode_routes(elements).await?)
            }
            SerializedStack::Index(_) => Err(RestoreError::ShapeMismatch {
                stack: label.to_string(),
                expected: "a route list",
            }
            .into()),
        }
    }

    async fn decode_layout(
        &self,
        name: &str,
        spec: &LayoutSpec<R>,
        data: &SerializedStack,
    ) -> Result<Decoded<R>> {
        match (spec.kind(), data) {
            (StackKind::Indexed, SerializedStack::Index(index)) => {
                let len = spec.members().len();
                if *index >= len {
                    return Err(RestoreError::IndexOutOfRange {
                        stack: name.to_string(),
                        index: *index,
                        len,
                    }
                    .into());
                }
                Ok(Decoded::Index(*index))
            }
            (StackKind::Indexed, SerializedStack::Routes(_)) => Err(RestoreError::ShapeMismatch {
                stack: name.to_string(),
                expected: "an active index",
            }
            .into()),
            (_, data) => Ok(Decoded::Routes(self.decode_routes(name, data).await?)),
        }
    }
}

impl<R> Clone for Coordinator<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}
