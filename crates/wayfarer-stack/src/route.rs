//! Route values and their optional capabilities

use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::future::Future;

use crate::location::Location;

/// Stable tag naming a layout type.
///
/// Layout factories, layout stacks and snapshots are all keyed by this tag,
/// never by the identity of a layout route instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayoutKey(&'static str);

impl LayoutKey {
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for LayoutKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

impl Serialize for LayoutKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.0)
    }
}

/// How an externally triggered navigation to a route is applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeepLinkStrategy {
    /// Reset every stack, then push
    #[default]
    Replace,
    /// Push on top of the current state
    Push,
    /// Hand the coordinator to the application's deep-link handler
    Custom,
}

/// Answer of a pop guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PopDecision {
    Allow,
    Deny,
    /// The guard handles the pop itself (e.g. after a confirmation prompt)
    Deferred,
}

impl PopDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, PopDecision::Allow)
    }

    /// Tri-state outcome reported by `try_pop`
    pub fn as_outcome(&self) -> Option<bool> {
        match self {
            PopDecision::Allow => Some(true),
            PopDecision::Deny => Some(false),
            PopDecision::Deferred => None,
        }
    }
}

impl From<bool> for PopDecision {
    fn from(allowed: bool) -> Self {
        if allowed {
            PopDecision::Allow
        } else {
            PopDecision::Deny
        }
    }
}

pub type GuardFuture = BoxFuture<'static, anyhow::Result<PopDecision>>;
pub type RedirectFuture<R> = BoxFuture<'static, anyhow::Result<Option<R>>>;

/// A navigable destination.
///
/// Equality is structural: two routes comparing equal are interchangeable
/// for stack membership. Every capability is optional and defaults to
/// "not implemented".
pub trait Route: Clone + PartialEq + fmt::Debug + Send + Sync + 'static {
    /// Layout type whose stack owns this route; `None` means the root stack
    fn owner(&self) -> Option<LayoutKey> {
        None
    }

    /// Set when this route is itself a layout route
    fn layout(&self) -> Option<LayoutKey> {
        None
    }

    /// Externally visible location, e.g. `/profile/123`
    fn location(&self) -> Option<String> {
        None
    }

    /// Consulted before the route is removed from its stack
    fn pop_guard(&self) -> Option<GuardFuture> {
        None
    }

    /// Substitute this route with another one before it becomes active.
    /// Resolving to `None` or to an equal route keeps this one.
    fn redirect(&self) -> Option<RedirectFuture<Self>> {
        None
    }

    fn deep_link(&self) -> DeepLinkStrategy {
        DeepLinkStrategy::Replace
    }

    /// Key of the restoration converter for routes that cannot be rebuilt
    /// from their location alone
    fn converter(&self) -> Option<&'static str> {
        None
    }
}

/// Builds a route from a location. Supplied once by the application.
pub trait RouteParser<R>: Send + Sync {
    fn parse(&self, location: &Location) -> BoxFuture<'static, anyhow::Result<R>>;
}

impl<R, F, Fut> RouteParser<R> for F
where
    F: Fn(Location) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<R>> + Send + 'static,
{
    fn parse(&self, location: &Location) -> BoxFuture<'static, anyhow::Result<R>> {
        Box::pin(self(location.clone()))
    }
}
