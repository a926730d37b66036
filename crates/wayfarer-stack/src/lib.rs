//! Wayfarer Stacks
//!
//! The building blocks a coordinator is made of:
//! - `Route` — value-equal descriptor of a destination, with optional
//!   guard, redirect, deep-link and restoration capabilities
//! - `Stack` — ordered, observable history of routes, mutated through
//!   the differ so surviving entries keep their identity
//! - pending results — the handle a caller awaits after a push
//! - guard and redirect interception

mod error;
mod guard;
mod location;
mod pending;
mod redirect;
mod route;
mod stack;

pub use error::StackError;
pub use guard::ask_permission;
pub use location::Location;
pub use pending::{pending, Completer, PendingRoute, RouteOutcome, RouteResult};
pub use redirect::{RedirectResolver, Resolved};
pub use route::{
    DeepLinkStrategy, GuardFuture, LayoutKey, PopDecision, RedirectFuture, Route, RouteParser,
};
pub use stack::{EntryId, Stack, StackEvent, StackKind, StackObserver};

pub use wayfarer_diff::{EditOp, EditScript};

pub type Result<T> = std::result::Result<T, StackError>;
