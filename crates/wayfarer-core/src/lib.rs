//! Wayfarer Core
//!
//! The coordinator owns one root stack plus labeled auxiliary stacks,
//! resolves which stack owns a route through the layout hierarchy, runs
//! redirects and pop guards around every mutation, and keeps the external
//! location in sync with the deepest active route.

mod builder;
mod config;
mod coordinator;
mod error;
mod layout;
mod observer;

#[cfg(test)]
mod testing;

pub use builder::CoordinatorBuilder;
pub use config::CoordinatorConfig;
pub use coordinator::{Coordinator, DeepLinkHandler, Recovery};
pub use error::CoordinatorError;
pub use layout::LayoutSpec;
pub use observer::{LocationEvent, LocationListener, LoggingAdapter};

// Re-export the building blocks
pub use wayfarer_diff::{diff, EditOp, EditScript};
pub use wayfarer_restore::{
    ConverterRegistry, NavigationSnapshot, RestoreError, RouteConverter, SerdeConverter,
    SerializedRoute, SerializedStack,
};
pub use wayfarer_stack::{
    DeepLinkStrategy, EntryId, GuardFuture, LayoutKey, Location, PopDecision, RedirectFuture,
    Route, RouteOutcome, RouteParser, RouteResult, Stack, StackError, StackEvent, StackKind,
    StackObserver,
};

pub type Result<T> = std::result::Result<T, CoordinatorError>;

/// Initialize logging
pub fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt().with_env_filter(filter).with_target(true).init();
}
