//! Stack error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StackError {
    #[error("Route not found in stack '{stack}': {route}")]
    RouteNotFound { stack: String, route: String },

    #[error("Index {index} out of range for stack '{stack}' holding {len} routes")]
    IndexOutOfRange {
        stack: String,
        index: usize,
        len: usize,
    },

    #[error("Stack '{stack}' is {kind}, only indexed stacks can activate routes")]
    NotIndexed { stack: String, kind: String },

    #[error("Redirect chain exceeded {limit} hops at {route}")]
    RedirectLimit { limit: usize, route: String },

    #[error("Invalid location '{input}': {source}")]
    InvalidLocation {
        input: String,
        #[source]
        source: url::ParseError,
    },

    /// A guard or redirect supplied by the application failed
    #[error(transparent)]
    Predicate(#[from] anyhow::Error),
}
