//! Restoration error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RestoreError {
    #[error(
        "No restoration converter registered for '{key}'; call ConverterRegistry::register(\"{key}\", ..) before restoring"
    )]
    UnregisteredConverter { key: String },

    #[error(
        "Route {route} declares owning layout '{layout}' which was never registered; call CoordinatorBuilder::layout(\"{layout}\", ..)"
    )]
    UnregisteredLayout { layout: String, route: String },

    #[error("Route {route} has neither a location nor a converter and cannot be serialized")]
    NotRestorable { route: String },

    #[error("Cannot restore index {index} into stack '{stack}' holding {len} routes")]
    IndexOutOfRange {
        stack: String,
        index: usize,
        len: usize,
    },

    #[error("Stack '{stack}' expects {expected} data")]
    ShapeMismatch {
        stack: String,
        expected: &'static str,
    },

    #[error("Unsupported snapshot version {found}, expected {expected}")]
    UnsupportedVersion { found: u32, expected: u32 },

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Stack error: {0}")]
    Stack(#[from] wayfarer_stack::StackError),

    /// A parser or converter supplied by the application failed
    #[error(transparent)]
    Predicate(#[from] anyhow::Error),
}
