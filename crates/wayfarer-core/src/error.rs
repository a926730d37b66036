//! Coordinator error types

use thiserror::Error;

use wayfarer_restore::RestoreError;
use wayfarer_stack::StackError;

#[derive(Error, Debug)]
pub enum CoordinatorError {
    #[error(
        "Layout type '{layout}' required by {route} has no registered factory; call CoordinatorBuilder::layout(LayoutKey::new(\"{layout}\"), ..)"
    )]
    UnregisteredLayout { layout: String, route: String },

    #[error(
        "No stack adapter registered for stack kind '{kind}'; call CoordinatorBuilder::stack_adapter(StackKind::Custom(\"{kind}\".into()), ..)"
    )]
    UnregisteredStackAdapter { kind: String },

    #[error("Unknown stack '{label}'; declare it in CoordinatorConfig::auxiliary_stacks")]
    UnknownStack { label: String },

    #[error("Layout owner chain loops: {chain}")]
    LayoutCycle { chain: String },

    #[error(
        "{route} asks for a custom deep link but no handler is configured; call CoordinatorBuilder::deep_link_handler"
    )]
    MissingDeepLinkHandler { route: String },

    #[error("No route parser configured; call CoordinatorBuilder::parser")]
    MissingParser,

    #[error("Invalid location base '{base}': {source}")]
    InvalidBase {
        base: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Stack error: {0}")]
    Stack(StackError),

    #[error("Restore error: {0}")]
    Restore(RestoreError),

    /// A guard, redirect, parser or handler supplied by the application failed
    #[error(transparent)]
    Predicate(#[from] anyhow::Error),
}

// Application failures surface unchanged, whichever layer saw them first
impl From<StackError> for CoordinatorError {
    fn from(err: StackError) -> Self {
        match err {
            StackError::Predicate(inner) => CoordinatorError::Predicate(inner),
            other => CoordinatorError::Stack(other),
        }
    }
}

impl From<RestoreError> for CoordinatorError {
    fn from(err: RestoreError) -> Self {
        match err {
            RestoreError::Predicate(inner) => CoordinatorError::Predicate(inner),
            RestoreError::Stack(StackError::Predicate(inner)) => CoordinatorError::Predicate(inner),
            other => CoordinatorError::Restore(other),
        }
    }
}

impl CoordinatorError {
    /// Wiring mistakes that no retry can fix
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            CoordinatorError::UnregisteredLayout { .. }
                | CoordinatorError::UnregisteredStackAdapter { .. }
                | CoordinatorError::UnknownStack { .. }
                | CoordinatorError::LayoutCycle { .. }
                | CoordinatorError::MissingDeepLinkHandler { .. }
                | CoordinatorError::MissingParser
                | CoordinatorError::InvalidBase { .. }
                | CoordinatorError::Config(_)
                | CoordinatorError::Stack(StackError::RouteNotFound { .. })
                | CoordinatorError::Restore(
                    RestoreError::UnregisteredConverter { .. }
                        | RestoreError::UnregisteredLayout { .. }
                        | RestoreError::IndexOutOfRange { .. }
                )
        )
    }
}
