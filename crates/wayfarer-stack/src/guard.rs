//! Guard interception
//!
//! A route without a declared guard gives implicit permission.

use crate::route::{PopDecision, Route};

/// Ask `route` whether it may be removed from its stack.
pub async fn ask_permission<R: Route>(route: &R) -> anyhow::Result<PopDecision> {
    match route.pop_guard() {
        Some(guard) => {
            let decision = guard.await?;
            tracing::trace!(route = ?route, ?decision, "Guard answered");
            Ok(decision)
        }
        None => Ok(PopDecision::Allow),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::route::GuardFuture;

    #[derive(Debug, Clone, PartialEq)]
    enum Page {
        Plain,
        Confirm,
        Broken,
    }

    impl Route for Page {
        fn pop_guard(&self) -> Option<GuardFuture> {
            match self {
                Page::Plain => None,
                Page::Confirm => Some(Box::pin(async { Ok(PopDecision::Deferred) })),
                Page::Broken => Some(Box::pin(async { Err(anyhow::anyhow!("guard exploded")) })),
            }
        }
    }

    #[tokio::test]
    async fn test_missing_guard_allows() {
        assert_eq!(ask_permission(&Page::Plain).await.unwrap(), PopDecision::Allow);
    }

    #[tokio::test]
    async fn test_guard_decision_is_returned() {
        assert_eq!(
            ask_permission(&Page::Confirm).await.unwrap(),
            PopDecision::Deferred
        );
    }

    #[tokio::test]
    async fn test_guard_error_propagates() {
        let err = ask_permission(&Page::Broken).await.unwrap_err();
        assert_eq!(err.to_string(), "guard exploded");
    }
}
