//! Redirect resolution
//!
//! Follows a route's redirect chain until a route declines to redirect
//! (no redirect, `None`, or an equal route). Every route left behind is
//! completed with `None`; the final one stays live.

use crate::error::StackError;
use crate::pending::{PendingRoute, RouteResult};
use crate::route::Route;
use crate::Result;

/// Outcome of a resolved chain.
#[derive(Debug)]
pub struct Resolved<R> {
    /// The route that will actually be inserted
    pub pending: PendingRoute<R>,
    /// Result handle of the final route, when it differs from the first one
    pub result: Option<RouteResult>,
    /// Routes that were redirected away from, in chain order
    pub superseded: Vec<R>,
}

impl<R> Resolved<R> {
    pub fn redirected(&self) -> bool {
        !self.superseded.is_empty()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RedirectResolver {
    max_hops: Option<usize>,
}

impl RedirectResolver {
    pub fn new(max_hops: Option<usize>) -> Self {
        Self { max_hops }
    }

    /// No chain-length cap; a chain that never settles will not return.
    pub fn unbounded() -> Self {
        Self { max_hops: None }
    }

    pub fn max_hops(&self) -> Option<usize> {
        self.max_hops
    }

    pub async fn resolve<R: Route>(&self, pending: PendingRoute<R>) -> Result<Resolved<R>> {
        let mut current = pending;
        let mut result = None;
        let mut superseded = Vec::new();

        loop {
            let Some(redirect) = current.route().redirect() else {
                break;
            };

            let next = match redirect.await? {
                None => break,
                Some(next) if &next == current.route() => break,
                Some(next) => next,
            };

            if let Some(limit) = self.max_hops {
                if superseded.len() >= limit {
                    tracing::error!(limit, route = ?next, "Redirect chain too long");
                    return Err(StackError::RedirectLimit {
                        limit,
                        route: format!("{:?}", next),
                    });
                }
            }

            tracing::debug!(from = ?current.route(), to = ?next, "Redirecting route");

            superseded.push(current.supersede());
            let (next_pending, next_result) = PendingRoute::new(next);
            current = next_pending;
            result = Some(next_result);
        }

        Ok(Resolved {
            pending: current,
            result,
            superseded,
        })
    }
}

impl Default for RedirectResolver {
    fn default() -> Self {
        Self::new(Some(32))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::route::RedirectFuture;

    #[derive(Debug, Clone, PartialEq)]
    enum Hop {
        Start,
        Middle,
        End,
        SelfLoop,
        Ping,
        Pong,
        Failing,
    }

    impl Route for Hop {
        fn redirect(&self) -> Option<RedirectFuture<Self>> {
            let next = match self {
                Hop::Start => Some(Hop::Middle),
                Hop::Middle => Some(Hop::End),
                Hop::End => return None,
                Hop::SelfLoop => Some(Hop::SelfLoop),
                Hop::Ping => Some(Hop::Pong),
                Hop::Pong => Some(Hop::Ping),
                Hop::Failing => {
                    return Some(Box::pin(async { Err(anyhow::anyhow!("lookup failed")) }))
                }
            };
            Some(Box::pin(async move { Ok(next) }))
        }
    }

    #[tokio::test]
    async fn test_redirect_chain() {
        let (pending, mut first) = PendingRoute::new(Hop::Start);
        let resolved = RedirectResolver::unbounded().resolve(pending).await.unwrap();

        assert_eq!(resolved.pending.route(), &Hop::End);
        assert_eq!(resolved.superseded, vec![Hop::Start, Hop::Middle]);
        assert_eq!(first.try_outcome(), Some(None));

        let mut last = resolved.result.unwrap();
        assert!(last.is_pending());
    }

    #[tokio::test]
    async fn test_self_redirect_stops() {
        let (pending, mut result) = PendingRoute::new(Hop::SelfLoop);
        let resolved = RedirectResolver::default().resolve(pending).await.unwrap();

        assert!(!resolved.redirected());
        assert!(resolved.result.is_none());
        assert!(result.is_pending());
    }

    #[tokio::test]
    async fn test_cycle_hits_limit() {
        let (pending, _) = PendingRoute::new(Hop::Ping);
        let err = RedirectResolver::new(Some(4))
            .resolve(pending)
            .await
            .unwrap_err();
        assert!(matches!(err, StackError::RedirectLimit { limit: 4, .. }));
    }

    #[tokio::test]
    async fn test_redirect_error_propagates() {
        let (pending, _) = PendingRoute::new(Hop::Failing);
        let err = RedirectResolver::default().resolve(pending).await.unwrap_err();
        assert_eq!(err.to_string(), "lookup failed");
    }
}
