//! Pending results
//!
//! The result a caller awaits after pushing a route belongs to the stack
//! entry, not to the route value. Completing an entry (pop, supersession,
//! reset) is therefore a stack-level operation.

use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::oneshot;

/// What a popped route hands back; `None` when it was discarded
pub type RouteOutcome = Option<Value>;

/// Sending half, owned by a stack entry.
///
/// Dropping it without completing resolves the result to `None`.
#[derive(Debug)]
pub struct Completer {
    tx: oneshot::Sender<RouteOutcome>,
}

impl Completer {
    pub fn complete(self, outcome: RouteOutcome) {
        // The caller may have stopped listening
        let _ = self.tx.send(outcome);
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Receiving half, handed to whoever pushed the route.
#[derive(Debug)]
pub struct RouteResult {
    rx: oneshot::Receiver<RouteOutcome>,
    settled: Option<RouteOutcome>,
}

impl RouteResult {
    /// Non-blocking check. `None` while the route is still live.
    pub fn try_outcome(&mut self) -> Option<RouteOutcome> {
        if self.settled.is_none() {
            self.settled = match self.rx.try_recv() {
                Ok(outcome) => Some(outcome),
                Err(oneshot::error::TryRecvError::Empty) => None,
                Err(oneshot::error::TryRecvError::Closed) => Some(None),
            };
        }
        self.settled.clone()
    }

    pub fn is_pending(&mut self) -> bool {
        self.try_outcome().is_none()
    }
}

impl Future for RouteResult {
    type Output = RouteOutcome;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if let Some(outcome) = self.settled.take() {
            return Poll::Ready(outcome);
        }
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|received| received.ok().flatten())
    }
}

/// A connected completer/result pair
pub fn pending() -> (Completer, RouteResult) {
    let (tx, rx) = oneshot::channel();
    (
        Completer { tx },
        RouteResult { rx, settled: None },
    )
}

/// A route on its way into a stack, together with its completer.
#[derive(Debug)]
pub struct PendingRoute<R> {
    route: R,
    completer: Completer,
}

impl<R> PendingRoute<R> {
    pub fn new(route: R) -> (Self, RouteResult) {
        let (completer, result) = pending();
        (Self { route, completer }, result)
    }

    /// Nobody awaits this route (restoration, layout materialization)
    pub fn detached(route: R) -> Self {
        Self::new(route).0
    }

    pub fn route(&self) -> &R {
        &self.route
    }

    /// Complete with `None` and hand the route back
    pub fn supersede(self) -> R {
        self.completer.complete(None);
        self.route
    }

    pub fn into_parts(self) -> (R, Completer) {
        (self.route, self.completer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_complete_with_value() {
        let (completer, result) = pending();
        completer.complete(Some(json!({"saved": true})));
        assert_eq!(result.await, Some(json!({"saved": true})));
    }

    #[tokio::test]
    async fn test_dropped_completer_resolves_none() {
        let (pending_route, mut result) = PendingRoute::new("home");
        assert!(result.is_pending());

        drop(pending_route);
        assert_eq!(result.try_outcome(), Some(None));
        assert_eq!(result.await, None);
    }

    #[test]
    fn test_supersede_returns_route() {
        let (pending_route, mut result) = PendingRoute::new(7);
        assert_eq!(pending_route.supersede(), 7);
        assert_eq!(result.try_outcome(), Some(None));
    }
}
