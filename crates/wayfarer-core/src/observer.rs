//! Stack adapters and location listeners

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use wayfarer_stack::{Route, StackEvent, StackObserver};

/// Default adapter for the built-in stack kinds.
///
/// Rendering is the host's business; this adapter only records what
/// changed so the edit scripts show up in the logs.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingAdapter;

impl<R: Route> StackObserver<R> for LoggingAdapter {
    fn on_stack_changed(&self, event: &StackEvent<R>) {
        debug!(
            stack = %event.label,
            kind = %event.kind,
            inserted = event.script.inserted(),
            removed = event.script.removed(),
            moved = event.script.moved(),
            active = ?event.active,
            len = event.routes.len(),
            "Stack changed"
        );
    }
}

/// Reported to location listeners
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "location", rename_all = "lowercase")]
pub enum LocationEvent {
    /// The deepest active route now has a different location
    Changed(String),
    /// An external location change was refused; the host should show this
    /// location again
    Restored(String),
}

impl LocationEvent {
    pub fn location(&self) -> &str {
        match self {
            LocationEvent::Changed(location) | LocationEvent::Restored(location) => location,
        }
    }
}

impl fmt::Display for LocationEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocationEvent::Changed(location) => write!(f, "changed to {}", location),
            LocationEvent::Restored(location) => write!(f, "restored to {}", location),
        }
    }
}

pub trait LocationListener: Send + Sync {
    fn on_location(&self, event: &LocationEvent);
}

impl<F> LocationListener for F
where
    F: Fn(&LocationEvent) + Send + Sync,
{
    fn on_location(&self, event: &LocationEvent) {
        self(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_json() {
        let event = LocationEvent::Restored("/profile/1".to_string());
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(json, r#"{"type":"restored","location":"/profile/1"}"#);
        assert_eq!(event.location(), "/profile/1");
    }

    #[test]
    fn test_closure_listener() {
        let seen = parking_lot::Mutex::new(Vec::new());
        let listener = |event: &LocationEvent| seen.lock().push(event.clone());
        listener.on_location(&LocationEvent::Changed("/".to_string()));
        assert_eq!(seen.lock().len(), 1);
    }
}
