//! Wire format of serialized stacks

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One stack element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SerializedRoute {
    /// Rebuilt through the route parser
    Location(String),
    Record(RouteRecord),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "lowercase")]
pub enum RouteRecord {
    Converter { converter: String, value: Value },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SerializedStack {
    /// Active index of an indexed stack
    Index(usize),
    Routes(Vec<SerializedRoute>),
}
