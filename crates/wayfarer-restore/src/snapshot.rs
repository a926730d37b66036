//! Whole-coordinator snapshot

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::RestoreError;
use crate::format::SerializedStack;
use crate::Result;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavigationSnapshot {
    pub version: u32,
    pub saved_at: DateTime<Utc>,
    pub root: SerializedStack,
    /// Keyed by auxiliary stack label
    #[serde(default)]
    pub auxiliary: BTreeMap<String, SerializedStack>,
    /// Keyed by layout type name
    #[serde(default)]
    pub layouts: BTreeMap<String, SerializedStack>,
}

impl NavigationSnapshot {
    pub const VERSION: u32 = 1;

    pub fn new(root: SerializedStack) -> Self {
        Self {
            version: Self::VERSION,
            saved_at: Utc::now(),
            root,
            auxiliary: BTreeMap::new(),
            layouts: BTreeMap::new(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let snapshot: Self = serde_json::from_str(json)?;
        if snapshot.version != Self::VERSION {
            return Err(RestoreError::UnsupportedVersion {
                found: snapshot.version,
                expected: Self::VERSION,
            });
        }
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::SerializedRoute;

    #[test]
    fn test_json_round_trip() {
        let mut snapshot = NavigationSnapshot::new(SerializedStack::Routes(vec![
            SerializedRoute::Location("/".to_string()),
        ]));
        snapshot
            .layouts
            .insert("tabs".to_string(), SerializedStack::Index(1));

        let json = snapshot.to_json().unwrap();
        let decoded = NavigationSnapshot::from_json(&json).unwrap();
        assert_eq!(decoded, snapshot);
    }

    #[test]
    fn test_version_checked() {
        let json = r#"{"version": 9, "saved_at": "2024-01-01T00:00:00Z", "root": []}"#;
        let err = NavigationSnapshot::from_json(json).unwrap_err();
        assert!(matches!(
            err,
            RestoreError::UnsupportedVersion { found: 9, expected: 1 }
        ));
    }
}
