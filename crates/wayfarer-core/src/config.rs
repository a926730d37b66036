//! Coordinator configuration

use serde::{Deserialize, Serialize};

use crate::error::CoordinatorError;
use crate::Result;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// Label of the mandatory root stack
    pub root_label: String,
    /// Labels of auxiliary stacks, created eagerly
    pub auxiliary_stacks: Vec<String>,
    /// Base URI relative locations are resolved against
    pub location_base: String,
    /// Redirect chain cap; `None` leaves termination to the routes
    pub max_redirects: Option<usize>,
}

impl CoordinatorConfig {
    pub fn new() -> Self {
        Self {
            root_label: "root".to_string(),
            auxiliary_stacks: Vec::new(),
            location_base: "app://local/".to_string(),
            max_redirects: Some(32),
        }
    }

    pub fn with_auxiliary(mut self, label: impl Into<String>) -> Self {
        self.auxiliary_stacks.push(label.into());
        self
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| CoordinatorError::Config(e.to_string()))
    }

    /// Reject duplicate or empty stack labels
    pub fn validate(&self) -> Result<()> {
        if self.root_label.trim().is_empty() {
            return Err(CoordinatorError::Config(
                "root stack label cannot be empty".to_string(),
            ));
        }

        let mut seen = vec![self.root_label.as_str()];
        for label in &self.auxiliary_stacks {
            if label.trim().is_empty() {
                return Err(CoordinatorError::Config(
                    "auxiliary stack label cannot be empty".to_string(),
                ));
            }
            if seen.contains(&label.as_str()) {
                return Err(CoordinatorError::Config(format!(
                    "duplicate stack label '{}'",
                    label
                )));
            }
            seen.push(label);
        }

        Ok(())
    }
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self::new()
    }
}
