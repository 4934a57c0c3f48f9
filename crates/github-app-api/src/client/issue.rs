//! Issue and pull request labels.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ApiError;

/// A label applied to an issue or pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    id: u64,
    name: String,
    /// Hex color without the leading `#`
    color: String,
    #[serde(default)]
    description: Option<String>,
}

impl Label {
    /// Build a label from its API representation.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::UnexpectedPayload` if `id`, `name` or `color` is
    /// missing.
    pub fn from_api_response(data: &Value) -> Result<Self, ApiError> {
        Self::deserialize(data)
            .map_err(|e| ApiError::unexpected_payload(format!("invalid label: {}", e)))
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn color(&self) -> &str {
        &self.color
    }

    /// Label description, empty when unset.
    pub fn description(&self) -> &str {
        self.description.as_deref().unwrap_or_default()
    }
}

#[cfg(test)]
#[path = "issue_tests.rs"]
mod tests;
