//! Per-item outcome of a multi-file upload.

use serde::{Deserialize, Serialize};

/// Outcome of one submission in a batch upload.
///
/// Serialized as `{"name", "status": "success", "contentType"}` or
/// `{"name", "status": "failed", "error"}`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum BatchItemResult {
    Success {
        name: String,
        #[serde(rename = "contentType")]
        content_type: String,
    },
    Failed {
        name: String,
        error: String,
    },
}

impl BatchItemResult {
    pub fn success(name: impl Into<String>, content_type: impl Into<String>) -> Self {
        Self::Success {
            name: name.into(),
            content_type: content_type.into(),
        }
    }

    pub fn failed(name: impl Into<String>, error: impl ToString) -> Self {
        Self::Failed {
            name: name.into(),
            error: error.to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}
