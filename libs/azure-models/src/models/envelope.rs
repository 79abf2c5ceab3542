//! Response envelopes shared by the management APIs

use serde::{Deserialize, Serialize};

/// A response whose HTTP status matters to the caller.
///
/// `body` is only populated for 2xx responses; otherwise the raw error body is
/// kept in `error`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<serde_json::Value>,
}

impl<T> ApiResponse<T> {
    pub fn ok(status: u16, body: T) -> Self {
        Self {
            status,
            body: Some(body),
            error: None,
        }
    }

    pub fn failed(status: u16, error: serde_json::Value) -> Self {
        Self {
            status,
            body: None,
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// A page of results from a list endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PagedList<T> {
    #[serde(default = "Vec::new")]
    pub value: Vec<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_link: Option<String>,
}

/// ARM error object, possibly nested through `details`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<ErrorResponse>>,
}

/// The `{"error": {...}}` wrapper most Azure services use for failures
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    #[serde(default)]
    pub error: Option<ErrorResponse>,
}
