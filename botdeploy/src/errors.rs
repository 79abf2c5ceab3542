//! Error types for botdeploy

use thiserror::Error;

/// Main error type for provisioning and deployment
#[derive(Error, Debug)]
pub enum DeployError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Request failed with status {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("Archive error: {0}")]
    ArchiveError(#[from] zip::result::ZipError),

    /// Missing or expired credentials. The message tells the user how to fix it.
    #[error("{0}")]
    AuthError(String),

    #[error("Token error: {0}")]
    TokenError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Validation error: {message}")]
    ValidationError {
        message: String,
        details: Option<serde_json::Value>,
    },

    #[error("Deployment error: {0}")]
    DeploymentError(String),

    #[error("Link error: {0}")]
    LinkError(String),

    #[error("Build error: {0}")]
    BuildError(String),

    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DeployError {
    /// HTTP status of a failed request, if this error carries one
    pub fn status(&self) -> Option<u16> {
        match self {
            DeployError::HttpStatus { status, .. } => Some(*status),
            DeployError::HttpError(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Serialize the error for an event payload
    pub fn to_event_message(&self) -> serde_json::Value {
        let mut payload = serde_json::json!({
            "kind": self.kind(),
            "message": self.to_string(),
        });
        match self {
            DeployError::HttpStatus { status, body } => {
                payload["status"] = (*status).into();
                payload["body"] = body.clone().into();
            }
            DeployError::ValidationError {
                details: Some(details),
                ..
            } => {
                payload["details"] = details.clone();
            }
            _ => {}
        }
        payload
    }

    fn kind(&self) -> &'static str {
        match self {
            DeployError::IoError(_) => "IoError",
            DeployError::JsonError(_) => "JsonError",
            DeployError::HttpError(_) => "HttpError",
            DeployError::HttpStatus { .. } => "HttpStatus",
            DeployError::ArchiveError(_) => "ArchiveError",
            DeployError::AuthError(_) => "AuthError",
            DeployError::TokenError(_) => "TokenError",
            DeployError::ConfigError(_) => "ConfigError",
            DeployError::ValidationError { .. } => "ValidationError",
            DeployError::DeploymentError(_) => "DeploymentError",
            DeployError::LinkError(_) => "LinkError",
            DeployError::BuildError(_) => "BuildError",
            DeployError::InvalidTransition(_) => "InvalidTransition",
            DeployError::Internal(_) => "Internal",
        }
    }
}

impl From<anyhow::Error> for DeployError {
    fn from(err: anyhow::Error) -> Self {
        DeployError::Internal(err.to_string())
    }
}

impl From<walkdir::Error> for DeployError {
    fn from(err: walkdir::Error) -> Self {
        DeployError::IoError(err.into())
    }
}

impl From<tokio::task::JoinError> for DeployError {
    fn from(err: tokio::task::JoinError) -> Self {
        DeployError::Internal(format!("background task failed: {}", err))
    }
}
