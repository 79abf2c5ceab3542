//! Kudu (App Service SCM) zip-deploy models

use serde::{Deserialize, Serialize};

/// Kudu deployment status codes
pub mod status {
    pub const PENDING: i32 = 0;
    pub const BUILDING: i32 = 1;
    pub const DEPLOYING: i32 = 2;
    pub const FAILED: i32 = 3;
    pub const SUCCESS: i32 = 4;
}

/// Deployment status returned by the zip-deploy status URL
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ZipDeployStatus {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub status: i32,
    #[serde(default)]
    pub status_text: Option<String>,
    #[serde(default)]
    pub complete: bool,
    #[serde(default)]
    pub message: Option<String>,
}

impl ZipDeployStatus {
    pub fn succeeded(&self) -> bool {
        self.complete && self.status == status::SUCCESS
    }

    pub fn failed(&self) -> bool {
        self.status == status::FAILED
    }
}
