//! Zip deployment to an App Service site

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use azure_models::ZipDeployStatus;

use crate::app::options::WaitOptions;
use crate::authn::access_token::REFRESH_HINT;
use crate::errors::DeployError;
use crate::events::{DeployStatus, EventLogger};
use crate::utils::{calc_exp_backoff, resource_group_name};

/// Response of the upload call
#[derive(Debug, Clone, Serialize)]
pub struct UploadResponse {
    pub status: u16,
    pub body: String,
    /// Where the asynchronous deployment reports progress
    pub status_url: Option<String>,
}

/// Transport for zip uploads
#[async_trait]
pub trait ZipUploader: Send + Sync {
    /// POST the archive bytes, streamed from disk, with bearer auth
    async fn upload(&self, url: &str, token: &str, zip_path: &Path) -> Result<UploadResponse, DeployError>;

    /// Read the status of an asynchronous deployment
    async fn deployment_status(&self, status_url: &str, token: &str) -> Result<ZipDeployStatus, DeployError>;
}

/// Site host: the explicit hostname, else `{name}-{env}`
pub fn publish_host(name: &str, environment: &str, hostname: Option<&str>) -> String {
    match hostname.filter(|h| !h.is_empty()) {
        Some(host) => host.to_string(),
        None => resource_group_name(name, environment),
    }
}

/// Zip-deploy endpoint of a site
pub fn zipdeploy_url(host: &str, scm_host_suffix: &str) -> String {
    format!("https://{}.{}/zipdeploy/?isAsync=true", host, scm_host_suffix)
}

/// Uploads a packaged bot and reports the result
pub struct ZipDeployer {
    uploader: Arc<dyn ZipUploader>,
    logger: EventLogger,
    scm_host_suffix: String,
    wait: WaitOptions,
}

impl ZipDeployer {
    pub fn new(
        uploader: Arc<dyn ZipUploader>,
        logger: EventLogger,
        scm_host_suffix: impl Into<String>,
        wait: WaitOptions,
    ) -> Self {
        Self {
            uploader,
            logger,
            scm_host_suffix: scm_host_suffix.into(),
            wait,
        }
    }

    /// Upload `zip_path` to `{host}.{scm suffix}`.
    ///
    /// A 403 means the token expired and becomes an `AuthError`; any other failure is returned as is.
    pub async fn deploy_zip(
        &self,
        token: &str,
        zip_path: &Path,
        name: &str,
        environment: &str,
        hostname: Option<&str>,
    ) -> Result<UploadResponse, DeployError> {
        self.logger
            .log(DeployStatus::DeployInfo, "Retrieve publishing details ...");

        let host = publish_host(name, environment, hostname);
        let url = zipdeploy_url(&host, &self.scm_host_suffix);

        let response = match self.uploader.upload(&url, token, zip_path).await {
            Ok(response) => response,
            Err(e) if e.status() == Some(403) => {
                return Err(DeployError::AuthError(format!(
                    "Token expired, please {}",
                    REFRESH_HINT
                )));
            }
            Err(e) => return Err(e),
        };
        self.logger.log_value(DeployStatus::DeployInfo, &response);

        if let (true, Some(status_url)) = (self.wait.enabled, response.status_url.as_deref()) {
            self.await_completion(token, status_url).await?;
        }

        Ok(response)
    }

    async fn await_completion(&self, token: &str, status_url: &str) -> Result<(), DeployError> {
        for attempt in 0..self.wait.max_polls {
            tokio::time::sleep(calc_exp_backoff(&self.wait.cooldown, attempt)).await;

            let status = self.uploader.deployment_status(status_url, token).await?;
            if status.failed() {
                let detail = status
                    .status_text
                    .clone()
                    .or(status.message.clone())
                    .unwrap_or_default();
                return Err(DeployError::DeploymentError(format!(
                    "Zip deployment failed: {}",
                    detail
                )));
            }
            if status.succeeded() {
                self.logger.log_value(DeployStatus::DeployInfo, &status);
                return Ok(());
            }
        }

        self.logger.log(
            DeployStatus::DeployInfo,
            format!(
                "Zip deployment still running after {} checks, follow it at {}",
                self.wait.max_polls, status_url
            ),
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_host() {
        assert_eq!(publish_host("mybot", "dev", None), "mybot-dev");
        assert_eq!(publish_host("mybot", "dev", Some("custom")), "custom");
        assert_eq!(publish_host("mybot", "dev", Some("")), "mybot-dev");
    }

    #[test]
    fn test_zipdeploy_url() {
        assert_eq!(
            zipdeploy_url("mybot-dev", "scm.azurewebsites.net"),
            "https://mybot-dev.scm.azurewebsites.net/zipdeploy/?isAsync=true"
        );
    }
}
