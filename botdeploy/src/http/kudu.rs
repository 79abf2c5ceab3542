//! Kudu zip-deploy client

use std::path::Path;

use async_trait::async_trait;
use reqwest::{header, Body, Method};

use azure_models::ZipDeployStatus;

use crate::deploy::zip_deployer::{UploadResponse, ZipUploader};
use crate::errors::DeployError;
use crate::http::client::{parse_json, HttpClient};

/// Uploads archives to an App Service SCM site
#[derive(Debug, Clone)]
pub struct KuduClient {
    http: HttpClient,
}

impl KuduClient {
    pub fn new() -> Result<Self, DeployError> {
        // Site URLs are absolute; the base only satisfies the client
        Ok(Self {
            http: HttpClient::new("https://scm.azurewebsites.net")?,
        })
    }
}

#[async_trait]
impl ZipUploader for KuduClient {
    async fn upload(&self, url: &str, token: &str, zip_path: &Path) -> Result<UploadResponse, DeployError> {
        let file = tokio::fs::File::open(zip_path).await?;
        let length = file.metadata().await?.len();

        let response = self
            .http
            .request(Method::POST, url, token, &[])
            .header(header::CONTENT_TYPE, "application/zip")
            .header(header::CONTENT_LENGTH, length)
            .body(Body::from(file))
            .send()
            .await?;

        let status = response.status();
        let status_url = response
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.text().await?;

        if !status.is_success() {
            return Err(DeployError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }

        Ok(UploadResponse {
            status: status.as_u16(),
            body,
            status_url,
        })
    }

    async fn deployment_status(&self, status_url: &str, token: &str) -> Result<ZipDeployStatus, DeployError> {
        let response = self
            .http
            .request(Method::GET, status_url, token, &[])
            .send()
            .await?;
        parse_json(Method::GET, response).await
    }
}
