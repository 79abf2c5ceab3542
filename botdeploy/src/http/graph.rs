//! Azure AD Graph client

use async_trait::async_trait;

use azure_models::{Application, ApplicationCreateRequest};

use crate::errors::DeployError;
use crate::http::client::HttpClient;
use crate::provision::api::GraphApi;

const GRAPH_API_VERSION: &str = "1.6";

/// Graph REST client used for application registrations
#[derive(Debug, Clone)]
pub struct GraphClient {
    http: HttpClient,
}

impl GraphClient {
    pub fn new(base_url: &str) -> Result<Self, DeployError> {
        Ok(Self {
            http: HttpClient::new(base_url)?,
        })
    }
}

#[async_trait]
impl GraphApi for GraphClient {
    async fn create_application(
        &self,
        token: &str,
        tenant_id: &str,
        request: &ApplicationCreateRequest,
    ) -> Result<Application, DeployError> {
        let path = format!("/{}/applications?api-version={}", tenant_id, GRAPH_API_VERSION);
        self.http.post(&path, token, request).await
    }
}
