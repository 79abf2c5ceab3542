//! LUIS authoring client

use async_trait::async_trait;

use azure_models::LuisAzureAccount;

use crate::errors::DeployError;
use crate::http::client::HttpClient;
use crate::luis::api::LuisAuthoring;

const SUBSCRIPTION_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";

/// LUIS authoring REST client. Endpoints are passed per call since they depend on the region.
#[derive(Debug, Clone)]
pub struct LuisClient {
    http: HttpClient,
}

impl LuisClient {
    pub fn new() -> Result<Self, DeployError> {
        // Every call passes an absolute URL; the base only satisfies the client
        Ok(Self {
            http: HttpClient::new("https://api.cognitive.microsoft.com")?,
        })
    }
}

#[async_trait]
impl LuisAuthoring for LuisClient {
    async fn list_azure_accounts(
        &self,
        endpoint: &str,
        token: &str,
        authoring_key: &str,
    ) -> Result<Vec<LuisAzureAccount>, DeployError> {
        let url = format!("{}/luis/api/v2.0/azureaccounts", endpoint.trim_end_matches('/'));
        self.http
            .get_with_headers(&url, token, &[(SUBSCRIPTION_KEY_HEADER, authoring_key)])
            .await
    }

    async fn assign_azure_account(
        &self,
        endpoint: &str,
        app_id: &str,
        token: &str,
        authoring_key: &str,
        account: &LuisAzureAccount,
    ) -> Result<serde_json::Value, DeployError> {
        let url = format!(
            "{}/luis/api/v2.0/apps/{}/azureaccounts",
            endpoint.trim_end_matches('/'),
            app_id
        );
        self.http
            .post_with_headers(&url, token, account, &[(SUBSCRIPTION_KEY_HEADER, authoring_key)])
            .await
    }
}
