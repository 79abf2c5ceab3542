//! LUIS authoring API seam

use async_trait::async_trait;

use azure_models::LuisAzureAccount;

use crate::errors::DeployError;

/// The two LUIS authoring calls used to bind prediction keys to apps
#[async_trait]
pub trait LuisAuthoring: Send + Sync {
    /// `GET {endpoint}/luis/api/v2.0/azureaccounts`
    async fn list_azure_accounts(
        &self,
        endpoint: &str,
        token: &str,
        authoring_key: &str,
    ) -> Result<Vec<LuisAzureAccount>, DeployError>;

    /// `POST {endpoint}/luis/api/v2.0/apps/{app_id}/azureaccounts`
    async fn assign_azure_account(
        &self,
        endpoint: &str,
        app_id: &str,
        token: &str,
        authoring_key: &str,
        account: &LuisAzureAccount,
    ) -> Result<serde_json::Value, DeployError>;
}
