//! Remote collaborators of the provisioner

use async_trait::async_trait;

use azure_models::{
    ApiKey, ApiKeyRequest, ApiResponse, AppInsightsComponent, Application,
    ApplicationCreateRequest, BotResource, Deployment, DeploymentExtended, DeploymentOperation,
    DeploymentValidateResult, ResourceGroup, Subscription,
};

use crate::errors::DeployError;

/// Subscription, token and resource group a management call runs against
#[derive(Clone, Copy)]
pub struct ArmScope<'a> {
    pub token: &'a str,
    pub subscription_id: &'a str,
    pub resource_group: &'a str,
}

impl std::fmt::Debug for ArmScope<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArmScope")
            .field("subscription_id", &self.subscription_id)
            .field("resource_group", &self.resource_group)
            .finish_non_exhaustive()
    }
}

/// Azure Resource Manager operations used by `create`
#[async_trait]
pub trait ResourceManager: Send + Sync {
    /// Look up a subscription (used for its tenant id)
    async fn get_subscription(
        &self,
        token: &str,
        subscription_id: &str,
    ) -> Result<Subscription, DeployError>;

    /// Create or update the scope's resource group
    async fn create_resource_group(
        &self,
        scope: &ArmScope<'_>,
        location: &str,
    ) -> Result<ResourceGroup, DeployError>;

    /// Validate a template deployment. A rejected template is an `Ok` result with `error` set.
    async fn validate_deployment(
        &self,
        scope: &ArmScope<'_>,
        deployment_name: &str,
        deployment: &Deployment,
    ) -> Result<DeploymentValidateResult, DeployError>;

    /// Create or update a template deployment
    async fn create_deployment(
        &self,
        scope: &ArmScope<'_>,
        deployment_name: &str,
        deployment: &Deployment,
    ) -> Result<ApiResponse<DeploymentExtended>, DeployError>;

    async fn get_deployment(
        &self,
        scope: &ArmScope<'_>,
        deployment_name: &str,
    ) -> Result<DeploymentExtended, DeployError>;

    async fn list_deployment_operations(
        &self,
        scope: &ArmScope<'_>,
        deployment_name: &str,
    ) -> Result<Vec<DeploymentOperation>, DeployError>;

    async fn get_app_insights_component(
        &self,
        scope: &ArmScope<'_>,
        component: &str,
    ) -> Result<AppInsightsComponent, DeployError>;

    async fn create_app_insights_api_key(
        &self,
        scope: &ArmScope<'_>,
        component: &str,
        request: &ApiKeyRequest,
    ) -> Result<ApiResponse<ApiKey>, DeployError>;

    async fn get_bot(&self, scope: &ArmScope<'_>, bot_name: &str) -> Result<BotResource, DeployError>;

    async fn update_bot(
        &self,
        scope: &ArmScope<'_>,
        bot_name: &str,
        bot: &BotResource,
    ) -> Result<ApiResponse<BotResource>, DeployError>;
}

/// Application registration directory
#[async_trait]
pub trait GraphApi: Send + Sync {
    async fn create_application(
        &self,
        token: &str,
        tenant_id: &str,
        request: &ApplicationCreateRequest,
    ) -> Result<Application, DeployError>;
}
