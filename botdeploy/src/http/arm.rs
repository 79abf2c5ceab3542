//! Azure Resource Manager client

use async_trait::async_trait;
use reqwest::Method;

use azure_models::{
    ApiKey, ApiKeyRequest, ApiResponse, AppInsightsComponent, BotResource, Deployment,
    DeploymentExtended, DeploymentOperation, DeploymentValidateResult, ErrorEnvelope, PagedList,
    ResourceGroup, Subscription,
};

use crate::errors::DeployError;
use crate::http::client::HttpClient;
use crate::provision::api::{ArmScope, ResourceManager};

const SUBSCRIPTIONS_API_VERSION: &str = "2020-01-01";
const RESOURCES_API_VERSION: &str = "2019-10-01";
const INSIGHTS_API_VERSION: &str = "2015-05-01";
const BOT_SERVICE_API_VERSION: &str = "2021-03-01";

/// Resource Manager REST client
#[derive(Debug, Clone)]
pub struct ArmClient {
    http: HttpClient,
}

impl ArmClient {
    pub fn new(base_url: &str) -> Result<Self, DeployError> {
        Ok(Self {
            http: HttpClient::new(base_url)?,
        })
    }

    fn group_path(scope: &ArmScope<'_>) -> String {
        format!(
            "/subscriptions/{}/resourcegroups/{}",
            scope.subscription_id, scope.resource_group
        )
    }

    fn deployment_path(scope: &ArmScope<'_>, name: &str) -> String {
        format!(
            "{}/providers/Microsoft.Resources/deployments/{}",
            Self::group_path(scope),
            name
        )
    }

    fn component_path(scope: &ArmScope<'_>, component: &str) -> String {
        format!(
            "{}/providers/Microsoft.Insights/components/{}",
            Self::group_path(scope),
            component
        )
    }

    fn bot_path(scope: &ArmScope<'_>, bot_name: &str) -> String {
        format!(
            "{}/providers/Microsoft.BotService/botServices/{}?api-version={}",
            Self::group_path(scope),
            bot_name,
            BOT_SERVICE_API_VERSION
        )
    }
}

#[async_trait]
impl ResourceManager for ArmClient {
    async fn get_subscription(
        &self,
        token: &str,
        subscription_id: &str,
    ) -> Result<Subscription, DeployError> {
        let path = format!(
            "/subscriptions/{}?api-version={}",
            subscription_id, SUBSCRIPTIONS_API_VERSION
        );
        self.http.get(&path, token).await
    }

    async fn create_resource_group(
        &self,
        scope: &ArmScope<'_>,
        location: &str,
    ) -> Result<ResourceGroup, DeployError> {
        let path = format!("{}?api-version={}", Self::group_path(scope), RESOURCES_API_VERSION);
        let body = ResourceGroup {
            id: None,
            name: None,
            location: location.to_string(),
        };
        self.http.put(&path, scope.token, &body).await
    }

    async fn validate_deployment(
        &self,
        scope: &ArmScope<'_>,
        deployment_name: &str,
        deployment: &Deployment,
    ) -> Result<DeploymentValidateResult, DeployError> {
        let path = format!(
            "{}/validate?api-version={}",
            Self::deployment_path(scope, deployment_name),
            RESOURCES_API_VERSION
        );
        let response: ApiResponse<DeploymentValidateResult> = self
            .http
            .send_with_status(Method::POST, &path, scope.token, Some(deployment))
            .await?;

        if let Some(body) = response.body {
            return Ok(body);
        }

        // A rejected template comes back as 400 with the error envelope
        match (response.status, response.error) {
            (400, Some(error)) => {
                let envelope: ErrorEnvelope = serde_json::from_value(error)?;
                Ok(DeploymentValidateResult {
                    error: envelope.error,
                    properties: None,
                })
            }
            (status, error) => Err(DeployError::HttpStatus {
                status,
                body: error.map(|e| e.to_string()).unwrap_or_default(),
            }),
        }
    }

    async fn create_deployment(
        &self,
        scope: &ArmScope<'_>,
        deployment_name: &str,
        deployment: &Deployment,
    ) -> Result<ApiResponse<DeploymentExtended>, DeployError> {
        let path = format!(
            "{}?api-version={}",
            Self::deployment_path(scope, deployment_name),
            RESOURCES_API_VERSION
        );
        self.http
            .send_with_status(Method::PUT, &path, scope.token, Some(deployment))
            .await
    }

    async fn get_deployment(
        &self,
        scope: &ArmScope<'_>,
        deployment_name: &str,
    ) -> Result<DeploymentExtended, DeployError> {
        let path = format!(
            "{}?api-version={}",
            Self::deployment_path(scope, deployment_name),
            RESOURCES_API_VERSION
        );
        self.http.get(&path, scope.token).await
    }

    async fn list_deployment_operations(
        &self,
        scope: &ArmScope<'_>,
        deployment_name: &str,
    ) -> Result<Vec<DeploymentOperation>, DeployError> {
        let mut next = Some(format!(
            "{}/operations?api-version={}",
            Self::deployment_path(scope, deployment_name),
            RESOURCES_API_VERSION
        ));
        let mut operations = Vec::new();

        while let Some(path) = next {
            let page: PagedList<DeploymentOperation> = self.http.get(&path, scope.token).await?;
            operations.extend(page.value);
            next = page.next_link;
        }

        Ok(operations)
    }

    async fn get_app_insights_component(
        &self,
        scope: &ArmScope<'_>,
        component: &str,
    ) -> Result<AppInsightsComponent, DeployError> {
        let path = format!(
            "{}?api-version={}",
            Self::component_path(scope, component),
            INSIGHTS_API_VERSION
        );
        self.http.get(&path, scope.token).await
    }

    async fn create_app_insights_api_key(
        &self,
        scope: &ArmScope<'_>,
        component: &str,
        request: &ApiKeyRequest,
    ) -> Result<ApiResponse<ApiKey>, DeployError> {
        let path = format!(
            "{}/ApiKeys?api-version={}",
            Self::component_path(scope, component),
            INSIGHTS_API_VERSION
        );
        self.http
            .send_with_status(Method::POST, &path, scope.token, Some(request))
            .await
    }

    async fn get_bot(&self, scope: &ArmScope<'_>, bot_name: &str) -> Result<BotResource, DeployError> {
        self.http.get(&Self::bot_path(scope, bot_name), scope.token).await
    }

    async fn update_bot(
        &self,
        scope: &ArmScope<'_>,
        bot_name: &str,
        bot: &BotResource,
    ) -> Result<ApiResponse<BotResource>, DeployError> {
        self.http
            .send_with_status(Method::PATCH, &Self::bot_path(scope, bot_name), scope.token, Some(bot))
            .await
    }
}
