//! Deployment configuration

use secrecy::{ExposeSecret, SecretString};

use crate::errors::DeployError;
use crate::storage::layout::ProjectLayout;
use crate::utils::CooldownOptions;

/// Configuration owned by one [`BotProjectDeploy`](crate::deploy::orchestrator::BotProjectDeploy)
#[derive(Debug)]
pub struct DeployConfig {
    /// Azure subscription id
    pub subscription_id: Option<String>,

    /// ARM access token (`az account get-access-token`)
    pub access_token: Option<SecretString>,

    /// Token for the AD Graph API; the access token is used when absent
    pub graph_token: Option<SecretString>,

    /// Tenant id; looked up from the subscription when absent
    pub tenant_id: Option<String>,

    /// Project paths
    pub layout: ProjectLayout,

    /// Service endpoints
    pub endpoints: AzureEndpoints,

    /// Polling of long-running ARM deployments
    pub deployment_wait: WaitOptions,

    /// Polling of asynchronous zip deployments
    pub zip_deploy_wait: WaitOptions,
}

impl DeployConfig {
    /// Create a configuration for a project directory with default endpoints
    pub fn from_project(layout: ProjectLayout) -> Self {
        Self {
            subscription_id: None,
            access_token: None,
            graph_token: None,
            tenant_id: None,
            layout,
            endpoints: AzureEndpoints::default(),
            deployment_wait: WaitOptions::default(),
            zip_deploy_wait: WaitOptions::default(),
        }
    }

    pub fn with_subscription_id(mut self, subscription_id: impl Into<String>) -> Self {
        self.subscription_id = Some(subscription_id.into());
        self
    }

    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(SecretString::from(token.into()));
        self
    }

    pub fn with_graph_token(mut self, token: impl Into<String>) -> Self {
        self.graph_token = Some(SecretString::from(token.into()));
        self
    }

    pub fn with_tenant_id(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self
    }

    /// The access token, or an `AuthError` telling the user how to get one
    pub fn access_token(&self) -> Result<&str, DeployError> {
        self.access_token
            .as_ref()
            .map(|t| t.expose_secret())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                DeployError::AuthError(
                    "Error: Missing access token. Please provide a non-expired Azure access token. \
                     Tokens can be obtained by running az account get-access-token"
                        .to_string(),
                )
            })
    }

    /// The subscription id, or an `AuthError`
    pub fn subscription_id(&self) -> Result<&str, DeployError> {
        self.subscription_id
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                DeployError::AuthError(
                    "Error: Missing subscription Id. Please provide a valid Azure subscription id."
                        .to_string(),
                )
            })
    }

    /// The Graph token, falling back to the access token
    pub fn graph_token(&self) -> Result<&str, DeployError> {
        match self.graph_token.as_ref().map(|t| t.expose_secret()) {
            Some(token) if !token.is_empty() => Ok(token),
            _ => self.access_token(),
        }
    }
}

/// Base URLs of the remote services
#[derive(Debug, Clone)]
pub struct AzureEndpoints {
    /// Resource Manager
    pub management: String,

    /// Azure AD Graph
    pub graph: String,

    /// Host suffix of App Service SCM sites
    pub scm_host_suffix: String,
}

impl Default for AzureEndpoints {
    fn default() -> Self {
        Self {
            management: "https://management.azure.com".to_string(),
            graph: "https://graph.windows.net".to_string(),
            scm_host_suffix: "scm.azurewebsites.net".to_string(),
        }
    }
}

/// Polling settings for asynchronous remote operations
#[derive(Debug, Clone)]
pub struct WaitOptions {
    /// Poll at all
    pub enabled: bool,

    /// Delay schedule between polls
    pub cooldown: CooldownOptions,

    /// Give up after this many polls
    pub max_polls: u32,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            cooldown: CooldownOptions::default(),
            max_polls: 120,
        }
    }
}
