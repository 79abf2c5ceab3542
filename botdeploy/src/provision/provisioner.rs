//! Resource provisioner: app registration, resource group and template deployment

use std::sync::Arc;

use chrono::{Months, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Map, Value};
use tracing::debug;

use azure_models::{
    ApiKeyRequest, ApplicationCreateRequest, Deployment, DeploymentExtended, DeploymentMode,
    DeploymentProperties, PasswordCredential,
};

use crate::app::options::DeployConfig;
use crate::authn::access_token::ensure_not_expired;
use crate::deploy::fsm::{ProvisionStage, StageFsm};
use crate::errors::DeployError;
use crate::events::{DeployStatus, EventLogger};
use crate::provision::api::{ArmScope, GraphApi, ResourceManager};
use crate::provision::diagnostics::diagnose_failed_operations;
use crate::provision::params::{build_template_parameters, redacted, ResourceFlags, TemplateInputs};
use crate::storage::settings::DeploymentSettings;
use crate::utils::{calc_exp_backoff, resource_group_name};

const BOT_FRAMEWORK_REDIRECT_URL: &str = "https://token.botframework.com/.auth/web/redirect";
const TERMINAL_STATES: [&str; 3] = ["Succeeded", "Failed", "Canceled"];

/// Input of `create`
#[derive(Debug)]
pub struct CreateRequest {
    pub name: String,
    pub location: String,
    pub environment: String,
    /// Required only when the settings have no `MicrosoftAppId`
    pub app_password: Option<SecretString>,
    pub resources: ResourceFlags,
}

impl CreateRequest {
    pub fn new(name: impl Into<String>, location: impl Into<String>, environment: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            location: location.into(),
            environment: environment.into(),
            app_password: None,
            resources: ResourceFlags::default(),
        }
    }

    pub fn with_app_password(mut self, password: impl Into<String>) -> Self {
        self.app_password = Some(SecretString::from(password.into()));
        self
    }

    fn app_password(&self) -> Option<&str> {
        self.app_password
            .as_ref()
            .map(|p| p.expose_secret())
            .filter(|p| !p.is_empty())
    }
}

/// Runs the `create` sequence against the management and Graph APIs
pub struct Provisioner {
    resources: Arc<dyn ResourceManager>,
    graph: Arc<dyn GraphApi>,
    logger: EventLogger,
}

impl Provisioner {
    pub fn new(resources: Arc<dyn ResourceManager>, graph: Arc<dyn GraphApi>, logger: EventLogger) -> Self {
        Self {
            resources,
            graph,
            logger,
        }
    }

    /// Provision every resource of a bot environment.
    ///
    /// Returns the flattened deployment outputs merged with the app identity,
    /// which are also written to the settings file. `Ok(None)` means the
    /// template ran but produced no outputs; the failed operations have been
    /// logged and nothing was persisted.
    pub async fn create(
        &self,
        config: &DeployConfig,
        request: &CreateRequest,
    ) -> Result<Option<Map<String, Value>>, DeployError> {
        let mut fsm = StageFsm::<ProvisionStage>::new();
        let result = self.run(config, request, &mut fsm).await;
        if let Err(e) = &result {
            fsm.fail(e);
        }
        debug!("Provision stages: {:?}", fsm.history());
        result
    }

    async fn run(
        &self,
        config: &DeployConfig,
        request: &CreateRequest,
        fsm: &mut StageFsm<ProvisionStage>,
    ) -> Result<Option<Map<String, Value>>, DeployError> {
        // 1. Tenant
        fsm.advance(ProvisionStage::ResolveTenant)?;
        let token = config.access_token()?;
        let subscription_id = config.subscription_id()?;
        ensure_not_expired(token)?;
        let tenant_id = self.resolve_tenant(config, token, subscription_id).await?;

        // 2. App registration
        fsm.advance(ProvisionStage::EnsureAppRegistration)?;
        let settings_file = config.layout.settings_file();
        let mut settings = if settings_file.exists().await {
            DeploymentSettings::load(&settings_file).await?
        } else {
            DeploymentSettings::default()
        };

        let app_password = request
            .app_password()
            .map(str::to_string)
            .or_else(|| settings.microsoft_app_password.clone())
            .unwrap_or_default();

        let app_id = match settings.app_id() {
            Some(app_id) => app_id.to_string(),
            None => {
                let password = request.app_password().ok_or_else(|| {
                    DeployError::ConfigError("App password should not be empty!".to_string())
                })?;
                self.create_app_registration(config, &tenant_id, &request.name, password)
                    .await?
            }
        };

        // 3. Resource group
        fsm.advance(ProvisionStage::CreateResourceGroup)?;
        let resource_group = resource_group_name(&request.name, &request.environment);
        let scope = ArmScope {
            token,
            subscription_id,
            resource_group: &resource_group,
        };
        self.logger
            .log(DeployStatus::ProvisionInfo, "> Creating resource group ...");
        let group = self
            .resources
            .create_resource_group(&scope, &request.location)
            .await?;
        self.logger.log_value(DeployStatus::ProvisionInfo, &group);

        // 4. Parameters
        fsm.advance(ProvisionStage::BuildParameters)?;
        let deployment_name = Utc::now().timestamp_millis().to_string();
        let parameters = build_template_parameters(&TemplateInputs {
            app_id: &app_id,
            app_password: &app_password,
            location: &request.location,
            name: &request.name,
            resources: request.resources,
        });
        self.logger
            .log_value(DeployStatus::ProvisionInfo, &redacted(&parameters));

        // 5. Validate
        fsm.advance(ProvisionStage::ValidateTemplate)?;
        let template: Value = config.layout.template_file().read_json().await?;
        let deployment = Deployment {
            properties: DeploymentProperties {
                template,
                parameters,
                mode: DeploymentMode::Incremental,
            },
        };

        self.logger
            .log(DeployStatus::ProvisionInfo, "> Validating Azure deployment ...");
        let validation = self
            .resources
            .validate_deployment(&scope, &deployment_name, &deployment)
            .await?;

        if let Some(error) = validation.error {
            let message = error.message.clone().unwrap_or_default();
            self.logger
                .log(DeployStatus::ProvisionError, format!("! Error: {}", message));

            let details = error.details.as_ref().map(serde_json::to_value).transpose()?;
            if let Some(details) = &details {
                self.logger.log(
                    DeployStatus::ProvisionErrorDetails,
                    serde_json::to_string_pretty(details)?,
                );
            }
            self.log_delete_hint(DeployStatus::ProvisionError, &resource_group);

            return Err(DeployError::ValidationError {
                message: format!("! Error: {}", message),
                details,
            });
        }

        // 6. Apply
        fsm.advance(ProvisionStage::ApplyTemplate)?;
        self.logger.log(
            DeployStatus::ProvisionInfo,
            "> Deploying Azure services (this could take a while)...",
        );
        let created = self
            .resources
            .create_deployment(&scope, &deployment_name, &deployment)
            .await?;

        if !created.is_success() {
            let error = created.error.clone().unwrap_or(Value::Null);
            self.logger.log(
                DeployStatus::ProvisionError,
                "! Template is not valid with provided parameters. Review the log for more information.",
            );
            self.logger
                .log(DeployStatus::ProvisionError, format!("! Error: {}", error));
            self.log_delete_hint(DeployStatus::ProvisionError, &resource_group);

            return Err(DeployError::DeploymentError(format!(
                "! Error: status {}: {}",
                created.status, error
            )));
        }

        let state = self
            .await_deployment(config, &scope, &deployment_name, created.body)
            .await?;

        // 7. Telemetry
        if request.resources.create_app_insights {
            fsm.advance(ProvisionStage::LinkTelemetry)?;
            if state.as_deref() == Some("Succeeded") {
                self.link_app_insights(&scope, &request.name, &deployment_name)
                    .await?;
            } else {
                self.logger.log(
                    DeployStatus::ProvisionWarning,
                    format!(
                        "! Skipping Application Insights linking, deployment state is {}",
                        state.as_deref().unwrap_or("unknown")
                    ),
                );
            }
        }

        // 8. Outputs
        fsm.advance(ProvisionStage::PersistOutputs)?;
        let deployed = self
            .resources
            .get_deployment(&scope, &deployment_name)
            .await?;

        let result = match deployed.outputs() {
            Some(outputs) => {
                let mut values = unpack_outputs(outputs);
                values.insert("MicrosoftAppId".to_string(), app_id.clone().into());
                values.insert("MicrosoftAppPassword".to_string(), app_password.clone().into());

                settings.merge(&values)?;
                settings.save(&settings_file).await?;

                let mut logged = values.clone();
                logged.insert("MicrosoftAppPassword".to_string(), "******".into());
                self.logger.log(DeployStatus::ProvisionInfo, Value::Object(logged));
                Some(values)
            }
            None => {
                self.diagnose(&scope, &deployment_name).await?;
                None
            }
        };

        fsm.advance(ProvisionStage::Done)?;
        self.log_delete_hint(DeployStatus::ProvisionSuccess, &resource_group);
        Ok(result)
    }

    async fn resolve_tenant(
        &self,
        config: &DeployConfig,
        token: &str,
        subscription_id: &str,
    ) -> Result<String, DeployError> {
        if let Some(tenant_id) = config.tenant_id.as_deref().filter(|t| !t.is_empty()) {
            return Ok(tenant_id.to_string());
        }

        match self.resources.get_subscription(token, subscription_id).await {
            Ok(subscription) => subscription
                .tenant_id
                .filter(|t| !t.is_empty())
                .ok_or_else(|| {
                    DeployError::AuthError(
                        "Get Tenant Id Failed, details: No tenants found in the account."
                            .to_string(),
                    )
                }),
            Err(e) => Err(DeployError::AuthError(format!(
                "Get Tenant Id Failed, details: {}",
                e
            ))),
        }
    }

    async fn create_app_registration(
        &self,
        config: &DeployConfig,
        tenant_id: &str,
        name: &str,
        password: &str,
    ) -> Result<String, DeployError> {
        self.logger
            .log(DeployStatus::ProvisionInfo, "> Creating App Registration ...");

        let start_date = Utc::now();
        let end_date = start_date
            .checked_add_months(Months::new(24))
            .unwrap_or(start_date);
        let request = ApplicationCreateRequest {
            display_name: name.to_string(),
            password_credentials: vec![PasswordCredential {
                value: password.to_string(),
                start_date,
                end_date,
            }],
            available_to_other_tenants: true,
            reply_urls: vec![BOT_FRAMEWORK_REDIRECT_URL.to_string()],
        };

        let application = self
            .graph
            .create_application(config.graph_token()?, tenant_id, &request)
            .await?;
        self.logger
            .log_value(DeployStatus::ProvisionInfo, &application);

        let app_id = application
            .app_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                DeployError::DeploymentError("App registration returned no appId".to_string())
            })?;
        self.logger.log(
            DeployStatus::ProvisionInfo,
            format!("> Create App Id Success! ID: {}", app_id),
        );
        Ok(app_id)
    }

    /// Wait for a long-running deployment to reach a terminal state
    async fn await_deployment(
        &self,
        config: &DeployConfig,
        scope: &ArmScope<'_>,
        deployment_name: &str,
        created: Option<DeploymentExtended>,
    ) -> Result<Option<String>, DeployError> {
        let mut state = created
            .as_ref()
            .and_then(|d| d.provisioning_state())
            .map(str::to_string);
        let wait = &config.deployment_wait;

        let mut attempt = 0;
        while wait.enabled && !is_terminal(state.as_deref()) && attempt < wait.max_polls {
            tokio::time::sleep(calc_exp_backoff(&wait.cooldown, attempt)).await;
            let deployment = self.resources.get_deployment(scope, deployment_name).await?;
            state = deployment.provisioning_state().map(str::to_string);
            debug!("Deployment {} state: {:?}", deployment_name, state);
            attempt += 1;
        }

        Ok(state)
    }

    async fn link_app_insights(
        &self,
        scope: &ArmScope<'_>,
        bot_name: &str,
        deployment_name: &str,
    ) -> Result<(), DeployError> {
        self.logger.log(
            DeployStatus::ProvisionInfo,
            "> Linking Application Insights settings to Bot Service ...",
        );

        let resource_group = scope.resource_group;
        let component = self
            .resources
            .get_app_insights_component(scope, resource_group)
            .await?;
        let properties = component.properties.unwrap_or_default();

        let component_id = format!(
            "/subscriptions/{}/resourceGroups/{}/providers/microsoft.insights/components/{}",
            scope.subscription_id, resource_group, resource_group
        );
        let key_request = ApiKeyRequest {
            name: format!("{}-provision-{}", resource_group, deployment_name),
            linked_read_properties: vec![
                format!("{}/api", component_id),
                format!("{}/agentconfig", component_id),
            ],
            linked_write_properties: vec![format!("{}/annotations", component_id)],
        };

        let key_response = self
            .resources
            .create_app_insights_api_key(scope, resource_group, &key_request)
            .await?;
        if !key_response.is_success() {
            self.logger.log(
                DeployStatus::ProvisionError,
                format!(
                    "! Something went wrong while trying to link Application Insights settings to Bot Service Result: {}",
                    serde_json::to_string(&key_response)?
                ),
            );
            return Err(DeployError::LinkError(
                "Linking application insights failed.".to_string(),
            ));
        }
        let api_key = key_response.body.and_then(|k| k.api_key);

        self.logger.log(
            DeployStatus::ProvisionInfo,
            format!(
                "> AppInsights AppId: {}",
                properties.app_id.as_deref().unwrap_or("")
            ),
        );
        self.logger.log(
            DeployStatus::ProvisionInfo,
            format!(
                "> AppInsights InstrumentationKey: {}",
                properties.instrumentation_key.as_deref().unwrap_or("")
            ),
        );
        self.logger.log(
            DeployStatus::ProvisionInfo,
            format!("> AppInsights ApiKey created: {}", api_key.is_some()),
        );

        let mut bot = self.resources.get_bot(scope, bot_name).await?;
        let Some(bot_properties) = bot.properties.as_mut() else {
            self.logger.log(
                DeployStatus::ProvisionWarning,
                "! The Bot doesn't have a keys properties to update.",
            );
            return Ok(());
        };

        bot_properties.developer_app_insight_key = properties.instrumentation_key;
        bot_properties.developer_app_insights_api_key = api_key;
        bot_properties.developer_app_insights_application_id = properties.app_id;

        let update = self.resources.update_bot(scope, bot_name, &bot).await?;
        if !update.is_success() {
            self.logger.log(
                DeployStatus::ProvisionError,
                format!(
                    "! Something went wrong while trying to link Application Insights settings to Bot Service Result: {}",
                    serde_json::to_string(&update)?
                ),
            );
            return Err(DeployError::LinkError(
                "Linking Application Insights Failed.".to_string(),
            ));
        }

        self.logger.log(
            DeployStatus::ProvisionInfo,
            "> Linking Application Insights settings to Bot Service Success!",
        );
        Ok(())
    }

    async fn diagnose(&self, scope: &ArmScope<'_>, deployment_name: &str) -> Result<(), DeployError> {
        let operations = self
            .resources
            .list_deployment_operations(scope, deployment_name)
            .await?;
        for line in diagnose_failed_operations(&operations) {
            self.logger.log(DeployStatus::ProvisionError, line);
        }
        Ok(())
    }

    fn log_delete_hint(&self, status: DeployStatus, resource_group: &str) {
        self.logger.log(
            status,
            format!(
                "+ To delete this resource group, run 'az group delete -g {} --no-wait'",
                resource_group
            ),
        );
    }
}

fn is_terminal(state: Option<&str>) -> bool {
    state.is_some_and(|s| TERMINAL_STATES.contains(&s))
}

/// Flatten `{key: {"value": v}}` outputs into `{key: v}`; entries without a value are dropped
pub fn unpack_outputs(outputs: &Map<String, Value>) -> Map<String, Value> {
    outputs
        .iter()
        .filter_map(|(key, output)| {
            output
                .get("value")
                .filter(|v| !v.is_null())
                .map(|v| (key.clone(), v.clone()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unpack_outputs() {
        let outputs = serde_json::json!({
            "hostname": {"type": "String", "value": "mybot-dev.azurewebsites.net"},
            "luis": {"type": "Object", "value": {"endpointKey": "k"}},
            "empty": {"type": "String"},
        });
        let flat = unpack_outputs(outputs.as_object().unwrap());

        assert_eq!(flat.len(), 2);
        assert_eq!(flat["hostname"], "mybot-dev.azurewebsites.net");
        assert_eq!(flat["luis"]["endpointKey"], "k");
    }

    #[test]
    fn test_terminal_states() {
        assert!(is_terminal(Some("Succeeded")));
        assert!(is_terminal(Some("Failed")));
        assert!(!is_terminal(Some("Running")));
        assert!(!is_terminal(None));
    }
}
