//! Bot project deployment entry points

use std::path::PathBuf;
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::debug;

use crate::app::options::DeployConfig;
use crate::authn::access_token::ensure_not_expired;
use crate::deploy::fsm::{DeployStage, StageFsm};
use crate::deploy::packager::zip_directory;
use crate::deploy::zip_deployer::{ZipDeployer, ZipUploader};
use crate::errors::DeployError;
use crate::events::{DeployStatus, EventLogger};
use crate::http::arm::ArmClient;
use crate::http::graph::GraphClient;
use crate::http::kudu::KuduClient;
use crate::http::luis::LuisClient;
use crate::luis::api::LuisAuthoring;
use crate::luis::builder::{BfCliLuBuilder, LuBuilder};
use crate::luis::publisher::{LuisPublishRequest, LuisPublisher};
use crate::provision::api::{GraphApi, ResourceManager};
use crate::provision::provisioner::{CreateRequest, Provisioner};
use crate::runtime::{BotProject, RuntimeTemplate};
use crate::storage::layout::ProjectLayout;
use crate::storage::settings::DeploymentSettings;

/// Input of [`BotProjectDeploy::deploy`]
#[derive(Debug, Clone, Default)]
pub struct DeployRequest {
    pub name: String,
    pub environment: String,
    pub luis_authoring_key: Option<String>,
    pub luis_authoring_region: Option<String>,
    /// Culture of the LU files, `en-us` when absent
    pub language: Option<String>,
    /// Site host name when it differs from `{name}-{environment}`
    pub hostname: Option<String>,
    /// LUIS prediction resource name
    pub luis_resource: Option<String>,
}

impl DeployRequest {
    pub fn new(name: impl Into<String>, environment: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            environment: environment.into(),
            ..Default::default()
        }
    }
}

/// Deploys and provisions one bot project
pub struct BotProjectDeploy {
    config: DeployConfig,
    logger: EventLogger,
    runtime: Arc<dyn RuntimeTemplate>,
    resources: Arc<dyn ResourceManager>,
    graph: Arc<dyn GraphApi>,
    luis: Arc<dyn LuisAuthoring>,
    uploader: Arc<dyn ZipUploader>,
    lu_builder: Arc<dyn LuBuilder>,
}

impl BotProjectDeploy {
    /// Create a deployer talking to the configured Azure endpoints
    pub fn new(
        config: DeployConfig,
        runtime: Arc<dyn RuntimeTemplate>,
        logger: EventLogger,
    ) -> Result<Self, DeployError> {
        let resources = Arc::new(ArmClient::new(&config.endpoints.management)?);
        let graph = Arc::new(GraphClient::new(&config.endpoints.graph)?);
        Ok(Self {
            config,
            logger,
            runtime,
            resources,
            graph,
            luis: Arc::new(LuisClient::new()?),
            uploader: Arc::new(KuduClient::new()?),
            lu_builder: Arc::new(BfCliLuBuilder::default()),
        })
    }

    pub fn with_resource_manager(mut self, resources: Arc<dyn ResourceManager>) -> Self {
        self.resources = resources;
        self
    }

    pub fn with_graph(mut self, graph: Arc<dyn GraphApi>) -> Self {
        self.graph = graph;
        self
    }

    pub fn with_luis(mut self, luis: Arc<dyn LuisAuthoring>) -> Self {
        self.luis = luis;
        self
    }

    pub fn with_uploader(mut self, uploader: Arc<dyn ZipUploader>) -> Self {
        self.uploader = uploader;
        self
    }

    pub fn with_lu_builder(mut self, lu_builder: Arc<dyn LuBuilder>) -> Self {
        self.lu_builder = lu_builder;
        self
    }

    pub fn config(&self) -> &DeployConfig {
        &self.config
    }

    /// Build, package and upload a bot. Stages run in order and stop at the
    /// first error, which is reported as `DEPLOY_ERROR` and returned.
    pub async fn deploy(&self, project: &BotProject, request: DeployRequest) -> Result<(), DeployError> {
        let mut fsm = StageFsm::<DeployStage>::new();
        match self.run_deploy(project, &request, &mut fsm).await {
            Ok(()) => {
                self.logger
                    .log(DeployStatus::DeploySuccess, "Deployment Success!");
                Ok(())
            }
            Err(e) => {
                fsm.fail(&e);
                debug!("Deploy stages: {:?}", fsm.history());
                self.logger
                    .log(DeployStatus::DeployError, e.to_event_message());
                Err(e)
            }
        }
    }

    /// Provision the Azure resources of a bot environment
    pub async fn create(&self, request: CreateRequest) -> Result<Option<Map<String, Value>>, DeployError> {
        let provisioner = Provisioner::new(
            self.resources.clone(),
            self.graph.clone(),
            self.logger.clone(),
        );
        provisioner
            .create(&self.config, &request)
            .await
            .inspect_err(|e| {
                self.logger
                    .log(DeployStatus::ProvisionError, e.to_event_message())
            })
    }

    async fn run_deploy(
        &self,
        project: &BotProject,
        request: &DeployRequest,
        fsm: &mut StageFsm<DeployStage>,
    ) -> Result<(), DeployError> {
        let token = self.config.access_token()?;
        ensure_not_expired(token)?;
        let layout = &self.config.layout;
        let zip_file = layout.zip_file();

        fsm.advance(DeployStage::CleanPriorArtifact)?;
        self.info("Cleaning prior deployment artifact ...");
        zip_file.delete().await?;
        self.info("Prior deployment artifact cleaned");

        fsm.advance(DeployStage::ExternalBuild)?;
        self.info(format!("Building {} with the {} runtime ...", project.name, self.runtime.name()));
        let artifact = self
            .runtime
            .build_deploy(layout.project().path(), project, &request.environment)
            .await?;
        let dialogs = ProjectLayout::dialogs_dir(&artifact);
        if !dialogs.exists().await {
            return Err(DeployError::BuildError(format!(
                "Build output {} has no bot content at {}",
                artifact.display(),
                dialogs.path().display()
            )));
        }
        self.info(format!("Build finished: {}", artifact.display()));

        let settings_file = layout.settings_file();
        let settings = if settings_file.exists().await {
            DeploymentSettings::load(&settings_file).await?
        } else {
            DeploymentSettings::default()
        };
        if let Some(luis) = settings.luis {
            fsm.advance(DeployStage::LuisPublish)?;
            self.info("Publishing LUIS models ...");
            let publish = LuisPublishRequest {
                build_dir: dialogs.path().to_path_buf(),
                name: request.name.clone(),
                environment: request.environment.clone(),
                language: request
                    .language
                    .clone()
                    .filter(|l| !l.is_empty())
                    .unwrap_or_else(|| "en-us".to_string()),
                endpoint: luis.endpoint,
                endpoint_key: luis.endpoint_key,
                authoring_key: first_non_empty(&request.luis_authoring_key, luis.authoring_key),
                authoring_region: first_non_empty(
                    &request.luis_authoring_region,
                    luis.authoring_region,
                ),
                luis_resource: request.luis_resource.clone(),
            };
            LuisPublisher::new(self.luis.clone(), self.lu_builder.clone(), self.logger.clone())
                .publish(token, &settings_file, &publish)
                .await?;
            self.info("LUIS publish finished");
        }

        fsm.advance(DeployStage::Package)?;
        self.info("Packing up the bot service ...");
        let zip_path: PathBuf = zip_file.path().to_path_buf();
        let summary = zip_directory(&artifact, &zip_path).await?;
        self.logger.log_value(DeployStatus::DeployInfo, &summary);
        self.info("Packing up the bot service finished");

        fsm.advance(DeployStage::Upload)?;
        let deployer = ZipDeployer::new(
            self.uploader.clone(),
            self.logger.clone(),
            self.config.endpoints.scm_host_suffix.clone(),
            self.config.zip_deploy_wait.clone(),
        );
        deployer
            .deploy_zip(
                token,
                &zip_path,
                &request.name,
                &request.environment,
                request.hostname.as_deref(),
            )
            .await?;
        self.info("Publish To Azure Success!");

        fsm.advance(DeployStage::Done)?;
        Ok(())
    }

    fn info(&self, message: impl Into<Value>) {
        self.logger.log(DeployStatus::DeployInfo, message);
    }
}

fn first_non_empty(preferred: &Option<String>, fallback: Option<String>) -> String {
    preferred
        .clone()
        .filter(|v| !v.is_empty())
        .or(fallback)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_non_empty() {
        assert_eq!(first_non_empty(&Some("a".into()), Some("b".into())), "a");
        assert_eq!(first_non_empty(&Some(String::new()), Some("b".into())), "b");
        assert_eq!(first_non_empty(&None, None), "");
    }
}
