//! In-memory fakes of the remote collaborators

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tokio::process::Child;

use azure_models::{
    ApiKey, ApiKeyRequest, ApiResponse, AppInsightsComponent, AppInsightsComponentProperties,
    Application, ApplicationCreateRequest, BotProperties, BotResource, Deployment,
    DeploymentExtended, DeploymentOperation, DeploymentPropertiesExtended,
    DeploymentValidateResult, ErrorResponse, LuisAzureAccount, ResourceGroup, Subscription,
    ZipDeployStatus,
};
use botdeploy::app::options::DeployConfig;
use botdeploy::deploy::zip_deployer::{UploadResponse, ZipUploader};
use botdeploy::errors::DeployError;
use botdeploy::events::{EventLogger, RecordingSink};
use botdeploy::filesys::dir::Dir;
use botdeploy::luis::api::LuisAuthoring;
use botdeploy::luis::builder::{LuBuildResult, LuBuilder, LuContents};
use botdeploy::provision::api::{ArmScope, GraphApi, ResourceManager};
use botdeploy::runtime::{BotProject, RuntimeTemplate};
use botdeploy::storage::layout::{ProjectLayout, DIALOGS_DIR};

pub fn recording_logger() -> (EventLogger, Arc<RecordingSink>) {
    let sink = Arc::new(RecordingSink::new());
    (EventLogger::new(sink.clone()), sink)
}

/// Config for a project directory with tokens set and polling disabled
pub fn test_config(project_dir: &Path) -> DeployConfig {
    let mut config = DeployConfig::from_project(ProjectLayout::new(project_dir))
        .with_subscription_id("sub-1")
        .with_access_token("fake-token")
        .with_tenant_id("tenant-1");
    config.deployment_wait.enabled = false;
    config.zip_deploy_wait.enabled = false;
    config
}

#[derive(Default)]
pub struct FakeArm {
    pub tenant_id: Option<String>,
    pub validate_error: Option<ErrorResponse>,
    pub outputs: Option<Map<String, Value>>,
    pub operations: Vec<DeploymentOperation>,
    pub bot_properties: Option<BotProperties>,
    /// Non-2xx statuses to answer the corresponding calls with
    pub create_deployment_status: Option<u16>,
    pub api_key_status: Option<u16>,
    pub update_bot_status: Option<u16>,
    pub calls: Mutex<Vec<String>>,
    pub updated_bot: Mutex<Option<BotResource>>,
}

impl FakeArm {
    pub fn with_outputs(outputs: Value) -> Self {
        Self {
            outputs: outputs.as_object().cloned(),
            bot_properties: Some(BotProperties::default()),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: &str) {
        self.calls.lock().unwrap().push(call.to_string());
    }

    fn deployment(&self) -> DeploymentExtended {
        DeploymentExtended {
            properties: Some(DeploymentPropertiesExtended {
                provisioning_state: Some("Succeeded".to_string()),
                outputs: self.outputs.clone(),
                error: None,
            }),
            ..Default::default()
        }
    }
}

#[async_trait]
impl ResourceManager for FakeArm {
    async fn get_subscription(&self, _token: &str, subscription_id: &str) -> Result<Subscription, DeployError> {
        self.record("get_subscription");
        Ok(Subscription {
            subscription_id: Some(subscription_id.to_string()),
            tenant_id: self.tenant_id.clone(),
            display_name: None,
        })
    }

    async fn create_resource_group(&self, scope: &ArmScope<'_>, location: &str) -> Result<ResourceGroup, DeployError> {
        self.record("create_resource_group");
        Ok(ResourceGroup {
            id: None,
            name: Some(scope.resource_group.to_string()),
            location: location.to_string(),
        })
    }

    async fn validate_deployment(
        &self,
        _scope: &ArmScope<'_>,
        _deployment_name: &str,
        _deployment: &Deployment,
    ) -> Result<DeploymentValidateResult, DeployError> {
        self.record("validate_deployment");
        Ok(DeploymentValidateResult {
            error: self.validate_error.clone(),
            properties: None,
        })
    }

    async fn create_deployment(
        &self,
        _scope: &ArmScope<'_>,
        _deployment_name: &str,
        _deployment: &Deployment,
    ) -> Result<ApiResponse<DeploymentExtended>, DeployError> {
        self.record("create_deployment");
        match self.create_deployment_status {
            Some(status) => Ok(ApiResponse::failed(
                status,
                json!({"code": "InvalidTemplate", "message": "bad parameters"}),
            )),
            None => Ok(ApiResponse::ok(201, self.deployment())),
        }
    }

    async fn get_deployment(&self, _scope: &ArmScope<'_>, _deployment_name: &str) -> Result<DeploymentExtended, DeployError> {
        self.record("get_deployment");
        Ok(self.deployment())
    }

    async fn list_deployment_operations(
        &self,
        _scope: &ArmScope<'_>,
        _deployment_name: &str,
    ) -> Result<Vec<DeploymentOperation>, DeployError> {
        self.record("list_deployment_operations");
        Ok(self.operations.clone())
    }

    async fn get_app_insights_component(
        &self,
        _scope: &ArmScope<'_>,
        component: &str,
    ) -> Result<AppInsightsComponent, DeployError> {
        self.record("get_app_insights_component");
        Ok(AppInsightsComponent {
            id: None,
            name: Some(component.to_string()),
            properties: Some(AppInsightsComponentProperties {
                app_id: Some("insights-app".to_string()),
                instrumentation_key: Some("ikey".to_string()),
            }),
        })
    }

    async fn create_app_insights_api_key(
        &self,
        _scope: &ArmScope<'_>,
        _component: &str,
        request: &ApiKeyRequest,
    ) -> Result<ApiResponse<ApiKey>, DeployError> {
        self.record("create_app_insights_api_key");
        if let Some(status) = self.api_key_status {
            return Ok(ApiResponse::failed(status, json!({"code": "Forbidden"})));
        }
        Ok(ApiResponse::ok(
            200,
            ApiKey {
                id: None,
                name: Some(request.name.clone()),
                api_key: Some("api-key".to_string()),
            },
        ))
    }

    async fn get_bot(&self, _scope: &ArmScope<'_>, bot_name: &str) -> Result<BotResource, DeployError> {
        self.record("get_bot");
        Ok(BotResource {
            name: Some(bot_name.to_string()),
            properties: self.bot_properties.clone(),
            ..Default::default()
        })
    }

    async fn update_bot(
        &self,
        _scope: &ArmScope<'_>,
        _bot_name: &str,
        bot: &BotResource,
    ) -> Result<ApiResponse<BotResource>, DeployError> {
        self.record("update_bot");
        if let Some(status) = self.update_bot_status {
            return Ok(ApiResponse::failed(status, json!({"code": "Conflict"})));
        }
        *self.updated_bot.lock().unwrap() = Some(bot.clone());
        Ok(ApiResponse::ok(200, bot.clone()))
    }
}

#[derive(Default)]
pub struct FakeGraph {
    pub requests: Mutex<Vec<ApplicationCreateRequest>>,
}

impl FakeGraph {
    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl GraphApi for FakeGraph {
    async fn create_application(
        &self,
        _token: &str,
        _tenant_id: &str,
        request: &ApplicationCreateRequest,
    ) -> Result<Application, DeployError> {
        self.requests.lock().unwrap().push(request.clone());
        Ok(Application {
            app_id: Some("new-app-id".to_string()),
            object_id: Some("object-1".to_string()),
            display_name: Some(request.display_name.clone()),
        })
    }
}

#[derive(Default)]
pub struct FakeLuis {
    pub accounts: Vec<LuisAzureAccount>,
    /// Body of an error returned by the account listing
    pub list_error: Option<(u16, String)>,
    pub assigned: Mutex<Vec<String>>,
}

impl FakeLuis {
    pub fn with_account(name: &str) -> Self {
        Self {
            accounts: vec![LuisAzureAccount {
                azure_subscription_id: Some("sub-1".to_string()),
                resource_group: Some("mybot-dev".to_string()),
                account_name: Some(name.to_string()),
            }],
            ..Default::default()
        }
    }

    pub fn assigned(&self) -> Vec<String> {
        self.assigned.lock().unwrap().clone()
    }
}

#[async_trait]
impl LuisAuthoring for FakeLuis {
    async fn list_azure_accounts(
        &self,
        _endpoint: &str,
        _token: &str,
        _authoring_key: &str,
    ) -> Result<Vec<LuisAzureAccount>, DeployError> {
        match &self.list_error {
            Some((status, body)) => Err(DeployError::HttpStatus {
                status: *status,
                body: body.clone(),
            }),
            None => Ok(self.accounts.clone()),
        }
    }

    async fn assign_azure_account(
        &self,
        _endpoint: &str,
        app_id: &str,
        _token: &str,
        _authoring_key: &str,
        _account: &LuisAzureAccount,
    ) -> Result<Value, DeployError> {
        self.assigned.lock().unwrap().push(app_id.to_string());
        Ok(json!({"code": "Success", "appId": app_id}))
    }
}

/// Builder that runs no tool and writes the given files into the output directory
#[derive(Default)]
pub struct FakeLuBuilder {
    pub outputs: Vec<(String, String)>,
    pub built: Mutex<Vec<usize>>,
    pub staged: Mutex<Vec<PathBuf>>,
}

impl FakeLuBuilder {
    pub fn build_count(&self) -> usize {
        self.built.lock().unwrap().len()
    }
}

#[async_trait]
impl LuBuilder for FakeLuBuilder {
    async fn load_contents(
        &self,
        files: &[PathBuf],
        culture: &str,
        suffix: &str,
        region: &str,
    ) -> Result<LuContents, DeployError> {
        let mut loaded = Vec::new();
        for path in files {
            loaded.push(botdeploy::luis::builder::LuFile {
                name: path.file_name().unwrap().to_string_lossy().into_owned(),
                content: tokio::fs::read_to_string(path).await?,
            });
        }
        Ok(LuContents {
            culture: culture.to_string(),
            suffix: suffix.to_string(),
            region: region.to_string(),
            files: loaded,
        })
    }

    async fn build(
        &self,
        contents: &LuContents,
        _authoring_key: &str,
        _authoring_endpoint: &str,
        _bot_name: &str,
        _suffix: &str,
        _culture: &str,
    ) -> Result<LuBuildResult, DeployError> {
        self.built.lock().unwrap().push(contents.files.len());
        let staging = Dir::create_temp_dir("fake-lu").await?;
        self.staged.lock().unwrap().push(staging.path().to_path_buf());
        let mut assets = Vec::new();
        for (name, content) in &self.outputs {
            staging.file(name).write_string(content).await?;
            assets.push(PathBuf::from(name));
        }
        Ok(LuBuildResult { staging, assets })
    }

    async fn write_dialog_assets(
        &self,
        result: &LuBuildResult,
        _force: bool,
        out_dir: &Dir,
    ) -> Result<Vec<PathBuf>, DeployError> {
        let mut written = Vec::new();
        for asset in &result.assets {
            let target = out_dir.path().join(asset);
            tokio::fs::copy(result.staging.path().join(asset), &target).await?;
            written.push(target);
        }
        Ok(written)
    }
}

#[derive(Default)]
pub struct FakeUploader {
    /// Status to fail the upload with
    pub fail_status: Option<u16>,
    pub uploads: Mutex<Vec<(String, PathBuf, bool)>>,
}

impl FakeUploader {
    pub fn uploads(&self) -> Vec<(String, PathBuf, bool)> {
        self.uploads.lock().unwrap().clone()
    }
}

#[async_trait]
impl ZipUploader for FakeUploader {
    async fn upload(&self, url: &str, _token: &str, zip_path: &Path) -> Result<UploadResponse, DeployError> {
        let exists = zip_path.exists();
        self.uploads
            .lock()
            .unwrap()
            .push((url.to_string(), zip_path.to_path_buf(), exists));
        match self.fail_status {
            Some(status) => Err(DeployError::HttpStatus {
                status,
                body: "denied".to_string(),
            }),
            None => Ok(UploadResponse {
                status: 202,
                body: String::new(),
                status_url: None,
            }),
        }
    }

    async fn deployment_status(&self, _status_url: &str, _token: &str) -> Result<ZipDeployStatus, DeployError> {
        Ok(ZipDeployStatus {
            status: azure_models::kudu::status::SUCCESS,
            complete: true,
            ..Default::default()
        })
    }
}

/// Runtime whose build copies the bot into `<runtime>/ComposerDialogs`
#[derive(Default)]
pub struct FakeRuntime {
    /// Produce an artifact without a dialogs folder
    pub skip_dialogs: bool,
}

#[async_trait]
impl RuntimeTemplate for FakeRuntime {
    fn name(&self) -> &str {
        "fake"
    }

    async fn build(&self, _runtime_path: &Path, _project: &BotProject) -> Result<(), DeployError> {
        Ok(())
    }

    async fn run(&self, _runtime_path: &Path, _project: &BotProject, _port: u16) -> Result<Child, DeployError> {
        Err(DeployError::Internal("not supported".to_string()))
    }

    async fn build_deploy(
        &self,
        runtime_path: &Path,
        project: &BotProject,
        _profile: &str,
    ) -> Result<PathBuf, DeployError> {
        if !self.skip_dialogs {
            let dest = Dir::new(runtime_path.join(DIALOGS_DIR));
            dest.create().await?;
            Dir::new(&project.dir).copy_to(&dest).await?;
        }
        Ok(runtime_path.to_path_buf())
    }

    async fn eject(&self, _project: &BotProject, dest: &Path) -> Result<PathBuf, DeployError> {
        Ok(dest.join("runtime"))
    }
}
