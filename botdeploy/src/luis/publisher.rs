//! LUIS publishing: build LU files, record the app ids and bind the prediction resource

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use azure_models::{ErrorEnvelope, LuisAzureAccount};

use crate::authn::access_token::REFRESH_HINT;
use crate::errors::DeployError;
use crate::events::{DeployStatus, EventLogger};
use crate::filesys::dir::Dir;
use crate::filesys::file::File;
use crate::luis::api::LuisAuthoring;
use crate::luis::builder::LuBuilder;
use crate::storage::layout::GENERATED_DIR;
use crate::storage::settings::{DeploymentSettings, LuisSettings};
use crate::utils::resource_group_name;

const TOKEN_EXPIRY_MARKER: &str = "access token expiry";
const LUIS_SETTINGS_MARKER: &str = "luis.settings";

/// Keys of the `luis` record that are configuration, not app ids
const RESERVED_KEYS: [&str; 5] = [
    "endpoint",
    "endpointKey",
    "authoringEndpoint",
    "authoringRegion",
    "authoringKey",
];

/// Input of [`LuisPublisher::publish`]
#[derive(Debug, Clone, Default)]
pub struct LuisPublishRequest {
    /// Built bot directory holding the `.lu` files
    pub build_dir: PathBuf,
    pub name: String,
    pub environment: String,
    /// Culture, e.g. `en-us`
    pub language: String,
    /// Prediction endpoint; derived from the region when absent
    pub endpoint: Option<String>,
    pub endpoint_key: Option<String>,
    pub authoring_key: String,
    pub authoring_region: String,
    /// Prediction resource name; `{name}-{environment}-luis` when absent
    pub luis_resource: Option<String>,
}

impl LuisPublishRequest {
    fn authoring_endpoint(&self) -> String {
        format!("https://{}.api.cognitive.microsoft.com", self.authoring_region)
    }

    fn endpoint(&self) -> String {
        self.endpoint
            .clone()
            .filter(|e| !e.is_empty())
            .unwrap_or_else(|| self.authoring_endpoint())
    }

    fn luis_resource(&self) -> String {
        self.luis_resource
            .clone()
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| format!("{}-luis", resource_group_name(&self.name, &self.environment)))
    }
}

pub struct LuisPublisher {
    authoring: Arc<dyn LuisAuthoring>,
    builder: Arc<dyn LuBuilder>,
    logger: EventLogger,
}

impl LuisPublisher {
    pub fn new(authoring: Arc<dyn LuisAuthoring>, builder: Arc<dyn LuBuilder>, logger: EventLogger) -> Self {
        Self {
            authoring,
            builder,
            logger,
        }
    }

    /// Build and publish the bot's LU models, then bind the apps of this
    /// build to the prediction resource. Does nothing without an authoring key and region.
    pub async fn publish(
        &self,
        token: &str,
        settings_file: &File,
        request: &LuisPublishRequest,
    ) -> Result<(), DeployError> {
        if request.authoring_key.is_empty() || request.authoring_region.is_empty() {
            debug!("No LUIS authoring key or region, skipping publish");
            return Ok(());
        }

        let build_dir = Dir::new(&request.build_dir);
        let lu_files = collect_lu_files(&build_dir).await?;

        let generated = build_dir.subdir(GENERATED_DIR);
        generated.create().await?;

        self.logger
            .log(DeployStatus::DeployInfo, "Publishing to LUIS ...");
        let authoring_endpoint = request.authoring_endpoint();
        let contents = self
            .builder
            .load_contents(
                &lu_files,
                &request.language,
                &request.environment,
                &request.authoring_region,
            )
            .await?;
        let result = self
            .builder
            .build(
                &contents,
                &request.authoring_key,
                &authoring_endpoint,
                &request.name,
                &request.environment,
                &request.language,
            )
            .await?;
        let written = self
            .builder
            .write_dialog_assets(&result, true, &generated)
            .await;
        result.discard().await?;
        written?;

        let discovered = collect_app_ids(&build_dir).await?;

        let endpoint = request.endpoint();
        let mut settings = if settings_file.exists().await {
            DeploymentSettings::load(settings_file).await?
        } else {
            DeploymentSettings::default()
        };
        let previous = settings.luis.take().unwrap_or_default();
        let mut app_ids = previous.app_ids;
        app_ids.extend(discovered.iter().map(|(k, v)| (k.clone(), v.clone())));

        settings.luis = Some(LuisSettings {
            endpoint: Some(endpoint.clone()),
            endpoint_key: request.endpoint_key.clone().filter(|k| !k.is_empty()),
            authoring_endpoint: previous.authoring_endpoint,
            authoring_region: Some(request.authoring_region.clone()),
            authoring_key: Some(request.authoring_key.clone()),
            app_ids,
        });
        settings.save(settings_file).await?;

        let accounts = self
            .authoring
            .list_azure_accounts(&endpoint, token, &request.authoring_key)
            .await
            .map_err(expiry_to_auth_error)?;

        let account_name = request.luis_resource();
        let account = find_account(&accounts, &account_name)?;

        // Ids kept from earlier deploys may belong to deleted apps
        for (key, app_id) in discovered.iter().filter_map(|(k, v)| v.as_str().map(|id| (k, id))) {
            debug!("Assigning {} ({}) to {}", key, app_id, account_name);
            let response = self
                .authoring
                .assign_azure_account(&endpoint, app_id, token, &request.authoring_key, account)
                .await?;
            self.logger.log(DeployStatus::DeployInfo, response);
        }

        self.logger
            .log(DeployStatus::DeployInfo, "Luis Publish Success! ...");
        Ok(())
    }
}

/// Non-empty `.lu` files below `dir`
async fn collect_lu_files(dir: &Dir) -> Result<Vec<PathBuf>, DeployError> {
    let mut lu_files = Vec::new();
    for path in dir.walk_files().await? {
        if path.extension().is_some_and(|ext| ext == "lu") && File::new(&path).size().await? > 0 {
            lu_files.push(path);
        }
    }
    Ok(lu_files)
}

/// Merge the `luis` objects of every `*luis.settings*` file; later files win
async fn collect_app_ids(dir: &Dir) -> Result<BTreeMap<String, Value>, DeployError> {
    let mut app_ids = BTreeMap::new();
    for path in dir.walk_files().await? {
        let is_settings = path
            .file_name()
            .is_some_and(|n| n.to_string_lossy().contains(LUIS_SETTINGS_MARKER));
        if !is_settings {
            continue;
        }

        let content: Value = File::new(&path).read_json().await?;
        if let Some(Value::Object(luis)) = content.get("luis") {
            for (key, value) in luis {
                if !RESERVED_KEYS.contains(&key.as_str()) {
                    app_ids.insert(key.clone(), value.clone());
                }
            }
        }
    }
    Ok(app_ids)
}

fn find_account<'a>(
    accounts: &'a [LuisAzureAccount],
    name: &str,
) -> Result<&'a LuisAzureAccount, DeployError> {
    accounts
        .iter()
        .find(|a| a.account_name.as_deref() == Some(name))
        .ok_or_else(|| {
            DeployError::ConfigError(format!(
                "No LUIS prediction resource named {} is available to the authoring key",
                name
            ))
        })
}

/// Turn an expired-token failure of the authoring API into an `AuthError`
fn expiry_to_auth_error(error: DeployError) -> DeployError {
    let DeployError::HttpStatus { body, .. } = &error else {
        return error;
    };
    let Some(detail) = serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .and_then(|envelope| envelope.error)
    else {
        return error;
    };

    let message = detail.message.unwrap_or_default();
    if message.contains(TOKEN_EXPIRY_MARKER) {
        DeployError::AuthError(format!(
            "Type: {}, Message: {}, {}",
            detail.code.unwrap_or_default(),
            message,
            REFRESH_HINT
        ))
    } else {
        error
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expiry_becomes_auth_error() {
        let error = DeployError::HttpStatus {
            status: 401,
            body: r#"{"error":{"code":"Unauthorized","message":"access token expiry reached"}}"#
                .to_string(),
        };
        let mapped = expiry_to_auth_error(error);
        assert!(matches!(mapped, DeployError::AuthError(_)));
        assert!(mapped
            .to_string()
            .starts_with("Type: Unauthorized, Message: access token expiry"));
    }

    #[test]
    fn test_other_errors_unchanged() {
        let error = DeployError::HttpStatus {
            status: 500,
            body: r#"{"error":{"code":"Boom","message":"internal"}}"#.to_string(),
        };
        assert!(matches!(
            expiry_to_auth_error(error),
            DeployError::HttpStatus { status: 500, .. }
        ));

        let error = DeployError::HttpStatus {
            status: 502,
            body: "<html>bad gateway</html>".to_string(),
        };
        assert!(matches!(
            expiry_to_auth_error(error),
            DeployError::HttpStatus { status: 502, .. }
        ));
    }

    #[test]
    fn test_default_resource_name() {
        let request = LuisPublishRequest {
            name: "mybot".into(),
            environment: "dev".into(),
            authoring_region: "westus".into(),
            ..Default::default()
        };
        assert_eq!(request.luis_resource(), "mybot-dev-luis");
        assert_eq!(request.endpoint(), "https://westus.api.cognitive.microsoft.com");
    }
}
