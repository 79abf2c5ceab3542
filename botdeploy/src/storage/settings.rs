//! Deployment settings file (`appsettings.deployment.json`)

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::errors::DeployError;
use crate::filesys::file::File;

/// Deployment settings. Keys this tool does not know are preserved on write.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeploymentSettings {
    /// Bot application registration id
    #[serde(rename = "MicrosoftAppId", default, skip_serializing_if = "Option::is_none")]
    pub microsoft_app_id: Option<String>,

    /// Bot application registration password
    #[serde(
        rename = "MicrosoftAppPassword",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub microsoft_app_password: Option<String>,

    /// LUIS configuration and generated application ids
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub luis: Option<LuisSettings>,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl DeploymentSettings {
    /// Read settings from a file
    pub async fn load(file: &File) -> Result<Self, DeployError> {
        file.read_json().await
    }

    /// Write settings back with 4-space indentation
    pub async fn save(&self, file: &File) -> Result<(), DeployError> {
        file.write_json(self).await
    }

    /// The registered app id, ignoring empty values
    pub fn app_id(&self) -> Option<&str> {
        self.microsoft_app_id.as_deref().filter(|id| !id.is_empty())
    }

    /// Merge a flat map of values into the top level.
    ///
    /// The identity keys land in their typed fields; `luis` is parsed when it
    /// is an object; everything else goes to `extra`.
    pub fn merge(&mut self, values: &serde_json::Map<String, serde_json::Value>) -> Result<(), DeployError> {
        for (key, value) in values {
            match key.as_str() {
                "MicrosoftAppId" => self.microsoft_app_id = value.as_str().map(str::to_string),
                "MicrosoftAppPassword" => {
                    self.microsoft_app_password = value.as_str().map(str::to_string)
                }
                "luis" if value.is_object() => {
                    self.luis = Some(serde_json::from_value(value.clone())?);
                }
                _ => {
                    self.extra.insert(key.clone(), value.clone());
                }
            }
        }
        Ok(())
    }
}

/// The `luis` sub-record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LuisSettings {
    /// Prediction endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authoring_endpoint: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authoring_region: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authoring_key: Option<String>,

    /// Model key to LUIS application id
    #[serde(flatten)]
    pub app_ids: BTreeMap<String, serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_keys_round_trip() {
        let raw = r#"{
            "MicrosoftAppId": "abc",
            "bot": "mybot-dev",
            "luis": {"endpoint": "https://westus.api.cognitive.microsoft.com", "main_en_us_lu": "id-1"}
        }"#;
        let settings: DeploymentSettings = serde_json::from_str(raw).unwrap();
        assert_eq!(settings.app_id(), Some("abc"));
        assert_eq!(settings.extra["bot"], "mybot-dev");

        let luis = settings.luis.as_ref().unwrap();
        assert_eq!(luis.app_ids["main_en_us_lu"], "id-1");

        let json = serde_json::to_value(&settings).unwrap();
        assert_eq!(json["luis"]["main_en_us_lu"], "id-1");
        assert_eq!(json["bot"], "mybot-dev");
    }

    #[test]
    fn test_empty_app_id_is_absent() {
        let settings: DeploymentSettings =
            serde_json::from_str(r#"{"MicrosoftAppId": ""}"#).unwrap();
        assert_eq!(settings.app_id(), None);
    }

    #[test]
    fn test_null_luis_is_absent() {
        let settings: DeploymentSettings = serde_json::from_str(r#"{"luis": null}"#).unwrap();
        assert!(settings.luis.is_none());
    }

    #[test]
    fn test_merge_routes_identity_keys() {
        let mut settings = DeploymentSettings::default();
        let values = serde_json::json!({
            "MicrosoftAppId": "app",
            "MicrosoftAppPassword": "pw",
            "hostname": "mybot-dev",
        });
        settings.merge(values.as_object().unwrap()).unwrap();

        assert_eq!(settings.app_id(), Some("app"));
        assert_eq!(settings.microsoft_app_password.as_deref(), Some("pw"));
        assert_eq!(settings.extra["hostname"], "mybot-dev");
    }
}
