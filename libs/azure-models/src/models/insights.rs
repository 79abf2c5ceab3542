//! Application Insights models

use serde::{Deserialize, Serialize};

/// Application Insights component
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppInsightsComponent {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub properties: Option<AppInsightsComponentProperties>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppInsightsComponentProperties {
    #[serde(rename = "AppId", default)]
    pub app_id: Option<String>,
    #[serde(rename = "InstrumentationKey", default)]
    pub instrumentation_key: Option<String>,
}

/// API key creation request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeyRequest {
    pub name: String,
    pub linked_read_properties: Vec<String>,
    pub linked_write_properties: Vec<String>,
}

/// Created API key
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKey {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
}
