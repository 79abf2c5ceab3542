//! LUIS authoring models

use serde::{Deserialize, Serialize};

/// An Azure account available to the LUIS authoring resource
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LuisAzureAccount {
    #[serde(rename = "AzureSubscriptionId", default)]
    pub azure_subscription_id: Option<String>,
    #[serde(rename = "ResourceGroup", default)]
    pub resource_group: Option<String>,
    #[serde(rename = "AccountName", default)]
    pub account_name: Option<String>,
}
