//! Azure Resource Manager models: subscriptions, resource groups and template deployments

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::envelope::ErrorResponse;

/// Subscription lookup, only used to discover the tenant
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    #[serde(default)]
    pub subscription_id: Option<String>,
    #[serde(default)]
    pub tenant_id: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
}

/// Resource group
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceGroup {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub location: String,
}

/// A single `{"value": ...}` template parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateParameter {
    pub value: serde_json::Value,
}

impl TemplateParameter {
    pub fn new(value: impl Into<serde_json::Value>) -> Self {
        Self {
            value: value.into(),
        }
    }
}

/// Parameter name to wrapped value, in stable order
pub type TemplateParameters = BTreeMap<String, TemplateParameter>;

/// Deployment mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeploymentMode {
    #[default]
    Incremental,
    Complete,
}

/// Request body for validate and create-or-update
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deployment {
    pub properties: DeploymentProperties,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentProperties {
    pub template: serde_json::Value,
    pub parameters: TemplateParameters,
    pub mode: DeploymentMode,
}

/// Result of a template validation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeploymentValidateResult {
    #[serde(default)]
    pub error: Option<ErrorResponse>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<serde_json::Value>,
}

/// Deployment as returned by create-or-update and get
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeploymentExtended {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub properties: Option<DeploymentPropertiesExtended>,
}

impl DeploymentExtended {
    pub fn provisioning_state(&self) -> Option<&str> {
        self.properties
            .as_ref()
            .and_then(|p| p.provisioning_state.as_deref())
    }

    pub fn outputs(&self) -> Option<&serde_json::Map<String, serde_json::Value>> {
        self.properties.as_ref().and_then(|p| p.outputs.as_ref())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentPropertiesExtended {
    #[serde(default)]
    pub provisioning_state: Option<String>,
    #[serde(default)]
    pub outputs: Option<serde_json::Map<String, serde_json::Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorResponse>,
}

/// One operation of a template deployment
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentOperation {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub operation_id: Option<String>,
    #[serde(default)]
    pub properties: Option<DeploymentOperationProperties>,
}

impl DeploymentOperation {
    /// The error reported for this operation, if any
    pub fn error(&self) -> Option<&ErrorResponse> {
        self.properties
            .as_ref()
            .and_then(|p| p.status_message.as_ref())
            .and_then(|m| m.error.as_ref())
    }

    pub fn resource_type(&self) -> Option<&str> {
        self.properties
            .as_ref()
            .and_then(|p| p.target_resource.as_ref())
            .and_then(|t| t.resource_type.as_deref())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentOperationProperties {
    #[serde(default)]
    pub provisioning_state: Option<String>,
    #[serde(default)]
    pub status_code: Option<String>,
    #[serde(default)]
    pub status_message: Option<StatusMessage>,
    #[serde(default)]
    pub target_resource: Option<TargetResource>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatusMessage {
    #[serde(default)]
    pub error: Option<ErrorResponse>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetResource {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub resource_type: Option<String>,
    #[serde(default)]
    pub resource_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deployment_body_shape() {
        let mut parameters = TemplateParameters::new();
        parameters.insert("botId".to_string(), TemplateParameter::new("mybot"));

        let body = Deployment {
            properties: DeploymentProperties {
                template: serde_json::json!({"resources": []}),
                parameters,
                mode: DeploymentMode::Incremental,
            },
        };

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["properties"]["mode"], "Incremental");
        assert_eq!(json["properties"]["parameters"]["botId"]["value"], "mybot");
    }

    #[test]
    fn test_operation_error_accessors() {
        let raw = r#"{
            "operationId": "1",
            "properties": {
                "statusMessage": {"error": {"code": "MissingRegistrationForLocation", "message": "nope"}},
                "targetResource": {"resourceType": "Microsoft.BotService/botServices"}
            }
        }"#;
        let op: DeploymentOperation = serde_json::from_str(raw).unwrap();
        assert_eq!(
            op.error().and_then(|e| e.code.as_deref()),
            Some("MissingRegistrationForLocation")
        );
        assert_eq!(op.resource_type(), Some("Microsoft.BotService/botServices"));
    }
}
