//! Infrastructure template parameters

use azure_models::{TemplateParameter, TemplateParameters};

/// Optional resources the template creates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceFlags {
    pub create_luis_resource: bool,
    pub create_luis_authoring_resource: bool,
    pub create_cosmos_db: bool,
    pub create_storage: bool,
    pub create_app_insights: bool,
}

impl Default for ResourceFlags {
    fn default() -> Self {
        Self {
            create_luis_resource: true,
            create_luis_authoring_resource: true,
            create_cosmos_db: true,
            create_storage: true,
            create_app_insights: true,
        }
    }
}

/// Inputs of the template
#[derive(Debug, Clone)]
pub struct TemplateInputs<'a> {
    pub app_id: &'a str,
    pub app_password: &'a str,
    pub location: &'a str,
    pub name: &'a str,
    pub resources: ResourceFlags,
}

/// Name of the secret parameter, redacted before logging
pub const APP_SECRET_PARAMETER: &str = "appSecret";

/// Build the `{name: {value}}` parameter map expected by the template
pub fn build_template_parameters(inputs: &TemplateInputs<'_>) -> TemplateParameters {
    let flags = &inputs.resources;
    let mut parameters = TemplateParameters::new();
    let mut put = |name: &str, value: serde_json::Value| {
        parameters.insert(name.to_string(), TemplateParameter { value });
    };

    put("appId", inputs.app_id.into());
    put(APP_SECRET_PARAMETER, inputs.app_password.into());
    put("appServicePlanLocation", inputs.location.into());
    put("botId", inputs.name.into());
    put(
        "shouldCreateAuthoringResource",
        flags.create_luis_authoring_resource.into(),
    );
    put("shouldCreateLuisResource", flags.create_luis_resource.into());
    put("useAppInsights", flags.create_app_insights.into());
    put("useCosmosDb", flags.create_cosmos_db.into());
    put("useStorage", flags.create_storage.into());

    parameters
}

/// Copy of the parameters safe to write to logs
pub fn redacted(parameters: &TemplateParameters) -> TemplateParameters {
    let mut copy = parameters.clone();
    if let Some(secret) = copy.get_mut(APP_SECRET_PARAMETER) {
        secret.value = "******".into();
    }
    copy
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs() -> TemplateInputs<'static> {
        TemplateInputs {
            app_id: "app-id",
            app_password: "pw",
            location: "westus",
            name: "mybot",
            resources: ResourceFlags {
                create_cosmos_db: false,
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_every_parameter_is_wrapped() {
        let parameters = build_template_parameters(&inputs());
        let json = serde_json::to_value(&parameters).unwrap();

        assert_eq!(parameters.len(), 9);
        assert_eq!(json["appId"]["value"], "app-id");
        assert_eq!(json["appServicePlanLocation"]["value"], "westus");
        assert_eq!(json["botId"]["value"], "mybot");
        assert_eq!(json["useCosmosDb"]["value"], false);
        assert_eq!(json["useStorage"]["value"], true);
    }

    #[test]
    fn test_redacted_hides_secret_only() {
        let parameters = build_template_parameters(&inputs());
        let safe = redacted(&parameters);

        assert_eq!(safe[APP_SECRET_PARAMETER].value, "******");
        assert_eq!(parameters[APP_SECRET_PARAMETER].value, "pw");
        assert_eq!(safe["appId"], parameters["appId"]);
    }
}
