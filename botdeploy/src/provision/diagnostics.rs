//! Human-readable diagnosis of failed template deployments

use azure_models::DeploymentOperation;

/// Azure error code for a resource type not offered in a region
pub const MISSING_REGISTRATION_FOR_LOCATION: &str = "MissingRegistrationForLocation";

/// One line per problem, in operation order.
///
/// Operations without an error are skipped. An empty operation list yields a
/// single generic message.
pub fn diagnose_failed_operations(operations: &[DeploymentOperation]) -> Vec<String> {
    if operations.is_empty() {
        return vec![
            "! Deployment failed. Please refer to the log file for more information.".to_string(),
        ];
    }

    let mut lines = Vec::new();
    for operation in operations {
        let Some(error) = operation.error() else {
            continue;
        };
        let resource_type = operation.resource_type().unwrap_or("unknown");

        match error.code.as_deref() {
            Some(MISSING_REGISTRATION_FOR_LOCATION) => lines.push(format!(
                "! Deployment failed for resource of type {}. This resource is not available in the location provided.",
                resource_type
            )),
            code => {
                lines.push(format!(
                    "! Deployment failed for resource of type {}.",
                    resource_type
                ));
                lines.push(format!("! Code: {}.", code.unwrap_or("unknown")));
                lines.push(format!(
                    "! Message: {}.",
                    error.message.as_deref().unwrap_or("")
                ));
            }
        }
    }
    lines
}
