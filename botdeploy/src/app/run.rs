//! Command runners

use std::future::Future;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::deploy::orchestrator::{BotProjectDeploy, DeployRequest};
use crate::errors::DeployError;
use crate::provision::provisioner::CreateRequest;
use crate::runtime::{BotProject, RuntimeTemplate};

/// Run `task` until it completes or `shutdown_signal` fires.
///
/// Remote operations already started are not rolled back on interruption.
pub async fn run_until_shutdown<T>(
    task: impl Future<Output = Result<T, DeployError>>,
    shutdown_signal: impl Future<Output = ()>,
) -> Result<T, DeployError> {
    tokio::select! {
        result = task => result,
        _ = shutdown_signal => {
            warn!("Interrupted, remote operations already started keep running");
            Err(DeployError::Internal("Interrupted".to_string()))
        }
    }
}

/// Deploy a bot project
pub async fn run_deploy(
    deployer: &BotProjectDeploy,
    project: &BotProject,
    request: DeployRequest,
    shutdown_signal: impl Future<Output = ()>,
) -> Result<(), DeployError> {
    info!(
        "Deploying {} to {}-{}",
        project.name, request.name, request.environment
    );
    run_until_shutdown(deployer.deploy(project, request), shutdown_signal).await
}

/// Provision the Azure resources of a bot environment
pub async fn run_create(
    deployer: &BotProjectDeploy,
    request: CreateRequest,
    shutdown_signal: impl Future<Output = ()>,
) -> Result<Option<Map<String, Value>>, DeployError> {
    info!(
        "Provisioning {}-{} in {}",
        request.name, request.environment, request.location
    );
    run_until_shutdown(deployer.create(request), shutdown_signal).await
}

/// Copy the runtime template into the project
pub async fn run_eject(
    runtime: &dyn RuntimeTemplate,
    project: &BotProject,
    dest: &Path,
) -> Result<PathBuf, DeployError> {
    let target = runtime.eject(project, dest).await?;
    info!("Ejected the {} runtime to {}", runtime.name(), target.display());
    Ok(target)
}

/// Resolves on SIGTERM, SIGINT or Ctrl+C
pub async fn await_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let (Ok(mut sigterm), Ok(mut sigint)) = (
            signal(SignalKind::terminate()),
            signal(SignalKind::interrupt()),
        ) else {
            let _ = tokio::signal::ctrl_c().await;
            return;
        };

        tokio::select! {
            _ = sigterm.recv() => {
                info!("SIGTERM received, shutting down...");
            }
            _ = sigint.recv() => {
                info!("SIGINT received, shutting down...");
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl+C received, shutting down...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        info!("Ctrl+C received, shutting down...");
    }
}
