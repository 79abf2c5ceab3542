//! botdeploy - Entry Point
//!
//! Usage:
//!   botdeploy create --name mybot --environment dev --location westus
//!   botdeploy deploy --name mybot --environment dev --bot ./mybot
//!   botdeploy eject --bot ./mybot
//!   botdeploy version

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use tracing::debug;

use botdeploy::app::options::DeployConfig;
use botdeploy::app::run::{await_shutdown_signal, run_create, run_deploy, run_eject};
use botdeploy::deploy::orchestrator::{BotProjectDeploy, DeployRequest};
use botdeploy::events::{ConsoleSink, EventLogger};
use botdeploy::logs::{init_logging, LogLevel, LogOptions};
use botdeploy::provision::params::ResourceFlags;
use botdeploy::provision::provisioner::CreateRequest;
use botdeploy::runtime::{runtime_for, BotProject, RuntimeTemplate};
use botdeploy::storage::layout::ProjectLayout;
use botdeploy::utils::version_info;

#[derive(Parser)]
#[command(name = "botdeploy")]
#[command(about = "Provision and deploy bot projects to Azure", long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info")]
    log_level: LogLevel,

    /// Also write logs to <dir>/botdeploy.log
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    /// Log as JSON lines instead of colored text
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Provision the Azure resources of a bot environment
    Create(CreateArgs),

    /// Build, package and zip-deploy a bot
    Deploy(DeployArgs),

    /// Copy the runtime template into a bot project
    Eject(EjectArgs),

    /// Print version information
    Version,
}

#[derive(Args)]
struct AzureArgs {
    /// Runtime project directory holding the settings file and templates
    #[arg(long, default_value = ".")]
    project: PathBuf,

    #[arg(long, env = "AZURE_SUBSCRIPTION_ID")]
    subscription_id: Option<String>,

    /// ARM access token (az account get-access-token)
    #[arg(long, env = "AZURE_ACCESS_TOKEN", hide_env_values = true)]
    access_token: Option<String>,

    /// AD Graph token; the access token is used when absent
    #[arg(long, env = "AZURE_GRAPH_TOKEN", hide_env_values = true)]
    graph_token: Option<String>,

    #[arg(long, env = "AZURE_TENANT_ID")]
    tenant_id: Option<String>,

    /// Archive path (default <project>/code.zip)
    #[arg(long)]
    zip_path: Option<PathBuf>,

    /// Settings path (default <project>/appsettings.deployment.json)
    #[arg(long)]
    settings_path: Option<PathBuf>,

    /// Template path (default <project>/DeploymentTemplates/template-with-preexisting-rg.json)
    #[arg(long)]
    template_path: Option<PathBuf>,

    /// Return as soon as long-running operations are accepted
    #[arg(long)]
    no_wait: bool,
}

impl AzureArgs {
    fn into_config(self) -> DeployConfig {
        let layout = ProjectLayout::new(self.project)
            .with_zip_path(self.zip_path)
            .with_settings_path(self.settings_path)
            .with_template_path(self.template_path);
        let mut config = DeployConfig::from_project(layout);
        config.subscription_id = self.subscription_id;
        config.tenant_id = self.tenant_id;
        if let Some(token) = self.access_token {
            config = config.with_access_token(token);
        }
        if let Some(token) = self.graph_token {
            config = config.with_graph_token(token);
        }
        if self.no_wait {
            config.deployment_wait.enabled = false;
            config.zip_deploy_wait.enabled = false;
        }
        config
    }
}

#[derive(Args)]
struct RuntimeArgs {
    /// Runtime flavor (dotnet, node)
    #[arg(long, default_value = "dotnet")]
    runtime: String,

    /// Runtime template directory used by eject
    #[arg(long, default_value = "runtime-template")]
    runtime_template: PathBuf,
}

impl RuntimeArgs {
    fn runtime(&self) -> Result<Arc<dyn RuntimeTemplate>> {
        Ok(runtime_for(&self.runtime, &self.runtime_template)?)
    }
}

#[derive(Args)]
struct CreateArgs {
    #[command(flatten)]
    azure: AzureArgs,

    #[arg(long)]
    name: String,

    #[arg(long, default_value = "dev")]
    environment: String,

    #[arg(long, default_value = "westus")]
    location: String,

    /// Password of a new app registration
    #[arg(long, env = "BOTDEPLOY_APP_PASSWORD", hide_env_values = true)]
    app_password: Option<String>,

    #[arg(long)]
    no_luis: bool,

    #[arg(long)]
    no_luis_authoring: bool,

    #[arg(long)]
    no_cosmos_db: bool,

    #[arg(long)]
    no_storage: bool,

    #[arg(long)]
    no_app_insights: bool,
}

#[derive(Args)]
struct DeployArgs {
    #[command(flatten)]
    azure: AzureArgs,

    #[command(flatten)]
    runtime: RuntimeArgs,

    /// Bot project directory
    #[arg(long)]
    bot: PathBuf,

    #[arg(long, default_value = "")]
    bot_id: String,

    #[arg(long)]
    name: String,

    #[arg(long, default_value = "dev")]
    environment: String,

    #[arg(long, env = "LUIS_AUTHORING_KEY", hide_env_values = true)]
    luis_authoring_key: Option<String>,

    #[arg(long)]
    luis_authoring_region: Option<String>,

    /// Culture of the LU files
    #[arg(long)]
    language: Option<String>,

    /// Site host name, when not {name}-{environment}
    #[arg(long)]
    hostname: Option<String>,

    /// LUIS prediction resource, when not {name}-{environment}-luis
    #[arg(long)]
    luis_resource: Option<String>,
}

#[derive(Args)]
struct EjectArgs {
    #[command(flatten)]
    runtime: RuntimeArgs,

    /// Bot project directory
    #[arg(long)]
    bot: PathBuf,

    /// Where the runtime folder is created (default: the bot directory)
    #[arg(long)]
    dest: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::Version = cli.command {
        println!("{}", serde_json::to_string_pretty(&version_info())?);
        return Ok(());
    }

    let _guard = init_logging(LogOptions {
        log_level: cli.log_level,
        stdout: true,
        log_dir: cli.log_dir.clone(),
        json_format: cli.json_logs,
    })
    .context("Failed to initialize logging")?;

    let logger = if cli.json_logs {
        EventLogger::tracing()
    } else {
        EventLogger::new(Arc::new(ConsoleSink))
    };

    match cli.command {
        Commands::Create(args) => create(args, logger).await,
        Commands::Deploy(args) => deploy(args, logger).await,
        Commands::Eject(args) => eject(args).await,
        Commands::Version => Ok(()),
    }
}

async fn create(args: CreateArgs, logger: EventLogger) -> Result<()> {
    let runtime = runtime_for("dotnet", "runtime-template")?;
    let deployer = BotProjectDeploy::new(args.azure.into_config(), runtime, logger)?;

    let mut request = CreateRequest::new(args.name, args.location, args.environment);
    if let Some(password) = args.app_password {
        request = request.with_app_password(password);
    }
    request.resources = ResourceFlags {
        create_luis_resource: !args.no_luis,
        create_luis_authoring_resource: !args.no_luis_authoring,
        create_cosmos_db: !args.no_cosmos_db,
        create_storage: !args.no_storage,
        create_app_insights: !args.no_app_insights,
    };

    match run_create(&deployer, request, await_shutdown_signal()).await? {
        Some(outputs) => debug!("Provisioned {} outputs", outputs.len()),
        None => println!(
            "{}",
            "Provisioning finished without outputs, review the errors above".yellow()
        ),
    }
    Ok(())
}

async fn deploy(args: DeployArgs, logger: EventLogger) -> Result<()> {
    let runtime = args.runtime.runtime()?;
    let deployer = BotProjectDeploy::new(args.azure.into_config(), runtime, logger)?;

    let project = BotProject::new(args.bot_id, args.name.clone(), args.bot);
    let request = DeployRequest {
        name: args.name,
        environment: args.environment,
        luis_authoring_key: args.luis_authoring_key,
        luis_authoring_region: args.luis_authoring_region,
        language: args.language,
        hostname: args.hostname,
        luis_resource: args.luis_resource,
    };

    run_deploy(&deployer, &project, request, await_shutdown_signal()).await?;
    Ok(())
}

async fn eject(args: EjectArgs) -> Result<()> {
    let runtime = args.runtime.runtime()?;
    let dest = args.dest.clone().unwrap_or_else(|| args.bot.clone());
    let project = BotProject::new("", "", args.bot);

    let target = run_eject(runtime.as_ref(), &project, &dest).await?;
    println!("{} {}", "Runtime ejected to".green(), target.display());
    Ok(())
}
