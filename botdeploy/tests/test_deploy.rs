//! Deploy pipeline tests with a fake runtime and uploader

mod common;

use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use serde_json::json;

use botdeploy::deploy::orchestrator::{BotProjectDeploy, DeployRequest};
use botdeploy::errors::DeployError;
use botdeploy::events::{DeployStatus, RecordingSink};
use botdeploy::filesys::dir::Dir;
use botdeploy::filesys::file::File;
use botdeploy::runtime::BotProject;

use common::{recording_logger, test_config, FakeLuBuilder, FakeLuis, FakeRuntime, FakeUploader};

struct Fixture {
    _root: tempfile::TempDir,
    runtime_dir: std::path::PathBuf,
    project: BotProject,
}

async fn fixture() -> Fixture {
    let root = tempfile::tempdir().unwrap();
    let runtime_dir = root.path().join("runtime");
    let bot_dir = root.path().join("mybot");

    let bot = Dir::new(&bot_dir);
    bot.file("main.dialog").write_string("{\"$kind\": \"AdaptiveDialog\"}").await.unwrap();
    bot.subdir("language-understanding")
        .file("main.en-us.lu")
        .write_string("# Greeting\n- hello")
        .await
        .unwrap();
    Dir::new(&runtime_dir).create().await.unwrap();

    Fixture {
        project: BotProject::new("bot-1", "mybot", &bot_dir),
        runtime_dir,
        _root: root,
    }
}

fn zip_entries(path: &Path) -> Vec<String> {
    let file = std::fs::File::open(path).unwrap();
    let mut archive = zip::ZipArchive::new(file).unwrap();
    let mut names = Vec::new();
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).unwrap();
        let mut sink = Vec::new();
        entry.read_to_end(&mut sink).unwrap();
        names.push(entry.name().to_string());
    }
    names
}

fn deployer(
    runtime_dir: &Path,
    runtime: FakeRuntime,
    uploader: Arc<FakeUploader>,
    lu_builder: Arc<FakeLuBuilder>,
    luis: Arc<FakeLuis>,
) -> (BotProjectDeploy, Arc<RecordingSink>) {
    let (logger, sink) = recording_logger();
    let deployer = BotProjectDeploy::new(test_config(runtime_dir), Arc::new(runtime), logger)
        .unwrap()
        .with_uploader(uploader)
        .with_lu_builder(lu_builder)
        .with_luis(luis);
    (deployer, sink)
}

#[tokio::test]
async fn test_deploy_without_luis_uploads_archive() {
    let fx = fixture().await;
    File::new(fx.runtime_dir.join("appsettings.deployment.json"))
        .write_json(&json!({"MicrosoftAppId": "app"}))
        .await
        .unwrap();
    // Stale archive from a previous run
    File::new(fx.runtime_dir.join("code.zip"))
        .write_string("stale")
        .await
        .unwrap();

    let uploader = Arc::new(FakeUploader::default());
    let lu_builder = Arc::new(FakeLuBuilder::default());
    let (deployer, sink) = deployer(
        &fx.runtime_dir,
        FakeRuntime::default(),
        uploader.clone(),
        lu_builder.clone(),
        Arc::new(FakeLuis::default()),
    );

    deployer
        .deploy(&fx.project, DeployRequest::new("mybot", "dev"))
        .await
        .unwrap();

    assert_eq!(lu_builder.build_count(), 0);

    let uploads = uploader.uploads();
    assert_eq!(uploads.len(), 1);
    let (url, zip_path, existed) = &uploads[0];
    assert!(url.contains("mybot-dev.scm."));
    assert!(url.ends_with("/zipdeploy/?isAsync=true"));
    assert!(existed);

    let entries = zip_entries(zip_path);
    assert!(entries.contains(&"ComposerDialogs/main.dialog".to_string()));
    assert!(entries.contains(&"appsettings.deployment.json".to_string()));
    assert!(!entries.iter().any(|e| e.ends_with("code.zip")));

    assert_eq!(sink.messages(DeployStatus::DeploySuccess).len(), 1);
    assert!(sink.messages(DeployStatus::DeployError).is_empty());
}

#[tokio::test]
async fn test_deploy_custom_hostname() {
    let fx = fixture().await;
    let uploader = Arc::new(FakeUploader::default());
    let (deployer, _sink) = deployer(
        &fx.runtime_dir,
        FakeRuntime::default(),
        uploader.clone(),
        Arc::new(FakeLuBuilder::default()),
        Arc::new(FakeLuis::default()),
    );

    let mut request = DeployRequest::new("mybot", "dev");
    request.hostname = Some("custom-host".to_string());
    deployer.deploy(&fx.project, request).await.unwrap();

    assert!(uploader.uploads()[0].0.starts_with("https://custom-host.scm."));
}

#[tokio::test]
async fn test_deploy_publishes_luis_when_configured() {
    let fx = fixture().await;
    File::new(fx.runtime_dir.join("appsettings.deployment.json"))
        .write_json(&json!({
            "MicrosoftAppId": "app",
            "luis": {"authoringKey": "settings-key", "authoringRegion": "westus"}
        }))
        .await
        .unwrap();

    let lu_builder = Arc::new(FakeLuBuilder {
        outputs: vec![(
            "luis.settings.dev.westus.json".to_string(),
            json!({"luis": {"mybot_dev_en_us_lu": "app-id-1"}}).to_string(),
        )],
        ..Default::default()
    });
    let luis = Arc::new(FakeLuis::with_account("mybot-dev-luis"));
    let uploader = Arc::new(FakeUploader::default());
    let (deployer, _sink) = deployer(
        &fx.runtime_dir,
        FakeRuntime::default(),
        uploader.clone(),
        lu_builder.clone(),
        luis.clone(),
    );

    deployer
        .deploy(&fx.project, DeployRequest::new("mybot", "dev"))
        .await
        .unwrap();

    assert_eq!(lu_builder.build_count(), 1);
    assert_eq!(luis.assigned(), vec!["app-id-1"]);

    let saved: serde_json::Value = File::new(fx.runtime_dir.join("appsettings.deployment.json"))
        .read_json()
        .await
        .unwrap();
    assert_eq!(saved["luis"]["mybot_dev_en_us_lu"], "app-id-1");
    assert_eq!(saved["luis"]["authoringKey"], "settings-key");
    assert_eq!(
        saved["luis"]["endpoint"],
        "https://westus.api.cognitive.microsoft.com"
    );

    let entries = zip_entries(&uploader.uploads()[0].1);
    assert!(entries.contains(&"ComposerDialogs/generated/luis.settings.dev.westus.json".to_string()));
}

#[tokio::test]
async fn test_missing_dialogs_is_build_error() {
    let fx = fixture().await;
    let uploader = Arc::new(FakeUploader::default());
    let (deployer, sink) = deployer(
        &fx.runtime_dir,
        FakeRuntime { skip_dialogs: true },
        uploader.clone(),
        Arc::new(FakeLuBuilder::default()),
        Arc::new(FakeLuis::default()),
    );

    let err = deployer
        .deploy(&fx.project, DeployRequest::new("mybot", "dev"))
        .await
        .unwrap_err();

    assert!(matches!(err, DeployError::BuildError(_)));
    assert!(uploader.uploads().is_empty());
    assert_eq!(sink.messages(DeployStatus::DeployError).len(), 1);
}

#[tokio::test]
async fn test_forbidden_upload_is_token_expired() {
    let fx = fixture().await;
    let uploader = Arc::new(FakeUploader {
        fail_status: Some(403),
        ..Default::default()
    });
    let (deployer, sink) = deployer(
        &fx.runtime_dir,
        FakeRuntime::default(),
        uploader,
        Arc::new(FakeLuBuilder::default()),
        Arc::new(FakeLuis::default()),
    );

    let err = deployer
        .deploy(&fx.project, DeployRequest::new("mybot", "dev"))
        .await
        .unwrap_err();

    assert!(matches!(err, DeployError::AuthError(_)));
    assert!(err.to_string().starts_with("Token expired, please run az account get-access-token"));

    let events = sink.events();
    let last = events.last().unwrap();
    assert_eq!(last.status, DeployStatus::DeployError);
    assert_eq!(last.message["kind"], "AuthError");
}
