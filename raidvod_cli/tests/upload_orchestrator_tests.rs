//! Tests for the watch loop orchestration
//!
//! These drive the orchestrator against a temporary directory with a mock
//! gateway and a sleeper that cancels after a set number of passes.

use raidvod_cli::config::{AppConfig, ConfigManager};
use raidvod_cli::orchestrators::{UploadOrchestrator, WatchSummary};
use raidvod_core::error::UploadError;
use raidvod_core::{
    Difficulty, MemoryTrackingStore, Scope, SqliteTrackingStore, TrackingStore, Visibility,
    WatchedDirectory,
};
use raidvod_test_utils::{ManualSleeper, MockUploadGateway, RecordingBuilder};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

fn canonical_dir(temp_dir: &TempDir) -> PathBuf {
    temp_dir.path().canonicalize().unwrap()
}

fn config_for(dir: &Path) -> AppConfig {
    let mut config = AppConfig::default();
    config.watch.directory = Some(dir.to_path_buf());
    config
}

async fn scope_of(store: &dyn TrackingStore, dir: &Path) -> Scope {
    store
        .ensure_scope(&WatchedDirectory::new(dir).unwrap())
        .await
        .unwrap()
}

/// Run the loop for `passes` directory passes
async fn watch_for(
    passes: usize,
    config: AppConfig,
    store: Arc<dyn TrackingStore>,
    gateway: &MockUploadGateway,
) -> anyhow::Result<WatchSummary> {
    let dir = config.watch.directory.clone().unwrap();
    let cancel = CancellationToken::new();
    let sleeper = Arc::new(ManualSleeper::cancel_after(passes, cancel.clone()));

    let mut orchestrator =
        UploadOrchestrator::new(config, store, Arc::new(gateway.clone()), cancel)
            .with_sleeper(sleeper);
    orchestrator.run(&dir).await
}

#[tokio::test]
async fn test_eligible_file_is_uploaded_and_tracked() {
    let temp_dir = TempDir::new().unwrap();
    let dir = canonical_dir(&temp_dir);
    let kill = RecordingBuilder::new().with_boss("Fyrakk").create_in(&dir);
    let wipe = RecordingBuilder::new().with_boss("Fyrakk").kill(false).create_in(&dir);

    let store = Arc::new(MemoryTrackingStore::new());
    let gateway = MockUploadGateway::new();
    let summary = watch_for(1, config_for(&dir), store.clone(), &gateway)
        .await
        .unwrap();

    assert_eq!(summary.discovered, 2);
    assert_eq!(summary.ineligible, 1);
    assert_eq!(summary.uploaded.len(), 1);
    assert_eq!(summary.uploaded[0].path, kill);
    assert_eq!(summary.uploaded[0].video_id, "mock-video-1");
    assert!(!summary.interrupted);
    assert_eq!(gateway.uploaded_paths(), vec![kill.clone()]);

    let scope = scope_of(store.as_ref(), &dir).await;
    assert!(store.is_tracked(&scope, &kill).await.unwrap());
    assert!(!store.is_tracked(&scope, &wipe).await.unwrap());
}

#[tokio::test]
async fn test_upload_request_uses_configured_video_settings() {
    let temp_dir = TempDir::new().unwrap();
    let dir = canonical_dir(&temp_dir);
    RecordingBuilder::new()
        .with_boss("Tindral")
        .with_difficulty(Difficulty::Heroic)
        .create_in(&dir);

    let mut config = config_for(&dir);
    config.youtube_video.visibility = Visibility::Unlisted;
    config.youtube_video.category_id = "20".to_string();
    config.youtube_video.description = "{difficulty} kill".to_string();

    let gateway = MockUploadGateway::new();
    watch_for(1, config, Arc::new(MemoryTrackingStore::new()), &gateway)
        .await
        .unwrap();

    let requests = gateway.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].visibility, Visibility::Unlisted);
    assert_eq!(requests[0].category_id, "20");
    assert_eq!(requests[0].description, "Heroic kill");
    assert!(requests[0].title.contains("Tindral"));
    assert!(!requests[0].title.contains("(Kill)"));
}

#[tokio::test]
async fn test_ineligible_file_is_seen_again_every_pass() {
    let temp_dir = TempDir::new().unwrap();
    let dir = canonical_dir(&temp_dir);
    RecordingBuilder::new().with_extension(".txt").create_in(&dir);

    let store = Arc::new(MemoryTrackingStore::new());
    let gateway = MockUploadGateway::new();
    let summary = watch_for(3, config_for(&dir), store.clone(), &gateway)
        .await
        .unwrap();

    assert_eq!(summary.passes, 3);
    assert_eq!(summary.discovered, 3);
    assert_eq!(summary.ineligible, 3);
    assert!(summary.uploaded.is_empty());
    assert!(gateway.requests().is_empty());

    let scope = scope_of(store.as_ref(), &dir).await;
    assert!(store.tracked_files(&scope).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_tracked_file_is_not_uploaded_again() {
    let temp_dir = TempDir::new().unwrap();
    let dir = canonical_dir(&temp_dir);
    let kill = RecordingBuilder::new().create_in(&dir);

    let store = Arc::new(MemoryTrackingStore::new());
    let scope = scope_of(store.as_ref(), &dir).await;
    store.track(&scope, &kill).await.unwrap();

    let gateway = MockUploadGateway::new();
    let summary = watch_for(2, config_for(&dir), store, &gateway).await.unwrap();

    assert_eq!(summary.discovered, 0);
    assert!(gateway.requests().is_empty());
}

#[tokio::test]
async fn test_upload_failure_stops_the_run_and_leaves_file_untracked() {
    let temp_dir = TempDir::new().unwrap();
    let dir = canonical_dir(&temp_dir);
    let older = RecordingBuilder::new()
        .with_boss("Smolderon")
        .modified_at(1_700_000_000)
        .create_in(&dir);
    let newer = RecordingBuilder::new()
        .with_boss("Nymue")
        .modified_at(1_700_000_100)
        .create_in(&dir);

    let store = Arc::new(MemoryTrackingStore::new());
    let gateway = MockUploadGateway::new();
    gateway.fail_for(&newer, 403);

    let error = watch_for(5, config_for(&dir), store.clone(), &gateway)
        .await
        .unwrap_err();

    let core_error = error
        .chain()
        .find_map(|cause| cause.downcast_ref::<raidvod_core::Error>())
        .expect("upload failure should carry the core error");
    assert!(matches!(
        core_error,
        raidvod_core::Error::Upload(UploadError::Server { status: 403, .. })
    ));

    assert_eq!(gateway.uploaded_paths(), vec![older.clone(), newer.clone()]);
    let scope = scope_of(store.as_ref(), &dir).await;
    assert!(store.is_tracked(&scope, &older).await.unwrap());
    assert!(!store.is_tracked(&scope, &newer).await.unwrap());
}

#[tokio::test]
async fn test_cancel_during_upload_returns_interrupted_summary() {
    let temp_dir = TempDir::new().unwrap();
    let dir = canonical_dir(&temp_dir);
    let kill = RecordingBuilder::new().create_in(&dir);

    let store = Arc::new(MemoryTrackingStore::new());
    let gateway = MockUploadGateway::new();
    gateway.hang_forever();

    let cancel = CancellationToken::new();
    let canceller = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            cancel.cancel();
        })
    };

    let mut orchestrator = UploadOrchestrator::new(
        config_for(&dir),
        store.clone(),
        Arc::new(gateway.clone()),
        cancel,
    )
    .with_sleeper(Arc::new(ManualSleeper::new()));
    let summary = orchestrator.run(&dir).await.unwrap();
    canceller.await.unwrap();

    assert!(summary.interrupted);
    assert!(summary.uploaded.is_empty());
    assert_eq!(gateway.requests().len(), 1);

    let scope = scope_of(store.as_ref(), &dir).await;
    assert!(!store.is_tracked(&scope, &kill).await.unwrap());
}

#[tokio::test]
async fn test_reload_applies_before_next_file() {
    let temp_dir = TempDir::new().unwrap();
    let dir = canonical_dir(&temp_dir);
    RecordingBuilder::new()
        .with_difficulty(Difficulty::Heroic)
        .create_in(&dir);

    let config_dir = TempDir::new().unwrap();
    let mut manager = ConfigManager::with_path(config_dir.path().join("config.toml"));
    manager
        .set("watch.directory", &dir.display().to_string())
        .unwrap();
    manager.set("watch.difficulties", "Mythic").unwrap();

    let cancel = CancellationToken::new();
    let gateway = MockUploadGateway::new();
    let mut orchestrator = UploadOrchestrator::new(
        config_for(&dir),
        Arc::new(MemoryTrackingStore::new()),
        Arc::new(gateway.clone()),
        cancel.clone(),
    )
    .with_config_manager(manager)
    .with_sleeper(Arc::new(ManualSleeper::cancel_after(1, cancel)));

    orchestrator.request_reload();
    let summary = orchestrator.run(&dir).await.unwrap();

    assert_eq!(summary.ineligible, 1);
    assert!(gateway.requests().is_empty());
    assert_eq!(
        orchestrator.config().watch.difficulties,
        vec![Difficulty::Mythic]
    );
    assert!(!orchestrator.reload_handle().load(std::sync::atomic::Ordering::SeqCst));
}

#[tokio::test]
async fn test_failed_reload_keeps_previous_configuration() {
    let temp_dir = TempDir::new().unwrap();
    let dir = canonical_dir(&temp_dir);
    RecordingBuilder::new()
        .with_difficulty(Difficulty::Heroic)
        .create_in(&dir);

    let config_dir = TempDir::new().unwrap();
    let config_path = config_dir.path().join("config.toml");
    std::fs::write(&config_path, "watch = [not valid toml").unwrap();

    let cancel = CancellationToken::new();
    let gateway = MockUploadGateway::new();
    let mut orchestrator = UploadOrchestrator::new(
        config_for(&dir),
        Arc::new(MemoryTrackingStore::new()),
        Arc::new(gateway.clone()),
        cancel.clone(),
    )
    .with_config_manager(ConfigManager::with_path(config_path))
    .with_sleeper(Arc::new(ManualSleeper::cancel_after(1, cancel)));

    orchestrator.request_reload();
    let summary = orchestrator.run(&dir).await.unwrap();

    assert_eq!(summary.uploaded.len(), 1);
    assert_eq!(orchestrator.config(), &config_for(&dir));
}

#[tokio::test]
async fn test_uploads_survive_restart_with_sqlite_store() {
    let temp_dir = TempDir::new().unwrap();
    let dir = canonical_dir(&temp_dir);
    RecordingBuilder::new().create_in(&dir);

    let db_dir = TempDir::new().unwrap();
    let db_path = db_dir.path().join("raidvod.db");
    let gateway = MockUploadGateway::new();

    let store = Arc::new(SqliteTrackingStore::open(&db_path).await.unwrap());
    let first = watch_for(1, config_for(&dir), store.clone(), &gateway)
        .await
        .unwrap();
    store.close().await;
    assert_eq!(first.uploaded.len(), 1);

    let store = Arc::new(SqliteTrackingStore::open(&db_path).await.unwrap());
    let second = watch_for(1, config_for(&dir), store.clone(), &gateway)
        .await
        .unwrap();
    store.close().await;

    assert!(second.uploaded.is_empty());
    assert_eq!(gateway.success_count(), 1);
}
