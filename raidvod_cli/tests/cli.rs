use assert_cmd::Command;
use predicates::prelude::*;
use raidvod_core::Difficulty;
use raidvod_test_utils::RecordingBuilder;
use tempfile::TempDir;

/// `raidvod` isolated from the user's configuration and database
fn raidvod(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("raidvod").unwrap();
    cmd.arg("--config")
        .arg(home.path().join("config.toml"))
        .env("RAIDVOD_DATABASE__PATH", home.path().join("raidvod.db"))
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_version() {
    let mut cmd = Command::cargo_bin("raidvod").unwrap();
    cmd.arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_help_lists_commands() {
    let mut cmd = Command::cargo_bin("raidvod").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("watch"))
        .stdout(predicate::str::contains("inspect"))
        .stdout(predicate::str::contains("tracked"));
}

#[test]
fn test_inspect_shows_metadata() {
    let home = TempDir::new().unwrap();
    let recordings = TempDir::new().unwrap();
    let file = RecordingBuilder::new()
        .with_boss("Fyrakk")
        .with_difficulty(Difficulty::Heroic)
        .create_in(recordings.path());

    raidvod(&home)
        .arg("inspect")
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("Eligible: yes"))
        .stdout(predicate::str::contains("Fyrakk"))
        .stdout(predicate::str::contains("Heroic"))
        .stdout(predicate::str::contains("2023-10-05"));
}

#[test]
fn test_inspect_json() {
    let home = TempDir::new().unwrap();
    let recordings = TempDir::new().unwrap();
    let file = RecordingBuilder::new()
        .with_boss("Tindral")
        .create_in(recordings.path());

    let output = raidvod(&home)
        .arg("inspect")
        .arg(&file)
        .arg("--json")
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["eligible"], true);
    assert!(json["reason"].is_null());
    assert_eq!(json["metadata"]["difficulty"], "Mythic");
    assert!(
        json["metadata"]["title"]
            .as_str()
            .unwrap()
            .contains("Tindral")
    );
}

#[test]
fn test_inspect_reports_ineligible_file() {
    let home = TempDir::new().unwrap();
    let recordings = TempDir::new().unwrap();
    let file = RecordingBuilder::new()
        .without_difficulty()
        .create_in(recordings.path());

    let output = raidvod(&home)
        .args(["inspect", "--json"])
        .arg(&file)
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["eligible"], false);
    assert!(json["reason"].is_string());
    assert!(json["metadata"].is_null());
    assert!(json["error"].is_string());
}

#[test]
fn test_inspect_missing_file_is_filesystem_error() {
    let home = TempDir::new().unwrap();

    raidvod(&home)
        .arg("inspect")
        .arg(home.path().join("missing.mp4"))
        .assert()
        .code(4)
        .stderr(predicate::str::contains("missing.mp4"));
}

#[test]
fn test_config_set_and_get() {
    let home = TempDir::new().unwrap();

    raidvod(&home)
        .args(["config", "set", "youtube_video.visibility", "Unlisted"])
        .assert()
        .success();

    raidvod(&home)
        .args(["config", "get", "youtube_video.visibility"])
        .assert()
        .success()
        .stdout("unlisted\n");

    raidvod(&home)
        .args(["config", "set", "watch.difficulties", "heroic, mythic"])
        .assert()
        .success();

    raidvod(&home)
        .args(["config", "get", "watch.difficulties"])
        .assert()
        .success()
        .stdout("Heroic,Mythic\n");
}

#[test]
fn test_config_set_rejects_invalid_value() {
    let home = TempDir::new().unwrap();

    raidvod(&home)
        .args(["config", "set", "youtube_video.visibility", "friends-only"])
        .assert()
        .code(6);

    assert!(!home.path().join("config.toml").exists());
}

#[test]
fn test_config_path_honours_flag() {
    let home = TempDir::new().unwrap();

    raidvod(&home)
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

#[test]
fn test_config_list_groups_sections() {
    let home = TempDir::new().unwrap();

    raidvod(&home)
        .args(["config", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[watch]"))
        .stdout(predicate::str::contains("poll_interval_seconds = 15"))
        .stdout(predicate::str::contains("[youtube_video]"));
}

#[test]
fn test_environment_overrides_file() {
    let home = TempDir::new().unwrap();

    raidvod(&home)
        .args(["config", "set", "watch.poll_interval_seconds", "30"])
        .assert()
        .success();

    raidvod(&home)
        .env("RAIDVOD_WATCH__POLL_INTERVAL_SECONDS", "45")
        .args(["config", "get", "watch.poll_interval_seconds"])
        .assert()
        .success()
        .stdout("45\n");
}

#[test]
fn test_track_untrack_and_list() {
    let home = TempDir::new().unwrap();
    let recordings = TempDir::new().unwrap();
    let file = RecordingBuilder::new().create_in(recordings.path());
    let file_name = file.file_name().unwrap().to_string_lossy().to_string();

    raidvod(&home)
        .arg("track")
        .arg(&file)
        .arg("--directory")
        .arg(recordings.path())
        .assert()
        .success();

    raidvod(&home)
        .arg("tracked")
        .arg("--directory")
        .arg(recordings.path())
        .assert()
        .success()
        .stdout(predicate::str::contains(file_name.as_str()));

    raidvod(&home)
        .arg("scopes")
        .assert()
        .success()
        .stdout(predicate::str::contains("vods_"));

    raidvod(&home)
        .arg("untrack")
        .arg(&file)
        .arg("--directory")
        .arg(recordings.path())
        .assert()
        .success();

    raidvod(&home)
        .arg("tracked")
        .arg("--directory")
        .arg(recordings.path())
        .assert()
        .success()
        .stdout(predicate::str::contains(file_name.as_str()).not());
}

#[test]
fn test_track_missing_file_fails() {
    let home = TempDir::new().unwrap();
    let recordings = TempDir::new().unwrap();

    raidvod(&home)
        .arg("track")
        .arg(recordings.path().join("nope.mp4"))
        .arg("--directory")
        .arg(recordings.path())
        .assert()
        .code(4);
}

#[test]
fn test_watch_without_directory_is_configuration_error() {
    let home = TempDir::new().unwrap();

    raidvod(&home)
        .arg("watch")
        .assert()
        .code(6)
        .stderr(predicate::str::contains("--directory"));
}

#[test]
fn test_watch_with_invalid_template_is_configuration_error() {
    let home = TempDir::new().unwrap();
    let recordings = TempDir::new().unwrap();

    raidvod(&home)
        .env("RAIDVOD_YOUTUBE_VIDEO__DESCRIPTION", "Killed {boss}")
        .arg("watch")
        .arg("--directory")
        .arg(recordings.path())
        .assert()
        .code(6);
}

#[test]
fn test_completions() {
    let mut cmd = Command::cargo_bin("raidvod").unwrap();
    cmd.args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("raidvod"));
}
