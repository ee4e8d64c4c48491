//! Eligibility rules against real files

use raidvod_core::eligibility::{
    Eligibility, EligibilityConfig, EligibilityFilter, IneligibleReason,
};
use raidvod_core::Difficulty;
use raidvod_test_utils::RecordingBuilder;
use tempfile::TempDir;

fn filter(difficulties: &[Difficulty]) -> EligibilityFilter {
    EligibilityFilter::new(EligibilityConfig {
        allowed_extensions: vec![".mp4".to_string(), ".mkv".to_string()],
        required_keywords: vec!["Kill".to_string()],
        allowed_difficulties: difficulties.to_vec(),
    })
}

#[test]
fn test_wrong_extension_is_ineligible_regardless_of_other_checks() {
    let dir = TempDir::new().unwrap();
    let path = RecordingBuilder::new()
        .with_extension(".avi")
        .create_in(dir.path());

    assert_eq!(
        filter(&Difficulty::ALL).evaluate(&path),
        Eligibility::Ineligible(IneligibleReason::ExtensionNotAllowed {
            extension: ".avi".to_string()
        })
    );
}

#[test]
fn test_missing_keyword_is_ineligible_with_valid_marker() {
    let dir = TempDir::new().unwrap();
    let path = RecordingBuilder::new().kill(false).create_in(dir.path());

    assert_eq!(
        filter(&Difficulty::ALL).evaluate(&path),
        Eligibility::Ineligible(IneligibleReason::KeywordMissing)
    );
}

#[test]
fn test_difficulty_filtering() {
    let dir = TempDir::new().unwrap();
    let heroic = RecordingBuilder::new()
        .with_difficulty(Difficulty::Heroic)
        .create_in(dir.path());
    let mythic = RecordingBuilder::new()
        .with_boss("Other Boss")
        .with_difficulty(Difficulty::Mythic)
        .create_in(dir.path());

    let filter = filter(&[Difficulty::Mythic]);
    assert!(!filter.is_eligible(&heroic));
    assert!(filter.is_eligible(&mythic));
}

#[test]
fn test_malformed_name_is_distinguishable() {
    let dir = TempDir::new().unwrap();
    let path = RecordingBuilder::new()
        .with_marker("[X]")
        .create_in(dir.path());

    let verdict = filter(&Difficulty::ALL).evaluate(&path);
    assert!(!verdict.is_eligible());
    assert!(matches!(
        verdict,
        Eligibility::Ineligible(IneligibleReason::DifficultyNotFound(_))
    ));
}

#[test]
fn test_deleted_after_discovery_fails_closed() {
    let dir = TempDir::new().unwrap();
    let path = RecordingBuilder::new().create_in(dir.path());
    std::fs::remove_file(&path).unwrap();

    assert_eq!(
        filter(&Difficulty::ALL).evaluate(&path),
        Eligibility::Ineligible(IneligibleReason::MissingFile)
    );
}
