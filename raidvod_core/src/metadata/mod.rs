//! Filename metadata extraction
//!
//! Recording tools name files like
//! `2023-10-05 12-34-56 - Character - Boss [M] (Kill).mp4`. Everything the
//! upload needs (title, capture time, difficulty, description and tags) is
//! derived from that name and the static video template, nothing else, so the
//! same name always yields the same metadata.

mod difficulty;
pub mod template;

pub use difficulty::Difficulty;
pub use template::{DescriptionFields, render_description, render_tags, validate_description};

use crate::error::MetadataError;
use chrono::NaiveTime;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

static TIME_CODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\d{2}-\d{2}-\d{2}\b").expect("valid time code pattern"));

static DATE_TIME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{4}-\d{2}-\d{2}) (\d{2}-\d{2}-\d{2})").expect("valid date time pattern")
});

static DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\d{4}-\d{2}-\d{2}\b").expect("valid date pattern"));

static REPEATED_SPACES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r" {2,}").expect("valid whitespace pattern"));

const KILL_MARKER: &str = " (Kill)";

/// Description and tag templates applied to every upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoTemplate {
    pub description: String,
    pub tags: Vec<String>,
}

impl Default for VideoTemplate {
    fn default() -> Self {
        Self {
            description: "Raid fight on {killed_on} at {killed_at} - {difficulty}".to_string(),
            tags: vec![
                "World of Warcraft".to_string(),
                "Raid".to_string(),
                "{difficulty}".to_string(),
            ],
        }
    }
}

/// Upload metadata derived from a recording filename
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VideoMetadata {
    pub title: String,
    /// Capture date, `YYYY-MM-DD`
    pub killed_on: Option<String>,
    /// Capture time, `hh:mm AM/PM`
    pub killed_at: Option<String>,
    pub difficulty: Difficulty,
    pub description: String,
    pub tags: Vec<String>,
}

/// Turns filenames into [`VideoMetadata`] using a fixed template
#[derive(Debug, Clone)]
pub struct MetadataExtractor {
    template: VideoTemplate,
}

impl MetadataExtractor {
    pub fn new(template: VideoTemplate) -> Self {
        Self { template }
    }

    pub fn template(&self) -> &VideoTemplate {
        &self.template
    }

    /// Extract metadata from a path's file name
    pub fn extract_path(&self, path: &Path) -> Result<VideoMetadata, MetadataError> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.extract(&file_name)
    }

    /// Extract metadata from a file name (with extension)
    pub fn extract(&self, file_name: &str) -> Result<VideoMetadata, MetadataError> {
        let stem = file_stem(file_name);
        let difficulty = Difficulty::from_file_name(file_name)?;
        let killed_on = captured_on(stem);
        let killed_at = captured_at(stem);

        let description = render_description(
            &self.template.description,
            &DescriptionFields {
                difficulty,
                killed_at: killed_at.as_deref(),
                killed_on: killed_on.as_deref(),
            },
        )?;
        let tags = render_tags(&self.template.tags, difficulty);

        Ok(VideoMetadata {
            title: title(stem),
            killed_on,
            killed_at,
            difficulty,
            description,
            tags,
        })
    }
}

/// File name without its final extension
///
/// Dotfiles such as `.mp4` keep their full name as the stem.
pub fn file_stem(file_name: &str) -> &str {
    match file_name.rfind('.') {
        Some(0) | None => file_name,
        Some(index) => &file_name[..index],
    }
}

/// Video title: the stem without its time code and kill marker
pub fn title(stem: &str) -> String {
    let without_time = TIME_CODE.replacen(stem, 1, "");
    let without_marker = without_time.replace(KILL_MARKER, "");
    REPEATED_SPACES
        .replace_all(&without_marker, " ")
        .trim()
        .to_string()
}

/// Capture date, preferring the date that directly precedes the time code
pub fn captured_on(stem: &str) -> Option<String> {
    DATE_TIME
        .captures(stem)
        .and_then(|caps| caps.get(1))
        .or_else(|| DATE.find(stem))
        .map(|m| m.as_str().to_string())
}

/// Capture time as a 12-hour clock string, e.g. `12:34 PM`
pub fn captured_at(stem: &str) -> Option<String> {
    let time_code = TIME_CODE.find(stem)?.as_str();
    match NaiveTime::parse_from_str(time_code, "%H-%M-%S") {
        Ok(time) => Some(time.format("%I:%M %p").to_string()),
        Err(e) => {
            log::debug!("Ignoring invalid time code '{time_code}': {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KILL: &str = "2023-10-05 12-34-56 - Character - Boss [M] (Kill).mp4";

    fn extractor() -> MetadataExtractor {
        MetadataExtractor::new(VideoTemplate {
            description: "Raid fight on {killed_on} at {killed_at} - {difficulty}".to_string(),
            tags: vec!["WoW".to_string(), "Raid".to_string(), "{difficulty}".to_string()],
        })
    }

    #[test]
    fn test_extract_full_kill_recording() {
        let metadata = extractor().extract(KILL).unwrap();

        assert_eq!(metadata.title, "2023-10-05 - Character - Boss [M]");
        assert_eq!(metadata.killed_on.as_deref(), Some("2023-10-05"));
        assert_eq!(metadata.killed_at.as_deref(), Some("12:34 PM"));
        assert_eq!(metadata.difficulty, Difficulty::Mythic);
        assert_eq!(
            metadata.description,
            "Raid fight on 2023-10-05 at 12:34 PM - Mythic"
        );
        assert_eq!(metadata.tags, vec!["WoW", "Raid", "Mythic"]);
    }

    #[test]
    fn test_file_stem() {
        assert_eq!(file_stem("boss.kill.mp4"), "boss.kill");
        assert_eq!(file_stem("no_extension"), "no_extension");
        assert_eq!(file_stem(".mp4"), ".mp4");
    }

    #[test]
    fn test_title_without_time_code() {
        assert_eq!(title("Character - Boss [HC]"), "Character - Boss [HC]");
        assert_eq!(title("  Boss   [N]  (Kill)"), "Boss [N]");
    }

    #[test]
    fn test_title_removes_only_first_time_code() {
        assert_eq!(title("01-02-03 Boss 04-05-06"), "Boss 04-05-06");
    }

    #[test]
    fn test_captured_at_converts_to_twelve_hour_clock() {
        assert_eq!(captured_at("2023-10-05 00-05-00 Boss").as_deref(), Some("12:05 AM"));
        assert_eq!(captured_at("2023-10-05 23-59-59 Boss").as_deref(), Some("11:59 PM"));
        assert_eq!(captured_at("2023-10-05 Boss"), None);
    }

    #[test]
    fn test_captured_at_rejects_impossible_times() {
        assert_eq!(captured_at("2023-10-05 25-61-00 Boss"), None);
    }

    #[test]
    fn test_captured_on_is_independent_of_time() {
        assert_eq!(captured_on("2023-10-05 - Boss").as_deref(), Some("2023-10-05"));
        assert_eq!(captured_on("Boss [M]"), None);
    }

    #[test]
    fn test_extract_without_difficulty_fails() {
        let err = extractor()
            .extract("2023-10-05 12-34-56 [X] Raid Kill.mp4")
            .unwrap_err();
        assert!(matches!(err, MetadataError::DifficultyNotFound { .. }));
    }

    #[test]
    fn test_unsupported_placeholder_only_fails_descriptions() {
        let extractor = MetadataExtractor::new(VideoTemplate {
            description: "Raid fight on {unsupported}".to_string(),
            tags: vec!["WoW".to_string()],
        });
        let err = extractor
            .extract("2023-10-05 12-34-56 [M] Raid Kill.mp4")
            .unwrap_err();
        assert_eq!(err, MetadataError::unsupported_placeholder("unsupported"));

        let extractor = MetadataExtractor::new(VideoTemplate {
            description: "{difficulty}".to_string(),
            tags: vec!["WoW".to_string(), "Raid".to_string(), "{unsupported}".to_string()],
        });
        let metadata = extractor
            .extract("2023-10-05 12-34-56 [M] Raid Kill.mp4")
            .unwrap();
        assert_eq!(metadata.tags, vec!["WoW", "Raid", "{unsupported}"]);
    }

    #[test]
    fn test_extract_path_uses_file_name_only() {
        let metadata = extractor()
            .extract_path(Path::new("/vods/2023-10-05 [N]/2023-10-06 Boss [HC].mkv"))
            .unwrap();
        assert_eq!(metadata.difficulty, Difficulty::Heroic);
        assert_eq!(metadata.killed_on.as_deref(), Some("2023-10-06"));
    }
}
