//! Builder for recording files named like raid kill VODs

use filetime::{FileTime, set_file_mtime};
use raidvod_core::Difficulty;
use std::path::{Path, PathBuf};

/// Builds names like `2023-10-05 12-34-56 - Character - Boss [M] (Kill).mp4`
/// and optionally writes the file with a fixed modification time.
#[derive(Debug, Clone)]
pub struct RecordingBuilder {
    date: Option<String>,
    time: Option<String>,
    character: String,
    boss: String,
    marker: Option<String>,
    kill: bool,
    extension: String,
    modified: Option<i64>,
    contents: Vec<u8>,
}

impl Default for RecordingBuilder {
    fn default() -> Self {
        Self {
            date: Some("2023-10-05".to_string()),
            time: Some("12-34-56".to_string()),
            character: "Character".to_string(),
            boss: "Boss".to_string(),
            marker: Some(Difficulty::Mythic.marker().to_string()),
            kill: true,
            extension: ".mp4".to_string(),
            modified: None,
            contents: b"recording".to_vec(),
        }
    }
}

impl RecordingBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_date(mut self, date: &str) -> Self {
        self.date = Some(date.to_string());
        self
    }

    pub fn without_date(mut self) -> Self {
        self.date = None;
        self
    }

    /// Time code in `HH-MM-SS` form
    pub fn with_time(mut self, time: &str) -> Self {
        self.time = Some(time.to_string());
        self
    }

    pub fn without_time(mut self) -> Self {
        self.time = None;
        self
    }

    pub fn with_character(mut self, character: &str) -> Self {
        self.character = character.to_string();
        self
    }

    pub fn with_boss(mut self, boss: &str) -> Self {
        self.boss = boss.to_string();
        self
    }

    pub fn with_difficulty(mut self, difficulty: Difficulty) -> Self {
        self.marker = Some(difficulty.marker().to_string());
        self
    }

    /// Use an arbitrary bracket marker, e.g. `[X]`
    pub fn with_marker(mut self, marker: &str) -> Self {
        self.marker = Some(marker.to_string());
        self
    }

    pub fn without_difficulty(mut self) -> Self {
        self.marker = None;
        self
    }

    /// Whether the ` (Kill)` suffix is present
    pub fn kill(mut self, kill: bool) -> Self {
        self.kill = kill;
        self
    }

    /// Extension including the dot
    pub fn with_extension(mut self, extension: &str) -> Self {
        self.extension = extension.to_string();
        self
    }

    /// Modification time in seconds since the Unix epoch
    pub fn modified_at(mut self, unix_secs: i64) -> Self {
        self.modified = Some(unix_secs);
        self
    }

    pub fn with_contents(mut self, contents: &[u8]) -> Self {
        self.contents = contents.to_vec();
        self
    }

    pub fn file_name(&self) -> String {
        let timestamp: Vec<&str> = [self.date.as_deref(), self.time.as_deref()]
            .into_iter()
            .flatten()
            .collect();

        let mut name = String::new();
        if !timestamp.is_empty() {
            name.push_str(&timestamp.join(" "));
            name.push_str(" - ");
        }
        name.push_str(&self.character);
        name.push_str(" - ");
        name.push_str(&self.boss);
        if let Some(marker) = &self.marker {
            name.push(' ');
            name.push_str(marker);
        }
        if self.kill {
            name.push_str(" (Kill)");
        }
        name.push_str(&self.extension);
        name
    }

    /// Write the recording into `dir` and return its path
    pub fn create_in(&self, dir: &Path) -> PathBuf {
        let path = dir.join(self.file_name());
        std::fs::write(&path, &self.contents).unwrap();
        if let Some(secs) = self.modified {
            set_file_mtime(&path, FileTime::from_unix_time(secs, 0)).unwrap();
        }
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_file_name() {
        assert_eq!(
            RecordingBuilder::new().file_name(),
            "2023-10-05 12-34-56 - Character - Boss [M] (Kill).mp4"
        );
    }

    #[test]
    fn test_custom_file_name() {
        let name = RecordingBuilder::new()
            .without_time()
            .with_difficulty(Difficulty::Heroic)
            .kill(false)
            .with_extension(".mkv")
            .file_name();
        assert_eq!(name, "2023-10-05 - Character - Boss [HC].mkv");
    }
}
