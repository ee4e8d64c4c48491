//! Raid difficulty tiers encoded as bracket markers in recording filenames

use crate::error::MetadataError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Raid difficulty tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Difficulty {
    Normal,
    Heroic,
    Mythic,
}

/// Markers in precedence order, Mythic first
const MARKERS: &[(&str, Difficulty)] = &[
    ("[M]", Difficulty::Mythic),
    ("[HC]", Difficulty::Heroic),
    ("[N]", Difficulty::Normal),
];

impl Difficulty {
    /// All tiers, lowest first
    pub const ALL: [Difficulty; 3] = [Difficulty::Normal, Difficulty::Heroic, Difficulty::Mythic];

    /// Read the tier from a file name (with extension)
    ///
    /// A name without any marker is malformed input, not an implicit Normal.
    pub fn from_file_name(file_name: &str) -> Result<Self, MetadataError> {
        MARKERS
            .iter()
            .find(|(marker, _)| file_name.contains(marker))
            .map(|(_, difficulty)| *difficulty)
            .ok_or_else(|| MetadataError::difficulty_not_found(file_name))
    }

    /// The bracket marker used in filenames
    pub fn marker(&self) -> &'static str {
        match self {
            Self::Normal => "[N]",
            Self::Heroic => "[HC]",
            Self::Mythic => "[M]",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "Normal",
            Self::Heroic => "Heroic",
            Self::Mythic => "Mythic",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|d| d.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown difficulty '{s}' (expected Normal, Heroic or Mythic)"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_markers_map_to_tiers() {
        assert_eq!(
            Difficulty::from_file_name("Boss [M] (Kill).mp4").unwrap(),
            Difficulty::Mythic
        );
        assert_eq!(
            Difficulty::from_file_name("Boss [HC].mp4").unwrap(),
            Difficulty::Heroic
        );
        assert_eq!(
            Difficulty::from_file_name("Boss [N].mkv").unwrap(),
            Difficulty::Normal
        );
    }

    #[test]
    fn test_mythic_takes_precedence() {
        assert_eq!(
            Difficulty::from_file_name("Boss [N] [HC] [M].mp4").unwrap(),
            Difficulty::Mythic
        );
        assert_eq!(
            Difficulty::from_file_name("Boss [N] [HC].mp4").unwrap(),
            Difficulty::Heroic
        );
    }

    #[test]
    fn test_missing_marker_is_an_error() {
        let err = Difficulty::from_file_name("2023-10-05 12-34-56 [X] Raid Kill.mp4").unwrap_err();
        assert!(matches!(err, MetadataError::DifficultyNotFound { .. }));

        // markers are case sensitive
        assert!(Difficulty::from_file_name("Boss [m].mp4").is_err());
    }

    #[test]
    fn test_parse_from_config_string() {
        assert_eq!("Mythic".parse::<Difficulty>().unwrap(), Difficulty::Mythic);
        assert_eq!("heroic".parse::<Difficulty>().unwrap(), Difficulty::Heroic);
        assert!("LFR".parse::<Difficulty>().is_err());
    }

    #[test]
    fn test_display_matches_marker_roundtrip() {
        for difficulty in Difficulty::ALL {
            let name = format!("Boss {}.mp4", difficulty.marker());
            assert_eq!(Difficulty::from_file_name(&name).unwrap(), difficulty);
        }
    }
}
