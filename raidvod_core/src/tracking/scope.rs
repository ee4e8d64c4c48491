//! Watched directories and the tracking scopes derived from them

use crate::error::IoError;
use crate::Result;
use std::fmt;
use std::path::{Component, Path, PathBuf};

const SCOPE_PREFIX: &str = "vods_";
const MAX_SLUG_LEN: usize = 40;

/// The directory being polled, as an absolute canonical path
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WatchedDirectory {
    path: PathBuf,
}

impl WatchedDirectory {
    /// Resolve `path` and check it is an existing directory
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let canonical = std::fs::canonicalize(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => IoError::file_not_found(path),
            _ => IoError::from_std(e).with_path(path),
        })?;

        if !canonical.is_dir() {
            return Err(IoError::not_a_directory(&canonical).into());
        }

        Ok(Self { path: canonical })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl fmt::Display for WatchedDirectory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

/// Partition of the tracking store belonging to one watched directory
///
/// The key doubles as a SQL table name, so it only ever contains
/// `[a-z0-9_]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Scope {
    key: String,
    directory: PathBuf,
}

impl Scope {
    /// Derive the scope for a directory
    ///
    /// Human readable slug of the path plus a CRC32 of the full path, so
    /// directories that slug identically still get distinct keys.
    pub fn for_directory(directory: &WatchedDirectory) -> Self {
        let path = directory.path();
        Self {
            key: scope_key(path),
            directory: path.to_path_buf(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}

fn scope_key(path: &Path) -> String {
    let joined = path
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("_");

    let mut slug: String = joined
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    slug.truncate(MAX_SLUG_LEN);

    let checksum = crc32fast::hash(path.to_string_lossy().as_bytes());
    format!("{SCOPE_PREFIX}{slug}_{checksum:08x}")
}

/// Whether `key` has the shape of a derived scope key
pub fn is_valid_scope_key(key: &str) -> bool {
    key.starts_with(SCOPE_PREFIX)
        && key.len() <= SCOPE_PREFIX.len() + MAX_SLUG_LEN + 9
        && key
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_scope_key_shape() {
        let key = scope_key(Path::new("/home/raider/Videos/WoW Logs"));
        assert!(key.starts_with("vods_home_raider_videos_wow_logs_"));
        assert_eq!(key.len(), "vods_home_raider_videos_wow_logs_".len() + 8);
        assert!(is_valid_scope_key(&key));
    }

    #[test]
    fn test_scope_key_is_deterministic() {
        let path = Path::new("/vods/raid");
        assert_eq!(scope_key(path), scope_key(path));
    }

    #[test]
    fn test_similar_paths_get_distinct_keys() {
        let a = scope_key(Path::new("/vods/Raid Night"));
        let b = scope_key(Path::new("/vods/raid_night"));
        let c = scope_key(Path::new("/vods/raid/night"));
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_ne!(b, c);
    }

    #[test]
    fn test_long_paths_are_truncated() {
        let long = format!("/{}", "segment/".repeat(20));
        let key = scope_key(Path::new(&long));
        assert!(is_valid_scope_key(&key));
        assert_eq!(key.len(), SCOPE_PREFIX.len() + MAX_SLUG_LEN + 9);
    }

    #[test]
    fn test_non_ascii_is_replaced() {
        let key = scope_key(Path::new("/vidéos/raid"));
        assert!(key.starts_with("vods_vid_os_raid_"));
    }

    #[test]
    fn test_invalid_scope_keys() {
        assert!(!is_valid_scope_key("files"));
        assert!(!is_valid_scope_key("vods_x\"; DROP TABLE watch_scopes; --"));
    }

    #[test]
    fn test_watched_directory_canonicalizes() {
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("vods");
        std::fs::create_dir(&nested).unwrap();

        let watched = WatchedDirectory::new(nested.join("..").join("vods")).unwrap();
        assert!(watched.path().is_absolute());
        assert_eq!(watched.path(), std::fs::canonicalize(&nested).unwrap());
    }

    #[test]
    fn test_watched_directory_rejects_files_and_missing_paths() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("kill.mp4");
        std::fs::write(&file, b"x").unwrap();

        assert!(WatchedDirectory::new(&file).is_err());
        assert!(WatchedDirectory::new(temp_dir.path().join("missing")).is_err());
    }

    #[test]
    fn test_same_directory_same_scope() {
        let temp_dir = TempDir::new().unwrap();
        let a = WatchedDirectory::new(temp_dir.path()).unwrap();
        let b = WatchedDirectory::new(temp_dir.path()).unwrap();
        assert_eq!(Scope::for_directory(&a), Scope::for_directory(&b));
    }
}
