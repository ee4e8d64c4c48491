//! One listing pass over the watched directory

use super::VideoFile;
use crate::Result;
use crate::error::IoError;
use std::path::Path;
use walkdir::WalkDir;

/// List the regular files directly inside `directory`
///
/// Symlinks count when they point at a regular file; the listed path is the
/// link itself. Sorted by modification time, oldest first, then by path.
/// Entries that vanish, dangle or cannot be inspected mid-listing are skipped
/// with a warning, as are names that are not UTF-8.
pub fn list_directory(directory: &Path) -> Result<Vec<VideoFile>> {
    if !directory.is_dir() {
        return Err(IoError::not_a_directory(directory).into());
    }

    let mut files = Vec::new();
    let walker = WalkDir::new(directory)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true);
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                log::warn!("Walk error in {}: {e}", directory.display());
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }
        if entry.path().to_str().is_none() {
            log::warn!("Skipping non UTF-8 file name {:?}", entry.path());
            continue;
        }

        let modified = entry
            .metadata()
            .map_err(std::io::Error::from)
            .and_then(|m| m.modified());
        match modified {
            Ok(modified) => files.push(VideoFile {
                path: entry.into_path(),
                modified,
            }),
            Err(e) => {
                log::warn!("Failed to read metadata for {:?}: {}", entry.path(), e);
            }
        }
    }

    files.sort_by(|a, b| {
        a.modified
            .cmp(&b.modified)
            .then_with(|| a.path.as_os_str().cmp(b.path.as_os_str()))
    });
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use filetime::{FileTime, set_file_mtime};
    use std::fs;
    use tempfile::TempDir;

    fn write_with_mtime(dir: &Path, name: &str, secs: i64) {
        let path = dir.join(name);
        fs::write(&path, b"recording").unwrap();
        set_file_mtime(&path, FileTime::from_unix_time(secs, 0)).unwrap();
    }

    fn names(files: &[VideoFile]) -> Vec<String> {
        files
            .iter()
            .map(|f| f.path.file_name().unwrap().to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_sorted_by_modification_time() {
        let dir = TempDir::new().unwrap();
        write_with_mtime(dir.path(), "c.mp4", 1_700_000_300);
        write_with_mtime(dir.path(), "a.mp4", 1_700_000_200);
        write_with_mtime(dir.path(), "b.mp4", 1_700_000_100);

        let files = list_directory(dir.path()).unwrap();
        assert_eq!(names(&files), vec!["b.mp4", "a.mp4", "c.mp4"]);
    }

    #[test]
    fn test_ties_broken_by_path() {
        let dir = TempDir::new().unwrap();
        write_with_mtime(dir.path(), "z.mp4", 1_700_000_000);
        write_with_mtime(dir.path(), "m.mp4", 1_700_000_000);
        write_with_mtime(dir.path(), "a.mp4", 1_700_000_000);

        let files = list_directory(dir.path()).unwrap();
        assert_eq!(names(&files), vec!["a.mp4", "m.mp4", "z.mp4"]);
    }

    #[test]
    fn test_subdirectories_are_not_listed_or_descended() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("old")).unwrap();
        write_with_mtime(&dir.path().join("old"), "nested.mp4", 1_700_000_000);
        write_with_mtime(dir.path(), "top.mp4", 1_700_000_000);

        let files = list_directory(dir.path()).unwrap();
        assert_eq!(names(&files), vec!["top.mp4"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_recordings_are_listed() {
        use std::os::unix::fs::symlink;

        let dir = TempDir::new().unwrap();
        let elsewhere = TempDir::new().unwrap();
        write_with_mtime(elsewhere.path(), "target.mp4", 1_700_000_000);
        symlink(elsewhere.path().join("target.mp4"), dir.path().join("link.mp4")).unwrap();
        symlink(dir.path().join("gone.mp4"), dir.path().join("dangling.mp4")).unwrap();
        symlink(elsewhere.path(), dir.path().join("linked_dir")).unwrap();

        let files = list_directory(dir.path()).unwrap();
        assert_eq!(names(&files), vec!["link.mp4"]);
        assert_eq!(files[0].path, dir.path().join("link.mp4"));
        assert_eq!(
            files[0].modified,
            std::time::UNIX_EPOCH + std::time::Duration::from_secs(1_700_000_000)
        );
    }

    // Linux file systems accept arbitrary bytes in names
    #[cfg(target_os = "linux")]
    #[test]
    fn test_non_utf8_names_are_skipped() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dir = TempDir::new().unwrap();
        write_with_mtime(dir.path(), "kill.mp4", 1_700_000_000);
        fs::write(dir.path().join(OsStr::from_bytes(b"kill\xff.mp4")), b"x").unwrap();

        let files = list_directory(dir.path()).unwrap();
        assert_eq!(names(&files), vec!["kill.mp4"]);
    }

    #[test]
    fn test_missing_directory_is_an_error() {
        let dir = TempDir::new().unwrap();
        assert!(list_directory(&dir.path().join("gone")).is_err());
    }
}
