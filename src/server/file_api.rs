//! File API for workspace file operations
//!
//! Read/write/create/remove primitives on absolute paths. Callers resolve the
//! path against the user's workspace; nothing here consults global state.

use serde::Deserialize;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::server::classify::{self, Classification, PublicImages};

/// Message shown to the user when a binary file is opened
pub const BINARY_FILE_MESSAGE: &str = "Can't open a binary file :(";

/// File API error types
#[derive(Error, Debug)]
pub enum FileApiError {
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),
    #[error("Target already exists: {}", .0.display())]
    AlreadyExists(PathBuf),
    #[error("Not a directory: {}", .0.display())]
    NotADirectory(PathBuf),
    /// 图片路径中找不到公开前缀，无法生成访问地址
    #[error("Image is not under the public prefix: {}", .0.display())]
    ImageNotServable(PathBuf),
    #[error("Unsupported entry kind [{0}]")]
    UnsupportedKind(String),
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl FileApiError {
    /// Attach the offending path to an I/O error, keeping not-found and
    /// already-exists distinguishable for callers.
    pub fn from_io(path: &Path, source: io::Error) -> Self {
        match source.kind() {
            io::ErrorKind::NotFound => FileApiError::FileNotFound(path.to_path_buf()),
            io::ErrorKind::AlreadyExists => FileApiError::AlreadyExists(path.to_path_buf()),
            _ => FileApiError::Io {
                path: path.to_path_buf(),
                source,
            },
        }
    }
}

/// Kind of entry to create
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum EntryKind {
    File,
    Directory,
}

impl EntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::File => "file",
            EntryKind::Directory => "directory",
        }
    }
}

impl FromStr for EntryKind {
    type Err = FileApiError;

    /// Accepts the long names and the legacy "f"/"d" short forms.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "file" | "f" => Ok(EntryKind::File),
            "directory" | "d" => Ok(EntryKind::Directory),
            other => Err(FileApiError::UnsupportedKind(other.to_string())),
        }
    }
}

impl TryFrom<String> for EntryKind {
    type Error = FileApiError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Outcome of reading a file for the editor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// Opened by the browser from `servable_path`, content never loaded
    Image { servable_path: String, mime: String },
    /// Refused, content withheld
    Binary,
    Text { content: String, mode: &'static str },
}

fn image_outcome(path: &Path, images: &PublicImages) -> Result<ReadOutcome, FileApiError> {
    let servable_path = images
        .servable_path(path)
        .ok_or_else(|| FileApiError::ImageNotServable(path.to_path_buf()))?;
    Ok(ReadOutcome::Image {
        servable_path,
        mime: classify::image_mime(path),
    })
}

/// Read a file and classify it for the editor.
///
/// Image paths are answered from the extension alone. Other files are loaded
/// in full; a single zero byte turns the result into a binary refusal.
pub fn read_file(path: &Path, images: &PublicImages) -> Result<ReadOutcome, FileApiError> {
    debug!("Reading file: {:?}", path);

    if classify::is_image_path(path) {
        return image_outcome(path, images);
    }

    let content = fs::read(path).map_err(|e| FileApiError::from_io(path, e))?;

    match classify::classify(path, &content) {
        Classification::Image => image_outcome(path, images),
        Classification::Binary => {
            debug!("Refusing binary file: {:?}", path);
            Ok(ReadOutcome::Binary)
        }
        Classification::Text { mode } => Ok(ReadOutcome::Text {
            content: String::from_utf8_lossy(&content).into_owned(),
            mode,
        }),
    }
}

fn write_contents(path: &Path, content: &str) -> Result<u64, FileApiError> {
    let mut file = fs::File::create(path).map_err(|e| FileApiError::from_io(path, e))?;
    file.write_all(content.as_bytes())
        .map_err(|e| FileApiError::from_io(path, e))?;
    // close 时的错误在 drop 中会被吞掉，这里显式刷盘
    file.sync_all().map_err(|e| FileApiError::from_io(path, e))?;
    Ok(content.len() as u64)
}

/// Overwrite a file with `content`, creating it if absent.
///
/// Parent directories are not created. A failed write is not rolled back.
pub fn write_file(path: &Path, content: &str) -> Result<u64, FileApiError> {
    debug!("Writing file: {:?}", path);

    write_contents(path, content).map_err(|e| {
        error!("Saving [{}] failed: {}", path.display(), e);
        e
    })
}

/// Create a file or a single directory level.
///
/// File creation is exclusive: an existing entry at `path` is left untouched
/// and reported as [`FileApiError::AlreadyExists`].
pub fn create_entry(path: &Path, kind: EntryKind) -> Result<(), FileApiError> {
    let result = match kind {
        EntryKind::File => OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .map(|_| ()),
        EntryKind::Directory => fs::create_dir(path),
    };

    match result {
        Ok(()) => {
            info!("Created {} [{}]", kind.as_str(), path.display());
            Ok(())
        }
        Err(e) => {
            info!("Creating {} [{}] failed: {}", kind.as_str(), path.display(), e);
            Err(FileApiError::from_io(path, e))
        }
    }
}

/// Remove a file, symlink or whole directory subtree.
///
/// A path that does not exist counts as removed. A failure partway through a
/// directory leaves whatever was already deleted deleted.
pub fn remove_entry(path: &Path) -> Result<(), FileApiError> {
    let metadata = match fs::symlink_metadata(path) {
        Ok(m) => m,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!("Remove target already absent: {:?}", path);
            return Ok(());
        }
        Err(e) => {
            error!("Removes [{}] failed: [{}]", path.display(), e);
            return Err(FileApiError::from_io(path, e));
        }
    };

    let result = if metadata.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };

    match result {
        Ok(()) => {
            info!("Removed [{}]", path.display());
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            info!("Removed [{}] (concurrently)", path.display());
            Ok(())
        }
        Err(e) => {
            error!("Removes [{}] failed: [{}]", path.display(), e);
            Err(FileApiError::from_io(path, e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn images_under(temp: &TempDir) -> PublicImages {
        PublicImages {
            user_workspaces: temp.path().join("data/user_workspaces"),
            prefix: "/data/user_workspaces".to_string(),
        }
    }

    #[test]
    fn test_write_then_read_text() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("main.go");

        let content = "package main\n\nfunc main() {}\n";
        let size = write_file(&path, content).unwrap();
        assert_eq!(size, content.len() as u64);

        let outcome = read_file(&path, &images_under(&temp)).unwrap();
        assert_eq!(
            outcome,
            ReadOutcome::Text {
                content: content.to_string(),
                mode: "go",
            }
        );
    }

    #[test]
    fn test_write_truncates_existing() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("notes.md");

        write_file(&path, "a much longer first version").unwrap();
        write_file(&path, "short").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "short");
    }

    #[test]
    fn test_write_missing_parent_fails() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("missing/dir/a.txt");

        let err = write_file(&path, "x").unwrap_err();
        assert!(matches!(err, FileApiError::FileNotFound(_)));
        assert!(!temp.path().join("missing").exists());
    }

    #[test]
    fn test_read_binary_is_refused() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("blob.dat");
        fs::write(&path, [b'a', 0u8, b'b']).unwrap();

        assert_eq!(read_file(&path, &images_under(&temp)).unwrap(), ReadOutcome::Binary);
    }

    #[test]
    fn test_read_image_skips_content() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("data/user_workspaces/alice/src/Logo.PNG");

        // file does not exist: content must never be loaded
        let outcome = read_file(&path, &images_under(&temp)).unwrap();
        assert_eq!(
            outcome,
            ReadOutcome::Image {
                servable_path: "/data/user_workspaces/alice/src/Logo.PNG".to_string(),
                mime: "image/png".to_string(),
            }
        );
    }

    #[test]
    fn test_read_image_under_custom_workspaces_dir() {
        let temp = TempDir::new().unwrap();
        let images = PublicImages {
            user_workspaces: temp.path().join("ws"),
            prefix: "/data/user_workspaces".to_string(),
        };
        let path = temp.path().join("ws/alice/src/img/a.gif");

        match read_file(&path, &images).unwrap() {
            ReadOutcome::Image { servable_path, mime } => {
                assert_eq!(servable_path, "/data/user_workspaces/alice/src/img/a.gif");
                assert_eq!(mime, "image/gif");
            }
            other => panic!("expected image, got {:?}", other),
        }
    }

    #[test]
    fn test_read_image_outside_prefix() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("a.jpg");

        let err = read_file(&path, &images_under(&temp)).unwrap_err();
        assert!(matches!(err, FileApiError::ImageNotServable(_)));
    }

    #[test]
    fn test_read_missing_file() {
        let temp = TempDir::new().unwrap();
        let err = read_file(&temp.path().join("nope.txt"), &images_under(&temp)).unwrap_err();
        assert!(matches!(err, FileApiError::FileNotFound(_)));
    }

    #[test]
    fn test_read_invalid_utf8_without_nul_is_text() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("latin1.txt");
        fs::write(&path, [b'c', b'a', b'f', 0xE9]).unwrap();

        match read_file(&path, &images_under(&temp)).unwrap() {
            ReadOutcome::Text { content, mode } => {
                assert_eq!(mode, "text");
                assert!(content.starts_with("caf"));
            }
            other => panic!("expected text, got {:?}", other),
        }
    }

    #[test]
    fn test_create_file_is_exclusive() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("a.txt");

        create_entry(&path, EntryKind::File).unwrap();
        assert!(path.is_file());

        fs::write(&path, "keep me").unwrap();
        let err = create_entry(&path, EntryKind::File).unwrap_err();
        assert!(matches!(err, FileApiError::AlreadyExists(_)));
        assert_eq!(fs::read_to_string(&path).unwrap(), "keep me");
    }

    #[test]
    fn test_create_directory_reports_failure() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("d1");

        create_entry(&dir, EntryKind::Directory).unwrap();
        assert!(dir.is_dir());

        assert!(matches!(
            create_entry(&dir, EntryKind::Directory),
            Err(FileApiError::AlreadyExists(_))
        ));
        // only a single level is created
        assert!(matches!(
            create_entry(&temp.path().join("x/y"), EntryKind::Directory),
            Err(FileApiError::FileNotFound(_))
        ));
    }

    #[test]
    fn test_remove_directory_tree() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("pkg");
        fs::create_dir_all(dir.join("nested/deeper")).unwrap();
        fs::write(dir.join("nested/deeper/a.go"), "package a").unwrap();
        fs::write(dir.join("b.go"), "package pkg").unwrap();

        remove_entry(&dir).unwrap();
        assert!(!dir.exists());
    }

    #[test]
    fn test_remove_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("gone.txt");
        fs::write(&path, "x").unwrap();

        remove_entry(&path).unwrap();
        remove_entry(&path).unwrap();
        assert!(!path.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_remove_symlink_keeps_target() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("target");
        fs::create_dir(&target).unwrap();
        fs::write(target.join("keep.txt"), "x").unwrap();
        let link = temp.path().join("link");
        std::os::unix::fs::symlink(&target, &link).unwrap();

        remove_entry(&link).unwrap();
        assert!(!link.exists());
        assert!(target.join("keep.txt").exists());
    }

    #[test]
    fn test_entry_kind_parse() {
        assert_eq!("file".parse::<EntryKind>().unwrap(), EntryKind::File);
        assert_eq!("f".parse::<EntryKind>().unwrap(), EntryKind::File);
        assert_eq!("directory".parse::<EntryKind>().unwrap(), EntryKind::Directory);
        assert_eq!("d".parse::<EntryKind>().unwrap(), EntryKind::Directory);
        assert!(matches!(
            "symlink".parse::<EntryKind>(),
            Err(FileApiError::UnsupportedKind(k)) if k == "symlink"
        ));
    }

    #[test]
    fn test_create_write_read_remove_scenario() {
        let temp = TempDir::new().unwrap();
        let d1 = temp.path().join("d1");
        let file = d1.join("f.txt");

        create_entry(&d1, EntryKind::Directory).unwrap();
        create_entry(&file, EntryKind::File).unwrap();
        write_file(&file, "hello").unwrap();
        assert_eq!(
            read_file(&file, &images_under(&temp)).unwrap(),
            ReadOutcome::Text {
                content: "hello".to_string(),
                mode: "text",
            }
        );
        remove_entry(&d1).unwrap();
        assert!(!d1.exists());
    }
}
