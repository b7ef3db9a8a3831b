//! Content classification for the editor
//!
//! Decides from the file extension and raw bytes whether a file opens as an
//! image, is refused as binary, or is handed to the editor as text with a
//! syntax mode.

use std::path::{Path, PathBuf};

/// Extensions opened in a browser tab instead of the editor
pub const IMAGE_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".bmp", ".gif", ".png", ".svg", ".ico"];

/// Editor mode used when no table entry matches
pub const DEFAULT_MODE: &str = "text";

/// Result of classifying a file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Image,
    Binary,
    Text { mode: &'static str },
}

/// Extension of the file name including the leading dot, or "" if none.
///
/// Only the last path component is inspected, so dots in directory names
/// are ignored.
pub fn extension(path: &Path) -> &str {
    let name = match path.file_name().and_then(|n| n.to_str()) {
        Some(n) => n,
        None => return "",
    };
    match name.rfind('.') {
        Some(idx) => &name[idx..],
        None => "",
    }
}

/// 图片按扩展名判断，大小写不敏感
pub fn is_image(ext: &str) -> bool {
    let ext = ext.to_ascii_lowercase();
    IMAGE_EXTENSIONS.contains(&ext.as_str())
}

pub fn is_image_path(path: &Path) -> bool {
    is_image(extension(path))
}

/// Any zero byte marks the content as binary
pub fn is_binary(content: &[u8]) -> bool {
    content.contains(&0)
}

/// Map an extension to the front-end editor's syntax mode.
///
/// The lookup is case-sensitive; unknown extensions fall back to "text".
pub fn editor_mode(ext: &str) -> &'static str {
    match ext {
        ".go" => "go",
        ".html" => "htmlmixed",
        ".md" => "markdown",
        ".js" | ".json" => "javascript",
        ".css" => "css",
        ".xml" => "xml",
        ".sh" => "shell",
        ".sql" => "sql",
        _ => DEFAULT_MODE,
    }
}

/// Classify a file from its path and full content.
///
/// Images are decided by extension alone, callers can skip loading the
/// content for them via [`is_image_path`].
pub fn classify(path: &Path, content: &[u8]) -> Classification {
    let ext = extension(path);
    if is_image(ext) {
        return Classification::Image;
    }
    if is_binary(content) {
        return Classification::Binary;
    }
    Classification::Text {
        mode: editor_mode(ext),
    }
}

/// Derive the web-servable path of a workspace file.
///
/// Files under `user_workspaces` are published as `public_prefix` followed
/// by their relative path. Otherwise backslashes are normalised to '/' and
/// the suffix starting at the first occurrence of `public_prefix` is used.
/// `None` if neither applies.
pub fn servable_path(
    path: &Path,
    user_workspaces: &Path,
    public_prefix: &str,
) -> Option<String> {
    if public_prefix.is_empty() {
        return None;
    }
    if let Ok(rel) = path.strip_prefix(user_workspaces) {
        let rel: Vec<String> = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        if !rel.is_empty() {
            return Some(format!(
                "{}/{}",
                public_prefix.trim_end_matches('/'),
                rel.join("/")
            ));
        }
    }
    let normalized = path.to_string_lossy().replace('\\', "/");
    normalized
        .find(public_prefix)
        .map(|idx| normalized[idx..].to_string())
}

/// Where workspace images are published for the browser
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicImages {
    pub user_workspaces: PathBuf,
    pub prefix: String,
}

impl PublicImages {
    pub fn servable_path(&self, path: &Path) -> Option<String> {
        servable_path(path, &self.user_workspaces, &self.prefix)
    }
}

/// MIME type for the image preview tab
pub fn image_mime(path: &Path) -> String {
    mime_guess::from_path(path)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension() {
        assert_eq!(extension(Path::new("/ws/main.go")), ".go");
        assert_eq!(extension(Path::new("/ws/archive.tar.gz")), ".gz");
        assert_eq!(extension(Path::new("/ws/Makefile")), "");
        assert_eq!(extension(Path::new("/ws/v1.2/Makefile")), "");
        assert_eq!(extension(Path::new("/ws/.gitignore")), ".gitignore");
    }

    #[test]
    fn test_editor_modes() {
        assert_eq!(editor_mode(".go"), "go");
        assert_eq!(editor_mode(".html"), "htmlmixed");
        assert_eq!(editor_mode(".md"), "markdown");
        assert_eq!(editor_mode(".js"), "javascript");
        assert_eq!(editor_mode(".json"), "javascript");
        assert_eq!(editor_mode(".css"), "css");
        assert_eq!(editor_mode(".xml"), "xml");
        assert_eq!(editor_mode(".sh"), "shell");
        assert_eq!(editor_mode(".sql"), "sql");
        assert_eq!(editor_mode(".xyz"), "text");
        assert_eq!(editor_mode(""), "text");
        // mode table is case-sensitive
        assert_eq!(editor_mode(".GO"), "text");
    }

    #[test]
    fn test_image_extensions_ignore_case() {
        for name in ["a.png", "a.PNG", "a.Jpeg", "a.svg", "a.ICO", "a.gif", "a.bmp", "a.jpg"] {
            assert!(is_image_path(Path::new(name)), "{} should be an image", name);
        }
        assert!(!is_image_path(Path::new("a.webp")));
        assert!(!is_image_path(Path::new("png")));
    }

    #[test]
    fn test_classify_order() {
        // image wins even if content has zero bytes
        assert_eq!(
            classify(Path::new("logo.png"), &[0x89, 0x00, 0x01]),
            Classification::Image
        );
        assert_eq!(
            classify(Path::new("app.bin"), b"ab\0cd"),
            Classification::Binary
        );
        assert_eq!(
            classify(Path::new("query.sql"), b"select 1;"),
            Classification::Text { mode: "sql" }
        );
        assert_eq!(
            classify(Path::new("empty.go"), b""),
            Classification::Text { mode: "go" }
        );
    }

    #[test]
    fn test_servable_path() {
        let uw = Path::new("/data/user_workspaces");
        let path = Path::new("/srv/data/user_workspaces/alice/src/img/a.png");
        assert_eq!(
            servable_path(path, uw, "/data/user_workspaces").as_deref(),
            Some("/data/user_workspaces/alice/src/img/a.png")
        );
        assert_eq!(servable_path(path, uw, "/public"), None);
        assert_eq!(servable_path(path, uw, ""), None);
    }

    #[test]
    fn test_servable_path_relative_to_workspaces_dir() {
        let uw = Path::new("/tmp/xyz/ws");
        let path = Path::new("/tmp/xyz/ws/alice/src/img/a.png");
        assert_eq!(
            servable_path(path, uw, "/data/user_workspaces").as_deref(),
            Some("/data/user_workspaces/alice/src/img/a.png")
        );
        assert_eq!(
            servable_path(path, uw, "/files/").as_deref(),
            Some("/files/alice/src/img/a.png")
        );
    }

    #[test]
    fn test_servable_path_normalizes_backslashes() {
        let uw = Path::new("/data/user_workspaces");
        let path = Path::new(r"C:\wide\data\user_workspaces\bob\src\a.gif");
        assert_eq!(
            servable_path(path, uw, "/data/user_workspaces").as_deref(),
            Some("/data/user_workspaces/bob/src/a.gif")
        );
    }

    #[test]
    fn test_image_mime() {
        assert_eq!(image_mime(Path::new("a.png")), "image/png");
        assert_eq!(image_mime(Path::new("a.svg")), "image/svg+xml");
    }
}
