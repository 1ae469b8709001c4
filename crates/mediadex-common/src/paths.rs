//! Path utilities for deciding which files the catalog cares about.
//!
//! The watcher and the scanner share these rules: only video extensions are
//! considered, and hidden or OS-reserved path components are never reported.

use std::path::{Component, Path, PathBuf};

/// List of supported video file extensions.
const VIDEO_EXTENSIONS: &[&str] = &[
    "mkv", "mp4", "avi", "m4v", "ts", "m2ts", "webm", "mov", "wmv", "flv", "mpg", "mpeg",
];

/// Directory names created by operating systems or NAS firmware.
const RESERVED_DIRS: &[&str] = &[
    "$recycle.bin",
    "system volume information",
    "lost+found",
    "@eadir",
    "#recycle",
    "recycler",
];

/// Check if a path has a video file extension.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use mediadex_common::paths::is_video_file;
///
/// assert!(is_video_file(Path::new("movie.mkv")));
/// assert!(is_video_file(Path::new("/path/to/video.MP4")));
/// assert!(!is_video_file(Path::new("subtitle.srt")));
/// ```
pub fn is_video_file(path: &Path) -> bool {
    has_extension(path, VIDEO_EXTENSIONS)
}

/// Check if a path has one of the given extensions (case-insensitive).
///
/// An empty `extensions` slice falls back to the built-in video list.
pub fn has_extension<S: AsRef<str>>(path: &Path, extensions: &[S]) -> bool {
    let Some(ext) = path.extension().and_then(|ext| ext.to_str()) else {
        return false;
    };
    let ext = ext.to_lowercase();

    if extensions.is_empty() {
        return VIDEO_EXTENSIONS.contains(&ext.as_str());
    }
    extensions
        .iter()
        .any(|e| e.as_ref().trim_start_matches('.').eq_ignore_ascii_case(&ext))
}

/// Check if a single path component is hidden (dot-prefixed).
fn is_hidden_name(name: &str) -> bool {
    name.starts_with('.')
}

/// Check if a single path component is an OS-reserved directory.
fn is_reserved_name(name: &str) -> bool {
    let lower = name.to_lowercase();
    RESERVED_DIRS.contains(&lower.as_str())
}

/// Check if any component of `path` below `root` is hidden or reserved.
///
/// Components of `root` itself are not inspected, so a watched folder that
/// lives under a dot-directory still works.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use mediadex_common::paths::is_ignored_path;
///
/// let root = Path::new("/media");
/// assert!(is_ignored_path(root, Path::new("/media/.cache/a.mkv")));
/// assert!(is_ignored_path(root, Path::new("/media/lost+found/a.mkv")));
/// assert!(!is_ignored_path(root, Path::new("/media/Movies/a.mkv")));
/// ```
pub fn is_ignored_path(root: &Path, path: &Path) -> bool {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative.components().any(|c| {
        let name = c.as_os_str().to_string_lossy();
        is_hidden_name(&name) || is_reserved_name(&name)
    })
}

/// Lexically normalize a path: drop `.` components and fold `..` into the
/// preceding component. The filesystem is not consulted, so symlinks are
/// left alone.
///
/// Catalog keys are built from normalized paths, so two spellings of the
/// same file share one key.
///
/// # Examples
///
/// ```
/// use std::path::{Path, PathBuf};
/// use mediadex_common::paths::normalize;
///
/// assert_eq!(normalize(Path::new("/media/./tv/../Heat.mkv")), PathBuf::from("/media/Heat.mkv"));
/// ```
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let nothing_to_pop = matches!(
                    out.components().next_back(),
                    None | Some(Component::RootDir | Component::Prefix(_) | Component::ParentDir)
                );
                if nothing_to_pop {
                    // `..` above a relative start is kept; above `/` it is dropped.
                    if !out.has_root() {
                        out.push("..");
                    }
                } else {
                    out.pop();
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_video_extensions() {
        assert!(is_video_file(Path::new("a.mkv")));
        assert!(is_video_file(Path::new("a.M2TS")));
        assert!(!is_video_file(Path::new("a.nfo")));
        assert!(!is_video_file(Path::new("noext")));
    }

    #[test]
    fn test_custom_extensions() {
        let exts = vec!["mkv".to_string(), ".mp4".to_string()];
        assert!(has_extension(Path::new("a.MKV"), &exts));
        assert!(has_extension(Path::new("a.mp4"), &exts));
        assert!(!has_extension(Path::new("a.avi"), &exts));
    }

    #[test]
    fn test_empty_extension_list_uses_defaults() {
        let exts: Vec<String> = Vec::new();
        assert!(has_extension(Path::new("a.avi"), &exts));
        assert!(!has_extension(Path::new("a.txt"), &exts));
    }

    #[test]
    fn test_reserved_names() {
        assert!(is_reserved_name("$RECYCLE.BIN"));
        assert!(is_reserved_name("System Volume Information"));
        assert!(is_reserved_name("@eaDir"));
        assert!(!is_reserved_name("Movies"));
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(Path::new("/media/./Heat.mkv")), PathBuf::from("/media/Heat.mkv"));
        assert_eq!(
            normalize(Path::new("/media/tv/../movies/Heat.mkv")),
            PathBuf::from("/media/movies/Heat.mkv")
        );
        assert_eq!(normalize(Path::new("/../media")), PathBuf::from("/media"));
        assert_eq!(normalize(Path::new("./a/../../b")), PathBuf::from("../b"));
        assert_eq!(normalize(Path::new("/media/tv/")), PathBuf::from("/media/tv"));
    }

    #[test]
    fn test_ignored_path_only_checks_below_root() {
        let root = PathBuf::from("/home/user/.media");
        assert!(!is_ignored_path(&root, &root.join("Show/ep.mkv")));
        assert!(is_ignored_path(&root, &root.join("Show/.part/ep.mkv")));
        assert!(is_ignored_path(&root, &root.join("._ep.mkv")));
    }
}
