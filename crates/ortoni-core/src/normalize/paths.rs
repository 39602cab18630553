//! Path helpers for file names and source locations

use std::path::{Path, PathBuf};

use crate::model::SourceLocation;

/// Reduce a spec path to its file name, accepting either separator style
pub fn normalize_file_path(file_path: &str) -> String {
    file_path
        .rsplit(['/', '\\'])
        .find(|part| !part.is_empty())
        .unwrap_or_default()
        .to_string()
}

/// Express `file` relative to `root`, walking up with `..` where needed
pub fn relative_to(root: &Path, file: &Path) -> PathBuf {
    if root.as_os_str().is_empty() || !file.is_absolute() {
        return file.to_path_buf();
    }
    pathdiff::diff_paths(file, root).unwrap_or_else(|| file.to_path_buf())
}

/// `relative/file:line:column` with forward slashes
pub fn format_location(root: &Path, location: &SourceLocation) -> String {
    let relative = relative_to(root, &location.file);
    format!(
        "{}:{}:{}",
        relative.to_string_lossy().replace('\\', "/"),
        location.line,
        location.column
    )
}
