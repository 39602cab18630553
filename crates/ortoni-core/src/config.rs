//! Reporter configuration for ortoni
//!
//! Configuration is read from `.toml` or `.json` files; the format is chosen
//! by file extension.

pub mod types;

use std::fs;
use std::path::{Path, PathBuf};

use crate::bail_invalid;
use crate::error::{OrtoniError, Result};

pub use types::{
    MergeMode, OpenMode, ReporterConfig, ShardDescriptor, Theme, DEFAULT_FILENAME,
    DEFAULT_FOLDER_PATH, DEFAULT_TITLE,
};

/// File name of the history database inside the report folder
pub const HISTORY_DB_FILENAME: &str = "ortoni-data-history.sqlite";

/// Attachment folder, relative to the report folder
pub const ATTACHMENTS_DIR: &str = "ortoni-data/attachments";

impl ReporterConfig {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| OrtoniError::io_operation("read config", path.display(), e))?;

        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Ok(toml::from_str(&content)?),
            Some("json") => Ok(serde_json::from_str(&content)?),
            Some(other) => bail_invalid!("config extension", other),
            None => bail_invalid!("config path", path.display()),
        }
    }

    /// Save configuration to a TOML file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| OrtoniError::Other(format!("failed to serialize config: {}", e)))?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Whether history should be persisted (unset means enabled)
    pub fn save_history_enabled(&self) -> bool {
        self.save_history.unwrap_or(true)
    }

    /// Report title, falling back to the default title
    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or(DEFAULT_TITLE)
    }

    pub fn folder(&self) -> PathBuf {
        PathBuf::from(&self.folder_path)
    }

    /// Full path of the HTML report file
    pub fn report_path(&self) -> PathBuf {
        self.folder().join(ensure_html_extension(&self.filename))
    }

    /// Full path of the SQLite history database
    pub fn history_db_path(&self) -> PathBuf {
        self.folder().join(HISTORY_DB_FILENAME)
    }
}

/// Append `.html` unless the name already ends with it (case-insensitive)
pub fn ensure_html_extension(filename: &str) -> String {
    let has_html = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("html"));

    if has_html {
        filename.to_string()
    } else {
        format!("{}.html", filename)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = ReporterConfig::default();
        assert_eq!(config.open, OpenMode::Never);
        assert!(!config.show_project);
        assert!(!config.base64_image);
        assert_eq!(config.filename, "ortoni-report.html");
        assert_eq!(config.folder_path, "ortoni-report");
        assert!(config.save_history.is_none());
        assert!(config.save_history_enabled());
        assert_eq!(config.merge_mode, MergeMode::Append);
    }

    #[test]
    fn test_json_config_ignores_unknown_keys() {
        let config: ReporterConfig = serde_json::from_str(
            r#"{"open": "on-failure", "showProject": true, "saveHistory": false, "somethingNew": 42}"#,
        )
        .unwrap();
        assert_eq!(config.open, OpenMode::OnFailure);
        assert!(config.show_project);
        assert_eq!(config.save_history, Some(false));
        assert!(!config.save_history_enabled());
        assert_eq!(config.folder_path, DEFAULT_FOLDER_PATH);
    }

    #[test]
    fn test_save_and_load_toml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ortoni.toml");

        let mut config = ReporterConfig {
            title: Some("Nightly".to_string()),
            preferred_theme: Some(Theme::Dark),
            merge_mode: MergeMode::Dedupe,
            ..Default::default()
        };
        config.meta.insert("branch".to_string(), "main".to_string());
        config.save(&path).unwrap();

        let loaded = ReporterConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.display_title(), "Nightly");
    }

    #[test]
    fn test_load_json_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ortoni.json");
        fs::write(&path, r#"{"folderPath": "out", "filename": "index"}"#).unwrap();

        let loaded = ReporterConfig::load(&path).unwrap();
        assert_eq!(loaded.report_path(), PathBuf::from("out").join("index.html"));
        assert_eq!(
            loaded.history_db_path(),
            PathBuf::from("out").join(HISTORY_DB_FILENAME)
        );
    }

    #[test]
    fn test_load_rejects_unknown_extension() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ortoni.yaml");
        fs::write(&path, "open: always").unwrap();

        let err = ReporterConfig::load(&path).unwrap_err();
        assert!(matches!(err, OrtoniError::InvalidValue { .. }));
    }

    #[test]
    fn test_ensure_html_extension() {
        assert_eq!(ensure_html_extension("report"), "report.html");
        assert_eq!(ensure_html_extension("report.HTML"), "report.HTML");
        assert_eq!(ensure_html_extension("report.htm"), "report.htm.html");
    }
}
