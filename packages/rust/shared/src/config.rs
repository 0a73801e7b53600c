//! Application configuration for cardfeed.
//!
//! User config lives at `~/.cardfeed/cardfeed.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{CardfeedError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "cardfeed.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".cardfeed";

// ---------------------------------------------------------------------------
// Config structs (matching cardfeed.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// AnkiConnect endpoint settings.
    #[serde(default)]
    pub anki: AnkiConfig,

    /// Target field names and detection order.
    #[serde(default)]
    pub fields: FieldsConfig,

    /// Section labels searched for in rendered HTML.
    #[serde(default)]
    pub labels: LabelsConfig,

    /// Dry-run preview sizing.
    #[serde(default)]
    pub preview: PreviewConfig,
}

/// `[anki]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnkiConfig {
    /// AnkiConnect URL.
    #[serde(default = "default_anki_url")]
    pub url: String,

    /// AnkiConnect API version sent with every request.
    #[serde(default = "default_api_version")]
    pub api_version: u32,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for AnkiConfig {
    fn default() -> Self {
        Self {
            url: default_anki_url(),
            api_version: default_api_version(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_anki_url() -> String {
    "http://127.0.0.1:8765".into()
}
fn default_api_version() -> u32 {
    6
}
fn default_timeout_secs() -> u64 {
    30
}

/// `[fields]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldsConfig {
    /// Field receiving `front_html`.
    #[serde(default = "default_front_field")]
    pub front_field: String,

    /// Explicit field for `back_html` (auto-detected when unset).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub back_field: Option<String>,

    /// Explicit field for legacy `answer_html` rows (auto-detected when unset).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer_field: Option<String>,

    /// Ordered candidates tried when auto-detecting the back field.
    #[serde(default = "default_back_candidates")]
    pub back_candidates: Vec<String>,

    /// Target-side field holding the canonical note id.
    #[serde(default = "default_identity_field")]
    pub identity_field: String,
}

impl Default for FieldsConfig {
    fn default() -> Self {
        Self {
            front_field: default_front_field(),
            back_field: None,
            answer_field: None,
            back_candidates: default_back_candidates(),
            identity_field: default_identity_field(),
        }
    }
}

fn default_front_field() -> String {
    "Front".into()
}
fn default_identity_field() -> String {
    "NoteID".into()
}

/// Most common names first, then the repo-style variants.
pub fn default_back_candidates() -> Vec<String> {
    [
        "Answer",
        "Back",
        "answer",
        "back",
        "answer_md",
        "answer_html",
        "Answer_md",
        "Answer_html",
        "Back_md",
        "Back_html",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// `[labels]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelsConfig {
    /// H3 label opening the front content.
    #[serde(default = "default_front_label")]
    pub front: String,

    /// H3 label opening the back content.
    #[serde(default = "default_back_label")]
    pub back: String,
}

impl Default for LabelsConfig {
    fn default() -> Self {
        Self {
            front: default_front_label(),
            back: default_back_label(),
        }
    }
}

fn default_front_label() -> String {
    "AFTER_FRONT".into()
}
fn default_back_label() -> String {
    "AFTER_BACK".into()
}

/// `[preview]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewConfig {
    /// Number of pending updates shown in a dry run.
    #[serde(default = "default_sample_size")]
    pub sample_size: usize,

    /// Characters of each value shown in a dry run.
    #[serde(default = "default_snippet_len")]
    pub snippet_len: usize,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            sample_size: default_sample_size(),
            snippet_len: default_snippet_len(),
        }
    }
}

fn default_sample_size() -> usize {
    3
}
fn default_snippet_len() -> usize {
    120
}

// ---------------------------------------------------------------------------
// Sync config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime options for identity resolution and field reconciliation.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Explicit front field; `None` means the configured default name.
    pub front_field_override: Option<String>,
    /// Explicit back field; `None` means auto-detect.
    pub back_field_override: Option<String>,
    /// Candidates tried in order when auto-detecting the back field.
    pub back_candidate_order: Vec<String>,
    /// Target-side field searched when resolving identities.
    pub identity_field_name: String,
    /// Timeout applied to every automation request.
    pub lookup_timeout: Duration,
}

impl SyncConfig {
    /// Default front field name used when no override is supplied.
    pub const DEFAULT_FRONT_FIELD: &'static str = "Front";

    /// The front field name to write to.
    pub fn front_field(&self) -> &str {
        self.front_field_override
            .as_deref()
            .unwrap_or(Self::DEFAULT_FRONT_FIELD)
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for SyncConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            front_field_override: Some(config.fields.front_field.clone()),
            back_field_override: config.fields.back_field.clone(),
            back_candidate_order: config.fields.back_candidates.clone(),
            identity_field_name: config.fields.identity_field.clone(),
            lookup_timeout: Duration::from_secs(config.anki.timeout_secs),
        }
    }
}

impl AnkiConfig {
    /// Parse and validate the configured endpoint URL.
    pub fn endpoint(&self) -> Result<Url> {
        Url::parse(&self.url)
            .map_err(|e| CardfeedError::config(format!("invalid AnkiConnect URL '{}': {e}", self.url)))
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.cardfeed/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| CardfeedError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.cardfeed/cardfeed.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| CardfeedError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        CardfeedError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| CardfeedError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| CardfeedError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| CardfeedError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("http://127.0.0.1:8765"));
        assert!(toml_str.contains("AFTER_FRONT"));
        assert!(toml_str.contains("NoteID"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.anki.api_version, 6);
        assert_eq!(parsed.fields.front_field, "Front");
        assert_eq!(parsed.fields.back_candidates[0], "Answer");
        assert_eq!(parsed.preview.snippet_len, 120);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[anki]
url = "http://localhost:9999"

[fields]
back_field = "Explanation"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.anki.url, "http://localhost:9999");
        assert_eq!(config.anki.timeout_secs, 30);
        assert_eq!(config.fields.back_field.as_deref(), Some("Explanation"));
        assert_eq!(config.fields.identity_field, "NoteID");
        assert_eq!(config.labels.back, "AFTER_BACK");
    }

    #[test]
    fn sync_config_from_app_config() {
        let mut app = AppConfig::default();
        app.fields.back_field = Some("Extra".into());
        app.anki.timeout_secs = 5;

        let sync = SyncConfig::from(&app);
        assert_eq!(sync.front_field(), "Front");
        assert_eq!(sync.back_field_override.as_deref(), Some("Extra"));
        assert_eq!(sync.identity_field_name, "NoteID");
        assert_eq!(sync.lookup_timeout, Duration::from_secs(5));
    }

    #[test]
    fn front_field_falls_back_to_default_name() {
        let sync = SyncConfig {
            front_field_override: None,
            ..SyncConfig::default()
        };
        assert_eq!(sync.front_field(), "Front");
    }

    #[test]
    fn invalid_endpoint_rejected() {
        let anki = AnkiConfig {
            url: "not a url".into(),
            ..AnkiConfig::default()
        };
        let err = anki.endpoint().unwrap_err();
        assert!(err.to_string().contains("invalid AnkiConnect URL"));
    }
}
