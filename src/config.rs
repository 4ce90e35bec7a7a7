//! Configuration management.
//!
//! Settings come from defaults, an optional TOML file, `HARVEST_*`
//! environment variables and finally CLI flags, in increasing precedence.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::scrapers::http_client::{FetchError, HttpClient};
use crate::scrapers::SiteProfile;

/// Config file looked up in the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILENAME: &str = "harvest.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse TOML config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("Unknown site profile: {0}")]
    UnknownSite(String),
}

/// Application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Record store; `.jsonl` selects the line format, anything else a JSON array.
    pub data_path: PathBuf,
    /// Checkpoint file for the crawl job.
    pub checkpoint_path: PathBuf,
    /// Directory merged artifacts are written to and served from.
    pub output_dir: PathBuf,
    /// Web server bind address.
    pub bind: String,
    /// Request timeout in seconds.
    pub request_timeout_secs: u64,
    /// User agent override ("impersonate" picks a browser agent).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    /// Site profile used by `crawl`.
    pub site: String,
    /// Custom site profiles, keyed by name.
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub sites: HashMap<String, SiteProfile>,
    /// File the settings were loaded from.
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("items.jsonl"),
            checkpoint_path: PathBuf::from("checkpoint.json"),
            output_dir: PathBuf::from("merged_output"),
            bind: "127.0.0.1:8080".to_string(),
            request_timeout_secs: 30,
            user_agent: None,
            site: "kiddoworksheets".to_string(),
            sites: HashMap::new(),
            source_path: None,
        }
    }
}

impl Settings {
    /// Load settings from `explicit`, else `./harvest.toml` if present, else defaults.
    /// Environment overrides are applied on top.
    pub async fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let default_path = PathBuf::from(DEFAULT_CONFIG_FILENAME);
        let mut settings = match explicit {
            Some(path) => Self::load_from_path(path).await?,
            None if default_path.exists() => Self::load_from_path(&default_path).await?,
            None => Self::default(),
        };
        settings.apply_env_overrides();
        Ok(settings)
    }

    /// Load settings from a TOML file.
    ///
    /// Relative paths in the file are resolved against the file's directory.
    pub async fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ConfigError::Read {
                path: path.to_path_buf(),
                source: e,
            })?;
        let mut settings: Settings = toml::from_str(&contents).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })?;

        if let Some(base_dir) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            settings.data_path = resolve_path(&settings.data_path, base_dir);
            settings.checkpoint_path = resolve_path(&settings.checkpoint_path, base_dir);
            settings.output_dir = resolve_path(&settings.output_dir, base_dir);
        }
        settings.source_path = Some(path.to_path_buf());
        Ok(settings)
    }

    /// Apply `HARVEST_DATA`, `HARVEST_OUTPUT_DIR` and `HARVEST_BIND`.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(data) = var("HARVEST_DATA") {
            tracing::debug!("Using HARVEST_DATA from environment: {}", data);
            self.data_path = PathBuf::from(data);
        }
        if let Some(dir) = var("HARVEST_OUTPUT_DIR") {
            tracing::debug!("Using HARVEST_OUTPUT_DIR from environment: {}", dir);
            self.output_dir = PathBuf::from(dir);
        }
        if let Some(bind) = var("HARVEST_BIND") {
            tracing::debug!("Using HARVEST_BIND from environment: {}", bind);
            self.bind = bind;
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    /// Resolve a site profile: custom `[sites.<name>]` entries shadow presets.
    pub fn site_profile(&self, name: Option<&str>) -> Result<SiteProfile, ConfigError> {
        let name = name.unwrap_or(self.site.as_str());
        if let Some(profile) = self.sites.get(name) {
            let mut profile = profile.clone();
            if profile.name.is_empty() || profile.name == SiteProfile::default().name {
                profile.name = name.to_string();
            }
            return Ok(profile);
        }
        SiteProfile::preset(name).ok_or_else(|| ConfigError::UnknownSite(name.to_string()))
    }

    /// HTTP client honouring the timeout and user agent; a profile's agent wins.
    pub fn http_client(&self, profile: Option<&SiteProfile>) -> Result<HttpClient, FetchError> {
        let user_agent = profile
            .and_then(|p| p.user_agent.as_deref())
            .or(self.user_agent.as_deref());
        HttpClient::with_user_agent(self.request_timeout(), user_agent)
    }
}

fn resolve_path(path: &Path, base_dir: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_load_from_path_resolves_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("harvest.toml");
        std::fs::write(
            &path,
            r#"
            data_path = "data/items.json"
            output_dir = "/srv/merged"
            site = "local"

            [sites.local]
            base_url = "http://127.0.0.1:9000"
            detail_patterns = ["/item/"]
            "#,
        )
        .unwrap();

        let settings = Settings::load_from_path(&path).await.unwrap();
        assert_eq!(settings.data_path, dir.path().join("data/items.json"));
        assert_eq!(settings.checkpoint_path, dir.path().join("checkpoint.json"));
        assert_eq!(settings.output_dir, PathBuf::from("/srv/merged"));
        assert_eq!(settings.bind, "127.0.0.1:8080");

        let profile = settings.site_profile(None).unwrap();
        assert_eq!(profile.name, "local");
        assert_eq!(profile.detail_patterns, vec!["/item/"]);
    }

    #[tokio::test]
    async fn test_load_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "data_path = [").unwrap();
        assert!(matches!(
            Settings::load_from_path(&path).await,
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_env_overrides() {
        let mut settings = Settings::default();
        settings.apply_overrides(|key| match key {
            "HARVEST_DATA" => Some("other.json".to_string()),
            "HARVEST_BIND" => Some("0.0.0.0:9999".to_string()),
            "HARVEST_OUTPUT_DIR" => Some("  ".to_string()),
            _ => None,
        });
        assert_eq!(settings.data_path, PathBuf::from("other.json"));
        assert_eq!(settings.bind, "0.0.0.0:9999");
        assert_eq!(settings.output_dir, PathBuf::from("merged_output"));
    }

    #[test]
    fn test_presets_and_unknown_site() {
        let settings = Settings::default();
        assert_eq!(settings.site_profile(None).unwrap().name, "kiddoworksheets");
        assert_eq!(
            settings.site_profile(Some("wsfun")).unwrap().name,
            "worksheetfun"
        );
        assert!(matches!(
            settings.site_profile(Some("nowhere")),
            Err(ConfigError::UnknownSite(_))
        ));
    }
}
