//! Runtime configuration for the fetch client and tool server.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

use crate::constants::SESSION_PREFIX;

/// Where requests go and how the edition protocol recognises its own fields.
///
/// Loaded from the JSON file named by `RELEDIT_CONFIG` when set; every field
/// has a default so a partial file is fine.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Application root, always ending with `/`
    pub base_url: String,
    /// Path of the ajax controller, relative to `base_url`
    pub ajax_path: String,
    /// Path edition forms are posted to
    pub submit_path: String,
    /// Page id sent along with every ajax call
    pub page_id: Option<String>,
    /// Transport timeout; expiry is reported as a network error
    pub request_timeout_ms: u64,
    /// Hidden field prefix marking session parameters
    pub session_prefix: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/".to_string(),
            ajax_path: "ajax".to_string(),
            submit_path: "validateform".to_string(),
            page_id: None,
            request_timeout_ms: 30_000,
            session_prefix: SESSION_PREFIX.to_string(),
        }
    }
}

impl Config {
    /// Read the config file named by `RELEDIT_CONFIG`, then apply `RELEDIT_BASE_URL`.
    pub fn from_env() -> anyhow::Result<Self> {
        let mut config = match std::env::var("RELEDIT_CONFIG") {
            Ok(path) => Self::from_file(Path::new(&path))?,
            Err(_) => Self::default(),
        };
        if let Ok(base_url) = std::env::var("RELEDIT_BASE_URL") {
            debug!(%base_url, "base url overridden from environment");
            config.base_url = base_url;
        }
        config.normalize();
        Ok(config)
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let mut config: Config = serde_json::from_str(&raw)?;
        config.normalize();
        info!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    fn normalize(&mut self) {
        if !self.base_url.ends_with('/') {
            self.base_url.push('/');
        }
    }

    pub fn ajax_url(&self) -> String {
        format!("{}{}", self.base_url, self.ajax_path)
    }

    pub fn submit_url(&self) -> String {
        format!("{}{}", self.base_url, self.submit_path)
    }

    /// Resolve a region's load url against the application root.
    pub fn resolve(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            url.to_string()
        } else {
            format!("{}{}", self.base_url, url.trim_start_matches('/'))
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}
