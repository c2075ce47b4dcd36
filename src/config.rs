// Client configuration
//
// Layers, lowest to highest priority:
// 1. Built-in defaults (per API scheme)
// 2. <config dir>/yt-web-client/config.json
// 3. YTWEB_* environment variables
// 4. Command-line flags (applied by the binary)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::client::{ClientError, NetworkConfig, PollPolicy, SchemeKind};

pub const DEFAULT_BASE_URL: &str = "http://localhost:5000";

const APP_DIR: &str = "yt-web-client";
const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Backend root, e.g. "http://localhost:5000"
    pub base_url: String,

    pub scheme: SchemeKind,

    /// Overrides the scheme's poll interval
    pub poll_interval_ms: Option<u64>,

    /// Overrides whether the first status request goes out immediately
    pub poll_immediately: Option<bool>,

    /// Stop polling after this many seconds of waiting. Unset polls forever
    pub job_timeout_secs: Option<u64>,

    pub network: NetworkConfig,

    /// Where fetched files are saved. Defaults to the user's Downloads folder
    pub download_dir: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            scheme: SchemeKind::default(),
            poll_interval_ms: None,
            poll_immediately: None,
            job_timeout_secs: None,
            network: NetworkConfig::default(),
            download_dir: None,
        }
    }
}

impl ClientConfig {
    /// `<config dir>/yt-web-client/config.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
    }

    /// Defaults, then the config file (if any), then the environment
    pub fn load() -> Result<Self, ClientError> {
        let mut config = match Self::default_path() {
            Some(path) => Self::load_from(&path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Read a config file. A missing file yields the defaults
    pub fn load_from(path: &Path) -> Result<Self, ClientError> {
        if !path.exists() {
            tracing::debug!("[Config] No config file at {:?}, using defaults", path);
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| ClientError::Config(format!("{}: {}", path.display(), e)))?;
        tracing::info!("[Config] Loaded {:?}", path);
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ClientError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ClientError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Apply `YTWEB_*` overrides. `lookup` is `std::env::var` outside tests
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ClientError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = get("YTWEB_BASE_URL") {
            self.base_url = url;
        }
        if let Some(scheme) = get("YTWEB_SCHEME") {
            self.scheme = scheme.parse().map_err(ClientError::Config)?;
        }
        if let Some(ms) = get("YTWEB_POLL_MS") {
            let ms = ms
                .trim()
                .parse()
                .map_err(|_| ClientError::Config(format!("YTWEB_POLL_MS is not a number: {}", ms)))?;
            self.poll_interval_ms = Some(ms);
        }
        if let Some(proxy) = get("YTWEB_PROXY") {
            self.network.proxy = Some(proxy);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ClientError> {
        let url = self.base_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ClientError::Config(format!(
                "Backend URL must start with http:// or https://: {:?}",
                self.base_url
            )));
        }
        if self.poll_interval_ms == Some(0) {
            return Err(ClientError::Config("Poll interval must be above 0 ms".to_string()));
        }
        Ok(())
    }

    pub fn poll_policy(&self) -> PollPolicy {
        let mut policy = PollPolicy::for_scheme(self.scheme)
            .with_timeout(self.job_timeout_secs.map(Duration::from_secs));
        if let Some(ms) = self.poll_interval_ms {
            policy = policy.with_interval(Duration::from_millis(ms));
        }
        if let Some(immediately) = self.poll_immediately {
            policy.poll_immediately = immediately;
        }
        policy
    }

    /// Configured directory, else Downloads, else the current directory
    pub fn download_dir(&self) -> PathBuf {
        self.download_dir
            .clone()
            .or_else(dirs::download_dir)
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, "http://localhost:5000");
        assert_eq!(config.scheme, SchemeKind::Job);
        let policy = config.poll_policy();
        assert_eq!(policy.interval, Duration::from_millis(2000));
        assert!(!policy.poll_immediately);
        assert_eq!(policy.timeout, None);
    }

    #[test]
    fn test_session_scheme_policy() {
        let config = ClientConfig {
            scheme: SchemeKind::Session,
            job_timeout_secs: Some(600),
            ..Default::default()
        };
        let policy = config.poll_policy();
        assert_eq!(policy.interval, Duration::from_millis(500));
        assert!(policy.poll_immediately);
        assert_eq!(policy.timeout, Some(Duration::from_secs(600)));
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ClientConfig::load_from(&dir.path().join("nope.json")).unwrap();
        assert_eq!(config, ClientConfig::default());
    }

    #[test]
    fn test_partial_file_and_save() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, r#"{"scheme": "session", "poll_interval_ms": 750}"#).unwrap();

        let config = ClientConfig::load_from(&path).unwrap();
        assert_eq!(config.scheme, SchemeKind::Session);
        assert_eq!(config.poll_policy().interval, Duration::from_millis(750));
        assert_eq!(config.base_url, DEFAULT_BASE_URL);

        let copy = dir.path().join("other").join("config.json");
        config.save_to(&copy).unwrap();
        assert_eq!(ClientConfig::load_from(&copy).unwrap(), config);
    }

    #[test]
    fn test_broken_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(ClientConfig::load_from(&path), Err(ClientError::Config(_))));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = ClientConfig::default();
        config
            .apply_env(env(&[
                ("YTWEB_BASE_URL", "http://media.lan:8080"),
                ("YTWEB_SCHEME", "session"),
                ("YTWEB_POLL_MS", "1000"),
                ("YTWEB_PROXY", "socks5h://127.0.0.1:10808"),
            ]))
            .unwrap();
        assert_eq!(config.base_url, "http://media.lan:8080");
        assert_eq!(config.scheme, SchemeKind::Session);
        assert_eq!(config.poll_interval_ms, Some(1000));
        assert_eq!(config.network.proxy.as_deref(), Some("socks5h://127.0.0.1:10808"));

        let mut config = ClientConfig::default();
        assert!(config.apply_env(env(&[("YTWEB_POLL_MS", "soon")])).is_err());
        assert!(config.apply_env(env(&[("YTWEB_SCHEME", "grpc")])).is_err());
        config.apply_env(env(&[("YTWEB_BASE_URL", "  ")])).unwrap();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn test_validate() {
        assert!(ClientConfig::default().validate().is_ok());
        let bad = ClientConfig {
            base_url: "localhost:5000".to_string(),
            ..Default::default()
        };
        assert!(bad.validate().is_err());
        let zero = ClientConfig {
            poll_interval_ms: Some(0),
            ..Default::default()
        };
        assert!(zero.validate().is_err());
    }
}
