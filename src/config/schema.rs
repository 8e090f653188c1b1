//! Configuration schema for olcli
//!
//! Configuration is stored at `~/.config/olcli/config.toml`

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Upstream service settings
    pub service: ServiceConfig,

    /// Network timeouts
    pub http: HttpConfig,

    /// Compile cache settings
    pub cache: CacheConfig,

    /// Download defaults
    pub download: DownloadConfig,

    /// Filesystem locations
    pub paths: PathsConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
        }
    }
}

/// Upstream service settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Service homepage, without trailing slash
    pub base_url: String,

    /// User-Agent sent with every request
    pub user_agent: String,

    /// Name of the cookie that carries the authenticated session
    pub session_cookie: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.overleaf.com".to_string(),
            user_agent: "Mozilla/5.0 (X11; Linux x86_64; rv:63.0) Gecko/20100101 Firefox/63.0"
                .to_string(),
            session_cookie: "overleaf_session2".to_string(),
        }
    }
}

/// Network timeouts, in seconds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Timeout for the credential submission
    pub submit_timeout_secs: u64,

    /// Timeout for all other HTTP requests (0 = unbounded)
    pub request_timeout_secs: u64,

    /// Connect/read/write timeout for the real-time handshake
    pub socket_timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            submit_timeout_secs: 5,
            request_timeout_secs: 0,
            socket_timeout_secs: 10,
        }
    }
}

impl HttpConfig {
    pub fn submit_timeout(&self) -> Duration {
        Duration::from_secs(self.submit_timeout_secs)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_secs > 0).then(|| Duration::from_secs(self.request_timeout_secs))
    }

    pub fn socket_timeout(&self) -> Duration {
        Duration::from_secs(self.socket_timeout_secs.max(1))
    }
}

/// Compile cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Freshness window for compile results (matches the service's
    /// incremental compile lifetime)
    pub ttl_secs: u64,

    /// Maximum number of cached compile results (0 = unlimited)
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 600,
            max_entries: 0,
        }
    }
}

/// Download defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    /// Directory that receives downloaded artifacts
    pub output_dir: PathBuf,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
        }
    }
}

/// Filesystem locations
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Override for the session and cache directory
    pub state_dir: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = Config::default();
        let toml = toml::to_string_pretty(&config).unwrap();
        assert!(toml.contains("[service]"));
        assert!(toml.contains("[cache]"));
        assert!(toml.contains("ttl_secs = 600"));
    }

    #[test]
    fn config_deserializes_empty() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.service.base_url, "https://www.overleaf.com");
        assert_eq!(config.http.submit_timeout_secs, 5);
    }

    #[test]
    fn config_deserializes_partial() {
        let toml = r#"
            [cache]
            ttl_secs = 120
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.cache.ttl_secs, 120);
        assert_eq!(config.cache.max_entries, 0);
        assert_eq!(config.service.session_cookie, "overleaf_session2");
    }

    #[test]
    fn request_timeout_zero_is_unbounded() {
        let mut http = HttpConfig::default();
        assert!(http.request_timeout().is_none());

        http.request_timeout_secs = 30;
        assert_eq!(http.request_timeout(), Some(Duration::from_secs(30)));
    }
}
