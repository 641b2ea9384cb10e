use crate::constants::{
    enabled_by_default, get_supported_sources, DEFAULT_DB_PATH, DEFAULT_HTTP_TIMEOUT_SECS,
    DEFAULT_LOG_DIR, DEFAULT_USER_AGENT,
};
use crate::error::{FetcherError, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Runtime configuration handed to the pipeline runner.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub http: HttpConfig,
    pub logging: LoggingConfig,
    pub metrics: MetricsConfig,
    pub regions: RegionsConfig,
    pub sources: BTreeMap<String, SourceConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` takes precedence
    pub level: String,
    pub log_dir: PathBuf,
    /// Also write JSON lines to a daily-rotated file under `log_dir`
    pub json_file: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "epi_fetcher=info".to_string(),
            log_dir: PathBuf::from(DEFAULT_LOG_DIR),
            json_file: true,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Where to write a Prometheus text snapshot after all runs
    pub snapshot_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RegionsConfig {
    /// Division reference CSV; when unset the store's division table is used
    pub reference_csv: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub enabled: Option<bool>,
    pub url: Option<String>,
}

impl Config {
    pub fn load(config_path: &Path) -> Result<Self> {
        let config_content = fs::read_to_string(config_path).map_err(|e| {
            FetcherError::Config(format!(
                "Failed to read config file '{}': {}",
                config_path.display(),
                e
            ))
        })?;
        Self::from_toml(&config_content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        for code in config.sources.keys() {
            if !get_supported_sources().contains(&code.as_str()) {
                return Err(FetcherError::UnknownSource(code.clone()));
            }
        }
        Ok(config)
    }

    pub fn is_enabled(&self, source: &str) -> bool {
        self.sources
            .get(source)
            .and_then(|s| s.enabled)
            .unwrap_or_else(|| enabled_by_default(source))
    }

    pub fn feed_url(&self, source: &str) -> Option<&str> {
        self.sources.get(source).and_then(|s| s.url.as_deref())
    }

    /// Sources that run when none are named on the command line
    pub fn enabled_sources(&self) -> Vec<&'static str> {
        get_supported_sources()
            .into_iter()
            .filter(|s| self.is_enabled(s))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_follow_source_load_flags() {
        let config = Config::default();
        assert_eq!(config.enabled_sources(), vec!["WRD_ECDC"]);
        assert_eq!(config.storage.db_path, PathBuf::from(DEFAULT_DB_PATH));
        assert!(config.feed_url("WRD_ECDC").is_none());
    }

    #[test]
    fn test_parse_full_file() {
        let config = Config::from_toml(
            r#"
            [storage]
            db_path = "/tmp/epi.db"

            [http]
            timeout_secs = 5

            [logging]
            level = "epi_fetcher=debug"
            json_file = false

            [metrics]
            snapshot_path = "out/metrics.prom"

            [sources.BEL_LE]
            enabled = true
            url = "https://mirror.example/covid19-belgium.csv"

            [sources.WRD_ECDC]
            enabled = false
            "#,
        )
        .unwrap();

        assert_eq!(config.storage.db_path, PathBuf::from("/tmp/epi.db"));
        assert_eq!(config.http.timeout(), Duration::from_secs(5));
        assert_eq!(config.http.user_agent, DEFAULT_USER_AGENT);
        assert!(!config.logging.json_file);
        assert_eq!(config.metrics.snapshot_path, Some(PathBuf::from("out/metrics.prom")));
        assert_eq!(config.enabled_sources(), vec!["BEL_LE"]);
        assert_eq!(
            config.feed_url("BEL_LE"),
            Some("https://mirror.example/covid19-belgium.csv")
        );
    }

    #[test]
    fn test_unknown_source_is_rejected() {
        let err = Config::from_toml("[sources.XYZ]\nenabled = true\n").unwrap_err();
        assert!(matches!(err, FetcherError::UnknownSource(ref s) if s == "XYZ"));
    }

    #[test]
    fn test_missing_file_is_a_config_error() {
        let err = Config::load(Path::new("/nonexistent/epi_fetcher.toml")).unwrap_err();
        assert!(matches!(err, FetcherError::Config(_)));
    }
}
