//! Configuration file parsing and management.
//!
//! This module handles loading configuration from TOML files and `HC_*`
//! environment variables, and merging configurations with proper
//! precedence rules.

use crate::error::HostCheckError;
use crate::types::{is_plain_file_name, Source, MAX_CONCURRENCY};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Configuration loaded from TOML files.
///
/// ```toml
/// [defaults]
/// concurrency = 8
/// timeout = "4s"
/// dir = "whitelists"
///
/// [[sources]]
/// url = "https://example.org/lists/whitelist.txt"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileConfig {
    /// Default values for CLI options
    #[serde(skip_serializing_if = "Option::is_none")]
    pub defaults: Option<DefaultsConfig>,

    /// Remote lists to download
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<Source>>,
}

/// Default configuration values that map to CLI options.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DefaultsConfig {
    /// Maximum in-flight probes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<usize>,

    /// Per-attempt probe timeout (e.g. "4s")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,

    /// List directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,

    /// Skip unreadable list files instead of failing
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_unreadable: Option<bool>,

    /// Run the download step
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download: Option<bool>,

    /// Timeout for a whole list download (e.g. "30s")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_timeout: Option<String>,
}

/// Configuration discovery and loading functionality.
pub struct ConfigManager {
    /// Whether to report which files were loaded
    pub verbose: bool,
}

impl ConfigManager {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    /// Load configuration from a specific file.
    pub fn load_file<P: AsRef<Path>>(&self, path: P) -> Result<FileConfig, HostCheckError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(HostCheckError::file_error(
                path.to_string_lossy(),
                "Configuration file not found",
            ));
        }

        let content = fs::read_to_string(path).map_err(|e| {
            HostCheckError::file_error(
                path.to_string_lossy(),
                format!("Failed to read configuration file: {}", e),
            )
        })?;

        let config: FileConfig = toml::from_str(&content)?;
        self.validate_config(&config)?;

        Ok(config)
    }

    /// Discover and load configuration files in precedence order.
    ///
    /// XDG config is the lowest precedence, then the home directory, then
    /// the current directory.
    pub fn discover_and_load(&self) -> Result<FileConfig, HostCheckError> {
        let mut merged_config = FileConfig::default();
        let mut loaded_files = Vec::new();

        let candidates = [
            self.get_xdg_config_path(),
            self.get_global_config_path(),
            self.get_local_config_path(),
        ];

        for path in candidates.into_iter().flatten() {
            match self.load_file(&path) {
                Ok(config) => {
                    merged_config = self.merge_configs(merged_config, config);
                    loaded_files.push(path);
                }
                Err(e) => warn!(path = %path.display(), error = %e, "ignoring config file"),
            }
        }

        if self.verbose {
            for path in &loaded_files {
                info!(path = %path.display(), "loaded config file");
            }
        }

        Ok(merged_config)
    }

    /// Local configuration file in the current directory.
    fn get_local_config_path(&self) -> Option<PathBuf> {
        let candidates = ["./host-check.toml", "./.host-check.toml"];

        candidates
            .iter()
            .map(Path::new)
            .find(|path| path.exists())
            .map(Path::to_path_buf)
    }

    /// Global configuration file in the user's home directory.
    fn get_global_config_path(&self) -> Option<PathBuf> {
        let home = env::var_os("HOME")?;
        [".host-check.toml", "host-check.toml"]
            .iter()
            .map(|candidate| Path::new(&home).join(candidate))
            .find(|path| path.exists())
    }

    /// XDG configuration file, following the XDG Base Directory Specification.
    fn get_xdg_config_path(&self) -> Option<PathBuf> {
        let config_dir = env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| env::var_os("HOME").map(|home| Path::new(&home).join(".config")))?;

        let path = config_dir.join("host-check").join("config.toml");
        if path.exists() {
            Some(path)
        } else {
            None
        }
    }

    /// Merge two configurations; values from `higher` win.
    ///
    /// A higher source list replaces the lower one entirely.
    pub fn merge_configs(&self, lower: FileConfig, higher: FileConfig) -> FileConfig {
        FileConfig {
            defaults: match (lower.defaults, higher.defaults) {
                (Some(mut lower_defaults), Some(higher_defaults)) => {
                    if higher_defaults.concurrency.is_some() {
                        lower_defaults.concurrency = higher_defaults.concurrency;
                    }
                    if higher_defaults.timeout.is_some() {
                        lower_defaults.timeout = higher_defaults.timeout;
                    }
                    if higher_defaults.dir.is_some() {
                        lower_defaults.dir = higher_defaults.dir;
                    }
                    if higher_defaults.skip_unreadable.is_some() {
                        lower_defaults.skip_unreadable = higher_defaults.skip_unreadable;
                    }
                    if higher_defaults.download.is_some() {
                        lower_defaults.download = higher_defaults.download;
                    }
                    if higher_defaults.download_timeout.is_some() {
                        lower_defaults.download_timeout = higher_defaults.download_timeout;
                    }
                    Some(lower_defaults)
                }
                (lower_defaults, higher_defaults) => higher_defaults.or(lower_defaults),
            },
            sources: higher.sources.or(lower.sources),
        }
    }

    /// Validate a configuration for common issues.
    fn validate_config(&self, config: &FileConfig) -> Result<(), HostCheckError> {
        if let Some(defaults) = &config.defaults {
            if let Some(concurrency) = defaults.concurrency {
                if concurrency == 0 || concurrency > MAX_CONCURRENCY {
                    return Err(HostCheckError::config(format!(
                        "Concurrency must be between 1 and {}",
                        MAX_CONCURRENCY
                    )));
                }
            }

            for (key, value) in [
                ("timeout", &defaults.timeout),
                ("download_timeout", &defaults.download_timeout),
            ] {
                if let Some(timeout_str) = value {
                    if parse_timeout_string(timeout_str).is_none() {
                        return Err(HostCheckError::config(format!(
                            "Invalid {} '{}'. Use format like '4s', '30s', '2m'",
                            key, timeout_str
                        )));
                    }
                }
            }
        }

        if let Some(sources) = &config.sources {
            for source in sources {
                validate_source_url(&source.url)?;
                if let Some(name) = &source.file_name {
                    if !is_plain_file_name(name.trim()) {
                        return Err(HostCheckError::config(format!(
                            "Invalid file_name '{}' for source '{}': must be a plain file name",
                            name, source.url
                        )));
                    }
                }
            }
        }

        Ok(())
    }
}

/// Check that a source URL is an absolute http(s) URL.
pub fn validate_source_url(url: &str) -> Result<(), HostCheckError> {
    let parsed = reqwest::Url::parse(url.trim())
        .map_err(|e| HostCheckError::config(format!("Invalid source URL '{}': {}", url, e)))?;

    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(HostCheckError::config(format!(
            "Unsupported scheme '{}' in source URL '{}'",
            other, url
        ))),
    }
}

/// Environment variable configuration that mirrors CLI options.
///
/// This represents configuration values that can be set via `HC_*` environment variables.
#[derive(Debug, Clone, Default)]
pub struct EnvConfig {
    pub concurrency: Option<usize>,
    pub timeout: Option<Duration>,
    pub dir: Option<PathBuf>,
    pub sources: Option<Vec<Source>>,
    pub skip_unreadable: Option<bool>,
    pub config: Option<String>,
}

/// Load configuration from environment variables.
///
/// Invalid values are logged as warnings and ignored.
pub fn load_env_config() -> EnvConfig {
    env_config_from(|key| env::var(key).ok())
}

/// Build an [`EnvConfig`] from any variable lookup.
pub fn env_config_from<F>(lookup: F) -> EnvConfig
where
    F: Fn(&str) -> Option<String>,
{
    let mut env_config = EnvConfig::default();

    // HC_CONCURRENCY - maximum in-flight probes
    if let Some(val) = lookup("HC_CONCURRENCY") {
        match val.trim().parse::<usize>() {
            Ok(concurrency) if concurrency > 0 && concurrency <= MAX_CONCURRENCY => {
                env_config.concurrency = Some(concurrency);
            }
            _ => warn!(value = %val, "invalid HC_CONCURRENCY, must be 1-{}", MAX_CONCURRENCY),
        }
    }

    // HC_TIMEOUT - per-attempt probe timeout
    if let Some(val) = lookup("HC_TIMEOUT") {
        match parse_timeout_string(&val) {
            Some(timeout) => env_config.timeout = Some(timeout),
            None => warn!(value = %val, "invalid HC_TIMEOUT, use a format like '4s'"),
        }
    }

    // HC_DIR - list directory
    if let Some(val) = lookup("HC_DIR") {
        if !val.trim().is_empty() {
            env_config.dir = Some(PathBuf::from(val.trim()));
        }
    }

    // HC_SOURCES - comma-separated list URLs
    if let Some(val) = lookup("HC_SOURCES") {
        let sources: Vec<Source> = val
            .split(',')
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .filter(|url| match validate_source_url(url) {
                Ok(()) => true,
                Err(e) => {
                    warn!(error = %e, "ignoring HC_SOURCES entry");
                    false
                }
            })
            .map(Source::new)
            .collect();
        if !sources.is_empty() {
            env_config.sources = Some(sources);
        }
    }

    // HC_SKIP_UNREADABLE - skip unreadable list files
    if let Some(val) = lookup("HC_SKIP_UNREADABLE") {
        match parse_bool(&val) {
            Some(flag) => env_config.skip_unreadable = Some(flag),
            None => warn!(value = %val, "invalid HC_SKIP_UNREADABLE, use true/false"),
        }
    }

    // HC_CONFIG - explicit config file
    if let Some(val) = lookup("HC_CONFIG") {
        if !val.trim().is_empty() {
            env_config.config = Some(val.trim().to_string());
        }
    }

    env_config
}

fn parse_bool(val: &str) -> Option<bool> {
    match val.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a timeout string like "4s", "30s", "2m" or a bare number of seconds.
///
/// Zero is rejected.
pub fn parse_timeout_string(timeout_str: &str) -> Option<Duration> {
    let timeout_str = timeout_str.trim().to_lowercase();

    let secs = if let Some(secs) = timeout_str.strip_suffix('s') {
        secs.trim().parse::<u64>().ok()
    } else if let Some(mins) = timeout_str.strip_suffix('m') {
        mins.trim().parse::<u64>().ok().and_then(|m| m.checked_mul(60))
    } else {
        timeout_str.parse::<u64>().ok()
    }?;

    if secs == 0 {
        None
    } else {
        Some(Duration::from_secs(secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(content: &str) -> NamedTempFile {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(content.as_bytes()).unwrap();
        temp_file.flush().unwrap();
        temp_file
    }

    #[test]
    fn test_parse_timeout_string() {
        assert_eq!(parse_timeout_string("4s"), Some(Duration::from_secs(4)));
        assert_eq!(parse_timeout_string("30S"), Some(Duration::from_secs(30)));
        assert_eq!(parse_timeout_string("2m"), Some(Duration::from_secs(120)));
        assert_eq!(parse_timeout_string("5"), Some(Duration::from_secs(5)));
        assert_eq!(parse_timeout_string("0s"), None);
        assert_eq!(parse_timeout_string("invalid"), None);
    }

    #[test]
    fn test_parse_timeout_string_rejects_overflowing_minutes() {
        assert_eq!(parse_timeout_string("307445734561825861m"), None);
        assert_eq!(
            parse_timeout_string(&format!("{}m", u64::MAX / 60)),
            Some(Duration::from_secs(u64::MAX / 60 * 60))
        );
    }

    #[test]
    fn test_load_valid_config() {
        let temp_file = write_config(
            r#"
[defaults]
concurrency = 6
timeout = "3s"
dir = "lists"
skip_unreadable = true

[[sources]]
url = "https://lists.test/a.txt"

[[sources]]
url = "https://lists.test/hosts"
file_name = "b.txt"
"#,
        );

        let manager = ConfigManager::new(false);
        let config = manager.load_file(temp_file.path()).unwrap();

        let defaults = config.defaults.unwrap();
        assert_eq!(defaults.concurrency, Some(6));
        assert_eq!(defaults.timeout.as_deref(), Some("3s"));
        assert_eq!(defaults.dir, Some(PathBuf::from("lists")));
        assert_eq!(defaults.skip_unreadable, Some(true));

        let sources = config.sources.unwrap();
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].target_file_name(), "a.txt");
        assert_eq!(sources[1].target_file_name(), "b.txt");
    }

    #[test]
    fn test_invalid_concurrency() {
        let temp_file = write_config("[defaults]\nconcurrency = 0\n");
        let result = ConfigManager::new(false).load_file(temp_file.path());
        assert!(matches!(result, Err(HostCheckError::ConfigError { .. })));
    }

    #[test]
    fn test_invalid_timeout() {
        let temp_file = write_config("[defaults]\ntimeout = \"soon\"\n");
        let result = ConfigManager::new(false).load_file(temp_file.path());
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_source_scheme() {
        let temp_file = write_config("[[sources]]\nurl = \"ftp://lists.test/a.txt\"\n");
        let result = ConfigManager::new(false).load_file(temp_file.path());
        assert!(matches!(result, Err(HostCheckError::ConfigError { .. })));
    }

    #[test]
    fn test_source_file_name_must_stay_in_list_dir() {
        for name in ["../escaped.txt", "/tmp/hosts.txt", "lists/a.txt"] {
            let temp_file = write_config(&format!(
                "[[sources]]\nurl = \"https://lists.test/a.txt\"\nfile_name = \"{}\"\n",
                name
            ));
            let result = ConfigManager::new(false).load_file(temp_file.path());
            assert!(
                matches!(result, Err(HostCheckError::ConfigError { .. })),
                "{}",
                name
            );
        }
    }

    #[test]
    fn test_malformed_toml() {
        let temp_file = write_config("[defaults\nconcurrency = ");
        let result = ConfigManager::new(false).load_file(temp_file.path());
        assert!(matches!(result, Err(HostCheckError::ConfigError { .. })));
    }

    #[test]
    fn test_missing_file() {
        let result = ConfigManager::new(false).load_file("/definitely/not/here.toml");
        assert!(matches!(result, Err(HostCheckError::FileError { .. })));
    }

    #[test]
    fn test_merge_configs() {
        let manager = ConfigManager::new(false);

        let lower = FileConfig {
            defaults: Some(DefaultsConfig {
                concurrency: Some(4),
                timeout: Some("4s".to_string()),
                ..Default::default()
            }),
            sources: Some(vec![Source::new("https://lists.test/lower.txt")]),
        };

        let higher = FileConfig {
            defaults: Some(DefaultsConfig {
                concurrency: Some(8),
                dir: Some(PathBuf::from("custom")),
                ..Default::default()
            }),
            sources: None,
        };

        let merged = manager.merge_configs(lower, higher);
        let defaults = merged.defaults.unwrap();

        assert_eq!(defaults.concurrency, Some(8)); // Higher wins
        assert_eq!(defaults.timeout.as_deref(), Some("4s")); // Lower preserved
        assert_eq!(defaults.dir, Some(PathBuf::from("custom")));
        assert_eq!(merged.sources.unwrap()[0].url, "https://lists.test/lower.txt");
    }

    #[test]
    fn test_merge_sources_replace() {
        let manager = ConfigManager::new(false);
        let lower = FileConfig {
            sources: Some(vec![
                Source::new("https://lists.test/a.txt"),
                Source::new("https://lists.test/b.txt"),
            ]),
            ..Default::default()
        };
        let higher = FileConfig {
            sources: Some(vec![Source::new("https://lists.test/c.txt")]),
            ..Default::default()
        };

        let merged = manager.merge_configs(lower, higher);
        let sources = merged.sources.unwrap();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].url, "https://lists.test/c.txt");
    }

    #[test]
    fn test_env_config() {
        let vars: HashMap<&str, &str> = [
            ("HC_CONCURRENCY", "12"),
            ("HC_TIMEOUT", "2s"),
            ("HC_DIR", "/tmp/lists"),
            ("HC_SOURCES", "https://lists.test/a.txt, ftp://nope/b.txt ,https://lists.test/c.txt"),
            ("HC_SKIP_UNREADABLE", "yes"),
        ]
        .into_iter()
        .collect();

        let env_config = env_config_from(|key| vars.get(key).map(|v| v.to_string()));
        assert_eq!(env_config.concurrency, Some(12));
        assert_eq!(env_config.timeout, Some(Duration::from_secs(2)));
        assert_eq!(env_config.dir, Some(PathBuf::from("/tmp/lists")));
        assert_eq!(env_config.skip_unreadable, Some(true));
        let sources = env_config.sources.unwrap();
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[1].url, "https://lists.test/c.txt");
        assert_eq!(env_config.config, None);
    }

    #[test]
    fn test_env_config_ignores_invalid_values() {
        let vars: HashMap<&str, &str> = [
            ("HC_CONCURRENCY", "0"),
            ("HC_TIMEOUT", "later"),
            ("HC_SKIP_UNREADABLE", "maybe"),
            ("HC_DIR", "   "),
        ]
        .into_iter()
        .collect();

        let env_config = env_config_from(|key| vars.get(key).map(|v| v.to_string()));
        assert_eq!(env_config.concurrency, None);
        assert_eq!(env_config.timeout, None);
        assert_eq!(env_config.skip_unreadable, None);
        assert_eq!(env_config.dir, None);
    }
}
