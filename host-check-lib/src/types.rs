//! Core data types for collection and reachability checking.
//!
//! This module defines the domain newtype, probe results, list sources and
//! the runtime configuration shared by the collector, prober and scheduler.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

/// Upper bound for the default concurrency cap.
pub const MAX_DEFAULT_CONCURRENCY: usize = 8;

/// Hard limit accepted from configuration or the command line.
pub const MAX_CONCURRENCY: usize = 100;

/// Per-attempt timeout used when nothing else is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(4);

/// Directory the lists are downloaded to and collected from.
pub const DEFAULT_LIST_DIR: &str = "whitelists";

/// The list downloaded when no sources are configured.
pub const DEFAULT_SOURCE_URL: &str =
    "https://raw.githubusercontent.com/anudeepND/whitelist/refs/heads/master/domains/whitelist.txt";

/// A host name extracted from a list file (e.g. `example.com`).
///
/// Immutable once created. Equality is case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Domain(String);

impl Domain {
    /// Wrap a host string without further validation.
    pub fn new<S: Into<String>>(host: S) -> Self {
        Self(host.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Domain {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for Domain {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Domain {
    fn from(host: &str) -> Self {
        Self(host.to_string())
    }
}

impl From<String> for Domain {
    fn from(host: String) -> Self {
        Self(host)
    }
}

/// Protocol used for a single probe attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Https,
    Http,
}

impl Protocol {
    /// URL scheme for this protocol.
    pub fn scheme(&self) -> &'static str {
        match self {
            Protocol::Https => "https",
            Protocol::Http => "http",
        }
    }

    /// Build the bare URL probed for `domain` (no path).
    pub fn url_for(&self, domain: &str) -> String {
        format!("{}://{}", self.scheme(), domain)
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.scheme())
    }
}

/// Reachability verdict for a domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeStatus {
    /// The host produced an HTTP(S) response, whatever the status code
    Ok,
    /// DNS resolution failed
    Warn,
    /// Neither protocol produced a response or a DNS failure
    Error,
}

impl ProbeStatus {
    /// Console tag, e.g. `[OK]`.
    pub fn tag(&self) -> &'static str {
        match self {
            ProbeStatus::Ok => "[OK]",
            ProbeStatus::Warn => "[WARN]",
            ProbeStatus::Error => "[ERROR]",
        }
    }
}

impl fmt::Display for ProbeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeStatus::Ok => write!(f, "OK"),
            ProbeStatus::Warn => write!(f, "WARN"),
            ProbeStatus::Error => write!(f, "ERROR"),
        }
    }
}

/// Outcome of probing one domain.
///
/// Created exactly once per domain by the prober and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeResult {
    /// The domain that was probed
    pub domain: Domain,

    /// Classified verdict
    pub status: ProbeStatus,

    /// DNS code for WARN, failure reason for ERROR
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,

    /// Protocol attempt that produced the verdict (absent for ERROR)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol: Option<Protocol>,

    /// How long the whole probe took
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_duration: Option<Duration>,
}

impl ProbeResult {
    pub fn ok(domain: Domain, protocol: Protocol) -> Self {
        Self {
            domain,
            status: ProbeStatus::Ok,
            detail: None,
            protocol: Some(protocol),
            check_duration: None,
        }
    }

    pub fn warn<D: Into<String>>(domain: Domain, protocol: Protocol, code: D) -> Self {
        Self {
            domain,
            status: ProbeStatus::Warn,
            detail: Some(code.into()),
            protocol: Some(protocol),
            check_duration: None,
        }
    }

    pub fn error<D: Into<String>>(domain: Domain, reason: D) -> Self {
        Self {
            domain,
            status: ProbeStatus::Error,
            detail: Some(reason.into()),
            protocol: None,
            check_duration: None,
        }
    }

    /// Attach the measured probe duration.
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.check_duration = Some(duration);
        self
    }
}

/// What the collector does with a list file it cannot read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnreadablePolicy {
    /// Abort collection with a file error
    #[default]
    Fail,
    /// Log a warning and continue with the remaining files
    Skip,
}

/// A remote list to download into the list directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    /// Where the list is fetched from
    pub url: String,

    /// File name inside the list directory (defaults to the URL's last path segment)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
}

impl Source {
    pub fn new<U: Into<String>>(url: U) -> Self {
        Self {
            url: url.into(),
            file_name: None,
        }
    }

    /// The file name the list is stored under.
    ///
    /// Falls back to the last non-empty URL path segment, then to `list.txt`.
    /// A configured name that is not a plain file name is never used.
    pub fn target_file_name(&self) -> String {
        if let Some(name) = self.file_name.as_deref().map(str::trim) {
            if is_plain_file_name(name) {
                return name.to_string();
            }
        }

        reqwest::Url::parse(&self.url)
            .ok()
            .and_then(|url| {
                url.path_segments()
                    .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
                    .map(|s| s.to_string())
            })
            .unwrap_or_else(|| "list.txt".to_string())
    }
}

/// Whether `name` is a single normal path component, so joining it onto a
/// directory stays inside that directory.
pub fn is_plain_file_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(part)), None) if part == name
    )
}

/// Output mode for displaying results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Print each result as soon as its probe completes
    Streaming,
    /// Collect every result before printing
    Collected,
}

impl fmt::Display for OutputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputMode::Streaming => write!(f, "Streaming"),
            OutputMode::Collected => write!(f, "Collected"),
        }
    }
}

/// Concurrency cap derived from the machine: `min(available_parallelism, 8)`.
pub fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .clamp(1, MAX_DEFAULT_CONCURRENCY)
}

/// Runtime configuration for collection, download and probing.
#[derive(Debug, Clone)]
pub struct CheckConfig {
    /// Maximum number of probes in flight (K)
    pub concurrency: usize,

    /// Timeout for each protocol attempt
    pub timeout: Duration,

    /// Protocol attempts in order; the first OK or WARN wins
    pub protocols: Vec<Protocol>,

    /// Directory holding the list files
    pub list_dir: PathBuf,

    /// Remote lists downloaded before collection
    pub sources: Vec<Source>,

    /// Whether to run the download step at all
    pub download: bool,

    /// Timeout for a whole list download
    pub download_timeout: Duration,

    /// Behaviour on unreadable list files
    pub unreadable: UnreadablePolicy,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            timeout: DEFAULT_TIMEOUT,
            protocols: vec![Protocol::Https, Protocol::Http],
            list_dir: PathBuf::from(DEFAULT_LIST_DIR),
            sources: vec![Source::new(DEFAULT_SOURCE_URL)],
            download: true,
            download_timeout: Duration::from_secs(30),
            unreadable: UnreadablePolicy::Fail,
        }
    }
}

impl CheckConfig {
    /// Set the concurrency cap, clamped to 1..=100.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.clamp(1, MAX_CONCURRENCY);
        self
    }

    /// Set the per-attempt timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_list_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.list_dir = dir.into();
        self
    }

    pub fn with_sources(mut self, sources: Vec<Source>) -> Self {
        self.sources = sources;
        self
    }

    pub fn with_download(mut self, enabled: bool) -> Self {
        self.download = enabled;
        self
    }

    /// Set the timeout for a whole list download.
    pub fn with_download_timeout(mut self, timeout: Duration) -> Self {
        self.download_timeout = timeout;
        self
    }

    pub fn with_unreadable_policy(mut self, policy: UnreadablePolicy) -> Self {
        self.unreadable = policy;
        self
    }

    /// Override the protocol order. An empty list keeps the current order.
    pub fn with_protocols(mut self, protocols: Vec<Protocol>) -> Self {
        if !protocols.is_empty() {
            self.protocols = protocols;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CheckConfig::default();
        assert!(config.concurrency >= 1 && config.concurrency <= MAX_DEFAULT_CONCURRENCY);
        assert_eq!(config.timeout, Duration::from_secs(4));
        assert_eq!(config.protocols, vec![Protocol::Https, Protocol::Http]);
        assert_eq!(config.sources.len(), 1);
        assert_eq!(config.unreadable, UnreadablePolicy::Fail);
    }

    #[test]
    fn test_with_concurrency_clamps() {
        assert_eq!(CheckConfig::default().with_concurrency(0).concurrency, 1);
        assert_eq!(CheckConfig::default().with_concurrency(500).concurrency, 100);
        assert_eq!(CheckConfig::default().with_concurrency(12).concurrency, 12);
    }

    #[test]
    fn test_empty_protocol_list_is_ignored() {
        let config = CheckConfig::default().with_protocols(vec![]);
        assert_eq!(config.protocols.len(), 2);
        let config = CheckConfig::default().with_protocols(vec![Protocol::Http]);
        assert_eq!(config.protocols, vec![Protocol::Http]);
    }

    #[test]
    fn test_protocol_urls() {
        assert_eq!(Protocol::Https.url_for("example.com"), "https://example.com");
        assert_eq!(Protocol::Http.url_for("127.0.0.1:1"), "http://127.0.0.1:1");
    }

    #[test]
    fn test_source_file_name() {
        let source = Source::new(DEFAULT_SOURCE_URL);
        assert_eq!(source.target_file_name(), "whitelist.txt");

        let source = Source {
            url: "https://lists.test/hosts".to_string(),
            file_name: Some("custom.txt".to_string()),
        };
        assert_eq!(source.target_file_name(), "custom.txt");

        assert_eq!(Source::new("https://lists.test/").target_file_name(), "list.txt");
        assert_eq!(Source::new("not a url").target_file_name(), "list.txt");
    }

    #[test]
    fn test_file_name_cannot_leave_list_dir() {
        for name in ["../escaped.txt", "/etc/hosts", "nested/list.txt", "..", ".", ""] {
            assert!(!is_plain_file_name(name), "{:?}", name);
            let source = Source {
                url: "https://lists.test/fallback.txt".to_string(),
                file_name: Some(name.to_string()),
            };
            assert_eq!(source.target_file_name(), "fallback.txt", "{:?}", name);
        }
        assert!(is_plain_file_name("whitelist.txt"));
        assert!(is_plain_file_name(".hidden"));
    }

    #[test]
    fn test_probe_result_serialization_skips_empty_fields() {
        let result = ProbeResult::ok(Domain::from("a.com"), Protocol::Https);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["domain"], "a.com");
        assert_eq!(json["status"], "ok");
        assert_eq!(json["protocol"], "https");
        assert!(json.get("detail").is_none());

        let result = ProbeResult::error(Domain::from("b.com"), "not reachable");
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["status"], "error");
        assert_eq!(json["detail"], "not reachable");
        assert!(json.get("protocol").is_none());
    }

    #[test]
    fn test_status_tags() {
        assert_eq!(ProbeStatus::Ok.tag(), "[OK]");
        assert_eq!(ProbeStatus::Warn.tag(), "[WARN]");
        assert_eq!(ProbeStatus::Error.tag(), "[ERROR]");
    }
}
