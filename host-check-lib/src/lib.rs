//! # Host Check Library
//!
//! Collects host names from whitelist/hosts-format list files and checks
//! that each one still answers over HTTPS or HTTP.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use host_check_lib::HostChecker;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let checker = HostChecker::new()?;
//!     let result = checker.check_domain("example.com").await;
//!
//!     println!("{} {}", result.status.tag(), result.domain);
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **List Download**: Fetch remote lists into a local directory
//! - **Hosts-format Parsing**: Plain names and `0.0.0.0`/`127.0.0.1` entries
//! - **Reachability Probing**: HTTPS first, HTTP fallback, DNS failures flagged
//! - **Bounded Concurrency**: A fixed worker pool drains a shared queue

// Re-export main public API types and functions
pub use checker::HostChecker;
pub use collect::{collect_domains, collect_domains_from_files, read_list_file};
pub use concurrent::{ConcurrentProcessor, ResultStream, WorkQueue};
pub use config::{
    env_config_from, load_env_config, parse_timeout_string, validate_source_url, ConfigManager,
    DefaultsConfig, EnvConfig, FileConfig,
};
pub use error::HostCheckError;
pub use extract::{extract_domain, extract_domains};
pub use fetch::{download_client, download_source, download_sources, ensure_dir, DownloadOutcome};
pub use probe::{
    classify_attempts, dns_failure_code, AttemptOutcome, Prober, DNS_FAILURE, DNS_NOT_FOUND,
    DNS_TRY_AGAIN, NOT_REACHABLE,
};
pub use types::{
    default_concurrency, CheckConfig, Domain, OutputMode, ProbeResult, ProbeStatus, Protocol,
    Source, UnreadablePolicy, DEFAULT_LIST_DIR, DEFAULT_SOURCE_URL, DEFAULT_TIMEOUT,
    MAX_CONCURRENCY, MAX_DEFAULT_CONCURRENCY,
};

// Internal modules - reached through the re-exports above
mod checker;
mod collect;
mod concurrent;
mod config;
mod error;
mod extract;
mod fetch;
mod probe;
mod types;

// Type alias for convenience
pub type Result<T> = std::result::Result<T, HostCheckError>;

// Library version and metadata
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
