//! Main host checker implementation.
//!
//! This module provides the `HostChecker` struct that ties the pipeline
//! together: download lists, collect domains, probe them concurrently.

use crate::collect::collect_domains;
use crate::concurrent::{ConcurrentProcessor, ResultStream};
use crate::error::HostCheckError;
use crate::fetch::{download_client, download_sources, ensure_dir, DownloadOutcome};
use crate::probe::Prober;
use crate::types::{CheckConfig, Domain, ProbeResult};
use std::collections::HashSet;

/// Coordinates list download, domain collection and probing.
///
/// # Example
///
/// ```rust,no_run
/// use host_check_lib::{CheckConfig, HostChecker};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let checker = HostChecker::with_config(CheckConfig::default().with_download(false))?;
///     let domains = checker.collect().await?;
///     let results = checker.check_domains(domains.into_iter().collect()).await?;
///     for result in results {
///         println!("{} {}", result.status.tag(), result.domain);
///     }
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct HostChecker {
    /// Configuration settings for this checker instance
    config: CheckConfig,
    /// Shared prober; clones reuse its connection pool
    prober: Prober,
    processor: ConcurrentProcessor,
}

impl HostChecker {
    /// Create a checker with default configuration.
    pub fn new() -> Result<Self, HostCheckError> {
        Self::with_config(CheckConfig::default())
    }

    /// Create a checker with custom configuration.
    ///
    /// # Example
    ///
    /// ```rust
    /// use host_check_lib::{CheckConfig, HostChecker};
    /// use std::time::Duration;
    ///
    /// let config = CheckConfig::default()
    ///     .with_concurrency(16)
    ///     .with_timeout(Duration::from_secs(2));
    /// let checker = HostChecker::with_config(config).unwrap();
    /// assert_eq!(checker.config().concurrency, 16);
    /// ```
    pub fn with_config(config: CheckConfig) -> Result<Self, HostCheckError> {
        let prober = Prober::with_config(config.timeout, config.protocols.clone())?;
        let processor = ConcurrentProcessor::new(config.concurrency);

        Ok(Self {
            config,
            prober,
            processor,
        })
    }

    /// Probe a single domain.
    pub async fn check_domain(&self, domain: &str) -> ProbeResult {
        self.prober.probe(&Domain::from(domain)).await
    }

    /// Probe a batch and return every result once all workers are idle.
    ///
    /// Results are in completion order, one per input domain.
    pub async fn check_domains(
        &self,
        domains: Vec<Domain>,
    ) -> Result<Vec<ProbeResult>, HostCheckError> {
        let prober = self.prober.clone();
        self.processor
            .run_collect(domains, move |domain| {
                let prober = prober.clone();
                async move { prober.probe(&domain).await }
            })
            .await
    }

    /// Probe a batch and stream results as they complete.
    pub fn check_domains_stream(&self, domains: Vec<Domain>) -> ResultStream {
        let prober = self.prober.clone();
        self.processor.run(domains, move |domain| {
            let prober = prober.clone();
            async move { prober.probe(&domain).await }
        })
    }

    /// Create the list directory and download every configured source.
    ///
    /// A directory that cannot be created is an error; individual download
    /// failures are reported in the outcomes. Returns no outcomes when the
    /// download step is disabled.
    pub async fn fetch_sources(&self) -> Result<Vec<DownloadOutcome>, HostCheckError> {
        ensure_dir(&self.config.list_dir).await?;

        if !self.config.download || self.config.sources.is_empty() {
            return Ok(Vec::new());
        }

        let client = download_client(self.config.download_timeout)?;
        Ok(download_sources(&client, &self.config.sources, &self.config.list_dir).await)
    }

    /// Collect the unique domains of the configured list directory.
    pub async fn collect(&self) -> Result<HashSet<Domain>, HostCheckError> {
        collect_domains(&self.config.list_dir, self.config.unreadable).await
    }

    /// Get the current configuration for this checker.
    pub fn config(&self) -> &CheckConfig {
        &self.config
    }
}
