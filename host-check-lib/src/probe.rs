//! HTTP(S) reachability probing for a single domain.
//!
//! A probe is an ordered list of protocol attempts (HTTPS, then HTTP by
//! default). Each attempt is reduced to an [`AttemptOutcome`] and judged by
//! the same rule:
//!
//! - any HTTP response, whatever its status code, means **OK**;
//! - a DNS resolution failure means **WARN**, and no further attempt is made;
//! - anything else (refused, reset, TLS failure, timeout) moves on to the
//!   next protocol.
//!
//! When every attempt is exhausted the domain is **ERROR** / "not reachable".

use crate::error::HostCheckError;
use crate::types::{Domain, ProbeResult, Protocol, DEFAULT_TIMEOUT};
use std::error::Error as StdError;
use std::time::{Duration, Instant};
use tracing::debug;

/// Detail attached to ERROR results.
pub const NOT_REACHABLE: &str = "not reachable";

/// Resolver code for "host not found".
pub const DNS_NOT_FOUND: &str = "EAI_NONAME";

/// Resolver code for "resolver temporarily unavailable".
pub const DNS_TRY_AGAIN: &str = "EAI_AGAIN";

/// Resolver code for any other name resolution failure.
pub const DNS_FAILURE: &str = "EAI_FAIL";

/// What a single protocol attempt produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// The server answered with an HTTP response
    Responded { status: u16 },
    /// The host name could not be resolved
    DnsFailure { code: String },
    /// No response and no DNS failure (refused, timeout, TLS error...)
    NoResponse { reason: String },
}

impl AttemptOutcome {
    /// Whether this attempt settles the result, so later protocols are skipped.
    pub fn is_decisive(&self) -> bool {
        !matches!(self, AttemptOutcome::NoResponse { .. })
    }

    /// Verdict for this attempt, or `None` when the next protocol should be tried.
    pub fn verdict(&self, domain: &Domain, protocol: Protocol) -> Option<ProbeResult> {
        match self {
            AttemptOutcome::Responded { .. } => Some(ProbeResult::ok(domain.clone(), protocol)),
            AttemptOutcome::DnsFailure { code } => {
                Some(ProbeResult::warn(domain.clone(), protocol, code.clone()))
            }
            AttemptOutcome::NoResponse { .. } => None,
        }
    }
}

/// Classify a sequence of attempts, short-circuiting on the first OK or WARN.
///
/// Attempts after the deciding one are ignored.
pub fn classify_attempts<I>(domain: &Domain, attempts: I) -> ProbeResult
where
    I: IntoIterator<Item = (Protocol, AttemptOutcome)>,
{
    attempts
        .into_iter()
        .find_map(|(protocol, outcome)| outcome.verdict(domain, protocol))
        .unwrap_or_else(|| ProbeResult::error(domain.clone(), NOT_REACHABLE))
}

/// Inspect an error chain for a name resolution failure.
///
/// Returns the resolver code when any error in the chain is a DNS failure,
/// `None` otherwise.
pub fn dns_failure_code(err: &(dyn StdError + 'static)) -> Option<&'static str> {
    let mut messages = Vec::new();
    let mut current: Option<&(dyn StdError + 'static)> = Some(err);
    while let Some(e) = current {
        messages.push(e.to_string().to_lowercase());
        current = e.source();
    }
    let chain = messages.join(": ");

    let try_again = chain.contains("temporary failure in name resolution")
        || chain.contains("temporary error during hostname resolution");
    let not_found = chain.contains("name or service not known")
        || chain.contains("nodename nor servname provided")
        || chain.contains("no address associated with hostname")
        || chain.contains("no such host is known");
    let is_dns = try_again
        || not_found
        || chain.contains("dns error")
        || chain.contains("failed to lookup address");

    if !is_dns {
        None
    } else if try_again {
        Some(DNS_TRY_AGAIN)
    } else if not_found {
        Some(DNS_NOT_FOUND)
    } else {
        Some(DNS_FAILURE)
    }
}

/// Probes domains over HTTP(S) with a fixed per-attempt timeout.
///
/// Cloning is cheap; clones share the connection pool.
#[derive(Clone)]
pub struct Prober {
    /// HTTP client used for every attempt
    http_client: reqwest::Client,
    /// Timeout for each protocol attempt
    timeout: Duration,
    /// Attempt order
    protocols: Vec<Protocol>,
}

impl Prober {
    /// Create a prober with the default 4 second timeout, HTTPS then HTTP.
    pub fn new() -> Result<Self, HostCheckError> {
        Self::with_config(DEFAULT_TIMEOUT, vec![Protocol::Https, Protocol::Http])
    }

    /// Create a prober with a custom timeout and protocol order.
    pub fn with_config(
        timeout: Duration,
        protocols: Vec<Protocol>,
    ) -> Result<Self, HostCheckError> {
        // Redirects are not followed: a 3xx already proves the host answers.
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| {
                HostCheckError::network_with_source(
                    "Failed to create probe HTTP client",
                    e.to_string(),
                )
            })?;

        Ok(Self {
            http_client,
            timeout,
            protocols,
        })
    }

    /// Probe one domain.
    ///
    /// Never fails: every failure mode is folded into the returned result.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use host_check_lib::{Domain, Prober};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let prober = Prober::new()?;
    ///     let result = prober.probe(&Domain::from("example.com")).await;
    ///     println!("{} {}", result.status, result.domain);
    ///     Ok(())
    /// }
    /// ```
    pub async fn probe(&self, domain: &Domain) -> ProbeResult {
        let start_time = Instant::now();
        let mut attempts = Vec::with_capacity(self.protocols.len());

        for &protocol in &self.protocols {
            let outcome = self.attempt(domain, protocol).await;
            debug!(domain = %domain, %protocol, ?outcome, "probe attempt finished");

            let decisive = outcome.is_decisive();
            attempts.push((protocol, outcome));
            if decisive {
                break;
            }
        }

        if !attempts.iter().any(|(_, outcome)| outcome.is_decisive()) {
            debug!(domain = %domain, "all protocol attempts failed");
        }
        classify_attempts(domain, attempts).with_duration(start_time.elapsed())
    }

    /// Run one protocol attempt and reduce it to an outcome.
    async fn attempt(&self, domain: &Domain, protocol: Protocol) -> AttemptOutcome {
        let url = protocol.url_for(domain.as_str());
        let request = self.http_client.get(&url).send();

        match tokio::time::timeout(self.timeout, request).await {
            Ok(Ok(response)) => AttemptOutcome::Responded {
                status: response.status().as_u16(),
            },
            Ok(Err(e)) => {
                if let Some(code) = dns_failure_code(&e) {
                    AttemptOutcome::DnsFailure {
                        code: code.to_string(),
                    }
                } else if let Some(status) = e.status() {
                    AttemptOutcome::Responded {
                        status: status.as_u16(),
                    }
                } else {
                    AttemptOutcome::NoResponse {
                        reason: describe_transport_error(&e),
                    }
                }
            }
            Err(_) => AttemptOutcome::NoResponse {
                reason: format!("timed out after {:?}", self.timeout),
            },
        }
    }
}

/// Short reason for a transport failure, used in debug logs.
fn describe_transport_error(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        "timed out".to_string()
    } else if err.is_connect() {
        let mut root: &(dyn StdError + 'static) = err;
        while let Some(source) = root.source() {
            root = source;
        }
        format!("connection failed: {}", root)
    } else if err.is_builder() {
        format!("invalid url: {}", err)
    } else {
        err.to_string()
    }
}
