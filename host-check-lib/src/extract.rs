//! Domain extraction from hosts-style list lines.
//!
//! Accepted line shapes:
//!
//! ```text
//! example.com
//! 0.0.0.0 ads.example.com
//! 127.0.0.1 tracker.io   # trailing text is ignored
//! ```

use crate::types::Domain;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Optional null/loopback address, then a `label(.label)+` host whose
    /// last label is alphabetic and at least two characters long.
    static ref HOSTS_LINE: Regex = Regex::new(
        r"^(?:(?:0\.0\.0\.0|127\.0\.0\.1)\s+)?([A-Za-z0-9_-]+(?:\.[A-Za-z0-9_-]+)*\.[A-Za-z]{2,})"
    )
    .expect("hosts line pattern is valid");
}

/// Extract the domain from a single list line.
///
/// Returns `None` for blank lines, `#` comments and lines without a
/// host-shaped token at the start. Never fails.
///
/// # Example
///
/// ```rust
/// use host_check_lib::extract_domain;
///
/// assert_eq!(extract_domain("0.0.0.0 ads.example.com").unwrap().as_str(), "ads.example.com");
/// assert!(extract_domain("# comment").is_none());
/// ```
pub fn extract_domain(line: &str) -> Option<Domain> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }

    HOSTS_LINE
        .captures(line)
        .and_then(|caps| caps.get(1))
        .map(|m| Domain::from(m.as_str()))
}

/// Apply [`extract_domain`] to every line of a text blob, in order.
///
/// Duplicates are kept; deduplication is the collector's job.
pub fn extract_domains(text: &str) -> impl Iterator<Item = Domain> + '_ {
    text.lines().filter_map(extract_domain)
}
