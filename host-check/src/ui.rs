//! Display logic for the host-check CLI.
//!
//! Result lines, download notices and the closing summary. Colors come from
//! the `console` crate and switch off automatically when stdout is not a
//! terminal, so piped output is the plain tagged format.

use console::style;
use host_check_lib::{DownloadOutcome, HostCheckError, ProbeResult, ProbeStatus};
use std::time::Duration;

/// Width of the tag column; `[ERROR] ` is the widest tag.
const TAG_WIDTH: usize = 8;

// ── Result lines ─────────────────────────────────────────────────────────────

/// One result line: `[OK]    d`, `[WARN]  d (code)`, `[ERROR] d (reason)`.
///
/// The tag is colored by status; `console` drops the color when stdout is
/// not a terminal. With `debug`, the probe duration is appended.
pub fn format_result_line(result: &ProbeResult, debug: bool) -> String {
    let tag = format!("{:<width$}", result.status.tag(), width = TAG_WIDTH);
    let tag = match result.status {
        ProbeStatus::Ok => style(tag).for_stdout().green(),
        ProbeStatus::Warn => style(tag).for_stdout().yellow(),
        ProbeStatus::Error => style(tag).for_stdout().red(),
    };

    let detail = result
        .detail
        .as_ref()
        .map(|d| format!(" ({})", d))
        .unwrap_or_default();

    let timing = match (debug, result.check_duration) {
        (true, Some(duration)) => {
            format!(" {}", style(format_duration(duration)).for_stdout().dim())
        }
        _ => String::new(),
    };

    format!("{}{}{}{}", tag, result.domain, detail, timing)
}

/// Print one result line to stdout.
pub fn print_result(result: &ProbeResult, debug: bool) {
    println!("{}", format_result_line(result, debug));
}

// ── Informational lines ──────────────────────────────────────────────────────

/// `[INFO] Downloaded: url` or `[WARN] Download failed: url (msg)`.
pub fn format_download_line(outcome: &DownloadOutcome) -> String {
    match &outcome.result {
        Ok(_) => format!("[INFO] Downloaded: {}", outcome.source.url),
        Err(HostCheckError::DownloadError { message, .. }) => {
            format!("[WARN] Download failed: {} ({})", outcome.source.url, message)
        }
        Err(e) => format!("[WARN] Download failed: {} ({})", outcome.source.url, e),
    }
}

/// Print a download notice. Goes to stderr when stdout carries JSON.
pub fn print_download(outcome: &DownloadOutcome, to_stderr: bool) {
    let line = format_download_line(outcome);
    if to_stderr {
        eprintln!("{}", line);
    } else {
        println!("{}", line);
    }
}

/// Print `[INFO] Found n domains`. Goes to stderr when stdout carries JSON.
pub fn print_found(count: usize, to_stderr: bool) {
    let line = format!("[INFO] Found {} domains", count);
    if to_stderr {
        eprintln!("{}", line);
    } else {
        println!("{}", line);
    }
}

/// Print the fatal marker to stderr.
pub fn print_fatal(error: &dyn std::fmt::Display) {
    eprintln!("{} {}", style("[FATAL]").red().bold(), error);
}

// ── Summary ──────────────────────────────────────────────────────────────────

/// Per-status counts for the closing summary.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Tally {
    pub ok: usize,
    pub warn: usize,
    pub error: usize,
}

impl Tally {
    pub fn record(&mut self, result: &ProbeResult) {
        match result.status {
            ProbeStatus::Ok => self.ok += 1,
            ProbeStatus::Warn => self.warn += 1,
            ProbeStatus::Error => self.error += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.ok + self.warn + self.error
    }
}

impl<'a> FromIterator<&'a ProbeResult> for Tally {
    fn from_iter<I: IntoIterator<Item = &'a ProbeResult>>(iter: I) -> Self {
        let mut tally = Tally::default();
        for result in iter {
            tally.record(result);
        }
        tally
    }
}

/// `n domains in Xs | a ok | b warn | c error`
pub fn format_summary(tally: &Tally, duration: Duration) -> String {
    format!(
        "{} domains in {:.1}s | {} ok | {} warn | {} error",
        tally.total(),
        duration.as_secs_f64(),
        tally.ok,
        tally.warn,
        tally.error
    )
}

pub fn print_summary(tally: &Tally, duration: Duration) {
    println!();
    println!("{}", style(format_summary(tally, duration)).dim());
}

// ── Helpers ──────────────────────────────────────────────────────────────────

fn format_duration(duration: Duration) -> String {
    if duration.as_millis() < 1000 {
        format!("{}ms", duration.as_millis())
    } else {
        format!("{:.1}s", duration.as_secs_f64())
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
