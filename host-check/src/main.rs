//! Host Check CLI Application
//!
//! Downloads hosts-style lists, collects the unique domains they name and
//! reports which ones still answer over HTTPS or HTTP.

mod logging;
mod ui;

use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::Parser;
use futures::StreamExt;
use host_check_lib::{
    load_env_config, parse_timeout_string, validate_source_url, CheckConfig, ConfigManager,
    Domain, EnvConfig, FileConfig, HostCheckError, HostChecker, OutputMode, ProbeResult, Source,
    UnreadablePolicy, MAX_CONCURRENCY,
};
use std::path::PathBuf;
use std::process;
use std::time::Instant;
use tracing::{debug, info};

const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

/// CLI arguments for host-check
#[derive(Parser, Debug)]
#[command(name = "host-check")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Check which domains in hosts-style lists still answer over HTTP(S)")]
#[command(
    long_about = "Download hosts-style lists into a directory, collect the unique domains they name, and probe each one over HTTPS with HTTP fallback.\n\nEach domain is reported as [OK] (any HTTP response), [WARN] (DNS resolution failed) or [ERROR] (not reachable)."
)]
#[command(styles = STYLES)]
pub struct Args {
    /// Extra domains to check alongside the collected lists
    #[arg(value_name = "DOMAINS", help_heading = "Lists")]
    pub domains: Vec<String>,

    /// List directory (default: ./whitelists)
    #[arg(short = 'd', long = "dir", value_name = "DIR", help_heading = "Lists")]
    pub dir: Option<PathBuf>,

    /// Remote list to download (comma-separated or multiple -s flags)
    #[arg(short = 's', long = "source", value_name = "URL", value_delimiter = ',', action = clap::ArgAction::Append, help_heading = "Lists")]
    pub sources: Option<Vec<String>>,

    /// Skip the download step and use the directory as-is
    #[arg(long = "no-download", help_heading = "Lists")]
    pub no_download: bool,

    /// Skip unreadable list files instead of failing
    #[arg(long = "skip-unreadable", help_heading = "Lists")]
    pub skip_unreadable: bool,

    /// Max concurrent probes (default: min(cores, 8), max: 100)
    #[arg(short = 'c', long = "concurrency", value_name = "N", help_heading = "Probing")]
    pub concurrency: Option<usize>,

    /// Per-attempt timeout, e.g. 4s
    #[arg(short = 't', long = "timeout", value_name = "DURATION", help_heading = "Probing")]
    pub timeout: Option<String>,

    /// Collect all results before printing
    #[arg(long = "batch", help_heading = "Output Format")]
    pub batch: bool,

    /// Output results in JSON format (implies --batch)
    #[arg(short = 'j', long = "json", help_heading = "Output Format")]
    pub json: bool,

    /// Use specific config file instead of automatic discovery
    #[arg(long = "config", value_name = "FILE", help_heading = "Configuration")]
    pub config: Option<String>,

    /// Verbose logging
    #[arg(short = 'v', long = "verbose", help_heading = "Configuration")]
    pub verbose: bool,

    /// Debug logging and per-probe timings
    #[arg(long = "debug", help_heading = "Configuration")]
    pub debug: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    if let Err(e) = validate_args(&args) {
        ui::print_fatal(&e);
        process::exit(1);
    }

    logging::init_logging(args.verbose, args.debug);

    if let Err(e) = run_host_check(args).await {
        ui::print_fatal(&e);
        process::exit(1);
    }
}

/// Validate command line arguments
fn validate_args(args: &Args) -> Result<(), String> {
    if let Some(concurrency) = args.concurrency {
        if concurrency == 0 || concurrency > MAX_CONCURRENCY {
            return Err(format!(
                "Concurrency must be between 1 and {}",
                MAX_CONCURRENCY
            ));
        }
    }

    if let Some(timeout) = &args.timeout {
        if parse_timeout_string(timeout).is_none() {
            return Err(format!(
                "Invalid timeout '{}'. Use format like '4s', '30s', '2m'",
                timeout
            ));
        }
    }

    if let Some(sources) = &args.sources {
        for url in sources {
            validate_source_url(url).map_err(|e| e.to_string())?;
        }
    }

    Ok(())
}

async fn run_host_check(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = build_config(&args)?;
    debug!(?config, "resolved configuration");

    let checker = HostChecker::with_config(config)?;

    // Info lines move to stderr when stdout carries JSON.
    let notices_to_stderr = args.json;

    for outcome in checker.fetch_sources().await? {
        ui::print_download(&outcome, notices_to_stderr);
    }

    let mut domains = checker.collect().await?;
    domains.extend(
        args.domains
            .iter()
            .map(|d| d.trim())
            .filter(|d| !d.is_empty())
            .map(Domain::from),
    );
    ui::print_found(domains.len(), notices_to_stderr);

    let mut domains: Vec<Domain> = domains.into_iter().collect();
    domains.sort();

    let mode = output_mode(&args);
    debug!(%mode, domains = domains.len(), "starting probes");

    match mode {
        OutputMode::Streaming => run_streaming_check(&checker, domains, &args).await,
        OutputMode::Collected => run_batch_check(&checker, domains, &args).await,
    }
}

/// Streaming unless --batch or --json asks for collected output.
fn output_mode(args: &Args) -> OutputMode {
    if args.batch || args.json {
        OutputMode::Collected
    } else {
        OutputMode::Streaming
    }
}

/// Print each result as soon as its probe completes.
async fn run_streaming_check(
    checker: &HostChecker,
    domains: Vec<Domain>,
    args: &Args,
) -> Result<(), Box<dyn std::error::Error>> {
    let start_time = Instant::now();
    let mut stream = checker.check_domains_stream(domains);
    let expected = stream.expected();
    let mut tally = ui::Tally::default();

    while let Some(result) = stream.next().await {
        tally.record(&result);
        ui::print_result(&result, args.debug);
    }

    if tally.total() != expected {
        return Err(HostCheckError::internal(format!(
            "{} of {} probes did not report a result",
            expected - tally.total(),
            expected
        ))
        .into());
    }

    if expected > 1 {
        ui::print_summary(&tally, start_time.elapsed());
    }
    Ok(())
}

/// Wait for every probe, then print the results sorted by domain.
async fn run_batch_check(
    checker: &HostChecker,
    domains: Vec<Domain>,
    args: &Args,
) -> Result<(), Box<dyn std::error::Error>> {
    let start_time = Instant::now();
    let mut results = checker.check_domains(domains).await?;
    let duration = start_time.elapsed();
    results.sort_by(|a, b| a.domain.cmp(&b.domain));

    display_results(&results, args, duration)
}

fn display_results(
    results: &[ProbeResult],
    args: &Args,
    duration: std::time::Duration,
) -> Result<(), Box<dyn std::error::Error>> {
    if args.json {
        let json = serde_json::to_string_pretty(results)?;
        println!("{}", json);
        return Ok(());
    }

    for result in results {
        ui::print_result(result, args.debug);
    }
    if results.len() > 1 {
        let tally: ui::Tally = results.iter().collect();
        ui::print_summary(&tally, duration);
    }
    Ok(())
}

/// Build CheckConfig from CLI arguments with config file integration.
///
/// Precedence order (highest to lowest):
/// 1. CLI arguments (explicit user input)
/// 2. Environment variables (HC_*)
/// 3. Local config file (./host-check.toml or ./.host-check.toml)
/// 4. Global config file (~/.host-check.toml)
/// 5. XDG config file (~/.config/host-check/config.toml)
/// 6. Built-in defaults
fn build_config(args: &Args) -> Result<CheckConfig, Box<dyn std::error::Error>> {
    let config_manager = ConfigManager::new(args.verbose);
    let env_config = load_env_config();

    let file_config = if let Some(explicit_config_path) = &args.config {
        info!(path = %explicit_config_path, "using config file from --config");
        config_manager
            .load_file(explicit_config_path)
            .map_err(|e| format!("Failed to load config file '{}': {}", explicit_config_path, e))?
    } else if let Some(env_config_path) = &env_config.config {
        info!(path = %env_config_path, "using config file from HC_CONFIG");
        config_manager
            .load_file(env_config_path)
            .map_err(|e| format!("Failed to load config file '{}': {}", env_config_path, e))?
    } else {
        debug!("discovering config files");
        config_manager.discover_and_load()?
    };

    resolve_config(args, file_config, env_config)
}

/// Layer file, environment and CLI settings over the defaults.
fn resolve_config(
    args: &Args,
    file_config: FileConfig,
    env_config: EnvConfig,
) -> Result<CheckConfig, Box<dyn std::error::Error>> {
    let config = merge_file_config_into_check_config(CheckConfig::default(), file_config)?;
    let config = apply_environment_config(config, env_config);
    apply_cli_args_to_config(config, args)
}

/// Merge FileConfig into CheckConfig
fn merge_file_config_into_check_config(
    mut config: CheckConfig,
    file_config: FileConfig,
) -> Result<CheckConfig, HostCheckError> {
    if let Some(defaults) = file_config.defaults {
        if let Some(concurrency) = defaults.concurrency {
            config = config.with_concurrency(concurrency);
        }
        if let Some(timeout) = defaults.timeout.as_deref() {
            let timeout = parse_timeout_string(timeout)
                .ok_or_else(|| HostCheckError::config(format!("Invalid timeout '{}'", timeout)))?;
            config = config.with_timeout(timeout);
        }
        if let Some(timeout) = defaults.download_timeout.as_deref() {
            let timeout = parse_timeout_string(timeout).ok_or_else(|| {
                HostCheckError::config(format!("Invalid download_timeout '{}'", timeout))
            })?;
            config = config.with_download_timeout(timeout);
        }
        if let Some(dir) = defaults.dir {
            config = config.with_list_dir(dir);
        }
        if let Some(skip) = defaults.skip_unreadable {
            config = config.with_unreadable_policy(policy_for(skip));
        }
        if let Some(download) = defaults.download {
            config = config.with_download(download);
        }
    }

    if let Some(sources) = file_config.sources {
        config = config.with_sources(sources);
    }

    Ok(config)
}

/// Apply environment variable configuration to CheckConfig.
fn apply_environment_config(mut config: CheckConfig, env_config: EnvConfig) -> CheckConfig {
    if let Some(concurrency) = env_config.concurrency {
        config = config.with_concurrency(concurrency);
    }
    if let Some(timeout) = env_config.timeout {
        config = config.with_timeout(timeout);
    }
    if let Some(dir) = env_config.dir {
        config = config.with_list_dir(dir);
    }
    if let Some(sources) = env_config.sources {
        config = config.with_sources(sources);
    }
    if let Some(skip) = env_config.skip_unreadable {
        config = config.with_unreadable_policy(policy_for(skip));
    }
    config
}

/// Apply CLI arguments to CheckConfig (highest precedence).
fn apply_cli_args_to_config(
    mut config: CheckConfig,
    args: &Args,
) -> Result<CheckConfig, Box<dyn std::error::Error>> {
    if let Some(concurrency) = args.concurrency {
        config = config.with_concurrency(concurrency);
    }
    if let Some(timeout) = &args.timeout {
        let timeout = parse_timeout_string(timeout)
            .ok_or_else(|| format!("Invalid timeout '{}'", timeout))?;
        config = config.with_timeout(timeout);
    }
    if let Some(dir) = &args.dir {
        config = config.with_list_dir(dir.clone());
    }
    if let Some(sources) = &args.sources {
        config = config.with_sources(sources.iter().map(Source::new).collect());
    }
    // Flags only ever switch behaviour on; absence leaves lower layers alone.
    if args.no_download {
        config = config.with_download(false);
    }
    if args.skip_unreadable {
        config = config.with_unreadable_policy(UnreadablePolicy::Skip);
    }
    Ok(config)
}

fn policy_for(skip_unreadable: bool) -> UnreadablePolicy {
    if skip_unreadable {
        UnreadablePolicy::Skip
    } else {
        UnreadablePolicy::Fail
    }
}
