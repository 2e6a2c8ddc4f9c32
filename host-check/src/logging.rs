use tracing_subscriber::EnvFilter;

/// Default filter when `RUST_LOG` is unset.
fn default_directive(verbose: bool, debug: bool) -> &'static str {
    if debug {
        "debug"
    } else if verbose {
        "info"
    } else {
        "warn"
    }
}

/// Initialize structured logging to stderr, keeping stdout for results.
///
/// `RUST_LOG` takes precedence over `--verbose` and `--debug`.
pub fn init_logging(verbose: bool, debug: bool) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose, debug)));

    // A second init (tests) is harmless.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();

    tracing::debug!("host-check v{} logging initialized", env!("CARGO_PKG_VERSION"));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directive() {
        assert_eq!(default_directive(false, false), "warn");
        assert_eq!(default_directive(true, false), "info");
        assert_eq!(default_directive(false, true), "debug");
        assert_eq!(default_directive(true, true), "debug");
    }
}
