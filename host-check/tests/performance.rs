// host-check/tests/performance.rs

use assert_cmd::Command;
use std::fs;
use std::time::{Duration, Instant};
use tempfile::TempDir;

/// Many unreachable loopback hosts should finish in roughly
/// `ceil(n / concurrency)` rounds of refused connections, not n rounds.
#[test]
fn test_concurrent_probes_finish_quickly() {
    let home = TempDir::new().unwrap();
    let lists = home.path().join("whitelists");
    fs::create_dir(&lists).unwrap();

    let addresses: Vec<String> = (0..40)
        .map(|_| {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            format!("127.0.0.1:{}", listener.local_addr().unwrap().port())
        })
        .collect();

    let start = Instant::now();

    let mut cmd = Command::cargo_bin("host-check").unwrap();
    cmd.current_dir(home.path())
        .env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path().join(".config"))
        .env_remove("HC_CONFIG")
        .args(["--no-download", "--batch", "-c", "20", "-t", "2s"])
        .args(&addresses)
        .timeout(Duration::from_secs(30));

    cmd.assert().success();

    let duration = start.elapsed();
    assert!(
        duration.as_secs() < 30,
        "40 unreachable hosts took too long: {:?}",
        duration
    );
}
