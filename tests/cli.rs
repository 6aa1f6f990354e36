use assert_cmd::Command;
use domain_scout::{DomainCache, DomainOutcome};
use predicates::prelude::*;
use tempfile::TempDir;

fn scout() -> Command {
    let mut cmd = Command::cargo_bin("domain-scout").unwrap();
    cmd.env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_help() {
    scout()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("USAGE:"))
        .stdout(predicate::str::contains("DOMAIN_CHECK_MAX_CALLS"));
}

#[test]
fn test_version() {
    scout()
        .arg("-V")
        .assert()
        .success()
        .stdout(predicate::str::contains(domain_scout::VERSION));
}

#[test]
fn test_unknown_option() {
    scout()
        .args(["--frobnicate", "acme"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Unknown option"));
}

#[test]
fn test_missing_names() {
    scout()
        .args(["--tld", "com"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("No names given"));
}

#[test]
fn test_tld_needs_value() {
    scout().args(["acme", "--tld"]).assert().code(2);
}

#[tokio::test]
async fn test_cached_research_as_json() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("cache.sqlite3");
    {
        let cache = DomainCache::open(&path).await.unwrap();
        cache
            .set("acme.com", &DomainOutcome::new("acme.com", Some(true), Some(9.99), "namecom"))
            .await
            .unwrap();
    }

    let output = scout()
        .env("DOMAIN_CACHE_PATH", &path)
        .env("DOMAIN_CHECK_MAX_CALLS", "0")
        .env("ENABLE_MULTI_REGISTRAR", "0")
        .env("MCP_FASTDOMAINCHECK_ENABLED", "0")
        .args(["--json", "--tld", "com,io", "Acme"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let research: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let acme = &research["Acme"];
    assert_eq!(acme[0][0], "acme.com");
    assert_eq!(acme[0][1]["available"], true);
    assert_eq!(acme[0][1]["provider"], "namecom");
    assert_eq!(acme[1][0], "acme.io");
    assert_eq!(acme[1][1]["provider"], "quota");
    assert_eq!(acme[1][1]["error"], "max_calls_reached");
}
