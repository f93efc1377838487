//! Integration tests for the Strata CLI

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Get the strata binary
#[allow(deprecated)]
fn strata_cmd() -> Command {
    Command::cargo_bin("strata").unwrap()
}

#[test]
fn test_help_command() {
    strata_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Strata CLI"))
        .stdout(predicate::str::contains("migrate"))
        .stdout(predicate::str::contains("tenant"))
        .stdout(predicate::str::contains("whois"))
        .stdout(predicate::str::contains("repair"));
}

#[test]
fn test_version_command() {
    strata_cmd()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("Version"))
        .stdout(predicate::str::contains("strata-core"));
}

#[test]
fn test_migrate_help() {
    strata_cmd()
        .args(["migrate", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--schema"))
        .stdout(predicate::str::contains("--parallel"));
}

#[test]
fn test_tenant_help() {
    strata_cmd()
        .args(["tenant", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("create"))
        .stdout(predicate::str::contains("drop"))
        .stdout(predicate::str::contains("list"));
}

#[test]
fn test_whois_requires_host() {
    strata_cmd().arg("whois").assert().failure();
}

#[test]
fn test_missing_config_fails() {
    let dir = TempDir::new().unwrap();
    strata_cmd()
        .current_dir(dir.path())
        .env_remove("STRATA_CONFIG")
        .args(["--config", "does-not-exist.toml", "whois", "x.example.com"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Configuration error"));
}

#[test]
fn test_invalid_config_fails() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("strata.toml");
    std::fs::write(&config, "this is not toml {{{{").unwrap();

    strata_cmd()
        .current_dir(dir.path())
        .args(["whois", "x.example.com"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Configuration error"));
}

/// A deployment with static tenants only: no database URL configured.
fn write_static_config(dir: &TempDir) {
    let config = dir.path().join("strata.toml");
    std::fs::write(
        &config,
        r#"
        [tenants.blog]
        domains = ["blog.x.com", "help.x.com"]
        apps = ["blog_app"]

        [tenants.main]
        domains = ["x.com"]
        fallback = true
        "#,
    )
    .unwrap();
}

#[test]
fn test_whois_resolves_static_domain() {
    let dir = TempDir::new().unwrap();
    write_static_config(&dir);

    strata_cmd()
        .current_dir(dir.path())
        .args(["whois", "blog.x.com"])
        .assert()
        .success()
        .stdout(predicate::str::contains("blog"))
        .stdout(predicate::str::contains("static"))
        .stdout(predicate::str::contains("blog.x.com"));
}

#[test]
fn test_whois_secondary_domain_reports_primary() {
    let dir = TempDir::new().unwrap();
    write_static_config(&dir);

    // help.x.com routes to blog; the primary shown is still blog.x.com.
    strata_cmd()
        .current_dir(dir.path())
        .args(["whois", "HELP.X.COM:8080"])
        .assert()
        .success()
        .stdout(predicate::str::contains("help.x.com"))
        .stdout(predicate::str::contains("blog.x.com"));
}

#[test]
fn test_whois_falls_back_for_unknown_host() {
    let dir = TempDir::new().unwrap();
    write_static_config(&dir);

    strata_cmd()
        .current_dir(dir.path())
        .args(["whois", "nobody.example.com"])
        .assert()
        .success()
        .stdout(predicate::str::contains("main"));
}

#[test]
fn test_tenant_list_static_selector() {
    let dir = TempDir::new().unwrap();
    write_static_config(&dir);

    strata_cmd()
        .current_dir(dir.path())
        .args(["tenant", "list", ":static:"])
        .assert()
        .success()
        .stdout(predicate::str::contains("blog"))
        .stdout(predicate::str::contains("blog.x.com"))
        .stdout(predicate::str::contains("main"))
        .stdout(predicate::str::contains("[fallback]"));
}

#[test]
fn test_database_commands_require_url() {
    let dir = TempDir::new().unwrap();
    write_static_config(&dir);

    strata_cmd()
        .current_dir(dir.path())
        .arg("repair")
        .assert()
        .failure()
        .stderr(predicate::str::contains("database.url"));
}
