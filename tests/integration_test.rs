use assert_cmd::Command;
use assert_cmd::cargo;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use mockito::{Matcher, Server, ServerGuard};
use predicates::prelude::*;
use std::path::Path;
use tempfile::tempdir;

const TOKEN: &str = "ghp_integration0123456789";

fn manifest(name: &str, version: &str, extra: &str) -> String {
    format!(
        r#"name = "{name}"
version = "{version}"
license = "MIT"
author = "Jane Doe"
maintainer = "jane@example.com"
copyright = "2021 Jane Doe"
{extra}"#
    )
}

fn contents(text: &str) -> String {
    serde_json::json!({
        "type": "file",
        "encoding": "base64",
        "content": STANDARD.encode(text),
    })
    .to_string()
}

fn mock_github(server: &mut ServerGuard) {
    server
        .mock("GET", "/rate_limit")
        .match_header("Authorization", Matcher::Exact(format!("Bearer {}", TOKEN)))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"resources": {"core": {"limit": 5000, "remaining": 5000}}}"#)
        .create();

    server
        .mock("GET", "/repos/owner/foo/contents/fpm.toml?ref=v1.0.0")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_header("x-ratelimit-remaining", "4999")
        .with_body(contents(&manifest(
            "foo",
            "1.0.0",
            "description = \"Foo\"\n[dependencies]\n",
        )))
        .create();

    server
        .mock("GET", "/repos/owner/bar/contents/fpm.toml")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_header("x-ratelimit-remaining", "4998")
        .with_body(contents(&manifest("bar", "0.2.0", "homepage = \"x\"\n")))
        .create();

    // Manifest without a license
    server
        .mock("GET", "/repos/owner/broken/contents/fpm.toml")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(contents("name = \"broken\"\nversion = \"0.1.0\"\n"))
        .create();
}

fn index_cmd(dir: &Path, api_url: &str) -> Command {
    let mut cmd = Command::new(cargo::cargo_bin!("fpm-index"));
    cmd.current_dir(dir)
        .env("CI", "true")
        .env("GITHUB_ACTOR", "octocat")
        .env("GITHUB_TOKEN", TOKEN)
        .env_remove("GITLAB_TOKEN")
        .env_remove("FPM_INDEX_CACHE_DIR")
        .arg("--github-api-url")
        .arg(api_url)
        .arg("--gitlab-api-url")
        .arg(api_url)
        .arg("--cache-dir")
        .arg(dir.join("repos"));
    cmd
}

const REGISTRY: &str = r#"
[foo]
"1.0.0" = { git = "https://github.com/owner/foo", tag = "v1.0.0" }

[bar]
latest = { git = "https://github.com/owner/bar" }

[broken]
latest = { git = "https://github.com/owner/broken" }
"#;

#[test]
fn test_end_to_end_index() {
    let mut server = Server::new();
    mock_github(&mut server);

    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("registry.toml"), REGISTRY).unwrap();

    index_cmd(dir.path(), &server.url())
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "(!) Error processing package 'broken-latest', skipping.",
        ))
        .stdout(predicate::str::contains("Missing required key 'license'"))
        .stdout(predicate::str::contains(
            " 3 packages are registered in registry.toml",
        ))
        .stdout(predicate::str::contains(
            " 2 unindexed packages were added to the index successfully",
        ))
        .stdout(predicate::str::contains(
            " 1 unindexed packages failed to be indexed correctly",
        ))
        .stdout(predicate::str::contains("github remaining requests:"));

    let index: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(dir.path().join("index.json")).unwrap())
            .unwrap();

    let foo = &index["packages"]["foo"]["1.0.0"];
    assert_eq!(foo["name"], "foo");
    assert_eq!(foo["description"], "Foo");
    assert_eq!(foo["dependencies"], serde_json::json!({}));
    assert_eq!(foo["dev-dependencies"], serde_json::Value::Null);
    assert_eq!(foo["git"], "https://github.com/owner/foo");
    assert_eq!(foo["git-tag"], "v1.0.0");

    let bar = &index["packages"]["bar"]["latest"];
    assert_eq!(bar["version"], "0.2.0");
    assert_eq!(bar["git-tag"], serde_json::Value::Null);
    assert!(bar.get("homepage").is_none());

    assert!(index["packages"].get("broken").is_none());
    assert!(index["index-date"].is_string());
}

#[test]
fn test_second_run_skips_pinned_versions() {
    let mut server = Server::new();
    mock_github(&mut server);

    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("registry.toml"), REGISTRY).unwrap();

    index_cmd(dir.path(), &server.url()).assert().success();
    index_cmd(dir.path(), &server.url())
        .assert()
        .success()
        .stdout(predicate::str::contains(
            " 1 indexed versioned packages were up-to-date and skipped",
        ))
        .stdout(predicate::str::contains(
            " 1 indexed packages were re-indexed successfully",
        ));
}

#[test]
fn test_check_new_fails_on_new_package_error() {
    let mut server = Server::new();
    mock_github(&mut server);

    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("registry.toml"), REGISTRY).unwrap();

    index_cmd(dir.path(), &server.url())
        .arg("--check-new")
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "There were 1 unindexed packages that failed to be indexed",
        ));

    // The index is written before the strictness check
    assert!(dir.path().join("index.json").exists());
}

#[test]
fn test_check_existing_ignores_new_package_errors() {
    let mut server = Server::new();
    mock_github(&mut server);

    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("registry.toml"), REGISTRY).unwrap();

    index_cmd(dir.path(), &server.url())
        .arg("--check-existing")
        .assert()
        .success();
}

#[test]
fn test_missing_registry_fails() {
    let dir = tempdir().unwrap();

    index_cmd(dir.path(), "http://127.0.0.1:9")
        .assert()
        .failure()
        .stderr(predicate::str::contains("registry.toml"));
}
