//! End-to-end CLI tests for the preview-fetch binary.

// `Command::cargo_bin` is deprecated in assert_cmd >=2.0.17 in favor of
// `cargo::cargo_bin_cmd!` macro. Suppressed until migration to the new API.
#![allow(deprecated)]

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn write_config(config_home: &std::path::Path, contents: &str) {
    let config_dir = config_home.join("preview-fetch");
    std::fs::create_dir_all(&config_dir).unwrap();
    std::fs::write(config_dir.join("config.toml"), contents).unwrap();
}

/// Binary with an isolated, empty config home.
fn cmd(config_home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("preview-fetch").unwrap();
    cmd.env("XDG_CONFIG_HOME", config_home.path())
        .env("HOME", config_home.path())
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_binary_help_displays_usage() {
    let config_home = TempDir::new().unwrap();
    cmd(&config_home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("link previews"))
        .stdout(predicate::str::contains("preview"))
        .stdout(predicate::str::contains("encode"));
}

#[test]
fn test_binary_version_displays_version() {
    let config_home = TempDir::new().unwrap();
    cmd(&config_home)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_binary_invalid_flag_returns_error() {
    let config_home = TempDir::new().unwrap();
    let assert = cmd(&config_home)
        .args(["--invalid-flag", "decode", "x"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
    assert_eq!(assert.get_output().status.code(), Some(2));
}

#[test]
fn test_binary_missing_subcommand_fails() {
    let config_home = TempDir::new().unwrap();
    cmd(&config_home).assert().failure();
}

#[test]
fn test_encode_prints_component_encoded_uri() {
    let config_home = TempDir::new().unwrap();
    cmd(&config_home)
        .args(["encode", "http://example.com/a b?q=ä#top"])
        .assert()
        .success()
        .stdout("http://example.com/a%20b?q=%C3%A4#top\n");
}

#[test]
fn test_decode_prints_decoded_text() {
    let config_home = TempDir::new().unwrap();
    cmd(&config_home)
        .args(["decode", "caf%C3%A9%20au%20lait"])
        .assert()
        .success()
        .stdout("café au lait\n");
}

#[test]
fn test_offline_commands_ignore_broken_config() {
    let config_home = TempDir::new().unwrap();
    write_config(config_home.path(), "redirect_limit = nope\n");
    cmd(&config_home)
        .args(["decode", "a%20b"])
        .assert()
        .success()
        .stdout("a b\n");
}

#[test]
fn test_network_command_rejects_invalid_config() {
    let config_home = TempDir::new().unwrap();
    write_config(config_home.path(), "redirect_limit = 0\n");
    cmd(&config_home)
        .args(["size", "http://127.0.0.1:9/file"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("config"));
}

#[test]
fn test_explicit_config_path_missing_fails() {
    let config_home = TempDir::new().unwrap();
    let missing = config_home.path().join("nope.toml");
    cmd(&config_home)
        .arg("--config")
        .arg(&missing)
        .args(["size", "http://127.0.0.1:9/file"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read config file"));
}

#[test]
fn test_fetch_invalid_url_fails() {
    let config_home = TempDir::new().unwrap();
    cmd(&config_home)
        .args(["fetch", "not a url"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to fetch"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_fetch_writes_body_to_stdout_with_headers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/raw"))
        .and(header("x-probe", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("raw body"))
        .expect(1)
        .mount(&server)
        .await;

    let config_home = TempDir::new().unwrap();
    cmd(&config_home)
        .args(["-q", "fetch", &format!("{}/raw", server.uri()), "-H", "X-Probe: 1"])
        .assert()
        .success()
        .stdout("raw body");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_fetch_over_size_cap_from_config_fails() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/big"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![b'x'; 4096]))
        .mount(&server)
        .await;

    let config_home = TempDir::new().unwrap();
    write_config(config_home.path(), "max_download_kb = 1 # tiny\n");
    cmd(&config_home)
        .args(["fetch", &format!("{}/big", server.uri())])
        .assert()
        .failure()
        .stdout("")
        .stderr(predicate::str::contains("exceeded"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_size_prints_pretty_size() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/file.bin"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0_u8; 2048]))
        .mount(&server)
        .await;

    let config_home = TempDir::new().unwrap();
    cmd(&config_home)
        .args(["size", &format!("{}/file.bin", server.uri())])
        .assert()
        .success()
        .stdout("2.00 KB\n");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_preview_json_follows_canonical() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/m/story"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><head><link rel="canonical" href="/story">
<title>mobile</title></head></html>"#,
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/story"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><head><title>Story</title>
<meta property="og:image" content="/cover.png"></head></html>"#,
        ))
        .expect(1)
        .mount(&server)
        .await;

    let config_home = TempDir::new().unwrap();
    let assert = cmd(&config_home)
        .args(["preview", &format!("{}/m/story", server.uri()), "--json"])
        .assert()
        .success();

    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(json["followed_canonical"], true);
    assert_eq!(json["title"], "Story");
    assert_eq!(json["image"], format!("{}/cover.png", server.uri()));
    assert_eq!(json["url"], format!("{}/story", server.uri()));
}
