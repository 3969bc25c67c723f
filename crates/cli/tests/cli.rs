// ABOUTME: Integration tests for the sitescrape CLI binary.
// ABOUTME: Tests offline HTML extraction, batch runs against a mock server, probing and exit codes.

use assert_cmd::assert::OutputAssertExt;
use assert_cmd::cargo::CommandCargoExt;
use httpmock::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::process::Command;
use std::time::{Duration, Instant};
use tempfile::TempDir;

fn sitescrape_cmd() -> Command {
    Command::cargo_bin("sitescrape").unwrap()
}

const PAGE: &str = r#"<html><head><title>Mock Page</title></head><body>
<h1>A headline that is long enough</h1>
<p>Body text</p>
<a href="/next">Continue reading this story</a>
</body></html>"#;

#[test]
fn extracts_html_file_with_profile_from_url() {
    let temp_dir = TempDir::new().unwrap();
    let html_path = temp_dir.path().join("questions.html");
    fs::write(
        &html_path,
        r#"<div class="s-post-summary"><h3><a href="/questions/7/x">How do I parse HTML?</a></h3></div>"#,
    )
    .unwrap();

    sitescrape_cmd()
        .arg("--html")
        .arg(&html_path)
        .arg("--url")
        .arg("https://stackoverflow.com/questions/tagged/rust")
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""profile": "qa""#))
        .stdout(predicate::str::contains("How do I parse HTML?"))
        .stdout(predicate::str::contains(
            "https://stackoverflow.com/questions/7/x",
        ));
}

#[test]
fn html_requires_url() {
    sitescrape_cmd()
        .arg("--html")
        .arg("page.html")
        .assert()
        .failure();
}

#[test]
fn no_targets_is_an_error() {
    sitescrape_cmd()
        .assert()
        .failure()
        .stderr(predicate::str::contains("at least one target"));
}

#[test]
fn batch_writes_report_with_partial_failure() {
    let server = MockServer::start();
    let ok = server.mock(|when, then| {
        when.method(GET).path("/ok");
        then.status(200)
            .header("content-type", "text/html; charset=utf-8")
            .body(PAGE);
    });
    let broken = server.mock(|when, then| {
        when.method(GET).path("/broken");
        then.status(500);
    });

    let temp_dir = TempDir::new().unwrap();
    let out_path = temp_dir.path().join("results.json");

    sitescrape_cmd()
        .arg("--delay-ms")
        .arg("0")
        .arg("-o")
        .arg(&out_path)
        .arg(format!("Good={}", server.url("/ok")))
        .arg(format!("Bad={}", server.url("/broken")))
        .assert()
        .success();

    ok.assert();
    broken.assert();

    let written = fs::read_to_string(&out_path).unwrap();
    let report: serde_json::Value = serde_json::from_str(&written).unwrap();
    let entries = report.as_object().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(report["Good"]["profile"], "news");
    assert_eq!(report["Good"]["headlines"][0], "A headline that is long enough");
    assert_eq!(report["Good"]["articles"][0]["url"], server.url("/next"));
    assert_eq!(report["Bad"]["url"], server.url("/broken"));
    assert!(report["Bad"]["error"]
        .as_str()
        .unwrap()
        .contains("HTTP status 500"));
}

#[test]
fn batch_fails_when_every_target_fails() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/missing");
        then.status(404);
    });

    sitescrape_cmd()
        .arg("--delay-ms")
        .arg("0")
        .arg("--compact")
        .arg(server.url("/missing"))
        .assert()
        .failure()
        .stdout(predicate::str::contains(r#""error":"#));
}

#[test]
fn probe_prints_page_summary() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/probe");
        then.status(200)
            .header("content-type", "text/html")
            .body(PAGE);
    });

    sitescrape_cmd()
        .arg("--probe")
        .arg(format!("Probe={}", server.url("/probe")))
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""title": "Mock Page""#))
        .stdout(predicate::str::contains(r#""paragraphs": 1"#))
        .stdout(predicate::str::contains(r#""links": 1"#));
}

#[test]
fn page_summaries_wait_between_targets() {
    let server = MockServer::start();
    let page = server.mock(|when, then| {
        when.method(GET).path("/page");
        then.status(200)
            .header("content-type", "text/html")
            .body(PAGE);
    });

    let started = Instant::now();
    sitescrape_cmd()
        .arg("--probe")
        .arg("--delay-ms")
        .arg("400")
        .arg(format!("One={}", server.url("/page")))
        .arg(format!("Two={}", server.url("/page")))
        .arg(format!("Three={}", server.url("/page")))
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""One""#))
        .stdout(predicate::str::contains(r#""Three""#));

    page.assert_calls(3);
    assert!(
        started.elapsed() >= Duration::from_millis(800),
        "finished in {:?}",
        started.elapsed()
    );
}

#[test]
fn invalid_profiles_file_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let profiles = temp_dir.path().join("profiles.json");
    fs::write(
        &profiles,
        r#"{"default": {"name": "broken", "fields": [{"name": "x", "selectors": []}]}}"#,
    )
    .unwrap();

    sitescrape_cmd()
        .arg("--profiles")
        .arg(&profiles)
        .arg("https://example.com/")
        .assert()
        .failure()
        .stderr(predicate::str::contains("ValidateProfile"));
}
