//! End-to-end page loads through real child processes.
//!
//! `sh -c` stands in for both the browser and the pager: the "browser" prints
//! a canned dump and the "pager" copies its input into a file we can inspect.
#![cfg(unix)]

use dweb_common::DwebError;
use dweb_pipe::{LinkLookupError, LinkTable, PipeRenderer, Renderer};
use std::path::Path;
use tempfile::TempDir;

const DUMP: &str = "printf 'Title\\n\\nReferences:\\n\\n[1] http://one.example/\\n[7] http://seven.example/\\n'";

fn renderer(browser_script: &str, capture: &Path) -> PipeRenderer {
    PipeRenderer::new("sh", "sh")
        .with_dump_args(["-c", browser_script])
        .with_pager_args([
            "-c".to_string(),
            "cat > \"$0\"".to_string(),
            capture.display().to_string(),
        ])
}

#[tokio::test]
async fn render_pipes_page_to_pager_and_collects_links() {
    let tmp = TempDir::new().unwrap();
    let capture = tmp.path().join("paged.txt");
    let mut r = renderer(DUMP, &capture);
    let mut links = LinkTable::new();

    let report = r.render(b"http://start.example/", &mut links).await.unwrap();

    assert_eq!(report.links, 2);
    assert_eq!(report.lines, 6);
    assert!(!report.pager_closed_early);
    assert!(report.browser_status.is_some_and(|s| s.success()));
    assert!(report.pager_status.is_some_and(|s| s.success()));
    assert_eq!(links.get(1), Ok(&b"http://one.example/"[..]));
    assert_eq!(links.get(7), Ok(&b"http://seven.example/"[..]));

    let paged = std::fs::read_to_string(&capture).unwrap();
    assert!(paged.starts_with("Title\n"));
    assert!(paged.ends_with("[7] http://seven.example/\n"));
}

#[tokio::test]
async fn target_is_passed_after_dump_args() {
    let tmp = TempDir::new().unwrap();
    let capture = tmp.path().join("paged.txt");
    // With `sh -c script`, the next argument becomes `$0`.
    let mut r = renderer("printf '[0] %s\\n' \"$0\"", &capture);
    let mut links = LinkTable::new();

    r.render(b"gopher://sdf.org/", &mut links).await.unwrap();

    assert_eq!(links.get(0), Ok(&b"gopher://sdf.org/"[..]));
}

#[tokio::test]
async fn non_utf8_target_reaches_the_browser_unchanged() {
    let tmp = TempDir::new().unwrap();
    let capture = tmp.path().join("paged.txt");
    let mut r = renderer("printf '[0] %s\\n' \"$0\"", &capture);
    let mut links = LinkTable::new();

    r.render(b"file:///tmp/caf\xe9.html", &mut links).await.unwrap();

    assert_eq!(links.get(0), Ok(&b"file:///tmp/caf\xe9.html"[..]));
    assert_eq!(std::fs::read(&capture).unwrap(), b"[0] file:///tmp/caf\xe9.html\n");
}

#[tokio::test]
async fn render_replaces_stale_links() {
    let tmp = TempDir::new().unwrap();
    let capture = tmp.path().join("paged.txt");
    let mut r = renderer(DUMP, &capture);
    let mut links = LinkTable::new();
    links.extract(b"[3] http://stale.example/");

    r.render(b"http://start.example/", &mut links).await.unwrap();

    assert_eq!(links.get(3), Err(LinkLookupError::NoSuchLink));
    assert_eq!(links.len(), 2);
}

#[tokio::test]
async fn early_pager_exit_still_collects_links() {
    // The browser waits until `true` has exited, so its first line already
    // hits a closed pipe.
    let mut r = PipeRenderer::new("sh", "true").with_dump_args([
        "-c",
        "sleep 1; i=0; while [ $i -lt 2000 ]; do echo filler; i=$((i+1)); done; echo '[42] http://late.example/'",
    ]);
    let mut links = LinkTable::new();

    let report = r.render(b"ignored", &mut links).await.unwrap();

    assert!(report.pager_closed_early);
    assert_eq!(report.lines, 2001);
    assert_eq!(report.links, 1);
    assert_eq!(links.get(42), Ok(&b"http://late.example/"[..]));
}

#[tokio::test]
async fn missing_pager_leaves_links_alone() {
    let mut r = PipeRenderer::new("sh", "dweb-no-such-pager-binary").with_dump_args(["-c", "sleep 5"]);
    let mut links = LinkTable::new();
    links.extract(b"[1] http://kept.example/");

    let err = r.render(b"ignored", &mut links).await.unwrap_err();

    assert!(matches!(err, DwebError::Spawn { .. }));
    assert_eq!(links.get(1), Ok(&b"http://kept.example/"[..]));
}

#[tokio::test]
async fn failing_browser_is_not_an_error() {
    let tmp = TempDir::new().unwrap();
    let capture = tmp.path().join("paged.txt");
    let mut r = renderer("echo '[2] http://partial.example/'; exit 3", &capture);
    let mut links = LinkTable::new();

    let report = r.render(b"ignored", &mut links).await.unwrap();

    assert!(report.browser_status.is_some_and(|s| !s.success()));
    assert_eq!(links.get(2), Ok(&b"http://partial.example/"[..]));
}
