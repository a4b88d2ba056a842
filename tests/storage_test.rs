use sitegraph::storage::{Disc, StorageError, sanitize_component};
use std::fs;
use tempfile::TempDir;
use url::Url;

fn example_disc(output: &TempDir) -> Disc {
    let root = Url::parse("http://example.com/").unwrap();
    Disc::new(root, output.path().to_path_buf())
}

// ===========================================================================================
// sanitize_component Tests
// ===========================================================================================

#[test]
fn test_sanitize_removes_separators_and_colon() {
    assert_eq!(
        sanitize_component("http://example.com/"),
        "httpexample.com"
    );
    assert_eq!(sanitize_component(r"a\b/c:d"), "abcd");
}

#[test]
fn test_sanitize_removes_platform_invalid_chars() {
    assert_eq!(sanitize_component("a<b>c\"d|e?f*g"), "abcdefg");
    assert_eq!(sanitize_component("tab\there"), "tabhere");
}

#[test]
fn test_sanitize_is_idempotent() {
    let once = sanitize_component("http://example.com:8080/path?q=1");
    let twice = sanitize_component(&once);
    assert_eq!(once, twice);
    for c in ['\\', '/', ':', '<', '>', '"', '|', '?', '*'] {
        assert!(!once.contains(c), "sanitized output contains '{}'", c);
    }
}

// ===========================================================================================
// Path resolution Tests
// ===========================================================================================

#[test]
fn test_resolve_directory_like_url_gets_index_html() {
    let output = TempDir::new().unwrap();
    let disc = example_disc(&output);

    let url = Url::parse("http://example.com/docs/page").unwrap();
    assert_eq!(disc.resolve_relative(&url).unwrap(), "docs/page/index.html");
}

#[test]
fn test_resolve_url_with_extension_is_unchanged() {
    let output = TempDir::new().unwrap();
    let disc = example_disc(&output);

    let url = Url::parse("http://example.com/images/logo.png").unwrap();
    assert_eq!(disc.resolve_relative(&url).unwrap(), "images/logo.png");
}

#[test]
fn test_resolve_root_url_is_exactly_index_html() {
    let output = TempDir::new().unwrap();
    let disc = example_disc(&output);

    let url = Url::parse("http://example.com/").unwrap();
    assert_eq!(disc.resolve_relative(&url).unwrap(), "index.html");
}

#[test]
fn test_resolve_trailing_slash_directory() {
    let output = TempDir::new().unwrap();
    let disc = example_disc(&output);

    let url = Url::parse("http://example.com/docs/").unwrap();
    assert_eq!(disc.resolve_relative(&url).unwrap(), "docs/index.html");
}

#[test]
fn test_resolved_paths_stay_inside_the_domain_folder() {
    let output = TempDir::new().unwrap();
    let disc = example_disc(&output);

    let url = Url::parse("http://example.com/a/b/c.txt").unwrap();
    let path = disc.document_path(&url).unwrap();
    assert!(path.starts_with(output.path().join("httpexample.com")));
}

#[test]
fn test_no_case_or_encoding_normalization() {
    let output = TempDir::new().unwrap();
    let disc = example_disc(&output);

    let lower = Url::parse("http://example.com/Docs/Page.html").unwrap();
    let upper = Url::parse("http://example.com/docs/page.html").unwrap();
    assert_ne!(
        disc.resolve_relative(&lower).unwrap(),
        disc.resolve_relative(&upper).unwrap()
    );

    let encoded = Url::parse("http://example.com/a%20b.html").unwrap();
    assert_eq!(disc.resolve_relative(&encoded).unwrap(), "a%20b.html");
}

#[test]
fn test_out_of_domain_url_is_rejected() {
    let output = TempDir::new().unwrap();
    let disc = example_disc(&output);

    let url = Url::parse("http://other.org/page.html").unwrap();
    assert!(matches!(
        disc.resolve_relative(&url),
        Err(StorageError::OutOfDomain { .. })
    ));
}

// ===========================================================================================
// store Tests
// ===========================================================================================

#[tokio::test]
async fn test_store_creates_directories_and_writes_content() {
    let output = TempDir::new().unwrap();
    let disc = example_disc(&output);

    let url = Url::parse("http://example.com/docs/guide").unwrap();
    let written = disc.store(&url, "<html>guide</html>").await.unwrap();

    assert_eq!(
        written,
        output.path().join("httpexample.com/docs/guide/index.html")
    );
    assert_eq!(fs::read_to_string(&written).unwrap(), "<html>guide</html>");
}

#[tokio::test]
async fn test_store_is_idempotent_for_identical_content() {
    let output = TempDir::new().unwrap();
    let disc = example_disc(&output);

    let url = Url::parse("http://example.com/page.html").unwrap();
    let first = disc.store(&url, "same").await.unwrap();
    let second = disc.store(&url, "same").await.unwrap();

    assert_eq!(first, second);
    assert_eq!(fs::read_to_string(&second).unwrap(), "same");
}

#[tokio::test]
async fn test_colliding_urls_last_write_wins() {
    let output = TempDir::new().unwrap();
    let disc = example_disc(&output);

    // Both resolve to docs/index.html: a known, accepted collision.
    let bare = Url::parse("http://example.com/docs").unwrap();
    let slashed = Url::parse("http://example.com/docs/").unwrap();
    assert_eq!(
        disc.resolve_relative(&bare).unwrap(),
        disc.resolve_relative(&slashed).unwrap()
    );

    disc.store(&bare, "first").await.unwrap();
    let path = disc.store(&slashed, "second").await.unwrap();
    assert_eq!(fs::read_to_string(&path).unwrap(), "second");
}

#[tokio::test]
async fn test_store_overwrites_existing_file() {
    let output = TempDir::new().unwrap();
    let disc = example_disc(&output);

    let url = Url::parse("http://example.com/style.css").unwrap();
    disc.store(&url, "old").await.unwrap();
    let path = disc.store(&url, "new").await.unwrap();
    assert_eq!(fs::read_to_string(&path).unwrap(), "new");
}

#[test]
fn test_report_base_is_sibling_of_domain_folder() {
    let output = TempDir::new().unwrap();
    let disc = example_disc(&output);

    assert_eq!(disc.domain_folder(), "httpexample.com");
    assert_eq!(disc.report_base(), output.path().join("httpexample.com"));
}
