//! Fragment selection over a JSON Lines file

use buildkg_domain::{FragmentQuery, FragmentSource};
use buildkg_store::{JsonlFragmentSource, StoreError};
use std::io::Write;
use tempfile::NamedTempFile;

fn long(tag: &str) -> String {
    format!("{} {}", tag, "x".repeat(60))
}

fn fixture() -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    let rows = [
        ("f1", long("one"), "CA"),
        ("f2", "too short".to_string(), "CA"),
        ("f3", long("three"), "SG"),
        ("f4", long("four"), "CA"),
        ("f5", long("five"), "CA"),
    ];
    for (id, excerpt, jurisdiction) in rows {
        let line = serde_json::json!({
            "fragment_id": id,
            "doc_id": "doc-1",
            "excerpt": excerpt,
            "jurisdiction": jurisdiction,
        });
        writeln!(file, "{}", line).unwrap();
    }
    file
}

fn ids(fragments: &[buildkg_domain::Fragment]) -> Vec<&str> {
    fragments.iter().map(|f| f.fragment_id.as_str()).collect()
}

#[tokio::test]
async fn test_short_excerpts_are_filtered() {
    let file = fixture();
    let source = JsonlFragmentSource::new(file.path());
    let fragments = source.fetch(&FragmentQuery::default()).await.unwrap();
    assert_eq!(ids(&fragments), vec!["f1", "f3", "f4", "f5"]);
}

#[tokio::test]
async fn test_jurisdiction_offset_and_limit() {
    let file = fixture();
    let source = JsonlFragmentSource::new(file.path());
    let query = FragmentQuery {
        limit: Some(2),
        offset: 1,
        jurisdiction: Some("CA".to_string()),
    };
    let fragments = source.fetch(&query).await.unwrap();
    assert_eq!(ids(&fragments), vec!["f4", "f5"]);
}

#[tokio::test]
async fn test_missing_file_is_io_error() {
    let source = JsonlFragmentSource::new("/nonexistent/fragments.jsonl");
    let result = source.fetch(&FragmentQuery::default()).await;
    assert!(matches!(result, Err(StoreError::Io { .. })));
}
