use fsindex::checkpoint::CheckpointStore;
use fsindex::index::Index;
use fsindex::indexer::{Indexer, IndexerConfig};
use fsindex::scanner::{hash_to_hex, Hasher};
use fsindex::search::{search, QueryError, SearchMode, SearchQuery};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

fn indexed_tree() -> (TempDir, PathBuf, Index) {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("docs/reports")).unwrap();
    fs::create_dir_all(dir.path().join("src")).unwrap();
    fs::write(dir.path().join("docs/reports/Q1-Report.txt"), "quarter one").unwrap();
    fs::write(dir.path().join("docs/reports/q2-report.txt"), "quarter two").unwrap();
    fs::write(dir.path().join("docs/notes.md"), "quarter one").unwrap();
    fs::write(dir.path().join("src/main.rs"), "fn main() {}").unwrap();

    let root = fs::canonicalize(dir.path()).unwrap();
    let outcome = Indexer::new(IndexerConfig::default().with_workers(4))
        .run(&root, Index::new())
        .unwrap();
    (dir, root, outcome.index)
}

#[test]
fn test_substring_search_is_case_insensitive() {
    let (_dir, root, index) = indexed_tree();
    let report = search(&index, &SearchQuery::parse("REPORT").unwrap());

    assert_eq!(report.mode, SearchMode::Substring);
    let paths: Vec<_> = report.hits.iter().map(|h| h.path.clone()).collect();
    assert_eq!(
        paths,
        vec![
            root.join("docs/reports/Q1-Report.txt"),
            root.join("docs/reports/q2-report.txt"),
        ]
    );
    assert_eq!(report.scanned, 4);
}

#[test]
fn test_regex_is_anchored_at_path_start() {
    let (_dir, root, index) = indexed_tree();
    let pattern = format!("/{}.*\\.rs/", regex::escape(&root.to_string_lossy()));
    let report = search(&index, &SearchQuery::parse(&pattern).unwrap());

    assert_eq!(report.mode, SearchMode::Regex);
    assert_eq!(report.hits.len(), 1);
    assert_eq!(report.hits[0].path, root.join("src/main.rs"));

    // Matches somewhere inside the path but not at its start.
    let report = search(&index, &SearchQuery::parse("/src/").unwrap());
    assert!(report.is_empty());
}

#[test]
fn test_regex_is_case_sensitive() {
    let (_dir, _root, index) = indexed_tree();
    let report = search(&index, &SearchQuery::parse("/.*Report/").unwrap());
    assert_eq!(report.hits.len(), 1);
}

#[test]
fn test_hash_search_finds_every_copy() {
    let (dir, root, index) = indexed_tree();
    let hash = Hasher::new()
        .hash_file(&dir.path().join("docs/notes.md"))
        .unwrap();

    for text in [hash_to_hex(&hash), hash_to_hex(&hash).to_lowercase()] {
        let report = search(&index, &SearchQuery::parse(&text).unwrap());
        assert_eq!(report.mode, SearchMode::Hash);
        let paths: Vec<_> = report.hits.iter().map(|h| h.path.clone()).collect();
        assert_eq!(
            paths,
            vec![root.join("docs/notes.md"), root.join("docs/reports/Q1-Report.txt")]
        );
        assert!(report.hits.iter().all(|h| h.hash == hash_to_hex(&hash)));
    }
}

#[test]
fn test_hash_length_non_hex_is_rejected() {
    let text = "z".repeat(64);
    assert!(matches!(
        SearchQuery::parse(&text),
        Err(QueryError::InvalidHash(_))
    ));
}

#[test]
fn test_hash_length_takes_precedence_over_regex() {
    // 64 characters wrapped in slashes is still a hash-length query.
    let text = format!("/{}/", "a".repeat(62));
    assert!(SearchQuery::parse(&text).is_err());
}

#[test]
fn test_invalid_regex_is_rejected() {
    assert!(matches!(
        SearchQuery::parse("/(unclosed/"),
        Err(QueryError::InvalidRegex { .. })
    ));
}

#[test]
fn test_search_loaded_checkpoint() {
    let (_dir, root, index) = indexed_tree();
    let state = TempDir::new().unwrap();
    let store = CheckpointStore::new(state.path().join("index.json"));
    store.save(&index).unwrap();

    let loaded = store.load_or_empty();
    let report = search(&loaded, &SearchQuery::parse("notes").unwrap());
    assert_eq!(report.hits.len(), 1);
    assert_eq!(report.hits[0].path, root.join("docs/notes.md"));
    assert_eq!(report.hits[0].size, 11);
}

#[test]
fn test_search_empty_index() {
    let report = search(&Index::new(), &SearchQuery::parse("anything").unwrap());
    assert!(report.is_empty());
    assert_eq!(report.scanned, 0);
}

#[test]
fn test_three_query_kinds_on_small_index() {
    use fsindex::index::IndexEntry;

    let mut index = Index::new();
    index.insert(PathBuf::from("/a/report.txt"), IndexEntry::new(100, [0x11; 32], None));
    index.insert(PathBuf::from("/a/readme.md"), IndexEntry::new(50, [0x22; 32], None));

    let only = |text: &str| -> Vec<PathBuf> {
        search(&index, &SearchQuery::parse(text).unwrap())
            .hits
            .into_iter()
            .map(|h| h.path)
            .collect()
    };

    assert_eq!(only("report"), vec![PathBuf::from("/a/report.txt")]);
    assert_eq!(only(r"/^\/a\/.*\.md$/"), vec![PathBuf::from("/a/readme.md")]);
    assert_eq!(only(&hash_to_hex(&[0x11; 32])), vec![PathBuf::from("/a/report.txt")]);
}
