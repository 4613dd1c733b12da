use fsindex::duplicates::{find_duplicates, DuplicateSummary};
use fsindex::error::ExitCode;
use fsindex::index::Index;
use fsindex::indexer::{Indexer, IndexerConfig};
use fsindex::output::json::write_json;
use fsindex::output::JsonDuplicatesOutput;
use std::fs;
use tempfile::TempDir;

fn index_dir(dir: &TempDir) -> Index {
    Indexer::new(IndexerConfig::default().with_workers(4))
        .run(dir.path(), Index::new())
        .unwrap()
        .index
}

#[test]
fn test_duplicates_across_directories() {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("a/b")).unwrap();
    fs::write(dir.path().join("one.txt"), "duplicate").unwrap();
    fs::write(dir.path().join("a/two.txt"), "duplicate").unwrap();
    fs::write(dir.path().join("a/b/three.txt"), "duplicate").unwrap();
    fs::write(dir.path().join("a/b/unique.txt"), "unique").unwrap();

    let groups = find_duplicates(index_dir(&dir));
    assert_eq!(groups.len(), 1);

    let group = &groups[0];
    let root = fs::canonicalize(dir.path()).unwrap();
    assert_eq!(
        group.paths,
        vec![
            root.join("a/b/three.txt"),
            root.join("a/two.txt"),
            root.join("one.txt"),
        ]
    );
    assert_eq!(group.size, 9);
    assert_eq!(group.wasted_space(), 18);
}

#[test]
fn test_empty_files_are_duplicates_of_each_other() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("empty1"), "").unwrap();
    fs::write(dir.path().join("empty2"), "").unwrap();

    let groups = find_duplicates(index_dir(&dir));
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].size, 0);
    assert_eq!(groups[0].wasted_space(), 0);
}

#[test]
fn test_same_size_different_content_not_grouped() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("x"), "aaaa").unwrap();
    fs::write(dir.path().join("y"), "bbbb").unwrap();

    assert!(find_duplicates(index_dir(&dir)).is_empty());
}

#[test]
fn test_groups_ordered_by_wasted_space() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("small1"), "tiny").unwrap();
    fs::write(dir.path().join("small2"), "tiny").unwrap();
    fs::write(dir.path().join("small3"), "tiny").unwrap();
    fs::write(dir.path().join("big1"), vec![1u8; 4096]).unwrap();
    fs::write(dir.path().join("big2"), vec![1u8; 4096]).unwrap();

    let groups = find_duplicates(index_dir(&dir));
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].size, 4096);
    assert_eq!(groups[1].len(), 3);

    let summary = DuplicateSummary::from_groups(&groups);
    assert_eq!(summary.duplicate_groups, 2);
    assert_eq!(summary.duplicate_files, 3);
    assert_eq!(summary.reclaimable_space, 4096 + 8);
}

#[test]
fn test_duplicates_json_report() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("p"), "same").unwrap();
    fs::write(dir.path().join("q"), "same").unwrap();

    let groups = find_duplicates(index_dir(&dir));
    let mut buffer = Vec::new();
    write_json(
        &JsonDuplicatesOutput::new(&groups, ExitCode::Success),
        &mut buffer,
        false,
    )
    .unwrap();

    let value: serde_json::Value = serde_json::from_slice(&buffer).unwrap();
    assert_eq!(value["duplicates"][0]["size"], 4);
    assert_eq!(value["duplicates"][0]["files"].as_array().unwrap().len(), 2);
    assert_eq!(value["duplicates"][0]["hash"].as_str().unwrap().len(), 64);
    assert_eq!(value["summary"]["reclaimable_space"], 4);
    assert_eq!(value["summary"]["exit_code_name"], "FX000");
}
