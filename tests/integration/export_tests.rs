use filetime::{set_file_mtime, FileTime};
use fsindex::checkpoint::CheckpointStore;
use fsindex::index::{Index, IndexEntry};
use fsindex::indexer::{Indexer, IndexerConfig};
use fsindex::output::CsvExport;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

#[test]
fn test_export_indexed_tree() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("data.bin");
    fs::write(&file, vec![0u8; 100]).unwrap();
    set_file_mtime(&file, FileTime::from_unix_time(1_700_000_000, 0)).unwrap();

    let index = Indexer::new(IndexerConfig::default().with_workers(1))
        .run(dir.path(), Index::new())
        .unwrap()
        .index;

    let mut buffer = Vec::new();
    let rows = CsvExport::new(&index).write_to(&mut buffer).unwrap();
    assert_eq!(rows, 1);

    let mut reader = csv::Reader::from_reader(buffer.as_slice());
    let headers = reader.headers().unwrap().clone();
    assert_eq!(
        headers.iter().collect::<Vec<_>>(),
        vec!["path", "size", "hash", "modified"]
    );

    let records: Vec<csv::StringRecord> = reader.records().map(Result::unwrap).collect();
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(
        PathBuf::from(&record[0]),
        fs::canonicalize(&file).unwrap()
    );
    assert_eq!(&record[1], "100");
    assert_eq!(record[2].len(), 64);
    assert_eq!(record[2].to_uppercase(), record[2].to_string());
    assert!(record[3].starts_with("2023-11-14T22:13:20"));
}

#[test]
fn test_export_unknown_mtime() {
    let mut index = Index::new();
    index.insert(
        PathBuf::from("/legacy/file"),
        IndexEntry::new(5, [0xfe; 32], None),
    );

    let output = CsvExport::new(&index).to_string().unwrap();
    let lines: Vec<&str> = output.lines().collect();
    assert_eq!(lines[0], "path,size,hash,modified");
    assert_eq!(lines[1], format!("/legacy/file,5,{},-1", "FE".repeat(32)));
}

#[test]
fn test_export_quotes_awkward_paths() {
    let mut index = Index::new();
    index.insert(
        PathBuf::from("/data/a, \"quoted\" name.txt"),
        IndexEntry::new(1, [0u8; 32], None),
    );

    let output = CsvExport::new(&index).to_string().unwrap();
    let mut reader = csv::Reader::from_reader(output.as_bytes());
    let record = reader.records().next().unwrap().unwrap();
    assert_eq!(&record[0], "/data/a, \"quoted\" name.txt");
}

#[test]
fn test_export_from_checkpoint_file() {
    let state = TempDir::new().unwrap();
    let store = CheckpointStore::new(state.path().join("index.json"));
    let index: Index = (0..25)
        .map(|i| {
            (
                PathBuf::from(format!("/exports/{i:02}")),
                IndexEntry::new(i, [i as u8; 32], None),
            )
        })
        .collect();
    store.save(&index).unwrap();

    let target = state.path().join("out.csv");
    let file = fs::File::create(&target).unwrap();
    let rows = CsvExport::new(&store.load_or_empty()).write_to(file).unwrap();
    assert_eq!(rows, 25);

    let content = fs::read_to_string(&target).unwrap();
    assert_eq!(content.lines().count(), 26);
}

#[test]
fn test_export_empty_index_has_header_only() {
    let output = CsvExport::new(&Index::new()).to_string().unwrap();
    assert_eq!(output, "path,size,hash,modified\n");
}
