use clap::Parser;
use fsindex::checkpoint::CheckpointStore;
use fsindex::cli::Cli;
use fsindex::error::ExitCode;
use fsindex::run_app;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn run(args: &[&str]) -> anyhow::Result<ExitCode> {
    let mut argv = vec!["fsindex", "-q"];
    argv.extend_from_slice(args);
    run_app(Cli::try_parse_from(argv).unwrap())
}

fn setup() -> (TempDir, TempDir) {
    let tree = TempDir::new().unwrap();
    fs::write(tree.path().join("alpha.txt"), "shared").unwrap();
    fs::write(tree.path().join("beta.txt"), "shared").unwrap();
    fs::write(tree.path().join("gamma.log"), "own").unwrap();
    (tree, TempDir::new().unwrap())
}

fn checkpoint_arg(state: &TempDir) -> String {
    state.path().join("index.json").to_string_lossy().into_owned()
}

fn index(tree: &Path, checkpoint: &str) -> ExitCode {
    run(&[
        "--checkpoint",
        checkpoint,
        "--no-progress",
        "index",
        &tree.to_string_lossy(),
        "--workers",
        "2",
    ])
    .unwrap()
}

#[test]
fn test_index_writes_checkpoint() {
    let (tree, state) = setup();
    let checkpoint = checkpoint_arg(&state);

    assert_eq!(index(tree.path(), &checkpoint), ExitCode::Success);

    let loaded = CheckpointStore::new(&checkpoint).load().unwrap().unwrap();
    assert_eq!(loaded.len(), 3);
}

#[test]
fn test_search_exit_codes() {
    let (tree, state) = setup();
    let checkpoint = checkpoint_arg(&state);
    index(tree.path(), &checkpoint);

    let code = run(&["--checkpoint", &checkpoint, "search", "gamma"]).unwrap();
    assert_eq!(code, ExitCode::Success);

    let code = run(&["--checkpoint", &checkpoint, "-s", "ALPHA"]).unwrap();
    assert_eq!(code, ExitCode::Success);

    let code = run(&["--checkpoint", &checkpoint, "search", "nothing-here", "-o", "json"]).unwrap();
    assert_eq!(code, ExitCode::NoResults);
}

#[test]
fn test_invalid_query_is_an_error() {
    let (_tree, state) = setup();
    let checkpoint = checkpoint_arg(&state);
    assert!(run(&["--checkpoint", &checkpoint, "search", "/[/"]).is_err());
}

#[test]
fn test_duplicates_exit_codes() {
    let (tree, state) = setup();
    let checkpoint = checkpoint_arg(&state);

    let code = run(&["--checkpoint", &checkpoint, "duplicates"]).unwrap();
    assert_eq!(code, ExitCode::NoResults);

    index(tree.path(), &checkpoint);
    let code = run(&["--checkpoint", &checkpoint, "duplicates", "--output", "json"]).unwrap();
    assert_eq!(code, ExitCode::Success);
}

#[test]
fn test_export_to_file() {
    let (tree, state) = setup();
    let checkpoint = checkpoint_arg(&state);
    index(tree.path(), &checkpoint);

    let target = state.path().join("export.csv");
    let code = run(&[
        "--checkpoint",
        &checkpoint,
        "export",
        &target.to_string_lossy(),
    ])
    .unwrap();
    assert_eq!(code, ExitCode::Success);

    let content = fs::read_to_string(&target).unwrap();
    assert!(content.starts_with("path,size,hash,modified\n"));
    assert_eq!(content.lines().count(), 4);
}

#[test]
fn test_missing_root_is_an_error() {
    let (tree, state) = setup();
    let checkpoint = checkpoint_arg(&state);
    let missing = tree.path().join("missing");

    let result = run(&["--checkpoint", &checkpoint, "index", &missing.to_string_lossy()]);
    assert!(result.is_err());
}

#[test]
fn test_search_flag_with_subcommand_rejected() {
    let (_tree, state) = setup();
    let checkpoint = checkpoint_arg(&state);
    let result = run(&["--checkpoint", &checkpoint, "-s", "x", "duplicates"]);
    assert!(result.is_err());
}

#[test]
fn test_no_command_rejected() {
    let (_tree, state) = setup();
    let checkpoint = checkpoint_arg(&state);
    assert!(run(&["--checkpoint", &checkpoint]).is_err());
}
