//! fsindex - Persistent content-addressable file index
//!
//! Walks a directory tree with a bounded pool of workers, records the size,
//! modification time and BLAKE3 hash of every regular file, and keeps the
//! result in a crash-safe checkpoint. Later runs re-hash only files whose size
//! or modification time changed. The saved index answers path, regex and hash
//! queries, groups duplicates and exports CSV.

pub mod checkpoint;
pub mod cli;
pub mod config;
pub mod duplicates;
pub mod error;
pub mod index;
pub mod indexer;
pub mod logging;
pub mod output;
pub mod progress;
pub mod scanner;
pub mod search;
pub mod signal;

use std::fs::File;
use std::io::{BufWriter, IsTerminal, Write};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use bytesize::ByteSize;

use crate::checkpoint::{CheckpointStore, CheckpointWriter};
use crate::cli::{Cli, Commands, DuplicatesArgs, ExportArgs, IndexArgs, OutputFormat};
use crate::config::Config;
use crate::duplicates::{find_duplicates, DuplicateSummary};
use crate::error::{ExitCode, Interrupted};
use crate::indexer::Indexer;
use crate::output::json::{write_json, JsonDuplicatesOutput, JsonSearchOutput};
use crate::output::CsvExport;
use crate::progress::{ConsoleProgress, LogProgress, ProgressSink};
use crate::search::{search, SearchQuery};

/// Interval between progress log lines when no spinner is shown.
const LOG_PROGRESS_INTERVAL: Duration = Duration::from_secs(10);

/// Run the command described by `cli`.
///
/// # Errors
///
/// Returns an error for invalid configuration, unusable roots, malformed
/// queries and output failures. An interrupted indexing run returns
/// [`Interrupted`] after its final save.
pub fn run_app(cli: Cli) -> Result<ExitCode> {
    let Cli {
        verbose,
        quiet,
        config,
        checkpoint,
        no_progress,
        search,
        command,
        ..
    } = cli;

    logging::init_logging(verbose, quiet);

    let mut config = Config::load(config.as_deref()).context("Failed to load configuration")?;
    if let Some(path) = checkpoint {
        config.checkpoint_path = Some(path);
    }

    match (command, search) {
        (Some(_), Some(_)) => bail!("--search cannot be combined with a subcommand"),
        (None, Some(query)) => run_search(&config.checkpoint_store()?, &query, OutputFormat::Text),
        (Some(Commands::Search(args)), None) => {
            run_search(&config.checkpoint_store()?, &args.query, args.output)
        }
        (Some(Commands::Index(args)), None) => run_index(args, config, !no_progress && !quiet),
        (Some(Commands::Duplicates(args)), None) => {
            run_duplicates(&config.checkpoint_store()?, &args)
        }
        (Some(Commands::Export(args)), None) => run_export(&config.checkpoint_store()?, &args),
        (None, None) => bail!("No command given; try 'fsindex --help'"),
    }
}

fn run_index(args: IndexArgs, mut config: Config, show_progress: bool) -> Result<ExitCode> {
    if let Some(workers) = args.workers {
        config.workers = usize::try_from(workers).context("--workers is too large")?;
    }
    if let Some(interval) = args.interval {
        config.checkpoint_interval_secs = interval;
    }
    if let Some(backups) = args.backups {
        config.backups = backups;
    }
    if args.follow_symlinks {
        config.follow_symlinks = true;
    }
    config.validate()?;

    let handler = signal::install_handler()?;
    let store = config.checkpoint_store()?;
    log::debug!("Checkpoint file: {}", store.path().display());
    let baseline = store.load_or_empty();
    let writer = Arc::new(CheckpointWriter::new(store));

    let progress: Arc<dyn ProgressSink> = if show_progress && std::io::stderr().is_terminal() {
        Arc::new(ConsoleProgress::new())
    } else {
        Arc::new(LogProgress::new(LOG_PROGRESS_INTERVAL))
    };

    let indexer = Indexer::new(
        config
            .indexer_config()
            .with_shutdown_flag(handler.get_flag())
            .with_progress(progress),
    )
    .with_checkpoint_writer(Arc::clone(&writer));

    let outcome = indexer
        .run(&args.root, baseline)
        .with_context(|| format!("Failed to index {}", args.root.display()))?;
    let summary = &outcome.summary;

    println!(
        "Indexed {} files ({} hashed, {} unchanged) in {:.2?}",
        summary.hashed + summary.unchanged,
        summary.hashed,
        summary.unchanged,
        summary.elapsed
    );
    println!(
        "Index holds {} entries totalling {}",
        outcome.index.len(),
        ByteSize(outcome.index.total_size())
    );
    if summary.failed_files + summary.failed_dirs > 0 {
        println!(
            "Skipped {} unreadable files and {} unlistable directories",
            summary.failed_files, summary.failed_dirs
        );
    }
    if summary.pruned > 0 {
        println!("Removed {} entries for deleted files", summary.pruned);
    }
    if let Some(err) = &summary.final_save_error {
        log::error!("The index could not be saved: {}", err);
    }

    if summary.interrupted {
        return Err(Interrupted.into());
    }
    Ok(if summary.has_failures() {
        ExitCode::PartialSuccess
    } else {
        ExitCode::Success
    })
}

fn run_search(store: &CheckpointStore, text: &str, output: OutputFormat) -> Result<ExitCode> {
    let query = SearchQuery::parse(text)?;
    let index = store.load_or_empty();
    let report = search(&index, &query);

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    match output {
        OutputFormat::Text => {
            for hit in &report.hits {
                writeln!(
                    out,
                    "{}  {:>10}  {}",
                    hit.hash,
                    ByteSize(hit.size),
                    hit.path.display()
                )?;
            }
            log::info!(
                "Found {} of {} entries in {:.3} seconds",
                report.hits.len(),
                report.scanned,
                report.elapsed.as_secs_f64()
            );
        }
        OutputFormat::Json => write_json(&JsonSearchOutput::new(text, &report), &mut out, true)?,
    }

    Ok(if report.is_empty() {
        ExitCode::NoResults
    } else {
        ExitCode::Success
    })
}

fn run_duplicates(store: &CheckpointStore, args: &DuplicatesArgs) -> Result<ExitCode> {
    let groups = find_duplicates(store.load_or_empty());
    let exit_code = if groups.is_empty() {
        ExitCode::NoResults
    } else {
        ExitCode::Success
    };

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    match args.output {
        OutputFormat::Text => {
            for group in &groups {
                writeln!(
                    out,
                    "{} ({} copies of {}, {} reclaimable)",
                    group.hash_hex(),
                    group.len(),
                    ByteSize(group.size),
                    ByteSize(group.wasted_space())
                )?;
                for path in &group.paths {
                    writeln!(out, "  {}", path.display())?;
                }
            }
            let summary = DuplicateSummary::from_groups(&groups);
            log::info!(
                "{} duplicate groups, {} redundant files, {} reclaimable",
                summary.duplicate_groups,
                summary.duplicate_files,
                ByteSize(summary.reclaimable_space)
            );
        }
        OutputFormat::Json => {
            write_json(&JsonDuplicatesOutput::new(&groups, exit_code), &mut out, true)?;
        }
    }

    Ok(exit_code)
}

fn run_export(store: &CheckpointStore, args: &ExportArgs) -> Result<ExitCode> {
    let index = store.load_or_empty();
    let export = CsvExport::new(&index);

    let rows = if args.is_stdout() {
        export.write_to(std::io::stdout().lock())?
    } else {
        let file = File::create(&args.target)
            .with_context(|| format!("Failed to create {}", args.target.display()))?;
        let mut writer = BufWriter::new(file);
        let rows = export.write_to(&mut writer)?;
        writer
            .flush()
            .with_context(|| format!("Failed to write {}", args.target.display()))?;
        log::info!("Exported {} entries to {}", rows, args.target.display());
        rows
    };

    Ok(if rows == 0 {
        ExitCode::NoResults
    } else {
        ExitCode::Success
    })
}
