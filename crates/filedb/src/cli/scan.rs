//! The `filedb scan` command: catalog every file of one storage object.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::time::Instant;

use clap::{Args, ValueEnum};
use futures_util::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};

use filedb_core::model::{ObjectId, Root, StorageObject};
use filedb_core::{
    Catalog, CommitSummary, Config, DiscoveredFile, FileDiscovery, Ingestor,
    OutputFormat as CoreOutputFormat, OutputWriter, RecordBatcher, ScanStats,
};

/// Supported output formats.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum OutputFormat {
    /// A single JSON array
    Json,
    /// One JSON object per line (newline-delimited)
    Jsonl,
}

impl From<OutputFormat> for CoreOutputFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Json => CoreOutputFormat::Json,
            OutputFormat::Jsonl => CoreOutputFormat::JsonLines,
        }
    }
}

/// Arguments for the `scan` command.
#[derive(Args, Debug)]
pub struct ScanArgs {
    /// Object directory (or single file) to scan
    #[arg(required = true)]
    pub input: PathBuf,

    /// BDRC identifier of the storage object, e.g. W22084
    #[arg(long)]
    pub object: String,

    /// Storage root name [default: catalog.root_name]
    #[arg(long)]
    pub root: Option<String>,

    /// Output file (defaults to stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Output format [default: output.format]
    #[arg(short, long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Number of files processed concurrently [default: processing.parallel_workers]
    #[arg(short, long)]
    pub parallel: Option<usize>,
}

pub async fn execute(args: ScanArgs, mut config: Config) -> anyhow::Result<()> {
    if let Some(parallel) = args.parallel {
        config.processing.parallel_workers = parallel;
    }
    config.validate()?;
    let format = resolve_format(&args, &config)?;

    let files = FileDiscovery::new(config.processing.clone()).discover(&args.input);
    if files.is_empty() {
        tracing::warn!("No files found at {:?}", args.input);
        return Ok(());
    }
    tracing::info!(
        "Found {} file(s), {} bytes, under {:?}",
        files.len(),
        FileDiscovery::total_size(&files),
        args.input
    );

    let writer: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(BufWriter::new(io::stdout())),
    };
    let mut writer = OutputWriter::new(writer, format, config.output.pretty);

    let progress = create_progress_bar(files.len() as u64);
    let report = run_scan(&config, &args, files, &mut writer, &progress).await?;
    progress.finish_and_clear();

    let written = writer.items_written();
    writer.finish()?;
    match &args.output {
        Some(path) => tracing::info!("{written} record(s) written to {:?}", path),
        None => tracing::debug!("{written} record(s) written to stdout"),
    }
    tracing::debug!(
        "Catalog: {} object(s), {} file(s), {} path(s)",
        report.catalog.object_count(),
        report.catalog.file_count(),
        report.catalog.path_count()
    );
    print_summary(&report.stats, &report.totals);
    Ok(())
}

/// Outcome of a scan.
struct ScanReport {
    stats: ScanStats,
    totals: CommitSummary,
    catalog: Catalog,
}

fn resolve_format(args: &ScanArgs, config: &Config) -> anyhow::Result<CoreOutputFormat> {
    match args.format {
        Some(format) => Ok(format.into()),
        None => CoreOutputFormat::parse(&config.output.format)
            .ok_or_else(|| anyhow::anyhow!("Unknown output format: {}", config.output.format)),
    }
}

/// Register the root and object that discovered files are filed under.
fn open_catalog(args: &ScanArgs, config: &Config) -> anyhow::Result<(Catalog, ObjectId)> {
    let mut catalog = Catalog::new();
    let root_name = args.root.as_deref().unwrap_or(&config.catalog.root_name);
    let root = catalog.upsert_root(Root::new(root_name, config.catalog.root_layout.as_str())?);
    let object = catalog.upsert_object(StorageObject::new(args.object.as_str(), root)?)?;
    Ok((catalog, object))
}

/// Ingest every file, stream entries to `writer` and register them in batches.
///
/// Unsupported and unreadable files are counted and skipped; the scan goes on.
/// The caller finishes the writer.
async fn run_scan<W: Write>(
    config: &Config,
    args: &ScanArgs,
    files: Vec<DiscoveredFile>,
    writer: &mut OutputWriter<W>,
    progress: &ProgressBar,
) -> anyhow::Result<ScanReport> {
    let (catalog, object) = open_catalog(args, config)?;
    let mut batcher = RecordBatcher::new(catalog, config.catalog.batch_size);
    let ingestor = Ingestor::new(config);

    let mut stats = ScanStats::default();
    let start = Instant::now();

    let results = ingestor.ingest_all(files);
    futures_util::pin_mut!(results);
    while let Some(result) = results.next().await {
        match result {
            Ok(entry) => {
                stats.succeeded += 1;
                stats.bytes += entry.file.size;
                writer.write(&entry)?;
                batcher.push(entry.to_record(object))?;
            }
            Err(e) if e.is_unreadable() => {
                stats.unreadable += 1;
                tracing::error!("Unreadable: {e}");
            }
            Err(e) => {
                stats.unsupported += 1;
                tracing::warn!("Skipped: {e}");
            }
        }

        progress.inc(1);
        let elapsed = start.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            let done = stats.succeeded + stats.failed();
            progress.set_message(format!("{:.1} files/sec", done as f64 / elapsed));
        }
    }

    let (catalog, totals) = batcher.finish()?;

    stats.distinct_files = catalog.file_count();
    stats.paths = catalog.path_count();
    stats.finish(start.elapsed());

    Ok(ScanReport {
        stats,
        totals,
        catalog,
    })
}

fn create_progress_bar(total: u64) -> ProgressBar {
    let pb = ProgressBar::new(total);
    let style = ProgressStyle::default_bar()
        .template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##-");
    pb.set_style(style);
    pb.set_message("starting...");
    pb
}

fn print_summary(stats: &ScanStats, totals: &CommitSummary) {
    let mb_processed = stats.bytes as f64 / 1_000_000.0;
    let throughput = if stats.total_seconds > 0.0 {
        mb_processed / stats.total_seconds
    } else {
        0.0
    };

    eprintln!();
    eprintln!("  ====================================");
    eprintln!("               Summary");
    eprintln!("  ====================================");
    eprintln!("    Cataloged:    {:>8}", stats.succeeded);
    if stats.unsupported > 0 {
        eprintln!("    Unsupported:  {:>8}", stats.unsupported);
    }
    if stats.unreadable > 0 {
        eprintln!("    Unreadable:   {:>8}", stats.unreadable);
    }
    eprintln!("  ------------------------------------");
    eprintln!("    Paths:        {:>8}", stats.paths);
    eprintln!("    Distinct:     {:>8}", stats.distinct_files);
    if totals.ids_reassigned > 0 {
        eprintln!("    Ids re-rolled:{:>8}", totals.ids_reassigned);
    }
    eprintln!("    Duration:     {:>7.1}s", stats.total_seconds);
    eprintln!("    Rate:         {:>7.1} files/sec", stats.files_per_second);
    eprintln!("    Throughput:   {:>7.1} MB/sec", throughput);
    eprintln!("  ====================================");
}
