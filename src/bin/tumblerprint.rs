use std::{
    path::{Path, PathBuf},
    process::ExitCode,
};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use tumblerprint::{NormalizerKind, OrderJob, PrintConfig, PrintService, TemplateCatalog};

#[derive(Parser, Debug)]
#[command(name = "tumblerprint", version)]
struct Cli {
    /// JSON settings file; command-line flags override it.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug-level logging (RUST_LOG takes precedence when set).
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a single order record.
    Render(RenderArgs),
    /// Render many order records on a worker pool.
    Batch(BatchArgs),
}

#[derive(Parser, Debug)]
struct CommonArgs {
    /// Destination directory for rendered files.
    #[arg(long)]
    out: PathBuf,

    /// Text appended to output file names (e.g. "20oz").
    #[arg(long)]
    suffix: Option<String>,

    /// Image normalizer.
    #[arg(long, value_enum)]
    normalizer: Option<NormalizerKind>,

    /// Directory for per-order scratch files.
    #[arg(long)]
    scratch: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Order JSON record.
    #[arg(long)]
    record: PathBuf,

    /// Folder holding all of the order's files (defaults to the record's folder).
    #[arg(long)]
    root: Option<PathBuf>,

    /// Customer name used when no better name is found on disk.
    #[arg(long, default_value = "")]
    customer: String,

    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Parser, Debug)]
struct BatchArgs {
    /// Order records, or directories searched for `*.json` records.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Worker threads.
    #[arg(long)]
    workers: Option<usize>,

    /// Failure log path (defaults to `<out>/render_failures.csv`).
    #[arg(long)]
    failure_log: Option<PathBuf>,

    /// Total quantity printed in every overlay.
    #[arg(long)]
    total_quantity: Option<u32>,

    #[command(flatten)]
    common: CommonArgs,
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = match &cli.config {
        Some(path) => PrintConfig::load(path)?,
        None => PrintConfig::default(),
    };
    match cli.cmd {
        Command::Render(args) => {
            apply_common(&mut config, &args.common);
            cmd_render(config, args)
        }
        Command::Batch(args) => {
            apply_common(&mut config, &args.common);
            if let Some(workers) = args.workers {
                config.workers = workers;
            }
            if let Some(log) = &args.failure_log {
                config.failure_log = Some(log.clone());
            }
            cmd_batch(config, args)
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "tumblerprint=debug" } else { "tumblerprint=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn apply_common(config: &mut PrintConfig, common: &CommonArgs) {
    if let Some(suffix) = &common.suffix {
        config.file_suffix = suffix.clone();
    }
    if let Some(kind) = common.normalizer {
        config.normalizer = kind;
    }
    if let Some(scratch) = &common.scratch {
        config.scratch_root = scratch.clone();
    }
}

fn cmd_render(config: PrintConfig, args: RenderArgs) -> anyhow::Result<ExitCode> {
    config.validate()?;
    let mut job = OrderJob::for_record(&args.record);
    if let Some(root) = args.root {
        job.order_root = root;
    }
    job.customer_hint = args.customer;

    let service = PrintService::new(config, TemplateCatalog::standard());
    let out = service
        .render_one(&job, &args.common.out)
        .with_context(|| format!("render '{}'", args.record.display()))?;
    eprintln!("wrote {}", out.display());
    Ok(ExitCode::SUCCESS)
}

fn cmd_batch(config: PrintConfig, args: BatchArgs) -> anyhow::Result<ExitCode> {
    config.validate()?;
    let mut jobs = Vec::new();
    for input in &args.inputs {
        collect_jobs(input, &mut jobs)
            .with_context(|| format!("collect order records from '{}'", input.display()))?;
    }
    for job in &mut jobs {
        job.total_quantity = args.total_quantity;
    }
    if jobs.is_empty() {
        anyhow::bail!("no order records found");
    }

    let service = PrintService::new(config, TemplateCatalog::standard());
    let summary = service.run_batch(&jobs, &args.common.out)?;

    eprintln!(
        "succeeded: {}  failed: {}  skipped: {}",
        summary.succeeded, summary.failed, summary.skipped
    );
    for failure in &summary.failures {
        eprintln!(
            "  [{}] {}: {}",
            failure.stage,
            failure.record_path.display(),
            failure.message
        );
    }
    if summary.failed > 0 {
        eprintln!(
            "failure log: {}",
            service.config().failure_log_path(&args.common.out).display()
        );
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

/// A file is one record; a directory contributes every `*.json` beneath it, sorted.
fn collect_jobs(input: &Path, jobs: &mut Vec<OrderJob>) -> anyhow::Result<()> {
    if input.is_file() {
        jobs.push(OrderJob::for_record(input));
        return Ok(());
    }
    let mut entries: Vec<PathBuf> = std::fs::read_dir(input)?
        .flatten()
        .map(|e| e.path())
        .collect();
    entries.sort();
    for path in entries {
        if path.is_dir() {
            collect_jobs(&path, jobs)?;
        } else if path
            .extension()
            .is_some_and(|e| e.eq_ignore_ascii_case("json"))
        {
            jobs.push(OrderJob::for_record(path));
        }
    }
    Ok(())
}
