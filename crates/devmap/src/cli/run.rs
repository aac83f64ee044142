//! The `devmap run` command: filter labels, query both providers, append merged rows.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::Args;
use devmap_core::{
    read_labels, BatchOrchestrator, Config, LabelSet, Overrides, Progress, RecordWriter, RunStats,
};
use indicatif::{ProgressBar, ProgressStyle};

/// Arguments for the `run` command.
#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Input CSV file (overrides `input.path`)
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Output CSV file, appended to (overrides `output.path`)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Labels per batch and concurrent calls per provider (overrides `batch.size`)
    #[arg(short, long)]
    pub batch_size: Option<usize>,

    /// Pause between batches in milliseconds (overrides `batch.pause_ms`)
    #[arg(long)]
    pub pause_ms: Option<u64>,

    /// Print the batch plan without calling any provider
    #[arg(long)]
    pub dry_run: bool,
}

impl RunArgs {
    fn overrides(&self) -> Overrides {
        Overrides {
            input: self.input.clone(),
            output: self.output.clone(),
            batch_size: self.batch_size,
            pause_ms: self.pause_ms,
        }
    }
}

/// Execute the run command.
pub async fn execute(args: RunArgs, mut config: Config) -> anyhow::Result<()> {
    config.apply_overrides(&args.overrides())?;

    let input_path = config.input_path();
    let label_set = read_labels(&input_path, &config.input)?;
    log_label_set(&label_set);

    if label_set.labels.is_empty() {
        tracing::warn!("No valid device labels found in {:?}", input_path);
        return Ok(());
    }

    if args.dry_run {
        for line in plan_lines(&label_set.labels, config.batch.size) {
            println!("{line}");
        }
        return Ok(());
    }

    let orchestrator = BatchOrchestrator::from_config(&config)?;
    let output_path = config.output_path();
    let mut sink = RecordWriter::append_to(&output_path)?;

    let progress = create_progress_bar(label_set.labels.len() as u64);
    let start_time = Instant::now();

    let stats = orchestrator
        .run(&label_set.labels, &mut sink, |event| match event {
            Progress::BatchStarted { index, total, .. } => {
                progress.set_message(format!("batch {index}/{total}"));
            }
            Progress::RecordWritten { rows_written, .. } => {
                progress.set_message(format!("{rows_written} rows written"));
            }
            Progress::BatchFinished { labels_done, .. } => {
                progress.set_position(labels_done as u64);
            }
        })
        .await;

    progress.finish_and_clear();
    let stats = stats?;

    tracing::info!(
        "Run complete: {} rows appended to {:?} ({} primary / {} secondary failures)",
        stats.rows_written,
        output_path,
        stats.primary_failures,
        stats.secondary_failures
    );
    print_summary(&stats, start_time.elapsed());

    Ok(())
}

fn log_label_set(set: &LabelSet) {
    tracing::info!(
        "Total valid devices: {} ({} rows read, {} dropped)",
        set.labels.len(),
        set.rows_read,
        set.dropped_total()
    );
    for (reason, count) in &set.dropped {
        tracing::debug!("  dropped {count}: {reason}");
    }
}

/// One line per batch: `batch 1/3: label, label, ...`.
fn plan_lines(labels: &[String], batch_size: usize) -> Vec<String> {
    let batch_size = batch_size.max(1);
    let total = labels.len().div_ceil(batch_size);
    labels
        .chunks(batch_size)
        .enumerate()
        .map(|(i, batch)| format!("batch {}/{}: {}", i + 1, total, batch.join(", ")))
        .collect()
}

/// Create a progress bar counting labels.
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

/// Print a formatted summary table after a run.
fn print_summary(stats: &RunStats, elapsed: Duration) {
    eprintln!();
    eprintln!("  ====================================");
    eprintln!("               Summary");
    eprintln!("  ====================================");
    eprintln!("    Labels:       {:>8}", stats.labels);
    eprintln!("    Batches:      {:>8}", stats.batches);
    eprintln!("    Primary:      {:>8}", stats.primary_records);
    eprintln!("    Secondary:    {:>8}", stats.secondary_records);
    if stats.primary_failures > 0 {
        eprintln!("    Primary err:  {:>8}", stats.primary_failures);
    }
    if stats.secondary_failures > 0 {
        eprintln!("    Secondary err:{:>8}", stats.secondary_failures);
    }
    eprintln!("  ------------------------------------");
    eprintln!("    Rows written: {:>8}", stats.rows_written);
    eprintln!("    Duration:     {:>7.1}s", elapsed.as_secs_f64());
    eprintln!("  ====================================");
}
