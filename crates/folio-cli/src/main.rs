//! Folio CLI: batch image compression and PDF tools.
//!
//! Configuration comes from FOLIO_* environment variables (and `.env`).
//! Results are written into `--out` or FOLIO_OUTPUT_DIR; existing files are
//! never overwritten.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use bytes::Bytes;
use clap::{Args, Parser, Subcommand};
use folio_cli::{init_tracing, truncate_name, Session};
use folio_core::{
    format_file_size, AggregateStats, AppError, Config, ErrorMetadata, OutputFormat,
    ProcessingStatus, ResizeBounds, Settings, SourceFile, ToolMode,
};
use folio_processing::BatchSummary;
use folio_storage::{ExportReport, Exporter, LocalSaveTarget};
use serde::Serialize;

#[derive(Parser)]
#[command(name = "folio", about = "Batch image and PDF tools", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output directory (defaults to FOLIO_OUTPUT_DIR)
    #[arg(long, global = true, value_name = "DIR")]
    out: Option<PathBuf>,

    /// Print the batch report as JSON instead of a table
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Compress, resize and filter images
    Compress {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        #[command(flatten)]
        options: CompressArgs,
    },
    /// Combine images into one PDF, one page per image
    ImageToPdf {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Render every PDF page as a PNG image
    PdfToImage {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Merge PDFs into one document, in the given order
    Merge {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Split PDFs into single-page documents
    Split {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Rotate every page of PDFs
    Rotate {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Clockwise rotation in degrees, a multiple of 90
        #[arg(long, allow_hyphen_values = true)]
        rotate: f32,
    },
}

#[derive(Args)]
struct CompressArgs {
    /// Lossy quality, 0-100 (defaults to FOLIO_DEFAULT_QUALITY)
    #[arg(long)]
    quality: Option<u8>,
    /// Output format: original, jpeg, png or webp
    #[arg(long, default_value = "original")]
    format: String,
    #[arg(long)]
    max_width: Option<u32>,
    #[arg(long)]
    max_height: Option<u32>,
    /// Clockwise rotation in degrees
    #[arg(long, default_value = "0", allow_hyphen_values = true)]
    rotate: f32,
    #[arg(long)]
    flip_h: bool,
    #[arg(long)]
    flip_v: bool,
    /// Brightness in percent (100 = unchanged)
    #[arg(long, default_value = "100")]
    brightness: u16,
    /// Contrast in percent (100 = unchanged)
    #[arg(long, default_value = "100")]
    contrast: u16,
    /// Saturation in percent (100 = unchanged)
    #[arg(long, default_value = "100")]
    saturation: u16,
    #[arg(long)]
    grayscale: bool,
    #[arg(long)]
    sepia: bool,
    /// Blur radius in pixels
    #[arg(long, default_value = "0")]
    blur: f32,
    /// Lower the quality until the output fits this size (lossy formats)
    #[arg(long)]
    target_kb: Option<u32>,
    /// Copy the source EXIF block into the output
    #[arg(long)]
    keep_exif: bool,
    /// Ignore the EXIF orientation tag
    #[arg(long)]
    no_auto_orient: bool,
}

impl CompressArgs {
    fn into_settings(self, default_quality: u8) -> anyhow::Result<Settings> {
        let format: OutputFormat = self.format.parse()?;
        Ok(Settings {
            quality: self.quality.unwrap_or(default_quality),
            format,
            resize: ResizeBounds::new(self.max_width, self.max_height),
            rotation: self.rotate,
            flip_horizontal: self.flip_h,
            flip_vertical: self.flip_v,
            brightness: self.brightness,
            contrast: self.contrast,
            saturation: self.saturation,
            grayscale: self.grayscale,
            sepia: self.sepia,
            blur: self.blur,
            target_kb: self.target_kb,
            remove_exif: !self.keep_exif,
            auto_orient: !self.no_auto_orient,
        })
    }
}

#[derive(Serialize)]
struct RecordLine {
    name: String,
    status: ProcessingStatus,
    original_size: u64,
    processed_size: Option<u64>,
    outputs: Vec<String>,
    error: Option<String>,
}

#[derive(Serialize)]
struct BatchOutput {
    mode: ToolMode,
    output_dir: PathBuf,
    summary: BatchSummary,
    records: Vec<RecordLine>,
    stats: AggregateStats,
    export: ExportReport,
}

impl BatchOutput {
    fn is_success(&self) -> bool {
        self.summary.failed == 0 && self.export.is_success()
    }
}

async fn read_sources(paths: &[PathBuf]) -> anyhow::Result<Vec<SourceFile>> {
    futures::future::try_join_all(paths.iter().map(|path| async move {
        let data = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        Ok::<_, anyhow::Error>(SourceFile::new(name, None, Bytes::from(data)))
    }))
    .await
}

async fn run_batch(
    config: Config,
    mode: ToolMode,
    settings: Settings,
    files: &[PathBuf],
) -> anyhow::Result<BatchOutput> {
    let session = Session::new(config, mode);
    session.update_settings(settings)?;

    let sources = read_sources(files).await?;
    let ingest = session.ingest(sources)?;
    if ingest.added.is_empty() {
        anyhow::bail!("None of the given files can be used by {}", mode);
    }

    let summary = session.process().await?;

    let output_dir = session.config().output_dir().to_path_buf();
    let export = if session.store().snapshot().iter().any(|r| !r.artifacts().is_empty()) {
        let target = LocalSaveTarget::new(&output_dir).await?;
        let exporter = Exporter::from_config(Arc::new(target), session.config());
        session.export(&exporter).await?
    } else {
        ExportReport::default()
    };

    let records = session
        .store()
        .snapshot()
        .into_iter()
        .map(|record| RecordLine {
            processed_size: record
                .result
                .as_ref()
                .map(|r| r.total_size()),
            outputs: record.artifacts().iter().map(|a| a.name.clone()).collect(),
            name: record.name,
            status: record.status,
            original_size: record.size_bytes,
            error: record.error,
        })
        .collect();

    Ok(BatchOutput {
        mode,
        output_dir,
        summary,
        records,
        stats: session.stats(),
        export,
    })
}

fn print_table(output: &BatchOutput) {
    println!("\n=== folio {} ===\n", output.mode);
    println!(
        "{:<36} {:<10} {:>12} {:>12}",
        "NAME", "STATUS", "ORIGINAL", "PROCESSED"
    );
    for line in &output.records {
        let processed = line
            .processed_size
            .map(format_file_size)
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<36} {:<10} {:>12} {:>12}",
            truncate_name(&line.name, 36),
            line.status.to_string(),
            format_file_size(line.original_size),
            processed
        );
        if let Some(error) = &line.error {
            println!("    error: {}", error);
        }
    }

    let stats = &output.stats;
    println!("\n--- Totals ---");
    println!("Files:      {:>6}", stats.total_files);
    println!(
        "Completed:  {:>6}   Errors: {}   Skipped: {}",
        stats.completed, stats.error, output.summary.skipped
    );
    println!("Original:   {:>12}", format_file_size(stats.original_size));
    println!("Processed:  {:>12}", format_file_size(stats.processed_size));
    if stats.savings >= 0 {
        println!(
            "Saved:      {:>12} ({:.1}% average)",
            format_file_size(stats.savings as u64),
            stats.average_ratio
        );
    } else {
        println!(
            "Grew by:    {:>12}",
            format_file_size(stats.savings.unsigned_abs())
        );
    }
    println!("Time:       {:>9} ms", output.summary.duration_ms);

    if !output.export.saved.is_empty() {
        println!(
            "\nExported {} file(s) to {}",
            output.export.saved.len(),
            output.output_dir.display()
        );
        for file in &output.export.saved {
            println!("  {}", file.name);
        }
    }
    for failure in &output.export.failures {
        println!("Export failed for {}: {}", failure.name, failure.error);
    }
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize report")?;
    println!("{}", out);
    Ok(())
}

fn output_dir_override(config: Config, out: Option<&Path>) -> Config {
    match out {
        Some(dir) => config.with_output_dir(dir),
        None => config,
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let config = Config::from_env().context("Failed to load configuration")?;
    config.validate()?;
    init_tracing(config.log_filter());
    let config = output_dir_override(config, cli.out.as_deref());

    let default_settings = Settings::with_quality(config.default_quality());
    let (mode, settings, files) = match cli.command {
        Commands::Compress { files, options } => (
            ToolMode::Compress,
            options.into_settings(config.default_quality())?,
            files,
        ),
        Commands::ImageToPdf { files } => (ToolMode::ImageToPdf, default_settings, files),
        Commands::PdfToImage { files } => (ToolMode::PdfToImage, default_settings, files),
        Commands::Merge { files } => (ToolMode::MergePdf, default_settings, files),
        Commands::Split { files } => (ToolMode::SplitPdf, default_settings, files),
        Commands::Rotate { files, rotate } => (
            ToolMode::RotatePdf,
            Settings {
                rotation: rotate,
                ..default_settings
            },
            files,
        ),
    };

    let output = run_batch(config, mode, settings, &files).await?;
    if cli.json {
        print_json(&output)?;
    } else {
        print_table(&output);
    }

    Ok(if output.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            match e.downcast_ref::<AppError>() {
                Some(app_error) => {
                    if let Some(action) = app_error.suggested_action() {
                        eprintln!("Hint: {}", action);
                    }
                    ExitCode::from(app_error.exit_code().clamp(1, 255) as u8)
                }
                None => ExitCode::FAILURE,
            }
        }
    }
}
