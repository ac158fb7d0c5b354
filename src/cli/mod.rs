//! # CLI Module
//!
//! Command-line interface for the symbol decoder.
//!
//! ## Usage
//! ```bash
//! # Decode the PDF417 on one licence photo
//! symbol-sieve decode licence.jpg
//!
//! # Decode a directory tree with 4 workers, JSON output
//! symbol-sieve batch ~/Scans --recursive --workers 4 --output json
//!
//! # Look for QR codes with the rqrr backend instead
//! symbol-sieve --format qr --recognizer rqrr decode receipt.png
//!
//! # Cache maintenance
//! symbol-sieve cache stats
//! symbol-sieve cache clear-expired
//! ```
//!
//! Exit status: 0 when at least one symbol was found, 1 when none was,
//! 2 on error.

use clap::{Parser, Subcommand, ValueEnum};
use console::{style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::thread;
use symbol_sieve::config::{discover_config, AppConfig};
use symbol_sieve::core::batch::{BatchOrchestrator, BatchReport, ExecutionMode};
use symbol_sieve::core::cache::{CacheStats, ResultCache};
use symbol_sieve::core::decoder::{Decoded, ImageDecoder};
use symbol_sieve::core::detection::Detection;
use symbol_sieve::core::recognizer::{RecognizerKind, SymbolFormat};
use symbol_sieve::error::Result;
use symbol_sieve::events::{event_channel, BatchEvent, Event, ScanEvent};
use tracing::warn;

/// Symbol Sieve - Decode symbols from imperfect document photos
#[derive(Parser, Debug)]
#[command(name = "symbol-sieve")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (default: ./.symbol-sieve.toml, ./symbol-sieve.toml, user config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Cache directory
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,

    /// Cache entry lifetime in seconds
    #[arg(long, global = true)]
    ttl: Option<u64>,

    /// Do not read or write the result cache
    #[arg(long, global = true)]
    no_cache: bool,

    /// Symbol format to look for
    #[arg(short, long, global = true)]
    format: Option<Format>,

    /// Recognizer backend
    #[arg(long, global = true)]
    recognizer: Option<Backend>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Decode symbols in one image
    Decode {
        /// Image file
        image: PathBuf,

        /// Output format
        #[arg(short, long, default_value = "pretty")]
        output: OutputFormat,
    },

    /// Decode every image in a directory
    Batch {
        /// Directory to process
        dir: PathBuf,

        /// Descend into subdirectories
        #[arg(short, long)]
        recursive: bool,

        /// Number of worker threads
        #[arg(short, long)]
        workers: Option<usize>,

        /// Process one file at a time
        #[arg(long, conflicts_with = "workers")]
        sequential: bool,

        /// Include hidden files
        #[arg(long)]
        include_hidden: bool,

        /// Output format
        #[arg(short, long, default_value = "pretty")]
        output: OutputFormat,
    },

    /// Inspect or clean the result cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum CacheAction {
    /// Show entry counts and size
    Stats,
    /// Remove every entry
    Clear,
    /// Remove entries older than the TTL
    ClearExpired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    /// PDF417 (driver licences, boarding passes)
    Pdf417,
    /// QR codes
    Qr,
    /// Data Matrix
    Datamatrix,
    /// Code 128
    Code128,
}

impl From<Format> for SymbolFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Qr => SymbolFormat::QrCode,
            Format::Pdf417 => SymbolFormat::Pdf417,
            Format::Datamatrix => SymbolFormat::DataMatrix,
            Format::Code128 => SymbolFormat::Code128,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Backend {
    /// rxing: every format
    Rxing,
    /// rqrr: QR codes only
    Rqrr,
}

impl From<Backend> for RecognizerKind {
    fn from(backend: Backend) -> Self {
        match backend {
            Backend::Rxing => RecognizerKind::Rxing,
            Backend::Rqrr => RecognizerKind::Rqrr,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Human-readable output with colors
    Pretty,
    /// JSON output for scripting
    Json,
    /// Minimal output (payloads only)
    Minimal,
}

/// Run the CLI
pub fn run() -> ExitCode {
    let cli = Cli::parse();

    match execute(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            Term::stderr()
                .write_line(&format!("{} {}", style("error:").red().bold(), e))
                .ok();
            ExitCode::from(2)
        }
    }
}

/// Returns whether anything was found
fn execute(cli: Cli) -> Result<bool> {
    let config = resolve_config(&cli)?;

    let level = if cli.verbose {
        "symbol_sieve=debug"
    } else {
        config.logging.level.as_str()
    };
    symbol_sieve::init_tracing(level);

    match cli.command {
        Commands::Decode { image, output } => run_decode(&config, &image, output),
        Commands::Batch {
            dir,
            recursive,
            workers,
            sequential,
            include_hidden,
            output,
        } => {
            let mut config = config;
            config.batch.recursive |= recursive;
            if workers.is_some() {
                config.batch.workers = workers;
            }
            if sequential {
                config.batch.parallel = false;
            }
            run_batch(&config, &dir, include_hidden, output, cli.verbose)
        }
        Commands::Cache { action } => run_cache(&config, action),
    }
}

/// File settings with command-line overrides applied
fn resolve_config(cli: &Cli) -> Result<AppConfig> {
    let working_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let mut config = discover_config(cli.config.as_deref(), &working_dir)?;

    if let Some(dir) = &cli.cache_dir {
        config.cache.directory = Some(dir.clone());
    }
    if let Some(ttl) = cli.ttl {
        config.cache.ttl_secs = ttl;
    }
    if cli.no_cache {
        config.cache.enabled = false;
    }
    if let Some(format) = cli.format {
        config.decode.format = format.into();
    }
    if let Some(backend) = cli.recognizer {
        config.decode.recognizer = backend.into();
    }

    Ok(config)
}

/// Cache for decoding; a cache that cannot be opened is skipped, not fatal
fn decode_cache(config: &AppConfig) -> ResultCache {
    if !config.cache.enabled {
        return ResultCache::disabled();
    }

    ResultCache::persistent(&config.cache.resolved_directory(), config.cache.ttl())
        .unwrap_or_else(|e| {
            warn!("{}; continuing without cache", e);
            ResultCache::disabled()
        })
}

fn run_decode(config: &AppConfig, image: &Path, output: OutputFormat) -> Result<bool> {
    let decoder = ImageDecoder::new(config.decode.recognizer.build(), config.decode.format)?;
    let cache = decode_cache(config);

    let decoded = decoder.decode_file_cached(image, &cache)?;

    match output {
        OutputFormat::Pretty => print_pretty_decode(&Term::stdout(), image, &decoded),
        OutputFormat::Json => print_json(&serde_json::json!({
            "image_path": image,
            "success": true,
            "cache_hit": decoded.cache_hit,
            "results": decoded.detections,
        })),
        OutputFormat::Minimal => {
            for detection in &decoded.detections {
                println!("{}", detection.payload);
            }
        }
    }

    Ok(!decoded.detections.is_empty())
}

fn run_batch(
    config: &AppConfig,
    dir: &Path,
    include_hidden: bool,
    output: OutputFormat,
    verbose: bool,
) -> Result<bool> {
    let term = Term::stderr();

    if output == OutputFormat::Pretty {
        term.write_line(&format!(
            "{} {}",
            style("Symbol Sieve").bold().cyan(),
            style(concat!("v", env!("CARGO_PKG_VERSION"))).dim()
        ))
        .ok();
        term.write_line("").ok();
    }

    let mut builder = BatchOrchestrator::builder()
        .root(dir)
        .recursive(config.batch.recursive)
        .include_hidden(include_hidden)
        .extensions(config.batch.extensions.clone())
        .recognizer(config.decode.recognizer.build())
        .format(config.decode.format)
        .cache(Arc::new(decode_cache(config)))
        .mode(if config.batch.parallel {
            ExecutionMode::Parallel
        } else {
            ExecutionMode::Sequential
        });
    if let Some(workers) = config.batch.workers {
        builder = builder.workers(workers);
    }
    let orchestrator = builder.build()?;

    let (sender, receiver) = event_channel();

    // Progress bar for pretty output
    let progress = if output == OutputFormat::Pretty {
        let pb = ProgressBar::new(0);
        let bar_style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .map(|s| s.progress_chars("█▓░"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        pb.set_style(bar_style);
        Some(pb)
    } else {
        None
    };

    let progress_clone = progress.clone();

    // Handle events in a separate thread
    let event_thread = thread::spawn(move || {
        for event in receiver.iter() {
            let Some(pb) = &progress_clone else {
                continue;
            };

            match event {
                Event::Scan(ScanEvent::Started { .. }) => pb.set_message("scanning"),
                Event::Scan(ScanEvent::Completed { total_files }) => {
                    pb.set_length(total_files as u64);
                }
                Event::Batch(BatchEvent::Started { workers, .. }) => {
                    pb.set_message(format!("decoding ({} workers)", workers));
                }
                Event::Batch(BatchEvent::FileCompleted(p)) => {
                    pb.set_position(p.completed as u64);
                    if verbose {
                        pb.set_message(format!(
                            "{} ({} found)",
                            p.path.file_name().unwrap_or_default().to_string_lossy(),
                            p.detections
                        ));
                    }
                }
                Event::Batch(BatchEvent::Completed { .. }) => pb.finish_and_clear(),
                _ => {}
            }
        }
    });

    let result = orchestrator.run_with_events(&sender);

    // Drop sender to signal event thread to finish
    drop(sender);
    event_thread.join().ok();
    if let Some(pb) = progress {
        pb.finish_and_clear();
    }

    let report = result?;

    match output {
        OutputFormat::Pretty => print_pretty_batch(&term, &report, verbose),
        OutputFormat::Json => print_json(&report),
        OutputFormat::Minimal => {
            for outcome in &report.outcomes {
                for detection in outcome.results() {
                    println!("{}\t{}", outcome.image_path.display(), detection.payload);
                }
            }
        }
    }

    Ok(report.total_detections() > 0)
}

fn run_cache(config: &AppConfig, action: CacheAction) -> Result<bool> {
    let term = Term::stdout();
    let directory = config.cache.resolved_directory();
    let cache = ResultCache::persistent(&directory, config.cache.ttl())?;

    match action {
        CacheAction::Stats => print_cache_stats(&term, &directory, &cache.stats()),
        CacheAction::Clear => {
            let removed = cache.clear();
            term.write_line(&format!("Removed {} cache entries", style(removed).cyan()))
                .ok();
        }
        CacheAction::ClearExpired => {
            let removed = cache.clear_expired();
            term.write_line(&format!(
                "Removed {} expired cache entries",
                style(removed).cyan()
            ))
            .ok();
        }
    }

    Ok(true)
}

fn print_pretty_decode(term: &Term, image: &Path, decoded: &Decoded) {
    if decoded.detections.is_empty() {
        term.write_line(&format!(
            "{} No symbols found in {}",
            style("✗").red().bold(),
            image.display()
        ))
        .ok();
        return;
    }

    term.write_line(&format!(
        "{} {} symbol(s) in {}{}",
        style("✓").green().bold(),
        style(decoded.detections.len()).cyan(),
        image.display(),
        if decoded.cache_hit {
            style(" (cached)").dim().to_string()
        } else {
            String::new()
        }
    ))
    .ok();

    for (i, detection) in decoded.detections.iter().enumerate() {
        write_detection(term, i + 1, detection);
    }
}

fn write_detection(term: &Term, number: usize, detection: &Detection) {
    term.write_line(&format!(
        "  {} {} {}",
        style(format!("[{}]", number)).bold(),
        style(&detection.symbol_kind).yellow(),
        detection.payload
    ))
    .ok();
    term.write_line(&format!(
        "      {}",
        style(format!(
            "at {} via method_{}, quality {}",
            detection.rect, detection.method_index, detection.quality
        ))
        .dim()
    ))
    .ok();
}

fn print_pretty_batch(term: &Term, report: &BatchReport, verbose: bool) {
    term.write_line(&format!("{} Batch Complete", style("✓").green().bold()))
        .ok();
    term.write_line("").ok();

    term.write_line(&format!(
        "  {} files processed in {:.1}s",
        style(report.total_files).cyan(),
        report.duration_ms as f64 / 1000.0
    ))
    .ok();
    term.write_line(&format!(
        "  {} symbols found",
        style(report.total_detections()).cyan()
    ))
    .ok();
    if report.failed > 0 {
        term.write_line(&format!("  {} files failed", style(report.failed).red()))
            .ok();
    }
    if report.cache_hits > 0 {
        term.write_line(&format!("  {} cache hits", style(report.cache_hits).dim()))
            .ok();
    }
    term.write_line("").ok();

    for outcome in &report.outcomes {
        let path = display_path(&outcome.image_path);

        if let Some(error) = outcome.error() {
            term.write_line(&format!("{} {}", style("✗").red(), path)).ok();
            term.write_line(&format!("    {}", style(error).red().dim())).ok();
            continue;
        }

        let results = outcome.results();
        if results.is_empty() && !verbose {
            continue;
        }

        term.write_line(&format!(
            "{} {} ({} found)",
            style("●").green(),
            path,
            results.len()
        ))
        .ok();
        for (i, detection) in results.iter().enumerate() {
            write_detection(term, i + 1, detection);
        }
    }
}

fn print_cache_stats(term: &Term, directory: &Path, stats: &CacheStats) {
    term.write_line(&format!("{}", style("Result cache").bold().underlined()))
        .ok();
    term.write_line(&format!("  directory  {}", display_path(directory)))
        .ok();
    term.write_line(&format!("  entries    {}", style(stats.total_entries).cyan()))
        .ok();
    term.write_line(&format!("  valid      {}", style(stats.valid_entries).green()))
        .ok();
    term.write_line(&format!("  expired    {}", style(stats.expired_entries).yellow()))
        .ok();
    term.write_line(&format!("  size       {}", format_bytes(stats.total_size_bytes)))
        .ok();
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => warn!("Failed to render JSON output: {}", e),
    }
}

/// Abbreviate paths under the home directory with `~`
fn display_path(path: &Path) -> String {
    dirs::home_dir()
        .and_then(|home| path.strip_prefix(home).ok().map(|rest| format!("~/{}", rest.display())))
        .unwrap_or_else(|| path.display().to_string())
}

fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}
