//! CLI binary for pdf2pagejson.
//!
//! A thin shim over the library crate that maps CLI flags to `ParseConfig`
//! and writes `<stem>.json` next to the input (or into `--save_folder`).

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pdf2pagejson::{
    parse_document, parse_to_file, ParseConfig, ParseProgressCallback, ProgressCallback, TableFormat,
};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: one bar over the element stream, plus a log
/// line for every table failure.
struct CliProgressCallback {
    bar: ProgressBar,
    tables: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(TICKS),
        );
        bar.set_prefix("Preparing");
        bar.set_message("Partitioning document…");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self {
            bar,
            tables: AtomicUsize::new(0),
        })
    }
}

impl ParseProgressCallback for CliProgressCallback {
    fn on_parse_start(&self, total_elements: usize) {
        self.bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.cyan} {prefix:.bold}  \
                 [{bar:42.green/238}] {pos:>5}/{len} elements  {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏  ")
            .tick_strings(TICKS),
        );
        self.bar.set_length(total_elements as u64);
        self.bar.set_prefix("Assembling");
        self.bar.set_message("");
    }

    fn on_element_done(&self, _index: usize) {
        self.bar.inc(1);
    }

    fn on_table_start(&self, page_number: u32) {
        self.bar.set_message(format!("table on page {page_number}"));
    }

    fn on_table_complete(&self, _page_number: u32, tables: usize) {
        self.tables.fetch_add(tables, Ordering::SeqCst);
        self.bar.set_message("");
    }

    fn on_table_error(&self, page_number: u32, error: &str) {
        let msg: String = if error.chars().count() > 80 {
            error.chars().take(79).chain(std::iter::once('…')).collect()
        } else {
            error.to_string()
        };
        self.bar
            .println(format!("  {} Table on page {:>3}  {}", red("✗"), page_number, red(&msg)));
    }

    fn on_parse_complete(&self, pages: usize, failed_tables: usize) {
        self.bar.finish_and_clear();
        let tables = self.tables.load(Ordering::SeqCst);
        if failed_tables == 0 {
            eprintln!(
                "{} {} pages, {} tables",
                green("✔"),
                bold(&pages.to_string()),
                bold(&tables.to_string())
            );
        } else {
            eprintln!(
                "{} {} pages, {} tables  ({} table failures)",
                cyan("⚠"),
                bold(&pages.to_string()),
                bold(&tables.to_string()),
                red(&failed_tables.to_string())
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Partition remotely, detect tables, write report.json next to the PDF
  parse-document --document_path report.pdf \
      --partition-url http://localhost:8000/general/v0/general \
      --table-service-url http://localhost:8080/v1/tables

  # Use a pre-computed element export and write into out/
  parse-document --document_path report.pdf --elements report.elements.json \
      --table-service-url http://localhost:8080/v1/tables --save_folder out/

  # HTML tables, printed to stdout
  parse-document --document_path report.pdf --elements els.json \
      --table-format html --stdout

ENVIRONMENT VARIABLES:
  PARTITION_URL           Layout partitioner endpoint
  UNSTRUCTURED_API_KEY    Partitioner API key
  TABLE_SERVICE_URL       Table-detection endpoint
  TABLE_SERVICE_TOKEN     Bearer token for the table-detection service
  PDFIUM_LIB_PATH         Path to an existing libpdfium (skips auto-download)
  RUST_LOG                Log filter, e.g. pdf2pagejson=debug
"#;

/// Convert a PDF into page-keyed JSON with boilerplate removed and tables
/// rebuilt from OCR cell detections.
#[derive(Parser, Debug)]
#[command(
    name = "parse-document",
    version,
    about = "Convert a PDF into page-keyed JSON text with OCR-reconstructed tables",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Path of the PDF to parse.
    #[arg(long = "document_path", visible_alias = "document-path")]
    document_path: PathBuf,

    /// Folder for the output JSON. Default: the input's folder.
    #[arg(long = "save_folder", visible_alias = "save-folder")]
    save_folder: Option<PathBuf>,

    /// Pre-computed element JSON (skips remote partitioning).
    #[arg(long, env = "ELEMENTS_PATH")]
    elements: Option<PathBuf>,

    /// Layout partitioner endpoint.
    #[arg(long, env = "PARTITION_URL")]
    partition_url: Option<String>,

    /// Partitioner API key.
    #[arg(long, env = "UNSTRUCTURED_API_KEY", hide_env_values = true)]
    partition_api_key: Option<String>,

    /// Partitioning strategy.
    #[arg(long, env = "PARTITION_STRATEGY", default_value = "hi_res")]
    strategy: String,

    /// OCR languages, comma separated.
    #[arg(long, env = "PARTITION_LANGUAGES", value_delimiter = ',', default_value = "ita,eng")]
    languages: Vec<String>,

    /// Table-detection service endpoint.
    #[arg(long, env = "TABLE_SERVICE_URL")]
    table_service_url: Option<String>,

    /// Bearer token for the table-detection service.
    #[arg(long, env = "TABLE_SERVICE_TOKEN", hide_env_values = true)]
    table_service_token: Option<String>,

    /// Table rendering: markdown or html.
    #[arg(long, env = "TABLE_FORMAT", value_enum, default_value = "markdown")]
    table_format: TableFormatArg,

    /// Page render DPI for table crops (72–600).
    #[arg(long, env = "RENDER_DPI", default_value_t = 200,
          value_parser = clap::value_parser!(u32).range(72..=600))]
    dpi: u32,

    /// Extra margin around table crops, in millimetres.
    #[arg(long, env = "CROP_MARGIN_MM", default_value_t = 0.0)]
    margin_mm: f32,

    /// Texts seen this many times or more are dropped as boilerplate.
    #[arg(long, env = "REPETITION_THRESHOLD", default_value_t = 10)]
    repetition_threshold: usize,

    /// Also count list items when detecting boilerplate.
    #[arg(long)]
    count_list_items: bool,

    /// Retries per table on a transient service failure.
    #[arg(long, env = "MAX_RETRIES", default_value_t = 3)]
    max_retries: u32,

    /// Per-request timeout for external services, in seconds.
    #[arg(long, env = "API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "PDF_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Print the JSON to stdout instead of writing a file.
    #[arg(long)]
    stdout: bool,

    /// Disable progress bar.
    #[arg(long)]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long)]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum TableFormatArg {
    Markdown,
    Html,
}

impl From<TableFormatArg> for TableFormat {
    fn from(v: TableFormatArg) -> Self {
        match v {
            TableFormatArg::Markdown => TableFormat::Markdown,
            TableFormatArg::Html => TableFormat::Html,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar provides the feedback when active, so library logs
    // drop to ERROR unless -v is given.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.stdout;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Ensure PDFium engine is available ───────────────────────────────────
    // First run downloads the library into the user cache; later runs only
    // check the path. Without the library every table is recorded as a
    // render failure; prose is still extracted.
    if !pdfium_auto::is_pdfium_cached() {
        if !cli.quiet {
            let dl_bar = ProgressBar::new(0);
            dl_bar.set_style(
                ProgressStyle::with_template(
                    "{spinner:.cyan} {prefix:.bold}  \
                     [{bar:42.green/238}] {bytes}/{total_bytes}  ETA {eta_precise}",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▉▊▋▌▍▎▏  ")
                .tick_strings(TICKS),
            );
            dl_bar.set_prefix("PDF engine");
            dl_bar.enable_steady_tick(Duration::from_millis(80));

            let bar = dl_bar.clone();
            let engine = tokio::task::block_in_place(|| {
                pdfium_auto::ensure_pdfium_library(Some(&|downloaded, total| {
                    if let Some(t) = total {
                        if bar.length().unwrap_or(0) != t {
                            bar.set_length(t);
                        }
                    }
                    bar.set_position(downloaded);
                }))
            });

            match engine {
                Ok(_) => dl_bar.finish_with_message("ready ✓"),
                Err(e) => {
                    dl_bar.abandon_with_message("unavailable");
                    warn!("PDFium download failed, tables will fail to render: {e}");
                }
            }
        } else if let Err(e) =
            tokio::task::block_in_place(|| pdfium_auto::ensure_pdfium_library(None))
        {
            warn!("PDFium download failed, tables will fail to render: {e}");
        }
    }

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn ParseProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;

    // ── Run ──────────────────────────────────────────────────────────────
    if cli.stdout {
        let output = parse_document(&cli.document_path, &config)
            .await
            .context("Parsing failed")?;
        let json = output
            .document
            .to_json_pretty()
            .context("Failed to serialise output")?;
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        writeln!(handle, "{json}").context("Failed to write to stdout")?;

        if !cli.quiet {
            eprintln!(
                "Parsed {} pages in {}ms ({} table failures)",
                output.stats.pages_emitted, output.stats.total_duration_ms, output.stats.table_failures
            );
        }
    } else {
        let (path, stats) = parse_to_file(&cli.document_path, cli.save_folder.as_deref(), &config)
            .await
            .context("Parsing failed")?;

        if !cli.quiet {
            eprintln!(
                "{}  {} pages  {}ms  →  {}",
                if stats.table_failures == 0 {
                    green("✔")
                } else {
                    cyan("⚠")
                },
                stats.pages_emitted,
                stats.total_duration_ms,
                bold(&path.display().to_string()),
            );
            eprintln!(
                "   {} elements, {} suppressed as repeated",
                dim(&stats.total_elements.to_string()),
                dim(&stats.suppressed_elements.to_string()),
            );
        }
    }

    Ok(())
}

/// Map CLI args to `ParseConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ParseConfig> {
    let mut builder = ParseConfig::builder()
        .dpi(cli.dpi)
        .crop_margin_mm(cli.margin_mm)
        .table_format(cli.table_format.into())
        .repetition_threshold(cli.repetition_threshold)
        .count_list_items(cli.count_list_items)
        .partition_strategy(cli.strategy.clone())
        .languages(cli.languages.iter().map(|l| l.trim().to_string()))
        .max_retries(cli.max_retries)
        .api_timeout_secs(cli.api_timeout);

    if let Some(ref p) = cli.elements {
        builder = builder.elements_path(p);
    }
    if let Some(ref url) = cli.partition_url {
        builder = builder.partition_url(url);
    }
    if let Some(ref key) = cli.partition_api_key {
        builder = builder.partition_api_key(key);
    }
    if let Some(ref url) = cli.table_service_url {
        builder = builder.table_service_url(url);
    }
    if let Some(ref token) = cli.table_service_token {
        builder = builder.table_service_token(token);
    }
    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
