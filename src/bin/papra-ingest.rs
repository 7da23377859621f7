//! CLI binary for papra-ingest.
//!
//! A thin shim over the library crate: maps CLI flags to `UploadOptions`,
//! owns the interactive setup wizard and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use papra_ingest::{
    upload_pdfs, IngestConfig, ProgressCallback, UploadOptions, UploadProgressCallback,
    UploadSummary,
};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
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

/// Longest error shown on a per-file line.
const MAX_LINE_ERROR_CHARS: usize = 100;

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a bar anchored at the bottom of the terminal
/// and one log line per file printed above it.
struct CliProgressCallback {
    bar: ProgressBar,
    /// Wall-clock start of the file currently being processed.
    file_started: Mutex<Option<Instant>>,
    warnings: AtomicUsize,
}

impl CliProgressCallback {
    /// Spinner until `on_batch_start` tells us how many files there are.
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Looking for PDFs…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            file_started: Mutex::new(None),
            warnings: AtomicUsize::new(0),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} files  \
             ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Uploading");
        self.bar.reset_eta();
    }

    fn elapsed_secs(&self) -> f64 {
        self.file_started
            .lock()
            .unwrap()
            .take()
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl UploadProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total_files: usize) {
        self.activate_bar(total_files);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Uploading {total_files} PDF file(s)…"))
        ));
    }

    fn on_file_start(&self, _index: usize, _total: usize, path: &Path) {
        *self.file_started.lock().unwrap() = Some(Instant::now());
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.bar.set_message(name);
    }

    fn on_tags_generated(&self, _index: usize, tags: &[String]) {
        self.bar
            .println(format!("    {} {}", dim("tags:"), cyan(&tags.join(", "))));
    }

    fn on_file_warning(&self, _index: usize, message: &str) {
        self.warnings.fetch_add(1, Ordering::SeqCst);
        self.bar
            .println(format!("    {} {}", yellow("⚠"), yellow(message)));
    }

    fn on_file_complete(&self, index: usize, total: usize, document_id: Option<&str>) {
        let secs = self.elapsed_secs();
        self.bar.println(format!(
            "  {} File {:>3}/{:<3}  {}  {}",
            green("✓"),
            index,
            total,
            dim(document_id.unwrap_or("(no document id)")),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_file_error(&self, index: usize, total: usize, error: &str) {
        let secs = self.elapsed_secs();
        let msg: String = if error.chars().count() > MAX_LINE_ERROR_CHARS {
            let cut: String = error.chars().take(MAX_LINE_ERROR_CHARS - 1).collect();
            format!("{cut}\u{2026}")
        } else {
            error.to_string()
        };
        self.bar.println(format!(
            "  {} File {:>3}/{:<3}  {}  {}",
            red("✗"),
            index,
            total,
            red(&msg),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, total_files: usize, succeeded: usize) {
        self.bar.finish_and_clear();
        let failed = total_files.saturating_sub(succeeded);
        let warnings = self.warnings.load(Ordering::SeqCst);

        if failed == 0 {
            eprintln!(
                "{} {} file(s) uploaded successfully{}",
                green("✔"),
                bold(&succeeded.to_string()),
                if warnings > 0 {
                    format!("  ({} warning(s))", yellow(&warnings.to_string()))
                } else {
                    String::new()
                }
            );
        } else {
            eprintln!(
                "{} {}/{} file(s) uploaded  ({} failed)",
                if failed == total_files {
                    red("✘")
                } else {
                    cyan("⚠")
                },
                bold(&succeeded.to_string()),
                total_files,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # First run: create the configuration
  papra-ingest --setup

  # Show configuration status
  papra-ingest

  # Upload one file
  papra-ingest invoice.pdf

  # Upload a directory recursively, with tags
  papra-ingest --tags finance,2024 ~/scans

  # Let the LLM pick tags, OCR in English and French
  papra-ingest --autotag --ocr-languages eng,fra ~/scans

  # Machine-readable report
  papra-ingest --json --autotag ~/scans > report.json

CONFIGURATION:
  Stored as JSON at $PAPRA_INGEST_CONFIG, else papra-ingest/config.json
  under the platform config directory ($XDG_CONFIG_HOME or ~/.config on
  Linux, ~/Library/Application Support on macOS, %APPDATA% on Windows).

  papra_url               Papra instance URL (https:// added if missing)
  papra_api_key           Papra API key
  papra_organization_id   Organization receiving the documents
  openrouter_endpoint     Default https://openrouter.ai/api/v1
  openrouter_api_key      Enables --autotag
  openrouter_model_name   Default openai/gpt-5-nano

AUTOTAG:
  Each PDF's text layer is summarised locally (headings, dates, amounts,
  keywords, document type) and only the summary, at most 2000 characters,
  is sent to the model together with the existing Papra tags. The model
  returns 2–5 tags; they are added to any --tags. If tagging fails the
  file is still uploaded with the --tags alone.

ENVIRONMENT VARIABLES:
  PAPRA_INGEST_CONFIG     Path of the configuration file
  RUST_LOG                Override the log filter (e.g. papra_ingest=debug)
"#;

/// Upload PDF files to Papra, optionally tagging them with an LLM.
#[derive(Parser, Debug)]
#[command(
    name = "papra-ingest",
    version,
    about = "Upload PDF files to Papra, optionally tagging them with an LLM",
    long_about = "Upload a PDF file, or every PDF below a directory, to a Papra document store. \
Tags can be given on the command line or generated per document by an OpenRouter model \
from a local summary of the document's text.",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// PDF file or directory to upload. Without it, print configuration status.
    path: Option<PathBuf>,

    /// Run the interactive configuration wizard.
    #[arg(long)]
    setup: bool,

    /// Configuration file to use instead of the default location.
    #[arg(long, env = "PAPRA_INGEST_CONFIG")]
    config: Option<PathBuf>,

    /// Comma-separated tags attached to every document.
    #[arg(long, env = "PAPRA_INGEST_TAGS", value_delimiter = ',')]
    tags: Vec<String>,

    /// Generate tags per document with the configured OpenRouter model.
    #[arg(long, env = "PAPRA_INGEST_AUTOTAG")]
    autotag: bool,

    /// Comma-separated OCR language codes (e.g. eng,fra,deu).
    #[arg(long, env = "PAPRA_INGEST_OCR_LANGUAGES", value_delimiter = ',')]
    ocr_languages: Vec<String>,

    /// Upload retries per file on transient failures.
    #[arg(long, env = "PAPRA_INGEST_MAX_RETRIES", default_value_t = 2)]
    max_retries: u32,

    /// Print the configuration (secrets redacted) and exit.
    #[arg(long)]
    show_config: bool,

    /// Print the upload report as JSON on stdout.
    #[arg(long)]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "PAPRA_INGEST_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PAPRA_INGEST_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PAPRA_INGEST_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs; --verbose brings them all back.
    let show_progress = cli.path.is_some() && !cli.quiet && !cli.no_progress && !cli.json;
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

    let config_path = cli.config.clone().unwrap_or_else(IngestConfig::default_path);

    // ── Setup mode ───────────────────────────────────────────────────────
    if cli.setup {
        let existing = IngestConfig::load(&config_path).ok().flatten();
        tokio::task::block_in_place(|| run_setup(&config_path, existing))?;
        return Ok(ExitCode::SUCCESS);
    }

    let config = ensure_config(&config_path)?;

    if cli.show_config {
        print_config(&config_path, &config);
        return Ok(ExitCode::SUCCESS);
    }

    // ── No path: status only ─────────────────────────────────────────────
    let Some(source) = cli.path.clone() else {
        print_status(&config);
        return Ok(ExitCode::SUCCESS);
    };

    if cli.autotag && !config.is_autotag_available() && !cli.quiet {
        eprintln!(
            "{} AI tagging unavailable (missing OpenRouter API key). \
             Run 'papra-ingest --setup' to configure it.",
            yellow("⚠")
        );
    }

    // ── Upload ───────────────────────────────────────────────────────────
    let progress: Option<ProgressCallback> = if show_progress {
        let cb = CliProgressCallback::new_dynamic();
        Some(cb as Arc<dyn UploadProgressCallback>)
    } else {
        None
    };

    let options = UploadOptions {
        ocr_languages: clean_list(&cli.ocr_languages),
        tags: clean_list(&cli.tags),
        autotag: cli.autotag,
        max_retries: cli.max_retries,
        progress,
        ..Default::default()
    };

    let summary = upload_pdfs(&source, &config, &options)
        .await
        .context("Upload failed")?;

    if cli.json {
        let json = serde_json::to_string_pretty(&summary).context("Failed to serialise report")?;
        println!("{json}");
    } else if !cli.quiet {
        print_summary(&summary, !show_progress);
    }

    Ok(if summary.has_failures() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

/// Trim entries and drop blanks (`--tags "a, b,"`).
fn clean_list(items: &[String]) -> Vec<String> {
    items
        .iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Load the configuration, running the wizard when it is missing or
/// incomplete.
fn ensure_config(path: &Path) -> Result<IngestConfig> {
    let loaded = IngestConfig::load(path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))?;

    match loaded {
        Some(config) if config.validate().is_ok() => Ok(config),
        existing => {
            eprintln!("\n{} Configuration is invalid or missing.\n", red("✗"));
            eprintln!("Running setup wizard...\n");
            tokio::task::block_in_place(|| run_setup(path, existing))
        }
    }
}

// ── Setup wizard ─────────────────────────────────────────────────────────────

/// Interactive setup. Enter keeps the value shown in brackets.
fn run_setup(path: &Path, existing: Option<IngestConfig>) -> Result<IngestConfig> {
    let current = existing.unwrap_or_default();
    let stdin = io::stdin();
    let mut input = stdin.lock();

    eprintln!("\n{}\n", bold("=== Papra Ingest Tool Configuration Setup ==="));
    eprintln!("Configuration will be saved to: {}\n", path.display());
    if current.validate().is_ok() {
        eprintln!("Existing configuration found. Press Enter to keep current values.\n");
    }

    let papra_url = ask(
        &mut input,
        "Papra URL (will auto-add https:// if no protocol specified)",
        &current.papra_url,
        true,
    )?;
    let papra_api_key = ask(&mut input, "Papra API Key", &current.papra_api_key, true)?;
    let papra_organization_id = ask(
        &mut input,
        "Papra Organization ID",
        &current.papra_organization_id,
        true,
    )?;

    eprintln!("\nOptional: AI Tagging Configuration (leave blank to use defaults or skip)\n");

    let endpoint = ask(
        &mut input,
        "OpenRouter Endpoint",
        &current.openrouter_endpoint,
        false,
    )?;
    let api_key = ask(
        &mut input,
        "OpenRouter API Key (enables --autotag)",
        current.openrouter_api_key.as_deref().unwrap_or(""),
        false,
    )?;
    let model = ask(
        &mut input,
        "OpenRouter Model Name",
        &current.openrouter_model_name,
        false,
    )?;

    let mut builder = IngestConfig::builder()
        .papra_url(papra_url)
        .papra_api_key(papra_api_key)
        .papra_organization_id(papra_organization_id);
    if !endpoint.is_empty() {
        builder = builder.openrouter_endpoint(endpoint);
    }
    if !api_key.is_empty() {
        builder = builder.openrouter_api_key(api_key);
    }
    if !model.is_empty() {
        builder = builder.openrouter_model_name(model);
    }
    let config = builder.build().context("Invalid configuration")?;

    config
        .save(path)
        .with_context(|| format!("Failed to save configuration to {}", path.display()))?;
    eprintln!(
        "\n{} Configuration saved successfully to {}\n",
        green("✓"),
        path.display()
    );
    Ok(config)
}

/// Prompt for one value. Required values are asked again until non-blank.
fn ask(input: &mut impl BufRead, label: &str, current: &str, required: bool) -> Result<String> {
    loop {
        if current.is_empty() {
            eprint!("{} {}: ", cyan("?"), label);
        } else {
            eprint!("{} {} {}: ", cyan("?"), label, dim(&format!("[{current}]")));
        }
        io::stderr().flush().ok();

        let mut line = String::new();
        let read = input
            .read_line(&mut line)
            .context("Failed to read from stdin")?;
        if read == 0 {
            anyhow::bail!("Setup aborted: stdin closed");
        }

        let value = line.trim();
        let value = if value.is_empty() { current } else { value };
        if required && value.trim().is_empty() {
            eprintln!("  {} {} is required", red("✗"), label);
            continue;
        }
        return Ok(value.trim().to_string());
    }
}

// ── Output ───────────────────────────────────────────────────────────────────

fn print_status(config: &IngestConfig) {
    println!("Configuration loaded successfully!");
    println!("Papra URL: {}", config.papra_url);
    if config.is_autotag_available() {
        println!(
            "AI Tagging: {} ({})",
            green("Available"),
            config.openrouter_model_name
        );
    } else {
        println!(
            "AI Tagging: {} (missing OpenRouter configuration)",
            yellow("Unavailable")
        );
        println!("Run 'papra-ingest --setup' to configure AI tagging.");
    }
}

fn print_config(path: &Path, config: &IngestConfig) {
    println!("File:                   {}", path.display());
    println!("papra_url:              {}", config.papra_url);
    println!("papra_api_key:          {}", mask(&config.papra_api_key));
    println!("papra_organization_id:  {}", config.papra_organization_id);
    println!("openrouter_endpoint:    {}", config.openrouter_endpoint);
    println!(
        "openrouter_api_key:     {}",
        mask(config.openrouter_api_key.as_deref().unwrap_or(""))
    );
    println!("openrouter_model_name:  {}", config.openrouter_model_name);
}

/// Show the first four characters of a secret.
fn mask(secret: &str) -> String {
    if secret.is_empty() {
        return dim("(not set)");
    }
    let head: String = secret.chars().take(4).collect();
    format!("{head}…")
}

fn print_summary(summary: &UploadSummary, detailed: bool) {
    if detailed {
        for file in &summary.files {
            let name = file.path.display().to_string();
            match &file.error {
                None => {
                    eprintln!("  {} {}", green("✓"), name);
                    if let Some(id) = &file.document_id {
                        eprintln!("    Document ID: {id}");
                    }
                    if !file.tags.is_empty() {
                        eprintln!("    Tags attached: {}", file.tags.join(", "));
                    }
                }
                Some(e) => eprintln!("  {} {}  {}", red("✗"), name, red(e)),
            }
            for warning in &file.warnings {
                eprintln!("    {} {}", yellow("⚠"), warning);
            }
        }
    }

    eprintln!("\n{}", bold("=== Upload Summary ==="));
    eprintln!("Total files: {}", summary.total);
    eprintln!("Successful:  {}", green(&summary.succeeded.to_string()));
    if summary.failed > 0 {
        eprintln!("Failed:      {}", red(&summary.failed.to_string()));
    } else {
        eprintln!("Failed:      0");
    }
}
