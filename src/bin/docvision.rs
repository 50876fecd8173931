//! CLI binary for edgequake-docvision.
//!
//! A thin shim over the library crate: maps flags to `PipelineConfig`,
//! renders progress with indicatif and turns the outcome into an exit code
//! (0 success, 1 error, 130 interrupted).

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_docvision::{
    Cancellation, Converter, Credentials, DocVisionError, EnterpriseClient, ExtractionContext,
    LibreOfficeConverter, NoopReporter, PdfiumRenderer, PipelineConfig, ProgressReporter,
    Reporter,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

const EXIT_INTERRUPTED: u8 = 130;

// ── ANSI colour helpers ──────────────────────────────────────────────────────

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

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── Terminal progress reporter ───────────────────────────────────────────────

/// Renders pipeline events as a progress bar plus one log line per unit.
struct CliReporter {
    bar: ProgressBar,
}

impl CliReporter {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(TICKS),
        );
        bar.set_prefix("Preparing");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }

    fn activate_bar(&self, noun: &str, total: usize) {
        let style = ProgressStyle::with_template(&format!(
            "{{spinner:.cyan}} {{prefix:.bold}}  [{{bar:40.green/238}}] {{pos:>3}}/{{len}} {noun}s  \
             ⏱ {{elapsed_precise}}  {{msg}}"
        ))
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_style(style);
        self.bar.set_length(total as u64);
        self.bar.set_position(0);
        self.bar.set_prefix("Extracting");
        self.bar.reset_eta();
    }
}

impl ProgressReporter for CliReporter {
    fn on_document_start(&self, path: &Path, index: usize, total: usize) {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let position = if total > 1 {
            format!("[{index}/{total}] ")
        } else {
            String::new()
        };
        self.bar
            .println(format!("{} {}{}", bold("◆"), position, bold(&name)));
        self.bar.set_prefix("Rendering");
        self.bar.set_message("");
    }

    fn on_units_start(&self, context: ExtractionContext, total_units: usize) {
        self.activate_bar(context.unit_noun(), total_units);
    }

    fn on_unit_start(&self, ordinal: usize, total: usize) {
        self.bar.set_message(format!("unit {ordinal}/{total}"));
    }

    fn on_unit_complete(&self, ordinal: usize, total: usize, text_len: usize) {
        self.bar.println(format!(
            "  {} {:>3}/{:<3}  {}",
            green("✓"),
            ordinal,
            total,
            dim(&format!("{text_len:>5} chars")),
        ));
        self.bar.inc(1);
    }

    fn on_unit_error(&self, ordinal: usize, total: usize, error: &str) {
        let msg: String = match error.char_indices().nth(80) {
            Some((idx, _)) => format!("{}…", &error[..idx]),
            None => error.to_string(),
        };
        self.bar.println(format!(
            "  {} {:>3}/{:<3}  {}",
            red("✗"),
            ordinal,
            total,
            red(&msg)
        ));
        self.bar.inc(1);
    }

    fn on_group_start(&self, group: usize, total_groups: usize) {
        self.bar.set_prefix("Enhancing");
        self.bar
            .set_message(format!("group {group}/{total_groups}"));
    }

    fn on_group_complete(&self, group: usize, total_groups: usize, applied: bool) {
        let mark = if applied { green("✓") } else { yellow("↺") };
        let note = if applied { "enhanced" } else { "kept raw text" };
        self.bar.println(format!(
            "  {} group {}/{}  {}",
            mark,
            group,
            total_groups,
            dim(note)
        ));
    }

    fn on_pause(&self, duration: Duration) {
        self.bar
            .set_message(format!("pausing {}s (rate limit)", duration.as_secs()));
    }

    fn on_document_complete(&self, _input: &Path, output: &Path) {
        self.bar.println(format!(
            "{} {}",
            green("✔"),
            bold(&output.display().to_string())
        ));
        self.bar.set_prefix("Waiting");
        self.bar.set_message("");
    }

    fn on_document_error(&self, input: &Path, error: &str) {
        self.bar.println(format!(
            "{} {}  {}",
            red("✘"),
            input.display(),
            red(error)
        ));
    }
}

impl Drop for CliReporter {
    fn drop(&mut self) {
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Convert one PDF (writes report.md next to it)
  docvision report.pdf

  # Convert a deck into another directory, without the enhancement pass
  docvision deck.pptx -o out/ --no-enhance

  # Convert every .pdf/.pptx/.ppt/.odp in a directory
  docvision --batch ./documents -o ./markdown

  # Check that pdfium, LibreOffice and credentials are available
  docvision --check

CREDENTIALS:
  model_url.txt    endpoint URL      (or DOCVISION_ENDPOINT)
  JWT_token.txt    bearer token      (or DOCVISION_TOKEN)
  Both files are read from --config-dir (default: current directory).

ENVIRONMENT VARIABLES:
  DOCVISION_ENDPOINT      Endpoint URL, overrides model_url.txt
  DOCVISION_TOKEN         Bearer token, overrides JWT_token.txt
  PDFIUM_LIB_PATH         Path to libpdfium (file or directory)
  RUST_LOG                Log filter, e.g. edgequake_docvision=debug
"#;

/// Convert PDFs and presentations to Markdown through an enterprise vision model.
#[derive(Parser, Debug)]
#[command(
    name = "docvision",
    version,
    about = "Convert PDFs and presentations to Markdown through an enterprise vision model",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Input file, or a directory with --batch.
    #[arg(required_unless_present = "check")]
    input: Option<PathBuf>,

    /// Output directory (default: next to each input file).
    #[arg(short, long, env = "DOCVISION_OUTPUT")]
    output: Option<PathBuf>,

    /// Convert every supported file in the input directory.
    #[arg(long)]
    batch: bool,

    /// Skip the slide enhancement pass.
    #[arg(long, env = "DOCVISION_NO_ENHANCE")]
    no_enhance: bool,

    /// Report pdfium, LibreOffice and credential availability, then exit.
    #[arg(long)]
    check: bool,

    /// Directory holding model_url.txt and JWT_token.txt.
    #[arg(long, env = "DOCVISION_CONFIG_DIR", default_value = ".")]
    config_dir: PathBuf,

    /// Rendering DPI (72–400).
    #[arg(long, env = "DOCVISION_DPI", default_value_t = 200,
          value_parser = clap::value_parser!(u32).range(72..=400))]
    dpi: u32,

    /// Longest image side sent to the endpoint, in pixels.
    #[arg(long, env = "DOCVISION_MAX_IMAGE_DIMENSION", default_value_t = 2048)]
    max_image_dimension: u32,

    /// Slides per enhancement request.
    #[arg(long, env = "DOCVISION_BATCH_SIZE", default_value_t = 5)]
    batch_size: usize,

    /// Seconds to pause between consecutive requests.
    #[arg(long, env = "DOCVISION_PAUSE", default_value_t = 10)]
    pause: u64,

    /// Per-request timeout in seconds.
    #[arg(long, env = "DOCVISION_TIMEOUT", default_value_t = 120)]
    timeout: u64,

    /// Keep model output exactly as returned (no fence/whitespace cleanup).
    #[arg(long, env = "DOCVISION_RAW")]
    raw: bool,

    /// Path to libpdfium (file or directory).
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium_lib: Option<PathBuf>,

    /// Path to the LibreOffice executable (default: auto-detect).
    #[arg(long, env = "DOCVISION_LIBREOFFICE")]
    libreoffice: Option<PathBuf>,

    /// Disable the progress bar.
    #[arg(long, env = "DOCVISION_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "DOCVISION_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "DOCVISION_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // The progress bar replaces INFO logs unless --verbose asks for them.
    let show_progress = !cli.quiet && !cli.no_progress;
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

    match run(&cli, show_progress).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) if is_cancelled(&e) => {
            eprintln!("{}", yellow("Interrupted"));
            ExitCode::from(EXIT_INTERRUPTED)
        }
        Err(e) => {
            eprintln!("{} {:#}", red("Error:"), e);
            ExitCode::FAILURE
        }
    }
}

fn is_cancelled(e: &anyhow::Error) -> bool {
    e.chain().any(|cause| {
        matches!(
            cause.downcast_ref::<DocVisionError>(),
            Some(DocVisionError::Cancelled)
        )
    })
}

/// Returns `Ok(false)` when the run completed but something failed.
async fn run(cli: &Cli, show_progress: bool) -> Result<bool> {
    if cli.check {
        return Ok(check_environment(cli));
    }
    let Some(input) = cli.input.as_deref() else {
        anyhow::bail!("an input path is required");
    };

    let credentials = Credentials::load(&cli.config_dir).context("Failed to load credentials")?;
    let config = build_config(cli, credentials)?;

    let client = Arc::new(EnterpriseClient::new(&config).context("Failed to build HTTP client")?);
    client.probe().await;

    let reporter: Reporter = if show_progress {
        CliReporter::new() as Reporter
    } else {
        Arc::new(NoopReporter)
    };

    let cancel = Cancellation::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_signal.cancel();
        }
    });

    let renderer = Arc::new(PdfiumRenderer::new(config.pdfium_lib_path.clone()));
    let slides = Arc::new(LibreOfficeConverter::new(
        config.libreoffice_path.clone(),
        config.converter_timeout,
    ));
    let converter = Converter::with_components(config, client, renderer, slides)
        .with_reporter(reporter)
        .with_cancellation(cancel);

    let output_dir = cli.output.as_deref();

    if cli.batch || input.is_dir() {
        let report = converter
            .convert_directory(input, output_dir)
            .await
            .with_context(|| format!("Batch conversion of '{}' failed", input.display()))?;
        drop(converter);

        if !cli.quiet {
            let mark = if report.failed() == 0 {
                green("✔")
            } else {
                yellow("⚠")
            };
            eprintln!(
                "{} Converted {}/{} files",
                mark,
                bold(&report.succeeded().to_string()),
                report.total()
            );
            for entry in report.entries.iter().filter(|e| e.output.is_none()) {
                eprintln!(
                    "  {} {}  {}",
                    red("✗"),
                    entry.input.display(),
                    dim(entry.error.as_deref().unwrap_or(""))
                );
            }
        }
        Ok(report.failed() == 0)
    } else {
        let written = converter
            .convert_file(input, output_dir)
            .await
            .with_context(|| format!("Conversion of '{}' failed", input.display()))?;
        drop(converter);

        if !cli.quiet {
            eprintln!(
                "{} Markdown saved to {}",
                green("✔"),
                bold(&written.display().to_string())
            );
        }
        Ok(true)
    }
}

/// Map CLI args to `PipelineConfig`.
fn build_config(cli: &Cli, credentials: Credentials) -> Result<PipelineConfig> {
    let mut builder = PipelineConfig::builder(credentials)
        .dpi(cli.dpi)
        .max_image_dimension(cli.max_image_dimension)
        .batch_size(cli.batch_size)
        .pause(Duration::from_secs(cli.pause))
        .request_timeout(Duration::from_secs(cli.timeout))
        .enhance(!cli.no_enhance)
        .clean_output(!cli.raw);

    if let Some(ref path) = cli.pdfium_lib {
        builder = builder.pdfium_lib_path(path);
    }
    if let Some(ref path) = cli.libreoffice {
        builder = builder.libreoffice_path(path);
    }

    builder.build().context("Invalid configuration")
}

/// Print what is available; `false` when a required piece is missing.
fn check_environment(cli: &Cli) -> bool {
    let mut ok = true;

    match PdfiumRenderer::new(cli.pdfium_lib.clone()).check_available() {
        Ok(()) => println!("{} pdfium        available", green("✓")),
        Err(e) => {
            ok = false;
            println!("{} pdfium        {}", red("✗"), e);
        }
    }

    let soffice = LibreOfficeConverter::new(cli.libreoffice.clone(), Duration::from_secs(120));
    match soffice.program() {
        Some(path) => println!("{} LibreOffice   {}", green("✓"), path.display()),
        None => println!(
            "{} LibreOffice   not found (needed for .pptx/.ppt/.odp only)",
            yellow("!")
        ),
    }

    match Credentials::load(&cli.config_dir) {
        Ok(creds) => println!("{} credentials   endpoint {}", green("✓"), creds.endpoint),
        Err(e) => {
            ok = false;
            println!("{} credentials   {}", red("✗"), e);
        }
    }

    ok
}
