//! CLI binary for edgequake-ocr.
//!
//! A thin shim over the library crate that maps CLI flags (or interactive
//! answers) to `OcrConfig` and prints results.

use anyhow::{bail, Context, Result};
use clap::Parser;
use edgequake_ocr::credentials::{self, EnvFile, API_KEY_VAR, DEFAULT_ENV_FILE};
use edgequake_ocr::{
    BatchEntry, BatchProgressCallback, DocumentResult, OcrConfig, OcrProcessor, OutputFormat,
    ProgressCallback,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};
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
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a live bar plus one log line per file.
struct CliProgressCallback {
    bar: ProgressBar,
    /// Start time of the file currently being processed.
    started: Mutex<Option<Instant>>,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0); // length set in on_batch_start
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} files  \
             ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(style);
        bar.set_prefix("OCR");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            started: Mutex::new(None),
            errors: AtomicUsize::new(0),
        })
    }

    fn elapsed_secs(&self) -> f64 {
        self.started
            .lock()
            .ok()
            .and_then(|mut s| s.take())
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl BatchProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total_files: usize) {
        self.bar.set_length(total_files as u64);
        self.bar.reset_eta();
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Processing {total_files} documents…"))
        ));
    }

    fn on_file_start(&self, _index: usize, _total: usize, name: &str) {
        if let Ok(mut s) = self.started.lock() {
            *s = Some(Instant::now());
        }
        self.bar.set_message(name.to_string());
    }

    fn on_file_complete(&self, index: usize, total: usize, name: &str, content_len: usize) {
        self.bar.println(format!(
            "  {} {:>3}/{:<3} {}  {}  {}",
            green("✓"),
            index,
            total,
            name,
            dim(&format!("{content_len:>7} chars")),
            dim(&format!("{:.1}s", self.elapsed_secs())),
        ));
        self.bar.inc(1);
    }

    fn on_file_error(&self, index: usize, total: usize, name: &str, error: &str) {
        self.errors.fetch_add(1, Ordering::SeqCst);

        // Keep one line per file.
        let msg: String = if error.chars().count() > 80 {
            let mut m: String = error.chars().take(79).collect();
            m.push('…');
            m
        } else {
            error.to_string()
        };

        self.bar.println(format!(
            "  {} {:>3}/{:<3} {}  {}  {}",
            red("✗"),
            index,
            total,
            name,
            red(&msg),
            dim(&format!("{:.1}s", self.elapsed_secs())),
        ));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, total_files: usize, success_count: usize) {
        let failed = total_files.saturating_sub(success_count);
        self.bar.finish_and_clear();

        if failed == 0 {
            eprintln!(
                "{} {} documents processed successfully",
                green("✔"),
                bold(&success_count.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} documents processed  ({} failed)",
                if failed == total_files { red("✘") } else { cyan("⚠") },
                bold(&success_count.to_string()),
                total_files,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Single document, markdown to stdout (also writes scan_OCR.md next to it)
  edgequake-ocr --file scan.pdf

  # Plain text into an output directory
  edgequake-ocr --file scan.pdf --format text --output out/

  # Whole directory, raw JSON, plus a PDF summary per document
  edgequake-ocr --directory scans/ --format json --pdf --output out/

  # No arguments: answer the prompts
  edgequake-ocr

OUTPUT FILES:
  <stem>_OCR.md            next to the source, markdown format only
  <stem>_OCR文本版本.pdf    next to the source, with --pdf
  <output>/<stem>.md|.txt|.json   with --output

ENVIRONMENT VARIABLES:
  MISTRAL_API_KEY          Mistral API key (also read from ./.env)
  EDGEQUAKE_OCR_MODEL      Override the OCR model
  EDGEQUAKE_OCR_BASE_URL   Override the API root
  RUST_LOG                 Override log filtering

SETUP:
  Get a key at https://console.mistral.ai/. When none is configured and the
  terminal is interactive, you will be asked for it and it is saved to ./.env.
"#;

/// Run PDFs and images through Mistral OCR.
#[derive(Parser, Debug)]
#[command(
    name = "edgequake-ocr",
    version,
    about = "Run PDFs and images through Mistral OCR",
    long_about = "Submit PDF, PNG and JPEG documents to the Mistral OCR service and write the \
result as Markdown (with inline images), plain text or raw JSON. Optionally renders a \
plain-text PDF summary next to each document.",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Single document to process (.pdf, .png, .jpg, .jpeg).
    #[arg(long, conflicts_with = "directory")]
    file: Option<PathBuf>,

    /// Directory whose documents are processed one by one.
    #[arg(long)]
    directory: Option<PathBuf>,

    /// Directory receiving <stem>.md|.txt|.json result files.
    #[arg(short, long, env = "EDGEQUAKE_OCR_OUTPUT")]
    output: Option<PathBuf>,

    /// Output format.
    #[arg(long, env = "EDGEQUAKE_OCR_FORMAT", value_enum, default_value = "markdown")]
    format: FormatArg,

    /// Also render a plain-text PDF summary next to each document.
    #[arg(long, env = "EDGEQUAKE_OCR_PDF")]
    pdf: bool,

    /// Mistral API key (overrides the environment).
    #[arg(long, env = API_KEY_VAR, hide_env_values = true)]
    api_key: Option<String>,

    /// OCR model.
    #[arg(long, env = "EDGEQUAKE_OCR_MODEL", default_value = edgequake_ocr::config::DEFAULT_MODEL)]
    model: String,

    /// API root URL.
    #[arg(long, env = "EDGEQUAKE_OCR_BASE_URL", default_value = edgequake_ocr::config::DEFAULT_BASE_URL)]
    base_url: String,

    /// Font file for the PDF summary; may be repeated. Tried before the
    /// built-in candidates.
    #[arg(long = "font", value_name = "PATH")]
    fonts: Vec<PathBuf>,

    /// HTTP timeout per request, in seconds. Default: none.
    #[arg(long, env = "EDGEQUAKE_OCR_TIMEOUT",
          value_parser = clap::value_parser!(u64).range(1..))]
    timeout: Option<u64>,

    /// Disable the progress bar.
    #[arg(long, env = "EDGEQUAKE_OCR_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "EDGEQUAKE_OCR_VERBOSE")]
    verbose: bool,

    /// Suppress all output except results and errors.
    #[arg(short, long, env = "EDGEQUAKE_OCR_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum FormatArg {
    Markdown,
    Text,
    Json,
}

impl From<FormatArg> for OutputFormat {
    fn from(v: FormatArg) -> Self {
        match v {
            FormatArg::Markdown => OutputFormat::Markdown,
            FormatArg::Text => OutputFormat::Text,
            FormatArg::Json => OutputFormat::Json,
        }
    }
}

/// What to process, after flags and prompts are resolved.
#[derive(Debug)]
enum Target {
    File(PathBuf),
    Directory(PathBuf),
}

/// Settings that may come from flags or from interactive answers.
struct RunPlan {
    target: Target,
    output: Option<PathBuf>,
    format: OutputFormat,
    pdf: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Before parsing, so `.env` values feed clap's env fallbacks.
    credentials::load_dotenv();
    let cli = Cli::parse();

    let plan = resolve_plan(&cli)?;

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar provides the feedback that matters in batch mode, so
    // library INFO logs are suppressed while it is shown.
    let show_progress =
        !cli.quiet && !cli.no_progress && matches!(plan.target, Target::Directory(_));
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else if show_progress {
        "warn"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let api_key = resolve_api_key(&cli).await?;

    let progress: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn BatchProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, &plan, api_key, progress)?;
    let processor = OcrProcessor::new(config).context("Failed to initialise OCR processor")?;

    match plan.target {
        Target::File(ref path) => run_file(&processor, path, cli.quiet).await,
        Target::Directory(ref dir) => {
            let entries = processor
                .process_directory(dir)
                .await
                .context("Directory processing failed")?;
            print_batch_summary(&entries, plan.output.as_deref(), cli.quiet);
            Ok(())
        }
    }
}

/// Process one file and print its content (or where it went).
async fn run_file(processor: &OcrProcessor, path: &Path, quiet: bool) -> Result<()> {
    let result = processor.process_document(path).await;

    if let Some(ref error) = result.error {
        bail!("{error}");
    }

    if let Some(ref out) = result.output_path {
        if !quiet {
            eprintln!("{} Saved result to {}", green("✔"), bold(&out.display().to_string()));
        }
    } else {
        let content = result.content.as_deref().unwrap_or_default();
        write_content(&mut io::stdout().lock(), content).context("Failed to write to stdout")?;
    }

    if !quiet {
        print_side_files(&result);
    }
    Ok(())
}

/// Write `content`, ending it with a newline if it lacks one.
fn write_content(out: &mut impl Write, content: &str) -> io::Result<()> {
    out.write_all(content.as_bytes())?;
    if !content.ends_with('\n') {
        out.write_all(b"\n")?;
    }
    out.flush()
}

fn print_side_files(result: &DocumentResult) {
    if let Some(ref p) = result.markdown_path {
        eprintln!("  {} {}", dim("markdown:"), p.display());
    }
    if let Some(ref p) = result.pdf_path {
        eprintln!("  {} {}", dim("pdf:"), p.display());
    }
}

fn print_batch_summary(entries: &[BatchEntry], output: Option<&Path>, quiet: bool) {
    match output {
        None => {
            println!("Processed {} documents:", entries.len());
            for entry in entries {
                let status = match entry.result.error {
                    None => green("ok"),
                    Some(ref e) => red(&format!("error: {e}")),
                };
                println!("  {}: {}", entry.file, status);
            }
        }
        Some(dir) if !quiet => {
            let saved = entries.iter().filter(|e| e.result.output_path.is_some()).count();
            eprintln!("{} {} results saved to {}", cyan("◆"), saved, bold(&dir.display().to_string()));
        }
        Some(_) => {}
    }
}

// ── Flag / prompt resolution ─────────────────────────────────────────────

fn resolve_plan(cli: &Cli) -> Result<RunPlan> {
    let flags = |target| RunPlan {
        target,
        output: cli.output.clone(),
        format: cli.format.into(),
        pdf: cli.pdf,
    };

    if let Some(ref file) = cli.file {
        return Ok(flags(Target::File(file.clone())));
    }
    if let Some(ref dir) = cli.directory {
        return Ok(flags(Target::Directory(dir.clone())));
    }

    if !io::stdin().is_terminal() {
        bail!("No input given. Pass --file or --directory (see --help).");
    }
    prompt_plan(cli)
}

/// Ask for everything `--file`/`--directory` would have told us.
fn prompt_plan(cli: &Cli) -> Result<RunPlan> {
    let answer = prompt("Path to a document or directory: ")?;
    let path = strip_quotes(&answer);
    if path.is_empty() {
        bail!("No path given.");
    }
    let path = PathBuf::from(path);

    let mut output = cli.output.clone();
    let target = if path.is_file() {
        Target::File(path)
    } else if path.is_dir() {
        let answer = prompt("Output directory (optional, Enter to skip): ")?;
        let dir = strip_quotes(&answer);
        if !dir.is_empty() {
            output = Some(PathBuf::from(dir));
        }
        Target::Directory(path)
    } else {
        bail!("{} does not exist or is not a file or directory.", path.display());
    };

    eprintln!("Output format:");
    eprintln!("  1. Markdown (default)");
    eprintln!("  2. Plain text");
    eprintln!("  3. JSON");
    let format = parse_format_choice(&prompt("Choice (1/2/3): ")?);
    let pdf = parse_yes(&prompt("Also generate a PDF version? (y/n): ")?);

    Ok(RunPlan {
        target,
        output,
        format,
        pdf,
    })
}

/// Key from flag, environment or `./.env`; else ask for it and persist it.
async fn resolve_api_key(cli: &Cli) -> Result<String> {
    if let Some(key) = credentials::resolve_api_key(cli.api_key.as_deref()) {
        return Ok(key);
    }

    // An exported but empty variable stops dotenvy from loading the file value.
    let mut env_file = EnvFile::load(DEFAULT_ENV_FILE)
        .await
        .with_context(|| format!("Failed to read {DEFAULT_ENV_FILE}"))?;
    if let Some(key) = env_file.get(API_KEY_VAR).map(str::trim).filter(|k| !k.is_empty()) {
        return Ok(key.to_string());
    }

    if !io::stdin().is_terminal() {
        bail!("No Mistral API key found. Set {API_KEY_VAR} or pass --api-key.");
    }

    eprintln!("No Mistral API key found.");
    eprintln!("Get one at https://console.mistral.ai/");
    let key = prompt("Mistral API key: ")?;
    if key.is_empty() {
        bail!("No API key given; cannot continue.");
    }

    env_file.set(API_KEY_VAR, &key);
    env_file
        .save()
        .await
        .with_context(|| format!("Failed to save API key to {DEFAULT_ENV_FILE}"))?;
    eprintln!("{} API key saved to {}", green("✔"), env_file.path().display());
    Ok(key)
}

fn build_config(
    cli: &Cli,
    plan: &RunPlan,
    api_key: String,
    progress: Option<ProgressCallback>,
) -> Result<OcrConfig> {
    let mut builder = OcrConfig::builder()
        .api_key(api_key)
        .model(cli.model.clone())
        .base_url(cli.base_url.clone())
        .output_format(plan.format)
        .generate_pdf(plan.pdf);

    if let Some(ref dir) = plan.output {
        builder = builder.output_dir(dir.clone());
    }
    for font in &cli.fonts {
        builder = builder.font_path(font.clone());
    }
    if let Some(secs) = cli.timeout {
        builder = builder.request_timeout_secs(secs);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

fn prompt(question: &str) -> Result<String> {
    eprint!("{question}");
    io::stderr().flush().ok();
    let mut line = String::new();
    io::stdin()
        .read_line(&mut line)
        .context("Failed to read from stdin")?;
    Ok(line.trim().to_string())
}

/// Drop quotes left by drag-and-drop into a terminal.
fn strip_quotes(s: &str) -> &str {
    s.trim().trim_matches(|c| c == '\'' || c == '"')
}

fn parse_format_choice(s: &str) -> OutputFormat {
    match s.trim() {
        "2" => OutputFormat::Text,
        "3" => OutputFormat::Json,
        _ => OutputFormat::Markdown,
    }
}

fn parse_yes(s: &str) -> bool {
    matches!(
        s.trim().to_lowercase().as_str(),
        "y" | "yes" | "是" | "1" | "true"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quotes_are_stripped() {
        assert_eq!(strip_quotes("'/tmp/my scan.pdf'"), "/tmp/my scan.pdf");
        assert_eq!(strip_quotes("\"/tmp/a.pdf\" "), "/tmp/a.pdf");
        assert_eq!(strip_quotes("plain"), "plain");
    }

    #[test]
    fn format_choice_defaults_to_markdown() {
        assert_eq!(parse_format_choice("2"), OutputFormat::Text);
        assert_eq!(parse_format_choice("3"), OutputFormat::Json);
        assert_eq!(parse_format_choice("1"), OutputFormat::Markdown);
        assert_eq!(parse_format_choice(""), OutputFormat::Markdown);
        assert_eq!(parse_format_choice("json"), OutputFormat::Markdown);
    }

    #[test]
    fn yes_answers() {
        for s in ["y", "YES", "是", "1", "true"] {
            assert!(parse_yes(s), "{s}");
        }
        for s in ["n", "", "no", "0"] {
            assert!(!parse_yes(s), "{s}");
        }
    }

    #[test]
    fn cli_parses_flags() {
        let cli = Cli::try_parse_from([
            "edgequake-ocr",
            "--file",
            "a.pdf",
            "--format",
            "text",
            "--pdf",
            "--font",
            "/f1.ttf",
            "--font",
            "/f2.ttf",
            "--api-key",
            "k",
        ])
        .unwrap();
        assert_eq!(cli.fonts.len(), 2);
        let plan = resolve_plan(&cli).unwrap();
        assert!(matches!(plan.target, Target::File(_)));
        assert_eq!(plan.format, OutputFormat::Text);
        assert!(plan.pdf);
    }

    /// Accepts `budget` bytes, then fails every write.
    struct ShortWriter {
        budget: usize,
        written: Vec<u8>,
    }

    impl Write for ShortWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.budget == 0 {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"));
            }
            let n = buf.len().min(self.budget);
            self.budget -= n;
            self.written.extend_from_slice(&buf[..n]);
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn content_gets_trailing_newline() {
        let mut out = Vec::new();
        write_content(&mut out, "abc").unwrap();
        assert_eq!(out, b"abc\n");

        let mut out = Vec::new();
        write_content(&mut out, "abc\n").unwrap();
        assert_eq!(out, b"abc\n");
    }

    #[test]
    fn failed_newline_write_is_reported() {
        let mut out = ShortWriter {
            budget: 3,
            written: Vec::new(),
        };
        let err = write_content(&mut out, "abc").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
        assert_eq!(out.written, b"abc");
    }

    #[test]
    fn file_and_directory_conflict() {
        let r = Cli::try_parse_from(["edgequake-ocr", "--file", "a.pdf", "--directory", "d"]);
        assert!(r.is_err());
    }
}
