//! CLI binary for pdf-gradecheck.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `GradingConfig` and prints the report.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pdf_gradecheck::{
    grade, grade_to_file, GradingConfig, GradingProgressCallback, GradingReport, ProgressCallback,
    DEFAULT_MODEL,
};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
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

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a progress bar plus one log line per page.
struct CliProgressCallback {
    bar: ProgressBar,
    page_started: Mutex<Option<Instant>>,
    warnings: AtomicUsize,
}

impl CliProgressCallback {
    /// Spinner until `on_grading_start` tells us the page count.
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Rendering PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            page_started: Mutex::new(None),
            warnings: AtomicUsize::new(0),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  \
             ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Grading");
        self.bar.reset_eta();
    }

    fn elapsed_secs(&self) -> f64 {
        self.page_started
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl GradingProgressCallback for CliProgressCallback {
    fn on_grading_start(&self, total_pages: usize) {
        self.activate_bar(total_pages);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Grading {total_pages} pages…"))
        ));
    }

    fn on_page_start(&self, page_num: usize, _total: usize) {
        *self.page_started.lock().unwrap_or_else(|e| e.into_inner()) = Some(Instant::now());
        self.bar.set_message(format!("page {page_num}"));
    }

    fn on_page_graded(&self, page_num: usize, total: usize, feedback_len: usize) {
        let secs = self.elapsed_secs();
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {:<8}  {}",
            green("✓"),
            page_num,
            total,
            dim(&format!("{feedback_len:>5} chars")),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_page_warning(&self, page_num: usize, total: usize, warning: &str) {
        let secs = self.elapsed_secs();
        self.warnings.fetch_add(1, Ordering::SeqCst);

        let msg: String = if warning.chars().count() > 80 {
            warning.chars().take(79).chain(['\u{2026}']).collect()
        } else {
            warning.to_string()
        };

        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}  {}",
            yellow("⚠"),
            page_num,
            total,
            yellow(&msg),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_pacing_delay(&self, next_page: usize, secs: f64) {
        self.bar
            .set_message(format!("waiting {secs:.0}s before page {next_page}"));
    }

    fn on_grading_complete(&self, total_pages: usize, open_questions: &[String]) {
        self.bar.finish_and_clear();
        let warnings = self.warnings.load(Ordering::SeqCst);

        if warnings == 0 {
            eprintln!("{} {} pages graded", green("✔"), bold(&total_pages.to_string()));
        } else {
            eprintln!(
                "{} {} pages graded  ({} with validation warnings)",
                cyan("⚠"),
                bold(&total_pages.to_string()),
                yellow(&warnings.to_string()),
            );
        }
        if !open_questions.is_empty() {
            eprintln!(
                "{} Questions still open at end of document: {}",
                yellow("⚠"),
                open_questions.join(", ")
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Grade, print the report to stdout
  gradecheck homework.pdf

  # Save the combined report and per-page files
  gradecheck homework.pdf -o feedback.txt --output-dir feedback/

  # Paid tier: no pause between pages
  gradecheck homework.pdf --delay 0

  # Another model, no format validation
  gradecheck homework.pdf --model gemini-2.5-pro --no-validate

  # JSON report
  gradecheck homework.pdf --json > report.json

FEEDBACK FORMAT:
  The grader wraps the feedback for each question in
      START Question X ... END Question X
  and scores every finished question 0-5 ("3/5", "Score: 3", "3 out of 5").
  Pages whose reply closes a question without a score are kept and marked
  with a VALIDATION WARNING. Questions still open after the last page are
  listed in the report header.

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY          Google Gemini API key (checked first)
  GOOGLE_API_KEY          Google Gemini API key (fallback)
  OPENAI_API_KEY          OpenAI API key (with --provider openai)
  ANTHROPIC_API_KEY       Anthropic API key (with --provider anthropic)
  RUST_LOG                Override log filter, e.g. pdf_gradecheck=debug

SETUP:
  1. Set API key:   export GEMINI_API_KEY=...
  2. Grade:         gradecheck homework.pdf -o feedback.txt

  pdfium must be loadable (system library or next to the binary).
"#;

/// Check homework PDFs for mistakes using a vision LLM.
#[derive(Parser, Debug)]
#[command(
    name = "gradecheck",
    version,
    about = "Check homework PDFs for mistakes using a vision LLM",
    long_about = "Render every page of a homework PDF and send the pages, one at a time, \
to a vision LLM that keeps the whole document in context. Each reply is checked for \
START/END question markers and a 0-5 score.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Path to the homework PDF.
    pdf_path: PathBuf,

    /// Write the combined report to this file instead of stdout.
    #[arg(short, long, env = "GRADECHECK_OUTPUT")]
    output: Option<PathBuf>,

    /// Directory for per-page feedback files [default: <pdf_name>_feedback/].
    #[arg(long, env = "GRADECHECK_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// LLM model ID.
    #[arg(short, long, env = "GRADECHECK_MODEL", default_value = DEFAULT_MODEL)]
    model: String,

    /// LLM provider: gemini, openai, anthropic, ollama, …
    #[arg(long, env = "GRADECHECK_PROVIDER", default_value = "gemini")]
    provider: String,

    /// Rendering DPI (72–600). Higher = sharper but larger images.
    #[arg(long, env = "GRADECHECK_DPI", default_value_t = 300,
          value_parser = clap::value_parser!(u32).range(72..=600))]
    dpi: u32,

    /// Seconds to wait between API calls. Set to 0 on a paid tier.
    #[arg(short, long, env = "GRADECHECK_DELAY", default_value_t = 20.0)]
    delay: f64,

    /// Disable response format validation.
    #[arg(long, env = "GRADECHECK_NO_VALIDATE")]
    no_validate: bool,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "GRADECHECK_PASSWORD")]
    password: Option<String>,

    /// Path to a text file containing a custom system prompt.
    #[arg(long, env = "GRADECHECK_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// Max LLM output tokens per page.
    #[arg(long, env = "GRADECHECK_MAX_TOKENS", default_value_t = 4096)]
    max_tokens: usize,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "GRADECHECK_TEMPERATURE", default_value_t = 0.1)]
    temperature: f32,

    /// Per-call LLM timeout in seconds (0 = none).
    #[arg(long, env = "GRADECHECK_API_TIMEOUT", default_value_t = 300)]
    api_timeout: u64,

    /// Output the report as JSON instead of text.
    #[arg(long, env = "GRADECHECK_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "GRADECHECK_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "GRADECHECK_VERBOSE")]
    verbose: bool,

    /// Suppress progress output.
    #[arg(short, long, env = "GRADECHECK_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar carries the per-page feedback; keep INFO logs out of
    // its way unless --verbose was asked for.
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

    let progress_cb: Option<ProgressCallback> = if show_progress {
        let cb = CliProgressCallback::new_dynamic();
        Some(cb as Arc<dyn GradingProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb).await?;

    if !cli.quiet && !show_progress {
        eprintln!("Grading {} with {}", cli.pdf_path.display(), config.model);
    }

    // ── Run grading ──────────────────────────────────────────────────────
    let report = if let Some(ref output_path) = cli.output {
        let report = grade_to_file(&cli.pdf_path, output_path, &config)
            .await
            .context("Grading failed")?;
        if !cli.quiet {
            eprintln!(
                "{}  report  →  {}",
                green("✔"),
                bold(&output_path.display().to_string())
            );
        }
        report
    } else {
        let report = grade(&cli.pdf_path, &config)
            .await
            .context("Grading failed")?;
        print_report(&report, cli.json)?;
        report
    };

    if !cli.quiet {
        eprintln!(
            "   {} per-page files in {}  —  {}ms total",
            dim(&report.pages.len().to_string()),
            report.feedback_dir.display(),
            report.stats.total_duration_ms,
        );
        if !show_progress && !report.open_questions.is_empty() {
            eprintln!(
                "Questions still open at end of document: {}",
                report.open_questions.join(", ")
            );
        }
    }

    Ok(())
}

fn print_report(report: &GradingReport, json: bool) -> Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    if json {
        let out = serde_json::to_string_pretty(report).context("Failed to serialise report")?;
        writeln!(handle, "{out}").context("Failed to write to stdout")?;
    } else {
        handle
            .write_all(report.render().as_bytes())
            .context("Failed to write to stdout")?;
    }
    Ok(())
}

/// Map CLI args to `GradingConfig`.
async fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<GradingConfig> {
    let delay = parse_delay(cli.delay)?;

    let mut builder = GradingConfig::builder()
        .model(&cli.model)
        .provider_name(&cli.provider)
        .dpi(cli.dpi)
        .delay(delay)
        .validate(!cli.no_validate)
        .max_tokens(cli.max_tokens)
        .temperature(cli.temperature)
        .api_timeout_secs(cli.api_timeout);

    if let Some(ref path) = cli.system_prompt {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read system prompt from {:?}", path))?;
        builder = builder.system_prompt(prompt);
    }
    if let Some(ref dir) = cli.output_dir {
        builder = builder.output_dir(dir);
    }
    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Validate `--delay` seconds; negative, NaN and out-of-range values are errors.
fn parse_delay(secs: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(secs).map_err(|e| {
        anyhow::anyhow!("--delay must be a non-negative number of seconds (got {secs}): {e}")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_accepts_fractions_and_zero() {
        assert_eq!(parse_delay(0.0).unwrap(), Duration::ZERO);
        assert_eq!(parse_delay(2.5).unwrap(), Duration::from_millis(2500));
    }

    #[test]
    fn delay_rejects_values_duration_cannot_hold() {
        assert!(parse_delay(1e30).is_err());
        assert!(parse_delay(-1.0).is_err());
        assert!(parse_delay(f64::NAN).is_err());
        assert!(parse_delay(f64::INFINITY).is_err());
    }
}
