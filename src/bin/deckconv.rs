//! CLI binary for deckconv.
//!
//! A thin shim over the library crate that turns CLI flags into a
//! `ConversionConfig`, expands the input list and prints what was written.

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use deckconv::engine::CommandEngineFactory;
use deckconv::{
    ChromeLauncher, ConversionConfig, ConvertError, Converter, OutputTarget, Payload,
    TargetFormat, READY_SCRIPT,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashSet;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

/// Extensions picked up when a directory is given as input.
const MARKDOWN_EXTENSIONS: &[&str] = &["md", "mdown", "markdown"];

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

const AFTER_HELP: &str = r#"EXAMPLES:
  # Convert a deck into HTML next to it (slides.html)
  deckconv slides.md

  # Convert into PDF
  deckconv --pdf slides.md
  deckconv slides.md -o talk.pdf

  # Every Markdown file under a directory, with a theme
  deckconv --theme gaia decks/

  # Presenter-friendly HTML on stdout
  deckconv --template bespoke slides.md -o -

  # Use an external program as the engine
  deckconv --engine-command ./my-renderer slides.md

ENVIRONMENT VARIABLES:
  CHROME_PATH               Browser executable used for PDF output
  DECKCONV_ENGINE_OPTIONS   Set for --engine-command programs: engine options as JSON
  RUST_LOG                  Override log filtering (e.g. deckconv=debug)
"#;

/// Convert Markdown slide decks into HTML or PDF.
#[derive(Parser, Debug)]
#[command(
    name = "deckconv",
    version,
    about = "Convert Markdown slide decks into HTML or PDF",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Markdown files or directories to convert.
    inputs: Vec<PathBuf>,

    /// Output file. `-` writes HTML to stdout.
    #[arg(short, long, env = "DECKCONV_OUTPUT")]
    output: Option<String>,

    /// Convert into PDF. Implied by an output file ending in `.pdf`.
    #[arg(long, env = "DECKCONV_PDF")]
    pdf: bool,

    /// Document template: bare or bespoke.
    #[arg(long, env = "DECKCONV_TEMPLATE", default_value = "bare")]
    template: String,

    /// Theme overriding the one chosen in the deck.
    #[arg(long, env = "DECKCONV_THEME")]
    theme: Option<String>,

    /// External program used as the rendering engine.
    #[arg(long, env = "DECKCONV_ENGINE_COMMAND")]
    engine_command: Option<PathBuf>,

    /// Allow raw HTML in the Markdown.
    #[arg(long, env = "DECKCONV_HTML")]
    html: bool,

    /// Seconds allowed for loading and printing each PDF (0 disables).
    #[arg(long, env = "DECKCONV_BROWSER_TIMEOUT", default_value_t = 30)]
    browser_timeout: u64,

    /// Launch the browser without its sandbox.
    #[arg(long, env = "DECKCONV_NO_SANDBOX")]
    no_sandbox: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "DECKCONV_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "DECKCONV_QUIET")]
    quiet: bool,
}

impl Cli {
    fn format(&self) -> TargetFormat {
        let pdf_output = self
            .output
            .as_deref()
            .is_some_and(|o| o.to_ascii_lowercase().ends_with(".pdf"));
        if self.pdf || pdf_output {
            TargetFormat::Pdf
        } else {
            TargetFormat::Html
        }
    }

    fn browser_timeout(&self) -> Option<Duration> {
        (self.browser_timeout > 0).then(|| Duration::from_secs(self.browser_timeout))
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // INFO-level library logs stay hidden by default; the per-file lines
    // printed below cover the same ground.
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match run(&cli).await {
        Ok(code) => code,
        Err(e) => {
            let (message, code) = match e.downcast_ref::<ConvertError>() {
                Some(err) => (err.to_string(), err.exit_code()),
                None => (format!("{e:#}"), 1),
            };
            eprintln!("{} Failed converting Markdown. ({message})", red("✘"));
            ExitCode::from(u8::try_from(code).unwrap_or(1))
        }
    }
}

async fn run(cli: &Cli) -> Result<ExitCode> {
    let files = find_markdown_files(&cli.inputs)?;
    if files.is_empty() {
        if cli.inputs.is_empty() {
            Cli::command().print_help().context("Failed to print help")?;
            return Ok(ExitCode::SUCCESS);
        }
        eprintln!("{} Not found processable Markdown file(s).\n", red("✘"));
        Cli::command().print_help().context("Failed to print help")?;
        return Ok(ExitCode::FAILURE);
    }

    let config = build_config(cli)?;
    let launcher = ChromeLauncher::new(config.browser_timeout).sandbox(!cli.no_sandbox);
    let converter = Converter::new(config)?.with_browser(Arc::new(launcher));

    let bar = if cli.quiet {
        ProgressBar::hidden()
    } else {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
        );
        bar.enable_steady_tick(Duration::from_millis(80));
        bar
    };
    status(&bar, cli.quiet, format!("Converting {} file(s)...", files.len()));
    bar.set_message(format!("converting into {}", converter.config().format));

    let cwd = std::env::current_dir().context("Failed to read the working directory")?;
    let mut stdout_error = None;
    let outcome = converter
        .convert_files(&files, |result| {
            let to = match &result.output {
                OutputTarget::Path(p) => relative_to(&cwd, p).display().to_string(),
                OutputTarget::Stdout => "[stdout]".to_string(),
            };
            status(
                &bar,
                cli.quiet,
                format!(
                    "{} {} => {}",
                    green("✓"),
                    relative_to(&cwd, &result.source).display(),
                    to
                ),
            );

            if let (OutputTarget::Stdout, Payload::Html(html)) = (&result.output, &result.payload) {
                let mut handle = io::stdout().lock();
                if let Err(e) = handle.write_all(html.as_bytes()).and_then(|_| handle.flush()) {
                    stdout_error.get_or_insert(e);
                }
            }
        })
        .await;
    bar.finish_and_clear();

    outcome?;
    if let Some(e) = stdout_error {
        return Err(e).context("Failed to write to stdout");
    }
    if !cli.quiet {
        eprintln!("{} {}", green("✔"), dim(&format!("{} file(s) converted", files.len())));
    }
    Ok(ExitCode::SUCCESS)
}

/// Print a status line above the spinner. A hidden bar drops `println`, so
/// when stderr is not a terminal the line goes to stderr directly.
fn status(bar: &ProgressBar, quiet: bool, line: String) {
    status_to(bar, quiet, line, &mut io::stderr());
}

fn status_to(bar: &ProgressBar, quiet: bool, line: String, fallback: &mut impl Write) {
    if quiet {
        return;
    }
    if bar.is_hidden() {
        let _ = writeln!(fallback, "{line}");
    } else {
        bar.println(line);
    }
}

/// Map CLI args to `ConversionConfig`.
fn build_config(cli: &Cli) -> Result<ConversionConfig> {
    let mut builder = ConversionConfig::builder()
        .lang(lang_from_env(|key| std::env::var(key).ok()))
        .ready_script(READY_SCRIPT)
        .template(cli.template.as_str())
        .format(cli.format())
        .browser_timeout(cli.browser_timeout());

    if let Some(output) = &cli.output {
        builder = builder.output(OutputTarget::parse(output));
    }
    if let Some(theme) = &cli.theme {
        builder = builder.theme(theme.as_str());
    }
    if let Some(program) = &cli.engine_command {
        builder = builder.engine(Arc::new(CommandEngineFactory::new(program)));
    }
    if cli.html {
        builder = builder.engine_option("html", true);
    }

    Ok(builder.build()?)
}

// ── Input expansion ─────────────────────────────────────────────────────────

/// Expand directories into the Markdown files below them, skip inputs that
/// do not exist, make every path absolute and drop duplicates while keeping
/// the first occurrence.
fn find_markdown_files(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut seen = HashSet::new();
    let mut files = Vec::new();

    for input in inputs {
        let found: Vec<PathBuf> = if input.is_dir() {
            let mut found = Vec::new();
            for entry in WalkDir::new(input).sort_by_file_name() {
                let entry = entry.with_context(|| format!("Failed to read {}", input.display()))?;
                if entry.file_type().is_file() && is_markdown(entry.path()) {
                    found.push(entry.into_path());
                }
            }
            found
        } else if input.exists() {
            vec![input.clone()]
        } else {
            warn!("Skipping {}: no such file or directory", input.display());
            continue;
        };

        for path in found {
            let path = std::path::absolute(&path)
                .with_context(|| format!("Failed to resolve {}", path.display()))?;
            if seen.insert(path.clone()) {
                files.push(path);
            }
        }
    }
    Ok(files)
}

fn is_markdown(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| MARKDOWN_EXTENSIONS.iter().any(|m| m.eq_ignore_ascii_case(e)))
}

fn relative_to<'a>(base: &Path, path: &'a Path) -> &'a Path {
    path.strip_prefix(base).unwrap_or(path)
}

/// Locale tag from the usual POSIX variables, e.g. `de_DE.UTF-8` → `de-DE`.
fn lang_from_env(lookup: impl Fn(&str) -> Option<String>) -> String {
    ["LC_ALL", "LC_MESSAGES", "LANG"]
        .into_iter()
        .filter_map(|key| lookup(key))
        .map(|value| {
            let base = value.split('.').next().unwrap_or_default().to_string();
            base.replace(['_', '@'], "-")
        })
        .find(|tag| !tag.is_empty() && tag != "C" && tag != "POSIX")
        .unwrap_or_else(|| "en-US".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn lang_strips_encoding_and_normalises_separators() {
        assert_eq!(lang_from_env(env(&[("LANG", "de_DE.UTF-8")])), "de-DE");
        assert_eq!(lang_from_env(env(&[("LANG", "sr_RS@latin")])), "sr-RS-latin");
    }

    #[test]
    fn lang_prefers_lc_all_and_falls_back_to_en_us() {
        let lookup = env(&[("LC_ALL", "ja_JP.UTF-8"), ("LANG", "fr_FR.UTF-8")]);
        assert_eq!(lang_from_env(lookup), "ja-JP");
        assert_eq!(lang_from_env(env(&[])), "en-US");
        assert_eq!(lang_from_env(env(&[("LANG", "C.UTF-8")])), "en-US");
    }

    #[test]
    fn pdf_is_implied_by_output_extension() {
        let cli = Cli::parse_from(["deckconv", "deck.md", "-o", "Talk.PDF"]);
        assert_eq!(cli.format(), TargetFormat::Pdf);
        let cli = Cli::parse_from(["deckconv", "deck.md", "-o", "talk.html"]);
        assert_eq!(cli.format(), TargetFormat::Html);
        let cli = Cli::parse_from(["deckconv", "--pdf", "deck.md"]);
        assert_eq!(cli.format(), TargetFormat::Pdf);
    }

    #[test]
    fn zero_timeout_disables_it() {
        let cli = Cli::parse_from(["deckconv", "--browser-timeout", "0", "deck.md"]);
        assert_eq!(cli.browser_timeout(), None);
        let cli = Cli::parse_from(["deckconv", "deck.md"]);
        assert_eq!(cli.browser_timeout(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn directories_expand_to_markdown_files_once() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("a.md"), "# A").unwrap();
        std::fs::write(dir.path().join("sub/b.markdown"), "# B").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "x").unwrap();

        let inputs = vec![dir.path().to_path_buf(), dir.path().join("a.md")];
        let files = find_markdown_files(&inputs).unwrap();
        assert_eq!(
            files,
            vec![dir.path().join("a.md"), dir.path().join("sub/b.markdown")]
        );
    }

    #[test]
    fn stdout_pdf_is_a_configuration_error() {
        let cli = Cli::parse_from(["deckconv", "--pdf", "-o", "-", "deck.md"]);
        let err = build_config(&cli).unwrap_err();
        let err = err.downcast_ref::<ConvertError>().unwrap();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn missing_inputs_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.md"), "# A").unwrap();

        let inputs = vec![dir.path().join("missing.md"), dir.path().join("a.md")];
        assert_eq!(
            find_markdown_files(&inputs).unwrap(),
            vec![dir.path().join("a.md")]
        );

        let only_missing = vec![dir.path().join("gone.md")];
        assert!(find_markdown_files(&only_missing).unwrap().is_empty());
    }

    #[test]
    fn hidden_bar_status_lines_fall_back_to_stderr() {
        let bar = ProgressBar::hidden();
        let mut sink = Vec::new();
        status_to(&bar, false, "Converting 2 file(s)...".to_string(), &mut sink);
        assert_eq!(String::from_utf8(sink).unwrap(), "Converting 2 file(s)...\n");

        let mut sink = Vec::new();
        status_to(&bar, true, "quiet".to_string(), &mut sink);
        assert!(sink.is_empty());
    }
}
