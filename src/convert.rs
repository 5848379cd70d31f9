//! Conversion entry points.
//!
//! [`Converter`] ties the pieces together: the configured template and
//! engine turn Markdown into an HTML document, [`resolve_output_path`] picks
//! the destination, and for PDF output a browser session from
//! [`crate::browser`] prints the document.
//!
//! ```text
//! deck.md ─▶ read ─▶ convert (template + engine) ─▶ [PDF: browser print] ─▶ write
//! ```
//!
//! Batches are converted strictly one file at a time, so at most one
//! browser process is alive at any moment.

use crate::browser::{self, BrowserLauncher, ChromeLauncher, PdfOptions, WaitPolicy};
use crate::config::{ConversionConfig, TargetFormat};
use crate::engine::{merge_options, EngineOptions, RenderedMarkup};
use crate::error::ConvertError;
use crate::output::{resolve_output_path, ConversionResult, OutputTarget, Payload};
use crate::template::{TemplateContext, TemplateRegistry, TemplateResult};
use base64::Engine as _;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Converts Markdown decks into HTML or PDF documents.
///
/// # Example
/// ```rust,no_run
/// use deckconv::{ConversionConfig, Converter, TargetFormat};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = ConversionConfig::builder().format(TargetFormat::Pdf).build()?;
/// let converter = Converter::new(config)?;
/// let result = converter.convert_file("deck.md").await?;
/// println!("{} => {}", result.source.display(), result.output);
/// # Ok(())
/// # }
/// ```
pub struct Converter {
    config: ConversionConfig,
    templates: TemplateRegistry,
    browser: Arc<dyn BrowserLauncher>,
}

impl Converter {
    /// Create a converter with the built-in templates and a Chrome launcher.
    pub fn new(config: ConversionConfig) -> Result<Self, ConvertError> {
        config.validate()?;
        let browser = Arc::new(ChromeLauncher::new(config.browser_timeout));
        Ok(Self {
            config,
            templates: TemplateRegistry::builtin(),
            browser,
        })
    }

    /// Replace the template registry.
    pub fn with_templates(mut self, templates: TemplateRegistry) -> Self {
        self.templates = templates;
        self
    }

    /// Replace the browser used for PDF output.
    pub fn with_browser(mut self, launcher: Arc<dyn BrowserLauncher>) -> Self {
        self.browser = launcher;
        self
    }

    pub fn config(&self) -> &ConversionConfig {
        &self.config
    }

    /// Render Markdown text into a complete HTML document.
    ///
    /// No I/O happens here. A configured theme is appended to the text as a
    /// `theme` directive before the template sees it.
    pub fn convert(&self, markdown: &str) -> Result<TemplateResult, ConvertError> {
        let template = self.templates.get(&self.config.template).ok_or_else(|| {
            ConvertError::TemplateNotFound {
                name: self.config.template.clone(),
            }
        })?;

        let markdown = self.apply_theme(markdown);
        let mut renderer = |overrides: EngineOptions| -> Result<RenderedMarkup, ConvertError> {
            let options = merge_options(&self.config.engine_options, overrides);
            let engine = self.config.engine.create(&options)?;
            engine.render(&markdown)
        };

        template(TemplateContext {
            lang: &self.config.lang,
            ready_script: self.config.ready_script.as_deref(),
            renderer: &mut renderer,
        })
    }

    /// Convert one Markdown file and write the result next to it, or to the
    /// configured output.
    ///
    /// When the destination is [`OutputTarget::Stdout`] nothing is written;
    /// the caller prints [`ConversionResult::payload`].
    pub async fn convert_file(&self, path: impl AsRef<Path>) -> Result<ConversionResult, ConvertError> {
        let start = Instant::now();
        let source = path.as_ref().to_path_buf();
        debug!("Reading {}", source.display());

        let markdown = tokio::fs::read_to_string(&source)
            .await
            .map_err(|e| ConvertError::io(&source, e))?;

        let TemplateResult { rendered, result } = self.convert(&markdown)?;
        let output = resolve_output_path(&source, self.config.format, self.config.output.as_ref());

        let payload = match self.config.format {
            TargetFormat::Html => Payload::Html(result),
            TargetFormat::Pdf => Payload::Pdf(self.print_pdf(result).await?),
        };

        if let OutputTarget::Path(dest) = &output {
            write_atomically(dest, payload.as_bytes()).await?;
        }

        info!(
            "Converted {} → {} ({} slides, {} bytes, {}ms)",
            source.display(),
            output,
            rendered.slide_count,
            payload.as_bytes().len(),
            start.elapsed().as_millis()
        );

        Ok(ConversionResult {
            source,
            output,
            rendered,
            payload,
        })
    }

    /// Convert several files one after another, handing each result to
    /// `on_each` before the next file starts.
    ///
    /// Stops at the first failure. An explicit output file combined with more
    /// than one input is rejected before anything is read.
    pub async fn convert_files<P, F>(&self, paths: &[P], mut on_each: F) -> Result<(), ConvertError>
    where
        P: AsRef<Path>,
        F: FnMut(ConversionResult),
    {
        if matches!(self.config.output, Some(OutputTarget::Path(_))) && paths.len() > 1 {
            return Err(ConvertError::ConflictingOutputTarget);
        }

        info!("Converting {} file(s) into {}", paths.len(), self.config.format);
        for path in paths {
            let result = self.convert_file(path).await?;
            on_each(result);
        }
        Ok(())
    }

    /// Synchronous wrapper around [`Converter::convert_file`].
    ///
    /// Creates a temporary tokio runtime internally.
    pub fn convert_file_sync(&self, path: impl AsRef<Path>) -> Result<ConversionResult, ConvertError> {
        tokio::runtime::Runtime::new()
            .map_err(|e| ConvertError::Internal(format!("Failed to create tokio runtime: {e}")))?
            .block_on(self.convert_file(path))
    }

    // ── Internal helpers ─────────────────────────────────────────────────

    fn apply_theme<'a>(&self, markdown: &'a str) -> std::borrow::Cow<'a, str> {
        match &self.config.theme {
            Some(theme) => {
                let quoted = serde_json::Value::from(theme.as_str());
                format!("{markdown}\n<!-- theme: {quoted} -->").into()
            }
            None => markdown.into(),
        }
    }

    async fn print_pdf(&self, html: String) -> Result<Vec<u8>, ConvertError> {
        let url = data_url(&html);
        browser::with_session(self.browser.as_ref(), move |session| {
            Box::pin(async move {
                let page = session.new_page().await?;
                page.goto(&url, WaitPolicy::default()).await?;
                page.print(PdfOptions::default()).await
            })
        })
        .await
    }
}

/// Embed an HTML document in a `data:` URL.
fn data_url(html: &str) -> String {
    format!(
        "data:text/html;charset=utf-8;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(html)
    )
}

/// Write to a uniquely named temporary file in the destination directory,
/// then rename it over the destination. The temporary file is removed when
/// any step fails.
async fn write_atomically(path: &Path, bytes: &[u8]) -> Result<(), ConvertError> {
    let dir = match path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ConvertError::io(path, e))?;
            parent.to_path_buf()
        }
        None => PathBuf::from("."),
    };

    let dest = path.to_path_buf();
    let data = bytes.to_vec();
    tokio::task::spawn_blocking(move || -> std::io::Result<()> {
        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        tmp.write_all(&data)?;
        tmp.persist(&dest).map_err(|e| e.error)?;
        Ok(())
    })
    .await
    .map_err(|e| ConvertError::Internal(format!("write task panicked: {e}")))?
    .map_err(|e| ConvertError::io(path, e))?;

    debug!("Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}
