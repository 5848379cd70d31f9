//! Configuration types for slide-deck conversion.
//!
//! All conversion behaviour is controlled through [`ConversionConfig`], built
//! via its [`ConversionConfigBuilder`]. The configuration is constructed once
//! per run and never changes afterwards; validation happens in
//! [`ConversionConfigBuilder::build`] and again when a
//! [`crate::convert::Converter`] is created from it.

use crate::engine::{EngineFactory, EngineOptions, SlideEngineFactory};
use crate::error::ConvertError;
use crate::output::OutputTarget;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Default bound on browser navigation and printing.
pub const DEFAULT_BROWSER_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for a conversion run.
///
/// # Example
/// ```rust
/// use deckconv::{ConversionConfig, TargetFormat};
///
/// let config = ConversionConfig::builder()
///     .format(TargetFormat::Pdf)
///     .theme("gaia")
///     .build()
///     .unwrap();
/// assert_eq!(config.template, "bare");
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// Builds the rendering engine. Default: [`SlideEngineFactory`].
    pub engine: Arc<dyn EngineFactory>,

    /// Locale tag passed to templates, e.g. `"en-US"`.
    pub lang: String,

    /// Options merged into every engine construction. Per-call options
    /// requested by the template take precedence.
    pub engine_options: EngineOptions,

    /// Explicit destination. `None` writes next to each input file.
    pub output: Option<OutputTarget>,

    /// Script injected into the rendered document.
    pub ready_script: Option<String>,

    /// Template name. Default: `"bare"`.
    pub template: String,

    /// Theme override, appended to the Markdown as a `theme` directive.
    pub theme: Option<String>,

    /// Target format. Default: HTML.
    pub format: TargetFormat,

    /// Upper bound for page navigation and PDF printing. Default: 30 s.
    ///
    /// `None` leaves the browser library's own default in place.
    pub browser_timeout: Option<Duration>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            engine: Arc::new(SlideEngineFactory),
            lang: "en-US".to_string(),
            engine_options: EngineOptions::new(),
            output: None,
            ready_script: None,
            template: "bare".to_string(),
            theme: None,
            format: TargetFormat::default(),
            browser_timeout: Some(DEFAULT_BROWSER_TIMEOUT),
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("engine", &self.engine.name())
            .field("lang", &self.lang)
            .field("engine_options", &self.engine_options)
            .field("output", &self.output)
            .field("ready_script", &self.ready_script.as_ref().map(|s| s.len()))
            .field("template", &self.template)
            .field("theme", &self.theme)
            .field("format", &self.format)
            .field("browser_timeout", &self.browser_timeout)
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }

    /// Check option combinations that can never produce output.
    pub fn validate(&self) -> Result<(), ConvertError> {
        if self.format == TargetFormat::Pdf && self.output == Some(OutputTarget::Stdout) {
            return Err(ConvertError::ConfigurationError(
                "PDF cannot output to stdout.".into(),
            ));
        }
        if self.template.trim().is_empty() {
            return Err(ConvertError::ConfigurationError(
                "Template name must not be empty.".into(),
            ));
        }
        Ok(())
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn engine(mut self, factory: Arc<dyn EngineFactory>) -> Self {
        self.config.engine = factory;
        self
    }

    pub fn lang(mut self, lang: impl Into<String>) -> Self {
        self.config.lang = lang.into();
        self
    }

    pub fn engine_options(mut self, options: EngineOptions) -> Self {
        self.config.engine_options = options;
        self
    }

    /// Set a single static engine option.
    pub fn engine_option(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.config.engine_options.insert(key.into(), value.into());
        self
    }

    pub fn output(mut self, output: OutputTarget) -> Self {
        self.config.output = Some(output);
        self
    }

    pub fn ready_script(mut self, script: impl Into<String>) -> Self {
        self.config.ready_script = Some(script.into());
        self
    }

    pub fn template(mut self, name: impl Into<String>) -> Self {
        self.config.template = name.into();
        self
    }

    pub fn theme(mut self, theme: impl Into<String>) -> Self {
        self.config.theme = Some(theme.into());
        self
    }

    pub fn format(mut self, format: TargetFormat) -> Self {
        self.config.format = format;
        self
    }

    pub fn browser_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config.browser_timeout = timeout;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, ConvertError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Output format of a conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetFormat {
    /// Standalone HTML document. (default)
    #[default]
    Html,
    /// PDF rasterised by a headless browser.
    Pdf,
}

impl TargetFormat {
    /// Canonical file extension, without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            TargetFormat::Html => "html",
            TargetFormat::Pdf => "pdf",
        }
    }
}

impl fmt::Display for TargetFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}
