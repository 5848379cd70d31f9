//! Rendering engines: Markdown text in, slide markup out.
//!
//! An engine is built fresh for every render call by an [`EngineFactory`],
//! from the static options in [`crate::config::ConversionConfig`] merged with
//! whatever the active template asks for. Two engines ship with the crate:
//!
//! * [`slides::SlideEngine`]: the default, built on comrak.
//! * [`command::CommandEngine`]: delegates to an external program. This is
//!   the one boundary where an engine comes from outside the type system, so
//!   its factory probes the program before handing out an engine.

pub mod command;
pub mod slides;
pub mod theme;

use crate::error::ConvertError;
use serde::Serialize;

pub use command::CommandEngineFactory;
pub use slides::{SlideEngine, SlideEngineFactory, SlideEngineOptions};

/// Options handed to an engine at construction time.
///
/// A JSON object so that templates, the CLI and external engines can all
/// speak the same loosely typed configuration.
pub type EngineOptions = serde_json::Map<String, serde_json::Value>;

/// Output of a single engine render.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RenderedMarkup {
    /// Slide markup, one `<section>` per slide.
    pub html: String,
    /// Stylesheet for the active theme.
    pub css: String,
    /// Number of slides in `html`.
    pub slide_count: usize,
}

/// Turns Markdown into slide markup.
pub trait Engine: Send {
    fn render(&self, markdown: &str) -> Result<RenderedMarkup, ConvertError>;
}

/// Builds an [`Engine`] from a set of options.
pub trait EngineFactory: Send + Sync {
    /// Construct an engine.
    ///
    /// Factories for engines supplied from outside the crate must verify the
    /// engine can actually render and fail with
    /// [`ConvertError::EngineContractViolation`] otherwise.
    fn create(&self, options: &EngineOptions) -> Result<Box<dyn Engine>, ConvertError>;

    /// Short name used in logs.
    fn name(&self) -> &str {
        "custom"
    }
}

impl<F> EngineFactory for F
where
    F: Fn(&EngineOptions) -> Result<Box<dyn Engine>, ConvertError> + Send + Sync,
{
    fn create(&self, options: &EngineOptions) -> Result<Box<dyn Engine>, ConvertError> {
        self(options)
    }
}

/// Merge `overrides` on top of `base`; keys in `overrides` win.
pub fn merge_options(base: &EngineOptions, overrides: EngineOptions) -> EngineOptions {
    let mut merged = base.clone();
    merged.extend(overrides);
    merged
}
