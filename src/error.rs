//! Error type for the deckconv library.
//!
//! Every failure in this crate is fatal for the run: there are no retries
//! and no partial results. A batch stops at the first file that fails, so a
//! single [`ConvertError`] enum is enough. Each variant maps to a process
//! exit code through [`ConvertError::exit_code`] so the binary can report
//! usage mistakes differently from environment problems.

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the deckconv library.
#[derive(Debug, Error)]
pub enum ConvertError {
    // ── Config errors ─────────────────────────────────────────────────────
    /// The configuration combines options that cannot work together.
    #[error("{0}")]
    ConfigurationError(String),

    /// The configured template name is not registered.
    #[error("Template \"{name}\" is not found.")]
    TemplateNotFound { name: String },

    /// An explicit output file was given together with several inputs.
    #[error("Output path cannot specify with processing multiple files.")]
    ConflictingOutputTarget,

    // ── Engine errors ─────────────────────────────────────────────────────
    /// The engine supplied from outside does not provide a render operation.
    #[error("Specified engine has not implemented render() method: {detail}")]
    EngineContractViolation { detail: String },

    /// The engine exposed a render operation, but it failed.
    #[error("Engine failed to render Markdown: {0}")]
    Render(String),

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Reading an input or writing an output failed.
    #[error("Failed to access '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Browser errors ────────────────────────────────────────────────────
    /// No usable browser could be found or the process did not start.
    #[error("Failed to launch the browser: {0}")]
    BrowserLaunchFailure(String),

    /// Loading the document or printing it to PDF failed.
    #[error("Failed to rasterize the document into PDF: {0}")]
    RasterizationFailure(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ConvertError {
    /// Exit code for the hosting process.
    ///
    /// | code | meaning                                   |
    /// |------|-------------------------------------------|
    /// | 2    | invalid options (config, template, output)|
    /// | 3    | no usable browser                         |
    /// | 1    | anything else                             |
    pub fn exit_code(&self) -> i32 {
        match self {
            ConvertError::ConfigurationError(_)
            | ConvertError::TemplateNotFound { .. }
            | ConvertError::ConflictingOutputTarget => 2,
            ConvertError::BrowserLaunchFailure(_) => 3,
            _ => 1,
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConvertError::Io {
            path: path.into(),
            source,
        }
    }
}
