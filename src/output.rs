//! Conversion results and output-path resolution.

use crate::config::TargetFormat;
use crate::engine::RenderedMarkup;
use std::fmt;
use std::path::{Path, PathBuf};

/// Where a converted document goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    /// Write to this file, replacing it.
    Path(PathBuf),
    /// Leave writing to the caller, who prints to standard output.
    Stdout,
}

impl OutputTarget {
    /// Parse a CLI value: `-` means stdout, anything else is a path.
    pub fn parse(value: &str) -> Self {
        if value == "-" {
            OutputTarget::Stdout
        } else {
            OutputTarget::Path(PathBuf::from(value))
        }
    }

    /// The file path, or `None` for stdout.
    pub fn path(&self) -> Option<&Path> {
        match self {
            OutputTarget::Path(p) => Some(p),
            OutputTarget::Stdout => None,
        }
    }
}

impl fmt::Display for OutputTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputTarget::Path(p) => write!(f, "{}", p.display()),
            OutputTarget::Stdout => f.write_str("-"),
        }
    }
}

/// Converted document contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Html(String),
    Pdf(Vec<u8>),
}

impl Payload {
    /// Raw bytes as written to disk.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Payload::Html(s) => s.as_bytes(),
            Payload::Pdf(b) => b,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.as_bytes().is_empty()
    }
}

/// Result of converting one input file.
#[derive(Debug, Clone)]
pub struct ConversionResult {
    /// The input file.
    pub source: PathBuf,
    /// Where the payload went (or should go, for stdout).
    pub output: OutputTarget,
    /// Engine output the document was built from.
    pub rendered: RenderedMarkup,
    /// The final document.
    pub payload: Payload,
}

/// Compute the destination for `input`.
///
/// An explicit `override_target` is returned as is. Otherwise the result is a
/// sibling of `input` named after its stem with the format's extension:
/// `slides/deck.md` → `slides/deck.pdf`.
pub fn resolve_output_path(
    input: &Path,
    format: TargetFormat,
    override_target: Option<&OutputTarget>,
) -> OutputTarget {
    if let Some(target) = override_target {
        return target.clone();
    }
    OutputTarget::Path(input.with_extension(format.extension()))
}
