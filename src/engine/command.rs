//! External-program engine.
//!
//! Lets any executable act as the rendering engine: Markdown goes in on
//! stdin, slide markup comes out on stdout, and the merged engine options
//! are passed as JSON in `DECKCONV_ENGINE_OPTIONS`. Because the program is
//! only known at run time, [`CommandEngineFactory::create`] probes it first
//! and reports a program that cannot be run as an engine contract violation.

use super::{Engine, EngineFactory, EngineOptions, RenderedMarkup};
use crate::error::ConvertError;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::debug;

/// Environment variable carrying the engine options to the child process.
pub const OPTIONS_ENV: &str = "DECKCONV_ENGINE_OPTIONS";

/// Factory for [`CommandEngine`].
#[derive(Debug, Clone)]
pub struct CommandEngineFactory {
    program: PathBuf,
    args: Vec<String>,
}

impl CommandEngineFactory {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Extra arguments passed to the program on every render.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }
}

impl EngineFactory for CommandEngineFactory {
    fn create(&self, options: &EngineOptions) -> Result<Box<dyn Engine>, ConvertError> {
        let program = probe(&self.program).ok_or_else(|| ConvertError::EngineContractViolation {
            detail: format!("'{}' is not an executable program", self.program.display()),
        })?;
        debug!("Using external engine: {}", program.display());

        Ok(Box::new(CommandEngine {
            program,
            args: self.args.clone(),
            options_json: serde_json::Value::Object(options.clone()).to_string(),
        }))
    }

    fn name(&self) -> &str {
        "command"
    }
}

/// An engine backed by an external program.
pub struct CommandEngine {
    program: PathBuf,
    args: Vec<String>,
    options_json: String,
}

impl Engine for CommandEngine {
    fn render(&self, markdown: &str) -> Result<RenderedMarkup, ConvertError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .env(OPTIONS_ENV, &self.options_json)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ConvertError::Render(format!("{}: {e}", self.program.display())))?;

        // Feed stdin from a separate thread so a chatty child cannot deadlock us.
        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| ConvertError::Internal("child stdin not captured".into()))?;
        let input = markdown.as_bytes().to_vec();
        let writer = std::thread::spawn(move || stdin.write_all(&input));

        let output = child
            .wait_with_output()
            .map_err(|e| ConvertError::Render(format!("{}: {e}", self.program.display())))?;
        if let Ok(Err(e)) = writer.join() {
            if e.kind() != std::io::ErrorKind::BrokenPipe {
                return Err(ConvertError::Render(format!("writing to engine stdin: {e}")));
            }
        }

        if !output.status.success() {
            return Err(ConvertError::Render(format!(
                "{} exited with {}: {}",
                self.program.display(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let html = String::from_utf8(output.stdout)
            .map_err(|e| ConvertError::Render(format!("engine output is not UTF-8: {e}")))?;
        let slide_count = html.matches("<section").count();
        Ok(RenderedMarkup {
            html,
            css: String::new(),
            slide_count,
        })
    }
}

/// Resolve `program` to a runnable file: as given when it contains a path
/// separator, otherwise through `PATH`.
fn probe(program: &Path) -> Option<PathBuf> {
    if program.components().count() > 1 || program.is_absolute() {
        return is_runnable(program).then(|| program.to_path_buf());
    }
    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var)
        .map(|dir| dir.join(program))
        .find(|candidate| is_runnable(candidate))
}

fn is_runnable(path: &Path) -> bool {
    match std::fs::metadata(path) {
        Ok(meta) if meta.is_file() => {
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                meta.permissions().mode() & 0o111 != 0
            }
            #[cfg(not(unix))]
            {
                true
            }
        }
        _ => false,
    }
}
