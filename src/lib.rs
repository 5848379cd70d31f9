//! # deckconv
//!
//! Convert Markdown slide decks into standalone HTML documents or PDF files.
//!
//! A deck is a single Markdown file whose slides are separated by `---`
//! lines. An engine renders the slides, a template wraps them into an HTML
//! document, and for PDF output a headless Chromium-family browser prints
//! that document.
//!
//! ## Pipeline Overview
//!
//! ```text
//! deck.md
//!  │
//!  ├─ 1. Read      file contents as text
//!  ├─ 2. Theme     append `<!-- theme: … -->` when an override is set
//!  ├─ 3. Template  bare / bespoke, asks the engine to render
//!  ├─ 4. Engine    Markdown → <section> per slide + theme CSS
//!  ├─ 5. Print     PDF only: headless browser, scoped session
//!  └─ 6. Output    deck.html / deck.pdf next to the input, a fixed path, or stdout
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use deckconv::{ConversionConfig, Converter, TargetFormat};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConversionConfig::builder()
//!         .format(TargetFormat::Pdf)
//!         .theme("gaia")
//!         .build()?;
//!     let converter = Converter::new(config)?;
//!     converter
//!         .convert_files(&["intro.md", "talk.md"], |result| {
//!             eprintln!("{} => {}", result.source.display(), result.output);
//!         })
//!         .await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `deckconv` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! deckconv = { version = "0.1", default-features = false }
//! ```
//!
//! ## Browser
//!
//! PDF output needs Google Chrome, Chromium or Microsoft Edge. The executable
//! is found through `CHROME_PATH` or the usual install locations; see the
//! `chrome-finder` crate.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod browser;
pub mod config;
pub mod convert;
pub mod engine;
pub mod error;
pub mod output;
pub mod ready;
pub mod template;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use browser::{with_session, BrowserLauncher, BrowserPage, BrowserSession, ChromeLauncher};
pub use config::{ConversionConfig, ConversionConfigBuilder, TargetFormat, DEFAULT_BROWSER_TIMEOUT};
pub use convert::Converter;
pub use engine::{Engine, EngineFactory, EngineOptions, RenderedMarkup};
pub use error::ConvertError;
pub use output::{resolve_output_path, ConversionResult, OutputTarget, Payload};
pub use ready::READY_SCRIPT;
pub use template::{TemplateContext, TemplateRegistry, TemplateResult};
