//! Templates: wrap rendered slides into a complete HTML document.
//!
//! A template receives a [`TemplateContext`] carrying the document language,
//! the optional ready script and a renderer callback. The template decides
//! which per-call engine options to request and when to render, then wraps
//! the engine's markup into a document shell. Document shells are askama
//! templates under `templates/`.

use crate::engine::{EngineOptions, RenderedMarkup};
use crate::error::ConvertError;
use askama::Template;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Inputs handed to a template.
pub struct TemplateContext<'a> {
    /// Value of the document's `lang` attribute.
    pub lang: &'a str,
    /// Script to inject after the slides.
    pub ready_script: Option<&'a str>,
    /// Constructs the engine with the given per-call options and renders the
    /// deck. Per-call options override the configured static options.
    pub renderer: &'a mut dyn FnMut(EngineOptions) -> Result<RenderedMarkup, ConvertError>,
}

/// What a template produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateResult {
    /// Engine output.
    pub rendered: RenderedMarkup,
    /// Complete HTML document.
    pub result: String,
}

/// A template function.
pub type TemplateFn =
    Arc<dyn Fn(TemplateContext<'_>) -> Result<TemplateResult, ConvertError> + Send + Sync>;

/// Name → template lookup.
#[derive(Clone)]
pub struct TemplateRegistry {
    templates: BTreeMap<String, TemplateFn>,
}

impl TemplateRegistry {
    /// Registry without any templates.
    pub fn empty() -> Self {
        Self {
            templates: BTreeMap::new(),
        }
    }

    /// Registry with the built-in `bare` and `bespoke` templates.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        registry.register("bare", bare);
        registry.register("bespoke", bespoke);
        registry
    }

    /// Add or replace a template.
    pub fn register<F>(&mut self, name: impl Into<String>, template: F)
    where
        F: Fn(TemplateContext<'_>) -> Result<TemplateResult, ConvertError> + Send + Sync + 'static,
    {
        self.templates.insert(name.into(), Arc::new(template));
    }

    pub fn get(&self, name: &str) -> Option<TemplateFn> {
        self.templates.get(name).cloned()
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(String::as_str)
    }
}

impl Default for TemplateRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl fmt::Debug for TemplateRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.templates.keys()).finish()
    }
}

// ── Built-in templates ───────────────────────────────────────────────────

#[derive(Template)]
#[template(path = "bare.html")]
struct BareDocument<'a> {
    lang: &'a str,
    css: &'a str,
    slides: &'a str,
    ready_script: Option<&'a str>,
}

#[derive(Template)]
#[template(path = "bespoke.html")]
struct BespokeDocument<'a> {
    lang: &'a str,
    css: &'a str,
    slides: &'a str,
    ready_script: Option<&'a str>,
}

/// Plain document: every slide stacked in order.
pub fn bare(ctx: TemplateContext<'_>) -> Result<TemplateResult, ConvertError> {
    let rendered = (ctx.renderer)(EngineOptions::new())?;
    let result = BareDocument {
        lang: ctx.lang,
        css: &rendered.css,
        slides: &rendered.html,
        ready_script: ctx.ready_script,
    }
    .render()
    .map_err(|e| ConvertError::Render(format!("bare template: {e}")))?;

    Ok(TemplateResult { rendered, result })
}

/// Presentation document: one slide on screen at a time, keyboard and
/// `#N` navigation. Prints like `bare`.
pub fn bespoke(ctx: TemplateContext<'_>) -> Result<TemplateResult, ConvertError> {
    let mut options = EngineOptions::new();
    options.insert("slideIds".into(), serde_json::Value::Bool(true));

    let rendered = (ctx.renderer)(options)?;
    let result = BespokeDocument {
        lang: ctx.lang,
        css: &rendered.css,
        slides: &rendered.html,
        ready_script: ctx.ready_script,
    }
    .render()
    .map_err(|e| ConvertError::Render(format!("bespoke template: {e}")))?;

    Ok(TemplateResult { rendered, result })
}
