//! The default engine: Markdown slide decks rendered with comrak.
//!
//! A deck is one Markdown document split into slides at `---` lines (outside
//! fenced code). Global directives are written as HTML comments,
//! `<!-- theme: gaia -->`, or in a leading front-matter block. Directives
//! apply to the whole deck and the last occurrence wins, so a directive
//! appended to the end of the text overrides anything the author wrote.
//!
//! Only comments comrak parses as HTML count as directives. The same text
//! inside a code block or a code span is shown verbatim.

use super::{theme, Engine, EngineFactory, EngineOptions, RenderedMarkup};
use crate::error::ConvertError;
use comrak::nodes::{AstNode, NodeValue};
use comrak::{format_html, parse_document, Arena, Options};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use tracing::debug;

static DIRECTIVE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<!--\s*([A-Za-z_][A-Za-z0-9_]*)\s*:\s*(.*?)\s*-->").expect("directive regex")
});

static FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s{0,3}(```|~~~)").expect("fence regex"));

/// Options understood by [`SlideEngine`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SlideEngineOptions {
    /// Pass raw HTML in the Markdown through to the output.
    pub html: bool,
    /// Print page numbers unless a `paginate` directive says otherwise.
    pub paginate: bool,
    /// Give every `<section>` an `id` equal to its 1-based slide number.
    pub slide_ids: bool,
}

impl SlideEngineOptions {
    /// Parse from an [`EngineOptions`] map. Unknown keys are ignored.
    pub fn from_map(options: &EngineOptions) -> Result<Self, ConvertError> {
        serde_json::from_value(serde_json::Value::Object(options.clone())).map_err(|e| {
            ConvertError::ConfigurationError(format!("Invalid engine options: {e}"))
        })
    }
}

/// Factory for [`SlideEngine`]; the default engine of every configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct SlideEngineFactory;

impl EngineFactory for SlideEngineFactory {
    fn create(&self, options: &EngineOptions) -> Result<Box<dyn Engine>, ConvertError> {
        Ok(Box::new(SlideEngine::new(SlideEngineOptions::from_map(
            options,
        )?)))
    }

    fn name(&self) -> &str {
        "slides"
    }
}

/// Markdown slide renderer.
pub struct SlideEngine {
    options: SlideEngineOptions,
    comrak: Options<'static>,
}

impl SlideEngine {
    pub fn new(options: SlideEngineOptions) -> Self {
        let mut comrak = Options::default();
        let ext = &mut comrak.extension;
        ext.strikethrough = true;
        ext.table = true;
        ext.autolink = true;
        ext.tasklist = true;
        ext.footnotes = true;
        comrak.render.r#unsafe = options.html;

        Self { options, comrak }
    }
}

impl Engine for SlideEngine {
    fn render(&self, markdown: &str) -> Result<RenderedMarkup, ConvertError> {
        let (front_matter, body) = split_front_matter(markdown);
        let mut directives = Directives::from_front_matter(front_matter);

        let arena = Arena::new();
        let slides: Vec<&AstNode<'_>> = split_slides(body)
            .into_iter()
            .map(|slide| {
                let root = parse_document(&arena, slide, &self.comrak);
                directives.take_from(root);
                root
            })
            .collect();
        let paginate = directives.paginate.unwrap_or(self.options.paginate);

        let mut html = String::new();
        for (idx, root) in slides.iter().copied().enumerate() {
            let number = idx + 1;
            let mut inner = String::new();
            format_html(root, &self.comrak, &mut inner)
                .map_err(|e| ConvertError::Render(format!("slide {number}: {e}")))?;

            html.push_str("<section class=\"slide\"");
            if self.options.slide_ids {
                html.push_str(&format!(" id=\"{number}\""));
            }
            html.push_str(&format!(" data-slide=\"{number}\">\n"));
            html.push_str(&inner);
            if paginate {
                html.push_str(&format!("<footer class=\"pagination\">{number}</footer>\n"));
            }
            html.push_str("</section>\n");
        }

        debug!(
            "Rendered {} slides (theme: {})",
            slides.len(),
            directives.theme.as_deref().unwrap_or(theme::DEFAULT_THEME)
        );

        Ok(RenderedMarkup {
            html,
            css: theme::stylesheet(directives.theme.as_deref()),
            slide_count: slides.len(),
        })
    }
}

// ── Directives ───────────────────────────────────────────────────────────

#[derive(Debug, Default, PartialEq, Eq)]
struct Directives {
    theme: Option<String>,
    paginate: Option<bool>,
}

impl Directives {
    fn from_front_matter(front_matter: Option<&str>) -> Self {
        let mut out = Self::default();
        for line in front_matter.into_iter().flat_map(str::lines) {
            if let Some((key, value)) = line.split_once(':') {
                out.apply(key.trim(), value.trim());
            }
        }
        out
    }

    /// Apply every directive comment in a parsed slide, in document order,
    /// and remove it from the tree. Code blocks and code spans are separate
    /// node kinds, so their text is never read here.
    fn take_from<'a>(&mut self, root: &'a AstNode<'a>) {
        let html_nodes: Vec<&'a AstNode<'a>> = root
            .descendants()
            .filter(|node| {
                let data = node.data.borrow();
                matches!(data.value, NodeValue::HtmlBlock(_) | NodeValue::HtmlInline(_))
            })
            .collect();

        for node in html_nodes {
            let mut data = node.data.borrow_mut();
            let literal = match &mut data.value {
                NodeValue::HtmlBlock(block) => &mut block.literal,
                NodeValue::HtmlInline(literal) => literal,
                _ => continue,
            };
            if !DIRECTIVE.is_match(literal.as_str()) {
                continue;
            }
            for cap in DIRECTIVE.captures_iter(literal.as_str()) {
                self.apply(&cap[1], &cap[2]);
            }
            let rest = DIRECTIVE.replace_all(literal.as_str(), "").into_owned();
            if rest.trim().is_empty() {
                drop(data);
                node.detach();
            } else {
                *literal = rest;
            }
        }
    }

    fn apply(&mut self, key: &str, raw: &str) {
        let value = unquote(raw);
        match key {
            "theme" => self.theme = Some(value),
            "paginate" => self.paginate = Some(value == "true"),
            _ => {}
        }
    }
}

/// Strip JSON or single quotes from a directive value.
fn unquote(raw: &str) -> String {
    if raw.starts_with('"') {
        if let Ok(s) = serde_json::from_str::<String>(raw) {
            return s;
        }
    }
    raw.trim_matches(|c| c == '\'' || c == '"').to_string()
}

// ── Splitting ────────────────────────────────────────────────────────────

/// Separate a leading `---` … `---` block from the body.
fn split_front_matter(markdown: &str) -> (Option<&str>, &str) {
    let Some(rest) = markdown
        .strip_prefix("---\n")
        .or_else(|| markdown.strip_prefix("---\r\n"))
    else {
        return (None, markdown);
    };

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == "---" {
            let fm = &rest[..offset];
            if !fm.lines().all(is_front_matter_line) {
                // A slide that merely starts with a ruler.
                return (None, markdown);
            }
            return (Some(fm), &rest[offset + line.len()..]);
        }
        offset += line.len();
    }
    (None, markdown)
}

fn is_front_matter_line(line: &str) -> bool {
    let line = line.trim();
    line.is_empty() || (line.contains(':') && !line.starts_with('#'))
}

/// Split the body into slides at `---` lines that are not inside a fence.
fn split_slides(body: &str) -> Vec<&str> {
    let mut slides = Vec::new();
    let mut start = 0;
    let mut offset = 0;
    let mut fence: Option<&str> = None;

    for line in body.split_inclusive('\n') {
        if let Some(m) = FENCE.captures(line) {
            let marker = m.get(1).map(|m| m.as_str());
            match fence {
                None => fence = marker,
                Some(open) if Some(open) == marker => fence = None,
                Some(_) => {}
            }
        } else if fence.is_none() && line.trim_end() == "---" {
            slides.push(&body[start..offset]);
            start = offset + line.len();
        }
        offset += line.len();
    }
    slides.push(&body[start..]);
    slides
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine(options: SlideEngineOptions) -> SlideEngine {
        SlideEngine::new(options)
    }

    #[test]
    fn heading_renders_inside_a_section() {
        let out = engine(SlideEngineOptions::default())
            .render("# Hello")
            .unwrap();
        assert_eq!(out.slide_count, 1);
        assert!(out.html.contains("<h1>Hello</h1>"), "got: {}", out.html);
        assert!(out.html.starts_with("<section class=\"slide\" data-slide=\"1\">"));
    }

    #[test]
    fn rulers_split_slides() {
        let out = engine(SlideEngineOptions::default())
            .render("# One\n\n---\n\n# Two\n---\n# Three\n")
            .unwrap();
        assert_eq!(out.slide_count, 3);
        assert!(out.html.contains("<h1>Three</h1>"));
    }

    #[test]
    fn rulers_inside_fences_do_not_split() {
        let md = "```yaml\n---\nkey: value\n---\n```\n";
        assert_eq!(split_slides(md).len(), 1);

        let md = "~~~\n```\n---\n~~~\n---\nnext\n";
        assert_eq!(split_slides(md).len(), 2);
    }

    #[test]
    fn front_matter_is_not_a_slide() {
        let (fm, body) = split_front_matter("---\ntheme: gaia\n---\n# Hi\n");
        assert_eq!(fm, Some("theme: gaia\n"));
        assert_eq!(body, "# Hi\n");

        let (fm, body) = split_front_matter("# No front matter\n");
        assert!(fm.is_none());
        assert_eq!(body, "# No front matter\n");

        let md = "---\n# A\n---\n# B\n";
        assert_eq!(split_front_matter(md), (None, md));
    }

    #[test]
    fn last_theme_directive_wins() {
        let md = "---\ntheme: uncover\n---\n# Hi\n<!-- theme: default -->\n<!-- theme: \"gaia\" -->";
        let out = engine(SlideEngineOptions::default()).render(md).unwrap();
        assert!(out.css.contains("#fff8e1"));
    }

    #[test]
    fn theme_directive_selects_css_and_is_removed() {
        let out = engine(SlideEngineOptions {
            html: true,
            ..Default::default()
        })
        .render("# Hi\n<!-- theme: \"gaia\" -->")
        .unwrap();
        assert!(out.css.contains("#fff8e1"));
        assert!(!out.html.contains("theme:"));
    }

    #[test]
    fn paginate_directive_overrides_option() {
        let paginated = SlideEngineOptions {
            paginate: true,
            ..Default::default()
        };
        let out = engine(paginated.clone()).render("# A\n---\n# B").unwrap();
        assert!(out.html.contains("<footer class=\"pagination\">2</footer>"));

        let out = engine(paginated)
            .render("<!-- paginate: false -->\n# A")
            .unwrap();
        assert!(!out.html.contains("pagination"));
    }

    #[test]
    fn slide_ids_are_numbered() {
        let out = engine(SlideEngineOptions {
            slide_ids: true,
            ..Default::default()
        })
        .render("a\n---\nb")
        .unwrap();
        assert!(out.html.contains("id=\"1\""));
        assert!(out.html.contains("id=\"2\""));
    }

    #[test]
    fn raw_html_needs_the_html_option() {
        let md = "<div class=\"x\">raw</div>\n";
        let strict = engine(SlideEngineOptions::default()).render(md).unwrap();
        assert!(!strict.html.contains("<div class=\"x\">"));

        let open = engine(SlideEngineOptions {
            html: true,
            ..Default::default()
        })
        .render(md)
        .unwrap();
        assert!(open.html.contains("<div class=\"x\">raw</div>"));
    }

    #[test]
    fn options_parse_from_camel_case_map() {
        let map = serde_json::json!({"html": true, "slideIds": true, "unknown": 1});
        let parsed = SlideEngineOptions::from_map(map.as_object().unwrap()).unwrap();
        assert!(parsed.html);
        assert!(parsed.slide_ids);
        assert!(!parsed.paginate);
    }

    #[test]
    fn bad_option_type_is_a_configuration_error() {
        let map = serde_json::json!({"html": "yes"});
        let err = SlideEngineOptions::from_map(map.as_object().unwrap()).unwrap_err();
        assert!(matches!(err, ConvertError::ConfigurationError(_)));
    }

    #[test]
    fn rendering_is_deterministic() {
        let e = engine(SlideEngineOptions::default());
        let md = "# Title\n\n- a\n- b\n\n---\n\n| x | y |\n|---|---|\n| 1 | 2 |\n";
        assert_eq!(e.render(md).unwrap(), e.render(md).unwrap());
    }

    #[test]
    fn directive_in_fenced_code_is_shown_not_applied() {
        let out = engine(SlideEngineOptions::default())
            .render("# Directives\n\n```html\n<!-- theme: gaia -->\n```\n")
            .unwrap();
        assert!(
            out.html.contains("&lt;!-- theme: gaia --&gt;"),
            "got: {}",
            out.html
        );
        assert!(!out.css.contains("#fff8e1"));
    }

    #[test]
    fn directive_in_code_span_is_shown_not_applied() {
        let out = engine(SlideEngineOptions::default())
            .render("Use `<!-- paginate: true -->` to number pages")
            .unwrap();
        assert!(
            out.html.contains("<code>&lt;!-- paginate: true --&gt;</code>"),
            "got: {}",
            out.html
        );
        assert!(!out.html.contains("pagination"));
    }

    #[test]
    fn inline_directive_is_applied_and_removed() {
        let out = engine(SlideEngineOptions::default())
            .render("Numbered <!-- paginate: true --> deck")
            .unwrap();
        assert!(out.html.contains("<footer class=\"pagination\">1</footer>"));
        assert!(!out.html.contains("paginate"));
        assert!(!out.html.contains("raw HTML omitted"));
    }

    #[test]
    fn other_html_in_a_directive_block_is_kept() {
        let out = engine(SlideEngineOptions {
            html: true,
            ..Default::default()
        })
        .render("<!-- theme: uncover --><!-- note -->\n\n# Hi\n")
        .unwrap();
        assert!(out.html.contains("<!-- note -->"), "got: {}", out.html);
        assert!(!out.html.contains("theme:"));
    }
}
