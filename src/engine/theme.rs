//! Built-in slide themes.
//!
//! Every theme shares the same page geometry: 1280×720 px slides, one per
//! printed page. The `@page` rule is what the PDF rasteriser honours when it
//! is asked to prefer the CSS page size.

use tracing::warn;

/// Theme used when no directive names one.
pub const DEFAULT_THEME: &str = "default";

const BASE_CSS: &str = r#"@page { size: 1280px 720px; margin: 0; }
html, body { margin: 0; padding: 0; }
section.slide {
  box-sizing: border-box;
  width: 1280px;
  height: 720px;
  overflow: hidden;
  position: relative;
  padding: 70px 80px;
  break-after: page;
  page-break-after: always;
  -webkit-print-color-adjust: exact;
  print-color-adjust: exact;
}
section.slide:last-of-type { break-after: auto; page-break-after: auto; }
section.slide img { max-width: 100%; }
section.slide pre { overflow: hidden; }
section.slide .pagination { position: absolute; right: 30px; bottom: 20px; font-size: 24px; }
"#;

const DEFAULT_CSS: &str = r#"section.slide {
  background: #fff;
  color: #24292e;
  font-family: -apple-system, "Segoe UI", Helvetica, Arial, sans-serif;
  font-size: 30px;
}
section.slide h1 { font-size: 1.8em; border-bottom: 1px solid #eaecef; }
section.slide h2 { font-size: 1.5em; }
section.slide code { background: #f6f8fa; padding: 0.1em 0.3em; border-radius: 3px; }
section.slide pre { background: #f6f8fa; padding: 0.8em; }
section.slide a { color: #0366d6; }
"#;

const GAIA_CSS: &str = r#"section.slide {
  background: #fff8e1;
  color: #455a64;
  font-family: Lato, "Avenir Next", Avenir, "Trebuchet MS", sans-serif;
  font-size: 35px;
  padding: 70px;
}
section.slide h1, section.slide h2 { color: #0288d1; }
section.slide h1 { font-size: 1.8em; }
section.slide code { background: #fff3c4; }
section.slide pre { background: #455a64; color: #fff8e1; padding: 0.6em; }
section.slide a { color: #0288d1; }
"#;

const UNCOVER_CSS: &str = r#"section.slide {
  background: #fdfcff;
  color: #202228;
  font-family: "Helvetica Neue", Helvetica, Arial, sans-serif;
  font-size: 40px;
  display: flex;
  flex-direction: column;
  justify-content: center;
  text-align: center;
}
section.slide h1 { font-size: 1.6em; letter-spacing: 0.03em; }
section.slide pre { text-align: left; background: #202228; color: #fdfcff; padding: 0.6em; }
section.slide a { color: #09c; }
"#;

const THEMES: &[(&str, &str)] = &[
    ("default", DEFAULT_CSS),
    ("gaia", GAIA_CSS),
    ("uncover", UNCOVER_CSS),
];

/// Names of the built-in themes.
pub fn names() -> impl Iterator<Item = &'static str> {
    THEMES.iter().map(|(name, _)| *name)
}

/// Theme-specific CSS, or `None` for an unknown name.
pub fn theme_css(name: &str) -> Option<&'static str> {
    THEMES
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name))
        .map(|(_, css)| *css)
}

/// Full stylesheet for `name`, falling back to the default theme.
pub fn stylesheet(name: Option<&str>) -> String {
    let name = name.unwrap_or(DEFAULT_THEME);
    let css = theme_css(name).unwrap_or_else(|| {
        warn!("Unknown theme \"{}\", using \"{}\"", name, DEFAULT_THEME);
        DEFAULT_CSS
    });
    format!("{BASE_CSS}{css}")
}
