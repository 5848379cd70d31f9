//! Script injected into every document the CLI produces.
//!
//! It marks the document root with `data-deck-ready` once the page has
//! loaded and its web fonts are available, so anything driving a browser
//! (including [`crate::browser`]) can tell when the slides are final.

/// Attribute set on `<html>` when the document is ready.
pub const READY_ATTRIBUTE: &str = "data-deck-ready";

/// Inline JavaScript for the `ready_script` configuration option.
pub const READY_SCRIPT: &str = r#"(function () {
  var root = document.documentElement;
  function mark() { root.setAttribute("data-deck-ready", ""); }
  function fonts() {
    if (document.fonts && document.fonts.ready) {
      document.fonts.ready.then(mark, mark);
    } else {
      mark();
    }
  }
  if (document.readyState === "complete") {
    fonts();
  } else {
    window.addEventListener("load", fonts, { once: true });
  }
})();"#;
