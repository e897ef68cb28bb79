//! Terminal styling renderers.
//!
//! The same markup can target a terminal instead of HTML: each tag name maps
//! to a [`console::Style`] that is applied to the tag's rendered body.
//!
//! ```rust
//! use bbtransform::{parse, styled_renderers, TagRegistry, transform};
//! use console::Style;
//! use std::collections::HashMap;
//!
//! let mut styles = HashMap::new();
//! styles.insert("bold".to_string(), Style::new().bold().force_styling(true));
//!
//! let registry = TagRegistry::new();
//! let renderers = styled_renderers(styles);
//! let doc = parse("[bold]hello[/bold]", &registry, false).unwrap();
//! let out = transform(&doc, |_| true, &renderers, &registry).unwrap();
//! assert!(out.text.contains("\x1b[1m"));
//! ```

use console::Style;
use std::collections::HashMap;

use crate::document::Attributes;
use crate::error::RenderError;
use crate::transformer::{Renderers, TagRenderer};

/// Applies a [`Style`] to the body. Attributes are ignored.
#[derive(Debug, Clone)]
pub struct StyleRenderer {
    style: Style,
}

impl StyleRenderer {
    pub fn new(style: Style) -> Self {
        Self { style }
    }
}

impl TagRenderer for StyleRenderer {
    fn render(&self, body: &str, _: &Attributes) -> Result<String, RenderError> {
        if body.is_empty() {
            return Ok(String::new());
        }
        Ok(self.style.apply_to(body).to_string())
    }
}

/// Builds a renderer set from tag-name-to-style pairs.
pub fn styled_renderers(styles: HashMap<String, Style>) -> Renderers {
    styles
        .into_iter()
        .fold(Renderers::new(), |renderers, (name, style)| {
            renderers.with(name, StyleRenderer::new(style))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use crate::registry::TagRegistry;
    use crate::transformer::Transformer;

    fn test_styles() -> HashMap<String, Style> {
        let mut styles = HashMap::new();
        styles.insert("red".to_string(), Style::new().red().force_styling(true));
        styles.insert("bold".to_string(), Style::new().bold().force_styling(true));
        styles.insert("plain".to_string(), Style::new().force_styling(false));
        styles
    }

    #[test]
    fn applies_ansi_codes() {
        let registry = TagRegistry::new();
        let renderers = styled_renderers(test_styles());
        let doc = parse("[red]hello[/red] [bold]world[/bold]", &registry, true).unwrap();
        let out = Transformer::new(&registry, &renderers)
            .transform(&doc, |_| true)
            .unwrap();

        assert!(out.text.contains("\x1b[31m"));
        assert!(out.text.contains("\x1b[1m"));
        assert!(out.text.contains("hello"));
        assert!(out.text.contains("world"));
    }

    #[test]
    fn unstyled_output_is_plain() {
        let renderer = StyleRenderer::new(Style::new().red().force_styling(false));
        assert_eq!(renderer.render("text", &Attributes::new()).unwrap(), "text");
    }

    #[test]
    fn empty_body_emits_nothing() {
        let renderer = StyleRenderer::new(Style::new().bold().force_styling(true));
        assert_eq!(renderer.render("", &Attributes::new()).unwrap(), "");
    }

    #[test]
    fn compact_output() {
        let renderer = StyleRenderer::new(Style::new().red().force_styling(true));
        let output = renderer.render("text", &Attributes::new()).unwrap();
        assert!(output.matches("\x1b[").count() <= 2, "too many escapes: {:?}", output);
    }

    #[test]
    fn unknown_tags_pass_through() {
        let registry = TagRegistry::new();
        let renderers = styled_renderers(test_styles());
        let doc = parse("[unknown]text[/unknown]", &registry, false).unwrap();
        let out = Transformer::new(&registry, &renderers)
            .transform(&doc, |_| true)
            .unwrap();
        assert_eq!(out.text, "[unknown]text[/unknown]");
    }
}
