//! Template-backed renderers.
//!
//! [`Templates`] compiles one MiniJinja template per tag name. Each template
//! sees two variables:
//!
//! - `body`: the tag's transformed content
//! - `attributes`: the tag's attributes, in source order
//!
//! ```rust
//! use bbtransform::{parse, TagRegistry, Templates, transform};
//!
//! let mut templates = Templates::new();
//! templates.add("b", "<strong>{{ body }}</strong>").unwrap();
//! templates
//!     .add("url", r#"<a href="{{ attributes.url }}">{{ body }}</a>"#)
//!     .unwrap();
//! let renderers = templates.into_renderers();
//!
//! let registry = TagRegistry::new();
//! let doc = parse("[url=/home][b]home[/b][/url]", &registry, true).unwrap();
//! let out = transform(&doc, |_| true, &renderers, &registry).unwrap();
//! assert_eq!(out.text, r#"<a href="/home"><strong>home</strong></a>"#);
//! ```
//!
//! Templates are not auto-escaped: `body` has already been through the
//! transformer's text filter.

use minijinja::{context, Environment, Value};
use std::sync::Arc;

use crate::document::Attributes;
use crate::error::RenderError;
use crate::transformer::{Renderers, TagRenderer};

/// A set of templates keyed by tag name.
pub struct Templates {
    env: Environment<'static>,
    names: Vec<String>,
}

impl Templates {
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.set_auto_escape_callback(|_| minijinja::AutoEscape::None);
        Self {
            env,
            names: Vec::new(),
        }
    }

    /// Compiles `source` as the template for `tag`, replacing any previous one.
    pub fn add(&mut self, tag: &str, source: &str) -> Result<(), RenderError> {
        self.env
            .add_template_owned(tag.to_string(), source.to_string())?;
        if !self.names.iter().any(|name| name == tag) {
            self.names.push(tag.to_string());
        }
        Ok(())
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.names.iter().any(|name| name == tag)
    }

    /// Direct access for registering filters and functions.
    pub fn environment_mut(&mut self) -> &mut Environment<'static> {
        &mut self.env
    }

    /// Renders the template registered for `tag`.
    pub fn render(&self, tag: &str, body: &str, attributes: &Attributes) -> Result<String, RenderError> {
        let template = self.env.get_template(tag)?;
        let rendered = template.render(context! {
            body => body,
            attributes => Value::from_serialize(attributes),
        })?;
        Ok(rendered)
    }

    /// One renderer per registered template, all sharing this environment.
    pub fn into_renderers(self) -> Renderers {
        let names = self.names.clone();
        let templates = Arc::new(self);
        names.into_iter().fold(Renderers::new(), |renderers, name| {
            let renderer = TemplateRenderer {
                templates: Arc::clone(&templates),
                tag: name.clone(),
            };
            renderers.with(name, renderer)
        })
    }
}

impl Default for Templates {
    fn default() -> Self {
        Self::new()
    }
}

/// Renders one tag through its template.
#[derive(Clone)]
pub struct TemplateRenderer {
    templates: Arc<Templates>,
    tag: String,
}

impl TagRenderer for TemplateRenderer {
    fn render(&self, body: &str, attributes: &Attributes) -> Result<String, RenderError> {
        self.templates.render(&self.tag, body, attributes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_body_and_attributes() {
        let mut templates = Templates::new();
        templates
            .add(
                "d",
                r#"<d{% for name, value in attributes|items %} {{ name }}="{{ value }}"{% endfor %}>{{ body }}</d>"#,
            )
            .unwrap();

        let attributes: Attributes = [("size", "10"), ("family", "verdana")].into_iter().collect();
        let out = templates.render("d", "xyz", &attributes).unwrap();
        assert_eq!(out, r#"<d size="10" family="verdana">xyz</d>"#);
    }

    #[test]
    fn environment_filters_are_available() {
        let mut templates = Templates::new();
        templates
            .environment_mut()
            .add_filter("shout", |value: String| value.to_uppercase());
        templates.add("b", "<b>{{ body|shout }}</b>").unwrap();
        let out = templates.render("b", "loud", &Attributes::new()).unwrap();
        assert_eq!(out, "<b>LOUD</b>");
    }

    #[test]
    fn body_is_not_escaped() {
        let mut templates = Templates::new();
        templates.add("b", "<b>{{ body }}</b>").unwrap();
        let out = templates.render("b", "&lt;i&gt;", &Attributes::new()).unwrap();
        assert_eq!(out, "<b>&lt;i&gt;</b>");
    }

    #[test]
    fn syntax_error_on_add() {
        let mut templates = Templates::new();
        let err = templates.add("b", "{{ body ").unwrap_err();
        assert!(matches!(err, RenderError::Template(_)));
        assert!(!templates.contains("b"));
    }

    #[test]
    fn into_renderers_covers_every_template() {
        let mut templates = Templates::new();
        templates.add("a", "A{{ body }}").unwrap();
        templates.add("b", "B{{ body }}").unwrap();
        templates.add("a", "AA{{ body }}").unwrap();

        let renderers = templates.into_renderers();
        assert!(renderers.contains("a"));
        assert!(renderers.contains("b"));
        assert!(!renderers.contains("c"));

        let a = renderers.get("a").unwrap();
        assert_eq!(a.render("x", &Attributes::new()).unwrap(), "AAx");
    }
}
