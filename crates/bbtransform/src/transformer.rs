//! Predicate-gated tree walk that renders a [`Document`].
//!
//! For each tag the selection predicate decides whether it is rendered. A
//! rejected tag is emitted as its original source, descendants included:
//! nothing below a rejected tag is ever rendered, even if the predicate would
//! accept it. An accepted tag has its children transformed first; the
//! resulting body and the tag's attributes go to the [`TagRenderer`]
//! registered for its name.
//!
//! Text nodes go through a [`TextFilter`], which is also where length
//! divergence from the source is recorded into the [`Offsets`] ledger.
//!
//! ```rust
//! use bbtransform::{parse, Renderers, TagRegistry, Transformer};
//!
//! let registry = TagRegistry::new();
//! let doc = parse("x [b]bold[/b] [i]it[/i]", &registry, false).unwrap();
//! let renderers = Renderers::new()
//!     .with_fn("b", |body, _| Ok(format!("<strong>{}</strong>", body)))
//!     .with_fn("i", |body, _| Ok(format!("<em>{}</em>", body)));
//!
//! let out = Transformer::new(&registry, &renderers)
//!     .transform(&doc, |tag| tag.name() != "i")
//!     .unwrap();
//! assert_eq!(out.text, "x <strong>bold</strong> [i]it[/i]");
//! ```

use std::collections::HashMap;
use std::fmt;

use crate::document::{Attributes, Document, Node, NodeId, TagNode};
use crate::error::{RenderError, TransformError};
use crate::offsets::Offsets;
use crate::registry::{TagPolicy, TagRegistry};

/// What the selection predicate sees of a tag.
#[derive(Debug, Clone, Copy)]
pub struct TagView<'a> {
    tag: &'a TagNode,
    depth: usize,
}

impl<'a> TagView<'a> {
    pub fn name(&self) -> &'a str {
        &self.tag.name
    }

    pub fn attributes(&self) -> &'a Attributes {
        &self.tag.attributes
    }

    /// Number of enclosing tags; top-level tags have depth 0.
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn node(&self) -> &'a TagNode {
        self.tag
    }
}

/// Produces the replacement text for one tag.
///
/// `body` is the tag's already transformed content.
pub trait TagRenderer: Send + Sync {
    fn render(&self, body: &str, attributes: &Attributes) -> Result<String, RenderError>;
}

impl<F> TagRenderer for F
where
    F: Fn(&str, &Attributes) -> Result<String, RenderError> + Send + Sync,
{
    fn render(&self, body: &str, attributes: &Attributes) -> Result<String, RenderError> {
        self(body, attributes)
    }
}

/// Renderers keyed by tag name, with an optional fallback for other names.
#[derive(Default)]
pub struct Renderers {
    by_name: HashMap<String, Box<dyn TagRenderer>>,
    fallback: Option<Box<dyn TagRenderer>>,
}

impl Renderers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, renderer: impl TagRenderer + 'static) -> Self {
        self.insert(name, renderer);
        self
    }

    /// Like [`with`](Self::with), for closures.
    pub fn with_fn<F>(self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&str, &Attributes) -> Result<String, RenderError> + Send + Sync + 'static,
    {
        self.with(name, f)
    }

    /// Renderer used for names without their own entry.
    pub fn fallback(mut self, renderer: impl TagRenderer + 'static) -> Self {
        self.fallback = Some(Box::new(renderer));
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, renderer: impl TagRenderer + 'static) {
        self.by_name.insert(name.into(), Box::new(renderer));
    }

    pub fn get(&self, name: &str) -> Option<&dyn TagRenderer> {
        self.by_name
            .get(name)
            .or(self.fallback.as_ref())
            .map(|renderer| renderer.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }
}

impl fmt::Debug for Renderers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.by_name.keys().collect();
        names.sort();
        f.debug_struct("Renderers")
            .field("names", &names)
            .field("fallback", &self.fallback.is_some())
            .finish()
    }
}

/// Turns a text node's source into output text.
///
/// `position` is the source position of `text`. Implementations that change
/// the length must record each change with [`Offsets::add`] at the source
/// position where it begins. `policy` is the enclosing tag's policy, or the
/// registry's root policy for top-level text.
pub trait TextFilter: Send + Sync {
    fn filter(
        &self,
        text: &str,
        position: usize,
        policy: &TagPolicy,
        offsets: &mut Offsets,
        out: &mut String,
    );
}

/// Emits text unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct Verbatim;

impl TextFilter for Verbatim {
    fn filter(&self, text: &str, _: usize, _: &TagPolicy, _: &mut Offsets, out: &mut String) {
        out.push_str(text);
    }
}

/// Result of a successful transform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transformed {
    pub text: String,
    pub offsets: Offsets,
}

/// Renders documents with a fixed registry, renderer set and text filter.
pub struct Transformer<'a> {
    registry: &'a TagRegistry,
    renderers: &'a Renderers,
    filter: &'a dyn TextFilter,
    strict: bool,
}

impl<'a> Transformer<'a> {
    /// Creates a lenient transformer that emits text verbatim.
    pub fn new(registry: &'a TagRegistry, renderers: &'a Renderers) -> Self {
        Self {
            registry,
            renderers,
            filter: &Verbatim,
            strict: false,
        }
    }

    /// In strict mode an accepted tag without a renderer fails the transform
    /// instead of being emitted verbatim.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn text_filter(mut self, filter: &'a dyn TextFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn transform<P>(&self, doc: &Document, predicate: P) -> Result<Transformed, TransformError>
    where
        P: Fn(&TagView<'_>) -> bool,
    {
        let mut offsets = Offsets::new();
        let text = self.walk(doc, &predicate, &mut offsets)?;
        tracing::debug!(
            source_len = doc.source().len(),
            output_len = text.len(),
            edits = offsets.len(),
            "transformed document"
        );
        Ok(Transformed { text, offsets })
    }

    /// Depth-first walk over an explicit frame stack, so nesting depth is
    /// bounded by the heap rather than the call stack.
    fn walk<P>(
        &self,
        doc: &Document,
        predicate: &P,
        offsets: &mut Offsets,
    ) -> Result<String, TransformError>
    where
        P: Fn(&TagView<'_>) -> bool,
    {
        let mut stack = vec![Frame {
            ids: doc.children().iter(),
            policy: self.registry.root_policy(),
            depth: 0,
            body: String::with_capacity(doc.source().len()),
            pending: None,
        }];

        while let Some(frame) = stack.last_mut() {
            let Some(id) = frame.ids.next() else {
                let Some(done) = stack.pop() else { break };
                let Some((tag, renderer)) = done.pending else {
                    return Ok(done.body);
                };
                let rendered = renderer.render(&done.body, &tag.attributes).map_err(|source| {
                    TransformError::Render {
                        tag: tag.name.clone(),
                        source,
                    }
                })?;
                if let Some(parent) = stack.last_mut() {
                    parent.body.push_str(&rendered);
                }
                continue;
            };

            let tag = match doc.node(*id) {
                Node::Text(text) => {
                    self.filter.filter(
                        doc.slice(text.span),
                        text.span.start,
                        &frame.policy,
                        offsets,
                        &mut frame.body,
                    );
                    continue;
                }
                Node::Tag(tag) => tag,
            };

            let depth = frame.depth;
            if !predicate(&TagView { tag, depth }) {
                tracing::trace!(tag = %tag.name, depth, "rejected, emitted verbatim");
                frame.body.push_str(doc.slice(tag.span()));
                continue;
            }

            let Some(renderer) = self.renderers.get(&tag.name) else {
                if self.strict {
                    return Err(TransformError::MissingRenderer {
                        tag: tag.name.clone(),
                    });
                }
                tracing::trace!(tag = %tag.name, "no renderer, emitted verbatim");
                frame.body.push_str(doc.slice(tag.span()));
                continue;
            };

            let policy = self
                .registry
                .resolve(&tag.name)
                .copied()
                .unwrap_or_else(|| self.registry.root_policy());
            stack.push(Frame {
                ids: tag.children.iter(),
                policy,
                depth: depth + 1,
                body: String::new(),
                pending: Some((tag, renderer)),
            });
        }

        Ok(String::new())
    }
}

/// An accepted tag whose children are still being transformed. The root
/// frame has no pending tag.
struct Frame<'t> {
    ids: std::slice::Iter<'t, NodeId>,
    policy: TagPolicy,
    depth: usize,
    body: String,
    pending: Option<(&'t TagNode, &'t dyn TagRenderer)>,
}

/// Renders `document` leniently with verbatim text. See [`Transformer`].
pub fn transform<P>(
    document: &Document,
    predicate: P,
    renderers: &Renderers,
    registry: &TagRegistry,
) -> Result<Transformed, TransformError>
where
    P: Fn(&TagView<'_>) -> bool,
{
    Transformer::new(registry, renderers).transform(document, predicate)
}
