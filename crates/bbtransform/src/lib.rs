//! BBCode-style markup parser and transformer with source offset tracking.
//!
//! This crate parses `[tag attr=value]content[/tag]` markup into a tree and
//! renders it through pluggable per-tag renderers, while keeping an exact
//! mapping from rendered positions back to the source.
//!
//! # Example
//!
//! ```rust
//! use bbtransform::{parse, HtmlFilter, Renderers, TagPolicy, TagRegistry, Transformer};
//!
//! let registry = TagRegistry::new()
//!     .tag("code", TagPolicy::raw())
//!     .tag("*", TagPolicy::implicit());
//!
//! let renderers = Renderers::new()
//!     .with_fn("b", |body, _| Ok(format!("<strong>{}</strong>", body)))
//!     .with_fn("code", |body, _| Ok(format!("<pre>{}</pre>", body)));
//!
//! let doc = parse("a < b [b]bold[/b] [code][b][/code]", &registry, true).unwrap();
//! let out = Transformer::new(&registry, &renderers)
//!     .strict(true)
//!     .text_filter(&HtmlFilter)
//!     .transform(&doc, |_| true)
//!     .unwrap();
//!
//! assert_eq!(out.text, "a &lt; b <strong>bold</strong> <pre>[b]</pre>");
//! // "<" at source position 2 became four characters.
//! assert_eq!(out.offsets.compute_offset_from_index(2), 3);
//! ```
//!
//! # Pipeline
//!
//! 1. [`parse`] (or [`Parser`]) builds a [`Document`]: one source buffer, an
//!    arena of nodes holding spans into it, and the offsets of every tag
//!    marker and attribute value.
//! 2. [`transform`] (or [`Transformer`]) walks the tree. A predicate selects
//!    which tags are rendered; rejected tags are emitted verbatim with all
//!    their descendants. Text goes through a [`TextFilter`], which records
//!    length changes in the [`Offsets`] ledger.
//!
//! # Strictness
//!
//! Lenient mode never loses text: unknown tags, unmatched closing markers and
//! tags without a renderer are emitted as they appear in the source. Strict
//! mode turns them into [`ParseError`] and [`TransformError`]. A failing
//! renderer is always an error.

mod document;
mod error;
mod html;
mod offsets;
mod parser;
mod registry;
mod style;
mod template;
mod transformer;

pub use document::{Attributes, Document, Node, NodeId, Span, TagNode, TextNode};
pub use error::{ConfigError, ParseError, RenderError, TransformError};
pub use html::HtmlFilter;
pub use offsets::Offsets;
pub use parser::{parse, Parser};
pub use registry::{TagPolicy, TagRegistry};
pub use style::{styled_renderers, StyleRenderer};
pub use template::{TemplateRenderer, Templates};
pub use transformer::{
    transform, Renderers, TagRenderer, TagView, TextFilter, Transformed, Transformer, Verbatim,
};
