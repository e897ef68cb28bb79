//! Document model: one source buffer plus an arena of nodes.
//!
//! Nodes never copy source text. A [`TextNode`] is a [`Span`] into the
//! document's buffer and a [`TagNode`] records the spans of its markers. The
//! [`Document`] owns the buffer and every node; children are referenced by
//! [`NodeId`] so the tree has no ownership cycles.
//!
//! Concatenating the spans of a document's nodes in order (opening marker,
//! children, closing marker) reproduces the source exactly. See
//! [`Document::reconstruct`].

use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::BTreeSet;
use std::convert::Infallible;
use std::fmt;
use std::ops::Range;

/// Half-open byte range `[start, end)` into the source buffer.
#[derive(Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

impl From<Range<usize>> for Span {
    fn from(range: Range<usize>) -> Self {
        Self::new(range.start, range.end)
    }
}

impl From<Span> for Range<usize> {
    fn from(span: Span) -> Self {
        span.start..span.end
    }
}

/// Index of a node in its document's arena.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

/// Attributes of a tag in source order.
///
/// Serializes as a map, which is how templates see it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Attributes {
    entries: Vec<(String, String)>,
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `name` to `value`. A repeated name keeps its first position.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut attributes = Attributes::new();
        for (name, value) in iter {
            attributes.insert(name, value);
        }
        attributes
    }
}

impl Serialize for Attributes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, value) in &self.entries {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// A literal run of source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextNode {
    pub span: Span,
}

/// A structured markup element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagNode {
    pub name: String,
    pub attributes: Attributes,
    /// Span of the opening marker, e.g. `[b]`.
    pub open: Span,
    /// Span of the closing marker. `None` when the tag closed implicitly.
    pub close: Option<Span>,
    /// Span between the opening marker and the close point.
    pub body: Span,
    pub children: Vec<NodeId>,
}

impl TagNode {
    /// The tag's whole source extent, markers included.
    pub fn span(&self) -> Span {
        let end = self.close.map_or(self.body.end, |close| close.end);
        Span::new(self.open.start, end)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Text(TextNode),
    Tag(TagNode),
}

impl Node {
    pub fn span(&self) -> Span {
        match self {
            Node::Text(text) => text.span,
            Node::Tag(tag) => tag.span(),
        }
    }

    pub fn as_tag(&self) -> Option<&TagNode> {
        match self {
            Node::Tag(tag) => Some(tag),
            Node::Text(_) => None,
        }
    }
}

/// Root of a parsed tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    source: String,
    nodes: Vec<Node>,
    children: Vec<NodeId>,
    /// `(position, length)` of every tag marker.
    tag_offsets: BTreeSet<(usize, usize)>,
    /// `(position, length)` of every attribute value.
    attribute_offsets: BTreeSet<(usize, usize)>,
}

impl Document {
    /// Creates an empty document over `source`.
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            nodes: Vec::new(),
            children: Vec::new(),
            tag_offsets: BTreeSet::new(),
            attribute_offsets: BTreeSet::new(),
        }
    }

    /// Appends `node` to `parent`'s children, or to the top level when
    /// `parent` is `None`.
    ///
    /// # Panics
    ///
    /// Panics if `parent` does not refer to a tag node of this document.
    pub fn add_child(&mut self, parent: Option<NodeId>, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        match parent {
            None => self.children.push(id),
            Some(parent) => match &mut self.nodes[parent.0] {
                Node::Tag(tag) => tag.children.push(id),
                Node::Text(_) => panic!("text node {:?} cannot have children", parent),
            },
        }
        id
    }

    pub(crate) fn tag_mut(&mut self, id: NodeId) -> Option<&mut TagNode> {
        match self.nodes.get_mut(id.0) {
            Some(Node::Tag(tag)) => Some(tag),
            _ => None,
        }
    }

    pub(crate) fn record_tag_offset(&mut self, span: Span) {
        self.tag_offsets.insert((span.start, span.len()));
    }

    pub(crate) fn record_attribute_offset(&mut self, span: Span) {
        self.attribute_offsets.insert((span.start, span.len()));
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Top-level children in document order.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    /// Child ids of `id`; empty for text nodes.
    pub fn children_of(&self, id: NodeId) -> &[NodeId] {
        match self.node(id) {
            Node::Tag(tag) => &tag.children,
            Node::Text(_) => &[],
        }
    }

    pub fn tag_offsets(&self) -> &BTreeSet<(usize, usize)> {
        &self.tag_offsets
    }

    pub fn attribute_offsets(&self) -> &BTreeSet<(usize, usize)> {
        &self.attribute_offsets
    }

    /// Source text between `start` and `end`.
    pub fn get_string(&self, start: usize, end: usize) -> &str {
        &self.source[start..end]
    }

    pub fn slice(&self, span: Span) -> &str {
        self.get_string(span.start, span.end)
    }

    /// Literal source text of node `id`.
    pub fn text_of(&self, id: NodeId) -> &str {
        self.slice(self.node(id).span())
    }

    /// Rebuilds the source by concatenating node spans in document order.
    pub fn reconstruct(&self) -> String {
        let mut out = String::with_capacity(self.source.len());
        self.walk(|visit| {
            match visit {
                Visit::Text { text, .. } => out.push_str(self.slice(text.span)),
                Visit::Open { tag, .. } => out.push_str(self.slice(tag.open)),
                Visit::Close(tag) => {
                    if let Some(close) = tag.close {
                        out.push_str(self.slice(close));
                    }
                }
            }
            Ok::<(), Infallible>(())
        })
        .unwrap_or_else(|never| match never {});
        out
    }

    /// Depth-first traversal driven by an explicit stack, so arbitrarily deep
    /// nesting does not consume call stack.
    fn walk<E>(&self, mut visit: impl FnMut(Visit<'_>) -> Result<(), E>) -> Result<(), E> {
        let mut stack = vec![(None, self.children.iter().enumerate())];
        while let Some((_, ids)) = stack.last_mut() {
            let Some((index, id)) = ids.next() else {
                if let Some((Some(tag), _)) = stack.pop() {
                    visit(Visit::Close(tag))?;
                }
                continue;
            };
            match self.node(*id) {
                Node::Text(text) => visit(Visit::Text { text, index })?,
                Node::Tag(tag) => {
                    visit(Visit::Open { tag, index })?;
                    stack.push((Some(tag), tag.children.iter().enumerate()));
                }
            }
        }
        Ok(())
    }
}

/// One step of [`Document::walk`]. `index` is the node's position among its
/// siblings.
enum Visit<'d> {
    Text { text: &'d TextNode, index: usize },
    Open { tag: &'d TagNode, index: usize },
    Close(&'d TagNode),
}

fn fmt_offsets(set: &BTreeSet<(usize, usize)>, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for (i, (pos, len)) in set.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}:{}", pos, len)?;
    }
    Ok(())
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Document{{children=[")?;
        self.walk(|visit| match visit {
            Visit::Text { text, index } => {
                if index > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "Text({:?})", self.slice(text.span))
            }
            Visit::Open { tag, index } => {
                if index > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "Tag({}", tag.name)?;
                for (name, value) in tag.attributes.iter() {
                    write!(f, " {}={:?}", name, value)?;
                }
                write!(f, ")[")
            }
            Visit::Close(_) => write!(f, "]"),
        })?;
        write!(f, "], offsets=[")?;
        fmt_offsets(&self.tag_offsets, f)?;
        write!(f, "], attributeOffsets=[")?;
        fmt_offsets(&self.attribute_offsets, f)?;
        write!(f, "]}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bold_document() -> Document {
        // a [b] testing [/b]
        let mut doc = Document::new("a [b] testing [/b]");
        doc.add_child(
            None,
            Node::Text(TextNode {
                span: Span::new(0, 2),
            }),
        );
        let b = doc.add_child(
            None,
            Node::Tag(TagNode {
                name: "b".to_string(),
                attributes: Attributes::new(),
                open: Span::new(2, 5),
                close: Some(Span::new(14, 18)),
                body: Span::new(5, 14),
                children: Vec::new(),
            }),
        );
        doc.add_child(
            Some(b),
            Node::Text(TextNode {
                span: Span::new(5, 14),
            }),
        );
        doc.record_tag_offset(Span::new(2, 5));
        doc.record_tag_offset(Span::new(14, 18));
        doc
    }

    #[test]
    fn span_queries() {
        let doc = bold_document();
        let b = doc.children()[1];
        assert_eq!(doc.text_of(b), "[b] testing [/b]");
        assert_eq!(doc.text_of(doc.children_of(b)[0]), " testing ");
        assert_eq!(doc.get_string(2, 5), "[b]");
    }

    #[test]
    fn reconstruct_concatenates_spans() {
        let doc = bold_document();
        assert_eq!(doc.reconstruct(), doc.source());
    }

    #[test]
    fn display_lists_offsets() {
        let doc = bold_document();
        assert_eq!(
            doc.to_string(),
            r#"Document{children=[Text("a "), Tag(b)[Text(" testing ")]], offsets=[2:3, 14:4], attributeOffsets=[]}"#
        );
    }

    #[test]
    fn deep_nesting_reconstructs_and_displays() {
        const DEPTH: usize = 25_000;
        let source = format!("{}x", "[b]".repeat(DEPTH));
        let mut doc = Document::new(&source);
        let mut parent = None;
        for i in 0..DEPTH {
            let open = Span::new(i * 3, i * 3 + 3);
            let tag = TagNode {
                name: "b".to_string(),
                attributes: Attributes::new(),
                open,
                close: None,
                body: Span::new(open.end, source.len()),
                children: Vec::new(),
            };
            parent = Some(doc.add_child(parent, Node::Tag(tag)));
        }
        doc.add_child(
            parent,
            Node::Text(TextNode {
                span: Span::new(DEPTH * 3, source.len()),
            }),
        );

        assert_eq!(doc.reconstruct(), source);
        let display = doc.to_string();
        assert!(display.starts_with("Document{children=[Tag(b)[Tag(b)["));
        assert!(display.contains("[Text(\"x\")]]]"));
    }

    #[test]
    fn equality_covers_offsets() {
        let mut other = bold_document();
        assert_eq!(bold_document(), other);
        other.record_attribute_offset(Span::new(0, 1));
        assert_ne!(bold_document(), other);
    }

    #[test]
    fn implicit_tag_span_ends_at_body() {
        let tag = TagNode {
            name: "*".to_string(),
            attributes: Attributes::new(),
            open: Span::new(0, 3),
            close: None,
            body: Span::new(3, 8),
            children: Vec::new(),
        };
        assert_eq!(tag.span(), Span::new(0, 8));
    }

    #[test]
    fn attributes_keep_source_order() {
        let mut attributes = Attributes::new();
        attributes.insert("size", "10");
        attributes.insert("family", "verdana");
        attributes.insert("size", "12");
        let pairs: Vec<_> = attributes.iter().collect();
        assert_eq!(pairs, vec![("size", "12"), ("family", "verdana")]);
        assert_eq!(attributes.get("family"), Some("verdana"));
        assert_eq!(attributes.get("color"), None);
    }
}
