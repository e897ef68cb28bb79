//! Markup parser: source text to [`Document`].
//!
//! The parser walks the input looking for `[` and tries to read a marker at
//! each one. Anything that does not form a valid marker stays in the pending
//! text run, so literal brackets (`array[0]`) need no escaping.
//!
//! Open tags live on a stack of frames annotated with their [`TagPolicy`].
//! A frame is popped by its matching closing marker, by a closing marker of
//! an enclosing tag, by a same-name sibling when the policy is
//! `implicit_close`, or at end of input.
//!
//! # Tag Name Syntax
//!
//! - `*` on its own (list items)
//! - otherwise a letter or underscore, followed by letters, digits,
//!   underscores or hyphens
//!
//! Names are case-sensitive.
//!
//! # Attribute Syntax
//!
//! ```text
//! [font size="10" family='verdana' weight=bold]   named attributes
//! [url=http://example.com]                        value stored under "url"
//! ```

use std::ops::Range;

use crate::document::{Attributes, Document, Node, NodeId, Span, TagNode, TextNode};
use crate::error::ParseError;
use crate::registry::{TagPolicy, TagRegistry};

/// Builds [`Document`]s from markup.
///
/// ```rust
/// use bbtransform::{Parser, TagPolicy, TagRegistry};
///
/// let registry = TagRegistry::new().tag("*", TagPolicy::implicit());
/// let doc = Parser::new(&registry).parse("[list][*]one[*]two[/list]").unwrap();
///
/// assert_eq!(doc.reconstruct(), "[list][*]one[*]two[/list]");
/// assert_eq!(doc.children_of(doc.children()[0]).len(), 2);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Parser<'r> {
    registry: &'r TagRegistry,
    strict: bool,
}

impl<'r> Parser<'r> {
    /// Creates a lenient parser over `registry`.
    pub fn new(registry: &'r TagRegistry) -> Self {
        Self {
            registry,
            strict: false,
        }
    }

    /// In strict mode unknown tags and unmatched closing markers are errors
    /// instead of literal text.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn parse(&self, input: &str) -> Result<Document, ParseError> {
        let mut builder = Builder::new(input);
        let mut pos = 0;

        while let Some(offset) = input[pos..].find('[') {
            let at = pos + offset;
            let Some(marker) = scan_marker(input, at) else {
                pos = at + 1;
                continue;
            };

            match marker.kind {
                MarkerKind::Open { name, attributes } => {
                    let policy = match self.registry.resolve(name) {
                        Some(policy) => *policy,
                        None if self.strict => {
                            return Err(ParseError::UnknownTag {
                                name: name.to_string(),
                                position: at,
                            });
                        }
                        None => {
                            tracing::trace!(name, position = at, "unknown tag kept as text");
                            pos = marker.span.end;
                            continue;
                        }
                    };

                    if !attributes.is_empty() && !policy.attributes {
                        tracing::trace!(name, position = at, "attributes not enabled, kept as text");
                        pos = marker.span.end;
                        continue;
                    }

                    builder.flush_text(at);
                    if builder
                        .stack
                        .last()
                        .is_some_and(|top| top.policy.implicit_close && top.name == name)
                    {
                        tracing::trace!(name, position = at, "implicitly closed by sibling");
                        builder.close_top(at, None);
                    }
                    builder.open_tag(name, &attributes, marker.span, policy);
                    pos = marker.span.end;
                    builder.text_start = pos;

                    if policy.raw_body {
                        pos = builder.capture_raw_body(name, pos);
                    }
                }
                MarkerKind::Close { name } => {
                    // Implicit-close tags never own a closing marker.
                    let Some(index) = builder
                        .stack
                        .iter()
                        .rposition(|frame| frame.name == name && !frame.policy.implicit_close)
                    else {
                        if self.strict {
                            return Err(ParseError::UnmatchedClose {
                                name: name.to_string(),
                                position: at,
                            });
                        }
                        tracing::trace!(name, position = at, "unmatched closing tag kept as text");
                        pos = marker.span.end;
                        continue;
                    };

                    let inner = &builder.stack[index + 1..];
                    if let Some(open) = inner.iter().rev().find(|f| !f.policy.implicit_close) {
                        if self.strict {
                            return Err(ParseError::MismatchedClose {
                                name: name.to_string(),
                                open: open.name.to_string(),
                                position: at,
                            });
                        }
                        tracing::trace!(name, open = open.name, position = at, "closing enclosing tag");
                    }

                    builder.flush_text(at);
                    while builder.stack.len() > index + 1 {
                        builder.close_top(at, None);
                    }
                    builder.close_top(at, Some(marker.span));
                    pos = marker.span.end;
                    builder.text_start = pos;
                }
            }
        }

        let doc = builder.finish();
        tracing::debug!(
            len = input.len(),
            markers = doc.tag_offsets().len(),
            strict = self.strict,
            "parsed document"
        );
        Ok(doc)
    }
}

/// Parses `source` with `registry`. See [`Parser`].
pub fn parse(source: &str, registry: &TagRegistry, strict: bool) -> Result<Document, ParseError> {
    Parser::new(registry).strict(strict).parse(source)
}

struct Frame<'a> {
    id: NodeId,
    name: &'a str,
    policy: TagPolicy,
}

struct Builder<'a> {
    input: &'a str,
    doc: Document,
    stack: Vec<Frame<'a>>,
    /// Start of the pending text run.
    text_start: usize,
}

impl<'a> Builder<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            doc: Document::new(input),
            stack: Vec::new(),
            text_start: 0,
        }
    }

    fn parent(&self) -> Option<NodeId> {
        self.stack.last().map(|frame| frame.id)
    }

    /// Emits the pending text run up to `end` as a child of the open tag.
    fn flush_text(&mut self, end: usize) {
        if end > self.text_start {
            let node = Node::Text(TextNode {
                span: Span::new(self.text_start, end),
            });
            let parent = self.parent();
            self.doc.add_child(parent, node);
        }
        self.text_start = end;
    }

    fn open_tag(&mut self, name: &'a str, attributes: &[RawAttribute<'a>], open: Span, policy: TagPolicy) {
        let mut values = Attributes::new();
        for attribute in attributes {
            values.insert(attribute.name, &self.input[Range::from(attribute.value)]);
            self.doc.record_attribute_offset(attribute.value);
        }
        self.doc.record_tag_offset(open);

        let node = Node::Tag(TagNode {
            name: name.to_string(),
            attributes: values,
            open,
            close: None,
            body: Span::new(open.end, open.end),
            children: Vec::new(),
        });
        let parent = self.parent();
        let id = self.doc.add_child(parent, node);
        self.stack.push(Frame { id, name, policy });
    }

    /// Pops the innermost open tag. Its body ends at `body_end`.
    fn close_top(&mut self, body_end: usize, close: Option<Span>) {
        let Some(frame) = self.stack.pop() else {
            return;
        };
        if let Some(close) = close {
            self.doc.record_tag_offset(close);
        }
        if let Some(tag) = self.doc.tag_mut(frame.id) {
            tag.body.end = body_end;
            tag.close = close;
        }
    }

    /// Captures everything up to `[/name]` as one text child and closes the
    /// tag. Returns the position after the closing marker.
    fn capture_raw_body(&mut self, name: &str, from: usize) -> usize {
        let closing = format!("[/{}]", name);
        match self.input[from..].find(&closing) {
            Some(offset) => {
                let at = from + offset;
                let close = Span::new(at, at + closing.len());
                self.flush_text(at);
                self.close_top(at, Some(close));
                self.text_start = close.end;
                close.end
            }
            None => {
                let end = self.input.len();
                self.flush_text(end);
                self.close_top(end, None);
                end
            }
        }
    }

    fn finish(mut self) -> Document {
        let end = self.input.len();
        self.flush_text(end);
        while !self.stack.is_empty() {
            self.close_top(end, None);
        }
        self.doc
    }
}

/// A syntactically valid marker found at some `[`.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Marker<'a> {
    kind: MarkerKind<'a>,
    span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum MarkerKind<'a> {
    /// `[name]`, `[name=value]` or `[name key=value ...]`
    Open {
        name: &'a str,
        attributes: Vec<RawAttribute<'a>>,
    },
    /// `[/name]`
    Close { name: &'a str },
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct RawAttribute<'a> {
    name: &'a str,
    /// Value span, quotes excluded.
    value: Span,
}

/// Reads a marker starting at the `[` at `start`.
///
/// Returns `None` when the text there is not a well-formed marker.
fn scan_marker(input: &str, start: usize) -> Option<Marker<'_>> {
    let bytes = input.as_bytes();
    let mut i = start + 1;

    if bytes.get(i) == Some(&b'/') {
        let name_end = scan_tag_name(bytes, i + 1)?;
        if bytes.get(name_end) != Some(&b']') {
            return None;
        }
        return Some(Marker {
            kind: MarkerKind::Close {
                name: &input[i + 1..name_end],
            },
            span: Span::new(start, name_end + 1),
        });
    }

    let name_end = scan_tag_name(bytes, i)?;
    let name = &input[i..name_end];
    let mut attributes = Vec::new();
    i = name_end;

    match *bytes.get(i)? {
        b']' => {}
        b'=' => {
            let (value, next) = scan_value(bytes, i + 1, true)?;
            attributes.push(RawAttribute { name, value });
            i = next;
            if bytes.get(i) != Some(&b']') {
                return None;
            }
        }
        b' ' | b'\t' => loop {
            while matches!(bytes.get(i).copied(), Some(b' ' | b'\t')) {
                i += 1;
            }
            if *bytes.get(i)? == b']' {
                break;
            }
            let attr_start = i;
            while bytes.get(i).is_some_and(|b| is_attribute_name_byte(*b)) {
                i += 1;
            }
            if i == attr_start || bytes.get(i) != Some(&b'=') {
                return None;
            }
            let (value, next) = scan_value(bytes, i + 1, false)?;
            attributes.push(RawAttribute {
                name: &input[attr_start..i],
                value,
            });
            i = next;
            if !matches!(bytes.get(i).copied(), Some(b' ' | b'\t' | b']')) {
                return None;
            }
        },
        _ => return None,
    }

    Some(Marker {
        kind: MarkerKind::Open { name, attributes },
        span: Span::new(start, i + 1),
    })
}

/// Returns the end of a valid tag name starting at `start`.
fn scan_tag_name(bytes: &[u8], start: usize) -> Option<usize> {
    match *bytes.get(start)? {
        b'*' => Some(start + 1),
        b if b.is_ascii_alphabetic() || b == b'_' => {
            let mut end = start + 1;
            while bytes
                .get(end)
                .is_some_and(|b| b.is_ascii_alphanumeric() || *b == b'_' || *b == b'-')
            {
                end += 1;
            }
            Some(end)
        }
        _ => None,
    }
}

fn is_attribute_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'-'
}

/// Reads a quoted or bare value at `start`, returning its span and the
/// position after it. Bare simple values (`[quote=John Smith]`) may contain
/// spaces; bare named values end at whitespace.
fn scan_value(bytes: &[u8], start: usize, allow_spaces: bool) -> Option<(Span, usize)> {
    match *bytes.get(start)? {
        quote @ (b'"' | b'\'') => {
            let len = bytes[start + 1..].iter().position(|b| *b == quote)?;
            let end = start + 1 + len;
            Some((Span::new(start + 1, end), end + 1))
        }
        _ => {
            let mut end = start;
            while let Some(b) = bytes.get(end) {
                match *b {
                    b']' | b'[' | b'\n' | b'\r' => break,
                    b' ' | b'\t' if !allow_spaces => break,
                    _ => end += 1,
                }
            }
            if end == start {
                return None;
            }
            Some((Span::new(start, end), end))
        }
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn fragment() -> impl Strategy<Value = String> {
        prop_oneof![
            "[a-z ]{0,6}",
            Just("[b]".to_string()),
            Just("[/b]".to_string()),
            Just("[i]".to_string()),
            Just("[/i]".to_string()),
            Just("[*]".to_string()),
            Just("[code]".to_string()),
            Just("[/code]".to_string()),
            Just("[url=x]".to_string()),
            Just("[".to_string()),
            Just("]".to_string()),
        ]
    }

    fn markup() -> impl Strategy<Value = String> {
        prop::collection::vec(fragment(), 0..20).prop_map(|parts| parts.concat())
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(500))]

        #[test]
        fn lenient_parse_round_trips(input in markup()) {
            let registry = TagRegistry::new()
                .tag("*", TagPolicy::implicit())
                .tag("code", TagPolicy::raw());
            let doc = parse(&input, &registry, false).unwrap();
            prop_assert_eq!(doc.reconstruct(), input);
        }

        #[test]
        fn strict_parse_round_trips_when_it_succeeds(input in markup()) {
            let registry = TagRegistry::new().tag("*", TagPolicy::implicit());
            if let Ok(doc) = parse(&input, &registry, true) {
                prop_assert_eq!(doc.reconstruct(), input);
            }
        }

        #[test]
        fn plain_text_is_single_node(content in "[a-zA-Z0-9 .,!?:;'\"]{1,50}") {
            let doc = parse(&content, &TagRegistry::new(), true).unwrap();
            prop_assert_eq!(doc.children().len(), 1);
            prop_assert_eq!(doc.text_of(doc.children()[0]), content.as_str());
        }
    }
}
