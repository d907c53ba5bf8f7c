//! Inline content → plaintext + facets.
//!
//! [`RichText`] walks inline nodes left to right, appending rendered text to a
//! running plaintext buffer. Formatting nodes record the byte range their text
//! occupies in that buffer. Rust strings are UTF-8, so `String::len` is
//! already the byte offset downstream consumers index by.

use super::ast::{literal_text, Node};
use crate::blob::{normalize_link, LinkStyle};
use crate::model::{Facet, FacetFeature};

/// Emphasis nested deeper than this is kept as plain text.
const MAX_INLINE_DEPTH: usize = 64;

/// How link targets are rewritten while collecting facets.
#[derive(Debug, Clone, Copy)]
pub struct LinkContext<'a> {
    pub author_did: &'a str,
    pub style: LinkStyle,
}

impl LinkContext<'_> {
    fn normalize(&self, url: &str) -> String {
        normalize_link(url, self.author_did, self.style)
    }
}

pub fn image_label(alt: &str) -> String {
    let alt = if alt.is_empty() { "Image" } else { alt };
    format!("[Image: {}]", alt)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RichText {
    pub plaintext: String,
    pub facets: Vec<Facet>,
}

impl RichText {
    pub fn from_inlines(nodes: &[Node], links: LinkContext<'_>) -> Self {
        let mut rich = RichText::default();
        rich.push_nodes(nodes, links, 0);
        rich
    }

    /// Plain text wrapped in a single link facet.
    pub fn linked(text: String, uri: String) -> Self {
        let mut rich = RichText::default();
        rich.push_span(&text, FacetFeature::Link { uri });
        rich
    }

    pub fn plain(text: String) -> Self {
        RichText {
            plaintext: text,
            facets: Vec::new(),
        }
    }

    pub fn is_blank(&self) -> bool {
        self.plaintext.trim().is_empty()
    }

    /// Append `other` after `separator`, shifting its facets accordingly.
    pub fn append(&mut self, separator: &str, other: RichText) {
        self.plaintext.push_str(separator);
        let shift = self.plaintext.len();
        self.plaintext.push_str(&other.plaintext);
        self.facets.extend(other.facets.into_iter().map(|mut facet| {
            facet.index.byte_start += shift;
            facet.index.byte_end += shift;
            facet
        }));
    }

    /// Consume into plaintext and facets ordered by `byteStart`.
    pub fn finish(mut self) -> (String, Vec<Facet>) {
        self.facets.sort_by_key(|f| f.index.byte_start);
        (self.plaintext, self.facets)
    }

    fn push_nodes(&mut self, nodes: &[Node], links: LinkContext<'_>, depth: usize) {
        for node in nodes {
            self.push_node(node, links, depth);
        }
    }

    fn push_node(&mut self, node: &Node, links: LinkContext<'_>, depth: usize) {
        match node {
            Node::Text(text) | Node::InlineHtml(text) => self.plaintext.push_str(text),
            Node::Break => self.plaintext.push('\n'),
            Node::InlineCode(code) => self.push_span(code, FacetFeature::Code),
            Node::Strong(children) => self.push_wrapped(children, FacetFeature::Bold, links, depth),
            Node::Emphasis(children) => {
                self.push_wrapped(children, FacetFeature::Italic, links, depth)
            }
            Node::Link { url, children } => {
                let text = literal_text(children);
                self.push_span(&text, FacetFeature::Link {
                    uri: links.normalize(url),
                });
            }
            Node::Image { url, alt } => {
                self.push_span(&image_label(alt), FacetFeature::Link {
                    uri: links.normalize(url),
                });
            }
            other => self.plaintext.push_str(&literal_text(std::slice::from_ref(other))),
        }
    }

    fn push_span(&mut self, text: &str, feature: FacetFeature) {
        let start = self.plaintext.len();
        self.plaintext.push_str(text);
        self.mark(start, self.facets.len(), feature);
    }

    fn push_wrapped(
        &mut self,
        children: &[Node],
        feature: FacetFeature,
        links: LinkContext<'_>,
        depth: usize,
    ) {
        if depth >= MAX_INLINE_DEPTH {
            self.plaintext.push_str(&literal_text(children));
            return;
        }
        let start = self.plaintext.len();
        let slot = self.facets.len();
        self.push_nodes(children, links, depth + 1);
        self.mark(start, slot, feature);
    }

    /// Record a facet from `start` to the current end, placed before any
    /// facets nested inside it.
    fn mark(&mut self, start: usize, slot: usize, feature: FacetFeature) {
        let end = self.plaintext.len();
        if end > start {
            self.facets.insert(slot, Facet::new(start, end, feature));
        }
    }
}
