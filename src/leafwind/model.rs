//! # Record Model
//!
//! Output types mirror the Leaflet lexicons (`pub.leaflet.*`) closely enough
//! that `serde_json` produces records a PDS will accept as-is. Each lexicon
//! object carries its `$type`, which serde emits from the container tag.
//!
//! Input types describe WhiteWind entries as exported by `listRecords` or by
//! hand, plus the optional blob metadata list used to size images.

use serde::{Deserialize, Serialize};

/// Byte range into the UTF-8 encoding of a block's plaintext.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ByteSlice {
    pub byte_start: usize,
    pub byte_end: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "$type")]
pub enum FacetFeature {
    #[serde(rename = "pub.leaflet.richtext.facet#bold")]
    Bold,
    #[serde(rename = "pub.leaflet.richtext.facet#italic")]
    Italic,
    #[serde(rename = "pub.leaflet.richtext.facet#code")]
    Code,
    #[serde(rename = "pub.leaflet.richtext.facet#link")]
    Link { uri: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Facet {
    pub index: ByteSlice,
    pub features: Vec<FacetFeature>,
}

impl Facet {
    pub fn new(byte_start: usize, byte_end: usize, feature: FacetFeature) -> Self {
        Self {
            index: ByteSlice {
                byte_start,
                byte_end,
            },
            features: vec![feature],
        }
    }
}

fn facets_or_none(facets: Vec<Facet>) -> Option<Vec<Facet>> {
    if facets.is_empty() {
        None
    } else {
        Some(facets)
    }
}

/// Plaintext with optional facets. Used for text and blockquote blocks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextBlock {
    pub plaintext: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub facets: Option<Vec<Facet>>,
}

impl TextBlock {
    pub fn new(plaintext: impl Into<String>, facets: Vec<Facet>) -> Self {
        Self {
            plaintext: plaintext.into(),
            facets: facets_or_none(facets),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeaderBlock {
    pub level: u8,
    pub plaintext: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub facets: Option<Vec<Facet>>,
}

impl HeaderBlock {
    pub fn new(level: u8, plaintext: impl Into<String>, facets: Vec<Facet>) -> Self {
        Self {
            level,
            plaintext: plaintext.into(),
            facets: facets_or_none(facets),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CodeBlock {
    pub plaintext: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AspectRatio {
    pub width: u32,
    pub height: u32,
}

impl AspectRatio {
    pub fn square(size: u32) -> Self {
        Self {
            width: size,
            height: size,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CidLink {
    #[serde(rename = "$link")]
    pub link: String,
}

/// A reference to an uploaded blob, in the lexicon `blob` shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "$type", rename = "blob", rename_all = "camelCase")]
pub struct BlobRef {
    #[serde(rename = "ref")]
    pub reference: CidLink,
    pub mime_type: String,
    pub size: u64,
}

impl BlobRef {
    pub fn new(cid: impl Into<String>, mime_type: impl Into<String>, size: u64) -> Self {
        Self {
            reference: CidLink { link: cid.into() },
            mime_type: mime_type.into(),
            size,
        }
    }

    pub fn cid(&self) -> &str {
        &self.reference.link
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageBlock {
    pub image: BlobRef,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
    pub aspect_ratio: AspectRatio,
}

/// What a list item displays before its nested children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "$type")]
pub enum ListItemContent {
    #[serde(rename = "pub.leaflet.blocks.text")]
    Text(TextBlock),
    #[serde(rename = "pub.leaflet.blocks.header")]
    Header(HeaderBlock),
    #[serde(rename = "pub.leaflet.blocks.image")]
    Image(ImageBlock),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "$type", rename = "pub.leaflet.blocks.unorderedList#listItem")]
pub struct ListItem {
    pub content: ListItemContent,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ListItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnorderedListBlock {
    pub children: Vec<ListItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "$type")]
pub enum Block {
    #[serde(rename = "pub.leaflet.blocks.header")]
    Header(HeaderBlock),
    #[serde(rename = "pub.leaflet.blocks.text")]
    Text(TextBlock),
    #[serde(rename = "pub.leaflet.blocks.blockquote")]
    Blockquote(TextBlock),
    #[serde(rename = "pub.leaflet.blocks.code")]
    Code(CodeBlock),
    #[serde(rename = "pub.leaflet.blocks.horizontalRule")]
    HorizontalRule,
    #[serde(rename = "pub.leaflet.blocks.image")]
    Image(ImageBlock),
    #[serde(rename = "pub.leaflet.blocks.unorderedList")]
    UnorderedList(UnorderedListBlock),
}

impl Block {
    pub fn text(plaintext: impl Into<String>, facets: Vec<Facet>) -> Self {
        Block::Text(TextBlock::new(plaintext, facets))
    }

    /// The block's plaintext, for the variants that have one.
    pub fn plaintext(&self) -> Option<&str> {
        match self {
            Block::Header(h) => Some(&h.plaintext),
            Block::Text(t) | Block::Blockquote(t) => Some(&t.plaintext),
            Block::Code(c) => Some(&c.plaintext),
            Block::HorizontalRule | Block::Image(_) | Block::UnorderedList(_) => None,
        }
    }

    pub fn facets(&self) -> &[Facet] {
        let facets = match self {
            Block::Header(h) => h.facets.as_deref(),
            Block::Text(t) | Block::Blockquote(t) => t.facets.as_deref(),
            _ => None,
        };
        facets.unwrap_or(&[])
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "$type", rename = "pub.leaflet.pages.linearDocument#block")]
pub struct BlockEntry {
    pub block: Block,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "$type", rename = "pub.leaflet.pages.linearDocument")]
pub struct LinearDocument {
    pub blocks: Vec<BlockEntry>,
}

impl LinearDocument {
    pub fn new(blocks: Vec<Block>) -> Self {
        Self {
            blocks: blocks.into_iter().map(|block| BlockEntry { block }).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "$type", rename = "pub.leaflet.document", rename_all = "camelCase")]
pub struct DocumentRecord {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub author: String,
    pub publication: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_at: Option<String>,
    pub pages: Vec<LinearDocument>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "$type", rename = "pub.leaflet.theme.color#rgb")]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Theme {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary: Option<Rgb>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_color: Option<Rgb>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_background: Option<Rgb>,
    pub show_page_background: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    pub show_in_discover: bool,
    pub show_comments: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "$type", rename = "pub.leaflet.publication")]
pub struct PublicationRecord {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub preferences: Preferences,
    pub theme: Theme,
}

/// Caller-supplied facts about an uploaded blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlobMeta {
    pub cid: String,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}

impl BlobMeta {
    pub fn aspect_ratio(&self) -> Option<AspectRatio> {
        match (self.width, self.height) {
            (Some(width), Some(height)) if width > 0 && height > 0 => {
                Some(AspectRatio { width, height })
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryValue {
    pub content: Option<String>,
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub created_at: Option<String>,
    pub visibility: Option<String>,
}

/// A WhiteWind blog entry, either a raw `listRecords` record (fields under
/// `value`) or a flattened object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WhiteWindEntry {
    pub uri: Option<String>,
    pub cid: Option<String>,
    pub value: Option<EntryValue>,
    pub content: Option<String>,
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub created_at: Option<String>,
    pub body: Option<String>,
    pub name: Option<String>,
}

fn first_non_empty<'a>(candidates: &[Option<&'a String>]) -> Option<&'a str> {
    candidates
        .iter()
        .flatten()
        .copied()
        .map(String::as_str)
        .find(|s| !s.is_empty())
}

impl WhiteWindEntry {
    pub fn content(&self) -> Option<&str> {
        let value = self.value.as_ref();
        first_non_empty(&[
            value.and_then(|v| v.content.as_ref()),
            self.content.as_ref(),
            self.body.as_ref(),
        ])
    }

    pub fn title(&self) -> Option<&str> {
        let value = self.value.as_ref();
        first_non_empty(&[
            value.and_then(|v| v.title.as_ref()),
            self.title.as_ref(),
            self.name.as_ref(),
        ])
    }

    pub fn subtitle(&self) -> Option<&str> {
        let value = self.value.as_ref();
        first_non_empty(&[value.and_then(|v| v.subtitle.as_ref()), self.subtitle.as_ref()])
    }

    pub fn created_at(&self) -> Option<&str> {
        let value = self.value.as_ref();
        first_non_empty(&[
            value.and_then(|v| v.created_at.as_ref()),
            self.created_at.as_ref(),
        ])
    }
}
