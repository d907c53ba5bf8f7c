//! # Markdown Block Parser
//!
//! Turns a WhiteWind Markdown body into Leaflet blocks.
//!
//! Parsing happens in three passes:
//!
//! 1. [`ast::parse_tree`] folds the pulldown-cmark event stream into an owned
//!    tree (CommonMark only, no extensions).
//! 2. Images that will become image blocks, and whose dimensions the caller
//!    did not supply, are measured through the configured
//!    [`DimensionProbe`](crate::probe::DimensionProbe), concurrently.
//! 3. Top-level nodes are mapped to blocks in document order:
//!
//! | Node | Block |
//! |---|---|
//! | heading | `header` |
//! | paragraph holding only an image | `image` (or linked `[Image: alt]` text when no CID) |
//! | other paragraph | `text`, skipped when blank |
//! | code | `code` |
//! | block quote | `blockquote` of every text it holds, one per line |
//! | thematic break | `horizontalRule` |
//! | list (ordered or not) | `unorderedList` |
//!
//! Raw HTML blocks are dropped. A document that produces no blocks at all
//! yields a single text block holding the raw input, so callers always get at
//! least one block.
//!
//! Nothing in here fails: odd Markdown degrades to plain text and unresolvable
//! images degrade to links.

pub mod ast;
pub mod inline;

use crate::blob::{extract_cid, normalize_link, LinkStyle};
use crate::model::{
    AspectRatio, BlobMeta, BlobRef, Block, CodeBlock, HeaderBlock, ImageBlock, ListItem,
    ListItemContent, TextBlock, UnorderedListBlock,
};
use crate::probe::{resolve_all, DimensionProbe, ImageInfo, ImageRequest};
use ast::{literal_text, Node};
use image::ImageFormat;
use inline::{image_label, LinkContext, RichText};
use log::{debug, warn};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_IMAGE_SIZE: u32 = 512;
pub const DEFAULT_MAX_LIST_DEPTH: usize = 32;
pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(10);

/// List nesting is never followed deeper than this, whatever the options say.
const LIST_DEPTH_CAP: usize = 256;

const FALLBACK_MIME: &str = "image/jpeg";

#[derive(Clone)]
pub struct ParseOptions {
    pub author_did: String,
    pub link_style: LinkStyle,
    pub blobs: Vec<BlobMeta>,
    /// Edge of the square aspect ratio used when dimensions are unknown.
    pub default_image_size: u32,
    /// List items deeper than this are flattened into the deepest level.
    pub max_list_depth: usize,
    pub lookup_timeout: Duration,
    pub probe: Option<Arc<dyn DimensionProbe>>,
}

impl ParseOptions {
    pub fn new(author_did: impl Into<String>) -> Self {
        Self {
            author_did: author_did.into(),
            link_style: LinkStyle::default(),
            blobs: Vec::new(),
            default_image_size: DEFAULT_IMAGE_SIZE,
            max_list_depth: DEFAULT_MAX_LIST_DEPTH,
            lookup_timeout: DEFAULT_LOOKUP_TIMEOUT,
            probe: None,
        }
    }

    pub fn link_style(mut self, style: LinkStyle) -> Self {
        self.link_style = style;
        self
    }

    pub fn blobs(mut self, blobs: Vec<BlobMeta>) -> Self {
        self.blobs = blobs;
        self
    }

    pub fn default_image_size(mut self, size: u32) -> Self {
        self.default_image_size = size;
        self
    }

    pub fn max_list_depth(mut self, depth: usize) -> Self {
        self.max_list_depth = depth;
        self
    }

    pub fn lookup_timeout(mut self, timeout: Duration) -> Self {
        self.lookup_timeout = timeout;
        self
    }

    pub fn probe(mut self, probe: Arc<dyn DimensionProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    fn links(&self) -> LinkContext<'_> {
        LinkContext {
            author_did: &self.author_did,
            style: self.link_style,
        }
    }
}

/// Parse with default options: no blob metadata, no dimension probing.
pub fn parse(markdown: &str, author_did: &str) -> Vec<Block> {
    parse_with(markdown, &ParseOptions::new(author_did))
}

pub fn parse_with(markdown: &str, options: &ParseOptions) -> Vec<Block> {
    let tree = ast::parse_tree(markdown);

    let blobs: HashMap<&str, &BlobMeta> =
        options.blobs.iter().map(|b| (b.cid.as_str(), b)).collect();
    let probed = match &options.probe {
        Some(probe) => {
            let requests = image_requests(&tree, &blobs);
            debug!("probing {} image(s)", requests.len());
            resolve_all(Arc::clone(probe), requests, options.lookup_timeout)
        }
        None => HashMap::new(),
    };

    let builder = BlockBuilder {
        options,
        blobs,
        probed,
    };
    let mut blocks = Vec::with_capacity(tree.len());
    for node in &tree {
        builder.push_block(node, &mut blocks);
    }

    if blocks.is_empty() {
        debug!("no blocks produced, falling back to raw text");
        blocks.push(Block::text(markdown, vec![]));
    }
    blocks
}

/// `Some((url, alt))` when a paragraph consists of exactly one image.
fn lone_image(children: &[Node]) -> Option<(&str, &str)> {
    match children {
        [Node::Image { url, alt }] => Some((url.as_str(), alt.as_str())),
        _ => None,
    }
}

/// Images that will become image blocks and have no known dimensions.
fn image_requests(tree: &[Node], blobs: &HashMap<&str, &BlobMeta>) -> Vec<ImageRequest> {
    let mut requests = Vec::new();
    let mut seen = HashSet::new();
    let mut stack: Vec<std::slice::Iter<'_, Node>> = vec![tree.iter()];

    while let Some(iter) = stack.last_mut() {
        let Some(node) = iter.next() else {
            stack.pop();
            continue;
        };
        match node {
            Node::Paragraph(children) => {
                let Some((url, _)) = lone_image(children) else {
                    continue;
                };
                let Some(cid) = extract_cid(url) else {
                    continue;
                };
                let known = blobs
                    .get(cid.as_str())
                    .and_then(|meta| meta.aspect_ratio())
                    .is_some();
                if !known && seen.insert(cid.clone()) {
                    requests.push(ImageRequest {
                        cid,
                        url: url.to_string(),
                    });
                }
            }
            Node::List { items, .. } => stack.push(items.iter()),
            Node::Item(children) => stack.push(children.iter()),
            _ => {}
        }
    }

    requests
}

fn mime_from_url(url: &str) -> Option<&'static str> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let file = path.rsplit('/').next()?;
    let (_, ext) = file.rsplit_once('.')?;
    ImageFormat::from_extension(ext).map(|f| f.to_mime_type())
}

struct BlockBuilder<'a> {
    options: &'a ParseOptions,
    blobs: HashMap<&'a str, &'a BlobMeta>,
    probed: HashMap<String, ImageInfo>,
}

impl BlockBuilder<'_> {
    fn rich(&self, inlines: &[Node]) -> RichText {
        RichText::from_inlines(inlines, self.options.links())
    }

    fn push_block(&self, node: &Node, out: &mut Vec<Block>) {
        match node {
            Node::Heading { level, children } => {
                let (plaintext, facets) = self.rich(children).finish();
                out.push(Block::Header(HeaderBlock::new(*level, plaintext, facets)));
            }
            Node::Paragraph(children) => {
                if let Some((url, alt)) = lone_image(children) {
                    out.push(match self.image_block(url, alt) {
                        Some(image) => Block::Image(image),
                        None => Block::Text(self.image_fallback(url, alt)),
                    });
                    return;
                }
                let rich = self.rich(children);
                if rich.is_blank() {
                    debug!("skipping blank paragraph");
                    return;
                }
                let (plaintext, facets) = rich.finish();
                out.push(Block::text(plaintext, facets));
            }
            Node::CodeBlock { language, code } => out.push(Block::Code(CodeBlock {
                plaintext: code.clone(),
                language: language.clone(),
            })),
            Node::BlockQuote(children) => {
                let quote = self.quote_text(children);
                if quote.is_blank() {
                    debug!("skipping empty blockquote");
                    return;
                }
                let (plaintext, facets) = quote.finish();
                out.push(Block::Blockquote(TextBlock::new(plaintext, facets)));
            }
            Node::ThematicBreak => out.push(Block::HorizontalRule),
            Node::List { items, .. } => {
                let children = self.list_items(items, 1);
                if !children.is_empty() {
                    out.push(Block::UnorderedList(UnorderedListBlock { children }));
                }
            }
            Node::Html(_) => debug!("skipping raw html block"),
            Node::Other(_) => debug!("skipping unsupported block"),
            _ => {}
        }
    }

    /// Everything inside a quote, in document order, one line per leaf block.
    /// Nested quotes and list items are opened up; paragraphs and headings keep
    /// their facets, anything else contributes its literal text.
    fn quote_text(&self, children: &[Node]) -> RichText {
        let mut text = RichText::default();
        let mut stack: Vec<std::slice::Iter<'_, Node>> = vec![children.iter()];

        while let Some(iter) = stack.last_mut() {
            let Some(node) = iter.next() else {
                stack.pop();
                continue;
            };
            let part = match node {
                Node::Paragraph(inlines) | Node::Heading { children: inlines, .. } => {
                    self.rich(inlines)
                }
                Node::BlockQuote(children) | Node::Item(children) => {
                    stack.push(children.iter());
                    continue;
                }
                Node::List { items, .. } => {
                    stack.push(items.iter());
                    continue;
                }
                other => {
                    let literal = literal_text(std::slice::from_ref(other));
                    RichText::plain(literal.trim_end_matches('\n').to_string())
                }
            };
            if part.is_blank() {
                continue;
            }
            if text.plaintext.is_empty() {
                text = part;
            } else {
                text.append("\n", part);
            }
        }

        text
    }

    fn image_block(&self, url: &str, alt: &str) -> Option<ImageBlock> {
        let cid = extract_cid(url)?;
        let meta = self.blobs.get(cid.as_str()).copied();
        let probed = self.probed.get(&cid);

        let aspect_ratio = meta
            .and_then(BlobMeta::aspect_ratio)
            .or_else(|| probed.map(|info| info.aspect_ratio))
            .unwrap_or_else(|| {
                debug!("dimensions of {} unknown, using default", cid);
                AspectRatio::square(self.options.default_image_size)
            });
        let mime_type = meta
            .and_then(|m| m.mime_type.clone())
            .or_else(|| probed.and_then(|info| info.mime_type.clone()))
            .or_else(|| mime_from_url(url).map(str::to_string))
            .unwrap_or_else(|| FALLBACK_MIME.to_string());
        let size = meta
            .and_then(|m| m.size)
            .or_else(|| probed.and_then(|info| info.size))
            .unwrap_or(0);

        Some(ImageBlock {
            image: BlobRef::new(cid, mime_type, size),
            alt: (!alt.is_empty()).then(|| alt.to_string()),
            aspect_ratio,
        })
    }

    fn image_fallback(&self, url: &str, alt: &str) -> TextBlock {
        warn!("no blob CID in image url {}, keeping it as a link", url);
        let uri = normalize_link(url, &self.options.author_did, self.options.link_style);
        let (plaintext, facets) = RichText::linked(image_label(alt), uri).finish();
        TextBlock::new(plaintext, facets)
    }

    fn list_items(&self, items: &[Node], depth: usize) -> Vec<ListItem> {
        let limit = self.options.max_list_depth.clamp(1, LIST_DEPTH_CAP);
        if depth >= limit {
            return self.flatten_items(items);
        }

        items
            .iter()
            .filter_map(|node| match node {
                Node::Item(children) => Some(children),
                _ => None,
            })
            .map(|children| {
                let (content, nested) = self.item_content(children);
                let children = nested
                    .into_iter()
                    .flat_map(|items| self.list_items(items, depth + 1))
                    .collect();
                ListItem { content, children }
            })
            .collect()
    }

    /// Every item under `items`, in document order, as childless siblings.
    fn flatten_items(&self, items: &[Node]) -> Vec<ListItem> {
        let mut out = Vec::new();
        let mut stack: Vec<std::slice::Iter<'_, Node>> = vec![items.iter()];

        while let Some(iter) = stack.last_mut() {
            let Some(node) = iter.next() else {
                stack.pop();
                continue;
            };
            let Node::Item(children) = node else {
                continue;
            };
            let (content, nested) = self.item_content(children);
            out.push(ListItem {
                content,
                children: Vec::new(),
            });
            stack.extend(nested.into_iter().rev().map(|items| items.iter()));
        }

        out
    }

    /// The item's displayed content plus the item lists nested under it.
    fn item_content<'n>(&self, children: &'n [Node]) -> (ListItemContent, Vec<&'n [Node]>) {
        let mut rest = children;
        let content = match children.first() {
            Some(Node::Paragraph(inlines)) => {
                rest = &children[1..];
                match lone_image(inlines) {
                    Some((url, alt)) => match self.image_block(url, alt) {
                        Some(image) => ListItemContent::Image(image),
                        None => ListItemContent::Text(self.image_fallback(url, alt)),
                    },
                    None => self.item_text(self.rich(inlines), rest),
                }
            }
            Some(Node::Heading { level, children: inlines }) => {
                rest = &children[1..];
                let (plaintext, facets) = self.rich(inlines).finish();
                ListItemContent::Header(HeaderBlock::new(*level, plaintext, facets))
            }
            _ => self.item_text(RichText::default(), rest),
        };

        let nested = rest
            .iter()
            .filter_map(|node| match node {
                Node::List { items, .. } => Some(items.as_slice()),
                _ => None,
            })
            .collect();
        (content, nested)
    }

    /// Text content of an item: the lead paragraph followed by any further
    /// non-list children, one per line.
    fn item_text(&self, mut text: RichText, rest: &[Node]) -> ListItemContent {
        for node in rest {
            let more = match node {
                Node::List { .. } => continue,
                Node::Paragraph(inlines) => self.rich(inlines),
                other => RichText::plain(literal_text(std::slice::from_ref(other))),
            };
            if more.is_blank() {
                continue;
            }
            if text.plaintext.is_empty() {
                text = more;
            } else {
                text.append("\n", more);
            }
        }
        let (plaintext, facets) = text.finish();
        ListItemContent::Text(TextBlock::new(plaintext, facets))
    }
}
