//! Owned syntax tree built from the pulldown-cmark event stream.
//!
//! pulldown-cmark hands us a flat stream of start/end events. The block
//! mapping is much easier to express over a tree (for instance "a paragraph
//! whose only child is an image"), so we fold the stream into [`Node`]s first.
//! The fold is iterative, so input nesting depth never touches the call stack.
//!
//! Two normalisations happen here:
//! - tight list items get their inline runs wrapped in a [`Node::Paragraph`],
//!   so loose and tight lists look the same downstream;
//! - code block text loses its final newline.

use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Heading { level: u8, children: Vec<Node> },
    Paragraph(Vec<Node>),
    BlockQuote(Vec<Node>),
    CodeBlock { language: Option<String>, code: String },
    ThematicBreak,
    List { ordered: bool, items: Vec<Node> },
    Item(Vec<Node>),
    Html(String),

    Text(String),
    InlineCode(String),
    InlineHtml(String),
    Strong(Vec<Node>),
    Emphasis(Vec<Node>),
    Link { url: String, children: Vec<Node> },
    Image { url: String, alt: String },
    Break,

    /// Container we do not map (tables, footnotes, ...). Children are kept.
    Other(Vec<Node>),
}

impl Node {
    pub fn is_inline(&self) -> bool {
        matches!(
            self,
            Node::Text(_)
                | Node::InlineCode(_)
                | Node::InlineHtml(_)
                | Node::Strong(_)
                | Node::Emphasis(_)
                | Node::Link { .. }
                | Node::Image { .. }
                | Node::Break
        )
    }
}

enum Frame {
    Root,
    Heading(u8),
    Paragraph,
    BlockQuote,
    CodeBlock(Option<String>),
    List(bool),
    Item,
    Strong,
    Emphasis,
    Link(String),
    Image(String),
    Other,
}

fn heading_level(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

fn fence_language(info: &str) -> Option<String> {
    info.split_whitespace().next().map(str::to_string)
}

fn frame_for(tag: Tag<'_>) -> Frame {
    match tag {
        Tag::Heading { level, .. } => Frame::Heading(heading_level(level)),
        Tag::Paragraph => Frame::Paragraph,
        Tag::BlockQuote(_) => Frame::BlockQuote,
        Tag::CodeBlock(CodeBlockKind::Fenced(info)) => Frame::CodeBlock(fence_language(&info)),
        Tag::CodeBlock(CodeBlockKind::Indented) => Frame::CodeBlock(None),
        Tag::List(start) => Frame::List(start.is_some()),
        Tag::Item => Frame::Item,
        Tag::Strong => Frame::Strong,
        Tag::Emphasis => Frame::Emphasis,
        Tag::Link { dest_url, .. } => Frame::Link(dest_url.into_string()),
        Tag::Image { dest_url, .. } => Frame::Image(dest_url.into_string()),
        _ => Frame::Other,
    }
}

/// Concatenate the literal text under `nodes`, ignoring all markup.
pub fn literal_text(nodes: &[Node]) -> String {
    let mut out = String::new();
    let mut stack: Vec<std::slice::Iter<'_, Node>> = vec![nodes.iter()];

    while let Some(iter) = stack.last_mut() {
        let Some(node) = iter.next() else {
            stack.pop();
            continue;
        };
        match node {
            Node::Text(s) | Node::InlineCode(s) | Node::InlineHtml(s) => out.push_str(s),
            Node::Image { alt, .. } => out.push_str(alt),
            Node::Break => out.push('\n'),
            Node::CodeBlock { code, .. } => out.push_str(code),
            Node::Heading { children, .. }
            | Node::Paragraph(children)
            | Node::BlockQuote(children)
            | Node::Item(children)
            | Node::Strong(children)
            | Node::Emphasis(children)
            | Node::Link { children, .. }
            | Node::Other(children) => stack.push(children.iter()),
            Node::List { items, .. } => stack.push(items.iter()),
            Node::ThematicBreak | Node::Html(_) => {}
        }
    }

    out
}

fn wrap_inline_runs(children: Vec<Node>) -> Vec<Node> {
    let mut out = Vec::with_capacity(children.len());
    let mut run = Vec::new();

    for child in children {
        if child.is_inline() {
            run.push(child);
        } else {
            if !run.is_empty() {
                out.push(Node::Paragraph(std::mem::take(&mut run)));
            }
            out.push(child);
        }
    }
    if !run.is_empty() {
        out.push(Node::Paragraph(run));
    }
    out
}

fn close(frame: Frame, children: Vec<Node>) -> Node {
    match frame {
        Frame::Heading(level) => Node::Heading { level, children },
        Frame::Paragraph => Node::Paragraph(children),
        Frame::BlockQuote => Node::BlockQuote(children),
        Frame::CodeBlock(language) => {
            let mut code = literal_text(&children);
            if code.ends_with('\n') {
                code.pop();
            }
            Node::CodeBlock { language, code }
        }
        Frame::List(ordered) => Node::List {
            ordered,
            items: children,
        },
        Frame::Item => Node::Item(wrap_inline_runs(children)),
        Frame::Strong => Node::Strong(children),
        Frame::Emphasis => Node::Emphasis(children),
        Frame::Link(url) => Node::Link { url, children },
        Frame::Image(url) => Node::Image {
            url,
            alt: literal_text(&children),
        },
        Frame::Root | Frame::Other => Node::Other(children),
    }
}

/// Parse CommonMark text into top-level nodes in document order.
pub fn parse_tree(markdown: &str) -> Vec<Node> {
    let parser = Parser::new_ext(markdown, Options::empty());
    let mut stack: Vec<(Frame, Vec<Node>)> = vec![(Frame::Root, Vec::new())];

    for event in parser {
        let leaf = match event {
            Event::Start(tag) => {
                stack.push((frame_for(tag), Vec::new()));
                continue;
            }
            Event::End(_) => {
                if stack.len() < 2 {
                    continue;
                }
                let Some((frame, children)) = stack.pop() else {
                    continue;
                };
                close(frame, children)
            }
            Event::Text(text) => Node::Text(text.into_string()),
            Event::Code(code) => Node::InlineCode(code.into_string()),
            Event::Html(html) => Node::Html(html.into_string()),
            Event::InlineHtml(html) => Node::InlineHtml(html.into_string()),
            Event::SoftBreak => Node::Text("\n".to_string()),
            Event::HardBreak => Node::Break,
            Event::Rule => Node::ThematicBreak,
            _ => continue,
        };

        if let Some((_, children)) = stack.last_mut() {
            children.push(leaf);
        }
    }

    // Unbalanced streams should not happen, but never lose content if they do.
    while stack.len() > 1 {
        if let Some((frame, children)) = stack.pop() {
            let node = close(frame, children);
            if let Some((_, parent)) = stack.last_mut() {
                parent.push(node);
            }
        }
    }

    stack.pop().map(|(_, nodes)| nodes).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Node {
        Node::Text(s.to_string())
    }

    #[test]
    fn empty_input_has_no_nodes() {
        assert!(parse_tree("").is_empty());
    }

    #[test]
    fn heading_and_paragraph() {
        let tree = parse_tree("# Title\n\nBody text.");
        assert_eq!(
            tree,
            vec![
                Node::Heading {
                    level: 1,
                    children: vec![text("Title")]
                },
                Node::Paragraph(vec![text("Body text.")]),
            ]
        );
    }

    #[test]
    fn fenced_code_keeps_language_and_drops_trailing_newline() {
        let tree = parse_tree("```rust title=x\nfn main() {}\n```\n");
        assert_eq!(
            tree,
            vec![Node::CodeBlock {
                language: Some("rust".to_string()),
                code: "fn main() {}".to_string()
            }]
        );
    }

    #[test]
    fn indented_code_has_no_language() {
        let tree = parse_tree("    let x = 1;\n");
        assert!(matches!(
            &tree[0],
            Node::CodeBlock { language: None, code } if code == "let x = 1;"
        ));
    }

    #[test]
    fn tight_list_items_get_paragraphs() {
        let tree = parse_tree("- one\n- two\n");
        let Node::List { ordered, items } = &tree[0] else {
            panic!("expected list, got {:?}", tree);
        };
        assert!(!ordered);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0], Node::Item(vec![Node::Paragraph(vec![text("one")])]));
    }

    #[test]
    fn image_alt_is_flattened() {
        let tree = parse_tree("![a *b*](https://x/y.png)");
        assert_eq!(
            tree,
            vec![Node::Paragraph(vec![Node::Image {
                url: "https://x/y.png".to_string(),
                alt: "a b".to_string()
            }])]
        );
    }

    #[test]
    fn soft_break_becomes_newline_text() {
        let tree = parse_tree("a\nb");
        assert_eq!(
            tree,
            vec![Node::Paragraph(vec![text("a"), text("\n"), text("b")])]
        );
    }

    #[test]
    fn literal_text_ignores_markup() {
        let tree = parse_tree("**bold** and [link *em*](u) `code`");
        assert_eq!(literal_text(&tree), "bold and link em code");
    }

    #[test]
    fn deep_blockquote_nesting_does_not_overflow() {
        let input = ">".repeat(1_000) + " deep";
        let tree = parse_tree(&input);
        assert_eq!(literal_text(&tree), "deep");
    }
}
