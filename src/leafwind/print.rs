use colored::*;
use leafwind::commands::{CmdMessage, MessageLevel};
use leafwind::model::{Block, ListItem, ListItemContent};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

const PREVIEW_WIDTH: usize = 60;

fn colorize(message: &CmdMessage) -> ColoredString {
    match message.level {
        MessageLevel::Info => message.content.dimmed(),
        MessageLevel::Success => message.content.green(),
        MessageLevel::Warning => message.content.yellow(),
        MessageLevel::Error => message.content.red(),
    }
}

pub fn print_messages(messages: &[CmdMessage]) {
    for message in messages {
        println!("{}", colorize(message));
    }
}

/// Same as [`print_messages`] but on stderr, for when stdout carries data.
pub fn eprint_messages(messages: &[CmdMessage]) {
    for message in messages {
        eprintln!("{}", colorize(message));
    }
}

fn truncate_to_width(s: &str, max_width: usize) -> String {
    if s.width() <= max_width {
        return s.to_string();
    }

    let mut result = String::new();
    let mut current_width = 0;
    let limit = max_width.saturating_sub(1);

    for c in s.chars() {
        let char_width = c.width().unwrap_or(0);
        if current_width + char_width > limit {
            break;
        }
        result.push(c);
        current_width += char_width;
    }
    result.push('…');
    result
}

fn preview(text: &str) -> String {
    truncate_to_width(&text.replace('\n', " ⏎ "), PREVIEW_WIDTH)
}

fn block_kind(block: &Block) -> &'static str {
    match block {
        Block::Header(_) => "header",
        Block::Text(_) => "text",
        Block::Blockquote(_) => "blockquote",
        Block::Code(_) => "code",
        Block::HorizontalRule => "rule",
        Block::Image(_) => "image",
        Block::UnorderedList(_) => "list",
    }
}

fn facet_note(count: usize) -> String {
    match count {
        0 => String::new(),
        1 => "1 facet".to_string(),
        n => format!("{} facets", n),
    }
}

fn print_items(items: &[ListItem], depth: usize) {
    for item in items {
        let text = match &item.content {
            ListItemContent::Text(t) => preview(&t.plaintext),
            ListItemContent::Header(h) => format!("{} {}", "#".repeat(h.level as usize), preview(&h.plaintext)),
            ListItemContent::Image(img) => format!("[image {}]", img.image.cid()),
        };
        println!("{}{} {}", "  ".repeat(depth + 3), "•".dimmed(), text);
        print_items(&item.children, depth + 1);
    }
}

/// One line per block; list items are shown indented underneath.
pub fn print_blocks(blocks: &[Block]) {
    for (i, block) in blocks.iter().enumerate() {
        let kind = format!("{:<10}", block_kind(block));
        let detail = match block {
            Block::Header(h) => format!("h{} {}", h.level, preview(&h.plaintext)),
            Block::Code(c) => match &c.language {
                Some(lang) => format!("({}) {}", lang, preview(&c.plaintext)),
                None => preview(&c.plaintext),
            },
            Block::Image(img) => format!(
                "{} {}x{} {}",
                img.image.cid(),
                img.aspect_ratio.width,
                img.aspect_ratio.height,
                img.image.mime_type
            ),
            Block::UnorderedList(list) => format!("{} item(s)", list.children.len()),
            other => preview(other.plaintext().unwrap_or_default()),
        };
        println!(
            "{:>3}  {} {}  {}",
            (i + 1).to_string().yellow(),
            kind.cyan(),
            detail,
            facet_note(block.facets().len()).dimmed()
        );
        if let Block::UnorderedList(list) = block {
            print_items(&list.children, 0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_keeps_short_strings() {
        assert_eq!(truncate_to_width("hello", 5), "hello");
        assert_eq!(truncate_to_width("", 5), "");
    }

    #[test]
    fn test_truncate_wide_chars() {
        // Each CJK char is two columns wide.
        let out = truncate_to_width("日本語テキスト", 7);
        assert_eq!(out, "日本語…");
        assert!(out.width() <= 7);
    }

    #[test]
    fn test_preview_flattens_newlines() {
        assert_eq!(preview("a\nb"), "a ⏎ b");
    }
}
