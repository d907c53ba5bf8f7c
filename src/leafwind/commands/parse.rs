use crate::commands::{CmdMessage, CmdResult};
use crate::error::Result;
use crate::markdown::{self, ParseOptions};

/// Parse a single Markdown document into blocks.
pub fn run(markdown: &str, options: &ParseOptions) -> Result<CmdResult> {
    let blocks = markdown::parse_with(markdown, options);
    let mut result = CmdResult::default();
    result.add_message(CmdMessage::info(format!("{} block(s)", blocks.len())));
    Ok(result.with_blocks(blocks))
}
