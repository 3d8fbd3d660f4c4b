//! Markdown parsing into the block tree used by the extractor.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag, TagEnd};
use tracing::{debug, instrument};

use crate::core::document::Node;

/// Read and parse a Markdown file.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn read_document(path: &Path) -> Result<Node> {
    let source =
        fs::read_to_string(path).with_context(|| format!("read document {}", path.display()))?;
    let root = parse_markdown(&source);
    debug!(bytes = source.len(), "parsed document");
    Ok(root)
}

/// Parse Markdown (CommonMark plus GFM tables, strikethrough, task lists and footnotes).
///
/// Code blocks become [`Node::Code`]; every other block becomes a
/// [`Node::Container`] holding whatever blocks it nests.
pub fn parse_markdown(source: &str) -> Node {
    let options = Options::ENABLE_TABLES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
        | Options::ENABLE_FOOTNOTES;

    let mut builder = TreeBuilder::new();
    for event in Parser::new_ext(source, options) {
        builder.push(event);
    }
    builder.finish()
}

struct TreeBuilder {
    /// Children of each open container, innermost last. The bottom entry is the root.
    stack: Vec<Vec<Node>>,
    /// Language and text of the code block being read, if any.
    code: Option<(String, String)>,
}

impl TreeBuilder {
    fn new() -> Self {
        Self {
            stack: vec![Vec::new()],
            code: None,
        }
    }

    fn push(&mut self, event: Event<'_>) {
        match event {
            Event::Start(Tag::CodeBlock(kind)) => {
                let lang = match kind {
                    CodeBlockKind::Fenced(info) => info_lang(&info).to_string(),
                    CodeBlockKind::Indented => String::new(),
                };
                self.code = Some((lang, String::new()));
            }
            Event::End(TagEnd::CodeBlock) => {
                if let Some((lang, text)) = self.code.take() {
                    self.current().push(Node::Code { lang, text });
                }
            }
            Event::Text(text) => {
                if let Some((_, body)) = self.code.as_mut() {
                    body.push_str(&text);
                }
            }
            Event::Start(_) => self.stack.push(Vec::new()),
            Event::End(_) => self.close(),
            Event::Rule => {
                // a thematic break has no Start/End pair but still separates blocks
                self.current().push(Node::Container {
                    children: Vec::new(),
                });
            }
            _ => {}
        }
    }

    fn close(&mut self) {
        if self.stack.len() > 1 {
            let children = self.stack.pop().unwrap_or_default();
            self.current().push(Node::Container { children });
        }
    }

    fn current(&mut self) -> &mut Vec<Node> {
        if self.stack.is_empty() {
            self.stack.push(Vec::new());
        }
        let last = self.stack.len() - 1;
        &mut self.stack[last]
    }

    fn finish(mut self) -> Node {
        while self.stack.len() > 1 {
            self.close();
        }
        Node::Container {
            children: self.stack.pop().unwrap_or_default(),
        }
    }
}

/// Language tag of a fenced block: the first word of its info string.
fn info_lang(info: &str) -> &str {
    info.split_whitespace().next().unwrap_or("")
}
