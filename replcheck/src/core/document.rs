//! Document tree consumed by the example extractor.

/// A block-level node of a parsed document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// A fenced or indented code block. `lang` is empty for untagged blocks.
    Code { lang: String, text: String },
    /// A blank line between blocks. Ignored when pairing code with output.
    Blank,
    /// Any other block, with its block-level children (possibly none).
    Container { children: Vec<Node> },
}

impl Node {
    pub fn code(lang: impl Into<String>, text: impl Into<String>) -> Self {
        Node::Code {
            lang: lang.into(),
            text: text.into(),
        }
    }

    pub fn container(children: Vec<Node>) -> Self {
        Node::Container { children }
    }
}
