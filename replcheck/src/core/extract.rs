//! Deterministic extraction of examples from a document tree.

use crate::core::document::Node;
use crate::core::types::Example;

/// Collect every example in `root`, in document order.
///
/// A code block tagged `lang` is an example. When the next non-blank sibling
/// is an untagged code block, its text is the expected output. Any node that
/// is not a code block is searched recursively and its examples are spliced
/// in place. Code blocks with other tags are ignored.
pub fn extract_examples(root: &Node, lang: &str) -> Vec<Example> {
    let mut examples = Vec::new();
    collect(root, lang, &mut examples);
    examples
}

fn collect(node: &Node, lang: &str, out: &mut Vec<Example>) {
    let Node::Container { children } = node else {
        return;
    };

    // blank lines must not separate an example from its output
    let pared: Vec<&Node> = children
        .iter()
        .filter(|child| !matches!(child, Node::Blank))
        .collect();

    for (index, current) in pared.iter().enumerate() {
        let next = pared.get(index + 1).copied();
        match current {
            Node::Code { lang: tag, text } => {
                if tag == lang && !text.is_empty() {
                    out.push(Example {
                        code: text.clone(),
                        expected_output: expected_output(next),
                    });
                }
            }
            other => collect(other, lang, out),
        }
    }
}

fn expected_output(next: Option<&Node>) -> Option<String> {
    match next {
        Some(Node::Code { lang, text }) if lang.is_empty() => Some(text.clone()),
        _ => None,
    }
}
