//! Tolerant parser for the tag-soup statement format
//!
//! Bank statement files arrive as OFX 1.x style SGML: case-insensitive
//! tags, no closing tag for leaf elements (the next tag closes them),
//! explicit closing tags only for containers, and a plain-text header
//! before the root marker. The format intentionally violates
//! well-formedness, so this is a hand-rolled stack walk over the token
//! stream rather than a strict XML parser. The only fatal condition is a
//! missing root marker; every structural irregularity is absorbed.

use serde::{Deserialize, Serialize};

use crate::types::{ReconcileError, ReconcileResult};

/// Root marker that must occur somewhere in the document
pub const ROOT_MARKER: &str = "<OFX>";

/// Generic node of the parsed statement tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementNode {
    /// Tag name, upper-cased; empty for the synthetic document root
    pub tag: String,
    /// Accumulated leaf text, trimmed
    pub text: String,
    /// Child nodes in document order
    pub children: Vec<StatementNode>,
}

impl StatementNode {
    fn new(tag: String) -> Self {
        Self {
            tag,
            text: String::new(),
            children: Vec::new(),
        }
    }

    /// Synthetic document root holding the top-level tags
    fn document() -> Self {
        Self::new(String::new())
    }

    /// Text of the first direct child with the given tag, if any
    pub fn child_text(&self, tag: &str) -> Option<&str> {
        self.children
            .iter()
            .find(|child| child.tag == tag)
            .map(|child| child.text.as_str())
            .filter(|text| !text.is_empty())
    }
}

/// Parse the full text of a statement file into a generic tagged tree
///
/// Fails only when no root marker is found anywhere in the document;
/// everything before the marker is treated as header noise and skipped.
pub fn parse(input: &str) -> ReconcileResult<StatementNode> {
    let upper = input.to_ascii_uppercase();
    let start = upper.find(ROOT_MARKER).ok_or_else(|| {
        ReconcileError::MalformedStatement(format!("no {} root marker found", ROOT_MARKER))
    })?;

    let mut stack: Vec<StatementNode> = vec![StatementNode::document()];
    let mut rest = &input[start..];

    loop {
        let Some(lt) = rest.find('<') else {
            append_text(&mut stack, rest);
            break;
        };
        append_text(&mut stack, &rest[..lt]);

        let after_lt = &rest[lt + 1..];
        let Some(gt) = after_lt.find('>') else {
            // Unterminated tag: keep the remainder as text and stop.
            append_text(&mut stack, after_lt);
            break;
        };
        let token = &after_lt[..gt];
        rest = &after_lt[gt + 1..];

        if let Some(name) = token.strip_prefix('/') {
            close_tag(&mut stack, name);
        } else if token.starts_with('!') {
            // Declarations and comments carry no statement data.
        } else {
            open_tag(&mut stack, token);
        }
    }

    // Whatever is still open at end of input folds back into the root.
    while stack.len() > 1 {
        let Some(node) = stack.pop() else { break };
        attach(&mut stack, node);
    }
    Ok(stack.pop().unwrap_or_else(StatementNode::document))
}

fn append_text(stack: &mut [StatementNode], raw: &str) {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return;
    }
    if let Some(top) = stack.last_mut() {
        if !top.text.is_empty() {
            top.text.push(' ');
        }
        top.text.push_str(trimmed);
    }
}

fn open_tag(stack: &mut Vec<StatementNode>, token: &str) {
    let Some(name) = token.split_whitespace().next() else {
        return;
    };

    // A leaf holding text is implicitly closed by the next opening tag.
    if stack.len() > 1 {
        let top = &stack[stack.len() - 1];
        if !top.text.is_empty() && top.children.is_empty() {
            if let Some(leaf) = stack.pop() {
                attach(stack, leaf);
            }
        }
    }

    stack.push(StatementNode::new(name.to_ascii_uppercase()));
}

fn close_tag(stack: &mut Vec<StatementNode>, name: &str) {
    let target = name.trim().to_ascii_uppercase();
    // Pop until the matching open node is popped; malformed nesting stops
    // at the root instead of erroring.
    while stack.len() > 1 {
        let Some(node) = stack.pop() else { break };
        let matched = node.tag == target;
        attach(stack, node);
        if matched {
            break;
        }
    }
}

fn attach(stack: &mut [StatementNode], node: StatementNode) {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(node);
    }
}
