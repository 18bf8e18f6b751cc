//! The hydration tree walker.
//!
//! A stateful cursor over a pre-rendered tree, constrained to elements,
//! text and comments. Bindings call it in the same order they would render,
//! so the walk shape is a compile-time invariant of the template: any
//! divergence is a [`RenderError::HydrationMismatch`] carrying a
//! path-from-root descriptor.
//!
//! Whitespace-only text between tags is not significant and is skipped
//! when something else is expected.

use weft_dom::{Node, NodeType};

use crate::error::RenderError;

pub struct TreeWalker {
    /// (parent, index of the next unvisited child) from root to cursor.
    stack: Vec<(Node, usize)>,
}

impl TreeWalker {
    /// A walker whose cursor sits before the first child of `root`.
    pub fn new(root: &Node) -> TreeWalker {
        TreeWalker {
            stack: vec![(root.clone(), 0)],
        }
    }

    fn current(&self) -> Option<Node> {
        let (parent, index) = self.stack.last()?;
        parent.child(*index)
    }

    fn advance(&mut self) {
        if let Some((_, index)) = self.stack.last_mut() {
            *index += 1;
        }
    }

    fn skip_insignificant(&mut self) {
        while let Some(node) = self.current() {
            let blank = node.node_type() == NodeType::Text
                && node.data().map(|d| d.trim().is_empty()).unwrap_or(false);
            if blank {
                self.advance();
            } else {
                break;
            }
        }
    }

    /// Slash-separated child indices from the root to the cursor.
    pub fn path(&self) -> String {
        let indices: Vec<String> = self.stack.iter().map(|(_, i)| i.to_string()).collect();
        indices.join("/")
    }

    /// The next node, without advancing.
    pub fn peek_node(&mut self) -> Option<Node> {
        self.current()
    }

    /// Advance over the next node, validating kind (and tag name for
    /// elements). Popping an element descends into its children; the
    /// caller leaves again with [`TreeWalker::exit_element`].
    pub fn pop_node(
        &mut self,
        expected: NodeType,
        expected_name: Option<&str>,
    ) -> Result<Node, RenderError> {
        if expected != NodeType::Text {
            self.skip_insignificant();
        }
        let node = self.current().ok_or_else(|| RenderError::HydrationMismatch {
            path: self.path(),
            expected: describe_expectation(expected, expected_name),
            found: "end of children".to_string(),
        })?;
        if node.node_type() != expected {
            return Err(RenderError::HydrationMismatch {
                path: self.path(),
                expected: describe_expectation(expected, expected_name),
                found: node.describe(),
            });
        }
        if let Some(name) = expected_name {
            let tag = node.tag_name().unwrap_or_default();
            if !tag.eq_ignore_ascii_case(name) {
                return Err(RenderError::HydrationMismatch {
                    path: self.path(),
                    expected: describe_expectation(expected, expected_name),
                    found: node.describe(),
                });
            }
        }
        self.advance();
        if expected == NodeType::Element {
            self.stack.push((node.clone(), 0));
        }
        tracing::trace!(node = ?node, "hydration adopted");
        Ok(node)
    }

    /// Leave the element most recently descended into. Leftover content
    /// other than whitespace is a mismatch.
    pub fn exit_element(&mut self) -> Result<(), RenderError> {
        self.skip_insignificant();
        if let Some(node) = self.current() {
            return Err(RenderError::HydrationMismatch {
                path: self.path(),
                expected: "end of children".to_string(),
                found: node.describe(),
            });
        }
        if self.stack.len() > 1 {
            self.stack.pop();
        }
        Ok(())
    }

    /// Adopt `marker` at the cursor: a live comment at the cursor is
    /// swapped for `marker` (keeping the cursor position), otherwise
    /// `marker` is inserted fresh. Pre-rendered output may legitimately
    /// omit markers, so a missing comment is not a mismatch.
    pub fn adopt_marker(&mut self, marker: &Node) -> Result<(), RenderError> {
        self.skip_insignificant();
        let (parent, _) = self
            .stack
            .last()
            .cloned()
            .ok_or_else(|| RenderError::HydrationMismatch {
                path: self.path(),
                expected: "a marker position".to_string(),
                found: "detached cursor".to_string(),
            })?;
        match self.current() {
            Some(node) if node.node_type() == NodeType::Comment => {
                parent.replace_child(&node, marker);
            }
            Some(node) => {
                parent.insert_before(marker, Some(&node));
            }
            None => {
                parent.insert_before(marker, None);
            }
        }
        self.advance();
        Ok(())
    }

    /// Pop a comment if one sits at the cursor.
    pub fn pop_comment_if_present(&mut self) -> Option<Node> {
        self.skip_insignificant();
        match self.current() {
            Some(node) if node.node_type() == NodeType::Comment => {
                self.advance();
                Some(node)
            }
            _ => None,
        }
    }

    /// Pop a text node if one sits at the cursor.
    pub fn pop_text_if_present(&mut self) -> Option<Node> {
        match self.current() {
            Some(node) if node.node_type() == NodeType::Text => {
                self.advance();
                Some(node)
            }
            _ => None,
        }
    }
}

fn describe_expectation(kind: NodeType, name: Option<&str>) -> String {
    match (kind, name) {
        (NodeType::Element, Some(name)) => format!("<{name}>"),
        (NodeType::Element, None) => "an element".to_string(),
        (NodeType::Text, _) => "#text".to_string(),
        (NodeType::Comment, _) => "#comment".to_string(),
    }
}
