//! HTML serialization, primarily for assertions and debugging.

use indexmap::IndexMap;

use crate::node::{Node, NodeKind};

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

impl Node {
    /// Serialize this node and its subtree.
    pub fn outer_html(&self) -> String {
        let mut out = String::new();
        write_node(self, &mut out);
        out
    }

    /// Serialize the children of this node.
    pub fn inner_html(&self) -> String {
        let mut out = String::new();
        for child in self.children() {
            write_node(&child, &mut out);
        }
        out
    }
}

fn write_node(node: &Node, out: &mut String) {
    match &node.0.kind {
        NodeKind::Text(data) => out.push_str(&escape_text(&data.borrow())),
        NodeKind::Comment(data) => {
            out.push_str("<!--");
            out.push_str(&data.borrow());
            out.push_str("-->");
        }
        NodeKind::Element(el) => {
            out.push('<');
            out.push_str(&el.tag);
            for (name, value) in el.attributes.borrow().iter() {
                out.push(' ');
                out.push_str(name);
                if !value.is_empty() {
                    out.push_str("=\"");
                    out.push_str(&escape_attribute(value));
                    out.push('"');
                }
            }
            let styles = el.styles.borrow();
            if !styles.is_empty() {
                out.push_str(" style=\"");
                out.push_str(&escape_attribute(&style_text(&styles)));
                out.push('"');
            }
            out.push('>');
            if VOID_ELEMENTS.contains(&el.tag.as_str()) {
                return;
            }
            for child in node.children() {
                write_node(&child, out);
            }
            out.push_str("</");
            out.push_str(&el.tag);
            out.push('>');
        }
    }
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_attribute(text: &str) -> String {
    escape_text(text).replace('"', "&quot;")
}

/// Render an inline style map back to `name: value; ...` text.
pub(crate) fn style_text(styles: &IndexMap<String, String>) -> String {
    styles
        .iter()
        .map(|(name, value)| format!("{name}: {value}"))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Split `name: value; ...` inline style text into an ordered map.
pub(crate) fn parse_style_text(text: &str) -> IndexMap<String, String> {
    let mut styles = IndexMap::new();
    for declaration in text.split(';') {
        if let Some((name, value)) = declaration.split_once(':') {
            let name = name.trim();
            let value = value.trim();
            if !name.is_empty() && !value.is_empty() {
                styles.insert(name.to_string(), value.to_string());
            }
        }
    }
    styles
}
