//! HTML serialization of the arena tree.

use ego_tree::iter::Edge;
use ego_tree::{NodeRef, Tree};
use html_escape::{encode_double_quoted_attribute, encode_text};

use super::NodeData;

/// HTML5 void elements that must not have a closing tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Elements whose text content is emitted without escaping.
const RAW_TEXT_ELEMENTS: &[&str] = &[
    "script", "style", "xmp", "iframe", "noembed", "noframes", "noscript", "plaintext",
];

pub(super) fn to_html(tree: &Tree<NodeData>) -> String {
    node_to_html(tree.root())
}

pub(super) fn node_to_html(node: NodeRef<'_, NodeData>) -> String {
    let mut out = String::new();
    for edge in node.traverse() {
        match edge {
            Edge::Open(current) => open(current, &mut out),
            Edge::Close(current) => close(current, &mut out),
        }
    }
    out
}

fn open(node: NodeRef<'_, NodeData>, out: &mut String) {
    match node.value() {
        NodeData::Document | NodeData::Fragment => {}
        NodeData::Doctype(name) => {
            out.push_str("<!DOCTYPE ");
            out.push_str(name);
            out.push('>');
        }
        NodeData::Element(element) => {
            out.push('<');
            out.push_str(element.name());
            for attr in element.attrs() {
                out.push(' ');
                out.push_str(&attr.name);
                if !attr.value.is_empty() {
                    out.push_str("=\"");
                    out.push_str(&encode_double_quoted_attribute(&attr.value));
                    out.push('"');
                }
            }
            out.push('>');
        }
        NodeData::Text(text) => {
            let raw_parent = node
                .parent()
                .and_then(|p| p.value().as_element().map(|el| el.name().to_string()))
                .is_some_and(|name| RAW_TEXT_ELEMENTS.contains(&name.as_str()));
            if raw_parent {
                out.push_str(text);
            } else {
                out.push_str(&encode_text(text));
            }
        }
        NodeData::Comment(comment) => {
            out.push_str("<!--");
            out.push_str(comment);
            out.push_str("-->");
        }
    }
}

fn close(node: NodeRef<'_, NodeData>, out: &mut String) {
    if let NodeData::Element(element) = node.value() {
        if VOID_ELEMENTS.contains(&element.name()) {
            return;
        }
        out.push_str("</");
        out.push_str(element.name());
        out.push('>');
    }
}

#[cfg(test)]
mod tests {
    use crate::dom::Document;

    #[test]
    fn test_void_and_raw_text() {
        let doc = Document::parse_fragment(
            "<p>a &amp; b<br><img src=\"x.png\" alt=\"q&quot;\"></p><style>a>b{color:red}</style>",
        );
        let html = doc.to_html();
        assert!(html.contains("<br>"));
        assert!(!html.contains("</br>"));
        assert!(!html.contains("</img>"));
        assert!(html.contains("a &amp; b"));
        assert!(html.contains("alt=\"q&quot;\""));
        assert!(html.contains("<style>a>b{color:red}</style>"));
    }

    #[test]
    fn test_boolean_attribute_is_bare() {
        let doc = Document::parse_fragment("<script async src=\"a.js\"></script>");
        assert_eq!(doc.to_html(), "<script async src=\"a.js\"></script>");
    }

    #[test]
    fn test_serialization_is_stable() {
        let input = "<div id=\"x\" class=\"a b\"><!-- c --><span>t</span></div>";
        let first = Document::parse_fragment(input).to_html();
        let second = Document::parse_fragment(&first).to_html();
        assert_eq!(first, second);
    }
}
