//! Input adapters: build a [`Document`] from markup using `scraper`.
//!
//! The sanitizer core never parses on its own during a run; hosts (and the
//! test-suite) use these helpers to turn a string into the arena tree once.

use ego_tree::{NodeMut, NodeRef, Tree};
use scraper::{Html, Node};

use super::{Document, Element, NodeData};

pub(super) fn fragment(html: &str) -> Document {
    let parsed = Html::parse_fragment(html);
    let mut tree = Tree::new(NodeData::Fragment);

    // scraper wraps fragment content in a synthetic <html> element.
    let wrapper = parsed
        .tree
        .root()
        .children()
        .find(|child| child.value().is_element());

    if let Some(wrapper) = wrapper {
        let mut root = tree.root_mut();
        for child in wrapper.children() {
            copy_node(child, &mut root);
        }
    }
    Document::from(tree)
}

pub(super) fn document(html: &str) -> Document {
    let parsed = Html::parse_document(html);
    let mut tree = Tree::new(NodeData::Document);
    {
        let mut root = tree.root_mut();
        for child in parsed.tree.root().children() {
            copy_node(child, &mut root);
        }
    }
    Document::from(tree)
}

fn copy_node(source: NodeRef<'_, Node>, parent: &mut NodeMut<'_, NodeData>) {
    let data = match source.value() {
        Node::Element(el) => NodeData::Element(Element::with_attrs(
            el.name(),
            el.attrs().map(|(name, value)| (name.to_string(), value.to_string())),
        )),
        Node::Text(text) => NodeData::Text(String::from(&**text)),
        Node::Comment(comment) => NodeData::Comment(String::from(&**comment)),
        Node::Doctype(doctype) => NodeData::Doctype(doctype.name().to_string()),
        Node::Document | Node::Fragment | Node::ProcessingInstruction(_) => return,
    };

    let mut child = parent.append(data);
    for grandchild in source.children() {
        copy_node(grandchild, &mut child);
    }
}
