//! Arena-backed document tree shared by every sanitizer pass.
//!
//! The tree is an [`ego_tree::Tree`], so every node is addressed by a stable
//! [`NodeId`]. Removing a node only detaches it: the slot stays in the arena
//! as an orphan, which means a `NodeId` captured by a diagnostic or by an
//! earlier pass never dangles, it simply stops being reachable from the root.

mod node;
mod parse;
mod serialize;

pub use ego_tree::NodeId;
pub use node::{Attribute, Element, NodeData};

use ego_tree::{NodeRef, Tree};

/// Mutable document handed to the pipeline by the host.
#[derive(Debug, Clone)]
pub struct Document {
    tree: Tree<NodeData>,
}

impl Document {
    /// Empty fragment document.
    #[must_use]
    pub fn new_fragment() -> Self {
        Self {
            tree: Tree::new(NodeData::Fragment),
        }
    }

    /// Empty full document.
    #[must_use]
    pub fn new_document() -> Self {
        Self {
            tree: Tree::new(NodeData::Document),
        }
    }

    /// Parse body-level markup into a fragment document.
    #[must_use]
    pub fn parse_fragment(html: &str) -> Self {
        parse::fragment(html)
    }

    /// Parse a complete HTML page.
    #[must_use]
    pub fn parse_document(html: &str) -> Self {
        parse::document(html)
    }

    #[must_use]
    pub fn root(&self) -> NodeId {
        self.tree.root().id()
    }

    #[must_use]
    pub fn is_fragment(&self) -> bool {
        matches!(self.tree.root().value(), NodeData::Fragment)
    }

    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<NodeRef<'_, NodeData>> {
        self.tree.get(id)
    }

    #[must_use]
    pub fn data(&self, id: NodeId) -> Option<&NodeData> {
        self.tree.get(id).map(|node| node.value())
    }

    #[must_use]
    pub fn element(&self, id: NodeId) -> Option<&Element> {
        self.data(id).and_then(NodeData::as_element)
    }

    #[must_use]
    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        // ego-tree 0.10 has no `NodeMut::into_value`; `nodes()` and
        // `values_mut()` both walk the arena in insertion order.
        let index = self.tree.nodes().position(|node| node.id() == id)?;
        self.tree
            .values_mut()
            .nth(index)
            .and_then(NodeData::as_element_mut)
    }

    /// Mutate an element in place. Returns `None` when `id` is not an
    /// element.
    pub fn update_element<R>(
        &mut self,
        id: NodeId,
        f: impl FnOnce(&mut Element) -> R,
    ) -> Option<R> {
        let mut node = self.tree.get_mut(id)?;
        node.value().as_element_mut().map(f)
    }

    /// Lowercase tag name of an element node.
    #[must_use]
    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(Element::name)
    }

    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.tree.get(id)?.parent().map(|p| p.id())
    }

    /// Child node ids in order.
    #[must_use]
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.tree
            .get(id)
            .map(|node| node.children().map(|c| c.id()).collect())
            .unwrap_or_default()
    }

    /// Element children in order.
    #[must_use]
    pub fn element_children(&self, id: NodeId) -> Vec<NodeId> {
        self.tree
            .get(id)
            .map(|node| {
                node.children()
                    .filter(|c| c.value().as_element().is_some())
                    .map(|c| c.id())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Preceding element siblings, nearest first.
    #[must_use]
    pub fn previous_element_siblings(&self, id: NodeId) -> Vec<NodeId> {
        self.tree
            .get(id)
            .map(|node| {
                node.prev_siblings()
                    .filter(|s| s.value().as_element().is_some())
                    .map(|s| s.id())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Ancestor ids from the parent up to the root.
    #[must_use]
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        self.tree
            .get(id)
            .map(|node| node.ancestors().map(|a| a.id()).collect())
            .unwrap_or_default()
    }

    /// Every element reachable from the root, in document order.
    #[must_use]
    pub fn descendant_elements(&self) -> Vec<NodeId> {
        self.tree
            .root()
            .descendants()
            .filter(|node| node.value().as_element().is_some())
            .map(|node| node.id())
            .collect()
    }

    /// Elements with a given tag name, in document order.
    #[must_use]
    pub fn elements_by_tag(&self, tag: &str) -> Vec<NodeId> {
        self.tree
            .root()
            .descendants()
            .filter(|node| {
                node.value()
                    .as_element()
                    .is_some_and(|el| el.name() == tag)
            })
            .map(|node| node.id())
            .collect()
    }

    /// First element with the given tag name.
    #[must_use]
    pub fn first_element_by_tag(&self, tag: &str) -> Option<NodeId> {
        self.tree
            .root()
            .descendants()
            .find(|node| {
                node.value()
                    .as_element()
                    .is_some_and(|el| el.name() == tag)
            })
            .map(|node| node.id())
    }

    /// Whether a node is still reachable from the document root.
    #[must_use]
    pub fn is_attached(&self, id: NodeId) -> bool {
        let root = self.root();
        if id == root {
            return true;
        }
        self.tree
            .get(id)
            .is_some_and(|node| node.ancestors().any(|a| a.id() == root))
    }

    /// Concatenated text of all text descendants.
    #[must_use]
    pub fn text_content(&self, id: NodeId) -> String {
        let mut text = String::new();
        if let Some(node) = self.tree.get(id) {
            for descendant in node.descendants() {
                if let NodeData::Text(t) = descendant.value() {
                    text.push_str(t);
                }
            }
        }
        text
    }

    /// Replace the children of a node with a single text node.
    pub fn set_text_content(&mut self, id: NodeId, text: impl Into<String>) {
        for child in self.children(id) {
            self.detach(child);
        }
        if let Some(mut node) = self.tree.get_mut(id) {
            node.append(NodeData::Text(text.into()));
        }
    }

    /// Create a detached element; attach it with [`Self::append_child`],
    /// [`Self::insert_before`] or [`Self::replace_with`].
    pub fn create_element(&mut self, element: Element) -> NodeId {
        self.tree.orphan(NodeData::Element(element)).id()
    }

    /// Create a detached text node.
    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.tree.orphan(NodeData::Text(text.into())).id()
    }

    /// Append `child` (detaching it from wherever it was) as the last child
    /// of `parent`.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        if parent == child || self.ancestors(parent).contains(&child) {
            return;
        }
        if let Some(mut node) = self.tree.get_mut(parent) {
            node.append_id(child);
        }
    }

    /// Insert `new_node` immediately before `reference`.
    pub fn insert_before(&mut self, reference: NodeId, new_node: NodeId) {
        if reference == new_node
            || self.parent(reference).is_none()
            || self.ancestors(reference).contains(&new_node)
        {
            return;
        }
        if let Some(mut node) = self.tree.get_mut(reference) {
            node.insert_id_before(new_node);
        }
    }

    /// Detach a node (and its subtree) from the tree. The id stays valid.
    pub fn detach(&mut self, id: NodeId) {
        if id == self.root() {
            return;
        }
        if let Some(mut node) = self.tree.get_mut(id) {
            node.detach();
        }
    }

    /// Replace `id` with its own children, returning the lifted child ids.
    pub fn unwrap(&mut self, id: NodeId) -> Vec<NodeId> {
        let children = self.children(id);
        if self.parent(id).is_none() {
            return Vec::new();
        }
        for child in &children {
            self.insert_before(id, *child);
        }
        self.detach(id);
        children
    }

    /// Put the detached `replacement` where `id` currently sits and detach
    /// `id`.
    pub fn replace_with(&mut self, id: NodeId, replacement: NodeId) {
        if id == replacement || self.parent(id).is_none() {
            return;
        }
        self.insert_before(id, replacement);
        self.detach(id);
    }

    /// Move every child of `from` to the end of `to`.
    pub fn move_children(&mut self, from: NodeId, to: NodeId) {
        for child in self.children(from) {
            self.append_child(to, child);
        }
    }

    /// Structural validity check run before and after every pass.
    ///
    /// # Errors
    ///
    /// Returns a description of the first violation found: a root that is
    /// neither a document nor a fragment, a nested root node, or a child
    /// hanging off a text, comment or doctype node.
    pub fn check_integrity(&self) -> Result<(), String> {
        let root = self.tree.root();
        if !root.value().is_root() {
            return Err("document root is not a document or fragment node".to_string());
        }
        for node in root.descendants().skip(1) {
            if node.value().is_root() {
                return Err("nested document root".to_string());
            }
            if node.has_children() && !node.value().can_have_children() {
                return Err(format!(
                    "{} node has children",
                    match node.value() {
                        NodeData::Text(_) => "text",
                        NodeData::Comment(_) => "comment",
                        _ => "doctype",
                    }
                ));
            }
        }
        Ok(())
    }

    /// Serialize the attached tree as HTML.
    #[must_use]
    pub fn to_html(&self) -> String {
        serialize::to_html(&self.tree)
    }

    /// Serialize a single node (and its subtree) as HTML.
    #[must_use]
    pub fn outer_html(&self, id: NodeId) -> String {
        self.tree
            .get(id)
            .map(serialize::node_to_html)
            .unwrap_or_default()
    }
}

impl From<Tree<NodeData>> for Document {
    fn from(tree: Tree<NodeData>) -> Self {
        Self { tree }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detached_ids_stay_addressable() {
        let mut doc = Document::parse_fragment("<p><b>x</b></p>");
        let bold = doc.elements_by_tag("b")[0];
        doc.detach(bold);
        assert!(!doc.is_attached(bold));
        assert_eq!(doc.tag_name(bold), Some("b"));
        assert_eq!(doc.to_html(), "<p></p>");
    }

    #[test]
    fn test_unwrap_lifts_children_in_place() {
        let mut doc = Document::parse_fragment("<p>a<font>b<i>c</i></font>d</p>");
        let font = doc.elements_by_tag("font")[0];
        let lifted = doc.unwrap(font);
        assert_eq!(lifted.len(), 2);
        assert_eq!(doc.to_html(), "<p>ab<i>c</i>d</p>");
    }

    #[test]
    fn test_replace_with_and_element_mut() {
        let mut doc = Document::parse_fragment("<div><img src=\"a\"></div>");
        let img = doc.elements_by_tag("img")[0];
        let replacement = doc.create_element(Element::with_attrs("amp-img", [("src", "a")]));
        doc.replace_with(img, replacement);
        if let Some(el) = doc.element_mut(replacement) {
            el.set_attr("layout", "fill");
        }
        assert_eq!(
            doc.to_html(),
            r#"<div><amp-img src="a" layout="fill"></amp-img></div>"#
        );
    }

    #[test]
    fn test_append_child_refuses_cycles() {
        let mut doc = Document::parse_fragment("<div><span></span></div>");
        let div = doc.elements_by_tag("div")[0];
        let span = doc.elements_by_tag("span")[0];
        doc.append_child(span, div);
        assert!(doc.check_integrity().is_ok());
        assert_eq!(doc.to_html(), "<div><span></span></div>");
    }

    #[test]
    fn test_integrity_rejects_children_under_text() {
        let mut tree = Tree::new(NodeData::Fragment);
        tree.root_mut()
            .append(NodeData::Text("t".into()))
            .append(NodeData::Comment("c".into()));
        assert!(Document::from(tree).check_integrity().is_err());
    }
}
