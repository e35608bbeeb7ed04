use crate::dom::NodeId;

/// Node-level outcome of validating one element
///
/// Attribute strips are applied while the element is validated; the walker
/// acts on the variant that comes back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationVerdict {
    /// Keep the element and validate its children.
    Keep,
    /// An attribute was removed and the element otherwise kept.
    StripAttribute(String),
    /// Remove the element with its subtree; descendants are not visited.
    StripNode,
    /// Put these detached nodes where the element was and validate them
    /// next, in order.
    ReplaceNode(Vec<NodeId>),
}
