mod document;
mod selector;

pub use document::Document;
pub use selector::{Selector, SelectorError};

const FORM_CONTROL_TAGS: [&str; 4] = ["input", "select", "textarea", "button"];

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct NodeId(usize);

impl NodeId {
    pub const fn from_index(index: usize) -> Self {
        Self(index)
    }

    pub const fn index(self) -> usize {
        self.0
    }
}

/// The element inserted next to a field to carry its error message.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Annotation {
    pub tag: String,
    pub classes: Vec<String>,
    pub attributes: Vec<(String, String)>,
    pub text: String,
}

/// A mutable markup tree the reconcilers read from and write to.
///
/// Hosts with their own document model implement the primitive accessors and
/// mutators; traversal and selector matching come for free.
pub trait Markup {
    /// Element tag name, `None` for text and document nodes.
    fn tag(&self, node: NodeId) -> Option<&str>;
    /// Attribute value. Classes are exposed through [`Markup::has_class`] only.
    fn attribute(&self, node: NodeId, name: &str) -> Option<&str>;
    fn parent(&self, node: NodeId) -> Option<NodeId>;
    fn children(&self, node: NodeId) -> Vec<NodeId>;
    fn has_class(&self, node: NodeId, class: &str) -> bool;

    fn add_class(&mut self, node: NodeId, class: &str);
    fn remove_class(&mut self, node: NodeId, class: &str);
    /// Detaches `node` and its subtree from the tree.
    fn remove(&mut self, node: NodeId);
    /// Inserts the annotation as the next sibling of `anchor`. Returns `None`
    /// when `anchor` has no parent.
    fn insert_after(&mut self, anchor: NodeId, annotation: &Annotation) -> Option<NodeId>;
    /// Inserts the annotation as the last child of `parent`.
    fn append_child(&mut self, parent: NodeId, annotation: &Annotation) -> NodeId;

    /// Descendants of `root` in document order, `root` excluded.
    fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = self.children(root);
        stack.reverse();
        while let Some(node) = stack.pop() {
            out.push(node);
            let mut children = self.children(node);
            children.reverse();
            stack.extend(children);
        }
        out
    }

    /// Input-like elements of a form, in document order.
    fn form_controls(&self, form: NodeId) -> Vec<NodeId> {
        self.descendants(form)
            .into_iter()
            .filter(|node| {
                self.tag(*node).is_some_and(|tag| {
                    FORM_CONTROL_TAGS
                        .iter()
                        .any(|control| tag.eq_ignore_ascii_case(control))
                })
            })
            .collect()
    }

    fn matches(&self, node: NodeId, selector: &Selector) -> bool {
        selector.matches(self, node)
    }

    /// The node itself or its nearest ancestor matching `selector`.
    fn closest(&self, node: NodeId, selector: &Selector) -> Option<NodeId> {
        std::iter::successors(Some(node), |current| self.parent(*current))
            .find(|candidate| self.matches(*candidate, selector))
    }

    /// Descendants of `root` matching `selector`, in document order.
    fn select_within(&self, root: NodeId, selector: &Selector) -> Vec<NodeId> {
        self.descendants(root)
            .into_iter()
            .filter(|node| self.matches(*node, selector))
            .collect()
    }
}
