use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use super::{Annotation, Markup, NodeId, Selector, SelectorError};

#[derive(Clone, Debug)]
enum NodeKind {
    Document,
    Element(Element),
    Text(String),
}

#[derive(Clone, Debug, Default)]
struct Element {
    tag: String,
    attributes: BTreeMap<String, String>,
    classes: Vec<String>,
}

#[derive(Clone, Debug)]
struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// In-memory markup tree.
///
/// Nodes live in an arena and are addressed by [`NodeId`]. Removing a node
/// only detaches it, so ids stay valid for the lifetime of the document.
#[derive(Clone, Debug)]
pub struct Document {
    nodes: Vec<NodeData>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        Self {
            nodes: vec![NodeData {
                kind: NodeKind::Document,
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Appends an element. A `class` attribute is split into the class list.
    pub fn append_element(
        &mut self,
        parent: NodeId,
        tag: &str,
        attributes: &[(&str, &str)],
    ) -> NodeId {
        let mut element = Element {
            tag: tag.to_ascii_lowercase(),
            ..Element::default()
        };
        for (name, value) in attributes {
            if *name == "class" {
                element
                    .classes
                    .extend(value.split_whitespace().map(str::to_string));
            } else {
                element
                    .attributes
                    .insert((*name).to_string(), (*value).to_string());
            }
        }
        self.attach(parent, NodeKind::Element(element), None)
    }

    pub fn append_text(&mut self, parent: NodeId, text: &str) -> NodeId {
        self.attach(parent, NodeKind::Text(text.to_string()), None)
    }

    pub fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) {
        if let Some(element) = self.element_mut(node) {
            element.attributes.insert(name.to_string(), value.to_string());
        }
    }

    pub fn remove_attribute(&mut self, node: NodeId, name: &str) {
        if let Some(element) = self.element_mut(node) {
            element.attributes.remove(name);
        }
    }

    pub fn classes(&self, node: NodeId) -> &[String] {
        self.element(node)
            .map(|element| element.classes.as_slice())
            .unwrap_or_default()
    }

    pub fn is_attached(&self, node: NodeId) -> bool {
        std::iter::successors(Some(node), |current| self.parent(*current))
            .any(|ancestor| ancestor == self.root())
    }

    /// Concatenated text of `node` and its descendants.
    pub fn text_content(&self, node: NodeId) -> String {
        let mut text = String::new();
        if let Some(NodeKind::Text(value)) = self.nodes.get(node.0).map(|data| &data.kind) {
            text.push_str(value);
        }
        for descendant in self.descendants(node) {
            if let NodeKind::Text(value) = &self.nodes[descendant.0].kind {
                text.push_str(value);
            }
        }
        text
    }

    pub fn query(&self, selector: &str) -> Result<Vec<NodeId>, SelectorError> {
        let selector = Selector::parse(selector)?;
        Ok(self.select_within(self.root(), &selector))
    }

    /// First attached element whose `name` attribute equals `name`.
    pub fn find_by_name(&self, name: &str) -> Option<NodeId> {
        self.descendants(self.root())
            .into_iter()
            .find(|node| self.attribute(*node, "name") == Some(name))
    }

    pub fn to_markup(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.write_markup(node, &mut out);
        out
    }

    fn write_markup(&self, node: NodeId, out: &mut String) {
        let Some(data) = self.nodes.get(node.0) else {
            return;
        };
        match &data.kind {
            NodeKind::Document => {
                for child in &data.children {
                    self.write_markup(*child, out);
                }
            }
            NodeKind::Text(text) => out.push_str(&escape(text)),
            NodeKind::Element(element) => {
                out.push('<');
                out.push_str(&element.tag);
                if !element.classes.is_empty() {
                    out.push_str(&format!(" class=\"{}\"", escape(&element.classes.join(" "))));
                }
                for (name, value) in &element.attributes {
                    out.push_str(&format!(" {name}=\"{}\"", escape(value)));
                }
                out.push('>');
                for child in &data.children {
                    self.write_markup(*child, out);
                }
                out.push_str("</");
                out.push_str(&element.tag);
                out.push('>');
            }
        }
    }

    fn attach(&mut self, parent: NodeId, kind: NodeKind, position: Option<usize>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeData {
            kind,
            parent: Some(parent),
            children: Vec::new(),
        });
        let siblings = &mut self.nodes[parent.0].children;
        match position {
            Some(index) if index <= siblings.len() => siblings.insert(index, id),
            _ => siblings.push(id),
        }
        id
    }

    fn build_annotation(
        &mut self,
        parent: NodeId,
        annotation: &Annotation,
        position: Option<usize>,
    ) -> NodeId {
        let element = Element {
            tag: annotation.tag.to_ascii_lowercase(),
            attributes: annotation.attributes.iter().cloned().collect(),
            classes: annotation.classes.clone(),
        };
        let node = self.attach(parent, NodeKind::Element(element), position);
        if !annotation.text.is_empty() {
            self.append_text(node, &annotation.text);
        }
        node
    }

    fn element(&self, node: NodeId) -> Option<&Element> {
        match self.nodes.get(node.0).map(|data| &data.kind) {
            Some(NodeKind::Element(element)) => Some(element),
            _ => None,
        }
    }

    fn element_mut(&mut self, node: NodeId) -> Option<&mut Element> {
        match self.nodes.get_mut(node.0).map(|data| &mut data.kind) {
            Some(NodeKind::Element(element)) => Some(element),
            _ => None,
        }
    }
}

impl Markup for Document {
    fn tag(&self, node: NodeId) -> Option<&str> {
        self.element(node).map(|element| element.tag.as_str())
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        self.element(node)
            .and_then(|element| element.attributes.get(name))
            .map(String::as_str)
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(node.0).and_then(|data| data.parent)
    }

    fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.nodes
            .get(node.0)
            .map(|data| data.children.clone())
            .unwrap_or_default()
    }

    fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.element(node)
            .is_some_and(|element| element.classes.iter().any(|existing| existing == class))
    }

    fn add_class(&mut self, node: NodeId, class: &str) {
        if let Some(element) = self.element_mut(node)
            && !element.classes.iter().any(|existing| existing == class)
        {
            element.classes.push(class.to_string());
        }
    }

    fn remove_class(&mut self, node: NodeId, class: &str) {
        if let Some(element) = self.element_mut(node) {
            element.classes.retain(|existing| existing != class);
        }
    }

    fn remove(&mut self, node: NodeId) {
        let Some(parent) = self.parent(node) else {
            return;
        };
        self.nodes[parent.0].children.retain(|child| *child != node);
        self.nodes[node.0].parent = None;
    }

    fn insert_after(&mut self, anchor: NodeId, annotation: &Annotation) -> Option<NodeId> {
        let parent = self.parent(anchor)?;
        let position = self.nodes[parent.0]
            .children
            .iter()
            .position(|child| *child == anchor)
            .map(|index| index + 1);
        Some(self.build_annotation(parent, annotation, position))
    }

    fn append_child(&mut self, parent: NodeId, annotation: &Annotation) -> NodeId {
        self.build_annotation(parent, annotation, None)
    }
}

impl Display for Document {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_markup(self.root()))
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn annotation(text: &str) -> Annotation {
        Annotation {
            tag: "label".into(),
            classes: vec!["validationMessage".into()],
            attributes: vec![("data-validator-for".into(), "email".into())],
            text: text.into(),
        }
    }

    #[test]
    fn insert_after_places_annotation_as_next_sibling() {
        let mut doc = Document::new();
        let group = doc.append_element(doc.root(), "div", &[("class", "form-group")]);
        let input = doc.append_element(group, "input", &[("name", "email")]);
        let hint = doc.append_element(group, "small", &[]);

        let label = doc
            .insert_after(input, &annotation("Required"))
            .expect("input has a parent");
        assert_eq!(doc.children(group), vec![input, label, hint]);
        assert_eq!(doc.text_content(label), "Required");
        assert_eq!(
            doc.to_markup(group),
            "<div class=\"form-group\"><input name=\"email\"></input>\
             <label class=\"validationMessage\" data-validator-for=\"email\">Required</label>\
             <small></small></div>"
        );
    }

    #[test]
    fn insert_after_requires_a_parent() {
        let mut doc = Document::new();
        let root = doc.root();
        assert!(doc.insert_after(root, &annotation("x")).is_none());
    }

    #[test]
    fn remove_detaches_subtree() {
        let mut doc = Document::new();
        let outer = doc.append_element(doc.root(), "div", &[]);
        let inner = doc.append_element(outer, "span", &[]);
        let text = doc.append_text(inner, "hi");

        doc.remove(inner);
        assert!(doc.children(outer).is_empty());
        assert!(!doc.is_attached(inner));
        assert!(!doc.is_attached(text));
        assert!(doc.is_attached(outer));
        doc.remove(inner);
    }

    #[test]
    fn class_mutations_are_idempotent() {
        let mut doc = Document::new();
        let input = doc.append_element(doc.root(), "input", &[("class", "form-control")]);
        doc.add_class(input, "has-error");
        doc.add_class(input, "has-error");
        assert_eq!(doc.classes(input), ["form-control", "has-error"]);
        doc.remove_class(input, "has-error");
        doc.remove_class(input, "has-error");
        assert_eq!(doc.classes(input), ["form-control"]);
    }

    #[test]
    fn form_controls_and_closest() {
        let mut doc = Document::new();
        let form = doc.append_element(doc.root(), "form", &[("name", "signup")]);
        let row = doc.append_element(form, "div", &[("class", "row billing")]);
        let input = doc.append_element(row, "INPUT", &[("name", "card")]);
        let select = doc.append_element(form, "select", &[("name", "country")]);
        let button = doc.append_element(form, "button", &[]);
        doc.append_element(form, "span", &[]);

        assert_eq!(doc.form_controls(form), vec![input, select, button]);
        let billing = Selector::class("billing").expect("valid class");
        assert_eq!(doc.closest(input, &billing), Some(row));
        assert_eq!(doc.closest(select, &billing), None);
        assert_eq!(doc.find_by_name("country"), Some(select));
        assert_eq!(doc.query("input[name=card]").expect("valid"), vec![input]);
    }

    #[test]
    fn markup_escapes_text_and_attributes() {
        let mut doc = Document::new();
        let p = doc.append_element(doc.root(), "p", &[("title", "a\"b")]);
        doc.append_text(p, "<b> & co");
        assert_eq!(doc.to_string(), "<p title=\"a&quot;b\">&lt;b&gt; &amp; co</p>");
    }
}
