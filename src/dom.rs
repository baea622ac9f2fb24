use std::collections::BTreeMap;
use std::fmt::Write as _;

use crate::selector::SelectorList;
use crate::{Error, Result};

/// Handle to a node inside one [`Page`](crate::Page).
///
/// Handles are plain indices; a handle stays valid for the lifetime of its page,
/// even after the node is detached from the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

const DOCUMENT: NodeId = NodeId(0);

#[derive(Debug, Clone)]
pub(crate) struct ElementData {
    pub(crate) tag: String,
    /// Sorted, so dumps are stable.
    pub(crate) attrs: BTreeMap<String, String>,
}

impl ElementData {
    pub(crate) fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    pub(crate) fn has_class(&self, class_name: &str) -> bool {
        self.attr("class")
            .is_some_and(|classes| classes.split_whitespace().any(|c| c == class_name))
    }

    fn is_disabled(&self) -> bool {
        self.attrs.contains_key("disabled")
    }

    /// Rewrites the class attribute through `edit`; an empty list drops it.
    fn edit_classes(&mut self, edit: impl FnOnce(&mut Vec<String>)) {
        let mut classes: Vec<String> = self
            .attr("class")
            .unwrap_or_default()
            .split_whitespace()
            .map(str::to_owned)
            .collect();
        edit(&mut classes);
        if classes.is_empty() {
            self.attrs.remove("class");
        } else {
            self.attrs.insert("class".into(), classes.join(" "));
        }
    }
}

#[derive(Debug, Clone)]
enum NodeKind {
    Document,
    Element(ElementData),
    Text(String),
}

#[derive(Debug, Clone)]
struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    kind: NodeKind,
}

/// Node arena. Node 0 is the document; nothing is ever freed, so detached
/// subtrees keep their handles.
#[derive(Debug, Clone)]
pub(crate) struct Dom {
    nodes: Vec<Node>,
}

impl Dom {
    pub(crate) fn new() -> Self {
        Self {
            nodes: vec![Node {
                parent: None,
                children: Vec::new(),
                kind: NodeKind::Document,
            }],
        }
    }

    pub(crate) fn root(&self) -> NodeId {
        DOCUMENT
    }

    #[cfg(test)]
    pub(crate) fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn is_valid_node(&self, node: NodeId) -> bool {
        node.0 < self.nodes.len()
    }

    fn push(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent: None,
            children: Vec::new(),
            kind,
        });
        id
    }

    pub(crate) fn create_element(&mut self, tag: &str) -> NodeId {
        self.push(NodeKind::Element(ElementData {
            tag: tag.to_ascii_lowercase(),
            attrs: BTreeMap::new(),
        }))
    }

    /// Parser entry point: the element is attached to `parent` directly.
    pub(crate) fn append_element(
        &mut self,
        parent: NodeId,
        tag: &str,
        attrs: BTreeMap<String, String>,
    ) -> NodeId {
        let id = self.push(NodeKind::Element(ElementData {
            tag: tag.to_ascii_lowercase(),
            attrs,
        }));
        self.attach(parent, id);
        id
    }

    pub(crate) fn append_text(&mut self, parent: NodeId, text: String) -> NodeId {
        let id = self.push(NodeKind::Text(text));
        self.attach(parent, id);
        id
    }

    fn attach(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    pub(crate) fn element(&self, node: NodeId) -> Option<&ElementData> {
        match &self.nodes.get(node.0)?.kind {
            NodeKind::Element(element) => Some(element),
            _ => None,
        }
    }

    fn element_mut(&mut self, node: NodeId, op: &str) -> Result<&mut ElementData> {
        match self.nodes.get_mut(node.0).map(|n| &mut n.kind) {
            Some(NodeKind::Element(element)) => Ok(element),
            _ => Err(Error::InvalidNode(format!(
                "{op} needs an element, got node {}",
                node.0
            ))),
        }
    }

    pub(crate) fn tag_name(&self, node: NodeId) -> Option<&str> {
        self.element(node).map(|e| e.tag.as_str())
    }

    pub(crate) fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(node.0)?.parent
    }

    /// Strict ancestors, nearest first.
    pub(crate) fn ancestors(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(node), |current| self.parent(*current))
    }

    /// Strict descendants in document order.
    pub(crate) fn descendants(&self, node: NodeId) -> Descendants<'_> {
        let mut stack = self
            .nodes
            .get(node.0)
            .map(|n| n.children.clone())
            .unwrap_or_default();
        stack.reverse();
        Descendants { dom: self, stack }
    }

    pub(crate) fn is_connected(&self, node: NodeId) -> bool {
        self.is_valid_node(node)
            && (node == DOCUMENT || self.ancestors(node).any(|a| a == DOCUMENT))
    }

    pub(crate) fn is_descendant_of(&self, node: NodeId, ancestor: NodeId) -> bool {
        self.ancestors(node).any(|a| a == ancestor)
    }

    pub(crate) fn text_content(&self, node: NodeId) -> String {
        match self.nodes.get(node.0).map(|n| &n.kind) {
            Some(NodeKind::Text(text)) => text.clone(),
            Some(_) => self
                .descendants(node)
                .filter_map(|n| match &self.nodes[n.0].kind {
                    NodeKind::Text(text) => Some(text.as_str()),
                    _ => None,
                })
                .collect(),
            None => String::new(),
        }
    }

    /// Replaces the element's content with one text node. The first existing
    /// text child is rewritten in place, so repeated writes never grow the arena.
    pub(crate) fn set_text_content(&mut self, node: NodeId, value: &str) -> Result<()> {
        self.element_mut(node, "set_text")?;
        let children = std::mem::take(&mut self.nodes[node.0].children);
        let reused = children
            .iter()
            .copied()
            .find(|child| matches!(self.nodes[child.0].kind, NodeKind::Text(_)));
        for child in children.iter().filter(|child| Some(**child) != reused) {
            self.nodes[child.0].parent = None;
        }
        match reused {
            Some(text_node) => {
                self.nodes[text_node.0].kind = NodeKind::Text(value.to_string());
                self.nodes[node.0].children.push(text_node);
            }
            None => {
                self.append_text(node, value.to_string());
            }
        }
        Ok(())
    }

    pub(crate) fn attr(&self, node: NodeId, name: &str) -> Option<String> {
        self.element(node)?
            .attr(&name.to_ascii_lowercase())
            .map(str::to_owned)
    }

    pub(crate) fn set_attr(&mut self, node: NodeId, name: &str, value: &str) -> Result<()> {
        self.element_mut(node, "set_attr")?
            .attrs
            .insert(name.to_ascii_lowercase(), value.to_string());
        Ok(())
    }

    pub(crate) fn disabled(&self, node: NodeId) -> bool {
        self.element(node).is_some_and(ElementData::is_disabled)
    }

    pub(crate) fn has_class(&self, node: NodeId, class_name: &str) -> bool {
        self.element(node).is_some_and(|e| e.has_class(class_name))
    }

    pub(crate) fn add_class(&mut self, node: NodeId, class_name: &str) -> Result<()> {
        self.element_mut(node, "add_class")?.edit_classes(|classes| {
            if !classes.iter().any(|c| c == class_name) {
                classes.push(class_name.to_string());
            }
        });
        Ok(())
    }

    pub(crate) fn remove_class(&mut self, node: NodeId, class_name: &str) -> Result<()> {
        self.element_mut(node, "remove_class")?
            .edit_classes(|classes| classes.retain(|c| c != class_name));
        Ok(())
    }

    /// Inline style lookup. `property` may be camelCase or kebab-case.
    pub(crate) fn style(&self, node: NodeId, property: &str) -> Result<String> {
        let element = self.element(node).ok_or_else(|| {
            Error::InvalidNode(format!("style needs an element, got node {}", node.0))
        })?;
        let wanted = css_property_name(property);
        Ok(StyleDecls::parse(element.attr("style"))
            .get(&wanted)
            .unwrap_or_default()
            .to_string())
    }

    /// Sets one inline declaration; an empty value removes it.
    pub(crate) fn set_style(&mut self, node: NodeId, property: &str, value: &str) -> Result<()> {
        let element = self.element_mut(node, "set_style")?;
        let mut decls = StyleDecls::parse(element.attr("style"));
        decls.set(css_property_name(property), value.trim());
        match decls.serialize() {
            Some(style) => element.attrs.insert("style".into(), style),
            None => element.attrs.remove("style"),
        };
        Ok(())
    }

    pub(crate) fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        let parent_ok = matches!(
            self.nodes.get(parent.0).map(|n| &n.kind),
            Some(NodeKind::Document | NodeKind::Element(_))
        );
        if !parent_ok {
            return Err(Error::InvalidNode(format!(
                "node {} cannot have children",
                parent.0
            )));
        }
        if !self.is_valid_node(child) || child == DOCUMENT {
            return Err(Error::InvalidNode(format!("node {} cannot be appended", child.0)));
        }
        if child == parent || self.is_descendant_of(parent, child) {
            return Err(Error::InvalidNode(format!(
                "appending node {} under node {} would create a cycle",
                child.0, parent.0
            )));
        }
        self.detach(child);
        self.attach(parent, child);
        Ok(())
    }

    /// Unlinks `node` from its parent. Detached nodes are left as they are.
    pub(crate) fn detach(&mut self, node: NodeId) {
        if let Some(parent) = self.nodes.get_mut(node.0).and_then(|n| n.parent.take()) {
            self.nodes[parent.0].children.retain(|c| *c != node);
        }
    }

    /// Elements under `scope` matched by `selectors`, in document order.
    pub(crate) fn select<'a>(
        &'a self,
        scope: NodeId,
        selectors: &'a SelectorList,
    ) -> impl Iterator<Item = NodeId> + 'a {
        self.descendants(scope)
            .filter(move |node| selectors.matches(self, *node))
    }

    /// `node` itself or its nearest ancestor matched by `selectors`.
    pub(crate) fn closest(&self, node: NodeId, selectors: &SelectorList) -> Option<NodeId> {
        std::iter::once(node)
            .chain(self.ancestors(node))
            .find(|candidate| selectors.matches(self, *candidate))
    }

    /// Enabled, connected elements under `container` matched by `selectors`.
    pub(crate) fn focusable_within(
        &self,
        container: NodeId,
        selectors: &SelectorList,
    ) -> Vec<NodeId> {
        self.select(container, selectors)
            .filter(|node| !self.disabled(*node) && self.is_connected(*node))
            .collect()
    }

    pub(crate) fn outer_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.write_html(node, &mut out);
        out
    }

    fn write_html(&self, node: NodeId, out: &mut String) {
        let Some(entry) = self.nodes.get(node.0) else {
            return;
        };
        match &entry.kind {
            NodeKind::Text(text) => out.push_str(text),
            NodeKind::Document => {
                for child in &entry.children {
                    self.write_html(*child, out);
                }
            }
            NodeKind::Element(element) => {
                out.push('<');
                out.push_str(&element.tag);
                for (name, value) in &element.attrs {
                    let _ = write!(out, " {name}=\"{value}\"");
                }
                out.push('>');
                for child in &entry.children {
                    self.write_html(*child, out);
                }
                let _ = write!(out, "</{}>", element.tag);
            }
        }
    }
}

/// Pre-order walk below a node: elements and text, never the document.
pub(crate) struct Descendants<'a> {
    dom: &'a Dom,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        while let Some(node) = self.stack.pop() {
            let entry = &self.dom.nodes[node.0];
            self.stack.extend(entry.children.iter().rev());
            if !matches!(entry.kind, NodeKind::Document) {
                return Some(node);
            }
        }
        None
    }
}

/// `animationPlayState` and `animation-play-state` both become the latter.
fn css_property_name(property: &str) -> String {
    property
        .chars()
        .flat_map(|ch| {
            let dash = ch.is_ascii_uppercase().then_some('-');
            dash.into_iter().chain(std::iter::once(ch.to_ascii_lowercase()))
        })
        .collect()
}

/// Ordered inline declarations. A later duplicate overwrites the value but keeps
/// the first position.
struct StyleDecls(Vec<(String, String)>);

impl StyleDecls {
    fn parse(style: Option<&str>) -> Self {
        let mut decls = Self(Vec::new());
        for (name, value) in style
            .unwrap_or_default()
            .split(';')
            .filter_map(|decl| decl.split_once(':'))
        {
            let name = name.trim().to_ascii_lowercase();
            if !name.is_empty() {
                decls.set(name, value.trim());
            }
        }
        decls
    }

    fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(prop, _)| prop == name)
            .map(|(_, value)| value.as_str())
    }

    fn set(&mut self, name: String, value: &str) {
        let pos = self.0.iter().position(|(prop, _)| *prop == name);
        match pos {
            Some(pos) if value.is_empty() => {
                self.0.remove(pos);
            }
            Some(pos) => self.0[pos].1 = value.to_string(),
            None if !value.is_empty() => self.0.push((name, value.to_string())),
            None => {}
        }
    }

    fn serialize(&self) -> Option<String> {
        if self.0.is_empty() {
            return None;
        }
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|(name, value)| format!("{name}: {value};"))
            .collect();
        Some(parts.join(" "))
    }
}
