//! Working tree for a MusicXML document.
//!
//! Nodes live in a flat arena owned by [`Document`] and are addressed by
//! [`NodeId`]. Elements keep an ordered attribute list and an ordered list
//! of child ids; there are no parent links, so passes that need a parent
//! walk down from the root and carry it themselves. Detached nodes stay in
//! the arena until the document is dropped.
//!
//! Insertion and removal keep the surrounding indentation tidy: a new
//! element is given the same leading whitespace as its siblings, and a
//! removed element takes its leading whitespace with it.

/// Index of a node inside its [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// One node of the working tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
    Comment(String),
    ProcessingInstruction {
        target: String,
        value: Option<String>,
    },
}

/// An element: name, attributes in document order, children in document order.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<NodeId>,
}

/// A parsed MusicXML document.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    root: NodeId,
    /// Text before the root element (XML declaration, DOCTYPE, comments)
    prolog: String,
    /// Text after the root element
    epilog: String,
}

impl Document {
    /// Create a document holding a single empty root element.
    pub fn new(root_name: &str) -> Self {
        let mut doc = Self {
            nodes: Vec::new(),
            root: NodeId(0),
            prolog: String::new(),
            epilog: String::new(),
        };
        doc.root = doc.create_element(root_name);
        doc
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn prolog(&self) -> &str {
        &self.prolog
    }

    pub fn set_prolog(&mut self, prolog: &str) {
        self.prolog = prolog.to_string();
    }

    pub fn epilog(&self) -> &str {
        &self.epilog
    }

    pub fn set_epilog(&mut self, epilog: &str) {
        self.epilog = epilog.to_string();
    }

    // ─── Reading ─────────────────────────────────────────────────────────

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match &self.nodes[id.0] {
            Node::Element(element) => Some(element),
            _ => None,
        }
    }

    fn element_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        match &mut self.nodes[id.0] {
            Node::Element(element) => Some(element),
            _ => None,
        }
    }

    /// Element name, or `""` for non-element nodes.
    pub fn name(&self, id: NodeId) -> &str {
        self.element(id).map_or("", |e| e.name.as_str())
    }

    pub fn is(&self, id: NodeId, name: &str) -> bool {
        self.element(id).is_some_and(|e| e.name == name)
    }

    /// True for text nodes made only of whitespace.
    pub fn is_whitespace(&self, id: NodeId) -> bool {
        matches!(&self.nodes[id.0], Node::Text(t) if t.trim().is_empty())
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.element(id).map_or(&[], |e| e.children.as_slice())
    }

    pub fn child_elements(&self, id: NodeId) -> Vec<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .filter(|&c| self.element(c).is_some())
            .collect()
    }

    /// First child element with the given name.
    pub fn child(&self, id: NodeId, name: &str) -> Option<NodeId> {
        self.children(id).iter().copied().find(|&c| self.is(c, name))
    }

    pub fn children_named(&self, id: NodeId, name: &str) -> Vec<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .filter(|&c| self.is(c, name))
            .collect()
    }

    /// All descendant elements with the given name, in document order.
    pub fn descendants_named(&self, id: NodeId, name: &str) -> Vec<NodeId> {
        let mut found = Vec::new();
        self.collect_named(id, name, &mut found);
        found
    }

    fn collect_named(&self, id: NodeId, name: &str, found: &mut Vec<NodeId>) {
        for &child in self.children(id) {
            if self.is(child, name) {
                found.push(child);
            }
            self.collect_named(child, name, found);
        }
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id)?
            .attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Trimmed content of the first text child, if it is not empty.
    pub fn text(&self, id: NodeId) -> Option<&str> {
        self.children(id)
            .iter()
            .find_map(|&c| match &self.nodes[c.0] {
                Node::Text(t) => Some(t.trim()),
                _ => None,
            })
            .filter(|t| !t.is_empty())
    }

    pub fn child_text(&self, id: NodeId, name: &str) -> Option<&str> {
        self.text(self.child(id, name)?)
    }

    pub fn child_i32(&self, id: NodeId, name: &str) -> Option<i32> {
        self.child_text(id, name)?.parse().ok()
    }

    // ─── Building ────────────────────────────────────────────────────────

    pub(crate) fn push_node(&mut self, node: Node) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    pub fn create_element(&mut self, name: &str) -> NodeId {
        self.push_node(Node::Element(Element {
            name: name.to_string(),
            attributes: Vec::new(),
            children: Vec::new(),
        }))
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push_node(Node::Text(text.to_string()))
    }

    /// Create `<name>text</name>`.
    pub fn create_text_element(&mut self, name: &str, text: &str) -> NodeId {
        let id = self.create_element(name);
        let text = self.create_text(text);
        self.push_child(id, text);
        id
    }

    /// Copy a subtree into fresh arena slots and return the new root.
    pub fn deep_clone(&mut self, id: NodeId) -> NodeId {
        match self.nodes[id.0].clone() {
            Node::Element(mut element) => {
                let children: Vec<NodeId> =
                    element.children.iter().map(|&c| self.deep_clone(c)).collect();
                element.children = children;
                self.push_node(Node::Element(element))
            }
            other => self.push_node(other),
        }
    }

    // ─── Mutation ────────────────────────────────────────────────────────

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) {
        if let Some(element) = self.element_mut(id) {
            match element.attributes.iter_mut().find(|(k, _)| k == name) {
                Some((_, v)) => *v = value.to_string(),
                None => element
                    .attributes
                    .push((name.to_string(), value.to_string())),
            }
        }
    }

    pub fn remove_attr(&mut self, id: NodeId, name: &str) {
        if let Some(element) = self.element_mut(id) {
            element.attributes.retain(|(k, _)| k != name);
        }
    }

    /// Replace all children with a single text node.
    pub fn set_text(&mut self, id: NodeId, value: &str) {
        let text = self.create_text(value);
        if let Some(element) = self.element_mut(id) {
            element.children = vec![text];
        }
    }

    /// Append without any whitespace handling.
    pub(crate) fn push_child(&mut self, parent: NodeId, child: NodeId) {
        if let Some(element) = self.element_mut(parent) {
            element.children.push(child);
        }
    }

    fn position(&self, parent: NodeId, child: NodeId) -> Option<usize> {
        self.children(parent).iter().position(|&c| c == child)
    }

    /// Whitespace that precedes the first child element of `parent`.
    fn indent_of(&self, parent: NodeId) -> Option<String> {
        let children = self.children(parent);
        let first = children.iter().position(|&c| self.element(c).is_some())?;
        if first == 0 || !self.is_whitespace(children[first - 1]) {
            return None;
        }
        match &self.nodes[children[first - 1].0] {
            Node::Text(t) => Some(t.clone()),
            _ => None,
        }
    }

    fn splice(&mut self, parent: NodeId, at: usize, nodes: Vec<NodeId>) {
        if let Some(element) = self.element_mut(parent) {
            let at = at.min(element.children.len());
            element.children.splice(at..at, nodes);
        }
    }

    pub fn insert_before(&mut self, parent: NodeId, anchor: NodeId, child: NodeId) {
        let Some(pos) = self.position(parent, anchor) else {
            self.append(parent, child);
            return;
        };
        let nodes = match self.indent_of(parent) {
            Some(indent) => vec![child, self.create_text(&indent)],
            None => vec![child],
        };
        self.splice(parent, pos, nodes);
    }

    pub fn insert_after(&mut self, parent: NodeId, anchor: NodeId, child: NodeId) {
        let Some(pos) = self.position(parent, anchor) else {
            self.append(parent, child);
            return;
        };
        let nodes = match self.indent_of(parent) {
            Some(indent) => vec![self.create_text(&indent), child],
            None => vec![child],
        };
        self.splice(parent, pos + 1, nodes);
    }

    /// Append after the last non-whitespace child, matching sibling indentation.
    pub fn append(&mut self, parent: NodeId, child: NodeId) {
        let last = self
            .children(parent)
            .iter()
            .rev()
            .copied()
            .find(|&c| !self.is_whitespace(c));
        match last {
            Some(anchor) => self.insert_after(parent, anchor, child),
            None => self.push_child(parent, child),
        }
    }

    /// Insert `child` at its position within a schema sequence: before the
    /// first sibling element that `order` ranks later. Names missing from
    /// `order` rank last.
    pub fn insert_ordered(&mut self, parent: NodeId, child: NodeId, order: &[&str]) {
        let rank = |name: &str| {
            order
                .iter()
                .position(|n| *n == name)
                .unwrap_or(order.len())
        };
        let child_rank = rank(self.name(child));
        let anchor = self
            .children(parent)
            .iter()
            .copied()
            .find(|&c| self.element(c).is_some() && rank(self.name(c)) > child_rank);
        match anchor {
            Some(anchor) => self.insert_before(parent, anchor, child),
            None => self.append(parent, child),
        }
    }

    /// Detach `child` from `parent` along with its leading whitespace.
    pub fn remove(&mut self, parent: NodeId, child: NodeId) -> bool {
        let Some(pos) = self.position(parent, child) else {
            return false;
        };
        let drop_indent = pos > 0 && self.is_whitespace(self.children(parent)[pos - 1]);
        if let Some(element) = self.element_mut(parent) {
            element.children.remove(pos);
            if drop_indent {
                element.children.remove(pos - 1);
            }
        }
        true
    }

    /// Rebuild the child list of `parent` from `kept`, re-indenting each
    /// node the way the old first child was indented and keeping the
    /// trailing whitespace before the closing tag.
    pub fn replace_children(&mut self, parent: NodeId, kept: Vec<NodeId>) {
        let indent = self.indent_of(parent);
        let trailing = self
            .children(parent)
            .last()
            .copied()
            .filter(|&c| self.is_whitespace(c));

        let mut children = Vec::with_capacity(kept.len() * 2 + 1);
        for node in kept {
            if let Some(ws) = &indent {
                children.push(self.create_text(ws));
            }
            children.push(node);
        }
        if let Some(t) = trailing {
            children.push(t);
        }
        if let Some(element) = self.element_mut(parent) {
            element.children = children;
        }
    }
}
