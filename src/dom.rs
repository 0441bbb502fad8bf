//! Arena-backed content tree for page markup.
//!
//! The tree is parsed from markup bytes with `quick-xml`, mutated in place
//! by the fold and sweep passes, and serialized back to markup. Every
//! child-list change (append, insert, replace) is recorded in a mutation
//! journal so a [`MutationWatcher`](crate::watch::MutationWatcher) can
//! observe structural changes after the fact; attribute and character-data
//! edits are not journaled.
//!
//! # Usage
//!
//! ```rust
//! use ruby_fold::dom::Dom;
//!
//! # fn example() -> Result<(), ruby_fold::Error> {
//! let dom = Dom::parse(b"<div id=\"main\"><p>hello</p></div>")?;
//! let root = dom.root();
//! let para = dom.elements_named(root, "p")[0];
//! assert_eq!(dom.text_content(para), "hello");
//! # Ok(())
//! # }
//! ```

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::error::Error;

/// Limits enforced while parsing markup into a tree.
///
/// These bound what untrusted input can allocate at parse time. Nodes
/// built afterwards through [`Dom::create_element`] and friends come
/// from the caller's own code and are not limit-checked.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DomLimits {
    /// Maximum number of nodes produced by a parse.
    pub max_nodes: usize,
    /// Maximum element nesting depth.
    pub max_depth: usize,
    /// Maximum UTF-8 byte length for a single attribute value.
    pub max_attr_bytes: usize,
    /// Maximum UTF-8 byte length for a single text node.
    pub max_text_bytes: usize,
}

impl Default for DomLimits {
    fn default() -> Self {
        Self {
            max_nodes: 65536,
            max_depth: 256,
            max_attr_bytes: 4096,
            max_text_bytes: 64 * 1024,
        }
    }
}

impl DomLimits {
    /// Tighter preset for small fragments (tests, injected snippets).
    pub fn compact() -> Self {
        Self {
            max_nodes: 4096,
            max_depth: 64,
            max_attr_bytes: 1024,
            max_text_bytes: 8 * 1024,
        }
    }
}

/// Handle to a node in a [`Dom`] arena.
///
/// Handles stay valid for the lifetime of the tree; a replaced node keeps
/// its handle but becomes detached (no parent, unreachable from the root).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// Kind of child-list change recorded in the mutation journal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MutationKind {
    /// A node was added to the target's child list.
    Added,
    /// A node was removed from the target's child list.
    Removed,
}

/// One child-list change. `target` is the parent whose children changed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MutationRecord {
    /// Parent node whose child list changed.
    pub target: NodeId,
    /// Whether a child was added or removed.
    pub kind: MutationKind,
}

#[derive(Clone, Debug)]
enum NodeData {
    Element {
        name: String,
        attrs: Vec<(String, String)>,
    },
    Text(String),
}

#[derive(Clone, Debug)]
struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    data: NodeData,
}

/// An in-memory content tree with a child-list mutation journal.
#[derive(Clone, Debug)]
pub struct Dom {
    nodes: Vec<Node>,
    root: NodeId,
    revision: u64,
    journal: Vec<MutationRecord>,
}

impl Default for Dom {
    fn default() -> Self {
        Self::new()
    }
}

impl Dom {
    /// Create an empty tree containing only the synthetic document root.
    pub fn new() -> Self {
        let root_node = Node {
            parent: None,
            children: Vec::with_capacity(8),
            data: NodeData::Element {
                name: "#document".into(),
                attrs: Vec::new(),
            },
        };
        Self {
            nodes: vec![root_node],
            root: NodeId(0),
            revision: 0,
            journal: Vec::new(),
        }
    }

    /// Parse markup bytes into a tree with default limits.
    pub fn parse(content: &[u8]) -> Result<Self, Error> {
        Self::parse_with_limits(content, DomLimits::default())
    }

    /// Parse markup bytes into a tree with explicit limits.
    ///
    /// Parsing is lenient about end-tag names (real pages are not always
    /// well-formed XML) and preserves text content verbatim, entities
    /// resolved. Comments, processing instructions, and doctypes are
    /// dropped.
    pub fn parse_with_limits(content: &[u8], limits: DomLimits) -> Result<Self, Error> {
        let mut reader = Reader::from_reader(content);
        reader.config_mut().check_end_names = false;
        reader.config_mut().allow_unmatched_ends = true;

        let mut dom = Dom::new();
        let mut stack: Vec<NodeId> = Vec::with_capacity(8);
        let mut buf = Vec::with_capacity(8);

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => {
                    if stack.len() >= limits.max_depth {
                        return Err(Error::Dom(format!(
                            "element nesting exceeds max_depth ({} > {})",
                            stack.len() + 1,
                            limits.max_depth
                        )));
                    }
                    let id = dom.element_from_start(&reader, &e, &limits)?;
                    let parent = stack.last().copied().unwrap_or(dom.root);
                    dom.append_child(parent, id);
                    stack.push(id);
                }
                Ok(Event::Empty(e)) => {
                    let id = dom.element_from_start(&reader, &e, &limits)?;
                    let parent = stack.last().copied().unwrap_or(dom.root);
                    dom.append_child(parent, id);
                }
                Ok(Event::End(e)) => {
                    // Close only a matching open element; a stray end tag
                    // must not pop something still open above it.
                    let name = e.name();
                    let tag = reader.decoder().decode(name.as_ref()).unwrap_or_default();
                    if let Some(&top) = stack.last() {
                        if dom.name(top) == Some(tag.as_ref()) {
                            stack.pop();
                        }
                    }
                }
                Ok(Event::Text(e)) => {
                    let text = e.decode().unwrap_or_default();
                    if !text.is_empty() {
                        dom.text_from_parse(text.into_owned(), &stack, &limits)?;
                    }
                }
                Ok(Event::GeneralRef(e)) => {
                    // Entity references arrive as their own events; resolve
                    // them (named and numeric) back into character data, or
                    // keep the literal reference when unknown.
                    let name = e.decode().unwrap_or_default();
                    let entity = format!("&{};", name);
                    let text = match quick_xml::escape::unescape(&entity) {
                        Ok(resolved) => resolved.into_owned(),
                        Err(_) => entity,
                    };
                    dom.text_from_parse(text, &stack, &limits)?;
                }
                Ok(Event::CData(e)) => {
                    let text = reader.decoder().decode(&e).unwrap_or_default();
                    if !text.is_empty() {
                        dom.text_from_parse(text.into_owned(), &stack, &limits)?;
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(Error::Dom(format!("markup parse error: {:?}", e))),
                _ => {}
            }
            buf.clear();
        }

        Ok(dom)
    }

    fn element_from_start(
        &mut self,
        reader: &Reader<&[u8]>,
        e: &BytesStart<'_>,
        limits: &DomLimits,
    ) -> Result<NodeId, Error> {
        if self.nodes.len() >= limits.max_nodes {
            return Err(Error::Dom(format!(
                "node count exceeds max_nodes ({} > {})",
                self.nodes.len() + 1,
                limits.max_nodes
            )));
        }
        let name = reader
            .decoder()
            .decode(e.name().as_ref())
            .unwrap_or_default()
            .into_owned();
        let mut attrs = Vec::new();
        for attr in e.attributes().flatten() {
            let key = reader
                .decoder()
                .decode(attr.key.as_ref())
                .unwrap_or_default()
                .into_owned();
            let raw = reader.decoder().decode(&attr.value).unwrap_or_default();
            let value = match quick_xml::escape::unescape(raw.as_ref()) {
                Ok(resolved) => resolved.into_owned(),
                Err(_) => raw.into_owned(),
            };
            if value.len() > limits.max_attr_bytes {
                return Err(Error::Dom(format!(
                    "attribute value exceeds max_attr_bytes ({} > {})",
                    value.len(),
                    limits.max_attr_bytes
                )));
            }
            attrs.push((key, value));
        }
        Ok(self.push_node(NodeData::Element { name, attrs }))
    }

    fn text_from_parse(
        &mut self,
        text: String,
        stack: &[NodeId],
        limits: &DomLimits,
    ) -> Result<(), Error> {
        let parent = stack.last().copied().unwrap_or(self.root);
        // Coalesce with a preceding text sibling so entity references do
        // not fragment runs of character data.
        if let Some(&last) = self.nodes[parent.0].children.last() {
            if let NodeData::Text(existing) = &mut self.nodes[last.0].data {
                if existing.len() + text.len() > limits.max_text_bytes {
                    return Err(Error::Dom(format!(
                        "text node exceeds max_text_bytes ({} > {})",
                        existing.len() + text.len(),
                        limits.max_text_bytes
                    )));
                }
                existing.push_str(&text);
                return Ok(());
            }
        }
        if self.nodes.len() >= limits.max_nodes {
            return Err(Error::Dom(format!(
                "node count exceeds max_nodes ({} > {})",
                self.nodes.len() + 1,
                limits.max_nodes
            )));
        }
        if text.len() > limits.max_text_bytes {
            return Err(Error::Dom(format!(
                "text node exceeds max_text_bytes ({} > {})",
                text.len(),
                limits.max_text_bytes
            )));
        }
        let id = self.push_node(NodeData::Text(text));
        self.append_child(parent, id);
        Ok(())
    }

    fn push_node(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent: None,
            children: Vec::new(),
            data,
        });
        id
    }

    fn record(&mut self, target: NodeId, kind: MutationKind) {
        self.journal.push(MutationRecord { target, kind });
        self.revision += 1;
    }

    /// Synthetic document root.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Total number of nodes ever allocated, including detached ones.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when the tree holds only the document root.
    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    /// Monotonic counter bumped on every child-list change.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// All child-list changes since the tree was created, oldest first.
    pub fn journal(&self) -> &[MutationRecord] {
        &self.journal
    }

    /// Number of journal entries; used as a watcher cursor.
    pub fn journal_len(&self) -> usize {
        self.journal.len()
    }

    /// Create a detached element node.
    pub fn create_element(&mut self, name: &str) -> NodeId {
        self.push_node(NodeData::Element {
            name: name.into(),
            attrs: Vec::new(),
        })
    }

    /// Create a detached element node with attributes in order.
    pub fn create_element_with_attrs(&mut self, name: &str, attrs: &[(&str, &str)]) -> NodeId {
        self.push_node(NodeData::Element {
            name: name.into(),
            attrs: attrs
                .iter()
                .map(|(k, v)| ((*k).into(), (*v).into()))
                .collect(),
        })
    }

    /// Create a detached text node.
    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.push_node(NodeData::Text(text.into()))
    }

    /// Append a detached node to `parent`'s child list.
    ///
    /// Returns `false` (and leaves the tree unchanged) if `child` is
    /// already attached or the append would create a cycle.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> bool {
        if parent == child
            || self.nodes[child.0].parent.is_some()
            || self.is_descendant_of(parent, child)
        {
            return false;
        }
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
        self.record(parent, MutationKind::Added);
        true
    }

    /// Insert a detached node immediately before `anchor` in its parent.
    ///
    /// Returns `false` if `anchor` is detached, `node` is attached, or the
    /// insert would create a cycle.
    pub fn insert_before(&mut self, anchor: NodeId, node: NodeId) -> bool {
        self.insert_at(anchor, node, 0)
    }

    /// Insert a detached node immediately after `anchor` in its parent.
    pub fn insert_after(&mut self, anchor: NodeId, node: NodeId) -> bool {
        self.insert_at(anchor, node, 1)
    }

    fn insert_at(&mut self, anchor: NodeId, node: NodeId, offset: usize) -> bool {
        let Some(parent) = self.nodes[anchor.0].parent else {
            return false;
        };
        if parent == node
            || node == anchor
            || self.nodes[node.0].parent.is_some()
            || self.is_descendant_of(parent, node)
        {
            return false;
        }
        let Some(pos) = self.nodes[parent.0].children.iter().position(|&c| c == anchor) else {
            return false;
        };
        self.nodes[node.0].parent = Some(parent);
        self.nodes[parent.0].children.insert(pos + offset, node);
        self.record(parent, MutationKind::Added);
        true
    }

    /// Replace an attached node with a fresh text node holding `text`.
    ///
    /// The replaced node keeps its handle but is detached, subtree intact.
    /// Returns the new text node, or `None` if `target` had no parent.
    pub fn replace_with_text(&mut self, target: NodeId, text: impl Into<String>) -> Option<NodeId> {
        let parent = self.nodes[target.0].parent?;
        let pos = self.nodes[parent.0]
            .children
            .iter()
            .position(|&c| c == target)?;
        let new_id = self.push_node(NodeData::Text(text.into()));
        self.nodes[new_id.0].parent = Some(parent);
        self.nodes[parent.0].children[pos] = new_id;
        self.nodes[target.0].parent = None;
        self.record(parent, MutationKind::Removed);
        self.record(parent, MutationKind::Added);
        Some(new_id)
    }

    /// Element name, or `None` for text nodes.
    pub fn name(&self, id: NodeId) -> Option<&str> {
        match &self.nodes[id.0].data {
            NodeData::Element { name, .. } => Some(name),
            NodeData::Text(_) => None,
        }
    }

    /// Character data of a text node, or `None` for elements.
    pub fn text(&self, id: NodeId) -> Option<&str> {
        match &self.nodes[id.0].data {
            NodeData::Text(t) => Some(t),
            NodeData::Element { .. } => None,
        }
    }

    /// Replace the character data of a text node in place (not journaled,
    /// matching child-list-only observation). Returns `false` on elements.
    pub fn set_text(&mut self, id: NodeId, text: impl Into<String>) -> bool {
        match &mut self.nodes[id.0].data {
            NodeData::Text(t) => {
                *t = text.into();
                true
            }
            NodeData::Element { .. } => false,
        }
    }

    /// Attribute value on an element, or `None` if absent or a text node.
    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        match &self.nodes[id.0].data {
            NodeData::Element { attrs, .. } => attrs
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.as_str()),
            NodeData::Text(_) => None,
        }
    }

    /// Set (or overwrite) an attribute on an element. No-op on text nodes.
    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) {
        if let NodeData::Element { attrs, .. } = &mut self.nodes[id.0].data {
            match attrs.iter_mut().find(|(k, _)| k == name) {
                Some(slot) => slot.1 = value.into(),
                None => attrs.push((name.into(), value.into())),
            }
        }
    }

    /// Remove an attribute from an element if present.
    pub fn remove_attr(&mut self, id: NodeId, name: &str) {
        if let NodeData::Element { attrs, .. } = &mut self.nodes[id.0].data {
            attrs.retain(|(k, _)| k != name);
        }
    }

    /// Parent of a node, `None` for the root and detached nodes.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    /// Child list of a node in document order.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// True when `node` is strictly below `ancestor`.
    pub fn is_descendant_of(&self, node: NodeId, ancestor: NodeId) -> bool {
        let mut cursor = self.nodes[node.0].parent;
        while let Some(id) = cursor {
            if id == ancestor {
                return true;
            }
            cursor = self.nodes[id.0].parent;
        }
        false
    }

    /// All nodes strictly below `root`, in document (pre-)order.
    pub fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::with_capacity(8);
        let mut stack: Vec<NodeId> = self.nodes[root.0].children.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.nodes[id.0].children.iter().rev().copied());
        }
        out
    }

    /// Concatenated text of `id` and everything below it, document order.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        if let Some(t) = self.text(id) {
            out.push_str(t);
        }
        for child in self.descendants(id) {
            if let Some(t) = self.text(child) {
                out.push_str(t);
            }
        }
        out
    }

    /// All elements named `name` strictly below `root`, document order.
    pub fn elements_named(&self, root: NodeId, name: &str) -> Vec<NodeId> {
        self.descendants(root)
            .into_iter()
            .filter(|&id| self.name(id) == Some(name))
            .collect()
    }

    /// First element below `root` with the given name and attribute value.
    pub fn find_element_with_attr(
        &self,
        root: NodeId,
        name: &str,
        attr: &str,
        value: &str,
    ) -> Option<NodeId> {
        self.descendants(root)
            .into_iter()
            .find(|&id| self.name(id) == Some(name) && self.attr(id, attr) == Some(value))
    }

    /// First element below `root` whose `id` attribute equals `id_value`.
    pub fn element_by_id(&self, root: NodeId, id_value: &str) -> Option<NodeId> {
        self.descendants(root)
            .into_iter()
            .find(|&id| self.name(id).is_some() && self.attr(id, "id") == Some(id_value))
    }

    /// Serialize the tree back to markup. Childless elements self-close.
    pub fn to_markup(&self) -> String {
        let mut out = String::new();
        for &child in &self.nodes[self.root.0].children {
            self.write_node(child, &mut out);
        }
        out
    }

    fn write_node(&self, id: NodeId, out: &mut String) {
        match &self.nodes[id.0].data {
            NodeData::Text(t) => escape_text(t, out),
            NodeData::Element { name, attrs } => {
                out.push('<');
                out.push_str(name);
                for (k, v) in attrs {
                    out.push(' ');
                    out.push_str(k);
                    out.push_str("=\"");
                    escape_attr(v, out);
                    out.push('"');
                }
                let children = &self.nodes[id.0].children;
                if children.is_empty() {
                    out.push_str("/>");
                } else {
                    out.push('>');
                    for &child in children {
                        self.write_node(child, out);
                    }
                    out.push_str("</");
                    out.push_str(name);
                    out.push('>');
                }
            }
        }
    }
}

fn escape_text(raw: &str, out: &mut String) {
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
}

fn escape_attr(raw: &str, out: &mut String) {
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
}
