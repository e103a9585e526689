//! Arena-backed document tree.
//!
//! Nodes never move and are never freed while the document lives, so a
//! [`NodeId`] stays valid (and keeps its identity) across removal and
//! re-insertion.

use std::fmt;

use compact_str::CompactString;
use smallvec::{smallvec, SmallVec};

use crate::error::{HideError, HideResult};

use super::mutation::MutationRecord;
use super::selector::SelectorList;

// =============================================================================
// NodeId
// =============================================================================

/// Stable handle of a node inside a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn as_raw(self) -> u32 {
        self.0
    }

    #[inline]
    fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// =============================================================================
// Node data
// =============================================================================

/// Element attributes as ordered key-value pairs.
pub type Attrs = SmallVec<[(CompactString, CompactString); 4]>;

/// Tag name plus attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementData {
    /// Lowercase tag name
    pub tag: CompactString,
    pub attrs: Attrs,
}

impl ElementData {
    /// Get attribute value by name
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attrs.iter().any(|(k, _)| k == name)
    }

    /// Whitespace-separated class list
    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.attr("class").unwrap_or("").split_ascii_whitespace()
    }
}

/// What a node is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Document,
    Element(ElementData),
    Text(CompactString),
    /// Root of a shadow tree attached to `host`.
    ShadowRoot { host: NodeId },
}

#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: SmallVec<[NodeId; 8]>,
    shadow_root: Option<NodeId>,
}

impl NodeData {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            parent: None,
            children: SmallVec::new(),
            shadow_root: None,
        }
    }
}

// =============================================================================
// Document
// =============================================================================

/// A mutable DOM tree that records its own mutations.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<NodeData>,
    records: Vec<MutationRecord>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create an empty document.
    pub fn new() -> Self {
        Self {
            nodes: vec![NodeData::new(NodeKind::Document)],
            records: Vec::new(),
        }
    }

    /// The document node.
    #[inline]
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Total number of nodes ever created.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    fn node(&self, id: NodeId) -> HideResult<&NodeData> {
        self.nodes.get(id.index()).ok_or(HideError::UnknownNode(id.0))
    }

    fn node_mut(&mut self, id: NodeId) -> HideResult<&mut NodeData> {
        self.nodes.get_mut(id.index()).ok_or(HideError::UnknownNode(id.0))
    }

    fn push(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(NodeData::new(kind));
        id
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Construction
    // ─────────────────────────────────────────────────────────────────────────

    /// Create a detached element.
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.push(NodeKind::Element(ElementData {
            tag: CompactString::from(tag.to_ascii_lowercase()),
            attrs: Attrs::new(),
        }))
    }

    /// Create a detached text node.
    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push(NodeKind::Text(text.into()))
    }

    /// Attach a shadow root to `host`, or return the existing one.
    pub fn attach_shadow(&mut self, host: NodeId) -> HideResult<NodeId> {
        if let Some(existing) = self.node(host)?.shadow_root {
            return Ok(existing);
        }
        let shadow = self.push(NodeKind::ShadowRoot { host });
        self.node_mut(host)?.shadow_root = Some(shadow);
        Ok(shadow)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Tree mutation
    // ─────────────────────────────────────────────────────────────────────────

    /// Append `child` to `parent`, detaching it from its old parent first.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> HideResult<()> {
        self.node(parent)?;
        if matches!(self.node(child)?.kind, NodeKind::Document | NodeKind::ShadowRoot { .. }) {
            return Err(HideError::UnknownNode(child.0));
        }
        if self.is_inclusive_ancestor(child, parent) {
            return Err(HideError::HierarchyRequest {
                parent: parent.0,
                child: child.0,
            });
        }
        if self.node(child)?.parent.is_some() {
            self.remove(child)?;
        }
        self.node_mut(parent)?.children.push(child);
        self.node_mut(child)?.parent = Some(parent);
        self.records.push(MutationRecord::ChildList {
            target: parent,
            added: smallvec![child],
            removed: SmallVec::new(),
        });
        Ok(())
    }

    /// Detach `node` from its parent. The node keeps its id and subtree.
    pub fn remove(&mut self, node: NodeId) -> HideResult<()> {
        let Some(parent) = self.node(node)?.parent else {
            return Ok(());
        };
        self.node_mut(parent)?.children.retain(|c| *c != node);
        self.node_mut(node)?.parent = None;
        self.records.push(MutationRecord::ChildList {
            target: parent,
            added: SmallVec::new(),
            removed: smallvec![node],
        });
        Ok(())
    }

    /// Set attribute value (update if exists, add if not).
    ///
    /// Records a mutation even when the value is unchanged, as browsers do.
    pub fn set_attr(&mut self, node: NodeId, name: &str, value: &str) -> HideResult<()> {
        let NodeKind::Element(elem) = &mut self.node_mut(node)?.kind else {
            return Err(HideError::UnknownNode(node.0));
        };
        let old_value = match elem.attrs.iter_mut().find(|(k, _)| k == name) {
            Some(attr) => Some(std::mem::replace(&mut attr.1, value.into())),
            None => {
                elem.attrs.push((name.into(), value.into()));
                None
            }
        };
        self.records.push(MutationRecord::Attribute {
            target: node,
            name: name.into(),
            old_value,
        });
        Ok(())
    }

    /// Remove attribute by name, returning the old value if it existed.
    pub fn remove_attr(&mut self, node: NodeId, name: &str) -> HideResult<Option<CompactString>> {
        let NodeKind::Element(elem) = &mut self.node_mut(node)?.kind else {
            return Err(HideError::UnknownNode(node.0));
        };
        let Some(pos) = elem.attrs.iter().position(|(k, _)| k == name) else {
            return Ok(None);
        };
        let (_, old) = elem.attrs.remove(pos);
        self.records.push(MutationRecord::Attribute {
            target: node,
            name: name.into(),
            old_value: Some(old.clone()),
        });
        Ok(Some(old))
    }

    /// Drain pending mutation records.
    pub fn take_records(&mut self) -> Vec<MutationRecord> {
        std::mem::take(&mut self.records)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────────

    pub fn kind(&self, node: NodeId) -> Option<&NodeKind> {
        self.nodes.get(node.index()).map(|n| &n.kind)
    }

    pub fn element(&self, node: NodeId) -> Option<&ElementData> {
        match self.kind(node)? {
            NodeKind::Element(elem) => Some(elem),
            _ => None,
        }
    }

    pub fn is_element(&self, node: NodeId) -> bool {
        self.element(node).is_some()
    }

    pub fn tag(&self, node: NodeId) -> Option<&str> {
        self.element(node).map(|e| e.tag.as_str())
    }

    pub fn attr(&self, node: NodeId, name: &str) -> Option<&str> {
        self.element(node)?.attr(name)
    }

    /// Parent node. Shadow roots have no parent, see [`Document::host`].
    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(node.index())?.parent
    }

    /// Host element of a shadow root.
    pub fn host(&self, node: NodeId) -> Option<NodeId> {
        match self.kind(node)? {
            NodeKind::ShadowRoot { host } => Some(*host),
            _ => None,
        }
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        self.nodes
            .get(node.index())
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn shadow_root(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(node.index())?.shadow_root
    }

    /// Nearest shadow root containing `node`, if any.
    pub fn containing_shadow_root(&self, node: NodeId) -> Option<NodeId> {
        let mut current = node;
        while let Some(parent) = self.parent(current) {
            current = parent;
        }
        self.host(current).map(|_| current)
    }

    /// Whether `ancestor` is `node` or lies above it, crossing shadow hosts.
    pub fn is_inclusive_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id).or_else(|| self.host(id));
        }
        false
    }

    /// Whether `node` is reachable from the document node (through shadow hosts).
    pub fn is_connected(&self, node: NodeId) -> bool {
        let mut current = node;
        loop {
            if current == self.root() {
                return true;
            }
            match self.parent(current).or_else(|| self.host(current)) {
                Some(next) => current = next,
                None => return false,
            }
        }
    }

    /// `node` and everything below it, depth-first, piercing shadow roots.
    pub fn descendants(&self, node: NodeId) -> Descendants<'_> {
        Descendants {
            doc: self,
            stack: vec![node],
        }
    }

    /// All connected elements matching `selector`, in tree order.
    pub fn query_all(&self, selector: &SelectorList) -> Vec<NodeId> {
        self.descendants(self.root())
            .filter(|&n| selector.matches(self, n))
            .collect()
    }

    /// Elements with tag `tag` in the subtree of `node` (inclusive).
    pub fn elements_by_tag<'a>(&'a self, node: NodeId, tag: &'a str) -> impl Iterator<Item = NodeId> + 'a {
        self.descendants(node)
            .filter(move |&n| self.tag(n).is_some_and(|t| t.eq_ignore_ascii_case(tag)))
    }
}

/// Depth-first iterator returned by [`Document::descendants`].
pub struct Descendants<'a> {
    doc: &'a Document,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let node = self.stack.pop()?;
        self.stack.extend(self.doc.children(node).iter().rev().copied());
        if let Some(shadow) = self.doc.shadow_root(node) {
            self.stack.push(shadow);
        }
        Some(node)
    }
}
