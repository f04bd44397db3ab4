use crate::scanner::is_blank;
use compact_str::CompactString;
use serde::ser::{Error as _, Serialize, SerializeStruct, Serializer};
use std::fmt;

// ============================================================================
// Attributes
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Attribute {
    pub key: CompactString,
    pub value: CompactString,
}

impl Attribute {
    pub fn new(key: impl Into<CompactString>, value: impl Into<CompactString>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Ordered, append-only attribute list. Keys may repeat.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
#[serde(transparent)]
pub struct Attributes(Vec<Attribute>);

impl Attributes {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    #[inline(always)]
    pub fn push(&mut self, attr: Attribute) {
        self.0.push(attr);
    }

    #[inline(always)]
    pub fn get(&self, index: usize) -> Option<&Attribute> {
        self.0.get(index)
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Attribute> {
        self.0.iter()
    }

    /// Value of the first attribute named `key`. Linear scan.
    pub fn value(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|attr| attr.key == key)
            .map(|attr| attr.value.as_str())
    }

    /// Values of every attribute named `key`, in document order.
    pub fn values<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.0
            .iter()
            .filter(move |attr| attr.key == key)
            .map(|attr| attr.value.as_str())
    }
}

impl<'a> IntoIterator for &'a Attributes {
    type Item = &'a Attribute;
    type IntoIter = std::slice::Iter<'a, Attribute>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

// ============================================================================
// Nodes
// ============================================================================

/// Index of a node in its document's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct NodeId(u32);

/// Largest number of elements a document can hold.
pub const MAX_NODES: usize = u32::MAX as usize;

impl NodeId {
    pub const ROOT: NodeId = NodeId(0);

    /// `None` once `index` reaches [`MAX_NODES`].
    fn from_index(index: usize) -> Option<NodeId> {
        u32::try_from(index)
            .ok()
            .filter(|&raw| raw < u32::MAX)
            .map(NodeId)
    }

    #[inline(always)]
    fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Node {
    pub(crate) tag: CompactString,
    pub(crate) text: Option<String>,
    pub(crate) attributes: Attributes,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
}

impl Node {
    fn new(tag: CompactString, parent: Option<NodeId>) -> Self {
        Self {
            tag,
            text: None,
            attributes: Attributes::new(),
            parent,
            children: Vec::new(),
        }
    }

    pub(crate) fn set_text(&mut self, text: String) {
        self.text = Some(text);
    }

    /// Drops the text if it is made only of whitespace.
    pub(crate) fn discard_blank_text(&mut self) {
        if self
            .text
            .as_deref()
            .is_some_and(|text| is_blank(text.as_bytes()))
        {
            self.text = None;
        }
    }

    pub(crate) fn push_attribute(&mut self, attr: Attribute) {
        self.attributes.push(attr);
    }
}

// ============================================================================
// Document
// ============================================================================

/// A loaded XML document. Owns every node of the tree; the root is
/// always present.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
}

impl Document {
    pub(crate) fn with_root(tag: CompactString) -> Self {
        Self {
            nodes: vec![Node::new(tag, None)],
        }
    }

    /// Creates a node tagged `tag` and links it as the last child of `parent`.
    /// Returns `None` when the arena already holds [`MAX_NODES`] elements.
    pub(crate) fn append_child(&mut self, parent: NodeId, tag: CompactString) -> Option<NodeId> {
        let id = NodeId::from_index(self.nodes.len())?;
        self.nodes.push(Node::new(tag, Some(parent)));
        self.nodes[parent.index()].children.push(id);
        Some(id)
    }

    pub(crate) fn parent_of(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id.index()).and_then(|node| node.parent)
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    pub fn root(&self) -> NodeRef<'_> {
        NodeRef {
            doc: self,
            id: NodeId::ROOT,
            node: &self.nodes[0],
        }
    }

    pub fn get(&self, id: NodeId) -> Option<NodeRef<'_>> {
        self.nodes.get(id.index()).map(|node| NodeRef {
            doc: self,
            id,
            node,
        })
    }

    /// Number of elements in the tree, root included.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Depth of the deepest element; a lone root has depth 1.
    pub fn max_depth(&self) -> usize {
        // Parents are always allocated before their children.
        let mut depths = vec![0usize; self.nodes.len()];
        let mut max = 0;
        for (i, node) in self.nodes.iter().enumerate() {
            let depth = node.parent.map_or(1, |p| depths[p.index()] + 1);
            depths[i] = depth;
            max = max.max(depth);
        }
        max
    }

    pub fn descendants(&self) -> Descendants<'_> {
        self.root().descendants()
    }
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        self.root() == other.root()
    }
}

impl Eq for Document {}

// ============================================================================
// Borrowed node views
// ============================================================================

#[derive(Clone, Copy)]
pub struct NodeRef<'a> {
    doc: &'a Document,
    id: NodeId,
    node: &'a Node,
}

impl<'a> NodeRef<'a> {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn document(&self) -> &'a Document {
        self.doc
    }

    pub fn tag(&self) -> &'a str {
        &self.node.tag
    }

    pub fn text(&self) -> Option<&'a str> {
        self.node.text.as_deref()
    }

    pub fn attributes(&self) -> &'a Attributes {
        &self.node.attributes
    }

    pub fn attribute(&self, key: &str) -> Option<&'a str> {
        self.node.attributes.value(key)
    }

    pub fn is_root(&self) -> bool {
        self.node.parent.is_none()
    }

    pub fn parent(&self) -> Option<NodeRef<'a>> {
        self.node.parent.and_then(|id| self.doc.get(id))
    }

    pub fn children(&self) -> impl ExactSizeIterator<Item = NodeRef<'a>> + 'a {
        let (doc, node) = (self.doc, self.node);
        node.children.iter().map(move |&id| NodeRef {
            doc,
            id,
            node: &doc.nodes[id.index()],
        })
    }

    pub fn child_count(&self) -> usize {
        self.node.children.len()
    }

    pub fn first_child(&self) -> Option<NodeRef<'a>> {
        self.children().next()
    }

    /// First child tagged `tag`.
    pub fn child(&self, tag: &str) -> Option<NodeRef<'a>> {
        self.children().find(|child| child.tag() == tag)
    }

    /// This node and everything below it, in document order.
    pub fn descendants(&self) -> Descendants<'a> {
        Descendants { stack: vec![*self] }
    }

    /// Number of ancestors plus one.
    pub fn depth(&self) -> usize {
        std::iter::successors(Some(*self), |node| node.parent()).count()
    }
}

impl fmt::Debug for NodeRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeRef")
            .field("id", &self.id)
            .field("tag", &self.tag())
            .field("text", &self.text())
            .field("attributes", self.attributes())
            .field("children", &self.child_count())
            .finish()
    }
}

/// Compares subtrees by content, not by arena position.
impl PartialEq for NodeRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        let mut pending = vec![(*self, *other)];
        while let Some((a, b)) = pending.pop() {
            if a.tag() != b.tag()
                || a.text() != b.text()
                || a.attributes() != b.attributes()
                || a.child_count() != b.child_count()
            {
                return false;
            }
            pending.extend(a.children().zip(b.children()));
        }
        true
    }
}

impl Eq for NodeRef<'_> {}

/// Pre-order traversal driven by an explicit stack.
pub struct Descendants<'a> {
    stack: Vec<NodeRef<'a>>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = NodeRef<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        let doc = node.doc;
        self.stack
            .extend(node.node.children.iter().rev().map(|&id| NodeRef {
                doc,
                id,
                node: &doc.nodes[id.index()],
            }));
        Some(node)
    }
}

// ============================================================================
// Output
// ============================================================================

/// Indented outline, one element per line. Not XML.
impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut stack = vec![(self.root(), 0usize)];
        while let Some((node, level)) = stack.pop() {
            write!(f, "{:indent$}{}", "", node.tag(), indent = level * 2)?;
            for attr in node.attributes() {
                write!(f, " {}={:?}", attr.key, attr.value.as_str())?;
            }
            if let Some(text) = node.text() {
                write!(f, ": {:?}", text)?;
            }
            writeln!(f)?;
            let children: Vec<_> = node.children().collect();
            stack.extend(children.into_iter().rev().map(|child| (child, level + 1)));
        }
        Ok(())
    }
}

/// Deepest nesting [`NodeRef`] and [`Document`] serialize. Serde output is
/// recursive, so deeper trees fail with a serializer error instead.
pub const MAX_SERIALIZE_DEPTH: usize = 512;

impl Serialize for NodeRef<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        Level {
            node: *self,
            depth: 1,
        }
        .serialize(serializer)
    }
}

#[derive(Clone, Copy)]
struct Level<'a> {
    node: NodeRef<'a>,
    depth: usize,
}

struct Children<'a>(Level<'a>);

impl Serialize for Level<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.depth > MAX_SERIALIZE_DEPTH {
            return Err(S::Error::custom(format_args!(
                "element <{}> is nested deeper than {} levels",
                self.node.tag(),
                MAX_SERIALIZE_DEPTH
            )));
        }
        let node = self.node;
        let mut state = serializer.serialize_struct("Node", 4)?;
        state.serialize_field("tag", node.tag())?;
        state.serialize_field("text", &node.text())?;
        state.serialize_field("attributes", node.attributes())?;
        state.serialize_field("children", &Children(*self))?;
        state.end()
    }
}

impl Serialize for Children<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let depth = self.0.depth + 1;
        serializer.collect_seq(self.0.node.children().map(|node| Level { node, depth }))
    }
}

impl Serialize for Document {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.root().serialize(serializer)
    }
}
