//! Node and edge entries of the [TreeGraph](crate::model::TreeGraph) arena.

/// Index of a node in a [TreeGraph](crate::model::TreeGraph) arena.
pub type NodeIndex = usize;

/// Index of an edge in a [TreeGraph](crate::model::TreeGraph) arena.
pub type EdgeIndex = usize;

// =#========================================================================#=
// NODE
// =#========================================================================#=
/// A node of a curated input tree.
///
/// Nodes are never moved within the arena; removal only flags them, so
/// [NodeIndex] values stay valid for the whole lifetime of a graph.
///
/// # Invariants
/// - `id` is the node's external identifier, unique within its tree
/// - `otu` is only consulted for leaves
/// - `exemplar` is only meaningful for leaves with a taxon mapping
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    id: String,
    otu: Option<String>,
    exemplar: bool,
    removed: bool,
}

impl Node {
    /// Creates a live node.
    ///
    /// # Arguments
    /// * `id` - External id of the node
    /// * `otu` - Id of the OTU the node refers to, if any
    /// * `exemplar` - Whether the node is flagged as taxon exemplar
    pub fn new(id: String, otu: Option<String>, exemplar: bool) -> Self {
        Node {
            id,
            otu,
            exemplar,
            removed: false,
        }
    }

    /// Returns the external id of this node.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the id of the referenced OTU, if any.
    pub fn otu(&self) -> Option<&str> {
        self.otu.as_deref()
    }

    /// Returns whether this node is flagged as taxon exemplar.
    pub fn is_exemplar(&self) -> bool {
        self.exemplar
    }

    /// Returns whether this node has been removed from the tree.
    pub fn is_removed(&self) -> bool {
        self.removed
    }

    pub(crate) fn mark_removed(&mut self) {
        self.removed = true;
    }
}

// =#========================================================================#=
// EDGE
// =#========================================================================#=
/// A directed parent-to-child edge.
///
/// The source of an edge may be rewired when its original source is
/// suppressed; the target never changes.
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    id: String,
    source: NodeIndex,
    target: NodeIndex,
    length: Option<f64>,
    removed: bool,
}

impl Edge {
    /// Creates a live edge from `source` to `target`.
    pub fn new(id: String, source: NodeIndex, target: NodeIndex, length: Option<f64>) -> Self {
        Edge {
            id,
            source,
            target,
            length,
            removed: false,
        }
    }

    /// Returns the external id of this edge.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the parent end of this edge.
    pub fn source(&self) -> NodeIndex {
        self.source
    }

    /// Returns the child end of this edge.
    pub fn target(&self) -> NodeIndex {
        self.target
    }

    /// Returns the length of this edge as given in the input, if any.
    pub fn length(&self) -> Option<f64> {
        self.length
    }

    /// Returns whether this edge has been removed from the tree.
    pub fn is_removed(&self) -> bool {
        self.removed
    }

    pub(crate) fn set_source(&mut self, source: NodeIndex) {
        self.source = source;
    }

    pub(crate) fn mark_removed(&mut self) {
        self.removed = true;
    }
}
