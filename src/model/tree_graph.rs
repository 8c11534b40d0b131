//! Mutable rooted tree of a curated input tree.
//!
//! Provides [TreeGraph], an arena of [Node]s and [Edge]s with two secondary
//! adjacency indices (edges by source, edge by target), and the primitives
//! used to prune it. Every primitive keeps the indices consistent:
//! * every live edge is listed by its source and is the edge of its target,
//! * the root has no incoming edge,
//! * every other live node has exactly one incoming edge.
//!
//! Removal never shifts the arena; removed nodes and edges are flagged and
//! their ids are recorded into a [Removed] batch supplied by the caller.

use crate::error::{GraphError, PruneError, Result};
use crate::model::deletion_log::Removed;
use crate::model::fragment::{EdgeTable, Otu, RawEdge, RawNode, TreeFragment};
use crate::model::node::{Edge, EdgeIndex, Node, NodeIndex};
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

// =$========================================================================$=
// TREE GRAPH
// =$========================================================================$=
/// A rooted tree with arbitrary out-degrees, addressed by [NodeIndex] and
/// [EdgeIndex].
///
/// # Structure
/// - `nodes` and `edges` are arenas; indices stay valid after removal.
/// - `edge_by_source[n]` lists the live edges leaving `n`, in child order.
/// - `edge_by_target[n]` is the live edge entering `n`, if any.
/// - OTU records of the tree's nodes are owned by the graph, so taxon
///   rewrites do not touch the input fragment.
///
/// # Construction
/// Build from a [TreeFragment] and its OTU table with
/// [`TreeGraph::from_fragment()`], which rejects fragments that are not a
/// single rooted tree.
#[derive(Debug, Clone)]
pub struct TreeGraph {
    nodes: Vec<Node>,
    edges: Vec<Edge>,

    /// External node id → arena index
    node_lookup: HashMap<String, NodeIndex>,

    edge_by_source: Vec<Vec<EdgeIndex>>,
    edge_by_target: Vec<Option<EdgeIndex>>,

    otus: BTreeMap<String, Otu>,

    root: NodeIndex,
    ingroup: Option<NodeIndex>,
}

/// What a call to [`TreeGraph::collapse_low_degree()`] changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollapseReport {
    /// Nodes removed by the collapse, in removal order
    pub removed: Vec<NodeIndex>,
    /// New root, if the old root was left with a single child
    pub revised_root: Option<NodeIndex>,
}

// ============================================================================
// Construction & Export (pub)
// ============================================================================
impl TreeGraph {
    /// Builds a graph from a tree fragment and the OTU table its nodes refer to.
    ///
    /// # Errors
    /// [PruneError::InvalidFragment] if
    /// - the root or ingroup node is unknown,
    /// - an edge is listed under a node other than its source, or refers
    ///   to an unknown node,
    /// - a node has more than one parent, or the root has one,
    /// - a node references an unknown OTU,
    /// - some node is not reachable from the root.
    pub fn from_fragment(fragment: &TreeFragment, otus: &BTreeMap<String, Otu>) -> Result<Self> {
        let num_nodes = fragment.nodes.len();
        let mut graph = TreeGraph {
            nodes: Vec::with_capacity(num_nodes),
            edges: Vec::with_capacity(num_nodes.saturating_sub(1)),
            node_lookup: HashMap::with_capacity(num_nodes),
            edge_by_source: vec![Vec::new(); num_nodes],
            edge_by_target: vec![None; num_nodes],
            otus: BTreeMap::new(),
            root: 0,
            ingroup: None,
        };

        for (id, raw) in &fragment.nodes {
            let mut exemplar = raw.exemplar.unwrap_or(false);
            if let Some(otu_id) = &raw.otu {
                let otu = otus.get(otu_id).ok_or_else(|| {
                    invalid(format!("node '{id}' refers to unknown OTU '{otu_id}'"))
                })?;
                exemplar |= otu.exemplar.unwrap_or(false);
                graph.otus.insert(otu_id.clone(), otu.clone());
            }
            graph.node_lookup.insert(id.clone(), graph.nodes.len());
            graph.nodes.push(Node::new(id.clone(), raw.otu.clone(), exemplar));
        }

        for (source_id, table) in &fragment.edges {
            for (edge_id, raw) in table {
                if &raw.source != source_id {
                    return Err(invalid(format!(
                        "edge '{edge_id}' is listed under '{source_id}' but starts at '{}'",
                        raw.source
                    )));
                }
                let source = graph.lookup(&raw.source)?;
                let target = graph.lookup(&raw.target)?;
                if graph.edge_by_target[target].is_some() {
                    return Err(invalid(format!("node '{}' has more than one parent", raw.target)));
                }

                let index = graph.edges.len();
                graph.edges.push(Edge::new(edge_id.clone(), source, target, raw.length));
                graph.edge_by_source[source].push(index);
                graph.edge_by_target[target] = Some(index);
            }
        }

        graph.root = graph.lookup(&fragment.root)?;
        if graph.edge_by_target[graph.root].is_some() {
            return Err(invalid(format!("root '{}' has a parent", fragment.root)));
        }
        graph.ingroup = match &fragment.ingroup {
            Some(id) => Some(graph.lookup(id)?),
            None => None,
        };

        let reachable = graph.pre_order_iter().count();
        if reachable != num_nodes {
            return Err(invalid(format!(
                "{} node(s) are not connected to the root",
                num_nodes - reachable
            )));
        }

        Ok(graph)
    }

    /// Exports the live part of this graph in the shape of the input.
    ///
    /// The current root is reported as both root and ingroup.
    pub fn to_fragment(&self) -> TreeFragment {
        let mut fragment = TreeFragment {
            root: self.root_id().to_string(),
            ingroup: Some(self.root_id().to_string()),
            ..Default::default()
        };

        for index in self.pre_order_iter() {
            let node = &self.nodes[index];
            fragment.nodes.insert(
                node.id().to_string(),
                RawNode {
                    otu: node.otu().map(str::to_string),
                    exemplar: node.is_exemplar().then_some(true),
                },
            );

            if self.edge_by_source[index].is_empty() {
                continue;
            }
            let table: EdgeTable = self.edge_by_source[index]
                .iter()
                .map(|&e| {
                    let edge = &self.edges[e];
                    let raw = RawEdge {
                        source: node.id().to_string(),
                        target: self.nodes[edge.target()].id().to_string(),
                        length: edge.length(),
                    };
                    (edge.id().to_string(), raw)
                })
                .collect();
            fragment.edges.insert(node.id().to_string(), table);
        }

        fragment
    }

    /// Returns the OTU records referenced by live nodes.
    pub fn live_otus(&self) -> BTreeMap<String, Otu> {
        self.pre_order_iter()
            .filter_map(|n| self.nodes[n].otu())
            .filter_map(|id| self.otus.get(id).map(|otu| (id.to_string(), otu.clone())))
            .collect()
    }
}

// ============================================================================
// Getters / Accessors (pub)
// ============================================================================
impl TreeGraph {
    /// Returns the index of the root.
    pub fn root(&self) -> NodeIndex {
        self.root
    }

    /// Returns the external id of the root.
    pub fn root_id(&self) -> &str {
        self.nodes[self.root].id()
    }

    /// Returns the index of the ingroup node, if one was given or set.
    pub fn ingroup(&self) -> Option<NodeIndex> {
        self.ingroup
    }

    /// Returns the arena index of the node with external id `id`.
    pub fn node_index(&self, id: &str) -> Option<NodeIndex> {
        self.node_lookup.get(id).copied()
    }

    /// Returns the node at `index`.
    ///
    /// # Panics
    /// Panics if `index` is out of bounds.
    pub fn node(&self, index: NodeIndex) -> &Node {
        &self.nodes[index]
    }

    /// Returns the edge at `index`.
    ///
    /// # Panics
    /// Panics if `index` is out of bounds.
    pub fn edge(&self, index: EdgeIndex) -> &Edge {
        &self.edges[index]
    }

    /// Returns the live edges leaving `node`, in child order.
    pub fn child_edges(&self, node: NodeIndex) -> &[EdgeIndex] {
        &self.edge_by_source[node]
    }

    /// Returns the children of `node`, in order.
    pub fn children(&self, node: NodeIndex) -> impl Iterator<Item = NodeIndex> + '_ {
        self.edge_by_source[node]
            .iter()
            .map(|&e| self.edges[e].target())
    }

    /// Returns the live edge entering `node`, if any.
    pub fn parent_edge(&self, node: NodeIndex) -> Option<EdgeIndex> {
        self.edge_by_target[node]
    }

    /// Returns the parent of `node`, if any.
    pub fn parent(&self, node: NodeIndex) -> Option<NodeIndex> {
        self.edge_by_target[node].map(|e| self.edges[e].source())
    }

    /// Returns the number of children of `node`.
    pub fn out_degree(&self, node: NodeIndex) -> usize {
        self.edge_by_source[node].len()
    }

    /// Returns whether `node` is a live, non-root node without children.
    pub fn is_leaf(&self, node: NodeIndex) -> bool {
        !self.nodes[node].is_removed()
            && node != self.root
            && self.edge_by_source[node].is_empty()
    }

    /// Returns the leaves of the tree in pre-order.
    pub fn leaves(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.pre_order_iter().filter(|&n| self.is_leaf(n))
    }

    /// Returns the number of live nodes.
    pub fn num_nodes(&self) -> usize {
        self.nodes.iter().filter(|n| !n.is_removed()).count()
    }

    /// Returns the number of live edges.
    pub fn num_edges(&self) -> usize {
        self.edges.iter().filter(|e| !e.is_removed()).count()
    }

    /// Returns the number of leaves.
    pub fn num_leaves(&self) -> usize {
        self.leaves().count()
    }

    /// Returns the OTU with id `otu_id`.
    pub fn otu(&self, otu_id: &str) -> Option<&Otu> {
        self.otus.get(otu_id)
    }

    /// Returns the OTU referenced by `node`, if any.
    pub fn otu_of(&self, node: NodeIndex) -> Option<&Otu> {
        self.nodes[node].otu().and_then(|id| self.otus.get(id))
    }

    pub(crate) fn otu_mut(&mut self, otu_id: &str) -> Option<&mut Otu> {
        self.otus.get_mut(otu_id)
    }

    /// Makes `node` the root (and ingroup) of the tree.
    ///
    /// # Errors
    /// Fails if the node was removed or still has a parent.
    pub(crate) fn set_root(&mut self, node: NodeIndex) -> std::result::Result<(), GraphError> {
        self.check_live(node)?;
        if self.edge_by_target[node].is_some() {
            return Err(GraphError::StillAttached(self.nodes[node].id().to_string()));
        }
        self.root = node;
        self.ingroup = Some(node);
        Ok(())
    }

    /// Validates the adjacency indices against the arena.
    ///
    /// Checks:
    /// - Root is live and has no incoming edge
    /// - Every live edge joins two live nodes, is listed by its source and
    ///   is the incoming edge of its target
    /// - Index entries only refer to live edges
    /// - Every live node other than the root has exactly one incoming edge
    ///   and is reachable from the root
    ///
    /// # Returns
    /// `true` if the graph is consistent, `false` otherwise
    pub fn is_valid(&self) -> bool {
        if self.nodes[self.root].is_removed() || self.edge_by_target[self.root].is_some() {
            return false;
        }

        for (index, edge) in self.edges.iter().enumerate() {
            if edge.is_removed() {
                continue;
            }
            if self.nodes[edge.source()].is_removed() || self.nodes[edge.target()].is_removed() {
                return false;
            }
            if self.edge_by_target[edge.target()] != Some(index) {
                return false;
            }
            if !self.edge_by_source[edge.source()].contains(&index) {
                return false;
            }
        }

        let listed_edges_live = self
            .edge_by_source
            .iter()
            .flatten()
            .chain(self.edge_by_target.iter().flatten())
            .all(|&e| !self.edges[e].is_removed());
        if !listed_edges_live {
            return false;
        }

        for (index, node) in self.nodes.iter().enumerate() {
            if !node.is_removed() && index != self.root && self.edge_by_target[index].is_none() {
                return false;
            }
        }

        self.pre_order_iter().count() == self.num_nodes()
    }
}

impl std::ops::Index<NodeIndex> for TreeGraph {
    type Output = Node;

    fn index(&self, index: NodeIndex) -> &Self::Output {
        &self.nodes[index]
    }
}

// ============================================================================
// Mutation primitives (pub)
// ============================================================================
impl TreeGraph {
    /// Removes `edge` from both adjacency indices.
    ///
    /// # Returns
    /// `(source, target)` of the removed edge.
    ///
    /// # Errors
    /// [GraphError::MissingEdge] if the edge is not present in both indices.
    pub fn delete_edge(
        &mut self,
        edge: EdgeIndex,
        removed: &mut Removed,
    ) -> std::result::Result<(NodeIndex, NodeIndex), GraphError> {
        let (source, target) = (self.edges[edge].source(), self.edges[edge].target());
        if self.edges[edge].is_removed() || self.edge_by_target[target] != Some(edge) {
            return Err(GraphError::MissingEdge(self.edges[edge].id().to_string()));
        }
        let position = self.edge_by_source[source]
            .iter()
            .position(|&e| e == edge)
            .ok_or_else(|| GraphError::MissingEdge(self.edges[edge].id().to_string()))?;

        self.edge_by_source[source].remove(position);
        self.edge_by_target[target] = None;
        self.edges[edge].mark_removed();
        removed.edge(self.edges[edge].id());

        Ok((source, target))
    }

    /// Removes the childless `node` together with its incoming edge.
    ///
    /// # Returns
    /// The former parent of `node`.
    ///
    /// # Errors
    /// Fails if `node` was removed, has children, or has no parent.
    pub fn delete_tip(
        &mut self,
        node: NodeIndex,
        removed: &mut Removed,
    ) -> std::result::Result<NodeIndex, GraphError> {
        self.check_live(node)?;
        if !self.edge_by_source[node].is_empty() {
            return Err(GraphError::NotATip(self.nodes[node].id().to_string()));
        }
        let edge = self.edge_by_target[node]
            .ok_or_else(|| GraphError::NoParentEdge(self.nodes[node].id().to_string()))?;

        let (parent, _) = self.delete_edge(edge, removed)?;
        self.remove_node(node, removed);
        Ok(parent)
    }

    /// Removes `node` and everything below it, breadth-first.
    ///
    /// The caller must delete the edge attaching `node` to the tree first.
    ///
    /// # Errors
    /// [GraphError::StillAttached] if `node` still has a parent.
    pub fn prune_clade(
        &mut self,
        node: NodeIndex,
        removed: &mut Removed,
    ) -> std::result::Result<(), GraphError> {
        self.check_live(node)?;
        if self.edge_by_target[node].is_some() {
            return Err(GraphError::StillAttached(self.nodes[node].id().to_string()));
        }

        let mut queue = VecDeque::from([node]);
        while let Some(current) = queue.pop_front() {
            for edge in std::mem::take(&mut self.edge_by_source[current]) {
                let target = self.edges[edge].target();
                self.edge_by_target[target] = None;
                self.edges[edge].mark_removed();
                removed.edge(self.edges[edge].id());
                queue.push_back(target);
            }
            self.remove_node(current, removed);
        }

        Ok(())
    }

    /// Deletes `edge` and the whole clade below it.
    pub fn prune_edge_and_tipward(
        &mut self,
        edge: EdgeIndex,
        removed: &mut Removed,
    ) -> std::result::Result<(), GraphError> {
        let (_, target) = self.delete_edge(edge, removed)?;
        self.prune_clade(target, removed)
    }

    /// Deletes `edge` and everything rootward of it that is not below its target.
    ///
    /// Starting at the source of `edge`, all other clades hanging off it are
    /// pruned tipward, the source itself is removed, and the walk continues
    /// with the source's own incoming edge until the old root is consumed.
    /// Afterwards the target of `edge` has no parent and can become the root.
    pub fn prune_edge_and_rootward(
        &mut self,
        edge: EdgeIndex,
        removed: &mut Removed,
    ) -> std::result::Result<(), GraphError> {
        let mut next = Some(edge);
        while let Some(edge) = next {
            let (source, _) = self.delete_edge(edge, removed)?;
            for sibling in self.edge_by_source[source].clone() {
                self.prune_edge_and_tipward(sibling, removed)?;
            }
            next = self.edge_by_target[source];
            self.remove_node(source, removed);
        }
        Ok(())
    }

    /// Bypasses the out-degree one `node`.
    ///
    /// `child_edge` is rewired to start at the source of `parent_edge`, taking
    /// the place of `parent_edge` among its source's children. Then `node`
    /// and `parent_edge` are removed.
    ///
    /// # Errors
    /// [GraphError::EdgeMismatch] if the edges do not enter and leave `node`,
    /// or if `node` has further children.
    pub fn suppress_degree_one_node(
        &mut self,
        parent_edge: EdgeIndex,
        node: NodeIndex,
        child_edge: EdgeIndex,
        removed: &mut Removed,
    ) -> std::result::Result<(), GraphError> {
        self.check_live(node)?;
        if self.edge_by_target[node] != Some(parent_edge) {
            return Err(self.mismatch(parent_edge, node));
        }
        if self.edge_by_source[node].as_slice() != [child_edge] {
            return Err(self.mismatch(child_edge, node));
        }

        let grandparent = self.edges[parent_edge].source();
        let position = self.edge_by_source[grandparent]
            .iter()
            .position(|&e| e == parent_edge)
            .ok_or_else(|| GraphError::MissingEdge(self.edges[parent_edge].id().to_string()))?;

        self.edge_by_source[grandparent].insert(position + 1, child_edge);
        self.edges[child_edge].set_source(grandparent);
        self.edge_by_source[node].clear();

        self.delete_tip(node, removed)?;
        Ok(())
    }

    /// Removes nodes left with fewer than two children, until none remain.
    ///
    /// Each round inspects the candidates: a childless one is deleted as a
    /// tip, one with a single child is suppressed; either way its parent
    /// becomes a candidate of the next round. If the root ends up with a
    /// single child, the first node with at least two children along the
    /// single-child chain below it becomes the new root.
    ///
    /// # Arguments
    /// * `candidates` - Nodes that may have lost children; removed ones are skipped
    /// * `removed` - Batch recording removed nodes and edges
    ///
    /// # Errors
    /// [GraphError::EmptyTree] if the single-child chain below the root ends
    /// in a node without children, i.e. no branching is left at all.
    pub fn collapse_low_degree<I>(
        &mut self,
        candidates: I,
        removed: &mut Removed,
    ) -> std::result::Result<CollapseReport, GraphError>
    where
        I: IntoIterator<Item = NodeIndex>,
    {
        let mut report = CollapseReport::default();
        let mut orphaned_root = None;
        let mut current: BTreeSet<NodeIndex> = candidates.into_iter().collect();

        while !current.is_empty() {
            let mut next = BTreeSet::new();
            for node in current {
                if self.nodes[node].is_removed() {
                    continue;
                }
                let out_degree = self.out_degree(node);
                if out_degree >= 2 {
                    continue;
                }

                let Some(parent_edge) = self.edge_by_target[node] else {
                    if node != self.root {
                        return Err(GraphError::NoParentEdge(self.nodes[node].id().to_string()));
                    }
                    orphaned_root = Some(node);
                    continue;
                };

                next.insert(self.edges[parent_edge].source());
                if out_degree == 1 {
                    let child_edge = self.edge_by_source[node][0];
                    self.suppress_degree_one_node(parent_edge, node, child_edge, removed)?;
                } else {
                    self.delete_tip(node, removed)?;
                }
                next.remove(&node);
                report.removed.push(node);
            }
            current = next;
        }

        if let Some(root) = orphaned_root {
            report.revised_root = Some(self.descend_from_root(root, removed, &mut report)?);
        }

        Ok(report)
    }
}

// ============================================================================
// Helpers (private)
// ============================================================================
impl TreeGraph {
    fn lookup(&self, id: &str) -> Result<NodeIndex> {
        self.node_index(id)
            .ok_or_else(|| invalid(format!("unknown node '{id}'")))
    }

    fn check_live(&self, node: NodeIndex) -> std::result::Result<(), GraphError> {
        if self.nodes[node].is_removed() {
            return Err(GraphError::RemovedNode(self.nodes[node].id().to_string()));
        }
        Ok(())
    }

    fn mismatch(&self, edge: EdgeIndex, node: NodeIndex) -> GraphError {
        GraphError::EdgeMismatch {
            edge: self.edges[edge].id().to_string(),
            node: self.nodes[node].id().to_string(),
        }
    }

    fn remove_node(&mut self, node: NodeIndex, removed: &mut Removed) {
        self.nodes[node].mark_removed();
        removed.node(self.nodes[node].id());
    }

    /// Walks down single-child chains from `root`, removing each passed node.
    fn descend_from_root(
        &mut self,
        root: NodeIndex,
        removed: &mut Removed,
        report: &mut CollapseReport,
    ) -> std::result::Result<NodeIndex, GraphError> {
        let mut current = root;
        loop {
            let children = &self.edge_by_source[current];
            if children.is_empty() {
                return Err(GraphError::EmptyTree);
            }
            if children.len() > 1 {
                self.set_root(current)?;
                return Ok(current);
            }

            let only = children[0];
            let (_, child) = self.delete_edge(only, removed)?;
            self.remove_node(current, removed);
            report.removed.push(current);
            current = child;
        }
    }
}

fn invalid(msg: String) -> PruneError {
    PruneError::InvalidFragment(msg)
}

// =$========================================================================$=
// ITERATORS
// =$========================================================================$=
impl TreeGraph {
    /// Returns an iterator over live nodes in pre-order (parents before
    /// children, children in order).
    pub fn pre_order_iter(&self) -> PreOrderIter<'_> {
        PreOrderIter::new(self)
    }
}

/// Iterator for pre-order traversal from the root.
///
/// Stack-based, so deep caterpillar trees do not recurse.
pub struct PreOrderIter<'a> {
    graph: &'a TreeGraph,
    stack: Vec<NodeIndex>,
}

impl<'a> PreOrderIter<'a> {
    fn new(graph: &'a TreeGraph) -> Self {
        let stack = if graph.nodes.is_empty() {
            Vec::new()
        } else {
            vec![graph.root]
        };
        PreOrderIter { graph, stack }
    }
}

impl Iterator for PreOrderIter<'_> {
    type Item = NodeIndex;

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.stack.pop()?;
        let graph = self.graph;
        // Push children reversed, so first child is visited first
        self.stack.extend(
            graph.edge_by_source[index]
                .iter()
                .rev()
                .map(|&e| graph.edges[e].target()),
        );
        Some(index)
    }
}
