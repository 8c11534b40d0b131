//! Newick serialization of cleaned trees.

use crate::model::{NodeIndex, TreeGraph};
use crate::newick::escape::escape_label;
use std::io::{self, Write};

/// Extra buffer in Newick string length/capacity estimate
const BUFFER_CHARS: usize = 10;

/// Style for serializing a [TreeGraph] to Newick, controlling node labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NewickStyle {
    /// Mapped leaves as `<taxon name>_<node id>_ott<taxon id>`, every other
    /// node as `_<node id>_`
    #[default]
    Composite,
    /// Mapped leaves as `ott<taxon id>`, other nodes unlabelled
    OttId,
}

enum Step {
    Enter(NodeIndex),
    Separator,
    Close(NodeIndex),
}

/// Returns the Newick representation of `graph` with closing semicolon.
///
/// Only live nodes are written, children in their current order.
///
/// # Arguments
/// * `graph` - Tree to write
/// * `style` - The [NewickStyle] used to label nodes
/// * `with_edge_lengths` - Whether to write input edge lengths, where present
///
/// # Example
/// ```
/// use std::collections::BTreeMap;
/// use treeclean::model::{Otu, TreeFragment, TreeGraph};
/// use treeclean::newick::{NewickStyle, to_newick};
///
/// let mut fragment = TreeFragment::new("root");
/// fragment
///     .add_child("e1", "root", "n1", Some("o1"))
///     .add_child("e2", "root", "n2", Some("o2"));
/// let otus = BTreeMap::from([
///     ("o1".to_string(), Otu::mapped(57819, "Nestor notabilis")),
///     ("o2".to_string(), Otu::mapped(57820, "Nestor meridionalis")),
/// ]);
/// let graph = TreeGraph::from_fragment(&fragment, &otus).unwrap();
///
/// assert_eq!(
///     to_newick(&graph, NewickStyle::Composite, false),
///     "(Nestor_notabilis_n1_ott57819,Nestor_meridionalis_n2_ott57820)_root_;"
/// );
/// assert_eq!(to_newick(&graph, NewickStyle::OttId, false), "(ott57819,ott57820);");
/// ```
pub fn to_newick(graph: &TreeGraph, style: NewickStyle, with_edge_lengths: bool) -> String {
    let mut newick = String::with_capacity(estimate_newick_len(graph, style, with_edge_lengths));
    let mut stack = vec![Step::Enter(graph.root())];

    while let Some(step) = stack.pop() {
        match step {
            Step::Enter(node) => {
                let children = graph.child_edges(node);
                if children.is_empty() {
                    push_label(graph, node, style, &mut newick);
                    push_length(graph, node, with_edge_lengths, &mut newick);
                    continue;
                }

                newick.push('(');
                stack.push(Step::Close(node));
                for (i, &edge) in children.iter().enumerate().rev() {
                    stack.push(Step::Enter(graph.edge(edge).target()));
                    if i > 0 {
                        stack.push(Step::Separator);
                    }
                }
            }
            Step::Separator => newick.push(','),
            Step::Close(node) => {
                newick.push(')');
                push_label(graph, node, style, &mut newick);
                push_length(graph, node, with_edge_lengths, &mut newick);
            }
        }
    }

    newick.push(';');
    newick
}

/// Writes `graph` in Newick format followed by a newline.
///
/// # Errors
/// Returns an I/O error if writing fails.
pub fn write_newick<W: Write>(mut writer: W, graph: &TreeGraph, style: NewickStyle) -> io::Result<()> {
    let newick = to_newick(graph, style, false);
    writer.write_all(newick.as_bytes())?;
    writer.write_all(b"\n")?;
    writer.flush()
}

/// Returns the label of `node` in the given style, if it gets one.
pub fn node_label(graph: &TreeGraph, node: NodeIndex, style: NewickStyle) -> Option<String> {
    let mapped = graph
        .otu_of(node)
        .filter(|_| graph.out_degree(node) == 0)
        .and_then(|otu| otu.taxon_id.map(|id| (id, otu.taxon_name.as_deref())));
    let node_id = graph[node].id();

    match (style, mapped) {
        (NewickStyle::Composite, Some((taxon_id, Some(name)))) => {
            Some(escape_label(&format!("{name}_{node_id}_ott{taxon_id}")))
        }
        (NewickStyle::Composite, _) => Some(escape_label(&format!("_{node_id}_"))),
        (NewickStyle::OttId, Some((taxon_id, _))) => Some(format!("ott{taxon_id}")),
        (NewickStyle::OttId, None) => None,
    }
}

fn push_label(graph: &TreeGraph, node: NodeIndex, style: NewickStyle, newick: &mut String) {
    if let Some(label) = node_label(graph, node, style) {
        newick.push_str(&label);
    }
}

fn push_length(graph: &TreeGraph, node: NodeIndex, with_edge_lengths: bool, newick: &mut String) {
    if !with_edge_lengths {
        return;
    }
    let length = graph
        .parent_edge(node)
        .and_then(|edge| graph.edge(edge).length());
    if let Some(length) = length {
        newick.push(':');
        newick.push_str(&length.to_string());
    }
}

/// Estimates the length of the Newick string of `graph`, to pre-allocate.
fn estimate_newick_len(graph: &TreeGraph, style: NewickStyle, with_edge_lengths: bool) -> usize {
    // "(,)" per internal node
    const INTERNAL_NODE_CHARS: usize = 3;
    // e.g. "Homo_sapiens_node123_ott770315"
    const COMPOSITE_LABEL_CHARS: usize = 32;
    // e.g. "ott770315"
    const OTT_LABEL_CHARS: usize = 10;
    // e.g. ":0.0095299613"
    const BRANCH_LENGTH_CHARS: usize = 14;

    let num_nodes = graph.num_nodes();
    let label_chars = match style {
        NewickStyle::Composite => COMPOSITE_LABEL_CHARS,
        NewickStyle::OttId => OTT_LABEL_CHARS,
    };
    let branch_chars = if with_edge_lengths { BRANCH_LENGTH_CHARS } else { 0 };

    num_nodes * (INTERNAL_NODE_CHARS + label_chars + branch_chars) + BUFFER_CHARS
}
