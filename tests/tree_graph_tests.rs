use std::collections::BTreeMap;
use treeclean::error::{GraphError, PruneError};
use treeclean::model::{Otu, RawNode, Removed, TreeFragment, TreeGraph};

// root ─┬─ a
//       └─ x ─┬─ b
//             └─ c
fn small_fragment() -> TreeFragment {
    let mut fragment = TreeFragment::new("root");
    fragment
        .add_child("e1", "root", "a", None)
        .add_child("e2", "root", "x", None)
        .add_child("e3", "x", "b", None)
        .add_child("e4", "x", "c", None);
    fragment
}

fn build(fragment: &TreeFragment) -> TreeGraph {
    TreeGraph::from_fragment(fragment, &BTreeMap::new()).unwrap()
}

fn edge_into(graph: &TreeGraph, id: &str) -> usize {
    graph.parent_edge(graph.node_index(id).unwrap()).unwrap()
}

fn ids(graph: &TreeGraph, nodes: impl Iterator<Item = usize>) -> Vec<String> {
    nodes.map(|n| graph[n].id().to_string()).collect()
}

// ============= Construction =============

#[test]
fn test_building_graph() {
    let graph = build(&small_fragment());

    assert_eq!(graph.num_nodes(), 5);
    assert_eq!(graph.num_edges(), 4);
    assert_eq!(graph.num_leaves(), 3);
    assert_eq!(graph.root_id(), "root");
    assert!(graph.is_valid());

    let x = graph.node_index("x").unwrap();
    let b = graph.node_index("b").unwrap();
    assert_eq!(graph.parent(b), Some(x));
    assert_eq!(graph.out_degree(x), 2);
    assert!(graph.is_leaf(b));
    assert!(!graph.is_leaf(x));
    assert!(!graph.is_leaf(graph.root()));
}

#[test]
fn test_pre_order_follows_child_order() {
    let graph = build(&small_fragment());
    assert_eq!(
        ids(&graph, graph.pre_order_iter()),
        vec!["root", "a", "x", "b", "c"]
    );
    assert_eq!(ids(&graph, graph.leaves()), vec!["a", "b", "c"]);
}

#[test]
fn test_node_with_two_parents_is_rejected() {
    let mut fragment = small_fragment();
    fragment.add_child("e5", "a", "b", None);
    let err = TreeGraph::from_fragment(&fragment, &BTreeMap::new()).unwrap_err();
    assert!(matches!(err, PruneError::InvalidFragment(_)));
}

#[test]
fn test_unreachable_node_is_rejected() {
    let mut fragment = small_fragment();
    fragment.nodes.insert("lonely".to_string(), RawNode::default());
    let err = TreeGraph::from_fragment(&fragment, &BTreeMap::new()).unwrap_err();
    assert!(matches!(err, PruneError::InvalidFragment(msg) if msg.contains("not connected")));
}

#[test]
fn test_unknown_otu_is_rejected() {
    let mut fragment = small_fragment();
    fragment.add_child("e5", "x", "d", Some("o404"));
    let err = TreeGraph::from_fragment(&fragment, &BTreeMap::new()).unwrap_err();
    assert!(matches!(err, PruneError::InvalidFragment(msg) if msg.contains("o404")));
}

#[test]
fn test_root_with_parent_is_rejected() {
    let mut fragment = small_fragment();
    fragment.add_child("e5", "c", "root", None);
    assert!(TreeGraph::from_fragment(&fragment, &BTreeMap::new()).is_err());
}

#[test]
fn test_exemplar_flag_from_node_or_otu() {
    let mut fragment = TreeFragment::new("root");
    fragment
        .add_child("e1", "root", "a", Some("o1"))
        .add_child("e2", "root", "b", Some("o2"))
        .add_child("e3", "root", "c", Some("o3"))
        .set_exemplar("a");
    let otus = BTreeMap::from([
        ("o1".to_string(), Otu::mapped(1, "Kea")),
        ("o2".to_string(), Otu::mapped(2, "Kaka").as_exemplar()),
        ("o3".to_string(), Otu::mapped(3, "Kakapo")),
    ]);
    let graph = TreeGraph::from_fragment(&fragment, &otus).unwrap();

    let exemplar = |id: &str| graph[graph.node_index(id).unwrap()].is_exemplar();
    assert!(exemplar("a"));
    assert!(exemplar("b"));
    assert!(!exemplar("c"));
}

#[test]
#[should_panic]
fn test_node_out_of_bounds() {
    let graph = build(&small_fragment());
    let _ = &graph[55];
}

// ============= Primitives =============

#[test]
fn test_delete_edge() {
    let mut graph = build(&small_fragment());
    let edge = edge_into(&graph, "b");
    let mut removed = Removed::new();

    let (source, target) = graph.delete_edge(edge, &mut removed).unwrap();
    assert_eq!(graph[source].id(), "x");
    assert_eq!(graph[target].id(), "b");
    assert_eq!(graph.parent_edge(target), None);
    assert_eq!(removed.edges, vec!["e3"]);
    assert!(removed.nodes.is_empty());

    let err = graph.delete_edge(edge, &mut removed).unwrap_err();
    assert_eq!(err, GraphError::MissingEdge("e3".to_string()));
}

#[test]
fn test_delete_tip() {
    let mut graph = build(&small_fragment());
    let c = graph.node_index("c").unwrap();
    let mut removed = Removed::new();

    let parent = graph.delete_tip(c, &mut removed).unwrap();
    assert_eq!(graph[parent].id(), "x");
    assert!(graph[c].is_removed());
    assert_eq!(removed.nodes, vec!["c"]);
    assert_eq!(removed.edges, vec!["e4"]);
    assert_eq!(graph.out_degree(parent), 1);
    assert!(graph.is_valid());
}

#[test]
fn test_delete_tip_requires_a_tip() {
    let mut graph = build(&small_fragment());
    let x = graph.node_index("x").unwrap();
    let err = graph.delete_tip(x, &mut Removed::new()).unwrap_err();
    assert_eq!(err, GraphError::NotATip("x".to_string()));

    let root = graph.root();
    assert!(graph.delete_tip(root, &mut Removed::new()).is_err());
}

#[test]
fn test_prune_clade_requires_detached_node() {
    let mut graph = build(&small_fragment());
    let x = graph.node_index("x").unwrap();
    let err = graph.prune_clade(x, &mut Removed::new()).unwrap_err();
    assert_eq!(err, GraphError::StillAttached("x".to_string()));
}

#[test]
fn test_prune_edge_and_tipward() {
    let mut graph = build(&small_fragment());
    let edge = edge_into(&graph, "x");
    let mut removed = Removed::new();

    graph.prune_edge_and_tipward(edge, &mut removed).unwrap();
    assert_eq!(removed.nodes, vec!["x", "b", "c"]);
    assert_eq!(removed.edges, vec!["e2", "e3", "e4"]);
    assert_eq!(graph.num_nodes(), 2);
    assert_eq!(ids(&graph, graph.leaves()), vec!["a"]);
    assert!(graph.is_valid());
}

#[test]
fn test_prune_edge_and_rootward() {
    // top ─┬─ o
    //      └─ root ─┬─ a
    //               └─ x ─┬─ b
    //                     └─ c
    let mut fragment = TreeFragment::new("top");
    fragment
        .add_child("e0", "top", "root", None)
        .add_child("e5", "top", "o", None)
        .add_child("e1", "root", "a", None)
        .add_child("e2", "root", "x", None)
        .add_child("e3", "x", "b", None)
        .add_child("e4", "x", "c", None);
    let mut graph = build(&fragment);
    let x = graph.node_index("x").unwrap();
    let mut removed = Removed::new();

    graph
        .prune_edge_and_rootward(edge_into(&graph, "x"), &mut removed)
        .unwrap();

    assert_eq!(graph.parent_edge(x), None);
    assert_eq!(removed.nodes, vec!["a", "root", "o", "top"]);
    assert_eq!(removed.edges, vec!["e2", "e1", "e0", "e5"]);
    for id in ["x", "b", "c"] {
        assert!(!graph[graph.node_index(id).unwrap()].is_removed());
    }
}

#[test]
fn test_suppress_degree_one_node_keeps_child_position() {
    // root ─┬─ a
    //       ├─ x ── b
    //       └─ c
    let mut fragment = TreeFragment::new("root");
    fragment
        .add_child("e1", "root", "a", None)
        .add_child("e2", "root", "x", None)
        .add_child("e3", "x", "b", None)
        .add_child("e4", "root", "c", None);
    let mut graph = build(&fragment);
    let x = graph.node_index("x").unwrap();
    let b = graph.node_index("b").unwrap();
    let (parent_edge, child_edge) = (graph.parent_edge(x).unwrap(), graph.parent_edge(b).unwrap());
    let mut removed = Removed::new();

    graph
        .suppress_degree_one_node(parent_edge, x, child_edge, &mut removed)
        .unwrap();

    assert_eq!(ids(&graph, graph.children(graph.root())), vec!["a", "b", "c"]);
    assert_eq!(graph.parent(b), Some(graph.root()));
    assert_eq!(graph.edge(child_edge).id(), "e3");
    assert_eq!(removed.nodes, vec!["x"]);
    assert_eq!(removed.edges, vec!["e2"]);
    assert!(graph.is_valid());
}

#[test]
fn test_suppress_rejects_wrong_edges() {
    let mut graph = build(&small_fragment());
    let x = graph.node_index("x").unwrap();
    let b = graph.node_index("b").unwrap();
    let parent_edge = graph.parent_edge(x).unwrap();
    let child_edge = graph.parent_edge(b).unwrap();

    // x has two children
    let err = graph
        .suppress_degree_one_node(parent_edge, x, child_edge, &mut Removed::new())
        .unwrap_err();
    assert!(matches!(err, GraphError::EdgeMismatch { .. }));

    let err = graph
        .suppress_degree_one_node(child_edge, x, child_edge, &mut Removed::new())
        .unwrap_err();
    assert!(matches!(err, GraphError::EdgeMismatch { node, .. } if node == "x"));
    assert!(graph.is_valid());
}

// ============= Collapse =============

#[test]
fn test_collapse_keeps_branching_node() {
    let mut graph = build(&small_fragment());
    let x = graph.node_index("x").unwrap();
    let mut removed = Removed::new();

    let report = graph.collapse_low_degree([x], &mut removed).unwrap();
    assert!(report.removed.is_empty());
    assert_eq!(report.revised_root, None);
    assert!(removed.is_empty());
}

#[test]
fn test_collapse_suppresses_pass_through_node() {
    // root ─┬─ a
    //       └─ x ── c
    let mut fragment = TreeFragment::new("root");
    fragment
        .add_child("e1", "root", "a", None)
        .add_child("e2", "root", "x", None)
        .add_child("e3", "x", "c", None);
    let mut graph = build(&fragment);
    let x = graph.node_index("x").unwrap();
    let mut removed = Removed::new();

    let report = graph.collapse_low_degree([x], &mut removed).unwrap();
    assert_eq!(report.removed, vec![x]);
    assert_eq!(removed.nodes, vec!["x"]);
    assert_eq!(ids(&graph, graph.children(graph.root())), vec!["a", "c"]);
    assert!(graph.is_valid());
}

#[test]
fn test_collapse_propagates_rootward() {
    // root ─┬─ a
    //       ├─ y ─┬─ x ─┬─ b
    //       │     │     └─ c
    //       │     └─ d
    //       └─ z
    let mut fragment = TreeFragment::new("root");
    fragment
        .add_child("e1", "root", "a", None)
        .add_child("e2", "root", "y", None)
        .add_child("e7", "root", "z", None)
        .add_child("e3", "y", "x", None)
        .add_child("e4", "y", "d", None)
        .add_child("e5", "x", "b", None)
        .add_child("e6", "x", "c", None);
    let mut graph = build(&fragment);
    let mut removed = Removed::new();

    let mut parents = Vec::new();
    for id in ["b", "c", "d"] {
        let tip = graph.node_index(id).unwrap();
        parents.push(graph.delete_tip(tip, &mut removed).unwrap());
    }
    let report = graph.collapse_low_degree(parents, &mut removed).unwrap();

    assert_eq!(ids(&graph, report.removed.into_iter()), vec!["x", "y"]);
    assert_eq!(ids(&graph, graph.pre_order_iter()), vec!["root", "a", "z"]);
    assert!(graph.is_valid());
}

#[test]
fn test_collapse_to_nothing_is_empty_tree() {
    let mut graph = build(&small_fragment());
    let mut removed = Removed::new();
    let x = graph.node_index("x").unwrap();
    let edge = graph.parent_edge(x).unwrap();
    graph.prune_edge_and_tipward(edge, &mut removed).unwrap();

    let root = graph.root();
    let err = graph.collapse_low_degree([root], &mut removed).unwrap_err();
    assert_eq!(err, GraphError::EmptyTree);
    assert!(removed.nodes.contains(&"root".to_string()));
}

#[test]
fn test_collapse_descends_to_new_root() {
    let mut graph = build(&small_fragment());
    let mut removed = Removed::new();
    let a = graph.node_index("a").unwrap();
    let root = graph.delete_tip(a, &mut removed).unwrap();

    let report = graph.collapse_low_degree([root], &mut removed).unwrap();
    let x = graph.node_index("x").unwrap();
    assert_eq!(report.revised_root, Some(x));
    assert_eq!(graph.root_id(), "x");
    assert_eq!(graph.ingroup(), Some(x));
    assert_eq!(graph.num_leaves(), 2);
    assert!(graph.is_valid());
}

#[test]
fn test_no_pass_through_nodes_after_collapse() {
    // Caterpillar with every other leaf removed
    let mut fragment = TreeFragment::new("v0");
    for i in 0..10 {
        fragment
            .add_child(&format!("s{i}"), &format!("v{i}"), &format!("v{}", i + 1), None)
            .add_child(&format!("l{i}"), &format!("v{i}"), &format!("t{i}"), None);
    }
    fragment.add_child("l10", "v10", "t10", None);
    fragment.add_child("l11", "v10", "t11", None);
    let mut graph = build(&fragment);
    let mut removed = Removed::new();

    let mut parents = Vec::new();
    for i in (0..10).step_by(2) {
        let tip = graph.node_index(&format!("t{i}")).unwrap();
        parents.push(graph.delete_tip(tip, &mut removed).unwrap());
    }
    graph.collapse_low_degree(parents, &mut removed).unwrap();

    assert!(graph.is_valid());
    assert_eq!(graph.num_leaves(), 7);
    for node in graph.pre_order_iter() {
        if node != graph.root() {
            assert_ne!(graph.out_degree(node), 1, "{} passes through", graph[node].id());
        }
    }
    assert!(graph.out_degree(graph.root()) >= 2);
}

// ============= Export =============

#[test]
fn test_to_fragment_round_trip() {
    let mut graph = build(&small_fragment());
    let mut removed = Removed::new();
    let a = graph.node_index("a").unwrap();
    let root = graph.delete_tip(a, &mut removed).unwrap();
    graph.collapse_low_degree([root], &mut removed).unwrap();

    let fragment = graph.to_fragment();
    assert_eq!(fragment.root, "x");
    assert_eq!(fragment.ingroup.as_deref(), Some("x"));
    assert_eq!(fragment.nodes.len(), 3);
    assert_eq!(fragment.num_edges(), 2);

    let rebuilt = TreeGraph::from_fragment(&fragment, &graph.live_otus()).unwrap();
    assert_eq!(ids(&rebuilt, rebuilt.pre_order_iter()), vec!["x", "b", "c"]);
}
