use std::collections::BTreeMap;
use treeclean::model::{Otu, Removed, TreeFragment, TreeGraph};
use treeclean::newick::{NewickStyle, node_label, to_newick, write_newick};

// root ─┬─ n1 (ott 1)
//       ├─ x ─┬─ n3 (ott 3)
//       │     └─ n4 (ott 4)
//       └─ n2 (unmapped)
fn graph() -> TreeGraph {
    let mut fragment = TreeFragment::new("root");
    fragment
        .add_child("e1", "root", "n1", Some("o1"))
        .add_child("e2", "root", "x", None)
        .add_child("e3", "root", "n2", Some("o2"))
        .add_child("e4", "x", "n3", Some("o3"))
        .add_child("e5", "x", "n4", Some("o4"));
    let otus = BTreeMap::from([
        ("o1".to_string(), Otu::mapped(1, "Porphyrio hochstetteri")),
        ("o2".to_string(), Otu::unmapped()),
        ("o3".to_string(), Otu::mapped(3, "Nestor (kea)")),
        ("o4".to_string(), Otu::mapped(4, "d'Urville's kiwi")),
    ]);
    TreeGraph::from_fragment(&fragment, &otus).unwrap()
}

#[test]
fn test_ott_id_style() {
    let graph = graph();
    assert_eq!(
        to_newick(&graph, NewickStyle::OttId, false),
        "(ott1,(ott3,ott4),);"
    );
}

#[test]
fn test_composite_style() {
    let graph = graph();
    assert_eq!(
        to_newick(&graph, NewickStyle::Composite, false),
        "(Porphyrio_hochstetteri_n1_ott1,('Nestor (kea)_n3_ott3','d''Urville''s kiwi_n4_ott4')_x_,_n2_)_root_;"
    );
}

#[test]
fn test_default_style_is_composite() {
    assert_eq!(NewickStyle::default(), NewickStyle::Composite);
}

#[test]
fn test_edge_lengths() {
    let mut fragment = TreeFragment::new("root");
    fragment
        .add_child("e1", "root", "a", Some("o1"))
        .add_child("e2", "root", "b", Some("o2"));
    if let Some(edge) = fragment.edges.get_mut("root").and_then(|t| t.get_mut("e1")) {
        edge.length = Some(0.5);
    }
    let otus = BTreeMap::from([
        ("o1".to_string(), Otu::mapped(7, "Apteryx haastii")),
        ("o2".to_string(), Otu::mapped(8, "Apteryx owenii")),
    ]);
    let graph = TreeGraph::from_fragment(&fragment, &otus).unwrap();

    assert_eq!(to_newick(&graph, NewickStyle::OttId, true), "(ott7:0.5,ott8);");
    assert_eq!(to_newick(&graph, NewickStyle::OttId, false), "(ott7,ott8);");
}

#[test]
fn test_removed_nodes_are_not_written() {
    let mut graph = graph();
    let mut removed = Removed::new();
    let n2 = graph.node_index("n2").unwrap();
    graph.delete_tip(n2, &mut removed).unwrap();

    assert_eq!(to_newick(&graph, NewickStyle::OttId, false), "(ott1,(ott3,ott4));");
}

#[test]
fn test_internal_node_labels() {
    let graph = graph();
    let x = graph.node_index("x").unwrap();
    assert_eq!(node_label(&graph, x, NewickStyle::Composite).as_deref(), Some("_x_"));
    assert_eq!(node_label(&graph, x, NewickStyle::OttId), None);
}

#[test]
fn test_write_newick_appends_newline() {
    let graph = graph();
    let mut buffer = Vec::new();
    write_newick(&mut buffer, &graph, NewickStyle::OttId).unwrap();
    assert_eq!(String::from_utf8(buffer).unwrap(), "(ott1,(ott3,ott4),);\n");
}
