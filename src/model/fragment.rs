//! Serializable tree fragments as curated input trees are stored.
//!
//! The shapes follow the NexSON conventions of the curation database:
//! nodes keyed by id, edges grouped by their source node, and an OTU table
//! shared by all trees of a study. Fragments are read-only at intake; the
//! [TreeGraph](crate::model::TreeGraph) builds its own arena from them and
//! can export the cleaned result back into the same shape.

use crate::error::{PruneError, Result};
use crate::model::TaxonId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Edges leaving one node, keyed by edge id.
pub type EdgeTable = BTreeMap<String, RawEdge>;

// =#========================================================================#=
// STUDY
// =#========================================================================$=
/// A set of trees together with the OTU table their leaves refer to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StudyFragment {
    /// Trees keyed by tree id
    #[serde(default)]
    pub trees: BTreeMap<String, TreeFragment>,
    /// OTUs keyed by OTU id
    #[serde(default)]
    pub otus: BTreeMap<String, Otu>,
}

impl StudyFragment {
    /// Parses a study from its JSON representation.
    ///
    /// # Errors
    /// [PruneError::Json] if `json` is not a well-formed study.
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(PruneError::Json)
    }

    /// Returns the tree with the given id.
    ///
    /// # Errors
    /// [PruneError::TreeNotFound] if the study holds no such tree.
    pub fn tree(&self, tree_id: &str) -> Result<&TreeFragment> {
        self.trees
            .get(tree_id)
            .ok_or_else(|| PruneError::TreeNotFound(tree_id.to_string()))
    }
}

// =#========================================================================#=
// TREE
// =#========================================================================$=
/// A single rooted tree as stored by the curation database.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TreeFragment {
    #[serde(rename = "nodeById")]
    pub nodes: BTreeMap<String, RawNode>,

    /// Source node id → (edge id → edge)
    #[serde(rename = "edgeBySourceId")]
    pub edges: BTreeMap<String, EdgeTable>,

    #[serde(rename = "^ot:rootNodeId")]
    pub root: String,

    /// Node rooting the clade of interest; the whole tree if absent
    #[serde(
        rename = "^ot:inGroupClade",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub ingroup: Option<String>,
}

impl TreeFragment {
    /// Creates a fragment holding only the root node `root`.
    pub fn new(root: &str) -> Self {
        let mut fragment = TreeFragment {
            root: root.to_string(),
            ..Default::default()
        };
        fragment.nodes.insert(root.to_string(), RawNode::default());
        fragment
    }

    /// Sets the node rooting the ingroup clade.
    pub fn with_ingroup(mut self, ingroup: &str) -> Self {
        self.ingroup = Some(ingroup.to_string());
        self
    }

    /// Adds node `child` below `parent`, connected by edge `edge_id`.
    ///
    /// # Arguments
    /// * `edge_id` - Id of the new edge
    /// * `parent` - Id of an existing (or later added) node
    /// * `child` - Id of the new node
    /// * `otu` - OTU referenced by the new node, if any
    pub fn add_child(
        &mut self,
        edge_id: &str,
        parent: &str,
        child: &str,
        otu: Option<&str>,
    ) -> &mut Self {
        self.nodes.insert(
            child.to_string(),
            RawNode {
                otu: otu.map(str::to_string),
                exemplar: None,
            },
        );
        self.edges.entry(parent.to_string()).or_default().insert(
            edge_id.to_string(),
            RawEdge {
                source: parent.to_string(),
                target: child.to_string(),
                length: None,
            },
        );
        self
    }

    /// Flags node `id` as taxon exemplar; does nothing for unknown ids.
    pub fn set_exemplar(&mut self, id: &str) -> &mut Self {
        if let Some(node) = self.nodes.get_mut(id) {
            node.exemplar = Some(true);
        }
        self
    }

    /// Returns the number of edges in this fragment.
    pub fn num_edges(&self) -> usize {
        self.edges.values().map(|table| table.len()).sum()
    }
}

/// A node entry of a [TreeFragment].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawNode {
    #[serde(rename = "@otu", default, skip_serializing_if = "Option::is_none")]
    pub otu: Option<String>,

    #[serde(
        rename = "^ot:isTaxonExemplar",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub exemplar: Option<bool>,
}

/// An edge entry of a [TreeFragment].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawEdge {
    #[serde(rename = "@source")]
    pub source: String,

    #[serde(rename = "@target")]
    pub target: String,

    #[serde(rename = "@length", default, skip_serializing_if = "Option::is_none")]
    pub length: Option<f64>,
}

// =#========================================================================#=
// OTU
// =#========================================================================$=
/// Operational taxonomic unit: the identity record of a leaf.
///
/// An OTU without taxon id is *unmapped*.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Otu {
    #[serde(rename = "^ot:ottId", default, skip_serializing_if = "Option::is_none")]
    pub taxon_id: Option<TaxonId>,

    #[serde(
        rename = "^ot:ottTaxonName",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub taxon_name: Option<String>,

    #[serde(
        rename = "^ot:isTaxonExemplar",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub exemplar: Option<bool>,

    #[serde(
        rename = "^ot:originalLabel",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub original_label: Option<String>,
}

impl Otu {
    /// Creates an OTU mapped to `taxon_id` with the given display name.
    pub fn mapped(taxon_id: TaxonId, taxon_name: &str) -> Self {
        Otu {
            taxon_id: Some(taxon_id),
            taxon_name: Some(taxon_name.to_string()),
            ..Default::default()
        }
    }

    /// Creates an OTU without taxon mapping.
    pub fn unmapped() -> Self {
        Otu::default()
    }

    /// Marks this OTU as taxon exemplar.
    pub fn as_exemplar(mut self) -> Self {
        self.exemplar = Some(true);
        self
    }
}
