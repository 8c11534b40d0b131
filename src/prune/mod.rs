//! Cleaning of a single input tree for synthesis.
//!
//! A [Pruner] owns one [TreeGraph] and walks it through a fixed sequence of
//! stages (see [PruneStage]):
//!
//! | Stage         | Operation                      | Reason tags                            |
//! |---------------|--------------------------------|----------------------------------------|
//! | `Raw`         | [`Pruner::prune_to_ingroup`]     | `outgroup`                             |
//! | `IngroupOnly` | [`Pruner::prune_unmapped_leaves`]| `unmapped_otu`                         |
//! | `Mapped`      | [`Pruner::remap_taxa`]           | forced reasons, taxonomy reasons       |
//! | `Remapped`    | [`Pruner::final_collapse`]       | `became_trivial`                       |
//!
//! Every removal of leaves is followed by a collapse of the nodes left
//! with fewer than two children, logged as `became_trivial`. A tree that
//! loses all of its branching ends in [PruneStage::Empty]; this is an
//! outcome, not an error ([PruneOutcome::Empty]).

pub mod remap;

pub use remap::TaxonRemapper;

use crate::config::PruneConfig;
use crate::error::{GraphError, PruneError, Result};
use crate::model::{
    DeletionLog, LeafEntry, LeafGroups, NodeIndex, Otu, PruneReason, Removed, StudyFragment, TaxonId,
    TreeFragment, TreeGraph,
};
use crate::newick::{NewickStyle, to_newick};
use crate::taxonomy::{Taxonomy, TaxonomyTree};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, error, info};

/// Cleans tree `tree_id` of `study` in one call.
///
/// # Errors
/// * [PruneError::TreeNotFound] if the study holds no such tree
/// * [PruneError::InvalidFragment] if the tree is not a single rooted tree
/// * [PruneError::Graph] and [PruneError::Taxonomy] if cleaning fails
pub fn clean_tree<T: Taxonomy>(
    study: &StudyFragment,
    tree_id: &str,
    taxonomy: T,
    config: &PruneConfig,
) -> Result<PruneOutcome> {
    let fragment = study.tree(tree_id).inspect_err(|e| error!("{e}"))?;
    let graph = TreeGraph::from_fragment(fragment, &study.otus)?;
    debug!(
        "Cleaning tree '{}' with {} nodes and {} leaves",
        tree_id,
        graph.num_nodes(),
        graph.num_leaves()
    );
    Pruner::new(graph).run(taxonomy, config)
}

// =#========================================================================#=
// OUTCOME
// =#========================================================================$=
/// A tree that survived cleaning.
#[derive(Debug, Clone)]
pub struct CleanedTree {
    pub graph: TreeGraph,
    pub log: DeletionLog,
    /// Taxonomy tree induced by the retained taxa, if requested
    pub taxonomy_tree: Option<TaxonomyTree>,
}

impl CleanedTree {
    /// Exports the cleaned tree in the input shape.
    pub fn to_fragment(&self) -> TreeFragment {
        self.graph.to_fragment()
    }

    /// Returns the OTUs of the retained nodes, with updated taxon ids and names.
    pub fn otus(&self) -> BTreeMap<String, Otu> {
        self.graph.live_otus()
    }

    /// Returns the cleaned tree in Newick format.
    pub fn to_newick(&self, style: NewickStyle) -> String {
        to_newick(&self.graph, style, false)
    }
}

/// Result of cleaning a tree.
#[derive(Debug, Clone)]
pub enum PruneOutcome {
    Cleaned(CleanedTree),
    /// No branching was left; the log carries the `EMPTY_TREE` marker
    Empty(DeletionLog),
}

impl PruneOutcome {
    /// Returns whether the tree ended up empty.
    pub fn is_empty(&self) -> bool {
        matches!(self, PruneOutcome::Empty(_))
    }

    /// Returns the deletion log, whatever the outcome.
    pub fn log(&self) -> &DeletionLog {
        match self {
            PruneOutcome::Cleaned(tree) => &tree.log,
            PruneOutcome::Empty(log) => log,
        }
    }

    /// Returns the cleaned tree, [None] if the tree ended up empty.
    pub fn cleaned(self) -> Option<CleanedTree> {
        match self {
            PruneOutcome::Cleaned(tree) => Some(tree),
            PruneOutcome::Empty(_) => None,
        }
    }
}

// =#========================================================================#=
// PRUNER
// =#========================================================================$=
/// Stages of a [Pruner], in order. `Clean` and `Empty` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PruneStage {
    Raw,
    IngroupOnly,
    Mapped,
    Remapped,
    Clean,
    Empty,
}

/// Drives a [TreeGraph] through the cleaning stages, keeping the
/// [DeletionLog] and the leaf groups of the tree.
///
/// # Example
/// ```
/// use std::collections::BTreeMap;
/// use treeclean::config::PruneConfig;
/// use treeclean::model::{Otu, TreeFragment, TreeGraph};
/// use treeclean::prune::Pruner;
/// use treeclean::taxonomy::InMemoryTaxonomy;
///
/// let mut fragment = TreeFragment::new("root");
/// fragment
///     .add_child("e1", "root", "kea", Some("o1"))
///     .add_child("e2", "root", "kaka", Some("o2"))
///     .add_child("e3", "root", "mystery", Some("o3"));
/// let otus = BTreeMap::from([
///     ("o1".to_string(), Otu::mapped(2, "Nestor notabilis")),
///     ("o2".to_string(), Otu::mapped(3, "Nestor meridionalis")),
///     ("o3".to_string(), Otu::unmapped()),
/// ]);
/// let taxonomy = InMemoryTaxonomy::new()
///     .with_taxon(1, "Nestor", None)
///     .with_taxon(2, "Nestor notabilis", Some(1))
///     .with_taxon(3, "Nestor meridionalis", Some(1));
///
/// let graph = TreeGraph::from_fragment(&fragment, &otus).unwrap();
/// let outcome = Pruner::new(graph).run(&taxonomy, &PruneConfig::default()).unwrap();
/// let cleaned = outcome.cleaned().unwrap();
/// assert_eq!(cleaned.graph.num_leaves(), 2);
/// assert!(cleaned.log.get(&treeclean::model::PruneReason::UnmappedOtu).is_some());
/// ```
#[derive(Debug)]
pub struct Pruner {
    graph: TreeGraph,
    log: DeletionLog,
    /// Derived view of the leaves, built on first use after ingroup pruning
    groups: Option<LeafGroups>,
    stage: PruneStage,
    /// Parents of removed leaves, rechecked by the final collapse
    touched: BTreeSet<NodeIndex>,
    taxonomy_tree: Option<TaxonomyTree>,
}

impl Pruner {
    /// Creates a pruner at stage [PruneStage::Raw].
    pub fn new(graph: TreeGraph) -> Self {
        Pruner {
            graph,
            log: DeletionLog::new(),
            groups: None,
            stage: PruneStage::Raw,
            touched: BTreeSet::new(),
            taxonomy_tree: None,
        }
    }

    /// Returns the current stage.
    pub fn stage(&self) -> PruneStage {
        self.stage
    }

    /// Returns the tree in its current state.
    pub fn graph(&self) -> &TreeGraph {
        &self.graph
    }

    /// Returns the deletion log so far.
    pub fn log(&self) -> &DeletionLog {
        &self.log
    }

    /// Returns the leaf groups, building them if not yet done.
    pub fn groups(&mut self) -> &LeafGroups {
        self.groups_mut()
    }

    /// Runs all stages and returns the outcome.
    ///
    /// # Errors
    /// Invariant violations of the tree and classification failures of the
    /// taxonomy. Running out of branches is not an error but
    /// [PruneOutcome::Empty].
    pub fn run<T: Taxonomy>(mut self, taxonomy: T, config: &PruneConfig) -> Result<PruneOutcome> {
        let result = self
            .prune_to_ingroup()
            .and_then(|_| self.prune_unmapped_leaves())
            .and_then(|_| self.remap_taxa(&taxonomy, config))
            .and_then(|_| self.final_collapse());

        match result {
            Ok(()) => {}
            Err(PruneError::Graph(GraphError::EmptyTree)) => {}
            Err(e) => return Err(e),
        }
        if !config.taxonomy_tree {
            self.taxonomy_tree = None;
        }
        Ok(self.finish())
    }

    /// Converts the pruner into its outcome.
    ///
    /// A pruner that has not reached [PruneStage::Empty] yields its tree as
    /// is, whatever stage it is at.
    pub fn finish(self) -> PruneOutcome {
        if self.stage == PruneStage::Empty {
            return PruneOutcome::Empty(self.log);
        }
        info!(
            "Cleaned tree has {} leaves; {} nodes were removed",
            self.graph.num_leaves(),
            self.log.num_removed_nodes()
        );
        PruneOutcome::Cleaned(CleanedTree {
            graph: self.graph,
            log: self.log,
            taxonomy_tree: self.taxonomy_tree,
        })
    }
}

// ============================================================================
// Stages (pub)
// ============================================================================
impl Pruner {
    /// Removes everything outside the ingroup clade and makes the ingroup
    /// node the root.
    ///
    /// Without ingroup, or with the root as ingroup, nothing is removed.
    pub fn prune_to_ingroup(&mut self) -> Result<()> {
        let result = self.prune_to_ingroup_inner();
        self.advance(PruneStage::IngroupOnly, result)
    }

    /// Removes all leaves without taxon id, then collapses their parents.
    ///
    /// Running it again is a no-op.
    pub fn prune_unmapped_leaves(&mut self) -> Result<()> {
        self.check_not_empty()?;
        let result = self.prune_group(None, &PruneReason::UnmappedOtu);
        self.advance(PruneStage::Mapped, result)
    }

    /// Prunes the leaves mapped to each id of `reasons`, under that id's reason.
    ///
    /// Ids without leaves in the tree are skipped.
    pub fn prune_forced(&mut self, reasons: &BTreeMap<TaxonId, String>) -> Result<()> {
        self.check_not_empty()?;
        let result = self.prune_forced_ids(reasons);
        self.advance(self.stage, result)
    }

    /// Applies forced prunes and the taxonomy's view of the tree's taxa (see
    /// [TaxonRemapper]).
    pub fn remap_taxa<T: Taxonomy>(&mut self, taxonomy: T, config: &PruneConfig) -> Result<()> {
        self.check_not_empty()?;
        let result = TaxonRemapper::new(taxonomy, config)
            .apply(self)
            .map(|tree| self.taxonomy_tree = Some(tree));
        self.advance(PruneStage::Remapped, result)
    }

    /// Collapses every node touched by earlier stages that is still live, as
    /// well as every pass-through node (the root included) of the input.
    pub fn final_collapse(&mut self) -> Result<()> {
        self.check_not_empty()?;
        let mut candidates = std::mem::take(&mut self.touched);
        candidates.extend(
            self.graph
                .pre_order_iter()
                .filter(|&node| self.graph.out_degree(node) == 1),
        );
        let result = self.collapse(candidates);
        self.advance(PruneStage::Clean, result)
    }
}

// ============================================================================
// Group pruning (crate)
// ============================================================================
impl Pruner {
    pub(crate) fn graph_mut(&mut self) -> &mut TreeGraph {
        &mut self.graph
    }

    pub(crate) fn groups_mut(&mut self) -> &mut LeafGroups {
        self.groups
            .get_or_insert_with(|| LeafGroups::from_graph(&self.graph))
    }

    /// Removes the group of `taxon_id` and prunes its leaves for `reason`.
    pub(crate) fn prune_group(&mut self, taxon_id: Option<TaxonId>, reason: &PruneReason) -> Result<()> {
        match self.groups_mut().take(taxon_id) {
            Some(entries) => self.prune_entries(&entries, reason),
            None => Ok(()),
        }
    }

    /// Prunes the leaves of `entries` for `reason`, then collapses their
    /// former parents.
    pub(crate) fn prune_entries(&mut self, entries: &[LeafEntry], reason: &PruneReason) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }

        let mut removed = Removed::new();
        let mut parents = BTreeSet::new();
        let result = entries.iter().try_for_each(|entry| {
            parents.insert(self.graph.delete_tip(entry.node, &mut removed)?);
            Ok::<(), GraphError>(())
        });
        debug!("Pruned {} leaves as {}", removed.nodes.len(), reason);
        self.log.append(reason, removed);
        result?;

        self.touched.extend(parents.iter().copied());
        self.collapse(parents)
    }

    pub(crate) fn prune_forced_ids(&mut self, reasons: &BTreeMap<TaxonId, String>) -> Result<()> {
        for (&taxon_id, reason) in reasons {
            if self.groups_mut().contains(Some(taxon_id)) {
                self.prune_group(Some(taxon_id), &PruneReason::Forced(reason.clone()))?;
            }
        }
        Ok(())
    }

    /// Collapses low-degree nodes among `candidates`, logging removals as
    /// `became_trivial` and a replaced root as `revised_ingroup_node`.
    fn collapse(&mut self, candidates: BTreeSet<NodeIndex>) -> Result<()> {
        let mut removed = Removed::new();
        let result = self.graph.collapse_low_degree(candidates, &mut removed);
        self.log.append(&PruneReason::BecameTrivial, removed);

        if let Some(root) = result?.revised_root {
            let root_id = self.graph[root].id().to_string();
            debug!("Ingroup node replaced by '{}'", root_id);
            self.log.set_revised_ingroup_node(&root_id);
        }
        Ok(())
    }
}

// ============================================================================
// Helpers (private)
// ============================================================================
impl Pruner {
    fn prune_to_ingroup_inner(&mut self) -> Result<()> {
        let Some(ingroup) = self.graph.ingroup() else {
            debug!("No ingroup node was specified");
            return Ok(());
        };
        if ingroup == self.graph.root() {
            debug!("Ingroup node is root");
            return Ok(());
        }

        let edge = self
            .graph
            .parent_edge(ingroup)
            .ok_or_else(|| GraphError::NoParentEdge(self.graph[ingroup].id().to_string()))?;
        let mut removed = Removed::new();
        let result = self.graph.prune_edge_and_rootward(edge, &mut removed);
        debug!("Pruned {} outgroup nodes", removed.nodes.len());
        self.log.append(&PruneReason::Outgroup, removed);
        result?;

        self.graph.set_root(ingroup)?;
        self.groups = None;
        Ok(())
    }

    fn check_not_empty(&self) -> Result<()> {
        if self.stage == PruneStage::Empty {
            return Err(GraphError::EmptyTree.into());
        }
        Ok(())
    }

    /// Moves on to `stage` if `result` is fine; records an emptied tree.
    fn advance<R>(&mut self, stage: PruneStage, result: Result<R>) -> Result<R> {
        match &result {
            Ok(_) => self.stage = self.stage.max(stage),
            Err(PruneError::Graph(GraphError::EmptyTree)) => {
                info!("Tree became empty while at stage {:?}", self.stage);
                self.stage = PruneStage::Empty;
                self.log.mark_empty_tree();
            }
            Err(e) => error!("Cleaning aborted at stage {:?}: {}", self.stage, e),
        }
        result
    }
}
