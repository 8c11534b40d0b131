//! Applying the reference taxonomy to the leaves of a tree.

use crate::config::PruneConfig;
use crate::error::{GraphError, Result};
use crate::model::{PruneReason, TaxonId};
use crate::prune::Pruner;
use crate::taxonomy::{TaxonClassification, Taxonomy, TaxonomyTree};
use std::collections::BTreeSet;
use tracing::{debug, warn};

// =#========================================================================#=
// TAXON REMAPPER
// =#========================================================================$=
/// Prunes and renames leaf groups of a [Pruner] as directed by a [Taxonomy].
///
/// Steps, in order:
/// 1. forced prunes of the config, under their own reasons
/// 2. ids unknown to the taxonomy (`unrecognized_ott_id`)
/// 3. ids forwarding to unknown ids (`forwarded_to_unrecognized_ott_id`)
/// 4. ids of taxa carrying a cleaning flag (`flagged`)
/// 5. ids outside the working root (`above_root`)
/// 6. renamed ids: groups merged into the group of the current id, OTUs
///    rewritten to the current id and name
/// 7. ids that are ancestors of other mapped ids in the induced taxonomy
///    tree (`mapped_to_taxon_containing_other_mapped_tips`)
/// 8. all but the first leaf of each remaining group
///    (`replaced_by_exemplar_node` or `replaced_by_arbitrary_node`)
pub struct TaxonRemapper<'a, T> {
    taxonomy: T,
    config: &'a PruneConfig,
}

impl<'a, T: Taxonomy> TaxonRemapper<'a, T> {
    pub fn new(taxonomy: T, config: &'a PruneConfig) -> Self {
        TaxonRemapper { taxonomy, config }
    }

    /// Runs all steps on the tree of `pruner`.
    ///
    /// # Returns
    /// The taxonomy tree induced by the mapped taxa.
    ///
    /// # Errors
    /// * [GraphError::EmptyTree] if the mapped taxa do not induce a tree
    ///   with at least two tips, or pruning leaves no branching
    /// * taxonomy errors raised by the classification
    pub fn apply(&self, pruner: &mut Pruner) -> Result<TaxonomyTree> {
        let forced = self.config.forced_prune_reasons();
        pruner.prune_forced_ids(&forced)?;

        let taxon_ids: BTreeSet<TaxonId> = pruner.groups_mut().taxon_ids().into_iter().collect();
        let classified = self.taxonomy.validate_and_classify(
            &taxon_ids,
            &self.config.cleaning_flags,
            self.config.root_taxon,
        )?;
        debug!(
            "Classified {} taxa: {} mapped, {} renamed, {} unrecognized, {} flagged, {} above root",
            taxon_ids.len(),
            classified.mapped.len(),
            classified.renames.len(),
            classified.unrecognized.len() + classified.forwarded_to_unrecognized.len(),
            classified.flag_excluded.len(),
            classified.above_root.len()
        );

        self.prune_rejected(pruner, &classified)?;
        self.apply_renames(pruner, &classified);

        let tree = match self.taxonomy.induced_subtree(&classified.mapped) {
            Ok(tree) => tree,
            Err(e) => {
                warn!(
                    "No taxonomy tree induced by {} mapped taxa: {}",
                    classified.mapped.len(),
                    e
                );
                return Err(GraphError::EmptyTree.into());
            }
        };

        let (ancestors, retained): (Vec<TaxonId>, Vec<TaxonId>) = pruner
            .groups_mut()
            .taxon_ids()
            .into_iter()
            .partition(|&id| tree.has_children(id));
        for id in ancestors {
            pruner.prune_group(Some(id), &PruneReason::MappedToTaxonContainingOtherMappedTips)?;
        }

        for id in retained {
            let Some((kept, dropped)) = pruner.groups_mut().keep_first(Some(id)) else {
                continue;
            };
            let reason = if kept.is_exemplar() {
                PruneReason::ReplacedByExemplarNode
            } else {
                PruneReason::ReplacedByArbitraryNode
            };
            pruner.prune_entries(&dropped, &reason)?;
        }

        Ok(tree)
    }

    fn prune_rejected(&self, pruner: &mut Pruner, classified: &TaxonClassification) -> Result<()> {
        let rejected = [
            (&classified.unrecognized, PruneReason::UnrecognizedOttId),
            (
                &classified.forwarded_to_unrecognized,
                PruneReason::ForwardedToUnrecognizedOttId,
            ),
            (&classified.flag_excluded, PruneReason::Flagged),
            (&classified.above_root, PruneReason::AboveRoot),
        ];
        for (ids, reason) in rejected {
            for &id in ids {
                pruner.prune_group(Some(id), &reason)?;
            }
        }
        Ok(())
    }

    fn apply_renames(&self, pruner: &mut Pruner, classified: &TaxonClassification) {
        for (&old_id, &new_id) in &classified.renames {
            let name = self.taxonomy.current_name(new_id);
            let moved = pruner.groups_mut().merge_into(old_id, new_id, name.as_deref());
            debug!("Taxon {} renamed to {} for {} leaves", old_id, new_id, moved.len());

            for otu_id in moved.iter().filter_map(|entry| entry.otu_id.as_deref()) {
                if let Some(otu) = pruner.graph_mut().otu_mut(otu_id) {
                    otu.taxon_id = Some(new_id);
                    if name.is_some() {
                        otu.taxon_name.clone_from(&name);
                    }
                }
            }
        }
    }
}
