//! Access to the reference taxonomy.
//!
//! Cleaning only needs three capabilities from a taxonomy, captured by the
//! [Taxonomy] trait:
//! * classify the taxon ids used by a tree ([`Taxonomy::validate_and_classify`]),
//! * build the taxonomy tree induced by a set of ids ([`Taxonomy::induced_subtree`]),
//! * look up the current name of an id ([`Taxonomy::current_name`]).
//!
//! [InMemoryTaxonomy] implements the trait for taxonomies held in memory,
//! e.g. small test taxonomies or slices of a full one.

pub mod in_memory;
pub mod induced;

pub use in_memory::InMemoryTaxonomy;
pub use induced::{TaxonNode, TaxonomyTree};

use crate::error::TaxonomyError;
use crate::model::TaxonId;
use std::collections::{BTreeMap, BTreeSet};

// =#========================================================================#=
// CLASSIFICATION
// =#========================================================================$=
/// Outcome of checking a tree's taxon ids against the current taxonomy.
///
/// Every checked id lands in exactly one of `unrecognized`,
/// `forwarded_to_unrecognized`, `flag_excluded`, `above_root`, or is usable:
/// then its current id is in `mapped`, and if that differs from the checked
/// id, `renames` holds `checked id → current id`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaxonClassification {
    /// Current ids of all usable taxa
    pub mapped: BTreeSet<TaxonId>,
    /// Ids unknown to the taxonomy
    pub unrecognized: BTreeSet<TaxonId>,
    /// Ids forwarding to an id unknown to the taxonomy
    pub forwarded_to_unrecognized: BTreeSet<TaxonId>,
    /// Ids whose taxon carries one of the requested cleaning flags
    pub flag_excluded: BTreeSet<TaxonId>,
    /// Ids whose taxon is not within the working root
    pub above_root: BTreeSet<TaxonId>,
    /// Checked id → current id, for merged or forwarded ids
    pub renames: BTreeMap<TaxonId, TaxonId>,
}

// =#========================================================================#=
// TAXONOMY (trait)
// =#========================================================================T=
/// Read-only access to a reference taxonomy.
pub trait Taxonomy {
    /// Classifies `taxon_ids` against the current taxonomy.
    ///
    /// # Arguments
    /// * `taxon_ids` - Ids used by the leaves of a tree
    /// * `exclusion_flags` - Cleaning flags; taxa carrying any are excluded
    /// * `working_root` - Only taxa at or below this taxon are usable, if given
    fn validate_and_classify(
        &self,
        taxon_ids: &BTreeSet<TaxonId>,
        exclusion_flags: &BTreeSet<String>,
        working_root: Option<TaxonId>,
    ) -> Result<TaxonClassification, TaxonomyError>;

    /// Builds the taxonomy tree induced by `taxon_ids`.
    ///
    /// # Errors
    /// Fails with [TaxonomyError::Spike] if the ids induce fewer than two
    /// tips, and with other variants if they cannot form a tree at all.
    fn induced_subtree(&self, taxon_ids: &BTreeSet<TaxonId>) -> Result<TaxonomyTree, TaxonomyError>;

    /// Returns the current display name of `taxon_id`.
    fn current_name(&self, taxon_id: TaxonId) -> Option<String>;
}

impl<T: Taxonomy + ?Sized> Taxonomy for &T {
    fn validate_and_classify(
        &self,
        taxon_ids: &BTreeSet<TaxonId>,
        exclusion_flags: &BTreeSet<String>,
        working_root: Option<TaxonId>,
    ) -> Result<TaxonClassification, TaxonomyError> {
        (**self).validate_and_classify(taxon_ids, exclusion_flags, working_root)
    }

    fn induced_subtree(&self, taxon_ids: &BTreeSet<TaxonId>) -> Result<TaxonomyTree, TaxonomyError> {
        (**self).induced_subtree(taxon_ids)
    }

    fn current_name(&self, taxon_id: TaxonId) -> Option<String> {
        (**self).current_name(taxon_id)
    }
}
