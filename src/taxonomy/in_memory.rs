//! A [Taxonomy] held entirely in memory.

use crate::error::TaxonomyError;
use crate::model::TaxonId;
use crate::taxonomy::{TaxonClassification, Taxonomy, TaxonomyTree};
use std::collections::{BTreeSet, HashMap, HashSet};

#[derive(Debug, Clone)]
struct TaxonRecord {
    name: String,
    parent: Option<TaxonId>,
    flags: BTreeSet<String>,
}

/// Where a taxon id currently points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The id is a current taxon
    Current(TaxonId),
    /// The id was merged into or renamed to this current taxon
    Forwarded(TaxonId),
    /// The id forwards to an id that is not a current taxon
    ForwardedToUnknown,
    /// The id is neither a current taxon nor forwarded
    Unknown,
}

// =#========================================================================#=
// IN-MEMORY TAXONOMY
// =#========================================================================$=
/// Taxonomy with parent links, names, per-taxon flags and a forwarding
/// table for merged or renamed ids.
///
/// # Example
/// ```
/// use std::collections::BTreeSet;
/// use treeclean::taxonomy::{InMemoryTaxonomy, Taxonomy};
///
/// let taxonomy = InMemoryTaxonomy::new()
///     .with_taxon(1, "Strigopidae", None)
///     .with_taxon(2, "Strigops habroptilus", Some(1))
///     .with_forward(3, 2);
///
/// let ids = BTreeSet::from([3]);
/// let classified = taxonomy.validate_and_classify(&ids, &BTreeSet::new(), None).unwrap();
/// assert_eq!(classified.renames.get(&3), Some(&2));
/// assert!(classified.mapped.contains(&2));
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemoryTaxonomy {
    taxa: HashMap<TaxonId, TaxonRecord>,
    forwards: HashMap<TaxonId, TaxonId>,
}

impl InMemoryTaxonomy {
    /// Creates an empty taxonomy.
    pub fn new() -> Self {
        InMemoryTaxonomy::default()
    }

    /// Adds (or replaces) a taxon.
    ///
    /// # Arguments
    /// * `id` - Taxon id
    /// * `name` - Current display name
    /// * `parent` - Parent taxon, [None] for a top-level taxon
    pub fn with_taxon(mut self, id: TaxonId, name: &str, parent: Option<TaxonId>) -> Self {
        self.taxa.insert(
            id,
            TaxonRecord {
                name: name.to_string(),
                parent,
                flags: BTreeSet::new(),
            },
        );
        self
    }

    /// Attaches flags (e.g. `extinct`, `barren`) to a taxon added before.
    pub fn with_flags(mut self, id: TaxonId, flags: &[&str]) -> Self {
        if let Some(record) = self.taxa.get_mut(&id) {
            record.flags.extend(flags.iter().map(|f| f.to_string()));
        }
        self
    }

    /// Records that the retired id `old` now forwards to `new`.
    pub fn with_forward(mut self, old: TaxonId, new: TaxonId) -> Self {
        self.forwards.insert(old, new);
        self
    }

    /// Returns whether `id` is a current taxon.
    pub fn contains(&self, id: TaxonId) -> bool {
        self.taxa.contains_key(&id)
    }

    /// Returns the number of current taxa.
    pub fn num_taxa(&self) -> usize {
        self.taxa.len()
    }

    /// Returns where `id` currently points, following forwards transitively.
    ///
    /// # Errors
    /// [TaxonomyError::Cycle] if forwards loop.
    pub fn resolve(&self, id: TaxonId) -> Result<Resolution, TaxonomyError> {
        if self.taxa.contains_key(&id) {
            return Ok(Resolution::Current(id));
        }

        let mut seen = HashSet::from([id]);
        let mut current = id;
        while let Some(&next) = self.forwards.get(&current) {
            if self.taxa.contains_key(&next) {
                return Ok(Resolution::Forwarded(next));
            }
            if !seen.insert(next) {
                return Err(TaxonomyError::Cycle(next));
            }
            current = next;
        }

        if current == id {
            Ok(Resolution::Unknown)
        } else {
            Ok(Resolution::ForwardedToUnknown)
        }
    }

    /// Returns whether taxon `id` is `ancestor` or lies below it.
    ///
    /// # Errors
    /// Fails for unknown taxa and looping parent links.
    pub fn is_within(&self, id: TaxonId, ancestor: TaxonId) -> Result<bool, TaxonomyError> {
        let mut seen = HashSet::new();
        let mut current = Some(id);
        while let Some(taxon) = current {
            if taxon == ancestor {
                return Ok(true);
            }
            if !seen.insert(taxon) {
                return Err(TaxonomyError::Cycle(taxon));
            }
            current = self.parent(taxon)?;
        }
        Ok(false)
    }

    fn parent(&self, id: TaxonId) -> Result<Option<TaxonId>, TaxonomyError> {
        self.taxa
            .get(&id)
            .map(|record| record.parent)
            .ok_or(TaxonomyError::UnknownTaxon(id))
    }

    fn is_flagged(&self, id: TaxonId, exclusion_flags: &BTreeSet<String>) -> bool {
        self.taxa
            .get(&id)
            .is_some_and(|record| !record.flags.is_disjoint(exclusion_flags))
    }
}

impl Taxonomy for InMemoryTaxonomy {
    fn validate_and_classify(
        &self,
        taxon_ids: &BTreeSet<TaxonId>,
        exclusion_flags: &BTreeSet<String>,
        working_root: Option<TaxonId>,
    ) -> Result<TaxonClassification, TaxonomyError> {
        let mut result = TaxonClassification::default();

        for &id in taxon_ids {
            let current = match self.resolve(id)? {
                Resolution::Current(current) | Resolution::Forwarded(current) => current,
                Resolution::ForwardedToUnknown => {
                    result.forwarded_to_unrecognized.insert(id);
                    continue;
                }
                Resolution::Unknown => {
                    result.unrecognized.insert(id);
                    continue;
                }
            };

            if self.is_flagged(current, exclusion_flags) {
                result.flag_excluded.insert(id);
                continue;
            }
            if let Some(root) = working_root {
                if !self.is_within(current, root)? {
                    result.above_root.insert(id);
                    continue;
                }
            }

            result.mapped.insert(current);
            if current != id {
                result.renames.insert(id, current);
            }
        }

        Ok(result)
    }

    fn induced_subtree(&self, taxon_ids: &BTreeSet<TaxonId>) -> Result<TaxonomyTree, TaxonomyError> {
        TaxonomyTree::induce(taxon_ids, |id| self.parent(id))
    }

    fn current_name(&self, taxon_id: TaxonId) -> Option<String> {
        self.taxa.get(&taxon_id).map(|record| record.name.clone())
    }
}

// ============================================================================
// Tests
// ============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    fn flags(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    // Aves(1) ─┬─ Apteryx(2) ─┬─ A. haastii(4)
    //          │              └─ A. owenii(5) [extinct]
    //          └─ Strigops(3) ── S. habroptilus(6)
    fn birds() -> InMemoryTaxonomy {
        InMemoryTaxonomy::new()
            .with_taxon(1, "Aves", None)
            .with_taxon(2, "Apteryx", Some(1))
            .with_taxon(3, "Strigops", Some(1))
            .with_taxon(4, "Apteryx haastii", Some(2))
            .with_taxon(5, "Apteryx owenii", Some(2))
            .with_taxon(6, "Strigops habroptilus", Some(3))
            .with_flags(5, &["extinct"])
            .with_forward(40, 4)
            .with_forward(41, 40)
            .with_forward(90, 91)
    }

    #[test]
    fn test_resolve_follows_forward_chains() {
        let taxonomy = birds();
        assert_eq!(taxonomy.resolve(4).unwrap(), Resolution::Current(4));
        assert_eq!(taxonomy.resolve(40).unwrap(), Resolution::Forwarded(4));
        assert_eq!(taxonomy.resolve(41).unwrap(), Resolution::Forwarded(4));
        assert_eq!(taxonomy.resolve(90).unwrap(), Resolution::ForwardedToUnknown);
        assert_eq!(taxonomy.resolve(77).unwrap(), Resolution::Unknown);
    }

    #[test]
    fn test_forward_cycle_is_an_error() {
        let taxonomy = InMemoryTaxonomy::new().with_forward(1, 2).with_forward(2, 1);
        assert!(matches!(taxonomy.resolve(1), Err(TaxonomyError::Cycle(_))));
    }

    #[test]
    fn test_classification_buckets() {
        let taxonomy = birds();
        let ids = BTreeSet::from([4, 5, 6, 41, 77, 90]);
        let result = taxonomy
            .validate_and_classify(&ids, &flags(&["extinct"]), Some(2))
            .unwrap();

        assert_eq!(result.mapped, BTreeSet::from([4]));
        assert_eq!(result.renames.get(&41), Some(&4));
        assert_eq!(result.flag_excluded, BTreeSet::from([5]));
        assert_eq!(result.above_root, BTreeSet::from([6]));
        assert_eq!(result.unrecognized, BTreeSet::from([77]));
        assert_eq!(result.forwarded_to_unrecognized, BTreeSet::from([90]));
    }

    #[test]
    fn test_flags_only_apply_when_requested() {
        let taxonomy = birds();
        let ids = BTreeSet::from([5]);
        let result = taxonomy.validate_and_classify(&ids, &BTreeSet::new(), None).unwrap();
        assert_eq!(result.mapped, BTreeSet::from([5]));
        assert!(result.flag_excluded.is_empty());
    }

    #[test]
    fn test_forwarded_ids_are_not_current_taxa() {
        let taxonomy = birds();
        assert_eq!(taxonomy.num_taxa(), 6);
        assert!(taxonomy.contains(4));
        assert!(!taxonomy.contains(40));
        assert!(!taxonomy.contains(77));
    }

    #[test]
    fn test_is_within() {
        let taxonomy = birds();
        assert!(taxonomy.is_within(4, 1).unwrap());
        assert!(taxonomy.is_within(2, 2).unwrap());
        assert!(!taxonomy.is_within(6, 2).unwrap());
    }

    #[test]
    fn test_current_name() {
        assert_eq!(birds().current_name(6).as_deref(), Some("Strigops habroptilus"));
        assert_eq!(birds().current_name(40), None);
    }
}
