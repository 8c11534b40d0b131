//! Taxonomy trees induced by a set of taxon ids.

use crate::error::TaxonomyError;
use crate::model::TaxonId;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

// =#========================================================================#=
// TAXONOMY TREE
// =#========================================================================$=
/// A taxon of a [TaxonomyTree].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaxonNode {
    id: TaxonId,
    parent: Option<usize>,
    children: Vec<usize>,
}

impl TaxonNode {
    /// Returns the taxon id.
    pub fn id(&self) -> TaxonId {
        self.id
    }

    /// Returns the arena index of the parent, [None] for the root.
    pub fn parent(&self) -> Option<usize> {
        self.parent
    }

    /// Returns the arena indices of the children, ordered by taxon id.
    pub fn children(&self) -> &[usize] {
        &self.children
    }

    /// Returns whether this taxon has no children in the induced tree.
    pub fn is_tip(&self) -> bool {
        self.children.is_empty()
    }
}

/// The part of a taxonomy spanned by some taxa: every requested taxon plus
/// all taxa on the paths between them and their most recent common
/// ancestor. Monotypic intermediate taxa are kept.
///
/// A requested taxon is an internal node of this tree exactly if it is an
/// ancestor of another requested taxon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaxonomyTree {
    nodes: Vec<TaxonNode>,
    lookup: HashMap<TaxonId, usize>,
    root: usize,
}

impl TaxonomyTree {
    /// Induces the tree of `taxon_ids` from parent links.
    ///
    /// # Arguments
    /// * `taxon_ids` - Requested taxa
    /// * `parent_of` - Returns the parent of a taxon, [None] at the top of
    ///   the taxonomy, or an error for unknown taxa
    ///
    /// # Errors
    /// * [TaxonomyError::Disconnected] if the taxa have no common ancestor
    /// * [TaxonomyError::Cycle] if parent links loop
    /// * [TaxonomyError::Spike] if the induced tree has fewer than two tips
    /// * whatever `parent_of` reports
    pub fn induce<F>(taxon_ids: &BTreeSet<TaxonId>, mut parent_of: F) -> Result<Self, TaxonomyError>
    where
        F: FnMut(TaxonId) -> Result<Option<TaxonId>, TaxonomyError>,
    {
        // Union of all paths to the top, as child → parent
        let mut parents: BTreeMap<TaxonId, Option<TaxonId>> = BTreeMap::new();
        for &id in taxon_ids {
            let mut seen = HashSet::new();
            let mut current = id;
            loop {
                if !seen.insert(current) {
                    return Err(TaxonomyError::Cycle(current));
                }
                if parents.contains_key(&current) {
                    break;
                }
                let parent = parent_of(current)?;
                parents.insert(current, parent);
                match parent {
                    Some(p) => current = p,
                    None => break,
                }
            }
        }

        let mut children: BTreeMap<TaxonId, Vec<TaxonId>> = BTreeMap::new();
        let mut tops = Vec::new();
        for (&child, &parent) in &parents {
            match parent {
                Some(p) => children.entry(p).or_default().push(child),
                None => tops.push(child),
            }
        }
        let top = match tops.as_slice() {
            [top] => *top,
            [] => return Err(TaxonomyError::Spike(0)),
            _ => return Err(TaxonomyError::Disconnected),
        };

        // Move down to the most recent common ancestor
        let mut root = top;
        while !taxon_ids.contains(&root) {
            match children.get(&root).map(Vec::as_slice) {
                Some([only]) => root = *only,
                _ => break,
            }
        }

        let tree = Self::from_children(root, &children);
        let num_tips = tree.num_tips();
        if num_tips < 2 {
            return Err(TaxonomyError::Spike(num_tips));
        }
        Ok(tree)
    }

    fn from_children(root: TaxonId, children: &BTreeMap<TaxonId, Vec<TaxonId>>) -> Self {
        let mut tree = TaxonomyTree {
            nodes: Vec::new(),
            lookup: HashMap::new(),
            root: 0,
        };
        let mut stack = vec![(root, None)];
        while let Some((id, parent)) = stack.pop() {
            let index = tree.nodes.len();
            tree.nodes.push(TaxonNode {
                id,
                parent,
                children: Vec::new(),
            });
            tree.lookup.insert(id, index);
            if let Some(p) = parent {
                tree.nodes[p].children.push(index);
            }
            if let Some(kids) = children.get(&id) {
                stack.extend(kids.iter().rev().map(|&kid| (kid, Some(index))));
            }
        }
        tree
    }

    /// Returns the taxon with id `taxon_id`, if part of this tree.
    pub fn find(&self, taxon_id: TaxonId) -> Option<&TaxonNode> {
        self.lookup.get(&taxon_id).map(|&i| &self.nodes[i])
    }

    /// Returns whether `taxon_id` is part of this tree and has children.
    pub fn has_children(&self, taxon_id: TaxonId) -> bool {
        self.find(taxon_id).is_some_and(|n| !n.is_tip())
    }

    /// Returns the root taxon.
    pub fn root(&self) -> &TaxonNode {
        &self.nodes[self.root]
    }

    /// Returns the taxon at arena index `index`.
    ///
    /// # Panics
    /// Panics if `index` is out of bounds.
    pub fn node(&self, index: usize) -> &TaxonNode {
        &self.nodes[index]
    }

    /// Returns the number of taxa in this tree.
    pub fn num_taxa(&self) -> usize {
        self.nodes.len()
    }

    /// Returns the number of tips.
    pub fn num_tips(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_tip()).count()
    }

    /// Returns this tree in Newick format, every taxon labelled `ott<id>`.
    ///
    /// # Example
    /// ```
    /// use std::collections::BTreeSet;
    /// use treeclean::taxonomy::{InMemoryTaxonomy, Taxonomy};
    ///
    /// let taxonomy = InMemoryTaxonomy::new()
    ///     .with_taxon(1, "Aves", None)
    ///     .with_taxon(2, "Apteryx", Some(1))
    ///     .with_taxon(3, "Apteryx haastii", Some(2))
    ///     .with_taxon(4, "Apteryx owenii", Some(2));
    /// let tree = taxonomy.induced_subtree(&BTreeSet::from([3, 4])).unwrap();
    /// assert_eq!(tree.to_newick(), "(ott3,ott4)ott2;");
    /// ```
    pub fn to_newick(&self) -> String {
        fn build(tree: &TaxonomyTree, newick: &mut String, index: usize) {
            let node = &tree.nodes[index];
            if !node.children.is_empty() {
                newick.push('(');
                for (i, &child) in node.children.iter().enumerate() {
                    if i > 0 {
                        newick.push(',');
                    }
                    build(tree, newick, child);
                }
                newick.push(')');
            }
            newick.push_str("ott");
            newick.push_str(&node.id.to_string());
        }

        let mut newick = String::with_capacity(self.nodes.len() * 12);
        build(self, &mut newick, self.root);
        newick.push(';');
        newick
    }
}
