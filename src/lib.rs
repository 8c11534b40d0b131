//! Treeclean prepares curated phylogenetic input trees for supertree
//! synthesis.
//!
//! Given a tree as stored by the curation database and a reference
//! taxonomy, it produces a minimal tree that only holds leaves
//! unambiguously mapped to current taxa, with redundant internal structure
//! collapsed, plus a log of everything removed and why.
//!
//! Core functionality provided:
//! - [model]: the input shape ([TreeFragment](model::TreeFragment)), the
//!   mutable [TreeGraph](model::TreeGraph) with invariant-preserving
//!   primitives, leaf grouping by taxon, and the [DeletionLog].
//! - [taxonomy]: the [Taxonomy] capabilities cleaning relies on, and an
//!   in-memory implementation.
//! - [prune]: the [Pruner], which runs the cleaning stages and yields a
//!   [PruneOutcome], either a cleaned tree or an empty one.
//! - [newick]: Newick output of cleaned trees.
//! - [config]: cleaning flags, working root and forced prunes.
//!
//! Limitations:
//! - One tree per run; batches of trees are up to the caller
//! - Taxonomy access is synchronous
//!
//! # Usage
//! ```
//! use treeclean::{PruneConfig, StudyFragment, clean_tree};
//! use treeclean::newick::NewickStyle;
//! use treeclean::taxonomy::InMemoryTaxonomy;
//!
//! let study = StudyFragment::from_json_str(r#"{
//!     "trees": {"tree1": {
//!         "nodeById": {"n1": {}, "n2": {}, "n3": {"@otu": "o1"},
//!                      "n4": {"@otu": "o2"}, "n5": {"@otu": "o3"}},
//!         "edgeBySourceId": {
//!             "n1": {"e1": {"@source": "n1", "@target": "n2"},
//!                    "e2": {"@source": "n1", "@target": "n5"}},
//!             "n2": {"e3": {"@source": "n2", "@target": "n3"},
//!                    "e4": {"@source": "n2", "@target": "n4"}}
//!         },
//!         "^ot:rootNodeId": "n1",
//!         "^ot:inGroupClade": "n2"
//!     }},
//!     "otus": {
//!         "o1": {"^ot:ottId": 2, "^ot:ottTaxonName": "Apteryx haastii"},
//!         "o2": {"^ot:ottId": 3, "^ot:ottTaxonName": "Apteryx owenii"},
//!         "o3": {"^ot:ottId": 9, "^ot:ottTaxonName": "Struthio camelus"}
//!     }
//! }"#).unwrap();
//! let taxonomy = InMemoryTaxonomy::new()
//!     .with_taxon(1, "Apteryx", None)
//!     .with_taxon(2, "Apteryx haastii", Some(1))
//!     .with_taxon(3, "Apteryx owenii", Some(1));
//!
//! let outcome = clean_tree(&study, "tree1", &taxonomy, &PruneConfig::default()).unwrap();
//! let cleaned = outcome.cleaned().unwrap();
//! assert_eq!(
//!     cleaned.to_newick(NewickStyle::OttId),
//!     "(ott2,ott3);"
//! );
//! assert!(cleaned.log.contains_node(&treeclean::PruneReason::Outgroup, "n5"));
//! ```

pub mod config;
pub mod error;
pub mod model;
pub mod newick;
pub mod prune;
pub mod taxonomy;

pub use config::PruneConfig;
pub use error::{GraphError, PruneError, Result, TaxonomyError};
pub use model::{DeletionLog, PruneReason, StudyFragment, TreeFragment, TreeGraph};
pub use prune::{CleanedTree, PruneOutcome, PruneStage, Pruner, TaxonRemapper, clean_tree};
pub use taxonomy::{InMemoryTaxonomy, Taxonomy};
