//! Settings for cleaning a tree.
//!
//! [PruneConfig] is deserialized from JSON by the caller (locating and
//! reading the file is up to the workflow). All fields are optional.

use crate::error::{PruneError, Result};
use crate::model::TaxonId;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};

/// Taxonomy flags excluded from synthesis unless configured otherwise.
pub const DEFAULT_CLEANING_FLAGS: &str = "major_rank_conflict,major_rank_conflict_inherited,\
environmental,environmental_inherited,unclassified,unclassified_inherited,viral,barren,\
not_otu,hidden,was_container,inconsistent,hybrid,merged";

/// Options for [Pruner](crate::prune::Pruner) runs.
///
/// # Example
/// ```
/// use treeclean::config::PruneConfig;
///
/// let config = PruneConfig::from_json_str(r#"{
///     "cleaning_flags": "extinct, barren",
///     "root_taxon": 81461,
///     "forced_prunes": {"not_monophyletic": [5, 6]}
/// }"#).unwrap();
/// assert!(config.cleaning_flags.contains("extinct"));
/// assert_eq!(config.root_taxon, Some(81461));
/// assert_eq!(config.forced_prune_reasons()[&6], "not_monophyletic");
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PruneConfig {
    /// Taxa carrying any of these flags are pruned
    #[serde(deserialize_with = "deserialize_flags")]
    pub cleaning_flags: BTreeSet<String>,

    /// Working root; taxa outside of it are pruned
    pub root_taxon: Option<TaxonId>,

    /// Prunes demanded by an upstream taxonomy-cleaning pass: reason → ids
    pub forced_prunes: BTreeMap<String, Vec<TaxonId>>,

    /// Whether to keep the induced taxonomy tree in the outcome
    pub taxonomy_tree: bool,
}

impl Default for PruneConfig {
    fn default() -> Self {
        PruneConfig {
            cleaning_flags: parse_flag_list(DEFAULT_CLEANING_FLAGS),
            root_taxon: None,
            forced_prunes: BTreeMap::new(),
            taxonomy_tree: true,
        }
    }
}

impl PruneConfig {
    /// Parses a configuration from JSON; missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(PruneError::Config)
    }

    /// Sets the working root.
    pub fn with_root_taxon(mut self, root: TaxonId) -> Self {
        self.root_taxon = Some(root);
        self
    }

    /// Replaces the cleaning flags by the comma-separated `flags`.
    pub fn with_cleaning_flags(mut self, flags: &str) -> Self {
        self.cleaning_flags = parse_flag_list(flags);
        self
    }

    /// Adds forced prunes of `ids` for `reason`.
    pub fn with_forced_prunes(mut self, reason: &str, ids: &[TaxonId]) -> Self {
        self.forced_prunes
            .entry(reason.to_string())
            .or_default()
            .extend_from_slice(ids);
        self
    }

    /// Inverts `forced_prunes` into id → reason.
    ///
    /// If an id is listed under several reasons, the reason sorting last wins.
    pub fn forced_prune_reasons(&self) -> BTreeMap<TaxonId, String> {
        let mut reasons = BTreeMap::new();
        for (reason, ids) in &self.forced_prunes {
            for &id in ids {
                reasons.insert(id, reason.clone());
            }
        }
        reasons
    }
}

/// Splits a comma-separated flag list, trimming entries and dropping empty ones.
///
/// # Examples
/// ```
/// # use treeclean::config::parse_flag_list;
/// let flags = parse_flag_list(" extinct, barren,,hidden ");
/// assert_eq!(flags.len(), 3);
/// assert!(flags.contains("barren"));
/// ```
pub fn parse_flag_list(flags: &str) -> BTreeSet<String> {
    flags
        .split(',')
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .map(str::to_string)
        .collect()
}

/// Accepts flags either as comma-separated string or as list of strings.
fn deserialize_flags<'de, D>(deserializer: D) -> std::result::Result<BTreeSet<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flags {
        Joined(String),
        Listed(Vec<String>),
    }

    Ok(match Flags::deserialize(deserializer)? {
        Flags::Joined(joined) => parse_flag_list(&joined),
        Flags::Listed(listed) => listed
            .iter()
            .flat_map(|entry| parse_flag_list(entry))
            .collect(),
    })
}

// ============================================================================
// Tests
// ============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_json_gives_defaults() {
        let config = PruneConfig::from_json_str("{}").unwrap();
        assert_eq!(config, PruneConfig::default());
        assert!(config.cleaning_flags.contains("barren"));
        assert!(config.taxonomy_tree);
    }

    #[test]
    fn test_flags_as_list() {
        let config = PruneConfig::from_json_str(r#"{"cleaning_flags": ["extinct", " hidden"]}"#).unwrap();
        assert_eq!(
            config.cleaning_flags,
            BTreeSet::from(["extinct".to_string(), "hidden".to_string()])
        );
    }

    #[test]
    fn test_later_reason_wins() {
        let config = PruneConfig::default()
            .with_forced_prunes("a_reason", &[1, 2])
            .with_forced_prunes("b_reason", &[2]);
        let reasons = config.forced_prune_reasons();
        assert_eq!(reasons[&1], "a_reason");
        assert_eq!(reasons[&2], "b_reason");
    }

    #[test]
    fn test_bad_json_is_a_config_error() {
        let err = PruneConfig::from_json_str(r#"{"root_taxon": "not a number"}"#).unwrap_err();
        assert!(matches!(err, PruneError::Config(_)));
    }
}
