//! Typed index configuration
//!
//! An [`IndexConfiguration`] names one index variant and carries the settings
//! document pushed to the engine for it. Sets and maps are ordered so that the
//! serialized payload is deterministic: applying the same configuration twice
//! sends byte-identical settings.

use crate::search::error::{SearchError, SearchResult};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use std::str::FromStr;
use strum::{AsRefStr, Display, EnumString};
use validator::{Validate, ValidationError};

/// Sort direction, shared by custom ranking rules and sort clauses
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display, AsRefStr,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

/// Ranking criteria evaluated by the engine itself
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, Display, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum BuiltinRule {
    Words,
    Typo,
    Proximity,
    Attribute,
    Sort,
    Exactness,
}

/// One ranking rule; declared order is the tie-break priority
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum RankingRule {
    Builtin(BuiltinRule),
    Custom { field: String, order: SortOrder },
}

impl RankingRule {
    pub fn desc(field: impl Into<String>) -> Self {
        RankingRule::Custom {
            field: field.into(),
            order: SortOrder::Desc,
        }
    }

    pub fn asc(field: impl Into<String>) -> Self {
        RankingRule::Custom {
            field: field.into(),
            order: SortOrder::Asc,
        }
    }
}

impl fmt::Display for RankingRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RankingRule::Builtin(rule) => write!(f, "{}", rule),
            RankingRule::Custom { field, order } => write!(f, "{}:{}", field, order),
        }
    }
}

impl FromStr for RankingRule {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(rule) = s.parse::<BuiltinRule>() {
            return Ok(RankingRule::Builtin(rule));
        }

        match s.rsplit_once(':') {
            Some((field, order)) if !field.is_empty() => {
                let order = order
                    .parse::<SortOrder>()
                    .map_err(|_| format!("unknown sort order in ranking rule `{}`", s))?;
                Ok(RankingRule::Custom {
                    field: field.to_string(),
                    order,
                })
            }
            _ => Err(format!("unknown ranking rule `{}`", s)),
        }
    }
}

impl TryFrom<String> for RankingRule {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RankingRule> for String {
    fn from(rule: RankingRule) -> Self {
        rule.to_string()
    }
}

/// Typo thresholds expressed as minimum word lengths
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MinWordSizeForTypos {
    pub one_typo: u8,
    pub two_typos: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypoTolerance {
    pub enabled: bool,
    pub min_word_size_for_typos: MinWordSizeForTypos,
    pub disable_on_attributes: BTreeSet<String>,
}

impl Default for TypoTolerance {
    fn default() -> Self {
        Self {
            enabled: true,
            min_word_size_for_typos: MinWordSizeForTypos {
                one_typo: 5,
                two_typos: 9,
            },
            disable_on_attributes: BTreeSet::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    #[validate(range(min = 1, message = "maxTotalHits must be at least 1"))]
    pub max_total_hits: usize,
}

/// Ordering of facet values returned by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FacetValueSort {
    Alpha,
    Count,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Faceting {
    #[validate(range(min = 1, message = "maxValuesPerFacet must be at least 1"))]
    pub max_values_per_facet: usize,

    /// Facet name (or `*`) to value ordering
    pub sort_facet_values_by: BTreeMap<String, FacetValueSort>,
}

/// The settings document the engine receives for one index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "check_settings_consistency"))]
pub struct IndexSettings {
    pub filterable_attributes: BTreeSet<String>,

    pub sortable_attributes: BTreeSet<String>,

    /// Earlier attributes weigh more in relevance
    #[validate(length(min = 1, message = "searchableAttributes must not be empty"))]
    pub searchable_attributes: Vec<String>,

    /// Directed: `A -> B` says nothing about `B -> A`
    pub synonyms: BTreeMap<String, BTreeSet<String>>,

    pub stop_words: BTreeSet<String>,

    pub typo_tolerance: TypoTolerance,

    #[validate(length(min = 1, message = "rankingRules must not be empty"))]
    pub ranking_rules: Vec<RankingRule>,

    #[validate(nested)]
    pub pagination: Pagination,

    #[validate(nested)]
    pub faceting: Faceting,
}

fn check_settings_consistency(settings: &IndexSettings) -> Result<(), ValidationError> {
    let sizes = settings.typo_tolerance.min_word_size_for_typos;
    if sizes.one_typo > sizes.two_typos {
        let mut err = ValidationError::new("typo_thresholds");
        err.message = Some(Cow::from(format!(
            "minWordSizeForTypos.oneTypo ({}) must not exceed twoTypos ({})",
            sizes.one_typo, sizes.two_typos
        )));
        return Err(err);
    }

    let mut seen = HashSet::new();
    for rule in &settings.ranking_rules {
        if !seen.insert(rule) {
            let mut err = ValidationError::new("duplicate_ranking_rule");
            err.message = Some(Cow::from(format!("ranking rule `{}` is declared twice", rule)));
            return Err(err);
        }
    }

    Ok(())
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            filterable_attributes: BTreeSet::new(),
            sortable_attributes: BTreeSet::new(),
            searchable_attributes: vec!["*".to_string()],
            synonyms: BTreeMap::new(),
            stop_words: BTreeSet::new(),
            typo_tolerance: TypoTolerance::default(),
            ranking_rules: vec![
                RankingRule::Builtin(BuiltinRule::Words),
                RankingRule::Builtin(BuiltinRule::Typo),
                RankingRule::Builtin(BuiltinRule::Proximity),
                RankingRule::Builtin(BuiltinRule::Attribute),
                RankingRule::Builtin(BuiltinRule::Sort),
                RankingRule::Builtin(BuiltinRule::Exactness),
            ],
            pagination: Pagination {
                max_total_hits: 1000,
            },
            faceting: Faceting {
                max_values_per_facet: 100,
                sort_facet_values_by: BTreeMap::from([("*".to_string(), FacetValueSort::Alpha)]),
            },
        }
    }
}

/// A named index variant and the settings applied to it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct IndexConfiguration {
    /// Registry key, e.g. `v1`
    #[validate(length(min = 1, message = "name must not be empty"))]
    pub name: String,

    /// Engine-side index uid, e.g. `general_index_v1`
    #[validate(length(min = 1, message = "index uid must not be empty"))]
    pub index_uid: String,

    #[validate(length(min = 1, message = "primary key must not be empty"))]
    pub primary_key: String,

    #[validate(nested)]
    pub settings: IndexSettings,
}

impl IndexConfiguration {
    pub fn new(
        name: impl Into<String>,
        index_uid: impl Into<String>,
        primary_key: impl Into<String>,
        settings: IndexSettings,
    ) -> Self {
        Self {
            name: name.into(),
            index_uid: index_uid.into(),
            primary_key: primary_key.into(),
            settings,
        }
    }

    /// Check every invariant, reporting violations as a configuration error
    pub fn check(&self) -> SearchResult<()> {
        self.validate()
            .map_err(|e| SearchError::Configuration(format!("{}: {}", self.name, e)))
    }

    /// Start a new variant from this one's settings
    pub fn derive(&self, name: impl Into<String>, index_uid: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            index_uid: index_uid.into(),
            primary_key: self.primary_key.clone(),
            settings: self.settings.clone(),
        }
    }

    /// Merge directed synonym entries into the existing mapping
    pub fn with_synonyms<'a, I>(mut self, entries: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a [&'a str])>,
    {
        for (term, equivalents) in entries {
            self.settings
                .synonyms
                .entry(term.to_string())
                .or_default()
                .extend(equivalents.iter().map(|s| s.to_string()));
        }
        self
    }

    pub fn with_searchable_attributes<I, S>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.settings.searchable_attributes = attributes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_ranking_rules(mut self, rules: Vec<RankingRule>) -> Self {
        self.settings.ranking_rules = rules;
        self
    }

    pub fn with_typo_tolerance(mut self, typo_tolerance: TypoTolerance) -> Self {
        self.settings.typo_tolerance = typo_tolerance;
        self
    }

    pub fn is_sortable(&self, field: &str) -> bool {
        self.settings.sortable_attributes.contains(field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> IndexConfiguration {
        IndexConfiguration::new("v1", "general_index_v1", "id", IndexSettings::default())
    }

    #[test]
    fn test_ranking_rule_parsing() {
        assert_eq!(
            "exactness".parse::<RankingRule>().unwrap(),
            RankingRule::Builtin(BuiltinRule::Exactness)
        );
        assert_eq!(
            "weight:desc".parse::<RankingRule>().unwrap(),
            RankingRule::desc("weight")
        );
        assert!("bogus".parse::<RankingRule>().is_err());
        assert!("weight:sideways".parse::<RankingRule>().is_err());
        assert!(":desc".parse::<RankingRule>().is_err());
    }

    #[test]
    fn test_settings_serialize_in_engine_shape() {
        let mut settings = IndexSettings::default();
        settings.ranking_rules = vec![
            RankingRule::Builtin(BuiltinRule::Exactness),
            RankingRule::desc("weight"),
        ];
        settings.typo_tolerance.disable_on_attributes.insert("title".to_string());

        let doc = serde_json::to_value(&settings).unwrap();
        assert_eq!(doc["rankingRules"], serde_json::json!(["exactness", "weight:desc"]));
        assert_eq!(doc["typoTolerance"]["minWordSizeForTypos"]["oneTypo"], 5);
        assert_eq!(doc["typoTolerance"]["disableOnAttributes"], serde_json::json!(["title"]));
        assert_eq!(doc["faceting"]["sortFacetValuesBy"]["*"], "alpha");
        assert_eq!(doc["pagination"]["maxTotalHits"], 1000);
    }

    #[test]
    fn test_valid_configuration_passes() {
        assert!(sample().check().is_ok());
    }

    #[test]
    fn test_empty_searchable_attributes_rejected() {
        let config = sample().with_searchable_attributes(Vec::<String>::new());
        let err = config.check().unwrap_err();
        assert!(matches!(err, SearchError::Configuration(_)));
        assert!(err.to_string().contains("searchable_attributes"));
    }

    #[test]
    fn test_check_error_names_the_configuration() {
        let config = sample()
            .derive("v7", "general_index_v7")
            .with_ranking_rules(Vec::new());
        match config.check() {
            Err(SearchError::Configuration(message)) => assert!(message.starts_with("v7: ")),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_empty_ranking_rules_rejected() {
        let config = sample().with_ranking_rules(vec![]);
        assert!(matches!(config.check(), Err(SearchError::Configuration(_))));
    }

    #[test]
    fn test_typo_threshold_order_enforced() {
        let config = sample().with_typo_tolerance(TypoTolerance {
            enabled: true,
            min_word_size_for_typos: MinWordSizeForTypos {
                one_typo: 10,
                two_typos: 4,
            },
            disable_on_attributes: BTreeSet::new(),
        });
        let err = config.check().unwrap_err();
        assert!(err.to_string().contains("oneTypo"));
    }

    #[test]
    fn test_duplicate_ranking_rule_rejected() {
        let config = sample().with_ranking_rules(vec![
            RankingRule::Builtin(BuiltinRule::Words),
            RankingRule::Builtin(BuiltinRule::Words),
        ]);
        assert!(config.check().is_err());
    }

    #[test]
    fn test_zero_max_total_hits_rejected() {
        let mut config = sample();
        config.settings.pagination.max_total_hits = 0;
        assert!(config.check().is_err());
    }

    #[test]
    fn test_synonyms_are_directed_and_merged() {
        let config = sample()
            .with_synonyms([("UM", &["uninsured motorist"][..])])
            .with_synonyms([("UM", &["UM coverage"][..])]);

        let um = &config.settings.synonyms["UM"];
        assert_eq!(um.len(), 2);
        assert!(!config.settings.synonyms.contains_key("uninsured motorist"));
    }

    #[test]
    fn test_derive_keeps_settings() {
        let base = sample();
        let derived = base.derive("v3", "general_index_v3");
        assert_eq!(derived.settings, base.settings);
        assert_eq!(derived.name, "v3");
        assert_eq!(derived.primary_key, "id");
    }
}
