//! Reference index variants for the insurance document corpus
//!
//! `v1` is the baseline. `v2` is expressed as a delta on `v1`: extra domain
//! synonyms, `headline` promoted to the most important searchable attribute
//! and a jargon-expansion rewrite rule. Adding a variant means adding an entry
//! here; request handling does not branch on variant names.

use crate::search::error::SearchResult;
use crate::search::registry::ConfigurationRegistry;
use crate::search::rewrite::{MatchMode, QueryRewriter, RewriteChain, TermExpansion};
use crate::search::settings::{
    BuiltinRule, FacetValueSort, Faceting, IndexConfiguration, IndexSettings,
    MinWordSizeForTypos, Pagination, RankingRule, TypoTolerance,
};
use std::collections::{BTreeMap, BTreeSet};

/// A configuration together with the rewrite chain bound to its name
#[derive(Debug, Clone)]
pub struct CatalogEntry {
    pub configuration: IndexConfiguration,
    pub rewrite_chain: RewriteChain,
}

const FILTERABLE_ATTRIBUTES: &[&str] = &[
    "id",
    "collection",
    "auto_line_hub",
    "property_line_hub",
    "liability_line_hub",
    "lms_collection",
    "lms_type",
    "lms_topic",
    "lms_lavel",
    "state",
    "legal_hub",
    "general_hub",
    "post_type",
    "adjuster_ce",
    "news_section",
    "published_on",
    "accessible_membership_plans",
    "accessible_roles",
    "course_prerequisite_enabled",
    "course_prerequisite",
    "course_final_quiz",
];

const SORTABLE_ATTRIBUTES: &[&str] = &[
    "course_length",
    "lms_length",
    "modified_on",
    "published_on",
    "title",
    "subject",
    "weight",
];

const SEARCHABLE_ATTRIBUTES: &[&str] = &[
    "title", "author", "excerpt", "content", "subject", "brief", "headline",
];

/// Insurance acronyms, declared in both directions
const ACRONYMS: &[(&str, &str)] = &[
    ("UM", "uninsured motorist"),
    ("UIM", "underinsured motorist"),
    ("ACV", "actual cash value"),
    ("ALE", "additional living expense"),
    ("ACC", "anti-concurrent causation"),
    ("BI", "business income"),
    ("FRV", "fair rental value"),
    ("AOB", "assignment of benefits"),
    ("EUO", "examination under oath"),
    ("BPP", "business personal property"),
    ("PIP", "personal injury protection"),
];

const STOP_WORDS: &[&str] = &[
    "a", "able", "all", "also", "am", "an", "and", "any", "are", "as", "at", "be", "because",
    "been", "but", "by", "can", "cannot", "could", "dear", "did", "do", "does", "else", "ever",
    "every", "for", "from", "get", "got", "had", "has", "have", "he", "her", "hers", "him", "how",
    "however", "i", "if", "in", "into", "is", "it", "its", "just", "let", "likely", "may", "me",
    "might", "must", "my", "no", "nor", "of", "often", "on", "only", "or", "other", "our", "own",
    "rather", "said", "say", "says", "she", "should", "since", "so", "some", "than", "that", "the",
    "their", "them", "then", "there", "these", "they", "this", "tis", "to", "too", "twas",
    "that'll", "that's", "there's", "they'd", "they'll", "they're", "us", "want", "wants", "was",
    "we", "what", "when", "where", "which", "who", "whom", "why", "will", "with", "would",
    "wasn't", "we'd", "we'll", "we're", "weren't", "what'd", "what's", "when'd", "when'll",
    "when's", "where'd", "where'll", "where's", "who'd", "who'll", "who's", "why'd", "why'll",
    "why's", "won't", "would've", "wouldn't",
];

/// Extra synonyms carried by v2 only
const V2_SYNONYMS: &[(&str, &[&str])] = &[
    ("policy cancellation", &["non-renewal", "cancellation"]),
    ("non-renewal", &["policy cancellation", "cancellation"]),
    ("insurance claim", &["claim", "claim process"]),
    ("claim", &["insurance claim", "claim process"]),
    ("coverage", &["insurance coverage"]),
];

fn strings<'a>(values: &'a [&'a str]) -> impl Iterator<Item = String> + 'a {
    values.iter().map(|s| s.to_string())
}

/// Settings shared by every reference variant
pub fn baseline_settings() -> IndexSettings {
    let mut synonyms: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for (acronym, phrase) in ACRONYMS {
        synonyms.insert(acronym.to_string(), [phrase.to_string()].into());
        synonyms.insert(phrase.to_string(), [acronym.to_string()].into());
    }

    IndexSettings {
        filterable_attributes: strings(FILTERABLE_ATTRIBUTES).collect(),
        sortable_attributes: strings(SORTABLE_ATTRIBUTES).collect(),
        searchable_attributes: strings(SEARCHABLE_ATTRIBUTES).collect(),
        synonyms,
        stop_words: strings(STOP_WORDS).collect(),
        typo_tolerance: TypoTolerance {
            enabled: true,
            min_word_size_for_typos: MinWordSizeForTypos {
                one_typo: 4,
                two_typos: 10,
            },
            disable_on_attributes: ["title".to_string()].into(),
        },
        ranking_rules: vec![
            RankingRule::Builtin(BuiltinRule::Exactness),
            RankingRule::Builtin(BuiltinRule::Proximity),
            RankingRule::Builtin(BuiltinRule::Attribute),
            RankingRule::Builtin(BuiltinRule::Words),
            RankingRule::Builtin(BuiltinRule::Typo),
            RankingRule::desc("weight"),
            RankingRule::Builtin(BuiltinRule::Sort),
        ],
        pagination: Pagination {
            max_total_hits: 80_000,
        },
        faceting: Faceting {
            max_values_per_facet: 500,
            sort_facet_values_by: BTreeMap::from([("*".to_string(), FacetValueSort::Alpha)]),
        },
    }
}

fn index_uid(prefix: &str, name: &str) -> String {
    format!("{}_{}", prefix, name)
}

/// The v1 (current) variant
pub fn v1(prefix: &str, primary_key: &str) -> CatalogEntry {
    CatalogEntry {
        configuration: IndexConfiguration::new(
            "v1",
            index_uid(prefix, "v1"),
            primary_key,
            baseline_settings(),
        ),
        rewrite_chain: RewriteChain::identity(),
    }
}

/// The v2 (enhanced) variant, derived from v1
pub fn v2(prefix: &str, primary_key: &str) -> SearchResult<CatalogEntry> {
    let base = v1(prefix, primary_key).configuration;

    let mut searchable = vec!["headline".to_string()];
    searchable.extend(
        base.settings
            .searchable_attributes
            .iter()
            .filter(|attr| attr.as_str() != "headline")
            .cloned(),
    );

    let configuration = base
        .derive("v2", index_uid(prefix, "v2"))
        .with_synonyms(V2_SYNONYMS.iter().copied())
        .with_searchable_attributes(searchable);

    let wildfire = TermExpansion::new("wildfire-expansion", "wildfire", "fire", MatchMode::Substring)?;

    Ok(CatalogEntry {
        configuration,
        rewrite_chain: RewriteChain::identity().with_rule(wildfire),
    })
}

/// Every reference variant, in registration order
pub fn default_catalog(prefix: &str, primary_key: &str) -> SearchResult<Vec<CatalogEntry>> {
    Ok(vec![v1(prefix, primary_key), v2(prefix, primary_key)?])
}

/// Register every entry and bind its rewrite chain
pub fn install(entries: Vec<CatalogEntry>, registry: &ConfigurationRegistry) -> QueryRewriter {
    let mut rewriter = QueryRewriter::new();
    for entry in entries {
        rewriter.bind(entry.configuration.name.clone(), entry.rewrite_chain);
        registry.register(entry.configuration);
    }
    rewriter
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_variants_are_valid() {
        for entry in default_catalog("general_index", "id").unwrap() {
            assert!(entry.configuration.check().is_ok(), "{}", entry.configuration.name);
        }
    }

    #[test]
    fn test_index_uids_follow_prefix() {
        let catalog = default_catalog("general_index", "id").unwrap();
        let uids: Vec<_> = catalog
            .iter()
            .map(|e| e.configuration.index_uid.as_str())
            .collect();
        assert_eq!(uids, vec!["general_index_v1", "general_index_v2"]);
    }

    #[test]
    fn test_baseline_synonyms_are_bidirectional_entries() {
        let settings = baseline_settings();
        assert_eq!(settings.synonyms.len(), 22);
        assert!(settings.synonyms["UM"].contains("uninsured motorist"));
        assert!(settings.synonyms["uninsured motorist"].contains("UM"));
    }

    #[test]
    fn test_v2_differs_from_v1_by_declared_deltas() {
        let v1 = v1("general_index", "id").configuration;
        let v2 = v2("general_index", "id").unwrap().configuration;

        assert_eq!(v2.settings.searchable_attributes[0], "headline");
        assert_eq!(
            v2.settings.searchable_attributes.len(),
            v1.settings.searchable_attributes.len()
        );
        assert_eq!(v2.settings.synonyms.len(), v1.settings.synonyms.len() + 5);
        assert_eq!(v2.settings.ranking_rules, v1.settings.ranking_rules);
        assert_eq!(v2.settings.stop_words, v1.settings.stop_words);
        assert_eq!(v2.settings.filterable_attributes, v1.settings.filterable_attributes);
    }

    #[test]
    fn test_rewrite_chains_bound_per_variant() {
        assert!(v1("general_index", "id").rewrite_chain.is_empty());
        assert_eq!(v2("general_index", "id").unwrap().rewrite_chain.len(), 1);
    }
}
