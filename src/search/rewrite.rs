//! Query rewriting
//!
//! Each configuration name is bound to a [`RewriteChain`]: an ordered list of
//! pure rules. A chain runs every rule exactly once, in declared order, each
//! rule seeing the previous rule's output. Rules only ever append to the
//! query, so the input is always a prefix of the output.

use crate::search::error::{SearchError, SearchResult};
use regex::{Regex, RegexBuilder};
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

/// A deterministic, side-effect-free query transformation
pub trait RewriteRule: Debug + Send + Sync {
    /// Stable identifier, used in logs and metrics
    fn name(&self) -> &str;

    /// Whether this rule applies to `query`
    fn matches(&self, query: &str) -> bool;

    /// Rewrite a query this rule matched
    fn apply(&self, query: &str) -> String;
}

/// How a trigger term is located in the query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    /// Case-insensitive substring; `wildfires` matches `wildfire`
    Substring,
    /// Case-insensitive whole-token match on word boundaries
    Token,
}

/// "If the query mentions `trigger`, append `expansion`"
#[derive(Debug, Clone)]
pub struct TermExpansion {
    name: String,
    trigger: String,
    expansion: String,
    mode: MatchMode,
    token_pattern: Option<Regex>,
}

impl TermExpansion {
    pub fn new(
        name: impl Into<String>,
        trigger: impl Into<String>,
        expansion: impl Into<String>,
        mode: MatchMode,
    ) -> SearchResult<Self> {
        let name = name.into();
        let trigger = trigger.into().trim().to_lowercase();
        let expansion = expansion.into().trim().to_string();

        if trigger.is_empty() || expansion.is_empty() {
            return Err(SearchError::Configuration(format!(
                "rewrite rule `{}` needs a non-empty trigger and expansion",
                name
            )));
        }

        // `\b` only anchors next to word characters
        let is_word = |c: char| c.is_alphanumeric() || c == '_';
        let word_edges = trigger.starts_with(is_word) && trigger.ends_with(is_word);
        if mode == MatchMode::Token && !word_edges {
            return Err(SearchError::Configuration(format!(
                "rewrite rule `{}`: token trigger `{}` must start and end with a word character",
                name, trigger
            )));
        }

        let token_pattern = match mode {
            MatchMode::Substring => None,
            MatchMode::Token => Some(
                RegexBuilder::new(&format!(r"\b{}\b", regex::escape(&trigger)))
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| {
                        SearchError::Configuration(format!("rewrite rule `{}`: {}", name, e))
                    })?,
            ),
        };

        Ok(Self {
            name,
            trigger,
            expansion,
            mode,
            token_pattern,
        })
    }

    pub fn mode(&self) -> MatchMode {
        self.mode
    }
}

impl RewriteRule for TermExpansion {
    fn name(&self) -> &str {
        &self.name
    }

    fn matches(&self, query: &str) -> bool {
        match &self.token_pattern {
            Some(pattern) => pattern.is_match(query),
            None => query.to_lowercase().contains(&self.trigger),
        }
    }

    fn apply(&self, query: &str) -> String {
        format!("{} {}", query, self.expansion)
    }
}

/// Ordered rules bound to one configuration
#[derive(Debug, Clone, Default)]
pub struct RewriteChain {
    rules: Vec<Arc<dyn RewriteRule>>,
}

/// Output of a chain run together with the rules that fired
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewritten {
    pub text: String,
    pub fired: Vec<String>,
}

impl RewriteChain {
    /// A chain that leaves every query untouched
    pub fn identity() -> Self {
        Self::default()
    }

    pub fn with_rule(mut self, rule: impl RewriteRule + 'static) -> Self {
        self.rules.push(Arc::new(rule));
        self
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn rule_names(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    pub fn run(&self, query: &str) -> Rewritten {
        let mut text = query.to_string();
        let mut fired = Vec::new();

        for rule in &self.rules {
            if rule.matches(&text) {
                text = rule.apply(&text);
                fired.push(rule.name().to_string());
            }
        }

        Rewritten { text, fired }
    }
}

/// Looks up the chain bound to a configuration name and runs it
#[derive(Debug, Clone, Default)]
pub struct QueryRewriter {
    chains: HashMap<String, RewriteChain>,
}

impl QueryRewriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind (or rebind) the chain for a configuration name
    pub fn bind(&mut self, config_name: impl Into<String>, chain: RewriteChain) {
        self.chains.insert(config_name.into(), chain);
    }

    pub fn chain(&self, config_name: &str) -> Option<&RewriteChain> {
        self.chains.get(config_name)
    }

    /// Rewrite `query` for `config_name`; unknown names get the identity chain
    pub fn rewrite(&self, config_name: &str, query: &str) -> String {
        self.rewrite_traced(config_name, query).text
    }

    pub fn rewrite_traced(&self, config_name: &str, query: &str) -> Rewritten {
        let rewritten = match self.chains.get(config_name) {
            Some(chain) => chain.run(query),
            None => Rewritten {
                text: query.to_string(),
                fired: Vec::new(),
            },
        };

        if !rewritten.fired.is_empty() {
            tracing::debug!(
                config = config_name,
                rules = ?rewritten.fired,
                original = query,
                rewritten = %rewritten.text,
                "Query rewritten"
            );
        }

        rewritten
    }
}
