//! Building search requests from raw query parameters
//!
//! The builder validates pagination, parses facets, validates sort clauses
//! against the bound configuration and runs the rewrite chain. It knows
//! nothing about the engine's wire format.

use crate::metrics::QUERY_REWRITES_TOTAL;
use crate::search::error::{SearchError, SearchResult};
use crate::search::facets::{FacetClause, FacetFilterParser};
use crate::search::registry::ConfigurationRegistry;
use crate::search::rewrite::QueryRewriter;
use crate::search::settings::{IndexConfiguration, SortOrder};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_LIMIT: i64 = 20;

fn default_page() -> i64 {
    DEFAULT_PAGE
}

fn default_limit() -> i64 {
    DEFAULT_LIMIT
}

/// Query parameters as they arrive over HTTP
///
/// `page` and `limit` are signed so that `0` and negative values reach
/// validation instead of failing deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawSearchParams {
    #[serde(default)]
    pub q: String,

    /// Comma-separated `field:value` filters
    #[serde(default)]
    pub facets: Option<String>,

    /// Comma-separated `field:asc|desc` clauses
    #[serde(default)]
    pub sort: Option<String>,

    #[serde(default = "default_page")]
    pub page: i64,

    #[serde(default = "default_limit")]
    pub limit: i64,
}

impl Default for RawSearchParams {
    fn default() -> Self {
        Self {
            q: String::new(),
            facets: None,
            sort: None,
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl RawSearchParams {
    pub fn query(q: impl Into<String>) -> Self {
        Self {
            q: q.into(),
            ..Default::default()
        }
    }

    pub fn with_facets(mut self, facets: impl Into<String>) -> Self {
        self.facets = Some(facets.into());
        self
    }

    pub fn with_sort(mut self, sort: impl Into<String>) -> Self {
        self.sort = Some(sort.into());
        self
    }

    pub fn with_page(mut self, page: i64, limit: i64) -> Self {
        self.page = page;
        self.limit = limit;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortClause {
    pub field: String,
    pub order: SortOrder,
}

impl fmt::Display for SortClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.field, self.order)
    }
}

/// An engine-agnostic search request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchRequest {
    /// Query text after rewriting
    pub query_text: String,
    pub offset: usize,
    pub limit: usize,
    pub filters: Vec<FacetClause>,
    pub sort: Option<Vec<SortClause>>,
}

/// Turns [`RawSearchParams`] into a [`SearchRequest`] for a configuration
#[derive(Clone)]
pub struct SearchRequestBuilder {
    registry: Arc<ConfigurationRegistry>,
    rewriter: Arc<QueryRewriter>,
}

impl SearchRequestBuilder {
    pub fn new(registry: Arc<ConfigurationRegistry>, rewriter: Arc<QueryRewriter>) -> Self {
        Self { registry, rewriter }
    }

    pub fn build(&self, config_name: &str, params: &RawSearchParams) -> SearchResult<SearchRequest> {
        if params.page < 1 {
            return Err(SearchError::Validation(format!(
                "page must be at least 1, got {}",
                params.page
            )));
        }
        if params.limit < 1 {
            return Err(SearchError::Validation(format!(
                "limit must be at least 1, got {}",
                params.limit
            )));
        }

        let configuration = self.registry.get(config_name).ok_or_else(|| {
            SearchError::IndexNotFound(format!("no configuration named `{}`", config_name))
        })?;

        let (offset, limit) = Self::pagination(params.page, params.limit)?;
        let sort = Self::parse_sort(&configuration, params.sort.as_deref())?;
        let filters = FacetFilterParser::parse(params.facets.as_deref());

        let rewritten = self.rewriter.rewrite_traced(config_name, &params.q);
        for rule in &rewritten.fired {
            QUERY_REWRITES_TOTAL
                .with_label_values(&[config_name, rule])
                .inc();
        }

        Ok(SearchRequest {
            query_text: rewritten.text,
            offset,
            limit,
            filters,
            sort,
        })
    }

    /// `offset = (page - 1) * limit`; both inputs already checked positive
    fn pagination(page: i64, limit: i64) -> SearchResult<(usize, usize)> {
        let overflow = || {
            SearchError::Validation(format!("page {} with limit {} is out of range", page, limit))
        };

        let page = usize::try_from(page).map_err(|_| overflow())?;
        let limit = usize::try_from(limit).map_err(|_| overflow())?;
        let offset = (page - 1).checked_mul(limit).ok_or_else(overflow)?;

        Ok((offset, limit))
    }

    fn parse_sort(
        configuration: &IndexConfiguration,
        raw: Option<&str>,
    ) -> SearchResult<Option<Vec<SortClause>>> {
        let Some(raw) = raw else {
            return Ok(None);
        };

        let mut clauses = Vec::new();
        for segment in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let (field, order) = segment.rsplit_once(':').ok_or_else(|| {
                SearchError::Validation(format!("sort clause `{}` must be `field:asc|desc`", segment))
            })?;
            let field = field.trim();

            let order = order.trim().parse::<SortOrder>().map_err(|_| {
                SearchError::Validation(format!(
                    "sort order in `{}` must be `asc` or `desc`",
                    segment
                ))
            })?;

            if !configuration.is_sortable(field) {
                return Err(SearchError::Validation(format!(
                    "`{}` is not sortable in configuration `{}`",
                    field, configuration.name
                )));
            }

            clauses.push(SortClause {
                field: field.to_string(),
                order,
            });
        }

        Ok(if clauses.is_empty() { None } else { Some(clauses) })
    }
}
