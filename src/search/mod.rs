//! Configuration and query routing
//!
//! Two or more named index configurations share one document corpus. A search
//! against a name goes through the same pipeline regardless of which variant
//! it targets:
//!
//! ```text
//! raw params ──► FacetFilterParser ─┐
//!            └─► QueryRewriter ─────┴─► SearchRequestBuilder ─► SearchGateway ─► engine
//! ```
//!
//! - [`settings`]: the typed [`IndexConfiguration`] and its invariants
//! - [`catalog`]: the reference `v1`/`v2` variants
//! - [`registry`]: registration and idempotent application to the engine
//! - [`facets`], [`rewrite`], [`request`]: request shaping
//! - [`gateway`]: dispatch and response passthrough

pub mod catalog;
pub mod error;
pub mod facets;
pub mod gateway;
pub mod registry;
pub mod request;
pub mod rewrite;
pub mod settings;

pub use catalog::{default_catalog, install, CatalogEntry};
pub use error::{SearchError, SearchResult};
pub use facets::{FacetClause, FacetFilterParser};
pub use gateway::SearchGateway;
pub use registry::{ConfigurationRegistry, ConfigurationState, ConfigurationSummary};
pub use request::{RawSearchParams, SearchRequest, SearchRequestBuilder, SortClause};
pub use rewrite::{MatchMode, QueryRewriter, RewriteChain, RewriteRule, TermExpansion};
pub use settings::{IndexConfiguration, IndexSettings, RankingRule, SortOrder};
