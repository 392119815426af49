//! Facet filter parsing
//!
//! Raw filters arrive as `field:value,field:value`. Parsing is permissive:
//! segments without a colon, with an empty field or value, or with a field
//! that is not a bare attribute name are dropped and the rest of the request
//! proceeds. Whether a field is actually filterable is left to the engine.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

lazy_static! {
    // Field names are spliced unquoted into the engine filter expression
    static ref FIELD_NAME: Regex = Regex::new(r"^[A-Za-z0-9_.\-]+$")
        .expect("Failed to compile facet field pattern");
}

/// A single `field:value` constraint
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FacetClause {
    pub field: String,
    pub value: String,
}

impl FacetClause {
    pub fn new(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for FacetClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.field, self.value)
    }
}

pub struct FacetFilterParser;

impl FacetFilterParser {
    /// Parse a comma-separated filter string, keeping input order
    pub fn parse(raw: Option<&str>) -> Vec<FacetClause> {
        let Some(raw) = raw else {
            return Vec::new();
        };

        raw.split(',').filter_map(Self::parse_segment).collect()
    }

    /// The field ends at the first colon; the value may contain colons
    fn parse_segment(segment: &str) -> Option<FacetClause> {
        let (field, value) = segment.trim().split_once(':')?;
        let (field, value) = (field.trim(), value.trim());

        if field.is_empty() || value.is_empty() {
            tracing::debug!(segment, "Dropping malformed facet segment");
            return None;
        }
        if !FIELD_NAME.is_match(field) {
            tracing::debug!(segment, field, "Dropping facet segment with invalid field name");
            return None;
        }

        Some(FacetClause::new(field, value))
    }
}
