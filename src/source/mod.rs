//! Data sources: the query-executing capabilities query blocks run against
//!
//! The renderer is agnostic to query language and backend; all it needs is a
//! name-addressable object with a single `query` operation. Sources are held in
//! a [`SourceRegistry`] keyed by the identifier that appears in a block's `src`
//! attribute. One identifier is reserved: [`IMPLICIT_SOURCE`] names the
//! ephemeral per-render in-memory store used when `src` is absent.

pub mod config;
pub mod memory;

use std::collections::{BTreeMap, HashMap};

use thiserror::Error;

use crate::value::Value;

/// Reserved identifier for the per-render in-memory store.
pub const IMPLICIT_SOURCE: &str = "__mem__";

/// One result row: column name to value. Duplicate column names collapse to the
/// last occurrence; positional access goes through [`QueryResult::columns`].
pub type Row = BTreeMap<String, Value>;

/// Result of executing a query: ordered column names plus rows.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

/// Errors a data source can produce.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("parsing query: {0}")]
    Parse(String),
    #[error("table {0:?} not found")]
    UnknownTable(String),
    #[error("column {0:?} not found")]
    UnknownColumn(String),
    #[error("unknown data source {0:?}")]
    UnknownSource(String),
}

/// An opaque query-executing capability.
pub trait DataSource {
    /// Execute the query text verbatim and return its result.
    fn query(&self, text: &str) -> Result<QueryResult, SourceError>;
}

/// Name-addressable collection of data sources for a render.
///
/// The registry may be shared across renders by the caller; each `query` call is
/// treated as independent (no pooling, caching or retries).
#[derive(Default)]
pub struct SourceRegistry {
    sources: HashMap<String, Box<dyn DataSource>>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, source: Box<dyn DataSource>) {
        self.sources.insert(name.into(), source);
    }

    pub fn get(&self, name: &str) -> Option<&dyn DataSource> {
        self.sources.get(name).map(|s| s.as_ref())
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::memory::MemorySource;

    #[test]
    fn test_registry_lookup() {
        let mut registry = SourceRegistry::new();
        assert!(registry.get("persons").is_none());
        registry.insert("persons", Box::new(MemorySource::new()));
        assert!(registry.get("persons").is_some());
        assert!(registry.get(IMPLICIT_SOURCE).is_none());
    }
}
