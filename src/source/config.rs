//! TOML declaration of named data sources
//!
//! A sources file declares the registry a page renders against. Only the
//! `memory` source type exists here; network-backed sources plug in through
//! [`DataSource`] without touching this format.
//!
//! ```toml
//! [sources.persons]
//! type = "memory"
//!
//! [[sources.persons.tables]]
//! name = "persons"
//! columns = ["name", "age"]
//! rows = [["John", 20], ["Jane", 30]]
//! ```
//!
//! [`DataSource`]: crate::source::DataSource

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::source::memory::{MemTable, MemorySource};
use crate::source::SourceRegistry;
use crate::value::Value;

/// Errors that can occur when loading or parsing a sources file
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read sources file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse sources TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Deserialize)]
struct SourcesFile {
    #[serde(default)]
    sources: HashMap<String, SourceDecl>,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum SourceDecl {
    Memory {
        #[serde(default)]
        tables: Vec<TableDecl>,
    },
}

#[derive(Deserialize)]
struct TableDecl {
    name: String,
    columns: Vec<String>,
    #[serde(default)]
    rows: Vec<Vec<toml::Value>>,
}

/// Build a registry from a TOML sources file
pub fn load_file(path: &Path) -> Result<SourceRegistry, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    load_str(&content)
}

/// Build a registry from TOML text
pub fn load_str(content: &str) -> Result<SourceRegistry, ConfigError> {
    let parsed: SourcesFile = toml::from_str(content)?;

    let mut registry = SourceRegistry::new();
    for (name, decl) in parsed.sources {
        match decl {
            SourceDecl::Memory { tables } => {
                let mut source = MemorySource::new();
                for table in tables {
                    source.insert_table(
                        table.name,
                        MemTable {
                            columns: table.columns,
                            rows: table
                                .rows
                                .into_iter()
                                .map(|row| row.into_iter().map(Value::from).collect())
                                .collect(),
                        },
                    );
                }
                registry.insert(name, Box::new(source));
            }
        }
    }
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::IMPLICIT_SOURCE;
    use crate::value::Value;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = r#"
[sources.__mem__]
type = "memory"

[[sources.__mem__.tables]]
name = "persons"
columns = ["name", "age"]
rows = [["John", 20], ["Jane", 30]]
"#;

    #[test]
    fn test_load_memory_source() {
        let registry = load_str(SAMPLE).unwrap();
        let source = registry.get(IMPLICIT_SOURCE).unwrap();
        let res = source.query("SELECT * FROM persons").unwrap();
        assert_eq!(res.columns, vec!["name", "age"]);
        assert_eq!(res.rows[0]["age"], Value::Int(20));
        assert_eq!(res.rows[1]["name"], Value::Str("Jane".to_string()));
    }

    #[test]
    fn test_empty_file_gives_empty_registry() {
        let registry = load_str("").unwrap();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_unknown_source_type_is_an_error() {
        let result = load_str("[sources.x]\ntype = \"duckdb\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_toml_error() {
        let invalid = "this is not valid toml {{{{";
        assert!(load_str(invalid).is_err());
    }
}
