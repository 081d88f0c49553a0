//! Minimal in-memory relational store
//!
//! The reference [`DataSource`] backend: named tables with ordered columns,
//! queried through the SQL subset in [`crate::query`]. Bare column names and
//! `*` only; anything richer belongs to a real backend behind the same trait.

use std::collections::HashMap;

use crate::query::{self, SelectColumn};
use crate::source::{DataSource, QueryResult, Row, SourceError};
use crate::value::Value;

/// A table held fully in memory. Rows are positional; `columns[i]` names
/// `rows[_][i]`.
#[derive(Debug, Clone, Default)]
pub struct MemTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    tables: HashMap<String, MemTable>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_table(&mut self, name: impl Into<String>, table: MemTable) {
        self.tables.insert(name.into(), table);
    }
}

impl DataSource for MemorySource {
    fn query(&self, text: &str) -> Result<QueryResult, SourceError> {
        let stmt = query::parse(text).map_err(|errs| SourceError::Parse(errs.join("; ")))?;

        let table = self
            .tables
            .get(&stmt.table)
            .ok_or_else(|| SourceError::UnknownTable(stmt.table.clone()))?;

        let mut columns = Vec::new();
        for column in &stmt.columns {
            match column {
                SelectColumn::Star => columns.extend(table.columns.iter().cloned()),
                SelectColumn::Named(name) => columns.push(name.clone()),
            }
        }

        let mut indices = Vec::with_capacity(columns.len());
        for name in &columns {
            let i = table
                .columns
                .iter()
                .position(|c| c == name)
                .ok_or_else(|| SourceError::UnknownColumn(name.clone()))?;
            indices.push(i);
        }

        let rows = table
            .rows
            .iter()
            .map(|row| {
                let mut values = Row::new();
                for &i in &indices {
                    values.insert(
                        table.columns[i].clone(),
                        row.get(i).cloned().unwrap_or(Value::Null),
                    );
                }
                values
            })
            .collect();

        Ok(QueryResult { columns, rows })
    }
}
