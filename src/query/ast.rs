//! AST for the subset of SQL the in-memory store executes

/// One entry of a SELECT projection list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectColumn {
    /// `*`: all columns of the table, in table order.
    Star,
    /// A bare column name.
    Named(String),
}

/// `SELECT <columns> FROM <table>`, the only statement form supported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Select {
    pub columns: Vec<SelectColumn>,
    pub table: String,
}
