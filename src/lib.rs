//! sqlweave - render HTML pages with embedded SQL query blocks
//!
//! A page is ordinary HTML carrying `<sql>` blocks and mustache-style
//! placeholders. Rendering streams the document once: query blocks are stripped
//! and executed against named data sources, their result rows are bound into a
//! context, and the context is substituted into the remaining markup.
//!
//! ```html
//! <sql src="people" id="famous">SELECT name, age FROM persons</sql>
//! <ul>
//! {{#famous}}
//!   <li>{{name}}, {{age}}</li>
//! {{/famous}}
//! </ul>
//! ```
//!
//! Document problems (bad tags, failing queries, malformed placeholders) never
//! abort a render; they are collected as positioned [`RenderError`]s next to the
//! best-effort output.
//!
//! # Example
//!
//! ```rust
//! use sqlweave::source::memory::{MemTable, MemorySource};
//! use sqlweave::{render, SourceRegistry, Value, IMPLICIT_SOURCE};
//!
//! let mut db = MemorySource::new();
//! db.insert_table(
//!     "persons",
//!     MemTable {
//!         columns: vec!["name".into(), "age".into()],
//!         rows: vec![
//!             vec![Value::Str("John".into()), Value::Int(20)],
//!             vec![Value::Str("Jane".into()), Value::Int(30)],
//!         ],
//!     },
//! );
//! let mut sources = SourceRegistry::new();
//! sources.insert(IMPLICIT_SOURCE, Box::new(db));
//!
//! let page = r#"<sql id="p">SELECT name FROM persons</sql><ul>{{#p}}<li>{{name}}</li>{{/p}}</ul>"#;
//! let out = render(page.as_bytes(), &sources).unwrap();
//! assert_eq!(out.html, "<ul><li>John</li><li>Jane</li></ul>");
//! assert!(out.errors.is_empty());
//! ```

pub mod error;
pub mod html;
pub mod pipe;
pub mod position;
pub mod query;
pub mod render;
pub mod source;
pub mod template;
pub mod value;

pub use error::{ErrorKind, RenderError};
pub use render::{render, RenderOutput, Renderer, QUERY_TAG};
pub use source::{DataSource, QueryResult, SourceRegistry, IMPLICIT_SOURCE};
pub use value::Value;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_without_sources() {
        let registry = SourceRegistry::new();
        let out = render("<p>static</p>".as_bytes(), &registry).unwrap();
        assert_eq!(out.html, "<p>static</p>");
        assert!(out.errors.is_empty());
    }

    #[test]
    fn test_render_reports_unknown_source() {
        let registry = SourceRegistry::new();
        let out = render(
            r#"<sql src="a://b" id="x">SELECT 1</sql>"#.as_bytes(),
            &registry,
        )
        .unwrap();
        assert_eq!(out.errors.len(), 1);
        assert_eq!(out.errors[0].kind, ErrorKind::SourceResolution);
    }
}
