//! Render error accumulation and reporting
//!
//! Errors never abort a render: they are collected into a list and returned
//! alongside the best-effort output. `format` produces a source-annotated report
//! for terminal display using ariadne.

use std::fmt;

use ariadne::{Color, Label, Report, ReportKind, Source};

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

/// The stage a render error originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Query-block markup problems: nesting, unmatched or unterminated tags,
    /// missing required attributes.
    TagSyntax,
    /// The block's source identifier did not resolve to a data source.
    SourceResolution,
    /// The data source accepted the block but failed to execute its query.
    QueryExecution,
    /// Malformed or interleaved template tags.
    TemplateSyntax,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::TagSyntax => "tag syntax",
            ErrorKind::SourceResolution => "source resolution",
            ErrorKind::QueryExecution => "query execution",
            ErrorKind::TemplateSyntax => "template syntax",
        };
        f.write_str(name)
    }
}

/// A recoverable error recorded during a render, positioned in the source.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderError {
    /// 1-based line of the originating offset
    pub line: usize,
    /// 1-based column of the originating offset
    pub col: usize,
    /// Byte range in the source the error points at
    pub span: Span,
    pub kind: ErrorKind,
    pub message: String,
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}:{}] {}", self.line, self.col, self.message)
    }
}

impl RenderError {
    /// Format the error with source context using ariadne
    pub fn format(&self, source: &str, filename: &str) -> String {
        let mut span = self.span.clone();
        span.start = span.start.min(source.len());
        span.end = span.end.clamp(span.start, source.len());

        let mut buf = Vec::new();
        Report::build(ReportKind::Error, filename, span.start)
            .with_message(format!("{} error", self.kind))
            .with_label(
                Label::new((filename, span))
                    .with_message(&self.message)
                    .with_color(Color::Red),
            )
            .finish()
            .write((filename, Source::from(source)), &mut buf)
            .unwrap();
        String::from_utf8(buf).unwrap()
    }
}
