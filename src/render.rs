//! Tag-extraction state machine and render entry point
//!
//! Consumes the HTML token stream, recognizes `<sql>` query blocks, executes
//! each block against its data source and binds the result into the rendering
//! context, re-emitting all other tokens verbatim. The stripped markup is then
//! handed to the template engine together with the populated context.
//!
//! The render is best-effort throughout: every recoverable problem is recorded
//! as a positioned [`RenderError`] and the render keeps going. Only I/O failure
//! of the input stream aborts.

use std::collections::BTreeMap;
use std::io::{self, Read};

use crate::error::{ErrorKind, RenderError};
use crate::html::{Token, TokenKind, Tokenizer};
use crate::position::LineCounter;
use crate::source::memory::MemorySource;
use crate::source::{DataSource, SourceError, SourceRegistry, IMPLICIT_SOURCE};
use crate::template;
use crate::value::Value;

/// Tag name of a query block.
pub const QUERY_TAG: &str = "sql";
/// Attribute selecting the data source.
const SRC_ATTR: &str = "src";
/// Attribute naming the context binding for the block's result rows.
const ID_ATTR: &str = "id";

/// The rendered document plus every error recorded along the way.
#[derive(Debug)]
pub struct RenderOutput {
    pub html: String,
    pub errors: Vec<RenderError>,
}

/// One open query block, from its start tag until the matching end tag.
#[derive(Debug)]
struct QueryBlock {
    /// Byte offset of the start tag, where this block's errors point.
    offset: usize,
    /// Source identifier from `src`, or the implicit store.
    src: String,
    /// Context name from `id`; empty means execute-but-don't-bind.
    binding: String,
    /// Accumulated raw body text, forwarded verbatim to the source.
    query: String,
}

/// Render an HTML document with embedded query blocks.
///
/// Recoverable document problems never fail the call; they come back in
/// [`RenderOutput::errors`]. Only an I/O error on `src` is fatal.
pub fn render<R: Read>(src: R, registry: &SourceRegistry) -> io::Result<RenderOutput> {
    Renderer::new(registry).render(src)
}

/// Per-render state: open block, rendering context and error list. Created for
/// one document and discarded afterwards; the registry may outlive it.
pub struct Renderer<'a> {
    registry: &'a SourceRegistry,
    /// Ephemeral store behind [`IMPLICIT_SOURCE`] when the registry has none.
    implicit: MemorySource,
    context: BTreeMap<String, Value>,
    errors: Vec<RenderError>,
    block: Option<QueryBlock>,
}

impl<'a> Renderer<'a> {
    pub fn new(registry: &'a SourceRegistry) -> Self {
        Renderer {
            registry,
            implicit: MemorySource::new(),
            context: BTreeMap::new(),
            errors: Vec::new(),
            block: None,
        }
    }

    /// Single synchronous pass: tokenize, execute blocks in document order,
    /// then substitute the context into the stripped markup.
    pub fn render<R: Read>(mut self, src: R) -> io::Result<RenderOutput> {
        let mut tokenizer = Tokenizer::new(LineCounter::new(src));
        let mut stripped: Vec<u8> = Vec::new();

        while let Some(token) = tokenizer.next_token()? {
            self.step(token, &mut stripped, tokenizer.get_ref());
        }

        if self.block.take().is_some() {
            let end = tokenizer.get_ref().consumed();
            self.record(
                tokenizer.get_ref(),
                end,
                ErrorKind::TagSyntax,
                format!("unterminated <{}> block", QUERY_TAG),
            );
        }

        let markup = String::from_utf8_lossy(&stripped).into_owned();
        let context = Value::Map(std::mem::take(&mut self.context));
        let (html, mut template_errors) = template::render(&markup, &[context]);
        self.errors.append(&mut template_errors);

        Ok(RenderOutput {
            html,
            errors: self.errors,
        })
    }

    fn step<R: Read>(&mut self, token: Token, out: &mut Vec<u8>, lc: &LineCounter<R>) {
        match &token.kind {
            TokenKind::StartTag(tag) if tag.name == QUERY_TAG => {
                if self.block.is_some() {
                    self.record(
                        lc,
                        token.offset,
                        ErrorKind::TagSyntax,
                        format!("nested <{}> tags are not allowed", QUERY_TAG),
                    );
                    return;
                }
                let src = match tag.attr(SRC_ATTR) {
                    Some(src) if !src.is_empty() => src.to_string(),
                    _ => IMPLICIT_SOURCE.to_string(),
                };
                let binding = tag.attr(ID_ATTR).unwrap_or("").to_string();
                if binding.is_empty() {
                    self.record(
                        lc,
                        token.offset,
                        ErrorKind::TagSyntax,
                        format!("missing required '{}' attribute", ID_ATTR),
                    );
                }
                self.block = Some(QueryBlock {
                    offset: token.offset,
                    src,
                    binding,
                    query: String::new(),
                });
            }
            TokenKind::EndTag(name) if name == QUERY_TAG => match self.block.take() {
                Some(block) => self.finish_block(lc, block),
                None => self.record(
                    lc,
                    token.offset,
                    ErrorKind::TagSyntax,
                    format!("unexpected end tag </{}>", QUERY_TAG),
                ),
            },
            TokenKind::SelfClosingTag(tag) if tag.name == QUERY_TAG && self.block.is_none() => {
                // An empty block: no body, nothing to execute, nothing emitted.
            }
            _ => match &mut self.block {
                // Block bodies are raw text regardless of HTML-significant
                // syntax; whatever tokenizes inside one feeds the query.
                Some(block) => block.query.push_str(&String::from_utf8_lossy(&token.raw)),
                None => out.extend_from_slice(&token.raw),
            },
        }
    }

    /// Close a block: resolve its source, run the query, bind the rows.
    fn finish_block<R: Read>(&mut self, lc: &LineCounter<R>, block: QueryBlock) {
        let source = match self.resolve(&block.src) {
            Ok(source) => source,
            Err(err) => {
                self.record(lc, block.offset, ErrorKind::SourceResolution, err.to_string());
                return;
            }
        };
        match source.query(&block.query) {
            Ok(result) => {
                if !block.binding.is_empty() {
                    let rows: Vec<Value> = result.rows.into_iter().map(Value::Map).collect();
                    self.context.insert(block.binding, Value::List(rows));
                }
            }
            Err(err) => {
                self.record(
                    lc,
                    block.offset,
                    ErrorKind::QueryExecution,
                    format!("executing query: {}", err),
                );
            }
        }
    }

    fn resolve(&self, id: &str) -> Result<&dyn DataSource, SourceError> {
        if let Some(source) = self.registry.get(id) {
            return Ok(source);
        }
        if id == IMPLICIT_SOURCE {
            return Ok(&self.implicit);
        }
        Err(SourceError::UnknownSource(id.to_string()))
    }

    fn record<R: Read>(
        &mut self,
        lc: &LineCounter<R>,
        offset: usize,
        kind: ErrorKind,
        message: String,
    ) {
        let (line, col) = lc.line_col(offset);
        self.errors.push(RenderError {
            line,
            col,
            span: offset..offset + 1,
            kind,
            message,
        });
    }
}
