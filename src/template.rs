//! Context-driven template substitution
//!
//! Mustache-family semantics over [`Value`] contexts: escaped `{{name}}` and raw
//! `{{{name}}}` interpolation, sections `{{#name}}…{{/name}}`, inverted sections
//! `{{^name}}…{{/name}}`, comments `{{!…}}`, runtime delimiter switching
//! `{{=<% %>=}}`, dotted paths with optional constant indexes (`rows[1].name`),
//! and layout composition through the reserved `content` key.
//!
//! Lookup failures substitute empty output silently. Malformed tags are reported
//! as `[line N: message]` text embedded in the output plus a recorded
//! [`RenderError`]; rendering always continues.
//!
//! The node tree built here is transient: parsed per render, discarded after.

use std::collections::BTreeMap;

use crate::error::{ErrorKind, RenderError};
use crate::value::Value;

/// Reserved context key replaced by the rendered inner template in
/// [`render_in_layout`].
pub const CONTENT_KEY: &str = "content";

const DEFAULT_OTAG: &str = "{{";
const DEFAULT_CTAG: &str = "}}";

/// One dotted-path segment: a key plus optional constant indexes.
/// `None` marks a malformed index expression, which resolves to nothing.
#[derive(Debug, Clone, PartialEq)]
struct Segment {
    key: String,
    indexes: Vec<Option<usize>>,
}

type Path = Vec<Segment>;

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Text(String),
    Variable { path: Path, raw: bool },
    Section {
        name: String,
        path: Path,
        inverted: bool,
        children: Vec<Node>,
    },
}

/// Render a template against an ordered list of top-level contexts.
///
/// Contexts are consulted in the order given; earlier contexts shadow later
/// ones. Returns the rendered text plus any template syntax errors encountered.
pub fn render(template: &str, contexts: &[Value]) -> (String, Vec<RenderError>) {
    let (nodes, errors) = Parser::new(template).parse();
    let mut stack: Vec<&Value> = contexts.iter().rev().collect();
    let mut out = String::new();
    render_nodes(&nodes, &mut stack, &mut out);
    (out, errors)
}

/// Render `template`, then render `layout` with the result bound to the
/// reserved `content` key. The rendered inner output shadows any `content`
/// entry in the supplied contexts.
pub fn render_in_layout(
    template: &str,
    layout: &str,
    contexts: &[Value],
) -> (String, Vec<RenderError>) {
    let (inner, mut errors) = render(template, contexts);

    let mut content = BTreeMap::new();
    content.insert(CONTENT_KEY.to_string(), Value::Str(inner));
    let mut layered = Vec::with_capacity(contexts.len() + 1);
    layered.push(Value::Map(content));
    layered.extend(contexts.iter().cloned());

    let (out, mut layout_errors) = render(layout, &layered);
    errors.append(&mut layout_errors);
    (out, errors)
}

struct Frame {
    name: String,
    path: Path,
    inverted: bool,
    nodes: Vec<Node>,
}

impl Frame {
    fn root() -> Self {
        Frame {
            name: String::new(),
            path: Vec::new(),
            inverted: false,
            nodes: Vec::new(),
        }
    }
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
    otag: String,
    ctag: String,
    errors: Vec<RenderError>,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Parser {
            src,
            pos: 0,
            otag: DEFAULT_OTAG.to_string(),
            ctag: DEFAULT_CTAG.to_string(),
            errors: Vec::new(),
        }
    }

    fn parse(mut self) -> (Vec<Node>, Vec<RenderError>) {
        let mut stack = vec![Frame::root()];
        loop {
            match self.src[self.pos..].find(&self.otag) {
                None => {
                    let rest = &self.src[self.pos..];
                    if !rest.is_empty() {
                        current(&mut stack).nodes.push(Node::Text(rest.to_string()));
                    }
                    break;
                }
                Some(rel) => {
                    if rel > 0 {
                        let text = &self.src[self.pos..self.pos + rel];
                        current(&mut stack).nodes.push(Node::Text(text.to_string()));
                    }
                    self.pos += rel;
                    self.scan_tag(&mut stack);
                }
            }
        }
        while stack.len() > 1 {
            let frame = stack.pop().expect("stack underflow");
            let message = format!("unclosed section: {}", frame.name);
            let node = self.report(self.src.len(), &message);
            let parent = current(&mut stack);
            parent.nodes.push(Node::Section {
                name: frame.name,
                path: frame.path,
                inverted: frame.inverted,
                children: frame.nodes,
            });
            parent.nodes.push(node);
        }
        let root = stack.pop().expect("stack underflow");
        (root.nodes, self.errors)
    }

    /// Record a template syntax error and return its embedded-output text node.
    fn report(&mut self, pos: usize, message: &str) -> Node {
        let (line, col) = line_col(self.src, pos);
        let span_end = (pos + self.otag.len()).min(self.src.len());
        self.errors.push(RenderError {
            line,
            col,
            span: pos..span_end,
            kind: ErrorKind::TemplateSyntax,
            message: message.to_string(),
        });
        Node::Text(format!("[line {}: {}]", line, message))
    }

    /// Scan one tag starting at `self.pos` (which points at the open delimiter).
    fn scan_tag(&mut self, stack: &mut Vec<Frame>) {
        let tag_pos = self.pos;
        let after = tag_pos + self.otag.len();
        let rest = &self.src[after..];

        // Raw interpolation: open delimiter followed by `{`, closed by `}` plus
        // the close delimiter.
        if let Some(inner) = rest.strip_prefix('{') {
            let closer = format!("}}{}", self.ctag);
            match inner.find(&closer) {
                Some(rel) => {
                    let content = inner[..rel].trim();
                    let node = if content.is_empty() {
                        self.report(tag_pos, "empty tag")
                    } else {
                        Node::Variable {
                            path: parse_path(content),
                            raw: true,
                        }
                    };
                    // root-attached error nodes stay visible even inside
                    // untaken sections
                    match node {
                        n @ Node::Variable { .. } => current(stack).nodes.push(n),
                        n => stack[0].nodes.push(n),
                    }
                    self.pos = after + 1 + rel + closer.len();
                }
                None => {
                    let node = self.report(tag_pos, "unmatched open tag");
                    stack[0].nodes.push(node);
                    self.pos = self.src.len();
                }
            }
            return;
        }

        let Some(rel) = rest.find(&self.ctag) else {
            let node = self.report(tag_pos, "unmatched open tag");
            stack[0].nodes.push(node);
            self.pos = self.src.len();
            return;
        };
        let content = rest[..rel].trim();
        let end = after + rel + self.ctag.len();

        if content.is_empty() {
            let node = self.report(tag_pos, "empty tag");
            stack[0].nodes.push(node);
            self.pos = end;
            return;
        }

        match content.as_bytes()[0] {
            b'!' => {
                self.pos = end;
            }
            b'#' | b'^' => {
                let name = content[1..].trim().to_string();
                stack.push(Frame {
                    path: parse_path(&name),
                    name,
                    inverted: content.as_bytes()[0] == b'^',
                    nodes: Vec::new(),
                });
                self.pos = end;
                self.skip_newline();
            }
            b'/' => {
                let name = content[1..].trim().to_string();
                self.pos = end;
                self.skip_newline();
                self.close_section(stack, &name, tag_pos);
            }
            b'=' => {
                self.pos = end;
                let spec = content
                    .strip_prefix('=')
                    .and_then(|s| s.strip_suffix('='))
                    .map(str::trim)
                    .unwrap_or("");
                let parts: Vec<&str> = spec.split_whitespace().collect();
                if parts.len() == 2 {
                    self.otag = parts[0].to_string();
                    self.ctag = parts[1].to_string();
                } else {
                    let node = self.report(tag_pos, "invalid delimiter tag");
                    stack[0].nodes.push(node);
                }
            }
            _ => {
                current(stack).nodes.push(Node::Variable {
                    path: parse_path(content),
                    raw: false,
                });
                self.pos = end;
            }
        }
    }

    fn close_section(&mut self, stack: &mut Vec<Frame>, name: &str, tag_pos: usize) {
        if stack.len() > 1 && stack.last().map(|f| f.name.as_str()) == Some(name) {
            let frame = stack.pop().expect("stack underflow");
            current(stack).nodes.push(Node::Section {
                name: frame.name,
                path: frame.path,
                inverted: frame.inverted,
                children: frame.nodes,
            });
        } else if stack.iter().skip(1).any(|f| f.name == name) {
            // A close for an outer section while an inner one is still open:
            // report it against the named section and unwind through it.
            let message = format!("interleaved closing tag: {}", name);
            let node = self.report(tag_pos, &message);
            stack[0].nodes.push(node);
            loop {
                let frame = stack.pop().expect("stack underflow");
                let done = frame.name == name;
                current(stack).nodes.push(Node::Section {
                    name: frame.name,
                    path: frame.path,
                    inverted: frame.inverted,
                    children: frame.nodes,
                });
                if done {
                    break;
                }
            }
        } else {
            let message = format!("unexpected closing tag: {}", name);
            let node = self.report(tag_pos, &message);
            stack[0].nodes.push(node);
        }
    }

    /// Section open and close tags swallow one immediately-following newline, so
    /// a tag on its own line leaves no blank line behind.
    fn skip_newline(&mut self) {
        let rest = &self.src[self.pos..];
        if rest.starts_with("\r\n") {
            self.pos += 2;
        } else if rest.starts_with('\n') {
            self.pos += 1;
        }
    }
}

fn current(stack: &mut [Frame]) -> &mut Frame {
    stack.last_mut().expect("frame stack is never empty")
}

fn line_col(src: &str, pos: usize) -> (usize, usize) {
    let before = &src.as_bytes()[..pos.min(src.len())];
    let line = 1 + before.iter().filter(|&&b| b == b'\n').count();
    let line_start = before
        .iter()
        .rposition(|&b| b == b'\n')
        .map(|i| i + 1)
        .unwrap_or(0);
    (line, pos - line_start + 1)
}

fn parse_path(name: &str) -> Path {
    if name == "." {
        return vec![Segment {
            key: ".".to_string(),
            indexes: Vec::new(),
        }];
    }
    name.split('.').map(parse_segment).collect()
}

fn parse_segment(seg: &str) -> Segment {
    let Some(bracket) = seg.find('[') else {
        return Segment {
            key: seg.to_string(),
            indexes: Vec::new(),
        };
    };
    let key = seg[..bracket].to_string();
    let mut indexes = Vec::new();
    let mut rest = &seg[bracket..];
    while let Some(open) = rest.find('[') {
        match rest[open + 1..].find(']') {
            Some(close) => {
                let idx = rest[open + 1..open + 1 + close].trim().parse::<usize>().ok();
                indexes.push(idx);
                rest = &rest[open + close + 2..];
            }
            None => {
                indexes.push(None);
                break;
            }
        }
    }
    Segment { key, indexes }
}

fn render_nodes<'a>(nodes: &[Node], stack: &mut Vec<&'a Value>, out: &mut String) {
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Variable { path, raw } => {
                if let Some(value) = lookup(stack, path) {
                    let text = value.to_string();
                    if *raw {
                        out.push_str(&text);
                    } else {
                        out.push_str(&escape(&text));
                    }
                }
            }
            Node::Section {
                path,
                inverted,
                children,
                ..
            } => {
                let value = lookup(stack, path);
                let truthy = value.is_some_and(|v| v.is_truthy());
                if *inverted {
                    if !truthy {
                        render_nodes(children, stack, out);
                    }
                } else if truthy {
                    match value.expect("truthy value present") {
                        Value::List(items) => {
                            for item in items {
                                stack.push(item);
                                render_nodes(children, stack, out);
                                stack.pop();
                            }
                        }
                        other => {
                            stack.push(other);
                            render_nodes(children, stack, out);
                            stack.pop();
                        }
                    }
                }
            }
        }
    }
}

/// Resolve a path against the context stack, innermost level first.
///
/// Only the first segment falls back through enclosing levels; once it matches,
/// the remaining segments commit to that value and a miss yields `None`.
fn lookup<'a>(stack: &[&'a Value], path: &[Segment]) -> Option<&'a Value> {
    let first = path.first()?;
    let mut found: &'a Value = if first.key == "." {
        stack.last().copied()?
    } else {
        stack
            .iter()
            .rev()
            .find_map(|&level| level.get(&first.key))?
    };
    found = apply_indexes(found, &first.indexes)?;
    for seg in &path[1..] {
        found = field(found, &seg.key)?;
        found = apply_indexes(found, &seg.indexes)?;
    }
    Some(found)
}

/// Key lookup during dotted descent. Descending into a list without an explicit
/// index looks at its first element.
fn field<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    match value {
        Value::Map(entries) => entries.get(key),
        Value::List(items) => items.first().and_then(|item| field(item, key)),
        _ => None,
    }
}

fn apply_indexes<'a>(mut value: &'a Value, indexes: &[Option<usize>]) -> Option<&'a Value> {
    for idx in indexes {
        value = value.index((*idx)?)?;
    }
    Some(value)
}

/// HTML-escape `& < > " '`.
fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
