use std::{cell::RefCell, rc::Rc};

use crate::diagnostics::{Position, SourceSpan};

/// Name substituted for snippets registered without one.
pub const DEFAULT_SOURCE_NAME: &str = "sorrel source";

/// A node of the syntax tree. Immutable once parsed; every node owns its
/// children and carries the span it was read from.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub span: SourceSpan,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Symbol(String),
    Int(i64),
    Float(f64),
    Str(String),
    /// `(head args...)`, the only form that can resolve to a call.
    List(Vec<Node>),
    /// `[elems...]` list literal.
    ListList(Vec<Node>),
    /// `{k v ...}` dict literal, a flat key/value sequence.
    DictList(Vec<Node>),
    /// Top-level sequence of forms.
    Root(Vec<Node>),
}

impl Node {
    pub fn new(kind: NodeKind, span: SourceSpan) -> Self {
        Self { kind, span }
    }
}

pub type SourceSetRef = Rc<RefCell<SourceSet>>;

#[derive(Debug)]
struct Snippet {
    name: String,
    text: String,
    base: usize,
}

/// Append-only registry of source snippets. Each snippet occupies a
/// disjoint range of global byte offsets, so any node span resolves to a
/// name/line/column without knowing which parse produced it. Snippets are
/// added during bootstrap, `load`, and REPL input; never removed.
#[derive(Debug, Default)]
pub struct SourceSet {
    snippets: Vec<Snippet>,
}

impl SourceSet {
    pub fn new() -> SourceSetRef {
        Rc::new(RefCell::new(Self::default()))
    }

    /// Registers a snippet and returns the global base offset assigned to
    /// its first byte. An empty name maps to [`DEFAULT_SOURCE_NAME`].
    pub fn add(&mut self, name: &str, text: &str) -> usize {
        let base = match self.snippets.last() {
            // One spare slot past the end keeps end-of-input positions
            // inside the snippet that produced them.
            Some(prev) => prev.base + prev.text.len() + 1,
            None => 0,
        };
        let name = if name.is_empty() {
            DEFAULT_SOURCE_NAME.to_string()
        } else {
            name.to_string()
        };
        self.snippets.push(Snippet {
            name,
            text: text.to_string(),
            base,
        });
        base
    }

    fn snippet_for(&self, offset: usize) -> Option<&Snippet> {
        let idx = self.snippets.partition_point(|s| s.base <= offset);
        if idx == 0 {
            return None;
        }
        Some(&self.snippets[idx - 1])
    }

    /// Resolves a global offset to its 1-based line/column location.
    pub fn position(&self, offset: usize) -> Position {
        let Some(snippet) = self.snippet_for(offset) else {
            return Position {
                name: DEFAULT_SOURCE_NAME.to_string(),
                line: 1,
                col: 1,
            };
        };
        let local = (offset - snippet.base).min(snippet.text.len());
        let before = &snippet.text.as_bytes()[..local];
        let line = 1 + before.iter().filter(|&&b| b == b'\n').count();
        let line_start = before
            .iter()
            .rposition(|&b| b == b'\n')
            .map(|idx| idx + 1)
            .unwrap_or(0);
        Position {
            name: snippet.name.clone(),
            line,
            col: local - line_start + 1,
        }
    }

    /// Returns the source text a span was parsed from, used by `code`.
    pub fn code(&self, span: SourceSpan) -> String {
        let Some(snippet) = self.snippet_for(span.start) else {
            return String::new();
        };
        let start = (span.start - snippet.base).min(snippet.text.len());
        let end = span
            .end
            .checked_sub(snippet.base)
            .unwrap_or(start)
            .min(snippet.text.len());
        snippet.text[start..end.max(start)].to_string()
    }
}
