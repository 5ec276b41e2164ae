use std::fmt;
use std::rc::Rc;

use indexmap::IndexSet;
use thiserror::Error;

use crate::symbol::Nonterminal;
use crate::text::Input;

/// A half-open `[start, end)` byte range into an input string. Always falls
/// on UTF-8 boundaries since it is only ever constructed from `str` slicing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InputRange {
    pub start: usize,
    pub end: usize,
}

impl InputRange {
    pub fn new(start: usize, end: usize) -> Self {
        InputRange { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

impl fmt::Display for InputRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// The machine-readable classification of a `SyntaxError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reason {
    /// Input was empty and the grammar does not derive the empty string from its start symbol.
    EmptyNotAllowed,
    /// No terminal in the grammar matches at this position.
    UnknownToken,
    /// The input tokenized fully but does not belong to the grammar's language.
    UnmatchedPattern,
    /// A token was recognized by the tokenizer but no pending item could consume it.
    UnexpectedToken,
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Reason::EmptyNotAllowed => "empty input not allowed",
            Reason::UnknownToken => "unknown token",
            Reason::UnmatchedPattern => "unmatched pattern",
            Reason::UnexpectedToken => "unexpected token",
        };
        write!(f, "{}", s)
    }
}

/// Raised by `tokenize` and `syntax_tree` when an input cannot be tokenized
/// or does not belong to a grammar's language.
#[derive(Debug, Error)]
#[error("{}", self.render())]
pub struct SyntaxError {
    pub reason: Reason,
    pub range: InputRange,
    pub context: IndexSet<Nonterminal>,
    pub(crate) input: Rc<Input>,
}

impl SyntaxError {
    pub fn new(reason: Reason, range: InputRange, context: IndexSet<Nonterminal>, input: Rc<Input>) -> Self {
        SyntaxError { reason, range, context, input }
    }

    pub fn line(&self) -> usize {
        self.input.get_pos(self.range.start).line
    }

    pub fn column(&self) -> usize {
        self.input.get_pos(self.range.start).col
    }

    fn offending_text(&self) -> &str {
        let text = self.input.as_str();
        let end = self.range.end.min(text.len());
        let start = self.range.start.min(end);
        &text[start..end]
    }

    fn render(&self) -> String {
        let pos = self.input.get_pos(self.range.start);
        let mut out = format!("L{}:{}: '{}'", pos.line, pos.col, self.offending_text());

        if !self.context.is_empty() {
            let names: Vec<&str> = self.context.iter().map(Nonterminal::name).collect();
            out.push_str(&format!(" (expected one of: {})", names.join(", ")));
        }

        let excerpt_end = self.range.end.max(self.range.start + 1);
        let span = self.input.get_span(self.range.start, excerpt_end, self.reason);
        out.push('\n');
        out.push_str(&format!("{}", span));

        out
    }
}

/// Raised by the Grammar API when a caller asks for something the grammar's
/// shape cannot support, as opposed to the input being malformed.
#[derive(Debug, Error)]
pub enum ImplementationError {
    #[error("ABNF cannot represent a regular-expression terminal: /{pattern}/")]
    UnsupportedByAbnf { pattern: String },
}
