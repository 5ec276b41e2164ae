use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use once_cell::sync::OnceCell;
use regex::{Regex, RegexBuilder};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

/// A named nonterminal symbol. Identity is by name; names are either chosen
/// by the grammar author or generated by the normalizer (see
/// `Grammar::fresh_name`), which guarantees no collision with user names.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Nonterminal(Rc<str>);

impl Nonterminal {
    pub fn new(name: impl Into<Rc<str>>) -> Self {
        Nonterminal(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Nonterminal {
    fn from(name: &str) -> Self {
        Nonterminal::new(name)
    }
}

impl From<String> for Nonterminal {
    fn from(name: String) -> Self {
        Nonterminal::new(name)
    }
}

impl fmt::Display for Nonterminal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

enum TerminalKind {
    Literal(String),
    CharRange(char, char),
    Regex { pattern: String, compiled: Regex },
}

impl TerminalKind {
    fn hash_into<H: Hasher>(&self, state: &mut H) {
        match self {
            TerminalKind::Literal(s) => {
                0u8.hash(state);
                s.hash(state);
            }
            TerminalKind::CharRange(lo, hi) => {
                1u8.hash(state);
                lo.hash(state);
                hi.hash(state);
            }
            TerminalKind::Regex { pattern, .. } => {
                2u8.hash(state);
                pattern.hash(state);
            }
        }
    }

    fn content_eq(&self, other: &TerminalKind) -> bool {
        match (self, other) {
            (TerminalKind::Literal(a), TerminalKind::Literal(b)) => a == b,
            (TerminalKind::CharRange(a1, a2), TerminalKind::CharRange(b1, b2)) => a1 == b1 && a2 == b2,
            (TerminalKind::Regex { pattern: a, .. }, TerminalKind::Regex { pattern: b, .. }) => a == b,
            _ => false,
        }
    }
}

impl fmt::Debug for TerminalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminalKind::Literal(s) => write!(f, "Literal({:?})", s),
            TerminalKind::CharRange(lo, hi) => write!(f, "CharRange({:?}, {:?})", lo, hi),
            TerminalKind::Regex { pattern, .. } => write!(f, "Regex({:?})", pattern),
        }
    }
}

impl Clone for TerminalKind {
    fn clone(&self) -> Self {
        match self {
            TerminalKind::Literal(s) => TerminalKind::Literal(s.clone()),
            TerminalKind::CharRange(lo, hi) => TerminalKind::CharRange(*lo, *hi),
            TerminalKind::Regex { pattern, compiled } => TerminalKind::Regex {
                pattern: pattern.clone(),
                compiled: compiled.clone(),
            },
        }
    }
}

struct TerminalData {
    kind: TerminalKind,
    hash: OnceCell<u64>,
}

/// A terminal symbol: a literal string, a single-character Unicode range, or
/// an anchored regular expression. Equality and hashing are on variant
/// content only; the hash is computed once and cached.
#[derive(Clone)]
pub struct Terminal(Rc<TerminalData>);

impl Terminal {
    pub fn literal(text: impl Into<String>) -> Self {
        Terminal::from_kind(TerminalKind::Literal(text.into()))
    }

    pub fn char_range(low: char, high: char) -> Self {
        Terminal::from_kind(TerminalKind::CharRange(low, high))
    }

    /// Compiles `pattern` eagerly so that a malformed regex fails at
    /// construction time rather than on first use. Compiled with
    /// `longest_match` so that alternation (`a|aa`) picks the longest
    /// anchored match rather than the leftmost-first branch.
    pub fn regex(pattern: impl Into<String>) -> Result<Self, regex::Error> {
        let pattern = pattern.into();
        let compiled = RegexBuilder::new(&format!("^(?:{})", pattern)).longest_match(true).build()?;
        Ok(Terminal::from_kind(TerminalKind::Regex { pattern, compiled }))
    }

    fn from_kind(kind: TerminalKind) -> Self {
        Terminal(Rc::new(TerminalData { kind, hash: OnceCell::new() }))
    }

    pub fn is_empty(&self) -> bool {
        match &self.0.kind {
            TerminalKind::Literal(s) => s.is_empty(),
            TerminalKind::CharRange(_, _) => false,
            TerminalKind::Regex { pattern, .. } => pattern.is_empty(),
        }
    }

    /// Attempts to match this terminal at byte offset `pos` of `input`,
    /// returning the length in bytes of the match if one exists.
    pub fn match_len(&self, input: &str, pos: usize) -> Option<usize> {
        match &self.0.kind {
            TerminalKind::Literal(s) => {
                if input[pos..].starts_with(s.as_str()) {
                    Some(s.len())
                } else {
                    None
                }
            }
            TerminalKind::CharRange(lo, hi) => {
                let c = input[pos..].chars().next()?;
                if *lo <= c && c <= *hi {
                    Some(c.len_utf8())
                } else {
                    None
                }
            }
            TerminalKind::Regex { compiled, .. } => {
                // Anchored via the leading `^` baked into `compiled`; compiled
                // with `longest_match` so alternation picks the longest match.
                compiled.find(&input[pos..]).map(|m| m.end())
            }
        }
    }

    fn cached_hash(&self) -> u64 {
        *self.0.hash.get_or_init(|| {
            use std::collections::hash_map::DefaultHasher;
            let mut hasher = DefaultHasher::new();
            self.0.kind.hash_into(&mut hasher);
            hasher.finish()
        })
    }

    pub(crate) fn literal_text(&self) -> Option<&str> {
        match &self.0.kind {
            TerminalKind::Literal(s) => Some(s),
            _ => None,
        }
    }

    pub(crate) fn char_range_bounds(&self) -> Option<(char, char)> {
        match &self.0.kind {
            TerminalKind::CharRange(lo, hi) => Some((*lo, *hi)),
            _ => None,
        }
    }

    pub fn regex_pattern(&self) -> Option<&str> {
        match &self.0.kind {
            TerminalKind::Regex { pattern, .. } => Some(pattern),
            _ => None,
        }
    }
}

impl fmt::Debug for Terminal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Terminal({:?})", self.0.kind)
    }
}

impl PartialEq for Terminal {
    fn eq(&self, other: &Self) -> bool {
        self.0.kind.content_eq(&other.0.kind)
    }
}

impl Eq for Terminal {}

impl Hash for Terminal {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.cached_hash());
    }
}

impl fmt::Display for Terminal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0.kind {
            TerminalKind::Literal(s) => write!(f, "'{}'", s),
            TerminalKind::CharRange(lo, hi) => write!(f, "[{}-{}]", lo, hi),
            TerminalKind::Regex { pattern, .. } => write!(f, "/{}/", pattern),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(tag = "type")]
enum TerminalRepr {
    #[serde(rename = "string")]
    Literal { value: String },
    #[serde(rename = "characterRange")]
    CharRange {
        #[serde(rename = "lowerBound")]
        lower_bound: String,
        #[serde(rename = "upperBound")]
        upper_bound: String,
    },
    #[serde(rename = "regularExpression")]
    Regex { pattern: String },
}

fn single_char(s: &str) -> Result<char, String> {
    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => Err(format!("expected a single-character string, got {:?}", s)),
    }
}

impl Serialize for Terminal {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let repr = if let Some(s) = self.literal_text() {
            TerminalRepr::Literal { value: s.to_string() }
        } else if let Some((lo, hi)) = self.char_range_bounds() {
            TerminalRepr::CharRange {
                lower_bound: lo.to_string(),
                upper_bound: hi.to_string(),
            }
        } else if let Some(pattern) = self.regex_pattern() {
            TerminalRepr::Regex { pattern: pattern.to_string() }
        } else {
            unreachable!("Terminal must be Literal, CharRange, or Regex")
        };
        repr.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Terminal {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match TerminalRepr::deserialize(deserializer)? {
            TerminalRepr::Literal { value } => Ok(Terminal::literal(value)),
            TerminalRepr::CharRange { lower_bound, upper_bound } => {
                let lo = single_char(&lower_bound).map_err(de::Error::custom)?;
                let hi = single_char(&upper_bound).map_err(de::Error::custom)?;
                Ok(Terminal::char_range(lo, hi))
            }
            TerminalRepr::Regex { pattern } => {
                Terminal::regex(pattern).map_err(de::Error::custom)
            }
        }
    }
}

/// Either a `Terminal` or a `Nonterminal`, as they appear in a production's body.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Symbol {
    Terminal(Terminal),
    Nonterminal(Nonterminal),
}

impl Symbol {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Symbol::Terminal(_))
    }

    pub fn is_nonterminal(&self) -> bool {
        matches!(self, Symbol::Nonterminal(_))
    }

    pub fn as_nonterminal(&self) -> Option<&Nonterminal> {
        match self {
            Symbol::Nonterminal(nt) => Some(nt),
            Symbol::Terminal(_) => None,
        }
    }

    pub fn as_terminal(&self) -> Option<&Terminal> {
        match self {
            Symbol::Terminal(t) => Some(t),
            Symbol::Nonterminal(_) => None,
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Symbol::Terminal(t) => write!(f, "{}", t),
            Symbol::Nonterminal(nt) => write!(f, "{}", nt),
        }
    }
}

impl From<Terminal> for Symbol {
    fn from(t: Terminal) -> Self {
        Symbol::Terminal(t)
    }
}

impl From<Nonterminal> for Symbol {
    fn from(nt: Nonterminal) -> Self {
        Symbol::Nonterminal(nt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_terminals_compare_by_content() {
        let a = Terminal::literal("foo");
        let b = Terminal::literal("foo");
        let c = Terminal::literal("bar");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn literal_matches_prefix() {
        let t = Terminal::literal("foo");
        assert_eq!(Some(3), t.match_len("foobar", 0));
        assert_eq!(None, t.match_len("barfoo", 0));
        assert_eq!(Some(3), t.match_len("barfoo", 3));
    }

    #[test]
    fn char_range_matches_single_char() {
        let t = Terminal::char_range('a', 'z');
        assert_eq!(Some(1), t.match_len("xyz", 0));
        assert_eq!(None, t.match_len("XYZ", 0));
    }

    #[test]
    fn regex_matches_anchored_prefix() {
        let t = Terminal::regex("[0-9]+").unwrap();
        assert_eq!(Some(3), t.match_len("123abc", 0));
        assert_eq!(None, t.match_len("abc123", 0));
    }

    #[test]
    fn regex_alternation_prefers_the_longest_match() {
        let t = Terminal::regex("a|aa").unwrap();
        assert_eq!(Some(2), t.match_len("aa", 0));
    }

    #[test]
    fn empty_literal_is_empty() {
        assert!(Terminal::literal("").is_empty());
        assert!(!Terminal::literal("x").is_empty());
        assert!(!Terminal::char_range('a', 'z').is_empty());
    }

    #[test]
    fn nonterminal_display_is_its_name() {
        let nt = Nonterminal::new("Expr");
        assert_eq!("Expr", format!("{}", nt));
    }
}
