use std::fmt;

use serde::{Deserialize, Serialize};

use crate::symbol::{Nonterminal, Symbol, Terminal};

/// A single grammar rule `pattern -> body`.
///
/// `non_terminal_chain` is populated only by chain-production elimination
/// (normalization step 5): it records the intermediate nonterminals a
/// collapsed chain of chain-productions passed through, so that CYK
/// reconstruction can splice them back into the tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Production {
    pub pattern: Nonterminal,
    pub body: Vec<Symbol>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub non_terminal_chain: Vec<Nonterminal>,
}

impl Production {
    pub fn new(pattern: Nonterminal, body: Vec<Symbol>) -> Self {
        Production { pattern, body, non_terminal_chain: Vec::new() }
    }

    pub fn with_chain(pattern: Nonterminal, body: Vec<Symbol>, chain: Vec<Nonterminal>) -> Self {
        Production { pattern, body, non_terminal_chain: chain }
    }

    /// A production is final iff its body contains at least one terminal.
    /// After normalization this means exactly one terminal and no nonterminals.
    pub fn is_final(&self) -> bool {
        self.body.iter().any(Symbol::is_terminal)
    }

    /// A production is a chain production iff its body is exactly one nonterminal.
    pub fn is_chain(&self) -> bool {
        self.body.len() == 1 && self.body[0].is_nonterminal()
    }

    pub fn is_epsilon(&self) -> bool {
        self.body.is_empty()
    }

    pub fn generated_terminals(&self) -> impl Iterator<Item = &Terminal> {
        self.body.iter().filter_map(Symbol::as_terminal)
    }

    pub fn generated_nonterminals(&self) -> impl Iterator<Item = &Nonterminal> {
        self.body.iter().filter_map(Symbol::as_nonterminal)
    }

    /// True once this production's body is `a` (one terminal), `B C` (two
    /// nonterminals), or empty (permitted only for the grammar's start symbol).
    pub fn is_chomsky_normal(&self, start: &Nonterminal) -> bool {
        match self.body.as_slice() {
            [] => &self.pattern == start,
            [Symbol::Terminal(_)] => true,
            [Symbol::Nonterminal(_), Symbol::Nonterminal(_)] => true,
            _ => false,
        }
    }
}

impl fmt::Display for Production {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.body.is_empty() {
            write!(f, "{} -> \u{03b5}", self.pattern)
        } else {
            let body: Vec<String> = self.body.iter().map(|s| format!("{}", s)).collect();
            write!(f, "{} -> {}", self.pattern, body.join(" "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nt(name: &str) -> Nonterminal {
        Nonterminal::new(name)
    }

    #[test]
    fn final_requires_a_terminal() {
        let p = Production::new(nt("A"), vec![Symbol::Terminal(Terminal::literal("a"))]);
        assert!(p.is_final());

        let p = Production::new(nt("A"), vec![Symbol::Nonterminal(nt("B"))]);
        assert!(!p.is_final());
    }

    #[test]
    fn chain_requires_single_nonterminal_body() {
        let p = Production::new(nt("A"), vec![Symbol::Nonterminal(nt("B"))]);
        assert!(p.is_chain());

        let p = Production::new(nt("A"), vec![Symbol::Nonterminal(nt("B")), Symbol::Nonterminal(nt("C"))]);
        assert!(!p.is_chain());
    }

    #[test]
    fn chomsky_normal_accepts_the_three_shapes() {
        let start = nt("S");
        assert!(Production::new(nt("A"), vec![Symbol::Terminal(Terminal::literal("a"))]).is_chomsky_normal(&start));
        assert!(Production::new(nt("A"), vec![Symbol::Nonterminal(nt("B")), Symbol::Nonterminal(nt("C"))]).is_chomsky_normal(&start));
        assert!(Production::new(start.clone(), vec![]).is_chomsky_normal(&start));
        assert!(!Production::new(nt("A"), vec![]).is_chomsky_normal(&start));
        assert!(!Production::new(nt("A"), vec![Symbol::Nonterminal(nt("B"))]).is_chomsky_normal(&start));
    }
}
