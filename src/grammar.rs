use std::collections::HashSet;
use std::rc::Rc;

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use crate::error::{ImplementationError, SyntaxError};
use crate::normalize;
use crate::pretty;
use crate::production::Production;
use crate::symbol::Nonterminal;
use crate::text::Input;
use crate::tokenizer::{self, TokenLattice};

/// The three reserved prefixes used to name nonterminals introduced by the
/// normalizer, one per kind of utility nonterminal it can introduce.
pub const MIXED_PRODUCTION_PREFIX: &str = "__t";
pub const LONG_BODY_PREFIX: &str = "__b";
pub const EPSILON_PREFIX: &str = "__s";

/// An immutable context-free grammar: a list of productions plus a start symbol.
///
/// `utility_nonterminals` names the nonterminals introduced by normalization;
/// it is empty for a grammar authored directly by a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grammar {
    pub productions: Vec<Production>,
    pub start: Nonterminal,
    #[serde(default)]
    pub utility_nonterminals: IndexSet<Nonterminal>,
}

impl Grammar {
    pub fn new(productions: Vec<Production>, start: Nonterminal) -> Self {
        Grammar { productions, start, utility_nonterminals: IndexSet::new() }
    }

    pub(crate) fn with_utility_nonterminals(
        productions: Vec<Production>,
        start: Nonterminal,
        utility_nonterminals: IndexSet<Nonterminal>,
    ) -> Self {
        Grammar { productions, start, utility_nonterminals }
    }

    /// All productions whose pattern is `nt`, in declaration order.
    pub fn productions_for<'a>(&'a self, nt: &'a Nonterminal) -> impl Iterator<Item = &'a Production> {
        self.productions.iter().filter(move |p| &p.pattern == nt)
    }

    /// True iff every production has shape `A -> a`, `A -> B C`, or (only for
    /// the start symbol) `S -> epsilon`, with at most one epsilon production overall.
    pub fn is_in_chomsky_normal_form(&self) -> bool {
        let epsilon_count = self.productions.iter().filter(|p| p.is_epsilon()).count();
        if epsilon_count > 1 {
            return false;
        }
        self.productions.iter().all(|p| p.is_chomsky_normal(&self.start))
    }

    /// Normalizes this grammar into an equivalent Chomsky Normal Form grammar.
    /// Recomputed on every call; callers that parse repeatedly (`CykParser`)
    /// are expected to cache the result themselves.
    pub fn chomsky_normalized(&self) -> Grammar {
        normalize::normalize(self)
    }

    /// Every nonterminal name appearing anywhere in the grammar: as a
    /// production's pattern, in a production's body, or already reserved as
    /// a utility nonterminal. Used to avoid fresh-name collisions.
    pub(crate) fn all_nonterminal_names(&self) -> HashSet<&str> {
        let mut names = HashSet::new();
        names.insert(self.start.name());
        for p in &self.productions {
            names.insert(p.pattern.name());
            for nt in p.generated_nonterminals() {
                names.insert(nt.name());
            }
            for nt in &p.non_terminal_chain {
                names.insert(nt.name());
            }
        }
        for nt in &self.utility_nonterminals {
            names.insert(nt.name());
        }
        names
    }

    /// Generates a nonterminal name starting with `prefix` that does not
    /// collide with any name already present in `existing`, by incrementing
    /// a counter until a free name is found.
    pub(crate) fn fresh_name(prefix: &str, existing: &HashSet<&str>, counter: &mut usize) -> Nonterminal {
        loop {
            let candidate = format!("{}{}", prefix, counter);
            *counter += 1;
            if !existing.contains(candidate.as_str()) {
                return Nonterminal::new(candidate);
            }
        }
    }

    pub fn tokenize(&self, input: &str) -> Result<TokenLattice, SyntaxError> {
        tokenizer::tokenize(self, input)
    }

    pub fn to_bnf(&self) -> Result<String, ImplementationError> {
        pretty::to_bnf(self)
    }

    pub fn to_ebnf(&self) -> Result<String, ImplementationError> {
        pretty::to_ebnf(self)
    }

    pub fn to_abnf(&self) -> Result<String, ImplementationError> {
        pretty::to_abnf(self)
    }

    pub(crate) fn owned_input(text: &str) -> Rc<Input> {
        Rc::new(Input::new(text.to_string()))
    }
}
