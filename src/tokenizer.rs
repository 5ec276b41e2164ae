use indexmap::IndexSet;

use crate::error::{InputRange, Reason, SyntaxError};
use crate::grammar::Grammar;
use crate::symbol::Terminal;

/// One terminal's match at a single lattice position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenMatch {
    pub terminal: Terminal,
    pub range: InputRange,
}

/// A left-to-right segmentation of an input into positions, each holding
/// every terminal that matched there at the chosen (longest) length.
/// Multiple matches at one position encode lexical ambiguity.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TokenLattice {
    slots: Vec<Vec<TokenMatch>>,
}

impl TokenLattice {
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn matches_at(&self, pos: usize) -> &[TokenMatch] {
        &self.slots[pos]
    }

    pub fn iter(&self) -> impl Iterator<Item = &[TokenMatch]> {
        self.slots.iter().map(Vec::as_slice)
    }
}

/// Every terminal declared anywhere in the grammar's productions, in the
/// order each was first encountered walking productions and then bodies.
fn declared_terminals(grammar: &Grammar) -> Vec<Terminal> {
    let mut seen: IndexSet<Terminal> = IndexSet::new();
    for production in &grammar.productions {
        for terminal in production.generated_terminals() {
            seen.insert(terminal.clone());
        }
    }
    seen.into_iter().collect()
}

pub fn tokenize(grammar: &Grammar, text: &str) -> Result<TokenLattice, SyntaxError> {
    log::trace!("tokenizing {} bytes of input", text.len());

    let terminals = declared_terminals(grammar);
    let mut slots = Vec::new();
    let mut pos = 0;

    while pos < text.len() {
        let mut by_length: Vec<(usize, Vec<Terminal>)> = Vec::new();

        for terminal in &terminals {
            if let Some(len) = terminal.match_len(text, pos) {
                match by_length.iter_mut().find(|(l, _)| *l == len) {
                    Some((_, group)) => group.push(terminal.clone()),
                    None => by_length.push((len, vec![terminal.clone()])),
                }
            }
        }

        let longest = by_length.into_iter().max_by_key(|(len, _)| *len);

        match longest {
            None => {
                let end = next_char_boundary(text, pos);
                log::debug!("no terminal matches at byte {}", pos);
                return Err(SyntaxError::new(
                    Reason::UnknownToken,
                    InputRange::new(pos, end),
                    Default::default(),
                    Grammar::owned_input(text),
                ));
            }
            Some((len, group)) => {
                let range = InputRange::new(pos, pos + len);
                slots.push(group.into_iter().map(|terminal| TokenMatch { terminal, range }).collect());
                pos += len;
            }
        }
    }

    log::trace!("tokenized into {} positions", slots.len());
    Ok(TokenLattice { slots })
}

fn next_char_boundary(text: &str, pos: usize) -> usize {
    match text[pos..].chars().next() {
        Some(c) => pos + c.len_utf8(),
        None => pos,
    }
}
