use std::collections::{HashMap, HashSet};

use indexmap::{IndexMap, IndexSet};

use crate::error::{InputRange, Reason, SyntaxError};
use crate::grammar::Grammar;
use crate::normalize::compute_nullable;
use crate::production::Production;
use crate::symbol::{Nonterminal, Symbol, Terminal};
use crate::tokenizer::TokenLattice;
use crate::trees::{SharedTree, SyntaxTree, Tree};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct ItemKey {
    production: usize,
    dot: usize,
    origin: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct ItemRef {
    column: usize,
    index: usize,
}

#[derive(Debug, Clone, Copy)]
enum Consumed {
    /// A terminal symbol was consumed directly from the token lattice.
    Leaf(InputRange),
    /// A nonterminal symbol was consumed by completing a sub-derivation.
    Child(ItemRef),
    /// A nullable nonterminal was consumed with zero tokens, via the
    /// nullable-aware predict step; carries the index of the epsilon
    /// production used to synthesize the (empty) sub-tree.
    Nullable(usize),
}

struct ItemRecord {
    key: ItemKey,
    back: Option<(ItemRef, Consumed)>,
}

#[derive(Default)]
struct Column {
    items: Vec<ItemRecord>,
    index: IndexMap<ItemKey, usize>,
}

impl Column {
    /// Inserts `key` if not already present, returning its index. Once an
    /// item exists, its back-pointer is never overwritten: the
    /// first-discovered derivation wins, which is what keeps ambiguous
    /// grammars deterministic.
    fn insert(&mut self, key: ItemKey, back: Option<(ItemRef, Consumed)>) -> usize {
        if let Some(&idx) = self.index.get(&key) {
            idx
        } else {
            let idx = self.items.len();
            self.items.push(ItemRecord { key, back });
            self.index.insert(key, idx);
            idx
        }
    }
}

/// The top-down predictive chart parser. Operates directly on an
/// unnormalized grammar, handling ambiguity, left recursion, and nullable
/// nonterminals.
pub struct EarleyParser {
    grammar: Grammar,
}

impl EarleyParser {
    pub fn new(grammar: Grammar) -> Self {
        EarleyParser { grammar }
    }

    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    pub fn recognizes(&self, input: &str) -> bool {
        self.syntax_tree(input).is_ok()
    }

    pub fn tokenize(&self, input: &str) -> Result<TokenLattice, SyntaxError> {
        self.grammar.tokenize(input)
    }

    pub fn syntax_tree(&self, input: &str) -> Result<SyntaxTree<Nonterminal, InputRange>, SyntaxError> {
        if input.is_empty() {
            return self.parse_empty();
        }

        let lattice = self.grammar.tokenize(input)?;
        let tree = self.parse_lattice(&lattice, input)?;
        Ok(strip_productions(tree))
    }

    fn parse_empty(&self) -> Result<SyntaxTree<Nonterminal, InputRange>, SyntaxError> {
        match self.grammar.productions_for(&self.grammar.start).find(|p| p.is_epsilon()) {
            Some(_) => Ok(SyntaxTree::new_node(self.grammar.start.clone(), vec![])),
            None => Err(SyntaxError::new(
                Reason::EmptyNotAllowed,
                InputRange::new(0, 0),
                Default::default(),
                Grammar::owned_input(""),
            )),
        }
    }

    fn parse_lattice(&self, lattice: &TokenLattice, text: &str) -> Result<SyntaxTree<Production, InputRange>, SyntaxError> {
        log::debug!("earley: parsing {} tokens", lattice.len());

        let n = lattice.len();
        let nullable = compute_nullable(&self.grammar.productions);
        let mut chart: Vec<Column> = (0..=n).map(|_| Column::default()).collect();

        for (idx, p) in self.grammar.productions.iter().enumerate() {
            if p.pattern == self.grammar.start {
                chart[0].insert(ItemKey { production: idx, dot: 0, origin: 0 }, None);
            }
        }

        for k in 0..=n {
            let mut i = 0;
            while i < chart[k].items.len() {
                let key = chart[k].items[i].key;
                let production = &self.grammar.productions[key.production];

                if key.dot == production.body.len() {
                    self.complete(&mut chart, k, i);
                } else {
                    match &production.body[key.dot] {
                        Symbol::Nonterminal(next) => self.predict(&mut chart, k, i, next, &nullable),
                        Symbol::Terminal(next) => {
                            if k < n {
                                self.scan(&mut chart, k, i, next, lattice);
                            }
                        }
                    }
                }
                i += 1;
            }
        }

        for (idx, item) in chart[n].items.iter().enumerate() {
            let production = &self.grammar.productions[item.key.production];
            if item.key.origin == 0 && item.key.dot == production.body.len() && production.pattern == self.grammar.start {
                let mut cache = HashMap::new();
                let shared = self.extract(&chart, ItemRef { column: n, index: idx }, &mut cache);
                return Ok(shared.into());
            }
        }

        Err(self.locate_error(&chart, lattice, text))
    }

    fn predict(&self, chart: &mut [Column], k: usize, i: usize, next: &Nonterminal, nullable: &HashSet<Nonterminal>) {
        for (idx, p) in self.grammar.productions.iter().enumerate() {
            if &p.pattern == next {
                chart[k].insert(ItemKey { production: idx, dot: 0, origin: k }, None);
            }
        }

        if nullable.contains(next) {
            if let Some(eps_idx) = self.grammar.productions.iter().position(|p| &p.pattern == next && p.is_epsilon()) {
                let parent_key = chart[k].items[i].key;
                let parent_ref = ItemRef { column: k, index: i };
                let advanced = ItemKey { production: parent_key.production, dot: parent_key.dot + 1, origin: parent_key.origin };
                chart[k].insert(advanced, Some((parent_ref, Consumed::Nullable(eps_idx))));
            }
        }
    }

    fn scan(&self, chart: &mut [Column], k: usize, i: usize, terminal: &Terminal, lattice: &TokenLattice) {
        let key = chart[k].items[i].key;
        let parent_ref = ItemRef { column: k, index: i };

        for token_match in lattice.matches_at(k) {
            if &token_match.terminal == terminal {
                let advanced = ItemKey { production: key.production, dot: key.dot + 1, origin: key.origin };
                chart[k + 1].insert(advanced, Some((parent_ref, Consumed::Leaf(token_match.range))));
            }
        }
    }

    fn complete(&self, chart: &mut [Column], k: usize, i: usize) {
        let key = chart[k].items[i].key;
        let completed_pattern = self.grammar.productions[key.production].pattern.clone();
        let origin = key.origin;

        let waiting: Vec<(usize, ItemKey)> = chart[origin]
            .items
            .iter()
            .enumerate()
            .filter_map(|(idx, rec)| {
                let p = &self.grammar.productions[rec.key.production];
                if rec.key.dot < p.body.len() {
                    if let Symbol::Nonterminal(nt) = &p.body[rec.key.dot] {
                        if *nt == completed_pattern {
                            return Some((idx, rec.key));
                        }
                    }
                }
                None
            })
            .collect();

        let completed_ref = ItemRef { column: k, index: i };
        for (waiting_idx, waiting_key) in waiting {
            let advanced = ItemKey { production: waiting_key.production, dot: waiting_key.dot + 1, origin: waiting_key.origin };
            let waiting_ref = ItemRef { column: origin, index: waiting_idx };
            chart[k].insert(advanced, Some((waiting_ref, Consumed::Child(completed_ref))));
        }
    }

    /// Walks the back-pointer chain of a completed item from its last dot
    /// position back to dot 0, collecting each step's consumed child.
    ///
    /// Builds `SharedTree` rather than `SyntaxTree`: the same completed item
    /// can be a `Consumed::Child` of more than one waiting item (an ambiguous
    /// grammar can re-derive the same sub-parse at the same origin from two
    /// different productions), and `cache` lets those re-visits clone an `Rc`
    /// instead of re-walking and re-cloning the whole sub-derivation.
    fn extract(
        &self,
        chart: &[Column],
        item_ref: ItemRef,
        cache: &mut HashMap<ItemRef, SharedTree<Production, InputRange>>,
    ) -> SharedTree<Production, InputRange> {
        if let Some(cached) = cache.get(&item_ref) {
            return cached.clone();
        }

        let production_idx = chart[item_ref.column].items[item_ref.index].key.production;
        let mut children_rev = Vec::new();
        let mut current = item_ref;

        while let Some((parent_ref, consumed)) = chart[current.column].items[current.index].back {
            let child = match consumed {
                Consumed::Leaf(range) => SharedTree::new_leaf(range),
                Consumed::Child(child_ref) => self.extract(chart, child_ref, cache),
                Consumed::Nullable(eps_idx) => SharedTree::new_node(self.grammar.productions[eps_idx].clone(), vec![]),
            };
            children_rev.push(child);
            current = parent_ref;
        }

        children_rev.reverse();
        let tree = SharedTree::new_node(self.grammar.productions[production_idx].clone(), children_rev);
        cache.insert(item_ref, tree.clone());
        tree
    }

    fn locate_error(&self, chart: &[Column], lattice: &TokenLattice, text: &str) -> SyntaxError {
        let n = lattice.len();
        let k_star = (0..=n).rev().find(|&k| !chart[k].items.is_empty()).unwrap_or(0);

        let mut context: IndexSet<Nonterminal> = IndexSet::new();
        for record in &chart[k_star].items {
            let production = &self.grammar.productions[record.key.production];
            if record.key.dot < production.body.len() {
                if let Symbol::Nonterminal(nt) = &production.body[record.key.dot] {
                    context.insert(nt.clone());
                }
            }
        }

        let (range, reason) = if k_star == n {
            (InputRange::new(text.len(), text.len()), Reason::UnmatchedPattern)
        } else {
            let matched = &lattice.matches_at(k_star)[0];
            (matched.range, Reason::UnexpectedToken)
        };

        log::debug!("earley: no accepting derivation, stalled at column {}", k_star);
        SyntaxError::new(reason, range, context, Grammar::owned_input(text))
    }
}

fn strip_productions(tree: SyntaxTree<Production, InputRange>) -> SyntaxTree<Nonterminal, InputRange> {
    match tree {
        SyntaxTree::Leaf { val } => SyntaxTree::Leaf { val },
        SyntaxTree::Node { val, children } => SyntaxTree::Node {
            val: val.pattern,
            children: children.into_iter().map(strip_productions).collect(),
        },
    }
}
