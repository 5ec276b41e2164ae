use std::collections::HashMap;

use indexmap::IndexSet;
use once_cell::sync::OnceCell;

use crate::error::{InputRange, Reason, SyntaxError};
use crate::grammar::Grammar;
use crate::production::Production;
use crate::symbol::{Nonterminal, Symbol};
use crate::tokenizer::TokenLattice;
use crate::trees::{SharedTree, SyntaxTree, Tree};

#[derive(Clone, Copy)]
enum CykBack {
    Leaf(InputRange),
    Split { split: usize },
}

#[derive(Clone, Copy)]
struct Cell {
    production: usize,
    back: CykBack,
}

/// The bottom-up chart parser. Requires Chomsky Normal Form, so it
/// normalizes the grammar on first use and caches the result for the life
/// of the parser.
pub struct CykParser {
    grammar: Grammar,
    normalized: OnceCell<Grammar>,
}

impl CykParser {
    pub fn new(grammar: Grammar) -> Self {
        CykParser { grammar, normalized: OnceCell::new() }
    }

    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    fn normalized(&self) -> &Grammar {
        self.normalized.get_or_init(|| {
            log::debug!("cyk: normalizing grammar to Chomsky Normal Form");
            self.grammar.chomsky_normalized()
        })
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
        self.parse_lattice(&lattice, input)
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

    fn parse_lattice(&self, lattice: &TokenLattice, text: &str) -> Result<SyntaxTree<Nonterminal, InputRange>, SyntaxError> {
        let normalized = self.normalized();
        let n = lattice.len();
        log::debug!("cyk: parsing {} tokens against {} CNF productions", n, normalized.productions.len());

        let mut table: Vec<Vec<HashMap<Nonterminal, Cell>>> = Vec::with_capacity(n);
        table.push(seed_row(normalized, lattice));

        for len in 2..=n {
            let mut new_row: Vec<HashMap<Nonterminal, Cell>> = (0..=(n - len)).map(|_| HashMap::new()).collect();

            for start in 0..=(n - len) {
                for split in 1..len {
                    let left_len = split;
                    let right_len = len - split;
                    let right_start = start + split;
                    let left_cell = &table[left_len - 1][start];
                    let right_cell = &table[right_len - 1][right_start];
                    if left_cell.is_empty() || right_cell.is_empty() {
                        continue;
                    }

                    for (idx, production) in normalized.productions.iter().enumerate() {
                        if let [Symbol::Nonterminal(b), Symbol::Nonterminal(c)] = production.body.as_slice() {
                            if left_cell.contains_key(b) && right_cell.contains_key(c) {
                                new_row[start].entry(production.pattern.clone()).or_insert(Cell {
                                    production: idx,
                                    back: CykBack::Split { split: start + split },
                                });
                            }
                        }
                    }
                }
            }

            table.push(new_row);
        }

        match table[n - 1][0].get(&normalized.start) {
            Some(_) => {
                let mut shared_cache = HashMap::new();
                let raw_shared = raw_tree(&table, &normalized.productions, 0, n, &normalized.start, &mut shared_cache);
                let raw: SyntaxTree<Production, InputRange> = raw_shared.into();
                Ok(reconstruct(raw, &normalized.utility_nonterminals))
            }
            None => Err(self.locate_error(&table, lattice, text)),
        }
    }

    fn locate_error(&self, table: &[Vec<HashMap<Nonterminal, Cell>>], lattice: &TokenLattice, text: &str) -> SyntaxError {
        let normalized = self.normalized();
        let n = lattice.len();

        let best_len = (1..=n).rev().find(|&len| table[len - 1][0].contains_key(&normalized.start)).unwrap_or(0);

        let range = if best_len < n {
            lattice.matches_at(best_len)[0].range
        } else {
            InputRange::new(text.len(), text.len())
        };

        log::debug!("cyk: no accepting derivation, largest leftmost derivable span has length {}", best_len);
        SyntaxError::new(Reason::UnmatchedPattern, range, Default::default(), Grammar::owned_input(text))
    }
}

fn seed_row(normalized: &Grammar, lattice: &TokenLattice) -> Vec<HashMap<Nonterminal, Cell>> {
    let n = lattice.len();
    let mut row: Vec<HashMap<Nonterminal, Cell>> = (0..n).map(|_| HashMap::new()).collect();

    for position in 0..n {
        for token_match in lattice.matches_at(position) {
            for (idx, production) in normalized.productions.iter().enumerate() {
                if let [Symbol::Terminal(t)] = production.body.as_slice() {
                    if t == &token_match.terminal {
                        row[position].entry(production.pattern.clone()).or_insert(Cell {
                            production: idx,
                            back: CykBack::Leaf(token_match.range),
                        });
                    }
                }
            }
        }
    }

    row
}

/// Walks the chart from an accepted cell down to its leaves, building a tree
/// tagged with the CNF productions that produced it. `position`/`length`
/// locate the cell; the cell's root is read back out of the chart.
///
/// Builds `SharedTree` rather than `SyntaxTree`: the same `(position, length,
/// root)` cell can be reached from more than one split in the table (e.g. a
/// sub-span shared by two different parent splits), and `cache` lets those
/// re-visits clone an `Rc` instead of rebuilding and cloning the whole
/// sub-derivation.
fn raw_tree(
    table: &[Vec<HashMap<Nonterminal, Cell>>],
    productions: &[Production],
    position: usize,
    length: usize,
    root: &Nonterminal,
    cache: &mut HashMap<(usize, usize, Nonterminal), SharedTree<Production, InputRange>>,
) -> SharedTree<Production, InputRange> {
    let key = (position, length, root.clone());
    if let Some(cached) = cache.get(&key) {
        return cached.clone();
    }

    let cell = *table[length - 1][position].get(root).expect("caller guarantees root is present in this cell");
    let production = productions[cell.production].clone();

    let tree = match cell.back {
        CykBack::Leaf(range) => SharedTree::new_node(production, vec![SharedTree::new_leaf(range)]),
        CykBack::Split { split } => {
            let left_len = split - position;
            let right_len = length - left_len;
            let (left_root, right_root) = match production.body.as_slice() {
                [Symbol::Nonterminal(b), Symbol::Nonterminal(c)] => (b.clone(), c.clone()),
                _ => unreachable!("a split cell always comes from a binary production"),
            };
            let left = raw_tree(table, productions, position, left_len, &left_root, cache);
            let right = raw_tree(table, productions, split, right_len, &right_root, cache);
            SharedTree::new_node(production, vec![left, right])
        }
    };

    cache.insert(key, tree.clone());
    tree
}

/// Raw-tree reconstruction frames used by `reconstruct`'s explicit work-stack.
enum UnfoldFrame {
    Enter(SyntaxTree<Production, InputRange>),
    Exit { production: Production, num_children: usize },
}

/// Explode-pass frames: each processed subtree contributes zero or more
/// sibling nodes (zero/many when its root was a utility nonterminal that
/// gets spliced away).
enum ExplodeFrame {
    Enter(SyntaxTree<Nonterminal, InputRange>),
    Exit { val: Nonterminal, num_children: usize },
}

/// Turns a tree of CNF productions into a tree of the original grammar's
/// nonterminals: unfolds collapsed chain productions back into the
/// intermediate nodes they stood for, then splices away nodes introduced
/// purely by normalization. Both passes use an explicit stack instead of
/// native recursion so a long input cannot blow the call stack.
fn reconstruct(root: SyntaxTree<Production, InputRange>, utility: &IndexSet<Nonterminal>) -> SyntaxTree<Nonterminal, InputRange> {
    let mut stack = vec![UnfoldFrame::Enter(root)];
    let mut results: Vec<SyntaxTree<Nonterminal, InputRange>> = Vec::new();

    while let Some(frame) = stack.pop() {
        match frame {
            UnfoldFrame::Enter(SyntaxTree::Leaf { val }) => results.push(SyntaxTree::Leaf { val }),
            UnfoldFrame::Enter(SyntaxTree::Node { val: production, children }) => {
                let num_children = children.len();
                stack.push(UnfoldFrame::Exit { production, num_children });
                for child in children.into_iter().rev() {
                    stack.push(UnfoldFrame::Enter(child));
                }
            }
            UnfoldFrame::Exit { production, num_children } => {
                let split_at = results.len() - num_children;
                let children_prime: Vec<SyntaxTree<Nonterminal, InputRange>> = results.split_off(split_at);

                let outer_children = if production.non_terminal_chain.is_empty() {
                    children_prime
                } else {
                    // chain is root-to-leaf order: the last element is the
                    // closest to `children_prime`, the first is the outermost,
                    // placed directly under `production.pattern`.
                    let mut chain = production.non_terminal_chain.iter().rev();
                    let mut cur = SyntaxTree::new_node(chain.next().unwrap().clone(), children_prime);
                    for c in chain {
                        cur = SyntaxTree::new_node(c.clone(), vec![cur]);
                    }
                    vec![cur]
                };

                results.push(SyntaxTree::new_node(production.pattern, outer_children));
            }
        }
    }

    let unfolded = results.pop().expect("chain-unfold must yield exactly one tree");
    explode_utility(unfolded, utility)
}

fn explode_utility(root: SyntaxTree<Nonterminal, InputRange>, utility: &IndexSet<Nonterminal>) -> SyntaxTree<Nonterminal, InputRange> {
    let mut stack = vec![ExplodeFrame::Enter(root)];
    let mut results: Vec<Vec<SyntaxTree<Nonterminal, InputRange>>> = Vec::new();

    while let Some(frame) = stack.pop() {
        match frame {
            ExplodeFrame::Enter(SyntaxTree::Leaf { val }) => results.push(vec![SyntaxTree::Leaf { val }]),
            ExplodeFrame::Enter(SyntaxTree::Node { val, children }) => {
                let num_children = children.len();
                stack.push(ExplodeFrame::Exit { val, num_children });
                for child in children.into_iter().rev() {
                    stack.push(ExplodeFrame::Enter(child));
                }
            }
            ExplodeFrame::Exit { val, num_children } => {
                let split_at = results.len() - num_children;
                let flattened: Vec<SyntaxTree<Nonterminal, InputRange>> = results.split_off(split_at).into_iter().flatten().collect();

                if utility.contains(&val) {
                    results.push(flattened);
                } else {
                    results.push(vec![SyntaxTree::new_node(val, flattened)]);
                }
            }
        }
    }

    let mut top = results.pop().expect("explode must yield exactly one top-level group");
    assert_eq!(1, top.len(), "a single accepting derivation must reconstruct to exactly one tree");
    top.pop().unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::production::Production;
    use crate::symbol::{Symbol, Terminal};

    fn nt(name: &str) -> Nonterminal {
        Nonterminal::new(name)
    }

    fn lit(s: &str) -> Symbol {
        Symbol::Terminal(Terminal::literal(s))
    }

    fn non(name: &str) -> Symbol {
        Symbol::Nonterminal(nt(name))
    }

    #[test]
    fn parses_a_grammar_requiring_chain_and_mixed_elimination() {
        let grammar = Grammar::new(
            vec![
                Production::new(nt("S"), vec![non("A")]),
                Production::new(nt("A"), vec![lit("("), non("S"), lit(")")]),
                Production::new(nt("A"), vec![lit("x")]),
            ],
            nt("S"),
        );
        let parser = CykParser::new(grammar);

        let tree = parser.syntax_tree("((x))").unwrap();
        assert_eq!(&nt("S"), tree.node_val().unwrap());
        assert_eq!(5, tree.yield_leaves().len());
    }

    #[test]
    fn rejects_input_outside_the_language() {
        let grammar = Grammar::new(
            vec![Production::new(nt("S"), vec![non("S"), non("S")]), Production::new(nt("S"), vec![lit("a")])],
            nt("S"),
        );
        let parser = CykParser::new(grammar);

        assert!(parser.recognizes("aaa"));
        let err = parser.syntax_tree("ab").unwrap_err();
        assert_eq!(Reason::UnknownToken, err.reason);
    }

    #[test]
    fn normalizes_lazily_and_caches() {
        let grammar = Grammar::new(vec![Production::new(nt("S"), vec![lit("a")])], nt("S"));
        let parser = CykParser::new(grammar);

        assert!(parser.recognizes("a"));
        assert!(!parser.normalized.get().unwrap().productions.is_empty());
    }

    #[test]
    fn chain_productions_nest_in_root_to_leaf_order() {
        let grammar = Grammar::new(
            vec![Production::new(nt("S"), vec![non("A")]), Production::new(nt("A"), vec![non("B")]), Production::new(nt("B"), vec![lit("x")])],
            nt("S"),
        );
        let parser = CykParser::new(grammar);

        let tree = parser.syntax_tree("x").unwrap();
        match &tree {
            SyntaxTree::Node { val, children } if *val == nt("S") => match &children[0] {
                SyntaxTree::Node { val, children } if *val == nt("A") => match &children[0] {
                    SyntaxTree::Node { val, children } if *val == nt("B") => {
                        assert!(matches!(children[0], SyntaxTree::Leaf { .. }));
                    }
                    other => panic!("expected B node, got {:?}", other),
                },
                other => panic!("expected A node, got {:?}", other),
            },
            other => panic!("expected S node, got {:?}", other),
        }
    }

    #[test]
    fn empty_input_requires_start_epsilon_production() {
        let grammar = Grammar::new(
            vec![Production::new(nt("S"), vec![lit("a")]), Production::new(nt("S"), vec![])],
            nt("S"),
        );
        let parser = CykParser::new(grammar);

        let tree = parser.syntax_tree("").unwrap();
        assert!(tree.yield_leaves().is_empty());
    }
}
