use std::collections::{HashMap, HashSet, VecDeque};

use indexmap::{IndexMap, IndexSet};
use itertools::Itertools;

use crate::grammar::{Grammar, EPSILON_PREFIX, LONG_BODY_PREFIX, MIXED_PRODUCTION_PREFIX};
use crate::production::Production;
use crate::symbol::{Nonterminal, Symbol, Terminal};

/// Allocates fresh nonterminal names from a reserved prefix, never
/// colliding with a name already in use (user-declared or previously
/// generated in this same normalization run).
struct NameGenerator {
    existing: HashSet<String>,
    counters: HashMap<&'static str, usize>,
}

impl NameGenerator {
    fn new(existing: HashSet<String>) -> Self {
        NameGenerator { existing, counters: HashMap::new() }
    }

    fn fresh(&mut self, prefix: &'static str) -> Nonterminal {
        let counter = self.counters.entry(prefix).or_insert(0);
        loop {
            let candidate = format!("{}{}", prefix, counter);
            *counter += 1;
            if !self.existing.contains(&candidate) {
                self.existing.insert(candidate.clone());
                return Nonterminal::new(candidate);
            }
        }
    }
}

/// Rewrites `grammar` into an equivalent Chomsky Normal Form grammar,
/// running the five-step pipeline in order.
pub fn normalize(grammar: &Grammar) -> Grammar {
    log::debug!("normalizing grammar with {} productions", grammar.productions.len());

    let names: HashSet<String> = grammar.all_nonterminal_names().into_iter().map(String::from).collect();
    let mut gen = NameGenerator::new(names);
    let mut utility: IndexSet<Nonterminal> = grammar.utility_nonterminals.clone();

    let productions = eliminate_unreachable_and_unproductive(&grammar.productions, &grammar.start);
    log::trace!("after reachability/productivity: {} productions", productions.len());

    let productions = eliminate_mixed_productions(productions, &mut gen, &mut utility);
    log::trace!("after mixed-production elimination: {} productions", productions.len());

    let productions = break_long_bodies(productions, &mut gen, &mut utility);
    log::trace!("after long-body breaking: {} productions", productions.len());

    let (productions, start) = eliminate_epsilon_productions(productions, grammar.start.clone(), &mut gen, &mut utility);
    log::trace!("after epsilon elimination: {} productions, start = {}", productions.len(), start);

    let productions = eliminate_chain_productions(productions);
    log::debug!("normalized to {} productions", productions.len());

    let normalized = Grammar::with_utility_nonterminals(productions, start, utility);
    debug_assert!(normalized.is_in_chomsky_normal_form(), "normalize must produce a grammar in Chomsky Normal Form");
    normalized
}

fn eliminate_unreachable_and_unproductive(productions: &[Production], start: &Nonterminal) -> Vec<Production> {
    let mut productive: HashSet<Nonterminal> = HashSet::new();
    loop {
        let mut changed = false;
        for p in productions {
            if productive.contains(&p.pattern) {
                continue;
            }
            if p.generated_nonterminals().all(|nt| productive.contains(nt)) {
                productive.insert(p.pattern.clone());
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }

    let productive_productions: Vec<Production> = productions
        .iter()
        .filter(|p| p.generated_nonterminals().all(|nt| productive.contains(nt)))
        .cloned()
        .collect();

    let mut reachable: HashSet<Nonterminal> = HashSet::new();
    reachable.insert(start.clone());
    loop {
        let mut changed = false;
        for p in &productive_productions {
            if reachable.contains(&p.pattern) {
                for nt in p.generated_nonterminals() {
                    if reachable.insert(nt.clone()) {
                        changed = true;
                    }
                }
            }
        }
        if !changed {
            break;
        }
    }

    productive_productions.into_iter().filter(|p| reachable.contains(&p.pattern)).collect()
}

fn eliminate_mixed_productions(
    productions: Vec<Production>,
    gen: &mut NameGenerator,
    utility: &mut IndexSet<Nonterminal>,
) -> Vec<Production> {
    let mut terminal_subs: IndexMap<Terminal, Nonterminal> = IndexMap::new();
    let mut extra_productions: Vec<Production> = Vec::new();
    let mut out = Vec::with_capacity(productions.len());

    for p in productions {
        if p.body.len() < 2 || !p.body.iter().any(Symbol::is_terminal) {
            out.push(p);
            continue;
        }

        let mut new_body = Vec::with_capacity(p.body.len());
        for symbol in p.body {
            match symbol {
                Symbol::Terminal(t) => {
                    let nt = terminal_subs
                        .entry(t.clone())
                        .or_insert_with(|| {
                            let fresh = gen.fresh(MIXED_PRODUCTION_PREFIX);
                            utility.insert(fresh.clone());
                            extra_productions.push(Production::new(fresh.clone(), vec![Symbol::Terminal(t.clone())]));
                            fresh
                        })
                        .clone();
                    new_body.push(Symbol::Nonterminal(nt));
                }
                nonterminal @ Symbol::Nonterminal(_) => new_body.push(nonterminal),
            }
        }
        out.push(Production::new(p.pattern, new_body));
    }

    out.extend(extra_productions);
    out
}

fn break_long_bodies(
    productions: Vec<Production>,
    gen: &mut NameGenerator,
    utility: &mut IndexSet<Nonterminal>,
) -> Vec<Production> {
    let mut out = Vec::with_capacity(productions.len());

    for p in productions {
        let k = p.body.len();
        if k < 3 {
            out.push(p);
            continue;
        }

        let pattern = p.pattern;
        let body = p.body;

        let mut chain: Vec<Nonterminal> = Vec::with_capacity(k - 2);
        for _ in 0..(k - 2) {
            let fresh = gen.fresh(LONG_BODY_PREFIX);
            utility.insert(fresh.clone());
            chain.push(fresh);
        }

        out.push(Production::new(pattern, vec![body[0].clone(), Symbol::Nonterminal(chain[0].clone())]));

        for i in 0..(k - 3) {
            out.push(Production::new(
                chain[i].clone(),
                vec![body[i + 1].clone(), Symbol::Nonterminal(chain[i + 1].clone())],
            ));
        }

        out.push(Production::new(chain[k - 3].clone(), vec![body[k - 2].clone(), body[k - 1].clone()]));
    }

    out
}

pub(crate) fn compute_nullable(productions: &[Production]) -> HashSet<Nonterminal> {
    let mut nullable: HashSet<Nonterminal> = HashSet::new();
    loop {
        let mut changed = false;
        for p in productions {
            if nullable.contains(&p.pattern) {
                continue;
            }
            let body_all_nullable = !p.body.is_empty()
                && p.body.iter().all(|s| matches!(s, Symbol::Nonterminal(nt) if nullable.contains(nt)));
            if p.is_epsilon() || body_all_nullable {
                nullable.insert(p.pattern.clone());
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }
    nullable
}

fn eliminate_epsilon_productions(
    productions: Vec<Production>,
    start: Nonterminal,
    gen: &mut NameGenerator,
    utility: &mut IndexSet<Nonterminal>,
) -> (Vec<Production>, Nonterminal) {
    let nullable = compute_nullable(&productions);
    let start_nullable = nullable.contains(&start);

    let mut out: Vec<Production> = Vec::new();
    let mut seen: HashSet<Production> = HashSet::new();

    for p in &productions {
        if p.is_epsilon() {
            continue;
        }

        let nullable_positions: Vec<usize> = p
            .body
            .iter()
            .enumerate()
            .filter_map(|(i, s)| match s {
                Symbol::Nonterminal(nt) if nullable.contains(nt) => Some(i),
                _ => None,
            })
            .collect();

        if nullable_positions.is_empty() {
            push_unique(&mut out, &mut seen, p.clone());
            continue;
        }

        for omitted_count in 0..=nullable_positions.len() {
            for omitted in nullable_positions.iter().copied().combinations(omitted_count) {
                let omitted: HashSet<usize> = omitted.into_iter().collect();
                let new_body: Vec<Symbol> = p
                    .body
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| !omitted.contains(i))
                    .map(|(_, s)| s.clone())
                    .collect();
                if new_body.is_empty() {
                    continue;
                }
                push_unique(&mut out, &mut seen, Production::new(p.pattern.clone(), new_body));
            }
        }
    }

    if !start_nullable {
        return (out, start);
    }

    let start_referenced = out.iter().any(|p| p.generated_nonterminals().any(|nt| *nt == start));
    if start_referenced {
        let new_start = gen.fresh(EPSILON_PREFIX);
        utility.insert(new_start.clone());
        out.push(Production::new(new_start.clone(), vec![Symbol::Nonterminal(start)]));
        out.push(Production::new(new_start.clone(), vec![]));
        (out, new_start)
    } else {
        out.push(Production::new(start.clone(), vec![]));
        (out, start)
    }
}

fn push_unique(out: &mut Vec<Production>, seen: &mut HashSet<Production>, p: Production) {
    if seen.insert(p.clone()) {
        out.push(p);
    }
}

fn eliminate_chain_productions(productions: Vec<Production>) -> Vec<Production> {
    let patterns: IndexSet<Nonterminal> = productions.iter().map(|p| p.pattern.clone()).collect();

    let mut chain_index: HashMap<Nonterminal, Vec<Nonterminal>> = HashMap::new();
    for p in &productions {
        if p.is_chain() {
            chain_index.entry(p.pattern.clone()).or_default().push(p.body[0].as_nonterminal().unwrap().clone());
        }
    }

    let non_chain: Vec<&Production> = productions.iter().filter(|p| !p.is_chain()).collect();
    let mut out: Vec<Production> = non_chain.iter().map(|p| (*p).clone()).collect();

    for a in &patterns {
        let mut visited: IndexSet<Nonterminal> = IndexSet::new();
        visited.insert(a.clone());
        let mut queue: VecDeque<(Nonterminal, Vec<Nonterminal>)> = VecDeque::new();
        queue.push_back((a.clone(), Vec::new()));

        while let Some((x, intermediates)) = queue.pop_front() {
            let targets = match chain_index.get(&x) {
                Some(targets) => targets.clone(),
                None => continue,
            };

            for y in targets {
                if visited.contains(&y) {
                    continue;
                }
                visited.insert(y.clone());

                let new_intermediates = if x == *a {
                    Vec::new()
                } else {
                    let mut v = intermediates.clone();
                    v.push(x.clone());
                    v
                };

                for base in non_chain.iter().filter(|p| p.pattern == y) {
                    let mut tag = new_intermediates.clone();
                    tag.push(y.clone());
                    out.push(Production::with_chain(a.clone(), base.body.clone(), tag));
                }

                queue.push_back((y.clone(), new_intermediates));
            }
        }
    }

    out
}
