use std::fmt::Write as _;

use crate::error::ImplementationError;
use crate::grammar::Grammar;
use crate::symbol::{Nonterminal, Symbol, Terminal};

#[derive(Clone, Copy)]
enum Dialect {
    Bnf,
    Ebnf,
    Abnf,
}

pub fn to_bnf(grammar: &Grammar) -> Result<String, ImplementationError> {
    Ok(render(grammar, Dialect::Bnf))
}

pub fn to_ebnf(grammar: &Grammar) -> Result<String, ImplementationError> {
    Ok(render(grammar, Dialect::Ebnf))
}

/// ABNF cannot express a regular-expression terminal, so this fails if the
/// grammar contains one.
pub fn to_abnf(grammar: &Grammar) -> Result<String, ImplementationError> {
    if let Some(pattern) = grammar
        .productions
        .iter()
        .flat_map(|p| p.generated_terminals())
        .find_map(Terminal::regex_pattern)
    {
        return Err(ImplementationError::UnsupportedByAbnf { pattern: pattern.to_string() });
    }
    Ok(render(grammar, Dialect::Abnf))
}

fn render(grammar: &Grammar, dialect: Dialect) -> String {
    let mut out = String::new();
    let mut seen_patterns: Vec<&Nonterminal> = Vec::new();

    for p in &grammar.productions {
        if !seen_patterns.contains(&&p.pattern) {
            seen_patterns.push(&p.pattern);
        }
    }

    for pattern in seen_patterns {
        let bodies: Vec<String> = grammar
            .productions
            .iter()
            .filter(|p| &p.pattern == pattern)
            .map(|p| render_body(&p.body, dialect))
            .collect();

        match dialect {
            Dialect::Bnf => {
                let _ = writeln!(out, "<{}> ::= {}", pattern.name(), bodies.join(" | "));
            }
            Dialect::Ebnf => {
                let _ = writeln!(out, "{} = {};", pattern.name(), bodies.join(" | "));
            }
            Dialect::Abnf => {
                let _ = writeln!(out, "{} = {}", pattern.name(), bodies.join(" / "));
            }
        }
    }

    out
}

fn render_body(body: &[Symbol], dialect: Dialect) -> String {
    if body.is_empty() {
        return "\"\"".to_string();
    }
    body.iter().map(|s| render_symbol(s, dialect)).collect::<Vec<_>>().join(" ")
}

fn render_symbol(symbol: &Symbol, dialect: Dialect) -> String {
    match symbol {
        Symbol::Nonterminal(nt) => match dialect {
            Dialect::Bnf => format!("<{}>", nt.name()),
            Dialect::Ebnf | Dialect::Abnf => nt.name().to_string(),
        },
        Symbol::Terminal(t) => render_terminal(t, dialect),
    }
}

fn render_terminal(terminal: &Terminal, dialect: Dialect) -> String {
    if let Some(pattern) = terminal.regex_pattern() {
        return format!("/{}/", pattern);
    }
    match dialect {
        Dialect::Abnf => render_terminal_abnf(terminal),
        Dialect::Bnf | Dialect::Ebnf => format!("{}", terminal),
    }
}

fn render_terminal_abnf(terminal: &Terminal) -> String {
    if let Some(s) = terminal.literal_text() {
        format!("\"{}\"", s)
    } else if let Some((lo, hi)) = terminal.char_range_bounds() {
        format!("%x{:X}-{:X}", lo as u32, hi as u32)
    } else {
        unreachable!("to_abnf rejects regex terminals before rendering")
    }
}
