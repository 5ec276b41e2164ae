use chomp_grammar::{CykParser, EarleyParser, Grammar, Nonterminal, Production, Reason, Symbol, Terminal, Tree};

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
fn arithmetic_grammar_both_parsers_accept_and_agree_on_root_and_leaves() {
    let grammar = Grammar::new(
        vec![
            Production::new(nt("E"), vec![non("E"), lit("+"), non("E")]),
            Production::new(nt("E"), vec![non("E"), lit("*"), non("E")]),
            Production::new(nt("E"), vec![lit("a")]),
        ],
        nt("E"),
    );

    let earley = EarleyParser::new(grammar.clone());
    let cyk = CykParser::new(grammar);

    for tree in [earley.syntax_tree("a+a*a").unwrap(), cyk.syntax_tree("a+a*a").unwrap()] {
        assert_eq!(&nt("E"), tree.node_val().unwrap());
        let leaves = tree.yield_leaves();
        assert_eq!(5, leaves.len());
    }
}

#[test]
fn nullable_start_accepts_empty_input_and_repeated_a() {
    let grammar = Grammar::new(
        vec![Production::new(nt("S"), vec![lit("a"), non("S")]), Production::new(nt("S"), vec![])],
        nt("S"),
    );
    let earley = EarleyParser::new(grammar.clone());
    let cyk = CykParser::new(grammar);

    let empty = earley.syntax_tree("").unwrap();
    assert_eq!(0, empty.yield_leaves().len());
    assert!(matches!(empty, chomp_grammar::SyntaxTree::Node { ref children, .. } if children.is_empty()));

    let aaa_earley = earley.syntax_tree("aaa").unwrap();
    let aaa_cyk = cyk.syntax_tree("aaa").unwrap();
    assert_eq!(3, aaa_earley.yield_leaves().len());
    assert_eq!(3, aaa_cyk.yield_leaves().len());
}

#[test]
fn unknown_token_reports_exact_position() {
    let grammar = Grammar::new(vec![Production::new(nt("S"), vec![lit("a")])], nt("S"));
    let earley = EarleyParser::new(grammar);

    let err = earley.syntax_tree("b").unwrap_err();
    assert_eq!(Reason::UnknownToken, err.reason);
    assert_eq!(0, err.range.start);
    assert_eq!(1, err.range.end);
    assert_eq!(0, err.line());
    assert_eq!(0, err.column());
}

#[test]
fn unmatched_pattern_points_past_the_input() {
    let grammar = Grammar::new(vec![Production::new(nt("S"), vec![lit("a"), lit("a")])], nt("S"));
    let earley = EarleyParser::new(grammar.clone());
    let cyk = CykParser::new(grammar);

    let earley_err = earley.syntax_tree("a").unwrap_err();
    assert_eq!(Reason::UnmatchedPattern, earley_err.reason);
    assert_eq!(1, earley_err.range.start);

    let cyk_err = cyk.syntax_tree("a").unwrap_err();
    assert_eq!(Reason::UnmatchedPattern, cyk_err.reason);
}

#[test]
fn chain_productions_collapse_without_leaking_utility_nonterminals() {
    let grammar = Grammar::new(
        vec![
            Production::new(nt("S"), vec![non("A")]),
            Production::new(nt("A"), vec![non("B")]),
            Production::new(nt("B"), vec![lit("x")]),
        ],
        nt("S"),
    );
    let cyk = CykParser::new(grammar);

    let tree = cyk.syntax_tree("x").unwrap();
    match &tree {
        chomp_grammar::SyntaxTree::Node { val, children } => {
            assert_eq!(&nt("S"), val);
            match &children[0] {
                chomp_grammar::SyntaxTree::Node { val, children } => {
                    assert_eq!(&nt("A"), val);
                    match &children[0] {
                        chomp_grammar::SyntaxTree::Node { val, children } => {
                            assert_eq!(&nt("B"), val);
                            assert!(matches!(children[0], chomp_grammar::SyntaxTree::Leaf { .. }));
                        }
                        _ => panic!("expected B node"),
                    }
                }
                _ => panic!("expected A node"),
            }
        }
        _ => panic!("expected S node"),
    }
}

#[test]
fn ambiguous_grammar_parses_deterministically_across_repeated_calls() {
    let grammar = Grammar::new(
        vec![Production::new(nt("E"), vec![non("E"), lit("+"), non("E")]), Production::new(nt("E"), vec![lit("a")])],
        nt("E"),
    );
    let earley = EarleyParser::new(grammar.clone());
    let cyk = CykParser::new(grammar);

    let first = format!("{:?}", earley.syntax_tree("a+a+a").unwrap());
    let second = format!("{:?}", earley.syntax_tree("a+a+a").unwrap());
    assert_eq!(first, second);

    let cyk_first = format!("{:?}", cyk.syntax_tree("a+a+a").unwrap());
    let cyk_second = format!("{:?}", cyk.syntax_tree("a+a+a").unwrap());
    assert_eq!(cyk_first, cyk_second);
}
