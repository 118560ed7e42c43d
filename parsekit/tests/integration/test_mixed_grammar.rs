use std::sync::Arc;

use parsekit::{
    Grammar, GrammarBuilder, OperatorRegistry, PrecedenceParser, Result, Rule, TokenCursor,
};
use pretty_assertions::assert_eq;
use rstest::rstest;

use crate::{Expr, number, tokenize};

type Registry = OperatorRegistry<Expr, Grammar<Expr>>;

fn binary(op: &'static str) -> impl Fn(Expr, Expr) -> Expr + Send + Sync + 'static {
    move |lhs, rhs| Expr::binary(lhs, op, rhs)
}

fn primary(cursor: &mut TokenCursor, grammar: &Grammar<Expr>) -> Result<Expr> {
    grammar.parse_tree("Primary", cursor)
}

/// Operator chains are folded by a precedence parser; operands and
/// parenthesized expressions come from grammar nodes.
fn mixed() -> Grammar<Expr> {
    let mut registry = Registry::new(primary);
    registry.add("+", binary("+")).add("-", binary("-"));
    registry.increase_level();
    registry.add("*", binary("*")).add("/", binary("/"));
    registry.increase_level();
    registry.add_right("^", binary("^"));
    let parser = Arc::new(PrecedenceParser::new(registry));

    let mut builder = GrammarBuilder::new();
    builder
        .node(
            "Expression",
            Rule::<Expr>::converting(|mut attributes| attributes.take_first("value").unwrap())
                .operators("value", "Primary", parser),
        )
        .unwrap();
    builder
        .node(
            "Primary",
            Rule::<Expr>::converting(|mut attributes| attributes.take_first("inner").unwrap())
                .accept(&["("])
                .node_as("inner", "Expression")
                .accept(&[")"])
                .or_converting(|mut attributes| {
                    Expr::Neg(Box::new(attributes.take_first("inner").unwrap()))
                })
                .accept(&["-"])
                .node_as("inner", "Primary")
                .or_converting(|mut attributes| attributes.take_first("value").unwrap())
                .try_process("value", number),
        )
        .unwrap();
    builder
        .node(
            "Statements",
            Rule::new().while_next(
                &["let"],
                Rule::new()
                    .accept(&["let"])
                    .process("name", |name| Expr::Op(name.to_string()))
                    .accept(&["="])
                    .node_as("value", "Expression")
                    .accept(&[";"]),
            ),
        )
        .unwrap();
    builder.build().unwrap()
}

#[rstest]
#[test_log::test]
#[case::precedence("1+2*3", 7)]
#[case::parentheses("(1+2)*3", 9)]
#[case::left_to_right("1-2-3", -4)]
#[case::right_associative("2^3^2", 512)]
#[case::mixed_tiers("1+2*3^2-4", 15)]
#[case::negated_operand("-2*-3", 6)]
fn evaluates(#[case] src: &str, #[case] expected: i64) {
    let grammar = mixed();
    let mut cursor = tokenize(src);

    assert_eq!(
        grammar.parse_tree("Expression", &mut cursor).unwrap().eval(),
        expected
    );
    assert!(!cursor.has_next());
}

#[test_log::test]
fn right_associative_tree() {
    let tree = mixed()
        .parse_tree("Expression", &mut tokenize("2 ^ 3 ^ 2"))
        .unwrap();

    assert_eq!(
        tree,
        Expr::binary(
            Expr::Num(2),
            "^",
            Expr::binary(Expr::Num(3), "^", Expr::Num(2))
        )
    );
}

#[test_log::test]
fn expressions_inside_statements() {
    let grammar = mixed();
    let mut cursor = tokenize("let a = 1 + 2; let b = (3 - 1) * 4;");

    let mut attributes = grammar.parse("Statements", &mut cursor).unwrap();
    assert!(!cursor.has_next());

    assert_eq!(
        attributes.take("name"),
        [Expr::Op("a".into()), Expr::Op("b".into())]
    );
    let values: Vec<i64> = attributes.take("value").iter().map(Expr::eval).collect();
    assert_eq!(values, [3, 8]);
}

#[test_log::test]
fn operator_chain_stops_at_unknown_token() {
    let grammar = mixed();
    let mut cursor = tokenize("1 + 2 ; 3");

    assert_eq!(
        grammar.parse_tree("Expression", &mut cursor).unwrap().eval(),
        3
    );
    assert_eq!(cursor.peek_text(), Some(";"));
}

#[test_log::test]
fn error_inside_operand() {
    let error = mixed()
        .parse_tree("Expression", &mut tokenize("1 + (2 * 3"))
        .unwrap_err();

    assert_eq!(
        error.to_string(),
        "Syntax error at end of input in calc:1: Expected `)'"
    );
}
