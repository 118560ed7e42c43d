use assert_matches::assert_matches;
use parsekit::{AttributeMap, Error, Grammar, GrammarBuilder, Rule, SyntaxError, error::Found};
use pretty_assertions::assert_eq;
use rstest::rstest;

use crate::{Expr, number, tokenize};

/// Folds `operand (op operand)*` left to right.
fn fold(mut attributes: AttributeMap<Expr>) -> Expr {
    let mut operands = attributes.take("operand").into_iter();
    let mut lhs = operands.next().unwrap();
    for (op, rhs) in attributes.take("op").into_iter().zip(operands) {
        let Expr::Op(op) = op else {
            panic!("captured a non-operator under `op'");
        };
        lhs = Expr::binary(lhs, &op, rhs);
    }
    lhs
}

fn op(text: &str) -> Expr {
    Expr::Op(text.to_string())
}

fn calculator() -> Grammar<Expr> {
    let mut builder = GrammarBuilder::new();
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
            "Term",
            Rule::converting(fold)
                .node_as("operand", "Primary")
                .many(
                    Rule::new()
                        .capture_with("op", &["*", "/"], op)
                        .node_as("operand", "Primary"),
                ),
        )
        .unwrap();
    builder
        .node(
            "Expression",
            Rule::converting(fold)
                .node_as("operand", "Term")
                .many(
                    Rule::new()
                        .capture_with("op", &["+", "-"], op)
                        .node_as("operand", "Term"),
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
#[case::division("8/2/2", 2)]
#[case::negation("-(2+3)*2", -10)]
#[case::double_negation("--4", 4)]
#[case::nested("((7))", 7)]
fn evaluates(#[case] src: &str, #[case] expected: i64) {
    let grammar = calculator();
    let mut cursor = tokenize(src);

    let tree = grammar.parse_tree("Expression", &mut cursor).unwrap();
    assert_eq!(tree.eval(), expected);
    assert!(!cursor.has_next());
}

#[test_log::test]
fn builds_left_leaning_trees() {
    let grammar = calculator();
    let tree = grammar
        .parse_tree("Expression", &mut tokenize("1 - 2 - 3"))
        .unwrap();

    assert_eq!(
        tree,
        Expr::binary(
            Expr::binary(Expr::Num(1), "-", Expr::Num(2)),
            "-",
            Expr::Num(3)
        )
    );
}

#[test_log::test]
fn start_sets() {
    let grammar = calculator();
    let primary = grammar.node("Primary").unwrap();

    assert_eq!(primary.start_set().keywords().collect::<Vec<_>>(), ["(", "-"]);
    assert!(primary.start_set().is_open());
    assert_eq!(
        grammar
            .node("Expression")
            .unwrap()
            .start_set()
            .keywords()
            .collect::<Vec<_>>(),
        ["(", "-"]
    );
}

#[test_log::test]
fn missing_operand() {
    let error = calculator()
        .parse_tree("Expression", &mut tokenize("1 +"))
        .unwrap_err();

    assert_matches!(
        error,
        Error::Syntax(SyntaxError {
            found: Found::EndOfInput(Some(_)),
            ..
        })
    );
    assert_eq!(
        error.to_string(),
        "Syntax error at end of input in calc:1: Unexpected end of input"
    );
}

#[test_log::test]
fn invalid_number() {
    let error = calculator()
        .parse_tree("Expression", &mut tokenize("1 +\n x"))
        .unwrap_err();

    assert_eq!(
        error.to_string(),
        "Syntax error on token `x' in calc:2: `x' is not a number"
    );
}

#[test_log::test]
fn unclosed_parenthesis() {
    let error = calculator()
        .parse_tree("Expression", &mut tokenize("(1 + 2 3"))
        .unwrap_err();

    assert_eq!(
        error.to_string(),
        "Syntax error on token `3' in calc:1: Expected `)'"
    );
}
