//! Precedence climbing over binary infix operators.
//!
//! The [`Operators`] trait is the table the climbing loop consults. The
//! closure-based [`OperatorRegistry`] covers most uses; a hand-written
//! implementation can compute precedences or build expressions any other way.
//!
//! Every operation takes a context `C` that is handed through to the operand
//! parsers. A grammar passes itself, so operands can be grammar nodes.

use std::{fmt::Debug, sync::Arc};

use fnv::FnvHashMap;
use tracing::trace;

use crate::{
    cursor::TokenCursor,
    error::{Result, SyntaxError},
    token::Token,
};

/// Precedence tier. Higher tiers bind tighter.
pub type Level = u32;

#[derive(Clone, Copy, Default, PartialEq, Eq, Debug)]
pub enum Associativity {
    #[default]
    Left,
    Right,
}

pub trait Operators {
    type Expr;
    type Context: ?Sized;

    /// The tier of `op`, `None` when `op` is not an operator here.
    fn precedence(&self, op: &str) -> Option<Level>;

    fn associativity(&self, _op: &str) -> Associativity {
        Associativity::Left
    }

    /// Parses an operand that is not the right-hand side of a specific operator.
    fn parse_primary(
        &self,
        cursor: &mut TokenCursor,
        ctx: &Self::Context,
    ) -> Result<Self::Expr>;

    /// Parses the right-hand side of `op`, which has just been consumed.
    fn parse_rhs(
        &self,
        _op: &Token,
        cursor: &mut TokenCursor,
        ctx: &Self::Context,
    ) -> Result<Self::Expr> {
        self.parse_primary(cursor, ctx)
    }

    fn combine(&self, op: &Token, lhs: Self::Expr, rhs: Self::Expr) -> Result<Self::Expr>;
}

impl<O: Operators + ?Sized> Operators for &O {
    type Expr = O::Expr;
    type Context = O::Context;

    fn precedence(&self, op: &str) -> Option<Level> {
        (**self).precedence(op)
    }

    fn associativity(&self, op: &str) -> Associativity {
        (**self).associativity(op)
    }

    fn parse_primary(&self, cursor: &mut TokenCursor, ctx: &Self::Context) -> Result<Self::Expr> {
        (**self).parse_primary(cursor, ctx)
    }

    fn parse_rhs(
        &self,
        op: &Token,
        cursor: &mut TokenCursor,
        ctx: &Self::Context,
    ) -> Result<Self::Expr> {
        (**self).parse_rhs(op, cursor, ctx)
    }

    fn combine(&self, op: &Token, lhs: Self::Expr, rhs: Self::Expr) -> Result<Self::Expr> {
        (**self).combine(op, lhs, rhs)
    }
}

pub type ParseFn<E, C> = Arc<dyn Fn(&mut TokenCursor, &C) -> Result<E> + Send + Sync>;
pub type CombineFn<E> = Arc<dyn Fn(E, E) -> E + Send + Sync>;

struct OperatorEntry<E, C: ?Sized> {
    level: Level,
    associativity: Associativity,
    rhs: Option<ParseFn<E, C>>,
    combine: CombineFn<E>,
}

/// Operators registered with their tier, right-hand-side parser and combining function.
///
/// Operators added between two calls to [`OperatorRegistry::increase_level`]
/// share a tier.
pub struct OperatorRegistry<E, C: ?Sized = ()> {
    operators: FnvHashMap<String, OperatorEntry<E, C>>,
    default_rhs: ParseFn<E, C>,
    level: Level,
}

impl<E, C: ?Sized> OperatorRegistry<E, C> {
    /// `default_rhs` parses the left operand of an expression and the right
    /// operand of every operator registered without its own parser.
    pub fn new(
        default_rhs: impl Fn(&mut TokenCursor, &C) -> Result<E> + Send + Sync + 'static,
    ) -> Self {
        Self {
            operators: FnvHashMap::default(),
            default_rhs: Arc::new(default_rhs),
            level: 0,
        }
    }

    /// Left-associative operator at the current tier.
    pub fn add(
        &mut self,
        op: impl Into<String>,
        combine: impl Fn(E, E) -> E + Send + Sync + 'static,
    ) -> &mut Self {
        self.insert(op.into(), self.level, Associativity::Left, None, Arc::new(combine))
    }

    /// Right-associative operator at the current tier.
    pub fn add_right(
        &mut self,
        op: impl Into<String>,
        combine: impl Fn(E, E) -> E + Send + Sync + 'static,
    ) -> &mut Self {
        self.insert(op.into(), self.level, Associativity::Right, None, Arc::new(combine))
    }

    /// Operator at the current tier with its own right-hand-side parser.
    pub fn add_with_rhs(
        &mut self,
        op: impl Into<String>,
        rhs: impl Fn(&mut TokenCursor, &C) -> Result<E> + Send + Sync + 'static,
        combine: impl Fn(E, E) -> E + Send + Sync + 'static,
    ) -> &mut Self {
        self.insert(
            op.into(),
            self.level,
            Associativity::Left,
            Some(Arc::new(rhs)),
            Arc::new(combine),
        )
    }

    /// Operator at an explicit tier using the default right-hand-side parser.
    pub fn add_at_level(
        &mut self,
        op: impl Into<String>,
        level: Level,
        combine: impl Fn(E, E) -> E + Send + Sync + 'static,
    ) -> &mut Self {
        self.insert(op.into(), level, Associativity::Left, None, Arc::new(combine))
    }

    /// The fully explicit form.
    pub fn add_at(
        &mut self,
        op: impl Into<String>,
        level: Level,
        rhs: impl Fn(&mut TokenCursor, &C) -> Result<E> + Send + Sync + 'static,
        combine: impl Fn(E, E) -> E + Send + Sync + 'static,
    ) -> &mut Self {
        self.insert(
            op.into(),
            level,
            Associativity::Left,
            Some(Arc::new(rhs)),
            Arc::new(combine),
        )
    }

    /// Starts a new, strictly higher tier for subsequently added operators.
    pub fn increase_level(&mut self) -> &mut Self {
        self.level += 1;
        self
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn precedence(&self, op: &str) -> Option<Level> {
        self.operators.get(op).map(|entry| entry.level)
    }

    fn insert(
        &mut self,
        op: String,
        level: Level,
        associativity: Associativity,
        rhs: Option<ParseFn<E, C>>,
        combine: CombineFn<E>,
    ) -> &mut Self {
        trace!("operator `{op}' at level {level} ({associativity:?})");
        self.operators.insert(
            op,
            OperatorEntry {
                level,
                associativity,
                rhs,
                combine,
            },
        );
        self
    }
}

impl<E, C: ?Sized> Operators for OperatorRegistry<E, C> {
    type Expr = E;
    type Context = C;

    fn precedence(&self, op: &str) -> Option<Level> {
        OperatorRegistry::precedence(self, op)
    }

    fn associativity(&self, op: &str) -> Associativity {
        self.operators
            .get(op)
            .map(|entry| entry.associativity)
            .unwrap_or_default()
    }

    fn parse_primary(&self, cursor: &mut TokenCursor, ctx: &C) -> Result<E> {
        (self.default_rhs)(cursor, ctx)
    }

    fn parse_rhs(&self, op: &Token, cursor: &mut TokenCursor, ctx: &C) -> Result<E> {
        match self
            .operators
            .get(op.text())
            .and_then(|entry| entry.rhs.as_ref())
        {
            Some(rhs) => rhs(cursor, ctx),
            None => (self.default_rhs)(cursor, ctx),
        }
    }

    fn combine(&self, op: &Token, lhs: E, rhs: E) -> Result<E> {
        match self.operators.get(op.text()) {
            Some(entry) => Ok((entry.combine)(lhs, rhs)),
            None => Err(SyntaxError::unexpected(op.clone(), "Not an operator").into()),
        }
    }
}

impl<E, C: ?Sized> Debug for OperatorRegistry<E, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut operators: Vec<(&String, Level)> = self
            .operators
            .iter()
            .map(|(op, entry)| (op, entry.level))
            .collect();
        operators.sort_by(|a, b| a.1.cmp(&b.1).then(a.0.cmp(b.0)));

        f.debug_struct("OperatorRegistry")
            .field("operators", &operators)
            .field("level", &self.level)
            .finish()
    }
}

/// Runs precedence climbing with an operator table.
///
/// The parser only folds the operator chain: [`PrecedenceParser::parse`]
/// takes an already parsed left operand, [`PrecedenceParser::parse_expression`]
/// parses it first. Parsing stops, leaving the token unconsumed, at the first
/// token that is not an operator and at end of input.
#[derive(Debug)]
pub struct PrecedenceParser<O> {
    operators: O,
}

impl<O: Operators> PrecedenceParser<O> {
    pub fn new(operators: O) -> Self {
        Self { operators }
    }

    pub fn operators(&self) -> &O {
        &self.operators
    }

    pub fn parse_in(
        &self,
        ctx: &O::Context,
        cursor: &mut TokenCursor,
        lhs: O::Expr,
    ) -> Result<O::Expr> {
        self.climb(ctx, cursor, lhs, 0)
    }

    pub fn parse_expression_in(
        &self,
        ctx: &O::Context,
        cursor: &mut TokenCursor,
    ) -> Result<O::Expr> {
        let lhs = self.operators.parse_primary(cursor, ctx)?;
        self.parse_in(ctx, cursor, lhs)
    }

    fn climb(
        &self,
        ctx: &O::Context,
        cursor: &mut TokenCursor,
        mut lhs: O::Expr,
        min_level: Level,
    ) -> Result<O::Expr> {
        while let Some(level) = self
            .next_operator(cursor)
            .map(|(level, _)| level)
            .filter(|level| *level >= min_level)
        {
            let op = cursor.next()?.clone();
            let mut rhs = self.operators.parse_rhs(&op, cursor, ctx)?;

            while let Some((next_level, associativity)) = self.next_operator(cursor) {
                let binds_tighter = next_level > level
                    || (next_level == level && associativity == Associativity::Right);
                if !binds_tighter {
                    break;
                }
                rhs = self.climb(ctx, cursor, rhs, next_level)?;
            }

            trace!("fold `{op}' at level {level}");
            lhs = self.operators.combine(&op, lhs, rhs)?;
        }

        Ok(lhs)
    }

    fn next_operator(&self, cursor: &TokenCursor) -> Option<(Level, Associativity)> {
        let text = cursor.peek_text()?;
        let level = self.operators.precedence(text)?;
        Some((level, self.operators.associativity(text)))
    }
}

impl<O: Operators<Context = ()>> PrecedenceParser<O> {
    pub fn parse(&self, cursor: &mut TokenCursor, lhs: O::Expr) -> Result<O::Expr> {
        self.parse_in(&(), cursor, lhs)
    }

    pub fn parse_expression(&self, cursor: &mut TokenCursor) -> Result<O::Expr> {
        self.parse_expression_in(&(), cursor)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;
    use test_log::test;

    use crate::{
        error::{Error, Found},
        lexer::Tokenizer,
    };

    use super::*;

    fn number(cursor: &mut TokenCursor, _: &()) -> Result<i64> {
        let token = cursor.next()?;
        token
            .text()
            .parse()
            .map_err(|_| SyntaxError::unexpected(token.clone(), "Expected a number").into())
    }

    fn arithmetic() -> PrecedenceParser<OperatorRegistry<i64>> {
        let mut registry = OperatorRegistry::new(number);
        registry.add("+", |a, b| a + b).add("-", |a, b| a - b);
        registry.increase_level();
        registry.add("*", |a, b| a * b).add("/", |a, b| a / b);
        registry.increase_level();
        registry.add_right("^", |a: i64, b: i64| a.pow(b as u32));
        PrecedenceParser::new(registry)
    }

    fn tokens(src: &str) -> TokenCursor {
        Tokenizer::new().tokenize(src, "<test>").unwrap()
    }

    #[test]
    fn registry_levels() {
        let parser = arithmetic();
        let registry = parser.operators();

        assert_eq!(registry.precedence("+"), Some(0));
        assert_eq!(registry.precedence("/"), Some(1));
        assert_eq!(registry.precedence("^"), Some(2));
        assert_eq!(registry.precedence("%"), None);
        assert_eq!(registry.level(), 2);
    }

    #[test]
    fn higher_tiers_bind_tighter() {
        let parser = arithmetic();
        assert_eq!(parser.parse_expression(&mut tokens("1+2*3")).unwrap(), 7);
        assert_eq!(parser.parse_expression(&mut tokens("2*3+1")).unwrap(), 7);
        assert_eq!(parser.parse_expression(&mut tokens("1+2*3^2-4")).unwrap(), 15);
    }

    #[test]
    fn same_tier_is_left_associative() {
        let parser = arithmetic();
        assert_eq!(parser.parse_expression(&mut tokens("1-2-3")).unwrap(), -4);
        assert_eq!(parser.parse_expression(&mut tokens("8/4/2")).unwrap(), 1);
    }

    #[test]
    fn right_associative_operator() {
        let parser = arithmetic();
        assert_eq!(parser.parse_expression(&mut tokens("2^3^2")).unwrap(), 512);
    }

    #[test]
    fn parse_with_supplied_lhs() {
        let parser = arithmetic();
        let mut cursor = tokens("+ 2 * 3");
        assert_eq!(parser.parse(&mut cursor, 10).unwrap(), 16);
    }

    #[test]
    fn stops_before_unregistered_token() {
        let parser = arithmetic();
        let mut cursor = tokens("1+2)*3");

        assert_eq!(parser.parse_expression(&mut cursor).unwrap(), 3);
        assert_eq!(cursor.peek_text(), Some(")"));
    }

    #[test]
    fn missing_right_operand() {
        let parser = arithmetic();
        let error = parser.parse_expression(&mut tokens("1+")).unwrap_err();

        assert_matches!(
            error,
            Error::Syntax(SyntaxError {
                found: Found::EndOfInput(Some(_)),
                ..
            })
        );
    }

    /// `[1 2 3]` parses to the sum of the listed numbers.
    fn sum_list(cursor: &mut TokenCursor, _: &()) -> Result<i64> {
        cursor.accept(&["["])?;
        let mut sum = 0;
        while !cursor.accept_if_next(&["]"]) {
            sum += number(cursor, &())?;
        }
        Ok(sum)
    }

    #[test]
    fn operator_with_own_rhs_parser() {
        let mut registry = OperatorRegistry::new(number);
        registry.add("+", |a, b| a + b);
        registry.add_at("@", 5, sum_list, |a, b| a * b);
        let parser = PrecedenceParser::new(registry);

        assert_eq!(
            parser.parse_expression(&mut tokens("2 @ [1 2 3] + 1")).unwrap(),
            13
        );
    }

    #[test]
    fn own_rhs_parser_at_the_current_tier() {
        let mut registry = OperatorRegistry::new(number);
        registry.add("+", |a, b| a + b);
        registry.increase_level();
        registry.add_with_rhs("@", sum_list, |a, b| a * b);
        assert_eq!(registry.precedence("@"), Some(1));

        let parser = PrecedenceParser::new(registry);
        assert_eq!(
            parser.parse_expression(&mut tokens("1 + 2 @ [1 2]")).unwrap(),
            7
        );
        assert_eq!(
            parser.parse_expression(&mut tokens("2 @ [4] @ [1 1] + 3")).unwrap(),
            19
        );

        // the plain operand parser still handles `+`
        let error = parser.parse_expression(&mut tokens("1 + [2]")).unwrap_err();
        assert_matches!(
            error,
            Error::Syntax(SyntaxError {
                found: Found::Token(token),
                ..
            }) if token.text() == "["
        );
    }

    #[test]
    fn explicit_level_leaves_the_current_tier_alone() {
        let mut registry = OperatorRegistry::new(number);
        registry
            .add("+", |a, b| a + b)
            .add_at_level("%", 3, |a, b| a % b)
            .add("*", |a, b| a * b);
        assert_eq!(registry.precedence("%"), Some(3));
        assert_eq!(registry.precedence("*"), Some(0));
        assert_eq!(registry.level(), 0);

        let parser = PrecedenceParser::new(registry);
        assert_eq!(parser.parse_expression(&mut tokens("1 + 7 % 4")).unwrap(), 4);
        assert_eq!(parser.parse_expression(&mut tokens("7 % 4 + 1")).unwrap(), 4);
        assert_eq!(parser.parse_expression(&mut tokens("2 * 7 % 4")).unwrap(), 6);
        assert_eq!(parser.parse_expression(&mut tokens("2 * 7 + 4")).unwrap(), 18);
    }

    /// Operand parsing that recurses into the same table for parentheses.
    struct Parenthesized;

    impl Operators for Parenthesized {
        type Expr = i64;
        type Context = ();

        fn precedence(&self, op: &str) -> Option<Level> {
            match op {
                "+" | "-" => Some(0),
                "*" => Some(1),
                _ => None,
            }
        }

        fn parse_primary(&self, cursor: &mut TokenCursor, ctx: &()) -> Result<i64> {
            if cursor.accept_if_next(&["("]) {
                let inner = PrecedenceParser::new(self).parse_expression_in(ctx, cursor)?;
                cursor.accept(&[")"])?;
                Ok(inner)
            } else {
                number(cursor, ctx)
            }
        }

        fn combine(&self, op: &Token, lhs: i64, rhs: i64) -> Result<i64> {
            Ok(match op.text() {
                "+" => lhs + rhs,
                "-" => lhs - rhs,
                _ => lhs * rhs,
            })
        }
    }

    #[test]
    fn hand_written_operator_table() {
        let parser = PrecedenceParser::new(Parenthesized);
        assert_eq!(parser.parse_expression(&mut tokens("(1+2)*3")).unwrap(), 9);
        assert_eq!(parser.parse_expression(&mut tokens("2*(3-(4+1))")).unwrap(), -4);
    }
}
