use std::sync::Arc;

use crate::{
    cursor::TokenCursor,
    error::Result,
    precedence::{Operators, PrecedenceParser},
};

use super::{AttributeMap, Grammar, StartSet};

pub type Converter<T> = Arc<dyn Fn(AttributeMap<T>) -> T + Send + Sync>;
pub type StepFn<T> =
    Arc<dyn Fn(&Grammar<T>, &mut TokenCursor, &mut AttributeMap<T>) -> Result<()> + Send + Sync>;

pub(super) type TextFn<T> = Arc<dyn Fn(&str) -> T + Send + Sync>;
pub(super) type ProcessFn<T> = Arc<dyn Fn(&str) -> Result<T, String> + Send + Sync>;
pub(super) type ConsumeFn = Arc<dyn Fn(&str) + Send + Sync>;
pub(super) type PredicateFn = Arc<dyn Fn(&TokenCursor) -> bool + Send + Sync>;
pub(super) type OperatorsFn<T> =
    Arc<dyn Fn(&Grammar<T>, &mut TokenCursor, T) -> Result<T> + Send + Sync>;

/// A sequence of parsing steps with alternatives, built fluently.
///
/// Rules name the nodes they refer to; names are resolved when the grammar
/// is built, so nodes can refer to nodes defined later and to each other.
///
/// ```ignore
/// let primary = Rule::converting(|mut attrs| attrs.take_first("value").unwrap_or_default())
///     .accept(&["("])
///     .node_as("value", "Expression")
///     .accept(&[")"])
///     .or()
///     .process("value", |text| text.parse().unwrap_or_default());
/// ```
pub struct Rule<T> {
    pub(super) body: Body<T, String>,
}

/// Alternatives of a rule. `N` refers to a node: a name before the grammar is
/// built, a [`NodeId`](super::NodeId) after.
pub(super) struct Body<T, N> {
    pub alternatives: Vec<Alternative<T, N>>,
    pub start: StartSet,
    pub nullable: bool,
}

pub(super) struct Alternative<T, N> {
    pub steps: Vec<Step<T, N>>,
    pub converter: Option<Converter<T>>,
    pub start: StartSet,
    pub nullable: bool,
}

pub(super) enum Guard {
    Keywords(Vec<String>),
    Predicate(PredicateFn),
}

pub(super) enum Step<T, N> {
    Accept(Vec<String>),
    Capture {
        name: String,
        keywords: Vec<String>,
        convert: TextFn<T>,
    },
    Node {
        target: N,
        capture: Option<String>,
    },
    Maybe(Body<T, N>),
    Many(Body<T, N>),
    OnceOrMore(Body<T, N>),
    Guarded {
        guard: Guard,
        body: Body<T, N>,
        repeat: bool,
    },
    Process {
        name: String,
        process: ProcessFn<T>,
    },
    Consume(ConsumeFn),
    Sub(StepFn<T>),
    Operators {
        name: String,
        operand: N,
        parse: OperatorsFn<T>,
    },
}

impl<T, N> Body<T, N> {
    fn new(converter: Option<Converter<T>>) -> Self {
        Self {
            alternatives: vec![Alternative {
                steps: vec![],
                converter,
                start: StartSet::default(),
                nullable: false,
            }],
            start: StartSet::default(),
            nullable: false,
        }
    }

    /// Rebuilds the body with every node reference mapped through `resolve`.
    pub fn resolve<M, E>(
        self,
        resolve: &mut impl FnMut(N) -> Result<M, E>,
    ) -> Result<Body<T, M>, E> {
        let mut alternatives = Vec::with_capacity(self.alternatives.len());
        for alternative in self.alternatives {
            let mut steps = Vec::with_capacity(alternative.steps.len());
            for step in alternative.steps {
                steps.push(step.resolve(&mut *resolve)?);
            }
            alternatives.push(Alternative {
                steps,
                converter: alternative.converter,
                start: alternative.start,
                nullable: alternative.nullable,
            });
        }

        Ok(Body {
            alternatives,
            start: self.start,
            nullable: self.nullable,
        })
    }
}

impl<T, N> Step<T, N> {
    fn resolve<M, E>(
        self,
        resolve: &mut impl FnMut(N) -> Result<M, E>,
    ) -> Result<Step<T, M>, E> {
        Ok(match self {
            Self::Accept(keywords) => Step::Accept(keywords),
            Self::Capture {
                name,
                keywords,
                convert,
            } => Step::Capture {
                name,
                keywords,
                convert,
            },
            Self::Node { target, capture } => Step::Node {
                target: resolve(target)?,
                capture,
            },
            Self::Maybe(body) => Step::Maybe(body.resolve(&mut *resolve)?),
            Self::Many(body) => Step::Many(body.resolve(&mut *resolve)?),
            Self::OnceOrMore(body) => Step::OnceOrMore(body.resolve(&mut *resolve)?),
            Self::Guarded {
                guard,
                body,
                repeat,
            } => Step::Guarded {
                guard,
                body: body.resolve(&mut *resolve)?,
                repeat,
            },
            Self::Process { name, process } => Step::Process { name, process },
            Self::Consume(consume) => Step::Consume(consume),
            Self::Sub(step) => Step::Sub(step),
            Self::Operators {
                name,
                operand,
                parse,
            } => Step::Operators {
                name,
                operand: resolve(operand)?,
                parse,
            },
        })
    }
}

impl<T: 'static> Rule<T> {
    /// An empty rule without a converter.
    pub fn new() -> Self {
        Self {
            body: Body::new(None),
        }
    }

    /// An empty rule whose first alternative converts its attributes with `converter`.
    pub fn converting(converter: impl Fn(AttributeMap<T>) -> T + Send + Sync + 'static) -> Self {
        Self {
            body: Body::new(Some(Arc::new(converter))),
        }
    }

    /// Consume one token whose text must be one of `keywords`.
    pub fn accept<K: AsRef<str>>(self, keywords: &[K]) -> Self {
        self.step(Step::Accept(to_strings(keywords)))
    }

    /// As [`Rule::accept`], also capturing the token text under `name`.
    pub fn capture<K: AsRef<str>>(self, name: impl Into<String>, keywords: &[K]) -> Self
    where
        T: From<String>,
    {
        self.capture_with(name, keywords, |text| T::from(text.to_string()))
    }

    pub fn capture_with<K: AsRef<str>>(
        self,
        name: impl Into<String>,
        keywords: &[K],
        convert: impl Fn(&str) -> T + Send + Sync + 'static,
    ) -> Self {
        self.step(Step::Capture {
            name: name.into(),
            keywords: to_strings(keywords),
            convert: Arc::new(convert),
        })
    }

    /// Parse the node named `target`, discarding its attributes.
    pub fn node(self, target: impl Into<String>) -> Self {
        self.step(Step::Node {
            target: target.into(),
            capture: None,
        })
    }

    /// Parse the node named `target` into a tree and capture it under `name`.
    pub fn node_as(self, name: impl Into<String>, target: impl Into<String>) -> Self {
        self.step(Step::Node {
            target: target.into(),
            capture: Some(name.into()),
        })
    }

    /// Run `sub` if the next token is one of its start keywords.
    ///
    /// A `sub` without start keywords, one beginning with `process`,
    /// `consume` or `sub` for example, fails the build with
    /// [`GrammarError::NoStartKeywords`](crate::error::GrammarError::NoStartKeywords).
    /// The same holds for [`Rule::many`] and [`Rule::once_or_more`].
    pub fn maybe(self, sub: Rule<T>) -> Self {
        self.step(Step::Maybe(sub.body))
    }

    /// Run `sub` as long as the next token is one of its start keywords.
    pub fn many(self, sub: Rule<T>) -> Self {
        self.step(Step::Many(sub.body))
    }

    /// As [`Rule::many`], but `sub` must match at least once.
    pub fn once_or_more(self, sub: Rule<T>) -> Self {
        self.step(Step::OnceOrMore(sub.body))
    }

    /// Start a new alternative using the same converter as the previous one.
    pub fn or(mut self) -> Self {
        let converter = self
            .body
            .alternatives
            .last()
            .and_then(|alternative| alternative.converter.clone());
        self.push_alternative(converter);
        self
    }

    /// Start a new alternative with its own converter.
    pub fn or_converting(
        mut self,
        converter: impl Fn(AttributeMap<T>) -> T + Send + Sync + 'static,
    ) -> Self {
        self.push_alternative(Some(Arc::new(converter)));
        self
    }

    /// Run `sub` once if the next token is one of `keywords`.
    pub fn if_next<K: AsRef<str>>(self, keywords: &[K], sub: Rule<T>) -> Self {
        self.guarded(Guard::Keywords(to_strings(keywords)), sub, false)
    }

    /// Run `sub` once if `predicate` holds for the cursor.
    pub fn if_pred(
        self,
        predicate: impl Fn(&TokenCursor) -> bool + Send + Sync + 'static,
        sub: Rule<T>,
    ) -> Self {
        self.guarded(Guard::Predicate(Arc::new(predicate)), sub, false)
    }

    /// Run `sub` while the next token is one of `keywords`.
    pub fn while_next<K: AsRef<str>>(self, keywords: &[K], sub: Rule<T>) -> Self {
        self.guarded(Guard::Keywords(to_strings(keywords)), sub, true)
    }

    /// Run `sub` while `predicate` holds for the cursor.
    pub fn while_pred(
        self,
        predicate: impl Fn(&TokenCursor) -> bool + Send + Sync + 'static,
        sub: Rule<T>,
    ) -> Self {
        self.guarded(Guard::Predicate(Arc::new(predicate)), sub, true)
    }

    /// Consume any token and capture `process(text)` under `name`.
    pub fn process(
        self,
        name: impl Into<String>,
        process: impl Fn(&str) -> T + Send + Sync + 'static,
    ) -> Self {
        let process: ProcessFn<T> =
            Arc::new(move |text: &str| -> Result<T, String> { Ok(process(text)) });
        self.step(Step::Process {
            name: name.into(),
            process,
        })
    }

    /// As [`Rule::process`], where an `Err` message becomes a syntax error on the token.
    pub fn try_process(
        self,
        name: impl Into<String>,
        process: impl Fn(&str) -> Result<T, String> + Send + Sync + 'static,
    ) -> Self {
        self.step(Step::Process {
            name: name.into(),
            process: Arc::new(process),
        })
    }

    /// Consume any token and hand its text to `consume`.
    pub fn consume(self, consume: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.step(Step::Consume(Arc::new(consume)))
    }

    /// Embed a hand-written step.
    pub fn sub(
        self,
        step: impl Fn(&Grammar<T>, &mut TokenCursor, &mut AttributeMap<T>) -> Result<()>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        self.step(Step::Sub(Arc::new(step)))
    }

    /// Parse the node `operand` into a tree, then fold the operator chain
    /// that follows with `parser`, capturing the result under `name`.
    ///
    /// The grammar is the precedence context, so the operator table's operand
    /// parsers can call back into grammar nodes.
    pub fn operators<O>(
        self,
        name: impl Into<String>,
        operand: impl Into<String>,
        parser: Arc<PrecedenceParser<O>>,
    ) -> Self
    where
        O: Operators<Expr = T, Context = Grammar<T>> + Send + Sync + 'static,
    {
        let parse: OperatorsFn<T> = Arc::new(
            move |grammar: &Grammar<T>, cursor: &mut TokenCursor, lhs: T| {
                parser.parse_in(grammar, cursor, lhs)
            },
        );
        self.step(Step::Operators {
            name: name.into(),
            operand: operand.into(),
            parse,
        })
    }

    fn guarded(self, guard: Guard, sub: Rule<T>, repeat: bool) -> Self {
        self.step(Step::Guarded {
            guard,
            body: sub.body,
            repeat,
        })
    }

    fn step(mut self, step: Step<T, String>) -> Self {
        if let Some(alternative) = self.body.alternatives.last_mut() {
            alternative.steps.push(step);
        }
        self
    }

    fn push_alternative(&mut self, converter: Option<Converter<T>>) {
        self.body.alternatives.push(Alternative {
            steps: vec![],
            converter,
            start: StartSet::default(),
            nullable: false,
        });
    }
}

impl<T: 'static> Default for Rule<T> {
    fn default() -> Self {
        Self::new()
    }
}

fn to_strings<K: AsRef<str>>(keywords: &[K]) -> Vec<String> {
    keywords
        .iter()
        .map(|keyword| keyword.as_ref().to_string())
        .collect()
}
