use tracing::trace;

use crate::{
    cursor::TokenCursor,
    error::{GrammarError, Result, SyntaxError},
    format_utils::Expected,
};

use super::{
    AttributeMap, Grammar, NodeId, StartSet,
    rule::{Alternative, Body, Guard, Step},
};

impl<T> Grammar<T> {
    /// Runs a node into `attributes`, returning the alternative that was taken.
    pub(super) fn run_node(
        &self,
        id: NodeId,
        cursor: &mut TokenCursor,
        attributes: &mut AttributeMap<T>,
    ) -> Result<&Alternative<T, NodeId>> {
        let node = self.compiled(id);
        trace!("enter `{}' at {:?}", node.name, cursor.peek_text());
        self.run_body(&node.body, cursor, attributes)
    }

    pub(super) fn parse_node_tree(&self, id: NodeId, cursor: &mut TokenCursor) -> Result<T> {
        let mut attributes = AttributeMap::new();
        let alternative = self.run_node(id, cursor, &mut attributes)?;
        match &alternative.converter {
            Some(converter) => Ok(converter(attributes)),
            None => Err(GrammarError::MissingConverter(self.compiled(id).name.clone()).into()),
        }
    }

    fn run_body<'b>(
        &self,
        body: &'b Body<T, NodeId>,
        cursor: &mut TokenCursor,
        attributes: &mut AttributeMap<T>,
    ) -> Result<&'b Alternative<T, NodeId>> {
        let alternative = select(body, cursor)?;
        for step in &alternative.steps {
            self.run_step(step, cursor, attributes)?;
        }
        Ok(alternative)
    }

    fn run_step(
        &self,
        step: &Step<T, NodeId>,
        cursor: &mut TokenCursor,
        attributes: &mut AttributeMap<T>,
    ) -> Result<()> {
        match step {
            Step::Accept(keywords) => {
                cursor.accept(keywords)?;
            }
            Step::Capture {
                name,
                keywords,
                convert,
            } => {
                let token = cursor.accept(keywords)?;
                attributes.push(name, convert(token.text()));
            }
            Step::Node {
                target,
                capture: None,
            } => {
                self.run_node(*target, cursor, &mut AttributeMap::new())?;
            }
            Step::Node {
                target,
                capture: Some(name),
            } => {
                let tree = self.parse_node_tree(*target, cursor)?;
                attributes.push(name, tree);
            }
            Step::Maybe(body) => {
                if starts_here(&body.start, cursor) {
                    self.run_body(body, cursor, attributes)?;
                }
            }
            Step::Many(body) => {
                self.repeat(body, cursor, attributes, |cursor| {
                    starts_here(&body.start, cursor)
                })?;
            }
            Step::OnceOrMore(body) => {
                if !starts_here(&body.start, cursor) {
                    return Err(expected(&body.start, cursor).into());
                }
                self.repeat(body, cursor, attributes, |cursor| {
                    starts_here(&body.start, cursor)
                })?;
            }
            Step::Guarded {
                guard,
                body,
                repeat: false,
            } => {
                if guard.holds(cursor) {
                    self.run_body(body, cursor, attributes)?;
                }
            }
            Step::Guarded {
                guard,
                body,
                repeat: true,
            } => {
                self.repeat(body, cursor, attributes, |cursor| guard.holds(cursor))?;
            }
            Step::Process { name, process } => {
                let token = cursor.next()?;
                match process(token.text()) {
                    Ok(value) => attributes.push(name, value),
                    Err(message) => return Err(SyntaxError::unexpected(token.clone(), message).into()),
                }
            }
            Step::Consume(consume) => {
                consume(cursor.next_text()?);
            }
            Step::Sub(step) => step(self, cursor, attributes)?,
            Step::Operators {
                name,
                operand,
                parse,
            } => {
                let lhs = self.parse_node_tree(*operand, cursor)?;
                let value = parse(self, cursor, lhs)?;
                attributes.push(name, value);
            }
        }

        Ok(())
    }

    /// Runs `body` while `condition` holds. An iteration that consumes
    /// nothing ends the repetition.
    fn repeat(
        &self,
        body: &Body<T, NodeId>,
        cursor: &mut TokenCursor,
        attributes: &mut AttributeMap<T>,
        condition: impl Fn(&TokenCursor) -> bool,
    ) -> Result<()> {
        while condition(cursor) {
            let position = cursor.position();
            self.run_body(body, cursor, attributes)?;
            if cursor.position() == position {
                break;
            }
        }
        Ok(())
    }
}

/// Picks the alternative to run by one token of lookahead: the first one
/// claiming the next token, else the first open one.
fn select<'b, T>(
    body: &'b Body<T, NodeId>,
    cursor: &TokenCursor,
) -> Result<&'b Alternative<T, NodeId>, SyntaxError> {
    if let [single] = body.alternatives.as_slice() {
        return Ok(single);
    }

    let claimed = cursor.peek_text().and_then(|text| {
        body.alternatives
            .iter()
            .position(|alternative| alternative.start.contains(text))
    });

    match claimed.or_else(|| {
        body.alternatives
            .iter()
            .position(|alternative| alternative.start.is_open())
    }) {
        Some(index) => {
            trace!("alternative {index} at {:?}", cursor.peek_text());
            Ok(&body.alternatives[index])
        }
        None => Err(expected(&body.start, cursor)),
    }
}

fn starts_here(start: &StartSet, cursor: &TokenCursor) -> bool {
    cursor.peek_text().is_some_and(|text| start.contains(text))
}

fn expected(start: &StartSet, cursor: &TokenCursor) -> SyntaxError {
    let keywords: Vec<&str> = start.keywords().collect();
    cursor.error_here(Expected(&keywords).to_string())
}

impl Guard {
    fn holds(&self, cursor: &TokenCursor) -> bool {
        match self {
            Self::Keywords(keywords) => cursor.is_next(keywords),
            Self::Predicate(predicate) => predicate(cursor),
        }
    }
}
