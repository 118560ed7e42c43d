use fnv::{FnvHashMap, FnvHashSet};
use tracing::debug;

use crate::error::GrammarError;

use super::{
    CompiledNode, Grammar, NodeId, StartSet,
    rule::{Alternative, Body, Rule, Step},
};

/// What a rule contributes to the start set of whatever contains it.
///
/// `start.open` only records arbitrary-token steps here. Nullability makes
/// the sets used for choosing alternatives open as well, but it must not leak
/// into a containing sequence, where the following steps decide.
#[derive(Clone, Default, PartialEq, Debug)]
struct Summary {
    start: StartSet,
    nullable: bool,
}

impl Summary {
    fn selection_set(&self) -> StartSet {
        StartSet {
            keywords: self.start.keywords.clone(),
            open: self.start.open || self.nullable,
        }
    }
}

pub(super) fn compile<T>(
    names: FnvHashMap<String, NodeId>,
    rules: Vec<(String, Rule<T>)>,
) -> Result<Grammar<T>, GrammarError> {
    let mut nodes = Vec::with_capacity(rules.len());
    for (name, rule) in rules {
        let body = rule.body.resolve(&mut |target: String| {
            names
                .get(&target)
                .copied()
                .ok_or(GrammarError::UndefinedNode(target))
        })?;
        nodes.push(CompiledNode { name, body });
    }

    check_converters(&nodes)?;

    let rounds = compute_start_sets(&mut nodes);
    check_entry_keywords(&nodes)?;
    debug!(
        "compiled grammar with {} nodes, start sets settled after {rounds} rounds",
        nodes.len()
    );

    Ok(Grammar { names, nodes })
}

/// Every node whose tree is captured, by `node_as` or as an operand, needs a
/// converter on each of its alternatives.
fn check_converters<T>(nodes: &[CompiledNode<T>]) -> Result<(), GrammarError> {
    let mut converted = FnvHashSet::default();
    for node in nodes {
        collect_converted(&node.body, &mut converted);
    }

    for (index, node) in nodes.iter().enumerate() {
        if !converted.contains(&NodeId(index as u32)) {
            continue;
        }
        if node
            .body
            .alternatives
            .iter()
            .any(|alternative| alternative.converter.is_none())
        {
            return Err(GrammarError::MissingConverter(node.name.clone()));
        }
    }

    Ok(())
}

fn collect_converted<T>(body: &Body<T, NodeId>, converted: &mut FnvHashSet<NodeId>) {
    for step in body.alternatives.iter().flat_map(|alt| &alt.steps) {
        match step {
            Step::Node {
                target,
                capture: Some(_),
            } => {
                converted.insert(*target);
            }
            Step::Operators { operand, .. } => {
                converted.insert(*operand);
            }
            Step::Maybe(body)
            | Step::Many(body)
            | Step::OnceOrMore(body)
            | Step::Guarded { body, .. } => collect_converted(body, converted),
            _ => {}
        }
    }
}

fn check_entry_keywords<T>(nodes: &[CompiledNode<T>]) -> Result<(), GrammarError> {
    for node in nodes {
        if !has_entry_keywords(&node.body) {
            return Err(GrammarError::NoStartKeywords(node.name.clone()));
        }
    }
    Ok(())
}

fn has_entry_keywords<T>(body: &Body<T, NodeId>) -> bool {
    body.alternatives
        .iter()
        .flat_map(|alt| &alt.steps)
        .all(|step| match step {
            Step::Maybe(body) | Step::Many(body) | Step::OnceOrMore(body) => {
                !body.start.keywords.is_empty() && has_entry_keywords(body)
            }
            Step::Guarded { body, .. } => has_entry_keywords(body),
            _ => true,
        })
}

/// Iterates to the least fixpoint of the start sets of all named nodes.
///
/// Sets only grow between rounds, so this terminates. Every round rewrites
/// the annotations of all nested rules, so after the last round, which
/// changed nothing, they agree with the final node sets. Returns the number
/// of rounds.
fn compute_start_sets<T>(nodes: &mut [CompiledNode<T>]) -> usize {
    let mut summaries = vec![Summary::default(); nodes.len()];
    let mut rounds = 0;

    loop {
        rounds += 1;
        let mut changed = false;

        for (index, node) in nodes.iter_mut().enumerate() {
            let summary = analyze_body(&mut node.body, &summaries);
            if summary != summaries[index] {
                summaries[index] = summary;
                changed = true;
            }
        }

        if !changed {
            return rounds;
        }
    }
}

fn analyze_body<T>(body: &mut Body<T, NodeId>, nodes: &[Summary]) -> Summary {
    let mut summary = Summary::default();
    for alternative in &mut body.alternatives {
        let alt_summary = analyze_alternative(alternative, nodes);
        summary.start.extend(&alt_summary.start);
        summary.nullable |= alt_summary.nullable;
    }

    body.start = summary.selection_set();
    body.nullable = summary.nullable;
    summary
}

fn analyze_alternative<T>(alternative: &mut Alternative<T, NodeId>, nodes: &[Summary]) -> Summary {
    let mut start = StartSet::default();
    let mut nullable = true;

    // nested rules past the start region still need their own annotations
    for step in &mut alternative.steps {
        let step_summary = analyze_step(step, nodes);
        if nullable {
            start.extend(&step_summary.start);
            nullable = step_summary.nullable;
        }
    }

    let summary = Summary { start, nullable };
    alternative.start = summary.selection_set();
    alternative.nullable = nullable;
    summary
}

fn analyze_step<T>(step: &mut Step<T, NodeId>, nodes: &[Summary]) -> Summary {
    match step {
        Step::Accept(keywords) | Step::Capture { keywords, .. } => Summary {
            start: StartSet {
                keywords: keywords.iter().cloned().collect(),
                open: false,
            },
            nullable: false,
        },
        Step::Node { target, .. } => nodes[target.index()].clone(),
        Step::Operators { operand, .. } => nodes[operand.index()].clone(),
        // entered only on one of the sub's keywords
        Step::Maybe(body) | Step::Many(body) => Summary {
            start: keywords_only(&analyze_body(body, nodes).start),
            nullable: true,
        },
        Step::OnceOrMore(body) => {
            let sub = analyze_body(body, nodes);
            Summary {
                start: keywords_only(&sub.start),
                nullable: sub.nullable,
            }
        }
        Step::Guarded { body, .. } => {
            analyze_body(body, nodes);
            Summary {
                start: StartSet::default(),
                nullable: true,
            }
        }
        Step::Process { .. } | Step::Consume(_) | Step::Sub(_) => Summary {
            start: StartSet {
                keywords: Default::default(),
                open: true,
            },
            nullable: false,
        },
    }
}

fn keywords_only(start: &StartSet) -> StartSet {
    StartSet {
        keywords: start.keywords.clone(),
        open: false,
    }
}
