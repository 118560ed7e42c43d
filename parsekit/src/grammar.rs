//! Grammars assembled from combinators.
//!
//! Each named node of a grammar is a [`Rule`]. Building the grammar resolves
//! node names, then computes for every node, alternative and nested rule the
//! set of token texts it may start with. Parsing never backtracks: every
//! choice between alternatives and every repetition is decided by testing the
//! next token's text against one of these sets.

use std::fmt::Debug;

use fnv::{FnvBuildHasher, FnvHashMap};
use indexmap::{IndexMap, IndexSet};

use crate::{
    cursor::TokenCursor,
    error::{GrammarError, Result},
};

pub use self::{
    attributes::AttributeMap,
    rule::{Converter, Rule, StepFn},
};

use self::rule::Body;

mod attributes;
mod compile;
mod engine;
mod rule;

pub type FnvIndexMap<K, V> = IndexMap<K, V, FnvBuildHasher>;
pub type FnvIndexSet<T> = IndexSet<T, FnvBuildHasher>;

/// Handle of a named node within one grammar.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct NodeId(u32);

impl NodeId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// The token texts that may begin a node or an alternative.
///
/// An open set may also begin with a token that cannot be known statically:
/// it starts with an arbitrary-token step such as [`Rule::process`], or it can
/// match without consuming anything.
#[derive(Clone, Default, PartialEq, Eq, Debug)]
pub struct StartSet {
    keywords: FnvIndexSet<String>,
    open: bool,
}

impl StartSet {
    pub fn keywords(&self) -> impl ExactSizeIterator<Item = &str> {
        self.keywords.iter().map(String::as_str)
    }

    pub fn contains(&self, text: &str) -> bool {
        self.keywords.contains(text)
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    fn extend(&mut self, other: &StartSet) {
        self.keywords.extend(other.keywords.iter().cloned());
        self.open |= other.open;
    }
}

/// Collects named nodes. Nodes may refer to nodes registered later.
pub struct GrammarBuilder<T> {
    names: FnvHashMap<String, NodeId>,
    nodes: Vec<(String, Rule<T>)>,
}

impl<T: 'static> GrammarBuilder<T> {
    pub fn new() -> Self {
        Self {
            names: FnvHashMap::default(),
            nodes: vec![],
        }
    }

    pub fn node(&mut self, name: impl Into<String>, rule: Rule<T>) -> Result<NodeId, GrammarError> {
        let name = name.into();
        if self.names.contains_key(&name) {
            return Err(GrammarError::DuplicateNode(name));
        }

        let id = NodeId(self.nodes.len() as u32);
        self.names.insert(name.clone(), id);
        self.nodes.push((name, rule));
        Ok(id)
    }

    /// Resolves node references and computes start sets.
    ///
    /// Fails if a rule refers to a node that was never registered, or if a
    /// node whose tree is captured lacks a converter on some alternative.
    pub fn build(self) -> Result<Grammar<T>, GrammarError> {
        compile::compile(self.names, self.nodes)
    }
}

impl<T: 'static> Default for GrammarBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// A compiled grammar, immutable and shareable between parses.
pub struct Grammar<T> {
    names: FnvHashMap<String, NodeId>,
    nodes: Vec<CompiledNode<T>>,
}

struct CompiledNode<T> {
    name: String,
    body: Body<T, NodeId>,
}

impl<T> Grammar<T> {
    pub fn node(&self, name: &str) -> Result<Node<'_, T>, GrammarError> {
        let id = self
            .names
            .get(name)
            .copied()
            .ok_or_else(|| GrammarError::UndefinedNode(name.to_string()))?;
        Ok(Node { grammar: self, id })
    }

    pub fn node_by_id(&self, id: NodeId) -> Option<Node<'_, T>> {
        if id.index() < self.nodes.len() {
            Some(Node { grammar: self, id })
        } else {
            None
        }
    }

    pub fn node_names(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(|node| node.name.as_str())
    }

    /// Parses node `name` into its attribute map.
    pub fn parse(&self, name: &str, cursor: &mut TokenCursor) -> Result<AttributeMap<T>> {
        self.node(name)?.parse(cursor)
    }

    /// Parses node `name` and converts the result with the converter of the
    /// alternative that was taken.
    pub fn parse_tree(&self, name: &str, cursor: &mut TokenCursor) -> Result<T> {
        self.node(name)?.parse_tree(cursor)
    }

    fn compiled(&self, id: NodeId) -> &CompiledNode<T> {
        &self.nodes[id.index()]
    }
}

impl<T> Debug for Grammar<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(self.nodes.iter().map(|node| (&node.name, &node.body.start)))
            .finish()
    }
}

/// A named node of a [`Grammar`].
pub struct Node<'g, T> {
    grammar: &'g Grammar<T>,
    id: NodeId,
}

impl<'g, T> Node<'g, T> {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn name(&self) -> &'g str {
        &self.grammar.compiled(self.id).name
    }

    pub fn start_set(&self) -> &'g StartSet {
        &self.grammar.compiled(self.id).body.start
    }

    /// Whether the node can match without consuming a token.
    pub fn is_nullable(&self) -> bool {
        self.grammar.compiled(self.id).body.nullable
    }

    pub fn parse(&self, cursor: &mut TokenCursor) -> Result<AttributeMap<T>> {
        let mut attributes = AttributeMap::new();
        self.grammar.run_node(self.id, cursor, &mut attributes)?;
        Ok(attributes)
    }

    pub fn parse_tree(&self, cursor: &mut TokenCursor) -> Result<T> {
        self.grammar.parse_node_tree(self.id, cursor)
    }
}

impl<T> Clone for Node<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Node<'_, T> {}

impl<T> Debug for Node<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("name", &self.name())
            .field("start_set", self.start_set())
            .finish()
    }
}
