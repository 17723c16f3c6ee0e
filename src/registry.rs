//! Node registry for the abstract syntax tree.
//!
//! Every AST node lives in a [`NodeRegistry`] and is addressed through a typed
//! [`Handle`]. Identifiers are handed out in strictly increasing order and are
//! never reused, so a handle whose node has been torn down can only ever miss;
//! it can never alias a newer node.
//!
//! The registry owns the storage of every live node. [`NodeRegistry::drain_all`]
//! reclaims every record regardless of how the nodes were wired together.

use crate::ast::{Error, Expression, ExpressionList, Grammar, Id, Statement, StatementList, Unit};
use crate::error::AstError;
use log::{debug, trace, warn};
use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;

/// Identifier of a registered node. Issued from 1 upwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u64);

impl NodeId {
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The kind of a registered node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Unit,
    Id,
    Expression,
    ExpressionList,
    Statement,
    StatementList,
    Error,
    Grammar,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeKind::Unit => "unit",
            NodeKind::Id => "id",
            NodeKind::Expression => "expression",
            NodeKind::ExpressionList => "expression list",
            NodeKind::Statement => "statement",
            NodeKind::StatementList => "statement list",
            NodeKind::Error => "error",
            NodeKind::Grammar => "grammar",
        };
        f.write_str(name)
    }
}

/// A typed reference to a node stored in a [`NodeRegistry`].
///
/// Handles are neither `Clone` nor `Copy`. Passing one to a constructor moves
/// the edge into the new parent, so a node has at most one parent.
pub struct Handle<T> {
    id: NodeId,
    _node: PhantomData<fn() -> T>,
}

impl<T> Handle<T> {
    fn new(id: NodeId) -> Self {
        Self {
            id,
            _node: PhantomData,
        }
    }

    #[must_use]
    pub fn id(&self) -> NodeId {
        self.id
    }
}

impl<T: AstNode> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle<{}>({})", T::KIND, self.id)
    }
}

impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T> Eq for Handle<T> {}

/// A registry record: the storage of exactly one AST node.
#[derive(Debug, PartialEq)]
pub enum Node {
    Unit(Unit),
    Id(Id),
    Expression(Expression),
    ExpressionList(ExpressionList),
    Statement(Statement),
    StatementList(StatementList),
    Error(Error),
    Grammar(Grammar),
}

impl Node {
    #[must_use]
    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Unit(_) => NodeKind::Unit,
            Node::Id(_) => NodeKind::Id,
            Node::Expression(_) => NodeKind::Expression,
            Node::ExpressionList(_) => NodeKind::ExpressionList,
            Node::Statement(_) => NodeKind::Statement,
            Node::StatementList(_) => NodeKind::StatementList,
            Node::Error(_) => NodeKind::Error,
            Node::Grammar(_) => NodeKind::Grammar,
        }
    }
}

/// Conversion between a concrete node type and its registry record.
pub trait AstNode: Sized {
    const KIND: NodeKind;

    fn into_node(self) -> Node;

    /// Gives the record back unchanged when it holds another kind.
    fn from_node(node: Node) -> Result<Self, Node>;

    fn node_ref(node: &Node) -> Option<&Self>;

    fn node_mut(node: &mut Node) -> Option<&mut Self>;
}

macro_rules! impl_ast_node {
    ($($ty:ident),* $(,)?) => {
        $(
            impl AstNode for $ty {
                const KIND: NodeKind = NodeKind::$ty;

                fn into_node(self) -> Node {
                    Node::$ty(self)
                }

                fn from_node(node: Node) -> Result<Self, Node> {
                    match node {
                        Node::$ty(inner) => Ok(inner),
                        other => Err(other),
                    }
                }

                fn node_ref(node: &Node) -> Option<&Self> {
                    match node {
                        Node::$ty(inner) => Some(inner),
                        _ => None,
                    }
                }

                fn node_mut(node: &mut Node) -> Option<&mut Self> {
                    match node {
                        Node::$ty(inner) => Some(inner),
                        _ => None,
                    }
                }
            }
        )*
    };
}

impl_ast_node!(
    Unit,
    Id,
    Expression,
    ExpressionList,
    Statement,
    StatementList,
    Error,
    Grammar,
);

/// Arena of live AST nodes keyed by [`NodeId`].
///
/// A registry is not meant to be shared between concurrent parses; give each
/// parse its own instance.
#[derive(Debug, Default)]
pub struct NodeRegistry {
    records: BTreeMap<NodeId, Node>,
    last_id: u64,
}

impl NodeRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `node` under a fresh identifier and returns its handle.
    pub fn register<T: AstNode>(&mut self, node: T) -> Handle<T> {
        self.last_id += 1;
        let id = NodeId(self.last_id);
        trace!("registered {} {}", T::KIND, id);
        self.records.insert(id, node.into_node());
        Handle::new(id)
    }

    /// Removes the record for `id`, dropping its storage but not its children.
    ///
    /// Returns `false` when no such record exists.
    pub fn deregister(&mut self, id: NodeId) -> bool {
        match self.records.remove(&id) {
            Some(node) => {
                trace!("deregistered {} {}", node.kind(), id);
                true
            }
            None => {
                warn!("attempted to deregister unknown node {id}");
                false
            }
        }
    }

    /// Frees every live record, one node at a time, and returns how many
    /// were freed.
    pub fn drain_all(&mut self) -> usize {
        let mut freed = 0;
        while let Some((id, node)) = self.records.pop_first() {
            trace!("drained {} {}", node.kind(), id);
            freed += 1;
        }
        debug!("drained {freed} nodes from the registry");
        freed
    }

    /// Number of live records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub fn contains(&self, id: NodeId) -> bool {
        self.records.contains_key(&id)
    }

    #[must_use]
    pub fn kind_of(&self, id: NodeId) -> Option<NodeKind> {
        self.records.get(&id).map(Node::kind)
    }

    /// Live identifiers in ascending (creation) order.
    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.records.keys().copied()
    }

    /// Total number of identifiers ever issued by this registry.
    #[must_use]
    pub fn issued(&self) -> u64 {
        self.last_id
    }

    /// Resolves a handle to its node.
    ///
    /// # Errors
    /// Returns [`AstError::DanglingHandle`] if the node has been torn down and
    /// [`AstError::KindMismatch`] if the record holds a different node kind.
    pub fn get<T: AstNode>(&self, handle: &Handle<T>) -> Result<&T, AstError> {
        let node = self
            .records
            .get(&handle.id)
            .ok_or(AstError::DanglingHandle {
                id: handle.id,
                kind: T::KIND,
            })?;
        T::node_ref(node).ok_or(AstError::KindMismatch {
            id: handle.id,
            expected: T::KIND,
            found: node.kind(),
        })
    }

    /// Mutable counterpart of [`NodeRegistry::get`].
    ///
    /// # Errors
    /// Same conditions as [`NodeRegistry::get`].
    pub fn get_mut<T: AstNode>(&mut self, handle: &Handle<T>) -> Result<&mut T, AstError> {
        let node = self
            .records
            .get_mut(&handle.id)
            .ok_or(AstError::DanglingHandle {
                id: handle.id,
                kind: T::KIND,
            })?;
        let found = node.kind();
        T::node_mut(node).ok_or(AstError::KindMismatch {
            id: handle.id,
            expected: T::KIND,
            found,
        })
    }

    /// Removes a node from the registry and hands its value back.
    ///
    /// # Errors
    /// Same conditions as [`NodeRegistry::get`]; on a kind mismatch the
    /// record stays registered.
    pub(crate) fn take<T: AstNode>(&mut self, handle: Handle<T>) -> Result<T, AstError> {
        let id = handle.id;
        let node = self.records.remove(&id).ok_or(AstError::DanglingHandle {
            id,
            kind: T::KIND,
        })?;
        match T::from_node(node) {
            Ok(inner) => {
                trace!("deregistered {} {}", T::KIND, id);
                Ok(inner)
            }
            Err(node) => {
                let found = node.kind();
                self.records.insert(id, node);
                Err(AstError::KindMismatch {
                    id,
                    expected: T::KIND,
                    found,
                })
            }
        }
    }
}
