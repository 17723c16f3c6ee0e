//! Abstract syntax tree for combstruct grammars.
//!
//! Nodes refer to their children through [`Handle`]s into a [`NodeRegistry`].
//! Construction goes through the registry so that every node is tracked from
//! the moment it exists; teardown goes through it as well, either one node at
//! a time ([`NodeRegistry::free_node`]) or a whole subtree
//! ([`NodeRegistry::free_recursive`]).

use crate::error::AstError;
use crate::registry::{AstNode, Handle, NodeRegistry};
use log::warn;
use serde::Serialize;
use std::fmt;

/// A terminal with no substructure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Unit {
    Atom,
    Epsilon,
    Z,
}

impl Unit {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Unit::Atom => "Atom",
            Unit::Epsilon => "Epsilon",
            Unit::Z => "Z",
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A reference to a grammar definition by name. Never resolved here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Id {
    name: String,
}

impl Id {
    /// The name must not be empty; the parser only ever hands over
    /// identifier tokens.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        debug_assert!(!name.is_empty(), "identifier names are never empty");
        Self { name }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Constructors taking a list of operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum NAryOp {
    Union,
    Prod,
    Subst,
}

impl NAryOp {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            NAryOp::Union => "Union",
            NAryOp::Prod => "Prod",
            NAryOp::Subst => "Subst",
        }
    }
}

impl fmt::Display for NAryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Constructors taking a single operand and an optional cardinality restriction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RestrictedOp {
    Set,
    PowerSet,
    Sequence,
    Cycle,
}

impl RestrictedOp {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            RestrictedOp::Set => "Set",
            RestrictedOp::PowerSet => "PowerSet",
            RestrictedOp::Sequence => "Sequence",
            RestrictedOp::Cycle => "Cycle",
        }
    }
}

impl fmt::Display for RestrictedOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Cardinality restriction of a [`RestrictedOp`]. The limit only exists when
/// there is a restriction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Restriction {
    None,
    AtMost(i64),
    Exactly(i64),
    AtLeast(i64),
}

impl Restriction {
    #[must_use]
    pub fn limit(self) -> Option<i64> {
        match self {
            Restriction::None => None,
            Restriction::AtMost(limit) | Restriction::Exactly(limit) | Restriction::AtLeast(limit) => {
                Some(limit)
            }
        }
    }

    #[must_use]
    pub fn comparator(self) -> Option<&'static str> {
        match self {
            Restriction::None => None,
            Restriction::AtMost(_) => Some("<="),
            Restriction::Exactly(_) => Some("="),
            Restriction::AtLeast(_) => Some(">="),
        }
    }
}

/// Writes `card <= 3` and friends; nothing at all for [`Restriction::None`].
impl fmt::Display for Restriction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.comparator(), self.limit()) {
            (Some(comparator), Some(limit)) => write!(f, "card {comparator} {limit}"),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, PartialEq)]
pub enum Expression {
    Literal(Handle<Unit>),
    Reference(Handle<Id>),
    NAry {
        op: NAryOp,
        operands: Handle<ExpressionList>,
    },
    Restricted {
        op: RestrictedOp,
        operand: Handle<Expression>,
        restriction: Restriction,
    },
}

/// Operands of an n-ary constructor. Never empty.
#[derive(Debug, PartialEq)]
pub struct ExpressionList {
    items: Vec<Handle<Expression>>,
}

impl ExpressionList {
    #[must_use]
    pub fn new(first: Handle<Expression>) -> Self {
        Self { items: vec![first] }
    }

    pub fn append(&mut self, expression: Handle<Expression>) {
        self.items.push(expression);
    }

    #[must_use]
    pub fn items(&self) -> &[Handle<Expression>] {
        &self.items
    }

    // Lists are never empty, so there is no `is_empty`.
    #[allow(clippy::len_without_is_empty)]
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }
}

/// A binding `name = expression`.
#[derive(Debug, PartialEq)]
pub struct Statement {
    pub variable: Handle<Id>,
    pub expression: Handle<Expression>,
}

/// The bindings of a grammar, in source order. Never empty.
#[derive(Debug, PartialEq)]
pub struct StatementList {
    items: Vec<Handle<Statement>>,
}

impl StatementList {
    #[must_use]
    pub fn new(first: Handle<Statement>) -> Self {
        Self { items: vec![first] }
    }

    pub fn append(&mut self, statement: Handle<Statement>) {
        self.items.push(statement);
    }

    #[must_use]
    pub fn items(&self) -> &[Handle<Statement>] {
        &self.items
    }

    #[allow(clippy::len_without_is_empty)]
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }
}

/// Which stage rejected the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorOrigin {
    #[serde(rename = "lexer")]
    LexError,
    #[serde(rename = "parser")]
    ParseError,
}

impl ErrorOrigin {
    /// Tag used in the JSON form: `lexer` or `parser`.
    #[must_use]
    pub fn source(self) -> &'static str {
        match self {
            ErrorOrigin::LexError => "lexer",
            ErrorOrigin::ParseError => "parser",
        }
    }

    /// Tag used in the text form: `Lexer` or `Parser`.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            ErrorOrigin::LexError => "Lexer",
            ErrorOrigin::ParseError => "Parser",
        }
    }
}

/// A parse failure, recorded as data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    origin: ErrorOrigin,
    line: i64,
    message: String,
}

impl Error {
    pub fn new(origin: ErrorOrigin, line: i64, message: impl Into<String>) -> Self {
        Self {
            origin,
            line,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn origin(&self) -> ErrorOrigin {
        self.origin
    }

    /// 1-based source line.
    #[must_use]
    pub fn line(&self) -> i64 {
        self.line
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Result of parsing: either the first failure or the list of bindings.
#[derive(Debug, PartialEq)]
pub enum Grammar {
    Error(Handle<Error>),
    Statements(Handle<StatementList>),
}

// === Construction ===

impl NodeRegistry {
    pub fn new_unit(&mut self, unit: Unit) -> Handle<Unit> {
        self.register(unit)
    }

    pub fn new_id(&mut self, name: impl Into<String>) -> Handle<Id> {
        self.register(Id::new(name))
    }

    pub fn new_literal(&mut self, unit: Handle<Unit>) -> Handle<Expression> {
        self.register(Expression::Literal(unit))
    }

    pub fn new_reference(&mut self, id: Handle<Id>) -> Handle<Expression> {
        self.register(Expression::Reference(id))
    }

    pub fn new_nary(&mut self, op: NAryOp, operands: Handle<ExpressionList>) -> Handle<Expression> {
        self.register(Expression::NAry { op, operands })
    }

    pub fn new_restricted(
        &mut self,
        op: RestrictedOp,
        operand: Handle<Expression>,
        restriction: Restriction,
    ) -> Handle<Expression> {
        self.register(Expression::Restricted {
            op,
            operand,
            restriction,
        })
    }

    pub fn new_expression_list(&mut self, first: Handle<Expression>) -> Handle<ExpressionList> {
        self.register(ExpressionList::new(first))
    }

    pub fn new_statement(
        &mut self,
        variable: Handle<Id>,
        expression: Handle<Expression>,
    ) -> Handle<Statement> {
        self.register(Statement {
            variable,
            expression,
        })
    }

    pub fn new_statement_list(&mut self, first: Handle<Statement>) -> Handle<StatementList> {
        self.register(StatementList::new(first))
    }

    pub fn new_error(
        &mut self,
        origin: ErrorOrigin,
        line: i64,
        message: impl Into<String>,
    ) -> Handle<Error> {
        self.register(Error::new(origin, line, message))
    }

    pub fn new_error_grammar(&mut self, error: Handle<Error>) -> Handle<Grammar> {
        self.register(Grammar::Error(error))
    }

    pub fn new_statement_grammar(&mut self, statements: Handle<StatementList>) -> Handle<Grammar> {
        self.register(Grammar::Statements(statements))
    }

    /// Appends to a registered expression list.
    ///
    /// # Errors
    /// Fails if `list` is no longer registered. The expression stays
    /// registered either way.
    pub fn append_expression(
        &mut self,
        list: &Handle<ExpressionList>,
        expression: Handle<Expression>,
    ) -> Result<(), AstError> {
        self.get_mut(list)?.append(expression);
        Ok(())
    }

    /// Appends to a registered statement list.
    ///
    /// # Errors
    /// Fails if `list` is no longer registered.
    pub fn append_statement(
        &mut self,
        list: &Handle<StatementList>,
        statement: Handle<Statement>,
    ) -> Result<(), AstError> {
        self.get_mut(list)?.append(statement);
        Ok(())
    }

    // === Teardown ===

    /// Shallow teardown: removes only this node and returns its value, whose
    /// child handles are now detached and may be wired elsewhere.
    pub fn free_node<T: AstNode>(&mut self, handle: Handle<T>) -> Option<T> {
        match self.take(handle) {
            Ok(node) => Some(node),
            Err(err) => {
                warn!("shallow teardown skipped: {err}");
                None
            }
        }
    }

    /// Recursive teardown: removes the node, then every node it owns,
    /// depth-first in stored order. Returns how many records were removed.
    pub fn free_recursive<T: Subtree>(&mut self, handle: Handle<T>) -> usize {
        match self.take(handle) {
            Ok(node) => 1 + node.release_children(self),
            Err(err) => {
                warn!("recursive teardown skipped: {err}");
                0
            }
        }
    }
}

/// Nodes that own children which must be torn down along with them.
pub trait Subtree: AstNode {
    /// Frees every child of an already deregistered node; returns the count.
    fn release_children(self, registry: &mut NodeRegistry) -> usize;
}

impl Subtree for Unit {
    fn release_children(self, _: &mut NodeRegistry) -> usize {
        0
    }
}

impl Subtree for Id {
    fn release_children(self, _: &mut NodeRegistry) -> usize {
        0
    }
}

impl Subtree for Error {
    fn release_children(self, _: &mut NodeRegistry) -> usize {
        0
    }
}

impl Subtree for Expression {
    fn release_children(self, registry: &mut NodeRegistry) -> usize {
        match self {
            Expression::Literal(unit) => registry.free_recursive(unit),
            Expression::Reference(id) => registry.free_recursive(id),
            Expression::NAry { operands, .. } => registry.free_recursive(operands),
            Expression::Restricted { operand, .. } => registry.free_recursive(operand),
        }
    }
}

impl Subtree for ExpressionList {
    fn release_children(self, registry: &mut NodeRegistry) -> usize {
        self.items
            .into_iter()
            .map(|expression| registry.free_recursive(expression))
            .sum()
    }
}

impl Subtree for Statement {
    fn release_children(self, registry: &mut NodeRegistry) -> usize {
        registry.free_recursive(self.variable) + registry.free_recursive(self.expression)
    }
}

impl Subtree for StatementList {
    fn release_children(self, registry: &mut NodeRegistry) -> usize {
        self.items
            .into_iter()
            .map(|statement| registry.free_recursive(statement))
            .sum()
    }
}

impl Subtree for Grammar {
    fn release_children(self, registry: &mut NodeRegistry) -> usize {
        match self {
            Grammar::Error(error) => registry.free_recursive(error),
            Grammar::Statements(statements) => registry.free_recursive(statements),
        }
    }
}
