//! String and JSON renderings of the syntax tree.
//!
//! Both renderings share one traversal, [`Walker`]. The output format is a
//! [`Format`] implementation that only decides how each node case is written,
//! given the already-rendered children.

use crate::ast::{
    Error, Expression, ExpressionList, Grammar, Id, NAryOp, Restriction, RestrictedOp, Statement,
    StatementList, Unit,
};
use crate::error::AstError;
use crate::registry::{AstNode, Handle, NodeRegistry};

/// One method per node case. Children arrive already rendered, in order.
pub trait Format {
    fn unit(&self, unit: Unit) -> String;
    fn id(&self, name: &str) -> String;
    /// `name` is the output of [`Format::id`] for the referenced id.
    fn reference(&self, name: String) -> String;
    fn nary(&self, op: NAryOp, operands: String) -> String;
    fn restricted(&self, op: RestrictedOp, operand: String, restriction: Restriction) -> String;
    fn expression_list(&self, items: Vec<String>) -> String;
    fn statement(&self, name: String, expression: String) -> String;
    fn statement_list(&self, items: Vec<String>) -> String;
    fn error(&self, error: &Error) -> String;
}

/// Depth-first traversal of a registry-backed tree.
pub struct Walker<'r, F> {
    registry: &'r NodeRegistry,
    format: F,
}

impl<'r, F: Format> Walker<'r, F> {
    pub fn new(registry: &'r NodeRegistry, format: F) -> Self {
        Self { registry, format }
    }

    /// Renders the subtree rooted at `handle`.
    ///
    /// # Errors
    /// Returns an [`AstError`] if any node of the subtree is not registered.
    pub fn render<T: Render>(&self, handle: &Handle<T>) -> Result<String, AstError> {
        self.registry.get(handle)?.render(self)
    }

    fn render_all<T: Render>(&self, handles: &[Handle<T>]) -> Result<Vec<String>, AstError> {
        handles.iter().map(|handle| self.render(handle)).collect()
    }
}

/// Nodes that can be rendered by a [`Walker`].
pub trait Render: AstNode {
    fn render<F: Format>(&self, walker: &Walker<'_, F>) -> Result<String, AstError>;
}

impl Render for Unit {
    fn render<F: Format>(&self, walker: &Walker<'_, F>) -> Result<String, AstError> {
        Ok(walker.format.unit(*self))
    }
}

impl Render for Id {
    fn render<F: Format>(&self, walker: &Walker<'_, F>) -> Result<String, AstError> {
        Ok(walker.format.id(self.name()))
    }
}

impl Render for Expression {
    fn render<F: Format>(&self, walker: &Walker<'_, F>) -> Result<String, AstError> {
        match self {
            Expression::Literal(unit) => walker.render(unit),
            Expression::Reference(id) => {
                let name = walker.render(id)?;
                Ok(walker.format.reference(name))
            }
            Expression::NAry { op, operands } => {
                let operands = walker.render(operands)?;
                Ok(walker.format.nary(*op, operands))
            }
            Expression::Restricted {
                op,
                operand,
                restriction,
            } => {
                let operand = walker.render(operand)?;
                Ok(walker.format.restricted(*op, operand, *restriction))
            }
        }
    }
}

impl Render for ExpressionList {
    fn render<F: Format>(&self, walker: &Walker<'_, F>) -> Result<String, AstError> {
        let items = walker.render_all(self.items())?;
        Ok(walker.format.expression_list(items))
    }
}

impl Render for Statement {
    fn render<F: Format>(&self, walker: &Walker<'_, F>) -> Result<String, AstError> {
        let name = walker.render(&self.variable)?;
        let expression = walker.render(&self.expression)?;
        Ok(walker.format.statement(name, expression))
    }
}

impl Render for StatementList {
    fn render<F: Format>(&self, walker: &Walker<'_, F>) -> Result<String, AstError> {
        let items = walker.render_all(self.items())?;
        Ok(walker.format.statement_list(items))
    }
}

impl Render for Error {
    fn render<F: Format>(&self, walker: &Walker<'_, F>) -> Result<String, AstError> {
        Ok(walker.format.error(self))
    }
}

impl Render for Grammar {
    fn render<F: Format>(&self, walker: &Walker<'_, F>) -> Result<String, AstError> {
        match self {
            Grammar::Error(error) => walker.render(error),
            Grammar::Statements(statements) => walker.render(statements),
        }
    }
}

/// Human-readable form, e.g. `A = Union(Z, Prod(A, A))`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextFormat;

impl Format for TextFormat {
    fn unit(&self, unit: Unit) -> String {
        unit.name().to_string()
    }

    fn id(&self, name: &str) -> String {
        name.to_string()
    }

    fn reference(&self, name: String) -> String {
        name
    }

    fn nary(&self, op: NAryOp, operands: String) -> String {
        format!("{op}({operands})")
    }

    fn restricted(&self, op: RestrictedOp, operand: String, restriction: Restriction) -> String {
        match restriction {
            Restriction::None => format!("{op}({operand})"),
            _ => format!("{op}({operand}, {restriction})"),
        }
    }

    fn expression_list(&self, items: Vec<String>) -> String {
        items.join(", ")
    }

    fn statement(&self, name: String, expression: String) -> String {
        format!("{name} = {expression}")
    }

    fn statement_list(&self, items: Vec<String>) -> String {
        items.join(", ")
    }

    fn error(&self, error: &Error) -> String {
        format!(
            "{} Error (l. {}): {}",
            error.origin().label(),
            error.line(),
            error.message()
        )
    }
}

/// JSON form. Statement lists become objects keyed by the bound name, in
/// source order; a name bound twice appears twice.
///
/// Operand lists are written `[ a, b ]`; the single operand of a restricted
/// constructor is written `[a]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFormat;

fn quote(text: &str) -> String {
    serde_json::Value::from(text).to_string()
}

impl Format for JsonFormat {
    fn unit(&self, unit: Unit) -> String {
        match unit {
            // Z is the size marker, exported as a predefined id.
            Unit::Z => format!(r#"{{ "type": "id", "id": {} }}"#, quote(unit.name())),
            Unit::Atom | Unit::Epsilon => {
                format!(r#"{{ "type": "unit", "unit": {} }}"#, quote(unit.name()))
            }
        }
    }

    fn id(&self, name: &str) -> String {
        name.to_string()
    }

    fn reference(&self, name: String) -> String {
        format!(r#"{{ "type": "id", "id": {} }}"#, quote(&name))
    }

    fn nary(&self, op: NAryOp, operands: String) -> String {
        format!(
            r#"{{ "type": "op", "op": {}, "param": {operands} }}"#,
            quote(op.name())
        )
    }

    fn restricted(&self, op: RestrictedOp, operand: String, restriction: Restriction) -> String {
        let suffix = match restriction {
            Restriction::None => String::new(),
            _ => format!(r#", "restriction": {}"#, quote(&restriction.to_string())),
        };
        format!(
            r#"{{ "type": "op", "op": {}, "param": [{operand}]{suffix} }}"#,
            quote(op.name())
        )
    }

    fn expression_list(&self, items: Vec<String>) -> String {
        format!("[ {} ]", items.join(", "))
    }

    fn statement(&self, name: String, expression: String) -> String {
        format!("{}: {expression}", quote(&name))
    }

    fn statement_list(&self, items: Vec<String>) -> String {
        format!("{{ {} }}", items.join(", "))
    }

    fn error(&self, error: &Error) -> String {
        format!(
            r#"{{ "type": "error", "source": {}, "line": {}, "msg": {} }}"#,
            quote(error.origin().source()),
            error.line(),
            quote(error.message())
        )
    }
}

/// Renders any subtree in the text form.
///
/// # Errors
/// Returns an [`AstError`] if the subtree refers to a node that is gone.
pub fn to_text<T: Render>(registry: &NodeRegistry, handle: &Handle<T>) -> Result<String, AstError> {
    Walker::new(registry, TextFormat).render(handle)
}

/// Renders any subtree in the JSON form.
///
/// # Errors
/// Returns an [`AstError`] if the subtree refers to a node that is gone.
pub fn to_json<T: Render>(registry: &NodeRegistry, handle: &Handle<T>) -> Result<String, AstError> {
    Walker::new(registry, JsonFormat).render(handle)
}
