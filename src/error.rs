use crate::ast::ErrorOrigin;
use crate::registry::{NodeId, NodeKind};
use miette::{Diagnostic, NamedSource, SourceSpan};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum CombstructError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Syntax(#[from] SyntaxError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Ast(#[from] AstError),

    #[error("Failed to read grammar file {path:?}")]
    #[diagnostic(
        code(io::read_failed),
        help("Check that the file exists and is readable.")
    )]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Rendered JSON could not be decoded")]
    #[diagnostic(code(render::invalid_json))]
    Json(#[from] serde_json::Error),
}

/// The first lexical or syntactic failure in a grammar source.
#[derive(Error, Debug, Diagnostic, Clone)]
pub enum SyntaxError {
    #[error("unrecognized token '{lexeme}'")]
    #[diagnostic(
        code(lexer::unrecognized_token),
        help("Only identifiers, integers, the constructor keywords, 'card', '<=', '=', '>=', braces, parentheses and commas are allowed.")
    )]
    UnrecognizedToken {
        #[source_code]
        src: NamedSource<String>,
        #[label("not part of the grammar language")]
        span: SourceSpan,
        lexeme: String,
        line: usize,
    },

    #[error("syntax error, unexpected {found}, expecting {expected}")]
    #[diagnostic(
        code(parser::unexpected_token),
        help("The parser found a token it did not expect in this position.")
    )]
    UnexpectedToken {
        #[source_code]
        src: NamedSource<String>,
        #[label("expected {expected} here")]
        span: SourceSpan,
        found: String,
        expected: String,
        line: usize,
    },

    #[error("syntax error, unexpected end of file, expecting {expected}")]
    #[diagnostic(
        code(parser::unexpected_eof),
        help("The grammar ended unexpectedly. The parser expected more tokens.")
    )]
    UnexpectedEof {
        #[source_code]
        src: NamedSource<String>,
        #[label("grammar ended here")]
        span: SourceSpan,
        expected: String,
        line: usize,
    },

    #[error("syntax error, constructors nested deeper than {limit} levels")]
    #[diagnostic(
        code(parser::nesting_too_deep),
        help("Split the expression into several statements that refer to each other by name.")
    )]
    NestingTooDeep {
        #[source_code]
        src: NamedSource<String>,
        #[label("nesting limit reached here")]
        span: SourceSpan,
        limit: usize,
        line: usize,
    },

    #[error("internal error while building the syntax tree: {source}")]
    #[diagnostic(code(parser::inconsistent_tree))]
    InconsistentTree {
        #[source_code]
        src: NamedSource<String>,
        #[label("while parsing this")]
        span: SourceSpan,
        #[source]
        source: AstError,
        line: usize,
    },
}

impl SyntaxError {
    #[must_use]
    pub fn origin(&self) -> ErrorOrigin {
        match self {
            SyntaxError::UnrecognizedToken { .. } => ErrorOrigin::LexError,
            SyntaxError::UnexpectedToken { .. }
            | SyntaxError::UnexpectedEof { .. }
            | SyntaxError::NestingTooDeep { .. }
            | SyntaxError::InconsistentTree { .. } => ErrorOrigin::ParseError,
        }
    }

    /// 1-based line of the offending token.
    #[must_use]
    pub fn line(&self) -> usize {
        match self {
            SyntaxError::UnrecognizedToken { line, .. }
            | SyntaxError::UnexpectedToken { line, .. }
            | SyntaxError::UnexpectedEof { line, .. }
            | SyntaxError::NestingTooDeep { line, .. }
            | SyntaxError::InconsistentTree { line, .. } => *line,
        }
    }
}

/// Internal inconsistency between a handle and the registry it points into.
#[derive(Error, Debug, Diagnostic, Clone, PartialEq, Eq)]
pub enum AstError {
    #[error("{kind} node {id} is no longer registered")]
    #[diagnostic(
        code(ast::dangling_handle),
        help("The node was torn down while a parent still referred to it.")
    )]
    DanglingHandle { id: NodeId, kind: NodeKind },

    #[error("node {id} is a {found} node, expected a {expected} node")]
    #[diagnostic(
        code(ast::kind_mismatch),
        help("The handle does not belong to this registry.")
    )]
    KindMismatch {
        id: NodeId,
        expected: NodeKind,
        found: NodeKind,
    },
}
