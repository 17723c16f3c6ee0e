use crate::ast::Grammar;
use crate::error::{AstError, CombstructError, SyntaxError};
use crate::parser::Parser;
use crate::registry::{Handle, NodeRegistry};
use crate::render;
use serde::{Serialize, Serializer};
use std::path::Path;

/// The outcome of parsing a combstruct grammar.
///
/// Owns the registry holding every node of the tree, together with the root
/// [`Grammar`]. The grammar is either the list of bindings or the first
/// lexical/syntax error; in the latter case the full diagnostic is kept as
/// well, for callers that want a `miette` report.
#[derive(Debug)]
pub struct ParsedGrammar {
    registry: NodeRegistry,
    root: Handle<Grammar>,
    diagnostic: Option<SyntaxError>,
}

impl Serialize for ParsedGrammar {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let value = self.to_value().map_err(serde::ser::Error::custom)?;
        value.serialize(serializer)
    }
}

impl ParsedGrammar {
    #[must_use]
    pub fn root(&self) -> &Handle<Grammar> {
        &self.root
    }

    #[must_use]
    pub fn registry(&self) -> &NodeRegistry {
        &self.registry
    }

    /// # Errors
    /// Returns an [`AstError`] if the root is no longer registered.
    pub fn grammar(&self) -> Result<&Grammar, AstError> {
        self.registry.get(&self.root)
    }

    /// Whether parsing stopped on a lexical or syntax error.
    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self.grammar(), Ok(Grammar::Error(_)))
    }

    #[must_use]
    pub fn diagnostic(&self) -> Option<&SyntaxError> {
        self.diagnostic.as_ref()
    }

    /// Renders the grammar in its human-readable form.
    ///
    /// # Errors
    /// Returns an [`AstError`] if the tree refers to a node that is gone.
    pub fn to_text(&self) -> Result<String, AstError> {
        render::to_text(&self.registry, &self.root)
    }

    /// Renders the grammar as JSON.
    ///
    /// # Errors
    /// Returns an [`AstError`] if the tree refers to a node that is gone.
    pub fn to_json(&self) -> Result<String, AstError> {
        render::to_json(&self.registry, &self.root)
    }

    /// The JSON rendering, decoded into a generic `serde_json::Value`.
    ///
    /// # Errors
    /// Returns a `CombstructError` if rendering or decoding fails.
    pub fn to_value(&self) -> Result<serde_json::Value, CombstructError> {
        let json = self.to_json()?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Turns an error grammar into an `Err` carrying its diagnostic.
    ///
    /// # Errors
    /// Returns [`CombstructError::Syntax`] if parsing failed.
    pub fn into_result(self) -> Result<Self, CombstructError> {
        match self.diagnostic {
            Some(diagnostic) => Err(diagnostic.into()),
            None => Ok(self),
        }
    }

    #[must_use]
    pub fn into_parts(self) -> (NodeRegistry, Handle<Grammar>) {
        (self.registry, self.root)
    }
}

/// Parses a combstruct grammar source.
///
/// This never fails: lexical and syntax errors are part of the returned
/// grammar. `file_name` is only used for diagnostics.
pub fn parse(source: &str, file_name: &str) -> ParsedGrammar {
    let mut registry = NodeRegistry::new();
    let mut parser = Parser::new_with_name(source, file_name.to_string());
    let root = parser.parse_grammar(&mut registry);
    ParsedGrammar {
        registry,
        root,
        diagnostic: parser.take_failure(),
    }
}

/// Reads and parses a grammar file.
///
/// # Errors
/// Returns [`CombstructError::Io`] if the file cannot be read.
pub fn read_grammar(path: impl AsRef<Path>) -> Result<ParsedGrammar, CombstructError> {
    let path = path.as_ref();
    let source = std::fs::read_to_string(path).map_err(|source| CombstructError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(parse(&source, &path.to_string_lossy()))
}
