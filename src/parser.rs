use crate::ast::{
    Expression, ExpressionList, Grammar, NAryOp, Restriction, RestrictedOp, Statement,
    StatementList, Unit,
};
use crate::error::{AstError, SyntaxError};
use crate::lexer::{Lexer, Token, TokenType};
use crate::registry::{Handle, NodeRegistry};
use crate::utils::get_line_and_column;
use log::debug;
use miette::{NamedSource, SourceSpan};
use std::sync::Arc;

/// How many constructors may be nested inside one another. Parsing, rendering
/// and recursive teardown all recurse once per level.
pub const MAX_NESTING_DEPTH: usize = 256;

/// A recursive descent parser for combstruct grammars.
///
/// Nodes are registered as soon as they are built, bottom-up. When parsing
/// fails part-way, whatever was built so far is still in the registry, and
/// [`Parser::parse_grammar`] reclaims it with [`NodeRegistry::drain_all`].
#[derive(Debug)]
pub struct Parser<'a> {
    source: Arc<NamedSource<String>>,
    tokens: Vec<Token>,
    position: usize,
    source_text: &'a str,
    failure: Option<SyntaxError>,
    depth: usize,
}

impl<'a> Parser<'a> {
    pub fn new(source_text: &'a str) -> Self {
        Self::new_with_name(source_text, "grammar.mpl".to_string())
    }

    pub fn new_with_name(source_text: &'a str, name: String) -> Self {
        let source = Arc::new(NamedSource::new(name, source_text.to_string()));
        let mut lexer = Lexer::new(source_text);
        let tokens: Vec<Token> = lexer
            .lex()
            .into_iter()
            .filter(|t| !matches!(t.ttype, TokenType::Whitespace | TokenType::Comment(_)))
            .collect();

        Self {
            source,
            tokens,
            position: 0,
            source_text,
            failure: None,
            depth: 0,
        }
    }

    // === Main Parsing Methods ===

    /// Parses the whole source into a [`Grammar`].
    ///
    /// Never fails: a lexical or syntax error becomes an error grammar. In
    /// that case every node registered during the attempt is drained first,
    /// so `registry` should be dedicated to this parse. The detailed
    /// diagnostic is available from [`Parser::take_failure`].
    pub fn parse_grammar(&mut self, registry: &mut NodeRegistry) -> Handle<Grammar> {
        match self.parse_statements(registry) {
            Ok(statements) => {
                debug!("parsed {}", self.source.name());
                registry.new_statement_grammar(statements)
            }
            Err(err) => {
                let reclaimed = registry.drain_all();
                debug!(
                    "abandoned parse of {} ({err}); reclaimed {reclaimed} nodes",
                    self.source.name()
                );
                let line = i64::try_from(err.line()).unwrap_or(i64::MAX);
                let error = registry.new_error(err.origin(), line, err.to_string());
                self.failure = Some(err);
                registry.new_error_grammar(error)
            }
        }
    }

    /// The failure behind the last error grammar, if any.
    pub fn take_failure(&mut self) -> Option<SyntaxError> {
        self.failure.take()
    }

    ///    Grammar ::= "{" StatementList "}" | StatementList
    ///
    /// On failure the nodes built so far stay registered.
    pub fn parse_statements(
        &mut self,
        registry: &mut NodeRegistry,
    ) -> Result<Handle<StatementList>, SyntaxError> {
        let statements = if self.match_token(TokenType::LBrace) {
            let statements = self.parse_statement_list(registry, TokenType::RBrace)?;
            self.expect(TokenType::RBrace, "',' or '}'")?;
            statements
        } else {
            self.parse_statement_list(registry, TokenType::Eof)?
        };

        // After the statements, we expect the end of the file.
        self.expect(TokenType::Eof, "end of file")?;
        Ok(statements)
    }

    /// StatementList ::= Statement { "," Statement } [ "," ]
    fn parse_statement_list(
        &mut self,
        registry: &mut NodeRegistry,
        terminator: TokenType,
    ) -> Result<Handle<StatementList>, SyntaxError> {
        let first = self.parse_statement(registry)?;
        let statements = registry.new_statement_list(first);
        while self.match_token(TokenType::Comma) {
            // A comma followed by the terminator is a trailing comma
            if self.check(terminator.clone()) {
                break;
            }
            let statement = self.parse_statement(registry)?;
            registry
                .append_statement(&statements, statement)
                .map_err(|err| self.err_inconsistent(err))?;
        }
        Ok(statements)
    }

    /// Statement ::= Identifier "=" Expression
    fn parse_statement(
        &mut self,
        registry: &mut NodeRegistry,
    ) -> Result<Handle<Statement>, SyntaxError> {
        let name = self.parse_identifier("an identifier")?;
        self.expect(TokenType::Equals, "'='")?;
        let variable = registry.new_id(name);
        let expression = self.parse_expression(registry)?;
        Ok(registry.new_statement(variable, expression))
    }

    /// Expression ::= Unit | Identifier | NAryOp "(" ExpressionList ")"
    ///              | RestrictedOp "(" Expression [ "," Restriction ] ")"
    ///
    /// Fails once constructors nest deeper than [`MAX_NESTING_DEPTH`].
    fn parse_expression(
        &mut self,
        registry: &mut NodeRegistry,
    ) -> Result<Handle<Expression>, SyntaxError> {
        if self.depth >= MAX_NESTING_DEPTH {
            let (span, line) = self.span_here();
            return Err(SyntaxError::NestingTooDeep {
                src: (*self.source).clone(),
                span,
                limit: MAX_NESTING_DEPTH,
                line,
            });
        }
        self.depth += 1;
        let expression = self.parse_nested_expression(registry);
        self.depth -= 1;
        expression
    }

    fn parse_nested_expression(
        &mut self,
        registry: &mut NodeRegistry,
    ) -> Result<Handle<Expression>, SyntaxError> {
        let token = self.current_token()?.clone();

        if let Some(unit) = unit_of(&token.ttype) {
            self.advance();
            let unit = registry.new_unit(unit);
            return Ok(registry.new_literal(unit));
        }
        if let Some(op) = nary_op_of(&token.ttype) {
            self.advance();
            return self.parse_nary(registry, op);
        }
        if let Some(op) = restricted_op_of(&token.ttype) {
            self.advance();
            return self.parse_restricted(registry, op);
        }

        match token.ttype {
            TokenType::Identifier(name) => {
                self.advance();
                let id = registry.new_id(name);
                Ok(registry.new_reference(id))
            }
            _ => self.err_unexpected("an expression"),
        }
    }

    fn parse_nary(
        &mut self,
        registry: &mut NodeRegistry,
        op: NAryOp,
    ) -> Result<Handle<Expression>, SyntaxError> {
        self.expect(TokenType::LParen, "'('")?;
        let operands = self.parse_expression_list(registry)?;
        self.expect(TokenType::RParen, "',' or ')'")?;
        Ok(registry.new_nary(op, operands))
    }

    fn parse_restricted(
        &mut self,
        registry: &mut NodeRegistry,
        op: RestrictedOp,
    ) -> Result<Handle<Expression>, SyntaxError> {
        self.expect(TokenType::LParen, "'('")?;
        let operand = self.parse_expression(registry)?;
        let restriction = if self.match_token(TokenType::Comma) {
            self.parse_restriction()?
        } else {
            Restriction::None
        };
        self.expect(TokenType::RParen, "')'")?;
        Ok(registry.new_restricted(op, operand, restriction))
    }

    /// ExpressionList ::= Expression { "," Expression }
    fn parse_expression_list(
        &mut self,
        registry: &mut NodeRegistry,
    ) -> Result<Handle<ExpressionList>, SyntaxError> {
        let first = self.parse_expression(registry)?;
        let operands = registry.new_expression_list(first);
        while self.match_token(TokenType::Comma) {
            let operand = self.parse_expression(registry)?;
            registry
                .append_expression(&operands, operand)
                .map_err(|err| self.err_inconsistent(err))?;
        }
        Ok(operands)
    }

    // === Grammar Sub-Rules ===

    /// Restriction ::= "card" ( "<=" | "=" | ">=" ) Integer
    fn parse_restriction(&mut self) -> Result<Restriction, SyntaxError> {
        self.expect(TokenType::Card, "'card'")?;
        let comparator = self.current_token()?.ttype.clone();
        let make: fn(i64) -> Restriction = match comparator {
            TokenType::LessEqual => Restriction::AtMost,
            TokenType::Equals => Restriction::Exactly,
            TokenType::GreaterEqual => Restriction::AtLeast,
            _ => return self.err_unexpected("'<=', '=' or '>='"),
        };
        self.advance();

        let limit = match self.current_token()?.ttype {
            TokenType::Integer(limit) => limit,
            _ => return self.err_unexpected("an integer"),
        };
        self.advance();
        Ok(make(limit))
    }

    fn parse_identifier(&mut self, expected: &str) -> Result<String, SyntaxError> {
        match &self.current_token()?.ttype {
            TokenType::Identifier(name) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            _ => self.err_unexpected(expected),
        }
    }

    // === Tokenizer Helper Methods ===

    /// The token at the cursor. Unrecognized input surfaces here, the first
    /// time the parser reaches it.
    fn current_token(&self) -> Result<&Token, SyntaxError> {
        let Some(token) = self.tokens.get(self.position) else {
            let pos = self.source_text.len();
            return Err(SyntaxError::UnexpectedEof {
                src: (*self.source).clone(),
                span: (pos, 0).into(),
                expected: "more input".to_string(),
                line: self.line_at(pos),
            });
        };
        if token.ttype == TokenType::Unknown {
            return Err(SyntaxError::UnrecognizedToken {
                src: (*self.source).clone(),
                span: (token.pos_start, token.pos_end - token.pos_start).into(),
                lexeme: self.lexeme(token).to_string(),
                line: self.line_at(token.pos_start),
            });
        }
        Ok(token)
    }

    fn advance(&mut self) {
        if self.position < self.tokens.len() {
            self.position += 1;
        }
    }

    fn expect(&mut self, expected: TokenType, description: &str) -> Result<(), SyntaxError> {
        if self.check(expected) {
            self.advance();
            Ok(())
        } else {
            self.err_unexpected(description)
        }
    }

    fn match_token(&mut self, ttype: TokenType) -> bool {
        if self.check(ttype) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn check(&self, ttype: TokenType) -> bool {
        if let Ok(token) = self.current_token() {
            std::mem::discriminant(&token.ttype) == std::mem::discriminant(&ttype)
        } else {
            false
        }
    }

    fn err_unexpected<T>(&self, expected: &str) -> Result<T, SyntaxError> {
        let token = self.current_token()?;
        let span = (token.pos_start, token.pos_end - token.pos_start).into();
        let line = self.line_at(token.pos_start);
        if token.ttype == TokenType::Eof {
            return Err(SyntaxError::UnexpectedEof {
                src: (*self.source).clone(),
                span,
                expected: expected.to_string(),
                line,
            });
        }
        Err(SyntaxError::UnexpectedToken {
            src: (*self.source).clone(),
            span,
            found: format!("'{}'", self.lexeme(token)),
            expected: expected.to_string(),
            line,
        })
    }

    fn err_inconsistent(&self, source: AstError) -> SyntaxError {
        let (span, line) = self.span_here();
        SyntaxError::InconsistentTree {
            src: (*self.source).clone(),
            span,
            source,
            line,
        }
    }

    /// Span and line of the token at the cursor, or of the end of input.
    fn span_here(&self) -> (SourceSpan, usize) {
        let (start, end) = self
            .tokens
            .get(self.position)
            .map_or((self.source_text.len(), self.source_text.len()), |token| {
                (token.pos_start, token.pos_end)
            });
        ((start, end - start).into(), self.line_at(start))
    }

    fn lexeme(&self, token: &Token) -> &str {
        self.source_text
            .get(token.pos_start..token.pos_end)
            .unwrap_or_default()
    }

    fn line_at(&self, position: usize) -> usize {
        get_line_and_column(self.source_text, position).0
    }
}

fn unit_of(ttype: &TokenType) -> Option<Unit> {
    match ttype {
        TokenType::Atom => Some(Unit::Atom),
        TokenType::Epsilon => Some(Unit::Epsilon),
        TokenType::Z => Some(Unit::Z),
        _ => None,
    }
}

fn nary_op_of(ttype: &TokenType) -> Option<NAryOp> {
    match ttype {
        TokenType::Union => Some(NAryOp::Union),
        TokenType::Prod => Some(NAryOp::Prod),
        TokenType::Subst => Some(NAryOp::Subst),
        _ => None,
    }
}

fn restricted_op_of(ttype: &TokenType) -> Option<RestrictedOp> {
    match ttype {
        TokenType::Set => Some(RestrictedOp::Set),
        TokenType::PowerSet => Some(RestrictedOp::PowerSet),
        TokenType::Sequence => Some(RestrictedOp::Sequence),
        TokenType::Cycle => Some(RestrictedOp::Cycle),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{ErrorOrigin, Grammar};
    use crate::render::to_text;
    use miette::Report;

    fn parse_ok(source: &str) -> (NodeRegistry, Handle<StatementList>) {
        let mut registry = NodeRegistry::new();
        let mut parser = Parser::new_with_name(source, "test.mpl".to_string());
        match parser.parse_statements(&mut registry) {
            Ok(statements) => (registry, statements),
            Err(err) => {
                let report = Report::from(err);
                panic!("{:?}", report);
            }
        }
    }

    fn parse_err(source: &str) -> SyntaxError {
        let mut registry = NodeRegistry::new();
        let mut parser = Parser::new(source);
        match parser.parse_statements(&mut registry) {
            Ok(_) => panic!("expected {source:?} to be rejected"),
            Err(err) => err,
        }
    }

    #[test]
    fn test_single_statement() {
        let (registry, statements) = parse_ok("A = Atom");
        let list = registry.get(&statements).unwrap();
        assert_eq!(list.len(), 1);
        let statement = registry.get(&list.items()[0]).unwrap();
        assert_eq!(registry.get(&statement.variable).unwrap().name(), "A");
        assert!(matches!(
            registry.get(&statement.expression).unwrap(),
            Expression::Literal(_)
        ));
    }

    #[test]
    fn test_braced_statements_with_trailing_comma() {
        let (registry, statements) = parse_ok("{ A = Z, B = Epsilon, }");
        assert_eq!(registry.get(&statements).unwrap().len(), 2);
        assert_eq!(to_text(&registry, &statements).unwrap(), "A = Z, B = Epsilon");
    }

    #[test]
    fn test_nested_constructors() {
        let source = "T = Union(Z, Prod(T, T), Subst(Atom, Set(T)))";
        let (registry, statements) = parse_ok(source);
        assert_eq!(to_text(&registry, &statements).unwrap(), source);
    }

    #[test]
    fn test_restrictions() {
        let (registry, statements) =
            parse_ok("{ A = Set(Z, card <= 2), B = PowerSet(Z, card = 0), C = Cycle(Z, card >= -1) }");
        assert_eq!(
            to_text(&registry, &statements).unwrap(),
            "A = Set(Z, card <= 2), B = PowerSet(Z, card = 0), C = Cycle(Z, card >= -1)"
        );
    }

    #[test]
    fn test_every_registered_node_is_reachable() {
        let (mut registry, statements) = parse_ok("{ L = Sequence(Union(Atom, L), card >= 1) }");
        let registered = registry.len();
        assert_eq!(registry.free_recursive(statements), registered);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_unknown_character_is_a_lex_error() {
        let err = parse_err("A = Atom;");
        assert_eq!(err.origin(), ErrorOrigin::LexError);
        assert_eq!(err.to_string(), "unrecognized token ';'");
    }

    #[test]
    fn test_missing_operand_is_a_parse_error() {
        let err = parse_err("{\n  A = Prod(Atom, )\n}");
        assert_eq!(err.origin(), ErrorOrigin::ParseError);
        assert_eq!(err.line(), 2);
        assert_eq!(
            err.to_string(),
            "syntax error, unexpected ')', expecting an expression"
        );
    }

    #[test]
    fn test_unexpected_eof() {
        let err = parse_err("A = Union(Atom");
        assert!(matches!(err, SyntaxError::UnexpectedEof { .. }));
        assert_eq!(
            err.to_string(),
            "syntax error, unexpected end of file, expecting ',' or ')'"
        );
    }

    #[test]
    fn test_nesting_depth_is_per_expression() {
        let deep = format!("{}Z{}", "Cycle(".repeat(200), ")".repeat(200));
        let source = (0..5)
            .map(|i| format!("S{i} = Prod({deep}, {deep})"))
            .collect::<Vec<_>>()
            .join(", ");
        let (registry, statements) = parse_ok(&source);
        assert_eq!(registry.get(&statements).unwrap().len(), 5);
    }

    #[test]
    fn test_nesting_limit_is_a_parse_error() {
        let source = format!("A = {}Z{}", "Set(".repeat(300), ")".repeat(300));
        let err = parse_err(&source);
        assert!(matches!(
            err,
            SyntaxError::NestingTooDeep {
                limit: MAX_NESTING_DEPTH,
                ..
            }
        ));
        assert_eq!(err.origin(), ErrorOrigin::ParseError);
    }

    #[test]
    fn test_lists_are_registered_before_later_items() {
        let (registry, statements) = parse_ok("{ A = Union(Z, Atom), B = Epsilon }");
        let list = registry.get(&statements).unwrap();
        let [first, second] = list.items() else {
            panic!("expected two statements");
        };
        assert!(first.id() < statements.id());
        assert!(statements.id() < second.id());

        let statement = registry.get(first).unwrap();
        let Expression::NAry { operands, .. } = registry.get(&statement.expression).unwrap() else {
            panic!("expected a union");
        };
        let [z, atom] = registry.get(operands).unwrap().items() else {
            panic!("expected two operands");
        };
        assert!(z.id() < operands.id());
        assert!(operands.id() < atom.id());
    }

    #[test]
    fn test_failed_parse_drains_partial_tree() {
        let mut registry = NodeRegistry::new();
        let mut parser = Parser::new("{ A = Atom, B = Prod(Z, Set(Atom, card <= x)) }");
        let root = parser.parse_grammar(&mut registry);

        // Only the error node and the grammar survive.
        assert_eq!(registry.len(), 2);
        let error = match registry.get(&root).unwrap() {
            Grammar::Error(error) => registry.get(error).unwrap(),
            Grammar::Statements(_) => panic!("expected an error grammar"),
        };
        assert_eq!(error.origin(), ErrorOrigin::ParseError);
        assert_eq!(error.line(), 1);
        assert_eq!(
            error.message(),
            "syntax error, unexpected 'x', expecting an integer"
        );
        assert!(parser.take_failure().is_some());
        assert!(parser.take_failure().is_none());
    }
}
