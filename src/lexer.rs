/// Represents the different kinds of tokens that the lexer can produce.
#[derive(Debug, PartialEq, Clone)]
pub enum TokenType {
    // == Special Tokens ==
    /// Represents the end of the input.
    Eof,
    /// Represents a sequence of one or more whitespace characters (spaces, tabs, newlines).
    Whitespace,
    /// Represents a comment, starting with `#` and continuing to the end of the line.
    Comment(String),
    /// Represents input that could not be recognized, including integers that
    /// do not fit in 64 bits.
    Unknown,

    // == Literals ==
    /// A name bound or referenced by a statement, e.g. `Tree`, `node_2`.
    Identifier(String),
    /// A cardinality limit, e.g. `3` or `-1`.
    Integer(i64),

    // == Units ==
    Atom,
    Epsilon,
    Z,

    // == Constructors ==
    Union,
    Prod,
    Subst,
    Set,
    PowerSet,
    Sequence,
    Cycle,
    /// The `card` keyword introducing a cardinality restriction.
    Card,

    // == Punctuation & Operators ==
    /// Left Brace: `{`
    LBrace,
    /// Right Brace: `}`
    RBrace,
    /// Left Parenthesis: `(`
    LParen,
    /// Right Parenthesis: `)`
    RParen,
    /// Comma: `,`
    Comma,
    /// Equals: `=` (bindings and exact cardinality)
    Equals,
    /// Less-or-equal: `<=`
    LessEqual,
    /// Greater-or-equal: `>=`
    GreaterEqual,
}

/// A token with its type and byte position
#[derive(Debug, Clone)]
pub struct Token {
    pub ttype: TokenType,
    pub pos_start: usize,
    pub pos_end: usize,
}

impl Token {
    pub fn new(ttype: TokenType, pos_start: usize, pos_end: usize) -> Token {
        Token {
            ttype,
            pos_start,
            pos_end,
        }
    }
}

pub struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    position: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            chars: input.chars().peekable(),
            position: 0,
        }
    }

    /// Tokenizes the whole input. The last token is always [`TokenType::Eof`].
    pub fn lex(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            if token.ttype == TokenType::Eof {
                tokens.push(token);
                break;
            }
            tokens.push(token);
        }
        tokens
    }

    pub fn next_token(&mut self) -> Token {
        let start_pos = self.position;

        let ttype = if let Some(char) = self.advance() {
            match char {
                '{' => TokenType::LBrace,
                '}' => TokenType::RBrace,
                '(' => TokenType::LParen,
                ')' => TokenType::RParen,
                ',' => TokenType::Comma,
                '=' => TokenType::Equals,
                '<' => self.read_comparison(TokenType::LessEqual),
                '>' => self.read_comparison(TokenType::GreaterEqual),
                '#' => self.read_comment(),
                c if c.is_whitespace() => self.read_whitespace(),
                c if c.is_ascii_alphabetic() || c == '_' => self.read_identifier(c),
                c if c.is_ascii_digit()
                    || (c == '-' && self.peek().is_some_and(|c| c.is_ascii_digit())) =>
                {
                    self.read_integer(c)
                }

                _ => TokenType::Unknown,
            }
        } else {
            TokenType::Eof
        };

        Token::new(ttype, start_pos, self.position)
    }

    fn advance(&mut self) -> Option<char> {
        let char = self.chars.next();
        if let Some(c) = char {
            self.position += c.len_utf8();
        }
        char
    }

    fn peek(&mut self) -> Option<&char> {
        self.chars.peek()
    }

    /// `<` and `>` are only meaningful when followed by `=`.
    fn read_comparison(&mut self, matched: TokenType) -> TokenType {
        if self.peek() == Some(&'=') {
            self.advance();
            matched
        } else {
            TokenType::Unknown
        }
    }

    fn read_whitespace(&mut self) -> TokenType {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
        TokenType::Whitespace
    }

    fn read_comment(&mut self) -> TokenType {
        let mut comment_text = String::new();
        while let Some(&c) = self.peek() {
            if c == '\n' {
                break;
            }
            comment_text.push(c);
            self.advance();
        }
        TokenType::Comment(comment_text.trim().to_string())
    }

    fn read_identifier(&mut self, first_char: char) -> TokenType {
        let mut ident = String::new();
        ident.push(first_char);

        while let Some(&c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                ident.push(c);
                self.advance();
            } else {
                break;
            }
        }

        match ident.as_str() {
            "Atom" => TokenType::Atom,
            "Epsilon" => TokenType::Epsilon,
            "Z" => TokenType::Z,
            "Union" => TokenType::Union,
            "Prod" => TokenType::Prod,
            "Subst" => TokenType::Subst,
            "Set" => TokenType::Set,
            "PowerSet" => TokenType::PowerSet,
            "Sequence" => TokenType::Sequence,
            "Cycle" => TokenType::Cycle,
            "card" => TokenType::Card,
            _ => TokenType::Identifier(ident),
        }
    }

    fn read_integer(&mut self, first_char: char) -> TokenType {
        let mut number_str = String::new();
        number_str.push(first_char);

        while let Some(&c) = self.peek() {
            if c.is_ascii_digit() {
                number_str.push(c);
                self.advance();
            } else {
                break;
            }
        }

        match number_str.parse::<i64>() {
            Ok(value) => TokenType::Integer(value),
            Err(_) => TokenType::Unknown,
        }
    }
}
