//! Lexer for the script language.
//!
//! Produces a flat token stream with explicit `Newline`, `Indent` and
//! `Dedent` tokens so the parser never looks at whitespace. Blank and
//! comment-only lines produce no tokens. Newlines inside brackets are
//! ignored, and a backslash at the end of a line joins it with the next.

use std::fmt;

use crate::error::ParseError;

/// Token variants.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Literals
    Int(i64),
    Float(f64),
    Str(String),
    Name(String),

    // Keywords
    Def,
    If,
    Elif,
    Else,
    While,
    For,
    In,
    Return,
    Pass,
    Break,
    Continue,
    Raise,
    And,
    Or,
    Not,
    True,
    False,
    None,

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    SlashSlash,
    Percent,
    EqEq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    Assign,
    PlusAssign,
    MinusAssign,
    StarAssign,

    // Punctuation
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Colon,

    // Layout
    Newline,
    Indent,
    Dedent,
    Eof,
}

impl TokenKind {
    fn keyword(word: &str) -> Option<TokenKind> {
        let kind = match word {
            "def" => TokenKind::Def,
            "if" => TokenKind::If,
            "elif" => TokenKind::Elif,
            "else" => TokenKind::Else,
            "while" => TokenKind::While,
            "for" => TokenKind::For,
            "in" => TokenKind::In,
            "return" => TokenKind::Return,
            "pass" => TokenKind::Pass,
            "break" => TokenKind::Break,
            "continue" => TokenKind::Continue,
            "raise" => TokenKind::Raise,
            "and" => TokenKind::And,
            "or" => TokenKind::Or,
            "not" => TokenKind::Not,
            "True" => TokenKind::True,
            "False" => TokenKind::False,
            "None" => TokenKind::None,
            _ => return None,
        };
        Some(kind)
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            TokenKind::Int(v) => return write!(f, "integer {v}"),
            TokenKind::Float(v) => return write!(f, "number {v}"),
            TokenKind::Str(_) => "string literal",
            TokenKind::Name(n) => return write!(f, "name '{n}'"),
            TokenKind::Def => "'def'",
            TokenKind::If => "'if'",
            TokenKind::Elif => "'elif'",
            TokenKind::Else => "'else'",
            TokenKind::While => "'while'",
            TokenKind::For => "'for'",
            TokenKind::In => "'in'",
            TokenKind::Return => "'return'",
            TokenKind::Pass => "'pass'",
            TokenKind::Break => "'break'",
            TokenKind::Continue => "'continue'",
            TokenKind::Raise => "'raise'",
            TokenKind::And => "'and'",
            TokenKind::Or => "'or'",
            TokenKind::Not => "'not'",
            TokenKind::True => "'True'",
            TokenKind::False => "'False'",
            TokenKind::None => "'None'",
            TokenKind::Plus => "'+'",
            TokenKind::Minus => "'-'",
            TokenKind::Star => "'*'",
            TokenKind::Slash => "'/'",
            TokenKind::SlashSlash => "'//'",
            TokenKind::Percent => "'%'",
            TokenKind::EqEq => "'=='",
            TokenKind::NotEq => "'!='",
            TokenKind::Lt => "'<'",
            TokenKind::Le => "'<='",
            TokenKind::Gt => "'>'",
            TokenKind::Ge => "'>='",
            TokenKind::Assign => "'='",
            TokenKind::PlusAssign => "'+='",
            TokenKind::MinusAssign => "'-='",
            TokenKind::StarAssign => "'*='",
            TokenKind::LParen => "'('",
            TokenKind::RParen => "')'",
            TokenKind::LBracket => "'['",
            TokenKind::RBracket => "']'",
            TokenKind::Comma => "','",
            TokenKind::Colon => "':'",
            TokenKind::Newline => "end of line",
            TokenKind::Indent => "indent",
            TokenKind::Dedent => "dedent",
            TokenKind::Eof => "end of file",
        };
        f.write_str(text)
    }
}

/// A token with the position of its first character (1-based).
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: u32,
    pub column: u32,
}

/// Width a tab advances the indentation to (next multiple of).
const TAB_WIDTH: usize = 8;

pub struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: u32,
    column: u32,
    /// Open `(` and `[` count; newlines inside brackets are insignificant.
    depth: usize,
    indents: Vec<usize>,
    tokens: Vec<Token>,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Lexer {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            column: 1,
            depth: 0,
            indents: vec![0],
            tokens: Vec::new(),
        }
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>, ParseError> {
        let mut at_line_start = true;

        loop {
            if at_line_start && self.depth == 0 {
                at_line_start = false;
                if !self.indentation()? {
                    // Blank or comment-only line, already consumed.
                    at_line_start = true;
                    if self.peek().is_none() {
                        break;
                    }
                    continue;
                }
            }

            let Some(c) = self.peek() else { break };
            let (line, column) = (self.line, self.column);

            match c {
                ' ' | '\t' | '\r' => {
                    self.bump();
                }
                '\n' => {
                    self.bump();
                    if self.depth == 0 {
                        self.push(TokenKind::Newline, line, column);
                        at_line_start = true;
                    }
                }
                '#' => self.skip_comment(),
                '\\' if self.peek_at(1) == Some('\n') => {
                    self.bump();
                    self.bump();
                }
                '0'..='9' => {
                    let kind = self.number()?;
                    self.push(kind, line, column);
                }
                '"' | '\'' => {
                    let text = self.string(c)?;
                    self.push(TokenKind::Str(text), line, column);
                }
                c if c.is_alphabetic() || c == '_' => {
                    let word = self.word();
                    let kind = TokenKind::keyword(&word).unwrap_or(TokenKind::Name(word));
                    self.push(kind, line, column);
                }
                _ => {
                    let kind = self.operator()?;
                    self.push(kind, line, column);
                }
            }
        }

        let (line, column) = (self.line, self.column);
        if !matches!(
            self.tokens.last().map(|t| &t.kind),
            None | Some(TokenKind::Newline)
        ) {
            self.push(TokenKind::Newline, line, column);
        }
        while self.indents.len() > 1 {
            self.indents.pop();
            self.push(TokenKind::Dedent, line, column);
        }
        self.push(TokenKind::Eof, line, column);
        Ok(self.tokens)
    }

    /// Measures the indentation of the current line and emits `Indent` or
    /// `Dedent` tokens. Returns `false` if the line holds no code.
    fn indentation(&mut self) -> Result<bool, ParseError> {
        let mut width = 0;
        while let Some(c) = self.peek() {
            match c {
                ' ' => width += 1,
                '\t' => width = (width / TAB_WIDTH + 1) * TAB_WIDTH,
                '\r' => {}
                _ => break,
            }
            self.bump();
        }

        match self.peek() {
            None => return Ok(false),
            Some('\n') => {
                self.bump();
                return Ok(false);
            }
            Some('#') => {
                self.skip_comment();
                if self.peek() == Some('\n') {
                    self.bump();
                }
                return Ok(false);
            }
            Some(_) => {}
        }

        let current = self.indents.last().copied().unwrap_or(0);
        let (line, column) = (self.line, self.column);
        if width > current {
            self.indents.push(width);
            self.push(TokenKind::Indent, line, column);
        } else if width < current {
            while self.indents.last().is_some_and(|&w| w > width) {
                self.indents.pop();
                self.push(TokenKind::Dedent, line, column);
            }
            if self.indents.last().copied() != Some(width) {
                return Err(ParseError::new(
                    "unindent does not match any outer indentation level",
                    line,
                    column,
                ));
            }
        }
        Ok(true)
    }

    fn number(&mut self) -> Result<TokenKind, ParseError> {
        let (line, column) = (self.line, self.column);
        let mut text = String::new();
        while let Some(c) = self.peek().filter(|c| c.is_ascii_digit() || *c == '_') {
            if c != '_' {
                text.push(c);
            }
            self.bump();
        }

        let is_float = self.peek() == Some('.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit());
        if !is_float {
            return text
                .parse::<i64>()
                .map(TokenKind::Int)
                .map_err(|_| ParseError::new("integer literal is too large", line, column));
        }

        text.push('.');
        self.bump();
        while let Some(c) = self.peek().filter(char::is_ascii_digit) {
            text.push(c);
            self.bump();
        }
        text.parse::<f64>()
            .map(TokenKind::Float)
            .map_err(|_| ParseError::new("invalid float literal", line, column))
    }

    fn string(&mut self, quote: char) -> Result<String, ParseError> {
        let (line, column) = (self.line, self.column);
        let triple = self.peek_at(1) == Some(quote) && self.peek_at(2) == Some(quote);
        let delimiter = if triple { 3 } else { 1 };
        for _ in 0..delimiter {
            self.bump();
        }

        let mut text = String::new();
        loop {
            let Some(c) = self.peek() else {
                return Err(ParseError::new("unterminated string literal", line, column));
            };

            if c == quote {
                if !triple {
                    self.bump();
                    return Ok(text);
                }
                if self.peek_at(1) == Some(quote) && self.peek_at(2) == Some(quote) {
                    for _ in 0..3 {
                        self.bump();
                    }
                    return Ok(text);
                }
            }

            if c == '\n' && !triple {
                return Err(ParseError::new("unterminated string literal", line, column));
            }

            self.bump();
            if c != '\\' {
                text.push(c);
                continue;
            }

            let Some(escaped) = self.peek() else {
                return Err(ParseError::new("unterminated string literal", line, column));
            };
            self.bump();
            match escaped {
                'n' => text.push('\n'),
                't' => text.push('\t'),
                'r' => text.push('\r'),
                '0' => text.push('\0'),
                '\\' => text.push('\\'),
                '\'' => text.push('\''),
                '"' => text.push('"'),
                '\n' => {}
                other => {
                    text.push('\\');
                    text.push(other);
                }
            }
        }
    }

    fn word(&mut self) -> String {
        let mut word = String::new();
        while let Some(c) = self.peek().filter(|c| c.is_alphanumeric() || *c == '_') {
            word.push(c);
            self.bump();
        }
        word
    }

    fn operator(&mut self) -> Result<TokenKind, ParseError> {
        let (line, column) = (self.line, self.column);
        let c = self.bump().unwrap_or('\0');
        let next = self.peek();

        let two = |lexer: &mut Lexer, kind: TokenKind| {
            lexer.bump();
            kind
        };

        let kind = match (c, next) {
            ('/', Some('/')) => two(self, TokenKind::SlashSlash),
            ('=', Some('=')) => two(self, TokenKind::EqEq),
            ('!', Some('=')) => two(self, TokenKind::NotEq),
            ('<', Some('=')) => two(self, TokenKind::Le),
            ('>', Some('=')) => two(self, TokenKind::Ge),
            ('+', Some('=')) => two(self, TokenKind::PlusAssign),
            ('-', Some('=')) => two(self, TokenKind::MinusAssign),
            ('*', Some('=')) => two(self, TokenKind::StarAssign),
            ('+', _) => TokenKind::Plus,
            ('-', _) => TokenKind::Minus,
            ('*', _) => TokenKind::Star,
            ('/', _) => TokenKind::Slash,
            ('%', _) => TokenKind::Percent,
            ('<', _) => TokenKind::Lt,
            ('>', _) => TokenKind::Gt,
            ('=', _) => TokenKind::Assign,
            (',', _) => TokenKind::Comma,
            (':', _) => TokenKind::Colon,
            ('(', _) => {
                self.depth += 1;
                TokenKind::LParen
            }
            ('[', _) => {
                self.depth += 1;
                TokenKind::LBracket
            }
            (')', _) | (']', _) => {
                if self.depth == 0 {
                    return Err(ParseError::new(format!("unmatched '{c}'"), line, column));
                }
                self.depth -= 1;
                if c == ')' {
                    TokenKind::RParen
                } else {
                    TokenKind::RBracket
                }
            }
            _ => {
                return Err(ParseError::new(
                    format!("invalid character '{c}'"),
                    line,
                    column,
                ))
            }
        };
        Ok(kind)
    }

    fn skip_comment(&mut self) {
        while self.peek().is_some_and(|c| c != '\n') {
            self.bump();
        }
    }

    fn push(&mut self, kind: TokenKind, line: u32, column: u32) {
        self.tokens.push(Token { kind, line, column });
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.get(self.pos).copied()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }
}

/// Tokenizes `source`.
pub fn tokenize(source: &str) -> Result<Vec<Token>, ParseError> {
    Lexer::new(source).tokenize()
}
