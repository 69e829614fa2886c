//! Tokenizer
//!
//! Produces a flat token stream terminated by [`TokenKind::Eof`]. Unknown
//! characters and unterminated literals become syntax diagnostics and are
//! skipped, so the parser still sees the rest of the file.

use crate::diagnostic::{Diagnostic, Span};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    Ident(String),
    /// Integer literal text with `_` separators removed (decimal or `0x` hex)
    Int(String),
    Str(String),

    // Keywords
    Fn,
    Let,
    Mut,
    Pub,
    If,
    Else,
    For,
    In,
    Struct,
    Global,
    Use,
    As,
    True,
    False,
    Assert,
    AssertEq,

    // Delimiters
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Comma,
    Semi,
    Colon,
    ColonColon,
    Dot,
    DotDot,
    Arrow,

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    EqEq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    AndAnd,
    OrOr,
    Bang,
    Amp,
    Pipe,
    Caret,
    Shl,
    Shr,
    Eq,
    PlusEq,
    MinusEq,
    StarEq,
    SlashEq,

    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            TokenKind::Ident(name) => return write!(f, "identifier '{}'", name),
            TokenKind::Int(text) => return write!(f, "integer '{}'", text),
            TokenKind::Str(_) => "string literal",
            TokenKind::Fn => "'fn'",
            TokenKind::Let => "'let'",
            TokenKind::Mut => "'mut'",
            TokenKind::Pub => "'pub'",
            TokenKind::If => "'if'",
            TokenKind::Else => "'else'",
            TokenKind::For => "'for'",
            TokenKind::In => "'in'",
            TokenKind::Struct => "'struct'",
            TokenKind::Global => "'global'",
            TokenKind::Use => "'use'",
            TokenKind::As => "'as'",
            TokenKind::True => "'true'",
            TokenKind::False => "'false'",
            TokenKind::Assert => "'assert'",
            TokenKind::AssertEq => "'assert_eq'",
            TokenKind::LParen => "'('",
            TokenKind::RParen => "')'",
            TokenKind::LBrace => "'{'",
            TokenKind::RBrace => "'}'",
            TokenKind::LBracket => "'['",
            TokenKind::RBracket => "']'",
            TokenKind::Comma => "','",
            TokenKind::Semi => "';'",
            TokenKind::Colon => "':'",
            TokenKind::ColonColon => "'::'",
            TokenKind::Dot => "'.'",
            TokenKind::DotDot => "'..'",
            TokenKind::Arrow => "'->'",
            TokenKind::Plus => "'+'",
            TokenKind::Minus => "'-'",
            TokenKind::Star => "'*'",
            TokenKind::Slash => "'/'",
            TokenKind::Percent => "'%'",
            TokenKind::EqEq => "'=='",
            TokenKind::NotEq => "'!='",
            TokenKind::Lt => "'<'",
            TokenKind::Le => "'<='",
            TokenKind::Gt => "'>'",
            TokenKind::Ge => "'>='",
            TokenKind::AndAnd => "'&&'",
            TokenKind::OrOr => "'||'",
            TokenKind::Bang => "'!'",
            TokenKind::Amp => "'&'",
            TokenKind::Pipe => "'|'",
            TokenKind::Caret => "'^'",
            TokenKind::Shl => "'<<'",
            TokenKind::Shr => "'>>'",
            TokenKind::Eq => "'='",
            TokenKind::PlusEq => "'+='",
            TokenKind::MinusEq => "'-='",
            TokenKind::StarEq => "'*='",
            TokenKind::SlashEq => "'/='",
            TokenKind::Eof => "end of file",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

fn keyword(word: &str) -> Option<TokenKind> {
    let kind = match word {
        "fn" => TokenKind::Fn,
        "let" => TokenKind::Let,
        "mut" => TokenKind::Mut,
        "pub" => TokenKind::Pub,
        "if" => TokenKind::If,
        "else" => TokenKind::Else,
        "for" => TokenKind::For,
        "in" => TokenKind::In,
        "struct" => TokenKind::Struct,
        "global" => TokenKind::Global,
        "use" => TokenKind::Use,
        "as" => TokenKind::As,
        "true" => TokenKind::True,
        "false" => TokenKind::False,
        "assert" => TokenKind::Assert,
        "assert_eq" => TokenKind::AssertEq,
        _ => return None,
    };
    Some(kind)
}

struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    line: u32,
    column: u32,
    tokens: Vec<Token>,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> Lexer<'a> {
    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn span_from(&self, line: u32, column: u32) -> Span {
        Span::new(line, column, self.line, self.column)
    }

    fn push(&mut self, kind: TokenKind, line: u32, column: u32) {
        let span = self.span_from(line, column);
        self.tokens.push(Token { kind, span });
    }

    fn skip_block_comment(&mut self, line: u32, column: u32) {
        let mut depth = 1;
        while depth > 0 {
            match self.bump() {
                Some('*') if self.eat('/') => depth -= 1,
                Some('/') if self.eat('*') => depth += 1,
                Some(_) => {}
                None => {
                    let span = self.span_from(line, column);
                    self.diagnostics.push(Diagnostic::syntax(span, "unterminated block comment"));
                    return;
                }
            }
        }
    }

    fn lex_word(&mut self, first: char, line: u32, column: u32) {
        let mut word = String::from(first);
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                word.push(c);
                self.bump();
            } else {
                break;
            }
        }
        let kind = keyword(&word).unwrap_or(TokenKind::Ident(word));
        self.push(kind, line, column);
    }

    fn lex_number(&mut self, first: char, line: u32, column: u32) {
        let mut text = String::from(first);
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                if c != '_' {
                    text.push(c);
                }
                self.bump();
            } else {
                break;
            }
        }
        let valid = match text.strip_prefix("0x") {
            Some(hex) => !hex.is_empty() && hex.chars().all(|c| c.is_ascii_hexdigit()),
            None => text.chars().all(|c| c.is_ascii_digit()),
        };
        if valid {
            self.push(TokenKind::Int(text), line, column);
        } else {
            let span = self.span_from(line, column);
            let message = format!("invalid integer literal '{}'", text);
            self.diagnostics.push(Diagnostic::syntax(span, message));
            self.push(TokenKind::Int("0".to_string()), line, column);
        }
    }

    fn lex_string(&mut self, line: u32, column: u32) {
        let mut text = String::new();
        loop {
            match self.bump() {
                Some('"') => break,
                Some('\\') => match self.bump() {
                    Some('n') => text.push('\n'),
                    Some('t') => text.push('\t'),
                    Some(c) => text.push(c),
                    None => break,
                },
                Some(c) => text.push(c),
                None => {
                    let span = self.span_from(line, column);
                    self.diagnostics.push(Diagnostic::syntax(span, "unterminated string literal"));
                    break;
                }
            }
        }
        self.push(TokenKind::Str(text), line, column);
    }

    fn run(&mut self) {
        while let Some(c) = self.peek() {
            let (line, column) = (self.line, self.column);
            if c.is_whitespace() {
                self.bump();
                continue;
            }
            self.bump();
            let kind = match c {
                '/' if self.eat('/') => {
                    while self.peek().is_some_and(|c| c != '\n') {
                        self.bump();
                    }
                    continue;
                }
                '/' if self.eat('*') => {
                    self.skip_block_comment(line, column);
                    continue;
                }
                c if c.is_ascii_alphabetic() || c == '_' => {
                    self.lex_word(c, line, column);
                    continue;
                }
                c if c.is_ascii_digit() => {
                    self.lex_number(c, line, column);
                    continue;
                }
                '"' => {
                    self.lex_string(line, column);
                    continue;
                }
                '(' => TokenKind::LParen,
                ')' => TokenKind::RParen,
                '{' => TokenKind::LBrace,
                '}' => TokenKind::RBrace,
                '[' => TokenKind::LBracket,
                ']' => TokenKind::RBracket,
                ',' => TokenKind::Comma,
                ';' => TokenKind::Semi,
                ':' if self.eat(':') => TokenKind::ColonColon,
                ':' => TokenKind::Colon,
                '.' if self.eat('.') => TokenKind::DotDot,
                '.' => TokenKind::Dot,
                '-' if self.eat('>') => TokenKind::Arrow,
                '-' if self.eat('=') => TokenKind::MinusEq,
                '-' => TokenKind::Minus,
                '+' if self.eat('=') => TokenKind::PlusEq,
                '+' => TokenKind::Plus,
                '*' if self.eat('=') => TokenKind::StarEq,
                '*' => TokenKind::Star,
                '/' if self.eat('=') => TokenKind::SlashEq,
                '/' => TokenKind::Slash,
                '%' => TokenKind::Percent,
                '=' if self.eat('=') => TokenKind::EqEq,
                '=' => TokenKind::Eq,
                '!' if self.eat('=') => TokenKind::NotEq,
                '!' => TokenKind::Bang,
                '<' if self.eat('=') => TokenKind::Le,
                '<' if self.eat('<') => TokenKind::Shl,
                '<' => TokenKind::Lt,
                '>' if self.eat('=') => TokenKind::Ge,
                '>' if self.eat('>') => TokenKind::Shr,
                '>' => TokenKind::Gt,
                '&' if self.eat('&') => TokenKind::AndAnd,
                '&' => TokenKind::Amp,
                '|' if self.eat('|') => TokenKind::OrOr,
                '|' => TokenKind::Pipe,
                '^' => TokenKind::Caret,
                other => {
                    let span = self.span_from(line, column);
                    let message = format!("unexpected character '{}'", other);
                    self.diagnostics.push(Diagnostic::syntax(span, message));
                    continue;
                }
            };
            self.push(kind, line, column);
        }
        let (line, column) = (self.line, self.column);
        self.push(TokenKind::Eof, line, column);
    }
}

/// Splits `source` into tokens; the stream always ends with `Eof`
pub fn tokenize(source: &str) -> (Vec<Token>, Vec<Diagnostic>) {
    let mut lexer = Lexer {
        chars: source.chars().peekable(),
        line: 1,
        column: 1,
        tokens: Vec::new(),
        diagnostics: Vec::new(),
    };
    lexer.run();
    (lexer.tokens, lexer.diagnostics)
}
