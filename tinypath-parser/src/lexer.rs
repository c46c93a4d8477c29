use std::fmt;
use std::iter::Peekable;
use std::str::CharIndices;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LexError {
    UnexpectedCharacter(char),
    /// Three or more `.` or `*` in a row.
    UnexpectedRun(char),
    /// A `!` that is not followed by `=`.
    ExpectedEquals(Option<char>),
    MalformedNumber,
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LexError::UnexpectedCharacter(c) => write!(f, "unexpected character '{c}'"),
            LexError::UnexpectedRun(c) => write!(f, "unexpected '{c}'"),
            LexError::ExpectedEquals(Some(c)) => write!(f, "expected '=' got {c}"),
            LexError::ExpectedEquals(None) => f.write_str("expected '=' got end of input"),
            LexError::MalformedNumber => f.write_str("malformed number"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    RootAnchor,
    Dot,
    DotDot,
    Star,
    StarStar,
    LBracket,
    RBracket,
    PathKey,
    Number,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    EndOfInput,
    LexError(LexError),
}

impl TokenKind {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TokenKind::EndOfInput | TokenKind::LexError(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    /// byte offset of the first character
    pub position: usize,
}

/// Splits path source into tokens, one call to [`Lexer::next_token`] at a
/// time. Every call that does not return a terminal token consumes at least
/// one character.
pub struct Lexer<'a> {
    source: &'a str,
    chars: Peekable<CharIndices<'a>>,
    start: usize,
    finished: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.char_indices().peekable(),
            start: 0,
            finished: false,
        }
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().map(|&(_, c)| c)
    }

    fn pos(&mut self) -> usize {
        self.chars
            .peek()
            .map_or(self.source.len(), |&(offset, _)| offset)
    }

    fn advance(&mut self) -> Option<char> {
        self.chars.next().map(|(_, c)| c)
    }

    fn accept(&mut self, valid: impl Fn(char) -> bool) -> bool {
        match self.peek() {
            Some(c) if valid(c) => {
                self.advance();
                true
            }
            _ => false,
        }
    }

    fn accept_run(&mut self, valid: impl Fn(char) -> bool) -> usize {
        let mut count = 0;
        while self.accept(&valid) {
            count += 1;
        }
        count
    }

    fn ignore(&mut self) {
        self.start = self.pos();
    }

    fn emit(&mut self, kind: TokenKind) -> Token {
        let end = self.pos();
        let token = Token {
            kind,
            text: self.source[self.start..end].to_owned(),
            position: self.start,
        };
        self.start = end;
        token
    }

    fn error(&mut self, error: LexError) -> Token {
        self.emit(TokenKind::LexError(error))
    }

    /// Returns the next token. Once `EndOfInput` or a `LexError` has been
    /// returned the caller must stop.
    pub fn next_token(&mut self) -> Token {
        self.accept_run(char::is_whitespace);
        self.ignore();

        match self.accept_run(|c| c == '.') {
            0 => (),
            1 => return self.emit(TokenKind::Dot),
            2 => return self.emit(TokenKind::DotDot),
            _ => return self.error(LexError::UnexpectedRun('.')),
        }

        match self.accept_run(|c| c == '*') {
            0 => (),
            1 => return self.emit(TokenKind::Star),
            2 => return self.emit(TokenKind::StarStar),
            _ => return self.error(LexError::UnexpectedRun('*')),
        }

        let Some(c) = self.peek() else {
            return self.emit(TokenKind::EndOfInput);
        };
        if c.is_alphabetic() {
            return self.path_key();
        }
        if c.is_ascii_digit() {
            return self.number();
        }
        self.advance();
        match c {
            '[' => self.emit(TokenKind::LBracket),
            ']' => self.emit(TokenKind::RBracket),
            '$' => self.emit(TokenKind::RootAnchor),
            '=' => self.emit(TokenKind::Equal),
            '>' if self.accept(|c| c == '=') => self.emit(TokenKind::GreaterEqual),
            '>' => self.emit(TokenKind::Greater),
            '<' if self.accept(|c| c == '=') => self.emit(TokenKind::LessEqual),
            '<' => self.emit(TokenKind::Less),
            '!' if self.accept(|c| c == '=') => self.emit(TokenKind::NotEqual),
            '!' => {
                let got = self.peek();
                self.error(LexError::ExpectedEquals(got))
            }
            other => self.error(LexError::UnexpectedCharacter(other)),
        }
    }

    fn path_key(&mut self) -> Token {
        self.accept_run(|c| c.is_alphabetic() || c == '_');
        self.emit(TokenKind::PathKey)
    }

    // digits ['.' digits] [('e' | 'E') ['-'] digits]
    fn number(&mut self) -> Token {
        self.accept_run(|c| c.is_ascii_digit());
        if self.accept(|c| c == '.') {
            self.accept_run(|c| c.is_ascii_digit());
        }
        if self.accept(|c| c == 'e' || c == 'E') {
            self.accept(|c| c == '-');
            if self.accept_run(|c| c.is_ascii_digit()) == 0 {
                return self.error(LexError::MalformedNumber);
            }
        }
        self.emit(TokenKind::Number)
    }
}

impl Iterator for Lexer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        if self.finished {
            return None;
        }
        let token = self.next_token();
        self.finished = token.kind.is_terminal();
        Some(token)
    }
}

/// Collects every token of `source`, ending with the terminal token.
pub fn tokenize(source: &str) -> Vec<Token> {
    Lexer::new(source).collect()
}
