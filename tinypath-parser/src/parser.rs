use tinypath_ast::{CompareOp, Program, Selector};
use tracing::{debug, trace};

use crate::lexer::{LexError, Lexer, Token, TokenKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompileErrorKind {
    UnexpectedCharacter,
    MalformedNumber,
    MissingRoot,
    MissingDotAfterRoot,
    UnsupportedRecursiveDescent,
    UnclosedBracket,
    DanglingRightBracket,
    NonNumericIndex,
    NonIntegerIndex,
    ComparisonOperandNotNumber,
    UnexpectedToken,
    UnexpectedEndOfInput,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{} at position {position}", self.message())]
pub struct CompileError {
    pub kind: CompileErrorKind,
    /// text of the offending token, empty at end of input
    pub text: String,
    /// byte offset of the offending token
    pub position: usize,
}

impl CompileError {
    fn new(kind: CompileErrorKind, token: &Token) -> Self {
        Self {
            kind,
            text: token.text.clone(),
            position: token.position,
        }
    }

    fn lex(error: &LexError, token: &Token) -> Self {
        let kind = match error {
            LexError::MalformedNumber => CompileErrorKind::MalformedNumber,
            _ => CompileErrorKind::UnexpectedCharacter,
        };
        Self::new(kind, token)
    }

    /// The offending token as shown to users, quoted, or `end of input`.
    pub fn found(&self) -> String {
        if self.text.is_empty() {
            "end of input".to_owned()
        } else {
            format!("'{}'", self.text)
        }
    }

    pub fn message(&self) -> String {
        use CompileErrorKind::*;
        match self.kind {
            UnexpectedCharacter => format!("unexpected {}", self.found()),
            MalformedNumber => format!("malformed number {}", self.found()),
            MissingRoot => format!("path must start with '$', got {}", self.found()),
            MissingDotAfterRoot => format!("expected '.' after '$', got {}", self.found()),
            UnsupportedRecursiveDescent => "recursive descent not supported".to_owned(),
            UnclosedBracket => format!("expected ']', got {}", self.found()),
            DanglingRightBracket => "close bracket ']' seen without open bracket".to_owned(),
            NonNumericIndex => format!("expected array index, got {}", self.found()),
            NonIntegerIndex => format!(
                "array index must be a non-negative integer, got {}",
                self.found()
            ),
            ComparisonOperandNotNumber => format!(
                "comparison must be with a number, got {}",
                self.found()
            ),
            UnexpectedToken => format!("unexpected {}", self.found()),
            UnexpectedEndOfInput => "unexpected end of input".to_owned(),
        }
    }
}

struct Parser<'a> {
    lexer: Lexer<'a>,
    selectors: Vec<Selector>,
}

impl<'a> Parser<'a> {
    fn next(&mut self) -> Result<Token, CompileError> {
        let token = self.lexer.next_token();
        trace!(kind = ?token.kind, text = %token.text, position = token.position, "token");
        match &token.kind {
            TokenKind::LexError(error) => Err(CompileError::lex(error, &token)),
            _ => Ok(token),
        }
    }

    fn parse(mut self) -> Result<Program, CompileError> {
        let first = self.next()?;
        if first.kind != TokenKind::RootAnchor {
            return Err(CompileError::new(CompileErrorKind::MissingRoot, &first));
        }
        let after_root = self.next()?;
        match after_root.kind {
            TokenKind::EndOfInput => return Ok(Program::empty()),
            TokenKind::Dot => self.segment()?,
            TokenKind::DotDot => {
                return Err(CompileError::new(
                    CompileErrorKind::UnsupportedRecursiveDescent,
                    &after_root,
                ));
            }
            _ => {
                return Err(CompileError::new(
                    CompileErrorKind::MissingDotAfterRoot,
                    &after_root,
                ));
            }
        }

        let end = loop {
            let token = self.next()?;
            if let Some(op) = compare_op(&token.kind) {
                // consumes everything up to end of input
                self.comparison(op)?;
                break token;
            }
            match token.kind {
                TokenKind::EndOfInput => break token,
                TokenKind::Dot => self.segment()?,
                TokenKind::DotDot | TokenKind::StarStar => {
                    return Err(CompileError::new(
                        CompileErrorKind::UnsupportedRecursiveDescent,
                        &token,
                    ));
                }
                TokenKind::LBracket => self.bracket()?,
                TokenKind::RBracket => {
                    return Err(CompileError::new(
                        CompileErrorKind::DanglingRightBracket,
                        &token,
                    ));
                }
                _ => {
                    return Err(CompileError::new(
                        CompileErrorKind::UnexpectedToken,
                        &token,
                    ));
                }
            }
        };

        let program = Program::new(self.selectors)
            .map_err(|_| CompileError::new(CompileErrorKind::UnexpectedToken, &end))?;
        debug!(selectors = program.len(), %program, "compiled path");
        Ok(program)
    }

    // after '.'
    fn segment(&mut self) -> Result<(), CompileError> {
        let token = self.next()?;
        let selector = match token.kind {
            TokenKind::Star => Selector::Wildcard,
            TokenKind::PathKey => Selector::Key(token.text),
            TokenKind::StarStar => {
                return Err(CompileError::new(
                    CompileErrorKind::UnsupportedRecursiveDescent,
                    &token,
                ));
            }
            TokenKind::EndOfInput => {
                return Err(CompileError::new(
                    CompileErrorKind::UnexpectedEndOfInput,
                    &token,
                ));
            }
            _ => {
                return Err(CompileError::new(
                    CompileErrorKind::UnexpectedToken,
                    &token,
                ));
            }
        };
        self.selectors.push(selector);
        Ok(())
    }

    // after '['
    fn bracket(&mut self) -> Result<(), CompileError> {
        let token = self.next()?;
        match token.kind {
            // `[]` selects nothing and is kept for compatibility
            TokenKind::RBracket => return Ok(()),
            TokenKind::Number => (),
            TokenKind::EndOfInput => {
                return Err(CompileError::new(
                    CompileErrorKind::UnclosedBracket,
                    &token,
                ));
            }
            _ => {
                return Err(CompileError::new(
                    CompileErrorKind::NonNumericIndex,
                    &token,
                ));
            }
        }
        let index = token
            .text
            .parse::<usize>()
            .map_err(|_| CompileError::new(CompileErrorKind::NonIntegerIndex, &token))?;

        let close = self.next()?;
        if close.kind != TokenKind::RBracket {
            return Err(CompileError::new(
                CompileErrorKind::UnclosedBracket,
                &close,
            ));
        }
        self.selectors.push(Selector::Index(index));
        Ok(())
    }

    // a comparison ends the path: operator, number, end of input
    fn comparison(&mut self, op: CompareOp) -> Result<(), CompileError> {
        let operand = self.next()?;
        match operand.kind {
            TokenKind::Number => (),
            TokenKind::EndOfInput => {
                return Err(CompileError::new(
                    CompileErrorKind::UnexpectedEndOfInput,
                    &operand,
                ));
            }
            _ => {
                return Err(CompileError::new(
                    CompileErrorKind::ComparisonOperandNotNumber,
                    &operand,
                ));
            }
        }
        // overflow to infinity has no textual form the lexer accepts
        let literal = operand
            .text
            .parse::<f64>()
            .ok()
            .filter(|literal| literal.is_finite())
            .ok_or_else(|| CompileError::new(CompileErrorKind::MalformedNumber, &operand))?;

        let end = self.next()?;
        if end.kind != TokenKind::EndOfInput {
            return Err(CompileError::new(CompileErrorKind::UnexpectedToken, &end));
        }
        self.selectors.push(Selector::Compare { op, literal });
        Ok(())
    }
}

fn compare_op(kind: &TokenKind) -> Option<CompareOp> {
    match kind {
        TokenKind::Less => Some(CompareOp::Lt),
        TokenKind::LessEqual => Some(CompareOp::Le),
        TokenKind::Greater => Some(CompareOp::Gt),
        TokenKind::GreaterEqual => Some(CompareOp::Ge),
        TokenKind::Equal => Some(CompareOp::Eq),
        TokenKind::NotEqual => Some(CompareOp::Ne),
        _ => None,
    }
}

/// Compiles path source text into a [`Program`].
pub fn parse(source: &str) -> Result<Program, CompileError> {
    Parser {
        lexer: Lexer::new(source),
        selectors: vec![],
    }
    .parse()
}
