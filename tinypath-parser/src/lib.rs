mod lexer;
mod parser;

pub use lexer::{LexError, Lexer, Token, TokenKind, tokenize};
pub use parser::{CompileError, CompileErrorKind, parse};
