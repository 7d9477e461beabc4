use super::token::Span;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum LexicalErrorKind {
    #[error("Unrecognized character '{0}'")]
    Unrecognized(char),
    #[error("Expected '{expected}' after '{after}'")]
    Incomplete { expected: char, after: char },
    #[error("Unterminated string literal")]
    UnclosedString,
    #[error("Unterminated block comment")]
    UnclosedComment,
}

#[derive(Debug, Error, Clone, PartialEq)]
#[error("{kind}")]
pub struct LexicalError {
    #[source]
    pub kind: LexicalErrorKind,
    pub span: Span,
}
