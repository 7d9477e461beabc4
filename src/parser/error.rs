use crate::lexer::{LexicalError, Span, TokenKind};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParserErrorKind {
    #[error("Expected '{expected}' but got '{actual}'")]
    UnexpectedToken {
        actual: TokenKind,
        expected: TokenKind,
    },
    #[error("Expected an expression but got '{0}'")]
    NonExpression(TokenKind),
    #[error("Expected a statement but got end of file")]
    UnexpectedEof,
    #[error("Cannot assign to this expression")]
    InvalidLValue,
    #[error("Case values must be number or string literals")]
    InvalidCaseLiteral,
    #[error("Case values must all be of the same type")]
    MixedCaseTypes,
    #[error("Case value '{0}' is already handled")]
    DuplicateCase(String),
    #[error("Switch already has a default case")]
    DuplicateDefault,
    #[error("Expected 'case', 'default' or '}}' but got '{0}'")]
    InvalidSwitchArm(TokenKind),
    #[error("Constructor '{actual}' must be named after its class '{class}'")]
    InvalidConstructorName { actual: String, class: String },
    #[error("Expected a class member but got '{0}'")]
    InvalidClassMember(TokenKind),
    #[error("Invalid number literal '{0}'")]
    InvalidNumber(String),
    #[error("{0}")]
    LexicalError(#[from] LexicalError),
}

#[derive(Debug, Error, Clone, PartialEq)]
#[error("{kind}")]
pub struct ParserError {
    #[source]
    pub kind: ParserErrorKind,
    pub span: Span,
}

impl From<LexicalError> for ParserError {
    fn from(value: LexicalError) -> Self {
        Self {
            span: value.span,
            kind: ParserErrorKind::LexicalError(value),
        }
    }
}
