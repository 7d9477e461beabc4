pub mod formatter;

use crate::{
    lexer::{LexicalErrorKind, Span},
    parser::{ParserError, ParserErrorKind},
    source::SourceFile,
};
use compact_str::CompactString;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    #[error("Illegal Character Error")]
    IllegalCharacter,
    #[error("Illegal Syntax Error")]
    IllegalSyntax,
    #[error("Variable or function was not found")]
    UnknownIdentifier,
    #[error("Illegal Operation Error")]
    IllegalOperation,
    #[error("Expected Character Error")]
    ExpectedCharacter,
    #[error("Program interrupted")]
    Interrupted,
    #[error("Runtime Error")]
    Runtime,
    #[error("Program stopped")]
    Stop,
}

/// One active frame at the point a runtime error was raised.
#[derive(Debug, Clone)]
pub struct TraceFrame {
    pub name: CompactString,
    /// Declaration site of the frame's function, absent for the program root.
    pub origin: Option<(Arc<SourceFile>, Span)>,
}

impl TraceFrame {
    pub fn position(&self) -> Option<(u32, u32)> {
        self.origin
            .as_ref()
            .map(|(file, span)| file.position(*span))
    }
}

/// A positioned failure raised anywhere between lexing and evaluation.
#[derive(Debug, Error, Clone)]
#[error("{kind} - '{message}'")]
pub struct CodeError {
    pub kind: ErrorKind,
    pub message: CompactString,
    pub span: Span,
    pub file: Option<Arc<SourceFile>>,
    pub trace: Vec<TraceFrame>,
}

impl CodeError {
    pub fn new(kind: ErrorKind, message: impl Into<CompactString>, span: Span) -> Self {
        Self {
            kind,
            message: message.into(),
            span,
            file: None,
            trace: Vec::new(),
        }
    }

    pub fn illegal_operation(message: impl Into<CompactString>, span: Span) -> Self {
        Self::new(ErrorKind::IllegalOperation, message, span)
    }

    pub fn unknown_identifier(name: &str, span: Span) -> Self {
        Self::new(
            ErrorKind::UnknownIdentifier,
            format!("{name} is not defined"),
            span,
        )
    }

    pub fn with_trace(mut self, trace: Vec<TraceFrame>) -> Self {
        self.trace = trace;
        self
    }

    /// Attaches the source file unless an inner boundary already did.
    pub fn with_file(mut self, file: &Arc<SourceFile>) -> Self {
        if self.file.is_none() {
            self.file = Some(Arc::clone(file));
        }
        self
    }

    /// 1-based line and column of the error, when its source is known.
    pub fn position(&self) -> Option<(u32, u32)> {
        self.file.as_ref().map(|file| file.position(self.span))
    }
}

impl From<ParserError> for CodeError {
    fn from(error: ParserError) -> Self {
        let kind = match &error.kind {
            ParserErrorKind::LexicalError(inner) => match inner.kind {
                LexicalErrorKind::Unrecognized(_) => ErrorKind::IllegalCharacter,
                LexicalErrorKind::Incomplete { .. }
                | LexicalErrorKind::UnclosedString
                | LexicalErrorKind::UnclosedComment => ErrorKind::ExpectedCharacter,
            },
            ParserErrorKind::UnexpectedToken { .. } => ErrorKind::ExpectedCharacter,
            _ => ErrorKind::IllegalSyntax,
        };
        Self::new(kind, error.kind.to_string(), error.span)
    }
}
