use super::{
    token::{Token, TokenKind},
    LineBreaks,
};
use crate::lexer::{Lexer, LexicalError};

/// Interface for creating new token formatters.
pub trait TokenFormatter {
    /// Formats a token into a string.
    fn format(&self, token: &Token) -> String;
    /// Formats a lexer error into a string.
    fn format_lexical_error(&self, error: &LexicalError) -> String;
}

pub trait ToFormatter<F>
where
    F: TokenFormatter,
{
    fn create_formatter(&self) -> F;
}

/// One token per line as `<line>:<column> <kind> <lexeme>`.
pub struct BasicFormatter<'src> {
    text: &'src str,
    line_breaks: LineBreaks,
}

impl<'src> ToFormatter<BasicFormatter<'src>> for Lexer<'src> {
    fn create_formatter(&self) -> BasicFormatter<'src> {
        BasicFormatter {
            text: self.get_source(),
            line_breaks: self.get_line_breaks(),
        }
    }
}

impl<'src> TokenFormatter for BasicFormatter<'src> {
    fn format(&self, token: &Token) -> String {
        let (line, column) = self.line_breaks.get_position(token.span.start);
        match token.kind {
            TokenKind::Eof => format!("{line}:{column} EOF"),
            TokenKind::NumericLiteral => {
                format!("{line}:{column} NUMBER {}", &self.text[token.span.range()])
            }
            TokenKind::StringLiteral => {
                format!("{line}:{column} STRING {}", &self.text[token.span.range()])
            }
            TokenKind::Ident => {
                format!(
                    "{line}:{column} IDENTIFIER {}",
                    &self.text[token.span.range()]
                )
            }
            kind => format!("{line}:{column} {kind}"),
        }
    }

    fn format_lexical_error(&self, error: &LexicalError) -> String {
        let (line, column) = self.line_breaks.get_position(error.span.start);
        format!("[line {line}, column {column}] Error: {error}")
    }
}

pub struct DebugFormatter;

impl<'src> ToFormatter<DebugFormatter> for Lexer<'src> {
    fn create_formatter(&self) -> DebugFormatter {
        DebugFormatter {}
    }
}

impl TokenFormatter for DebugFormatter {
    fn format(&self, token: &Token) -> String {
        format!("{token:?}")
    }

    fn format_lexical_error(&self, error: &LexicalError) -> String {
        format!("{error:?}")
    }
}
