mod error;
pub mod formatter;
mod token;

pub use error::{LexicalError, LexicalErrorKind};
use std::{iter::Peekable, ops::Range, str::CharIndices, sync::Arc};
pub use token::{Span, Token, TokenKind, KEYWORD_HASHMAP};

/// Byte ranges of every line in a source text, used to turn spans into
/// line and column numbers.
#[derive(Debug, Clone)]
pub struct LineBreaks {
    line_breaks: Arc<[Range<u32>]>,
}

impl LineBreaks {
    pub fn new(text: &str) -> Self {
        let mut line_breaks = Vec::new();
        let mut cursor = 0u32;
        for (offset, byte) in text.bytes().enumerate() {
            if byte == b'\n' {
                let offset = (offset + 1) as u32;
                line_breaks.push(cursor..offset);
                cursor = offset;
            }
        }
        line_breaks.push(cursor..(text.len() + 1) as u32);
        Self {
            line_breaks: line_breaks.into(),
        }
    }

    pub fn get_max_line(&self) -> u32 {
        self.line_breaks.len() as u32
    }

    /// 1-based line of a byte offset.
    pub fn get_line(&self, offset: u32) -> u32 {
        self.find(offset)
            .map(|v| (v + 1) as u32)
            .unwrap_or(self.get_max_line())
    }

    /// 1-based line and column of a byte offset.
    pub fn get_position(&self, offset: u32) -> (u32, u32) {
        match self.find(offset) {
            Some(index) => {
                let line = &self.line_breaks[index];
                ((index + 1) as u32, offset - line.start + 1)
            }
            None => (self.get_max_line(), 1),
        }
    }

    pub fn get_line_from_span(&self, span: Span) -> u32 {
        self.get_line(span.start)
    }

    fn find(&self, offset: u32) -> Option<usize> {
        self.line_breaks
            .binary_search_by(|r| {
                if offset < r.start {
                    std::cmp::Ordering::Greater
                } else if offset >= r.end {
                    std::cmp::Ordering::Less
                } else {
                    std::cmp::Ordering::Equal
                }
            })
            .ok()
    }
}

#[derive(Debug)]
pub struct Lexer<'src> {
    source: &'src str,
    chars: Peekable<CharIndices<'src>>,
    line_breaks: LineBreaks,
}

impl<'src> Lexer<'src> {
    pub fn new(source: &'src str) -> Self {
        Self {
            source,
            chars: source.char_indices().peekable(),
            line_breaks: LineBreaks::new(source),
        }
    }

    pub fn get_source(&self) -> &'src str {
        self.source
    }

    pub fn get_line_breaks(&self) -> LineBreaks {
        self.line_breaks.clone()
    }

    pub fn get_lexeme(&self, span: &Span) -> Option<&'src str> {
        self.source.get(span.range())
    }
}

impl<'src> Lexer<'src> {
    fn offset(&mut self) -> usize {
        self.chars
            .peek()
            .map(|(offset, _)| *offset)
            .unwrap_or(self.source.len())
    }

    fn eat_if(&mut self, expected: char) -> bool {
        self.chars.next_if(|(_, c)| *c == expected).is_some()
    }

    fn token(&mut self, kind: TokenKind, start: usize) -> Result<Token, LexicalError> {
        let end = self.offset();
        Ok(Token {
            kind,
            span: Span::from_range(start..end),
        })
    }

    /// Skips whitespace and comments.
    fn skip_trivia(&mut self) -> Result<(), LexicalError> {
        loop {
            let Some(&(start, c)) = self.chars.peek() else {
                return Ok(());
            };
            if c.is_whitespace() {
                self.chars.next();
                continue;
            }
            if c != '/' {
                return Ok(());
            }
            let mut lookahead = self.chars.clone();
            lookahead.next();
            match lookahead.peek().map(|(_, c)| *c) {
                Some('/') => {
                    while self.chars.next_if(|(_, c)| *c != '\n').is_some() {}
                }
                Some('*') => {
                    self.chars.next();
                    self.chars.next();
                    let mut closed = false;
                    while let Some((_, c)) = self.chars.next() {
                        if c == '*' && self.eat_if('/') {
                            closed = true;
                            break;
                        }
                    }
                    if !closed {
                        return Err(LexicalError {
                            kind: LexicalErrorKind::UnclosedComment,
                            span: Span::from_range(start..self.source.len()),
                        });
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    pub fn next_token(&mut self) -> Result<Token, LexicalError> {
        self.skip_trivia()?;

        let Some((start, c)) = self.chars.next() else {
            return Ok(Token {
                kind: TokenKind::Eof,
                span: Span::new(self.source.len() as u32, 0),
            });
        };

        match c {
            // Single character tokens
            '(' => self.token(TokenKind::LeftParenthesis, start),
            ')' => self.token(TokenKind::RightParenthesis, start),
            '{' => self.token(TokenKind::LeftBrace, start),
            '}' => self.token(TokenKind::RightBrace, start),
            '[' => self.token(TokenKind::LeftBracket, start),
            ']' => self.token(TokenKind::RightBracket, start),
            ',' => self.token(TokenKind::Comma, start),
            '.' => self.token(TokenKind::Dot, start),
            ';' => self.token(TokenKind::Semicolon, start),
            ':' => self.token(TokenKind::Colon, start),
            '+' => self.token(TokenKind::Plus, start),
            '*' => self.token(TokenKind::Star, start),
            '/' => self.token(TokenKind::Slash, start),
            '^' => self.token(TokenKind::Caret, start),
            // One or two character tokens
            '-' => match self.eat_if('>') {
                true => self.token(TokenKind::Arrow, start),
                false => self.token(TokenKind::Minus, start),
            },
            '!' => match self.eat_if('=') {
                true => self.token(TokenKind::BangEqual, start),
                false => self.token(TokenKind::Bang, start),
            },
            '=' => match self.eat_if('=') {
                true => self.token(TokenKind::EqualEqual, start),
                false => self.token(TokenKind::Equal, start),
            },
            '<' => match self.eat_if('=') {
                true => self.token(TokenKind::LessThanEqual, start),
                false => self.token(TokenKind::LessThan, start),
            },
            '>' => match self.eat_if('=') {
                true => self.token(TokenKind::GreaterThanEqual, start),
                false => self.token(TokenKind::GreaterThan, start),
            },
            '&' | '|' => {
                if self.eat_if(c) {
                    let kind = if c == '&' {
                        TokenKind::AndAnd
                    } else {
                        TokenKind::OrOr
                    };
                    self.token(kind, start)
                } else {
                    Err(LexicalError {
                        kind: LexicalErrorKind::Incomplete {
                            expected: c,
                            after: c,
                        },
                        span: Span::from_range(start..start + 1),
                    })
                }
            }
            '\'' | '"' => self.lex_string(start, c),
            '0'..='9' => self.lex_number(start),
            'a'..='z' | 'A'..='Z' | '_' => self.lex_ident_or_keyword(start),
            _ => Err(LexicalError {
                kind: LexicalErrorKind::Unrecognized(c),
                span: Span::from_range(start..start + c.len_utf8()),
            }),
        }
    }

    fn lex_string(&mut self, start: usize, quote: char) -> Result<Token, LexicalError> {
        while let Some((_, c)) = self.chars.next() {
            if c == '\\' {
                self.chars.next();
            } else if c == quote {
                return self.token(TokenKind::StringLiteral, start);
            }
        }
        Err(LexicalError {
            kind: LexicalErrorKind::UnclosedString,
            span: Span::from_range(start..self.source.len()),
        })
    }

    fn lex_number(&mut self, start: usize) -> Result<Token, LexicalError> {
        while self.chars.next_if(|(_, c)| c.is_ascii_digit()).is_some() {}

        // Only consume the dot when a digit follows, so `5.round()` stays a member call.
        let mut lookahead = self.chars.clone();
        if let (Some((_, '.')), Some((_, digit))) = (lookahead.next(), lookahead.next()) {
            if digit.is_ascii_digit() {
                self.chars.next();
                while self.chars.next_if(|(_, c)| c.is_ascii_digit()).is_some() {}
            }
        }
        self.token(TokenKind::NumericLiteral, start)
    }

    fn lex_ident_or_keyword(&mut self, start: usize) -> Result<Token, LexicalError> {
        while self
            .chars
            .next_if(|(_, c)| c.is_ascii_alphanumeric() || *c == '_')
            .is_some()
        {}
        let end = self.offset();
        let lexeme = &self.source[start..end];
        let kind = KEYWORD_HASHMAP
            .get(lexeme)
            .cloned()
            .unwrap_or(TokenKind::Ident);
        self.token(kind, start)
    }
}
