mod error;
pub mod node;
pub mod operator;

use crate::{
    lexer::{Lexer, Span, Token, TokenKind},
    source::SourceFile,
};
pub use error::{ParserError, ParserErrorKind};
use node::{CaseLiteral, ClassDecl, FieldDecl, FunctionDecl, Node, NodeKind, SwitchCase};
use operator::{BinaryOperator, UnaryOperator, ASSIGNMENT_BINDING_POWER};
use std::sync::Arc;

/// A parsed source file.
#[derive(Debug)]
pub struct Program {
    pub body: Node,
    pub file: Arc<SourceFile>,
}

pub struct Parser<'src> {
    lexer: Lexer<'src>,
    lookahead: Option<Token>,
    file: Arc<SourceFile>,
}

impl<'src> Parser<'src> {
    pub fn new(file: &'src Arc<SourceFile>) -> Self {
        Self {
            lexer: Lexer::new(file.text()),
            lookahead: None,
            file: Arc::clone(file),
        }
    }

    fn peek(&mut self) -> Result<Token, ParserError> {
        match self.lookahead {
            Some(token) => Ok(token),
            None => {
                let token = self.lexer.next_token()?;
                self.lookahead = Some(token);
                Ok(token)
            }
        }
    }

    fn next_token(&mut self) -> Result<Token, ParserError> {
        match self.lookahead.take() {
            Some(token) => Ok(token),
            None => Ok(self.lexer.next_token()?),
        }
    }

    fn expect(&mut self, expected: TokenKind) -> Result<Token, ParserError> {
        let next_token = self.next_token()?;
        if next_token.kind != expected {
            Err(ParserError {
                span: next_token.span,
                kind: ParserErrorKind::UnexpectedToken {
                    actual: next_token.kind,
                    expected,
                },
            })
        } else {
            Ok(next_token)
        }
    }

    fn eat_if(&mut self, next: TokenKind) -> Result<Option<Token>, ParserError> {
        let next_token = self.peek()?;
        if next_token.kind != next {
            Ok(None)
        } else {
            self.lookahead = None;
            Ok(Some(next_token))
        }
    }

    fn lexeme(&self, token: &Token) -> &'src str {
        self.lexer.get_lexeme(&token.span).unwrap_or_default()
    }
}

// Parse program/statements
impl<'src> Parser<'src> {
    pub fn parse(mut self) -> Result<Program, ParserError> {
        let mut statements = Vec::new();
        while self.peek()?.kind != TokenKind::Eof {
            statements.push(self.parse_statement()?);
        }
        let span = Span::from_range(0..self.file.text().len());
        Ok(Program {
            body: Node::new(NodeKind::Statements(statements), span),
            file: self.file,
        })
    }

    fn parse_statement(&mut self) -> Result<Node, ParserError> {
        let first = self.peek()?;
        match first.kind {
            TokenKind::LeftBrace => {
                let (body, span) = self.parse_block()?;
                Ok(Node::new(NodeKind::Block(body), span))
            }
            TokenKind::KeywordIf => self.parse_if(),
            TokenKind::KeywordWhile => self.parse_while(),
            TokenKind::KeywordForeach => self.parse_foreach(),
            TokenKind::KeywordSwitch => self.parse_switch(),
            TokenKind::KeywordClass => self.parse_class(),
            TokenKind::KeywordBreak | TokenKind::KeywordContinue => {
                let _ = self.next_token()?;
                let end = self.expect(TokenKind::Semicolon)?;
                let kind = match first.kind {
                    TokenKind::KeywordBreak => NodeKind::Break,
                    _ => NodeKind::Continue,
                };
                Ok(Node::new(kind, first.span.merge(&end.span)))
            }
            TokenKind::KeywordReturn => {
                let _ = self.next_token()?;
                let value = match self.peek()?.kind {
                    TokenKind::Semicolon => None,
                    _ => Some(Box::new(self.parse_expression()?)),
                };
                let end = self.expect(TokenKind::Semicolon)?;
                Ok(Node::new(NodeKind::Return(value), first.span.merge(&end.span)))
            }
            TokenKind::KeywordFun => {
                let _ = self.next_token()?;
                if let Some(name) = self.eat_if(TokenKind::Ident)? {
                    let name = self.lexeme(&name).into();
                    let decl = self.parse_function_rest(Some(name), first.span)?;
                    let span = decl.span;
                    return Ok(Node::new(NodeKind::Function(decl), span));
                }
                let decl = self.parse_function_rest(None, first.span)?;
                let span = decl.span;
                let lambda = Node::new(NodeKind::Lambda(decl), span);
                let expr = self.parse_infix(lambda, 0)?;
                self.expect(TokenKind::Semicolon)?;
                Ok(expr)
            }
            TokenKind::Semicolon => {
                let _ = self.next_token()?;
                Ok(Node::new(NodeKind::Statements(Vec::new()), first.span))
            }
            TokenKind::Eof => Err(ParserError {
                kind: ParserErrorKind::UnexpectedEof,
                span: first.span,
            }),
            _ => {
                let expr = self.parse_expression()?;
                self.expect(TokenKind::Semicolon)?;
                Ok(expr)
            }
        }
    }

    fn parse_block(&mut self) -> Result<(Vec<Node>, Span), ParserError> {
        let start = self.expect(TokenKind::LeftBrace)?;
        let mut body = Vec::new();
        loop {
            if let Some(end) = self.eat_if(TokenKind::RightBrace)? {
                return Ok((body, start.span.merge(&end.span)));
            }
            body.push(self.parse_statement()?);
        }
    }

    fn parse_condition(&mut self) -> Result<Node, ParserError> {
        self.expect(TokenKind::LeftParenthesis)?;
        let condition = self.parse_expression()?;
        self.expect(TokenKind::RightParenthesis)?;
        Ok(condition)
    }

    fn parse_if(&mut self) -> Result<Node, ParserError> {
        let start = self.expect(TokenKind::KeywordIf)?;
        let condition = self.parse_condition()?;
        let success = self.parse_statement()?;
        let mut span = start.span.merge(&success.span);
        let mut branches = vec![(condition, success)];
        let mut otherwise = None;

        while self.eat_if(TokenKind::KeywordElse)?.is_some() {
            if self.eat_if(TokenKind::KeywordIf)?.is_some() {
                let condition = self.parse_condition()?;
                let success = self.parse_statement()?;
                span = span.merge(&success.span);
                branches.push((condition, success));
            } else {
                let failure = self.parse_statement()?;
                span = span.merge(&failure.span);
                otherwise = Some(Box::new(failure));
                break;
            }
        }

        Ok(Node::new(NodeKind::If { branches, otherwise }, span))
    }

    fn parse_while(&mut self) -> Result<Node, ParserError> {
        let start = self.expect(TokenKind::KeywordWhile)?;
        let condition = self.parse_condition()?;
        let body = self.parse_statement()?;
        let span = start.span.merge(&body.span);
        Ok(Node::new(
            NodeKind::While {
                condition: Box::new(condition),
                body: Box::new(body),
            },
            span,
        ))
    }

    fn parse_foreach(&mut self) -> Result<Node, ParserError> {
        let start = self.expect(TokenKind::KeywordForeach)?;
        self.expect(TokenKind::LeftParenthesis)?;
        let variable = self.expect(TokenKind::Ident)?;
        let variable = self.lexeme(&variable).into();
        self.expect(TokenKind::Colon)?;
        let iterable = self.parse_expression()?;
        self.expect(TokenKind::RightParenthesis)?;
        let body = self.parse_statement()?;
        let span = start.span.merge(&body.span);
        Ok(Node::new(
            NodeKind::Foreach {
                variable,
                iterable: Box::new(iterable),
                body: Box::new(body),
            },
            span,
        ))
    }

    fn parse_switch(&mut self) -> Result<Node, ParserError> {
        let start = self.expect(TokenKind::KeywordSwitch)?;
        let subject = self.parse_condition()?;
        self.expect(TokenKind::LeftBrace)?;

        let mut cases = Vec::new();
        let mut default = None;
        let mut seen: Vec<CaseLiteral> = Vec::new();
        let end = loop {
            let token = self.next_token()?;
            match token.kind {
                TokenKind::RightBrace => break token,
                TokenKind::KeywordCase => {
                    let mut values = Vec::new();
                    loop {
                        let (literal, span) = self.parse_case_literal()?;
                        if let Some(first) = seen.first() {
                            if std::mem::discriminant(first) != std::mem::discriminant(&literal) {
                                return Err(ParserError {
                                    kind: ParserErrorKind::MixedCaseTypes,
                                    span,
                                });
                            }
                        }
                        if seen.contains(&literal) {
                            let text = match &literal {
                                CaseLiteral::Number(v) => v.to_string(),
                                CaseLiteral::String(v) => v.to_string(),
                            };
                            return Err(ParserError {
                                kind: ParserErrorKind::DuplicateCase(text),
                                span,
                            });
                        }
                        seen.push(literal.clone());
                        values.push(literal);
                        if self.eat_if(TokenKind::Comma)?.is_none() {
                            break;
                        }
                    }
                    self.expect(TokenKind::Arrow)?;
                    let body = self.parse_statement()?;
                    cases.push(SwitchCase { values, body });
                }
                TokenKind::KeywordDefault => {
                    if default.is_some() {
                        return Err(ParserError {
                            kind: ParserErrorKind::DuplicateDefault,
                            span: token.span,
                        });
                    }
                    self.expect(TokenKind::Arrow)?;
                    default = Some(Box::new(self.parse_statement()?));
                }
                kind => {
                    return Err(ParserError {
                        kind: ParserErrorKind::InvalidSwitchArm(kind),
                        span: token.span,
                    })
                }
            }
        };

        Ok(Node::new(
            NodeKind::Switch {
                subject: Box::new(subject),
                cases,
                default,
            },
            start.span.merge(&end.span),
        ))
    }

    fn parse_case_literal(&mut self) -> Result<(CaseLiteral, Span), ParserError> {
        let token = self.next_token()?;
        match token.kind {
            TokenKind::NumericLiteral => {
                let value = self.parse_number(&token)?;
                Ok((CaseLiteral::Number(value), token.span))
            }
            TokenKind::Minus => {
                let number = self.expect(TokenKind::NumericLiteral)?;
                let value = self.parse_number(&number)?;
                Ok((CaseLiteral::Number(-value), token.span.merge(&number.span)))
            }
            TokenKind::StringLiteral => Ok((
                CaseLiteral::String(unescape(self.lexeme(&token)).into()),
                token.span,
            )),
            _ => Err(ParserError {
                kind: ParserErrorKind::InvalidCaseLiteral,
                span: token.span,
            }),
        }
    }

    fn parse_class(&mut self) -> Result<Node, ParserError> {
        let start = self.expect(TokenKind::KeywordClass)?;
        let name = self.expect(TokenKind::Ident)?;
        let name: compact_str::CompactString = self.lexeme(&name).into();
        self.expect(TokenKind::LeftBrace)?;

        let mut decl = ClassDecl {
            name: name.clone(),
            span: start.span,
            constructors: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            static_fields: Vec::new(),
            static_methods: Vec::new(),
            file: Arc::clone(&self.file),
        };

        let end = loop {
            let token = self.next_token()?;
            match token.kind {
                TokenKind::RightBrace => break token,
                TokenKind::KeywordStatic => {
                    let next = self.next_token()?;
                    match next.kind {
                        TokenKind::KeywordVar => {
                            decl.static_fields.push(self.parse_field(token.span)?)
                        }
                        TokenKind::KeywordFun => {
                            decl.static_methods.push(self.parse_method(token.span)?)
                        }
                        kind => {
                            return Err(ParserError {
                                kind: ParserErrorKind::InvalidClassMember(kind),
                                span: next.span,
                            })
                        }
                    }
                }
                TokenKind::KeywordVar => decl.fields.push(self.parse_field(token.span)?),
                TokenKind::KeywordFun => decl.methods.push(self.parse_method(token.span)?),
                TokenKind::Ident => {
                    let actual = self.lexeme(&token);
                    if actual != name.as_str() {
                        return Err(ParserError {
                            kind: ParserErrorKind::InvalidConstructorName {
                                actual: actual.to_string(),
                                class: name.to_string(),
                            },
                            span: token.span,
                        });
                    }
                    let constructor = self.parse_function_rest(Some(name.clone()), token.span)?;
                    decl.constructors.push(constructor);
                }
                kind => {
                    return Err(ParserError {
                        kind: ParserErrorKind::InvalidClassMember(kind),
                        span: token.span,
                    })
                }
            }
        };

        decl.span = start.span.merge(&end.span);
        let span = decl.span;
        Ok(Node::new(NodeKind::Class(Arc::new(decl)), span))
    }

    fn parse_field(&mut self, start: Span) -> Result<FieldDecl, ParserError> {
        let name = self.expect(TokenKind::Ident)?;
        let initializer = match self.eat_if(TokenKind::Equal)? {
            Some(_) => Some(self.parse_expression()?),
            None => None,
        };
        let end = self.expect(TokenKind::Semicolon)?;
        Ok(FieldDecl {
            name: self.lexeme(&name).into(),
            initializer,
            span: start.merge(&end.span),
        })
    }

    fn parse_method(&mut self, start: Span) -> Result<Arc<FunctionDecl>, ParserError> {
        let name = self.expect(TokenKind::Ident)?;
        let name = self.lexeme(&name).into();
        self.parse_function_rest(Some(name), start)
    }

    /// Parses the parameter list and body that follow a function's name.
    fn parse_function_rest(
        &mut self,
        name: Option<compact_str::CompactString>,
        start: Span,
    ) -> Result<Arc<FunctionDecl>, ParserError> {
        self.expect(TokenKind::LeftParenthesis)?;
        let mut parameters = Vec::new();
        if self.eat_if(TokenKind::RightParenthesis)?.is_none() {
            loop {
                let parameter = self.expect(TokenKind::Ident)?;
                parameters.push(self.lexeme(&parameter).into());
                if self.eat_if(TokenKind::Comma)?.is_none() {
                    break;
                }
            }
            self.expect(TokenKind::RightParenthesis)?;
        }
        let (body, span) = self.parse_block()?;
        Ok(Arc::new(FunctionDecl {
            name,
            parameters,
            body,
            span: start.merge(&span),
            file: Arc::clone(&self.file),
        }))
    }
}

// Pratt parser for expressions
impl<'src> Parser<'src> {
    pub fn parse_expression(&mut self) -> Result<Node, ParserError> {
        self.parse_expression_pratt(0)
    }

    fn parse_expression_pratt(&mut self, min_bp: u8) -> Result<Node, ParserError> {
        let lhs = self.expect_left_expression()?;
        self.parse_infix(lhs, min_bp)
    }

    fn peek_binary_operator(&mut self) -> Result<Option<BinaryOperator>, ParserError> {
        let token = self.peek()?;

        let operator = match token.kind {
            TokenKind::Caret => BinaryOperator::Power,
            TokenKind::Star => BinaryOperator::Multiply,
            TokenKind::Slash => BinaryOperator::Divide,
            TokenKind::Plus => BinaryOperator::Add,
            TokenKind::Minus => BinaryOperator::Subtract,
            TokenKind::LessThan => BinaryOperator::LessThan,
            TokenKind::LessThanEqual => BinaryOperator::LessThanEqual,
            TokenKind::GreaterThan => BinaryOperator::GreaterThan,
            TokenKind::GreaterThanEqual => BinaryOperator::GreaterThanEqual,
            TokenKind::EqualEqual => BinaryOperator::Equal,
            TokenKind::BangEqual => BinaryOperator::NotEqual,
            TokenKind::AndAnd => BinaryOperator::And,
            TokenKind::OrOr => BinaryOperator::Or,
            _ => return Ok(None),
        };
        Ok(Some(operator))
    }

    fn parse_number(&self, token: &Token) -> Result<f64, ParserError> {
        let lexeme = self.lexeme(token);
        lexeme.parse().map_err(|_| ParserError {
            kind: ParserErrorKind::InvalidNumber(lexeme.to_string()),
            span: token.span,
        })
    }

    /// Parses comma separated expressions up to and including `close`.
    fn parse_arguments(&mut self, close: TokenKind) -> Result<(Vec<Node>, Token), ParserError> {
        let mut arguments = Vec::new();
        if let Some(end) = self.eat_if(close)? {
            return Ok((arguments, end));
        }
        loop {
            arguments.push(self.parse_expression_pratt(0)?);
            if self.eat_if(TokenKind::Comma)?.is_none() {
                break;
            }
        }
        let end = self.expect(close)?;
        Ok((arguments, end))
    }

    fn expect_left_expression(&mut self) -> Result<Node, ParserError> {
        let token = self.next_token()?;
        let span = token.span;

        let node = match token.kind {
            TokenKind::NumericLiteral => {
                Node::new(NodeKind::Number(self.parse_number(&token)?), span)
            }
            TokenKind::StringLiteral => Node::new(
                NodeKind::String(unescape(self.lexeme(&token)).into()),
                span,
            ),
            TokenKind::KeywordTrue => Node::new(NodeKind::Boolean(true), span),
            TokenKind::KeywordFalse => Node::new(NodeKind::Boolean(false), span),
            TokenKind::KeywordNull => Node::new(NodeKind::Null, span),
            TokenKind::KeywordThis => Node::new(NodeKind::This, span),
            TokenKind::Ident => Node::new(NodeKind::Identifier(self.lexeme(&token).into()), span),
            // Unary operators
            TokenKind::Minus | TokenKind::Bang => {
                let operator = match token.kind {
                    TokenKind::Minus => UnaryOperator::Minus,
                    _ => UnaryOperator::Not,
                };
                let operand = self.parse_expression_pratt(operator.get_binding_power())?;
                let span = span.merge(&operand.span);
                Node::new(
                    NodeKind::Unary {
                        operator,
                        operand: Box::new(operand),
                    },
                    span,
                )
            }
            // Bracketed expression
            TokenKind::LeftParenthesis => {
                let inner = self.parse_expression_pratt(0)?;
                self.expect(TokenKind::RightParenthesis)?;
                inner
            }
            TokenKind::LeftBracket => {
                let (elements, end) = self.parse_arguments(TokenKind::RightBracket)?;
                Node::new(NodeKind::List(elements), span.merge(&end.span))
            }
            TokenKind::LeftBrace => {
                let mut entries = Vec::new();
                let end = match self.eat_if(TokenKind::RightBrace)? {
                    Some(end) => end,
                    None => loop {
                        let key = self.parse_expression_pratt(0)?;
                        self.expect(TokenKind::Colon)?;
                        let value = self.parse_expression_pratt(0)?;
                        entries.push((key, value));
                        if self.eat_if(TokenKind::Comma)?.is_none() {
                            break self.expect(TokenKind::RightBrace)?;
                        }
                    },
                };
                Node::new(NodeKind::Map(entries), span.merge(&end.span))
            }
            TokenKind::KeywordNew => {
                let class = self.expect(TokenKind::Ident)?;
                self.expect(TokenKind::LeftParenthesis)?;
                let (arguments, end) = self.parse_arguments(TokenKind::RightParenthesis)?;
                Node::new(
                    NodeKind::New {
                        class: self.lexeme(&class).into(),
                        arguments,
                    },
                    span.merge(&end.span),
                )
            }
            TokenKind::KeywordFun => {
                let decl = self.parse_function_rest(None, span)?;
                let span = decl.span;
                Node::new(NodeKind::Lambda(decl), span)
            }
            TokenKind::Eof => {
                return Err(ParserError {
                    kind: ParserErrorKind::UnexpectedEof,
                    span,
                })
            }
            kind => {
                return Err(ParserError {
                    kind: ParserErrorKind::NonExpression(kind),
                    span,
                })
            }
        };
        Ok(node)
    }

    fn parse_infix(&mut self, mut lhs: Node, min_bp: u8) -> Result<Node, ParserError> {
        loop {
            let token = self.peek()?;
            match token.kind {
                // Postfix operators always bind tightest
                TokenKind::LeftParenthesis => {
                    let _ = self.next_token()?;
                    let (arguments, end) = self.parse_arguments(TokenKind::RightParenthesis)?;
                    let span = lhs.span.merge(&end.span);
                    lhs = Node::new(
                        NodeKind::Call {
                            callee: Box::new(lhs),
                            arguments,
                        },
                        span,
                    );
                }
                TokenKind::Dot => {
                    let _ = self.next_token()?;
                    let member = self.expect(TokenKind::Ident)?;
                    let name = self.lexeme(&member).into();
                    if self.eat_if(TokenKind::LeftParenthesis)?.is_some() {
                        let (arguments, end) =
                            self.parse_arguments(TokenKind::RightParenthesis)?;
                        let span = lhs.span.merge(&end.span);
                        lhs = Node::new(
                            NodeKind::MemberCall {
                                receiver: Box::new(lhs),
                                member: name,
                                arguments,
                            },
                            span,
                        );
                    } else {
                        let span = lhs.span.merge(&member.span);
                        lhs = Node::new(
                            NodeKind::Member {
                                receiver: Box::new(lhs),
                                member: name,
                            },
                            span,
                        );
                    }
                }
                TokenKind::Equal => {
                    let (lbp, rbp) = ASSIGNMENT_BINDING_POWER;
                    if lbp < min_bp {
                        break;
                    }
                    let _ = self.next_token()?;
                    let value = self.parse_expression_pratt(rbp)?;
                    let span = lhs.span.merge(&value.span);
                    let kind = match lhs.kind {
                        NodeKind::Identifier(name) => NodeKind::Assign {
                            name,
                            value: Box::new(value),
                        },
                        NodeKind::Member { receiver, member } => NodeKind::MemberAssign {
                            receiver,
                            member,
                            value: Box::new(value),
                        },
                        _ => {
                            return Err(ParserError {
                                kind: ParserErrorKind::InvalidLValue,
                                span: lhs.span,
                            })
                        }
                    };
                    lhs = Node::new(kind, span);
                }
                _ => {
                    let Some(operator) = self.peek_binary_operator()? else {
                        break;
                    };
                    let (lbp, rbp) = operator.get_binding_power();
                    if lbp < min_bp {
                        break;
                    }
                    let _ = self.next_token()?;
                    let rhs = self.parse_expression_pratt(rbp)?;
                    let span = lhs.span.merge(&rhs.span);
                    lhs = Node::new(
                        NodeKind::Binary {
                            operator,
                            lhs: Box::new(lhs),
                            rhs: Box::new(rhs),
                        },
                        span,
                    );
                }
            }
        }
        Ok(lhs)
    }
}

/// Strips the quotes from a string literal and resolves its escapes.
fn unescape(lexeme: &str) -> String {
    let inner = lexeme
        .get(1..lexeme.len().saturating_sub(1))
        .unwrap_or_default();
    let mut output = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            output.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => output.push('\n'),
            Some('t') => output.push('\t'),
            Some('r') => output.push('\r'),
            Some(c @ ('\\' | '\'' | '"')) => output.push(c),
            Some(c) => {
                output.push('\\');
                output.push(c);
            }
            None => output.push('\\'),
        }
    }
    output
}

#[cfg(test)]
mod tests {
    use super::unescape;

    #[test]
    fn unescape_resolves_known_escapes() {
        assert_eq!(unescape(r#"'a\nb'"#), "a\nb");
        assert_eq!(unescape(r#""it\'s""#), "it's");
        assert_eq!(unescape(r#"'\q'"#), "\\q");
    }
}
