mod span;

pub use span::Span;
use std::collections::HashMap;
use std::fmt::Display;
use std::sync::LazyLock;

/// The hashmap for keywords
pub static KEYWORD_HASHMAP: LazyLock<HashMap<&'static str, TokenKind>> = LazyLock::new(|| {
    let mut map = HashMap::new();
    map.insert("true", TokenKind::KeywordTrue);
    map.insert("false", TokenKind::KeywordFalse);
    map.insert("null", TokenKind::KeywordNull);
    map.insert("if", TokenKind::KeywordIf);
    map.insert("else", TokenKind::KeywordElse);
    map.insert("while", TokenKind::KeywordWhile);
    map.insert("foreach", TokenKind::KeywordForeach);
    map.insert("switch", TokenKind::KeywordSwitch);
    map.insert("case", TokenKind::KeywordCase);
    map.insert("default", TokenKind::KeywordDefault);
    map.insert("break", TokenKind::KeywordBreak);
    map.insert("continue", TokenKind::KeywordContinue);
    map.insert("return", TokenKind::KeywordReturn);
    map.insert("fun", TokenKind::KeywordFun);
    map.insert("class", TokenKind::KeywordClass);
    map.insert("new", TokenKind::KeywordNew);
    map.insert("this", TokenKind::KeywordThis);
    map.insert("static", TokenKind::KeywordStatic);
    map.insert("var", TokenKind::KeywordVar);
    map
});

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TokenKind {
    // Brackets
    LeftParenthesis,
    RightParenthesis,
    LeftBrace,
    RightBrace,
    LeftBracket,
    RightBracket,
    // Punctuation
    Comma,
    Dot,
    Semicolon,
    Colon,
    Arrow,
    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    Bang,
    BangEqual,
    Equal,
    EqualEqual,
    LessThan,
    LessThanEqual,
    GreaterThan,
    GreaterThanEqual,
    AndAnd,
    OrOr,

    // Literals
    NumericLiteral,
    StringLiteral,
    Ident,

    // Keywords
    KeywordTrue,
    KeywordFalse,
    KeywordNull,
    KeywordIf,
    KeywordElse,
    KeywordWhile,
    KeywordForeach,
    KeywordSwitch,
    KeywordCase,
    KeywordDefault,
    KeywordBreak,
    KeywordContinue,
    KeywordReturn,
    KeywordFun,
    KeywordClass,
    KeywordNew,
    KeywordThis,
    KeywordStatic,
    KeywordVar,

    // End of file.
    Eof,
}

impl Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            TokenKind::LeftParenthesis => "(",
            TokenKind::RightParenthesis => ")",
            TokenKind::LeftBrace => "{",
            TokenKind::RightBrace => "}",
            TokenKind::LeftBracket => "[",
            TokenKind::RightBracket => "]",
            TokenKind::Comma => ",",
            TokenKind::Dot => ".",
            TokenKind::Semicolon => ";",
            TokenKind::Colon => ":",
            TokenKind::Arrow => "->",
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Star => "*",
            TokenKind::Slash => "/",
            TokenKind::Caret => "^",
            TokenKind::Bang => "!",
            TokenKind::BangEqual => "!=",
            TokenKind::Equal => "=",
            TokenKind::EqualEqual => "==",
            TokenKind::LessThan => "<",
            TokenKind::LessThanEqual => "<=",
            TokenKind::GreaterThan => ">",
            TokenKind::GreaterThanEqual => ">=",
            TokenKind::AndAnd => "&&",
            TokenKind::OrOr => "||",
            TokenKind::NumericLiteral => "number",
            TokenKind::StringLiteral => "string",
            TokenKind::Ident => "identifier",
            TokenKind::KeywordTrue => "true",
            TokenKind::KeywordFalse => "false",
            TokenKind::KeywordNull => "null",
            TokenKind::KeywordIf => "if",
            TokenKind::KeywordElse => "else",
            TokenKind::KeywordWhile => "while",
            TokenKind::KeywordForeach => "foreach",
            TokenKind::KeywordSwitch => "switch",
            TokenKind::KeywordCase => "case",
            TokenKind::KeywordDefault => "default",
            TokenKind::KeywordBreak => "break",
            TokenKind::KeywordContinue => "continue",
            TokenKind::KeywordReturn => "return",
            TokenKind::KeywordFun => "fun",
            TokenKind::KeywordClass => "class",
            TokenKind::KeywordNew => "new",
            TokenKind::KeywordThis => "this",
            TokenKind::KeywordStatic => "static",
            TokenKind::KeywordVar => "var",
            TokenKind::Eof => "end of file",
        };
        write!(f, "{text}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}
