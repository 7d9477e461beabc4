use proptest::prelude::*;

use arucas::lexer::{
    formatter::{BasicFormatter, ToFormatter, TokenFormatter},
    Lexer, LexicalErrorKind, Token, TokenKind,
};

fn check(input: &str, expected: &[&str]) {
    let mut scanner = Lexer::new(input);
    let formatter: BasicFormatter = scanner.create_formatter();
    let mut lines = Vec::new();
    loop {
        match scanner.next_token() {
            Ok(token) => {
                lines.push(formatter.format(&token));
                if matches!(token.kind, TokenKind::Eof) {
                    break;
                }
            }
            Err(error) => {
                lines.push(formatter.format_lexical_error(&error));
            }
        }
    }

    assert_eq!(lines, expected, "Failed to lex {input:?}");
}

#[test]
fn smoke_test() {
    check("", &["1:1 EOF"]);
}

#[test]
fn assignment_statement() {
    check(
        "var x = 5;",
        &["1:1 var", "1:5 IDENTIFIER x", "1:7 =", "1:9 NUMBER 5", "1:10 ;", "1:11 EOF"],
    );
}

#[test]
fn positions_span_lines() {
    check("a\n'b'", &["1:1 IDENTIFIER a", "2:1 STRING 'b'", "2:4 EOF"]);
}

#[test]
fn two_character_operators() {
    check(
        "-> == != <= >= && ||",
        &[
            "1:1 ->", "1:4 ==", "1:7 !=", "1:10 <=", "1:13 >=", "1:16 &&", "1:19 ||", "1:21 EOF",
        ],
    );
}

#[test]
fn number_followed_by_member_call() {
    check(
        "5.round() 2.5",
        &[
            "1:1 NUMBER 5",
            "1:2 .",
            "1:3 IDENTIFIER round",
            "1:8 (",
            "1:9 )",
            "1:11 NUMBER 2.5",
            "1:14 EOF",
        ],
    );
}

#[test]
fn comments_are_skipped() {
    check(
        "// line\nfoo /* block\n comment */ bar",
        &["2:1 IDENTIFIER foo", "3:13 IDENTIFIER bar", "3:16 EOF"],
    );
}

#[test]
fn unrecognized_character_is_reported_and_skipped() {
    check(
        "a # b",
        &[
            "1:1 IDENTIFIER a",
            "[line 1, column 3] Error: Unrecognized character '#'",
            "1:5 IDENTIFIER b",
            "1:6 EOF",
        ],
    );
}

#[test]
fn lone_ampersand_is_incomplete() {
    let mut scanner = Lexer::new("a & b");
    assert!(scanner.next_token().is_ok());
    let error = scanner.next_token().unwrap_err();
    assert_eq!(
        error.kind,
        LexicalErrorKind::Incomplete {
            expected: '&',
            after: '&'
        }
    );
}

#[test]
fn unterminated_string_and_comment() {
    let error = Lexer::new("'abc").next_token().unwrap_err();
    assert_eq!(error.kind, LexicalErrorKind::UnclosedString);

    let error = Lexer::new("/* abc").next_token().unwrap_err();
    assert_eq!(error.kind, LexicalErrorKind::UnclosedComment);
}

#[test]
fn escaped_quote_does_not_close_string() {
    check(r#""a\"b""#, &[r#"1:1 STRING "a\"b""#, "1:7 EOF"]);
}

// Property-based tests

fn symbol_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("(".to_string()),
        Just(")".to_string()),
        Just("{".to_string()),
        Just("}".to_string()),
        Just("[".to_string()),
        Just("]".to_string()),
        Just(",".to_string()),
        Just(".".to_string()),
        Just(":".to_string()),
        Just("->".to_string()),
        Just("-".to_string()),
        Just("+".to_string()),
        Just(";".to_string()),
        Just("*".to_string()),
        Just("^".to_string()),
        Just("!".to_string()),
        Just("!=".to_string()),
        Just("=".to_string()),
        Just("==".to_string()),
        Just("<".to_string()),
        Just("<=".to_string()),
        Just(">".to_string()),
        Just(">=".to_string()),
        Just("/".to_string()),
        Just("&&".to_string()),
        Just("||".to_string()),
    ]
}

fn numeric_literal_strategy() -> impl Strategy<Value = String> {
    prop_oneof!["[0-9]+", "[0-9]+\\.[0-9]+"]
}

fn string_literal_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        "[^\"\\\\]*".prop_map(|s: String| format!("\"{s}\"")),
        "[^'\\\\]*".prop_map(|s: String| format!("'{s}'")),
    ]
}

fn identifier_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z_][a-zA-Z0-9_]*"
}

fn keyword_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("true".to_string()),
        Just("false".to_string()),
        Just("null".to_string()),
        Just("if".to_string()),
        Just("else".to_string()),
        Just("while".to_string()),
        Just("foreach".to_string()),
        Just("switch".to_string()),
        Just("case".to_string()),
        Just("default".to_string()),
        Just("break".to_string()),
        Just("continue".to_string()),
        Just("return".to_string()),
        Just("fun".to_string()),
        Just("class".to_string()),
        Just("new".to_string()),
        Just("this".to_string()),
        Just("static".to_string()),
        Just("var".to_string()),
    ]
}

fn comment_strategy() -> impl Strategy<Value = String> {
    "[^\n]*".prop_map(|s: String| format!("//{s}\n"))
}

fn token_sequence_with_comments_strategy() -> impl Strategy<Value = String> {
    const MIN_TOKEN_COUNT: usize = 1;
    const MAX_TOKEN_COUNT: usize = 100;
    prop::collection::vec(
        prop_oneof![
            symbol_strategy(),
            numeric_literal_strategy(),
            string_literal_strategy(),
            identifier_strategy(),
            keyword_strategy(),
            comment_strategy(),
        ],
        MIN_TOKEN_COUNT..MAX_TOKEN_COUNT,
    )
    .prop_map(|tokens| tokens.join(" "))
}

fn token_sequence_without_comments_strategy() -> impl Strategy<Value = Vec<String>> {
    const MIN_TOKEN_COUNT: usize = 1;
    const MAX_TOKEN_COUNT: usize = 100;
    prop::collection::vec(
        prop_oneof![
            symbol_strategy(),
            numeric_literal_strategy(),
            string_literal_strategy(),
            identifier_strategy(),
            keyword_strategy(),
        ],
        MIN_TOKEN_COUNT..MAX_TOKEN_COUNT,
    )
}

proptest! {
    #[test]
    fn lexer_handles_valid_tokens_without_comments(input in token_sequence_without_comments_strategy()) {
        // Add 1 to include EOF token
        let expected_num_tokens = input.len() + 1;
        let input = input.join(" ");
        let mut scanner = Lexer::new(&input);
        let mut num_tokens = 0;
        loop {
            num_tokens += 1;
            match scanner.next_token() {
                Ok(Token { kind: TokenKind::Eof, .. }) => break,
                token => prop_assert!(token.is_ok()),
            }
        }
        prop_assert_eq!(num_tokens, expected_num_tokens);
    }

    #[test]
    fn lexer_handles_valid_tokens_with_comments(input in token_sequence_with_comments_strategy()) {
        let mut scanner = Lexer::new(&input);
        loop {
            match scanner.next_token() {
                Ok(Token { kind: TokenKind::Eof, .. }) => break,
                token => prop_assert!(token.is_ok()),
            }
        }
    }
}
