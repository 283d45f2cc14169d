use chtl_compiler::lexer::LexMode;
use chtl_compiler::{Lexer, Position, TokenKind, tokenize};

fn kinds(src: &str) -> Vec<TokenKind> {
    tokenize(src, "t.chtl").unwrap().into_iter().map(|t| t.kind).collect()
}

#[test]
fn element_with_text_block() {
    use TokenKind::*;
    assert_eq!(
        kinds(r#"div { text { "Hi" } }"#),
        [Identifier, LeftBrace, Text, LeftBrace, StringLiteral, RightBrace, RightBrace]
    );
}

#[test]
fn bracket_and_at_keywords() {
    use TokenKind::*;
    assert_eq!(
        kinds("[Template] @Style Btn { }"),
        [Template, AtStyle, Identifier, LeftBrace, RightBrace]
    );
    // unknown bracket words are ordinary brackets
    assert_eq!(kinds("[Name]"), [LeftBracket, Identifier, RightBracket]);
    // unknown at-words stay identifiers
    assert_eq!(kinds("@Widget"), [Identifier]);
}

#[test]
fn positions_are_one_based_and_track_lines() {
    let toks = tokenize("div {\n  span { }\n}", "t.chtl").unwrap();
    let span = &toks[2];
    assert_eq!(span.lexeme, "span");
    assert_eq!((span.line, span.column, span.offset), (2, 3, 8));
}

#[test]
fn numbers_and_units_are_separate_but_adjacent() {
    let toks = tokenize("10px 1em 2e3", "t.chtl").unwrap();
    let lexemes: Vec<_> = toks.iter().map(|t| t.lexeme.as_str()).collect();
    assert_eq!(lexemes, ["10", "px", "1", "em", "2e3"]);
    assert!(toks[0].is_adjacent_to(&toks[1]));
    assert!(!toks[1].is_adjacent_to(&toks[2]));
}

#[test]
fn string_escapes_are_processed() {
    let toks = tokenize(r#"'it\'s' "a\"b""#, "t.chtl").unwrap();
    assert_eq!(toks[0].lexeme, "it's");
    assert_eq!(toks[1].lexeme, "a\"b");
}

#[test]
fn comments_are_tokens() {
    use TokenKind::*;
    let toks = tokenize("// line\n/* block */\n-- shown", "t.chtl").unwrap();
    let got: Vec<_> = toks.iter().map(|t| (t.kind, t.lexeme.as_str())).collect();
    assert_eq!(got, [(LineComment, "line"), (BlockComment, "block"), (GeneratorComment, "shown")]);
}

#[test]
fn css_mode_keeps_custom_properties() {
    let toks = Lexer::new("--main: #fff;", Position::START, "t.chtl")
        .with_mode(LexMode::Css)
        .tokenize()
        .unwrap();
    assert_eq!(toks[0].kind, TokenKind::Identifier);
    assert_eq!(toks[0].lexeme, "--main");
    assert_eq!(toks[2].kind, TokenKind::UnquotedLiteral);
    assert_eq!(toks[2].lexeme, "#fff");
}

#[test]
fn origin_body_is_one_raw_token() {
    use TokenKind::*;
    let toks = tokenize("[Origin] @Html { <b>{x}</b> }", "t.chtl").unwrap();
    let got: Vec<_> = toks.iter().map(|t| t.kind).collect();
    assert_eq!(got, [Origin, AtHtml, LeftBrace, RawBlock, RightBrace]);
    assert_eq!(toks[3].lexeme, " <b>{x}</b> ");
}

#[test]
fn arrow_is_one_token() {
    use TokenKind::*;
    assert_eq!(kinds("a -> b;"), [Identifier, Arrow, Identifier, Semicolon]);
}

#[test]
fn unterminated_string_is_an_error() {
    let err = tokenize("text { \"open }", "t.chtl").unwrap_err();
    assert_eq!((err.line, err.column), (1, 8));
}
