use crate::error::LexError;
use crate::scanner::{Fragment, FragmentKind};
use crate::token::{Position, Token, TokenKind};

/// Markup and CSS fragments share one token set. In CSS mode `--name` is a
/// custom property rather than a generator comment, and `//` inside
/// parentheses is part of a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LexMode {
    Markup,
    Css,
}

pub struct Lexer<'a> {
    src: &'a str,
    base: usize,
    cur: Position,
    path: &'a str,
    mode: LexMode,
    parens: usize,
    raw_pending: bool,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    /// `start` is where `src` begins in the file, so token positions are
    /// absolute.
    pub fn new(src: &'a str, start: Position, path: &'a str) -> Self {
        Lexer {
            src,
            base: start.offset,
            cur: start,
            path,
            mode: LexMode::Markup,
            parens: 0,
            raw_pending: false,
            tokens: Vec::new(),
        }
    }

    pub fn for_fragment(fragment: &'a Fragment) -> Self {
        let mode = match fragment.kind {
            FragmentKind::Css => LexMode::Css,
            _ => LexMode::Markup,
        };
        Lexer::new(&fragment.text, fragment.start, &fragment.path).with_mode(mode)
    }

    pub fn with_mode(mut self, mode: LexMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>, LexError> {
        loop {
            self.skip_whitespace();
            let Some(b) = self.byte(0) else { break };
            let token = self.next_token(b)?;
            log::trace!(target: "chtl::lexer", "{:?} {} at {}:{}", token.kind, token, token.line, token.column);
            let opens_raw = token.kind == TokenKind::LeftBrace && self.raw_pending;
            match token.kind {
                TokenKind::Origin => self.raw_pending = true,
                TokenKind::Semicolon | TokenKind::RightBrace | TokenKind::LeftBrace => {
                    self.raw_pending = false
                }
                _ => {}
            }
            self.tokens.push(token);
            if opens_raw {
                self.lex_raw_body()?;
            }
        }
        Ok(self.tokens)
    }

    fn next_token(&mut self, b: u8) -> Result<Token, LexError> {
        let start = self.cur;
        match b {
            b'/' if self.byte(1) == Some(b'/') && !(self.mode == LexMode::Css && self.parens > 0) => {
                Ok(self.line_comment(TokenKind::LineComment, start))
            }
            b'/' if self.byte(1) == Some(b'*') => self.block_comment(start),
            b'-' if self.byte(1) == Some(b'-') => match self.mode {
                LexMode::Markup => Ok(self.line_comment(TokenKind::GeneratorComment, start)),
                LexMode::Css => Ok(self.identifier(start)),
            },
            b'-' if self.byte(1) == Some(b'>') => {
                self.advance_n(2);
                Ok(Token::new(TokenKind::Arrow, "->", start, 2))
            }
            b'"' | b'\'' => self.string(b, start),
            b'0'..=b'9' => Ok(self.number(start)),
            b'@' => Ok(self.at_word(start)),
            b'[' => self.bracket(start),
            b'#' => Ok(self.hash_word(start)),
            b':' | b';' | b',' | b'.' | b'=' | b'{' | b'}' | b']' | b'(' | b')' | b'&' => {
                let kind = match b {
                    b':' => TokenKind::Colon,
                    b';' => TokenKind::Semicolon,
                    b',' => TokenKind::Comma,
                    b'.' => TokenKind::Dot,
                    b'=' => TokenKind::Equals,
                    b'{' => TokenKind::LeftBrace,
                    b'}' => TokenKind::RightBrace,
                    b']' => TokenKind::RightBracket,
                    b'(' => {
                        self.parens += 1;
                        TokenKind::LeftParen
                    }
                    b')' => {
                        self.parens = self.parens.saturating_sub(1);
                        TokenKind::RightParen
                    }
                    _ => TokenKind::Ampersand,
                };
                self.advance();
                Ok(Token::new(kind, (b as char).to_string(), start, 1))
            }
            _ => match self.peek_char() {
                Some(c) if c.is_alphabetic() || c == '_' => Ok(self.identifier(start)),
                _ => Ok(self.unquoted(start)),
            },
        }
    }

    fn line_comment(&mut self, kind: TokenKind, start: Position) -> Token {
        self.advance_n(2);
        let body_start = self.idx();
        while let Some(b) = self.byte(0) {
            if b == b'\n' { break; }
            self.advance();
        }
        let body = self.src[body_start..self.idx()].trim().to_string();
        Token::new(kind, body, start, self.cur.offset - start.offset)
    }

    fn block_comment(&mut self, start: Position) -> Result<Token, LexError> {
        self.advance_n(2);
        let body_start = self.idx();
        loop {
            match self.byte(0) {
                None => return Err(self.error("unterminated block comment", start)),
                Some(b'*') if self.byte(1) == Some(b'/') => break,
                Some(_) => self.advance(),
            }
        }
        let body = self.src[body_start..self.idx()].trim().to_string();
        self.advance_n(2);
        Ok(Token::new(TokenKind::BlockComment, body, start, self.cur.offset - start.offset))
    }

    fn string(&mut self, quote: u8, start: Position) -> Result<Token, LexError> {
        self.advance();
        let mut value = String::new();
        loop {
            let Some(c) = self.peek_char() else {
                return Err(self.error("unterminated string literal", start));
            };
            if c as u32 == quote as u32 {
                self.advance();
                break;
            }
            if c == '\\' {
                self.advance();
                let Some(esc) = self.peek_char() else {
                    return Err(self.error("unterminated string literal", start));
                };
                match esc {
                    'n' => value.push('\n'),
                    't' => value.push('\t'),
                    'r' => value.push('\r'),
                    '\\' => value.push('\\'),
                    '"' => value.push('"'),
                    '\'' => value.push('\''),
                    other => {
                        value.push('\\');
                        value.push(other);
                    }
                }
                self.advance_char();
                continue;
            }
            value.push(c);
            self.advance_char();
        }
        Ok(Token::new(TokenKind::StringLiteral, value, start, self.cur.offset - start.offset))
    }

    fn number(&mut self, start: Position) -> Token {
        let begin = self.idx();
        self.eat_digits();
        if self.byte(0) == Some(b'.') && self.byte(1).is_some_and(|b| b.is_ascii_digit()) {
            self.advance();
            self.eat_digits();
        }
        if matches!(self.byte(0), Some(b'e' | b'E')) {
            let digit_at = if matches!(self.byte(1), Some(b'+' | b'-')) { 2 } else { 1 };
            if self.byte(digit_at).is_some_and(|b| b.is_ascii_digit()) {
                self.advance_n(digit_at);
                self.eat_digits();
            }
        }
        let text = self.slice(begin, self.idx());
        Token::new(TokenKind::Number, text, start, text.len())
    }

    fn identifier(&mut self, start: Position) -> Token {
        let begin = self.idx();
        while let Some(c) = self.peek_char() {
            if c.is_alphanumeric() || c == '_' || c == '-' {
                self.advance_char();
            } else {
                break;
            }
        }
        let text = self.slice(begin, self.idx());
        let kind = TokenKind::keyword(text).unwrap_or(TokenKind::Identifier);
        Token::new(kind, text, start, text.len())
    }

    /// Unknown at-words stay identifiers so `[Name]` aliases can claim them.
    fn at_word(&mut self, start: Position) -> Token {
        let begin = self.idx();
        self.advance();
        while self.byte(0).is_some_and(|b| b.is_ascii_alphanumeric()) {
            self.advance();
        }
        let text = self.slice(begin, self.idx());
        if text.len() == 1 {
            return Token::new(TokenKind::UnquotedLiteral, text, start, 1);
        }
        let kind = TokenKind::at_keyword(text).unwrap_or(TokenKind::Identifier);
        Token::new(kind, text, start, text.len())
    }

    fn hash_word(&mut self, start: Position) -> Token {
        let begin = self.idx();
        self.advance();
        while let Some(c) = self.peek_char() {
            if c.is_alphanumeric() || c == '_' || c == '-' {
                self.advance_char();
            } else {
                break;
            }
        }
        let text = self.slice(begin, self.idx());
        Token::new(TokenKind::UnquotedLiteral, text, start, text.len())
    }

    /// `[Word]` is a bracket keyword only when `Word` is a known one; the
    /// cursor is restored otherwise.
    fn bracket(&mut self, start: Position) -> Result<Token, LexError> {
        let saved = self.cur;
        self.advance();
        let begin = self.idx();
        while self.byte(0).is_some_and(|b| b.is_ascii_alphabetic()) {
            self.advance();
        }
        let word = self.slice(begin, self.idx());
        match self.byte(0) {
            Some(b']') => {
                if let Some(kind) = TokenKind::bracket_keyword(word) {
                    self.advance();
                    let lexeme = format!("[{word}]");
                    let len = lexeme.len();
                    return Ok(Token::new(kind, lexeme, start, len));
                }
            }
            None if !word.is_empty() => {
                return Err(self.error(&format!("unterminated bracket keyword `[{word}`"), start));
            }
            _ => {}
        }
        self.cur = saved;
        self.advance();
        Ok(Token::new(TokenKind::LeftBracket, "[", start, 1))
    }

    /// A bare run of text up to the next terminator, without trailing
    /// whitespace.
    fn unquoted(&mut self, start: Position) -> Token {
        let begin = self.idx();
        let mut end = begin;
        while let Some(b) = self.byte(0) {
            let terminates = matches!(
                b,
                b';' | b':' | b'=' | b'{' | b'}' | b'[' | b']' | b'(' | b')' | b',' | b'\n'
            ) || (b == b'/' && matches!(self.byte(1), Some(b'/' | b'*')));
            if terminates && self.idx() > begin {
                break;
            }
            self.advance();
            if !b.is_ascii_whitespace() {
                end = self.idx();
            }
        }
        // trailing multi-byte characters are never whitespace
        while end < self.idx() && !self.src.is_char_boundary(end) {
            end += 1;
        }
        let text = self.slice(begin, end);
        Token::new(TokenKind::UnquotedLiteral, text, start, text.len())
    }

    fn lex_raw_body(&mut self) -> Result<(), LexError> {
        let open = self.cur;
        let begin = self.idx();
        let mut depth = 1usize;
        loop {
            match self.byte(0) {
                None => return Err(self.error("unterminated [Origin] block", open)),
                Some(b'{') => depth += 1,
                Some(b'}') => {
                    depth -= 1;
                    if depth == 0 { break; }
                }
                Some(_) => {}
            }
            self.advance();
        }
        let body = self.slice(begin, self.idx());
        self.tokens.push(Token::new(TokenKind::RawBlock, body, open, body.len()));
        let close = self.cur;
        self.advance();
        self.tokens.push(Token::new(TokenKind::RightBrace, "}", close, 1));
        self.raw_pending = false;
        Ok(())
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek_char() {
            if !c.is_whitespace() { break; }
            self.advance_char();
        }
    }

    fn eat_digits(&mut self) {
        while self.byte(0).is_some_and(|b| b.is_ascii_digit()) {
            self.advance();
        }
    }

    fn slice(&self, begin: usize, end: usize) -> &'a str {
        &self.src[begin..end]
    }

    fn idx(&self) -> usize {
        self.cur.offset - self.base
    }

    fn byte(&self, ahead: usize) -> Option<u8> {
        self.src.as_bytes().get(self.idx() + ahead).copied()
    }

    fn peek_char(&self) -> Option<char> {
        self.src[self.idx()..].chars().next()
    }

    fn advance(&mut self) {
        let Some(b) = self.byte(0) else { return };
        self.cur.offset += 1;
        if b == b'\n' {
            self.cur.line += 1;
            self.cur.column = 1;
        } else if b & 0xC0 != 0x80 {
            self.cur.column += 1;
        }
    }

    fn advance_n(&mut self, n: usize) {
        for _ in 0..n {
            self.advance();
        }
    }

    fn advance_char(&mut self) {
        if let Some(c) = self.peek_char() {
            self.advance_n(c.len_utf8());
        }
    }

    fn error(&self, message: &str, at: Position) -> LexError {
        LexError {
            message: message.to_string(),
            path: self.path.to_string(),
            line: at.line,
            column: at.column,
        }
    }
}

/// Tokenize a standalone markup text starting at line 1, column 1.
pub fn tokenize(src: &str, path: &str) -> Result<Vec<Token>, LexError> {
    Lexer::new(src, Position::START, path).tokenize()
}
