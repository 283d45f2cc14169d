//! Boundary scanner: splits a source file into markup, CSS and script
//! fragments without a shared grammar.
//!
//! Only braces, strings and comments are tracked. Strings and comments are
//! consumed atomically so a brace inside them never moves a boundary. The
//! body of `style { }` becomes a CSS fragment and the body of `script { }`
//! becomes a script (or script-dialect) fragment; everything else, including
//! the `style {` and closing `}` themselves, stays markup. Concatenating the
//! fragment texts gives back the source byte for byte.

use crate::error::ScanError;
use crate::token::Position;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FragmentKind {
    Markup,
    ScriptDialect,
    Css,
    Script,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub kind: FragmentKind,
    pub text: String,
    pub start: Position,
    pub end: Position,
    pub path: String,
}

/// Functions that only exist in the script dialect.
const DIALECT_FUNCTIONS: &[&str] = &[
    "module",
    "listen",
    "delegate",
    "animate",
    "vir",
    "iNeverAway",
    "util",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Markup,
    Css,
    Script,
}

impl ScanState {
    fn keyword(self) -> &'static str {
        match self {
            ScanState::Markup => "{",
            ScanState::Css => "style",
            ScanState::Script => "script",
        }
    }
}

pub struct Scanner<'a> {
    src: &'a str,
    bytes: &'a [u8],
    path: String,
    cur: Position,
    frag_start: Position,
    fragments: Vec<Fragment>,
}

impl<'a> Scanner<'a> {
    pub fn new(src: &'a str, path: impl Into<String>) -> Self {
        Scanner {
            src,
            bytes: src.as_bytes(),
            path: path.into(),
            cur: Position::START,
            frag_start: Position::START,
            fragments: Vec::new(),
        }
    }

    pub fn scan(mut self) -> Result<Vec<Fragment>, ScanError> {
        // Opening markup braces, with the word that introduced them.
        let mut open: Vec<(String, Position)> = Vec::new();
        let mut origin_pending = false;

        while let Some(b) = self.byte(0) {
            match b {
                b'/' if self.byte(1) == Some(b'/') => self.skip_line(),
                b'/' if self.byte(1) == Some(b'*') => self.skip_block_comment()?,
                b'-' if self.byte(1) == Some(b'-') && !self.after_word() => self.skip_line(),
                b'"' | b'\'' => self.skip_string(b)?,
                b'[' if self.rest().starts_with("[Origin]") => {
                    origin_pending = true;
                    self.advance_n("[Origin]".len());
                }
                b';' => {
                    origin_pending = false;
                    self.advance();
                }
                b'{' if origin_pending => {
                    origin_pending = false;
                    self.skip_raw_block()?;
                }
                b'{' => match block_keyword_before(self.bytes, self.cur.offset) {
                    Some((state, at)) => {
                        let keyword_pos = self.position_of(at);
                        self.scan_embedded(state, keyword_pos)?;
                    }
                    None => {
                        let (word, at) = word_before(self.src, self.cur.offset);
                        let opened_at = if word.is_empty() { self.cur } else { self.position_of(at) };
                        let label = if word.is_empty() { "{".to_string() } else { word.to_string() };
                        open.push((label, opened_at));
                        self.advance();
                    }
                },
                b'}' => {
                    if open.pop().is_none() {
                        return Err(ScanError::UnbalancedBrace {
                            path: self.path.clone(),
                            line: self.cur.line,
                            column: self.cur.column,
                        });
                    }
                    self.advance();
                }
                _ => self.advance(),
            }
        }

        if let Some((keyword, at)) = open.pop() {
            return Err(ScanError::UnterminatedBlock {
                keyword,
                path: self.path.clone(),
                line: at.line,
                column: at.column,
            });
        }

        self.close_fragment(FragmentKind::Markup);
        log::debug!(
            target: "chtl::scanner",
            "{}: {} fragment(s)",
            self.path,
            self.fragments.len()
        );
        Ok(self.fragments)
    }

    /// Scan the body of a `style { }` or `script { }` block. On entry the
    /// cursor sits on the opening brace; on exit it is past the closing one.
    fn scan_embedded(&mut self, state: ScanState, keyword_pos: Position) -> Result<(), ScanError> {
        self.advance();
        self.close_fragment(FragmentKind::Markup);
        let body_start = self.cur.offset;

        let mut depth = 0usize;
        let mut parens = 0usize;
        loop {
            let Some(b) = self.byte(0) else {
                return Err(ScanError::UnterminatedBlock {
                    keyword: state.keyword().to_string(),
                    path: self.path.clone(),
                    line: keyword_pos.line,
                    column: keyword_pos.column,
                });
            };
            match b {
                b'"' | b'\'' => self.skip_string(b)?,
                b'`' if state == ScanState::Script => self.skip_string(b)?,
                // `//` inside `url(...)` is part of the value
                b'/' if self.byte(1) == Some(b'/') && (state == ScanState::Script || parens == 0) => {
                    self.skip_line()
                }
                b'/' if self.byte(1) == Some(b'*') => self.skip_block_comment()?,
                b'(' => {
                    parens += 1;
                    self.advance();
                }
                b')' => {
                    parens = parens.saturating_sub(1);
                    self.advance();
                }
                b'{' => {
                    if let Some((nested, at)) = block_keyword_before(self.bytes, self.cur.offset) {
                        if nested == state {
                            let pos = self.position_of(at);
                            return Err(ScanError::NestedBlock {
                                keyword: state.keyword().to_string(),
                                path: self.path.clone(),
                                line: pos.line,
                                column: pos.column,
                            });
                        }
                    }
                    depth += 1;
                    self.advance();
                }
                b'}' if depth == 0 => break,
                b'}' => {
                    depth -= 1;
                    self.advance();
                }
                _ => self.advance(),
            }
        }

        let kind = match state {
            ScanState::Css => FragmentKind::Css,
            _ => classify_script(&self.src[body_start..self.cur.offset]),
        };
        self.close_fragment(kind);
        // closing brace starts the next markup fragment
        self.advance();
        Ok(())
    }

    fn close_fragment(&mut self, kind: FragmentKind) {
        let start = self.frag_start;
        let end = self.cur;
        self.frag_start = end;
        if start.offset == end.offset {
            return;
        }
        let text = self.src[start.offset..end.offset].to_string();
        log::trace!(target: "chtl::scanner", "{kind:?} fragment {start}..{end}");
        self.fragments.push(Fragment { kind, text, start, end, path: self.path.clone() });
    }

    fn skip_line(&mut self) {
        while let Some(b) = self.byte(0) {
            if b == b'\n' { break; }
            self.advance();
        }
    }

    fn skip_block_comment(&mut self) -> Result<(), ScanError> {
        let start = self.cur;
        self.advance_n(2);
        loop {
            match self.byte(0) {
                None => {
                    return Err(ScanError::UnterminatedComment {
                        path: self.path.clone(),
                        line: start.line,
                        column: start.column,
                    });
                }
                Some(b'*') if self.byte(1) == Some(b'/') => {
                    self.advance_n(2);
                    return Ok(());
                }
                Some(_) => self.advance(),
            }
        }
    }

    fn skip_string(&mut self, quote: u8) -> Result<(), ScanError> {
        let start = self.cur;
        self.advance();
        loop {
            match self.byte(0) {
                None => {
                    return Err(ScanError::UnterminatedString {
                        path: self.path.clone(),
                        line: start.line,
                        column: start.column,
                    });
                }
                Some(b'\\') => self.advance_n(2),
                Some(b) if b == quote => {
                    self.advance();
                    return Ok(());
                }
                Some(_) => self.advance(),
            }
        }
    }

    /// `[Origin]` bodies are raw: only braces are counted.
    fn skip_raw_block(&mut self) -> Result<(), ScanError> {
        let start = self.cur;
        let mut depth = 0usize;
        while let Some(b) = self.byte(0) {
            self.advance();
            match b {
                b'{' => depth += 1,
                b'}' => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(());
                    }
                }
                _ => {}
            }
        }
        Err(ScanError::UnterminatedBlock {
            keyword: "[Origin]".to_string(),
            path: self.path.clone(),
            line: start.line,
            column: start.column,
        })
    }

    fn byte(&self, ahead: usize) -> Option<u8> {
        self.bytes.get(self.cur.offset + ahead).copied()
    }

    /// `--` only opens a comment at the start of a token; `btn--primary`
    /// is one word.
    fn after_word(&self) -> bool {
        self.cur.offset > 0 && is_word_byte(self.bytes[self.cur.offset - 1])
    }

    fn rest(&self) -> &str {
        &self.src[self.cur.offset..]
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

    /// Position of an earlier byte offset, counted back from the cursor.
    fn position_of(&self, offset: usize) -> Position {
        let newlines = self.src[offset..self.cur.offset].bytes().filter(|&b| b == b'\n').count();
        let line_start = self.src[..offset].rfind('\n').map(|i| i + 1).unwrap_or(0);
        Position {
            offset,
            line: self.cur.line - newlines,
            column: self.src[line_start..offset].chars().count() + 1,
        }
    }
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'-' || b >= 0x80
}

/// The word immediately before `offset` (skipping whitespace) and its
/// starting offset.
fn word_before(src: &str, offset: usize) -> (&str, usize) {
    let bytes = src.as_bytes();
    let mut i = offset;
    while i > 0 && bytes[i - 1].is_ascii_whitespace() {
        i -= 1;
    }
    let end = i;
    while i > 0 && is_word_byte(bytes[i - 1]) {
        i -= 1;
    }
    (&src[i..end], i)
}

/// If the brace at `offset` opens a `style` or `script` body, return which
/// one and where the keyword starts. Selectors such as `.style {` and
/// declarations such as `@Style style {` do not count.
fn block_keyword_before(bytes: &[u8], offset: usize) -> Option<(ScanState, usize)> {
    let mut i = offset;
    while i > 0 && bytes[i - 1].is_ascii_whitespace() {
        i -= 1;
    }
    let end = i;
    while i > 0 && is_word_byte(bytes[i - 1]) {
        i -= 1;
    }
    let state = match &bytes[i..end] {
        b"style" => ScanState::Css,
        b"script" => ScanState::Script,
        _ => return None,
    };
    if i > 0 && matches!(bytes[i - 1], b'@' | b'.' | b'#' | b'&' | b':') {
        return None;
    }

    let mut j = i;
    while j > 0 && bytes[j - 1].is_ascii_whitespace() {
        j -= 1;
    }
    let prev_end = j;
    while j > 0 && (is_word_byte(bytes[j - 1]) || bytes[j - 1] == b'@') {
        j -= 1;
    }
    if bytes[j..prev_end].first() == Some(&b'@') {
        return None;
    }
    Some((state, i))
}

/// A script body is treated as the script dialect when it uses any of the
/// dialect's constructs: `{{ }}` selectors, `->` / `&->` arrows, or one of
/// the dialect functions followed by whitespace or `{`.
pub fn classify_script(body: &str) -> FragmentKind {
    if body.contains("{{") || body.contains("->") {
        return FragmentKind::ScriptDialect;
    }
    let bytes = body.as_bytes();
    for name in DIALECT_FUNCTIONS {
        for (at, _) in body.match_indices(name) {
            let before_ok = at == 0 || !is_word_byte(bytes[at - 1]);
            let after = bytes.get(at + name.len()).copied();
            let after_ok = matches!(after, Some(b) if b.is_ascii_whitespace() || b == b'{');
            if before_ok && after_ok {
                return FragmentKind::ScriptDialect;
            }
        }
    }
    FragmentKind::Script
}

pub fn scan(src: &str, path: &str) -> Result<Vec<Fragment>, ScanError> {
    Scanner::new(src, path).scan()
}
