use std::fmt;

/// A point in the source file. `offset` is a byte offset, `line` and
/// `column` are 1-based and count characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub const START: Position = Position { offset: 0, line: 1, column: 1 };
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Identifier,
    StringLiteral,
    UnquotedLiteral,
    Number,

    // keywords
    Text,
    Style,
    Script,
    Use,
    Html5,
    Inherit,
    Delete,
    Insert,
    After,
    Before,
    Replace,
    At,
    Top,
    Bottom,
    From,
    As,
    Except,

    // bracket keywords
    Template,
    Custom,
    Origin,
    Import,
    Namespace,
    Configuration,
    Info,
    Export,

    // at keywords
    AtStyle,
    AtElement,
    AtVar,
    AtHtml,
    AtJavaScript,
    AtChtl,
    AtCJmod,
    AtConfig,

    // operators
    Colon,
    Semicolon,
    Comma,
    Dot,
    Equals,
    LeftBrace,
    RightBrace,
    LeftBracket,
    RightBracket,
    LeftParen,
    RightParen,
    Ampersand,
    Arrow,

    LineComment,
    BlockComment,
    GeneratorComment,

    /// Opaque body of a script block or an `[Origin]` block.
    RawBlock,
    Eof,
}

impl TokenKind {
    pub fn keyword(word: &str) -> Option<TokenKind> {
        use TokenKind::*;
        Some(match word {
            "text" => Text,
            "style" => Style,
            "script" => Script,
            "use" => Use,
            "html5" => Html5,
            "inherit" => Inherit,
            "delete" => Delete,
            "insert" => Insert,
            "after" => After,
            "before" => Before,
            "replace" => Replace,
            "at" => At,
            "top" => Top,
            "bottom" => Bottom,
            "from" => From,
            "as" => As,
            "except" => Except,
            _ => return None,
        })
    }

    /// `inner` is the text between the brackets, e.g. `Template`.
    pub fn bracket_keyword(inner: &str) -> Option<TokenKind> {
        use TokenKind::*;
        Some(match inner {
            "Template" => Template,
            "Custom" => Custom,
            "Origin" => Origin,
            "Import" => Import,
            "Namespace" => Namespace,
            "Configuration" => Configuration,
            "Info" => Info,
            "Export" => Export,
            _ => return None,
        })
    }

    /// `word` includes the leading `@`.
    pub fn at_keyword(word: &str) -> Option<TokenKind> {
        use TokenKind::*;
        Some(match word {
            "@Style" => AtStyle,
            "@Element" => AtElement,
            "@Var" => AtVar,
            "@Html" => AtHtml,
            "@JavaScript" => AtJavaScript,
            "@Chtl" => AtChtl,
            "@CJmod" => AtCJmod,
            "@Config" => AtConfig,
            _ => return None,
        })
    }

    pub fn is_keyword(self) -> bool {
        use TokenKind::*;
        matches!(
            self,
            Text | Style
                | Script
                | Use
                | Html5
                | Inherit
                | Delete
                | Insert
                | After
                | Before
                | Replace
                | At
                | Top
                | Bottom
                | From
                | As
                | Except
        )
    }

    /// Tokens that can stand for a bare word: identifiers and any keyword.
    pub fn is_word(self) -> bool {
        self == TokenKind::Identifier || self.is_keyword()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// Processed text: unescaped for strings, body for comments.
    pub lexeme: String,
    pub line: usize,
    pub column: usize,
    /// Source bytes covered by the token.
    pub length: usize,
    pub offset: usize,
}

impl Token {
    pub fn new(kind: TokenKind, lexeme: impl Into<String>, start: Position, length: usize) -> Self {
        Token {
            kind,
            lexeme: lexeme.into(),
            line: start.line,
            column: start.column,
            length,
            offset: start.offset,
        }
    }

    pub fn eof(at: Position) -> Self {
        Token::new(TokenKind::Eof, "", at, 0)
    }

    /// No whitespace or comment between `self` and `next` in the source.
    pub fn is_adjacent_to(&self, next: &Token) -> bool {
        self.offset + self.length == next.offset
    }

    pub fn position(&self) -> Position {
        Position { offset: self.offset, line: self.line, column: self.column }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::Eof => f.write_str("end of input"),
            TokenKind::StringLiteral => write!(f, "\"{}\"", self.lexeme),
            _ => write!(f, "`{}`", self.lexeme),
        }
    }
}
