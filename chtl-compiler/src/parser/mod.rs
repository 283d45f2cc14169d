//! Recursive-descent parser. Declarations are registered in the symbol
//! table as soon as they are complete, so later siblings can use them;
//! template references are expanded on the spot into private copies.

mod decl;
mod element;
mod style;

use crate::ast::{Node, NodeKind, RefCategory};
use crate::compiler::{CompileContext, ImportResolver};
use crate::error::{Diagnostic, DiagnosticKind, Severity};
use crate::specialize::Specializer;
use crate::symbols::{Scope, SymbolKind, SymbolTable};
use crate::token::{Token, TokenKind};

/// Units folded into a directly preceding number (`10px`).
const CSS_UNITS: &[&str] = &[
    "px", "%", "em", "rem", "vh", "vw", "pt", "pc", "cm", "mm", "in", "ex", "ch", "deg", "rad",
    "turn", "s", "ms", "fr",
];

/// Marker for "an error was recorded; resynchronize".
#[derive(Debug)]
struct Recover;

type PResult<T> = Result<T, Recover>;

pub struct Parser<'p> {
    tokens: Vec<Token>,
    pos: usize,
    table: &'p mut SymbolTable,
    ctx: &'p mut CompileContext,
    imports: Option<&'p mut dyn ImportResolver>,
}

/// One part of a collected value: a token, or an expanded variable call.
struct Piece {
    text: String,
    kind: TokenKind,
    start: usize,
    end: usize,
}

impl<'p> Parser<'p> {
    /// `//` and `/* */` comments are dropped here; generator comments are
    /// kept because they produce output.
    pub fn new(tokens: Vec<Token>, table: &'p mut SymbolTable, ctx: &'p mut CompileContext) -> Self {
        let mut tokens: Vec<Token> = tokens
            .into_iter()
            .filter(|t| !matches!(t.kind, TokenKind::LineComment | TokenKind::BlockComment))
            .collect();
        if tokens.last().is_none_or(|t| t.kind != TokenKind::Eof) {
            let end = tokens
                .last()
                .map(|t| {
                    let mut p = t.position();
                    p.offset += t.length;
                    p.column += t.lexeme.chars().count().max(1);
                    p
                })
                .unwrap_or(crate::token::Position::START);
            tokens.push(Token::eof(end));
        }
        Parser { tokens, pos: 0, table, ctx, imports: None }
    }

    pub fn with_imports(mut self, resolver: &'p mut dyn ImportResolver) -> Self {
        self.imports = Some(resolver);
        self
    }

    pub fn parse_program(mut self) -> Node {
        let root = Scope::root();
        let mut children = Vec::new();
        self.parse_items(&root, &mut children, false);
        log::debug!(
            target: "chtl::parser",
            "{}: {} top-level node(s), {} diagnostic(s)",
            self.ctx.path,
            children.len(),
            self.ctx.diagnostics.len()
        );
        let kind = NodeKind::Program { path: self.ctx.path.clone(), use_html5: self.ctx.use_html5 };
        Node::new(kind, 1, 1).with_children(children)
    }

    /// Top-level (or namespace-level) items until end of input, or until a
    /// closing brace when `nested`.
    fn parse_items(&mut self, scope: &Scope, out: &mut Vec<Node>, nested: bool) {
        loop {
            match self.kind() {
                TokenKind::Eof => break,
                TokenKind::RightBrace if nested => break,
                TokenKind::RightBrace => {
                    let _ = self.error_here("unexpected `}`");
                    self.bump();
                    continue;
                }
                _ => {}
            }
            let before = self.pos;
            if self.parse_item(scope, out, nested).is_err() {
                self.synchronize_item();
            }
            if self.pos == before {
                self.bump();
            }
        }
    }

    fn parse_item(&mut self, scope: &Scope, out: &mut Vec<Node>, nested: bool) -> PResult<()> {
        match self.kind() {
            TokenKind::Use => out.push(self.parse_use(scope)?),
            TokenKind::Template | TokenKind::Custom => {
                if self.kind_at(1) == TokenKind::AtElement && self.kind_at(3) != TokenKind::LeftBrace {
                    let family = self.family_prefix();
                    out.extend(self.parse_element_use(scope, family)?);
                } else {
                    out.push(self.parse_definition(scope)?);
                }
            }
            TokenKind::Origin => out.extend(self.parse_origin(scope)?),
            TokenKind::Import => out.push(self.parse_import(scope)?),
            TokenKind::Namespace => self.parse_namespace(scope, out, nested)?,
            TokenKind::Configuration => out.push(self.parse_configuration(scope)?),
            TokenKind::Info | TokenKind::Export => self.skip_info_block()?,
            TokenKind::GeneratorComment => out.push(self.comment()),
            TokenKind::Style if self.kind_at(1) == TokenKind::LeftBrace => {
                out.push(self.parse_local_style(scope)?)
            }
            TokenKind::Script if self.kind_at(1) == TokenKind::LeftBrace => {
                out.push(self.parse_script(scope)?)
            }
            TokenKind::Text => out.push(self.parse_text(scope)?),
            TokenKind::AtElement => out.extend(self.parse_element_use(scope, None)?),
            TokenKind::Identifier if self.kind_at(1) == TokenKind::LeftBrace => {
                out.push(self.parse_element(scope)?)
            }
            _ => return Err(self.error_here(format!("expected a declaration or element, found {}", self.peek()))),
        }
        Ok(())
    }

    /// Skip to something that can start a declaration or an element,
    /// stepping over balanced blocks on the way.
    fn synchronize_item(&mut self) {
        let mut depth = 0usize;
        loop {
            match self.kind() {
                TokenKind::Eof => return,
                TokenKind::LeftBrace => depth += 1,
                TokenKind::RightBrace if depth == 0 => return,
                TokenKind::RightBrace => {
                    depth -= 1;
                    if depth == 0 {
                        self.bump();
                        return;
                    }
                }
                TokenKind::Template
                | TokenKind::Custom
                | TokenKind::Origin
                | TokenKind::Import
                | TokenKind::Namespace
                | TokenKind::Configuration
                | TokenKind::Use
                    if depth == 0 =>
                {
                    return;
                }
                TokenKind::Identifier if depth == 0 && self.kind_at(1) == TokenKind::LeftBrace => return,
                _ => {}
            }
            self.bump();
        }
    }

    /// Inside a block: skip past the next `;`, or up to the closing brace
    /// or the next nested element.
    fn synchronize_statement(&mut self) {
        let mut depth = 0usize;
        loop {
            match self.kind() {
                TokenKind::Eof => return,
                TokenKind::Semicolon if depth == 0 => {
                    self.bump();
                    return;
                }
                TokenKind::LeftBrace => depth += 1,
                TokenKind::RightBrace if depth == 0 => return,
                TokenKind::RightBrace => {
                    depth -= 1;
                    if depth == 0 {
                        self.bump();
                        return;
                    }
                }
                TokenKind::Identifier if depth == 0 && self.kind_at(1) == TokenKind::LeftBrace => return,
                _ => {}
            }
            self.bump();
        }
    }

    // ---- values --------------------------------------------------------

    /// Collect a value up to (not including) a token in `stops` outside
    /// parentheses. Tokens are joined the way they were written: touching
    /// tokens stay together, anything else gets one space.
    fn parse_value(&mut self, scope: &Scope, stops: &[TokenKind]) -> PResult<String> {
        let mut pieces = Vec::new();
        let mut parens = 0usize;
        loop {
            let kind = self.peek().kind;
            if kind == TokenKind::Eof || (parens == 0 && stops.contains(&kind)) {
                break;
            }
            match kind {
                TokenKind::GeneratorComment => {
                    self.bump();
                    continue;
                }
                TokenKind::LeftParen => parens += 1,
                TokenKind::RightParen => parens = parens.saturating_sub(1),
                TokenKind::Identifier if self.kind_at(1) == TokenKind::LeftParen && self.is_var_group(scope) => {
                    pieces.push(self.parse_var_call(scope)?);
                    continue;
                }
                _ => {}
            }
            let tok = self.bump();
            pieces.push(Piece { end: tok.offset + tok.length, start: tok.offset, kind: tok.kind, text: tok.lexeme });
        }
        Ok(join_pieces(&pieces))
    }

    fn is_var_group(&self, scope: &Scope) -> bool {
        let kinds = SymbolKind::candidates(RefCategory::Var, None);
        self.table.find(&kinds, scope, &self.peek().lexeme).is_some()
    }

    /// `Group(key)` or `Group(key = value)`.
    fn parse_var_call(&mut self, scope: &Scope) -> PResult<Piece> {
        let group = self.bump();
        self.expect(TokenKind::LeftParen, "`(`")?;
        let key = self.expect_name("variable name")?;
        let replacement = if self.eat_assign() {
            Some(self.parse_value(scope, &[TokenKind::RightParen])?)
        } else {
            None
        };
        let close = self.expect(TokenKind::RightParen, "`)`")?;
        let at = Node::new(NodeKind::Identifier(group.lexeme.clone()), group.line, group.column);
        let text = self
            .specializer(scope)
            .resolve_var(&group.lexeme, &key.lexeme, replacement.as_deref(), &at)
            .unwrap_or_default();
        Ok(Piece { text, kind: TokenKind::UnquotedLiteral, start: group.offset, end: close.offset + close.length })
    }

    // ---- token helpers -------------------------------------------------

    fn peek(&self) -> &Token {
        let last = self.tokens.len() - 1;
        &self.tokens[self.pos.min(last)]
    }

    fn peek_at(&self, n: usize) -> &Token {
        let last = self.tokens.len() - 1;
        &self.tokens[(self.pos + n).min(last)]
    }

    /// Kind of the current token after keyword aliases are applied.
    fn kind(&self) -> TokenKind {
        self.ctx.config.resolve(self.peek())
    }

    fn kind_at(&self, n: usize) -> TokenKind {
        self.ctx.config.resolve(self.peek_at(n))
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.kind() == kind
    }

    fn bump(&mut self) -> Token {
        let tok = self.peek().clone();
        if tok.kind != TokenKind::Eof {
            self.pos += 1;
        }
        tok
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.at(kind) {
            self.bump();
            true
        } else {
            false
        }
    }

    /// `:` and `=` are interchangeable everywhere.
    fn eat_assign(&mut self) -> bool {
        self.eat(TokenKind::Colon) || self.eat(TokenKind::Equals)
    }

    fn at_assign(&self, n: usize) -> bool {
        matches!(self.kind_at(n), TokenKind::Colon | TokenKind::Equals)
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> PResult<Token> {
        if self.at(kind) {
            Ok(self.bump())
        } else {
            Err(self.error_here(format!("expected {what}, found {}", self.peek())))
        }
    }

    /// An identifier, or a keyword used as a plain name.
    fn expect_name(&mut self, what: &str) -> PResult<Token> {
        if self.peek().kind.is_word() {
            Ok(self.bump())
        } else {
            Err(self.error_here(format!("expected {what}, found {}", self.peek())))
        }
    }

    fn comment(&mut self) -> Node {
        let tok = self.bump();
        Node::new(NodeKind::Comment(tok.lexeme), tok.line, tok.column)
    }

    fn specializer<'s>(&'s mut self, scope: &'s Scope) -> Specializer<'s> {
        Specializer::new(&*self.table, scope, &self.ctx.path, &mut self.ctx.diagnostics)
    }

    // ---- diagnostics ---------------------------------------------------

    fn report(&mut self, severity: Severity, kind: DiagnosticKind, message: String, line: usize, column: usize) {
        match severity {
            Severity::Error => log::debug!(target: "chtl::parser", "{line}:{column}: {message}"),
            Severity::Warning => log::warn!(target: "chtl::parser", "{line}:{column}: {message}"),
        }
        self.ctx.diagnostics.push(Diagnostic {
            severity,
            kind,
            message,
            path: self.ctx.path.clone(),
            line,
            column,
        });
    }

    fn error_here(&mut self, message: impl Into<String>) -> Recover {
        let (line, column) = (self.peek().line, self.peek().column);
        self.report(Severity::Error, DiagnosticKind::Syntax, message.into(), line, column);
        Recover
    }

    fn error_at(&mut self, tok: &Token, message: impl Into<String>) -> Recover {
        self.report(Severity::Error, DiagnosticKind::Syntax, message.into(), tok.line, tok.column);
        Recover
    }

    /// Register a definition, warning when it replaces an earlier one.
    fn register(&mut self, kind: SymbolKind, scope: &Scope, name: &str, node: Node) {
        let (line, column) = (node.line, node.column);
        if self.table.add(kind, scope, name, node).is_some() {
            self.report(
                Severity::Warning,
                DiagnosticKind::Redefinition,
                format!("`{}` redefined; the last definition wins", scope.qualify(name)),
                line,
                column,
            );
        }
    }
}

fn join_pieces(pieces: &[Piece]) -> String {
    if let [only] = pieces {
        if only.kind == TokenKind::StringLiteral {
            return only.text.clone();
        }
    }
    let mut out = String::new();
    for (i, piece) in pieces.iter().enumerate() {
        if i > 0 {
            let prev = &pieces[i - 1];
            let touching = prev.end == piece.start;
            let stray_suffix = prev.kind == TokenKind::Number
                && piece.kind == TokenKind::Identifier
                && !CSS_UNITS.contains(&piece.text.as_str());
            if !touching || stray_suffix {
                out.push(' ');
            }
        }
        if piece.kind == TokenKind::StringLiteral {
            out.push('"');
            out.push_str(&piece.text.replace('"', "\\\""));
            out.push('"');
        } else {
            out.push_str(&piece.text);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn piece(text: &str, kind: TokenKind, start: usize) -> Piece {
        Piece { text: text.to_string(), kind, start, end: start + text.len() }
    }

    #[test]
    fn joins_units_only_when_touching() {
        let px = [piece("10", TokenKind::Number, 0), piece("px", TokenKind::Identifier, 2)];
        assert_eq!(join_pieces(&px), "10px");
        let spaced = [piece("10", TokenKind::Number, 0), piece("px", TokenKind::Identifier, 3)];
        assert_eq!(join_pieces(&spaced), "10 px");
        let stray = [piece("3", TokenKind::Number, 0), piece("apples", TokenKind::Identifier, 1)];
        assert_eq!(join_pieces(&stray), "3 apples");
    }

    #[test]
    fn lone_string_is_unquoted_and_mixed_strings_keep_quotes() {
        assert_eq!(join_pieces(&[piece("a b", TokenKind::StringLiteral, 0)]), "a b");
        // the string token spans its quotes in the source
        let quoted = Piece { text: "Open Sans".to_string(), kind: TokenKind::StringLiteral, start: 0, end: 11 };
        let mixed = [quoted, piece(",", TokenKind::Comma, 11), piece("serif", TokenKind::Identifier, 13)];
        assert_eq!(join_pieces(&mixed), "\"Open Sans\", serif");
    }
}
