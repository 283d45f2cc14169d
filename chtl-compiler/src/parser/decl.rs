use super::style::StyleContext;
use super::{PResult, Parser};
use crate::ast::{Import, ImportKind, Node, NodeKind, OriginKind, TemplateFamily, TemplateKind, UseTarget};
use crate::error::{DiagnosticKind, Severity};
use crate::symbols::{Scope, SymbolKind, SymbolTable};
use crate::token::TokenKind;

impl Parser<'_> {
    /// `[Template] @Style Name { }`, `[Custom] @Element Name { }`, ...
    /// The definition is registered as soon as its body closes.
    pub(super) fn parse_definition(&mut self, scope: &Scope) -> PResult<Node> {
        let head = self.peek().clone();
        let family = self.family_prefix().unwrap_or(TemplateFamily::Template);
        let kind = match self.kind() {
            TokenKind::AtStyle => TemplateKind::Style(family),
            TokenKind::AtElement => TemplateKind::Element(family),
            TokenKind::AtVar => TemplateKind::Var(family),
            _ => return Err(self.error_here(format!("expected @Style, @Element or @Var, found {}", self.peek()))),
        };
        self.bump();
        let name = self.expect_name("a definition name")?.lexeme;
        self.expect(TokenKind::LeftBrace, "`{`")?;

        let mut node = Node::new(kind.definition(name.clone()), head.line, head.column);
        match kind {
            TemplateKind::Element(_) => self.parse_body(scope, &mut node)?,
            _ => {
                let cx = match family {
                    TemplateFamily::Template => StyleContext::Template,
                    TemplateFamily::Custom => StyleContext::Custom,
                };
                node.children = self.parse_style_items(scope, cx)?;
            }
        }
        self.expect(TokenKind::RightBrace, "`}` closing the definition")?;
        self.register(SymbolKind::of_template(kind), scope, &name, node.clone());
        Ok(node)
    }

    /// `[Origin] @Html name? { raw }` emits (and, when named, registers) a
    /// raw block; `[Origin] @Html name;` re-emits a registered one.
    pub(super) fn parse_origin(&mut self, scope: &Scope) -> PResult<Vec<Node>> {
        let head = self.bump();
        let kind = match self.kind() {
            TokenKind::AtHtml => OriginKind::Html,
            TokenKind::AtStyle => OriginKind::Style,
            TokenKind::AtJavaScript => OriginKind::JavaScript,
            _ => return Err(self.error_here(format!("expected @Html, @Style or @JavaScript, found {}", self.peek()))),
        };
        self.bump();
        let name = if self.peek().kind.is_word() { Some(self.bump().lexeme) } else { None };

        if self.eat(TokenKind::Semicolon) {
            let Some(name) = name else {
                return Err(self.error_at(&head, "an [Origin] reference needs a name"));
            };
            return match self.table.get(SymbolKind::Origin, scope, &name) {
                Some(found) => {
                    let mut node = found.clone();
                    node.line = head.line;
                    node.column = head.column;
                    Ok(vec![node])
                }
                None => {
                    self.report(
                        Severity::Error,
                        DiagnosticKind::Resolution,
                        format!("unknown origin block `{name}`"),
                        head.line,
                        head.column,
                    );
                    Ok(Vec::new())
                }
            };
        }

        self.expect(TokenKind::LeftBrace, "`{`")?;
        let content = if self.at(TokenKind::RawBlock) { self.bump().lexeme } else { String::new() };
        self.expect(TokenKind::RightBrace, "`}` closing the origin block")?;
        let node = Node::new(NodeKind::Origin { kind, name: name.clone(), content }, head.line, head.column);
        if let Some(name) = &name {
            self.register(SymbolKind::Origin, scope, name, node.clone());
        }
        Ok(vec![node])
    }

    /// Records the import and, when the host can load it, merges the
    /// imported symbols right away.
    pub(super) fn parse_import(&mut self, scope: &Scope) -> PResult<Node> {
        let head = self.bump();
        let family = self.family_prefix();
        let kind = match (self.kind(), family) {
            (TokenKind::AtStyle, Some(f)) => ImportKind::Definition(TemplateKind::Style(f)),
            (TokenKind::AtElement, Some(f)) => ImportKind::Definition(TemplateKind::Element(f)),
            (TokenKind::AtVar, Some(f)) => ImportKind::Definition(TemplateKind::Var(f)),
            (TokenKind::AtChtl, None) => ImportKind::Chtl,
            (TokenKind::AtHtml, None) => ImportKind::Html,
            (TokenKind::AtStyle, None) => ImportKind::Style,
            (TokenKind::AtJavaScript, None) => ImportKind::JavaScript,
            (TokenKind::AtCJmod, None) => ImportKind::CJmod,
            _ => return Err(self.error_here(format!("unsupported import target {}", self.peek()))),
        };
        self.bump();
        let item = match kind {
            ImportKind::Definition(_) => Some(self.expect_name("a definition name")?.lexeme),
            _ => None,
        };
        self.expect(TokenKind::From, "`from`")?;
        let path = self.parse_value(scope, &[TokenKind::As, TokenKind::Semicolon])?;
        if path.is_empty() {
            return Err(self.error_here("expected an import path"));
        }
        let alias = if self.eat(TokenKind::As) { Some(self.expect_name("an alias")?.lexeme) } else { None };
        self.expect(TokenKind::Semicolon, "`;` after the import")?;

        if matches!(kind, ImportKind::Html | ImportKind::Style | ImportKind::JavaScript) && alias.is_none() {
            self.report(
                Severity::Warning,
                DiagnosticKind::Resolution,
                format!("import of `{path}` has no `as` name and cannot be referenced"),
                head.line,
                head.column,
            );
        }

        let import = Import { kind, path, alias, item };
        self.resolve_import(scope, &import, head.line, head.column);
        Ok(Node::new(NodeKind::Import(import), head.line, head.column))
    }

    fn resolve_import(&mut self, scope: &Scope, import: &Import, line: usize, column: usize) {
        let result = match self.imports.as_deref_mut() {
            Some(resolver) => resolver.resolve(import, &self.ctx.path),
            None => {
                log::debug!(target: "chtl::parser", "no import resolver; `{}` recorded only", import.path);
                return;
            }
        };
        let table = match result {
            Ok(Some(table)) => table,
            Ok(None) => return,
            Err(message) => {
                self.report(Severity::Error, DiagnosticKind::Resolution, message, line, column);
                return;
            }
        };
        match import.kind {
            ImportKind::Definition(kind) => self.import_definition(scope, import, kind, &table, line, column),
            ImportKind::Chtl | ImportKind::CJmod => {
                let prefix = match &import.alias {
                    Some(alias) => Some(scope.qualify(alias)),
                    None if scope.is_root() => None,
                    None => Some(scope.path().join(".")),
                };
                log::debug!(target: "chtl::parser", "merging {} symbol(s) from `{}`", table.len(), import.path);
                self.table.merge(&table, prefix.as_deref());
            }
            ImportKind::Html | ImportKind::Style | ImportKind::JavaScript => {
                let prefix = (!scope.is_root()).then(|| scope.path().join("."));
                self.table.merge(&table, prefix.as_deref());
            }
        }
    }

    /// Copy one named definition out of an imported table, renamed to the
    /// alias when one was given.
    fn import_definition(
        &mut self,
        scope: &Scope,
        import: &Import,
        kind: TemplateKind,
        table: &SymbolTable,
        line: usize,
        column: usize,
    ) {
        let Some(item) = import.item.as_deref() else { return };
        let symbol = SymbolKind::of_template(kind);
        match table.get(symbol, &Scope::root(), item) {
            Some(node) => {
                let name = import.alias.as_deref().unwrap_or(item);
                self.register(symbol, scope, name, node.clone());
            }
            None => self.report(
                Severity::Error,
                DiagnosticKind::Resolution,
                format!("`{}` does not define {} `{item}`", import.path, kind.category().describe()),
                line,
                column,
            ),
        }
    }

    /// `[Namespace] name { ... }` or braceless `[Namespace] name`, which
    /// scopes everything up to the end of the enclosing block.
    pub(super) fn parse_namespace(&mut self, scope: &Scope, out: &mut Vec<Node>, nested: bool) -> PResult<()> {
        let head = self.bump();
        let name = self.expect_name("a namespace name")?.lexeme;
        if !self.table.has(SymbolKind::Namespace, scope, &name) {
            let marker = Node::new(NodeKind::Namespace(scope.qualify(&name)), head.line, head.column);
            self.table.add(SymbolKind::Namespace, scope, &name, marker);
        }
        let inner = scope.enter(&name);
        let mut node = Node::new(NodeKind::Namespace(inner.path().join(".")), head.line, head.column);
        if self.eat(TokenKind::LeftBrace) {
            self.parse_items(&inner, &mut node.children, true);
            self.expect(TokenKind::RightBrace, "`}` closing the namespace")?;
        } else {
            self.eat(TokenKind::Semicolon);
            self.parse_items(&inner, &mut node.children, nested);
        }
        out.push(node);
        Ok(())
    }

    /// `[Configuration] { ... }` applies at once; `[Configuration] @Config
    /// Name { ... }` is stored for `use @Config Name;`.
    pub(super) fn parse_configuration(&mut self, scope: &Scope) -> PResult<Node> {
        let head = self.bump();
        let name = if self.eat(TokenKind::AtConfig) { Some(self.expect_name("a configuration name")?.lexeme) } else { None };
        self.expect(TokenKind::LeftBrace, "`{`")?;
        let mut node = Node::new(NodeKind::Configuration { name: name.clone() }, head.line, head.column);
        node.children = self.parse_config_entries(scope)?;
        self.expect(TokenKind::RightBrace, "`}` closing the configuration")?;

        match &name {
            Some(name) => self.register(SymbolKind::Configuration, scope, name, node.clone()),
            None => self.apply_config(&node),
        }
        Ok(node)
    }

    fn parse_config_entries(&mut self, scope: &Scope) -> PResult<Vec<Node>> {
        let mut entries = Vec::new();
        loop {
            match self.kind() {
                TokenKind::RightBrace => return Ok(entries),
                TokenKind::Eof => return Err(self.error_here("unterminated configuration block")),
                TokenKind::GeneratorComment => {
                    self.bump();
                    continue;
                }
                // `[Name] { ... }` and other groups
                TokenKind::LeftBracket => {
                    self.bump();
                    let group = self.expect_name("a group name")?;
                    self.expect(TokenKind::RightBracket, "`]`")?;
                    self.expect(TokenKind::LeftBrace, "`{`")?;
                    let children = self.parse_config_entries(scope)?;
                    self.expect(TokenKind::RightBrace, "`}` closing the group")?;
                    let node = Node::new(NodeKind::Identifier(group.lexeme), group.line, group.column);
                    entries.push(node.with_children(children));
                }
                _ => {
                    let before = self.pos;
                    match self.parse_config_entry(scope) {
                        Ok(entry) => entries.push(entry),
                        Err(_) => self.synchronize_statement(),
                    }
                    if self.pos == before {
                        self.bump();
                    }
                }
            }
        }
    }

    /// `KEY = value;` or `KEY = [a, b];`. List items are stored comma-joined.
    fn parse_config_entry(&mut self, scope: &Scope) -> PResult<Node> {
        let key = self.expect_name("a configuration key")?;
        if !self.eat_assign() {
            return Err(self.error_here(format!("expected `=` after `{}`", key.lexeme)));
        }
        let value = if self.eat(TokenKind::LeftBracket) {
            let mut words = Vec::new();
            while !self.at(TokenKind::RightBracket) {
                if self.at(TokenKind::Eof) {
                    return Err(self.error_here("unterminated value list"));
                }
                words.push(self.parse_value(scope, &[TokenKind::Comma, TokenKind::RightBracket])?);
                self.eat(TokenKind::Comma);
            }
            self.bump();
            words.join(",")
        } else {
            self.parse_value(scope, &[TokenKind::Semicolon, TokenKind::RightBrace])?
        };
        self.eat(TokenKind::Semicolon);
        let kind = NodeKind::Attribute { name: key.lexeme, value };
        Ok(Node::new(kind, key.line, key.column))
    }

    fn apply_config(&mut self, node: &Node) {
        let problems = self.ctx.config.apply(node);
        for problem in problems {
            self.report(Severity::Warning, DiagnosticKind::Configuration, problem, node.line, node.column);
        }
        if self.ctx.config.debug_mode && !self.ctx.debug {
            self.ctx.debug = true;
            log::debug!(target: "chtl::parser", "{}: DEBUG_MODE enabled by configuration", self.ctx.path);
        }
    }

    /// `use html5;` or `use @Config Name;`
    pub(super) fn parse_use(&mut self, scope: &Scope) -> PResult<Node> {
        let head = self.bump();
        let target = if self.eat(TokenKind::Html5) {
            self.ctx.use_html5 = true;
            UseTarget::Html5
        } else if self.eat(TokenKind::AtConfig) {
            let name = self.parse_dotted("a configuration name")?;
            match self.table.get(SymbolKind::Configuration, scope, &name).cloned() {
                Some(config) => self.apply_config(&config),
                None => self.report(
                    Severity::Error,
                    DiagnosticKind::Resolution,
                    format!("unknown configuration `{name}`"),
                    head.line,
                    head.column,
                ),
            }
            UseTarget::Config(name)
        } else {
            return Err(self.error_here(format!("expected `html5` or `@Config` after `use`, found {}", self.peek())));
        };
        self.expect(TokenKind::Semicolon, "`;` after use")?;
        Ok(Node::new(NodeKind::Use(target), head.line, head.column))
    }

    /// `[Info] { }` and `[Export] { }` carry module metadata only.
    pub(super) fn skip_info_block(&mut self) -> PResult<()> {
        let head = self.bump();
        self.expect(TokenKind::LeftBrace, "`{`")?;
        let mut depth = 1usize;
        while depth > 0 {
            match self.bump().kind {
                TokenKind::LeftBrace => depth += 1,
                TokenKind::RightBrace => depth -= 1,
                TokenKind::Eof => return Err(self.error_at(&head, format!("unterminated {} block", head.lexeme))),
                _ => {}
            }
        }
        Ok(())
    }
}
