use chtl_style::{RuleHead, Selector, rule_head};

use super::{PResult, Parser};
use crate::ast::{
    DeleteTarget, InsertPosition, Node, NodeKind, OriginKind, RefCategory, TemplateFamily, TemplateRef,
};
use crate::error::{DiagnosticKind, Severity};
use crate::symbols::Scope;
use crate::token::TokenKind;

impl Parser<'_> {
    pub(super) fn parse_element(&mut self, scope: &Scope) -> PResult<Node> {
        let tag = self.bump();
        self.expect(TokenKind::LeftBrace, "`{`")?;
        let mut node = Node::element(tag.lexeme, tag.line, tag.column);
        self.parse_body(scope, &mut node)?;
        self.expect(TokenKind::RightBrace, "`}`")?;
        self.finish_element(&mut node);
        Ok(node)
    }

    /// Items of an element-like body up to (not including) its `}`.
    /// `owner` is the element itself, a template/custom element
    /// definition, an insert, or an element match.
    pub(super) fn parse_body(&mut self, scope: &Scope, owner: &mut Node) -> PResult<()> {
        loop {
            match self.kind() {
                TokenKind::RightBrace => return Ok(()),
                TokenKind::Eof => return Err(self.error_here("unterminated block, expected `}`")),
                _ => {}
            }
            let before = self.pos;
            if self.parse_body_item(scope, owner).is_err() {
                self.synchronize_statement();
            }
            if self.pos == before {
                self.bump();
            }
        }
    }

    fn parse_body_item(&mut self, scope: &Scope, owner: &mut Node) -> PResult<()> {
        let matching = matches!(owner.kind, NodeKind::ElementMatch { .. });
        match self.kind() {
            TokenKind::GeneratorComment => {
                let c = self.comment();
                owner.children.push(c);
            }
            TokenKind::Text => {
                let text = self.parse_text(scope)?;
                owner.children.push(text);
            }
            k if (k.is_word() || k == TokenKind::UnquotedLiteral) && self.at_assign(1) => {
                self.parse_attribute(scope, owner)?;
            }
            TokenKind::Style if self.kind_at(1) == TokenKind::LeftBrace => {
                let style = self.parse_local_style(scope)?;
                owner.children.push(style);
            }
            TokenKind::Script if self.kind_at(1) == TokenKind::LeftBrace => {
                let script = self.parse_script(scope)?;
                owner.children.push(script);
            }
            TokenKind::AtElement => {
                let nodes = self.parse_element_use(scope, None)?;
                owner.children.extend(nodes);
            }
            TokenKind::Inherit if self.kind_at(1) == TokenKind::AtElement => {
                self.bump();
                let nodes = self.parse_element_use(scope, None)?;
                owner.children.extend(nodes);
            }
            TokenKind::Template | TokenKind::Custom if self.kind_at(1) == TokenKind::AtElement => {
                let family = self.family_prefix();
                let nodes = self.parse_element_use(scope, family)?;
                owner.children.extend(nodes);
            }
            TokenKind::Origin => {
                let nodes = self.parse_origin(scope)?;
                owner.children.extend(nodes);
            }
            TokenKind::Except => {
                let except = self.parse_except()?;
                owner.children.push(except);
            }
            TokenKind::Delete | TokenKind::Insert if matching => {
                let op = self.parse_element_op(scope)?;
                owner.children.push(op);
            }
            TokenKind::Identifier if matching && self.kind_at(1) == TokenKind::LeftBracket => {
                let op = self.parse_element_op(scope)?;
                owner.children.push(op);
            }
            TokenKind::Identifier if self.kind_at(1) == TokenKind::LeftBrace => {
                let child = self.parse_element(scope)?;
                owner.children.push(child);
            }
            _ => return Err(self.error_here(format!("unexpected {} in element body", self.peek()))),
        }
        Ok(())
    }

    fn parse_attribute(&mut self, scope: &Scope, owner: &mut Node) -> PResult<()> {
        let name = self.bump();
        self.eat_assign();
        let value = self.parse_value(scope, &[TokenKind::Semicolon, TokenKind::RightBrace])?;
        self.eat(TokenKind::Semicolon);
        match &mut owner.kind {
            NodeKind::Element(el) => el.set_attribute(&name.lexeme, value),
            NodeKind::ElementMatch { .. } => {
                let attr = NodeKind::Attribute { name: name.lexeme, value };
                owner.children.push(Node::new(attr, name.line, name.column));
            }
            _ => {
                self.report(
                    Severity::Error,
                    DiagnosticKind::Syntax,
                    format!("attribute `{}` is only allowed inside an element", name.lexeme),
                    name.line,
                    name.column,
                );
            }
        }
        Ok(())
    }

    /// `text { ... }` or `text: value;`
    pub(super) fn parse_text(&mut self, scope: &Scope) -> PResult<Node> {
        let kw = self.bump();
        let content = if self.eat_assign() {
            let value = self.parse_value(scope, &[TokenKind::Semicolon, TokenKind::RightBrace])?;
            self.eat(TokenKind::Semicolon);
            value
        } else {
            self.expect(TokenKind::LeftBrace, "`{` after `text`")?;
            let value = self.parse_value(scope, &[TokenKind::RightBrace])?;
            self.expect(TokenKind::RightBrace, "`}`")?;
            value
        };
        Ok(Node::new(NodeKind::Text(content), kw.line, kw.column))
    }

    pub(super) fn parse_script(&mut self, _scope: &Scope) -> PResult<Node> {
        let kw = self.bump();
        self.expect(TokenKind::LeftBrace, "`{`")?;
        let body = if self.peek().kind == TokenKind::RawBlock { self.bump().lexeme } else { String::new() };
        self.expect(TokenKind::RightBrace, "`}` closing the script block")?;
        Ok(Node::new(NodeKind::LocalScript(body), kw.line, kw.column))
    }

    /// Consume a `[Template]` / `[Custom]` prefix in front of a reference.
    pub(super) fn family_prefix(&mut self) -> Option<TemplateFamily> {
        match self.kind() {
            TokenKind::Template => {
                self.bump();
                Some(TemplateFamily::Template)
            }
            TokenKind::Custom => {
                self.bump();
                Some(TemplateFamily::Custom)
            }
            _ => None,
        }
    }

    /// `Name`, `ns.Name` or `Name from ns.sub`, as one dotted name.
    pub(super) fn parse_ref_name(&mut self) -> PResult<String> {
        let mut name = self.parse_dotted("a template name")?;
        if self.eat(TokenKind::From) {
            let ns = self.parse_dotted("a namespace")?;
            name = format!("{ns}.{name}");
        }
        Ok(name)
    }

    pub(super) fn parse_dotted(&mut self, what: &str) -> PResult<String> {
        let mut name = self.expect_name(what)?.lexeme;
        while self.at(TokenKind::Dot) && self.peek_at(1).kind.is_word() {
            self.bump();
            name.push('.');
            name.push_str(&self.bump().lexeme);
        }
        Ok(name)
    }

    /// `@Element Name;` or `@Element Name { operations }`, expanded in place.
    pub(super) fn parse_element_use(&mut self, scope: &Scope, family: Option<TemplateFamily>) -> PResult<Vec<Node>> {
        let at = self.expect(TokenKind::AtElement, "`@Element`")?;
        let name = self.parse_ref_name()?;
        let target = TemplateRef { category: RefCategory::Element, family, name };
        let mut use_site = Node::new(NodeKind::Specialization(target), at.line, at.column);
        if self.at(TokenKind::LeftBrace) {
            self.bump();
            use_site.children = self.parse_element_ops(scope)?;
            self.expect(TokenKind::RightBrace, "`}`")?;
            self.eat(TokenKind::Semicolon);
        } else {
            self.expect(TokenKind::Semicolon, "`;` or a specialization block")?;
        }
        Ok(self.specializer(scope).instantiate_element(&use_site))
    }

    fn parse_element_ops(&mut self, scope: &Scope) -> PResult<Vec<Node>> {
        let mut ops = Vec::new();
        loop {
            match self.kind() {
                TokenKind::RightBrace => return Ok(ops),
                TokenKind::Eof => return Err(self.error_here("unterminated specialization block")),
                TokenKind::GeneratorComment => {
                    self.bump();
                    continue;
                }
                _ => {}
            }
            let before = self.pos;
            match self.parse_element_op(scope) {
                Ok(op) => ops.push(op),
                Err(_) => self.synchronize_statement(),
            }
            if self.pos == before {
                self.bump();
            }
        }
    }

    /// One of `delete ...;`, `insert ... { }` or `tag[index]? { }`.
    fn parse_element_op(&mut self, scope: &Scope) -> PResult<Node> {
        match self.kind() {
            TokenKind::Delete => self.parse_delete(false),
            TokenKind::Insert => self.parse_insert(scope),
            TokenKind::Identifier => {
                let tag = self.bump();
                let index = self.parse_index()?;
                self.expect(TokenKind::LeftBrace, "`{`")?;
                let kind = NodeKind::ElementMatch { tag: tag.lexeme, index };
                let mut op = Node::new(kind, tag.line, tag.column);
                self.parse_body(scope, &mut op)?;
                self.expect(TokenKind::RightBrace, "`}`")?;
                Ok(op)
            }
            _ => Err(self.error_here(format!("expected `delete`, `insert` or an element match, found {}", self.peek()))),
        }
    }

    /// Optional `[n]`, shifted by the configured initial index.
    pub(super) fn parse_index(&mut self) -> PResult<Option<usize>> {
        if !self.at(TokenKind::LeftBracket) {
            return Ok(None);
        }
        self.bump();
        let num = self.expect(TokenKind::Number, "an index")?;
        self.expect(TokenKind::RightBracket, "`]`")?;
        let base = self.ctx.config.index_initial_count;
        let raw: usize = match num.lexeme.parse() {
            Ok(n) => n,
            Err(_) => return Err(self.error_at(&num, format!("`{}` is not a valid index", num.lexeme))),
        };
        match raw.checked_sub(base) {
            Some(i) => Ok(Some(i)),
            None => Err(self.error_at(&num, format!("index {raw} is below the initial count {base}"))),
        }
    }

    /// `delete a, b[1], @Element X;`. In a style context bare names are
    /// properties, otherwise elements.
    pub(super) fn parse_delete(&mut self, style: bool) -> PResult<Node> {
        let kw = self.bump();
        let mut targets = Vec::new();
        loop {
            let family = self.family_prefix();
            let target = match self.kind() {
                TokenKind::AtElement | TokenKind::AtStyle | TokenKind::AtVar => {
                    let category = match self.bump().kind {
                        TokenKind::AtElement => RefCategory::Element,
                        TokenKind::AtStyle => RefCategory::Style,
                        _ => RefCategory::Var,
                    };
                    let name = self.parse_ref_name()?;
                    DeleteTarget::Reference(TemplateRef { category, family, name })
                }
                k if k.is_word() || k == TokenKind::UnquotedLiteral => {
                    let name = self.bump().lexeme;
                    if style {
                        DeleteTarget::StyleProperty(name)
                    } else {
                        let index = self.parse_index()?;
                        DeleteTarget::Element { tag: name, index }
                    }
                }
                _ => return Err(self.error_here(format!("expected a delete target, found {}", self.peek()))),
            };
            targets.push(target);
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::Semicolon, "`;` after delete")?;
        Ok(Node::new(NodeKind::Delete(targets), kw.line, kw.column))
    }

    /// `insert after|before|replace <selector> { ... }` or
    /// `insert at top|bottom { ... }`.
    fn parse_insert(&mut self, scope: &Scope) -> PResult<Node> {
        let kw = self.bump();
        let position = match self.kind() {
            TokenKind::After => InsertPosition::After,
            TokenKind::Before => InsertPosition::Before,
            TokenKind::Replace => InsertPosition::Replace,
            TokenKind::At => {
                self.bump();
                match self.kind() {
                    TokenKind::Top => InsertPosition::AtTop,
                    TokenKind::Bottom => InsertPosition::AtBottom,
                    _ => return Err(self.error_here("expected `top` or `bottom` after `insert at`")),
                }
            }
            _ => return Err(self.error_here(format!("expected an insert position, found {}", self.peek()))),
        };
        self.bump();

        let anchor = match position {
            InsertPosition::AtTop | InsertPosition::AtBottom => None,
            _ => {
                let at = self.peek().clone();
                let text = self.parse_value(scope, &[TokenKind::LeftBrace, TokenKind::Semicolon])?;
                let base = self.ctx.config.index_initial_count;
                match Selector::parse(&text).and_then(|s| s.rebase_index(base)) {
                    Ok(sel) => Some(sel),
                    Err(e) => return Err(self.error_at(&at, format!("bad insert anchor `{text}`: {e}"))),
                }
            }
        };

        self.expect(TokenKind::LeftBrace, "`{`")?;
        let mut op = Node::new(NodeKind::Insert { position, anchor }, kw.line, kw.column);
        self.parse_body(scope, &mut op)?;
        self.expect(TokenKind::RightBrace, "`}`")?;
        self.eat(TokenKind::Semicolon);
        Ok(op)
    }

    /// `except span, @Html, [Custom] @Element Box;`
    fn parse_except(&mut self) -> PResult<Node> {
        let kw = self.bump();
        let mut except = Node::new(NodeKind::Except, kw.line, kw.column);
        loop {
            let tok = self.peek().clone();
            let label = match self.kind() {
                TokenKind::Template | TokenKind::Custom if self.kind_at(1) != TokenKind::AtElement => {
                    self.bump().lexeme
                }
                TokenKind::Template | TokenKind::Custom | TokenKind::AtElement => {
                    self.family_prefix();
                    self.expect(TokenKind::AtElement, "`@Element`")?;
                    format!("@Element {}", self.parse_ref_name()?)
                }
                TokenKind::AtHtml | TokenKind::AtStyle | TokenKind::AtJavaScript => self.bump().lexeme,
                k if k.is_word() => self.bump().lexeme,
                _ => return Err(self.error_here(format!("expected a constraint, found {}", self.peek()))),
            };
            except.children.push(Node::new(NodeKind::Identifier(label), tok.line, tok.column));
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::Semicolon, "`;` after except")?;
        Ok(except)
    }

    /// Auto-add class/id from local style rules, then check `except`
    /// constraints.
    fn finish_element(&mut self, node: &mut Node) {
        let config = &self.ctx.config;
        let (no_class, no_id) = (config.disable_style_auto_add_class, config.disable_style_auto_add_id);
        let mut class = None;
        let mut id = None;
        for style in node.children.iter().filter(|c| c.kind == NodeKind::LocalStyle) {
            for rule in &style.children {
                if let NodeKind::StyleRule { selector } = &rule.kind {
                    match rule_head(selector) {
                        RuleHead::Class(c) if class.is_none() => class = Some(c),
                        RuleHead::Id(i) if id.is_none() => id = Some(i),
                        _ => {}
                    }
                }
            }
        }
        if let Some(el) = node.as_element_mut() {
            if let Some(c) = class.filter(|_| !no_class && el.class().is_none()) {
                el.add_class(&c);
            }
            if let Some(i) = id.filter(|_| !no_id && el.id().is_none()) {
                el.set_attribute("id", i);
            }
        }

        let constraints: Vec<(String, usize, usize)> = node
            .children
            .iter()
            .filter(|c| c.kind == NodeKind::Except)
            .flat_map(|c| c.children.iter())
            .filter_map(|c| match &c.kind {
                NodeKind::Identifier(label) => Some((label.clone(), c.line, c.column)),
                _ => None,
            })
            .collect();
        for (label, line, column) in constraints {
            if node.any_descendant(&|d| violates(d, &label)) {
                let tag = node.as_element().map(|e| e.tag.clone()).unwrap_or_default();
                self.report(
                    Severity::Error,
                    DiagnosticKind::Constraint,
                    format!("`{label}` is not allowed inside `{tag}`"),
                    line,
                    column,
                );
            }
        }
    }
}

fn violates(node: &Node, label: &str) -> bool {
    match label {
        "@Html" => matches!(node.kind, NodeKind::Origin { kind: OriginKind::Html, .. }),
        "@Style" => matches!(node.kind, NodeKind::Origin { kind: OriginKind::Style, .. }),
        "@JavaScript" => matches!(node.kind, NodeKind::Origin { kind: OriginKind::JavaScript, .. }),
        "[Custom]" | "[Template]" => node.origin.is_some(),
        _ => match label.strip_prefix("@Element ") {
            Some(name) => node.origin.as_deref() == Some(name),
            None => node.is_element(label),
        },
    }
}
