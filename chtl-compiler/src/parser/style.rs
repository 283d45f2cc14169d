use super::{PResult, Parser};
use crate::ast::{Node, NodeKind, RefCategory, TemplateFamily, TemplateRef};
use crate::symbols::Scope;
use crate::token::TokenKind;

/// Where a run of style items appears; decides which items are legal and
/// whether inherited properties must have values by now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum StyleContext {
    /// `style { }` inside an element.
    Local,
    /// Body of a nested rule inside a local style.
    Rule,
    /// `[Template] @Style` / `@Var` definition.
    Template,
    /// `[Custom] @Style` / `@Var` definition; may leave properties valueless.
    Custom,
    /// `@Style Name { ... }` use-site: fills and deletes.
    UseSite,
}

impl Parser<'_> {
    pub(super) fn parse_local_style(&mut self, scope: &Scope) -> PResult<Node> {
        let kw = self.bump();
        self.expect(TokenKind::LeftBrace, "`{`")?;
        let items = self.parse_style_items(scope, StyleContext::Local)?;
        self.expect(TokenKind::RightBrace, "`}` closing the style block")?;
        Ok(Node::new(NodeKind::LocalStyle, kw.line, kw.column).with_children(items))
    }

    /// Style items up to (not including) the closing `}`.
    pub(super) fn parse_style_items(&mut self, scope: &Scope, cx: StyleContext) -> PResult<Vec<Node>> {
        let mut items = Vec::new();
        loop {
            match self.kind() {
                TokenKind::RightBrace => return Ok(items),
                TokenKind::Eof => return Err(self.error_here("unterminated style block, expected `}`")),
                TokenKind::GeneratorComment => {
                    self.bump();
                    continue;
                }
                _ => {}
            }
            let before = self.pos;
            if self.parse_style_item(scope, cx, &mut items).is_err() {
                self.synchronize_statement();
            }
            if self.pos == before {
                self.bump();
            }
        }
    }

    fn parse_style_item(&mut self, scope: &Scope, cx: StyleContext, items: &mut Vec<Node>) -> PResult<()> {
        match self.kind() {
            TokenKind::Template | TokenKind::Custom | TokenKind::AtStyle | TokenKind::Inherit => {
                if self.at(TokenKind::Inherit) {
                    self.bump();
                }
                let family = self.family_prefix();
                let finalize = matches!(cx, StyleContext::Local | StyleContext::Rule);
                let props = self.parse_style_use(scope, family, finalize)?;
                items.extend(props);
            }
            TokenKind::Delete => {
                let op = self.parse_delete(true)?;
                if cx == StyleContext::UseSite {
                    items.push(op);
                } else {
                    self.specializer(scope).apply_style_ops(items, std::slice::from_ref(&op));
                }
            }
            _ if self.starts_rule() => {
                if cx != StyleContext::Local {
                    return Err(self.error_here("nested style rules are only allowed in a local style block"));
                }
                items.push(self.parse_style_rule(scope)?);
            }
            k if k.is_word() || k == TokenKind::UnquotedLiteral => {
                if self.at_assign(1) {
                    let prop = self.parse_property(scope)?;
                    fill(items, prop);
                } else {
                    self.parse_valueless(cx, items)?;
                }
            }
            _ => return Err(self.error_here(format!("unexpected {} in style block", self.peek()))),
        }
        Ok(())
    }

    /// A `{` before the next `;` or `}` means a nested rule.
    fn starts_rule(&self) -> bool {
        let mut n = 0;
        loop {
            match self.kind_at(n) {
                TokenKind::LeftBrace => return n > 0,
                TokenKind::Semicolon | TokenKind::RightBrace | TokenKind::Eof => return false,
                _ => n += 1,
            }
        }
    }

    fn parse_style_rule(&mut self, scope: &Scope) -> PResult<Node> {
        let head = self.peek().clone();
        let selector = self.parse_value(scope, &[TokenKind::LeftBrace])?;
        self.expect(TokenKind::LeftBrace, "`{`")?;
        let body = self.parse_style_items(scope, StyleContext::Rule)?;
        self.expect(TokenKind::RightBrace, "`}` closing the rule")?;
        Ok(Node::new(NodeKind::StyleRule { selector }, head.line, head.column).with_children(body))
    }

    /// `name: value;`
    fn parse_property(&mut self, scope: &Scope) -> PResult<Node> {
        let name = self.bump();
        self.eat_assign();
        let value = self.parse_value(scope, &[TokenKind::Semicolon, TokenKind::RightBrace])?;
        self.eat(TokenKind::Semicolon);
        if value.is_empty() {
            return Err(self.error_at(&name, format!("property `{}` has an empty value", name.lexeme)));
        }
        let kind = NodeKind::StyleProperty { name: name.lexeme, value: Some(value) };
        Ok(Node::new(kind, name.line, name.column))
    }

    /// `color, font-size;`: properties a custom leaves for its users.
    fn parse_valueless(&mut self, cx: StyleContext, items: &mut Vec<Node>) -> PResult<()> {
        let first = self.peek().clone();
        if cx != StyleContext::Custom {
            return Err(self.error_at(
                &first,
                format!("`{}` needs a value; valueless properties are only allowed in a [Custom] style", first.lexeme),
            ));
        }
        loop {
            let name = self.bump();
            let kind = NodeKind::StyleProperty { name: name.lexeme, value: None };
            items.push(Node::new(kind, name.line, name.column));
            if !self.eat(TokenKind::Comma) {
                break;
            }
            if !(self.peek().kind.is_word() || self.at(TokenKind::UnquotedLiteral)) {
                return Err(self.error_here("expected a property name after `,`"));
            }
        }
        self.expect(TokenKind::Semicolon, "`;` after the property list")?;
        Ok(())
    }

    /// `@Style Name;` or `@Style Name { fills and deletes }`, expanded into
    /// property nodes.
    fn parse_style_use(&mut self, scope: &Scope, family: Option<TemplateFamily>, finalize: bool) -> PResult<Vec<Node>> {
        let at = self.expect(TokenKind::AtStyle, "`@Style`")?;
        let name = self.parse_ref_name()?;
        let target = TemplateRef { category: RefCategory::Style, family, name };
        let mut use_site = Node::new(NodeKind::Specialization(target), at.line, at.column);
        if self.eat(TokenKind::LeftBrace) {
            use_site.children = self.parse_style_items(scope, StyleContext::UseSite)?;
            self.expect(TokenKind::RightBrace, "`}`")?;
            self.eat(TokenKind::Semicolon);
        } else {
            self.expect(TokenKind::Semicolon, "`;` or a specialization block")?;
        }
        Ok(self.specializer(scope).instantiate_style(&use_site, finalize))
    }
}

/// A later declaration of the same property replaces the earlier one
/// in place.
fn fill(items: &mut Vec<Node>, prop: Node) {
    let NodeKind::StyleProperty { name, .. } = &prop.kind else {
        items.push(prop);
        return;
    };
    let slot = items
        .iter_mut()
        .find(|p| matches!(&p.kind, NodeKind::StyleProperty { name: n, .. } if n == name));
    match slot {
        Some(slot) => *slot = prop,
        None => items.push(prop),
    }
}
