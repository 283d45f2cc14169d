//! Applies delete / insert / element-match operations to a private copy of
//! a template or custom definition. Stored definitions are only ever read.

use chtl_style::Selector;

use crate::ast::{DeleteTarget, InsertPosition, Node, NodeKind, RefCategory, TemplateRef};
use crate::error::{Diagnostic, DiagnosticKind, Severity};
use crate::symbols::{Scope, SymbolKind, SymbolTable};

pub struct Specializer<'a> {
    table: &'a SymbolTable,
    scope: &'a Scope,
    path: &'a str,
    diagnostics: &'a mut Vec<Diagnostic>,
}

impl<'a> Specializer<'a> {
    pub fn new(
        table: &'a SymbolTable,
        scope: &'a Scope,
        path: &'a str,
        diagnostics: &'a mut Vec<Diagnostic>,
    ) -> Self {
        Specializer { table, scope, path, diagnostics }
    }

    fn lookup(&mut self, target: &TemplateRef, at: &Node) -> Option<&'a Node> {
        let table = self.table;
        let kinds = SymbolKind::candidates(target.category, target.family);
        match table.find(&kinds, self.scope, &target.name) {
            Some((_, node)) => Some(node),
            None => {
                self.report(
                    Severity::Error,
                    DiagnosticKind::Resolution,
                    format!("unknown {} `{}`", target.category.describe(), target.name),
                    at,
                );
                None
            }
        }
    }

    /// Expand an `@Element` use-site into the nodes it stands for. An
    /// unknown name is reported and expands to nothing.
    pub fn instantiate_element(&mut self, use_site: &Node) -> Vec<Node> {
        let NodeKind::Specialization(target) = &use_site.kind else {
            return Vec::new();
        };
        let Some(definition) = self.lookup(target, use_site) else {
            return Vec::new();
        };
        let mut instance = definition.clone();
        instance.mark_origin(&target.name);
        self.apply_element_ops(&mut instance, &use_site.children);
        log::debug!(
            target: "chtl::specialize",
            "@Element {} expanded to {} node(s)",
            target.name,
            instance.children.len()
        );
        instance.children
    }

    /// Apply element operations to `target`'s children, in order.
    pub fn apply_element_ops(&mut self, target: &mut Node, ops: &[Node]) {
        for op in ops {
            match &op.kind {
                NodeKind::Delete(targets) => {
                    for t in targets {
                        delete_from(target, t);
                    }
                }
                NodeKind::Insert { position, anchor } => {
                    self.insert(target, op, *position, anchor.as_ref());
                }
                NodeKind::ElementMatch { tag, index } => {
                    self.match_elements(target, op, tag, *index);
                }
                // fills for style use-sites; nothing to do on elements
                _ => {}
            }
        }
    }

    fn insert(&mut self, target: &mut Node, op: &Node, position: InsertPosition, anchor: Option<&Selector>) {
        let at = match position {
            InsertPosition::AtTop => Some(0),
            InsertPosition::AtBottom => Some(target.children.len()),
            _ => anchor.and_then(|sel| find_anchor(&target.children, sel)),
        };
        let Some(i) = at else {
            let anchor = anchor.map(|s| s.to_string()).unwrap_or_default();
            self.report(
                Severity::Warning,
                DiagnosticKind::SpecializationMiss,
                format!("insert anchor `{anchor}` matched nothing; insert skipped"),
                op,
            );
            return;
        };
        let (cut, keep_from) = match position {
            InsertPosition::After => (i + 1, i + 1),
            InsertPosition::Replace => (i, i + 1),
            _ => (i, i),
        };
        let tail = target.children.split_off(keep_from);
        target.children.truncate(cut);
        target.children.extend(op.children.iter().cloned());
        target.children.extend(tail);
    }

    fn match_elements(&mut self, target: &mut Node, op: &Node, tag: &str, index: Option<usize>) {
        let mut nth = 0;
        let mut hits = 0;
        for child in target.children.iter_mut() {
            if !child.is_element(tag) {
                continue;
            }
            let i = nth;
            nth += 1;
            if index.is_some_and(|n| n != i) {
                continue;
            }
            hits += 1;
            self.decorate(child, &op.children);
        }
        if hits == 0 {
            log::debug!(target: "chtl::specialize", "no `{tag}` child matched at {}:{}", op.line, op.column);
        }
    }

    /// Add an element-match body onto one matched element.
    fn decorate(&mut self, element: &mut Node, additions: &[Node]) {
        let mut nested = Vec::new();
        for add in additions {
            match &add.kind {
                NodeKind::Attribute { name, value } => {
                    if let Some(el) = element.as_element_mut() {
                        el.set_attribute(name, value.clone());
                    }
                }
                NodeKind::LocalStyle => merge_local_style(element, add),
                NodeKind::Delete(_) | NodeKind::Insert { .. } | NodeKind::ElementMatch { .. } => {
                    nested.push(add.clone())
                }
                _ => element.children.push(add.clone()),
            }
        }
        if !nested.is_empty() {
            self.apply_element_ops(element, &nested);
        }
    }

    /// Expand an `@Style` use-site into property (and rule) nodes. With
    /// `finalize`, properties still lacking a value are dropped with a
    /// warning; definitions that inherit keep them for their own users.
    pub fn instantiate_style(&mut self, use_site: &Node, finalize: bool) -> Vec<Node> {
        let NodeKind::Specialization(target) = &use_site.kind else {
            return Vec::new();
        };
        let Some(definition) = self.lookup(target, use_site) else {
            return Vec::new();
        };
        let mut props = definition.children.clone();
        for p in &mut props {
            p.mark_origin(&target.name);
        }
        self.apply_style_ops(&mut props, &use_site.children);
        if finalize {
            let mut kept = Vec::with_capacity(props.len());
            for p in props {
                if let NodeKind::StyleProperty { name, value: None } = &p.kind {
                    let message = format!("property `{name}` of `{}` was never given a value", target.name);
                    self.report(Severity::Warning, DiagnosticKind::Resolution, message, use_site);
                    continue;
                }
                kept.push(p);
            }
            props = kept;
        }
        props
    }

    /// Fill, add or delete style properties.
    pub fn apply_style_ops(&mut self, props: &mut Vec<Node>, ops: &[Node]) {
        for op in ops {
            match &op.kind {
                NodeKind::StyleProperty { name, value: Some(value) } => {
                    let existing = props.iter_mut().find(|p| {
                        matches!(&p.kind, NodeKind::StyleProperty { name: n, .. } if n == name)
                    });
                    match existing {
                        Some(p) => {
                            p.kind = NodeKind::StyleProperty { name: name.clone(), value: Some(value.clone()) }
                        }
                        None => props.push(op.clone()),
                    }
                }
                NodeKind::Delete(targets) => {
                    for t in targets {
                        match t {
                            DeleteTarget::StyleProperty(n) | DeleteTarget::Element { tag: n, .. } => {
                                props.retain(|p| !is_property(p, n))
                            }
                            DeleteTarget::Reference(r) => {
                                props.retain(|p| p.origin.as_deref() != Some(r.name.as_str()))
                            }
                        }
                    }
                }
                NodeKind::StyleRule { .. } => props.push(op.clone()),
                _ => {}
            }
        }
    }

    /// Resolve `Group(key)` or `Group(key = override)` from a variable
    /// group. A custom group use-site may override the stored value.
    pub fn resolve_var(&mut self, group: &str, key: &str, replacement: Option<&str>, at: &Node) -> Option<String> {
        let target = TemplateRef { category: RefCategory::Var, family: None, name: group.to_string() };
        let definition = self.lookup(&target, at)?;
        if let Some(v) = replacement {
            return Some(v.to_string());
        }
        let found = definition.children.iter().find_map(|c| match &c.kind {
            NodeKind::StyleProperty { name, value } if name == key => value.clone(),
            _ => None,
        });
        if found.is_none() {
            self.report(
                Severity::Error,
                DiagnosticKind::Resolution,
                format!("variable group `{group}` has no `{key}`"),
                at,
            );
        }
        found
    }

    fn report(&mut self, severity: Severity, kind: DiagnosticKind, message: String, at: &Node) {
        match severity {
            Severity::Error => log::error!(target: "chtl::specialize", "{}:{}: {message}", at.line, at.column),
            Severity::Warning => log::warn!(target: "chtl::specialize", "{}:{}: {message}", at.line, at.column),
        }
        self.diagnostics.push(Diagnostic {
            severity,
            kind,
            message,
            path: self.path.to_string(),
            line: at.line,
            column: at.column,
        });
    }
}

fn is_property(node: &Node, name: &str) -> bool {
    matches!(&node.kind, NodeKind::StyleProperty { name: n, .. } if n == name)
}

fn delete_from(target: &mut Node, what: &DeleteTarget) {
    match what {
        DeleteTarget::Element { tag, index } => {
            let mut nth = 0;
            target.children.retain(|c| {
                if !c.is_element(tag) {
                    return true;
                }
                let i = nth;
                nth += 1;
                index.is_some_and(|n| n != i)
            });
        }
        DeleteTarget::StyleProperty(name) => {
            for style in target.children.iter_mut().filter(|c| c.kind == NodeKind::LocalStyle) {
                style.children.retain(|p| !is_property(p, name));
            }
        }
        DeleteTarget::Reference(r) => {
            target.children.retain(|c| c.origin.as_deref() != Some(r.name.as_str()));
        }
    }
}

/// Index of the first child element matching `sel`; a tag index picks the
/// n-th same-tag sibling instead.
fn find_anchor(children: &[Node], sel: &Selector) -> Option<usize> {
    let mut nth = 0;
    for (i, child) in children.iter().enumerate() {
        let Some(el) = child.as_element() else { continue };
        if !sel.matches(&el.tag, el.id(), el.class()) {
            continue;
        }
        if sel.index().is_none_or(|n| n == nth) {
            return Some(i);
        }
        nth += 1;
    }
    None
}

/// Merge a match body's `style { }` into the element's own local style:
/// same-name properties are overwritten, everything else appended.
fn merge_local_style(element: &mut Node, addition: &Node) {
    let Some(style) = element.children.iter_mut().find(|c| c.kind == NodeKind::LocalStyle) else {
        element.children.push(addition.clone());
        return;
    };
    for item in &addition.children {
        if let NodeKind::StyleProperty { name, .. } = &item.kind {
            if let Some(slot) = style.children.iter_mut().find(|p| is_property(p, name)) {
                *slot = item.clone();
                continue;
            }
        }
        style.children.push(item.clone());
    }
}
