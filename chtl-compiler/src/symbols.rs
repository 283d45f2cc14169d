//! Namespace-scoped registry of templates, customs, origins, namespaces and
//! named configurations ("GlobalMap").

use std::collections::HashMap;

use crate::ast::{Node, RefCategory, TemplateFamily, TemplateKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    TemplateStyle,
    TemplateElement,
    TemplateVar,
    CustomStyle,
    CustomElement,
    CustomVar,
    Origin,
    Namespace,
    Configuration,
}

impl SymbolKind {
    pub fn of_template(kind: TemplateKind) -> SymbolKind {
        use TemplateFamily::*;
        match kind {
            TemplateKind::Style(Template) => SymbolKind::TemplateStyle,
            TemplateKind::Element(Template) => SymbolKind::TemplateElement,
            TemplateKind::Var(Template) => SymbolKind::TemplateVar,
            TemplateKind::Style(Custom) => SymbolKind::CustomStyle,
            TemplateKind::Element(Custom) => SymbolKind::CustomElement,
            TemplateKind::Var(Custom) => SymbolKind::CustomVar,
        }
    }

    /// Kinds a reference may resolve to, in lookup order. Customs win over
    /// templates when the use-site does not name a family.
    pub fn candidates(category: RefCategory, family: Option<TemplateFamily>) -> Vec<SymbolKind> {
        let families = match family {
            Some(f) => vec![f],
            None => vec![TemplateFamily::Custom, TemplateFamily::Template],
        };
        families
            .into_iter()
            .map(|f| {
                SymbolKind::of_template(match category {
                    RefCategory::Style => TemplateKind::Style(f),
                    RefCategory::Element => TemplateKind::Element(f),
                    RefCategory::Var => TemplateKind::Var(f),
                })
            })
            .collect()
    }
}

/// The active namespace path. Entering or leaving a namespace yields a new
/// scope value; the old one stays valid.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scope {
    path: Vec<String>,
}

impl Scope {
    pub fn root() -> Self {
        Scope::default()
    }

    /// Entering a namespace that is already on the path is a no-op.
    pub fn enter(&self, name: &str) -> Scope {
        if self.path.iter().any(|p| p == name) {
            log::debug!(target: "chtl::symbols", "namespace `{name}` already active; not re-entered");
            return self.clone();
        }
        let mut path = self.path.clone();
        path.push(name.to_string());
        Scope { path }
    }

    pub fn exit(&self) -> Scope {
        let mut path = self.path.clone();
        path.pop();
        Scope { path }
    }

    pub fn is_root(&self) -> bool {
        self.path.is_empty()
    }

    pub fn path(&self) -> &[String] {
        &self.path
    }

    /// Dot-joined namespace path plus `name`.
    pub fn qualify(&self, name: &str) -> String {
        if self.path.is_empty() {
            name.to_string()
        } else {
            format!("{}.{}", self.path.join("."), name)
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    entries: HashMap<(SymbolKind, String), Node>,
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable::default()
    }

    /// Register `node` under `scope`. Returns the definition it replaced.
    pub fn add(&mut self, kind: SymbolKind, scope: &Scope, name: &str, node: Node) -> Option<Node> {
        let full = scope.qualify(name);
        log::debug!(target: "chtl::symbols", "register {kind:?} `{full}`");
        let previous = self.entries.insert((kind, full.clone()), node);
        if previous.is_some() {
            log::debug!(target: "chtl::symbols", "{kind:?} `{full}` redefined; last definition wins");
        }
        previous
    }

    /// Look `name` up in the active namespace first, then at the root.
    pub fn get(&self, kind: SymbolKind, scope: &Scope, name: &str) -> Option<&Node> {
        if !scope.is_root() {
            if let Some(node) = self.entries.get(&(kind, scope.qualify(name))) {
                return Some(node);
            }
        }
        self.entries.get(&(kind, name.to_string()))
    }

    pub fn has(&self, kind: SymbolKind, scope: &Scope, name: &str) -> bool {
        self.get(kind, scope, name).is_some()
    }

    /// First hit among `kinds`, tried in order.
    pub fn find(&self, kinds: &[SymbolKind], scope: &Scope, name: &str) -> Option<(SymbolKind, &Node)> {
        kinds
            .iter()
            .find_map(|&kind| self.get(kind, scope, name).map(|node| (kind, node)))
    }

    /// Copy every entry of `other` in, prefixing names with `prefix.` when
    /// given. Existing entries are overwritten.
    pub fn merge(&mut self, other: &SymbolTable, prefix: Option<&str>) {
        let scope = match prefix {
            Some(p) if !p.is_empty() => Scope { path: p.split('.').map(str::to_string).collect() },
            _ => Scope::root(),
        };
        for ((kind, name), node) in &other.entries {
            self.add(*kind, &scope, name, node.clone());
        }
        if let Some(p) = prefix.filter(|p| !p.is_empty()) {
            let ns = Node::new(crate::ast::NodeKind::Namespace(p.to_string()), 0, 0);
            self.entries.entry((SymbolKind::Namespace, p.to_string())).or_insert(ns);
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Fully-qualified names registered for `kind`, sorted.
    pub fn names(&self, kind: SymbolKind) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .entries
            .keys()
            .filter(|(k, _)| *k == kind)
            .map(|(_, n)| n.as_str())
            .collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidates_prefer_custom() {
        assert_eq!(
            SymbolKind::candidates(RefCategory::Element, None),
            vec![SymbolKind::CustomElement, SymbolKind::TemplateElement]
        );
        assert_eq!(
            SymbolKind::candidates(RefCategory::Style, Some(TemplateFamily::Template)),
            vec![SymbolKind::TemplateStyle]
        );
    }

    #[test]
    fn scope_enter_exit_are_values() {
        let root = Scope::root();
        let a = root.enter("a");
        let ab = a.enter("b");
        assert_eq!(ab.qualify("x"), "a.b.x");
        assert_eq!(a.qualify("x"), "a.x");
        assert_eq!(ab.exit(), a);
        assert!(root.is_root());
        assert_eq!(ab.enter("a"), ab);
    }
}
