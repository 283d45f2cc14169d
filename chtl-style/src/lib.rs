use std::fmt;

use pest::Parser;
use pest::iterators::Pair;

#[derive(pest_derive::Parser)]
#[grammar = "selector.pest"]
struct SelectorParser;

/// A single-compound selector: `tag`, `tag[n]`, `.class` or `#id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    Tag { name: String, index: Option<usize> },
    Class(String),
    Id(String),
}

impl Selector {
    pub fn parse(src: &str) -> Result<Selector, String> {
        let src = src.trim();
        let mut pairs = SelectorParser::parse(Rule::anchor, src).map_err(|e| e.to_string())?;
        let anchor = pairs.next().ok_or_else(|| "empty selector".to_string())?;
        for node in anchor.into_inner() {
            match node.as_rule() {
                Rule::class_sel => return Ok(Selector::Class(ident_of(node))),
                Rule::id_sel => return Ok(Selector::Id(ident_of(node))),
                Rule::tag_sel => {
                    let mut name = String::new();
                    let mut index = None;
                    for part in node.into_inner() {
                        match part.as_rule() {
                            Rule::ident => name = part.as_str().to_string(),
                            Rule::index => {
                                let n = part
                                    .as_str()
                                    .parse::<usize>()
                                    .map_err(|e| format!("bad index in `{src}`: {e}"))?;
                                index = Some(n);
                            }
                            _ => {}
                        }
                    }
                    return Ok(Selector::Tag { name, index });
                }
                _ => {}
            }
        }
        Err(format!("unsupported selector `{src}`"))
    }

    /// Tag/class/id test only. A tag index is positional and has to be
    /// checked by the caller against same-tag siblings.
    pub fn matches(&self, tag: &str, id: Option<&str>, class_attr: Option<&str>) -> bool {
        match self {
            Selector::Tag { name, .. } => name == tag,
            Selector::Class(c) => class_attr
                .map(|classes| classes.split_whitespace().any(|x| x == c))
                .unwrap_or(false),
            Selector::Id(i) => id == Some(i.as_str()),
        }
    }

    pub fn index(&self) -> Option<usize> {
        match self {
            Selector::Tag { index, .. } => *index,
            _ => None,
        }
    }

    /// Shift a user-facing index (counted from `base`) to a 0-based one.
    pub fn rebase_index(self, base: usize) -> Result<Selector, String> {
        match self {
            Selector::Tag { name, index: Some(i) } => {
                let index = i
                    .checked_sub(base)
                    .ok_or_else(|| format!("index {i} of `{name}` is below the initial count {base}"))?;
                Ok(Selector::Tag { name, index: Some(index) })
            }
            other => Ok(other),
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Tag { name, index: Some(i) } => write!(f, "{name}[{i}]"),
            Selector::Tag { name, index: None } => f.write_str(name),
            Selector::Class(c) => write!(f, ".{c}"),
            Selector::Id(i) => write!(f, "#{i}"),
        }
    }
}

fn ident_of(node: Pair<Rule>) -> String {
    node.into_inner()
        .find(|p| p.as_rule() == Rule::ident)
        .map(|p| p.as_str().to_string())
        .unwrap_or_default()
}

/// What a local style rule selector starts with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleHead {
    Class(String),
    Id(String),
    Ampersand,
    Other,
}

pub fn rule_head(selector: &str) -> RuleHead {
    let selector = selector.trim();
    if selector.starts_with('&') {
        return RuleHead::Ampersand;
    }
    let Ok(mut pairs) = SelectorParser::parse(Rule::rule_head, selector) else {
        return RuleHead::Other;
    };
    let Some(head) = pairs.next() else {
        return RuleHead::Other;
    };
    for node in head.into_inner() {
        match node.as_rule() {
            Rule::class_sel => return RuleHead::Class(ident_of(node)),
            Rule::id_sel => return RuleHead::Id(ident_of(node)),
            _ => {}
        }
    }
    RuleHead::Other
}

/// Replace every `&` in a nested rule selector with the owner's selector.
pub fn expand_ampersand(selector: &str, owner: &str) -> String {
    selector.trim().replace('&', owner)
}

/// Split an inline `style` attribute into ordered `(name, value)` pairs.
pub fn parse_declarations(style: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for decl in style.split(';') {
        let decl = decl.trim();
        if decl.is_empty() { continue; }
        if let Some((k, v)) = decl.split_once(':') {
            out.push((k.trim().to_string(), v.trim().to_string()));
        }
    }
    out
}

pub fn serialize_declarations(decls: &[(String, String)]) -> String {
    let mut out = String::new();
    for (i, (k, v)) in decls.iter().enumerate() {
        if i > 0 { out.push(' '); }
        out.push_str(k);
        out.push_str(": ");
        out.push_str(v);
        out.push(';');
    }
    out
}

/// Merge declarations into an existing inline style. Existing order is
/// kept; a redeclared property takes the new value in place and unseen
/// properties are appended.
pub fn merge_declarations(existing: Option<&str>, decls: &[(String, String)]) -> String {
    let mut merged = existing.map(parse_declarations).unwrap_or_default();
    for (k, v) in decls {
        match merged.iter_mut().find(|(name, _)| name == k) {
            Some(slot) => slot.1 = v.clone(),
            None => merged.push((k.clone(), v.clone())),
        }
    }
    serialize_declarations(&merged)
}
