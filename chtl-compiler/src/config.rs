use std::collections::HashMap;

use crate::ast::{Node, NodeKind};
use crate::token::{Token, TokenKind};

/// Settings from `[Configuration]` blocks.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Config {
    /// Index written for the first of several same-tag siblings (`div[0]`).
    pub index_initial_count: usize,
    pub debug_mode: bool,
    pub disable_name_group: bool,
    pub disable_style_auto_add_class: bool,
    pub disable_style_auto_add_id: bool,
    aliases: HashMap<String, TokenKind>,
}

/// `[Name]` group keys and the keyword each one renames.
const NAME_KEYS: &[(&str, TokenKind)] = &[
    ("KEYWORD_TEXT", TokenKind::Text),
    ("KEYWORD_STYLE", TokenKind::Style),
    ("KEYWORD_SCRIPT", TokenKind::Script),
    ("KEYWORD_USE", TokenKind::Use),
    ("KEYWORD_HTML5", TokenKind::Html5),
    ("KEYWORD_INHERIT", TokenKind::Inherit),
    ("KEYWORD_DELETE", TokenKind::Delete),
    ("KEYWORD_INSERT", TokenKind::Insert),
    ("KEYWORD_AFTER", TokenKind::After),
    ("KEYWORD_BEFORE", TokenKind::Before),
    ("KEYWORD_REPLACE", TokenKind::Replace),
    ("KEYWORD_AT", TokenKind::At),
    ("KEYWORD_TOP", TokenKind::Top),
    ("KEYWORD_BOTTOM", TokenKind::Bottom),
    ("KEYWORD_FROM", TokenKind::From),
    ("KEYWORD_AS", TokenKind::As),
    ("KEYWORD_EXCEPT", TokenKind::Except),
    ("TEMPLATE_STYLE", TokenKind::AtStyle),
    ("CUSTOM_STYLE", TokenKind::AtStyle),
    ("ORIGIN_STYLE", TokenKind::AtStyle),
    ("TEMPLATE_ELEMENT", TokenKind::AtElement),
    ("CUSTOM_ELEMENT", TokenKind::AtElement),
    ("TEMPLATE_VAR", TokenKind::AtVar),
    ("CUSTOM_VAR", TokenKind::AtVar),
    ("ORIGIN_HTML", TokenKind::AtHtml),
    ("ORIGIN_JAVASCRIPT", TokenKind::AtJavaScript),
    ("IMPORT_CHTL", TokenKind::AtChtl),
    ("IMPORT_CJMOD", TokenKind::AtCJmod),
    ("CONFIGURATION_CONFIG", TokenKind::AtConfig),
];

impl Config {
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), String> {
        match key {
            "INDEX_INITIAL_COUNT" => {
                self.index_initial_count = value
                    .parse()
                    .map_err(|_| format!("INDEX_INITIAL_COUNT expects a number, got `{value}`"))?;
            }
            "DEBUG_MODE" => self.debug_mode = parse_bool(key, value)?,
            "DISABLE_NAME_GROUP" => self.disable_name_group = parse_bool(key, value)?,
            "DISABLE_STYLE_AUTO_ADD_CLASS" => self.disable_style_auto_add_class = parse_bool(key, value)?,
            "DISABLE_STYLE_AUTO_ADD_ID" => self.disable_style_auto_add_id = parse_bool(key, value)?,
            _ => return Err(format!("unknown configuration key `{key}`")),
        }
        Ok(())
    }

    /// Make every word in `words` an extra spelling of the keyword `key`
    /// names. The built-in spelling keeps working.
    pub fn add_aliases(&mut self, key: &str, words: &[String]) -> Result<(), String> {
        let kind = NAME_KEYS
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, kind)| *kind)
            .ok_or_else(|| format!("unknown [Name] key `{key}`"))?;
        for word in words {
            self.aliases.insert(word.clone(), kind);
        }
        Ok(())
    }

    /// Effective kind of `token` once aliases are applied.
    pub fn resolve(&self, token: &Token) -> TokenKind {
        if token.kind == TokenKind::Identifier {
            if let Some(kind) = self.aliases.get(&token.lexeme) {
                return *kind;
            }
        }
        token.kind
    }

    /// Apply a parsed `[Configuration]` node. Problems are returned as
    /// messages; valid entries are applied regardless.
    pub fn apply(&mut self, node: &Node) -> Vec<String> {
        let mut problems = Vec::new();
        for entry in &node.children {
            match &entry.kind {
                NodeKind::Attribute { name, value } => {
                    if let Err(e) = self.set(name, value) {
                        problems.push(e);
                    }
                }
                NodeKind::Identifier(group) if group == "Name" => {
                    if self.disable_name_group {
                        log::debug!(target: "chtl::config", "[Name] group ignored (DISABLE_NAME_GROUP)");
                        continue;
                    }
                    for alias in &entry.children {
                        if let NodeKind::Attribute { name, value } = &alias.kind {
                            let words: Vec<String> = value
                                .split(',')
                                .map(str::trim)
                                .filter(|w| !w.is_empty())
                                .map(str::to_string)
                                .collect();
                            if let Err(e) = self.add_aliases(name, &words) {
                                problems.push(e);
                            }
                        }
                    }
                }
                NodeKind::Identifier(group) => {
                    log::debug!(target: "chtl::config", "[{group}] group ignored");
                }
                _ => {}
            }
        }
        problems
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, String> {
    match value {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(format!("{key} expects true or false, got `{value}`")),
    }
}
