use chtl_style::{expand_ampersand, merge_declarations};

use crate::ast::{Element, Node, NodeKind, OriginKind};

/// Elements that never have a closing tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track", "wbr",
];

/// Program-level elements that belong in `<head>`.
const HEAD_ELEMENTS: &[&str] = &["title", "meta", "link", "base"];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeneratedOutput {
    pub html: String,
    pub css: String,
    pub script: String,
    pub head: String,
    pub use_html5: bool,
}

/// Walks a program tree once and fills the four output buffers.
pub struct Generator {
    pretty: bool,
    out: GeneratedOutput,
}

impl Generator {
    pub fn new(pretty: bool) -> Self {
        Generator { pretty, out: GeneratedOutput::default() }
    }

    pub fn generate(mut self, program: &Node) -> GeneratedOutput {
        if let NodeKind::Program { use_html5, .. } = &program.kind {
            self.out.use_html5 = *use_html5;
        }
        let mut html = String::new();
        self.top_level(&program.children, &mut html);
        self.out.html = html;
        log::debug!(
            target: "chtl::generator",
            "html {} / css {} / js {} / head {} bytes",
            self.out.html.len(),
            self.out.css.len(),
            self.out.script.len(),
            self.out.head.len()
        );
        self.out
    }

    fn top_level(&mut self, nodes: &[Node], html: &mut String) {
        for node in nodes {
            match &node.kind {
                NodeKind::Element(el) if HEAD_ELEMENTS.contains(&el.tag.as_str()) => {
                    let mut head = String::new();
                    self.element(node, el, 0, &mut head);
                    self.out.head.push_str(&head);
                }
                NodeKind::LocalStyle => self.global_style(node),
                NodeKind::Namespace(_) => self.top_level(&node.children, html),
                _ => self.node(node, 0, html),
            }
        }
    }

    fn node(&mut self, node: &Node, depth: usize, html: &mut String) {
        match &node.kind {
            NodeKind::Element(el) => self.element(node, el, depth, html),
            NodeKind::Text(text) => self.line(html, depth, &escape_text(text)),
            NodeKind::Comment(text) => self.line(html, depth, &format!("<!-- {text} -->")),
            NodeKind::Origin { kind, content, .. } => match kind {
                OriginKind::Html => self.line(html, depth, content.trim()),
                OriginKind::Style => push_block(&mut self.out.css, content),
                OriginKind::JavaScript => push_block(&mut self.out.script, content),
            },
            NodeKind::LocalScript(body) => push_block(&mut self.out.script, body),
            NodeKind::Namespace(_) | NodeKind::Program { .. } => {
                for child in &node.children {
                    self.node(child, depth, html);
                }
            }
            // handled by the owning element, or produce no output
            NodeKind::LocalStyle
            | NodeKind::Attribute { .. }
            | NodeKind::TemplateStyle(_)
            | NodeKind::TemplateElement(_)
            | NodeKind::TemplateVar(_)
            | NodeKind::CustomStyle(_)
            | NodeKind::CustomElement(_)
            | NodeKind::CustomVar(_)
            | NodeKind::Import(_)
            | NodeKind::Configuration { .. }
            | NodeKind::StyleRule { .. }
            | NodeKind::StyleProperty { .. }
            | NodeKind::Identifier(_)
            | NodeKind::StringLiteral(_)
            | NodeKind::Specialization(_)
            | NodeKind::Delete(_)
            | NodeKind::Insert { .. }
            | NodeKind::ElementMatch { .. }
            | NodeKind::Use(_)
            | NodeKind::Except => {}
        }
    }

    fn element(&mut self, node: &Node, el: &Element, depth: usize, html: &mut String) {
        let owner = owner_selector(el);
        let mut decls = Vec::new();
        for style in node.children.iter().filter(|c| c.kind == NodeKind::LocalStyle) {
            for item in &style.children {
                match &item.kind {
                    NodeKind::StyleProperty { name, value: Some(value) } => decls.push((name.clone(), value.clone())),
                    NodeKind::StyleRule { selector } => {
                        let selector = expand_ampersand(selector, &owner);
                        self.rule(&selector, &item.children);
                    }
                    _ => {}
                }
            }
        }

        let mut open = format!("<{}", el.tag);
        let mut style_written = false;
        for (name, value) in el.attributes() {
            let value = if name == "style" && !decls.is_empty() {
                style_written = true;
                merge_declarations(Some(value), &decls)
            } else {
                value.clone()
            };
            open.push_str(&format!(" {name}=\"{}\"", escape_attr(&value)));
        }
        if !style_written && !decls.is_empty() {
            open.push_str(&format!(" style=\"{}\"", escape_attr(&merge_declarations(None, &decls))));
        }
        open.push('>');

        if VOID_ELEMENTS.contains(&el.tag.as_str()) {
            self.line(html, depth, &open);
            return;
        }

        let mut inner = String::new();
        for child in &node.children {
            self.node(child, depth + 1, &mut inner);
        }
        let close = format!("</{}>", el.tag);
        if inner.is_empty() {
            self.line(html, depth, &format!("{open}{close}"));
        } else {
            self.line(html, depth, &open);
            html.push_str(&inner);
            self.line(html, depth, &close);
        }
    }

    /// Top-level `style { }`: rules go to the stylesheet as written.
    fn global_style(&mut self, node: &Node) {
        for item in &node.children {
            match &item.kind {
                NodeKind::StyleRule { selector } => self.rule(selector, &item.children),
                NodeKind::StyleProperty { name, .. } => {
                    log::debug!(target: "chtl::generator", "global style property `{name}` has no selector; skipped")
                }
                _ => {}
            }
        }
    }

    fn rule(&mut self, selector: &str, body: &[Node]) {
        let decls: Vec<(&str, &str)> = body
            .iter()
            .filter_map(|p| match &p.kind {
                NodeKind::StyleProperty { name, value: Some(value) } => Some((name.as_str(), value.as_str())),
                _ => None,
            })
            .collect();
        let css = &mut self.out.css;
        if self.pretty {
            css.push_str(selector);
            css.push_str(" {\n");
            for (name, value) in decls {
                css.push_str(&format!("  {name}: {value};\n"));
            }
            css.push_str("}\n");
        } else {
            css.push_str(selector);
            css.push('{');
            let body: Vec<String> = decls.iter().map(|(n, v)| format!("{n}:{v}")).collect();
            css.push_str(&body.join(";"));
            css.push('}');
        }
    }

    fn line(&self, out: &mut String, depth: usize, content: &str) {
        if self.pretty {
            for _ in 0..depth {
                out.push_str("  ");
            }
            out.push_str(content);
            out.push('\n');
        } else {
            out.push_str(content);
        }
    }
}

/// What `&` stands for in a rule nested in `el`'s local style.
fn owner_selector(el: &Element) -> String {
    if let Some(class) = el.class().and_then(|c| c.split_whitespace().next()) {
        return format!(".{class}");
    }
    if let Some(id) = el.id() {
        return format!("#{id}");
    }
    el.tag.clone()
}

fn push_block(buf: &mut String, content: &str) {
    let content = content.trim();
    if content.is_empty() {
        return;
    }
    buf.push_str(content);
    buf.push('\n');
}

pub fn escape_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn escape_attr(s: &str) -> String {
    escape_text(s).replace('"', "&quot;")
}

#[cfg(test)]
#[path = "generator_unit_tests.rs"]
mod generator_unit_tests;
