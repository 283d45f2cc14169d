use chtl_style::Selector;

/// Every node owns its children. Template expansion deep-copies the stored
/// definition, so no two parents ever share a subtree.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub line: usize,
    pub column: usize,
    pub children: Vec<Node>,
    /// Name of the template or custom this node was copied from.
    pub origin: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Program { path: String, use_html5: bool },
    Element(Element),
    Text(String),
    Attribute { name: String, value: String },
    LocalStyle,
    LocalScript(String),
    TemplateStyle(String),
    TemplateElement(String),
    TemplateVar(String),
    CustomStyle(String),
    CustomElement(String),
    CustomVar(String),
    Origin { kind: OriginKind, name: Option<String>, content: String },
    Import(Import),
    Namespace(String),
    Configuration { name: Option<String> },
    StyleRule { selector: String },
    StyleProperty { name: String, value: Option<String> },
    Identifier(String),
    StringLiteral(String),
    /// A use-site of a template or custom; children are delta operations
    /// and style property fills.
    Specialization(TemplateRef),
    Delete(Vec<DeleteTarget>),
    /// Children are the inserted content.
    Insert { position: InsertPosition, anchor: Option<Selector> },
    /// Children are appended to every matched element.
    ElementMatch { tag: String, index: Option<usize> },
    Comment(String),
    Use(UseTarget),
    /// `except ...;` inside an element. Children are `Identifier` nodes.
    Except,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub tag: String,
    attributes: Vec<(String, String)>,
    id: Option<String>,
    class: Option<String>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Element { tag: tag.into(), attributes: Vec::new(), id: None, class: None }
    }

    /// Last write wins; a replaced attribute keeps its original slot.
    pub fn set_attribute(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match name {
            "id" => self.id = Some(value.clone()),
            "class" => self.class = Some(value.clone()),
            _ => {}
        }
        match self.attributes.iter_mut().find(|(n, _)| n == name) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((name.to_string(), value)),
        }
    }

    pub fn remove_attribute(&mut self, name: &str) -> Option<String> {
        let at = self.attributes.iter().position(|(n, _)| n == name)?;
        match name {
            "id" => self.id = None,
            "class" => self.class = None,
            _ => {}
        }
        Some(self.attributes.remove(at).1)
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.iter().find(|(n, _)| n == name).map(|(_, v)| v.as_str())
    }

    pub fn attributes(&self) -> &[(String, String)] {
        &self.attributes
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn class(&self) -> Option<&str> {
        self.class.as_deref()
    }

    pub fn has_class(&self, name: &str) -> bool {
        self.class.as_deref().is_some_and(|c| c.split_whitespace().any(|x| x == name))
    }

    pub fn add_class(&mut self, name: &str) {
        if self.has_class(name) {
            return;
        }
        let class = match self.class.as_deref() {
            Some(existing) if !existing.trim().is_empty() => format!("{existing} {name}"),
            _ => name.to_string(),
        };
        self.set_attribute("class", class);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OriginKind {
    Html,
    Style,
    JavaScript,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportKind {
    Chtl,
    Html,
    Style,
    JavaScript,
    CJmod,
    /// `[Import] [Custom] @Element Box from ...`: a single definition.
    Definition(TemplateKind),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Import {
    pub kind: ImportKind,
    pub path: String,
    pub alias: Option<String>,
    /// Definition name for single-definition imports.
    pub item: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateFamily {
    Template,
    Custom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateKind {
    Style(TemplateFamily),
    Element(TemplateFamily),
    Var(TemplateFamily),
}

/// A named reference to a stored definition. `family` is `None` when the
/// use-site did not say `[Template]` or `[Custom]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateRef {
    pub category: RefCategory,
    pub family: Option<TemplateFamily>,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefCategory {
    Style,
    Element,
    Var,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteTarget {
    Element { tag: String, index: Option<usize> },
    StyleProperty(String),
    Reference(TemplateRef),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertPosition {
    Before,
    After,
    Replace,
    AtTop,
    AtBottom,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UseTarget {
    Html5,
    Config(String),
}

impl Node {
    pub fn new(kind: NodeKind, line: usize, column: usize) -> Self {
        Node { kind, line, column, children: Vec::new(), origin: None }
    }

    pub fn element(tag: impl Into<String>, line: usize, column: usize) -> Self {
        Node::new(NodeKind::Element(Element::new(tag)), line, column)
    }

    pub fn with_children(mut self, children: Vec<Node>) -> Self {
        self.children = children;
        self
    }

    pub fn as_element(&self) -> Option<&Element> {
        match &self.kind {
            NodeKind::Element(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_element_mut(&mut self) -> Option<&mut Element> {
        match &mut self.kind {
            NodeKind::Element(e) => Some(e),
            _ => None,
        }
    }

    pub fn is_element(&self, tag: &str) -> bool {
        self.as_element().is_some_and(|e| e.tag == tag)
    }

    /// Child elements in order, skipping text, styles and the rest.
    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(Node::as_element)
    }

    /// Stamp `origin` on this node and every descendant that has none yet.
    pub fn mark_origin(&mut self, name: &str) {
        if self.origin.is_none() {
            self.origin = Some(name.to_string());
        }
        for child in &mut self.children {
            child.mark_origin(name);
        }
    }

    /// Depth-first search over descendants (not `self`).
    pub fn any_descendant(&self, pred: &dyn Fn(&Node) -> bool) -> bool {
        self.children.iter().any(|c| pred(c) || c.any_descendant(pred))
    }
}

impl TemplateKind {
    pub fn category(self) -> RefCategory {
        match self {
            TemplateKind::Style(_) => RefCategory::Style,
            TemplateKind::Element(_) => RefCategory::Element,
            TemplateKind::Var(_) => RefCategory::Var,
        }
    }

    /// The node kind a definition of this kind is stored as.
    pub fn definition(self, name: String) -> NodeKind {
        use TemplateFamily::*;
        match self {
            TemplateKind::Style(Template) => NodeKind::TemplateStyle(name),
            TemplateKind::Element(Template) => NodeKind::TemplateElement(name),
            TemplateKind::Var(Template) => NodeKind::TemplateVar(name),
            TemplateKind::Style(Custom) => NodeKind::CustomStyle(name),
            TemplateKind::Element(Custom) => NodeKind::CustomElement(name),
            TemplateKind::Var(Custom) => NodeKind::CustomVar(name),
        }
    }
}

impl RefCategory {
    pub fn describe(self) -> &'static str {
        match self {
            RefCategory::Style => "@Style",
            RefCategory::Element => "@Element",
            RefCategory::Var => "@Var",
        }
    }
}
