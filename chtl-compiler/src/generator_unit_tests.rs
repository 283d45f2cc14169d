use super::*;
use crate::ast::Element;

#[test]
fn escapes_markup_and_quotes() {
    assert_eq!(escape_text("a < b & c"), "a &lt; b &amp; c");
    assert_eq!(escape_attr(r#"say "hi""#), "say &quot;hi&quot;");
}

#[test]
fn ampersand_prefers_class_then_id_then_tag() {
    let mut el = Element::new("div");
    assert_eq!(owner_selector(&el), "div");
    el.set_attribute("id", "main");
    assert_eq!(owner_selector(&el), "#main");
    el.set_attribute("class", "card wide");
    assert_eq!(owner_selector(&el), ".card");
}

#[test]
fn compact_mode_has_no_whitespace() {
    let text = Node::new(NodeKind::Text("x".into()), 1, 1);
    let div = Node::element("div", 1, 1).with_children(vec![text]);
    let program = Node::new(NodeKind::Program { path: "t".into(), use_html5: false }, 1, 1).with_children(vec![div]);
    let out = Generator::new(false).generate(&program);
    assert_eq!(out.html, "<div>x</div>");
}

#[test]
fn void_elements_drop_children() {
    let child = Node::new(NodeKind::Text("ignored".into()), 1, 1);
    let br = Node::element("br", 1, 1).with_children(vec![child]);
    let program = Node::new(NodeKind::Program { path: "t".into(), use_html5: false }, 1, 1).with_children(vec![br]);
    let out = Generator::new(true).generate(&program);
    assert_eq!(out.html, "<br>\n");
}
