use chtl_compiler::{Compiler, DiagnosticKind, Node, Scope, SymbolKind};

const ROW: &str = r#"
[Template] @Element Row {
    span { class: a; }
    span { class: b; }
    span { class: c; }
}
[Custom] @Element Box {
    @Element Row;
}
"#;

fn program(src: &str) -> (Compiler, Node, Vec<chtl_compiler::Diagnostic>) {
    let mut compiler = Compiler::default();
    let (program, ctx) = compiler.parse(src, "t.chtl").unwrap();
    (compiler, program, ctx.diagnostics)
}

fn classes_of(node: &Node) -> Vec<String> {
    node.child_elements().filter_map(|e| e.class()).map(str::to_string).collect()
}

fn element<'a>(program: &'a Node, tag: &str) -> &'a Node {
    program.children.iter().find(|n| n.is_element(tag)).unwrap()
}

#[test]
fn delete_by_index_leaves_definition_untouched() {
    let src = format!("{ROW}\ndiv {{ @Element Box {{ delete span[0]; }} }}");
    let (compiler, program, diags) = program(&src);
    assert!(diags.is_empty(), "{diags:?}");
    assert_eq!(classes_of(element(&program, "div")), ["b", "c"]);

    let stored = compiler.symbols().get(SymbolKind::CustomElement, &Scope::root(), "Box").unwrap();
    assert_eq!(stored.children.len(), 3);
    let stored = compiler.symbols().get(SymbolKind::TemplateElement, &Scope::root(), "Row").unwrap();
    assert_eq!(stored.children.len(), 3);
}

#[test]
fn sibling_use_sites_are_isolated() {
    let src = format!(
        "{ROW}\ndiv {{ @Element Box {{ delete span; }} }}\np {{ @Element Box; }}\nsection {{ @Element Box {{ span[1] {{ id: hot; }} }} }}"
    );
    let (_, program, diags) = program(&src);
    assert!(diags.is_empty(), "{diags:?}");
    assert!(classes_of(element(&program, "div")).is_empty());
    assert_eq!(classes_of(element(&program, "p")), ["a", "b", "c"]);
    assert!(element(&program, "p").child_elements().all(|e| e.id().is_none()));

    let ids: Vec<_> = element(&program, "section").child_elements().map(|e| e.id()).collect();
    assert_eq!(ids, [None, Some("hot"), None]);
}

#[test]
fn insert_positions() {
    let src = r#"
        [Template] @Element Pair { span { } p { } }
        div {
            @Element Pair {
                insert after span[0] { em { } }
                insert before p { b { } }
                insert at top { h1 { } }
                insert at bottom { footer { } }
            }
        }
        main { @Element Pair { insert replace p { i { } } } }
    "#;
    let (_, program, diags) = program(src);
    assert!(diags.is_empty(), "{diags:?}");
    let tags: Vec<_> = element(&program, "div").child_elements().map(|e| e.tag.clone()).collect();
    assert_eq!(tags, ["h1", "span", "em", "b", "p", "footer"]);
    let tags: Vec<_> = element(&program, "main").child_elements().map(|e| e.tag.clone()).collect();
    assert_eq!(tags, ["span", "i"]);
}

#[test]
fn insert_anchor_miss_warns_and_skips() {
    let src = "[Template] @Element One { span { } }\ndiv { @Element One { insert after table { em { } } } }";
    let (_, program, diags) = program(src);
    assert_eq!(diags.len(), 1);
    assert_eq!(diags[0].kind, DiagnosticKind::SpecializationMiss);
    assert!(!diags[0].is_error());
    let tags: Vec<_> = element(&program, "div").child_elements().map(|e| e.tag.clone()).collect();
    assert_eq!(tags, ["span"]);
}

#[test]
fn delete_by_origin_removes_inherited_block() {
    let src = r#"
        [Template] @Element Head { h1 { } }
        [Custom] @Element Page { @Element Head; p { } }
        div { @Element Page { delete @Element Head; } }
    "#;
    let (_, program, diags) = program(src);
    assert!(diags.is_empty(), "{diags:?}");
    let tags: Vec<_> = element(&program, "div").child_elements().map(|e| e.tag.clone()).collect();
    assert_eq!(tags, ["p"]);
}

#[test]
fn element_match_merges_style_and_nested_ops() {
    let src = r#"
        [Template] @Element Card {
            div { style { color: red; } span { } em { } }
        }
        body {
            @Element Card {
                div {
                    style { color: blue; margin: 0; }
                    delete span;
                }
            }
        }
    "#;
    let out = Compiler::default().compile(src, "t.chtl").unwrap();
    assert!(out.diagnostics.is_empty(), "{:?}", out.diagnostics);
    assert!(out.html.contains(r#"<div style="color: blue; margin: 0;">"#), "{}", out.html);
    assert!(!out.html.contains("<span>"));
    assert!(out.html.contains("<em></em>"));
}

#[test]
fn custom_style_fills_and_deletes() {
    let src = r#"
        [Template] @Style Base { color: red; border: 0; }
        [Custom] @Style Text { font-size; line-height; @Style Base; }
        p { style { @Style Text { font-size: 12px; delete border; } } }
        em { style { @Style Text { delete @Style Base; } } }
    "#;
    let out = Compiler::default().compile(src, "t.chtl").unwrap();
    assert!(out.html.contains(r#"<p style="font-size: 12px; color: red;"></p>"#), "{}", out.html);
    assert!(out.html.contains("<em></em>"), "{}", out.html);
    // line-height in <p> and both valueless properties in <em> were never filled
    let unfilled = out.diagnostics.iter().filter(|d| d.message.contains("never given a value")).count();
    assert_eq!(unfilled, 3, "{:?}", out.diagnostics);
}

#[test]
fn variable_groups_resolve_inside_values() {
    let src = r##"
        [Template] @Var Theme { primary: "#336699"; gap: 4px; }
        div { style { color: Theme(primary); margin: Theme(gap) 0; } }
        p { style { color: Theme(primary = red); } }
    "##;
    let out = Compiler::default().compile(src, "t.chtl").unwrap();
    assert!(out.diagnostics.is_empty(), "{:?}", out.diagnostics);
    assert!(out.html.contains(r#"<div style="color: #336699; margin: 4px 0;">"#), "{}", out.html);
    assert!(out.html.contains(r#"<p style="color: red;">"#), "{}", out.html);
}

#[test]
fn unknown_template_is_a_resolution_error() {
    let (_, program, diags) = program("div { @Element Nope; }");
    assert_eq!(diags.len(), 1);
    assert_eq!(diags[0].kind, DiagnosticKind::Resolution);
    assert!(element(&program, "div").children.is_empty());
}

#[test]
fn explicit_family_restricts_lookup() {
    let src = r#"
        [Template] @Element Dup { span { } }
        [Custom] @Element Dup { em { } }
        a { @Element Dup; }
        b { [Template] @Element Dup; }
    "#;
    let (_, program, diags) = program(src);
    assert!(diags.is_empty(), "{diags:?}");
    assert!(element(&program, "a").children[0].is_element("em"));
    assert!(element(&program, "b").children[0].is_element("span"));
}

#[test]
fn insert_anchors_by_class_and_id() {
    let src = r#"
        [Template] @Element Pair { span { class: a; } span { class: b; id: x; } }
        div {
            @Element Pair {
                insert after .a { em { } }
                insert before #x { i { } }
            }
        }
    "#;
    let (_, program, diags) = program(src);
    assert!(diags.is_empty(), "{diags:?}");
    let div = element(&program, "div");
    let tags: Vec<_> = div.child_elements().map(|e| e.tag.clone()).collect();
    assert_eq!(tags, ["span", "em", "i", "span"]);
    assert_eq!(classes_of(div), ["a", "b"]);
    let ids: Vec<_> = div.child_elements().map(|e| e.id()).collect();
    assert_eq!(ids, [None, None, None, Some("x")]);
}
