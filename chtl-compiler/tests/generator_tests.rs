use chtl_compiler::{CompileOptions, Compiler};

fn compile(src: &str) -> chtl_compiler::CompileOutput {
    Compiler::default().compile(src, "t.chtl").unwrap()
}

#[test]
fn nested_markup_is_indented() {
    let out = compile("html { body { div { text { hello } } } }");
    assert_eq!(out.html, "<html>\n  <body>\n    <div>\n      hello\n    </div>\n  </body>\n</html>\n");
}

#[test]
fn compact_output_when_not_pretty() {
    let mut compiler = Compiler::new(CompileOptions { pretty: false, ..CompileOptions::default() });
    let out = compiler.compile("ul { li { text { a } } li { } }", "t.chtl").unwrap();
    assert_eq!(out.html, "<ul><li>a</li><li></li></ul>");
}

#[test]
fn text_and_attributes_are_escaped() {
    let out = compile(r#"a { title: "say \"hi\""; text { "1 < 2 & 3" } }"#);
    assert!(out.html.contains(r#"<a title="say &quot;hi&quot;">"#), "{}", out.html);
    assert!(out.html.contains("1 &lt; 2 &amp; 3"), "{}", out.html);
}

#[test]
fn inline_style_merges_into_existing_attribute() {
    let out = compile(r#"div { style: "margin: 0; color: red"; style { color: blue; padding: 1px; } }"#);
    assert!(out.html.contains(r#"<div style="margin: 0; color: blue; padding: 1px;">"#), "{}", out.html);
}

#[test]
fn rules_are_hoisted_with_ampersand_expanded() {
    let out = compile("button { style { .btn { color: red; } &:hover { color: blue; } } }");
    assert!(out.html.contains(r#"<button class="btn"></button>"#), "{}", out.html);
    assert_eq!(out.css, ".btn {\n  color: red;\n}\n.btn:hover {\n  color: blue;\n}\n");
}

#[test]
fn ampersand_falls_back_to_tag() {
    let out = compile("nav { style { &:hover { opacity: 0.5; } } }");
    assert_eq!(out.css, "nav:hover {\n  opacity: 0.5;\n}\n");
}

#[test]
fn global_style_goes_to_the_stylesheet() {
    let out = compile("style { body { margin: 0; } }\ndiv { }");
    assert_eq!(out.css, "body {\n  margin: 0;\n}\n");
    assert_eq!(out.html, "<div></div>\n");
}

#[test]
fn scripts_are_collected_in_order() {
    let out = compile("div { script { one(); } }\np { script { two(); } }");
    assert_eq!(out.script, "one();\ntwo();\n");
    assert!(!out.html.contains("one()"));
}

#[test]
fn origin_blocks_route_by_kind() {
    let src = r#"
        [Origin] @Html { <hr class="raw"> }
        [Origin] @Style { .raw { display: none; } }
        [Origin] @JavaScript { init(); }
    "#;
    let out = compile(src);
    assert_eq!(out.html, "<hr class=\"raw\">\n");
    assert_eq!(out.css, ".raw { display: none; }\n");
    assert_eq!(out.script, "init();\n");
}

#[test]
fn named_origin_can_be_reemitted() {
    let out = compile("[Origin] @Html banner { <b>hi</b> }\ndiv { [Origin] @Html banner; }");
    assert_eq!(out.html, "<b>hi</b>\n<div>\n  <b>hi</b>\n</div>\n");
}

#[test]
fn void_elements_and_generator_comments() {
    let out = compile("-- header\ndiv { br { } img { src: a.png; } }");
    assert_eq!(out.html, "<!-- header -->\n<div>\n  <br>\n  <img src=\"a.png\">\n</div>\n");
}

#[test]
fn head_elements_are_split_out() {
    let out = compile(r#"use html5; title { text { Home } } meta { charset: utf-8; } body { }"#);
    assert!(out.use_html5);
    assert_eq!(out.head, "<title>\n  Home\n</title>\n<meta charset=\"utf-8\">\n");
    assert_eq!(out.html, "<body></body>\n");
}

#[test]
fn definitions_emit_nothing() {
    let out = compile("[Template] @Element E { p { } }\n[Template] @Style S { color: red; }");
    assert!(out.html.is_empty());
    assert!(out.css.is_empty());
}
