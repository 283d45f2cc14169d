use std::cell::RefCell;
use std::rc::Rc;

use chtl_compiler::ast::{Import, ImportKind};
use chtl_compiler::{
    CompileError, CompileOptions, Compiler, DiagnosticKind, Fragment, FragmentKind, ImportResolver, ScanError,
    SubCompiler, SymbolTable, scan,
};

#[test]
fn scenario_a_single_element_with_text() {
    let src = r#"div { text { "Hi" } }"#;
    let frags = scan(src, "a.chtl").unwrap();
    assert_eq!(frags.len(), 1);
    assert_eq!(frags[0].kind, FragmentKind::Markup);

    let out = Compiler::default().compile(src, "a.chtl").unwrap();
    let open = out.html.find("<div>").unwrap();
    let text = out.html.find("Hi").unwrap();
    let close = out.html.find("</div>").unwrap();
    assert!(open < text && text < close, "{}", out.html);
    assert!(out.css.is_empty());
    assert!(out.script.is_empty());
    assert!(out.diagnostics.is_empty());
}

#[test]
fn scenario_b_shared_style_template() {
    let src = r#"
        [Template] @Style Btn { color: red; }
        button { style { @Style Btn; } }
        a { style { @Style Btn; } }
    "#;
    let out = Compiler::default().compile(src, "b.chtl").unwrap();
    assert!(out.diagnostics.is_empty(), "{:?}", out.diagnostics);
    assert!(out.html.contains(r#"<button style="color: red;"></button>"#), "{}", out.html);
    assert!(out.html.contains(r#"<a style="color: red;"></a>"#), "{}", out.html);
    assert_eq!(out.html.matches(r#"style="color: red;""#).count(), 2);
}

#[test]
fn scenario_c_delete_on_inherited_template() {
    let src = r#"
        [Template] @Element Trio { span { text { one } } span { text { two } } span { text { three } } }
        [Custom] @Element Box { inherit @Element Trio; }
        div { @Element Box { delete span[0]; } }
    "#;
    let mut compiler = Compiler::default();
    let out = compiler.compile(src, "c.chtl").unwrap();
    assert!(out.diagnostics.is_empty(), "{:?}", out.diagnostics);
    assert_eq!(out.html.matches("<span>").count(), 2);
    assert!(!out.html.contains("one"));
    let (two, three) = (out.html.find("two").unwrap(), out.html.find("three").unwrap());
    assert!(two < three);

    let root = chtl_compiler::Scope::root();
    let stored = compiler
        .symbols()
        .get(chtl_compiler::SymbolKind::CustomElement, &root, "Box")
        .unwrap();
    assert_eq!(stored.children.len(), 3);
}

#[test]
fn scenario_d_unterminated_style_is_fatal() {
    let src = "body {\n  div {\n    style {\n      color: red;\n  }\n";
    let err = Compiler::default().compile(src, "d.chtl").unwrap_err();
    match err {
        CompileError::Scan(ScanError::UnterminatedBlock { keyword, line, column, .. }) => {
            // innermost unclosed block
            assert_eq!(keyword, "div");
            assert_eq!((line, column), (2, 3));
        }
        other => panic!("unexpected {other:?}"),
    }

    let src = "div {\n  style {\n    color: red;\n";
    let err = Compiler::default().compile(src, "d.chtl").unwrap_err();
    assert!(matches!(
        err,
        CompileError::Scan(ScanError::UnterminatedBlock { ref keyword, line: 2, column: 3, .. }) if keyword == "style"
    ));
    assert!(err.to_string().starts_with("d.chtl:2:3:"));
}

#[test]
fn strict_mode_rejects_error_diagnostics() {
    let src = "div { @Element Missing; }";
    let out = Compiler::default().compile(src, "s.chtl").unwrap();
    assert!(out.has_errors());
    assert!(out.html.contains("<div></div>"));

    let mut strict = Compiler::new(CompileOptions { strict: true, ..CompileOptions::default() });
    match strict.compile(src, "s.chtl") {
        Err(CompileError::Rejected { path, diagnostics }) => {
            assert_eq!(path, "s.chtl");
            assert_eq!(diagnostics.len(), 1);
            assert_eq!(diagnostics[0].kind, DiagnosticKind::Resolution);
        }
        other => panic!("expected rejection, got {other:?}"),
    }

    // warnings alone pass
    let warn_only = "[Configuration] { NOPE = 1; }\ndiv { }";
    assert!(strict.compile(warn_only, "s.chtl").is_ok());
}

struct Upper;

impl SubCompiler for Upper {
    fn compile(&self, fragment: &Fragment) -> Result<String, String> {
        Ok(fragment.text.to_uppercase())
    }
}

struct Refuse;

impl SubCompiler for Refuse {
    fn compile(&self, _fragment: &Fragment) -> Result<String, String> {
        Err("unsupported".to_string())
    }
}

#[test]
fn sub_compilers_receive_their_fragments() {
    let src = "div { style { .x { color: red; } } script { plain(); } }\np { script { {{.x}}->listen { } } }";
    let mut compiler = Compiler::default()
        .with_css_compiler(Upper)
        .with_script_compiler(Upper)
        .with_script_dialect_compiler(Refuse);
    let err = compiler.compile(src, "x.chtl").unwrap_err();
    assert!(matches!(err, CompileError::SubCompiler { kind: "script-dialect", .. }), "{err:?}");

    let mut compiler = Compiler::default().with_css_compiler(Upper).with_script_compiler(Upper);
    let out = compiler.compile("div { style { .x { color: red; } } script { plain(); } }", "x.chtl").unwrap();
    assert_eq!(out.script, "PLAIN();\n");
    assert_eq!(out.css, ".X {\n  COLOR: RED;\n}\n");
}

/// Serves pre-compiled tables by path and records what was asked for.
struct MapResolver {
    tables: Vec<(String, SymbolTable)>,
    seen: Rc<RefCell<Vec<(ImportKind, String)>>>,
}

impl ImportResolver for MapResolver {
    fn resolve(&mut self, import: &Import, _importer: &str) -> Result<Option<SymbolTable>, String> {
        self.seen.borrow_mut().push((import.kind, import.path.clone()));
        match self.tables.iter().find(|(p, _)| *p == import.path) {
            Some((_, table)) => Ok(Some(table.clone())),
            None => Err(format!("cannot find `{}`", import.path)),
        }
    }
}

#[test]
fn imports_merge_before_later_siblings() {
    let mut lib = Compiler::default();
    lib.compile("[Custom] @Element Card { section { } }\n[Template] @Style Red { color: red; }", "lib.chtl")
        .unwrap();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let resolver = MapResolver { tables: vec![("lib.chtl".to_string(), lib.symbols().clone())], seen: seen.clone() };

    let src = r#"
        [Import] @Chtl from "lib.chtl" as ui;
        [Import] [Template] @Style Red from "lib.chtl" as Alert;
        [Import] @Chtl from missing.chtl;
        div { @Element Card from ui; style { @Style Alert; } }
    "#;
    let mut compiler = Compiler::default().with_import_resolver(resolver);
    let out = compiler.compile(src, "main.chtl").unwrap();
    assert!(out.html.contains("<div style=\"color: red;\">\n  <section></section>\n</div>"), "{}", out.html);

    assert_eq!(out.diagnostics.len(), 1, "{:?}", out.diagnostics);
    assert!(out.diagnostics[0].message.contains("missing.chtl"));
    let seen = seen.borrow();
    assert_eq!(seen.len(), 3);
    assert_eq!(seen[2], (ImportKind::Chtl, "missing.chtl".to_string()));
}

#[test]
fn imports_without_resolver_are_recorded_only() {
    let out = Compiler::default().compile("[Import] @Chtl from \"a.chtl\";\np { }", "t.chtl").unwrap();
    assert!(out.diagnostics.is_empty());
    assert_eq!(out.html, "<p></p>\n");
}

#[test]
fn bem_class_names_on_one_line_compile() {
    let out = Compiler::default().compile("div { class: btn--primary; span { } }", "p.chtl").unwrap();
    assert!(out.diagnostics.is_empty(), "{:?}", out.diagnostics);
    assert_eq!(out.html, "<div class=\"btn--primary\">\n  <span></span>\n</div>\n");
}
