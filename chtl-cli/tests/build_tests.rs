use std::fs;
use std::path::PathBuf;

use chtl_compiler::{CompileOptions, DiagnosticKind, FragmentKind};

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name)
}

fn scratch(label: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../target/chtl-cli-tests")
        .join(format!("{}-{label}", std::process::id()))
}

#[test]
fn cli_build_emits_document() {
    let out_dir = scratch("document");
    let written = chtl_cli::build_cmd(
        &fixture("page.chtl"),
        Some(out_dir.as_path()),
        chtl_cli::EmitMode::Document,
        CompileOptions::default(),
    )
    .expect("build document");

    assert_eq!(written, [out_dir.join("page.html")]);
    let doc = fs::read_to_string(&written[0]).expect("read document");
    assert!(doc.starts_with("<!DOCTYPE html>\n<html>\n<head>\n"), "{doc}");
    assert!(doc.contains("<title>\n  Fixture\n</title>"), "{doc}");
    assert!(doc.contains("<style>\nbody { margin: 0; }\n</style>\n</head>"), "{doc}");
    assert!(doc.contains("<section class=\"card\">"), "{doc}");
    assert!(doc.contains("<script>\ngreet();\n</script>\n</body>\n</html>\n"), "{doc}");
}

#[test]
fn cli_build_emits_parts() {
    let out_dir = scratch("parts");
    let options = CompileOptions { pretty: false, ..CompileOptions::default() };
    let written = chtl_cli::build_cmd(
        &fixture("page.chtl"),
        Some(out_dir.as_path()),
        chtl_cli::EmitMode::Parts,
        options,
    )
    .expect("build parts");

    let names: Vec<_> = written
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, ["page.html", "page.css", "page.js"]);

    let html = fs::read_to_string(out_dir.join("page.html")).expect("read html");
    assert_eq!(html, "<title>Fixture</title><div><section class=\"card\">Hello</section></div>");
    let js = fs::read_to_string(out_dir.join("page.js")).expect("read js");
    assert_eq!(js.trim(), "greet();");
}

#[test]
fn import_cycle_is_reported() {
    let output = chtl_cli::compile_file(&fixture("cycle_a.chtl"), CompileOptions::default())
        .expect("non-strict compile still succeeds");
    assert_eq!(output.diagnostics.len(), 1, "{:?}", output.diagnostics);
    assert_eq!(output.diagnostics[0].kind, DiagnosticKind::Resolution);
    assert!(output.diagnostics[0].message.contains("import cycle"), "{}", output.diagnostics[0].message);
    assert!(output.html.contains("<div></div>"));

    let strict = CompileOptions { strict: true, ..CompileOptions::default() };
    let err = chtl_cli::compile_file(&fixture("cycle_a.chtl"), strict).unwrap_err();
    assert!(format!("{err:#}").contains("import cycle"), "{err:#}");
}

#[test]
fn scan_lists_fragments() {
    let fragments = chtl_cli::scan_cmd(&fixture("page.chtl")).expect("scan");
    assert!(fragments.iter().any(|f| f.kind == FragmentKind::Script && f.text.contains("greet()")));
    let joined: String = fragments.iter().map(|f| f.text.as_str()).collect();
    let source = fs::read_to_string(fixture("page.chtl")).unwrap();
    assert_eq!(joined, source);
}

#[test]
fn scanner_failure_is_an_error_with_context() {
    let err = chtl_cli::compile_file(&fixture("broken.chtl"), CompileOptions::default()).unwrap_err();
    let message = format!("{err:#}");
    assert!(message.contains("failed to compile"), "{message}");
    assert!(message.contains("unterminated `style` block"), "{message}");
}

#[test]
fn missing_input_reports_the_path() {
    let err = chtl_cli::compile_file(&fixture("nope.chtl"), CompileOptions::default()).unwrap_err();
    assert!(err.to_string().contains("nope.chtl"));
}

#[test]
fn scan_failure_keeps_the_location() {
    let err = chtl_cli::scan_cmd(&fixture("broken.chtl")).unwrap_err();
    let message = format!("{err:#}");
    assert!(message.contains("failed to scan"), "{message}");

    let scan_error = err.downcast_ref::<chtl_compiler::ScanError>().expect("scan error in chain");
    assert_eq!((scan_error.line(), scan_error.column()), (2, 3));
}
