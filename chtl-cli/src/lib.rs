use anyhow::{Context, Result};
use chtl_compiler::{CompileOptions, CompileOutput, Compiler, Fragment};
use clap::ValueEnum;
use std::fs;
use std::path::{Path, PathBuf};

mod resolve;

pub use resolve::FileImportResolver;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum EmitMode {
    /// One `<stem>.html` with the stylesheet and script inlined.
    Document,
    /// `<stem>.html`, plus `<stem>.css` and `<stem>.js` when non-empty.
    Parts,
}

/// Compile one file, resolving its imports from disk.
pub fn compile_file(input: &Path, options: CompileOptions) -> Result<CompileOutput> {
    let src =
        fs::read_to_string(input).with_context(|| format!("failed to read {}", input.display()))?;

    let resolver = FileImportResolver::for_entry(input, options);
    let mut compiler = Compiler::new(options).with_import_resolver(resolver);
    let output = compiler
        .compile(&src, &input.display().to_string())
        .with_context(|| format!("failed to compile {}", input.display()))?;
    Ok(output)
}

/// Build a .chtl file into `out_dir` and return the paths written.
pub fn build_cmd(
    input: &Path,
    out_dir: Option<&Path>,
    emit: EmitMode,
    options: CompileOptions,
) -> Result<Vec<PathBuf>> {
    let output = compile_file(input, options)?;
    for diagnostic in &output.diagnostics {
        eprintln!("{diagnostic}");
    }

    let name = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("index");

    let out_dir = out_dir
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from("target/chtl-out"));
    fs::create_dir_all(&out_dir)
        .with_context(|| format!("failed to create {}", out_dir.display()))?;

    let mut files = Vec::new();
    match emit {
        EmitMode::Document => {
            files.push((out_dir.join(format!("{name}.html")), assemble_document(&output, options.pretty)));
        }
        EmitMode::Parts => {
            files.push((out_dir.join(format!("{name}.html")), format!("{}{}", output.head, output.html)));
            if !output.css.is_empty() {
                files.push((out_dir.join(format!("{name}.css")), output.css.clone()));
            }
            if !output.script.is_empty() {
                files.push((out_dir.join(format!("{name}.js")), output.script.clone()));
            }
        }
    }

    let mut written = Vec::new();
    for (path, content) in files {
        fs::write(&path, content).with_context(|| format!("failed to write {}", path.display()))?;
        println!("Generated: {}", path.display());
        written.push(path);
    }
    Ok(written)
}

/// Print the fragments the boundary scanner splits `input` into.
pub fn scan_cmd(input: &Path) -> Result<Vec<Fragment>> {
    let src =
        fs::read_to_string(input).with_context(|| format!("failed to read {}", input.display()))?;
    let fragments = match chtl_compiler::scan(&src, &input.display().to_string()) {
        Ok(fragments) => fragments,
        Err(err) => {
            eprint!("{}", source_excerpt(&src, err.line(), err.column()));
            return Err(err).with_context(|| format!("failed to scan {}", input.display()));
        }
    };

    for fragment in &fragments {
        println!(
            "{:?} {}-{} ({} bytes): {:?}",
            fragment.kind,
            fragment.start,
            fragment.end,
            fragment.text.len(),
            fragment.text
        );
    }
    Ok(fragments)
}

/// The source line at `line` (1-based) with a caret under `column`.
fn source_excerpt(src: &str, line: usize, column: usize) -> String {
    let Some(text) = src.lines().nth(line.saturating_sub(1)) else { return String::new() };
    let gutter = format!("{line} | ");
    let pad = " ".repeat(gutter.len() + text.chars().take(column.saturating_sub(1)).count());
    format!("{gutter}{text}\n{pad}^\n")
}

/// Wrap compiler output into a complete HTML document. When the source
/// already produced an `<html>` element, the head content, stylesheet and
/// script are injected into it instead.
pub fn assemble_document(output: &CompileOutput, pretty: bool) -> String {
    let nl = if pretty { "\n" } else { "" };
    let style = tagged("style", &output.css, nl);
    let script = tagged("script", &output.script, nl);
    let head = format!("{}{style}", output.head);

    let mut doc = String::new();
    if output.use_html5 {
        doc.push_str("<!DOCTYPE html>");
        doc.push_str(nl);
    }

    if !output.html.trim_start().starts_with("<html") {
        doc.push_str(&format!("<html>{nl}<head>{nl}{head}</head>{nl}<body>{nl}"));
        doc.push_str(&output.html);
        doc.push_str(&format!("{script}</body>{nl}</html>{nl}"));
        return doc;
    }

    let mut html = output.html.clone();
    if !head.is_empty() {
        match html.find("</head>") {
            Some(at) => html.insert_str(at, &head),
            None => {
                let at = html.find('>').map_or(0, |i| i + 1);
                html.insert_str(at, &format!("{nl}<head>{nl}{head}</head>"));
            }
        }
    }
    if !script.is_empty() {
        let at = html.rfind("</body>").or_else(|| html.rfind("</html>")).unwrap_or(html.len());
        html.insert_str(at, &script);
    }
    doc.push_str(&html);
    doc
}

fn tagged(tag: &str, body: &str, nl: &str) -> String {
    if body.trim().is_empty() {
        return String::new();
    }
    format!("<{tag}>{nl}{}{nl}</{tag}>{nl}", body.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(html: &str) -> CompileOutput {
        CompileOutput {
            html: html.to_string(),
            css: "p { color: red; }\n".to_string(),
            script: "go();\n".to_string(),
            ..CompileOutput::default()
        }
    }

    #[test]
    fn fragment_markup_is_wrapped() {
        let doc = assemble_document(&output("<p></p>\n"), true);
        assert_eq!(
            doc,
            "<html>\n<head>\n<style>\np { color: red; }\n</style>\n</head>\n<body>\n<p></p>\n<script>\ngo();\n</script>\n</body>\n</html>\n"
        );
    }

    #[test]
    fn existing_document_gets_injected() {
        let mut out = output("<html><head></head><body><p></p></body></html>");
        out.use_html5 = true;
        let doc = assemble_document(&out, false);
        assert_eq!(
            doc,
            "<!DOCTYPE html><html><head><style>p { color: red; }</style></head><body><p></p><script>go();</script></body></html>"
        );
    }

    #[test]
    fn excerpt_points_at_the_column() {
        let src = "div {\n  style {\n    color: red;\n";
        assert_eq!(source_excerpt(src, 2, 3), "2 |   style {\n      ^\n");
        assert_eq!(source_excerpt(src, 9, 1), "");
    }

    #[test]
    fn missing_head_is_created() {
        let doc = assemble_document(&output("<html><body></body></html>"), false);
        assert!(doc.starts_with("<html><head><style>"), "{doc}");
    }
}
