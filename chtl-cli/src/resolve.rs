//! `[Import]` resolution against the file system.

use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use chtl_compiler::ast::{Import, ImportKind, OriginKind};
use chtl_compiler::{CompileOptions, Compiler, ImportResolver, Node, NodeKind, Scope, SymbolKind, SymbolTable};

/// Resolves import paths relative to the importing file. Imported `.chtl`
/// files are parsed by a fresh compiler that shares this resolver's stack of
/// files in progress, so a file that (indirectly) imports itself is caught.
#[derive(Debug, Clone)]
pub struct FileImportResolver {
    options: CompileOptions,
    active: Rc<RefCell<Vec<PathBuf>>>,
}

impl FileImportResolver {
    /// A resolver for compiling `entry`; importing `entry` again is a cycle.
    pub fn for_entry(entry: &Path, options: CompileOptions) -> Self {
        FileImportResolver { options, active: Rc::new(RefCell::new(vec![normalize(entry)])) }
    }

    fn load_chtl(&self, path: &Path) -> Result<SymbolTable, String> {
        let key = normalize(path);
        if let Some(start) = self.active.borrow().iter().position(|p| *p == key) {
            let chain: Vec<String> = self.active.borrow()[start..]
                .iter()
                .chain(std::iter::once(&key))
                .map(|p| p.display().to_string())
                .collect();
            return Err(format!("import cycle: {}", chain.join(" -> ")));
        }

        let source = fs::read_to_string(path).map_err(|e| format!("cannot read `{}`: {e}", path.display()))?;
        let display = path.display().to_string();

        self.active.borrow_mut().push(key);
        let mut compiler = Compiler::new(self.options).with_import_resolver(self.clone());
        let parsed = compiler.parse(&source, &display);
        self.active.borrow_mut().pop();

        let (_, ctx) = parsed.map_err(|e| e.to_string())?;
        let errors: Vec<_> = ctx.diagnostics.iter().filter(|d| d.is_error()).collect();
        if let Some(first) = errors.first() {
            return Err(format!("`{display}` has {} error(s); first: {first}", errors.len()));
        }
        for warning in &ctx.diagnostics {
            log::warn!(target: "chtl::cli", "{warning}");
        }
        log::debug!(target: "chtl::cli", "imported {} symbol(s) from {display}", compiler.symbols().len());
        Ok(compiler.symbols().clone())
    }
}

impl ImportResolver for FileImportResolver {
    fn resolve(&mut self, import: &Import, importer: &str) -> Result<Option<SymbolTable>, String> {
        let (kind, ext) = match import.kind {
            ImportKind::Chtl | ImportKind::Definition(_) => {
                return self.load_chtl(&locate(importer, &import.path, "chtl")).map(Some);
            }
            ImportKind::CJmod => {
                log::warn!(target: "chtl::cli", "`{}`: CJmod extensions are not loaded by this host", import.path);
                return Ok(None);
            }
            ImportKind::Html => (OriginKind::Html, "html"),
            ImportKind::Style => (OriginKind::Style, "css"),
            ImportKind::JavaScript => (OriginKind::JavaScript, "js"),
        };

        // without a name there is nothing to refer to later
        let Some(alias) = import.alias.as_deref() else { return Ok(None) };
        let path = locate(importer, &import.path, ext);
        let content = fs::read_to_string(&path).map_err(|e| format!("cannot read `{}`: {e}", path.display()))?;

        let mut table = SymbolTable::new();
        let node = Node::new(NodeKind::Origin { kind, name: Some(alias.to_string()), content }, 1, 1);
        table.add(SymbolKind::Origin, &Scope::root(), alias, node);
        Ok(Some(table))
    }
}

/// `raw` relative to the importer's directory, with `ext` added when the
/// path has no extension.
fn locate(importer: &str, raw: &str, ext: &str) -> PathBuf {
    let mut path = PathBuf::from(raw);
    if path.extension().is_none() {
        path.set_extension(ext);
    }
    if path.is_absolute() {
        return path;
    }
    match Path::new(importer).parent() {
        Some(dir) => dir.join(path),
        None => path,
    }
}

fn normalize(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locate_is_relative_to_the_importer() {
        assert_eq!(locate("src/main.chtl", "lib", "chtl"), PathBuf::from("src/lib.chtl"));
        assert_eq!(locate("main.chtl", "theme.css", "css"), PathBuf::from("theme.css"));
        assert_eq!(locate("src/main.chtl", "/abs/x.html", "html"), PathBuf::from("/abs/x.html"));
    }
}
