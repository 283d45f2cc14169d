//! The façade hosts call: scan, lex, parse (with use-site expansion),
//! generate, and hand embedded CSS and script to pluggable sub-compilers.

use crate::ast::{Import, Node};
use crate::config::Config;
use crate::error::{CompileError, Diagnostic};
use crate::generator::Generator;
use crate::lexer::Lexer;
use crate::parser::Parser;
use crate::scanner::{Fragment, FragmentKind, Scanner};
use crate::symbols::SymbolTable;
use crate::token::{Position, Token, TokenKind};

/// Host-side switches, as opposed to in-source `[Configuration]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompileOptions {
    /// Indent nested markup two spaces per level; otherwise emit compactly.
    pub pretty: bool,
    /// Refuse any file that produced an error diagnostic.
    pub strict: bool,
    pub debug: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        CompileOptions { pretty: true, strict: false, debug: false }
    }
}

/// Per-file state threaded through the parser.
#[derive(Debug, Clone, Default)]
pub struct CompileContext {
    pub path: String,
    pub use_html5: bool,
    pub debug: bool,
    pub config: Config,
    pub diagnostics: Vec<Diagnostic>,
}

impl CompileContext {
    pub fn new(path: impl Into<String>) -> Self {
        CompileContext { path: path.into(), ..CompileContext::default() }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompileOutput {
    pub html: String,
    pub css: String,
    pub script: String,
    /// Markup destined for `<head>`.
    pub head: String,
    pub use_html5: bool,
    pub diagnostics: Vec<Diagnostic>,
}

impl CompileOutput {
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }
}

/// Slot for an external CSS, script or script-dialect compiler.
pub trait SubCompiler {
    fn compile(&self, fragment: &Fragment) -> Result<String, String>;
}

/// Returns the fragment text unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThrough;

impl SubCompiler for PassThrough {
    fn compile(&self, fragment: &Fragment) -> Result<String, String> {
        Ok(fragment.text.clone())
    }
}

/// Loads what an `[Import]` names. `Ok(None)` means "nothing to merge"
/// (e.g. a module the host handles itself).
pub trait ImportResolver {
    fn resolve(&mut self, import: &Import, importer: &str) -> Result<Option<SymbolTable>, String>;
}

pub struct Compiler {
    options: CompileOptions,
    symbols: SymbolTable,
    css: Box<dyn SubCompiler>,
    script: Box<dyn SubCompiler>,
    script_dialect: Box<dyn SubCompiler>,
    imports: Option<Box<dyn ImportResolver>>,
}

impl Default for Compiler {
    fn default() -> Self {
        Compiler::new(CompileOptions::default())
    }
}

impl Compiler {
    pub fn new(options: CompileOptions) -> Self {
        Compiler {
            options,
            symbols: SymbolTable::new(),
            css: Box::new(PassThrough),
            script: Box::new(PassThrough),
            script_dialect: Box::new(PassThrough),
            imports: None,
        }
    }

    pub fn with_css_compiler(mut self, compiler: impl SubCompiler + 'static) -> Self {
        self.css = Box::new(compiler);
        self
    }

    pub fn with_script_compiler(mut self, compiler: impl SubCompiler + 'static) -> Self {
        self.script = Box::new(compiler);
        self
    }

    pub fn with_script_dialect_compiler(mut self, compiler: impl SubCompiler + 'static) -> Self {
        self.script_dialect = Box::new(compiler);
        self
    }

    pub fn with_import_resolver(mut self, resolver: impl ImportResolver + 'static) -> Self {
        self.imports = Some(Box::new(resolver));
        self
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    /// For hosts that merge symbol tables between compilations.
    pub fn symbols_mut(&mut self) -> &mut SymbolTable {
        &mut self.symbols
    }

    /// Forget every registered definition.
    pub fn reset(&mut self) {
        log::debug!(target: "chtl::compiler", "reset: dropping {} symbol(s)", self.symbols.len());
        self.symbols.clear();
    }

    /// Scan, lex and parse `source` into a program tree. Definitions are
    /// registered in this compiler's symbol table along the way.
    pub fn parse(&mut self, source: &str, path: &str) -> Result<(Node, CompileContext), CompileError> {
        let fragments = Scanner::new(source, path).scan()?;
        log::debug!(target: "chtl::compiler", "{path}: {} fragment(s)", fragments.len());

        let mut tokens = Vec::new();
        for fragment in &fragments {
            log::trace!(
                target: "chtl::compiler",
                "{:?} fragment {}..{} ({} bytes)",
                fragment.kind,
                fragment.start,
                fragment.end,
                fragment.text.len()
            );
            match fragment.kind {
                FragmentKind::Markup | FragmentKind::Css => tokens.extend(Lexer::for_fragment(fragment).tokenize()?),
                FragmentKind::Script | FragmentKind::ScriptDialect => {
                    let body = self.compile_script(fragment)?;
                    tokens.push(Token::new(TokenKind::RawBlock, body, fragment.start, fragment.text.len()));
                }
            }
        }
        log::debug!(target: "chtl::compiler", "{path}: {} token(s)", tokens.len());

        let mut ctx = CompileContext::new(path);
        ctx.debug = self.options.debug;
        let parser = Parser::new(tokens, &mut self.symbols, &mut ctx);
        let program = match self.imports.as_deref_mut() {
            Some(resolver) => parser.with_imports(resolver).parse_program(),
            None => parser.parse_program(),
        };
        Ok((program, ctx))
    }

    /// Full pipeline. Error diagnostics are returned in the output unless
    /// the compiler is strict, in which case the file is rejected.
    pub fn compile(&mut self, source: &str, path: &str) -> Result<CompileOutput, CompileError> {
        let (program, ctx) = self.parse(source, path)?;
        let generated = Generator::new(self.options.pretty).generate(&program);

        let css = if generated.css.is_empty() {
            generated.css
        } else {
            let fragment = Fragment {
                kind: FragmentKind::Css,
                text: generated.css,
                start: Position::START,
                end: Position::START,
                path: path.to_string(),
            };
            self.css
                .compile(&fragment)
                .map_err(|message| CompileError::SubCompiler { kind: "css", path: path.to_string(), message })?
        };

        let errors = ctx.diagnostics.iter().filter(|d| d.is_error()).count();
        if ctx.debug {
            log::info!(
                target: "chtl::compiler",
                "{path}: {} symbol(s), {} diagnostic(s), {errors} error(s)",
                self.symbols.len(),
                ctx.diagnostics.len()
            );
        }
        if self.options.strict && errors > 0 {
            let diagnostics = ctx.diagnostics.into_iter().filter(Diagnostic::is_error).collect();
            return Err(CompileError::Rejected { path: path.to_string(), diagnostics });
        }

        Ok(CompileOutput {
            html: generated.html,
            css,
            script: generated.script,
            head: generated.head,
            use_html5: generated.use_html5,
            diagnostics: ctx.diagnostics,
        })
    }

    fn compile_script(&self, fragment: &Fragment) -> Result<String, CompileError> {
        let (kind, compiler) = match fragment.kind {
            FragmentKind::ScriptDialect => ("script-dialect", &self.script_dialect),
            _ => ("script", &self.script),
        };
        compiler
            .compile(fragment)
            .map_err(|message| CompileError::SubCompiler { kind, path: fragment.path.clone(), message })
    }
}
