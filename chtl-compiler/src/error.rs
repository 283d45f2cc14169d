use std::fmt;

/// Fatal problems found by the boundary scanner.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScanError {
    #[error("{path}:{line}:{column}: unterminated `{keyword}` block")]
    UnterminatedBlock { keyword: String, path: String, line: usize, column: usize },
    #[error("{path}:{line}:{column}: unterminated string literal")]
    UnterminatedString { path: String, line: usize, column: usize },
    #[error("{path}:{line}:{column}: unterminated comment")]
    UnterminatedComment { path: String, line: usize, column: usize },
    #[error("{path}:{line}:{column}: unmatched `}}`")]
    UnbalancedBrace { path: String, line: usize, column: usize },
    #[error("{path}:{line}:{column}: `{keyword}` block nested inside another `{keyword}` block")]
    NestedBlock { keyword: String, path: String, line: usize, column: usize },
}

impl ScanError {
    pub fn line(&self) -> usize {
        match self {
            ScanError::UnterminatedBlock { line, .. }
            | ScanError::UnterminatedString { line, .. }
            | ScanError::UnterminatedComment { line, .. }
            | ScanError::UnbalancedBrace { line, .. }
            | ScanError::NestedBlock { line, .. } => *line,
        }
    }

    pub fn column(&self) -> usize {
        match self {
            ScanError::UnterminatedBlock { column, .. }
            | ScanError::UnterminatedString { column, .. }
            | ScanError::UnterminatedComment { column, .. }
            | ScanError::UnbalancedBrace { column, .. }
            | ScanError::NestedBlock { column, .. } => *column,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{path}:{line}:{column}: {message}")]
pub struct LexError {
    pub message: String,
    pub path: String,
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => f.write_str("warning"),
            Severity::Error => f.write_str("error"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    Syntax,
    Resolution,
    Redefinition,
    SpecializationMiss,
    Constraint,
    Configuration,
}

/// A non-fatal finding. Compilation keeps going and still produces output.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{path}:{line}:{column}: {severity}: {message}")]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: DiagnosticKind,
    pub message: String,
    pub path: String,
    pub line: usize,
    pub column: usize,
}

impl Diagnostic {
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error("{path}: {kind} compiler failed: {message}")]
    SubCompiler { kind: &'static str, path: String, message: String },
    #[error("{path}: rejected with {} error(s); first: {}", .diagnostics.len(), first_message(.diagnostics))]
    Rejected { path: String, diagnostics: Vec<Diagnostic> },
}

fn first_message(diagnostics: &[Diagnostic]) -> String {
    diagnostics.first().map(|d| d.to_string()).unwrap_or_default()
}
