//! Compile diagnostics.
//!
//! Produced by the compiler against the synthesized program, then rewritten
//! by [`crate::remap`] to point at template files.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl Severity {
    /// Capitalized name, as used in `TemplateCompile<Severity>` messages.
    pub fn title(self) -> &'static str {
        match self {
            Severity::Error => "Error",
            Severity::Warning => "Warning",
            Severity::Info => "Info",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Info => write!(f, "info"),
        }
    }
}

/// A source span.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Location {
    pub file: PathBuf,
    /// Line number (1-indexed)
    pub line: usize,
    /// Column number (0-indexed, in characters)
    pub column: usize,
    /// Span length in characters
    pub length: usize,
}

impl Location {
    pub fn new(file: impl Into<PathBuf>, line: usize, column: usize, length: usize) -> Self {
        Self {
            file: file.into(),
            line,
            column,
            length,
        }
    }
}

/// A compiler message with a code, a severity and a location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    /// Stable identifier, e.g. `LUA001`.
    pub code: String,
    pub severity: Severity,
    pub message: String,
    pub location: Location,
}

impl Diagnostic {
    pub fn error(code: impl Into<String>, message: impl Into<String>, location: Location) -> Self {
        Self {
            code: code.into(),
            severity: Severity::Error,
            message: message.into(),
            location,
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    /// `file(line,column): severity CODE: message`, column 1-based.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}({},{}): {} {}: {}",
            self.location.file.display(),
            self.location.line,
            self.location.column + 1,
            self.severity,
            self.code,
            self.message
        )
    }
}
