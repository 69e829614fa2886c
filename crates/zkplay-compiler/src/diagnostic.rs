//! Source-positioned diagnostics
//!
//! Every pass reports problems as [`Diagnostic`]s carrying a [`Span`]. Spans
//! are 1-based and the end position is exclusive, which is what editors use
//! for inline markers.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Span {
    pub line: u32,
    pub column: u32,
    pub end_line: u32,
    pub end_column: u32,
}

impl Span {
    pub fn new(line: u32, column: u32, end_line: u32, end_column: u32) -> Self {
        Self { line, column, end_line, end_column }
    }

    /// Smallest span covering both `self` and `other`
    pub fn to(self, other: Span) -> Span {
        let (line, column) = (self.line, self.column).min((other.line, other.column));
        let (end_line, end_column) =
            (self.end_line, self.end_column).max((other.end_line, other.end_column));
        Span { line, column, end_line, end_column }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// The pass a diagnostic came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    Syntax,
    Type,
    Lowering,
    ResourceExceeded,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticKind::Syntax => f.write_str("syntax"),
            DiagnosticKind::Type => f.write_str("type"),
            DiagnosticKind::Lowering => f.write_str("lowering"),
            DiagnosticKind::ResourceExceeded => f.write_str("resource"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: DiagnosticKind,
    #[serde(flatten)]
    pub span: Span,
    pub message: String,
}

impl Diagnostic {
    fn error(kind: DiagnosticKind, span: Span, message: impl Into<String>) -> Self {
        Self { severity: Severity::Error, kind, span, message: message.into() }
    }

    pub fn syntax(span: Span, message: impl Into<String>) -> Self {
        Self::error(DiagnosticKind::Syntax, span, message)
    }

    pub fn type_error(span: Span, message: impl Into<String>) -> Self {
        Self::error(DiagnosticKind::Type, span, message)
    }

    pub fn lowering(span: Span, message: impl Into<String>) -> Self {
        Self::error(DiagnosticKind::Lowering, span, message)
    }

    pub fn resource_exceeded(span: Span, message: impl Into<String>) -> Self {
        Self::error(DiagnosticKind::ResourceExceeded, span, message)
    }

    pub fn warning(span: Span, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            kind: DiagnosticKind::Type,
            span,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let severity = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{}[{}] {}: {}", severity, self.kind, self.span, self.message)
    }
}

impl std::error::Error for Diagnostic {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_merge() {
        let a = Span::new(1, 5, 1, 9);
        let b = Span::new(2, 1, 2, 4);
        assert_eq!(a.to(b), Span::new(1, 5, 2, 4));
        assert_eq!(b.to(a), Span::new(1, 5, 2, 4));
    }

    #[test]
    fn test_editor_json_shape() {
        let diag = Diagnostic::syntax(Span::new(3, 7, 3, 8), "expected ';'");
        let json = serde_json::to_value(&diag).unwrap();
        assert_eq!(json["line"], 3);
        assert_eq!(json["endColumn"], 8);
        assert_eq!(json["severity"], "error");
        assert_eq!(json["kind"], "syntax");
    }

    #[test]
    fn test_display() {
        let diag = Diagnostic::type_error(Span::new(2, 12, 2, 13), "unknown variable 'z'");
        assert_eq!(diag.to_string(), "error[type] 2:12: unknown variable 'z'");
    }

    #[test]
    fn test_lowering_error_forwards_diagnostic() {
        use crate::error::SynthesisError;
        use std::error::Error;

        let err = SynthesisError::lowering(Span::new(4, 1, 4, 9), "recursion is not supported");
        assert_eq!(err.to_string(), "error[lowering] 4:1: recursion is not supported");
        let boxed: Box<dyn Error> = Box::new(err);
        assert!(boxed.source().is_none());
    }
}
