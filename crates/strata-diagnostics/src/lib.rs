// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Layout diagnostics.
//!
//! Layout errors and degraded-layout warnings are converted to `Diagnostic`
//! via the `ToDiagnostic` trait, so the layout engine stays free of any
//! display concerns. Diagnostics render to the terminal (`formatter`) or to
//! JSON (`json`).

pub mod codes;
pub mod convert;
pub mod formatter;
pub mod json;
pub mod suggestions;

use serde::Serialize;
use strata_ast::Span;

// ============================================================================
// Core Types
// ============================================================================

/// A diagnostic with enough context for display.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: Option<ErrorCode>,
    pub message: String,
    pub labels: Vec<Label>,
    pub notes: Vec<String>,
    pub help: Option<Help>,
}

/// The span a diagnostic points at. Every label marks the problem itself;
/// layout errors have no second location to point to.
#[derive(Debug, Clone, Serialize)]
pub struct Label {
    pub span: Span,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// A code like L0100.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ErrorCode(pub String);

#[derive(Debug, Clone, Serialize)]
pub struct Help {
    pub message: String,
}

// ============================================================================
// Builder API
// ============================================================================

impl Diagnostic {
    fn with_severity(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            code: None,
            message: message.into(),
            labels: Vec::new(),
            notes: Vec::new(),
            help: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::with_severity(Severity::Error, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::with_severity(Severity::Warning, message)
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(ErrorCode(code.into()));
        self
    }

    /// Label `span` as the problem. Dummy spans carry no location and are skipped.
    pub fn with_primary(mut self, span: Span, msg: impl Into<String>) -> Self {
        if span != Span::DUMMY {
            self.labels.push(Label {
                span,
                message: msg.into(),
            });
        }
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(Help {
            message: help.into(),
        });
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    pub fn primary_span(&self) -> Option<Span> {
        self.labels.first().map(|l| l.span)
    }
}

// ============================================================================
// Conversion Trait
// ============================================================================

/// Convert a layout error or warning into a diagnostic.
pub trait ToDiagnostic {
    fn to_diagnostic(&self) -> Diagnostic;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_collects_parts() {
        let diag = Diagnostic::error("bad")
            .with_code("L0001")
            .with_primary(Span::new(4, 8), "here")
            .with_note("n")
            .with_help("h");
        assert!(diag.is_error());
        assert_eq!(diag.code, Some(ErrorCode("L0001".to_string())));
        assert_eq!(diag.labels.len(), 1);
        assert_eq!(diag.labels[0].message, "here");
        assert_eq!(diag.primary_span(), Some(Span::new(4, 8)));
        assert_eq!(diag.help.unwrap().message, "h");
    }

    #[test]
    fn dummy_primary_span_dropped() {
        let diag = Diagnostic::warning("w").with_primary(Span::DUMMY, "nowhere");
        assert!(diag.labels.is_empty());
        assert_eq!(diag.primary_span(), None);
    }
}
