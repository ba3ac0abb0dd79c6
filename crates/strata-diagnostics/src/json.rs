// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! JSON diagnostic output for machine consumption.
//!
//! Each diagnostic carries its code category, 1-based line/column locations
//! and the source line, so editors can show it without re-reading the schema.

use serde::Serialize;
use strata_ast::{LineIndex, Span};

use crate::codes::ErrorCodeRegistry;
use crate::{Diagnostic, Severity};

/// All diagnostics from laying out one root struct.
#[derive(Debug, Serialize)]
pub struct DiagnosticReport {
    /// Format version for forward compatibility.
    pub version: u32,
    pub file: String,
    /// Root struct that was laid out.
    pub root: String,
    /// No errors (warnings allowed).
    pub success: bool,
    pub diagnostics: Vec<JsonDiagnostic>,
    pub error_count: usize,
    pub warning_count: usize,
}

#[derive(Debug, Serialize)]
pub struct JsonDiagnostic {
    /// "error" or "warning".
    pub severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Code category (e.g. "Shape", "Layout").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<LineCol>,
    pub labels: Vec<JsonLabel>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct JsonLabel {
    pub message: String,
    pub start: LineCol,
    pub end: LineCol,
    /// The source line containing the label's start.
    pub source_line: String,
}

/// Line/column pair (1-based).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LineCol {
    pub line: usize,
    pub column: usize,
    pub byte_offset: usize,
}

/// Convert diagnostics to a structured JSON report.
pub fn to_json_report(diagnostics: &[Diagnostic], source: &str, file: &str, root: &str) -> DiagnosticReport {
    let registry = ErrorCodeRegistry::default();
    let lines = LineIndex::new(source);

    let count = |severity| diagnostics.iter().filter(|d| d.severity == severity).count();
    let error_count = count(Severity::Error);
    let warning_count = count(Severity::Warning);

    DiagnosticReport {
        version: 1,
        file: file.to_string(),
        root: root.to_string(),
        success: error_count == 0,
        diagnostics: diagnostics
            .iter()
            .map(|d| to_json_diagnostic(d, source, &lines, &registry))
            .collect(),
        error_count,
        warning_count,
    }
}

fn to_json_diagnostic(
    diag: &Diagnostic,
    source: &str,
    lines: &LineIndex,
    registry: &ErrorCodeRegistry,
) -> JsonDiagnostic {
    let code = diag.code.as_ref().map(|c| c.0.clone());
    let category = code
        .as_deref()
        .and_then(|c| registry.get(c))
        .map(|info| info.category.to_string());

    let labels = diag
        .labels
        .iter()
        .map(|l| {
            let start = line_col(lines, l.span.start);
            JsonLabel {
                message: l.message.clone(),
                start,
                end: line_col(lines, l.span.end),
                source_line: lines.line_text(source, start.line).unwrap_or("").to_string(),
            }
        })
        .collect();

    JsonDiagnostic {
        severity: diag.severity,
        code,
        category,
        message: diag.message.clone(),
        location: diag.primary_span().map(|s: Span| line_col(lines, s.start)),
        labels,
        notes: diag.notes.clone(),
        help: diag.help.as_ref().map(|h| h.message.clone()),
    }
}

fn line_col(lines: &LineIndex, byte_offset: usize) -> LineCol {
    let (line, column) = lines.line_col(byte_offset);
    LineCol {
        line,
        column,
        byte_offset,
    }
}

/// Serialize a report to pretty JSON.
pub fn to_json_string(report: &DiagnosticReport) -> serde_json::Result<String> {
    serde_json::to_string_pretty(report)
}
