// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Terminal formatter for diagnostics.
//!
//! ```text
//! error[L0100]: unknown type `Pont`
//!   --> shapes.schema:4:8
//!    |
//!  4 |     a: Pont,
//!    |        ^^^^ not declared
//!    |
//!    = help: did you mean `Point`?
//! ```

use std::collections::BTreeMap;

use colored::Colorize;
use strata_ast::LineIndex;

use crate::{Diagnostic, Severity};

/// Formats diagnostics for terminal output.
pub struct DiagnosticFormatter<'a> {
    source: &'a str,
    file_name: Option<&'a str>,
    lines: LineIndex,
}

/// A source line with its labels.
struct AnnotatedLine {
    line_num: usize,
    text: String,
    annotations: Vec<Annotation>,
}

struct Annotation {
    col_start: usize,
    col_end: usize,
    message: String,
}

impl<'a> DiagnosticFormatter<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            file_name: None,
            lines: LineIndex::new(source),
        }
    }

    pub fn with_file_name(mut self, name: &'a str) -> Self {
        self.file_name = Some(name);
        self
    }

    pub fn format(&self, diagnostic: &Diagnostic) -> String {
        let mut out = String::new();
        self.format_header(&mut out, diagnostic);

        let annotated = self.collect_annotated_lines(diagnostic);
        let Some(first) = annotated.first() else {
            self.format_footer(&mut out, diagnostic, 2);
            return out;
        };

        // --> file:line:col
        let file = self.file_name.unwrap_or("<schema>");
        let first_col = first.annotations.first().map_or(1, |a| a.col_start);
        out.push_str(&format!(
            "  {} {}:{}:{}\n",
            "-->".blue(),
            file,
            first.line_num,
            first_col
        ));

        let max_line = annotated.last().map_or(1, |a| a.line_num);
        let gutter_width = max_line.to_string().len().max(2);
        let empty_gutter = format!("{} {}", " ".repeat(gutter_width + 1), "|".blue());

        out.push_str(&empty_gutter);
        out.push('\n');
        let mut prev_line_num: Option<usize> = None;
        for line in &annotated {
            if prev_line_num.is_some_and(|prev| line.line_num > prev + 1) {
                out.push_str(&format!("{} {}\n", " ".repeat(gutter_width), "...".blue()));
            }
            out.push_str(&format!(
                "{:>width$} {} {}\n",
                line.line_num.to_string().blue().bold(),
                "|".blue(),
                line.text,
                width = gutter_width + 1,
            ));
            self.format_annotations(&mut out, line, &empty_gutter);
            prev_line_num = Some(line.line_num);
        }

        if !diagnostic.notes.is_empty() || diagnostic.help.is_some() {
            out.push_str(&empty_gutter);
            out.push('\n');
        }
        self.format_footer(&mut out, diagnostic, gutter_width);
        out
    }

    fn format_header(&self, out: &mut String, diagnostic: &Diagnostic) {
        let severity = match diagnostic.severity {
            Severity::Error => "error".red().bold(),
            Severity::Warning => "warning".yellow().bold(),
        };

        match &diagnostic.code {
            Some(code) => out.push_str(&format!(
                "{}[{}]: {}\n",
                severity,
                code.0.as_str().red().bold(),
                diagnostic.message.bold()
            )),
            None => out.push_str(&format!("{}: {}\n", severity, diagnostic.message.bold())),
        }
    }

    fn format_footer(&self, out: &mut String, diagnostic: &Diagnostic, gutter_width: usize) {
        let pad = " ".repeat(gutter_width + 1);
        for note in &diagnostic.notes {
            out.push_str(&format!("{} {} {}: {}\n", pad, "=".cyan(), "note".cyan().bold(), note));
        }
        if let Some(help) = &diagnostic.help {
            out.push_str(&format!(
                "{} {} {}: {}\n",
                pad,
                "=".cyan(),
                "help".cyan().bold(),
                help.message
            ));
        }
    }

    fn collect_annotated_lines(&self, diagnostic: &Diagnostic) -> Vec<AnnotatedLine> {
        let mut by_line: BTreeMap<usize, AnnotatedLine> = BTreeMap::new();

        for label in &diagnostic.labels {
            let (line_num, col_start) = self.lines.line_col(label.span.start);
            let (end_line, col_end) = self.lines.line_col(label.span.end);
            let text = self.lines.line_text(self.source, line_num).unwrap_or("");

            // Multi-line spans are underlined to the end of their first line.
            let col_end = if end_line == line_num { col_end } else { text.len() + 1 };

            let entry = by_line.entry(line_num).or_insert_with(|| AnnotatedLine {
                line_num,
                text: text.to_string(),
                annotations: Vec::new(),
            });
            entry.annotations.push(Annotation {
                col_start,
                col_end: col_end.max(col_start + 1),
                message: label.message.clone(),
            });
        }

        by_line.into_values().collect()
    }

    fn format_annotations(&self, out: &mut String, line: &AnnotatedLine, empty_gutter: &str) {
        let mut sorted: Vec<&Annotation> = line.annotations.iter().collect();
        sorted.sort_by_key(|a| a.col_start);

        let width = line.text.len() + 1;
        let mut underline = vec![' '; width];
        for ann in &sorted {
            for slot in underline.iter_mut().take(ann.col_end - 1).skip(ann.col_start - 1) {
                *slot = '^';
            }
        }

        let underline: String = underline.iter().collect::<String>().trim_end().to_string();
        if underline.is_empty() {
            return;
        }
        let underline = underline.red().bold();

        match sorted.as_slice() {
            [only] => out.push_str(&format!(
                "{} {} {}\n",
                empty_gutter,
                underline,
                only.message.red().bold()
            )),
            _ => {
                out.push_str(&format!("{} {}\n", empty_gutter, underline));
                for ann in sorted.iter().rev() {
                    out.push_str(&format!(
                        "{} {}{}\n",
                        empty_gutter,
                        " ".repeat(ann.col_start.saturating_sub(1)),
                        ann.message.red().bold(),
                    ));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_ast::Span;

    fn plain(f: impl FnOnce() -> String) -> String {
        colored::control::set_override(false);
        f()
    }

    #[test]
    fn renders_location_and_underline() {
        let source = "struct Line {\n    a: Pont,\n}\n";
        let diag = Diagnostic::error("unknown type `Pont`")
            .with_code("L0100")
            .with_primary(Span::new(21, 25), "not declared")
            .with_help("did you mean `Point`?");
        let out = plain(|| DiagnosticFormatter::new(source).with_file_name("shapes.schema").format(&diag));

        assert!(out.starts_with("error[L0100]: unknown type `Pont`\n"));
        assert!(out.contains("--> shapes.schema:2:8"));
        assert!(out.contains(" 2 |     a: Pont,"));
        assert!(out.contains("|        ^^^^ not declared"));
        assert!(out.ends_with("= help: did you mean `Point`?\n"));
    }

    #[test]
    fn unlabeled_diagnostic_has_no_snippet() {
        let diag = Diagnostic::error("internal layout error").with_note("this is a bug");
        let out = plain(|| DiagnosticFormatter::new("").format(&diag));
        assert!(!out.contains("-->"));
        assert!(out.contains("= note: this is a bug"));
    }
}
