// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Conversions from layout errors and warnings to `Diagnostic`.

use strata_ast::Schema;
use strata_layout::{LayoutError, LayoutErrorKind, LayoutWarning, StructLayout, WarningKind};

use crate::suggestions::did_you_mean;
use crate::{Diagnostic, ToDiagnostic};

// ============================================================================
// Layout Errors
// ============================================================================

impl ToDiagnostic for LayoutError {
    fn to_diagnostic(&self) -> Diagnostic {
        use LayoutErrorKind::*;

        let message = self.kind.to_string();
        match &self.kind {
            DynamicArray => Diagnostic::error(message)
                .with_code("L0001")
                .with_primary(self.span, "length only known at runtime")
                .with_help("give the array a fixed length, or move it to a top-level field"),

            VariableString => Diagnostic::error(message)
                .with_code("L0002")
                .with_primary(self.span, "length only known at runtime")
                .with_help("use a fixed-length string, or move it to a top-level field"),

            UnsupportedVariant { .. } => Diagnostic::error(message)
                .with_code("L0003")
                .with_primary(self.span, "this variant")
                .with_help("declare the variant as fixed"),

            TooFewArms { .. } => Diagnostic::error(message)
                .with_code("L0004")
                .with_primary(self.span, "this variant"),

            ZeroSized { .. } => Diagnostic::error(message)
                .with_code("L0005")
                .with_primary(self.span, "zero length"),

            VariableInFixedContext { name } => Diagnostic::error(message)
                .with_code("L0006")
                .with_primary(self.span, format!("`{}` used here", name))
                .with_note("only the root struct may end in variable-length data"),

            UnknownType { .. } => Diagnostic::error(message)
                .with_code("L0100")
                .with_primary(self.span, "not declared"),

            NotAStruct { .. } => Diagnostic::error(message)
                .with_code("L0101")
                .with_primary(self.span, "expected a struct"),

            InvalidEnumRepr { .. } => Diagnostic::error(message)
                .with_code("L0102")
                .with_primary(self.span, "used here")
                .with_help("use an integer type such as `u8` or `u32`"),

            RecursiveType { .. } => Diagnostic::error(message)
                .with_code("L0103")
                .with_primary(self.span, "recursive reference")
                .with_note("a fixed-size struct cannot contain itself, even through an array or variant"),

            TooManyArms { .. } => Diagnostic::error(message)
                .with_code("L0200")
                .with_primary(self.span, "this variant"),

            TooManyFields { .. } => Diagnostic::error(message)
                .with_code("L0201")
                .with_primary(self.span, "limit reached here")
                .with_help("move large arrays of structs into a variable-length field"),

            SizeOverflow => Diagnostic::error(message)
                .with_code("L0202")
                .with_primary(self.span, "too large"),

            ImperfectLayout { reason } => Diagnostic::error(message)
                .with_code("L0300")
                .with_primary(self.span, "this variant")
                .with_note(reason.to_string())
                .with_help("turn off `require_perfect` to accept a padded layout"),

            Internal(_) => Diagnostic::error(message)
                .with_code("L0900")
                .with_primary(self.span, "while laying out this")
                .with_note("this is a bug in the layout engine, not in the schema"),
        }
    }
}

/// Like [`ToDiagnostic::to_diagnostic`], plus a did-you-mean hint for
/// misspelled type names.
pub fn error_in_schema(err: &LayoutError, schema: &Schema) -> Diagnostic {
    let diag = err.to_diagnostic();
    match &err.kind {
        LayoutErrorKind::UnknownType { name } => {
            match did_you_mean(name, schema.decls.keys().map(String::as_str)) {
                Some(hint) => diag.with_help(hint),
                None => diag,
            }
        }
        _ => diag,
    }
}

// ============================================================================
// Degraded Layouts
// ============================================================================

impl ToDiagnostic for LayoutWarning {
    fn to_diagnostic(&self) -> Diagnostic {
        let diag = Diagnostic::warning(self.to_string());
        match &self.kind {
            WarningKind::NoPerfectBoundary { class, .. } => diag
                .with_code("L0301")
                .with_primary(self.span, format!("arms cannot fill the {} zone exactly", class))
                .with_help("reordering or resizing small fields in the arms may allow a zero-waste layout"),

            WarningKind::SearchSkipped { .. } => diag
                .with_code("L0302")
                .with_primary(self.span, "this variant")
                .with_help("raise `max_search_bytes` to search larger variants"),

            WarningKind::Padded { wasted } => diag
                .with_code("L0303")
                .with_primary(self.span, format!("{} byte(s) unused by every arm", wasted)),
        }
    }
}

/// Warnings of a finished layout, in the order they were found.
pub fn layout_warnings(layout: &StructLayout) -> Vec<Diagnostic> {
    layout.warnings.iter().map(ToDiagnostic::to_diagnostic).collect()
}

/// Everything worth reporting about one layout run.
pub fn result_diagnostics(result: &Result<StructLayout, LayoutError>, schema: &Schema) -> Vec<Diagnostic> {
    match result {
        Ok(layout) => layout_warnings(layout),
        Err(err) => vec![error_in_schema(err, schema)],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Severity;
    use strata_ast::{Primitive, SchemaBuilder, Span};
    use strata_layout::{compute_layout, AlignClass, InternalError, LayoutOptions};

    #[test]
    fn unknown_type_suggests_close_name() {
        let mut b = SchemaBuilder::new();
        let x = b.prim(Primitive::U8);
        b.struct_decl("Point", vec![("x", x)]);
        b.at(Span::new(10, 15));
        let p = b.named("Pont");
        b.struct_decl("Line", vec![("a", p)]);
        let schema = b.build();

        let err = compute_layout(&schema, "Line", LayoutOptions::default()).unwrap_err();
        let diag = error_in_schema(&err, &schema);
        assert_eq!(diag.code.as_ref().unwrap().0, "L0100");
        assert_eq!(diag.message, "unknown type `Pont`");
        assert_eq!(diag.primary_span(), Some(Span::new(10, 15)));
        assert_eq!(diag.help.unwrap().message, "did you mean `Point`?");
    }

    #[test]
    fn internal_error_has_no_label() {
        let err: LayoutError = InternalError::BrokenChain { sum: 3 }.into();
        let diag = err.to_diagnostic();
        assert_eq!(diag.code.as_ref().unwrap().0, "L0900");
        assert!(diag.labels.is_empty());
    }

    #[test]
    fn warning_becomes_warning_diagnostic() {
        let warning = LayoutWarning {
            kind: WarningKind::NoPerfectBoundary { class: AlignClass::A4, boundary: 4 },
            span: Span::new(2, 9),
        };
        let diag = warning.to_diagnostic();
        assert_eq!(diag.severity, Severity::Warning);
        assert_eq!(diag.code.as_ref().unwrap().0, "L0301");
        assert_eq!(diag.primary_span(), Some(Span::new(2, 9)));
        assert_eq!(
            diag.message,
            "degraded variant layout: no zero-waste 4-byte boundary; fell back to offset 4"
        );
    }

    #[test]
    fn degraded_run_reports_warnings() {
        let mut b = SchemaBuilder::new();
        let n = b.prim(Primitive::U32);
        let c = b.prim(Primitive::U8);
        let counted = b.record(vec![("n", n), ("c", c)]);
        let s1 = b.fixed_string(3);
        let s2 = b.fixed_string(2);
        let codes = b.record(vec![("a", s1), ("b", s2)]);
        let v = b.variant(vec![counted, codes]);
        b.struct_decl("Msg", vec![("v", v)]);
        let schema = b.build();

        let result = compute_layout(&schema, "Msg", LayoutOptions::default());
        let diagnostics = result_diagnostics(&result, &schema);
        let codes: Vec<_> = diagnostics.iter().map(|d| d.code.as_ref().unwrap().0.as_str()).collect();
        // The 3-byte string takes the 4-byte zone, pushing the 2-byte one past
        // the largest arm.
        assert_eq!(codes, ["L0301", "L0303"]);

        let strict = compute_layout(&schema, "Msg", LayoutOptions::strict());
        let diagnostics = result_diagnostics(&strict, &schema);
        assert!(diagnostics[0].is_error());
        assert_eq!(diagnostics[0].code.as_ref().unwrap().0, "L0300");
    }

    #[test]
    fn every_error_code_is_registered() {
        let registry = crate::codes::ErrorCodeRegistry::default();
        let errors = [
            LayoutError::new(LayoutErrorKind::DynamicArray, Span::DUMMY),
            LayoutError::unknown_type("T", Span::DUMMY),
            LayoutError::recursive("T", Span::DUMMY),
            LayoutError::overflow(Span::DUMMY),
            InternalError::SlotNeverWritten { slot: 0 }.into(),
        ];
        for err in &errors {
            let code = err.to_diagnostic().code.unwrap();
            assert!(registry.get(&code.0).is_some(), "{} not registered", code.0);
        }
    }
}
