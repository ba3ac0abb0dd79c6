// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Error code registry.
//!
//! Maps layout codes (L0001, L0100, etc.) to titles and categories.

use std::collections::HashMap;

/// Registry of all known layout codes.
pub struct ErrorCodeRegistry {
    codes: HashMap<&'static str, ErrorCodeInfo>,
}

/// Information about a single code.
pub struct ErrorCodeInfo {
    pub code: &'static str,
    pub title: &'static str,
    pub category: ErrorCategory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// A type that has no fixed layout.
    Shape,
    /// A bad or circular reference between declarations.
    Reference,
    /// A schema beyond the engine's size limits.
    Limit,
    /// Correct but not zero-waste variant layouts.
    Layout,
    Internal,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Shape => write!(f, "Shape"),
            ErrorCategory::Reference => write!(f, "Reference"),
            ErrorCategory::Limit => write!(f, "Limit"),
            ErrorCategory::Layout => write!(f, "Layout"),
            ErrorCategory::Internal => write!(f, "Internal"),
        }
    }
}

macro_rules! register_codes {
    ($($code:literal => ($title:literal, $cat:expr)),* $(,)?) => {{
        let mut map = HashMap::new();
        $(
            map.insert($code, ErrorCodeInfo {
                code: $code,
                title: $title,
                category: $cat,
            });
        )*
        map
    }};
}

impl Default for ErrorCodeRegistry {
    fn default() -> Self {
        use ErrorCategory::*;

        Self {
            codes: register_codes! {
                // Unsupported shapes (L00xx)
                "L0001" => ("dynamic array in fixed-size type", Shape),
                "L0002" => ("variable-length string in fixed-size type", Shape),
                "L0003" => ("unsupported variant encoding", Shape),
                "L0004" => ("variant with fewer than two arms", Shape),
                "L0005" => ("zero-sized field", Shape),
                "L0006" => ("variable-length struct embedded", Shape),

                // References (L01xx)
                "L0100" => ("unknown type", Reference),
                "L0101" => ("expected a struct", Reference),
                "L0102" => ("invalid enum representation", Reference),
                "L0103" => ("recursive struct", Reference),

                // Limits (L02xx)
                "L0200" => ("too many variant arms", Limit),
                "L0201" => ("too many fixed fields", Limit),
                "L0202" => ("fixed size overflow", Limit),

                // Variant layout quality (L03xx)
                "L0300" => ("imperfect variant layout rejected", Layout),
                "L0301" => ("no zero-waste zone boundary", Layout),
                "L0302" => ("variant too large to search", Layout),
                "L0303" => ("padded variant storage", Layout),

                // Engine bugs (L09xx)
                "L0900" => ("internal layout error", Internal),
            },
        }
    }
}

impl ErrorCodeRegistry {
    pub fn get(&self, code: &str) -> Option<&ErrorCodeInfo> {
        self.codes.get(code)
    }

    pub fn all(&self) -> impl Iterator<Item = &ErrorCodeInfo> {
        self.codes.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_match_their_keys() {
        let registry = ErrorCodeRegistry::default();
        for info in registry.all() {
            assert_eq!(registry.get(info.code).map(|i| i.code), Some(info.code));
            assert!(info.code.starts_with('L') && info.code.len() == 5);
        }
        assert_eq!(registry.get("L0103").unwrap().category, ErrorCategory::Reference);
        assert!(registry.get("E0001").is_none());
    }
}
