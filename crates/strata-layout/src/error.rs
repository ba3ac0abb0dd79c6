// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Layout error and warning types.

use std::fmt;

use strata_ast::{Primitive, Span};
use thiserror::Error;

use crate::align::AlignClass;

pub type Result<T, E = LayoutError> = std::result::Result<T, E>;

/// A fatal layout error. Layout stops at the first one.
#[derive(Debug, Clone, Error)]
#[error("{kind}")]
pub struct LayoutError {
    pub kind: LayoutErrorKind,
    pub span: Span,
}

impl LayoutError {
    pub fn new(kind: LayoutErrorKind, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn unknown_type(name: &str, span: Span) -> Self {
        Self::new(LayoutErrorKind::UnknownType { name: name.to_string() }, span)
    }

    pub fn not_a_struct(name: &str, found: &'static str, span: Span) -> Self {
        Self::new(LayoutErrorKind::NotAStruct { name: name.to_string(), found }, span)
    }

    pub fn recursive(name: &str, span: Span) -> Self {
        Self::new(LayoutErrorKind::RecursiveType { name: name.to_string() }, span)
    }

    pub fn zero_sized(what: &'static str, span: Span) -> Self {
        Self::new(LayoutErrorKind::ZeroSized { what }, span)
    }

    pub fn overflow(span: Span) -> Self {
        Self::new(LayoutErrorKind::SizeOverflow, span)
    }

    /// True for errors caused by a bug in the engine rather than the schema.
    pub fn is_internal(&self) -> bool {
        matches!(self.kind, LayoutErrorKind::Internal(_))
    }
}

impl From<InternalError> for LayoutError {
    fn from(err: InternalError) -> Self {
        Self::new(LayoutErrorKind::Internal(err), Span::DUMMY)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutErrorKind {
    #[error("dynamic arrays cannot appear inside a fixed-size type")]
    DynamicArray,

    #[error("variable-length strings cannot appear inside a fixed-size type")]
    VariableString,

    #[error("{encoding} variants are not supported; only fixed variants have a static layout")]
    UnsupportedVariant { encoding: &'static str },

    #[error("a variant needs at least two arms, found {found}")]
    TooFewArms { found: usize },

    #[error("a variant has {found} arms; at most 65535 are supported")]
    TooManyArms { found: usize },

    #[error("zero-length {what} has no storage")]
    ZeroSized { what: &'static str },

    #[error("unknown type `{name}`")]
    UnknownType { name: String },

    #[error("`{name}` is an {found}, expected a struct")]
    NotAStruct { name: String, found: &'static str },

    #[error("enum `{name}` must be stored as an integer, not `{repr}`")]
    InvalidEnumRepr { name: String, repr: Primitive },

    #[error("struct `{name}` contains itself")]
    RecursiveType { name: String },

    #[error("struct `{name}` has variable-length fields and cannot be embedded in a fixed-size type")]
    VariableInFixedContext { name: String },

    #[error("more than {max} fixed fields")]
    TooManyFields { max: usize },

    #[error("fixed size does not fit in 64 bits")]
    SizeOverflow,

    #[error("variant layout is not zero-waste ({reason})")]
    ImperfectLayout { reason: WarningKind },

    #[error("internal layout error: {0}")]
    Internal(InternalError),
}

/// Broken engine invariants. Seeing one of these is always a bug.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InternalError {
    #[error("offset slot {slot} written twice")]
    SlotWrittenTwice { slot: u32 },

    #[error("offset slot {slot} was never written")]
    SlotNeverWritten { slot: u32 },

    #[error("field {field} of arm {arm} placed twice")]
    FieldPlacedTwice { arm: usize, field: usize },

    #[error("arm {arm} still has a {class} field after its zone was closed")]
    FieldMissedZone { arm: usize, class: AlignClass },

    #[error("arm {arm} left {count} field(s) unplaced")]
    UnplacedFields { arm: usize, count: usize },

    #[error("subset chain broke at sum {sum}")]
    BrokenChain { sum: u64 },

    #[error("{class} zone starts at misaligned offset {start}")]
    MisalignedZone { class: AlignClass, start: u64 },
}

/// A layout that is correct but not zero-waste.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutWarning {
    pub kind: WarningKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WarningKind {
    /// No boundary at `class` is an exact subset sum for every large arm;
    /// the search fell back to the smallest safe boundary.
    NoPerfectBoundary { class: AlignClass, boundary: u64 },
    /// Arms too large for the configured search limit.
    SearchSkipped { required: u64, limit: u64 },
    /// The assignment used `wasted` bytes more than the largest arm needs.
    Padded { wasted: u64 },
}

impl fmt::Display for WarningKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WarningKind::NoPerfectBoundary { class, boundary } => write!(
                f,
                "no zero-waste {} boundary; fell back to offset {}",
                class, boundary
            ),
            WarningKind::SearchSkipped { required, limit } => write!(
                f,
                "arm needs {} bytes, above the search limit of {}",
                required, limit
            ),
            WarningKind::Padded { wasted } => write!(f, "{} byte(s) of padding", wasted),
        }
    }
}

impl fmt::Display for LayoutWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "degraded variant layout: {}", self.kind)
    }
}
