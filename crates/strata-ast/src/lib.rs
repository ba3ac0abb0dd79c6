// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Schema syntax tree for the strata compiler.
//!
//! The parser produces a [`Schema`]: an arena of type nodes plus the named
//! declarations (structs and enums) that reference them. Layout and code
//! generation only ever read it.

pub mod arena;
pub mod decl;
pub mod schema;
pub mod span;
pub mod ty;

pub use arena::{Arena, Idx};
pub use decl::{Decl, DeclKind, EnumDecl, EnumVariant, Field, StructDecl};
pub use schema::{Schema, SchemaBuilder};
pub use span::{LineIndex, Span};
pub use ty::{ArrayLen, Primitive, TypeExpr, TypeId, TypeKind, VariantEncoding};
