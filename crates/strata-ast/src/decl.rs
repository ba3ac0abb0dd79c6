// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Declaration nodes.

use crate::ty::{Primitive, TypeId};
use crate::Span;

/// A named top-level declaration.
#[derive(Debug, Clone)]
pub struct Decl {
    pub kind: DeclKind,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum DeclKind {
    Struct(StructDecl),
    Enum(EnumDecl),
}

impl Decl {
    pub fn name(&self) -> &str {
        match &self.kind {
            DeclKind::Struct(s) => &s.name,
            DeclKind::Enum(e) => &e.name,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            DeclKind::Struct(_) => "struct",
            DeclKind::Enum(_) => "enum",
        }
    }
}

#[derive(Debug, Clone)]
pub struct StructDecl {
    pub name: String,
    pub fields: Vec<Field>,
}

/// A struct or record field.
#[derive(Debug, Clone)]
pub struct Field {
    pub name: String,
    pub ty: TypeId,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct EnumDecl {
    pub name: String,
    /// Integer type the discriminant is stored as.
    pub repr: Primitive,
    pub variants: Vec<EnumVariant>,
}

#[derive(Debug, Clone)]
pub struct EnumVariant {
    pub name: String,
    pub value: i64,
}
