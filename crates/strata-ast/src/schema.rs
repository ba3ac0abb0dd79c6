// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! The parsed schema and a programmatic builder for it.

use indexmap::IndexMap;

use crate::arena::Arena;
use crate::decl::{Decl, DeclKind, EnumDecl, EnumVariant, Field, StructDecl};
use crate::ty::{ArrayLen, Primitive, TypeExpr, TypeId, TypeKind, VariantEncoding};
use crate::Span;

/// Type nodes plus declarations, in source order.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    pub types: Arena<TypeExpr>,
    pub decls: IndexMap<String, Decl>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ty(&self, id: TypeId) -> &TypeExpr {
        &self.types[id]
    }

    pub fn decl(&self, name: &str) -> Option<&Decl> {
        self.decls.get(name)
    }

    pub fn struct_decl(&self, name: &str) -> Option<&StructDecl> {
        match &self.decls.get(name)?.kind {
            DeclKind::Struct(s) => Some(s),
            DeclKind::Enum(_) => None,
        }
    }

    /// Insert a declaration, returning the one it replaced.
    pub fn insert_decl(&mut self, decl: Decl) -> Option<Decl> {
        self.decls.insert(decl.name().to_string(), decl)
    }
}

/// Builds a [`Schema`] without going through the parser.
///
/// Every node created takes the builder's current span (see [`SchemaBuilder::at`]).
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    schema: Schema,
    span: Span,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Span attached to the nodes created from now on.
    pub fn at(&mut self, span: Span) -> &mut Self {
        self.span = span;
        self
    }

    fn node(&mut self, kind: TypeKind) -> TypeId {
        self.schema.types.alloc(TypeExpr { kind, span: self.span })
    }

    pub fn prim(&mut self, p: Primitive) -> TypeId {
        self.node(TypeKind::Primitive(p))
    }

    pub fn fixed_string(&mut self, len: u32) -> TypeId {
        self.node(TypeKind::FixedString { len })
    }

    pub fn string(&mut self) -> TypeId {
        self.node(TypeKind::String)
    }

    pub fn array(&mut self, elem: TypeId, len: u64) -> TypeId {
        self.node(TypeKind::Array { elem, len: ArrayLen::Fixed(len) })
    }

    pub fn dyn_array(&mut self, elem: TypeId) -> TypeId {
        self.node(TypeKind::Array { elem, len: ArrayLen::Dynamic })
    }

    pub fn variant(&mut self, arms: Vec<TypeId>) -> TypeId {
        self.variant_with(arms, VariantEncoding::Fixed)
    }

    pub fn variant_with(&mut self, arms: Vec<TypeId>, encoding: VariantEncoding) -> TypeId {
        self.node(TypeKind::Variant { arms, encoding })
    }

    pub fn record(&mut self, fields: Vec<(&str, TypeId)>) -> TypeId {
        let fields = self.fields(fields);
        self.node(TypeKind::Record(fields))
    }

    pub fn named(&mut self, name: &str) -> TypeId {
        self.node(TypeKind::Named(name.to_string()))
    }

    pub fn struct_decl(&mut self, name: &str, fields: Vec<(&str, TypeId)>) -> &mut Self {
        let fields = self.fields(fields);
        let decl = Decl {
            kind: DeclKind::Struct(StructDecl { name: name.to_string(), fields }),
            span: self.span,
        };
        self.schema.insert_decl(decl);
        self
    }

    pub fn enum_decl(&mut self, name: &str, repr: Primitive, variants: &[&str]) -> &mut Self {
        let variants = variants
            .iter()
            .enumerate()
            .map(|(i, v)| EnumVariant { name: v.to_string(), value: i as i64 })
            .collect();
        let decl = Decl {
            kind: DeclKind::Enum(EnumDecl { name: name.to_string(), repr, variants }),
            span: self.span,
        };
        self.schema.insert_decl(decl);
        self
    }

    pub fn build(self) -> Schema {
        self.schema
    }

    fn fields(&self, fields: Vec<(&str, TypeId)>) -> Vec<Field> {
        fields
            .into_iter()
            .map(|(name, ty)| Field { name: name.to_string(), ty, span: self.span })
            .collect()
    }
}
