// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Type expression nodes.

use crate::arena::Idx;
use crate::decl::Field;
use crate::Span;

pub type TypeId = Idx<TypeExpr>;

/// A type as written in the schema.
#[derive(Debug, Clone)]
pub struct TypeExpr {
    pub kind: TypeKind,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum TypeKind {
    Primitive(Primitive),
    /// `string<N>`: exactly `len` bytes, no terminator.
    FixedString { len: u32 },
    /// Variable-length string. Only allowed as a direct field of the root struct.
    String,
    Array { elem: TypeId, len: ArrayLen },
    /// Tagged union of `arms`.
    Variant { arms: Vec<TypeId>, encoding: VariantEncoding },
    /// Anonymous field list, e.g. the body of a variant arm.
    Record(Vec<Field>),
    /// Reference to a struct or enum declaration by name.
    Named(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayLen {
    Fixed(u64),
    Dynamic,
}

/// How a variant stores its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VariantEncoding {
    /// Arms share one fixed-size storage area.
    #[default]
    Fixed,
    /// Payload sized to the active arm.
    Packed,
    /// Payload stored out of line.
    Dynamic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
}

impl Primitive {
    /// Byte size, which is also the natural alignment.
    pub fn size(self) -> u64 {
        match self {
            Primitive::Bool | Primitive::I8 | Primitive::U8 => 1,
            Primitive::I16 | Primitive::U16 => 2,
            Primitive::I32 | Primitive::U32 | Primitive::F32 => 4,
            Primitive::I64 | Primitive::U64 | Primitive::F64 => 8,
        }
    }

    pub fn is_integer(self) -> bool {
        !matches!(self, Primitive::Bool | Primitive::F32 | Primitive::F64)
    }

    pub fn name(self) -> &'static str {
        match self {
            Primitive::Bool => "bool",
            Primitive::I8 => "i8",
            Primitive::I16 => "i16",
            Primitive::I32 => "i32",
            Primitive::I64 => "i64",
            Primitive::U8 => "u8",
            Primitive::U16 => "u16",
            Primitive::U32 => "u32",
            Primitive::U64 => "u64",
            Primitive::F32 => "f32",
            Primitive::F64 => "f64",
        }
    }

    pub fn from_name(name: &str) -> Option<Primitive> {
        Some(match name {
            "bool" => Primitive::Bool,
            "i8" => Primitive::I8,
            "i16" => Primitive::I16,
            "i32" => Primitive::I32,
            "i64" => Primitive::I64,
            "u8" => Primitive::U8,
            "u16" => Primitive::U16,
            "u32" => Primitive::U32,
            "u64" => Primitive::U64,
            "f32" => Primitive::F32,
            "f64" => Primitive::F64,
            _ => return None,
        })
    }
}

impl std::fmt::Display for Primitive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
