// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! What code generation consumes: final offsets, array packs, variant records.

use strata_ast::Span;

use crate::align::{AlignClass, LeafCounts};
use crate::error::LayoutWarning;
use crate::variant::Layout;

/// Index into [`StructLayout::array_packs`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PackId(pub u32);

/// Final placement of one primitive field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedOffset {
    pub offset: u64,
    /// Logical field id; equal to the slot's position in the offset table.
    pub map_idx: u16,
    pub align: AlignClass,
    /// Innermost fixed array the field repeats in, if any.
    pub pack: Option<PackId>,
}

impl FixedOffset {
    pub const EMPTY: FixedOffset = FixedOffset {
        offset: u64::MAX,
        map_idx: u16::MAX,
        align: AlignClass::A1,
        pack: None,
    };

    pub fn is_empty(&self) -> bool {
        self.offset == u64::MAX && self.map_idx == u16::MAX
    }
}

/// One alignment class of a fixed array: the element's footprint at that
/// class, repeated `len` times back to back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArrayPackInfo {
    /// `elem_size * len`
    pub size: u64,
    pub elem_size: u64,
    pub len: u64,
    pub align: AlignClass,
    /// Enclosing array's pack at the same class.
    pub parent: Option<PackId>,
}

/// A trailing variable-length field of the root struct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VarLeaf {
    pub name: String,
    pub elem_size: u64,
    pub align: AlignClass,
}

/// How one fixed variant was laid out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantRecord {
    /// Slot of the discriminant.
    pub tag: u32,
    pub arms: usize,
    /// Boundaries the search asked for.
    pub target: Layout,
    /// Boundaries the assignment produced, relative to the variant's storage.
    pub layout: Layout,
    /// The largest arm's byte requirement.
    pub required: u64,
    pub perfect: bool,
    pub span: Span,
}

/// Layout of a root struct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructLayout {
    pub name: String,
    /// One entry per primitive field, in declaration order (depth first).
    pub fixed_offsets: Vec<FixedOffset>,
    pub array_packs: Vec<ArrayPackInfo>,
    pub variants: Vec<VariantRecord>,
    pub var_leaves: Vec<VarLeaf>,
    /// Bytes per alignment zone of the fixed part.
    pub zones: LeafCounts,
    pub fixed_size: u64,
    /// Where variable-length data begins, if the struct has any.
    pub var_start: Option<u64>,
    pub warnings: Vec<LayoutWarning>,
}

impl StructLayout {
    /// Bytes before the variable region, padding included.
    pub fn consumed_size(&self) -> u64 {
        self.var_start.unwrap_or(self.fixed_size)
    }

    pub fn pack(&self, id: PackId) -> &ArrayPackInfo {
        &self.array_packs[id.0 as usize]
    }

    /// Packs enclosing `slot`, outermost first.
    pub fn pack_chain(&self, slot: usize) -> Vec<PackId> {
        let mut chain = Vec::new();
        let mut next = self.fixed_offsets.get(slot).and_then(|f| f.pack);
        while let Some(id) = next {
            chain.push(id);
            next = self.pack(id).parent;
        }
        chain.reverse();
        chain
    }

    /// Absolute offset of `slot` for the given array indices (outermost first).
    /// `None` when the index count or any index is out of range.
    pub fn element_offset(&self, slot: usize, indices: &[u64]) -> Option<u64> {
        let field = self.fixed_offsets.get(slot)?;
        let chain = self.pack_chain(slot);
        if chain.len() != indices.len() {
            return None;
        }
        let mut offset = field.offset;
        for (id, &index) in chain.iter().zip(indices) {
            let pack = self.pack(*id);
            if index >= pack.len {
                return None;
            }
            offset += index * pack.elem_size;
        }
        Some(offset)
    }

    /// Slots ordered by offset, ties by slot.
    pub fn fields_sorted(&self) -> Vec<usize> {
        let mut slots: Vec<usize> = (0..self.fixed_offsets.len()).collect();
        slots.sort_by_key(|&s| (self.fixed_offsets[s].offset, s));
        slots
    }

    pub fn is_perfect(&self) -> bool {
        self.warnings.is_empty()
    }
}
