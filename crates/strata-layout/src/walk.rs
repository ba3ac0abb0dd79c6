// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! Structural walk over type nodes.
//!
//! Every leaf gets a slot in the offset table and a relative offset in `rel`.
//! Walking a node pushes one or more [`QueuedField`]s into the current
//! [`Level`]: a sequential level places them at once (next free offset of their
//! class zone), a variant-arm level only queues them for the solver.
//! Placing an item adds its base to the relative offset of every slot it
//! carries, so offsets stay relative to the innermost zone until the root
//! converts them to absolute ones.

use std::ops::Range;

use strata_ast::{ArrayLen, DeclKind, Schema, Span, StructDecl, TypeId, TypeKind, VariantEncoding};
use tracing::trace;

use crate::align::{AlignClass, LeafCounts};
use crate::engine::{LayoutEngine, StructTemplate};
use crate::error::{LayoutError, LayoutErrorKind, LayoutWarning, Result};
use crate::output::{ArrayPackInfo, PackId, VarLeaf, VariantRecord};
use crate::variant;

/// Slot ids are `u16` map indices; `u16::MAX` is the empty sentinel.
pub(crate) const MAX_FIELDS: usize = u16::MAX as usize;

/// A field, or a whole sub-layout zone, waiting to be placed.
#[derive(Debug, Clone)]
pub(crate) struct QueuedField {
    /// Bytes still to place. Zero once placed.
    pub size: u64,
    pub align: AlignClass,
    pub payload: FieldPayload,
}

impl QueuedField {
    pub fn is_placed(&self) -> bool {
        self.size == 0
    }
}

#[derive(Debug, Clone)]
pub(crate) enum FieldPayload {
    Simple { slot: u32 },
    /// One class zone of a fixed array, `len` elements back to back.
    ArrayFieldPack { members: Range<u32>, pack: PackId },
    /// One class zone of a nested variant's shared storage.
    VariantFieldPack { members: Range<u32> },
    /// One class zone of a spliced named struct.
    StructFieldPack { members: Range<u32> },
}

/// Per-slot data fixed at creation.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SlotMeta {
    pub align: AlignClass,
    pub pack: Option<PackId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LevelMode {
    Sequential,
    Arm,
}

/// Placement state of one nesting level.
#[derive(Debug)]
pub(crate) struct Level {
    mode: LevelMode,
    /// Next free relative offset per class zone.
    cursor: [u64; 4],
    zones: [Vec<u32>; 4],
    queue: Vec<QueuedField>,
}

impl Level {
    pub fn sequential() -> Self {
        Self::with_mode(LevelMode::Sequential)
    }

    pub fn arm() -> Self {
        Self::with_mode(LevelMode::Arm)
    }

    fn with_mode(mode: LevelMode) -> Self {
        Level { mode, cursor: [0; 4], zones: Default::default(), queue: Vec::new() }
    }

    pub fn into_queue(self) -> Vec<QueuedField> {
        self.queue
    }
}

/// A finished sequential level: zone sizes plus the slots living in each
/// zone, offsets relative to the zone start.
#[derive(Debug, Clone)]
pub(crate) struct Sublayout {
    pub footprint: LeafCounts,
    pub zones: [Range<u32>; 4],
}

/// State shared by every level of one struct's walk.
pub(crate) struct LayoutCx<'e, 's> {
    pub engine: &'e mut LayoutEngine<'s>,
    pub schema: &'s Schema,
    pub slots: Vec<SlotMeta>,
    /// Relative offset of each slot (the temporary offset table).
    pub rel: Vec<u64>,
    /// Member slots of every pack, addressed by range.
    pub pending: Vec<u32>,
    pub packs: Vec<ArrayPackInfo>,
    pub variants: Vec<VariantRecord>,
    pub var_leaves: Vec<VarLeaf>,
    pub warnings: Vec<LayoutWarning>,
}

impl<'e, 's> LayoutCx<'e, 's> {
    pub fn new(engine: &'e mut LayoutEngine<'s>) -> Self {
        let schema = engine.schema();
        LayoutCx {
            engine,
            schema,
            slots: Vec::new(),
            rel: Vec::new(),
            pending: Vec::new(),
            packs: Vec::new(),
            variants: Vec::new(),
            var_leaves: Vec::new(),
            warnings: Vec::new(),
        }
    }

    // ─── Slots and packs ────────────────────────────────────────────

    fn alloc_slot(&mut self, align: AlignClass, span: Span) -> Result<u32> {
        let slot = self.slots.len();
        if slot >= MAX_FIELDS {
            return Err(LayoutError::new(LayoutErrorKind::TooManyFields { max: MAX_FIELDS }, span));
        }
        self.slots.push(SlotMeta { align, pack: None });
        self.rel.push(0);
        Ok(slot as u32)
    }

    pub fn push_pending(&mut self, slots: impl IntoIterator<Item = u32>) -> Range<u32> {
        let start = self.pending.len() as u32;
        self.pending.extend(slots);
        start..self.pending.len() as u32
    }

    pub fn member_slots<'p>(&'p self, payload: &'p FieldPayload) -> &'p [u32] {
        match payload {
            FieldPayload::Simple { slot } => std::slice::from_ref(slot),
            FieldPayload::ArrayFieldPack { members, .. }
            | FieldPayload::VariantFieldPack { members }
            | FieldPayload::StructFieldPack { members } => {
                &self.pending[members.start as usize..members.end as usize]
            }
        }
    }

    /// Move every slot of `payload` by `by` bytes.
    pub fn translate(&mut self, payload: &FieldPayload, by: u64) {
        match payload {
            FieldPayload::Simple { slot } => self.rel[*slot as usize] += by,
            FieldPayload::ArrayFieldPack { members, .. }
            | FieldPayload::VariantFieldPack { members }
            | FieldPayload::StructFieldPack { members } => {
                for i in members.start..members.end {
                    let slot = self.pending[i as usize] as usize;
                    self.rel[slot] += by;
                }
            }
        }
    }

    /// Make `pack` the outermost array of every slot in `members`.
    fn link_pack(&mut self, members: Range<u32>, pack: PackId) {
        for i in members {
            let slot = self.pending[i as usize] as usize;
            match self.slots[slot].pack {
                None => self.slots[slot].pack = Some(pack),
                Some(mut top) => {
                    while let Some(parent) = self.packs[top.0 as usize].parent {
                        top = parent;
                    }
                    if top != pack {
                        self.packs[top.0 as usize].parent = Some(pack);
                    }
                }
            }
        }
    }

    // ─── Levels ─────────────────────────────────────────────────────

    fn push(&mut self, level: &mut Level, item: QueuedField, span: Span) -> Result<()> {
        match level.mode {
            LevelMode::Arm => level.queue.push(item),
            LevelMode::Sequential => {
                let zone = item.align.index();
                let base = level.cursor[zone];
                level.cursor[zone] = base
                    .checked_add(item.size)
                    .ok_or_else(|| LayoutError::overflow(span))?;
                self.translate(&item.payload, base);
                level.zones[zone].extend_from_slice(self.member_slots(&item.payload));
            }
        }
        Ok(())
    }

    fn push_leaf(&mut self, level: &mut Level, align: AlignClass, size: u64, span: Span) -> Result<()> {
        let slot = self.alloc_slot(align, span)?;
        self.push(level, QueuedField { size, align, payload: FieldPayload::Simple { slot } }, span)
    }

    /// Each cursor is checked as it grows, but their sum can still overflow.
    pub fn finish(&mut self, level: Level, span: Span) -> Result<Sublayout> {
        let mut footprint = LeafCounts::default();
        for class in AlignClass::DESCENDING {
            footprint
                .add_bytes(class, level.cursor[class.index()])
                .ok_or_else(|| LayoutError::overflow(span))?;
        }
        let [z8, z4, z2, z1] = level.zones;
        Ok(Sublayout {
            footprint,
            zones: [
                self.push_pending(z8),
                self.push_pending(z4),
                self.push_pending(z2),
                self.push_pending(z1),
            ],
        })
    }

    // ─── Walk ───────────────────────────────────────────────────────

    pub fn walk_type(&mut self, level: &mut Level, ty: TypeId) -> Result<()> {
        let schema = self.schema;
        let node = schema.ty(ty);
        let span = node.span;
        match &node.kind {
            TypeKind::Primitive(p) => {
                self.push_leaf(level, AlignClass::of_size(p.size()), p.size(), span)
            }
            TypeKind::FixedString { len } => {
                if *len == 0 {
                    return Err(LayoutError::zero_sized("string", span));
                }
                self.push_leaf(level, AlignClass::A1, u64::from(*len), span)
            }
            TypeKind::String => Err(LayoutError::new(LayoutErrorKind::VariableString, span)),
            TypeKind::Array { len: ArrayLen::Dynamic, .. } => {
                Err(LayoutError::new(LayoutErrorKind::DynamicArray, span))
            }
            TypeKind::Array { elem, len: ArrayLen::Fixed(len) } => {
                self.walk_array(level, *elem, *len, span)
            }
            TypeKind::Variant { arms, encoding } => self.walk_variant(level, arms, *encoding, span),
            TypeKind::Record(fields) => {
                for field in fields {
                    self.walk_type(level, field.ty)?;
                }
                Ok(())
            }
            TypeKind::Named(name) => self.walk_named(level, name, span),
        }
    }

    fn walk_array(&mut self, level: &mut Level, elem: TypeId, len: u64, span: Span) -> Result<()> {
        if len == 0 {
            return Err(LayoutError::zero_sized("array", span));
        }
        let mut element_level = Level::sequential();
        self.walk_type(&mut element_level, elem)?;
        let element = self.finish(element_level, span)?;
        trace!(len, footprint = ?element.footprint, "array element laid out");

        for class in AlignClass::DESCENDING {
            let elem_size = element.footprint.bytes(class);
            if elem_size == 0 {
                continue;
            }
            let size = elem_size.checked_mul(len).ok_or_else(|| LayoutError::overflow(span))?;
            let pack = PackId(self.packs.len() as u32);
            self.packs.push(ArrayPackInfo { size, elem_size, len, align: class, parent: None });
            let members = element.zones[class.index()].clone();
            self.link_pack(members.clone(), pack);
            let item = QueuedField {
                size,
                align: class,
                payload: FieldPayload::ArrayFieldPack { members, pack },
            };
            self.push(level, item, span)?;
        }
        Ok(())
    }

    fn walk_variant(
        &mut self,
        level: &mut Level,
        arms: &[TypeId],
        encoding: VariantEncoding,
        span: Span,
    ) -> Result<()> {
        let encoding = match encoding {
            VariantEncoding::Fixed => None,
            VariantEncoding::Packed => Some("packed"),
            VariantEncoding::Dynamic => Some("dynamic"),
        };
        if let Some(encoding) = encoding {
            return Err(LayoutError::new(LayoutErrorKind::UnsupportedVariant { encoding }, span));
        }
        if arms.len() < 2 {
            return Err(LayoutError::new(LayoutErrorKind::TooFewArms { found: arms.len() }, span));
        }
        if arms.len() > usize::from(u16::MAX) {
            return Err(LayoutError::new(LayoutErrorKind::TooManyArms { found: arms.len() }, span));
        }

        let tag_size = if arms.len() <= usize::from(u8::MAX) { 1 } else { 2 };
        let tag = self.alloc_slot(AlignClass::of_size(tag_size), span)?;
        let tag_item = QueuedField {
            size: tag_size,
            align: AlignClass::of_size(tag_size),
            payload: FieldPayload::Simple { slot: tag },
        };
        self.push(level, tag_item, span)?;

        let packs = variant::lay_out_variant(self, arms, tag, span)?;
        for class in AlignClass::DESCENDING {
            let zone = &packs.zones[class.index()];
            if zone.size == 0 {
                continue;
            }
            let item = QueuedField {
                size: zone.size,
                align: class,
                payload: FieldPayload::VariantFieldPack { members: zone.members.clone() },
            };
            self.push(level, item, span)?;
        }
        Ok(())
    }

    fn walk_named(&mut self, level: &mut Level, name: &str, span: Span) -> Result<()> {
        let schema = self.schema;
        let decl = schema.decl(name).ok_or_else(|| LayoutError::unknown_type(name, span))?;
        match &decl.kind {
            DeclKind::Enum(def) => {
                if !def.repr.is_integer() {
                    let kind = LayoutErrorKind::InvalidEnumRepr { name: name.to_string(), repr: def.repr };
                    return Err(LayoutError::new(kind, span));
                }
                let size = def.repr.size();
                self.push_leaf(level, AlignClass::of_size(size), size, span)
            }
            DeclKind::Struct(_) => {
                let template = self.engine.template(name, span)?;
                if !template.var_leaves.is_empty() {
                    let kind = LayoutErrorKind::VariableInFixedContext { name: name.to_string() };
                    return Err(LayoutError::new(kind, span));
                }
                self.splice(level, &template, span)
            }
        }
    }

    /// Copy a cached struct layout into this walk, one pack per class zone.
    fn splice(&mut self, level: &mut Level, template: &StructTemplate, span: Span) -> Result<()> {
        let base = self.slots.len() as u32;
        if self.slots.len() + template.slots.len() > MAX_FIELDS {
            return Err(LayoutError::new(LayoutErrorKind::TooManyFields { max: MAX_FIELDS }, span));
        }
        let pack_base = self.packs.len() as u32;
        let rebase = |p: PackId| PackId(p.0 + pack_base);

        for (meta, rel) in template.slots.iter().zip(&template.rel) {
            self.slots.push(SlotMeta { align: meta.align, pack: meta.pack.map(rebase) });
            self.rel.push(*rel);
        }
        for pack in &template.packs {
            self.packs.push(ArrayPackInfo { parent: pack.parent.map(rebase), ..*pack });
        }
        for record in &template.variants {
            self.variants.push(VariantRecord { tag: record.tag + base, ..record.clone() });
        }
        self.warnings.extend(template.warnings.iter().cloned());

        for class in AlignClass::DESCENDING {
            let size = template.footprint.bytes(class);
            if size == 0 {
                continue;
            }
            let members = self.push_pending(template.zones[class.index()].iter().map(|s| s + base));
            let item = QueuedField {
                size,
                align: class,
                payload: FieldPayload::StructFieldPack { members },
            };
            self.push(level, item, span)?;
        }
        Ok(())
    }

    // ─── Struct bodies ──────────────────────────────────────────────

    /// Lay out a struct's own fields. Variable-length fields are allowed here
    /// and recorded as trailing leaves.
    pub fn build_template(mut self, name: &str, def: &StructDecl, span: Span) -> Result<StructTemplate> {
        let schema = self.schema;
        let mut level = Level::sequential();
        for field in &def.fields {
            let node = schema.ty(field.ty);
            match &node.kind {
                TypeKind::String => {
                    self.var_leaves.push(VarLeaf {
                        name: field.name.clone(),
                        elem_size: 1,
                        align: AlignClass::A1,
                    });
                }
                TypeKind::Array { elem, len: ArrayLen::Dynamic } => {
                    let footprint = self.measure(*elem)?;
                    let align = footprint
                        .largest_align()
                        .ok_or_else(|| LayoutError::zero_sized("array element", node.span))?;
                    self.var_leaves.push(VarLeaf {
                        name: field.name.clone(),
                        elem_size: footprint.total_bytes(),
                        align,
                    });
                }
                _ => self.walk_type(&mut level, field.ty)?,
            }
        }
        let body = self.finish(level, span)?;
        let zones = body.zones.clone().map(|r| self.pending[r.start as usize..r.end as usize].to_vec());
        Ok(StructTemplate {
            name: name.to_string(),
            slots: self.slots,
            rel: self.rel,
            zones,
            footprint: body.footprint,
            packs: self.packs,
            variants: self.variants,
            var_leaves: self.var_leaves,
            warnings: self.warnings,
        })
    }

    /// Footprint of a dynamic array's element, walked in a throwaway context.
    fn measure(&mut self, elem: TypeId) -> Result<LeafCounts> {
        let span = self.schema.ty(elem).span;
        let mut scratch = LayoutCx::new(&mut *self.engine);
        let mut level = Level::sequential();
        scratch.walk_type(&mut level, elem)?;
        let footprint = scratch.finish(level, span)?.footprint;
        let warnings = std::mem::take(&mut scratch.warnings);
        self.warnings.extend(warnings);
        Ok(footprint)
    }
}
