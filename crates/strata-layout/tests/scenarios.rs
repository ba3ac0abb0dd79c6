// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! End-to-end layout tests over schemas built with `SchemaBuilder`.
//! Slot numbers follow walk order: depth first, tags before their arms.

use strata_ast::{Primitive, SchemaBuilder};
use strata_layout::{
    compute_layout, AlignClass, Layout, LayoutEngine, LayoutErrorKind, LayoutOptions, PackId,
    StructLayout, WarningKind,
};

fn layout(b: SchemaBuilder, root: &str) -> StructLayout {
    let schema = b.build();
    compute_layout(&schema, root, LayoutOptions::default()).unwrap()
}

fn offsets(layout: &StructLayout) -> Vec<u64> {
    layout.fixed_offsets.iter().map(|f| f.offset).collect()
}

/// Every slot written once, with its own id, at a naturally aligned offset
/// inside the fixed part.
fn assert_covered(layout: &StructLayout) {
    for (slot, f) in layout.fixed_offsets.iter().enumerate() {
        assert!(!f.is_empty(), "slot {} never written", slot);
        assert_eq!(f.map_idx as usize, slot);
        assert!(f.align.is_aligned(f.offset), "slot {} misaligned at {}", slot, f.offset);
        assert!(f.offset < layout.fixed_size);
    }
}

/// The `(slot, size)` fields of one arm, sorted by offset, sit back to back
/// starting at `start`.
fn assert_packed(layout: &StructLayout, fields: &[(usize, u64)], start: u64) {
    let mut placed: Vec<(u64, u64)> = fields
        .iter()
        .map(|&(slot, size)| (layout.fixed_offsets[slot].offset, size))
        .collect();
    placed.sort();
    let mut next = start;
    for (offset, size) in placed {
        assert_eq!(offset, next, "gap or overlap in {:?}", fields);
        next = offset + size;
    }
}

// ─── Scenarios ──────────────────────────────────────────────────────

#[test]
fn u64_arm_shares_storage_with_two_u32() {
    let mut b = SchemaBuilder::new();
    let wide = b.prim(Primitive::U64);
    let lo = b.prim(Primitive::U32);
    let hi = b.prim(Primitive::U32);
    let pair = b.record(vec![("lo", lo), ("hi", hi)]);
    let v = b.variant(vec![wide, pair]);
    b.struct_decl("Value", vec![("v", v)]);
    let l = layout(b, "Value");

    assert_covered(&l);
    // tag, wide, lo, hi
    assert_eq!(offsets(&l), [8, 0, 0, 4]);
    assert_eq!(l.fixed_size, 9);

    let record = &l.variants[0];
    assert_eq!(record.layout, Layout { align8: 8, align4: 8, align2: 8, align1: 8 });
    assert_eq!(record.required, 8);
    assert!(record.perfect);
    assert!(l.is_perfect());
    assert_packed(&l, &[(2, 4), (3, 4)], 0);
}

#[test]
fn trailing_byte_gets_its_own_zone() {
    let mut b = SchemaBuilder::new();
    let a = b.prim(Primitive::I64);
    let x = b.prim(Primitive::I64);
    let flag = b.prim(Primitive::Bool);
    let tagged = b.record(vec![("x", x), ("flag", flag)]);
    let v = b.variant(vec![a, tagged]);
    b.struct_decl("Either", vec![("v", v)]);
    let l = layout(b, "Either");

    assert_covered(&l);
    let record = &l.variants[0];
    assert_eq!(record.layout, Layout { align8: 8, align4: 8, align2: 8, align1: 9 });
    assert!(record.perfect);

    // Both 8-byte fields at the start of the shared storage.
    assert_eq!(l.fixed_offsets[1].offset, 0);
    assert_eq!(l.fixed_offsets[2].offset, 0);
    // The byte zone holds the tag, then the variant's one-byte zone.
    assert_eq!(l.fixed_offsets[0].offset, 8);
    assert_eq!(l.fixed_offsets[3].offset, 9);
    assert_eq!(l.fixed_size, 10);
}

#[test]
fn struct_array_placed_as_class_packs() {
    let mut b = SchemaBuilder::new();
    let a = b.prim(Primitive::U32);
    let c = b.prim(Primitive::U16);
    b.struct_decl("Elem", vec![("a", a), ("c", c)]);
    let elem = b.named("Elem");
    let arr = b.array(elem, 10);
    b.struct_decl("Table", vec![("rows", arr)]);
    let l = layout(b, "Table");

    assert_covered(&l);
    assert_eq!(l.fixed_size, 60);
    assert_eq!(l.array_packs.len(), 2);

    let four = l.pack(PackId(0));
    assert_eq!((four.size, four.elem_size, four.len, four.align), (40, 4, 10, AlignClass::A4));
    let two = l.pack(PackId(1));
    assert_eq!((two.size, two.elem_size, two.len, two.align), (20, 2, 10, AlignClass::A2));
    assert_eq!(four.size + two.size, 10 * 6);

    assert_eq!(offsets(&l), [0, 40]);
    assert_eq!(l.element_offset(0, &[3]), Some(12));
    assert_eq!(l.element_offset(1, &[3]), Some(46));
    assert_eq!(l.element_offset(1, &[10]), None);
    assert_eq!(l.element_offset(1, &[]), None);
}

fn three_arm_schema() -> SchemaBuilder {
    let mut b = SchemaBuilder::new();
    let n = b.prim(Primitive::U32);
    let b1 = b.prim(Primitive::U8);
    let b2 = b.prim(Primitive::U8);
    let b3 = b.prim(Primitive::U8);
    let counted = b.record(vec![("n", n), ("a", b1), ("b", b2), ("c", b3)]);
    let s1 = b.fixed_string(3);
    let s2 = b.fixed_string(3);
    let codes = b.record(vec![("from", s1), ("to", s2)]);
    let id = b.prim(Primitive::U32);
    let v = b.variant(vec![counted, codes, id]);
    b.struct_decl("Message", vec![("body", v)]);
    b
}

#[test]
fn no_perfect_boundary_degrades_gracefully() {
    let l = layout(three_arm_schema(), "Message");
    assert_covered(&l);

    assert_eq!(
        l.warnings.iter().map(|w| w.kind.clone()).collect::<Vec<_>>(),
        [WarningKind::NoPerfectBoundary { class: AlignClass::A4, boundary: 4 }]
    );
    let record = &l.variants[0];
    assert!(!record.perfect);
    assert_eq!(record.target.align4, 4);
    assert_eq!(record.layout, Layout { align8: 0, align4: 4, align2: 4, align1: 7 });

    // Cumulative space holds every arm's mandatory bytes.
    let arm_bytes: [LeafTotals; 3] = [[0, 4, 0, 3], [0, 0, 0, 6], [0, 4, 0, 0]];
    for bytes in arm_bytes {
        for class in AlignClass::DESCENDING {
            let mandatory: u64 = bytes[..=class.index()].iter().sum();
            assert!(record.layout.boundary(class) >= mandatory);
        }
    }

    // slots: tag, n, a, b, c, from, to, id
    assert_packed(&l, &[(1, 4)], 0);
    assert_packed(&l, &[(2, 1), (3, 1), (4, 1)], 5);
    assert_eq!(l.fixed_offsets[5].offset, 0);
    assert_eq!(l.fixed_offsets[6].offset, 5);
    assert_eq!(l.fixed_offsets[7].offset, 0);
    assert_eq!(l.fixed_offsets[0].offset, 4);
}

type LeafTotals = [u64; 4];

#[test]
fn strict_mode_rejects_degraded_layout() {
    let schema = three_arm_schema().build();
    let err = compute_layout(&schema, "Message", LayoutOptions::strict()).unwrap_err();
    assert_eq!(
        err.kind,
        LayoutErrorKind::ImperfectLayout {
            reason: WarningKind::NoPerfectBoundary { class: AlignClass::A4, boundary: 4 },
        }
    );
    assert_eq!(
        err.to_string(),
        "variant layout is not zero-waste (no zero-waste 4-byte boundary; fell back to offset 4)"
    );
}

#[test]
fn boundary_unreachable_after_earlier_zone_is_reported() {
    // Per class, the text arm could end on 8 and then on 12. Once the 8-byte
    // zone holds `s7` and `b`, the leftover {2, 5} cannot fill four bytes.
    let mut b = SchemaBuilder::new();
    let s7 = b.fixed_string(7);
    let h = b.prim(Primitive::U16);
    let s5 = b.fixed_string(5);
    let c1 = b.prim(Primitive::U8);
    let text = b.record(vec![("s7", s7), ("h", h), ("s5", s5), ("b", c1)]);
    let w = b.prim(Primitive::U32);
    let q = b.prim(Primitive::U64);
    let c2 = b.prim(Primitive::U8);
    let nums = b.record(vec![("w", w), ("q", q), ("c", c2)]);
    let v = b.variant(vec![text, nums]);
    b.struct_decl("Mixed", vec![("v", v)]);
    let l = layout(b, "Mixed");

    assert_covered(&l);
    assert_eq!(
        l.warnings.iter().map(|w| w.kind.clone()).collect::<Vec<_>>(),
        [
            WarningKind::NoPerfectBoundary { class: AlignClass::A4, boundary: 12 },
            WarningKind::Padded { wasted: 2 },
        ]
    );
    let record = &l.variants[0];
    assert_eq!(record.target, Layout { align8: 8, align4: 12, align2: 12, align1: 15 });
    assert_eq!(record.layout, Layout { align8: 8, align4: 12, align2: 12, align1: 17 });

    // slots: tag, s7, h, s5, b, w, q, c
    assert_packed(&l, &[(1, 7), (4, 1), (2, 2)], 0);
    assert_packed(&l, &[(6, 8), (5, 4)], 0);
    assert_eq!(l.fixed_offsets[0].offset, 12);
    assert_eq!(l.fixed_offsets[3].offset, 13);
    assert_eq!(l.fixed_offsets[7].offset, 13);
    assert_eq!(l.fixed_size, 18);
}

#[test]
fn variant_inside_array_element() {
    let mut b = SchemaBuilder::new();
    let word = b.prim(Primitive::U32);
    let h1 = b.prim(Primitive::U16);
    let h2 = b.prim(Primitive::U16);
    let halves = b.record(vec![("h1", h1), ("h2", h2)]);
    let v = b.variant(vec![word, halves]);
    let arr = b.array(v, 3);
    b.struct_decl("Regs", vec![("regs", arr)]);
    let l = layout(b, "Regs");

    assert_covered(&l);
    // tag, word, h1, h2
    assert_eq!(offsets(&l), [12, 0, 0, 2]);
    assert_eq!(l.fixed_size, 15);
    assert_eq!(l.variants[0].layout, Layout { align8: 0, align4: 4, align2: 4, align1: 4 });

    for i in 0..3 {
        assert_eq!(l.element_offset(1, &[i]), Some(4 * i));
        assert_eq!(l.element_offset(3, &[i]), Some(4 * i + 2));
        assert_eq!(l.element_offset(0, &[i]), Some(12 + i));
    }
}

// ─── Properties ─────────────────────────────────────────────────────

#[test]
fn layout_is_idempotent() {
    let schema = three_arm_schema().build();
    let first = compute_layout(&schema, "Message", LayoutOptions::default()).unwrap();
    let second = compute_layout(&schema, "Message", LayoutOptions::default()).unwrap();
    assert_eq!(first, second);

    let mut engine = LayoutEngine::new(&schema);
    let cached_a = engine.compute("Message").unwrap();
    let cached_b = engine.compute("Message").unwrap();
    assert_eq!(cached_a, cached_b);
    assert_eq!(cached_a, first);
    assert_eq!(engine.cached(), 1);
}

#[test]
fn small_arm_borrows_larger_zone() {
    let mut b = SchemaBuilder::new();
    let small = b.prim(Primitive::U8);
    let wide = b.prim(Primitive::U64);
    let narrow = b.prim(Primitive::U32);
    let inner = b.variant(vec![wide, narrow]);
    let v = b.variant(vec![small, inner]);
    b.struct_decl("Nested", vec![("v", v)]);
    let l = layout(b, "Nested");

    assert_covered(&l);
    // outer tag, small, inner tag, wide, narrow
    assert_eq!(offsets(&l), [8, 0, 9, 0, 0]);
    assert_eq!(l.fixed_size, 10);
    assert_eq!(l.variants.len(), 2);
    assert_eq!(l.variants[0].tag, 2);
    assert_eq!(l.variants[1].tag, 0);
    assert_eq!(l.variants[1].layout, Layout { align8: 8, align4: 8, align2: 8, align1: 9 });
    assert!(l.is_perfect());
}

#[test]
fn wide_variant_gets_two_byte_tag() {
    let mut b = SchemaBuilder::new();
    let arms: Vec<_> = (0..256).map(|_| b.prim(Primitive::U8)).collect();
    let v = b.variant(arms);
    b.struct_decl("Opcode", vec![("op", v)]);
    let l = layout(b, "Opcode");

    assert_covered(&l);
    assert_eq!(l.fixed_offsets[0].align, AlignClass::A2);
    assert_eq!(l.fixed_offsets[0].offset, 0);
    assert!(l.fixed_offsets[1..].iter().all(|f| f.offset == 2));
    assert_eq!(l.fixed_size, 3);
}

#[test]
fn search_limit_skips_search() {
    let mut b = SchemaBuilder::new();
    let wide = b.prim(Primitive::U64);
    let lo = b.prim(Primitive::U32);
    let hi = b.prim(Primitive::U32);
    let pair = b.record(vec![("lo", lo), ("hi", hi)]);
    let v = b.variant(vec![wide, pair]);
    b.struct_decl("Value", vec![("v", v)]);
    let schema = b.build();

    let options = LayoutOptions::default().with_max_search_bytes(4);
    let l = compute_layout(&schema, "Value", options).unwrap();
    assert_covered(&l);
    assert_eq!(l.warnings.len(), 1);
    assert_eq!(l.warnings[0].kind, WarningKind::SearchSkipped { required: 8, limit: 4 });
    // The fallback is still tight for this shape.
    assert_eq!(l.variants[0].layout.total(), 8);
    assert_packed(&l, &[(2, 4), (3, 4)], 0);
}

#[test]
fn fields_sorted_by_offset() {
    let mut b = SchemaBuilder::new();
    let a = b.prim(Primitive::U8);
    let c = b.prim(Primitive::F64);
    let d = b.prim(Primitive::I16);
    b.struct_decl("Row", vec![("a", a), ("c", c), ("d", d)]);
    let l = layout(b, "Row");
    assert_eq!(l.fields_sorted(), [1, 2, 0]);
}

#[test]
fn nested_arrays_chain_packs() {
    let mut b = SchemaBuilder::new();
    let cell = b.prim(Primitive::U16);
    let row = b.array(cell, 4);
    let grid = b.array(row, 3);
    b.struct_decl("Grid", vec![("cells", grid)]);
    let l = layout(b, "Grid");

    assert_eq!(l.fixed_size, 24);
    assert_eq!(l.pack_chain(0), [PackId(1), PackId(0)]);
    assert_eq!(l.element_offset(0, &[2, 1]), Some(2 * 8 + 2));
    assert_eq!(l.element_offset(0, &[0, 4]), None);
}

#[test]
fn array_pack_inside_variant_arm() {
    let mut b = SchemaBuilder::new();
    let half = b.prim(Primitive::U16);
    let halves = b.array(half, 2);
    let word = b.prim(Primitive::U32);
    let v = b.variant(vec![halves, word]);
    b.struct_decl("Reg", vec![("r", v)]);
    let l = layout(b, "Reg");

    assert_covered(&l);
    assert!(l.is_perfect());
    // tag, half (element slot), word
    assert_eq!(offsets(&l), [4, 0, 0]);
    assert_eq!(l.variants[0].layout, Layout { align8: 0, align4: 4, align2: 4, align1: 4 });
    assert_eq!(l.pack_chain(1), [PackId(0)]);
    assert_eq!(l.element_offset(1, &[1]), Some(2));
    assert_eq!(l.fixed_size, 5);
}

// ─── Variable-length tails and errors ───────────────────────────────

#[test]
fn var_region_starts_after_padding() {
    let mut b = SchemaBuilder::new();
    let len = b.prim(Primitive::U16);
    let x = b.prim(Primitive::F64);
    let y = b.prim(Primitive::F64);
    let point = b.record(vec![("x", x), ("y", y)]);
    let points = b.dyn_array(point);
    let label = b.string();
    b.struct_decl("Path", vec![("len", len), ("points", points), ("label", label)]);
    let l = layout(b, "Path");

    assert_eq!(l.fixed_size, 2);
    assert_eq!(l.var_leaves[0].elem_size, 16);
    assert_eq!(l.var_leaves[0].align, AlignClass::A8);
    assert_eq!(l.var_leaves[1].name, "label");
    assert_eq!(l.var_start, Some(8));
}

#[test]
fn string_element_in_dynamic_array_rejected() {
    let mut b = SchemaBuilder::new();
    let s = b.string();
    let names = b.dyn_array(s);
    b.struct_decl("Names", vec![("names", names)]);
    let schema = b.build();
    let err = compute_layout(&schema, "Names", LayoutOptions::default()).unwrap_err();
    assert_eq!(err.kind, LayoutErrorKind::VariableString);
}

#[test]
fn nested_dynamic_array_rejected() {
    let mut b = SchemaBuilder::new();
    let e = b.prim(Primitive::U8);
    let inner = b.dyn_array(e);
    let outer = b.array(inner, 2);
    b.struct_decl("Bad", vec![("rows", outer)]);
    let schema = b.build();
    let err = compute_layout(&schema, "Bad", LayoutOptions::default()).unwrap_err();
    assert_eq!(err.kind, LayoutErrorKind::DynamicArray);
}

#[test]
fn recursion_through_variant_rejected() {
    let mut b = SchemaBuilder::new();
    let leaf = b.prim(Primitive::U32);
    let me = b.named("Expr");
    let v = b.variant(vec![leaf, me]);
    b.struct_decl("Expr", vec![("node", v)]);
    let schema = b.build();
    let err = compute_layout(&schema, "Expr", LayoutOptions::default()).unwrap_err();
    assert_eq!(err.kind, LayoutErrorKind::RecursiveType { name: "Expr".to_string() });
}

#[test]
fn failed_struct_not_cached() {
    let mut b = SchemaBuilder::new();
    let missing = b.named("Ghost");
    b.struct_decl("Haunted", vec![("g", missing)]);
    let schema = b.build();
    let mut engine = LayoutEngine::new(&schema);
    assert!(engine.compute("Haunted").is_err());
    assert_eq!(engine.cached(), 0);
}
