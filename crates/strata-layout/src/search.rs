// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! Perfect-layout search.
//!
//! For each class from 8 down to 2 the search looks for a zone boundary that
//! every large-enough arm can fill exactly: all of the arm's unplaced fields of
//! that class, plus some subset of its smaller ones. Candidates are tried
//! largest first. Each arm's reachable sums are a bit vector, and arms are
//! AND-ed in as the candidate drops to their size.
//!
//! After each class the zone is filled on a scratch copy of the queue exactly
//! as the solver will fill it, so the next class only counts fields the arm
//! still has. An arm whose earlier picks leave it unable to reach a boundary
//! makes that boundary unavailable instead of turning into silent padding.

use strata_ast::Span;

use crate::align::AlignClass;
use crate::bitset::{reachable_sums, BitVec};
use crate::error::{LayoutError, Result};
use crate::solve;
use crate::variant::{Layout, VariantLeafMeta};
use crate::walk::QueuedField;

#[derive(Debug, Clone, Default)]
pub(crate) struct SearchOutcome {
    pub layout: Layout,
    /// Classes with no zero-waste boundary, and the fallback used for each.
    pub degraded: Vec<(AlignClass, u64)>,
    /// The arms exceeded the search limit; every boundary is a fallback.
    pub skipped: bool,
}

/// `metas` must be sorted by descending `required_space`.
pub(crate) fn find_layout(
    metas: &[VariantLeafMeta],
    queue: &[QueuedField],
    limit: u64,
    span: Span,
) -> Result<SearchOutcome> {
    let mut out = SearchOutcome::default();
    let Some(largest) = metas.first() else {
        return Ok(out);
    };
    let total = largest.required_space;
    out.skipped = total > limit;

    let mut scratch = queue.to_vec();
    // Where the previous zone really ended.
    let mut prev = 0u64;
    for class in [AlignClass::A8, AlignClass::A4, AlignClass::A2] {
        let needed = metas
            .iter()
            .any(|m| m.used_space(class) > 0 && m.required_space > prev);
        let boundary = if needed {
            // Unplaced bytes of the class are whole units, and `prev` is
            // aligned to a larger class.
            let mandatory = metas
                .iter()
                .map(|m| unplaced(&scratch[m.fields.clone()], |align| align >= class))
                .max()
                .unwrap_or(0);
            let min_offset = prev.checked_add(mandatory).ok_or_else(|| LayoutError::overflow(span))?;

            let found = if out.skipped {
                None
            } else {
                search_class(class, metas, &scratch, prev, min_offset)
            };
            match found {
                Some(boundary) if boundary == total => {
                    out.layout.collapse_from(class, boundary);
                    return Ok(out);
                }
                Some(boundary) => boundary,
                None => {
                    if !out.skipped {
                        out.degraded.push((class, min_offset));
                    }
                    min_offset
                }
            }
        } else {
            prev
        };
        out.layout.set_boundary(class, boundary);

        let capacity = boundary.saturating_sub(prev);
        let size = solve::fill_zone(metas, &mut scratch, class, capacity, limit, span, |_, _, _| {})?;
        prev = prev.checked_add(size).ok_or_else(|| LayoutError::overflow(span))?;
    }
    out.layout.align1 = total.max(prev).max(out.layout.align2);
    Ok(out)
}

/// Largest multiple of `class` in `[min_offset, largest arm]` that every arm at
/// least that large can end on exactly, given the zone starts at `prev`.
fn search_class(
    class: AlignClass,
    metas: &[VariantLeafMeta],
    scratch: &[QueuedField],
    prev: u64,
    min_offset: u64,
) -> Option<u64> {
    let step = class.bytes();
    let mut folded = arm_sums(&metas[0], scratch, class);
    let mut next_arm = 1;
    let mut target = class.round_down(metas[0].required_space);

    while target >= min_offset {
        while next_arm < metas.len() && metas[next_arm].required_space >= target {
            folded.and_with(&arm_sums(&metas[next_arm], scratch, class));
            next_arm += 1;
        }
        if folded.get((target - prev) as usize) {
            return Some(target);
        }
        target = target.checked_sub(step)?;
    }
    None
}

/// Sizes an arm can give `class`'s zone: every unplaced field of `class` or
/// larger, plus any subset of the unplaced smaller ones.
fn arm_sums(meta: &VariantLeafMeta, scratch: &[QueuedField], class: AlignClass) -> BitVec {
    let fields = &scratch[meta.fields.clone()];
    let optional = fields
        .iter()
        .filter(|f| !f.is_placed() && f.align < class)
        .map(|f| f.size);
    reachable_sums(unplaced(fields, |align| align >= class), optional, unplaced(fields, |_| true))
}

/// Bytes still to place among `fields` whose class passes `keep`. Bounded by
/// the arm's checked `required_space`.
fn unplaced(fields: &[QueuedField], keep: impl Fn(AlignClass) -> bool) -> u64 {
    fields.iter().filter(|f| !f.is_placed() && keep(f.align)).map(|f| f.size).sum()
}
