// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! Offset assignment for one variant.
//!
//! Zones are filled 8-byte first. In each zone an arm must place every
//! unplaced field of the zone's class, then tops the zone up with smaller
//! fields chosen by a subset-sum over their sizes. Selected fields are laid
//! out largest class first, which keeps each of them naturally aligned.

use std::cmp::Reverse;

use strata_ast::Span;
use tracing::trace;

use crate::align::AlignClass;
use crate::error::{InternalError, LayoutError, Result};
use crate::variant::{Layout, PendingPack, PendingVariantFieldPacks, VariantLeafMeta};
use crate::walk::{FieldPayload, LayoutCx, QueuedField};

const UNREACHED: u32 = u32::MAX;
const ORIGIN: u32 = u32::MAX - 1;

pub(crate) struct Solved {
    pub packs: PendingVariantFieldPacks,
    /// Zone boundaries actually used.
    pub layout: Layout,
}

pub(crate) fn assign_offsets(
    cx: &mut LayoutCx<'_, '_>,
    target: &Layout,
    metas: &[VariantLeafMeta],
    queue: &mut [QueuedField],
    limit: u64,
    span: Span,
) -> Result<Solved> {
    let mut packs = PendingVariantFieldPacks::default();
    let mut layout = Layout::default();
    let mut zone_start = 0u64;

    for class in AlignClass::DESCENDING {
        if !class.is_aligned(zone_start) {
            return Err(InternalError::MisalignedZone { class, start: zone_start }.into());
        }
        let capacity = target.boundary(class).saturating_sub(zone_start);
        let mut members = Vec::new();
        let size = fill_zone(metas, queue, class, capacity, limit, span, |arm, field, offset| {
            if let FieldPayload::ArrayFieldPack { pack, .. } = &field.payload {
                trace!(arm, pack = pack.0, %class, offset, "array pack placed");
            }
            cx.translate(&field.payload, offset);
            members.extend_from_slice(cx.member_slots(&field.payload));
        })?;
        trace!(%class, size, capacity, "zone filled");

        packs.zones[class.index()] = PendingPack { size, members: cx.push_pending(members) };
        zone_start = zone_start.checked_add(size).ok_or_else(|| LayoutError::overflow(span))?;
        layout.set_boundary(class, zone_start);
    }

    for meta in metas {
        let count = queue[meta.fields.clone()].iter().filter(|f| !f.is_placed()).count();
        if count > 0 {
            return Err(InternalError::UnplacedFields { arm: meta.arm, count }.into());
        }
    }
    Ok(Solved { packs, layout })
}

/// Fill `class`'s zone for every arm in turn, marking each chosen field placed
/// and handing it to `place` with its offset inside the zone. Returns the
/// zone's size. The search replays this on a scratch queue, so both always
/// agree on which fields land where.
pub(crate) fn fill_zone(
    metas: &[VariantLeafMeta],
    queue: &mut [QueuedField],
    class: AlignClass,
    capacity: u64,
    limit: u64,
    span: Span,
    mut place: impl FnMut(usize, &QueuedField, u64),
) -> Result<u64> {
    let mut zone_used = 0u64;
    for meta in metas {
        let fields = &mut queue[meta.fields.clone()];
        let picked = select_fields(meta, fields, class, capacity, limit, span)?;
        let mut offset = 0u64;
        for index in picked {
            let field = &mut fields[index];
            if field.is_placed() {
                return Err(InternalError::FieldPlacedTwice { arm: meta.arm, field: index }.into());
            }
            place(meta.arm, &*field, offset);
            offset = offset.checked_add(field.size).ok_or_else(|| LayoutError::overflow(span))?;
            field.size = 0;
        }
        zone_used = zone_used.max(offset);
    }
    class.round_up(zone_used).ok_or_else(|| LayoutError::overflow(span))
}

/// Indices (into `fields`) an arm places in `class`'s zone, in placement order.
fn select_fields(
    meta: &VariantLeafMeta,
    fields: &[QueuedField],
    class: AlignClass,
    capacity: u64,
    limit: u64,
    span: Span,
) -> Result<Vec<usize>> {
    let mut picked = Vec::new();
    let mut optional = Vec::new();
    for (i, field) in fields.iter().enumerate() {
        if field.is_placed() {
            continue;
        }
        if field.align > class {
            return Err(InternalError::FieldMissedZone { arm: meta.arm, class: field.align }.into());
        }
        if field.align == class {
            picked.push(i);
        } else {
            optional.push(i);
        }
    }
    let sum = |indices: &[usize]| {
        indices
            .iter()
            .try_fold(0u64, |acc, &i| acc.checked_add(fields[i].size))
            .ok_or_else(|| LayoutError::overflow(span))
    };
    let mandatory = sum(picked.as_slice())?;
    let spare = sum(optional.as_slice())?;
    let available = mandatory.checked_add(spare).ok_or_else(|| LayoutError::overflow(span))?;

    // Never less than the mandatory fields, never more than the arm has left.
    let budget = capacity.max(mandatory).min(available);
    let want = budget - mandatory;
    if want == spare {
        picked.extend(optional);
    } else if want > 0 {
        optional.sort_by_key(|&i| (Reverse(fields[i].align), i));
        let sizes: Vec<u64> = optional.iter().map(|&i| fields[i].size).collect();
        let chosen = if want <= limit {
            subset_sum(&sizes, want)?
        } else {
            first_fit(&sizes, want)
        };
        picked.extend(chosen.into_iter().map(|k| optional[k]));
    }

    picked.sort_by_key(|&i| (Reverse(fields[i].align), i));
    Ok(picked)
}

/// Indices of a subset of `sizes` with the largest sum not above `target`.
///
/// `chain[s]` holds the last item used to first reach sum `s`; the item before
/// it reached `s - size` with a strictly smaller index, so walking the chain
/// back from the answer never reuses an item.
pub(crate) fn subset_sum(sizes: &[u64], target: u64) -> Result<Vec<usize>> {
    let cap = target as usize;
    let mut chain = vec![UNREACHED; cap + 1];
    chain[0] = ORIGIN;
    for (i, &size) in sizes.iter().enumerate() {
        let size = size as usize;
        if size == 0 || size > cap {
            continue;
        }
        for sum in (size..=cap).rev() {
            if chain[sum] == UNREACHED && chain[sum - size] != UNREACHED {
                chain[sum] = i as u32;
            }
        }
        if chain[cap] != UNREACHED {
            break;
        }
    }

    let best = (0..=cap).rev().find(|&s| chain[s] != UNREACHED).unwrap_or(0);
    let mut picked = Vec::new();
    let mut sum = best;
    while sum > 0 {
        let item = chain[sum];
        if item == UNREACHED || item == ORIGIN {
            return Err(InternalError::BrokenChain { sum: sum as u64 }.into());
        }
        picked.push(item as usize);
        sum -= sizes[item as usize] as usize;
    }
    picked.reverse();
    Ok(picked)
}

/// Take items in order while they fit. Used when `target` is too large for
/// the chain table.
fn first_fit(sizes: &[u64], target: u64) -> Vec<usize> {
    let mut left = target;
    let mut picked = Vec::new();
    for (i, &size) in sizes.iter().enumerate() {
        if size <= left {
            left -= size;
            picked.push(i);
        }
    }
    picked
}
