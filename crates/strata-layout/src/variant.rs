// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! Fixed variants: collect every arm's fields, search for a shared layout,
//! then assign offsets arm by arm.
//!
//! The shared storage is split into four zones, 8-byte first. A field may sit
//! in its own class's zone or any larger one; a `u32` can share the 8-byte zone
//! with another arm's `u64`. The [`Layout`] records where each zone ends.

use std::ops::Range;

use strata_ast::{Span, TypeId};
use tracing::{debug, warn};

use crate::align::{AlignClass, LeafCounts};
use crate::error::{LayoutError, LayoutErrorKind, LayoutWarning, Result, WarningKind};
use crate::output::VariantRecord;
use crate::search;
use crate::solve;
use crate::walk::{LayoutCx, Level, QueuedField};

/// Cumulative zone boundaries of a variant's shared storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Layout {
    pub align8: u64,
    pub align4: u64,
    pub align2: u64,
    pub align1: u64,
}

impl Layout {
    /// End of `class`'s zone.
    pub fn boundary(&self, class: AlignClass) -> u64 {
        match class {
            AlignClass::A8 => self.align8,
            AlignClass::A4 => self.align4,
            AlignClass::A2 => self.align2,
            AlignClass::A1 => self.align1,
        }
    }

    pub(crate) fn set_boundary(&mut self, class: AlignClass, value: u64) {
        match class {
            AlignClass::A8 => self.align8 = value,
            AlignClass::A4 => self.align4 = value,
            AlignClass::A2 => self.align2 = value,
            AlignClass::A1 => self.align1 = value,
        }
    }

    /// Set `class` and every smaller class to `value`.
    pub(crate) fn collapse_from(&mut self, class: AlignClass, value: u64) {
        for c in AlignClass::DESCENDING.into_iter().filter(|&c| c <= class) {
            self.set_boundary(c, value);
        }
    }

    /// Start of `class`'s zone.
    pub fn zone_start(&self, class: AlignClass) -> u64 {
        class.larger().map_or(0, |l| self.boundary(l))
    }

    /// Size of `class`'s zone.
    pub fn space(&self, class: AlignClass) -> u64 {
        self.boundary(class) - self.zone_start(class)
    }

    pub fn total(&self) -> u64 {
        self.align1
    }
}

/// One arm's requirements.
#[derive(Debug, Clone)]
pub(crate) struct VariantLeafMeta {
    pub arm: usize,
    /// Bytes per class of the arm's own fields.
    pub used: LeafCounts,
    pub required_space: u64,
    /// The arm's fields in the shared queue.
    pub fields: Range<usize>,
}

impl VariantLeafMeta {
    fn summarize(arm: usize, queue: &[QueuedField], fields: Range<usize>, span: Span) -> Result<Self> {
        let mut used = LeafCounts::default();
        let mut required_space = 0;
        for field in &queue[fields.clone()] {
            required_space = used
                .add_bytes(field.align, field.size)
                .ok_or_else(|| LayoutError::overflow(span))?;
        }
        Ok(VariantLeafMeta { arm, used, required_space, fields })
    }

    pub fn used_space(&self, class: AlignClass) -> u64 {
        self.used.bytes(class)
    }
}

/// One zone of a resolved variant, ready to be placed by the enclosing level.
#[derive(Debug, Clone, Default)]
pub(crate) struct PendingPack {
    pub size: u64,
    pub members: Range<u32>,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct PendingVariantFieldPacks {
    pub zones: [PendingPack; 4],
}

/// Resolve one fixed variant whose tag already sits in slot `tag`.
pub(crate) fn lay_out_variant(
    cx: &mut LayoutCx<'_, '_>,
    arms: &[TypeId],
    tag: u32,
    span: Span,
) -> Result<PendingVariantFieldPacks> {
    let mut queue: Vec<QueuedField> = Vec::new();
    let mut metas = Vec::with_capacity(arms.len());
    for (arm, &ty) in arms.iter().enumerate() {
        let mut level = Level::arm();
        cx.walk_type(&mut level, ty)?;
        let start = queue.len();
        queue.extend(level.into_queue());
        metas.push(VariantLeafMeta::summarize(arm, &queue, start..queue.len(), span)?);
    }
    metas.sort_by(|a, b| b.required_space.cmp(&a.required_space).then(a.arm.cmp(&b.arm)));

    let required = metas.first().map_or(0, |m| m.required_space);
    let options = cx.engine.options().clone();
    let outcome = search::find_layout(&metas, &queue, options.max_search_bytes, span)?;
    debug!(arms = arms.len(), required, target = ?outcome.layout, "variant search finished");

    let mut warnings = Vec::new();
    if outcome.skipped {
        let kind = WarningKind::SearchSkipped { required, limit: options.max_search_bytes };
        warnings.push(LayoutWarning { kind, span });
    }
    for &(class, boundary) in &outcome.degraded {
        let kind = WarningKind::NoPerfectBoundary { class, boundary };
        warnings.push(LayoutWarning { kind, span });
    }

    let solved = solve::assign_offsets(cx, &outcome.layout, &metas, &mut queue, options.max_search_bytes, span)?;
    if solved.layout.total() > required {
        let kind = WarningKind::Padded { wasted: solved.layout.total() - required };
        warnings.push(LayoutWarning { kind, span });
    }
    debug!(layout = ?solved.layout, "variant offsets assigned");

    for warning in &warnings {
        warn!(start = span.start, end = span.end, "{}", warning);
    }
    if options.require_perfect {
        if let Some(first) = warnings.first() {
            let kind = LayoutErrorKind::ImperfectLayout { reason: first.kind.clone() };
            return Err(LayoutError::new(kind, span));
        }
    }

    cx.variants.push(VariantRecord {
        tag,
        arms: arms.len(),
        target: outcome.layout,
        layout: solved.layout,
        required,
        perfect: warnings.is_empty(),
        span,
    });
    cx.warnings.extend(warnings);
    Ok(solved.packs)
}
