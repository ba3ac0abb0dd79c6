// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! Top-level driver and the per-struct layout cache.

use std::collections::HashMap;
use std::rc::Rc;

use strata_ast::{DeclKind, Schema, Span};
use tracing::debug;

use crate::align::{AlignClass, LeafCounts};
use crate::error::{InternalError, LayoutError, LayoutWarning, Result};
use crate::options::LayoutOptions;
use crate::output::{ArrayPackInfo, FixedOffset, StructLayout, VarLeaf, VariantRecord};
use crate::walk::{LayoutCx, SlotMeta};

/// A struct's layout with offsets still relative to its own zones. Built once
/// per struct and spliced wherever the struct is referenced.
#[derive(Debug)]
pub(crate) struct StructTemplate {
    pub name: String,
    pub slots: Vec<SlotMeta>,
    pub rel: Vec<u64>,
    /// Slots in each class zone, largest class first.
    pub zones: [Vec<u32>; 4],
    pub footprint: LeafCounts,
    pub packs: Vec<ArrayPackInfo>,
    pub variants: Vec<VariantRecord>,
    pub var_leaves: Vec<VarLeaf>,
    pub warnings: Vec<LayoutWarning>,
}

/// Computes struct layouts for one schema, caching every struct it visits.
pub struct LayoutEngine<'s> {
    schema: &'s Schema,
    options: LayoutOptions,
    templates: HashMap<String, Rc<StructTemplate>>,
    /// Structs currently being walked, for recursion detection.
    building: Vec<String>,
}

impl<'s> LayoutEngine<'s> {
    pub fn new(schema: &'s Schema) -> Self {
        Self::with_options(schema, LayoutOptions::default())
    }

    pub fn with_options(schema: &'s Schema, options: LayoutOptions) -> Self {
        LayoutEngine {
            schema,
            options,
            templates: HashMap::new(),
            building: Vec::new(),
        }
    }

    pub fn schema(&self) -> &'s Schema {
        self.schema
    }

    pub fn options(&self) -> &LayoutOptions {
        &self.options
    }

    /// Number of structs laid out so far.
    pub fn cached(&self) -> usize {
        self.templates.len()
    }

    /// Lay out `root` and resolve every offset to an absolute position.
    pub fn compute(&mut self, root: &str) -> Result<StructLayout> {
        let span = self.schema.decl(root).map_or(Span::DUMMY, |d| d.span);
        let template = self.template(root, span)?;
        finalize(&template, span)
    }

    pub(crate) fn template(&mut self, name: &str, span: Span) -> Result<Rc<StructTemplate>> {
        if let Some(template) = self.templates.get(name) {
            return Ok(Rc::clone(template));
        }
        let schema = self.schema;
        let decl = schema.decl(name).ok_or_else(|| LayoutError::unknown_type(name, span))?;
        let DeclKind::Struct(def) = &decl.kind else {
            return Err(LayoutError::not_a_struct(name, decl.kind_name(), span));
        };
        if self.building.iter().any(|n| n == name) {
            return Err(LayoutError::recursive(name, span));
        }

        self.building.push(name.to_string());
        let built = LayoutCx::new(self).build_template(name, def, decl.span);
        self.building.pop();
        let template = Rc::new(built?);

        debug!(
            name,
            fields = template.slots.len(),
            size = template.footprint.total_bytes(),
            "struct laid out"
        );
        self.templates.insert(name.to_string(), Rc::clone(&template));
        Ok(template)
    }
}

/// Lay out the struct `root` of `schema`.
pub fn compute_layout(schema: &Schema, root: &str, options: LayoutOptions) -> Result<StructLayout> {
    LayoutEngine::with_options(schema, options).compute(root)
}

/// Zone-relative offsets → absolute offsets, each slot written exactly once.
fn finalize(template: &StructTemplate, span: Span) -> Result<StructLayout> {
    let mut fixed_offsets = vec![FixedOffset::EMPTY; template.slots.len()];
    for class in AlignClass::DESCENDING {
        let start = template.footprint.zone_start(class);
        for &slot in &template.zones[class.index()] {
            let entry = &mut fixed_offsets[slot as usize];
            if !entry.is_empty() {
                return Err(InternalError::SlotWrittenTwice { slot }.into());
            }
            let meta = template.slots[slot as usize];
            *entry = FixedOffset {
                offset: start + template.rel[slot as usize],
                map_idx: slot as u16,
                align: meta.align,
                pack: meta.pack,
            };
        }
    }
    if let Some(slot) = fixed_offsets.iter().position(FixedOffset::is_empty) {
        return Err(InternalError::SlotNeverWritten { slot: slot as u32 }.into());
    }

    let fixed_size = template.footprint.total_bytes();
    let var_start = template
        .var_leaves
        .iter()
        .map(|leaf| leaf.align)
        .max()
        .map(|align| align.round_up(fixed_size).ok_or_else(|| LayoutError::overflow(span)))
        .transpose()?;

    Ok(StructLayout {
        name: template.name.clone(),
        fixed_offsets,
        array_packs: template.packs.clone(),
        variants: template.variants.clone(),
        var_leaves: template.var_leaves.clone(),
        zones: template.footprint,
        fixed_size,
        var_start,
        warnings: template.warnings.clone(),
    })
}
