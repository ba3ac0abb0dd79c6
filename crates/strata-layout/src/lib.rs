// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! Fixed layout engine - assigns every primitive field a byte offset.
//!
//! Fields are bucketed into four alignment classes and laid out largest class
//! first, so a struct never needs padding. Fixed variants get one shared
//! storage area for all arms:
//! - the structural walk collects every arm's fields
//! - the search picks zone boundaries each arm can fill exactly
//! - the solver maps each arm's fields onto those zones
//!
//! Nested arrays and variants are placed as atomic packs, one per class.

mod align;
mod bitset;
mod engine;
mod error;
mod options;
mod output;
mod search;
mod solve;
mod variant;
mod walk;

pub use align::{AlignClass, LeafCounts};
pub use engine::{compute_layout, LayoutEngine};
pub use error::{InternalError, LayoutError, LayoutErrorKind, LayoutWarning, Result, WarningKind};
pub use options::LayoutOptions;
pub use output::{ArrayPackInfo, FixedOffset, PackId, StructLayout, VarLeaf, VariantRecord};
pub use variant::Layout;

// ─── Tests ──────────────────────────────────────────────────────────
