// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! Alignment classes and per-class leaf counters.

use std::fmt;

/// Natural alignment of a leaf. Layouts group leaves by class, largest first,
/// so a sub-layout never needs padding between classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AlignClass {
    A1,
    A2,
    A4,
    A8,
}

impl AlignClass {
    /// Largest first. Every per-class loop walks in this order.
    pub const DESCENDING: [AlignClass; 4] =
        [AlignClass::A8, AlignClass::A4, AlignClass::A2, AlignClass::A1];

    pub const fn bytes(self) -> u64 {
        match self {
            AlignClass::A8 => 8,
            AlignClass::A4 => 4,
            AlignClass::A2 => 2,
            AlignClass::A1 => 1,
        }
    }

    /// Position in [`AlignClass::DESCENDING`].
    pub const fn index(self) -> usize {
        match self {
            AlignClass::A8 => 0,
            AlignClass::A4 => 1,
            AlignClass::A2 => 2,
            AlignClass::A1 => 3,
        }
    }

    /// Class of a primitive of `size` bytes: the largest class dividing it.
    pub fn of_size(size: u64) -> AlignClass {
        Self::DESCENDING
            .into_iter()
            .find(|c| size % c.bytes() == 0)
            .unwrap_or(AlignClass::A1)
    }

    pub fn larger(self) -> Option<AlignClass> {
        match self {
            AlignClass::A8 => None,
            AlignClass::A4 => Some(AlignClass::A8),
            AlignClass::A2 => Some(AlignClass::A4),
            AlignClass::A1 => Some(AlignClass::A2),
        }
    }

    /// `None` when the rounded value does not fit in 64 bits.
    pub fn round_up(self, value: u64) -> Option<u64> {
        let mask = self.bytes() - 1;
        value.checked_add(mask).map(|v| v & !mask)
    }

    pub fn round_down(self, value: u64) -> u64 {
        value & !(self.bytes() - 1)
    }

    pub fn is_aligned(self, value: u64) -> bool {
        value % self.bytes() == 0
    }
}

impl fmt::Display for AlignClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-byte", self.bytes())
    }
}

/// How many class-sized units a shape holds at each alignment class.
///
/// A fixed string of 5 bytes is 5 units of [`AlignClass::A1`]; a `u64` is one
/// unit of [`AlignClass::A8`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct LeafCounts {
    counts: [u64; 4],
}

impl LeafCounts {
    pub fn get(&self, class: AlignClass) -> u64 {
        self.counts[class.index()]
    }

    /// Bytes occupied at `class`.
    pub fn bytes(&self, class: AlignClass) -> u64 {
        self.get(class) * class.bytes()
    }

    /// Record `bytes` at `class`; `bytes` must be a multiple of the class size.
    /// Returns the new total, or `None` with the counts untouched when the
    /// total would overflow. Every count goes through here, so the byte sums
    /// below never overflow.
    pub fn add_bytes(&mut self, class: AlignClass, bytes: u64) -> Option<u64> {
        debug_assert!(class.is_aligned(bytes), "{bytes} bytes is not a whole number of {class} units");
        let total = self.total_bytes().checked_add(bytes)?;
        self.counts[class.index()] += bytes / class.bytes();
        Some(total)
    }

    /// Sum of unit counts.
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    pub fn total_bytes(&self) -> u64 {
        AlignClass::DESCENDING.iter().map(|&c| self.bytes(c)).sum()
    }

    /// Bytes at `class` and every larger class.
    pub fn bytes_at_or_above(&self, class: AlignClass) -> u64 {
        AlignClass::DESCENDING
            .iter()
            .take_while(|&&c| c >= class)
            .map(|&c| self.bytes(c))
            .sum()
    }

    /// Start of `class`'s zone when the zones are laid out largest first.
    pub fn zone_start(&self, class: AlignClass) -> u64 {
        AlignClass::DESCENDING
            .iter()
            .take_while(|&&c| c > class)
            .map(|&c| self.bytes(c))
            .sum()
    }

    pub fn largest_align(&self) -> Option<AlignClass> {
        AlignClass::DESCENDING.into_iter().find(|&c| self.get(c) > 0)
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}
