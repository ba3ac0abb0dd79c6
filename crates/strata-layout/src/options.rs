// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! Layout engine configuration.

/// Knobs for [`crate::LayoutEngine`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutOptions {
    /// Turn degraded-layout warnings into errors.
    pub require_perfect: bool,
    /// Largest arm (in bytes) the subset-sum searches run on. Bigger arms get
    /// the minimal safe boundaries without searching.
    pub max_search_bytes: u64,
}

impl LayoutOptions {
    pub const DEFAULT_MAX_SEARCH_BYTES: u64 = 1 << 22;

    pub fn strict() -> Self {
        Self { require_perfect: true, ..Self::default() }
    }

    pub fn with_max_search_bytes(mut self, limit: u64) -> Self {
        self.max_search_bytes = limit;
        self
    }
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            require_perfect: false,
            max_search_bytes: Self::DEFAULT_MAX_SEARCH_BYTES,
        }
    }
}
