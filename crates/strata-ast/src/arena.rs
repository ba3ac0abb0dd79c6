// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Append-only typed arena.
//!
//! Nodes are addressed by [`Idx`], never by reference, so the backing storage is
//! free to grow while indices handed out earlier stay valid.

use std::fmt;
use std::marker::PhantomData;
use std::ops;

/// Index of a `T` inside an [`Arena<T>`].
pub struct Idx<T> {
    raw: u32,
    _ty: PhantomData<fn() -> T>,
}

impl<T> Idx<T> {
    pub fn from_raw(raw: u32) -> Self {
        Idx { raw, _ty: PhantomData }
    }

    pub fn into_raw(self) -> u32 {
        self.raw
    }
}

// Manual impls: derives would put bounds on `T`.
impl<T> Clone for Idx<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Idx<T> {}

impl<T> PartialEq for Idx<T> {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl<T> Eq for Idx<T> {}

impl<T> std::hash::Hash for Idx<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl<T> fmt::Debug for Idx<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = std::any::type_name::<T>();
        let short = name.rsplit("::").next().unwrap_or(name);
        write!(f, "Idx::<{}>({})", short, self.raw)
    }
}

/// Bump-only storage. There is no way to free a single element.
#[derive(Clone)]
pub struct Arena<T> {
    items: Vec<T>,
}

impl<T> Arena<T> {
    pub const fn new() -> Self {
        Arena { items: Vec::new() }
    }

    pub fn alloc(&mut self, value: T) -> Idx<T> {
        let raw = u32::try_from(self.items.len()).expect("arena exceeded u32::MAX entries");
        self.items.push(value);
        Idx::from_raw(raw)
    }

    /// Index the next `alloc` will return.
    pub fn next_idx(&self) -> Idx<T> {
        Idx::from_raw(self.items.len() as u32)
    }

    pub fn get(&self, idx: Idx<T>) -> Option<&T> {
        self.items.get(idx.raw as usize)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Idx<T>, &T)> + '_ {
        self.items
            .iter()
            .enumerate()
            .map(|(i, v)| (Idx::from_raw(i as u32), v))
    }
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Arena::new()
    }
}

impl<T: fmt::Debug> fmt::Debug for Arena<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arena").field("len", &self.items.len()).finish()
    }
}

impl<T> ops::Index<Idx<T>> for Arena<T> {
    type Output = T;
    fn index(&self, idx: Idx<T>) -> &T {
        &self.items[idx.raw as usize]
    }
}
