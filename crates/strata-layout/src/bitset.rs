// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! Fixed-length bit vector used for subset-sum reachability.

const WORD: usize = u64::BITS as usize;

/// `len` bits. Bit `i` set means "sum `i` is reachable".
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct BitVec {
    words: Vec<u64>,
    len: usize,
}

impl BitVec {
    /// `len` bits, every one equal to `value`.
    pub fn repeat(len: usize, value: bool) -> Self {
        let fill = if value { u64::MAX } else { 0 };
        let mut bits = BitVec { words: vec![fill; len.div_ceil(WORD)], len };
        bits.clear_tail();
        bits
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn get(&self, idx: usize) -> bool {
        idx < self.len() && self.words[idx / WORD] & (1 << (idx % WORD)) != 0
    }

    /// Out-of-range indices are ignored.
    pub fn set(&mut self, idx: usize, value: bool) {
        if idx >= self.len() {
            return;
        }
        let mask = 1 << (idx % WORD);
        if value {
            self.words[idx / WORD] |= mask;
        } else {
            self.words[idx / WORD] &= !mask;
        }
    }

    /// `self |= self << shift`, dropping bits past `len`. One step of the
    /// subset-sum DP for an item of size `shift`.
    pub fn or_shifted(&mut self, shift: usize) {
        if shift == 0 || shift >= self.len {
            return;
        }
        let word_shift = shift / WORD;
        let bit_shift = shift % WORD;
        // High to low so every source word is read before it is overwritten.
        for i in (word_shift..self.words.len()).rev() {
            let src = i - word_shift;
            let mut carried = self.words[src] << bit_shift;
            if bit_shift != 0 && src > 0 {
                carried |= self.words[src - 1] >> (WORD - bit_shift);
            }
            self.words[i] |= carried;
        }
        self.clear_tail();
    }

    /// A copy with every bit moved up by `shift`.
    pub fn shifted(&self, shift: usize) -> BitVec {
        let mut out = BitVec::repeat(self.len(), false);
        let word_shift = shift / WORD;
        let bit_shift = shift % WORD;
        for i in word_shift..out.words.len() {
            let src = i - word_shift;
            let mut w = self.words[src] << bit_shift;
            if bit_shift != 0 && src > 0 {
                w |= self.words[src - 1] >> (WORD - bit_shift);
            }
            out.words[i] = w;
        }
        out.clear_tail();
        out
    }

    /// `self &= other`. Bits beyond `other`'s length are cleared.
    pub fn and_with(&mut self, other: &BitVec) {
        for (i, w) in self.words.iter_mut().enumerate() {
            *w &= other.words.get(i).copied().unwrap_or(0);
        }
        let end = self.len().min(other.words.len() * WORD);
        for idx in other.len()..end {
            self.set(idx, false);
        }
    }

    fn clear_tail(&mut self) {
        let rem = self.len % WORD;
        if rem != 0 {
            if let Some(last) = self.words.last_mut() {
                *last &= (1 << rem) - 1;
            }
        }
    }
}

/// Subset sums of `sizes` up to `limit`, each shifted up by `base`.
pub(crate) fn reachable_sums(base: u64, sizes: impl IntoIterator<Item = u64>, limit: u64) -> BitVec {
    let len = limit as usize + 1;
    let mut sums = BitVec::repeat(len, false);
    sums.set(0, true);
    for size in sizes {
        sums.or_shifted(size as usize);
    }
    if base == 0 {
        sums
    } else {
        sums.shifted(base as usize)
    }
}
