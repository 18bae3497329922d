//! Contiguous ranges of particle indices (used to partition work between workers)

use std::ops::Range;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IndexRange {
    pub start: usize,
    pub end: usize
}

impl IndexRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self {
            start, end
        }
    }

    /// Split range into n roughly equal subranges
    ///
    /// Always returns exactly `n` subranges that cover the range without gaps
    /// (trailing subranges may be empty if there are fewer indices than parts).
    pub fn split(&self, n: usize) -> Vec<IndexRange> {
        if n == 0 {
            return vec![];
        }
        let len = self.len();
        let newlen = (len + n - 1)/n;
        (0..n)
            .map(|i| {
                let lo = (self.start + i*newlen).min(self.end);
                let hi = if i + 1 == n { self.end } else { (self.start + (i+1)*newlen).min(self.end) };
                IndexRange::new(lo, hi)
            })
            .collect::<Vec<_>>()
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, index: usize) -> bool {
        index >= self.start && index < self.end
    }

    /// The indices of this range
    pub fn indices(&self) -> Range<usize> {
        self.start..self.end
    }
}
