//! Pair sets that do not depend on particle positions

use std::collections::HashSet;

use anyhow::{Result, anyhow};

use crate::{runtime::ParticleHandle, utils::IndexRange};

use super::{PairOperation, PairSet};

/// All unordered pairs of a particle range
///
/// Every pair is visited regardless of distance, so the potential's cutoff is
/// what limits the interaction.
#[derive(Clone, Copy, Debug)]
pub struct AllPairs {
    range: IndexRange
}

impl AllPairs {
    pub fn new(range: IndexRange) -> Self {
        Self { range }
    }

    /// Number of pairs visited per traversal
    pub fn len(&self) -> usize {
        let n = self.range.len();
        n * n.saturating_sub(1) / 2
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PairSet for AllPairs {
    fn for_each<O: PairOperation + ?Sized>(&self, op: &mut O) -> Result<()> {
        for i in self.range.indices() {
            for j in (i+1)..self.range.end {
                op.visit(ParticleHandle(i), ParticleHandle(j));
            }
        }
        Ok(())
    }
}

/// Explicit (bonded) list of pairs, independent of spatial proximity
#[derive(Clone, Debug, Default)]
pub struct FixedPairList {
    pairs: Vec<(ParticleHandle, ParticleHandle)>,
    /// Normalized pairs (lower handle first) for duplicate detection
    lookup: HashSet<(ParticleHandle, ParticleHandle)>
}

impl FixedPairList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a list from bonds, failing on the first self pair or duplicate
    pub fn from_pairs<I>(pairs: I) -> Result<Self>
    where I: IntoIterator<Item = (ParticleHandle, ParticleHandle)>
    {
        let mut list = Self::new();
        for (i, j) in pairs {
            list.add(i, j)?;
        }
        Ok(list)
    }

    /// Add a bond between two distinct particles
    pub fn add(&mut self, i: ParticleHandle, j: ParticleHandle) -> Result<()> {
        if i == j {
            return Err(anyhow!("Cannot bond particle {} to itself", i.index()));
        }
        let key = if i < j { (i, j) } else { (j, i) };
        if !self.lookup.insert(key) {
            return Err(anyhow!("Pair ({}, {}) is already in the list", i.index(), j.index()));
        }
        self.pairs.push((i, j));
        Ok(())
    }

    pub fn contains(&self, i: ParticleHandle, j: ParticleHandle) -> bool {
        let key = if i < j { (i, j) } else { (j, i) };
        self.lookup.contains(&key)
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl PairSet for FixedPairList {
    fn for_each<O: PairOperation + ?Sized>(&self, op: &mut O) -> Result<()> {
        for (i, j) in &self.pairs {
            op.visit(*i, *j);
        }
        Ok(())
    }
}
