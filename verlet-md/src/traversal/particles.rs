//! Particle sets

use crate::{runtime::{ParticleHandle, ParticleStore}, utils::IndexRange};

use super::{ParticleOperation, ParticleSet};

/// All particles of a store
#[derive(Clone, Copy, Debug)]
pub struct AllParticles {
    count: usize
}

impl AllParticles {
    pub fn new(store: &ParticleStore) -> Self {
        Self { count: store.get_particle_count() }
    }
}

impl ParticleSet for AllParticles {
    fn for_each<O: ParticleOperation + ?Sized>(&self, op: &mut O) {
        for i in 0..self.count {
            op.visit(ParticleHandle(i));
        }
    }

    fn len(&self) -> usize {
        self.count
    }
}

/// Contiguous block of particles (e.g. the particles owned by one worker)
#[derive(Clone, Copy, Debug)]
pub struct ParticleRange {
    range: IndexRange
}

impl ParticleRange {
    pub fn new(range: IndexRange) -> Self {
        Self { range }
    }
}

impl ParticleSet for ParticleRange {
    fn for_each<O: ParticleOperation + ?Sized>(&self, op: &mut O) {
        for i in self.range.indices() {
            op.visit(ParticleHandle(i));
        }
    }

    fn len(&self) -> usize {
        self.range.len()
    }
}
