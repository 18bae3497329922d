//! Particle storage and geometry collaborators used by the integration core

mod borrows;
mod domain;
mod index;
mod particle_data;

pub use borrows::*;
pub use domain::*;
pub use index::*;
pub use particle_data::*;

/// Opaque handle of a particle in the local worker's store
///
/// Handles are plain lookup keys: they stay valid as long as the store is not
/// reallocated, which never happens during a traversal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParticleHandle(pub usize);

impl ParticleHandle {
    #[inline(always)]
    pub fn index(&self) -> usize {
        self.0
    }
}

impl From<usize> for ParticleHandle {
    fn from(index: usize) -> Self {
        ParticleHandle(index)
    }
}
