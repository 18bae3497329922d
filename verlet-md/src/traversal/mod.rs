//! Traversal abstractions: operations applied to every particle, pair or bonded tuple
//!
//! A set knows *which* particles, pairs or tuples to visit, an operation knows
//! *what* to do with each of them. Sets never accumulate physical quantities
//! themselves. Every set visits each qualifying element exactly once per call,
//! in no guaranteed order.

mod pairs;
mod particles;
mod quadruples;
mod verlet_list;

pub use pairs::*;
pub use particles::*;
pub use quadruples::*;
pub use verlet_list::*;

use anyhow::Result;

use crate::runtime::ParticleHandle;

/// Operation applied once per particle
pub trait ParticleOperation {
    fn visit(&mut self, particle: ParticleHandle);
}

impl<F: FnMut(ParticleHandle)> ParticleOperation for F {
    #[inline(always)]
    fn visit(&mut self, particle: ParticleHandle) {
        self(particle)
    }
}

/// Operation applied once per interacting pair
pub trait PairOperation {
    fn visit(&mut self, i: ParticleHandle, j: ParticleHandle);
}

impl<F: FnMut(ParticleHandle, ParticleHandle)> PairOperation for F {
    #[inline(always)]
    fn visit(&mut self, i: ParticleHandle, j: ParticleHandle) {
        self(i, j)
    }
}

/// Operation applied once per bonded quadruple
pub trait QuadrupleOperation {
    fn visit(&mut self, quadruple: [ParticleHandle; 4]);
}

impl<F: FnMut([ParticleHandle; 4])> QuadrupleOperation for F {
    #[inline(always)]
    fn visit(&mut self, quadruple: [ParticleHandle; 4]) {
        self(quadruple)
    }
}

/// Set of particles (used by the integrator for the kick/drift phases)
pub trait ParticleSet {
    fn for_each<O: ParticleOperation + ?Sized>(&self, op: &mut O);

    /// Number of particles in the set
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Set of interacting particle pairs
///
/// How pairs are enumerated (all pairs, fixed bonds, cell lists, ...) is up to
/// the implementation. The same pair must never be visited twice per call,
/// neither as `(i, j)` nor as `(j, i)`.
pub trait PairSet {
    /// Read-only traversal (energy and virial queries)
    ///
    /// The set itself is not modified, so this may be used while the pair
    /// enumeration must stay stable.
    fn for_each<O: PairOperation + ?Sized>(&self, op: &mut O) -> Result<()>;

    /// Mutating traversal (force accumulation)
    ///
    /// Implementations may refresh internal structures (e.g. rebuild a
    /// neighbor list) before visiting the pairs.
    fn for_each_mut<O: PairOperation + ?Sized>(&mut self, op: &mut O) -> Result<()> {
        self.for_each(op)
    }

    /// Distance up to which pairs are guaranteed to be enumerated
    /// (`None` if pairs are enumerated regardless of distance)
    fn cutoff(&self) -> Option<f64> {
        None
    }
}

/// Set of bonded quadruples
pub trait QuadrupleSet {
    fn for_each<O: QuadrupleOperation + ?Sized>(&self, op: &mut O);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Topology collaborator providing the reference angle of a bonded quadruple
pub trait AngleProvider {
    fn get_angle(&self, quadruple: [ParticleHandle; 4]) -> Option<f64>;
}
