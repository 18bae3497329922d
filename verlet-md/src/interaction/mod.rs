//! Interaction potentials and the computers driving them over pair and tuple sets
//!
//! A potential is a plain physical law (energy and force as functions of
//! displacements). A computer ([`PairInteraction`], [`QuadrupleInteraction`])
//! binds a potential to a set of particles and implements [`Interaction`],
//! which is what the integrator stores and drives. New potentials plug in by
//! implementing [`PairPotential`] or [`DihedralPotential`]; the hot loops stay
//! monomorphic since the computers are generic over the potential.

mod dihedral;
mod lennard_jones;
mod pair_interaction;
mod quadruple_interaction;

pub use dihedral::*;
pub use lennard_jones::*;
pub use pair_interaction::*;
pub use quadruple_interaction::*;

use std::any::Any;

use anyhow::{Result, anyhow};

use crate::{comm::Communicator, utils::{Real3D, Tensor}};

/// Distance based two-body potential
pub trait PairPotential: Send {
    /// Energy as a function of the squared distance (zero at and beyond the cutoff)
    fn energy_sqr(&self, dist_sqr: f64) -> f64;

    /// Energy as a function of the distance
    fn energy(&self, dist: f64) -> f64 {
        self.energy_sqr(dist * dist)
    }

    /// Force on the first particle of a pair with displacement `dist = x_i - x_j`
    fn force(&self, dist: &Real3D) -> Real3D;

    fn cutoff(&self) -> f64;

    fn cutoff_sqr(&self) -> f64 {
        self.cutoff() * self.cutoff()
    }

    /// Check the parameters
    fn validate(&self) -> Result<()>;
}

/// Four-body potential depending on the dihedral angle of a bonded quadruple
///
/// `r21`, `r32` and `r43` are the minimum image bond vectors of the
/// quadruple `(p1, p2, p3, p4)`, `angle` is the reference angle provided
/// by the topology for this quadruple.
pub trait DihedralPotential: Send {
    fn energy(&self, r21: &Real3D, r32: &Real3D, r43: &Real3D, angle: f64) -> f64;

    /// Forces on `p1` to `p4` (they always sum to zero)
    fn forces(&self, r21: &Real3D, r32: &Real3D, r43: &Real3D, angle: f64) -> [Real3D; 4];

    fn cutoff(&self) -> f64;

    fn validate(&self) -> Result<()>;
}

/// A potential bound to the particles it acts on
///
/// Energy and virial queries are collective: every worker must call them
/// (see [`crate::comm`]). They must only be issued at step boundaries.
pub trait Interaction: Any + Send {
    /// Name of this interaction (for diagnostics)
    fn name(&self) -> &str;

    /// Check that the interaction is completely configured
    fn validate(&self) -> Result<()>;

    /// Accumulate the forces of this interaction into the force property
    fn add_forces(&mut self) -> Result<()>;

    /// Globally reduced potential energy
    fn compute_energy(&self, comm: &dyn Communicator) -> Result<f64>;

    /// Globally reduced scalar virial
    fn compute_virial(&self, comm: &dyn Communicator) -> Result<f64>;

    /// Globally reduced virial tensor
    fn compute_virial_tensor(&self, comm: &dyn Communicator) -> Result<Tensor>;

    /// Largest interaction distance of this interaction
    fn max_cutoff(&self) -> f64;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Error of an interaction used before its potential was set
pub(crate) fn missing_potential(name: &str) -> anyhow::Error {
    anyhow!("Interaction {} has no potential", name)
}
