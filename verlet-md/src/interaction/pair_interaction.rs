//! Pairwise force, energy and virial computation

use std::{any::Any, sync::Arc};

use anyhow::Result;

use crate::{
    comm::{reduce_scalar, reduce_tensor, Communicator},
    runtime::{BoundaryCondition, Domain, ParticleHandle, ParticleStore, Property},
    traversal::PairSet,
    utils::{Real3D, Tensor},
};

use super::{missing_potential, Interaction, PairPotential};

/// Pair potential bound to a pair set
pub struct PairInteraction<P, S, B = Domain> {
    name: String,
    store: Arc<ParticleStore>,
    bc: Arc<B>,
    pairs: S,
    /// Must be set before the interaction is registered
    potential: Option<P>
}

impl<P: PairPotential, S: PairSet, B: BoundaryCondition> PairInteraction<P, S, B> {
    pub fn new(name: &str, store: Arc<ParticleStore>, bc: Arc<B>, pairs: S) -> Self {
        Self { name: name.into(), store, bc, pairs, potential: None }
    }

    pub fn with_potential(mut self, potential: P) -> Self {
        self.potential = Some(potential);
        self
    }

    pub fn set_potential(&mut self, potential: P) {
        self.potential = Some(potential);
    }

    pub fn potential(&self) -> Option<&P> {
        self.potential.as_ref()
    }

    pub fn potential_mut(&mut self) -> Option<&mut P> {
        self.potential.as_mut()
    }

    pub fn pairs(&self) -> &S {
        &self.pairs
    }

    fn require_potential(&self) -> Result<&P> {
        self.potential.as_ref().ok_or_else(|| missing_potential(&self.name))
    }

    /// Local sum of `visit(d, f)` over all pairs, `d` being the minimum image
    /// displacement and `f` the force on the first particle
    fn accumulate<T, F>(&self, mut acc: T, mut visit: F) -> Result<T>
    where F: FnMut(&mut T, &Real3D, &Real3D)
    {
        let potential = self.require_potential()?;
        let x = self.store.vector(Property::Position)?;
        let bc = &*self.bc;
        self.pairs.for_each(&mut |i: ParticleHandle, j: ParticleHandle| {
            let d = bc.minimum_image(x[i], x[j]);
            let f = potential.force(&d);
            visit(&mut acc, &d, &f);
        })?;
        Ok(acc)
    }

    /// Potential energy of the local pairs
    fn local_energy(&self) -> Result<f64> {
        let potential = self.require_potential()?;
        let x = self.store.vector(Property::Position)?;
        let bc = &*self.bc;
        let mut energy = 0.0;
        self.pairs.for_each(&mut |i: ParticleHandle, j: ParticleHandle| {
            energy += potential.energy_sqr(bc.minimum_image(x[i], x[j]).sqr());
        })?;
        Ok(energy)
    }
}

impl<P, S, B> Interaction for PairInteraction<P, S, B>
where
    P: PairPotential + 'static,
    S: PairSet + Send + 'static,
    B: BoundaryCondition + 'static
{
    fn name(&self) -> &str {
        &self.name
    }

    fn validate(&self) -> Result<()> {
        let potential = self.require_potential()?;
        potential.validate()?;
        let cutoff = potential.cutoff();
        if let Some(range) = self.pairs.cutoff() {
            if cutoff > range {
                log::warn!("Cutoff {} of interaction {} exceeds the pair set range {}; pairs may be missed",
                    cutoff, self.name, range);
            }
        }
        if cutoff > self.bc.max_minimum_image_cutoff() {
            log::warn!("Cutoff {} of interaction {} exceeds half the periodic box length {}",
                cutoff, self.name, self.bc.max_minimum_image_cutoff());
        }
        Ok(())
    }

    fn add_forces(&mut self) -> Result<()> {
        // Not `require_potential`: the pair set is borrowed mutably below
        let potential = self.potential.as_ref().ok_or_else(|| missing_potential(&self.name))?;
        let x = self.store.vector(Property::Position)?;
        let mut f = self.store.vector_mut(Property::Force)?;
        let bc = &*self.bc;
        self.pairs.for_each_mut(&mut |i: ParticleHandle, j: ParticleHandle| {
            let force = potential.force(&bc.minimum_image(x[i], x[j]));
            f[i] += force;
            f[j] -= force;
        })
    }

    fn compute_energy(&self, comm: &dyn Communicator) -> Result<f64> {
        reduce_scalar(comm, self.local_energy())
    }

    fn compute_virial(&self, comm: &dyn Communicator) -> Result<f64> {
        reduce_scalar(comm, self.accumulate(0.0, |w, d, f| *w += d.dot(f)))
    }

    fn compute_virial_tensor(&self, comm: &dyn Communicator) -> Result<Tensor> {
        reduce_tensor(comm, self.accumulate(Tensor::zero(), |w, d, f| *w += Tensor::outer(d, f)))
    }

    fn max_cutoff(&self) -> f64 {
        self.potential.as_ref().map_or(0.0, |p| p.cutoff())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod test {
    use crate::{
        comm::SingleWorker,
        interaction::LennardJones,
        runtime::OutOfBoundsBehavior,
        traversal::{AllPairs, FixedPairList},
        utils::IndexRange,
    };

    use super::*;

    fn dimer(distance: f64) -> Arc<ParticleStore> {
        let store = ParticleStore::new(2).unwrap();
        store.vector_mut(Property::Position).unwrap()[ParticleHandle(1)] = Real3D::new(distance, 0.0, 0.0);
        Arc::new(store)
    }

    #[test]
    fn test_dimer_forces_and_virial() {
        let store = dimer(1.0);
        let lj = LennardJones::new(1.0, 1.0, 2.5).unwrap();
        let mut interaction = PairInteraction::new("lj", store.clone(), Arc::new(Domain::open()), AllPairs::new(IndexRange::new(0, 2)))
            .with_potential(lj);
        interaction.validate().unwrap();
        interaction.add_forces().unwrap();
        let f = store.vector(Property::Force).unwrap();
        // d = x0 - x1 = (-1, 0, 0), repulsive: particle 0 is pushed to -x
        let expected = lj.force(&Real3D::new(-1.0, 0.0, 0.0));
        assert_eq!(f[ParticleHandle(0)], expected);
        assert_eq!(f[ParticleHandle(1)], -expected);
        drop(f);
        assert_eq!(interaction.compute_energy(&SingleWorker).unwrap(), 0.0);
        let virial = interaction.compute_virial(&SingleWorker).unwrap();
        assert!((virial - 24.0).abs() < 1e-12);
        let tensor = interaction.compute_virial_tensor(&SingleWorker).unwrap();
        assert!((tensor.trace() - virial).abs() < 1e-12);
        assert!((tensor[(0, 0)] - 24.0).abs() < 1e-12);
    }

    #[test]
    fn test_missing_potential() {
        let store = dimer(1.0);
        let mut interaction: PairInteraction<LennardJones, _> =
            PairInteraction::new("lj", store, Arc::new(Domain::open()), FixedPairList::new());
        assert!(interaction.validate().is_err());
        let err = interaction.add_forces().unwrap_err();
        assert_eq!(err.to_string(), "Interaction lj has no potential");
        let err = interaction.compute_energy(&SingleWorker).unwrap_err();
        assert_eq!(err.to_string(), "Interaction lj has no potential");
        assert!(interaction.compute_virial_tensor(&SingleWorker).is_err());
        assert_eq!(interaction.max_cutoff(), 0.0);
    }

    #[test]
    fn test_periodic_image() {
        let store = ParticleStore::new(2).unwrap();
        {
            let mut x = store.vector_mut(Property::Position).unwrap();
            x[ParticleHandle(0)] = Real3D::new(0.5, 1.0, 1.0);
            x[ParticleHandle(1)] = Real3D::new(9.5, 1.0, 1.0);
        }
        let store = Arc::new(store);
        let domain = Arc::new(Domain::cube(10.0, OutOfBoundsBehavior::Periodic).unwrap());
        let mut bonds = FixedPairList::new();
        bonds.add(ParticleHandle(0), ParticleHandle(1)).unwrap();
        let lj = LennardJones::new(1.0, 1.0, 2.5).unwrap();
        let interaction = PairInteraction::new("lj", store, domain, bonds).with_potential(lj);
        let energy = interaction.compute_energy(&SingleWorker).unwrap();
        assert_eq!(energy, 0.0);
        assert!(interaction.compute_virial(&SingleWorker).unwrap() > 0.0);
    }
}
