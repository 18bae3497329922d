//! Velocity Verlet time integration
//!
//! One step consists of
//! 1. Step A (half kick and drift): `v += F/(2m) dt`, `x += v dt` and `F = 0`
//!    for every particle,
//! 2. force evaluation: every registered interaction adds its forces for the
//!    current (drifted) positions, in registration order,
//! 3. Step B (half kick): `v += F/(2m) dt`.
//!
//! Forces must be valid for the initial positions before the first step,
//! see [`VelocityVerlet::compute_forces`].

mod builder;
mod steps;

pub use builder::*;

use std::{ops::AddAssign, sync::Arc};

use anyhow::{Result, anyhow};
use slotmap::SlotMap;

use crate::{
    comm::{reduce_scalar, Communicator},
    interaction::Interaction,
    runtime::{ParticleHandle, ParticleStore, Property},
    traversal::{AllParticles, ParticleSet},
    utils::{Real3D, Tensor},
};

use steps::{Drift, Kick, Masses};

slotmap::new_key_type! {
    /// Key of an interaction registered with an integrator
    pub struct BindingID;
}

/// Current state of the integrator
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IntegratorState {
    /// Between calls to `run`: bindings may change, queries are valid
    Idle,
    /// Inside `run`
    Running
}

/// Velocity Verlet integrator driving a set of interactions
pub struct VelocityVerlet<S = AllParticles> {
    /// Particle data
    store: Arc<ParticleStore>,
    /// Particles moved by this integrator
    particles: S,
    /// Reduction across workers
    comm: Arc<dyn Communicator>,
    /// Current simulation time
    current_time: f64,
    /// Time step for simulation
    time_step: f64,
    /// Number of completed steps
    step_count: usize,
    state: IntegratorState,
    /// Registered interactions
    bindings: SlotMap<BindingID, Box<dyn Interaction>>,
    /// Registration order (forces are evaluated in this order)
    binding_order: Vec<BindingID>
}

fn check_time_step(time_step: f64) -> Result<()> {
    if !(time_step > 0.0) || !time_step.is_finite() {
        return Err(anyhow!("Time step must be positive and finite (got {})", time_step));
    }
    Ok(())
}

impl<S: ParticleSet> VelocityVerlet<S> {
    pub fn new(store: Arc<ParticleStore>, particles: S, comm: Arc<dyn Communicator>,
        current_time: f64, time_step: f64) -> Result<Self>
    {
        check_time_step(time_step)?;
        if !current_time.is_finite() {
            return Err(anyhow!("Start time must be finite (got {})", current_time));
        }
        for property in [Property::Position, Property::Velocity, Property::Force] {
            if !store.has_property(property.as_ref()) {
                return Err(anyhow!("Particle store lacks the {} property", property));
            }
        }
        Ok(Self {
            store, particles, comm,
            current_time, time_step,
            step_count: 0,
            state: IntegratorState::Idle,
            bindings: SlotMap::with_key(),
            binding_order: vec![]
        })
    }

    /// Advance the system by `steps` time steps
    ///
    /// On error the integrator returns to `Idle`; the particle data then
    /// reflects the partially completed step.
    pub fn run(&mut self, steps: usize) -> Result<()> {
        Masses::borrow(&self.store)?.check(&self.particles)?;
        log::info!("Running {} steps of size {} from t = {} ({} interactions)",
            steps, self.time_step, self.current_time, self.binding_order.len());
        self.state = IntegratorState::Running;
        let result = (0..steps).try_for_each(|_| self.integrate_step());
        self.state = IntegratorState::Idle;
        result?;
        log::info!("Finished at step {} (t = {})", self.step_count, self.current_time);
        Ok(())
    }

    fn integrate_step(&mut self) -> Result<()> {
        // Step A
        {
            let mut drift = Drift::borrow(&self.store, self.time_step)?;
            self.particles.for_each(&mut drift);
        }
        self.evaluate_forces()?;
        // Step B
        {
            let mut kick = Kick::borrow(&self.store, self.time_step)?;
            self.particles.for_each(&mut kick);
        }
        self.current_time += self.time_step;
        self.step_count += 1;
        Ok(())
    }

    /// Add the forces of all interactions in registration order
    fn evaluate_forces(&mut self) -> Result<()> {
        for id in &self.binding_order {
            let interaction = self.bindings.get_mut(*id)
                .ok_or_else(|| anyhow!("Registered interaction vanished"))?;
            interaction.add_forces()?;
        }
        Ok(())
    }

    /// Recompute the forces for the current positions
    ///
    /// Step A uses the forces left over from the previous step, so this must
    /// be called once before the first `run` (and after positions were
    /// changed from outside).
    pub fn compute_forces(&mut self) -> Result<()> {
        {
            let mut f = self.store.vector_mut(Property::Force)?;
            self.particles.for_each(&mut |p: ParticleHandle| f[p] = Real3D::zero());
        }
        self.evaluate_forces()
    }

    /// Register an interaction (its forces are added after all previously registered ones)
    pub fn add_force(&mut self, interaction: Box<dyn Interaction>) -> Result<BindingID> {
        interaction.validate()?;
        log::debug!("Adding interaction {} (cutoff {})", interaction.name(), interaction.max_cutoff());
        let id = self.bindings.insert(interaction);
        self.binding_order.push(id);
        Ok(id)
    }

    /// Unregister an interaction
    pub fn remove_force(&mut self, id: BindingID) -> Result<Box<dyn Interaction>> {
        let interaction = self.bindings.remove(id)
            .ok_or_else(|| anyhow!("No interaction registered under {:?}", id))?;
        self.binding_order.retain(|other| *other != id);
        log::debug!("Removed interaction {}", interaction.name());
        Ok(interaction)
    }

    pub fn interaction(&self, id: BindingID) -> Option<&dyn Interaction> {
        self.bindings.get(id).map(|interaction| interaction.as_ref())
    }

    /// Typed access to a registered interaction (e.g. to change its potential)
    pub fn interaction_mut<I: Interaction>(&mut self, id: BindingID) -> Result<&mut I> {
        let interaction = self.bindings.get_mut(id)
            .ok_or_else(|| anyhow!("No interaction registered under {:?}", id))?;
        let name = interaction.name().to_string();
        interaction.as_any_mut()
            .downcast_mut::<I>()
            .ok_or_else(|| anyhow!("Interaction {} has a different type than requested", name))
    }

    /// Registered interactions in registration order
    pub fn interactions(&self) -> impl Iterator<Item = (BindingID, &dyn Interaction)> {
        self.binding_order.iter()
            .filter_map(|id| self.bindings.get(*id).map(|interaction| (*id, interaction.as_ref())))
    }

    /// Sum of a collective per-interaction query
    ///
    /// Every interaction is queried before the first error is returned, so
    /// all workers go through the same sequence of reductions.
    fn sum_over_interactions<T, F>(&self, zero: T, query: F) -> Result<T>
    where
        T: AddAssign,
        F: Fn(&dyn Interaction) -> Result<T>
    {
        let results = self.interactions()
            .map(|(_, interaction)| query(interaction))
            .collect::<Vec<_>>();
        results.into_iter().try_fold(zero, |mut total, result| {
            total += result?;
            Ok(total)
        })
    }

    /// Total potential energy of all interactions (collective)
    pub fn compute_potential_energy(&self) -> Result<f64> {
        self.sum_over_interactions(0.0, |interaction| interaction.compute_energy(&*self.comm))
    }

    fn local_kinetic_energy(&self) -> Result<f64> {
        let v = self.store.vector(Property::Velocity)?;
        let m = Masses::borrow(&self.store)?;
        let mut local = 0.0;
        self.particles.for_each(&mut |p: ParticleHandle| local += 0.5 * m.get(p) * v[p].sqr());
        Ok(local)
    }

    /// Total kinetic energy `Σ m v²/2` (collective)
    pub fn compute_kinetic_energy(&self) -> Result<f64> {
        reduce_scalar(&*self.comm, self.local_kinetic_energy())
    }

    /// Total scalar virial of all interactions (collective)
    pub fn compute_virial(&self) -> Result<f64> {
        self.sum_over_interactions(0.0, |interaction| interaction.compute_virial(&*self.comm))
    }

    /// Total virial tensor of all interactions (collective)
    pub fn compute_virial_tensor(&self) -> Result<Tensor> {
        self.sum_over_interactions(Tensor::zero(), |interaction| interaction.compute_virial_tensor(&*self.comm))
    }

    /// Largest cutoff of all registered interactions (0 if there are none)
    pub fn max_cutoff(&self) -> f64 {
        self.interactions()
            .map(|(_, interaction)| interaction.max_cutoff())
            .fold(0.0, f64::max)
    }

    pub fn set_time_step(&mut self, time_step: f64) -> Result<()> {
        check_time_step(time_step)?;
        self.time_step = time_step;
        Ok(())
    }

    pub fn get_time_step(&self) -> f64 {
        self.time_step
    }

    pub fn get_time(&self) -> f64 {
        self.current_time
    }

    pub fn get_step_count(&self) -> usize {
        self.step_count
    }

    pub fn state(&self) -> IntegratorState {
        self.state
    }

    pub fn store(&self) -> &Arc<ParticleStore> {
        &self.store
    }
}
