//! Integrator builder

use std::sync::Arc;

use anyhow::Result;

use crate::{
    comm::{Communicator, SingleWorker},
    runtime::ParticleStore,
    traversal::{AllParticles, ParticleSet},
};

use super::VelocityVerlet;

/// Builder for `VelocityVerlet` with default values
pub struct IntegratorBuilder<S = AllParticles> {
    store: Arc<ParticleStore>,
    particles: S,
    start_time: f64,
    time_step: f64,
    comm: Arc<dyn Communicator>
}

impl IntegratorBuilder<AllParticles> {
    /// Integrate all particles of `store` on a single worker
    pub fn new(store: Arc<ParticleStore>) -> Self {
        let particles = AllParticles::new(&store);
        Self {
            store,
            particles,
            start_time: 0.0,
            time_step: 1e-3,
            comm: Arc::new(SingleWorker)
        }
    }
}

impl<S: ParticleSet> IntegratorBuilder<S> {
    /// Only integrate the particles in `particles` (e.g. the ones owned by this worker)
    pub fn with_particles<T: ParticleSet>(self, particles: T) -> IntegratorBuilder<T> {
        IntegratorBuilder {
            store: self.store,
            particles,
            start_time: self.start_time,
            time_step: self.time_step,
            comm: self.comm
        }
    }

    pub fn with_start_time(mut self, time: f64) -> Self {
        self.start_time = time;
        self
    }

    pub fn with_time_step(mut self, time_step: f64) -> Self {
        self.time_step = time_step;
        self
    }

    pub fn with_communicator(mut self, comm: Arc<dyn Communicator>) -> Self {
        self.comm = comm;
        self
    }

    pub fn build(self) -> Result<VelocityVerlet<S>> {
        VelocityVerlet::new(self.store, self.particles, self.comm, self.start_time, self.time_step)
    }
}
