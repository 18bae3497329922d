//! Velocity Verlet integration and force evaluation core for particle simulations
//!
//! The crate is organized around a few narrow seams:
//! * [`runtime`]: particle storage (runtime-borrow-checked properties) and
//!   boundary conditions
//! * [`traversal`]: sets of particles, pairs and bonded quadruples and the
//!   operations applied to them
//! * [`interaction`]: potentials and the computers accumulating their forces,
//!   energies and virials
//! * [`comm`]: sum reduction of global quantities across workers
//! * [`integrator`]: the velocity Verlet scheme driving all of the above

pub mod comm;
pub mod integrator;
pub mod interaction;
pub mod runtime;
pub mod traversal;
pub mod utils;
