//! The energy error of velocity Verlet scales with the square of the time step

use std::sync::Arc;

use verlet_md::{
    integrator::{IntegratorBuilder, VelocityVerlet},
    interaction::{LennardJones, PairInteraction},
    runtime::*,
    traversal::AllPairs,
    utils::{IndexRange, Real3D},
};

const TOTAL_TIME: f64 = 2.0;

/// Largest deviation of the total energy from its initial value
fn max_energy_error(time_step: f64) -> f64 {
    let store = ParticleStore::new(2).unwrap();
    {
        let mut x = store.vector_mut(Property::Position).unwrap();
        x[ParticleHandle(1)] = Real3D::new(1.05, 0.0, 0.0);
    }
    let store = Arc::new(store);
    let mut integrator: VelocityVerlet = IntegratorBuilder::new(store.clone())
        .with_time_step(time_step)
        .build().unwrap();
    let lj = LennardJones::new(1.0, 1.0, 2.5).unwrap();
    integrator.add_force(Box::new(
        PairInteraction::new("lj", store, Arc::new(Domain::open()), AllPairs::new(IndexRange::new(0, 2)))
            .with_potential(lj)
    )).unwrap();
    integrator.compute_forces().unwrap();
    let total_energy = |integrator: &VelocityVerlet|
        integrator.compute_kinetic_energy().unwrap() + integrator.compute_potential_energy().unwrap();
    let e0 = total_energy(&integrator);
    let steps = (TOTAL_TIME / time_step).round() as usize;
    let mut max_error: f64 = 0.0;
    for _ in 0..steps {
        integrator.run(1).unwrap();
        max_error = max_error.max((total_energy(&integrator) - e0).abs());
    }
    max_error
}

#[test]
fn energy_error_is_second_order() {
    let coarse = max_energy_error(0.01);
    let fine = max_energy_error(0.005);
    assert!(coarse > 0.0 && coarse < 1e-2, "coarse error {}", coarse);
    let ratio = coarse / fine;
    assert!(ratio > 3.0 && ratio < 5.0, "error ratio {} (coarse {}, fine {})", ratio, coarse, fine);
}
