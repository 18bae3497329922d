use std::sync::Arc;

use anyhow::{Result, anyhow};
use ndarray::prelude::*;

use verlet_md::{
    integrator::IntegratorBuilder,
    interaction::{LennardJones, PairInteraction},
    runtime::{Domain, ParticleHandle, ParticleStore, Property},
    traversal::AllPairs,
    utils::{IndexRange, Real3D},
};

fn main() -> Result<()> {
    // Read output path from args
    let output_file = std::env::args().nth(1).ok_or(anyhow!("Usage: lj_dimer <output path>"))?;
    const EPSILON: f64 = 1.0;
    const SIGMA: f64 = 1.0;
    const CUTOFF: f64 = 2.5;
    const R0: f64 = 1.05;
    // Create particles (in block to limit lifetime of references)
    let store = Arc::new(ParticleStore::new(2)?);
    {
        let mut x = store.vector_mut(Property::Position)?;
        x[ParticleHandle(1)] = Real3D::new(R0, 0.0, 0.0);
    }
    // Create integrator
    const DT: f64 = 1e-3;
    let mut integrator = IntegratorBuilder::new(store.clone())
        .with_start_time(0.0) // This is actually the default value
        .with_time_step(DT)
        .build()?;
    let lj = LennardJones::new(EPSILON, SIGMA, CUTOFF)?;
    integrator.add_force(Box::new(
        PairInteraction::new("lj", store.clone(), Arc::new(Domain::open()), AllPairs::new(IndexRange::new(0, 2)))
            .with_potential(lj)
    ))?;
    integrator.compute_forces()?;

    const NUM_STEPS: usize = 1000;
    const SPEEDUP: usize = 5;
    // Allocate storage for the trajectory
    let mut results_x: Array2<f64> = Array2::zeros((NUM_STEPS, 2));
    let mut results_t: Array1<f64> = Array1::zeros((NUM_STEPS,));
    let mut results_ekin: Array1<f64> = Array1::zeros((NUM_STEPS,));
    let mut results_epot: Array1<f64> = Array1::zeros((NUM_STEPS,));
    for i in 0..NUM_STEPS {
        integrator.run(SPEEDUP)?;
        results_t[i] = integrator.get_time();
        results_ekin[i] = integrator.compute_kinetic_energy()?;
        results_epot[i] = integrator.compute_potential_energy()?;
        let x = store.vector(Property::Position)?;
        results_x.row_mut(i).assign(&array![x[ParticleHandle(0)].x(), x[ParticleHandle(1)].x()]);
    }

    let drift = (results_ekin[NUM_STEPS - 1] + results_epot[NUM_STEPS - 1]) - (results_ekin[0] + results_epot[0]);
    println!("Energy drift after {} steps: {:e}", NUM_STEPS * SPEEDUP, drift);

    let mut writer = ndarray_npy::NpzWriter::new(std::fs::File::create(output_file)?);
    writer.add_array("t", &results_t)?;
    writer.add_array("x", &results_x)?;
    writer.add_array("E_kin", &results_ekin)?;
    writer.add_array("E_pot", &results_epot)?;
    writer.add_array("epsilon", &array![EPSILON])?;
    writer.add_array("sigma", &array![SIGMA])?;

    Ok(())
}
