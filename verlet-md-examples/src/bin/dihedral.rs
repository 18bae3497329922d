use std::{f64::consts::PI, sync::Arc};

use anyhow::{Result, anyhow};
use ndarray::prelude::*;

use verlet_md::{
    integrator::IntegratorBuilder,
    interaction::{dihedral_angle, DihedralHarmonicUniqueCos, QuadrupleInteraction},
    runtime::{Domain, ParticleHandle, ParticleStore, Property},
    traversal::FixedQuadrupleAngleList,
    utils::Real3D,
};

fn main() -> Result<()> {
    // Read output path from args
    let output_file = std::env::args().nth(1).ok_or(anyhow!("Usage: dihedral <output path>"))?;
    const K: f64 = 5.0;
    const PHI0: f64 = PI / 3.0;
    const M: f64 = 2.0;
    // Four particle chain, initially at a right dihedral angle
    let mut store = ParticleStore::new(4)?;
    store.add_uniform_scalar(Property::Mass.as_ref(), M)?;
    {
        let mut x = store.vector_mut(Property::Position)?;
        x[ParticleHandle(0)] = Real3D::new(1.0, 0.0, 0.0);
        x[ParticleHandle(1)] = Real3D::new(0.0, 0.0, 0.0);
        x[ParticleHandle(2)] = Real3D::new(0.0, 0.0, 1.0);
        x[ParticleHandle(3)] = Real3D::new(0.0, 1.0, 1.0);
    }
    let store = Arc::new(store);
    let handles = [ParticleHandle(0), ParticleHandle(1), ParticleHandle(2), ParticleHandle(3)];
    let mut quadruples = FixedQuadrupleAngleList::new();
    quadruples.add(handles, PHI0)?;
    // Create integrator
    const DT: f64 = 1e-3;
    let mut integrator = IntegratorBuilder::new(store.clone())
        .with_time_step(DT)
        .build()?;
    integrator.add_force(Box::new(
        QuadrupleInteraction::new("dihedral", store.clone(), Arc::new(Domain::open()), quadruples)
            .with_potential(DihedralHarmonicUniqueCos::new(K, f64::INFINITY)?)
    ))?;
    integrator.compute_forces()?;

    const NUM_STEPS: usize = 500;
    const SPEEDUP: usize = 10;
    let mut results_t: Array1<f64> = Array1::zeros((NUM_STEPS,));
    let mut results_phi: Array1<f64> = Array1::zeros((NUM_STEPS,));
    let mut results_epot: Array1<f64> = Array1::zeros((NUM_STEPS,));
    let mut results_ekin: Array1<f64> = Array1::zeros((NUM_STEPS,));
    for i in 0..NUM_STEPS {
        integrator.run(SPEEDUP)?;
        results_t[i] = integrator.get_time();
        results_epot[i] = integrator.compute_potential_energy()?;
        results_ekin[i] = integrator.compute_kinetic_energy()?;
        let x = store.vector(Property::Position)?;
        let [x1, x2, x3, x4] = handles.map(|p| x[p]);
        results_phi[i] = dihedral_angle(&(x2 - x1), &(x3 - x2), &(x4 - x3));
    }
    println!("Final dihedral angle: {:.4} (reference {:.4})", results_phi[NUM_STEPS - 1], PHI0);

    let mut writer = ndarray_npy::NpzWriter::new(std::fs::File::create(output_file)?);
    writer.add_array("t", &results_t)?;
    writer.add_array("phi", &results_phi)?;
    writer.add_array("E_pot", &results_epot)?;
    writer.add_array("E_kin", &results_ekin)?;
    writer.add_array("k", &array![K])?;
    writer.add_array("phi0", &array![PHI0])?;

    Ok(())
}
