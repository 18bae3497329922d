use std::sync::Arc;

use anyhow::{Result, anyhow};
use ndarray::prelude::*;
use rand::SeedableRng;
use rand_distr::Distribution;

use verlet_md::{
    integrator::IntegratorBuilder,
    interaction::{LennardJones, PairInteraction},
    runtime::{Domain, OutOfBoundsBehavior, ParticleStore, Property},
    traversal::{VerletList, VerletListDetails},
    utils::{IndexRange, Real3D},
};

const NUM_THREADS: usize = 2;
const RNG_SEED: u64 = 10182137663237893456;

fn main() -> Result<()> {
    // Read output path from args
    let output_file = std::env::args().nth(1).ok_or(anyhow!("Usage: lj_fluid <output path>"))?;
    const CELLS_PER_AXIS: usize = 8;
    const LATTICE_CONSTANT: f64 = 1.2;
    const TEMPERATURE: f64 = 1.0;
    const CUTOFF: f64 = 2.5;
    let num_particles = CELLS_PER_AXIS.pow(3);
    let box_length = CELLS_PER_AXIS as f64 * LATTICE_CONSTANT;
    let domain = Arc::new(Domain::cube(box_length, OutOfBoundsBehavior::Periodic)?);
    // Simple cubic lattice with Maxwell-Boltzmann velocities (unit mass)
    let store = Arc::new(ParticleStore::new(num_particles)?);
    {
        let mut x = store.vector_mut(Property::Position)?;
        for (n, position) in x.as_mut_slice().iter_mut().enumerate() {
            let (i, j, k) = (n % CELLS_PER_AXIS, (n / CELLS_PER_AXIS) % CELLS_PER_AXIS, n / CELLS_PER_AXIS.pow(2));
            *position = Real3D::new(i as f64 + 0.5, j as f64 + 0.5, k as f64 + 0.5) * LATTICE_CONSTANT;
        }
        let mut v = store.vector_mut(Property::Velocity)?;
        let mut rng = rand_xoshiro::Xoshiro256PlusPlus::seed_from_u64(RNG_SEED);
        let dist = rand_distr::Normal::new(0.0, TEMPERATURE.sqrt())?;
        for value in v.as_f64_slice() {
            *value = dist.sample(&mut rng);
        }
        // Remove center of mass motion
        let v_cm = v.as_slice().iter().fold(Real3D::zero(), |acc, v| acc + *v) / num_particles as f64;
        for velocity in v.as_mut_slice() {
            *velocity -= v_cm;
        }
    }
    // Create integrator
    const DT: f64 = 2e-3;
    let mut integrator = IntegratorBuilder::new(store.clone())
        .with_time_step(DT)
        .build()?;
    let pairs = VerletList::new(store.clone(), domain.clone(), IndexRange::new(0, num_particles), CUTOFF,
        VerletListDetails {
            num_workers: NUM_THREADS,
            skin_factor: 1.2,
            cell_size: None,
            rebuild_interval: 5,
        })?;
    let lj = LennardJones::new(1.0, 1.0, CUTOFF)?;
    let lj_id = integrator.add_force(Box::new(PairInteraction::new("lj", store.clone(), domain, pairs).with_potential(lj)))?;
    integrator.compute_forces()?;

    const NUM_STEPS: usize = 200;
    const SPEEDUP: usize = 10;
    let volume = box_length.powi(3);
    let mut results_t: Array1<f64> = Array1::zeros((NUM_STEPS,));
    let mut results_ekin: Array1<f64> = Array1::zeros((NUM_STEPS,));
    let mut results_epot: Array1<f64> = Array1::zeros((NUM_STEPS,));
    let mut results_pressure: Array1<f64> = Array1::zeros((NUM_STEPS,));
    let mut results_stress: Array3<f64> = Array3::zeros((NUM_STEPS, 3, 3));
    for i in 0..NUM_STEPS {
        integrator.run(SPEEDUP)?;
        let ekin = integrator.compute_kinetic_energy()?;
        let epot = integrator.compute_potential_energy()?;
        let virial = integrator.compute_virial()?;
        let tensor = integrator.compute_virial_tensor()?;
        // P = (2 E_kin + W) / (3 V)
        let pressure = (2.0 * ekin + virial) / (3.0 * volume);
        results_t[i] = integrator.get_time();
        results_ekin[i] = ekin;
        results_epot[i] = epot;
        results_pressure[i] = pressure;
        for a in 0..3 {
            for b in 0..3 {
                results_stress[[i, a, b]] = tensor[(a, b)] / volume;
            }
        }
        if i % 20 == 0 {
            println!("t = {:.3}: E_kin = {:.4}, E_pot = {:.4}, E = {:.6}, P = {:.4}",
                integrator.get_time(), ekin, epot, ekin + epot, pressure);
        }
    }

    let verlet_list = integrator.interaction_mut::<PairInteraction<LennardJones, VerletList>>(lj_id)?.pairs();
    println!("Neighbor list was rebuilt {} times ({} pairs)", verlet_list.num_rebuilds(), verlet_list.num_pairs());

    let mut writer = ndarray_npy::NpzWriter::new(std::fs::File::create(output_file)?);
    writer.add_array("t", &results_t)?;
    writer.add_array("E_kin", &results_ekin)?;
    writer.add_array("E_pot", &results_epot)?;
    writer.add_array("P", &results_pressure)?;
    writer.add_array("W", &results_stress)?;
    writer.add_array("N", &array![num_particles as f64])?;
    writer.add_array("L", &array![box_length])?;

    Ok(())
}
