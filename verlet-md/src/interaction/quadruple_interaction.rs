//! Force, energy and virial computation for bonded quadruples

use std::{any::Any, sync::Arc};

use anyhow::{Result, anyhow};

use crate::{
    comm::{reduce_scalar, reduce_tensor, Communicator},
    runtime::{BoundaryCondition, Domain, ParticleHandle, ParticleStore, Property, VectorProperty},
    traversal::{AngleProvider, QuadrupleSet},
    utils::{Real3D, Tensor},
};

use super::{missing_potential, DihedralPotential, Interaction};

/// Dihedral potential bound to a list of quadruples
pub struct QuadrupleInteraction<P, L, B = Domain> {
    name: String,
    store: Arc<ParticleStore>,
    bc: Arc<B>,
    quadruples: L,
    potential: Option<P>
}

/// Minimum image bond vectors `r21`, `r32`, `r43` of a quadruple
#[inline]
fn bond_vectors<B: BoundaryCondition + ?Sized>(bc: &B, x: &VectorProperty, q: &[ParticleHandle; 4]) -> [Real3D; 3] {
    [
        bc.minimum_image(x[q[1]], x[q[0]]),
        bc.minimum_image(x[q[2]], x[q[1]]),
        bc.minimum_image(x[q[3]], x[q[2]]),
    ]
}

/// Positions of `p2`, `p3`, `p4` relative to `p1` along the bonds
///
/// The forces of a quadruple sum to zero, so its virial `Σ x_k·f_k` is
/// invariant under translation and may be evaluated relative to `p1`
/// (whose relative position is zero).
#[inline]
fn relative_positions(bonds: &[Real3D; 3]) -> [Real3D; 3] {
    let s2 = bonds[0];
    let s3 = s2 + bonds[1];
    let s4 = s3 + bonds[2];
    [s2, s3, s4]
}

impl<P: DihedralPotential, L: QuadrupleSet + AngleProvider, B: BoundaryCondition> QuadrupleInteraction<P, L, B> {
    pub fn new(name: &str, store: Arc<ParticleStore>, bc: Arc<B>, quadruples: L) -> Self {
        Self { name: name.into(), store, bc, quadruples, potential: None }
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

    pub fn quadruples(&self) -> &L {
        &self.quadruples
    }

    pub fn quadruples_mut(&mut self) -> &mut L {
        &mut self.quadruples
    }

    fn require_potential(&self) -> Result<&P> {
        self.potential.as_ref().ok_or_else(|| missing_potential(&self.name))
    }

    /// Local sum of `visit(potential, bonds, angle)` over all quadruples
    fn accumulate<T, F>(&self, mut acc: T, mut visit: F) -> Result<T>
    where F: FnMut(&mut T, &P, &[Real3D; 3], f64)
    {
        let potential = self.require_potential()?;
        let x = self.store.vector(Property::Position)?;
        let bc = &*self.bc;
        let quadruples = &self.quadruples;
        let mut missing = None;
        quadruples.for_each(&mut |q: [ParticleHandle; 4]| {
            match quadruples.get_angle(q) {
                Some(angle) => visit(&mut acc, potential, &bond_vectors(bc, &x, &q), angle),
                None => { missing.get_or_insert(q); }
            }
        });
        match missing {
            Some(q) => Err(missing_angle(&self.name, &q)),
            None => Ok(acc)
        }
    }
}

fn missing_angle(name: &str, q: &[ParticleHandle; 4]) -> anyhow::Error {
    anyhow!("Interaction {}: no reference angle for quadruple ({}, {}, {}, {})",
        name, q[0].index(), q[1].index(), q[2].index(), q[3].index())
}

impl<P, L, B> Interaction for QuadrupleInteraction<P, L, B>
where
    P: DihedralPotential + 'static,
    L: QuadrupleSet + AngleProvider + Send + 'static,
    B: BoundaryCondition + 'static
{
    fn name(&self) -> &str {
        &self.name
    }

    fn validate(&self) -> Result<()> {
        self.require_potential()?.validate()
    }

    fn add_forces(&mut self) -> Result<()> {
        let potential = self.require_potential()?;
        let x = self.store.vector(Property::Position)?;
        let mut f = self.store.vector_mut(Property::Force)?;
        let bc = &*self.bc;
        let quadruples = &self.quadruples;
        let mut missing = None;
        quadruples.for_each(&mut |q: [ParticleHandle; 4]| {
            let angle = match quadruples.get_angle(q) {
                Some(angle) => angle,
                None => { missing.get_or_insert(q); return; }
            };
            let [r21, r32, r43] = bond_vectors(bc, &x, &q);
            let forces = potential.forces(&r21, &r32, &r43, angle);
            for (p, force) in q.iter().zip(forces) {
                f[*p] += force;
            }
        });
        match missing {
            Some(q) => Err(missing_angle(&self.name, &q)),
            None => Ok(())
        }
    }

    fn compute_energy(&self, comm: &dyn Communicator) -> Result<f64> {
        let energy = self.accumulate(0.0, |e, potential, bonds, angle| {
            *e += potential.energy(&bonds[0], &bonds[1], &bonds[2], angle);
        });
        reduce_scalar(comm, energy)
    }

    fn compute_virial(&self, comm: &dyn Communicator) -> Result<f64> {
        let virial = self.accumulate(0.0, |w, potential, bonds, angle| {
            let [_, f2, f3, f4] = potential.forces(&bonds[0], &bonds[1], &bonds[2], angle);
            let [s2, s3, s4] = relative_positions(bonds);
            *w += s2.dot(&f2) + s3.dot(&f3) + s4.dot(&f4);
        });
        reduce_scalar(comm, virial)
    }

    fn compute_virial_tensor(&self, comm: &dyn Communicator) -> Result<Tensor> {
        let tensor = self.accumulate(Tensor::zero(), |w, potential, bonds, angle| {
            let [_, f2, f3, f4] = potential.forces(&bonds[0], &bonds[1], &bonds[2], angle);
            let [s2, s3, s4] = relative_positions(bonds);
            *w += Tensor::outer(&s2, &f2) + Tensor::outer(&s3, &f3) + Tensor::outer(&s4, &f4);
        });
        reduce_tensor(comm, tensor)
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
        comm::{SingleWorker, ThreadGroup},
        interaction::DihedralHarmonicUniqueCos,
        traversal::FixedQuadrupleAngleList,
    };

    use super::*;

    const HANDLES: [ParticleHandle; 4] = [ParticleHandle(0), ParticleHandle(1), ParticleHandle(2), ParticleHandle(3)];

    fn chain(positions: [Real3D; 4]) -> Arc<ParticleStore> {
        let store = ParticleStore::new(4).unwrap();
        store.vector_mut(Property::Position).unwrap().as_mut_slice().copy_from_slice(&positions);
        Arc::new(store)
    }

    fn skewed() -> [Real3D; 4] {
        [
            Real3D::new(1.1, 0.2, -0.3),
            Real3D::new(0.1, -0.1, 0.2),
            Real3D::new(0.3, 0.2, 1.4),
            Real3D::new(-0.5, 1.1, 1.9),
        ]
    }

    #[test]
    fn test_forces_sum_to_zero() {
        let store = chain(skewed());
        let mut list = FixedQuadrupleAngleList::new();
        list.add(HANDLES, 0.4).unwrap();
        let mut interaction = QuadrupleInteraction::new("dihedral", store.clone(), Arc::new(Domain::open()), list)
            .with_potential(DihedralHarmonicUniqueCos::new(2.5, 5.0).unwrap());
        interaction.validate().unwrap();
        interaction.add_forces().unwrap();
        let f = store.vector(Property::Force).unwrap();
        let total = f.as_slice().iter().fold(Real3D::zero(), |acc, f| acc + *f);
        assert!(total.abs() < 1e-12);
        assert!(f[ParticleHandle(0)].abs() > 0.0);
        drop(f);
        assert!(interaction.compute_energy(&SingleWorker).unwrap() > 0.0);
        assert_eq!(interaction.max_cutoff(), 5.0);
    }

    #[test]
    fn test_virial_of_angle_potential() {
        let store = chain(skewed());
        let mut list = FixedQuadrupleAngleList::new();
        list.add(HANDLES, 0.4).unwrap();
        let interaction = QuadrupleInteraction::new("dihedral", store, Arc::new(Domain::open()), list)
            .with_potential(DihedralHarmonicUniqueCos::new(2.5, 5.0).unwrap());
        // The energy only depends on the angle, which is scale invariant
        let virial = interaction.compute_virial(&SingleWorker).unwrap();
        assert!(virial.abs() < 1e-10);
        // ... and rotation invariant
        let tensor = interaction.compute_virial_tensor(&SingleWorker).unwrap();
        assert!(tensor.trace().abs() < 1e-10);
        assert!((tensor - tensor.transpose()).max_abs() < 1e-10);
        assert!(tensor.max_abs() > 1e-3);
    }

    #[test]
    fn test_missing_angle() {
        struct Unlabeled;
        impl QuadrupleSet for Unlabeled {
            fn for_each<O: crate::traversal::QuadrupleOperation + ?Sized>(&self, op: &mut O) {
                op.visit(HANDLES);
            }
            fn len(&self) -> usize {
                1
            }
        }
        impl AngleProvider for Unlabeled {
            fn get_angle(&self, _: [ParticleHandle; 4]) -> Option<f64> {
                None
            }
        }
        let store = chain(skewed());
        let mut interaction = QuadrupleInteraction::new("dihedral", store, Arc::new(Domain::open()), Unlabeled)
            .with_potential(DihedralHarmonicUniqueCos::new(1.0, 5.0).unwrap());
        assert!(interaction.add_forces().is_err());
        assert!(interaction.compute_energy(&SingleWorker).is_err());
    }

    #[test]
    fn test_missing_angle_on_one_worker() {
        struct RankAngles(Option<f64>);
        impl QuadrupleSet for RankAngles {
            fn for_each<O: crate::traversal::QuadrupleOperation + ?Sized>(&self, op: &mut O) {
                op.visit(HANDLES);
            }
            fn len(&self) -> usize {
                1
            }
        }
        impl AngleProvider for RankAngles {
            fn get_angle(&self, _: [ParticleHandle; 4]) -> Option<f64> {
                self.0
            }
        }
        // Rank 1 fails locally, rank 0 must still get through the reduction
        let results = ThreadGroup::run(2, |comm| {
            let angles = RankAngles(if comm.rank() == 0 { Some(0.3) } else { None });
            let interaction = QuadrupleInteraction::new("dihedral", chain(skewed()), Arc::new(Domain::open()), angles)
                .with_potential(DihedralHarmonicUniqueCos::new(1.0, 5.0).unwrap());
            let energy = interaction.compute_energy(&comm).map_err(|e| e.to_string());
            let virial = interaction.compute_virial(&comm);
            (energy, virial.is_err())
        }).unwrap();
        assert_eq!(results[0].0, Err("Local computation failed on 1 other worker(s)".to_string()));
        assert!(results[1].0.as_ref().unwrap_err().contains("no reference angle"));
        assert!(results.iter().all(|(_, virial_failed)| *virial_failed));
    }
}
