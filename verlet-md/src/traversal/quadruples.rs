//! Static lists of bonded quadruples

use std::collections::HashMap;

use anyhow::{Result, anyhow};

use crate::{
    interaction::dihedral_angle,
    runtime::{BoundaryCondition, ParticleHandle, ParticleStore, Property},
};

use super::{AngleProvider, QuadrupleOperation, QuadrupleSet};

/// Fixed list of quadruples, each carrying the reference angle it was added with
///
/// The list is populated at setup (or topology change) time and is read-only
/// during force evaluation. The handles in the list must stay valid for as
/// long as the list is used; this is not checked.
#[derive(Clone, Debug, Default)]
pub struct FixedQuadrupleAngleList {
    quadruples: Vec<[ParticleHandle; 4]>,
    angles: HashMap<[ParticleHandle; 4], f64>
}

impl FixedQuadrupleAngleList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a quadruple with an explicit reference angle (in radians)
    pub fn add(&mut self, quadruple: [ParticleHandle; 4], angle: f64) -> Result<()> {
        for a in 0..4 {
            for b in (a+1)..4 {
                if quadruple[a] == quadruple[b] {
                    return Err(anyhow!("Quadruple {:?} contains particle {} twice", quadruple, quadruple[a].index()));
                }
            }
        }
        if !angle.is_finite() {
            return Err(anyhow!("Reference angle of quadruple {:?} must be finite (got {})", quadruple, angle));
        }
        if self.angles.contains_key(&quadruple) || self.angles.contains_key(&reversed(quadruple)) {
            return Err(anyhow!("Quadruple {:?} is already in the list", quadruple));
        }
        self.angles.insert(quadruple, angle);
        self.quadruples.push(quadruple);
        Ok(())
    }

    /// Add a quadruple whose reference angle is its current dihedral angle
    ///
    /// Returns the measured angle.
    pub fn add_measured<B: BoundaryCondition + ?Sized>(&mut self, quadruple: [ParticleHandle; 4],
        store: &ParticleStore, bc: &B) -> Result<f64>
    {
        let angle = {
            let x = store.vector(Property::Position)?;
            let r21 = bc.minimum_image(x[quadruple[1]], x[quadruple[0]]);
            let r32 = bc.minimum_image(x[quadruple[2]], x[quadruple[1]]);
            let r43 = bc.minimum_image(x[quadruple[3]], x[quadruple[2]]);
            dihedral_angle(&r21, &r32, &r43)
        };
        self.add(quadruple, angle)?;
        Ok(angle)
    }

    pub fn len(&self) -> usize {
        self.quadruples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quadruples.is_empty()
    }
}

/// The same dihedral read from the other end
fn reversed(quadruple: [ParticleHandle; 4]) -> [ParticleHandle; 4] {
    [quadruple[3], quadruple[2], quadruple[1], quadruple[0]]
}

impl QuadrupleSet for FixedQuadrupleAngleList {
    fn for_each<O: QuadrupleOperation + ?Sized>(&self, op: &mut O) {
        for quadruple in &self.quadruples {
            op.visit(*quadruple);
        }
    }

    fn len(&self) -> usize {
        self.quadruples.len()
    }
}

impl AngleProvider for FixedQuadrupleAngleList {
    fn get_angle(&self, quadruple: [ParticleHandle; 4]) -> Option<f64> {
        self.angles.get(&quadruple)
            .or_else(|| self.angles.get(&reversed(quadruple)))
            .copied()
    }
}

#[cfg(test)]
mod test {
    use std::f64::consts::PI;

    use crate::{runtime::Domain, utils::Real3D};

    use super::*;

    fn handles(ids: [usize; 4]) -> [ParticleHandle; 4] {
        ids.map(ParticleHandle)
    }

    #[test]
    fn test_add_and_lookup() {
        let mut list = FixedQuadrupleAngleList::new();
        list.add(handles([0, 1, 2, 3]), 1.0).unwrap();
        assert!(list.add(handles([3, 2, 1, 0]), 2.0).is_err());
        assert!(list.add(handles([0, 1, 1, 3]), 2.0).is_err());
        assert!(list.add(handles([4, 5, 6, 7]), f64::NAN).is_err());
        assert_eq!(list.get_angle(handles([3, 2, 1, 0])), Some(1.0));
        assert_eq!(list.get_angle(handles([0, 1, 2, 4])), None);
        assert_eq!(QuadrupleSet::len(&list), 1);
    }

    #[test]
    fn test_add_measured_trans() {
        let store = ParticleStore::new(4).unwrap();
        {
            let mut x = store.vector_mut(Property::Position).unwrap();
            x[ParticleHandle(0)] = Real3D::new(1.0, 1.0, 0.0);
            x[ParticleHandle(1)] = Real3D::new(0.0, 0.0, 0.0);
            x[ParticleHandle(2)] = Real3D::new(0.0, 0.0, 1.0);
            x[ParticleHandle(3)] = Real3D::new(-1.0, -1.0, 1.0);
        }
        let mut list = FixedQuadrupleAngleList::new();
        let angle = list.add_measured(handles([0, 1, 2, 3]), &store, &Domain::open()).unwrap();
        assert!((angle.abs() - PI).abs() < 1e-12);
    }
}
