//! Structures related to defining a simulation domain

use anyhow::{Result, anyhow};

use crate::utils::Real3D;

/// Boundary condition collaborator: resolves displacements under periodicity
pub trait BoundaryCondition: Send + Sync {
    /// Shortest-image displacement pointing from `b` to `a` (i.e. `a - b` folded)
    fn minimum_image(&self, a: Real3D, b: Real3D) -> Real3D;

    /// Largest cutoff the minimum image convention can represent
    ///
    /// Interactions with cutoffs beyond this length see more than one image
    /// of a particle.
    fn max_minimum_image_cutoff(&self) -> f64 {
        f64::INFINITY
    }
}

#[derive(Clone, Debug)]
pub enum Domain {
    Dim2{x: Axis, y:Axis}, Dim3{x: Axis, y:Axis, z:Axis}
}

impl Domain {
    /// Cubic 3d domain `[0, length)^3` with the same behavior on all axes
    pub fn cube(length: f64, oob: OutOfBoundsBehavior) -> Result<Self> {
        let axis = Axis::new(0.0, length, oob)?;
        Ok(Domain::Dim3 { x: axis.clone(), y: axis.clone(), z: axis })
    }

    /// Unbounded 3d domain (minimum image is the plain difference)
    pub fn open() -> Self {
        let axis = Axis { low: f64::NEG_INFINITY, high: f64::INFINITY, oob: OutOfBoundsBehavior::Open };
        Domain::Dim3 { x: axis.clone(), y: axis.clone(), z: axis }
    }

    /// Axes of the domain (2d domains report no third axis)
    pub fn axes(&self) -> [Option<&Axis>; 3] {
        match self {
            Domain::Dim2 { x, y } => [Some(x), Some(y), None],
            Domain::Dim3 { x, y, z } => [Some(x), Some(y), Some(z)],
        }
    }

    /// Map a position back into the primary box along all periodic axes
    pub fn fold(&self, position: Real3D) -> Real3D {
        let mut folded = position;
        for (k, axis) in self.axes().iter().enumerate() {
            if let Some(axis) = axis {
                folded[k] = axis.fold(position[k]);
            }
        }
        folded
    }
}

impl BoundaryCondition for Domain {
    #[inline(always)]
    fn minimum_image(&self, a: Real3D, b: Real3D) -> Real3D {
        let mut d = a - b;
        for (k, axis) in self.axes().iter().enumerate() {
            if let Some(axis) = axis {
                d[k] = axis.minimum_image(d[k]);
            }
        }
        d
    }

    /// Smallest half box length over all periodic axes (infinite if none is periodic)
    fn max_minimum_image_cutoff(&self) -> f64 {
        self.axes().iter()
            .flatten()
            .filter(|axis| axis.is_periodic())
            .map(|axis| 0.5 * axis.size())
            .fold(f64::INFINITY, f64::min)
    }
}

/// Definition of a single coordinate axis (i.e. bounds and out-of-bounds behavior)
#[derive(Clone, Debug)]
pub struct Axis {
    pub low: f64,
    pub high: f64,
    pub oob: OutOfBoundsBehavior
}

/// Definition of the out-of-bounds behavior
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutOfBoundsBehavior {
    Periodic,
    /// Particles may leave the box, distances are never folded
    Open
}

impl Axis {
    pub fn new(low: f64, high: f64, oob: OutOfBoundsBehavior) -> Result<Self> {
        if !(low < high) {
            return Err(anyhow!("Invalid axis bounds [{}, {}]", low, high));
        }
        if oob == OutOfBoundsBehavior::Periodic && !(high - low).is_finite() {
            return Err(anyhow!("Periodic axis must have finite length (got [{}, {}])", low, high));
        }
        Ok(Self { low, high, oob })
    }

    pub fn size(&self) -> f64 {
        self.high - self.low
    }

    pub fn is_periodic(&self) -> bool {
        self.oob == OutOfBoundsBehavior::Periodic
    }

    #[inline(always)]
    fn minimum_image(&self, dx: f64) -> f64 {
        match self.oob {
            OutOfBoundsBehavior::Periodic => {
                let size = self.size();
                dx - size * (dx / size).round()
            }
            OutOfBoundsBehavior::Open => dx
        }
    }

    fn fold(&self, x: f64) -> f64 {
        match self.oob {
            OutOfBoundsBehavior::Periodic => {
                let size = self.size();
                let folded = self.low + (x - self.low).rem_euclid(size);
                // rem_euclid can round up to exactly `size`
                if folded >= self.high { self.low } else { folded }
            }
            OutOfBoundsBehavior::Open => x
        }
    }
}
