//! Three-component real vector used for positions, velocities and forces

use std::ops::{Add, AddAssign, Div, Index, IndexMut, Mul, Neg, Sub, SubAssign};

use bytemuck::{Pod, Zeroable};

/// Cartesian 3d vector of doubles
///
/// The layout is identical to `[f64; 3]`, so slices of `Real3D` can be cast
/// from and to raw `f64` buffers.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Real3D(pub [f64; 3]);

impl Real3D {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self([x, y, z])
    }

    pub const fn zero() -> Self {
        Self([0.0; 3])
    }

    pub fn x(&self) -> f64 { self.0[0] }
    pub fn y(&self) -> f64 { self.0[1] }
    pub fn z(&self) -> f64 { self.0[2] }

    pub fn dot(&self, other: &Real3D) -> f64 {
        self.0[0] * other.0[0] + self.0[1] * other.0[1] + self.0[2] * other.0[2]
    }

    pub fn cross(&self, other: &Real3D) -> Real3D {
        Real3D::new(
            self.0[1] * other.0[2] - self.0[2] * other.0[1],
            self.0[2] * other.0[0] - self.0[0] * other.0[2],
            self.0[0] * other.0[1] - self.0[1] * other.0[0],
        )
    }

    /// Squared euclidean length
    pub fn sqr(&self) -> f64 {
        self.dot(self)
    }

    /// Euclidean length
    pub fn abs(&self) -> f64 {
        self.sqr().sqrt()
    }
}

impl Index<usize> for Real3D {
    type Output = f64;

    fn index(&self, i: usize) -> &f64 {
        &self.0[i]
    }
}

impl IndexMut<usize> for Real3D {
    fn index_mut(&mut self, i: usize) -> &mut f64 {
        &mut self.0[i]
    }
}

impl Add for Real3D {
    type Output = Real3D;

    fn add(self, rhs: Real3D) -> Real3D {
        Real3D::new(self.0[0] + rhs.0[0], self.0[1] + rhs.0[1], self.0[2] + rhs.0[2])
    }
}

impl Sub for Real3D {
    type Output = Real3D;

    fn sub(self, rhs: Real3D) -> Real3D {
        Real3D::new(self.0[0] - rhs.0[0], self.0[1] - rhs.0[1], self.0[2] - rhs.0[2])
    }
}

impl Neg for Real3D {
    type Output = Real3D;

    fn neg(self) -> Real3D {
        Real3D::new(-self.0[0], -self.0[1], -self.0[2])
    }
}

impl Mul<f64> for Real3D {
    type Output = Real3D;

    fn mul(self, rhs: f64) -> Real3D {
        Real3D::new(self.0[0] * rhs, self.0[1] * rhs, self.0[2] * rhs)
    }
}

impl Div<f64> for Real3D {
    type Output = Real3D;

    fn div(self, rhs: f64) -> Real3D {
        Real3D::new(self.0[0] / rhs, self.0[1] / rhs, self.0[2] / rhs)
    }
}

impl AddAssign for Real3D {
    fn add_assign(&mut self, rhs: Real3D) {
        for k in 0..3 {
            self.0[k] += rhs.0[k];
        }
    }
}

impl SubAssign for Real3D {
    fn sub_assign(&mut self, rhs: Real3D) {
        for k in 0..3 {
            self.0[k] -= rhs.0[k];
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_cross_is_right_handed() {
        let x = Real3D::new(1.0, 0.0, 0.0);
        let y = Real3D::new(0.0, 1.0, 0.0);
        assert_eq!(x.cross(&y), Real3D::new(0.0, 0.0, 1.0));
        assert_eq!(y.cross(&x), Real3D::new(0.0, 0.0, -1.0));
    }

    #[test]
    fn test_cast_from_f64_slice() {
        let raw = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let vectors: &[Real3D] = bytemuck::cast_slice(&raw);
        assert_eq!(vectors.len(), 2);
        assert_eq!(vectors[1], Real3D::new(4.0, 5.0, 6.0));
        assert_eq!(vectors[1].sqr(), 77.0);
    }
}
