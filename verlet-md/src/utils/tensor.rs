//! General 3x3 tensor (used for virial tensors)

use std::ops::{Add, AddAssign, Index, IndexMut, Sub};

use bytemuck::{Pod, Zeroable};

use super::Real3D;

/// Row-major 3x3 tensor of doubles
///
/// Virial tensors are symmetric in the physical sense, but no symmetry is
/// assumed or enforced here.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Tensor(pub [[f64; 3]; 3]);

impl Tensor {
    pub const fn zero() -> Self {
        Self([[0.0; 3]; 3])
    }

    /// Outer product `a ⊗ b`, i.e. `T[i][j] = a[i] * b[j]`
    pub fn outer(a: &Real3D, b: &Real3D) -> Self {
        let mut t = Self::zero();
        for i in 0..3 {
            for j in 0..3 {
                t.0[i][j] = a[i] * b[j];
            }
        }
        t
    }

    pub fn trace(&self) -> f64 {
        self.0[0][0] + self.0[1][1] + self.0[2][2]
    }

    pub fn transpose(&self) -> Self {
        let mut t = Self::zero();
        for i in 0..3 {
            for j in 0..3 {
                t.0[i][j] = self.0[j][i];
            }
        }
        t
    }

    /// Largest absolute component
    pub fn max_abs(&self) -> f64 {
        self.as_slice().iter().fold(0.0, |acc: f64, x| acc.max(x.abs()))
    }

    /// View of the nine components in row-major order
    pub fn as_slice(&self) -> &[f64] {
        bytemuck::cast_slice(&self.0)
    }

    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        bytemuck::cast_slice_mut(&mut self.0)
    }
}

impl Index<(usize, usize)> for Tensor {
    type Output = f64;

    fn index(&self, (i, j): (usize, usize)) -> &f64 {
        &self.0[i][j]
    }
}

impl IndexMut<(usize, usize)> for Tensor {
    fn index_mut(&mut self, (i, j): (usize, usize)) -> &mut f64 {
        &mut self.0[i][j]
    }
}

impl Add for Tensor {
    type Output = Tensor;

    fn add(mut self, rhs: Tensor) -> Tensor {
        self += rhs;
        self
    }
}

impl Sub for Tensor {
    type Output = Tensor;

    fn sub(mut self, rhs: Tensor) -> Tensor {
        for (x, y) in self.as_mut_slice().iter_mut().zip(rhs.as_slice()) {
            *x -= y;
        }
        self
    }
}

impl AddAssign for Tensor {
    fn add_assign(&mut self, rhs: Tensor) {
        for (x, y) in self.as_mut_slice().iter_mut().zip(rhs.as_slice()) {
            *x += y;
        }
    }
}
