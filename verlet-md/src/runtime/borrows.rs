//! Structs representing borrows into the internal particle data

use std::{ops::{Index, IndexMut}, sync::{RwLockReadGuard, RwLockWriteGuard}};

use aligned_box::AlignedBox;

use crate::{runtime::ParticleHandle, utils::Real3D};

/// Immutable borrow of a vector property of all particles
pub struct VectorProperty<'a> {
    /// Name of the borrowed property (for diagnostics)
    name: &'a str,
    /// The borrowed raw data
    data: RwLockReadGuard<'a, AlignedBox<[u8]>>,
    /// Number of bytes in use (allocations are never empty)
    len: usize
}

/// Mutable borrow of a vector property of all particles
pub struct VectorPropertyMut<'a> {
    name: &'a str,
    data: RwLockWriteGuard<'a, AlignedBox<[u8]>>,
    len: usize
}

/// Immutable borrow of a scalar property of all particles
pub struct ScalarProperty<'a> {
    name: &'a str,
    data: RwLockReadGuard<'a, AlignedBox<[u8]>>,
    len: usize
}

/// Mutable borrow of a scalar property of all particles
pub struct ScalarPropertyMut<'a> {
    name: &'a str,
    data: RwLockWriteGuard<'a, AlignedBox<[u8]>>,
    len: usize
}

impl<'a> VectorProperty<'a> {
    pub(crate) fn new(name: &'a str, data: RwLockReadGuard<'a, AlignedBox<[u8]>>, len: usize) -> Self {
        Self { name, data, len }
    }

    pub fn name(&self) -> &str {
        self.name
    }

    pub fn as_slice(&self) -> &[Real3D] {
        bytemuck::cast_slice::<u8, Real3D>(&self.data[..self.len])
    }

    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<'a> VectorPropertyMut<'a> {
    pub(crate) fn new(name: &'a str, data: RwLockWriteGuard<'a, AlignedBox<[u8]>>, len: usize) -> Self {
        Self { name, data, len }
    }

    pub fn name(&self) -> &str {
        self.name
    }

    pub fn as_slice(&self) -> &[Real3D] {
        bytemuck::cast_slice::<u8, Real3D>(&self.data[..self.len])
    }

    pub fn as_mut_slice(&mut self) -> &mut [Real3D] {
        bytemuck::cast_slice_mut::<u8, Real3D>(&mut self.data[..self.len])
    }

    /// Interpret the data as a flat slice of doubles (x0, y0, z0, x1, ...)
    pub fn as_f64_slice(&mut self) -> &mut [f64] {
        bytemuck::cast_slice_mut::<u8, f64>(&mut self.data[..self.len])
    }

    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<'a> ScalarProperty<'a> {
    pub(crate) fn new(name: &'a str, data: RwLockReadGuard<'a, AlignedBox<[u8]>>, len: usize) -> Self {
        Self { name, data, len }
    }

    pub fn name(&self) -> &str {
        self.name
    }

    pub fn as_slice(&self) -> &[f64] {
        bytemuck::cast_slice::<u8, f64>(&self.data[..self.len])
    }
}

impl<'a> ScalarPropertyMut<'a> {
    pub(crate) fn new(name: &'a str, data: RwLockWriteGuard<'a, AlignedBox<[u8]>>, len: usize) -> Self {
        Self { name, data, len }
    }

    pub fn name(&self) -> &str {
        self.name
    }

    pub fn as_slice(&self) -> &[f64] {
        bytemuck::cast_slice::<u8, f64>(&self.data[..self.len])
    }

    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        bytemuck::cast_slice_mut::<u8, f64>(&mut self.data[..self.len])
    }
}

impl Index<ParticleHandle> for VectorProperty<'_> {
    type Output = Real3D;

    #[inline(always)]
    fn index(&self, handle: ParticleHandle) -> &Real3D {
        &self.as_slice()[handle.index()]
    }
}

impl Index<ParticleHandle> for VectorPropertyMut<'_> {
    type Output = Real3D;

    #[inline(always)]
    fn index(&self, handle: ParticleHandle) -> &Real3D {
        &self.as_slice()[handle.index()]
    }
}

impl IndexMut<ParticleHandle> for VectorPropertyMut<'_> {
    #[inline(always)]
    fn index_mut(&mut self, handle: ParticleHandle) -> &mut Real3D {
        &mut self.as_mut_slice()[handle.index()]
    }
}

impl Index<ParticleHandle> for ScalarProperty<'_> {
    type Output = f64;

    #[inline(always)]
    fn index(&self, handle: ParticleHandle) -> &f64 {
        &self.as_slice()[handle.index()]
    }
}

impl Index<ParticleHandle> for ScalarPropertyMut<'_> {
    type Output = f64;

    #[inline(always)]
    fn index(&self, handle: ParticleHandle) -> &f64 {
        &self.as_slice()[handle.index()]
    }
}

impl IndexMut<ParticleHandle> for ScalarPropertyMut<'_> {
    #[inline(always)]
    fn index_mut(&mut self, handle: ParticleHandle) -> &mut f64 {
        &mut self.as_mut_slice()[handle.index()]
    }
}
