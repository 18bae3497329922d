//! Structs for managing per-particle property data

use anyhow::{Result, anyhow};
use aligned_box::AlignedBox;

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard, TryLockError};

use strum::IntoEnumIterator;

use crate::runtime::{Index, ParticleHandle, Property, PropertyID, PropertyKind};

use super::{ScalarProperty, ScalarPropertyMut, VectorProperty, VectorPropertyMut};

// For now we just enforce 32 byte alignment (enough for AVX2 and older)
const ALIGNMENT: usize = 32;

/// Store (and thus root owner) for all particle data of the local worker
///
/// Every property is guarded by its own lock, so different properties (e.g.
/// positions and forces) can be borrowed at the same time. Borrows never block:
/// a conflicting borrow is reported as an error instead.
pub struct ParticleStore {
    /// Number of particles
    count: usize,
    /// Property data with name resolution
    properties: Index<PropertyID, PropertyData>
}

impl ParticleStore {
    /// Allocate the standard properties (position, velocity, force) for
    /// `count` particles, all initialized to zero
    pub fn new(count: usize) -> Result<Self> {
        Self::create_particles(count, &[Property::Position, Property::Velocity, Property::Force])
    }

    /// Allocate the given standard properties for `count` particles
    pub fn create_particles(count: usize, properties: &[Property]) -> Result<Self> {
        let mut store = Self {
            count,
            properties: Index::new()
        };
        for property in properties {
            store.add_property(property.as_ref(), property.kind())?;
        }
        Ok(store)
    }

    /// Allocate a new (zero-initialized) property
    pub fn add_property(&mut self, name: &str, kind: PropertyKind) -> Result<PropertyID> {
        // Standard names are reserved for their standard shape
        if let Some(standard) = Property::iter().find(|p| p.as_ref() == name) {
            if standard.kind() != kind {
                return Err(anyhow!("Property {} must be of kind {} (got {})", name, standard.kind(), kind));
            }
        }
        let data = PropertyData::new(name, kind, self.count)?;
        self.properties.insert(data, name.to_string())
            .map_err(|_| anyhow!("Property {} has already been allocated", name))
    }

    /// Allocate a scalar property with the same initial value for all particles
    pub fn add_uniform_scalar(&mut self, name: &str, value: f64) -> Result<PropertyID> {
        let property_id = self.add_property(name, PropertyKind::Scalar)?;
        self.scalar_mut(name)?.as_mut_slice().fill(value);
        Ok(property_id)
    }

    /// Get number of particles
    pub fn get_particle_count(&self) -> usize {
        self.count
    }

    /// Handles of all locally stored particles
    pub fn handles(&self) -> impl Iterator<Item = ParticleHandle> {
        (0..self.count).map(ParticleHandle)
    }

    pub fn has_property(&self, name: &str) -> bool {
        self.properties.contains_name(name)
    }

    /// Names of all allocated properties (in no particular order)
    pub fn property_names(&self) -> impl Iterator<Item = &str> {
        self.properties.names()
    }

    /// Get the (approximate) memory used for particle data in bytes
    pub fn get_memory_usage(&self) -> usize {
        self.properties.iter()
            .map(|(_, data)| data.get_memory_usage())
            .sum()
    }

    /// Borrow a vector property immutably
    pub fn vector<S: AsRef<str>>(&self, name: S) -> Result<VectorProperty> {
        let data = self.lookup(name.as_ref(), PropertyKind::Vector)?;
        Ok(VectorProperty::new(&data.name, read_lock(&data.name, &data.values)?, data.len))
    }

    /// Borrow a vector property mutably
    pub fn vector_mut<S: AsRef<str>>(&self, name: S) -> Result<VectorPropertyMut> {
        let data = self.lookup(name.as_ref(), PropertyKind::Vector)?;
        Ok(VectorPropertyMut::new(&data.name, write_lock(&data.name, &data.values)?, data.len))
    }

    /// Borrow a scalar property immutably
    pub fn scalar<S: AsRef<str>>(&self, name: S) -> Result<ScalarProperty> {
        let data = self.lookup(name.as_ref(), PropertyKind::Scalar)?;
        Ok(ScalarProperty::new(&data.name, read_lock(&data.name, &data.values)?, data.len))
    }

    /// Borrow a scalar property mutably
    pub fn scalar_mut<S: AsRef<str>>(&self, name: S) -> Result<ScalarPropertyMut> {
        let data = self.lookup(name.as_ref(), PropertyKind::Scalar)?;
        Ok(ScalarPropertyMut::new(&data.name, write_lock(&data.name, &data.values)?, data.len))
    }

    fn lookup(&self, name: &str, kind: PropertyKind) -> Result<&PropertyData> {
        let (_, data) = self.properties.get_with_name(name)
            .ok_or_else(|| anyhow!("Cannot find property {}", name))?;
        if data.kind != kind {
            return Err(anyhow!("Property {} is a {} property (requested {})", name, data.kind, kind));
        }
        Ok(data)
    }
}

fn read_lock<'a>(name: &str, lock: &'a RwLock<AlignedBox<[u8]>>) -> Result<RwLockReadGuard<'a, AlignedBox<[u8]>>> {
    lock.try_read().map_err(|e| match e {
        TryLockError::WouldBlock => anyhow!("Cannot borrow property {}: it is borrowed mutably", name),
        TryLockError::Poisoned(_) => anyhow!("Property {} is poisoned", name),
    })
}

fn write_lock<'a>(name: &str, lock: &'a RwLock<AlignedBox<[u8]>>) -> Result<RwLockWriteGuard<'a, AlignedBox<[u8]>>> {
    lock.try_write().map_err(|e| match e {
        TryLockError::WouldBlock => anyhow!("Cannot borrow property {} mutably: it is already borrowed", name),
        TryLockError::Poisoned(_) => anyhow!("Property {} is poisoned", name),
    })
}

/// Data for a single property of all particles
pub(crate) struct PropertyData {
    /// Name of the property
    name: String,
    /// Shape of the per-particle data
    kind: PropertyKind,
    /// Data as byte array (cast to doubles on borrow)
    values: RwLock<AlignedBox<[u8]>>,
    /// Number of bytes in use
    len: usize
}

impl PropertyData {
    pub(crate) fn new(name: &str, kind: PropertyKind, count: usize) -> Result<Self> {
        let len = count * kind.width() * std::mem::size_of::<f64>();
        // Zero-sized allocations are not allowed, so empty stores get one aligned block
        let values = AlignedBox::slice_from_value(ALIGNMENT, len.max(ALIGNMENT), 0u8)
            .map_err(|e| anyhow!("Cannot allocate particle property data: {}", e))?;
        Ok(Self {
            name: name.to_string(),
            kind,
            values: RwLock::new(values),
            len
        })
    }

    /// Get allocated memory size in bytes
    pub(crate) fn get_memory_usage(&self) -> usize {
        self.len
    }
}

#[cfg(test)]
mod test {
    use crate::utils::Real3D;

    use super::*;

    #[test]
    fn test_borrow_and_write() {
        let store = ParticleStore::new(3).unwrap();
        {
            let mut x = store.vector_mut(Property::Position).unwrap();
            x[ParticleHandle(1)] = Real3D::new(1.0, 2.0, 3.0);
            x[ParticleHandle(2)] += Real3D::new(0.5, 0.0, 0.0);
        }
        let x = store.vector(Property::Position).unwrap();
        assert_eq!(x[ParticleHandle(1)], Real3D::new(1.0, 2.0, 3.0));
        assert_eq!(x[ParticleHandle(2)], Real3D::new(0.5, 0.0, 0.0));
        assert_eq!(x.len(), 3);
        assert_eq!(x.name(), "position");
        assert_eq!(store.handles().last(), Some(ParticleHandle(2)));
        assert_eq!(store.get_memory_usage(), 3 * 3 * 3 * 8);
    }

    #[test]
    fn test_conflicting_borrows_are_errors() {
        let store = ParticleStore::new(2).unwrap();
        let _f = store.vector_mut(Property::Force).unwrap();
        assert!(store.vector(Property::Force).is_err());
        assert!(store.vector_mut(Property::Force).is_err());
        // Other properties are unaffected
        let _x = store.vector(Property::Position).unwrap();
        let _x2 = store.vector(Property::Position).unwrap();
    }

    #[test]
    fn test_property_kinds() {
        let mut store = ParticleStore::new(4).unwrap();
        assert!(store.scalar(Property::Position).is_err());
        assert!(store.vector("charge").is_err());
        assert!(store.add_property("position", PropertyKind::Vector).is_err());
        assert!(store.add_property("mass", PropertyKind::Vector).is_err());
        store.add_uniform_scalar("mass", 2.5).unwrap();
        assert!(store.scalar(Property::Mass).unwrap().as_slice().iter().all(|m| *m == 2.5));
        assert!(store.has_property("mass"));
        let mut names = store.property_names().collect::<Vec<_>>();
        names.sort();
        assert_eq!(names, vec!["force", "mass", "position", "velocity"]);
    }
}
