//! The per-particle halves of a velocity Verlet step

use anyhow::{Result, anyhow};

use crate::{
    runtime::{ParticleHandle, ParticleStore, Property, ScalarProperty, VectorProperty, VectorPropertyMut},
    traversal::{ParticleOperation, ParticleSet},
};

/// Optional per-particle masses (unit mass if the store has none)
pub(crate) struct Masses<'a>(Option<ScalarProperty<'a>>);

impl<'a> Masses<'a> {
    pub(crate) fn borrow(store: &'a ParticleStore) -> Result<Self> {
        if store.has_property(Property::Mass.as_ref()) {
            Ok(Self(Some(store.scalar(Property::Mass)?)))
        }
        else {
            Ok(Self(None))
        }
    }

    #[inline(always)]
    pub(crate) fn get(&self, p: ParticleHandle) -> f64 {
        self.0.as_ref().map_or(1.0, |m| m[p])
    }

    /// Reject masses that would turn forces into infinite or NaN accelerations
    pub(crate) fn check<S: ParticleSet>(&self, particles: &S) -> Result<()> {
        if self.0.is_none() {
            return Ok(());
        }
        let mut invalid = None;
        particles.for_each(&mut |p: ParticleHandle| {
            let m = self.get(p);
            if !(m > 0.0 && m.is_finite()) {
                invalid.get_or_insert((p, m));
            }
        });
        match invalid {
            Some((p, m)) => Err(anyhow!("Particle {} has invalid mass {}", p.index(), m)),
            None => Ok(())
        }
    }
}

/// Step A: half kick `v += F/(2m) dt` and drift `x += v dt`, then `F = 0`
///
/// The position update equals `x += v dt + F/(2m) dt²` with the old velocity.
pub(crate) struct Drift<'a> {
    x: VectorPropertyMut<'a>,
    v: VectorPropertyMut<'a>,
    f: VectorPropertyMut<'a>,
    m: Masses<'a>,
    dt: f64
}

impl<'a> Drift<'a> {
    pub(crate) fn borrow(store: &'a ParticleStore, dt: f64) -> Result<Self> {
        Ok(Self {
            x: store.vector_mut(Property::Position)?,
            v: store.vector_mut(Property::Velocity)?,
            f: store.vector_mut(Property::Force)?,
            m: Masses::borrow(store)?,
            dt
        })
    }
}

impl ParticleOperation for Drift<'_> {
    #[inline(always)]
    fn visit(&mut self, p: ParticleHandle) {
        let half_dt = 0.5 * self.dt / self.m.get(p);
        self.v[p] += self.f[p] * half_dt;
        self.x[p] += self.v[p] * self.dt;
        self.f[p] = Default::default();
    }
}

/// Step B: `v += F/(2m) dt`
pub(crate) struct Kick<'a> {
    v: VectorPropertyMut<'a>,
    f: VectorProperty<'a>,
    m: Masses<'a>,
    half_dt: f64
}

impl<'a> Kick<'a> {
    pub(crate) fn borrow(store: &'a ParticleStore, dt: f64) -> Result<Self> {
        Ok(Self {
            v: store.vector_mut(Property::Velocity)?,
            f: store.vector(Property::Force)?,
            m: Masses::borrow(store)?,
            half_dt: 0.5 * dt
        })
    }
}

impl ParticleOperation for Kick<'_> {
    #[inline(always)]
    fn visit(&mut self, p: ParticleHandle) {
        let factor = self.half_dt / self.m.get(p);
        self.v[p] += self.f[p] * factor;
    }
}
