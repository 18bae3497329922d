//! 12-6 Lennard-Jones potential

use anyhow::{Result, anyhow};

use crate::utils::Real3D;

use super::PairPotential;

/// Lennard-Jones potential `4ε((σ/r)¹² - (σ/r)⁶)`, truncated (not shifted) at the cutoff
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LennardJones {
    epsilon: f64,
    sigma: f64,
    cutoff: f64,
    /// Cached square of the cutoff
    cutoff_sqr: f64
}

impl LennardJones {
    pub fn new(epsilon: f64, sigma: f64, cutoff: f64) -> Result<Self> {
        let mut lj = Self { epsilon: 0.0, sigma: 1.0, cutoff: 0.0, cutoff_sqr: 0.0 };
        lj.set(epsilon, sigma, cutoff)?;
        Ok(lj)
    }

    /// Replace all parameters (the old ones are kept if the new ones are invalid)
    pub fn set(&mut self, epsilon: f64, sigma: f64, cutoff: f64) -> Result<()> {
        if !epsilon.is_finite() {
            return Err(anyhow!("Lennard-Jones epsilon must be finite (got {})", epsilon));
        }
        if !(sigma > 0.0) || !sigma.is_finite() {
            return Err(anyhow!("Lennard-Jones sigma must be positive and finite (got {})", sigma));
        }
        if !(cutoff >= 0.0) || !cutoff.is_finite() {
            return Err(anyhow!("Lennard-Jones cutoff must be non-negative and finite (got {})", cutoff));
        }
        self.epsilon = epsilon;
        self.sigma = sigma;
        self.cutoff = cutoff;
        self.cutoff_sqr = cutoff * cutoff;
        log::debug!("Lennard-Jones parameters: epsilon = {}, sigma = {}, cutoff = {}", epsilon, sigma, cutoff);
        Ok(())
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    /// Distance of the potential minimum (`2^(1/6) σ`)
    pub fn minimum_distance(&self) -> f64 {
        2f64.powf(1.0 / 6.0) * self.sigma
    }
}

impl PairPotential for LennardJones {
    #[inline]
    fn energy_sqr(&self, dist_sqr: f64) -> f64 {
        if dist_sqr < self.cutoff_sqr {
            let frac2 = self.sigma * self.sigma / dist_sqr;
            let frac6 = frac2 * frac2 * frac2;
            4.0 * self.epsilon * (frac6 * frac6 - frac6)
        }
        else {
            0.0
        }
    }

    #[inline]
    fn force(&self, dist: &Real3D) -> Real3D {
        let dist_sqr = dist.sqr();
        if dist_sqr < self.cutoff_sqr {
            let frac2 = self.sigma * self.sigma / dist_sqr;
            let frac6 = frac2 * frac2 * frac2;
            let ffactor = 48.0 * self.epsilon * (frac6 * frac6 - 0.5 * frac6) / dist_sqr;
            log::trace!("Lennard-Jones force at distance {}: factor {}", dist_sqr.sqrt(), ffactor);
            *dist * ffactor
        }
        else {
            Real3D::zero()
        }
    }

    fn cutoff(&self) -> f64 {
        self.cutoff
    }

    fn cutoff_sqr(&self) -> f64 {
        self.cutoff_sqr
    }

    fn validate(&self) -> Result<()> {
        if self.cutoff == 0.0 {
            log::warn!("Lennard-Jones cutoff is zero, the potential has no effect");
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_minimum() {
        let lj = LennardJones::new(1.5, 0.8, 3.0).unwrap();
        let r_min = lj.minimum_distance();
        assert!((lj.energy(r_min) + 1.5).abs() < 1e-12);
        assert!(lj.force(&Real3D::new(r_min, 0.0, 0.0)).abs() < 1e-12);
        // Repulsive inside, attractive outside the minimum
        assert!(lj.force(&Real3D::new(0.9 * r_min, 0.0, 0.0)).x() > 0.0);
        assert!(lj.force(&Real3D::new(1.1 * r_min, 0.0, 0.0)).x() < 0.0);
    }

    #[test]
    fn test_force_is_negative_gradient() {
        let lj = LennardJones::new(0.7, 1.3, 4.0).unwrap();
        let h = 1e-6;
        for d in [Real3D::new(1.2, 0.3, -0.4), Real3D::new(-0.9, 1.4, 0.8), Real3D::new(2.5, -1.0, 1.0)] {
            let f = lj.force(&d);
            for k in 0..3 {
                let mut plus = d;
                let mut minus = d;
                plus[k] += h;
                minus[k] -= h;
                let numeric = -(lj.energy_sqr(plus.sqr()) - lj.energy_sqr(minus.sqr())) / (2.0 * h);
                assert!((f[k] - numeric).abs() < 1e-6 * (1.0 + numeric.abs()), "component {}: {} vs {}", k, f[k], numeric);
            }
        }
    }

    #[test]
    fn test_cutoff_boundary() {
        let lj = LennardJones::new(1.0, 1.0, 2.5).unwrap();
        assert_eq!(lj.energy_sqr(6.25), 0.0);
        assert_eq!(lj.force(&Real3D::new(2.5, 0.0, 0.0)), Real3D::zero());
        assert!(lj.energy(2.5 - 1e-9) != 0.0);
        assert!(lj.force(&Real3D::new(2.5 - 1e-9, 0.0, 0.0)).x() != 0.0);
        let no_range = LennardJones::new(1.0, 1.0, 0.0).unwrap();
        assert_eq!(no_range.energy(0.5), 0.0);
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(LennardJones::new(1.0, 0.0, 2.5).is_err());
        assert!(LennardJones::new(1.0, 1.0, -1.0).is_err());
        assert!(LennardJones::new(f64::NAN, 1.0, 2.5).is_err());
        let mut lj = LennardJones::new(1.0, 1.0, 2.5).unwrap();
        assert!(lj.set(1.0, 1.0, f64::INFINITY).is_err());
        assert_eq!(lj.cutoff(), 2.5);
        lj.set(2.0, 1.1, 3.0).unwrap();
        assert_eq!(lj.cutoff_sqr(), 9.0);
    }
}
