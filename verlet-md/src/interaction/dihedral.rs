//! Dihedral angle geometry and dihedral potentials

use anyhow::{Result, anyhow};

use crate::utils::Real3D;

use super::DihedralPotential;

/// Dihedral angle of the bond vectors `b1 = r21`, `b2 = r32`, `b3 = r43` in `(-π, π]`
///
/// The angle is measured between the planes spanned by `(b1, b2)` and
/// `(b2, b3)` (IUPAC convention, a planar trans configuration gives ±π).
/// Collinear bonds yield an angle of 0.
pub fn dihedral_angle(r21: &Real3D, r32: &Real3D, r43: &Real3D) -> f64 {
    let m = r21.cross(r32);
    let n = r32.cross(r43);
    f64::atan2(r32.abs() * r21.dot(&n), m.dot(&n))
}

/// Gradients of the dihedral angle with respect to the four positions
///
/// Returns `None` if the angle is undefined (collinear bonds or coinciding
/// particles).
pub fn dihedral_gradients(r21: &Real3D, r32: &Real3D, r43: &Real3D) -> Option<[Real3D; 4]> {
    let m = r21.cross(r32);
    let n = r32.cross(r43);
    let m_sqr = m.sqr();
    let n_sqr = n.sqr();
    let b2_sqr = r32.sqr();
    if !(m_sqr > 0.0 && n_sqr > 0.0 && b2_sqr > 0.0) {
        return None;
    }
    let b2 = b2_sqr.sqrt();
    let d1 = m * (-b2 / m_sqr);
    let d4 = n * (b2 / n_sqr);
    let d2 = d1 * (-r21.dot(r32) / b2_sqr - 1.0) + d4 * (r43.dot(r32) / b2_sqr);
    let d3 = -(d1 + d2 + d4);
    Some([d1, d2, d3, d4])
}

/// Harmonic potential in the cosine of the dihedral angle, `K (cos φ - cos φ₀)²`
///
/// `φ₀` is the reference angle of the quadruple. The cutoff only enters the
/// maximum interaction range of the binding (bonded quadruples are always
/// evaluated).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DihedralHarmonicUniqueCos {
    k: f64,
    cutoff: f64
}

impl DihedralHarmonicUniqueCos {
    pub fn new(k: f64, cutoff: f64) -> Result<Self> {
        let mut potential = Self { k: 0.0, cutoff: 0.0 };
        potential.set(k, cutoff)?;
        Ok(potential)
    }

    pub fn set(&mut self, k: f64, cutoff: f64) -> Result<()> {
        if !k.is_finite() {
            return Err(anyhow!("Dihedral force constant must be finite (got {})", k));
        }
        if !(cutoff >= 0.0) {
            return Err(anyhow!("Dihedral cutoff must be non-negative (got {})", cutoff));
        }
        self.k = k;
        self.cutoff = cutoff;
        log::debug!("Dihedral parameters: K = {}, cutoff = {}", k, cutoff);
        Ok(())
    }

    pub fn k(&self) -> f64 {
        self.k
    }

    /// Energy as a function of the current and the reference angle
    pub fn energy_of_angle(&self, phi: f64, phi0: f64) -> f64 {
        let diff = phi.cos() - phi0.cos();
        self.k * diff * diff
    }

    /// Derivative of the energy with respect to the current angle
    pub fn energy_derivative(&self, phi: f64, phi0: f64) -> f64 {
        -2.0 * self.k * (phi.cos() - phi0.cos()) * phi.sin()
    }
}

impl DihedralPotential for DihedralHarmonicUniqueCos {
    fn energy(&self, r21: &Real3D, r32: &Real3D, r43: &Real3D, angle: f64) -> f64 {
        self.energy_of_angle(dihedral_angle(r21, r32, r43), angle)
    }

    fn forces(&self, r21: &Real3D, r32: &Real3D, r43: &Real3D, angle: f64) -> [Real3D; 4] {
        match dihedral_gradients(r21, r32, r43) {
            Some(gradients) => {
                let de_dphi = self.energy_derivative(dihedral_angle(r21, r32, r43), angle);
                gradients.map(|g| g * (-de_dphi))
            }
            None => [Real3D::zero(); 4]
        }
    }

    fn cutoff(&self) -> f64 {
        self.cutoff
    }

    fn validate(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use std::f64::consts::PI;

    use super::*;

    fn bonds(x: &[Real3D; 4]) -> (Real3D, Real3D, Real3D) {
        (x[1] - x[0], x[2] - x[1], x[3] - x[2])
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
    fn test_angle_convention() {
        // cis
        let cis = [Real3D::new(1.0, 0.0, 0.0), Real3D::zero(), Real3D::new(0.0, 0.0, 1.0), Real3D::new(1.0, 0.0, 1.0)];
        let (r21, r32, r43) = bonds(&cis);
        assert!(dihedral_angle(&r21, &r32, &r43).abs() < 1e-12);
        // trans
        let trans = [Real3D::new(1.0, 0.0, 0.0), Real3D::zero(), Real3D::new(0.0, 0.0, 1.0), Real3D::new(-1.0, 0.0, 1.0)];
        let (r21, r32, r43) = bonds(&trans);
        assert!((dihedral_angle(&r21, &r32, &r43).abs() - PI).abs() < 1e-12);
        // Right-handed rotation of the last bond about b2 gives a positive angle
        let gauche = [Real3D::new(1.0, 0.0, 0.0), Real3D::zero(), Real3D::new(0.0, 0.0, 1.0), Real3D::new(0.0, 1.0, 1.0)];
        let (r21, r32, r43) = bonds(&gauche);
        let phi = dihedral_angle(&r21, &r32, &r43);
        assert!((phi - 0.5 * PI).abs() < 1e-12);
    }

    #[test]
    fn test_gradients_match_finite_differences() {
        let x = skewed();
        let (r21, r32, r43) = bonds(&x);
        let gradients = dihedral_gradients(&r21, &r32, &r43).unwrap();
        let h = 1e-6;
        for p in 0..4 {
            for k in 0..3 {
                let mut plus = x;
                let mut minus = x;
                plus[p][k] += h;
                minus[p][k] -= h;
                let (a21, a32, a43) = bonds(&plus);
                let (b21, b32, b43) = bonds(&minus);
                let numeric = (dihedral_angle(&a21, &a32, &a43) - dihedral_angle(&b21, &b32, &b43)) / (2.0 * h);
                assert!((gradients[p][k] - numeric).abs() < 1e-6, "particle {} component {}: {} vs {}",
                    p, k, gradients[p][k], numeric);
            }
        }
    }

    #[test]
    fn test_forces_are_negative_gradient() {
        let potential = DihedralHarmonicUniqueCos::new(2.5, 10.0).unwrap();
        let x = skewed();
        let phi0 = 0.4;
        let (r21, r32, r43) = bonds(&x);
        let forces = potential.forces(&r21, &r32, &r43, phi0);
        let h = 1e-6;
        for p in 0..4 {
            for k in 0..3 {
                let mut plus = x;
                let mut minus = x;
                plus[p][k] += h;
                minus[p][k] -= h;
                let (a21, a32, a43) = bonds(&plus);
                let (b21, b32, b43) = bonds(&minus);
                let numeric = -(potential.energy(&a21, &a32, &a43, phi0) - potential.energy(&b21, &b32, &b43, phi0)) / (2.0 * h);
                assert!((forces[p][k] - numeric).abs() < 1e-6);
            }
        }
        let total = forces.iter().fold(Real3D::zero(), |acc, f| acc + *f);
        assert!(total.abs() < 1e-12);
    }

    #[test]
    fn test_collinear_has_no_force() {
        let potential = DihedralHarmonicUniqueCos::new(1.0, 10.0).unwrap();
        let r = Real3D::new(0.0, 0.0, 1.0);
        assert!(dihedral_gradients(&r, &r, &Real3D::new(1.0, 0.0, 0.0)).is_none());
        assert_eq!(potential.forces(&r, &r, &r, 1.0), [Real3D::zero(); 4]);
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(DihedralHarmonicUniqueCos::new(f64::NAN, 1.0).is_err());
        assert!(DihedralHarmonicUniqueCos::new(1.0, -1.0).is_err());
        assert!(DihedralHarmonicUniqueCos::new(1.0, f64::INFINITY).is_ok());
    }
}
