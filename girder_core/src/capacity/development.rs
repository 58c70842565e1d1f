//! Strand development at a section.
//!
//! A pretensioned strand embedded less than its development length cannot
//! reach the stress strain compatibility gives it. Its stress is capped at
//! `fps·lpx/ld`, a straight line from zero at the free end to `fps` at the
//! development length.

use serde::{Deserialize, Serialize};

use crate::materials::StrandMaterial;

/// Development check for one strand layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrandDevelopment {
    /// Distance from the nearer free end
    pub embedment_in: f64,
    pub transfer_length_in: f64,
    pub development_length_in: f64,
    pub fps_ksi: f64,
    pub fpe_ksi: f64,
    /// Fraction of `fps` the strand can develop, in [0, 1]
    pub factor: f64,
}

impl StrandDevelopment {
    pub fn new(strand: &StrandMaterial, kappa: f64, embedment_in: f64, fps_ksi: f64, fpe_ksi: f64) -> Self {
        let ld = strand.development_length_in(fps_ksi, fpe_ksi, kappa);
        let factor = if ld > 0.0 { (embedment_in / ld).clamp(0.0, 1.0) } else { 1.0 };
        StrandDevelopment {
            embedment_in,
            transfer_length_in: strand.transfer_length_in(),
            development_length_in: ld,
            fps_ksi,
            fpe_ksi,
            factor,
        }
    }

    pub fn is_reduced(&self) -> bool {
        self.factor < 1.0
    }

    /// Largest stress the strand can carry at the section.
    pub fn stress_cap_ksi(&self) -> f64 {
        self.factor * self.fps_ksi
    }
}

/// Distance from `location_in` to the nearer end of a member of `length_in`.
pub fn embedment(location_in: f64, length_in: f64) -> f64 {
    location_in.min(length_in - location_in).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fully_developed_at_midspan() {
        let strand = StrandMaterial::grade_270(0.6);
        let dev = StrandDevelopment::new(&strand, 1.6, embedment(600.0, 1200.0), 265.0, 160.0);
        assert!(!dev.is_reduced());
        assert_eq!(dev.stress_cap_ksi(), 265.0);
    }

    #[test]
    fn test_linear_reduction_near_end() {
        let strand = StrandMaterial::grade_270(0.6);
        let ld = 1.6 * (265.0 - 2.0 / 3.0 * 160.0) * 0.6;
        let dev = StrandDevelopment::new(&strand, 1.6, 12.0, 265.0, 160.0);
        assert!((dev.development_length_in - ld).abs() < 1e-9);
        assert!(dev.is_reduced());
        assert!((dev.stress_cap_ksi() - 265.0 * 12.0 / ld).abs() < 1e-9);
    }

    #[test]
    fn test_embedment_uses_nearer_end() {
        assert_eq!(embedment(100.0, 1200.0), 100.0);
        assert_eq!(embedment(1150.0, 1200.0), 50.0);
    }
}
