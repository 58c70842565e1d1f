//! Mild reinforcement, elastic-perfectly-plastic.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RebarMaterial {
    pub fy_ksi: f64,
    pub fu_ksi: f64,
    pub es_ksi: f64,
    /// Minimum elongation at rupture
    pub min_elongation: f64,
}

impl Default for RebarMaterial {
    /// ASTM A615 Grade 60
    fn default() -> Self {
        RebarMaterial {
            fy_ksi: 60.0,
            fu_ksi: 90.0,
            es_ksi: 29000.0,
            min_elongation: 0.09,
        }
    }
}

impl RebarMaterial {
    pub fn stress(&self, strain: f64) -> f64 {
        (strain * self.es_ksi).clamp(-self.fy_ksi, self.fy_ksi)
    }

    pub fn yield_strain(&self) -> f64 {
        self.fy_ksi / self.es_ksi
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_elastic_plastic() {
        let bar = RebarMaterial::default();
        assert!((bar.stress(0.001) - 29.0).abs() < 1e-9);
        assert_eq!(bar.stress(0.01), 60.0);
        assert_eq!(bar.stress(-0.01), -60.0);
        assert!((bar.yield_strain() - 0.002069).abs() < 1e-5);
    }
}
