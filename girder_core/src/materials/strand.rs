//! # Prestressing Steel
//!
//! Strand and tendon stress-strain, relaxation and bond properties.
//!
//! The stress-strain relationship is the power formula
//!
//! ```text
//! fps = εps·Ep·[ Q + (1 − Q) / (1 + (Ep·εps / (K·fpy))^R)^(1/R) ] ≤ fpu
//! ```
//!
//! with Q = 0.031, K = 1.0435 and R = 7.36, which reproduces Mattock's
//! Grade 270 curve `fps = εps·[887 + 27613/(1 + (112.4·εps)^7.36)^(1/7.36)]`.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Relaxation behavior of the strand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StrandType {
    #[default]
    LowRelaxation,
    StressRelieved,
}

impl StrandType {
    /// Denominator K of the intrinsic relaxation expression
    fn relaxation_constant(&self) -> f64 {
        match self {
            StrandType::LowRelaxation => 45.0,
            StrandType::StressRelieved => 10.0,
        }
    }
}

/// Prestressing strand material.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrandMaterial {
    #[serde(default)]
    pub strand_type: StrandType,
    pub fpu_ksi: f64,
    pub fpy_ksi: f64,
    pub ep_ksi: f64,
    pub diameter_in: f64,
    /// Nominal area of one strand
    pub area_in2: f64,
    /// Minimum elongation at rupture
    #[serde(default = "default_min_elongation")]
    pub min_elongation: f64,
}

fn default_min_elongation() -> f64 {
    0.035
}

impl Default for StrandMaterial {
    fn default() -> Self {
        StrandMaterial::grade_270(0.6)
    }
}

impl fmt::Display for StrandMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}\" Grade {:.0} {:?}", self.diameter_in, self.fpu_ksi, self.strand_type)
    }
}

impl StrandMaterial {
    const Q: f64 = 0.031;
    const K: f64 = 1.0435;
    const R: f64 = 7.36;

    /// Grade 270 low-relaxation seven-wire strand.
    pub fn grade_270(diameter_in: f64) -> Self {
        let area_in2 = if (diameter_in - 0.5).abs() < 1e-6 {
            0.153
        } else if (diameter_in - 0.6).abs() < 1e-6 {
            0.217
        } else if (diameter_in - 0.7).abs() < 1e-6 {
            0.294
        } else {
            0.7854 * diameter_in * diameter_in * 0.725
        };
        StrandMaterial {
            strand_type: StrandType::LowRelaxation,
            fpu_ksi: 270.0,
            fpy_ksi: 243.0,
            ep_ksi: 28500.0,
            diameter_in,
            area_in2,
            min_elongation: default_min_elongation(),
        }
    }

    /// Stress at total strain `strain` (tension positive).
    pub fn stress(&self, strain: f64) -> f64 {
        if strain <= 0.0 {
            return (strain * self.ep_ksi).max(-self.fpy_ksi);
        }
        let x = self.ep_ksi * strain / (Self::K * self.fpy_ksi);
        let f = strain * self.ep_ksi * (Self::Q + (1.0 - Self::Q) / (1.0 + x.powf(Self::R)).powf(1.0 / Self::R));
        f.min(self.fpu_ksi)
    }

    /// Strain at fpy on the elastic line.
    pub fn yield_strain(&self) -> f64 {
        self.fpy_ksi / self.ep_ksi
    }

    /// Intrinsic relaxation between `t1_days` and `t2_days` after stressing
    /// for a strand stressed to `fpi_ksi`.
    pub fn relaxation(&self, fpi_ksi: f64, t1_days: f64, t2_days: f64) -> f64 {
        let ratio = fpi_ksi / self.fpy_ksi;
        if ratio <= 0.55 || t2_days <= t1_days {
            return 0.0;
        }
        let hour = 1.0 / 24.0;
        let t1 = t1_days.max(hour);
        let t2 = t2_days.max(hour);
        fpi_ksi * ((24.0 * t2).log10() - (24.0 * t1).log10()) / self.strand_type.relaxation_constant() * (ratio - 0.55)
    }

    /// Transfer length, 60·db.
    pub fn transfer_length_in(&self) -> f64 {
        60.0 * self.diameter_in
    }

    /// Development length ld = κ·(fps − 2/3·fpe)·db.
    pub fn development_length_in(&self, fps_ksi: f64, fpe_ksi: f64, kappa: f64) -> f64 {
        (kappa * (fps_ksi - 2.0 / 3.0 * fpe_ksi) * self.diameter_in).max(self.transfer_length_in())
    }
}
