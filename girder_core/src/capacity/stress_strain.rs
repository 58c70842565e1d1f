//! # Material Laws for Strain Compatibility
//!
//! Concrete strain and stress are compression positive; steel strain and
//! stress are tension positive.
//!
//! | Law                   | Compression                         | Tension                                   |
//! |-----------------------|-------------------------------------|-------------------------------------------|
//! | Conventional concrete | Hognestad parabola to εcu = 0.003   | none                                      |
//! | UHPC                  | elastic-plastic at α·f'c, εcu 0.0035 | elastic to γu·ft,cr, hardening to γu·ft,loc at εt,loc, linear decay to zero at 2εt,loc |
//! | Strand / tendon       | elastic                             | power formula                             |
//! | Mild reinforcement    | elastic-plastic                     | elastic-plastic                           |

use serde::{Deserialize, Serialize};

use crate::materials::{ConcreteMaterial, RebarMaterial, StrandMaterial, UhpcTension};

pub const CONVENTIONAL_CRUSHING_STRAIN: f64 = 0.003;
pub const UHPC_CRUSHING_STRAIN: f64 = 0.0035;

/// Intensity of the UHPC compression plateau.
const UHPC_COMPRESSION_ALPHA: f64 = 0.85;

/// Stress-strain law of one concrete part.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "law")]
pub enum ConcreteLaw {
    Conventional { fc_ksi: f64, ec_ksi: f64 },
    Uhpc { fc_ksi: f64, ec_ksi: f64, tension: UhpcTension },
}

impl ConcreteLaw {
    /// Law of `material` at strength `fc_ksi`.
    pub fn for_material(material: &ConcreteMaterial, fc_ksi: f64) -> Self {
        let ec_ksi = material.modulus_for_strength(fc_ksi);
        match material.uhpc {
            Some(tension) if material.concrete_type.is_uhpc() => ConcreteLaw::Uhpc { fc_ksi, ec_ksi, tension },
            _ => ConcreteLaw::Conventional { fc_ksi, ec_ksi },
        }
    }

    pub fn fc_ksi(&self) -> f64 {
        match *self {
            ConcreteLaw::Conventional { fc_ksi, .. } | ConcreteLaw::Uhpc { fc_ksi, .. } => fc_ksi,
        }
    }

    pub fn is_uhpc(&self) -> bool {
        matches!(self, ConcreteLaw::Uhpc { .. })
    }

    pub fn crushing_strain(&self) -> f64 {
        match self {
            ConcreteLaw::Conventional { .. } => CONVENTIONAL_CRUSHING_STRAIN,
            ConcreteLaw::Uhpc { .. } => UHPC_CRUSHING_STRAIN,
        }
    }

    /// Tensile strain at which cracks localize, if the law carries tension.
    pub fn localization_strain(&self) -> Option<f64> {
        match self {
            ConcreteLaw::Conventional { .. } => None,
            ConcreteLaw::Uhpc { tension, .. } => Some(tension.et_loc),
        }
    }

    /// Stress at `strain`, compression positive.
    pub fn stress(&self, strain: f64) -> f64 {
        match *self {
            ConcreteLaw::Conventional { fc_ksi, ec_ksi } => hognestad(fc_ksi, ec_ksi, strain),
            ConcreteLaw::Uhpc { fc_ksi, ec_ksi, tension } => {
                if strain >= 0.0 {
                    (ec_ksi * strain).min(UHPC_COMPRESSION_ALPHA * fc_ksi)
                } else {
                    -uhpc_tension(&tension, ec_ksi, -strain)
                }
            }
        }
    }
}

fn hognestad(fc: f64, ec: f64, strain: f64) -> f64 {
    if strain <= 0.0 || fc <= 0.0 || ec <= 0.0 {
        return 0.0;
    }
    let e0 = (2.0 * fc / ec).min(CONVENTIONAL_CRUSHING_STRAIN);
    if strain <= e0 {
        let r = strain / e0;
        fc * (2.0 * r - r * r)
    } else {
        let span = (CONVENTIONAL_CRUSHING_STRAIN - e0).max(f64::EPSILON);
        (fc * (1.0 - 0.15 * (strain - e0) / span)).max(0.0)
    }
}

/// Tensile stress (positive) at tensile strain `strain`.
fn uhpc_tension(tension: &UhpcTension, ec: f64, strain: f64) -> f64 {
    let ft_cr = tension.gamma_u * tension.ft_cr_ksi;
    let ft_loc = tension.gamma_u * tension.ft_loc_ksi;
    let e_cr = if ec > 0.0 { ft_cr / ec } else { 0.0 };
    let e_loc = tension.et_loc.max(e_cr);
    if strain <= e_cr {
        ec * strain
    } else if strain <= e_loc {
        let span = (e_loc - e_cr).max(f64::EPSILON);
        ft_cr + (ft_loc - ft_cr) * (strain - e_cr) / span
    } else if strain < 2.0 * e_loc {
        ft_loc * (2.0 * e_loc - strain) / e_loc
    } else {
        0.0
    }
}

/// Stress-strain law of one steel layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "law")]
pub enum SteelLaw {
    Strand(StrandMaterial),
    Rebar(RebarMaterial),
}

impl SteelLaw {
    pub fn stress(&self, strain: f64) -> f64 {
        match self {
            SteelLaw::Strand(strand) => strand.stress(strain),
            SteelLaw::Rebar(rebar) => rebar.stress(strain),
        }
    }

    pub fn modulus_ksi(&self) -> f64 {
        match self {
            SteelLaw::Strand(strand) => strand.ep_ksi,
            SteelLaw::Rebar(rebar) => rebar.es_ksi,
        }
    }

    pub fn yield_strain(&self) -> f64 {
        match self {
            SteelLaw::Strand(strand) => strand.yield_strain(),
            SteelLaw::Rebar(rebar) => rebar.yield_strain(),
        }
    }

    pub fn yield_stress_ksi(&self) -> f64 {
        match self {
            SteelLaw::Strand(strand) => strand.fpy_ksi,
            SteelLaw::Rebar(rebar) => rebar.fy_ksi,
        }
    }

    /// Minimum elongation, the reinforcement strain limit.
    pub fn strain_limit(&self) -> f64 {
        match self {
            SteelLaw::Strand(strand) => strand.min_elongation,
            SteelLaw::Rebar(rebar) => rebar.min_elongation,
        }
    }

    pub fn is_prestressing(&self) -> bool {
        matches!(self, SteelLaw::Strand(_))
    }

    /// Net tensile strain bounds `(εcl, εtl)` of the strain-based φ.
    pub fn flexural_strain_limits(&self) -> (f64, f64) {
        match self {
            SteelLaw::Strand(_) => (0.002, 0.005),
            SteelLaw::Rebar(rebar) => {
                // 0.002/0.005 for grade 60, growing to 0.004/0.008 at grade 100
                let t = ((rebar.fy_ksi - 60.0) / 40.0).clamp(0.0, 1.0);
                let ecl = 0.002 + 0.002 * t;
                let etl = if rebar.fy_ksi <= 75.0 {
                    0.005
                } else {
                    0.005 + 0.003 * ((rebar.fy_ksi - 75.0) / 25.0).min(1.0)
                };
                (ecl, etl)
            }
        }
    }
}
