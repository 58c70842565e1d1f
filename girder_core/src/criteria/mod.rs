//! # Analysis Criteria
//!
//! Project-level configuration: specification edition, method selectors,
//! resistance and rating factors. Criteria load from TOML (the usual
//! hand-edited form) or JSON, with every field defaulted.
//!
//! ## Example
//!
//! ```rust
//! use girder_core::criteria::{AnalysisCriteria, FcgpMethod};
//!
//! let criteria = AnalysisCriteria::from_toml_str(r#"
//!     edition = "FifthEdition2010"
//!
//!     [fcgp_method]
//!     method = "SevenTenthsFpu"
//! "#).unwrap();
//!
//! assert_eq!(criteria.fcgp_method, FcgpMethod::SevenTenthsFpu);
//! assert!(criteria.validate().is_ok());
//! ```

pub mod edition;

pub use edition::{EditionPolicy, InterfaceShearFactors, SpecEdition};

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::{EngineError, EngineResult};
use crate::section::PropertyMode;

// ============================================================================
// Method selectors
// ============================================================================

/// Prestress loss method.
///
/// Only the time-step method is implemented by this engine; the other
/// selectors exist in criteria libraries and are rejected when an analysis
/// is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LossMethod {
    #[default]
    TimeStep,
    Refined,
    LumpSum,
}

impl LossMethod {
    pub fn display_name(&self) -> &'static str {
        match self {
            LossMethod::TimeStep => "Time-step",
            LossMethod::Refined => "Refined estimate",
            LossMethod::LumpSum => "Lump sum",
        }
    }
}

impl fmt::Display for LossMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// How concrete stress at the strand centroid is found at release.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method")]
pub enum FcgpMethod {
    /// Converge the prestress force with the shortening loss it produces
    Iterative { tolerance: f64, max_iterations: usize },
    /// Assume the force after transfer is 0.7·fpu·Aps
    SevenTenthsFpu,
}

impl Default for FcgpMethod {
    fn default() -> Self {
        FcgpMethod::Iterative {
            tolerance: 1.0e-6,
            max_iterations: 50,
        }
    }
}

/// Interface shear flow formulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ShearFlowMethod {
    /// vui = Vu / dv
    #[default]
    Simplified,
    /// vui = Vu·Q / I
    Classical,
}

/// Concrete compression model for conventional concrete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StressBlock {
    /// Equivalent rectangular block α1·f'c over β1·c
    #[default]
    Rectangular,
    /// Hognestad parabola
    Parabolic,
}

// ============================================================================
// Factor groups
// ============================================================================

/// Resistance factors φ.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResistanceFactors {
    pub flexure_tension_prestressed: f64,
    pub flexure_tension_reinforced: f64,
    pub flexure_compression: f64,
    pub flexure_uhpc: f64,
    pub interface_shear: f64,
    pub shear: f64,
}

impl Default for ResistanceFactors {
    fn default() -> Self {
        ResistanceFactors {
            flexure_tension_prestressed: 1.0,
            flexure_tension_reinforced: 0.9,
            flexure_compression: 0.75,
            flexure_uhpc: 0.9,
            interface_shear: 0.9,
            shear: 0.9,
        }
    }
}

/// Load rating factors that are not vehicle specific.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RatingCriteria {
    /// φc
    pub condition_factor: f64,
    /// φs
    pub system_factor: f64,
    /// Lower bound on φc·φs
    pub min_condition_system_product: f64,
    /// Posting loads are floored to a multiple of this (tons)
    pub posting_tolerance_tons: f64,
    /// Allowable yield stress ratio K in fr = K·fy
    pub yield_stress_coefficient: f64,
    /// Allowable tension for stress rating, coefficient on √f'c (ksi)
    pub allowable_tension_coefficient: f64,
    /// γDC for the strength ratings
    pub dead_load_factor: f64,
    /// γDW for the strength ratings
    pub wearing_surface_factor: f64,
    /// γCR, spliced girders only
    pub creep_factor: f64,
    /// γSR, spliced girders only
    pub shrinkage_factor: f64,
    /// γRE, spliced girders only
    pub relaxation_factor: f64,
    /// γPS for secondary post-tensioning effects
    pub secondary_ps_factor: f64,
}

impl Default for RatingCriteria {
    fn default() -> Self {
        RatingCriteria {
            condition_factor: 1.0,
            system_factor: 1.0,
            min_condition_system_product: 0.85,
            posting_tolerance_tons: 0.01,
            yield_stress_coefficient: 0.9,
            allowable_tension_coefficient: 0.19,
            dead_load_factor: 1.25,
            wearing_surface_factor: 1.50,
            creep_factor: 1.0,
            shrinkage_factor: 1.0,
            relaxation_factor: 1.0,
            secondary_ps_factor: 1.0,
        }
    }
}

/// Environmental inputs for creep and shrinkage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CreepCriteria {
    /// Average annual ambient relative humidity (%)
    pub relative_humidity_pct: f64,
    /// Curing duration before shrinkage starts (days)
    pub cure_duration_days: f64,
}

impl Default for CreepCriteria {
    fn default() -> Self {
        CreepCriteria {
            relative_humidity_pct: 70.0,
            cure_duration_days: 1.0,
        }
    }
}

/// Neutral-axis search settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverSettings {
    pub max_iterations: usize,
    /// Net axial force tolerance (kip)
    pub force_tolerance_kip: f64,
}

impl Default for SolverSettings {
    fn default() -> Self {
        SolverSettings {
            max_iterations: 200,
            force_tolerance_kip: 1.0e-3,
        }
    }
}

// ============================================================================
// Criteria
// ============================================================================

/// Complete analysis configuration.
///
/// Default values:
/// - edition: NinthEdition2020
/// - loss_method: TimeStep
/// - fcgp_method: Iterative (tolerance 1e-6, 50 iterations)
/// - shear_flow_method: Simplified
/// - section_properties: Transformed
/// - check_reinforcement_strain_limits: false
/// - concrete_stress_block: Rectangular
/// - rupture_coefficient: 0.37 (fr = 0.37·√f'c, ksi)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisCriteria {
    pub edition: SpecEdition,
    pub loss_method: LossMethod,
    pub fcgp_method: FcgpMethod,
    pub shear_flow_method: ShearFlowMethod,
    pub section_properties: PropertyMode,
    pub check_reinforcement_strain_limits: bool,
    pub concrete_stress_block: StressBlock,
    pub rupture_coefficient: f64,
    pub resistance: ResistanceFactors,
    pub rating: RatingCriteria,
    pub creep: CreepCriteria,
    pub solver: SolverSettings,
}

impl Default for AnalysisCriteria {
    fn default() -> Self {
        AnalysisCriteria {
            edition: SpecEdition::default(),
            loss_method: LossMethod::default(),
            fcgp_method: FcgpMethod::default(),
            shear_flow_method: ShearFlowMethod::default(),
            section_properties: PropertyMode::Transformed,
            check_reinforcement_strain_limits: false,
            concrete_stress_block: StressBlock::default(),
            rupture_coefficient: 0.37,
            resistance: ResistanceFactors::default(),
            rating: RatingCriteria::default(),
            creep: CreepCriteria::default(),
            solver: SolverSettings::default(),
        }
    }
}

impl AnalysisCriteria {
    pub fn from_toml_str(text: &str) -> EngineResult<Self> {
        toml::from_str(text).map_err(|e| EngineError::configuration("criteria", e.to_string()))
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> EngineResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| EngineError::file_error("read", path.display().to_string(), e.to_string()))?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> EngineResult<String> {
        toml::to_string_pretty(self).map_err(|e| EngineError::Serialization { reason: e.to_string() })
    }

    /// Resolve the edition-dependent formula choices.
    pub fn edition_policy(&self) -> EditionPolicy {
        EditionPolicy::for_edition(self.edition)
    }

    /// Check consistency. Called once when an analysis is built.
    pub fn validate(&self) -> EngineResult<()> {
        if self.loss_method != LossMethod::TimeStep {
            return Err(EngineError::configuration(
                "loss_method",
                format!("{} losses are not supported by the time-step engine", self.loss_method),
            ));
        }
        if let FcgpMethod::Iterative {
            tolerance,
            max_iterations,
        } = self.fcgp_method
        {
            if !(tolerance > 0.0 && tolerance.is_finite()) {
                return Err(EngineError::configuration("fcgp_method.tolerance", "Tolerance must be positive"));
            }
            if max_iterations == 0 {
                return Err(EngineError::configuration(
                    "fcgp_method.max_iterations",
                    "At least one iteration is required",
                ));
            }
        }
        let phis = [
            ("resistance.flexure_tension_prestressed", self.resistance.flexure_tension_prestressed),
            ("resistance.flexure_tension_reinforced", self.resistance.flexure_tension_reinforced),
            ("resistance.flexure_compression", self.resistance.flexure_compression),
            ("resistance.flexure_uhpc", self.resistance.flexure_uhpc),
            ("resistance.interface_shear", self.resistance.interface_shear),
            ("resistance.shear", self.resistance.shear),
        ];
        for (key, phi) in phis {
            if !(phi > 0.0 && phi <= 1.0) {
                return Err(EngineError::configuration(key, format!("Resistance factor {} is outside (0, 1]", phi)));
            }
        }
        let rh = self.creep.relative_humidity_pct;
        if !(rh > 0.0 && rh <= 100.0) {
            return Err(EngineError::configuration(
                "creep.relative_humidity_pct",
                format!("Humidity {} is outside (0, 100]", rh),
            ));
        }
        if self.solver.max_iterations == 0 || self.solver.force_tolerance_kip <= 0.0 {
            return Err(EngineError::configuration("solver", "Solver needs iterations and a positive tolerance"));
        }
        let rating = &self.rating;
        if !(rating.condition_factor > 0.0 && rating.system_factor > 0.0) {
            return Err(EngineError::configuration("rating", "Condition and system factors must be positive"));
        }
        if !(rating.yield_stress_coefficient > 0.0 && rating.yield_stress_coefficient <= 1.0) {
            return Err(EngineError::configuration(
                "rating.yield_stress_coefficient",
                format!("Coefficient {} is outside (0, 1]", rating.yield_stress_coefficient),
            ));
        }
        if self.rupture_coefficient <= 0.0 {
            return Err(EngineError::configuration("rupture_coefficient", "Must be positive"));
        }
        if self.edition < SpecEdition::ThirdEditionWith2006Interims && self.check_reinforcement_strain_limits {
            return Err(EngineError::configuration(
                "check_reinforcement_strain_limits",
                format!("Reinforcement strain limits require strain-based capacity, not available in {}", self.edition),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let criteria = AnalysisCriteria::default();
        assert!(criteria.validate().is_ok());
        assert_eq!(criteria.section_properties, PropertyMode::Transformed);
    }

    #[test]
    fn test_unsupported_loss_method_is_configuration_error() {
        let criteria = AnalysisCriteria {
            loss_method: LossMethod::LumpSum,
            ..Default::default()
        };
        match criteria.validate() {
            Err(EngineError::Configuration { key, .. }) => assert_eq!(key, "loss_method"),
            other => panic!("expected configuration error, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_selector_in_toml_is_rejected() {
        let result = AnalysisCriteria::from_toml_str("loss_method = \"Magic\"");
        assert!(matches!(result, Err(EngineError::Configuration { .. })));
    }

    #[test]
    fn test_iterative_settings_from_toml() {
        let criteria = AnalysisCriteria::from_toml_str(
            r#"
            [fcgp_method]
            method = "Iterative"
            tolerance = 1e-8
            max_iterations = 12
            "#,
        )
        .unwrap();
        assert_eq!(
            criteria.fcgp_method,
            FcgpMethod::Iterative {
                tolerance: 1e-8,
                max_iterations: 12
            }
        );
    }

    #[test]
    fn test_zero_iterations_rejected() {
        let criteria = AnalysisCriteria {
            fcgp_method: FcgpMethod::Iterative {
                tolerance: 1e-6,
                max_iterations: 0,
            },
            ..Default::default()
        };
        assert!(criteria.validate().is_err());
    }

    #[test]
    fn test_strain_limits_need_strain_based_edition() {
        let criteria = AnalysisCriteria {
            edition: SpecEdition::ThirdEdition2004,
            check_reinforcement_strain_limits: true,
            ..Default::default()
        };
        assert!(criteria.validate().is_err());
    }

    #[test]
    fn test_toml_file_round_trip() {
        let criteria = AnalysisCriteria {
            edition: SpecEdition::SixthEdition2012,
            shear_flow_method: ShearFlowMethod::Classical,
            ..Default::default()
        };
        let text = criteria.to_toml_string().unwrap();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(text.as_bytes()).unwrap();
        let loaded = AnalysisCriteria::from_toml_file(file.path()).unwrap();
        assert_eq!(loaded, criteria);
    }

    #[test]
    fn test_missing_file_is_file_error() {
        let result = AnalysisCriteria::from_toml_file("/nonexistent/criteria.toml");
        assert!(matches!(result, Err(EngineError::FileError { .. })));
    }
}
