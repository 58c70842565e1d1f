//! # Elastic Shortening at Release
//!
//! Loss of strand stress when the concrete shortens under the transferred
//! prestress force.
//!
//! ```text
//! fcgp  = P/A + P·e²/I − Mg·e/I
//! ΔfpES = (Ep/Eci)·fcgp
//! ```
//!
//! ## Methods
//!
//! | Method            | Force P                                      |
//! |-------------------|----------------------------------------------|
//! | `SevenTenthsFpu`  | 0.7·fpu·Aps                                   |
//! | `Iterative`       | Aps·(fpj − ΔfpR0 − ΔfpES), solved for ΔfpES   |
//!
//! The iterative solve starts from the 0.7·fpu force, so its first trial is
//! the closed-form value. Units only need to be consistent.
//!
//! ## Example
//!
//! ```rust
//! use girder_core::criteria::FcgpMethod;
//! use girder_core::errors::AnalysisLocation;
//! use girder_core::losses::elastic_shortening::{compute, ElasticShorteningInput};
//!
//! let input = ElasticShorteningInput {
//!     fpj_ksi: 202.5,
//!     relaxation_before_transfer_ksi: 1.5,
//!     aps_in2: 6.51,
//!     eccentricity_in: 20.0,
//!     area_in2: 789.0,
//!     inertia_in4: 260_741.0,
//!     girder_moment_kip_in: 9_000.0,
//!     ep_ksi: 28_500.0,
//!     eci_ksi: 4_200.0,
//!     fpu_ksi: 270.0,
//! };
//! let method = FcgpMethod::Iterative { tolerance: 1e-6, max_iterations: 50 };
//! let result = compute(&input, &method, AnalysisLocation::unknown()).unwrap();
//! assert!(result.loss_ksi > 0.0);
//! ```

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::criteria::FcgpMethod;
use crate::errors::{AnalysisLocation, EngineError, EngineResult};

/// Section and strand state at transfer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ElasticShorteningInput {
    /// Jacking stress
    pub fpj_ksi: f64,
    /// Relaxation between jacking and release
    pub relaxation_before_transfer_ksi: f64,
    pub aps_in2: f64,
    /// Strand eccentricity, positive below the centroid
    pub eccentricity_in: f64,
    pub area_in2: f64,
    pub inertia_in4: f64,
    /// Girder self-weight moment at release (positive sagging)
    pub girder_moment_kip_in: f64,
    pub ep_ksi: f64,
    pub eci_ksi: f64,
    pub fpu_ksi: f64,
}

/// Result of the elastic-shortening solve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ElasticShorteningResult {
    pub method: FcgpMethod,
    /// Concrete stress at the strand centroid, compression positive
    pub fcgp_ksi: f64,
    pub loss_ksi: f64,
    /// Prestress force used to compute `fcgp`
    pub force_kip: f64,
    /// Loss from the 0.7·fpu trial
    pub first_trial_loss_ksi: f64,
    pub iterations: usize,
}

impl ElasticShorteningInput {
    pub fn validate(&self, location: AnalysisLocation) -> EngineResult<()> {
        let values = [
            self.fpj_ksi,
            self.relaxation_before_transfer_ksi,
            self.aps_in2,
            self.eccentricity_in,
            self.area_in2,
            self.inertia_in4,
            self.girder_moment_kip_in,
            self.ep_ksi,
            self.eci_ksi,
            self.fpu_ksi,
        ];
        if values.iter().any(|v| !v.is_finite()) {
            return Err(EngineError::degenerate("elastic shortening", location, "non-finite input"));
        }
        if self.area_in2 <= 0.0 || self.inertia_in4 <= 0.0 {
            return Err(EngineError::degenerate(
                "elastic shortening",
                location,
                format!("area {} and inertia {} must be positive", self.area_in2, self.inertia_in4),
            ));
        }
        if self.eci_ksi <= 0.0 {
            return Err(EngineError::degenerate(
                "elastic shortening",
                location,
                format!("Eci {} must be positive", self.eci_ksi),
            ));
        }
        Ok(())
    }

    /// Concrete stress at the strand centroid for prestress force `force`.
    pub fn fcgp(&self, force: f64) -> f64 {
        let e = self.eccentricity_in;
        force / self.area_in2 + force * e * e / self.inertia_in4 - self.girder_moment_kip_in * e / self.inertia_in4
    }

    fn loss_for_force(&self, force: f64) -> (f64, f64) {
        let fcgp = self.fcgp(force);
        (fcgp, self.ep_ksi / self.eci_ksi * fcgp)
    }
}

/// Compute the elastic-shortening loss with the configured method.
pub fn compute(
    input: &ElasticShorteningInput,
    method: &FcgpMethod,
    location: AnalysisLocation,
) -> EngineResult<ElasticShorteningResult> {
    input.validate(location)?;

    let trial_force = 0.7 * input.fpu_ksi * input.aps_in2;
    let (trial_fcgp, trial_loss) = input.loss_for_force(trial_force);

    match *method {
        FcgpMethod::SevenTenthsFpu => Ok(ElasticShorteningResult {
            method: *method,
            fcgp_ksi: trial_fcgp,
            loss_ksi: trial_loss,
            force_kip: trial_force,
            first_trial_loss_ksi: trial_loss,
            iterations: 1,
        }),
        FcgpMethod::Iterative {
            tolerance,
            max_iterations,
        } => {
            let mut loss = trial_loss;
            let mut residual = f64::INFINITY;
            for iteration in 2..=max_iterations {
                let force = input.aps_in2 * (input.fpj_ksi - input.relaxation_before_transfer_ksi - loss);
                let (fcgp, next) = input.loss_for_force(force);
                if !next.is_finite() {
                    return Err(EngineError::degenerate("elastic shortening", location, "loss is not finite"));
                }
                residual = (next - loss).abs();
                let scale = next.abs().max(f64::MIN_POSITIVE);
                loss = next;
                if residual <= tolerance * scale {
                    debug!(iterations = iteration, loss_ksi = loss, "elastic shortening converged");
                    return Ok(ElasticShorteningResult {
                        method: *method,
                        fcgp_ksi: fcgp,
                        loss_ksi: loss,
                        force_kip: force,
                        first_trial_loss_ksi: trial_loss,
                        iterations: iteration,
                    });
                }
            }
            Err(EngineError::non_convergence(
                "elastic shortening (iterative fcgp)",
                location,
                max_iterations,
                residual,
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn girder() -> ElasticShorteningInput {
        ElasticShorteningInput {
            fpj_ksi: 202.5,
            relaxation_before_transfer_ksi: 1.5,
            aps_in2: 6.51,
            eccentricity_in: 20.0,
            area_in2: 789.0,
            inertia_in4: 260_741.0,
            girder_moment_kip_in: 9_000.0,
            ep_ksi: 28_500.0,
            eci_ksi: 4_200.0,
            fpu_ksi: 270.0,
        }
    }

    #[test]
    fn test_closed_form_matches_hand_calculation() {
        let input = girder();
        let result = compute(&input, &FcgpMethod::SevenTenthsFpu, AnalysisLocation::unknown()).unwrap();
        let p = 0.7 * 270.0 * 6.51;
        let fcgp = p / 789.0 + p * 400.0 / 260_741.0 - 9000.0 * 20.0 / 260_741.0;
        assert!((result.fcgp_ksi - fcgp).abs() < 1e-12);
        assert!((result.loss_ksi - 28_500.0 / 4_200.0 * fcgp).abs() < 1e-9);
        assert_eq!(result.iterations, 1);
    }

    #[test]
    fn test_iterative_converges_to_fixed_point() {
        let input = girder();
        let method = FcgpMethod::Iterative {
            tolerance: 1e-6,
            max_iterations: 50,
        };
        let result = compute(&input, &method, AnalysisLocation::unknown()).unwrap();
        assert!(result.iterations < 50);
        let force = input.aps_in2 * (input.fpj_ksi - input.relaxation_before_transfer_ksi - result.loss_ksi);
        let consistent = input.ep_ksi / input.eci_ksi * input.fcgp(force);
        assert!((consistent - result.loss_ksi).abs() / result.loss_ksi < 1e-5);
    }

    #[test]
    fn test_iterative_first_trial_equals_closed_form() {
        let input = girder();
        let closed = compute(&input, &FcgpMethod::SevenTenthsFpu, AnalysisLocation::unknown()).unwrap();
        let iterative = compute(
            &input,
            &FcgpMethod::Iterative {
                tolerance: 1e-6,
                max_iterations: 50,
            },
            AnalysisLocation::unknown(),
        )
        .unwrap();
        assert_eq!(iterative.first_trial_loss_ksi, closed.loss_ksi);
    }

    #[test]
    fn test_negative_area_is_degenerate() {
        let mut input = girder();
        input.area_in2 = -789.0;
        let result = compute(&input, &FcgpMethod::SevenTenthsFpu, AnalysisLocation::unknown());
        assert!(matches!(result, Err(EngineError::DegenerateInput { .. })));
        assert!(result.unwrap_err().is_numerical());
    }

    #[test]
    fn test_nan_input_is_degenerate() {
        let mut input = girder();
        input.eccentricity_in = f64::NAN;
        let method = FcgpMethod::Iterative {
            tolerance: 1e-6,
            max_iterations: 50,
        };
        assert!(compute(&input, &method, AnalysisLocation::unknown()).is_err());
    }

    #[test]
    fn test_iteration_bound_is_reported() {
        let input = girder();
        let method = FcgpMethod::Iterative {
            tolerance: 1e-15,
            max_iterations: 2,
        };
        let result = compute(&input, &method, AnalysisLocation::unknown());
        assert!(matches!(result, Err(EngineError::NonConvergence { iterations: 2, .. })));
    }
}
