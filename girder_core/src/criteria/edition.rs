//! # Specification Editions
//!
//! Edition-dependent formula selection, resolved once per analysis run into
//! an [`EditionPolicy`] that the capacity, interface shear and rating engines
//! receive. Engines never branch on the edition themselves.
//!
//! ## References
//!
//! - AASHTO LRFD 5.7.3.3.2 (minimum reinforcement; γ factors from 2012)
//! - AASHTO LRFD 5.5.4.2 (strain-based resistance factors from 2006)
//! - AASHTO LRFD 5.7.3.3.1 (over-reinforced limit, removed in 2006)
//! - AASHTO LRFD 5.8.4 (interface shear; cohesion/friction table revised 2007)

use std::fmt;

use serde::{Deserialize, Serialize};

/// Published edition of the design specification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum SpecEdition {
    FirstEdition1994,
    SecondEdition1998,
    SecondEditionWith2003Interims,
    ThirdEdition2004,
    ThirdEditionWith2005Interims,
    ThirdEditionWith2006Interims,
    FourthEdition2007,
    FifthEdition2010,
    SixthEdition2012,
    SeventhEdition2014,
    SeventhEditionWith2016Interims,
    EighthEdition2017,
    #[default]
    NinthEdition2020,
}

impl SpecEdition {
    pub const ALL: [SpecEdition; 13] = [
        SpecEdition::FirstEdition1994,
        SpecEdition::SecondEdition1998,
        SpecEdition::SecondEditionWith2003Interims,
        SpecEdition::ThirdEdition2004,
        SpecEdition::ThirdEditionWith2005Interims,
        SpecEdition::ThirdEditionWith2006Interims,
        SpecEdition::FourthEdition2007,
        SpecEdition::FifthEdition2010,
        SpecEdition::SixthEdition2012,
        SpecEdition::SeventhEdition2014,
        SpecEdition::SeventhEditionWith2016Interims,
        SpecEdition::EighthEdition2017,
        SpecEdition::NinthEdition2020,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            SpecEdition::FirstEdition1994 => "First Edition 1994",
            SpecEdition::SecondEdition1998 => "Second Edition 1998",
            SpecEdition::SecondEditionWith2003Interims => "Second Edition 1998 with 2003 interims",
            SpecEdition::ThirdEdition2004 => "Third Edition 2004",
            SpecEdition::ThirdEditionWith2005Interims => "Third Edition 2004 with 2005 interims",
            SpecEdition::ThirdEditionWith2006Interims => "Third Edition 2004 with 2006 interims",
            SpecEdition::FourthEdition2007 => "Fourth Edition 2007",
            SpecEdition::FifthEdition2010 => "Fifth Edition 2010",
            SpecEdition::SixthEdition2012 => "Sixth Edition 2012",
            SpecEdition::SeventhEdition2014 => "Seventh Edition 2014",
            SpecEdition::SeventhEditionWith2016Interims => "Seventh Edition 2014 with 2016 interims",
            SpecEdition::EighthEdition2017 => "Eighth Edition 2017",
            SpecEdition::NinthEdition2020 => "Ninth Edition 2020",
        }
    }
}

impl fmt::Display for SpecEdition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Cohesion, friction and upper-bound factors for an interface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InterfaceShearFactors {
    /// Cohesion factor c (ksi)
    pub cohesion_ksi: f64,
    /// Friction factor μ
    pub friction: f64,
    /// Fraction of concrete strength available, K1
    pub k1: f64,
    /// Limiting interface shear resistance K2 (ksi)
    pub k2_ksi: f64,
}

/// Edition-dependent formula choices.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EditionPolicy {
    pub edition: SpecEdition,
    /// Flexural cracking variability factor γ1
    pub cracking_gamma1: f64,
    /// Prestress variability factor γ2
    pub cracking_gamma2: f64,
    /// Apply γ3 = fy/fu to reinforced (non-prestressed) sections
    pub apply_gamma3: bool,
    /// Mcr may not be less than Sc·fr (2003 interims through 2010)
    pub cracking_moment_floor: bool,
    /// Multiplier on Mcr in the minimum capacity check (1.2 before 2012)
    pub min_capacity_mcr_factor: f64,
    /// Multiplier on Mu in the minimum capacity check
    pub min_capacity_mu_factor: f64,
    /// φ varies with net tensile strain
    pub strain_based_phi: bool,
    /// Limit capacity of sections with c/de > 0.42
    pub over_reinforced_check: bool,
    /// Demand below which interface reinforcement may be waived (ksi)
    pub interface_waiver_threshold_ksi: f64,
    /// Minimum Avf·fy/bv (ksi)
    pub interface_min_avf_coefficient_ksi: f64,
    pub roughened_interface: InterfaceShearFactors,
    pub smooth_interface: InterfaceShearFactors,
    /// Stress block α1 reduces for concrete above 10 ksi
    pub reduced_alpha1_for_high_strength: bool,
}

impl EditionPolicy {
    /// Resolve the formula choices for an edition.
    pub fn for_edition(edition: SpecEdition) -> Self {
        let from_2012 = edition >= SpecEdition::SixthEdition2012;
        let from_2007 = edition >= SpecEdition::FourthEdition2007;

        let (roughened, smooth) = if from_2007 {
            (
                InterfaceShearFactors {
                    cohesion_ksi: 0.28,
                    friction: 1.0,
                    k1: 0.3,
                    k2_ksi: 1.8,
                },
                InterfaceShearFactors {
                    cohesion_ksi: 0.075,
                    friction: 0.6,
                    k1: 0.2,
                    k2_ksi: 0.8,
                },
            )
        } else {
            (
                InterfaceShearFactors {
                    cohesion_ksi: 0.10,
                    friction: 1.0,
                    k1: 0.2,
                    k2_ksi: 0.8,
                },
                InterfaceShearFactors {
                    cohesion_ksi: 0.075,
                    friction: 0.6,
                    k1: 0.2,
                    k2_ksi: 0.8,
                },
            )
        };

        EditionPolicy {
            edition,
            cracking_gamma1: if from_2012 { 1.6 } else { 1.0 },
            cracking_gamma2: if from_2012 { 1.1 } else { 1.0 },
            apply_gamma3: from_2012,
            cracking_moment_floor: edition >= SpecEdition::SecondEditionWith2003Interims && !from_2012,
            min_capacity_mcr_factor: if from_2012 { 1.0 } else { 1.2 },
            min_capacity_mu_factor: 1.33,
            strain_based_phi: edition >= SpecEdition::ThirdEditionWith2006Interims,
            over_reinforced_check: edition < SpecEdition::ThirdEditionWith2006Interims,
            interface_waiver_threshold_ksi: if from_2007 { 0.21 } else { 0.10 },
            interface_min_avf_coefficient_ksi: 0.05,
            roughened_interface: roughened,
            smooth_interface: smooth,
            reduced_alpha1_for_high_strength: edition >= SpecEdition::SeventhEditionWith2016Interims,
        }
    }

    pub fn interface_factors(&self, roughened: bool) -> InterfaceShearFactors {
        if roughened {
            self.roughened_interface
        } else {
            self.smooth_interface
        }
    }

    /// Stress block intensity factor α1.
    pub fn alpha1(&self, fc_ksi: f64) -> f64 {
        if self.reduced_alpha1_for_high_strength && fc_ksi > 10.0 {
            (0.85 - 0.02 * (fc_ksi - 10.0)).max(0.75)
        } else {
            0.85
        }
    }

    /// Stress block depth factor β1.
    pub fn beta1(&self, fc_ksi: f64) -> f64 {
        if fc_ksi <= 4.0 {
            0.85
        } else {
            (0.85 - 0.05 * (fc_ksi - 4.0)).max(0.65)
        }
    }
}

impl Default for EditionPolicy {
    fn default() -> Self {
        EditionPolicy::for_edition(SpecEdition::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cracking_factors_by_edition() {
        let old = EditionPolicy::for_edition(SpecEdition::FifthEdition2010);
        assert_eq!(old.cracking_gamma1, 1.0);
        assert_eq!(old.min_capacity_mcr_factor, 1.2);

        let new = EditionPolicy::for_edition(SpecEdition::SixthEdition2012);
        assert_eq!(new.cracking_gamma1, 1.6);
        assert_eq!(new.cracking_gamma2, 1.1);
        assert_eq!(new.min_capacity_mcr_factor, 1.0);
    }

    #[test]
    fn test_over_reinforced_and_strain_phi_are_exclusive() {
        for edition in SpecEdition::ALL {
            let policy = EditionPolicy::for_edition(edition);
            assert_ne!(policy.strain_based_phi, policy.over_reinforced_check, "{}", edition);
        }
    }

    #[test]
    fn test_cracking_moment_floor_between_2003_and_2012() {
        assert!(!EditionPolicy::for_edition(SpecEdition::SecondEdition1998).cracking_moment_floor);
        assert!(EditionPolicy::for_edition(SpecEdition::SecondEditionWith2003Interims).cracking_moment_floor);
        assert!(EditionPolicy::for_edition(SpecEdition::FifthEdition2010).cracking_moment_floor);
        assert!(!EditionPolicy::for_edition(SpecEdition::SixthEdition2012).cracking_moment_floor);
    }

    #[test]
    fn test_interface_factors() {
        let policy = EditionPolicy::default();
        let rough = policy.interface_factors(true);
        assert_eq!(rough.cohesion_ksi, 0.28);
        assert_eq!(rough.k2_ksi, 1.8);
        assert_eq!(policy.interface_factors(false).friction, 0.6);
        assert_eq!(policy.interface_waiver_threshold_ksi, 0.21);
    }

    #[test]
    fn test_stress_block_factors() {
        let policy = EditionPolicy::default();
        assert_eq!(policy.beta1(4.0), 0.85);
        assert!((policy.beta1(6.0) - 0.75).abs() < 1e-12);
        assert_eq!(policy.beta1(12.0), 0.65);
        assert!((policy.alpha1(12.0) - 0.81).abs() < 1e-12);
        let old = EditionPolicy::for_edition(SpecEdition::FifthEdition2010);
        assert_eq!(old.alpha1(12.0), 0.85);
    }
}
