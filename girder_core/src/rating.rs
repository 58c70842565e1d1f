//! # Load Rating
//!
//! Rating factors for one vehicle at every rated POI:
//!
//! ```text
//! RF = (φc·φs·φ·Rn − Σγ·D) / (γLL·LL·DF),    φc·φs ≥ 0.85
//! ```
//!
//! | Check                 | Limit state | Rn                      | Rating types        |
//! |-----------------------|-------------|-------------------------|---------------------|
//! | positive moment       | strength    | Mn (+)                  | all                 |
//! | negative moment       | strength    | Mn (−)                  | all                 |
//! | shear                 | strength    | Vn (supplied)           | all                 |
//! | concrete tension      | Service III | `k·√f'c`                | design inventory    |
//! | yield stress (+ / −)  | Service I   | `K·fy`                  | permit              |
//!
//! The governing rating is the least RF over POIs and checks. Equal values
//! resolve in the order of the table. `RF < 1` fails; it is never clamped.
//! A check whose live-load effect is zero or acts against the capacity is
//! not applicable.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::capacity::{CrackingMomentDetails, MomentCapacityDetails, MomentSign};
use crate::context::AnalysisContext;
use crate::criteria::RatingCriteria;
use crate::diagnostics::{Applicability, Diagnostic};
use crate::errors::{AnalysisLocation, EngineError, EngineResult};
use crate::forces::{loads_in, LoadCategory, ProductLoad};
use crate::keys::PoiId;
use crate::losses::LossHistory;
use crate::materials::ConcreteRole;
use crate::poi::PointOfInterest;
use crate::section::{LayerKind, SectionProperties};
use crate::timeline::IntervalIndex;
use crate::units::floor_off;

// ============================================================================
// Rating types and vehicles
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RatingType {
    DesignInventory,
    DesignOperating,
    LegalRoutine,
    LegalSpecial,
    Emergency,
    PermitRoutine,
    PermitSpecial,
}

impl RatingType {
    pub const ALL: [RatingType; 7] = [
        RatingType::DesignInventory,
        RatingType::DesignOperating,
        RatingType::LegalRoutine,
        RatingType::LegalSpecial,
        RatingType::Emergency,
        RatingType::PermitRoutine,
        RatingType::PermitSpecial,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            RatingType::DesignInventory => "Design Load Rating (Inventory)",
            RatingType::DesignOperating => "Design Load Rating (Operating)",
            RatingType::LegalRoutine => "Legal Load Rating (Routine Commercial Traffic)",
            RatingType::LegalSpecial => "Legal Load Rating (Specialized Hauling Vehicles)",
            RatingType::Emergency => "Legal Load Rating (Emergency Vehicles)",
            RatingType::PermitRoutine => "Permit Load Rating (Routine)",
            RatingType::PermitSpecial => "Permit Load Rating (Special)",
        }
    }

    /// γLL for the strength checks when the vehicle does not set one.
    pub fn strength_live_load_factor(&self) -> f64 {
        match self {
            RatingType::DesignInventory => 1.75,
            RatingType::DesignOperating => 1.35,
            RatingType::LegalRoutine => 1.80,
            RatingType::LegalSpecial => 1.60,
            RatingType::Emergency => 1.30,
            RatingType::PermitRoutine => 1.30,
            RatingType::PermitSpecial => 1.20,
        }
    }

    /// γLL for the service checks when the vehicle does not set one.
    pub fn service_live_load_factor(&self) -> f64 {
        match self {
            RatingType::DesignInventory => 0.8,
            _ => 1.0,
        }
    }

    pub fn checks_tension_stress(&self) -> bool {
        matches!(self, RatingType::DesignInventory)
    }

    pub fn checks_yield_stress(&self) -> bool {
        matches!(self, RatingType::PermitRoutine | RatingType::PermitSpecial)
    }
}

impl fmt::Display for RatingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Live-load effects of one vehicle at one POI, impact included.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VehicleLoadEffect {
    pub poi: PoiId,
    #[serde(default)]
    pub moment_max_kip_in: f64,
    #[serde(default)]
    pub moment_min_kip_in: f64,
    #[serde(default)]
    pub shear_kip: f64,
}

/// Restraint effects of a spliced girder at one POI, taken from an analysis
/// of the continuous system. Moments carry their sign.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeDependentEffects {
    pub poi: PoiId,
    pub creep_moment_kip_in: f64,
    pub shrinkage_moment_kip_in: f64,
    pub relaxation_moment_kip_in: f64,
    /// Secondary post-tensioning moment
    pub secondary_moment_kip_in: f64,
    pub creep_shear_kip: f64,
    pub shrinkage_shear_kip: f64,
    pub relaxation_shear_kip: f64,
    pub secondary_shear_kip: f64,
}

impl TimeDependentEffects {
    fn terms(rating: &RatingCriteria, effects: [f64; 4]) -> Vec<DeadLoadTerm> {
        let factors = [
            ("CR", rating.creep_factor),
            ("SR", rating.shrinkage_factor),
            ("RE", rating.relaxation_factor),
            ("PS", rating.secondary_ps_factor),
        ];
        factors
            .into_iter()
            .zip(effects)
            .filter(|(_, effect)| *effect != 0.0)
            .map(|((name, factor), effect)| DeadLoadTerm {
                name: name.into(),
                factor,
                effect,
            })
            .collect()
    }

    pub fn moment_terms(&self, rating: &RatingCriteria) -> Vec<DeadLoadTerm> {
        Self::terms(
            rating,
            [
                self.creep_moment_kip_in,
                self.shrinkage_moment_kip_in,
                self.relaxation_moment_kip_in,
                self.secondary_moment_kip_in,
            ],
        )
    }

    pub fn shear_terms(&self, rating: &RatingCriteria) -> Vec<DeadLoadTerm> {
        Self::terms(
            rating,
            [
                self.creep_shear_kip.abs(),
                self.shrinkage_shear_kip.abs(),
                self.relaxation_shear_kip.abs(),
                self.secondary_shear_kip.abs(),
            ],
        )
    }
}

/// A rating vehicle and its per-lane effects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingVehicle {
    pub name: String,
    pub rating_type: RatingType,
    /// Gross vehicle weight W
    pub weight_tons: f64,
    pub moment_distribution_factor: f64,
    pub shear_distribution_factor: f64,
    /// Overrides the strength γLL of the rating type
    #[serde(default)]
    pub live_load_factor: Option<f64>,
    /// Overrides the service γLL of the rating type
    #[serde(default)]
    pub service_live_load_factor: Option<f64>,
    pub effects: Vec<VehicleLoadEffect>,
}

impl RatingVehicle {
    pub fn validate(&self) -> EngineResult<()> {
        if !(self.weight_tons > 0.0 && self.weight_tons.is_finite()) {
            return Err(EngineError::invalid_input(
                "weight_tons",
                self.weight_tons.to_string(),
                format!("Vehicle '{}' must have a positive weight", self.name),
            ));
        }
        for (field, df) in [
            ("moment_distribution_factor", self.moment_distribution_factor),
            ("shear_distribution_factor", self.shear_distribution_factor),
        ] {
            if !(df > 0.0 && df.is_finite()) {
                return Err(EngineError::invalid_input(
                    field,
                    df.to_string(),
                    "Distribution factors must be positive",
                ));
            }
        }
        Ok(())
    }

    pub fn effect(&self, poi: PoiId) -> Option<&VehicleLoadEffect> {
        self.effects.iter().find(|e| e.poi == poi)
    }

    fn strength_factor(&self) -> f64 {
        self.live_load_factor
            .unwrap_or_else(|| self.rating_type.strength_live_load_factor())
    }

    fn service_factor(&self) -> f64 {
        self.service_live_load_factor
            .unwrap_or_else(|| self.rating_type.service_live_load_factor())
    }
}

// ============================================================================
// Rating factor arithmetic
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CheckFamily {
    PositiveMoment,
    NegativeMoment,
    Shear,
    Stress,
    YieldStressPositive,
    YieldStressNegative,
}

impl CheckFamily {
    pub const ALL: [CheckFamily; 6] = [
        CheckFamily::PositiveMoment,
        CheckFamily::NegativeMoment,
        CheckFamily::Shear,
        CheckFamily::Stress,
        CheckFamily::YieldStressPositive,
        CheckFamily::YieldStressNegative,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            CheckFamily::PositiveMoment => "Positive moment",
            CheckFamily::NegativeMoment => "Negative moment",
            CheckFamily::Shear => "Shear",
            CheckFamily::Stress => "Stress",
            CheckFamily::YieldStressPositive => "Yield stress ratio (positive moment)",
            CheckFamily::YieldStressNegative => "Yield stress ratio (negative moment)",
        }
    }
}

impl fmt::Display for CheckFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// A factored permanent effect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeadLoadTerm {
    pub name: String,
    pub factor: f64,
    pub effect: f64,
}

/// Every quantity in one rating factor. Effects carry their sign; for
/// negative moment capacity, dead and live load are all negative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingFactorTerms {
    /// φc·φs after the lower bound, 1.0 for service checks
    pub condition_system_factor: f64,
    pub phi: f64,
    /// Rn, or the allowable stress for service checks
    pub capacity: f64,
    pub dead: Vec<DeadLoadTerm>,
    pub live_load_factor: f64,
    pub live_load: f64,
    pub distribution_factor: f64,
}

impl RatingFactorTerms {
    pub fn factored_capacity(&self) -> f64 {
        self.condition_system_factor * self.phi * self.capacity
    }

    pub fn factored_dead_load(&self) -> f64 {
        self.dead.iter().map(|d| d.factor * d.effect).sum()
    }

    pub fn factored_live_load(&self) -> f64 {
        self.live_load_factor * self.live_load * self.distribution_factor
    }

    /// `None` when the live load is zero or acts against the capacity.
    pub fn rating_factor(&self) -> Option<f64> {
        let live = self.factored_live_load();
        if live == 0.0 || !live.is_finite() || live * self.capacity < 0.0 {
            return None;
        }
        Some((self.factored_capacity() - self.factored_dead_load()) / live)
    }
}

/// φc·φs with the lower bound applied.
pub fn condition_system_factor(condition: f64, system: f64, min_product: f64) -> f64 {
    (condition * system).max(min_product)
}

/// One applicable rating check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingCheck {
    pub family: CheckFamily,
    pub poi: PoiId,
    pub terms: RatingFactorTerms,
    pub rating_factor: f64,
    pub passes: bool,
}

impl RatingCheck {
    pub fn evaluate(family: CheckFamily, poi: PoiId, terms: RatingFactorTerms) -> Applicability<RatingCheck> {
        match terms.rating_factor() {
            Some(rating_factor) => Applicability::Applicable(RatingCheck {
                family,
                poi,
                terms,
                rating_factor,
                passes: rating_factor >= 1.0,
            }),
            None => Applicability::not_applicable(format!("no {} live load effect", family.display_name().to_lowercase())),
        }
    }
}

// ============================================================================
// Results
// ============================================================================

/// All six checks at one POI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoiRating {
    pub poi: PoiId,
    pub positive_moment: Applicability<RatingCheck>,
    pub negative_moment: Applicability<RatingCheck>,
    pub shear: Applicability<RatingCheck>,
    pub stress: Applicability<RatingCheck>,
    pub yield_stress_positive: Applicability<RatingCheck>,
    pub yield_stress_negative: Applicability<RatingCheck>,
}

impl PoiRating {
    /// Checks in tie-break order.
    pub fn checks(&self) -> [&Applicability<RatingCheck>; 6] {
        [
            &self.positive_moment,
            &self.negative_moment,
            &self.shear,
            &self.stress,
            &self.yield_stress_positive,
            &self.yield_stress_negative,
        ]
    }

    pub fn governing(&self) -> Option<&RatingCheck> {
        governing(self.checks().into_iter().filter_map(Applicability::as_option))
    }
}

/// Least rating factor; equal values keep the earlier family, then the
/// earlier check.
pub fn governing<'a>(checks: impl IntoIterator<Item = &'a RatingCheck>) -> Option<&'a RatingCheck> {
    let mut best: Option<&RatingCheck> = None;
    for check in checks {
        best = match best {
            Some(b) if b.rating_factor < check.rating_factor => Some(b),
            Some(b) if b.rating_factor == check.rating_factor && b.family <= check.family => Some(b),
            _ => Some(check),
        };
    }
    best
}

/// Posting loads for a failing rating.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PostingLoad {
    /// `floor_off(W·RF)`
    pub safe_posting_load_tons: f64,
    /// `W·(RF − 0.3)/0.7`, not less than zero
    pub mbe_posting_load_tons: f64,
}

/// Posting loads for `rf`, `None` when the rating passes.
pub fn posting_load(weight_tons: f64, rf: f64, tolerance_tons: f64) -> Option<PostingLoad> {
    if rf >= 1.0 {
        return None;
    }
    let safe = floor_off((weight_tons * rf).max(0.0), tolerance_tons);
    let mbe = floor_off((weight_tons * (rf - 0.3) / 0.7).max(0.0), tolerance_tons);
    Some(PostingLoad {
        safe_posting_load_tons: safe,
        mbe_posting_load_tons: mbe,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GoverningRating {
    pub poi: PoiId,
    pub family: CheckFamily,
    pub rating_factor: f64,
}

/// Rating of one vehicle along the girder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleRating {
    pub vehicle: String,
    pub rating_type: RatingType,
    pub weight_tons: f64,
    pub pois: Vec<PoiRating>,
    /// `None` when no check applies anywhere
    pub governing: Option<GoverningRating>,
    pub passes: bool,
    pub posting: Option<PostingLoad>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

// ============================================================================
// Engine
// ============================================================================

/// Results the rating reads at one POI, all in the rating interval.
#[derive(Debug, Clone, Copy)]
pub struct PoiRatingInput<'a> {
    pub poi: &'a PointOfInterest,
    pub losses: &'a LossHistory,
    pub positive_capacity: &'a MomentCapacityDetails,
    pub negative_capacity: &'a MomentCapacityDetails,
    pub positive_cracking: &'a CrackingMomentDetails,
    pub negative_cracking: &'a CrackingMomentDetails,
    /// Nominal vertical shear resistance from the shear design
    pub nominal_shear_kip: Option<f64>,
    /// Spliced girders only
    pub time_dependent: Option<&'a TimeDependentEffects>,
}

fn girder_role(poi: &PointOfInterest) -> ConcreteRole {
    if poi.is_closure_joint() {
        ConcreteRole::ClosureJoint
    } else {
        ConcreteRole::Segment
    }
}

/// Rate one vehicle at every POI in `inputs`.
pub fn rate_vehicle(
    ctx: &AnalysisContext<'_>,
    vehicle: &RatingVehicle,
    inputs: &[PoiRatingInput<'_>],
) -> EngineResult<VehicleRating> {
    vehicle.validate()?;
    let pois = inputs
        .iter()
        .map(|input| rate_poi(ctx, vehicle, input))
        .collect::<EngineResult<Vec<_>>>()?;

    let governing = governing(pois.iter().filter_map(PoiRating::governing)).map(|c| GoverningRating {
        poi: c.poi,
        family: c.family,
        rating_factor: c.rating_factor,
    });
    let passes = governing.map_or(true, |g| g.rating_factor >= 1.0);
    let posting = governing.and_then(|g| {
        posting_load(vehicle.weight_tons, g.rating_factor, ctx.criteria.rating.posting_tolerance_tons)
    });

    let mut diagnostics = Vec::new();
    if let Some(g) = governing.filter(|g| g.rating_factor < 1.0) {
        diagnostics.push(Diagnostic::warning(
            "RATING_FACTOR_BELOW_ONE",
            format!(
                "{} rating factor {:.3} for '{}' ({})",
                g.family, g.rating_factor, vehicle.name, vehicle.rating_type
            ),
            AnalysisLocation::at_poi(ctx.segment.key, g.poi),
        ));
    }

    info!(
        vehicle = %vehicle.name,
        rating_type = ?vehicle.rating_type,
        rf = governing.map(|g| g.rating_factor),
        "load rating complete"
    );

    Ok(VehicleRating {
        vehicle: vehicle.name.clone(),
        rating_type: vehicle.rating_type,
        weight_tons: vehicle.weight_tons,
        pois,
        governing,
        passes,
        posting,
        diagnostics,
    })
}

/// All six checks for one vehicle at one POI.
pub fn rate_poi(
    ctx: &AnalysisContext<'_>,
    vehicle: &RatingVehicle,
    input: &PoiRatingInput<'_>,
) -> EngineResult<PoiRating> {
    let poi = input.poi;
    let Some(effect) = vehicle.effect(poi.id) else {
        let na = || Applicability::not_applicable(format!("'{}' has no load effects at poi {}", vehicle.name, poi.id));
        return Ok(PoiRating {
            poi: poi.id,
            positive_moment: na(),
            negative_moment: na(),
            shear: na(),
            stress: na(),
            yield_stress_positive: na(),
            yield_stress_negative: na(),
        });
    };
    let interval = ctx.timeline.last_interval();
    let rating = &ctx.criteria.rating;
    let cs = condition_system_factor(
        rating.condition_factor,
        rating.system_factor,
        rating.min_condition_system_product,
    );
    let dc_loads = loads_in(LoadCategory::Dc);
    let dw_loads = loads_in(LoadCategory::Dw);
    let strength_dead = |dc: f64, dw: f64, restraint: Vec<DeadLoadTerm>| {
        let mut terms = vec![
            DeadLoadTerm {
                name: "DC".into(),
                factor: rating.dead_load_factor,
                effect: dc,
            },
            DeadLoadTerm {
                name: "DW".into(),
                factor: rating.wearing_surface_factor,
                effect: dw,
            },
        ];
        terms.extend(restraint);
        terms
    };
    let restraint_moment = || input.time_dependent.map(|t| t.moment_terms(rating)).unwrap_or_default();

    let m_dc = ctx.forces.cumulative_moment(interval, &dc_loads, poi)?;
    let m_dw = ctx.forces.cumulative_moment(interval, &dw_loads, poi)?;

    let moment_check = |family: CheckFamily, capacity: &MomentCapacityDetails, live: f64| {
        if capacity.mn_kip_in == 0.0 {
            return Applicability::not_applicable(format!("no {} moment reinforcement", capacity.sign));
        }
        RatingCheck::evaluate(
            family,
            poi.id,
            RatingFactorTerms {
                condition_system_factor: cs,
                phi: capacity.phi,
                capacity: capacity.mn_kip_in,
                dead: strength_dead(m_dc, m_dw, restraint_moment()),
                live_load_factor: vehicle.strength_factor(),
                live_load: live,
                distribution_factor: vehicle.moment_distribution_factor,
            },
        )
    };
    let positive_moment = moment_check(CheckFamily::PositiveMoment, input.positive_capacity, effect.moment_max_kip_in);
    let negative_moment = moment_check(CheckFamily::NegativeMoment, input.negative_capacity, effect.moment_min_kip_in);

    let shear = match input.nominal_shear_kip {
        Some(vn) => {
            let v_dc = ctx.forces.cumulative_shear(interval, &dc_loads, poi)?.abs();
            let v_dw = ctx.forces.cumulative_shear(interval, &dw_loads, poi)?.abs();
            RatingCheck::evaluate(
                CheckFamily::Shear,
                poi.id,
                RatingFactorTerms {
                    condition_system_factor: cs,
                    phi: ctx.criteria.resistance.shear,
                    capacity: vn,
                    dead: strength_dead(
                        v_dc,
                        v_dw,
                        input.time_dependent.map(|t| t.shear_terms(rating)).unwrap_or_default(),
                    ),
                    live_load_factor: vehicle.strength_factor(),
                    live_load: effect.shear_kip.abs(),
                    distribution_factor: vehicle.shear_distribution_factor,
                },
            )
        }
        None => Applicability::not_applicable("no nominal shear resistance supplied"),
    };

    let props = ctx.sections.section_properties(interval, poi, ctx.criteria.section_properties)?;

    let stress = if vehicle.rating_type.checks_tension_stress() {
        tension_stress_check(ctx, vehicle, input, effect, &props, interval)?
    } else {
        Applicability::not_applicable(format!("{} has no stress rating", vehicle.rating_type))
    };

    let (yield_stress_positive, yield_stress_negative) = if vehicle.rating_type.checks_yield_stress() {
        (
            yield_stress_check(ctx, vehicle, input, effect, &props, interval, MomentSign::Positive)?,
            yield_stress_check(ctx, vehicle, input, effect, &props, interval, MomentSign::Negative)?,
        )
    } else {
        let reason = format!("{} has no yield stress rating", vehicle.rating_type);
        (
            Applicability::not_applicable(reason.clone()),
            Applicability::not_applicable(reason),
        )
    };

    let result = PoiRating {
        poi: poi.id,
        positive_moment,
        negative_moment,
        shear,
        stress,
        yield_stress_positive,
        yield_stress_negative,
    };
    debug!(
        poi = %poi.id,
        vehicle = %vehicle.name,
        rf = result.governing().map(|c| c.rating_factor),
        "poi rating"
    );
    Ok(result)
}

/// Bottom fiber tension under Service III against `k·√f'c`.
fn tension_stress_check(
    ctx: &AnalysisContext<'_>,
    vehicle: &RatingVehicle,
    input: &PoiRatingInput<'_>,
    effect: &VehicleLoadEffect,
    props: &SectionProperties,
    interval: IntervalIndex,
) -> EngineResult<Applicability<RatingCheck>> {
    let poi = input.poi;
    let mode = ctx.criteria.section_properties;

    // each load stresses the section it was applied to
    let mut f_dc = 0.0;
    let mut f_dw = 0.0;
    for step in 0..=interval.0 {
        let step = IntervalIndex(step);
        let mut m_dc = 0.0;
        let mut m_dw = 0.0;
        for load in ProductLoad::ALL.iter().filter(|l| !l.is_prestress()) {
            let m = ctx.forces.moment(step, *load, poi)?;
            match load.category() {
                LoadCategory::Dw => m_dw += m,
                _ => m_dc += m,
            }
        }
        if m_dc == 0.0 && m_dw == 0.0 {
            continue;
        }
        let p = ctx.sections.section_properties(step, poi, mode)?;
        f_dc += m_dc / p.s_bottom_in3();
        f_dw += m_dw / p.s_bottom_in3();
    }

    let (force, y) = input.losses.at(interval)?.prestress_resultant();
    let e = props.eccentricity_of(y);
    let f_ps = -(force / props.area_in2 + force * e / props.s_bottom_in3());
    let f_ll = effect.moment_max_kip_in / props.s_bottom_in3();

    let fc = ctx.materials.strength(girder_role(poi), poi.segment, interval)?;
    let allowable = ctx.criteria.rating.allowable_tension_coefficient * fc.sqrt();

    Ok(RatingCheck::evaluate(
        CheckFamily::Stress,
        poi.id,
        RatingFactorTerms {
            condition_system_factor: 1.0,
            phi: 1.0,
            capacity: allowable,
            dead: vec![
                DeadLoadTerm {
                    name: "DC".into(),
                    factor: 1.0,
                    effect: f_dc,
                },
                DeadLoadTerm {
                    name: "DW".into(),
                    factor: 1.0,
                    effect: f_dw,
                },
                DeadLoadTerm {
                    name: "PS".into(),
                    factor: 1.0,
                    effect: f_ps,
                },
            ],
            live_load_factor: vehicle.service_factor(),
            live_load: f_ll,
            distribution_factor: vehicle.moment_distribution_factor,
        },
    ))
}

/// Cracked transformed section about the neutral axis, in depths from the
/// compression face.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CrackedSection {
    pub c_in: f64,
    /// In units of the reference concrete
    pub icr_in4: f64,
}

/// Cracked section of rectangular concrete blocks `(width, top, bottom,
/// ratio)` and steel `(area, depth, ratio)`, with ratios relative to the
/// reference modulus. Steel above the neutral axis is counted in compression.
pub fn cracked_section(blocks: &[(f64, f64, f64, f64)], steel: &[(f64, f64, f64)]) -> Option<CrackedSection> {
    let height = blocks.iter().map(|b| b.2).fold(0.0, f64::max);
    if height <= 0.0 || steel.is_empty() {
        return None;
    }
    let first_moment = |c: f64| {
        let concrete: f64 = blocks
            .iter()
            .map(|&(b, top, bottom, n)| {
                let z2 = bottom.min(c);
                if z2 <= top {
                    return 0.0;
                }
                n * b * (z2 - top) * (c - 0.5 * (top + z2))
            })
            .sum();
        let steel: f64 = steel.iter().map(|&(a, d, n)| n * a * (d - c)).sum();
        concrete - steel
    };
    let (mut lo, mut hi) = (0.0, height);
    if first_moment(hi) < 0.0 {
        return None;
    }
    for _ in 0..100 {
        let mid = 0.5 * (lo + hi);
        if first_moment(mid) < 0.0 {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    let c = 0.5 * (lo + hi);
    let concrete: f64 = blocks
        .iter()
        .map(|&(b, top, bottom, n)| {
            let z2 = bottom.min(c);
            if z2 <= top {
                return 0.0;
            }
            n * b * ((c - top).powi(3) - (c - z2).powi(3)) / 3.0
        })
        .sum();
    let steel: f64 = steel.iter().map(|&(a, d, n)| n * a * (d - c).powi(2)).sum();
    Some(CrackedSection {
        c_in: c,
        icr_in4: concrete + steel,
    })
}

/// Steel stress gained when the moment magnitude grows from `m0` by `dm`:
/// elastic on the gross section up to `mcr`, cracked beyond it.
fn steel_stress_increase(m0: f64, dm: f64, mcr: f64, n: f64, uncracked_lever: f64, i: f64, cracked: CrackedSection, d: f64) -> f64 {
    let m1 = m0 + dm;
    let uncracked = (m1.min(mcr) - m0).max(0.0);
    let beyond = (m1 - m0.max(mcr)).max(0.0);
    n * uncracked * uncracked_lever / i + n * beyond * (d - cracked.c_in) / cracked.icr_in4
}

/// Reinforcement stress under Service I against `K·fy`.
fn yield_stress_check(
    ctx: &AnalysisContext<'_>,
    vehicle: &RatingVehicle,
    input: &PoiRatingInput<'_>,
    effect: &VehicleLoadEffect,
    props: &SectionProperties,
    interval: IntervalIndex,
    sign: MomentSign,
) -> EngineResult<Applicability<RatingCheck>> {
    let poi = input.poi;
    let location = AnalysisLocation::new(poi.segment, poi.id, interval);
    let (family, live, cracking) = match sign {
        MomentSign::Positive => (CheckFamily::YieldStressPositive, effect.moment_max_kip_in, input.positive_cracking),
        MomentSign::Negative => (CheckFamily::YieldStressNegative, effect.moment_min_kip_in, input.negative_cracking),
    };
    if live * sign.signum() <= 0.0 {
        return Ok(Applicability::not_applicable(format!("no {} moment live load", sign)));
    }

    let geometry = ctx.sections.section_geometry(interval, poi)?;
    let top = geometry.top_in();
    let bottom = geometry.bottom_in();
    let depth_of = |y: f64| match sign {
        MomentSign::Positive => top - y,
        MomentSign::Negative => y - bottom,
    };
    let e_ref = props.e_ref_ksi;
    if e_ref <= 0.0 {
        return Err(EngineError::degenerate("yield stress rating", location, "reference modulus is not positive"));
    }

    let non_prestress: Vec<ProductLoad> = ProductLoad::ALL.into_iter().filter(|l| !l.is_prestress()).collect();
    // steel layers as (area, y, modulus)
    let (steel, fpe, fy, m_before) = match sign {
        MomentSign::Positive => {
            let details = input.losses.at(interval)?;
            let bonded = || details.streams.iter().filter(|s| s.is_active() && s.area_in2 > 0.0);
            let Some(deepest) = bonded().min_by(|a, b| a.y_in.total_cmp(&b.y_in)) else {
                return Ok(Applicability::not_applicable("no bonded prestressing steel"));
            };
            let steel: Vec<(f64, f64, f64)> = bonded()
                .map(|s| {
                    let ep = if s.stream.is_pretension() {
                        ctx.materials.strand().ep_ksi
                    } else {
                        ctx.materials.tendon().ep_ksi
                    };
                    (s.area_in2, s.y_in, ep)
                })
                .collect();
            let fy = if deepest.stream.is_pretension() {
                ctx.materials.strand().fpy_ksi
            } else {
                ctx.materials.tendon().fpy_ksi
            };
            // effective prestress already carries the elastic gain from dead load
            let m_before = ctx.forces.cumulative_moment(interval, &non_prestress, poi)?;
            (steel, Some(deepest.fpe_ksi), fy, m_before)
        }
        MomentSign::Negative => {
            let Some(composite) = ctx.timeline.composite_deck_interval().filter(|c| *c <= interval) else {
                return Ok(Applicability::not_applicable("no composite deck"));
            };
            let rebar = ctx.materials.rebar();
            let steel: Vec<(f64, f64, f64)> = geometry
                .layers
                .iter()
                .filter(|l| matches!(l.kind, LayerKind::Rebar { in_deck: true }))
                .map(|l| (l.area_in2, l.y_in, rebar.es_ksi))
                .collect();
            if steel.is_empty() {
                return Ok(Applicability::not_applicable("no deck reinforcement"));
            }
            // only load applied to the composite section stresses the deck bars
            let through = ctx.forces.cumulative_moment(interval, &non_prestress, poi)?;
            let before_deck = match composite.previous() {
                Some(p) => ctx.forces.cumulative_moment(p, &non_prestress, poi)?,
                None => 0.0,
            };
            (steel, None, rebar.fy_ksi, through - before_deck)
        }
    };

    let blocks: Vec<(f64, f64, f64, f64)> = geometry
        .components
        .iter()
        .map(|c| {
            let ec = ctx.materials.modulus(c.role, poi.segment, interval)?;
            let (d_top, d_bottom) = match sign {
                MomentSign::Positive => (top - c.top_in(), top - c.bottom_in),
                MomentSign::Negative => (c.bottom_in - bottom, c.top_in() - bottom),
            };
            Ok((c.width_in, d_top, d_bottom, ec / e_ref))
        })
        .collect::<EngineResult<_>>()?;
    let cracked_steel: Vec<(f64, f64, f64)> = steel.iter().map(|&(a, y, es)| (a, depth_of(y), es / e_ref)).collect();
    let Some(cracked) = cracked_section(&blocks, &cracked_steel) else {
        return Err(EngineError::degenerate(
            "yield stress rating",
            location,
            "cracked section has no equilibrium",
        ));
    };

    // extreme tension layer
    let Some(&(_, y_s, es)) = steel.iter().max_by(|a, b| depth_of(a.1).total_cmp(&depth_of(b.1))) else {
        return Ok(Applicability::not_applicable("no tension reinforcement"));
    };
    let n = es / e_ref;
    let d = depth_of(y_s);
    let lever = match sign {
        MomentSign::Positive => props.centroid_y_in - y_s,
        MomentSign::Negative => y_s - props.centroid_y_in,
    };
    let s = sign.signum();
    let m0 = (s * m_before).max(0.0);
    let mcr = s * cracking.mcr_kip_in;
    let fs_dead = match fpe {
        Some(fpe) => fpe,
        None => steel_stress_increase(0.0, m0, mcr, n, lever, props.ixx_in4, cracked, d),
    };
    let ll = vehicle.service_factor() * s * live * vehicle.moment_distribution_factor;
    let fs_live = steel_stress_increase(m0, ll, mcr, n, lever, props.ixx_in4, cracked, d);

    let allowable = ctx.criteria.rating.yield_stress_coefficient * fy;
    let check = RatingCheck::evaluate(
        family,
        poi.id,
        RatingFactorTerms {
            condition_system_factor: 1.0,
            phi: 1.0,
            capacity: allowable,
            dead: vec![DeadLoadTerm {
                name: "fs".into(),
                factor: 1.0,
                effect: fs_dead,
            }],
            // the live-load stress is already factored and distributed
            live_load_factor: 1.0,
            live_load: fs_live,
            distribution_factor: 1.0,
        },
    );
    Ok(check)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capacity::{cracking_moment, moment_capacity};
    use crate::fixtures;
    use crate::losses::compute_losses;
    use crate::materials::MaterialModel;
    use proptest::prelude::*;

    fn terms(capacity: f64, dead: f64, live: f64) -> RatingFactorTerms {
        RatingFactorTerms {
            condition_system_factor: 1.0,
            phi: 1.0,
            capacity,
            dead: vec![DeadLoadTerm {
                name: "DC".into(),
                factor: 1.0,
                effect: dead,
            }],
            live_load_factor: 1.0,
            live_load: live,
            distribution_factor: 1.0,
        }
    }

    fn check(family: CheckFamily, rf: f64) -> RatingCheck {
        RatingCheck {
            family,
            poi: PoiId(1),
            terms: terms(1.0, 0.0, 1.0),
            rating_factor: rf,
            passes: rf >= 1.0,
        }
    }

    fn vehicle(rating_type: RatingType) -> RatingVehicle {
        RatingVehicle {
            name: "HL-93".into(),
            rating_type,
            weight_tons: 36.0,
            moment_distribution_factor: 0.6,
            shear_distribution_factor: 0.7,
            live_load_factor: None,
            service_live_load_factor: None,
            effects: vec![VehicleLoadEffect {
                poi: PoiId(3),
                moment_max_kip_in: 15_000.0,
                moment_min_kip_in: 0.0,
                shear_kip: 30.0,
            }],
        }
    }

    #[test]
    fn test_rating_factor_arithmetic() {
        let t = RatingFactorTerms {
            condition_system_factor: 1.0,
            phi: 1.0,
            capacity: 100.0,
            dead: vec![DeadLoadTerm {
                name: "DC".into(),
                factor: 1.25,
                effect: 40.0,
            }],
            live_load_factor: 1.75,
            live_load: 20.0,
            distribution_factor: 0.5,
        };
        assert!((t.rating_factor().unwrap() - 50.0 / 17.5).abs() < 1e-12);
    }

    #[test]
    fn test_condition_system_floor() {
        assert!((condition_system_factor(0.8, 0.9, 0.85) - 0.85).abs() < 1e-12);
        assert!((condition_system_factor(1.0, 0.9, 0.85) - 0.9).abs() < 1e-12);
    }

    #[test]
    fn test_opposite_or_zero_live_load_not_applicable() {
        assert!(terms(-5000.0, -1000.0, 200.0).rating_factor().is_none());
        assert!(terms(5000.0, 1000.0, 0.0).rating_factor().is_none());
        // negative moment: everything negative gives a positive factor
        let rf = terms(-5000.0, -1000.0, -2000.0).rating_factor().unwrap();
        assert!((rf - 2.0).abs() < 1e-12);
        let na = RatingCheck::evaluate(CheckFamily::NegativeMoment, PoiId(1), terms(-1.0, 0.0, 0.0));
        assert!(!na.is_applicable());
    }

    #[test]
    fn test_failing_rating_is_not_clamped() {
        let result = RatingCheck::evaluate(CheckFamily::Shear, PoiId(2), terms(100.0, 150.0, 10.0));
        let check = result.as_option().unwrap();
        assert!((check.rating_factor + 5.0).abs() < 1e-12);
        assert!(!check.passes);
    }

    #[test]
    fn test_posting_loads() {
        assert!(posting_load(36.0, 1.0, 0.01).is_none());
        let posting = posting_load(36.0, 0.8, 0.01).unwrap();
        assert!((posting.safe_posting_load_tons - 28.8).abs() < 1e-9);
        assert!((posting.mbe_posting_load_tons - 25.71).abs() < 1e-9);
        let low = posting_load(36.0, 0.2, 0.01).unwrap();
        assert_eq!(low.mbe_posting_load_tons, 0.0);
    }

    #[test]
    fn test_ties_keep_family_priority() {
        let shear = check(CheckFamily::Shear, 0.9);
        let positive = check(CheckFamily::PositiveMoment, 0.9);
        let stress = check(CheckFamily::Stress, 1.2);
        let best = governing([&shear, &stress, &positive]).unwrap();
        assert_eq!(best.family, CheckFamily::PositiveMoment);
        let lower = check(CheckFamily::YieldStressNegative, 0.5);
        assert_eq!(governing([&positive, &lower]).unwrap().family, CheckFamily::YieldStressNegative);
        assert!(governing(std::iter::empty()).is_none());
    }

    #[test]
    fn test_cracked_rectangle() {
        // b = 12, d = 20, n·As = 8·1.0: 6c² = 8(20 − c)
        let cracked = cracked_section(&[(12.0, 0.0, 24.0, 1.0)], &[(1.0, 20.0, 8.0)]).unwrap();
        let c = (-8.0 + (64.0_f64 + 4.0 * 6.0 * 160.0).sqrt()) / 12.0;
        assert!((cracked.c_in - c).abs() < 1e-6);
        let icr = 12.0 * c.powi(3) / 3.0 + 8.0 * (20.0 - c).powi(2);
        assert!((cracked.icr_in4 - icr).abs() / icr < 1e-6);
    }

    fn rate_midspan_with(
        rating_type: RatingType,
        time_dependent: Option<&TimeDependentEffects>,
    ) -> (fixtures::Fixture, VehicleRating) {
        let fixture = fixtures::pretensioned_girder(0);
        let rating = {
            let ctx = fixture.context();
            let poi = fixture.midspan();
            let last = ctx.timeline.last_interval();
            let losses = compute_losses(&ctx, poi).unwrap();
            let pos = moment_capacity(&ctx, poi, last, MomentSign::Positive, &losses).unwrap();
            let neg = moment_capacity(&ctx, poi, last, MomentSign::Negative, &losses).unwrap();
            let pos_cr = cracking_moment(&ctx, poi, last, MomentSign::Positive, &losses).unwrap();
            let neg_cr = cracking_moment(&ctx, poi, last, MomentSign::Negative, &losses).unwrap();
            let input = PoiRatingInput {
                poi,
                losses: &losses,
                positive_capacity: &pos,
                negative_capacity: &neg,
                positive_cracking: &pos_cr,
                negative_cracking: &neg_cr,
                nominal_shear_kip: Some(250.0),
                time_dependent,
            };
            rate_vehicle(&ctx, &vehicle(rating_type), &[input]).unwrap()
        };
        (fixture, rating)
    }

    fn rate_midspan(rating_type: RatingType) -> (fixtures::Fixture, VehicleRating) {
        rate_midspan_with(rating_type, None)
    }

    #[test]
    fn test_inventory_rating_at_midspan() {
        let (_, rating) = rate_midspan(RatingType::DesignInventory);
        let poi = &rating.pois[0];
        let positive = poi.positive_moment.as_option().unwrap();
        assert!(positive.rating_factor > 0.0);
        let expected = (positive.terms.factored_capacity() - 1.25 * 22_912.0 - 1.5 * 1_800.0)
            / (1.75 * 15_000.0 * 0.6);
        assert!((positive.rating_factor - expected).abs() < 1e-9);
        assert!(!poi.negative_moment.is_applicable());
        assert!(poi.stress.is_applicable());
        assert!(!poi.yield_stress_positive.is_applicable());
        // zero shear at midspan from dead load; live load governs the denominator
        let shear = poi.shear.as_option().unwrap();
        assert!((shear.rating_factor - 0.9 * 250.0 / (1.75 * 30.0 * 0.7)).abs() < 1e-9);
        assert!(rating.governing.is_some());
        assert_eq!(rating.passes, rating.governing.unwrap().rating_factor >= 1.0);
    }

    #[test]
    fn test_spliced_restraint_effects_join_dead_load() {
        let effects = TimeDependentEffects {
            creep_moment_kip_in: 1_200.0,
            secondary_moment_kip_in: -400.0,
            ..Default::default()
        };
        let (_, base) = rate_midspan(RatingType::DesignInventory);
        let (_, spliced) = rate_midspan_with(RatingType::DesignInventory, Some(&effects));
        let before = base.pois[0].positive_moment.as_option().unwrap();
        let after = spliced.pois[0].positive_moment.as_option().unwrap();
        let names: Vec<&str> = after.terms.dead.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, ["DC", "DW", "CR", "PS"]);
        assert!((after.terms.factored_dead_load() - before.terms.factored_dead_load() - 800.0).abs() < 1e-9);
        assert!(after.rating_factor < before.rating_factor);
        // no restraint shear supplied
        assert_eq!(spliced.pois[0].shear.as_option().unwrap().terms.dead.len(), 2);
    }

    #[test]
    fn test_permit_rating_checks_yield_stress() {
        let (fixture, rating) = rate_midspan(RatingType::PermitRoutine);
        let poi = &rating.pois[0];
        assert!(!poi.stress.is_applicable());
        let yield_check = poi.yield_stress_positive.as_option().unwrap();
        let fpy = fixture.materials.strand().fpy_ksi;
        assert!((yield_check.terms.capacity - 0.9 * fpy).abs() < 1e-9);
        assert!(yield_check.terms.live_load > 0.0);
        assert!(!poi.yield_stress_negative.is_applicable());
    }

    #[test]
    fn test_missing_effects_are_not_applicable() {
        let fixture = fixtures::pretensioned_girder(0);
        let ctx = fixture.context();
        let poi = fixture.poi(1);
        let last = ctx.timeline.last_interval();
        let losses = compute_losses(&ctx, poi).unwrap();
        let pos = moment_capacity(&ctx, poi, last, MomentSign::Positive, &losses).unwrap();
        let neg = moment_capacity(&ctx, poi, last, MomentSign::Negative, &losses).unwrap();
        let pos_cr = cracking_moment(&ctx, poi, last, MomentSign::Positive, &losses).unwrap();
        let neg_cr = cracking_moment(&ctx, poi, last, MomentSign::Negative, &losses).unwrap();
        let input = PoiRatingInput {
            poi,
            losses: &losses,
            positive_capacity: &pos,
            negative_capacity: &neg,
            positive_cracking: &pos_cr,
            negative_cracking: &neg_cr,
            nominal_shear_kip: None,
            time_dependent: None,
        };
        let rating = rate_vehicle(&ctx, &vehicle(RatingType::LegalRoutine), &[input]).unwrap();
        assert!(rating.pois[0].checks().iter().all(|c| !c.is_applicable()));
        assert!(rating.governing.is_none());
        assert!(rating.passes);
        assert!(rating.posting.is_none());
    }

    #[test]
    fn test_vehicle_validation() {
        let mut v = vehicle(RatingType::LegalRoutine);
        v.weight_tons = 0.0;
        assert!(v.validate().is_err());
        let mut v = vehicle(RatingType::LegalRoutine);
        v.shear_distribution_factor = -1.0;
        assert!(v.validate().is_err());
    }

    proptest! {
        #[test]
        fn prop_pass_boundary_is_exact(live in 1.0f64..1.0e4, dead in 0.0f64..1.0e4, bump in -1.0e-9f64..1.0e-9) {
            let capacity = dead + live * (1.0 + bump);
            let result = RatingCheck::evaluate(CheckFamily::PositiveMoment, PoiId(1), terms(capacity, dead, live));
            let check = result.as_option().unwrap();
            prop_assert_eq!(check.passes, check.rating_factor >= 1.0);
            if check.rating_factor < 1.0 {
                prop_assert!(posting_load(36.0, check.rating_factor, 0.01).is_some());
            } else {
                prop_assert!(posting_load(36.0, check.rating_factor, 0.01).is_none());
            }
        }
    }
}
