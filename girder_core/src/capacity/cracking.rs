//! Cracking moment and the minimum flexural capacity requirement.
//!
//! ```text
//! Mcr = γ3·[(γ1·fr + γ2·fcpe)·Sc − Mdnc·(Sc/Snc − 1)]
//! ```
//!
//! `fcpe` is the compression from effective prestress at the extreme fiber
//! that cracks under the applied moment, computed on the noncomposite
//! section of the requested interval (the last noncomposite interval once the
//! deck acts compositely). Negative moment cracks the top of the section, where
//! prestress is ignored, so the formula reduces to `γ3·γ1·fr·Sc`.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{MomentCapacityDetails, MomentSign};
use crate::context::AnalysisContext;
use crate::errors::{AnalysisLocation, EngineError, EngineResult};
use crate::forces::{LimitState, ProductLoad};
use crate::keys::PoiId;
use crate::losses::LossHistory;
use crate::materials::ConcreteRole;
use crate::poi::PointOfInterest;
use crate::timeline::IntervalIndex;

/// Cracking moment at one POI.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CrackingMomentDetails {
    pub poi: PoiId,
    pub interval: IntervalIndex,
    pub sign: MomentSign,
    /// Modulus of rupture
    pub fr_ksi: f64,
    /// Compression due to effective prestress at the cracking fiber
    pub fcpe_ksi: f64,
    /// Section modulus of the section resisting the applied moment
    pub sc_in3: f64,
    /// Section modulus of the noncomposite section
    pub snc_in3: f64,
    /// Dead load moment on the noncomposite section
    pub mdnc_kip_in: f64,
    pub gamma1: f64,
    pub gamma2: f64,
    pub gamma3: f64,
    /// Value of the cracking moment equation before any limit
    pub mcr_formula_kip_in: f64,
    /// `Sc·fr`, when the edition limits Mcr by it
    pub mcr_limit_kip_in: Option<f64>,
    /// Girder self-weight moment at release
    pub release_moment_kip_in: f64,
    pub clipped_to_release: bool,
    /// Governing cracking moment, signed with the moment
    pub mcr_kip_in: f64,
}

/// Minimum capacity check at one POI.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MinMomentCapacityDetails {
    pub poi: PoiId,
    pub sign: MomentSign,
    pub mr_kip_in: f64,
    pub mcr_kip_in: f64,
    /// Strength I demand
    pub mu_kip_in: f64,
    /// Cracking moment requirement
    pub mr_min1_kip_in: f64,
    /// Demand requirement
    pub mr_min2_kip_in: f64,
    pub mr_min_kip_in: f64,
    pub passes: bool,
}

fn girder_role(poi: &PointOfInterest) -> ConcreteRole {
    if poi.is_closure_joint() {
        ConcreteRole::ClosureJoint
    } else {
        ConcreteRole::Segment
    }
}

pub fn cracking_moment(
    ctx: &AnalysisContext<'_>,
    poi: &PointOfInterest,
    interval: IntervalIndex,
    sign: MomentSign,
    losses: &LossHistory,
) -> EngineResult<CrackingMomentDetails> {
    let location = AnalysisLocation::new(poi.segment, poi.id, interval);
    let policy = ctx.policy();
    let mode = ctx.criteria.section_properties;
    let release = ctx.timeline.release_interval(poi.segment)?;

    // last interval before the deck acts compositely
    let noncomposite_interval = match ctx.timeline.composite_deck_interval() {
        Some(composite) if composite <= interval => composite.previous().unwrap_or(composite),
        _ => interval,
    };
    let current = ctx.sections.section_properties(interval, poi, mode)?;
    let noncomposite = ctx.sections.section_properties(noncomposite_interval, poi, mode)?;

    let role = match sign {
        MomentSign::Negative if current.is_composite => ConcreteRole::Deck,
        _ => girder_role(poi),
    };
    let fc = ctx.materials.strength(role, poi.segment, interval)?;
    let fr = ctx
        .materials
        .concrete(role, poi.segment)?
        .modulus_of_rupture(fc, ctx.criteria.rupture_coefficient);

    let (sc, snc, fcpe, mdnc) = match sign {
        MomentSign::Positive => {
            let (force, y) = losses.at(interval)?.prestress_resultant();
            if noncomposite.area_in2 <= 0.0 || noncomposite.ixx_in4 <= 0.0 {
                return Err(EngineError::degenerate(
                    "cracking moment",
                    location,
                    "noncomposite section has no area or inertia",
                ));
            }
            let e = noncomposite.eccentricity_of(y);
            let fcpe = force / noncomposite.area_in2 + force * e * noncomposite.y_bottom_in / noncomposite.ixx_in4;
            let loads: Vec<ProductLoad> = ProductLoad::ALL.into_iter().filter(|l| !l.is_prestress()).collect();
            let mdnc = ctx.forces.cumulative_moment(noncomposite_interval, &loads, poi)?;
            (current.s_bottom_in3(), noncomposite.s_bottom_in3(), fcpe, mdnc)
        }
        MomentSign::Negative => {
            let s = current.s_top_in3();
            (s, s, 0.0, 0.0)
        }
    };

    let gamma1 = policy.cracking_gamma1;
    let gamma2 = policy.cracking_gamma2;
    let gamma3 = match sign {
        MomentSign::Negative if policy.apply_gamma3 => {
            let rebar = ctx.materials.rebar();
            rebar.fy_ksi / rebar.fu_ksi
        }
        _ => 1.0,
    };

    let signum = sign.signum();
    let formula = signum * gamma3 * ((gamma1 * fr + gamma2 * fcpe) * sc - mdnc * (sc / snc - 1.0));
    let mut mcr = formula;
    let limit = policy.cracking_moment_floor.then(|| signum * sc * fr);
    if let Some(limit) = limit {
        mcr = match sign {
            MomentSign::Positive => mcr.max(limit),
            MomentSign::Negative => mcr.min(limit),
        };
    }

    let release_moment = ctx
        .forces
        .cumulative_moment(release, &[ProductLoad::GirderSelfWeight], poi)?;
    let clipped = sign == MomentSign::Positive && mcr < release_moment;
    if clipped {
        mcr = release_moment;
    }

    debug!(poi = %poi.id, interval = %interval, sign = %sign, mcr_kip_in = mcr, "cracking moment");

    Ok(CrackingMomentDetails {
        poi: poi.id,
        interval,
        sign,
        fr_ksi: fr,
        fcpe_ksi: fcpe,
        sc_in3: sc,
        snc_in3: snc,
        mdnc_kip_in: mdnc,
        gamma1,
        gamma2,
        gamma3,
        mcr_formula_kip_in: formula,
        mcr_limit_kip_in: limit,
        release_moment_kip_in: release_moment,
        clipped_to_release: clipped,
        mcr_kip_in: mcr,
    })
}

/// Check `Mr` against the lesser of the cracking and demand requirements.
pub fn min_moment_capacity(
    ctx: &AnalysisContext<'_>,
    poi: &PointOfInterest,
    capacity: &MomentCapacityDetails,
    cracking: &CrackingMomentDetails,
) -> EngineResult<MinMomentCapacityDetails> {
    let policy = ctx.policy();
    let envelope = ctx.forces.limit_state_moment(LimitState::StrengthI, poi)?;
    let sign = capacity.sign;
    let mu = match sign {
        MomentSign::Positive => envelope.max,
        MomentSign::Negative => envelope.min,
    };
    let mr_min1 = policy.min_capacity_mcr_factor * cracking.mcr_kip_in;
    let mr_min2 = policy.min_capacity_mu_factor * mu;
    let (mr_min, passes) = match sign {
        MomentSign::Positive => {
            let mr_min = mr_min1.min(mr_min2);
            (mr_min, capacity.mr_kip_in >= mr_min)
        }
        MomentSign::Negative => {
            let mr_min = mr_min1.max(mr_min2);
            (mr_min, capacity.mr_kip_in <= mr_min)
        }
    };
    Ok(MinMomentCapacityDetails {
        poi: poi.id,
        sign,
        mr_kip_in: capacity.mr_kip_in,
        mcr_kip_in: cracking.mcr_kip_in,
        mu_kip_in: mu,
        mr_min1_kip_in: mr_min1,
        mr_min2_kip_in: mr_min2,
        mr_min_kip_in: mr_min,
        passes,
    })
}
