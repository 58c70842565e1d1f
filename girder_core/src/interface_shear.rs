//! # Interface Shear
//!
//! Shear friction across the girder/deck interface, per unit length of
//! girder.
//!
//! ```text
//! demand      vui = Vu/dv            (dv = e + yt + ts/2, noncomposite)
//!             vui = Vu·Q/I           (classical shear flow)
//! capacity    vn1 = c·acv + μ·(avf·fy + pc)
//!             vn2 = K1·f'c·acv
//!             vn3 = K2·acv           (not used for UHPC girders)
//! ```
//!
//! The minimum interface reinforcement requirement is waived only when the
//! interface is roughened, every primary stirrup engages the deck and the
//! average interface shear stress is below the edition's threshold.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::context::AnalysisContext;
use crate::criteria::{InterfaceShearFactors, ShearFlowMethod};
use crate::diagnostics::Applicability;
use crate::errors::{AnalysisLocation, EngineError, EngineResult};
use crate::forces::LimitState;
use crate::keys::PoiId;
use crate::losses::LossHistory;
use crate::materials::ConcreteRole;
use crate::poi::PointOfInterest;
use crate::timeline::IntervalIndex;

/// Interface description of one segment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterfaceShearData {
    /// Top flange surface intentionally roughened
    pub roughened: bool,
    /// Width of the mating surface
    pub top_flange_width_in: f64,
    /// Width lost to deck panel seats
    pub deck_panel_support_width_in: f64,
    /// Any other width reduction
    pub width_reduction_in: f64,
    /// Primary vertical stirrups, Av/s (in²/in)
    pub stirrup_area_per_in: f64,
    /// Every primary stirrup extends into the deck
    pub stirrups_engage_deck: bool,
    /// Additional top flange bars crossing the interface, Av/s (in²/in)
    pub additional_avf_per_in: f64,
    /// Permanent compression across the interface (kip/in)
    pub permanent_compression_kip_per_in: f64,
}

impl Default for InterfaceShearData {
    fn default() -> Self {
        InterfaceShearData {
            roughened: true,
            top_flange_width_in: 0.0,
            deck_panel_support_width_in: 0.0,
            width_reduction_in: 0.0,
            stirrup_area_per_in: 0.0,
            stirrups_engage_deck: true,
            additional_avf_per_in: 0.0,
            permanent_compression_kip_per_in: 0.0,
        }
    }
}

impl InterfaceShearData {
    /// Interface width after reductions.
    pub fn bv_in(&self) -> f64 {
        (self.top_flange_width_in - self.deck_panel_support_width_in - self.width_reduction_in).max(0.0)
    }

    /// Reinforcement crossing the interface per unit length.
    pub fn avf_per_in(&self) -> f64 {
        let primary = if self.stirrups_engage_deck {
            self.stirrup_area_per_in
        } else {
            0.0
        };
        primary + self.additional_avf_per_in
    }
}

/// Interface shear check at one POI.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HorizontalShearArtifact {
    pub poi: PoiId,
    pub interval: IntervalIndex,
    pub limit_state: LimitState,
    pub method: ShearFlowMethod,
    pub vu_kip: f64,
    /// Present for the simplified method
    pub dv_in: Option<f64>,
    /// Present for the classical method
    pub q_in3: Option<f64>,
    pub i_in4: Option<f64>,
    /// Shear flow demand (kip/in)
    pub vui_kip_per_in: f64,
    pub bv_in: f64,
    /// Interface area per unit length (in²/in)
    pub acv_in2_per_in: f64,
    pub avf_in2_per_in: f64,
    pub avf_min_in2_per_in: f64,
    pub pc_kip_per_in: f64,
    /// Lesser of the deck and girder strengths
    pub fc_ksi: f64,
    pub fy_ksi: f64,
    pub factors: InterfaceShearFactors,
    pub uhpc: bool,
    pub vn1_kip_per_in: f64,
    pub vn2_kip_per_in: f64,
    pub vn3_kip_per_in: Option<f64>,
    pub vn_kip_per_in: f64,
    pub phi: f64,
    pub phi_vn_kip_per_in: f64,
    pub capacity_passes: bool,
    /// Average interface shear stress vui/acv
    pub shear_stress_ksi: f64,
    pub waiver_threshold_ksi: f64,
    pub min_reinforcement_waived: bool,
    pub min_reinforcement_passes: bool,
}

impl HorizontalShearArtifact {
    pub fn passes(&self) -> bool {
        self.capacity_passes && self.min_reinforcement_passes
    }
}

/// All three conditions are required.
pub fn min_reinforcement_waived(
    roughened: bool,
    stirrups_engage_deck: bool,
    shear_stress_ksi: f64,
    threshold_ksi: f64,
) -> bool {
    roughened && stirrups_engage_deck && shear_stress_ksi < threshold_ksi
}

/// Nominal resistances `(vn1, vn2, vn3)` per unit length.
pub fn nominal_resistances(
    factors: &InterfaceShearFactors,
    acv: f64,
    avf: f64,
    fy: f64,
    pc: f64,
    fc: f64,
    uhpc: bool,
) -> (f64, f64, Option<f64>) {
    let vn1 = factors.cohesion_ksi * acv + factors.friction * (avf * fy + pc);
    let vn2 = factors.k1 * fc * acv;
    let vn3 = (!uhpc).then(|| factors.k2_ksi * acv);
    (vn1, vn2, vn3)
}

/// Interface shear check at `poi` in `interval`. Not applicable before the
/// deck acts compositely or where there is no cast-in-place deck.
pub fn horizontal_shear(
    ctx: &AnalysisContext<'_>,
    poi: &PointOfInterest,
    interval: IntervalIndex,
    limit_state: LimitState,
    data: &InterfaceShearData,
    losses: &LossHistory,
) -> EngineResult<Applicability<HorizontalShearArtifact>> {
    let location = AnalysisLocation::new(poi.segment, poi.id, interval);
    if ctx.segment.deck.is_empty() {
        return Ok(Applicability::not_applicable("No cast-in-place deck"));
    }
    let composite = match ctx.timeline.composite_deck_interval() {
        Some(composite) if composite <= interval => composite,
        _ => return Ok(Applicability::not_applicable("Deck is not composite in this interval")),
    };

    let policy = ctx.policy();
    let mode = ctx.criteria.section_properties;
    let vu = ctx.forces.limit_state_shear(limit_state, poi)?;

    let (vui, dv, q, i) = match ctx.criteria.shear_flow_method {
        ShearFlowMethod::Simplified => {
            let noncomposite_interval = composite.previous().unwrap_or(composite);
            let noncomposite = ctx.sections.section_properties(noncomposite_interval, poi, mode)?;
            let (force, y) = losses.at(interval)?.prestress_resultant();
            let e = if force > 0.0 { noncomposite.eccentricity_of(y) } else { 0.0 };
            let slab = ctx.segment.deck.iter().map(|d| d.height_in).fold(0.0, f64::max);
            let dv = e + noncomposite.y_top_girder_in + 0.5 * slab;
            if dv <= 0.0 {
                return Err(EngineError::degenerate("interface shear", location, format!("dv = {:.3} in", dv)));
            }
            (vu / dv, Some(dv), None, None)
        }
        ShearFlowMethod::Classical => {
            let section = ctx.sections.section_properties(interval, poi, mode)?;
            if section.ixx_in4 <= 0.0 {
                return Err(EngineError::degenerate("interface shear", location, "composite section has no inertia"));
            }
            (
                vu * section.q_deck_in3 / section.ixx_in4,
                None,
                Some(section.q_deck_in3),
                Some(section.ixx_in4),
            )
        }
    };

    let girder_role = if poi.is_closure_joint() {
        ConcreteRole::ClosureJoint
    } else {
        ConcreteRole::Segment
    };
    let fc_deck = ctx.materials.strength(ConcreteRole::Deck, poi.segment, interval)?;
    let fc_girder = ctx.materials.strength(girder_role, poi.segment, interval)?;
    let fc = fc_deck.min(fc_girder);
    let uhpc = ctx.materials.concrete(girder_role, poi.segment)?.concrete_type.is_uhpc();
    let fy = ctx.materials.rebar().fy_ksi;

    let bv = data.bv_in();
    let acv = bv;
    let avf = data.avf_per_in();
    let pc = data.permanent_compression_kip_per_in;
    let factors = policy.interface_factors(data.roughened);
    let (vn1, vn2, vn3) = nominal_resistances(&factors, acv, avf, fy, pc, fc, uhpc);
    let vn = vn3.map_or(vn1.min(vn2), |v3| vn1.min(vn2).min(v3));
    let phi = ctx.criteria.resistance.interface_shear;
    let phi_vn = phi * vn;

    let shear_stress = if acv > 0.0 { vui / acv } else { f64::INFINITY };
    let threshold = policy.interface_waiver_threshold_ksi;
    let waived = min_reinforcement_waived(data.roughened, data.stirrups_engage_deck, shear_stress, threshold);
    let avf_min = if fy > 0.0 {
        policy.interface_min_avf_coefficient_ksi * bv / fy
    } else {
        0.0
    };

    debug!(poi = %poi.id, interval = %interval, vui, phi_vn, waived, "interface shear");

    Ok(Applicability::Applicable(HorizontalShearArtifact {
        poi: poi.id,
        interval,
        limit_state,
        method: ctx.criteria.shear_flow_method,
        vu_kip: vu,
        dv_in: dv,
        q_in3: q,
        i_in4: i,
        vui_kip_per_in: vui,
        bv_in: bv,
        acv_in2_per_in: acv,
        avf_in2_per_in: avf,
        avf_min_in2_per_in: avf_min,
        pc_kip_per_in: pc,
        fc_ksi: fc,
        fy_ksi: fy,
        factors,
        uhpc,
        vn1_kip_per_in: vn1,
        vn2_kip_per_in: vn2,
        vn3_kip_per_in: vn3,
        vn_kip_per_in: vn,
        phi,
        phi_vn_kip_per_in: phi_vn,
        capacity_passes: vui.abs() <= phi_vn,
        shear_stress_ksi: shear_stress,
        waiver_threshold_ksi: threshold,
        min_reinforcement_waived: waived,
        min_reinforcement_passes: waived || avf >= avf_min,
    }))
}
