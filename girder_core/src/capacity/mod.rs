//! # Moment Capacity Engine
//!
//! Nominal flexural capacity by strain compatibility, the cracking moment
//! and the minimum capacity requirement.
//!
//! ## Controlling Modes
//!
//! Each candidate fixes the strain at one fiber. The candidate reached at the
//! smallest curvature governs; ties keep the order below.
//!
//! | Mode                       | Fixed strain                                   |
//! |----------------------------|------------------------------------------------|
//! | `ConcreteCrushing`         | εcu at the compression face                    |
//! | `GirderConcreteCrushing`   | εcu at the top of the girder below a deck      |
//! | `UhpcCrackLocalization`    | εt,loc at the tension face of the UHPC part    |
//! | `ReinforcementStrainLimit` | minimum elongation in a steel layer (optional) |
//!
//! ## Resistance Factor
//!
//! From the 2006 interims φ follows the net tensile strain εt at the extreme
//! tension steel:
//!
//! ```text
//! φ = φc + (φt − φc)·(εt − εcl)/(εtl − εcl),   φc ≤ φ ≤ φRC + (φPS − φRC)·PPR
//! ```
//!
//! Earlier editions use the tension-controlled φ and cap over-reinforced
//! sections with [`over_reinforced::check`].

pub mod cracking;
pub mod development;
pub mod over_reinforced;
pub mod strain_compatibility;
pub mod stress_strain;

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::context::AnalysisContext;
use crate::criteria::{EditionPolicy, SolverSettings, StressBlock};
use crate::diagnostics::Diagnostic;
use crate::errors::{AnalysisLocation, EngineError, EngineResult};
use crate::keys::{PoiId, SegmentKey};
use crate::losses::{LossDetails, LossHistory, LossStream};
use crate::materials::ConcreteRole;
use crate::poi::PointOfInterest;
use crate::section::LayerKind;
use crate::timeline::IntervalIndex;

use development::StrandDevelopment;
use over_reinforced::{CompressionFlange, OverReinforcedCapacity};
use strain_compatibility::{
    ConcreteBlock, FlexuralSection, LayerState, LimitKind, SectionState, SteelLayer, StrainLimit,
};
use stress_strain::{ConcreteLaw, SteelLaw};

pub use cracking::{cracking_moment, min_moment_capacity, CrackingMomentDetails, MinMomentCapacityDetails};

/// Minimum ratio of capacity curvature to first-yield curvature of a UHPC
/// section.
pub const UHPC_DUCTILITY_RATIO_LIMIT: f64 = 3.0;

/// Sense of the applied moment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MomentSign {
    /// Sagging, compression on top
    Positive,
    /// Hogging, compression at the girder bottom
    Negative,
}

impl MomentSign {
    pub fn signum(&self) -> f64 {
        match self {
            MomentSign::Positive => 1.0,
            MomentSign::Negative => -1.0,
        }
    }
}

impl fmt::Display for MomentSign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MomentSign::Positive => write!(f, "positive"),
            MomentSign::Negative => write!(f, "negative"),
        }
    }
}

/// Limit state that fixes the capacity. Declaration order is the tie-break
/// priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ControllingMode {
    ConcreteCrushing,
    GirderConcreteCrushing,
    UhpcCrackLocalization,
    ReinforcementStrainLimit,
}

impl ControllingMode {
    pub fn display_name(&self) -> &'static str {
        match self {
            ControllingMode::ConcreteCrushing => "Concrete crushing",
            ControllingMode::GirderConcreteCrushing => "Girder concrete crushing",
            ControllingMode::UhpcCrackLocalization => "UHPC crack localization",
            ControllingMode::ReinforcementStrainLimit => "Reinforcement strain limit",
        }
    }
}

/// Curvature ductility of a UHPC section.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UhpcDuctility {
    /// Curvature when the deepest steel first yields
    pub yield_curvature_per_in: Option<f64>,
    /// Curvature at capacity
    pub capacity_curvature_per_in: f64,
    pub ratio: Option<f64>,
    pub ratio_limit: f64,
    pub satisfied: bool,
}

/// Flexural capacity at one POI in one interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MomentCapacityDetails {
    pub segment: SegmentKey,
    pub poi: PoiId,
    pub interval: IntervalIndex,
    pub sign: MomentSign,
    /// `None` when the section has no flexural reinforcement
    pub controlling_mode: Option<ControllingMode>,
    /// Neutral axis depth from the compression face
    pub c_in: f64,
    /// Depth of the tension resultant
    pub de_in: f64,
    /// Depth of the resultant of tension steel in the flexural tension half,
    /// used for shear depth
    pub de_shear_in: f64,
    /// Depth of the extreme tension steel
    pub dt_in: f64,
    /// Net tensile strain at `dt`
    pub et: f64,
    pub curvature_per_in: f64,
    /// Average stress in pretensioned strand at capacity
    pub fps_avg_ksi: Option<f64>,
    /// Average stress in tendons at capacity
    pub fpt_avg_ksi: Option<f64>,
    pub compression_kip: f64,
    pub tension_kip: f64,
    /// `C − T` of the returned state
    pub net_force_kip: f64,
    /// Distance between the compression and tension resultants
    pub moment_arm_in: f64,
    /// Partial prestress ratio
    pub ppr: f64,
    /// Nominal capacity, signed with the moment
    pub mn_kip_in: f64,
    pub phi: f64,
    /// Factored capacity, signed with the moment
    pub mr_kip_in: f64,
    pub development_length_reduced_stress: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub development: Vec<StrandDevelopment>,
    pub over_reinforced: Option<OverReinforcedCapacity>,
    pub uhpc_ductility: Option<UhpcDuctility>,
    pub layers: Vec<LayerState>,
    pub iterations: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

impl MomentCapacityDetails {
    fn without_reinforcement(poi: &PointOfInterest, interval: IntervalIndex, sign: MomentSign, phi: f64) -> Self {
        MomentCapacityDetails {
            segment: poi.segment,
            poi: poi.id,
            interval,
            sign,
            controlling_mode: None,
            c_in: 0.0,
            de_in: 0.0,
            de_shear_in: 0.0,
            dt_in: 0.0,
            et: 0.0,
            curvature_per_in: 0.0,
            fps_avg_ksi: None,
            fpt_avg_ksi: None,
            compression_kip: 0.0,
            tension_kip: 0.0,
            net_force_kip: 0.0,
            moment_arm_in: 0.0,
            ppr: 0.0,
            mn_kip_in: 0.0,
            phi,
            mr_kip_in: 0.0,
            development_length_reduced_stress: false,
            development: Vec::new(),
            over_reinforced: None,
            uhpc_ductility: None,
            layers: Vec::new(),
            iterations: 0,
            diagnostics: Vec::new(),
        }
    }
}

/// Nominal and factored flexural capacity at `poi` in `interval`.
///
/// Effective prestress comes from `losses` at the same interval. Prestressing
/// steel is ignored for negative moment.
pub fn moment_capacity(
    ctx: &AnalysisContext<'_>,
    poi: &PointOfInterest,
    interval: IntervalIndex,
    sign: MomentSign,
    losses: &LossHistory,
) -> EngineResult<MomentCapacityDetails> {
    let location = AnalysisLocation::new(poi.segment, poi.id, interval);
    let policy = ctx.policy();
    let details = losses.at(interval)?;
    let mut section = flexural_section(ctx, poi, interval, sign, details, &policy)?;
    let mut diagnostics = Vec::new();

    if section.steel.is_empty() && !section.has_uhpc() {
        let mut result = MomentCapacityDetails::without_reinforcement(
            poi,
            interval,
            sign,
            ctx.criteria.resistance.flexure_compression,
        );
        result.diagnostics.push(Diagnostic::info(
            "NO_FLEXURAL_REINFORCEMENT",
            format!("No {} moment reinforcement; capacity is zero", sign),
            location,
        ));
        return Ok(result);
    }

    let limits = candidate_limits(&section, sign, ctx.criteria.check_reinforcement_strain_limits);
    let rectangular = ctx.criteria.concrete_stress_block == StressBlock::Rectangular && !section.has_uhpc();
    let (mut mode, mut state) = governing_state(&section, &limits, rectangular, &ctx.criteria.solver, location)?;

    let mut development = Vec::new();
    let mut reduced = false;
    if sign == MomentSign::Positive {
        let checks = strand_development(ctx, poi, &section, &state);
        for (index, check) in &checks {
            if check.is_reduced() {
                section.steel[*index].stress_cap_ksi = Some(check.stress_cap_ksi());
                reduced = true;
            }
        }
        if reduced {
            (mode, state) = governing_state(&section, &limits, rectangular, &ctx.criteria.solver, location)?;
            diagnostics.push(Diagnostic::info(
                "DEVELOPMENT_LENGTH_REDUCED_STRESS",
                "Strand stress limited by development length",
                location,
            ));
        }
        development = checks.into_iter().map(|(_, check)| check).collect();
    }

    let height = section.height_in();
    let tension: Vec<&LayerState> = state.layers.iter().filter(|l| l.force_kip > 0.0).collect();
    let de = resultant_depth(tension.iter().copied());
    let de_shear = {
        let deep = tension.iter().copied().filter(|l| l.depth_in >= 0.5 * height);
        match resultant_depth(deep) {
            d if d > 0.0 => d,
            _ => de,
        }
    };
    let deepest = state
        .layers
        .iter()
        .enumerate()
        .filter(|(_, l)| l.force_kip > 0.0)
        .max_by(|(_, a), (_, b)| a.depth_in.total_cmp(&b.depth_in));
    let dt = deepest.map(|(_, l)| l.depth_in).unwrap_or(0.0);
    let et = if dt > 0.0 { state.curvature_per_in * (dt - state.c_in) } else { 0.0 };

    let fps_avg = average_stress(&state.layers, |kind| matches!(kind, LayerKind::Strand { .. }));
    let fpt_avg = average_stress(&state.layers, |kind| matches!(kind, LayerKind::Tendon { .. }));
    let ppr = partial_prestress_ratio(&section, &state);

    let resistance = &ctx.criteria.resistance;
    let phi_tension_max = resistance.flexure_tension_reinforced
        + (resistance.flexure_tension_prestressed - resistance.flexure_tension_reinforced) * ppr;
    let (strain_lo, strain_hi) = deepest
        .map(|(index, _)| section.steel[index].law.flexural_strain_limits())
        .unwrap_or((0.002, 0.005));
    let phi = if section.has_uhpc() {
        interpolate_phi(et, strain_lo, strain_hi, resistance.flexure_compression, resistance.flexure_uhpc)
            .min(resistance.flexure_uhpc)
    } else if policy.strain_based_phi {
        let phi_t = if ppr > 0.0 {
            resistance.flexure_tension_prestressed
        } else {
            resistance.flexure_tension_reinforced
        };
        interpolate_phi(et, strain_lo, strain_hi, resistance.flexure_compression, phi_t).min(phi_tension_max)
    } else {
        phi_tension_max
    };

    let mn = state.moment_kip_in;
    let mut mr = phi * mn;
    let mut over_reinforced = None;
    if policy.over_reinforced_check && !section.has_uhpc() {
        if let Some(flange) = compression_flange(&section) {
            over_reinforced = over_reinforced::check(state.c_in, de, flange);
            if let Some(limit) = &over_reinforced {
                mr = phi * limit.mn_limit_kip_in;
                diagnostics.push(Diagnostic::info(
                    "OVER_REINFORCED",
                    format!("c/de = {:.3}; capacity limited to the over-reinforced value", limit.c_over_de),
                    location,
                ));
            }
        }
    }

    let uhpc_ductility = if section.has_uhpc() {
        let ductility = uhpc_ductility(&section, &state, &ctx.criteria.solver, location)?;
        diagnostics.extend(ductility_warning(&ductility, location));
        Some(ductility)
    } else {
        None
    };

    let signum = sign.signum();
    debug!(
        poi = %poi.id,
        interval = %interval,
        sign = %sign,
        c_in = state.c_in,
        mn_kip_in = signum * mn,
        phi,
        mode = mode.display_name(),
        "moment capacity"
    );

    Ok(MomentCapacityDetails {
        segment: poi.segment,
        poi: poi.id,
        interval,
        sign,
        controlling_mode: Some(mode),
        c_in: state.c_in,
        de_in: de,
        de_shear_in: de_shear,
        dt_in: dt,
        et,
        curvature_per_in: state.curvature_per_in,
        fps_avg_ksi: fps_avg,
        fpt_avg_ksi: fpt_avg,
        compression_kip: state.compression_kip,
        tension_kip: state.tension_kip,
        net_force_kip: state.net_force_kip(),
        moment_arm_in: (de - state.compression_depth_in).max(0.0),
        ppr,
        mn_kip_in: signum * mn,
        phi,
        mr_kip_in: signum * mr,
        development_length_reduced_stress: reduced,
        development,
        over_reinforced,
        uhpc_ductility,
        layers: state.layers,
        iterations: state.iterations,
        diagnostics,
    })
}

/// Concrete and bonded steel at `poi` in compression-face coordinates.
pub fn flexural_section(
    ctx: &AnalysisContext<'_>,
    poi: &PointOfInterest,
    interval: IntervalIndex,
    sign: MomentSign,
    losses: &LossDetails,
    policy: &EditionPolicy,
) -> EngineResult<FlexuralSection> {
    let geometry = ctx.sections.section_geometry(interval, poi)?;
    let top = geometry.top_in();
    let bottom = geometry.bottom_in();
    let depth_of = |y: f64| match sign {
        MomentSign::Positive => top - y,
        MomentSign::Negative => y - bottom,
    };

    let mut concrete = Vec::with_capacity(geometry.components.len());
    for component in &geometry.components {
        let fc = ctx.materials.strength(component.role, poi.segment, interval)?;
        if fc <= 0.0 {
            continue;
        }
        let material = ctx.materials.concrete(component.role, poi.segment)?;
        let top_in = match sign {
            MomentSign::Positive => depth_of(component.top_in()),
            MomentSign::Negative => depth_of(component.bottom_in),
        };
        concrete.push(ConcreteBlock {
            role: component.role,
            top_in,
            height_in: component.height_in,
            width_in: component.width_in,
            law: ConcreteLaw::for_material(material, fc),
            alpha1: policy.alpha1(fc),
            beta1: policy.beta1(fc),
        });
    }

    let mut steel = Vec::with_capacity(geometry.layers.len());
    for layer in &geometry.layers {
        let (law, stream) = match layer.kind {
            LayerKind::Strand { group } => {
                let stream = if group.is_permanent() {
                    LossStream::PermanentStrands
                } else {
                    LossStream::TemporaryStrands
                };
                (SteelLaw::Strand(*ctx.materials.strand()), Some(stream))
            }
            LayerKind::Tendon { tendon } => (SteelLaw::Strand(*ctx.materials.tendon()), Some(LossStream::Tendon { tendon })),
            LayerKind::Rebar { .. } => (SteelLaw::Rebar(*ctx.materials.rebar()), None),
        };
        if sign == MomentSign::Negative && law.is_prestressing() {
            continue;
        }
        let fpe = match stream {
            Some(stream) => match losses.stream(stream) {
                Some(loss) if loss.is_active() => loss.fpe_ksi,
                _ => continue,
            },
            None => 0.0,
        };
        steel.push(SteelLayer {
            kind: layer.kind,
            depth_in: depth_of(layer.y_in),
            area_in2: layer.area_in2,
            law,
            prestrain: fpe / law.modulus_ksi(),
            fpe_ksi: fpe,
            stress_cap_ksi: None,
        });
    }

    Ok(FlexuralSection { concrete, steel })
}

fn is_girder_concrete(role: ConcreteRole) -> bool {
    matches!(role, ConcreteRole::Segment | ConcreteRole::ClosureJoint)
}

fn candidate_limits(section: &FlexuralSection, sign: MomentSign, check_strain: bool) -> Vec<(ControllingMode, StrainLimit)> {
    let mut limits = Vec::new();
    if let Some(face) = section.face_block() {
        limits.push((
            ControllingMode::ConcreteCrushing,
            StrainLimit {
                depth_in: face.top_in,
                kind: LimitKind::ConcreteCompression {
                    strain: face.law.crushing_strain(),
                },
            },
        ));
    }
    let has_deck = section.concrete.iter().any(|b| !is_girder_concrete(b.role));
    if sign == MomentSign::Positive && has_deck {
        let girder_top = section
            .concrete
            .iter()
            .filter(|b| is_girder_concrete(b.role))
            .min_by(|a, b| a.top_in.total_cmp(&b.top_in));
        if let Some(girder) = girder_top.filter(|g| g.top_in > 0.0) {
            limits.push((
                ControllingMode::GirderConcreteCrushing,
                StrainLimit {
                    depth_in: girder.top_in,
                    kind: LimitKind::ConcreteCompression {
                        strain: girder.law.crushing_strain(),
                    },
                },
            ));
        }
    }
    let deepest_uhpc = section
        .concrete
        .iter()
        .filter(|b| b.law.is_uhpc())
        .max_by(|a, b| a.bottom_in().total_cmp(&b.bottom_in()));
    if let Some(block) = deepest_uhpc {
        if let Some(strain) = block.law.localization_strain() {
            limits.push((
                ControllingMode::UhpcCrackLocalization,
                StrainLimit {
                    depth_in: block.bottom_in(),
                    kind: LimitKind::ConcreteTension { strain },
                },
            ));
        }
    }
    if check_strain {
        for layer in &section.steel {
            limits.push((
                ControllingMode::ReinforcementStrainLimit,
                StrainLimit {
                    depth_in: layer.depth_in,
                    kind: LimitKind::SteelTension {
                        strain: layer.law.strain_limit(),
                        prestrain: layer.prestrain,
                    },
                },
            ));
        }
    }
    limits
}

/// The reachable candidate with the smallest curvature; a tie goes to the
/// earlier [`ControllingMode`].
///
/// With `rectangular` set, concrete crushing is solved with the stress block.
/// The block is the equivalent of the εcu profile at the compression face,
/// so its state still has curvature εcu/c and ranks against the fiber
/// candidates on the same measure.
fn governing_state(
    section: &FlexuralSection,
    limits: &[(ControllingMode, StrainLimit)],
    rectangular: bool,
    settings: &SolverSettings,
    location: AnalysisLocation,
) -> EngineResult<(ControllingMode, SectionState)> {
    let mut best: Option<(ControllingMode, SectionState)> = None;
    for (mode, limit) in limits {
        let block = rectangular && *mode == ControllingMode::ConcreteCrushing;
        let Some(state) = strain_compatibility::solve(section, limit, block, settings, location)? else {
            continue;
        };
        let better = match &best {
            Some((current_mode, current)) => {
                state.curvature_per_in < current.curvature_per_in
                    || (state.curvature_per_in == current.curvature_per_in && mode < current_mode)
            }
            None => true,
        };
        if better {
            best = Some((*mode, state));
        }
    }
    best.ok_or_else(|| EngineError::degenerate("moment capacity", location, "no neutral axis balances the section"))
}

/// Development checks of pretensioned strand layers, keyed by layer index.
fn strand_development(
    ctx: &AnalysisContext<'_>,
    poi: &PointOfInterest,
    section: &FlexuralSection,
    state: &SectionState,
) -> Vec<(usize, StrandDevelopment)> {
    let embedment = development::embedment(poi.location_in, ctx.segment.length_in);
    section
        .steel
        .iter()
        .zip(&state.layers)
        .enumerate()
        .filter_map(|(index, (layer, layer_state))| match (layer.kind, layer.law) {
            (LayerKind::Strand { .. }, SteelLaw::Strand(strand)) => Some((
                index,
                StrandDevelopment::new(
                    &strand,
                    ctx.segment.development_kappa,
                    embedment,
                    layer_state.stress_ksi.max(0.0),
                    layer.fpe_ksi,
                ),
            )),
            _ => None,
        })
        .collect()
}

fn resultant_depth<'a>(layers: impl Iterator<Item = &'a LayerState>) -> f64 {
    let (force, moment) = layers.fold((0.0, 0.0), |(f, m), l| (f + l.force_kip, m + l.force_kip * l.depth_in));
    if force > 0.0 {
        moment / force
    } else {
        0.0
    }
}

fn average_stress(layers: &[LayerState], include: impl Fn(LayerKind) -> bool) -> Option<f64> {
    let (area, force) = layers
        .iter()
        .filter(|l| include(l.kind))
        .fold((0.0, 0.0), |(a, f), l| (a + l.area_in2, f + l.force_kip));
    (area > 0.0).then(|| force / area)
}

/// `Aps·fpy / (Aps·fpy + As·fy)` over the steel in tension.
fn partial_prestress_ratio(section: &FlexuralSection, state: &SectionState) -> f64 {
    let (prestressed, total) = section
        .steel
        .iter()
        .zip(&state.layers)
        .filter(|(_, l)| l.force_kip > 0.0)
        .fold((0.0, 0.0), |(p, t), (layer, _)| {
            let capacity = layer.area_in2 * layer.law.yield_stress_ksi();
            if layer.law.is_prestressing() {
                (p + capacity, t + capacity)
            } else {
                (p, t + capacity)
            }
        });
    if total > 0.0 {
        prestressed / total
    } else {
        0.0
    }
}

fn interpolate_phi(et: f64, ecl: f64, etl: f64, phi_c: f64, phi_t: f64) -> f64 {
    let t = if etl > ecl { ((et - ecl) / (etl - ecl)).clamp(0.0, 1.0) } else { 1.0 };
    phi_c + (phi_t - phi_c) * t
}

/// Flange taken from the compression-face part; the web is the narrowest
/// part of the section.
fn compression_flange(section: &FlexuralSection) -> Option<CompressionFlange> {
    let face = section.face_block()?;
    let bw = section
        .concrete
        .iter()
        .map(|b| b.width_in)
        .fold(f64::INFINITY, f64::min);
    Some(CompressionFlange {
        fc_ksi: face.law.fc_ksi(),
        beta1: face.beta1,
        b_in: face.width_in,
        bw_in: bw.min(face.width_in),
        hf_in: face.height_in,
    })
}

fn uhpc_ductility(
    section: &FlexuralSection,
    state: &SectionState,
    settings: &SolverSettings,
    location: AnalysisLocation,
) -> EngineResult<UhpcDuctility> {
    let deepest = section
        .steel
        .iter()
        .max_by(|a, b| a.depth_in.total_cmp(&b.depth_in));
    let yield_curvature = match deepest {
        Some(layer) => {
            let limit = StrainLimit {
                depth_in: layer.depth_in,
                kind: LimitKind::SteelTension {
                    strain: layer.law.yield_strain(),
                    prestrain: layer.prestrain,
                },
            };
            strain_compatibility::solve(section, &limit, false, settings, location)?.map(|s| s.curvature_per_in)
        }
        None => None,
    };
    let ratio = yield_curvature
        .filter(|k| *k > 0.0)
        .map(|k| state.curvature_per_in / k);
    Ok(UhpcDuctility {
        yield_curvature_per_in: yield_curvature,
        capacity_curvature_per_in: state.curvature_per_in,
        ratio,
        ratio_limit: UHPC_DUCTILITY_RATIO_LIMIT,
        satisfied: ratio.is_some_and(|r| r >= UHPC_DUCTILITY_RATIO_LIMIT),
    })
}

fn ductility_warning(ductility: &UhpcDuctility, location: AnalysisLocation) -> Option<Diagnostic> {
    (!ductility.satisfied).then(|| {
        Diagnostic::warning(
            "UHPC_DUCTILITY",
            format!(
                "Curvature ductility {:.2} is below {:.1}",
                ductility.ratio.unwrap_or(0.0),
                ductility.ratio_limit
            ),
            location,
        )
    })
}

#[cfg(test)]
mod tests {
    use super::stress_strain::UHPC_CRUSHING_STRAIN;
    use super::*;
    use crate::criteria::SpecEdition;
    use crate::diagnostics::Severity;
    use crate::fixtures::{self, Fixture};
    use crate::losses::compute_losses;
    use crate::materials::{RebarMaterial, UhpcTension};

    fn final_capacity(fixture: &Fixture, poi: u32, sign: MomentSign) -> MomentCapacityDetails {
        let ctx = fixture.context();
        let poi = fixture.poi(poi);
        let losses = compute_losses(&ctx, poi).unwrap();
        moment_capacity(&ctx, poi, fixture.timeline.last_interval(), sign, &losses).unwrap()
    }

    #[test]
    fn test_positive_capacity_at_midspan() {
        let fixture = fixtures::pretensioned_girder(0);
        let capacity = final_capacity(&fixture, 3, MomentSign::Positive);
        assert_eq!(capacity.controlling_mode, Some(ControllingMode::ConcreteCrushing));
        assert!(capacity.c_in > 0.0 && capacity.c_in < 8.0, "c = {}", capacity.c_in);
        assert!(capacity.net_force_kip.abs() <= fixture.criteria.solver.force_tolerance_kip);
        assert!(capacity.mn_kip_in > 50_000.0 && capacity.mn_kip_in < 90_000.0, "Mn = {}", capacity.mn_kip_in);
        assert!(capacity.et > 0.005);
        assert!((capacity.phi - 1.0).abs() < 1e-12);
        assert!(!capacity.development_length_reduced_stress);
        let fps = capacity.fps_avg_ksi.unwrap();
        assert!(fps > 240.0 && fps <= 270.0, "fps = {}", fps);
    }

    #[test]
    fn test_negative_capacity_uses_deck_rebar() {
        let fixture = fixtures::pretensioned_girder(0);
        let capacity = final_capacity(&fixture, 3, MomentSign::Negative);
        assert!(capacity.mn_kip_in < 0.0);
        assert!(capacity.layers.iter().all(|l| matches!(l.kind, LayerKind::Rebar { .. })));
        assert!(capacity.net_force_kip.abs() <= fixture.criteria.solver.force_tolerance_kip);
        assert_eq!(capacity.ppr, 0.0);
        assert!((capacity.phi - 0.9).abs() < 1e-12);
        assert!(capacity.fps_avg_ksi.is_none());
    }

    #[test]
    fn test_development_reduces_strand_stress_near_end() {
        let fixture = fixtures::pretensioned_girder(0);
        let capacity = final_capacity(&fixture, 1, MomentSign::Positive);
        assert!(capacity.development_length_reduced_stress);
        assert!(capacity.development.iter().all(|d| d.is_reduced()));
        assert!(capacity
            .layers
            .iter()
            .filter(|l| matches!(l.kind, LayerKind::Strand { .. }))
            .all(|l| l.capped));
        let midspan = final_capacity(&fixture, 3, MomentSign::Positive);
        assert!(capacity.mn_kip_in < midspan.mn_kip_in);
    }

    #[test]
    fn test_fixed_phi_before_2006() {
        let mut fixture = fixtures::pretensioned_girder(0);
        fixture.criteria.edition = SpecEdition::FirstEdition1994;
        let capacity = final_capacity(&fixture, 3, MomentSign::Positive);
        assert_eq!(capacity.phi, fixture.criteria.resistance.flexure_tension_prestressed);
        assert!(capacity.over_reinforced.is_none());
        assert!((capacity.mr_kip_in - capacity.phi * capacity.mn_kip_in).abs() < 1e-9);
    }

    #[test]
    fn test_strain_limit_check_adds_candidate() {
        let mut fixture = fixtures::pretensioned_girder(0);
        fixture.criteria.check_reinforcement_strain_limits = true;
        let checked = final_capacity(&fixture, 3, MomentSign::Positive);
        let unchecked = final_capacity(&fixtures::pretensioned_girder(0), 3, MomentSign::Positive);
        assert!(checked.curvature_per_in <= unchecked.curvature_per_in + 1e-12);
        assert!(checked.net_force_kip.abs() <= fixture.criteria.solver.force_tolerance_kip);
    }

    #[test]
    fn test_parabolic_block_close_to_rectangular() {
        let mut fixture = fixtures::pretensioned_girder(0);
        fixture.criteria.concrete_stress_block = StressBlock::Parabolic;
        let parabolic = final_capacity(&fixture, 3, MomentSign::Positive);
        let rectangular = final_capacity(&fixtures::pretensioned_girder(0), 3, MomentSign::Positive);
        let ratio = parabolic.mn_kip_in / rectangular.mn_kip_in;
        assert!((ratio - 1.0).abs() < 0.03, "ratio = {}", ratio);
    }

    #[test]
    fn test_phi_interpolation() {
        assert_eq!(interpolate_phi(0.001, 0.002, 0.005, 0.75, 1.0), 0.75);
        assert_eq!(interpolate_phi(0.010, 0.002, 0.005, 0.75, 1.0), 1.0);
        assert!((interpolate_phi(0.0035, 0.002, 0.005, 0.75, 1.0) - 0.875).abs() < 1e-12);
    }

    /// 12 x 24 UHPC beam, f'c = 22 ksi, 2 in² grade 60 at d = 21 in.
    fn uhpc_beam() -> FlexuralSection {
        FlexuralSection {
            concrete: vec![ConcreteBlock {
                role: ConcreteRole::Segment,
                top_in: 0.0,
                height_in: 24.0,
                width_in: 12.0,
                law: ConcreteLaw::Uhpc {
                    fc_ksi: 22.0,
                    ec_ksi: 6930.0,
                    tension: UhpcTension::default(),
                },
                alpha1: 0.85,
                beta1: 0.65,
            }],
            steel: vec![SteelLayer {
                kind: LayerKind::Rebar { in_deck: false },
                depth_in: 21.0,
                area_in2: 2.0,
                law: SteelLaw::Rebar(RebarMaterial::default()),
                prestrain: 0.0,
                fpe_ksi: 0.0,
                stress_cap_ksi: None,
            }],
        }
    }

    #[test]
    fn test_uhpc_beam_controlled_by_crack_localization() {
        let section = uhpc_beam();
        let settings = SolverSettings::default();
        let location = AnalysisLocation::unknown();
        let limits = candidate_limits(&section, MomentSign::Positive, false);
        let modes: Vec<ControllingMode> = limits.iter().map(|(mode, _)| *mode).collect();
        assert_eq!(
            modes,
            [ControllingMode::ConcreteCrushing, ControllingMode::UhpcCrackLocalization]
        );

        let (mode, state) = governing_state(&section, &limits, false, &settings, location).unwrap();
        assert_eq!(mode, ControllingMode::UhpcCrackLocalization);
        let bottom_strain = state.curvature_per_in * (24.0 - state.c_in);
        assert!((bottom_strain - UhpcTension::default().et_loc).abs() < 1e-12);
        assert!(state.face_strain() < UHPC_CRUSHING_STRAIN);
        assert!(state.net_force_kip().abs() <= settings.force_tolerance_kip);

        // the bar is barely past yield when the cracks localize
        let ductility = uhpc_ductility(&section, &state, &settings, location).unwrap();
        assert_eq!(ductility.ratio_limit, 3.0);
        assert_eq!(ductility.capacity_curvature_per_in, state.curvature_per_in);
        assert!(ductility.ratio.is_some_and(|r| r < UHPC_DUCTILITY_RATIO_LIMIT));
        assert!(!ductility.satisfied);
        let warning = ductility_warning(&ductility, location).unwrap();
        assert_eq!(warning.code, "UHPC_DUCTILITY");
        assert_eq!(warning.severity, Severity::Warning);
    }

    #[test]
    fn test_ductile_uhpc_has_no_warning() {
        let ductility = UhpcDuctility {
            yield_curvature_per_in: Some(1.0e-4),
            capacity_curvature_per_in: 3.5e-4,
            ratio: Some(3.5),
            ratio_limit: UHPC_DUCTILITY_RATIO_LIMIT,
            satisfied: true,
        };
        assert!(ductility_warning(&ductility, AnalysisLocation::unknown()).is_none());
    }

    #[test]
    fn test_equal_curvature_keeps_mode_order() {
        let section = uhpc_beam();
        let crushing = candidate_limits(&section, MomentSign::Positive, false)[0].1;
        let tied = [
            (ControllingMode::ReinforcementStrainLimit, crushing),
            (ControllingMode::GirderConcreteCrushing, crushing),
        ];
        let (mode, _) =
            governing_state(&section, &tied, false, &SolverSettings::default(), AnalysisLocation::unknown()).unwrap();
        assert_eq!(mode, ControllingMode::GirderConcreteCrushing);
    }

    #[test]
    fn test_uhpc_girder_capacity() {
        let fixture = fixtures::uhpc_girder();
        let capacity = final_capacity(&fixture, 3, MomentSign::Positive);
        assert_eq!(capacity.controlling_mode, Some(ControllingMode::UhpcCrackLocalization));
        assert!(capacity.net_force_kip.abs() <= fixture.criteria.solver.force_tolerance_kip);
        assert!(capacity.over_reinforced.is_none());
        assert!(capacity.phi <= fixture.criteria.resistance.flexure_uhpc);
        let ductility = capacity.uhpc_ductility.unwrap();
        assert_eq!(ductility.ratio_limit, UHPC_DUCTILITY_RATIO_LIMIT);
        let warned = capacity.diagnostics.iter().any(|d| d.code == "UHPC_DUCTILITY");
        assert_eq!(warned, !ductility.satisfied);
    }
}
