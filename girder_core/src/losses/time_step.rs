//! # Time-Step Recurrence
//!
//! Forward march over the timeline at one POI. Within interval `n` the steps
//! run in this order:
//!
//! 1. Creep, shrinkage and relaxation over the interval duration. Creep is
//!    driven by concrete stress stored in earlier intervals only; the force
//!    each bonded stream loses is fed back onto the section.
//! 2. Prestress transfer in the release interval (elastic shortening).
//! 3. Jacking of tendons stressed in `n` (friction, anchor set, and
//!    shortening of streams bonded earlier).
//! 4. Release of temporary strands.
//! 5. Elastic effect of the external loads applied in `n`.
//! 6. Restrained deck shrinkage acting on the composite section.
//!
//! The only state carried between intervals is each stream's cumulative
//! loss and its record of concrete strain increments, so interval `n` depends
//! on interval `n − 1` and the loads introduced in `n`.
//!
//! ## Sign Convention
//!
//! Concrete stress is compression positive. Forces are compression positive
//! on the concrete. A concrete stress `fc` at a bonded stream changes its
//! loss by `Ep·fc/Ec`.

use tracing::debug;

use super::elastic_shortening::{self, ElasticShorteningInput, ElasticShorteningResult};
use super::post_tensioning;
use super::{LossComponents, LossDetails, LossHistory, LossStream, StreamLoss, StreamState};
use crate::context::AnalysisContext;
use crate::criteria::LossMethod;
use crate::diagnostics::Diagnostic;
use crate::errors::{AnalysisLocation, EngineError, EngineResult};
use crate::forces::ProductLoad;
use crate::keys::{ClosureKey, SegmentKey};
use crate::materials::{ConcreteRole, StrandMaterial};
use crate::poi::PointOfInterest;
use crate::section::{PropertyMode, SectionProperties};
use crate::timeline::{Interval, IntervalIndex};

/// Mutable state of one stream during the march.
#[derive(Debug, Clone)]
struct StreamTrack {
    stream: LossStream,
    area_in2: f64,
    y_in: f64,
    fpj_ksi: f64,
    material: StrandMaterial,
    stressed: IntervalIndex,
    bonded: IntervalIndex,
    removed: Option<IntervalIndex>,
    stressing_day: f64,
    incremental: LossComponents,
    cumulative: LossComponents,
    /// `(day loaded, elastic concrete strain)` at the stream elevation
    strain_history: Vec<(f64, f64)>,
}

impl StreamTrack {
    fn state(&self, interval: IntervalIndex) -> StreamState {
        if interval < self.stressed {
            StreamState::NotStressed
        } else if self.removed.is_some_and(|r| interval >= r) {
            StreamState::Removed
        } else if interval < self.bonded {
            StreamState::Unbonded
        } else {
            StreamState::Bonded
        }
    }

    /// Stress after the losses recorded so far.
    fn stress(&self) -> f64 {
        self.fpj_ksi - self.cumulative.total()
    }

    fn add(&mut self, delta: LossComponents) {
        self.incremental += delta;
        self.cumulative += delta;
    }

    fn snapshot(&self, interval: IntervalIndex, section: Option<&SectionProperties>) -> StreamLoss {
        let state = self.state(interval);
        let fpe = match state {
            StreamState::Unbonded | StreamState::Bonded => self.stress(),
            StreamState::NotStressed | StreamState::Removed => 0.0,
        };
        StreamLoss {
            stream: self.stream,
            state,
            area_in2: self.area_in2,
            y_in: self.y_in,
            eccentricity_in: section.map_or(0.0, |p| p.eccentricity_of(self.y_in)),
            fpj_ksi: self.fpj_ksi,
            incremental: self.incremental,
            cumulative: self.cumulative,
            fpe_ksi: fpe,
            effective_force_kip: self.area_in2 * fpe,
        }
    }
}

/// Which loss component an elastic concrete stress change lands in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ElasticEffect {
    Elastic,
    DeckShrinkage,
}

/// Concrete stress at elevation `y` from an axial force `force` acting at
/// `force_y` and a sagging moment `moment`.
fn concrete_stress(props: &SectionProperties, force: f64, force_y: f64, moment: f64, y: f64) -> f64 {
    let e_force = props.eccentricity_of(force_y);
    let e = props.eccentricity_of(y);
    force / props.area_in2 + force * e_force * e / props.ixx_in4 - moment * e / props.ixx_in4
}

/// Store a concrete stress change in every stream's strain record and apply
/// the elastic loss to the streams bonded in `interval`.
fn apply_concrete_stress(
    streams: &mut [StreamTrack],
    interval: IntervalIndex,
    day: f64,
    ec_ksi: f64,
    effect: ElasticEffect,
    fc_at: impl Fn(f64) -> f64,
) {
    for stream in streams.iter_mut() {
        let strain = fc_at(stream.y_in) / ec_ksi;
        stream.strain_history.push((day, strain));
        if stream.state(interval) != StreamState::Bonded {
            continue;
        }
        let loss = stream.material.ep_ksi * strain;
        let delta = match effect {
            ElasticEffect::Elastic => LossComponents {
                elastic_ksi: loss,
                ..Default::default()
            },
            ElasticEffect::DeckShrinkage => LossComponents {
                deck_shrinkage_ksi: loss,
                ..Default::default()
            },
        };
        stream.add(delta);
    }
}

// ============================================================================
// Streams
// ============================================================================

fn build_streams(ctx: &AnalysisContext<'_>, poi: &PointOfInterest) -> EngineResult<Vec<StreamTrack>> {
    let segment = ctx.segment;
    let mut streams = Vec::new();

    // closure joints carry no pretension
    if !poi.is_closure_joint() {
        let intervals = ctx.timeline.segment_intervals(segment.key)?;
        let stressing_day = ctx.timeline.interval(intervals.stress_strands)?.start_day;
        let strand = *ctx.materials.strand();
        for (stream, permanent) in [(LossStream::PermanentStrands, true), (LossStream::TemporaryStrands, false)] {
            let mut area = 0.0;
            let mut area_y = 0.0;
            let mut area_fpj = 0.0;
            for pattern in segment.strands.iter().filter(|p| p.group.is_permanent() == permanent) {
                let a = f64::from(pattern.strand_count) * strand.area_in2;
                area += a;
                area_y += a * pattern.profile.y_at(poi.location_in);
                area_fpj += a * pattern.fpj_ksi;
            }
            if area <= 0.0 {
                continue;
            }
            streams.push(StreamTrack {
                stream,
                area_in2: area,
                y_in: area_y / area,
                fpj_ksi: area_fpj / area,
                material: strand,
                stressed: intervals.stress_strands,
                bonded: intervals.release,
                removed: if permanent { None } else { intervals.remove_temporary_strands },
                stressing_day,
                incremental: LossComponents::default(),
                cumulative: LossComponents::default(),
                strain_history: Vec::new(),
            });
        }
    }

    let material = *ctx.materials.tendon();
    for tendon in &segment.tendons {
        let stressed = ctx.timeline.tendon_stressing_interval(tendon.key)?;
        let coordinate = segment.tendon_coordinate(tendon, poi.location_in);
        streams.push(StreamTrack {
            stream: LossStream::Tendon { tendon: tendon.key },
            area_in2: f64::from(tendon.strand_count) * material.area_in2,
            y_in: tendon.profile.y_at(coordinate),
            fpj_ksi: tendon.fpj_ksi,
            material,
            stressed,
            // grouted once the stressing interval is over
            bonded: stressed.next(),
            removed: None,
            stressing_day: ctx.timeline.interval(stressed)?.start_day,
            incremental: LossComponents::default(),
            cumulative: LossComponents::default(),
            strain_history: Vec::new(),
        });
    }
    Ok(streams)
}

// ============================================================================
// Steps
// ============================================================================

fn time_dependent_step(
    ctx: &AnalysisContext<'_>,
    segment: SegmentKey,
    role: ConcreteRole,
    interval: &Interval,
    props: &SectionProperties,
    streams: &mut [StreamTrack],
) -> EngineResult<()> {
    if interval.duration_days() <= 0.0 {
        return Ok(());
    }
    let (start, end) = (interval.start_day, interval.end_day);
    let shrinkage = ctx.materials.shrinkage_strain(role, segment, end)?
        - ctx.materials.shrinkage_strain(role, segment, start)?;

    let mut lost_forces = Vec::new();
    for stream in streams.iter_mut() {
        let state = stream.state(interval.index);
        if !matches!(state, StreamState::Unbonded | StreamState::Bonded) {
            continue;
        }
        let mut delta = LossComponents {
            relaxation_ksi: stream.material.relaxation(
                stream.stress(),
                start - stream.stressing_day,
                end - stream.stressing_day,
            ),
            ..Default::default()
        };
        if state == StreamState::Bonded {
            let mut creep_strain = 0.0;
            for &(loaded_day, strain) in &stream.strain_history {
                let growth = ctx.materials.creep_coefficient(role, segment, loaded_day, end)?
                    - ctx.materials.creep_coefficient(role, segment, loaded_day, start)?;
                creep_strain += strain * growth;
            }
            delta.creep_ksi = stream.material.ep_ksi * creep_strain;
            delta.shrinkage_ksi = stream.material.ep_ksi * shrinkage;
            lost_forces.push((stream.area_in2 * delta.time_dependent(), stream.y_in));
        }
        stream.add(delta);
    }

    // force lost by bonded steel unloads the concrete
    for (force, y) in lost_forces {
        apply_concrete_stress(
            streams,
            interval.index,
            interval.middle_day(),
            props.e_ref_ksi,
            ElasticEffect::Elastic,
            |yk| concrete_stress(props, -force, y, 0.0, yk),
        );
    }
    Ok(())
}

/// Transfer the pretension force. Returns the elastic-shortening solution
/// and the girder moment it was computed with, or `None` without strands.
fn transfer_prestress(
    ctx: &AnalysisContext<'_>,
    poi: &PointOfInterest,
    interval: &Interval,
    location: AnalysisLocation,
    streams: &mut [StreamTrack],
) -> EngineResult<Option<(ElasticShorteningResult, f64)>> {
    let n = interval.index;
    let mut aps = 0.0;
    let mut aps_y = 0.0;
    let mut aps_fpj = 0.0;
    let mut aps_relaxation = 0.0;
    for stream in streams
        .iter()
        .filter(|s| s.stream.is_pretension() && s.state(n) == StreamState::Bonded)
    {
        aps += stream.area_in2;
        aps_y += stream.area_in2 * stream.y_in;
        aps_fpj += stream.area_in2 * stream.fpj_ksi;
        aps_relaxation += stream.area_in2 * stream.cumulative.relaxation_ksi;
    }
    if aps <= 0.0 {
        return Ok(None);
    }
    let y = aps_y / aps;

    let gross = ctx.sections.section_properties(n, poi, PropertyMode::Gross)?;
    let girder_moment = ctx.forces.moment(n, ProductLoad::GirderSelfWeight, poi)?;
    let strand = ctx.materials.strand();
    let input = ElasticShorteningInput {
        fpj_ksi: aps_fpj / aps,
        relaxation_before_transfer_ksi: aps_relaxation / aps,
        aps_in2: aps,
        eccentricity_in: gross.eccentricity_of(y),
        area_in2: gross.area_in2,
        inertia_in4: gross.ixx_in4,
        girder_moment_kip_in: girder_moment,
        ep_ksi: strand.ep_ksi,
        eci_ksi: gross.e_ref_ksi,
        fpu_ksi: strand.fpu_ksi,
    };
    let result = elastic_shortening::compute(&input, &ctx.criteria.fcgp_method, location)?;

    apply_concrete_stress(
        streams,
        n,
        interval.middle_day(),
        gross.e_ref_ksi,
        ElasticEffect::Elastic,
        |yk| concrete_stress(&gross, result.force_kip, y, girder_moment, yk),
    );
    Ok(Some((result, girder_moment)))
}

fn stress_tendons(
    ctx: &AnalysisContext<'_>,
    poi: &PointOfInterest,
    interval: &Interval,
    location: AnalysisLocation,
    props: &SectionProperties,
    streams: &mut [StreamTrack],
    diagnostics: &mut Vec<Diagnostic>,
) -> EngineResult<()> {
    let n = interval.index;
    for i in 0..streams.len() {
        let LossStream::Tendon { tendon } = streams[i].stream else {
            continue;
        };
        if streams[i].stressed != n {
            continue;
        }
        let description = ctx
            .segment
            .tendons
            .iter()
            .find(|t| t.key == tendon)
            .ok_or_else(|| EngineError::missing_data(format!("description of tendon {}", tendon)))?;
        let coordinate = ctx.segment.tendon_coordinate(description, poi.location_in);
        let seating = post_tensioning::seating_loss(description, streams[i].material.ep_ksi, coordinate, location);
        streams[i].add(LossComponents {
            friction_ksi: seating.friction_ksi,
            anchor_set_ksi: seating.anchor_set_ksi,
            ..Default::default()
        });
        diagnostics.extend(seating.diagnostics);

        let force = streams[i].area_in2 * seating.fpi_ksi;
        let y = streams[i].y_in;
        apply_concrete_stress(
            streams,
            n,
            interval.middle_day(),
            props.e_ref_ksi,
            ElasticEffect::Elastic,
            |yk| concrete_stress(props, force, y, 0.0, yk),
        );
    }
    Ok(())
}

fn remove_temporary_strands(interval: &Interval, props: &SectionProperties, streams: &mut [StreamTrack]) {
    let n = interval.index;
    let Some(removed) = streams.iter().find(|s| s.removed == Some(n)) else {
        return;
    };
    let force = removed.area_in2 * removed.stress();
    let y = removed.y_in;
    apply_concrete_stress(
        streams,
        n,
        interval.middle_day(),
        props.e_ref_ksi,
        ElasticEffect::Elastic,
        |yk| concrete_stress(props, -force, y, 0.0, yk),
    );
}

fn deck_shrinkage_step(
    ctx: &AnalysisContext<'_>,
    poi: &PointOfInterest,
    interval: &Interval,
    props: &SectionProperties,
    streams: &mut [StreamTrack],
) -> EngineResult<()> {
    let Some(composite) = ctx.timeline.composite_deck_interval() else {
        return Ok(());
    };
    if interval.index < composite || interval.duration_days() <= 0.0 {
        return Ok(());
    }
    let geometry = ctx.sections.section_geometry(interval.index, poi)?;
    let (area, area_y) = geometry
        .components
        .iter()
        .filter(|c| c.role == ConcreteRole::Deck)
        .fold((0.0, 0.0), |(a, ay), c| (a + c.area_in2(), ay + c.area_in2() * c.centroid_y_in()));
    if area <= 0.0 {
        return Ok(());
    }
    let deck_y = area_y / area;

    let segment = poi.segment;
    let shrinkage = ctx.materials.shrinkage_strain(ConcreteRole::Deck, segment, interval.end_day)?
        - ctx.materials.shrinkage_strain(ConcreteRole::Deck, segment, interval.start_day)?;
    if shrinkage == 0.0 {
        return Ok(());
    }
    let ed = ctx.materials.modulus(ConcreteRole::Deck, segment, interval.index)?;
    let composite_day = ctx.timeline.interval(composite)?.start_day;
    let psi = ctx
        .materials
        .creep_coefficient(ConcreteRole::Deck, segment, composite_day, interval.end_day)?;
    // age-adjusted restraint force at the deck centroid
    let force = shrinkage * ed * area / (1.0 + 0.7 * psi);

    apply_concrete_stress(
        streams,
        interval.index,
        interval.middle_day(),
        props.e_ref_ksi,
        ElasticEffect::DeckShrinkage,
        |yk| concrete_stress(props, force, deck_y, 0.0, yk),
    );
    Ok(())
}

// ============================================================================
// Recurrence
// ============================================================================

/// Compute the loss history at `poi` over the whole timeline.
///
/// Intervals before the POI's concrete exists (before strand stressing, or
/// before a closure joint hardens) are reported with no section and all
/// streams not yet stressed.
pub fn compute_losses(ctx: &AnalysisContext<'_>, poi: &PointOfInterest) -> EngineResult<LossHistory> {
    match ctx.criteria.loss_method {
        LossMethod::TimeStep => {}
        LossMethod::Refined | LossMethod::LumpSum => {
            return Err(EngineError::configuration(
                "loss_method",
                format!("{} losses are not supported by the time-step engine", ctx.criteria.loss_method),
            ));
        }
    }
    if poi.segment != ctx.segment.key {
        return Err(EngineError::invalid_input(
            "poi",
            poi.to_string(),
            format!("POI is not on segment {}", ctx.segment.key),
        ));
    }

    let (role, first) = if poi.is_closure_joint() {
        let closure = ctx
            .timeline
            .closure_intervals(ClosureKey(poi.segment))
            .ok_or_else(|| EngineError::missing_data(format!("closure joint intervals for {}", poi)))?;
        (ConcreteRole::ClosureJoint, closure.composite)
    } else {
        (ConcreteRole::Segment, ctx.timeline.stressing_interval(poi.segment)?)
    };

    let mut streams = build_streams(ctx, poi)?;
    let mut details = Vec::with_capacity(ctx.timeline.interval_count());
    let mut girder_moment = 0.0;

    for interval in ctx.timeline.intervals() {
        let n = interval.index;
        let location = AnalysisLocation::new(poi.segment, poi.id, n);
        for stream in streams.iter_mut() {
            stream.incremental = LossComponents::default();
        }
        let self_weight = ctx.forces.moment(n, ProductLoad::GirderSelfWeight, poi)?;
        girder_moment += self_weight;

        if n < first {
            details.push(LossDetails {
                segment: poi.segment,
                poi: poi.id,
                interval: n,
                section: None,
                streams: streams.iter().map(|s| s.snapshot(n, None)).collect(),
                girder_moment_kip_in: girder_moment,
                elastic_shortening: None,
                diagnostics: Vec::new(),
            });
            continue;
        }

        let props = ctx.sections.section_properties(n, poi, ctx.criteria.section_properties)?;
        let mut diagnostics = Vec::new();

        time_dependent_step(ctx, poi.segment, role, interval, &props, &mut streams)?;

        let transfer = if ctx.timeline.release_interval(poi.segment)? == n {
            transfer_prestress(ctx, poi, interval, location, &mut streams)?
        } else {
            None
        };

        stress_tendons(ctx, poi, interval, location, &props, &mut streams, &mut diagnostics)?;
        remove_temporary_strands(interval, &props, &mut streams);

        // self weight at transfer was already part of fcgp
        let mut moment = ctx.forces.external_moment(n, poi)?;
        if let Some((_, transfer_moment)) = transfer {
            moment -= transfer_moment;
        }
        if moment != 0.0 {
            apply_concrete_stress(
                &mut streams,
                n,
                interval.middle_day(),
                props.e_ref_ksi,
                ElasticEffect::Elastic,
                |yk| concrete_stress(&props, 0.0, 0.0, moment, yk),
            );
        }

        deck_shrinkage_step(ctx, poi, interval, &props, &mut streams)?;

        debug!(
            poi = %poi.id,
            interval = %n,
            external_moment_kip_in = moment,
            "losses advanced"
        );

        details.push(LossDetails {
            segment: poi.segment,
            poi: poi.id,
            interval: n,
            section: Some(props),
            streams: streams.iter().map(|s| s.snapshot(n, Some(&props))).collect(),
            girder_moment_kip_in: girder_moment,
            elastic_shortening: transfer.map(|(result, _)| result),
            diagnostics,
        });
    }

    Ok(LossHistory {
        segment: poi.segment,
        poi: poi.id,
        details,
    })
}
