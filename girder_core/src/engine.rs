//! # Analysis Façade
//!
//! [`GirderAnalysis`] owns the collaborators of one bridge and answers the
//! per-POI queries of every engine. Criteria are validated once, when the
//! analysis is built. Loss histories are memoized per (segment, POI) because
//! every other engine reads them.
//!
//! Work is parallel across POIs of one request and never across intervals:
//! the loss recurrence at a POI is strictly sequential.
//!
//! ## Example
//!
//! ```rust,ignore
//! let analysis = project.build()?;
//! let report = analysis.run(None)?;
//! println!("{}", serde_json::to_string_pretty(&report)?);
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::camber::{compute_camber, CamberDetails, CamberInput};
use crate::capacity::{
    cracking_moment, min_moment_capacity, moment_capacity, CrackingMomentDetails, MinMomentCapacityDetails,
    MomentCapacityDetails, MomentSign,
};
use crate::context::AnalysisContext;
use crate::criteria::AnalysisCriteria;
use crate::diagnostics::{Applicability, Diagnostic};
use crate::errors::{EngineError, EngineResult};
use crate::forces::{LimitState, ProductForces};
use crate::interface_shear::{horizontal_shear, HorizontalShearArtifact, InterfaceShearData};
use crate::keys::{PoiId, SegmentKey};
use crate::losses::{compute_losses, LossDetails, LossHistory};
use crate::materials::MaterialModel;
use crate::poi::{PoiList, PoiSource, PointOfInterest};
use crate::rating::{rate_vehicle, PoiRatingInput, RatingVehicle, TimeDependentEffects, VehicleRating};
use crate::section::{BridgeGeometry, MemoCache, SectionPropertyProvider};
use crate::timeline::{Interval, IntervalIndex, IntervalTimeline};

/// Per-segment inputs that are not part of the section model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentChecks {
    pub interface_shear: Option<InterfaceShearData>,
    pub camber: CamberInput,
}

/// One bridge, ready to analyse.
pub struct GirderAnalysis {
    timeline: Arc<IntervalTimeline>,
    materials: Arc<dyn MaterialModel>,
    sections: Arc<dyn SectionPropertyProvider>,
    forces: Arc<dyn ProductForces>,
    geometry: Arc<BridgeGeometry>,
    criteria: AnalysisCriteria,
    pois: PoiList,
    checks: HashMap<SegmentKey, SegmentChecks>,
    nominal_shear: HashMap<PoiId, f64>,
    time_dependent: HashMap<PoiId, TimeDependentEffects>,
    vehicles: Vec<RatingVehicle>,
    losses: MemoCache<(SegmentKey, PoiId), Arc<LossHistory>>,
}

impl std::fmt::Debug for GirderAnalysis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GirderAnalysis")
            .field("intervals", &self.timeline.interval_count())
            .field("pois", &self.pois.as_slice().len())
            .field("vehicles", &self.vehicles.len())
            .field("cached_losses", &self.losses.len())
            .finish()
    }
}

impl GirderAnalysis {
    /// Validate `criteria` and assemble the analysis.
    pub fn new(
        timeline: Arc<IntervalTimeline>,
        materials: Arc<dyn MaterialModel>,
        sections: Arc<dyn SectionPropertyProvider>,
        forces: Arc<dyn ProductForces>,
        geometry: Arc<BridgeGeometry>,
        pois: Vec<PointOfInterest>,
        criteria: AnalysisCriteria,
    ) -> EngineResult<Self> {
        criteria.validate()?;
        let pois = PoiList::new(pois)?;
        for poi in pois.as_slice() {
            geometry.segment(poi.segment)?;
            timeline.segment_intervals(poi.segment)?;
        }
        info!(
            edition = %criteria.edition,
            intervals = timeline.interval_count(),
            pois = pois.as_slice().len(),
            "analysis configured"
        );
        Ok(GirderAnalysis {
            timeline,
            materials,
            sections,
            forces,
            geometry,
            criteria,
            pois,
            checks: HashMap::new(),
            nominal_shear: HashMap::new(),
            time_dependent: HashMap::new(),
            vehicles: Vec::new(),
            losses: MemoCache::new(),
        })
    }

    pub fn with_segment_checks(mut self, segment: SegmentKey, checks: SegmentChecks) -> Self {
        self.checks.insert(segment, checks);
        self
    }

    /// Nominal vertical shear resistance used by the shear rating.
    pub fn with_nominal_shear(mut self, poi: PoiId, vn_kip: f64) -> Self {
        self.nominal_shear.insert(poi, vn_kip);
        self
    }

    /// Creep, shrinkage, relaxation and secondary effects of a spliced
    /// girder, factored into the strength ratings at their POI.
    pub fn with_time_dependent_effects(mut self, effects: TimeDependentEffects) -> EngineResult<Self> {
        self.poi(effects.poi)?;
        self.time_dependent.insert(effects.poi, effects);
        Ok(self)
    }

    pub fn with_vehicle(mut self, vehicle: RatingVehicle) -> EngineResult<Self> {
        vehicle.validate()?;
        self.vehicles.push(vehicle);
        Ok(self)
    }

    pub fn criteria(&self) -> &AnalysisCriteria {
        &self.criteria
    }

    pub fn timeline(&self) -> &IntervalTimeline {
        &self.timeline
    }

    pub fn pois(&self) -> &[PointOfInterest] {
        self.pois.as_slice()
    }

    pub fn vehicles(&self) -> &[RatingVehicle] {
        &self.vehicles
    }

    pub fn poi(&self, id: PoiId) -> EngineResult<&PointOfInterest> {
        self.pois
            .as_slice()
            .iter()
            .find(|p| p.id == id)
            .ok_or_else(|| EngineError::missing_data(format!("poi {}", id)))
    }

    pub fn context(&self, segment: SegmentKey) -> EngineResult<AnalysisContext<'_>> {
        Ok(AnalysisContext {
            timeline: &self.timeline,
            materials: self.materials.as_ref(),
            sections: self.sections.as_ref(),
            forces: self.forces.as_ref(),
            segment: self.geometry.segment(segment)?,
            criteria: &self.criteria,
        })
    }

    fn segment_checks(&self, segment: SegmentKey) -> SegmentChecks {
        self.checks.get(&segment).copied().unwrap_or_default()
    }

    // ------------------------------------------------------------------
    // Losses
    // ------------------------------------------------------------------

    /// Loss history at `poi`, computed once.
    pub fn losses(&self, poi: &PointOfInterest) -> EngineResult<Arc<LossHistory>> {
        self.losses.get_or_try_compute(&(poi.segment, poi.id), || {
            let ctx = self.context(poi.segment)?;
            compute_losses(&ctx, poi).map(Arc::new)
        })
    }

    /// Loss histories of every POI on `segment`, in POI order.
    pub fn losses_for_segment(&self, segment: SegmentKey) -> EngineResult<Vec<Arc<LossHistory>>> {
        info!(segment = %segment, "computing losses");
        self.pois
            .segment_pois(segment)
            .par_iter()
            .map(|p| self.losses(p))
            .collect()
    }

    pub fn losses_at(&self, poi: &PointOfInterest, interval: IntervalIndex) -> EngineResult<LossDetails> {
        Ok(self.losses(poi)?.at(interval)?.clone())
    }

    // ------------------------------------------------------------------
    // Capacity
    // ------------------------------------------------------------------

    pub fn moment_capacity(
        &self,
        poi: &PointOfInterest,
        interval: IntervalIndex,
        sign: MomentSign,
    ) -> EngineResult<MomentCapacityDetails> {
        let losses = self.losses(poi)?;
        moment_capacity(&self.context(poi.segment)?, poi, interval, sign, &losses)
    }

    pub fn cracking_moment(
        &self,
        poi: &PointOfInterest,
        interval: IntervalIndex,
        sign: MomentSign,
    ) -> EngineResult<CrackingMomentDetails> {
        let losses = self.losses(poi)?;
        cracking_moment(&self.context(poi.segment)?, poi, interval, sign, &losses)
    }

    pub fn min_moment_capacity(
        &self,
        poi: &PointOfInterest,
        interval: IntervalIndex,
        sign: MomentSign,
    ) -> EngineResult<MinMomentCapacityDetails> {
        let ctx = self.context(poi.segment)?;
        let losses = self.losses(poi)?;
        let capacity = moment_capacity(&ctx, poi, interval, sign, &losses)?;
        let cracking = cracking_moment(&ctx, poi, interval, sign, &losses)?;
        min_moment_capacity(&ctx, poi, &capacity, &cracking)
    }

    /// Capacity at every POI in `interval`, in POI order.
    pub fn capacity_sweep(&self, interval: IntervalIndex, sign: MomentSign) -> EngineResult<Vec<MomentCapacityDetails>> {
        info!(interval = %interval, sign = %sign, "moment capacity sweep");
        self.pois
            .as_slice()
            .par_iter()
            .map(|p| self.moment_capacity(p, interval, sign))
            .collect()
    }

    // ------------------------------------------------------------------
    // Interface shear and camber
    // ------------------------------------------------------------------

    pub fn horizontal_shear(
        &self,
        poi: &PointOfInterest,
        interval: IntervalIndex,
        limit_state: LimitState,
    ) -> EngineResult<Applicability<HorizontalShearArtifact>> {
        let Some(data) = self.segment_checks(poi.segment).interface_shear else {
            return Ok(Applicability::not_applicable("No interface shear data for the segment"));
        };
        let losses = self.losses(poi)?;
        horizontal_shear(&self.context(poi.segment)?, poi, interval, limit_state, &data, &losses)
    }

    pub fn camber(&self, poi: &PointOfInterest) -> EngineResult<CamberDetails> {
        let input = self.segment_checks(poi.segment).camber;
        let losses = self.losses(poi)?;
        compute_camber(&self.context(poi.segment)?, poi, &losses, &input)
    }

    // ------------------------------------------------------------------
    // Rating
    // ------------------------------------------------------------------

    /// Rate `vehicle` at every POI in the final interval.
    pub fn rate(&self, vehicle: &RatingVehicle) -> EngineResult<Vec<VehicleRating>> {
        let interval = self.timeline.last_interval();
        let mut by_segment: Vec<SegmentKey> = self.pois.as_slice().iter().map(|p| p.segment).collect();
        by_segment.sort();
        by_segment.dedup();

        let mut ratings = Vec::new();
        for segment in by_segment {
            let ctx = self.context(segment)?;
            let pois = self.pois.segment_pois(segment);
            let prepared = pois
                .par_iter()
                .map(|poi| {
                    let losses = self.losses(poi)?;
                    let pos = moment_capacity(&ctx, poi, interval, MomentSign::Positive, &losses)?;
                    let neg = moment_capacity(&ctx, poi, interval, MomentSign::Negative, &losses)?;
                    let pos_cr = cracking_moment(&ctx, poi, interval, MomentSign::Positive, &losses)?;
                    let neg_cr = cracking_moment(&ctx, poi, interval, MomentSign::Negative, &losses)?;
                    Ok((*poi, losses, pos, neg, pos_cr, neg_cr))
                })
                .collect::<EngineResult<Vec<_>>>()?;
            let inputs: Vec<PoiRatingInput<'_>> = prepared
                .iter()
                .map(|(poi, losses, pos, neg, pos_cr, neg_cr)| PoiRatingInput {
                    poi,
                    losses,
                    positive_capacity: pos,
                    negative_capacity: neg,
                    positive_cracking: pos_cr,
                    negative_cracking: neg_cr,
                    nominal_shear_kip: self.nominal_shear.get(&poi.id).copied(),
                    time_dependent: self.time_dependent.get(&poi.id),
                })
                .collect();
            ratings.push(rate_vehicle(&ctx, vehicle, &inputs)?);
        }
        Ok(ratings)
    }

    // ------------------------------------------------------------------
    // Full run
    // ------------------------------------------------------------------

    /// Every engine at every POI. Capacity and interface shear are reported
    /// in `interval`, the final interval when `None`. An interval before the
    /// release of any segment is a configuration error.
    pub fn run(&self, interval: Option<IntervalIndex>) -> EngineResult<AnalysisReport> {
        let interval = match interval {
            Some(i) => {
                self.timeline.interval(i)?;
                for poi in self.pois.as_slice() {
                    let release = self.timeline.release_interval(poi.segment)?;
                    if i < release {
                        return Err(EngineError::configuration(
                            "interval",
                            format!(
                                "Interval {} is before release of segment {}; capacity is available from interval {}",
                                i, poi.segment, release
                            ),
                        ));
                    }
                }
                i
            }
            None => self.timeline.last_interval(),
        };
        info!(interval = %interval, "analysis started");

        let pois = self
            .pois
            .as_slice()
            .par_iter()
            .map(|poi| self.poi_report(poi, interval))
            .collect::<EngineResult<Vec<_>>>()?;
        info!(pois = pois.len(), "per-poi results complete");

        let mut ratings = Vec::new();
        for vehicle in &self.vehicles {
            ratings.extend(self.rate(vehicle)?);
        }
        info!(ratings = ratings.len(), "load rating complete");

        let diagnostics = pois
            .iter()
            .flat_map(|p| p.diagnostics.iter())
            .chain(ratings.iter().flat_map(|r| r.diagnostics.iter()))
            .cloned()
            .collect();

        Ok(AnalysisReport {
            interval,
            intervals: self.timeline.intervals().to_vec(),
            pois,
            ratings,
            diagnostics,
        })
    }

    fn poi_report(&self, poi: &PointOfInterest, interval: IntervalIndex) -> EngineResult<PoiReport> {
        let ctx = self.context(poi.segment)?;
        let losses = self.losses(poi)?;
        let positive = moment_capacity(&ctx, poi, interval, MomentSign::Positive, &losses)?;
        let negative = moment_capacity(&ctx, poi, interval, MomentSign::Negative, &losses)?;
        let cracking = cracking_moment(&ctx, poi, interval, MomentSign::Positive, &losses)?;
        let min_capacity = min_moment_capacity(&ctx, poi, &positive, &cracking)?;
        let interface_shear = self.horizontal_shear(poi, interval, LimitState::StrengthI)?;
        let camber = self.camber(poi)?;

        let diagnostics = losses
            .diagnostics()
            .chain(positive.diagnostics.iter())
            .chain(negative.diagnostics.iter())
            .cloned()
            .collect();

        Ok(PoiReport {
            poi: poi.id,
            segment: poi.segment,
            location_in: poi.location_in,
            losses: losses.at(interval)?.clone(),
            positive_capacity: positive,
            negative_capacity: negative,
            cracking,
            min_capacity,
            interface_shear,
            camber,
            diagnostics,
        })
    }
}

/// Results at one POI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoiReport {
    pub poi: PoiId,
    pub segment: SegmentKey,
    pub location_in: f64,
    pub losses: LossDetails,
    pub positive_capacity: MomentCapacityDetails,
    pub negative_capacity: MomentCapacityDetails,
    pub cracking: CrackingMomentDetails,
    pub min_capacity: MinMomentCapacityDetails,
    pub interface_shear: Applicability<HorizontalShearArtifact>,
    pub camber: CamberDetails,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

/// Everything [`GirderAnalysis::run`] produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// Interval the capacities are reported in
    pub interval: IntervalIndex,
    pub intervals: Vec<Interval>,
    pub pois: Vec<PoiReport>,
    pub ratings: Vec<VehicleRating>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}
