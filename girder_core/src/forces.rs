//! # Product Forces
//!
//! Elastic moments, shears and deflections per (interval, product load, POI)
//! supplied by an external elastic analysis, and the limit-state
//! combinations built from them. The engines layer time-dependent effects on
//! top of these results; they never assemble a stiffness model themselves.
//!
//! ## Sign Convention
//!
//! - Moment: positive sagging (tension at the bottom fiber), kip-in
//! - Shear: kip
//! - Deflection: positive upward, in
//!
//! Values are *incremental*: the change caused by a load in the interval the
//! entry belongs to. A load that changes its structural system (girder self
//! weight at erection, for example) carries one entry per interval.
//!
//! ## Load Categories
//!
//! | Category | Loads                                                               |
//! |----------|---------------------------------------------------------------------|
//! | DC       | self weight, diaphragms, shear key, slab, user DC, railing system   |
//! | DW       | overlay, user DW                                                    |
//! | PS       | pretension, temporary strand removal, post-tensioning               |

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::{EngineError, EngineResult};
use crate::keys::{PoiId, SegmentKey};
use crate::poi::PointOfInterest;
use crate::timeline::{IntervalActivity, IntervalIndex, IntervalTimeline};

// ============================================================================
// Product loads
// ============================================================================

/// Elastic load cases supplied by the product-force collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ProductLoad {
    GirderSelfWeight,
    Pretension,
    TemporaryStrandRemoval,
    Diaphragm,
    ShearKey,
    PostTensioning,
    Slab,
    SlabPanel,
    UserDc,
    UserDw,
    RailingSystem,
    Overlay,
}

/// Load factor category of a product load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LoadCategory {
    Dc,
    Dw,
    Ps,
}

impl ProductLoad {
    pub const ALL: [ProductLoad; 12] = [
        ProductLoad::GirderSelfWeight,
        ProductLoad::Pretension,
        ProductLoad::TemporaryStrandRemoval,
        ProductLoad::Diaphragm,
        ProductLoad::ShearKey,
        ProductLoad::PostTensioning,
        ProductLoad::Slab,
        ProductLoad::SlabPanel,
        ProductLoad::UserDc,
        ProductLoad::UserDw,
        ProductLoad::RailingSystem,
        ProductLoad::Overlay,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            ProductLoad::GirderSelfWeight => "Girder",
            ProductLoad::Pretension => "Pretension",
            ProductLoad::TemporaryStrandRemoval => "Temporary strand removal",
            ProductLoad::Diaphragm => "Diaphragm",
            ProductLoad::ShearKey => "Shear key",
            ProductLoad::PostTensioning => "Post-tensioning",
            ProductLoad::Slab => "Slab",
            ProductLoad::SlabPanel => "Slab panel",
            ProductLoad::UserDc => "User DC",
            ProductLoad::UserDw => "User DW",
            ProductLoad::RailingSystem => "Railing system",
            ProductLoad::Overlay => "Overlay",
        }
    }

    pub fn category(&self) -> LoadCategory {
        match self {
            ProductLoad::Pretension | ProductLoad::TemporaryStrandRemoval | ProductLoad::PostTensioning => {
                LoadCategory::Ps
            }
            ProductLoad::UserDw | ProductLoad::Overlay => LoadCategory::Dw,
            _ => LoadCategory::Dc,
        }
    }

    /// True for loads whose effect on the strands the loss engine derives
    /// itself from the stream forces.
    pub fn is_prestress(&self) -> bool {
        self.category() == LoadCategory::Ps
    }

    /// Interval a load is applied in when an entry does not name one.
    pub fn default_interval(&self, timeline: &IntervalTimeline, segment: SegmentKey) -> EngineResult<IntervalIndex> {
        let missing = |what: &str| EngineError::missing_data(format!("{} interval for {}", what, self.display_name()));
        match self {
            ProductLoad::GirderSelfWeight | ProductLoad::Pretension => timeline.release_interval(segment),
            ProductLoad::TemporaryStrandRemoval => timeline
                .temporary_strand_removal_interval(segment)
                .ok_or_else(|| missing("temporary strand removal")),
            ProductLoad::PostTensioning => timeline
                .intervals()
                .iter()
                .find(|i| i.stressed_tendons().any(|t| t.acts_on(segment)))
                .map(|i| i.index)
                .ok_or_else(|| missing("tendon stressing")),
            ProductLoad::Diaphragm | ProductLoad::ShearKey | ProductLoad::Slab | ProductLoad::SlabPanel => {
                timeline.cast_deck_interval().ok_or_else(|| missing("deck casting"))
            }
            ProductLoad::UserDc | ProductLoad::UserDw => timeline
                .intervals()
                .iter()
                .find(|i| i.has(&IntervalActivity::ApplyUserLoads))
                .map(|i| i.index)
                .ok_or_else(|| missing("user load")),
            ProductLoad::RailingSystem => timeline.railing_system_interval().ok_or_else(|| missing("railing system")),
            ProductLoad::Overlay => timeline.overlay_interval().ok_or_else(|| missing("overlay")),
        }
    }
}

impl fmt::Display for ProductLoad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

// ============================================================================
// Limit states
// ============================================================================

/// Load combinations the engines ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LimitState {
    ServiceI,
    ServiceIII,
    #[default]
    StrengthI,
    StrengthII,
}

impl LimitState {
    pub const ALL: [LimitState; 4] = [
        LimitState::ServiceI,
        LimitState::ServiceIII,
        LimitState::StrengthI,
        LimitState::StrengthII,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            LimitState::ServiceI => "Service I",
            LimitState::ServiceIII => "Service III",
            LimitState::StrengthI => "Strength I",
            LimitState::StrengthII => "Strength II",
        }
    }

    /// Default load factors.
    pub fn combination(&self) -> LimitStateCombination {
        match self {
            LimitState::ServiceI => LimitStateCombination::new(*self, 1.0, 1.0, 1.0),
            LimitState::ServiceIII => LimitStateCombination::new(*self, 1.0, 1.0, 0.8),
            LimitState::StrengthI => LimitStateCombination::new(*self, 1.25, 1.50, 1.75),
            LimitState::StrengthII => LimitStateCombination::new(*self, 1.25, 1.50, 1.35),
        }
    }
}

impl fmt::Display for LimitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Load factors of one limit state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitStateCombination {
    pub limit_state: LimitState,
    pub factors: HashMap<LoadCategory, f64>,
    pub live_load_factor: f64,
}

impl LimitStateCombination {
    pub fn new(limit_state: LimitState, dc: f64, dw: f64, ll: f64) -> Self {
        LimitStateCombination {
            limit_state,
            factors: [(LoadCategory::Dc, dc), (LoadCategory::Dw, dw)].into_iter().collect(),
            live_load_factor: ll,
        }
    }

    pub fn with_factor(mut self, category: LoadCategory, factor: f64) -> Self {
        self.factors.insert(category, factor);
        self
    }

    /// Factor for a category (0.0 if not in the combination).
    pub fn factor(&self, category: LoadCategory) -> f64 {
        self.factors.get(&category).copied().unwrap_or(0.0)
    }
}

/// Maximum and minimum of a combined effect.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Envelope {
    pub max: f64,
    pub min: f64,
}

// ============================================================================
// Provider interface
// ============================================================================

/// Source of elastic product-load results.
pub trait ProductForces: Send + Sync {
    /// Moment change caused by `load` in `interval` (kip-in).
    fn moment(&self, interval: IntervalIndex, load: ProductLoad, poi: &PointOfInterest) -> EngineResult<f64>;

    /// Shear change caused by `load` in `interval` (kip).
    fn shear(&self, interval: IntervalIndex, load: ProductLoad, poi: &PointOfInterest) -> EngineResult<f64>;

    /// Deflection change caused by `load` in `interval` (in, upward positive).
    fn deflection(&self, interval: IntervalIndex, load: ProductLoad, poi: &PointOfInterest) -> EngineResult<f64>;

    /// Factored moment envelope including live load.
    fn limit_state_moment(&self, limit_state: LimitState, poi: &PointOfInterest) -> EngineResult<Envelope>;

    /// Factored shear magnitude including live load.
    fn limit_state_shear(&self, limit_state: LimitState, poi: &PointOfInterest) -> EngineResult<f64>;

    /// Sum of the moment changes of every non-prestress load in `interval`.
    fn external_moment(&self, interval: IntervalIndex, poi: &PointOfInterest) -> EngineResult<f64> {
        let mut total = 0.0;
        for load in ProductLoad::ALL.iter().filter(|l| !l.is_prestress()) {
            total += self.moment(interval, *load, poi)?;
        }
        Ok(total)
    }

    /// Moment of `loads` accumulated from the first interval through `through`.
    fn cumulative_moment(&self, through: IntervalIndex, loads: &[ProductLoad], poi: &PointOfInterest) -> EngineResult<f64> {
        let mut total = 0.0;
        for i in 0..=through.0 {
            for load in loads {
                total += self.moment(IntervalIndex(i), *load, poi)?;
            }
        }
        Ok(total)
    }

    /// Shear of `loads` accumulated from the first interval through `through`.
    fn cumulative_shear(&self, through: IntervalIndex, loads: &[ProductLoad], poi: &PointOfInterest) -> EngineResult<f64> {
        let mut total = 0.0;
        for i in 0..=through.0 {
            for load in loads {
                total += self.shear(IntervalIndex(i), *load, poi)?;
            }
        }
        Ok(total)
    }
}

/// Non-prestress loads of one category.
pub fn loads_in(category: LoadCategory) -> Vec<ProductLoad> {
    ProductLoad::ALL.iter().copied().filter(|l| l.category() == category).collect()
}

// ============================================================================
// In-memory table
// ============================================================================

/// One elastic result.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProductForceEntry {
    pub poi: PoiId,
    pub load: ProductLoad,
    /// Interval of application; the load's default interval when omitted
    #[serde(default)]
    pub interval: Option<IntervalIndex>,
    #[serde(default)]
    pub moment_kip_in: f64,
    #[serde(default)]
    pub shear_kip: f64,
    #[serde(default)]
    pub deflection_in: f64,
}

/// Unfactored live-load envelope (per lane-distributed girder) at a POI.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LiveLoadEnvelope {
    pub poi: PoiId,
    pub moment_max_kip_in: f64,
    pub moment_min_kip_in: f64,
    pub shear_kip: f64,
}

/// Product forces held in memory, typically read from a project file.
#[derive(Debug, Clone, Default)]
pub struct ProductForceTable {
    entries: HashMap<(IntervalIndex, ProductLoad, PoiId), (f64, f64, f64)>,
    final_loads: HashMap<PoiId, Vec<(ProductLoad, f64, f64)>>,
    live_load: HashMap<PoiId, LiveLoadEnvelope>,
    combinations: HashMap<LimitState, LimitStateCombination>,
}

impl ProductForceTable {
    /// Place every entry in its interval, resolving default intervals from
    /// the timeline.
    pub fn new(
        timeline: &IntervalTimeline,
        pois: &[PointOfInterest],
        entries: &[ProductForceEntry],
        live_load: &[LiveLoadEnvelope],
    ) -> EngineResult<Self> {
        let mut table = ProductForceTable {
            combinations: LimitState::ALL.iter().map(|ls| (*ls, ls.combination())).collect(),
            ..Default::default()
        };
        for entry in entries {
            let poi = pois
                .iter()
                .find(|p| p.id == entry.poi)
                .ok_or_else(|| EngineError::missing_data(format!("poi {} referenced by product forces", entry.poi)))?;
            let interval = match entry.interval {
                Some(i) => {
                    timeline.interval(i)?;
                    i
                }
                None => entry.load.default_interval(timeline, poi.segment)?,
            };
            let slot = table.entries.entry((interval, entry.load, entry.poi)).or_insert((0.0, 0.0, 0.0));
            slot.0 += entry.moment_kip_in;
            slot.1 += entry.shear_kip;
            slot.2 += entry.deflection_in;

            let totals = table.final_loads.entry(entry.poi).or_default();
            match totals.iter_mut().find(|(l, _, _)| *l == entry.load) {
                Some(t) => {
                    t.1 += entry.moment_kip_in;
                    t.2 += entry.shear_kip;
                }
                None => totals.push((entry.load, entry.moment_kip_in, entry.shear_kip)),
            }
        }
        for envelope in live_load {
            table.live_load.insert(envelope.poi, *envelope);
        }
        Ok(table)
    }

    /// Replace the load factors of a limit state.
    pub fn with_combination(mut self, combination: LimitStateCombination) -> Self {
        self.combinations.insert(combination.limit_state, combination);
        self
    }

    pub fn live_load(&self, poi: PoiId) -> Option<&LiveLoadEnvelope> {
        self.live_load.get(&poi)
    }

    /// Unfactored final moment of one category at a POI.
    pub fn final_moment(&self, category: LoadCategory, poi: PoiId) -> f64 {
        self.final_loads
            .get(&poi)
            .map(|loads| loads.iter().filter(|(l, _, _)| l.category() == category).map(|(_, m, _)| m).sum())
            .unwrap_or(0.0)
    }

    /// Unfactored final shear of one category at a POI.
    pub fn final_shear(&self, category: LoadCategory, poi: PoiId) -> f64 {
        self.final_loads
            .get(&poi)
            .map(|loads| loads.iter().filter(|(l, _, _)| l.category() == category).map(|(_, _, v)| v).sum())
            .unwrap_or(0.0)
    }

    fn combination(&self, limit_state: LimitState) -> EngineResult<&LimitStateCombination> {
        self.combinations
            .get(&limit_state)
            .ok_or_else(|| EngineError::missing_data(format!("load factors for {}", limit_state)))
    }

    fn lookup(&self, interval: IntervalIndex, load: ProductLoad, poi: PoiId) -> (f64, f64, f64) {
        self.entries.get(&(interval, load, poi)).copied().unwrap_or((0.0, 0.0, 0.0))
    }
}

impl ProductForces for ProductForceTable {
    fn moment(&self, interval: IntervalIndex, load: ProductLoad, poi: &PointOfInterest) -> EngineResult<f64> {
        Ok(self.lookup(interval, load, poi.id).0)
    }

    fn shear(&self, interval: IntervalIndex, load: ProductLoad, poi: &PointOfInterest) -> EngineResult<f64> {
        Ok(self.lookup(interval, load, poi.id).1)
    }

    fn deflection(&self, interval: IntervalIndex, load: ProductLoad, poi: &PointOfInterest) -> EngineResult<f64> {
        Ok(self.lookup(interval, load, poi.id).2)
    }

    fn limit_state_moment(&self, limit_state: LimitState, poi: &PointOfInterest) -> EngineResult<Envelope> {
        let combination = self.combination(limit_state)?;
        let dead = combination.factor(LoadCategory::Dc) * self.final_moment(LoadCategory::Dc, poi.id)
            + combination.factor(LoadCategory::Dw) * self.final_moment(LoadCategory::Dw, poi.id);
        let (ll_max, ll_min) = self
            .live_load(poi.id)
            .map(|e| (e.moment_max_kip_in, e.moment_min_kip_in))
            .unwrap_or((0.0, 0.0));
        Ok(Envelope {
            max: dead + combination.live_load_factor * ll_max,
            min: dead + combination.live_load_factor * ll_min,
        })
    }

    fn limit_state_shear(&self, limit_state: LimitState, poi: &PointOfInterest) -> EngineResult<f64> {
        let combination = self.combination(limit_state)?;
        let dead = combination.factor(LoadCategory::Dc) * self.final_shear(LoadCategory::Dc, poi.id)
            + combination.factor(LoadCategory::Dw) * self.final_shear(LoadCategory::Dw, poi.id);
        let ll = self.live_load(poi.id).map(|e| e.shear_kip).unwrap_or(0.0);
        Ok(dead.abs() + combination.live_load_factor * ll.abs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeline::{Activity, TimelineBuilder, TimelineEvent};

    fn timeline() -> IntervalTimeline {
        let seg = SegmentKey::new(0, 0, 0);
        TimelineBuilder::new(2000.0)
            .event(TimelineEvent::new(0.0).with(Activity::ConstructSegments {
                segments: vec![seg],
                relaxation_time_days: 1.0,
            }))
            .event(TimelineEvent::new(60.0).with(Activity::ErectSegments {
                segments: vec![seg],
                remove_temporary_strands: false,
            }))
            .event(TimelineEvent::new(90.0).with(Activity::CastDeck {
                age_at_continuity_days: 7.0,
            }))
            .event(TimelineEvent::new(120.0).with(Activity::ApplyLoads {
                railing_system: true,
                overlay: true,
                user_loads: false,
                live_load: true,
            }))
            .build()
            .unwrap()
    }

    fn poi() -> PointOfInterest {
        PointOfInterest::new(PoiId(1), SegmentKey::new(0, 0, 0), 600.0)
    }

    fn entry(load: ProductLoad, moment: f64) -> ProductForceEntry {
        ProductForceEntry {
            poi: PoiId(1),
            load,
            interval: None,
            moment_kip_in: moment,
            shear_kip: moment / 100.0,
            deflection_in: -moment / 10000.0,
        }
    }

    #[test]
    fn test_default_intervals_follow_timeline() {
        let t = timeline();
        let table = ProductForceTable::new(
            &t,
            &[poi()],
            &[entry(ProductLoad::GirderSelfWeight, 9000.0), entry(ProductLoad::Slab, 12000.0)],
            &[],
        )
        .unwrap();
        let release = t.release_interval(SegmentKey::new(0, 0, 0)).unwrap();
        let deck = t.cast_deck_interval().unwrap();
        assert_eq!(table.moment(release, ProductLoad::GirderSelfWeight, &poi()).unwrap(), 9000.0);
        assert_eq!(table.moment(deck, ProductLoad::Slab, &poi()).unwrap(), 12000.0);
        assert_eq!(table.moment(release, ProductLoad::Slab, &poi()).unwrap(), 0.0);
        assert_eq!(
            table
                .cumulative_moment(t.last_interval(), &[ProductLoad::GirderSelfWeight, ProductLoad::Slab], &poi())
                .unwrap(),
            21000.0
        );
    }

    #[test]
    fn test_external_moment_excludes_prestress() {
        let t = timeline();
        let release = t.release_interval(SegmentKey::new(0, 0, 0)).unwrap();
        let table = ProductForceTable::new(
            &t,
            &[poi()],
            &[entry(ProductLoad::GirderSelfWeight, 9000.0), entry(ProductLoad::Pretension, -20000.0)],
            &[],
        )
        .unwrap();
        assert_eq!(table.external_moment(release, &poi()).unwrap(), 9000.0);
    }

    #[test]
    fn test_strength_moment_envelope() {
        let t = timeline();
        let table = ProductForceTable::new(
            &t,
            &[poi()],
            &[entry(ProductLoad::GirderSelfWeight, 9000.0), entry(ProductLoad::Overlay, 2000.0)],
            &[LiveLoadEnvelope {
                poi: PoiId(1),
                moment_max_kip_in: 15000.0,
                moment_min_kip_in: 0.0,
                shear_kip: 60.0,
            }],
        )
        .unwrap();
        let mu = table.limit_state_moment(LimitState::StrengthI, &poi()).unwrap();
        assert!((mu.max - (1.25 * 9000.0 + 1.5 * 2000.0 + 1.75 * 15000.0)).abs() < 1e-9);
        assert!((mu.min - (1.25 * 9000.0 + 1.5 * 2000.0)).abs() < 1e-9);
        let vu = table.limit_state_shear(LimitState::StrengthI, &poi()).unwrap();
        assert!((vu - (1.25 * 90.0 + 1.5 * 20.0 + 1.75 * 60.0)).abs() < 1e-9);
    }

    #[test]
    fn test_replaced_combination() {
        let t = timeline();
        let table = ProductForceTable::new(&t, &[poi()], &[entry(ProductLoad::GirderSelfWeight, 9000.0)], &[])
            .unwrap()
            .with_combination(
                LimitStateCombination::new(LimitState::StrengthI, 1.25, 1.5, 1.75).with_factor(LoadCategory::Dc, 0.9),
            );
        let mu = table.limit_state_moment(LimitState::StrengthI, &poi()).unwrap();
        assert!((mu.max - 0.9 * 9000.0).abs() < 1e-9);
    }

    #[test]
    fn test_unknown_poi_is_missing_data() {
        let t = timeline();
        let mut e = entry(ProductLoad::Slab, 1.0);
        e.poi = PoiId(99);
        let result = ProductForceTable::new(&t, &[poi()], &[e], &[]);
        assert!(matches!(result, Err(EngineError::MissingData { .. })));
    }

    #[test]
    fn test_missing_removal_interval() {
        let t = timeline();
        let result = ProductLoad::TemporaryStrandRemoval.default_interval(&t, SegmentKey::new(0, 0, 0));
        assert!(result.is_err());
    }
}
