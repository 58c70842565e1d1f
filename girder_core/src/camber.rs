//! # Camber
//!
//! Deflection history at a POI, accumulated interval by interval from the
//! elastic product-load deflections plus time-dependent increments.
//!
//! | Increment   | Source                                                              |
//! |-------------|---------------------------------------------------------------------|
//! | elastic     | product-load deflection of the interval                             |
//! | creep       | Σ δ(j)·[ψ(t_end, t_j) − ψ(t_start, t_j)] over loads of prior intervals |
//! | shrinkage   | prestress deflection × ΔP_shrinkage / P_release                     |
//! | relaxation  | prestress deflection × ΔP_relaxation / P_release                    |
//!
//! Deflection is positive upward. Screed and excess camber are formed from
//! the accumulated totals:
//!
//! ```text
//! Screed = −(D_live − D_before_deck)
//! Excess = D_total − Screed
//! ```

use std::ops::Add;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::context::AnalysisContext;
use crate::errors::{EngineError, EngineResult};
use crate::forces::ProductLoad;
use crate::keys::{PoiId, SegmentKey};
use crate::losses::{LossDetails, LossHistory};
use crate::materials::ConcreteRole;
use crate::poi::PointOfInterest;
use crate::timeline::IntervalIndex;

/// Relative tolerance of the excess camber identity.
const IDENTITY_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CamberCategory {
    GirderSelfWeight,
    Pretension,
    TemporaryStrandRemoval,
    Diaphragm,
    ShearKey,
    PostTensioning,
    Slab,
    UserDc,
    UserDw,
    RailingSystem,
    Overlay,
    Creep,
    Shrinkage,
    Relaxation,
}

impl CamberCategory {
    pub const COUNT: usize = 14;

    pub const ALL: [CamberCategory; CamberCategory::COUNT] = [
        CamberCategory::GirderSelfWeight,
        CamberCategory::Pretension,
        CamberCategory::TemporaryStrandRemoval,
        CamberCategory::Diaphragm,
        CamberCategory::ShearKey,
        CamberCategory::PostTensioning,
        CamberCategory::Slab,
        CamberCategory::UserDc,
        CamberCategory::UserDw,
        CamberCategory::RailingSystem,
        CamberCategory::Overlay,
        CamberCategory::Creep,
        CamberCategory::Shrinkage,
        CamberCategory::Relaxation,
    ];

    pub fn for_load(load: ProductLoad) -> Self {
        match load {
            ProductLoad::GirderSelfWeight => CamberCategory::GirderSelfWeight,
            ProductLoad::Pretension => CamberCategory::Pretension,
            ProductLoad::TemporaryStrandRemoval => CamberCategory::TemporaryStrandRemoval,
            ProductLoad::Diaphragm => CamberCategory::Diaphragm,
            ProductLoad::ShearKey => CamberCategory::ShearKey,
            ProductLoad::PostTensioning => CamberCategory::PostTensioning,
            ProductLoad::Slab | ProductLoad::SlabPanel => CamberCategory::Slab,
            ProductLoad::UserDc => CamberCategory::UserDc,
            ProductLoad::UserDw => CamberCategory::UserDw,
            ProductLoad::RailingSystem => CamberCategory::RailingSystem,
            ProductLoad::Overlay => CamberCategory::Overlay,
        }
    }

    /// True for the time-dependent categories.
    pub fn is_time_dependent(&self) -> bool {
        matches!(
            self,
            CamberCategory::Creep | CamberCategory::Shrinkage | CamberCategory::Relaxation
        )
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            CamberCategory::GirderSelfWeight => "Girder",
            CamberCategory::Pretension => "Pretension",
            CamberCategory::TemporaryStrandRemoval => "Temporary strand removal",
            CamberCategory::Diaphragm => "Diaphragm",
            CamberCategory::ShearKey => "Shear key",
            CamberCategory::PostTensioning => "Post-tensioning",
            CamberCategory::Slab => "Slab",
            CamberCategory::UserDc => "User DC",
            CamberCategory::UserDw => "User DW",
            CamberCategory::RailingSystem => "Railing system",
            CamberCategory::Overlay => "Overlay",
            CamberCategory::Creep => "Creep",
            CamberCategory::Shrinkage => "Shrinkage",
            CamberCategory::Relaxation => "Relaxation",
        }
    }
}

/// Deflection by category (in).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CategoryDeflections([f64; CamberCategory::COUNT]);

impl CategoryDeflections {
    pub fn get(&self, category: CamberCategory) -> f64 {
        self.0[category as usize]
    }

    pub fn add(&mut self, category: CamberCategory, deflection_in: f64) {
        self.0[category as usize] += deflection_in;
    }

    pub fn total(&self) -> f64 {
        self.0.iter().sum()
    }

    /// Sum of the product-load categories.
    pub fn elastic(&self) -> f64 {
        self.iter().filter(|(c, _)| !c.is_time_dependent()).map(|(_, d)| d).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (CamberCategory, f64)> + '_ {
        CamberCategory::ALL.into_iter().map(move |c| (c, self.get(c)))
    }
}

impl Add for CategoryDeflections {
    type Output = CategoryDeflections;

    fn add(self, rhs: CategoryDeflections) -> CategoryDeflections {
        let mut sum = self;
        for (value, other) in sum.0.iter_mut().zip(rhs.0) {
            *value += other;
        }
        sum
    }
}

/// Per-POI offsets that are not load effects.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CamberInput {
    /// Camber built into the forms
    pub precamber_in: f64,
    /// Grade-match correction applied at erection
    pub elevation_adjustment_in: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntervalCamber {
    pub interval: IntervalIndex,
    pub incremental: CategoryDeflections,
    pub cumulative: CategoryDeflections,
    /// Elevation adjustment applied in this interval
    pub elevation_adjustment_in: f64,
    /// Precamber, adjustments and accumulated deflection
    pub total_in: f64,
}

/// Deflection at the stages reported for a girder.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CamberSummary {
    pub at_release_in: f64,
    /// After storage creep and the elevation adjustment
    pub at_erection_in: f64,
    pub before_deck_in: f64,
    pub total_dead_load_in: f64,
    pub screed_camber_in: f64,
    pub excess_camber_in: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CamberDetails {
    pub segment: SegmentKey,
    pub poi: PoiId,
    pub precamber_in: f64,
    pub intervals: Vec<IntervalCamber>,
    pub summary: CamberSummary,
}

impl CamberDetails {
    pub fn at(&self, interval: IntervalIndex) -> EngineResult<&IntervalCamber> {
        self.intervals
            .get(interval.0)
            .ok_or_else(|| EngineError::missing_data(format!("camber at poi {} in interval {}", self.poi, interval)))
    }
}

/// Effective force of the pretensioned streams.
fn pretension_force(details: &LossDetails) -> f64 {
    details
        .streams
        .iter()
        .filter(|s| s.stream.is_pretension() && s.is_active())
        .map(|s| s.effective_force_kip)
        .sum()
}

/// Shrinkage and relaxation force lost by the pretensioned streams in one
/// interval.
fn pretension_force_lost(details: &LossDetails) -> (f64, f64) {
    details
        .streams
        .iter()
        .filter(|s| s.stream.is_pretension() && s.is_active())
        .fold((0.0, 0.0), |(sh, re), s| {
            (sh + s.incremental.shrinkage_ksi * s.area_in2, re + s.incremental.relaxation_ksi * s.area_in2)
        })
}

/// `Excess = D_total − Screed` must hold to rounding.
pub fn check_excess_identity(total_in: f64, screed_in: f64, excess_in: f64) -> EngineResult<()> {
    let expected = total_in - screed_in;
    let scale = total_in.abs().max(screed_in.abs()).max(1.0);
    debug_assert!(
        (excess_in - expected).abs() <= IDENTITY_TOLERANCE * scale,
        "excess camber identity violated"
    );
    if (excess_in - expected).abs() > IDENTITY_TOLERANCE * scale {
        return Err(EngineError::invariant("excess camber = total - screed", expected, excess_in));
    }
    Ok(())
}

/// Deflection history and stage summary at `poi`.
pub fn compute_camber(
    ctx: &AnalysisContext<'_>,
    poi: &PointOfInterest,
    losses: &LossHistory,
    input: &CamberInput,
) -> EngineResult<CamberDetails> {
    let segment = poi.segment;
    let stages = ctx.timeline.segment_intervals(segment)?;
    let release = stages.release;
    let erection = stages.erection;
    let role = if poi.is_closure_joint() {
        ConcreteRole::ClosureJoint
    } else {
        ConcreteRole::Segment
    };

    let release_force = pretension_force(losses.at(release)?);
    let prestress_deflection = ctx.forces.deflection(release, ProductLoad::Pretension, poi)?;

    // (loading day, elastic deflection) of every interval with load
    let mut sustained: Vec<(f64, f64)> = Vec::new();
    let mut cumulative = CategoryDeflections::default();
    let mut elevation = 0.0;
    let mut intervals = Vec::with_capacity(ctx.timeline.interval_count());

    for interval in ctx.timeline.intervals() {
        let index = interval.index;
        let mut incremental = CategoryDeflections::default();
        for load in ProductLoad::ALL {
            let deflection = ctx.forces.deflection(index, load, poi)?;
            if deflection != 0.0 {
                CategoryDeflections::add(&mut incremental, CamberCategory::for_load(load), deflection);
            }
        }

        let mut creep = 0.0;
        for &(loaded_day, deflection) in &sustained {
            let growth = ctx.materials.creep_coefficient(role, segment, loaded_day, interval.end_day)?
                - ctx.materials.creep_coefficient(role, segment, loaded_day, interval.start_day)?;
            creep += deflection * growth;
        }
        CategoryDeflections::add(&mut incremental, CamberCategory::Creep, creep);

        if index > release && release_force > 0.0 {
            let (shrinkage, relaxation) = pretension_force_lost(losses.at(index)?);
            CategoryDeflections::add(&mut incremental, CamberCategory::Shrinkage, -prestress_deflection * shrinkage / release_force);
            CategoryDeflections::add(&mut incremental, CamberCategory::Relaxation, -prestress_deflection * relaxation / release_force);
        }

        let elastic = incremental.elastic();
        if elastic != 0.0 {
            sustained.push((interval.middle_day(), elastic));
        }

        let adjustment = if Some(index) == erection {
            input.elevation_adjustment_in
        } else {
            0.0
        };
        elevation += adjustment;
        cumulative = cumulative + incremental;
        debug!(poi = %poi.id, interval = %index, creep, total = cumulative.total(), "camber step");
        intervals.push(IntervalCamber {
            interval: index,
            incremental,
            cumulative,
            elevation_adjustment_in: adjustment,
            total_in: input.precamber_in + elevation + cumulative.total(),
        });
    }

    let last = ctx.timeline.last_interval();
    let total_at = |index: IntervalIndex| -> EngineResult<f64> {
        intervals
            .get(index.0)
            .map(|i: &IntervalCamber| i.total_in)
            .ok_or_else(|| EngineError::missing_data(format!("camber in interval {}", index)))
    };
    let before_deck = ctx.timeline.cast_deck_interval().and_then(|c| c.previous());
    let live = ctx.timeline.live_load_interval().unwrap_or(last);
    let total = total_at(last)?;
    let before_deck_in = match before_deck {
        Some(index) => total_at(index)?,
        None => total,
    };
    let screed = match before_deck {
        Some(_) => -(total_at(live)? - before_deck_in),
        None => 0.0,
    };
    let excess = total - screed;
    check_excess_identity(total, screed, excess)?;

    let summary = CamberSummary {
        at_release_in: total_at(release)?,
        at_erection_in: total_at(erection.unwrap_or(release))?,
        before_deck_in,
        total_dead_load_in: total,
        screed_camber_in: screed,
        excess_camber_in: excess,
    };

    Ok(CamberDetails {
        segment,
        poi: poi.id,
        precamber_in: input.precamber_in,
        intervals,
        summary,
    })
}
