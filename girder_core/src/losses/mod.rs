//! # Prestress Losses
//!
//! Interval-by-interval prestress losses at a point of interest, computed
//! with the time-step method.
//!
//! Each strand group and tendon is an independent *stream* with its own
//! stressing interval and eccentricity; all streams share the section and
//! aging inputs of the POI.
//!
//! | Stream              | Stressed               | Bonded                    |
//! |---------------------|------------------------|---------------------------|
//! | Permanent strands   | strand stressing       | release                   |
//! | Temporary strands   | strand stressing       | release until removal     |
//! | Segment tendon      | its stressing interval | after its stressing interval |
//! | Girder tendon       | its stressing interval | after its stressing interval |
//!
//! ## Loss Components
//!
//! All losses are stresses (ksi), positive for a loss and negative for a
//! gain.
//!
//! - `elastic` - shortening or elongation of the concrete at the stream under
//!   loads, prestress transfer and other streams' stressing
//! - `creep`, `shrinkage`, `relaxation` - time-dependent loss over the
//!   interval duration
//! - `deck_shrinkage` - elastic effect of restrained deck shrinkage on the
//!   composite section
//! - `friction`, `anchor_set` - tendon seating losses
//!
//! ## Modules
//!
//! - [`elastic_shortening`] - Release loss, iterative or 0.7·fpu
//! - [`post_tensioning`] - Friction and anchor set
//! - [`time_step`] - The forward recurrence

pub mod elastic_shortening;
pub mod post_tensioning;
pub mod time_step;

pub use elastic_shortening::{ElasticShorteningInput, ElasticShorteningResult};
pub use post_tensioning::SeatingLoss;
pub use time_step::compute_losses;

use std::fmt;
use std::ops::{Add, AddAssign};

use serde::{Deserialize, Serialize};

use crate::diagnostics::Diagnostic;
use crate::errors::{EngineError, EngineResult};
use crate::keys::{PoiId, SegmentKey, TendonKey};
use crate::section::SectionProperties;
use crate::timeline::IntervalIndex;

/// An independently tracked group of prestressing steel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "stream")]
pub enum LossStream {
    PermanentStrands,
    TemporaryStrands,
    Tendon { tendon: TendonKey },
}

impl LossStream {
    pub fn is_pretension(&self) -> bool {
        !matches!(self, LossStream::Tendon { .. })
    }

    pub fn is_girder_tendon(&self) -> bool {
        matches!(self, LossStream::Tendon { tendon: TendonKey::Girder { .. } })
    }
}

impl fmt::Display for LossStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LossStream::PermanentStrands => write!(f, "Permanent strands"),
            LossStream::TemporaryStrands => write!(f, "Temporary strands"),
            LossStream::Tendon { tendon } => write!(f, "Tendon {}", tendon),
        }
    }
}

/// Loss breakdown (ksi).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LossComponents {
    pub elastic_ksi: f64,
    pub creep_ksi: f64,
    pub shrinkage_ksi: f64,
    pub relaxation_ksi: f64,
    pub deck_shrinkage_ksi: f64,
    pub friction_ksi: f64,
    pub anchor_set_ksi: f64,
}

impl LossComponents {
    pub fn total(&self) -> f64 {
        self.elastic_ksi
            + self.creep_ksi
            + self.shrinkage_ksi
            + self.relaxation_ksi
            + self.deck_shrinkage_ksi
            + self.friction_ksi
            + self.anchor_set_ksi
    }

    /// Creep, shrinkage and relaxation.
    pub fn time_dependent(&self) -> f64 {
        self.creep_ksi + self.shrinkage_ksi + self.relaxation_ksi
    }
}

impl Add for LossComponents {
    type Output = LossComponents;

    fn add(self, rhs: LossComponents) -> LossComponents {
        LossComponents {
            elastic_ksi: self.elastic_ksi + rhs.elastic_ksi,
            creep_ksi: self.creep_ksi + rhs.creep_ksi,
            shrinkage_ksi: self.shrinkage_ksi + rhs.shrinkage_ksi,
            relaxation_ksi: self.relaxation_ksi + rhs.relaxation_ksi,
            deck_shrinkage_ksi: self.deck_shrinkage_ksi + rhs.deck_shrinkage_ksi,
            friction_ksi: self.friction_ksi + rhs.friction_ksi,
            anchor_set_ksi: self.anchor_set_ksi + rhs.anchor_set_ksi,
        }
    }
}

impl AddAssign for LossComponents {
    fn add_assign(&mut self, rhs: LossComponents) {
        *self = *self + rhs;
    }
}

/// Where a stream is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StreamState {
    NotStressed,
    /// Stressed but not yet bonded to the concrete
    Unbonded,
    Bonded,
    Removed,
}

/// Loss state of one stream at the end of an interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamLoss {
    pub stream: LossStream,
    pub state: StreamState,
    pub area_in2: f64,
    /// Elevation of the stream centroid above the girder bottom
    pub y_in: f64,
    /// Eccentricity relative to the interval's section centroid, positive below
    pub eccentricity_in: f64,
    pub fpj_ksi: f64,
    pub incremental: LossComponents,
    pub cumulative: LossComponents,
    /// Effective stress after all losses
    pub fpe_ksi: f64,
    pub effective_force_kip: f64,
}

impl StreamLoss {
    /// True while the stream applies force to the concrete.
    pub fn is_active(&self) -> bool {
        matches!(self.state, StreamState::Unbonded | StreamState::Bonded)
    }
}

/// Losses at one POI at the end of one interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LossDetails {
    pub segment: SegmentKey,
    pub poi: PoiId,
    pub interval: IntervalIndex,
    /// Section properties used for elastic effects in this interval
    pub section: Option<SectionProperties>,
    pub streams: Vec<StreamLoss>,
    /// Girder self-weight moment accumulated through this interval
    pub girder_moment_kip_in: f64,
    /// Present in the release interval
    pub elastic_shortening: Option<ElasticShorteningResult>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

impl LossDetails {
    pub fn stream(&self, stream: LossStream) -> Option<&StreamLoss> {
        self.streams.iter().find(|s| s.stream == stream)
    }

    pub fn permanent_strands(&self) -> Option<&StreamLoss> {
        self.stream(LossStream::PermanentStrands)
    }

    pub fn temporary_strands(&self) -> Option<&StreamLoss> {
        self.stream(LossStream::TemporaryStrands)
    }

    pub fn tendons(&self) -> impl Iterator<Item = &StreamLoss> {
        self.streams.iter().filter(|s| !s.stream.is_pretension())
    }

    /// Total effective force of active streams and the elevation of its
    /// resultant, `(P, y)`.
    pub fn prestress_resultant(&self) -> (f64, f64) {
        let (force, moment) = self
            .streams
            .iter()
            .filter(|s| s.is_active())
            .fold((0.0, 0.0), |(p, m), s| (p + s.effective_force_kip, m + s.effective_force_kip * s.y_in));
        if force.abs() > 0.0 {
            (force, moment / force)
        } else {
            (0.0, 0.0)
        }
    }
}

/// Losses at one POI for every interval of the timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LossHistory {
    pub segment: SegmentKey,
    pub poi: PoiId,
    pub details: Vec<LossDetails>,
}

impl LossHistory {
    pub fn at(&self, interval: IntervalIndex) -> EngineResult<&LossDetails> {
        self.details
            .get(interval.0)
            .ok_or_else(|| EngineError::missing_data(format!("losses at poi {} in interval {}", self.poi, interval)))
    }

    pub fn last(&self) -> EngineResult<&LossDetails> {
        self.details
            .last()
            .ok_or_else(|| EngineError::missing_data(format!("losses at poi {}", self.poi)))
    }

    /// Every diagnostic raised along the history.
    pub fn diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.details.iter().flat_map(|d| d.diagnostics.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::GirderKey;

    fn stream(stream: LossStream, force: f64, y: f64, state: StreamState) -> StreamLoss {
        StreamLoss {
            stream,
            state,
            area_in2: 1.0,
            y_in: y,
            eccentricity_in: 0.0,
            fpj_ksi: 202.5,
            incremental: LossComponents::default(),
            cumulative: LossComponents::default(),
            fpe_ksi: force,
            effective_force_kip: force,
        }
    }

    #[test]
    fn test_components_total() {
        let a = LossComponents {
            elastic_ksi: 10.0,
            creep_ksi: 5.0,
            shrinkage_ksi: 4.0,
            relaxation_ksi: 1.0,
            deck_shrinkage_ksi: -0.5,
            friction_ksi: 0.0,
            anchor_set_ksi: 0.0,
        };
        let mut b = a;
        b += a;
        assert_eq!(a.total(), 19.5);
        assert_eq!(a.time_dependent(), 10.0);
        assert_eq!(b.total(), 39.0);
    }

    #[test]
    fn test_resultant_skips_removed_streams() {
        let tendon = LossStream::Tendon {
            tendon: TendonKey::Girder {
                girder: GirderKey::new(0, 0),
                duct: 0,
            },
        };
        let details = LossDetails {
            segment: SegmentKey::new(0, 0, 0),
            poi: PoiId(1),
            interval: IntervalIndex(5),
            section: None,
            streams: vec![
                stream(LossStream::PermanentStrands, 600.0, 4.0, StreamState::Bonded),
                stream(LossStream::TemporaryStrands, 100.0, 50.0, StreamState::Removed),
                stream(tendon, 400.0, 9.0, StreamState::Unbonded),
            ],
            girder_moment_kip_in: 0.0,
            elastic_shortening: None,
            diagnostics: vec![],
        };
        let (p, y) = details.prestress_resultant();
        assert_eq!(p, 1000.0);
        assert!((y - 6.0).abs() < 1e-12);
        assert_eq!(details.tendons().count(), 1);
        assert!(details.tendons().all(|s| s.stream.is_girder_tendon()));
    }
}
