//! # Interval Timeline
//!
//! The time axis of the analysis. A bridge's construction sequence is broken
//! into an ordered list of [`Interval`]s (casting, release, storage, erection,
//! deck casting, service, ...). Every other component indexes time by
//! [`IntervalIndex`], never by calendar day directly.
//!
//! The timeline is immutable once built. Build one from construction events
//! with [`TimelineBuilder`].
//!
//! ## Example
//!
//! ```rust
//! use girder_core::keys::SegmentKey;
//! use girder_core::timeline::{Activity, TimelineBuilder, TimelineEvent};
//!
//! let segment = SegmentKey::new(0, 0, 0);
//! let timeline = TimelineBuilder::new(2000.0)
//!     .event(TimelineEvent::new(0.0).with(Activity::ConstructSegments {
//!         segments: vec![segment],
//!         relaxation_time_days: 1.0,
//!     }))
//!     .event(TimelineEvent::new(60.0).with(Activity::ErectSegments {
//!         segments: vec![segment],
//!         remove_temporary_strands: false,
//!     }))
//!     .build()
//!     .unwrap();
//!
//! let release = timeline.release_interval(segment).unwrap();
//! assert_eq!(timeline.interval(release).unwrap().duration_days(), 0.0);
//! ```

mod builder;

pub use builder::{Activity, TimelineBuilder, TimelineEvent};

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::{EngineError, EngineResult};
use crate::keys::{ClosureKey, SegmentKey, TendonKey};

/// Ordinal position of an interval in the timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IntervalIndex(pub usize);

impl IntervalIndex {
    /// The interval before this one, if any.
    pub fn previous(self) -> Option<IntervalIndex> {
        self.0.checked_sub(1).map(IntervalIndex)
    }

    pub fn next(self) -> IntervalIndex {
        IntervalIndex(self.0 + 1)
    }
}

impl fmt::Display for IntervalIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0 + 1)
    }
}

/// What happens during an interval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "activity")]
pub enum IntervalActivity {
    StressStrands,
    CastSegments,
    Release,
    Lifting,
    Storage,
    Hauling,
    Erection,
    RemoveTemporaryStrands,
    CastClosureJoints,
    CastDeck,
    Curing,
    StressTendons { tendons: Vec<TendonKey> },
    RemoveTemporarySupports,
    InstallRailingSystem,
    InstallOverlay,
    ApplyUserLoads,
    LiveLoad,
    TimeStep,
}

/// A discrete stage of the construction and service timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    pub index: IntervalIndex,
    pub description: String,
    pub start_day: f64,
    pub end_day: f64,
    /// Index of the timeline event that opened this interval
    pub start_event: usize,
    /// Index of the timeline event that closes this interval
    pub end_event: usize,
    pub activities: Vec<IntervalActivity>,
}

impl Interval {
    pub fn duration_days(&self) -> f64 {
        self.end_day - self.start_day
    }

    pub fn middle_day(&self) -> f64 {
        0.5 * (self.start_day + self.end_day)
    }

    pub fn has(&self, activity: &IntervalActivity) -> bool {
        self.activities.contains(activity)
    }

    /// Tendons jacked in this interval.
    pub fn stressed_tendons(&self) -> impl Iterator<Item = &TendonKey> {
        self.activities.iter().flat_map(|a| match a {
            IntervalActivity::StressTendons { tendons } => tendons.as_slice(),
            _ => &[][..],
        })
    }

    /// True if concrete is placed in this interval.
    pub fn is_casting(&self) -> bool {
        self.activities.iter().any(|a| {
            matches!(
                a,
                IntervalActivity::CastSegments | IntervalActivity::CastClosureJoints | IntervalActivity::CastDeck
            )
        })
    }
}

/// Interval indices that belong to one precast segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentIntervals {
    pub segment: SegmentKey,
    pub stress_strands: IntervalIndex,
    pub release: IntervalIndex,
    pub lifting: IntervalIndex,
    pub storage: IntervalIndex,
    pub hauling: Option<IntervalIndex>,
    pub erection: Option<IntervalIndex>,
    pub remove_temporary_strands: Option<IntervalIndex>,
}

/// Intervals of a cast-in-place closure joint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClosureIntervals {
    pub closure: ClosureKey,
    pub cast: IntervalIndex,
    pub composite: IntervalIndex,
}

/// Ordered, immutable list of analysis intervals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntervalTimeline {
    intervals: Vec<Interval>,
    segments: Vec<SegmentIntervals>,
    closures: Vec<ClosureIntervals>,
    tendons: Vec<(TendonKey, IntervalIndex)>,
    cast_deck: Option<IntervalIndex>,
    composite_deck: Option<IntervalIndex>,
    railing_system: Option<IntervalIndex>,
    overlay: Option<IntervalIndex>,
    live_load: Option<IntervalIndex>,
}

impl IntervalTimeline {
    pub fn interval_count(&self) -> usize {
        self.intervals.len()
    }

    pub fn intervals(&self) -> &[Interval] {
        &self.intervals
    }

    pub fn interval(&self, index: IntervalIndex) -> EngineResult<&Interval> {
        self.intervals
            .get(index.0)
            .ok_or_else(|| EngineError::missing_data(format!("interval {} (timeline has {})", index, self.intervals.len())))
    }

    pub fn indices(&self) -> impl Iterator<Item = IntervalIndex> + '_ {
        (0..self.intervals.len()).map(IntervalIndex)
    }

    pub fn last_interval(&self) -> IntervalIndex {
        IntervalIndex(self.intervals.len().saturating_sub(1))
    }

    pub fn segment_intervals(&self, segment: SegmentKey) -> EngineResult<&SegmentIntervals> {
        self.segments
            .iter()
            .find(|s| s.segment == segment)
            .ok_or_else(|| EngineError::missing_data(format!("construction intervals for segment {}", segment)))
    }

    pub fn segments(&self) -> impl Iterator<Item = &SegmentIntervals> {
        self.segments.iter()
    }

    pub fn closure_intervals(&self, closure: ClosureKey) -> Option<&ClosureIntervals> {
        self.closures.iter().find(|c| c.closure == closure)
    }

    pub fn stressing_interval(&self, segment: SegmentKey) -> EngineResult<IntervalIndex> {
        Ok(self.segment_intervals(segment)?.stress_strands)
    }

    pub fn release_interval(&self, segment: SegmentKey) -> EngineResult<IntervalIndex> {
        Ok(self.segment_intervals(segment)?.release)
    }

    pub fn storage_interval(&self, segment: SegmentKey) -> EngineResult<IntervalIndex> {
        Ok(self.segment_intervals(segment)?.storage)
    }

    pub fn erection_interval(&self, segment: SegmentKey) -> EngineResult<IntervalIndex> {
        self.segment_intervals(segment)?
            .erection
            .ok_or_else(|| EngineError::missing_data(format!("erection interval for segment {}", segment)))
    }

    pub fn temporary_strand_removal_interval(&self, segment: SegmentKey) -> Option<IntervalIndex> {
        self.segment_intervals(segment).ok()?.remove_temporary_strands
    }

    pub fn tendon_stressing_interval(&self, tendon: TendonKey) -> EngineResult<IntervalIndex> {
        self.tendons
            .iter()
            .find(|(key, _)| *key == tendon)
            .map(|(_, idx)| *idx)
            .ok_or_else(|| EngineError::missing_data(format!("stressing interval for tendon {}", tendon)))
    }

    pub fn cast_deck_interval(&self) -> Option<IntervalIndex> {
        self.cast_deck
    }

    /// First interval in which the deck acts compositely with the girder.
    pub fn composite_deck_interval(&self) -> Option<IntervalIndex> {
        self.composite_deck
    }

    pub fn railing_system_interval(&self) -> Option<IntervalIndex> {
        self.railing_system
    }

    pub fn overlay_interval(&self) -> Option<IntervalIndex> {
        self.overlay
    }

    pub fn live_load_interval(&self) -> Option<IntervalIndex> {
        self.live_load
    }

    /// True if pretension strands of `segment`, or any tendon acting on it,
    /// are stressed in interval `idx`.
    pub fn is_stressing_interval(&self, segment: SegmentKey, idx: IntervalIndex) -> bool {
        if self.segment_intervals(segment).map(|s| s.stress_strands == idx).unwrap_or(false) {
            return true;
        }
        self.tendons
            .iter()
            .any(|(tendon, stressed)| *stressed == idx && tendon.acts_on(segment))
    }

    pub fn is_erection_interval(&self, segment: SegmentKey, idx: IntervalIndex) -> bool {
        self.segment_intervals(segment)
            .map(|s| s.erection == Some(idx))
            .unwrap_or(false)
    }

    pub fn is_casting_interval(&self, idx: IntervalIndex) -> bool {
        self.intervals.get(idx.0).map(Interval::is_casting).unwrap_or(false)
    }

    /// True once the deck has hardened and acts compositely.
    pub fn is_composite(&self, idx: IntervalIndex) -> bool {
        self.composite_deck.map(|c| idx >= c).unwrap_or(false)
    }

    /// Concrete age in days at `day` for concrete cast at `cast_day`.
    pub fn age_at(cast_day: f64, day: f64) -> f64 {
        (day - cast_day).max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_index_navigation() {
        assert_eq!(IntervalIndex(0).previous(), None);
        assert_eq!(IntervalIndex(3).previous(), Some(IntervalIndex(2)));
        assert_eq!(IntervalIndex(3).next(), IntervalIndex(4));
        // displayed one-based
        assert_eq!(IntervalIndex(0).to_string(), "1");
    }

    #[test]
    fn test_interval_duration_and_middle() {
        let interval = Interval {
            index: IntervalIndex(0),
            description: "Time step".to_string(),
            start_day: 10.0,
            end_day: 40.0,
            start_event: 0,
            end_event: 1,
            activities: vec![IntervalActivity::TimeStep],
        };
        assert_eq!(interval.duration_days(), 30.0);
        assert_eq!(interval.middle_day(), 25.0);
        assert!(!interval.is_casting());
    }
}
