//! Timeline construction from construction events.
//!
//! Each event expands into one or more intervals. Zero-duration intervals
//! model instantaneous operations (release, lifting, erection, jacking);
//! a "Time step" interval then spans the gap to the next event so creep,
//! shrinkage and relaxation have somewhere to happen.

use serde::{Deserialize, Serialize};

use super::{ClosureIntervals, Interval, IntervalActivity, IntervalIndex, IntervalTimeline, SegmentIntervals};
use crate::errors::{EngineError, EngineResult};
use crate::keys::{ClosureKey, SegmentKey, TendonKey};

/// One activity performed on a timeline event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Activity {
    /// Tension strands, cast segments, cure, and release
    ConstructSegments {
        segments: Vec<SegmentKey>,
        /// Time between jacking the strands and releasing them
        relaxation_time_days: f64,
    },
    ErectSegments {
        segments: Vec<SegmentKey>,
        #[serde(default)]
        remove_temporary_strands: bool,
    },
    CastClosureJoints {
        closures: Vec<ClosureKey>,
        age_at_continuity_days: f64,
    },
    CastDeck { age_at_continuity_days: f64 },
    StressTendons { tendons: Vec<TendonKey> },
    RemoveTemporarySupports,
    ApplyLoads {
        #[serde(default)]
        railing_system: bool,
        #[serde(default)]
        overlay: bool,
        #[serde(default)]
        user_loads: bool,
        #[serde(default)]
        live_load: bool,
    },
}

/// A dated entry of the construction timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEvent {
    pub day: f64,
    #[serde(default)]
    pub activities: Vec<Activity>,
}

impl TimelineEvent {
    pub fn new(day: f64) -> Self {
        TimelineEvent {
            day,
            activities: Vec::new(),
        }
    }

    pub fn with(mut self, activity: Activity) -> Self {
        self.activities.push(activity);
        self
    }
}

/// Expands timeline events into intervals.
#[derive(Debug, Clone)]
pub struct TimelineBuilder {
    events: Vec<TimelineEvent>,
    final_day: f64,
    time_step: bool,
}

impl TimelineBuilder {
    /// Start a builder whose last interval ends at `final_day`.
    pub fn new(final_day: f64) -> Self {
        TimelineBuilder {
            events: Vec::new(),
            final_day,
            time_step: true,
        }
    }

    /// Whether curing intervals are modeled (time-step losses need them).
    pub fn with_time_step(mut self, time_step: bool) -> Self {
        self.time_step = time_step;
        self
    }

    pub fn event(mut self, event: TimelineEvent) -> Self {
        self.events.push(event);
        self
    }

    pub fn events(mut self, events: impl IntoIterator<Item = TimelineEvent>) -> Self {
        self.events.extend(events);
        self
    }

    pub fn build(self) -> EngineResult<IntervalTimeline> {
        if self.events.is_empty() {
            return Err(EngineError::invalid_input("events", "[]", "Timeline needs at least one event"));
        }
        for (i, pair) in self.events.windows(2).enumerate() {
            if pair[1].day < pair[0].day {
                return Err(EngineError::invalid_input(
                    format!("events[{}].day", i + 1),
                    pair[1].day.to_string(),
                    "Events must be in chronological order",
                ));
            }
        }

        let mut state = BuildState::default();
        let event_count = self.events.len();

        for (event_idx, event) in self.events.iter().enumerate() {
            let next_day = self
                .events
                .get(event_idx + 1)
                .map(|e| e.day)
                .unwrap_or(self.final_day);
            state.day = state.day.max(event.day);
            state.event = event_idx;

            for activity in &event.activities {
                state.expand(activity, self.time_step)?;
            }

            if state.day > next_day {
                return Err(EngineError::invalid_input(
                    format!("events[{}]", event_idx),
                    format!("ends on day {}", state.day),
                    format!("Activities overrun the next event on day {}", next_day),
                ));
            }

            let is_last = event_idx + 1 == event_count;
            if next_day > state.day || is_last {
                let description = if is_last { "Final time step" } else { "Time step" };
                let duration = next_day - state.day;
                if is_last && duration <= 0.0 {
                    return Err(EngineError::invalid_input(
                        "final_day",
                        self.final_day.to_string(),
                        "Final day must be after the last event",
                    ));
                }
                state.push(description, duration, vec![IntervalActivity::TimeStep]);
            }
        }

        // fix up end_event now that every interval knows what follows it
        let count = state.intervals.len();
        for i in 0..count {
            let end_event = state
                .intervals
                .get(i + 1)
                .map(|next| next.start_event)
                .unwrap_or(event_count - 1);
            state.intervals[i].end_event = end_event;
        }

        if state.composite_deck_pending {
            return Err(EngineError::invalid_input(
                "events",
                "CastDeck",
                "Deck casting must be followed by at least one interval",
            ));
        }

        tracing::debug!(intervals = count, segments = state.segments.len(), "interval timeline built");

        Ok(IntervalTimeline {
            intervals: state.intervals,
            segments: state.segments,
            closures: state.closures,
            tendons: state.tendons,
            cast_deck: state.cast_deck,
            composite_deck: state.composite_deck,
            railing_system: state.railing_system,
            overlay: state.overlay,
            live_load: state.live_load,
        })
    }
}

#[derive(Default)]
struct BuildState {
    day: f64,
    event: usize,
    intervals: Vec<Interval>,
    segments: Vec<SegmentIntervals>,
    closures: Vec<ClosureIntervals>,
    pending_closures: Vec<ClosureKey>,
    tendons: Vec<(TendonKey, IntervalIndex)>,
    cast_deck: Option<IntervalIndex>,
    composite_deck: Option<IntervalIndex>,
    composite_deck_pending: bool,
    railing_system: Option<IntervalIndex>,
    overlay: Option<IntervalIndex>,
    live_load: Option<IntervalIndex>,
}

impl BuildState {
    fn push(&mut self, description: &str, duration_days: f64, activities: Vec<IntervalActivity>) -> IntervalIndex {
        let index = IntervalIndex(self.intervals.len());
        self.intervals.push(Interval {
            index,
            description: description.to_string(),
            start_day: self.day,
            end_day: self.day + duration_days,
            start_event: self.event,
            end_event: self.event,
            activities,
        });
        self.day += duration_days;

        // the interval after deck curing (or casting) is the first composite one
        if self.composite_deck_pending
            && !self.intervals[index.0].has(&IntervalActivity::Curing)
            && !self.intervals[index.0].has(&IntervalActivity::CastDeck)
        {
            self.composite_deck = Some(index);
            self.composite_deck_pending = false;
        }
        if !self.pending_closures.is_empty()
            && !self.intervals[index.0].has(&IntervalActivity::Curing)
            && !self.intervals[index.0].has(&IntervalActivity::CastClosureJoints)
        {
            for closure in &mut self.closures {
                if self.pending_closures.contains(&closure.closure) {
                    closure.composite = index;
                }
            }
            self.pending_closures.clear();
        }
        index
    }

    fn expand(&mut self, activity: &Activity, time_step: bool) -> EngineResult<()> {
        match activity {
            Activity::ConstructSegments {
                segments,
                relaxation_time_days,
            } => {
                if *relaxation_time_days < 0.0 {
                    return Err(EngineError::invalid_input(
                        "relaxation_time_days",
                        relaxation_time_days.to_string(),
                        "Time from jacking to release cannot be negative",
                    ));
                }
                let stress = self.push(
                    "Tension strand and cast girder segment",
                    *relaxation_time_days,
                    vec![IntervalActivity::StressStrands, IntervalActivity::CastSegments],
                );
                let release = self.push("Release prestress", 0.0, vec![IntervalActivity::Release]);
                let lifting = self.push("Lift segments", 0.0, vec![IntervalActivity::Lifting]);
                let storage = self.push("Place segments into storage", 0.0, vec![IntervalActivity::Storage]);
                for segment in segments {
                    if self.segments.iter().any(|s| s.segment == *segment) {
                        return Err(EngineError::invalid_input(
                            "segments",
                            segment.to_string(),
                            "Segment constructed more than once",
                        ));
                    }
                    self.segments.push(SegmentIntervals {
                        segment: *segment,
                        stress_strands: stress,
                        release,
                        lifting,
                        storage,
                        hauling: None,
                        erection: None,
                        remove_temporary_strands: None,
                    });
                }
            }
            Activity::ErectSegments {
                segments,
                remove_temporary_strands,
            } => {
                let hauling = self.push("Haul segments", 0.0, vec![IntervalActivity::Hauling]);
                let erection = self.push("Erect segments", 0.0, vec![IntervalActivity::Erection]);
                let removal = remove_temporary_strands.then(|| {
                    self.push(
                        "Remove temporary strands",
                        0.0,
                        vec![IntervalActivity::RemoveTemporaryStrands],
                    )
                });
                for segment in segments {
                    let entry = self
                        .segments
                        .iter_mut()
                        .find(|s| s.segment == *segment)
                        .ok_or_else(|| {
                            EngineError::invalid_input("segments", segment.to_string(), "Segment erected before it was constructed")
                        })?;
                    entry.hauling = Some(hauling);
                    entry.erection = Some(erection);
                    entry.remove_temporary_strands = removal;
                }
            }
            Activity::CastClosureJoints {
                closures,
                age_at_continuity_days,
            } => {
                let cast = self.push("Cast closure joints", 0.0, vec![IntervalActivity::CastClosureJoints]);
                for closure in closures {
                    self.closures.push(ClosureIntervals {
                        closure: *closure,
                        cast,
                        composite: cast.next(),
                    });
                }
                self.pending_closures.extend(closures.iter().copied());
                if time_step {
                    self.push("Time step - closure curing", *age_at_continuity_days, vec![IntervalActivity::Curing]);
                }
            }
            Activity::CastDeck { age_at_continuity_days } => {
                if self.cast_deck.is_some() {
                    return Err(EngineError::invalid_input("activities", "CastDeck", "Deck cast more than once"));
                }
                let cast = self.push("Cast deck", 0.0, vec![IntervalActivity::CastDeck]);
                self.cast_deck = Some(cast);
                self.composite_deck_pending = true;
                if time_step {
                    self.push("Time step - deck curing", *age_at_continuity_days, vec![IntervalActivity::Curing]);
                }
            }
            Activity::StressTendons { tendons } => {
                let idx = self.push(
                    "Stress tendons",
                    0.0,
                    vec![IntervalActivity::StressTendons { tendons: tendons.clone() }],
                );
                for tendon in tendons {
                    if self.tendons.iter().any(|(t, _)| t == tendon) {
                        return Err(EngineError::invalid_input("tendons", tendon.to_string(), "Tendon stressed more than once"));
                    }
                    self.tendons.push((*tendon, idx));
                }
            }
            Activity::RemoveTemporarySupports => {
                self.push("Remove temporary supports", 0.0, vec![IntervalActivity::RemoveTemporarySupports]);
            }
            Activity::ApplyLoads {
                railing_system,
                overlay,
                user_loads,
                live_load,
            } => {
                let mut activities = Vec::new();
                let mut parts = Vec::new();
                if *railing_system {
                    activities.push(IntervalActivity::InstallRailingSystem);
                    parts.push("Install railing system");
                }
                if *overlay {
                    activities.push(IntervalActivity::InstallOverlay);
                    parts.push("Install overlay");
                }
                if *user_loads {
                    activities.push(IntervalActivity::ApplyUserLoads);
                    parts.push("Apply user defined loads");
                }
                if *live_load {
                    activities.push(IntervalActivity::LiveLoad);
                    parts.push("Open to traffic");
                }
                if activities.is_empty() {
                    return Ok(());
                }
                let idx = self.push(&parts.join(", "), 0.0, activities);
                if *railing_system {
                    self.railing_system = Some(idx);
                }
                if *overlay {
                    self.overlay = Some(idx);
                }
                if *live_load {
                    self.live_load = Some(idx);
                }
            }
        }
        Ok(())
    }
}
