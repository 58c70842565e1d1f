//! # Materials
//!
//! Concrete aging and steel models, and the [`MaterialModel`] interface the
//! engines use to read per-interval material properties.
//!
//! ## Modules
//!
//! - [`concrete`] - Strength gain, modulus, creep and shrinkage
//! - [`strand`] - Prestressing strand stress-strain and relaxation
//! - [`rebar`] - Mild reinforcement

pub mod concrete;
pub mod rebar;
pub mod strand;

pub use concrete::{ConcreteMaterial, ConcreteType, UhpcTension};
pub use rebar::RebarMaterial;
pub use strand::{StrandMaterial, StrandType};

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::errors::{EngineError, EngineResult};
use crate::keys::{ClosureKey, SegmentKey};
use crate::timeline::{IntervalIndex, IntervalTimeline};

/// Which concrete placement a property refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConcreteRole {
    Segment,
    ClosureJoint,
    Deck,
    LongitudinalJoint,
}

impl ConcreteRole {
    pub const ALL: [ConcreteRole; 4] = [
        ConcreteRole::Segment,
        ConcreteRole::ClosureJoint,
        ConcreteRole::Deck,
        ConcreteRole::LongitudinalJoint,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            ConcreteRole::Segment => "Segment",
            ConcreteRole::ClosureJoint => "Closure joint",
            ConcreteRole::Deck => "Deck",
            ConcreteRole::LongitudinalJoint => "Longitudinal joint",
        }
    }
}

impl fmt::Display for ConcreteRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Per-interval material properties consumed by the engines.
pub trait MaterialModel: Send + Sync {
    fn concrete(&self, role: ConcreteRole, segment: SegmentKey) -> EngineResult<&ConcreteMaterial>;

    /// Day the concrete was placed.
    fn casting_day(&self, role: ConcreteRole, segment: SegmentKey) -> EngineResult<f64>;

    /// Modulus of elasticity at the middle of `interval` (ksi). Zero before casting.
    fn modulus(&self, role: ConcreteRole, segment: SegmentKey, interval: IntervalIndex) -> EngineResult<f64>;

    /// Compressive strength at the middle of `interval` (ksi).
    fn strength(&self, role: ConcreteRole, segment: SegmentKey, interval: IntervalIndex) -> EngineResult<f64>;

    /// Creep coefficient at `at_day` for load applied on `loaded_day`.
    fn creep_coefficient(&self, role: ConcreteRole, segment: SegmentKey, loaded_day: f64, at_day: f64)
        -> EngineResult<f64>;

    /// Free shrinkage strain accumulated by `at_day`.
    fn shrinkage_strain(&self, role: ConcreteRole, segment: SegmentKey, at_day: f64) -> EngineResult<f64>;

    fn strand(&self) -> &StrandMaterial;

    fn tendon(&self) -> &StrandMaterial;

    fn rebar(&self) -> &RebarMaterial;
}

/// Material definitions for one bridge, aged along its timeline.
#[derive(Debug, Clone)]
pub struct BridgeMaterials {
    timeline: Arc<IntervalTimeline>,
    relative_humidity_pct: f64,
    cure_duration_days: f64,
    segment_concrete: ConcreteMaterial,
    segment_overrides: Vec<(SegmentKey, ConcreteMaterial)>,
    closure_concrete: Option<ConcreteMaterial>,
    deck_concrete: Option<ConcreteMaterial>,
    joint_concrete: Option<ConcreteMaterial>,
    strand: StrandMaterial,
    tendon: StrandMaterial,
    rebar: RebarMaterial,
}

impl BridgeMaterials {
    pub fn new(timeline: Arc<IntervalTimeline>, segment_concrete: ConcreteMaterial) -> Self {
        BridgeMaterials {
            timeline,
            relative_humidity_pct: 70.0,
            cure_duration_days: 1.0,
            segment_concrete,
            segment_overrides: Vec::new(),
            closure_concrete: None,
            deck_concrete: None,
            joint_concrete: None,
            strand: StrandMaterial::default(),
            tendon: StrandMaterial::default(),
            rebar: RebarMaterial::default(),
        }
    }

    pub fn with_environment(mut self, relative_humidity_pct: f64, cure_duration_days: f64) -> Self {
        self.relative_humidity_pct = relative_humidity_pct;
        self.cure_duration_days = cure_duration_days;
        self
    }

    pub fn with_segment_concrete(mut self, segment: SegmentKey, concrete: ConcreteMaterial) -> Self {
        self.segment_overrides.push((segment, concrete));
        self
    }

    pub fn with_closure_concrete(mut self, concrete: ConcreteMaterial) -> Self {
        self.closure_concrete = Some(concrete);
        self
    }

    pub fn with_deck_concrete(mut self, concrete: ConcreteMaterial) -> Self {
        self.deck_concrete = Some(concrete);
        self
    }

    pub fn with_joint_concrete(mut self, concrete: ConcreteMaterial) -> Self {
        self.joint_concrete = Some(concrete);
        self
    }

    pub fn with_strand(mut self, strand: StrandMaterial) -> Self {
        self.strand = strand;
        self
    }

    pub fn with_tendon(mut self, tendon: StrandMaterial) -> Self {
        self.tendon = tendon;
        self
    }

    pub fn with_rebar(mut self, rebar: RebarMaterial) -> Self {
        self.rebar = rebar;
        self
    }

    pub fn validate(&self) -> EngineResult<()> {
        self.segment_concrete.validate()?;
        for (_, c) in &self.segment_overrides {
            c.validate()?;
        }
        for c in [&self.closure_concrete, &self.deck_concrete, &self.joint_concrete]
            .into_iter()
            .flatten()
        {
            c.validate()?;
        }
        Ok(())
    }

    fn age_at(&self, role: ConcreteRole, segment: SegmentKey, day: f64) -> EngineResult<f64> {
        Ok(IntervalTimeline::age_at(self.casting_day(role, segment)?, day))
    }
}

impl MaterialModel for BridgeMaterials {
    fn concrete(&self, role: ConcreteRole, segment: SegmentKey) -> EngineResult<&ConcreteMaterial> {
        match role {
            ConcreteRole::Segment => Ok(self
                .segment_overrides
                .iter()
                .find(|(key, _)| *key == segment)
                .map(|(_, c)| c)
                .unwrap_or(&self.segment_concrete)),
            ConcreteRole::ClosureJoint => self
                .closure_concrete
                .as_ref()
                .ok_or_else(|| EngineError::missing_data("closure joint concrete")),
            ConcreteRole::Deck => self
                .deck_concrete
                .as_ref()
                .ok_or_else(|| EngineError::missing_data("deck concrete")),
            ConcreteRole::LongitudinalJoint => self
                .joint_concrete
                .as_ref()
                .ok_or_else(|| EngineError::missing_data("longitudinal joint concrete")),
        }
    }

    fn casting_day(&self, role: ConcreteRole, segment: SegmentKey) -> EngineResult<f64> {
        let interval = match role {
            ConcreteRole::Segment => self.timeline.stressing_interval(segment)?,
            ConcreteRole::ClosureJoint => {
                self.timeline
                    .closure_intervals(ClosureKey(segment))
                    .ok_or_else(|| EngineError::missing_data(format!("closure joint casting after {}", segment)))?
                    .cast
            }
            ConcreteRole::Deck | ConcreteRole::LongitudinalJoint => self
                .timeline
                .cast_deck_interval()
                .ok_or_else(|| EngineError::missing_data("deck casting interval"))?,
        };
        Ok(self.timeline.interval(interval)?.start_day)
    }

    fn modulus(&self, role: ConcreteRole, segment: SegmentKey, interval: IntervalIndex) -> EngineResult<f64> {
        let day = self.timeline.interval(interval)?.middle_day();
        let age = self.age_at(role, segment, day)?;
        Ok(self.concrete(role, segment)?.modulus_at_age(age))
    }

    fn strength(&self, role: ConcreteRole, segment: SegmentKey, interval: IntervalIndex) -> EngineResult<f64> {
        let day = self.timeline.interval(interval)?.middle_day();
        let age = self.age_at(role, segment, day)?;
        Ok(self.concrete(role, segment)?.fc_at_age(age))
    }

    fn creep_coefficient(
        &self,
        role: ConcreteRole,
        segment: SegmentKey,
        loaded_day: f64,
        at_day: f64,
    ) -> EngineResult<f64> {
        let loading_age = self.age_at(role, segment, loaded_day)?;
        let age = self.age_at(role, segment, at_day)?;
        Ok(self
            .concrete(role, segment)?
            .creep_coefficient(age, loading_age, self.relative_humidity_pct))
    }

    fn shrinkage_strain(&self, role: ConcreteRole, segment: SegmentKey, at_day: f64) -> EngineResult<f64> {
        let drying = self.age_at(role, segment, at_day)? - self.cure_duration_days;
        Ok(self
            .concrete(role, segment)?
            .shrinkage_strain(drying, self.relative_humidity_pct))
    }

    fn strand(&self) -> &StrandMaterial {
        &self.strand
    }

    fn tendon(&self) -> &StrandMaterial {
        &self.tendon
    }

    fn rebar(&self) -> &RebarMaterial {
        &self.rebar
    }
}
