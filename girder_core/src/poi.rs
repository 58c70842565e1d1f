//! # Points of Interest
//!
//! Locations along a segment where results are reported. POIs are created by
//! an external manager and only read by the engine; the engine never creates
//! or mutates them.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::{EngineError, EngineResult};
use crate::keys::{PoiId, SegmentKey};

/// A tag describing why a POI exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PoiAttribute {
    ReleaseSegmentLeftFace,
    ReleaseSegmentRightFace,
    ErectedSegmentSupport,
    CriticalSectionShear,
    HarpPoint,
    TenthPoint,
    Midspan,
    ClosureJoint,
    DebondPoint,
    PsTransfer,
    PsDevelopment,
}

impl PoiAttribute {
    pub const ALL: [PoiAttribute; 11] = [
        PoiAttribute::ReleaseSegmentLeftFace,
        PoiAttribute::ReleaseSegmentRightFace,
        PoiAttribute::ErectedSegmentSupport,
        PoiAttribute::CriticalSectionShear,
        PoiAttribute::HarpPoint,
        PoiAttribute::TenthPoint,
        PoiAttribute::Midspan,
        PoiAttribute::ClosureJoint,
        PoiAttribute::DebondPoint,
        PoiAttribute::PsTransfer,
        PoiAttribute::PsDevelopment,
    ];

    const fn bit(self) -> u32 {
        1 << (self as u32)
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            PoiAttribute::ReleaseSegmentLeftFace => "Left face (release)",
            PoiAttribute::ReleaseSegmentRightFace => "Right face (release)",
            PoiAttribute::ErectedSegmentSupport => "Support (erected)",
            PoiAttribute::CriticalSectionShear => "Critical section for shear",
            PoiAttribute::HarpPoint => "Harp point",
            PoiAttribute::TenthPoint => "Tenth point",
            PoiAttribute::Midspan => "Midspan",
            PoiAttribute::ClosureJoint => "Closure joint",
            PoiAttribute::DebondPoint => "Debond point",
            PoiAttribute::PsTransfer => "Transfer length",
            PoiAttribute::PsDevelopment => "Development length",
        }
    }
}

/// Compact set of [`PoiAttribute`]s. Serializes as a list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "Vec<PoiAttribute>", into = "Vec<PoiAttribute>")]
pub struct PoiAttributes(u32);

impl PoiAttributes {
    pub const fn empty() -> Self {
        PoiAttributes(0)
    }

    pub fn with(mut self, attribute: PoiAttribute) -> Self {
        self.0 |= attribute.bit();
        self
    }

    pub fn contains(&self, attribute: PoiAttribute) -> bool {
        self.0 & attribute.bit() != 0
    }

    pub fn iter(&self) -> impl Iterator<Item = PoiAttribute> + '_ {
        PoiAttribute::ALL.into_iter().filter(|a| self.contains(*a))
    }
}

impl From<Vec<PoiAttribute>> for PoiAttributes {
    fn from(list: Vec<PoiAttribute>) -> Self {
        list.into_iter().fold(PoiAttributes::empty(), PoiAttributes::with)
    }
}

impl From<PoiAttributes> for Vec<PoiAttribute> {
    fn from(set: PoiAttributes) -> Self {
        set.iter().collect()
    }
}

/// A reporting location along a segment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointOfInterest {
    pub id: PoiId,
    pub segment: SegmentKey,
    /// Distance from the start of the segment
    pub location_in: f64,
    #[serde(default)]
    pub attributes: PoiAttributes,
}

impl PointOfInterest {
    pub fn new(id: PoiId, segment: SegmentKey, location_in: f64) -> Self {
        PointOfInterest {
            id,
            segment,
            location_in,
            attributes: PoiAttributes::empty(),
        }
    }

    pub fn with_attribute(mut self, attribute: PoiAttribute) -> Self {
        self.attributes = self.attributes.with(attribute);
        self
    }

    pub fn has(&self, attribute: PoiAttribute) -> bool {
        self.attributes.contains(attribute)
    }

    pub fn is_closure_joint(&self) -> bool {
        self.has(PoiAttribute::ClosureJoint)
    }
}

impl fmt::Display for PointOfInterest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @ {:.2} ft", self.segment, self.location_in / 12.0)
    }
}

/// Source of POIs, normally the bridge model's POI manager.
pub trait PoiSource: Send + Sync {
    /// All POIs on a segment, ordered by location.
    fn segment_pois(&self, segment: SegmentKey) -> Vec<PointOfInterest>;

    fn poi(&self, id: PoiId) -> EngineResult<PointOfInterest>;
}

/// In-memory POI list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PoiList {
    pois: Vec<PointOfInterest>,
}

impl PoiList {
    pub fn new(mut pois: Vec<PointOfInterest>) -> EngineResult<Self> {
        pois.sort_by(|a, b| {
            a.segment
                .cmp(&b.segment)
                .then(a.location_in.total_cmp(&b.location_in))
        });
        let mut ids: Vec<PoiId> = pois.iter().map(|p| p.id).collect();
        ids.sort();
        ids.dedup();
        if ids.len() != pois.len() {
            return Err(EngineError::invalid_input("pois", "ids", "POI ids must be unique"));
        }
        Ok(PoiList { pois })
    }

    pub fn as_slice(&self) -> &[PointOfInterest] {
        &self.pois
    }
}

impl PoiSource for PoiList {
    fn segment_pois(&self, segment: SegmentKey) -> Vec<PointOfInterest> {
        self.pois.iter().filter(|p| p.segment == segment).copied().collect()
    }

    fn poi(&self, id: PoiId) -> EngineResult<PointOfInterest> {
        self.pois
            .iter()
            .find(|p| p.id == id)
            .copied()
            .ok_or_else(|| EngineError::missing_data(format!("poi {}", id)))
    }
}
