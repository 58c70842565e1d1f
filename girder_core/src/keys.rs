//! # Member Identifiers
//!
//! Composite keys for the structural members of a bridge. They are plain
//! values used as map keys; nothing owns anything through them.
//!
//! ```rust
//! use girder_core::keys::{GirderKey, SegmentKey};
//!
//! let segment = SegmentKey::new(0, 2, 1);
//! assert_eq!(segment.girder_key(), GirderKey::new(0, 2));
//! assert_eq!(segment.to_string(), "G1-B3-S2");
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifies a girder line within a group (span or splice group).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct GirderKey {
    pub group: u16,
    pub girder: u16,
}

impl GirderKey {
    pub const fn new(group: u16, girder: u16) -> Self {
        GirderKey { group, girder }
    }
}

impl fmt::Display for GirderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "G{}-B{}", self.group + 1, self.girder + 1)
    }
}

/// Identifies one precast segment of a girder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct SegmentKey {
    pub group: u16,
    pub girder: u16,
    pub segment: u16,
}

impl SegmentKey {
    pub const fn new(group: u16, girder: u16, segment: u16) -> Self {
        SegmentKey { group, girder, segment }
    }

    pub fn girder_key(&self) -> GirderKey {
        GirderKey::new(self.group, self.girder)
    }
}

impl fmt::Display for SegmentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "G{}-B{}-S{}", self.group + 1, self.girder + 1, self.segment + 1)
    }
}

/// Identifies the cast-in-place closure joint at the end of a segment.
///
/// A closure joint takes the key of the segment on its left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClosureKey(pub SegmentKey);

impl ClosureKey {
    pub fn left_segment(&self) -> SegmentKey {
        self.0
    }

    pub fn right_segment(&self) -> SegmentKey {
        SegmentKey::new(self.0.group, self.0.girder, self.0.segment + 1)
    }
}

impl fmt::Display for ClosureKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CJ({})", self.0)
    }
}

/// Stable identity of a point of interest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PoiId(pub u32);

impl fmt::Display for PoiId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifies a post-tensioning duct.
///
/// Segment tendons live entirely within one precast segment; girder tendons
/// are threaded through all segments of a girder after erection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "member")]
pub enum TendonKey {
    Segment { segment: SegmentKey, duct: u16 },
    Girder { girder: GirderKey, duct: u16 },
}

impl TendonKey {
    /// True if this tendon acts on the given segment.
    pub fn acts_on(&self, segment: SegmentKey) -> bool {
        match self {
            TendonKey::Segment { segment: s, .. } => *s == segment,
            TendonKey::Girder { girder, .. } => *girder == segment.girder_key(),
        }
    }
}

impl fmt::Display for TendonKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TendonKey::Segment { segment, duct } => write!(f, "{} duct {}", segment, duct + 1),
            TendonKey::Girder { girder, duct } => write!(f, "{} duct {}", girder, duct + 1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closure_neighbors() {
        let closure = ClosureKey(SegmentKey::new(0, 1, 2));
        assert_eq!(closure.left_segment(), SegmentKey::new(0, 1, 2));
        assert_eq!(closure.right_segment(), SegmentKey::new(0, 1, 3));
    }

    #[test]
    fn test_keys_order_by_group_then_girder() {
        let mut keys = vec![
            SegmentKey::new(1, 0, 0),
            SegmentKey::new(0, 1, 0),
            SegmentKey::new(0, 0, 1),
        ];
        keys.sort();
        assert_eq!(keys[0], SegmentKey::new(0, 0, 1));
        assert_eq!(keys[2], SegmentKey::new(1, 0, 0));
    }

    #[test]
    fn test_girder_tendon_acts_on_every_segment() {
        let tendon = TendonKey::Girder { girder: GirderKey::new(0, 1), duct: 0 };
        assert!(tendon.acts_on(SegmentKey::new(0, 1, 0)));
        assert!(tendon.acts_on(SegmentKey::new(0, 1, 3)));
        assert!(!tendon.acts_on(SegmentKey::new(0, 2, 0)));
    }
}
