//! # Segment Geometry
//!
//! The read-only bridge description the engines consume: rectangle-assembled
//! concrete parts, reinforcement layers, and strand/tendon profiles along a
//! segment. Shape construction (I-beams, bulb-tees, ...) happens outside the
//! engine; it hands over the resulting rectangles.
//!
//! Coordinates: `y` is measured up from the bottom of the girder, `x` across
//! the section from the girder centerline, and locations along the segment
//! from its start.
//!
//! ```text
//!        ┌──────────────────────────────┐  deck
//!        └──────────────────────────────┘
//!              ┌──────────────┐            top flange
//!              └────┐    ┌────┘
//!                   │    │                 web
//!              ┌────┘    └────┐
//!              └──────────────┘  y = 0     bottom flange
//! ```

use serde::{Deserialize, Serialize};

use crate::errors::{EngineError, EngineResult};
use crate::keys::{SegmentKey, TendonKey};
use crate::materials::ConcreteRole;

// ============================================================================
// Profiles
// ============================================================================

/// Piecewise-linear vertical profile `y(x)` of a strand group or duct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<(f64, f64)>", into = "Vec<(f64, f64)>")]
pub struct Profile {
    /// `(x_in, y_in)` vertices sorted by x
    points: Vec<(f64, f64)>,
}

impl Profile {
    pub fn new(mut points: Vec<(f64, f64)>) -> EngineResult<Self> {
        if points.is_empty() {
            return Err(EngineError::invalid_input("profile", "[]", "Profile needs at least one point"));
        }
        points.sort_by(|a, b| a.0.total_cmp(&b.0));
        if points.iter().any(|(x, y)| !x.is_finite() || !y.is_finite()) {
            return Err(EngineError::invalid_input("profile", format!("{:?}", points), "Coordinates must be finite"));
        }
        Ok(Profile { points })
    }

    /// Constant elevation.
    pub fn straight(y_in: f64) -> Self {
        Profile {
            points: vec![(0.0, y_in)],
        }
    }

    /// Harped profile: `end_y_in` at both ends, `harp_y_in` between harp points.
    pub fn harped(length_in: f64, harp_offset_in: f64, end_y_in: f64, harp_y_in: f64) -> Self {
        Profile {
            points: vec![
                (0.0, end_y_in),
                (harp_offset_in, harp_y_in),
                (length_in - harp_offset_in, harp_y_in),
                (length_in, end_y_in),
            ],
        }
    }

    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }

    /// Elevation at `x`, held constant beyond the end points.
    pub fn y_at(&self, x: f64) -> f64 {
        let first = self.points[0];
        if x <= first.0 {
            return first.1;
        }
        for pair in self.points.windows(2) {
            let (x0, y0) = pair[0];
            let (x1, y1) = pair[1];
            if x <= x1 {
                if x1 - x0 <= f64::EPSILON {
                    return y1;
                }
                return y0 + (y1 - y0) * (x - x0) / (x1 - x0);
            }
        }
        self.points[self.points.len() - 1].1
    }

    /// Sum of absolute angle changes (radians) at vertices strictly between
    /// `from_x` and `to_x`.
    pub fn angular_change(&self, from_x: f64, to_x: f64) -> f64 {
        let (lo, hi) = if from_x <= to_x { (from_x, to_x) } else { (to_x, from_x) };
        let slopes: Vec<f64> = self
            .points
            .windows(2)
            .map(|p| ((p[1].1 - p[0].1) / (p[1].0 - p[0].0).max(f64::EPSILON)).atan())
            .collect();
        (1..self.points.len().saturating_sub(1))
            .filter(|&i| self.points[i].0 > lo && self.points[i].0 < hi)
            .map(|i| (slopes[i] - slopes[i - 1]).abs())
            .sum()
    }
}

impl TryFrom<Vec<(f64, f64)>> for Profile {
    type Error = EngineError;

    fn try_from(points: Vec<(f64, f64)>) -> EngineResult<Self> {
        Profile::new(points)
    }
}

impl From<Profile> for Vec<(f64, f64)> {
    fn from(profile: Profile) -> Self {
        profile.points
    }
}

// ============================================================================
// Concrete parts and reinforcement
// ============================================================================

/// A rectangular piece of concrete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConcreteComponent {
    pub name: String,
    pub role: ConcreteRole,
    pub width_in: f64,
    pub height_in: f64,
    /// Elevation of the bottom edge
    pub bottom_in: f64,
    /// Horizontal offset of the centroid from the girder centerline
    #[serde(default)]
    pub center_x_in: f64,
}

impl ConcreteComponent {
    pub fn new(name: impl Into<String>, role: ConcreteRole, width_in: f64, height_in: f64, bottom_in: f64) -> Self {
        ConcreteComponent {
            name: name.into(),
            role,
            width_in,
            height_in,
            bottom_in,
            center_x_in: 0.0,
        }
    }

    pub fn area_in2(&self) -> f64 {
        self.width_in * self.height_in
    }

    pub fn top_in(&self) -> f64 {
        self.bottom_in + self.height_in
    }

    pub fn centroid_y_in(&self) -> f64 {
        self.bottom_in + 0.5 * self.height_in
    }
}

/// Pretensioned strand groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StrandGroup {
    Straight,
    Harped,
    Temporary,
}

impl StrandGroup {
    pub fn is_permanent(&self) -> bool {
        !matches!(self, StrandGroup::Temporary)
    }
}

/// What a reinforcement layer is.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum LayerKind {
    Strand { group: StrandGroup },
    Tendon { tendon: TendonKey },
    /// Mild steel; `in_deck` bars only exist once the deck is cast
    Rebar { in_deck: bool },
}

/// A lumped area of steel at one elevation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReinforcementLayer {
    pub kind: LayerKind,
    pub area_in2: f64,
    pub y_in: f64,
    #[serde(default)]
    pub x_in: f64,
}

/// Pretensioned strands of one group and their profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrandPattern {
    pub group: StrandGroup,
    pub strand_count: u32,
    /// Jacking stress fpj
    pub fpj_ksi: f64,
    pub profile: Profile,
}

/// Which end(s) of a tendon are jacked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum JackingEnd {
    #[default]
    Left,
    Right,
    Both,
}

/// A post-tensioning tendon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TendonDescription {
    pub key: TendonKey,
    pub strand_count: u32,
    pub fpj_ksi: f64,
    /// Profile in the tendon's own coordinate (segment coordinate for segment
    /// tendons, girder coordinate for girder tendons)
    pub profile: Profile,
    pub length_in: f64,
    #[serde(default)]
    pub jacking_end: JackingEnd,
    /// Friction coefficient μ
    pub friction_coefficient: f64,
    /// Wobble coefficient k (per inch)
    pub wobble_per_in: f64,
    /// Anchor set Δset (in)
    pub anchor_set_in: f64,
}

/// Everything the engines need about one precast segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentModel {
    pub key: SegmentKey,
    pub length_in: f64,
    /// Distance from the start of the girder to the start of this segment
    #[serde(default)]
    pub girder_offset_in: f64,
    /// Precast girder parts
    pub girder: Vec<ConcreteComponent>,
    #[serde(default)]
    pub closure: Vec<ConcreteComponent>,
    /// Deck and longitudinal joint parts acting compositely
    #[serde(default)]
    pub deck: Vec<ConcreteComponent>,
    #[serde(default)]
    pub strands: Vec<StrandPattern>,
    #[serde(default)]
    pub tendons: Vec<TendonDescription>,
    #[serde(default)]
    pub rebar: Vec<ReinforcementLayer>,
    /// Development length multiplier κ
    #[serde(default = "default_kappa")]
    pub development_kappa: f64,
}

fn default_kappa() -> f64 {
    1.6
}

/// Concrete parts and steel layers present at one location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionGeometry {
    pub components: Vec<ConcreteComponent>,
    pub layers: Vec<ReinforcementLayer>,
}

impl SectionGeometry {
    /// Top of the girder (highest non-deck concrete).
    pub fn girder_top_in(&self) -> f64 {
        self.components
            .iter()
            .filter(|c| !matches!(c.role, ConcreteRole::Deck | ConcreteRole::LongitudinalJoint))
            .map(ConcreteComponent::top_in)
            .fold(f64::NEG_INFINITY, f64::max)
    }

    pub fn top_in(&self) -> f64 {
        self.components.iter().map(ConcreteComponent::top_in).fold(f64::NEG_INFINITY, f64::max)
    }

    pub fn bottom_in(&self) -> f64 {
        self.components.iter().map(|c| c.bottom_in).fold(f64::INFINITY, f64::min)
    }
}

impl SegmentModel {
    pub fn validate(&self) -> EngineResult<()> {
        if self.length_in <= 0.0 {
            return Err(EngineError::invalid_input("length_in", self.length_in.to_string(), "Segment length must be positive"));
        }
        if self.girder.is_empty() {
            return Err(EngineError::invalid_input("girder", "[]", "Segment needs at least one concrete part"));
        }
        for c in self.girder.iter().chain(&self.closure).chain(&self.deck) {
            if c.width_in <= 0.0 || c.height_in <= 0.0 {
                return Err(EngineError::invalid_input(
                    format!("{}.{}", self.key, c.name),
                    format!("{} x {}", c.width_in, c.height_in),
                    "Concrete part dimensions must be positive",
                ));
            }
        }
        for t in &self.tendons {
            if !t.key.acts_on(self.key) {
                return Err(EngineError::invalid_input("tendons", t.key.to_string(), format!("Tendon does not act on {}", self.key)));
            }
            if t.length_in <= 0.0 || t.friction_coefficient < 0.0 || t.wobble_per_in < 0.0 || t.anchor_set_in < 0.0 {
                return Err(EngineError::invalid_input("tendons", t.key.to_string(), "Tendon length, friction and set must be non-negative"));
            }
        }
        Ok(())
    }

    /// Area of pretensioned strand in a group (in²).
    pub fn strand_area_in2(&self, group: StrandGroup, strand_area_in2: f64) -> f64 {
        self.strands
            .iter()
            .filter(|p| p.group == group)
            .map(|p| f64::from(p.strand_count) * strand_area_in2)
            .sum()
    }

    /// Coordinate along a tendon's profile for a location on this segment.
    pub fn tendon_coordinate(&self, tendon: &TendonDescription, location_in: f64) -> f64 {
        match tendon.key {
            TendonKey::Segment { .. } => location_in,
            TendonKey::Girder { .. } => self.girder_offset_in + location_in,
        }
    }

    /// Concrete and steel at `location_in`, before any interval filtering.
    pub fn section_at(&self, location_in: f64, at_closure: bool, strand_area_in2: f64, tendon_strand_area_in2: f64) -> SectionGeometry {
        let mut components: Vec<ConcreteComponent> = if at_closure && !self.closure.is_empty() {
            self.closure.clone()
        } else {
            self.girder.clone()
        };
        components.extend(self.deck.iter().cloned());

        let mut layers = Vec::new();
        if !at_closure {
            for pattern in &self.strands {
                layers.push(ReinforcementLayer {
                    kind: LayerKind::Strand { group: pattern.group },
                    area_in2: f64::from(pattern.strand_count) * strand_area_in2,
                    y_in: pattern.profile.y_at(location_in),
                    x_in: 0.0,
                });
            }
        }
        for tendon in &self.tendons {
            let x = self.tendon_coordinate(tendon, location_in);
            layers.push(ReinforcementLayer {
                kind: LayerKind::Tendon { tendon: tendon.key },
                area_in2: f64::from(tendon.strand_count) * tendon_strand_area_in2,
                y_in: tendon.profile.y_at(x),
                x_in: 0.0,
            });
        }
        layers.extend(self.rebar.iter().copied());
        SectionGeometry { components, layers }
    }
}

/// All segment models of a bridge.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BridgeGeometry {
    segments: Vec<SegmentModel>,
}

impl BridgeGeometry {
    pub fn new(segments: Vec<SegmentModel>) -> EngineResult<Self> {
        for (i, segment) in segments.iter().enumerate() {
            segment.validate()?;
            if segments[..i].iter().any(|s| s.key == segment.key) {
                return Err(EngineError::invalid_input("segments", segment.key.to_string(), "Segment defined twice"));
            }
        }
        Ok(BridgeGeometry { segments })
    }

    pub fn segment(&self, key: SegmentKey) -> EngineResult<&SegmentModel> {
        self.segments
            .iter()
            .find(|s| s.key == key)
            .ok_or_else(|| EngineError::missing_data(format!("geometry for segment {}", key)))
    }

    pub fn segments(&self) -> impl Iterator<Item = &SegmentModel> {
        self.segments.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_interpolation() {
        let p = Profile::harped(1200.0, 480.0, 30.0, 6.0);
        assert_eq!(p.y_at(0.0), 30.0);
        assert!((p.y_at(240.0) - 18.0).abs() < 1e-12);
        assert_eq!(p.y_at(600.0), 6.0);
        assert_eq!(p.y_at(1500.0), 30.0);
    }

    #[test]
    fn test_angular_change_of_harped_profile() {
        let p = Profile::harped(1200.0, 480.0, 30.0, 6.0);
        let theta = (24.0f64 / 480.0).atan();
        // both harp points lie inside the full length
        assert!((p.angular_change(0.0, 1200.0) - 2.0 * theta).abs() < 1e-12);
        // only the first harp point lies before midspan
        assert!((p.angular_change(0.0, 600.0) - theta).abs() < 1e-12);
        assert!((p.angular_change(600.0, 0.0) - theta).abs() < 1e-12);
        assert_eq!(Profile::straight(5.0).angular_change(0.0, 100.0), 0.0);
    }

    #[test]
    fn test_section_at_uses_profile() {
        let seg = SegmentModel {
            key: SegmentKey::new(0, 0, 0),
            length_in: 1200.0,
            girder_offset_in: 0.0,
            girder: vec![ConcreteComponent::new("web", ConcreteRole::Segment, 12.0, 48.0, 0.0)],
            closure: vec![],
            deck: vec![],
            strands: vec![StrandPattern {
                group: StrandGroup::Harped,
                strand_count: 10,
                fpj_ksi: 202.5,
                profile: Profile::harped(1200.0, 480.0, 30.0, 6.0),
            }],
            tendons: vec![],
            rebar: vec![],
            development_kappa: 1.6,
        };
        assert!(seg.validate().is_ok());
        let geometry = seg.section_at(600.0, false, 0.217, 0.217);
        assert_eq!(geometry.layers.len(), 1);
        assert_eq!(geometry.layers[0].y_in, 6.0);
        assert!((geometry.layers[0].area_in2 - 2.17).abs() < 1e-12);
        assert_eq!(geometry.girder_top_in(), 48.0);
    }
}
