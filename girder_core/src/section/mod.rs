//! # Section Properties
//!
//! Per (interval, POI) section properties. Moduli change with concrete age,
//! so the same geometry gives different transformed properties in different
//! intervals; every property set carries the reference modulus it was
//! homogenized to.
//!
//! ## Modes
//!
//! | Mode          | Concrete                          | Steel                          |
//! |---------------|-----------------------------------|--------------------------------|
//! | `Gross`       | all parts active in the interval  | ignored                        |
//! | `Transformed` | all parts active in the interval  | bonded steel at (n − 1)·A      |
//!
//! In both modes deck and closure concrete are transformed by `Ec,part/Ec,ref`.
//!
//! ## Modules
//!
//! - [`geometry`] - Concrete parts, reinforcement layers, profiles
//! - [`provider`] - [`SectionPropertyProvider`] implementation with memoization
//! - [`cache`] - Compute-once-per-key cache

pub mod cache;
pub mod geometry;
pub mod provider;

pub use cache::MemoCache;
pub use geometry::{
    BridgeGeometry, ConcreteComponent, JackingEnd, LayerKind, Profile, ReinforcementLayer, SectionGeometry,
    SegmentModel, StrandGroup, StrandPattern, TendonDescription,
};
pub use provider::TransformedSectionProvider;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::{AnalysisLocation, EngineError, EngineResult};
use crate::poi::PointOfInterest;
use crate::timeline::IntervalIndex;

/// Which areas participate in the section properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PropertyMode {
    Gross,
    #[default]
    Transformed,
}

impl fmt::Display for PropertyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyMode::Gross => write!(f, "Gross"),
            PropertyMode::Transformed => write!(f, "Transformed"),
        }
    }
}

/// Section properties of one (interval, POI, mode).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SectionProperties {
    pub mode: PropertyMode,
    pub interval: IntervalIndex,
    /// Modulus all areas are transformed to
    pub e_ref_ksi: f64,
    pub area_in2: f64,
    pub ixx_in4: f64,
    pub iyy_in4: f64,
    pub ixy_in4: f64,
    pub centroid_x_in: f64,
    /// Elevation of the centroid above the bottom of the girder
    pub centroid_y_in: f64,
    /// Centroid to bottom fiber
    pub y_bottom_in: f64,
    /// Centroid to top of girder
    pub y_top_girder_in: f64,
    /// Centroid to top of the whole section (top of deck when composite)
    pub y_top_in: f64,
    /// First moment of the transformed deck area about the centroid
    pub q_deck_in3: f64,
    pub is_composite: bool,
}

impl SectionProperties {
    pub fn s_bottom_in3(&self) -> f64 {
        self.ixx_in4 / self.y_bottom_in
    }

    pub fn s_top_in3(&self) -> f64 {
        self.ixx_in4 / self.y_top_in
    }

    /// Eccentricity of a layer at elevation `y_in`, positive below the centroid.
    pub fn eccentricity_of(&self, y_in: f64) -> f64 {
        self.centroid_y_in - y_in
    }
}

/// One homogenized area contribution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct WeightedArea {
    pub area: f64,
    pub x: f64,
    pub y: f64,
    pub ixx_own: f64,
    pub iyy_own: f64,
    pub is_deck: bool,
}

/// Combine homogenized areas into section properties.
pub(crate) fn combine(
    parts: &[WeightedArea],
    mode: PropertyMode,
    interval: IntervalIndex,
    e_ref_ksi: f64,
    extents: (f64, f64, f64),
    location: AnalysisLocation,
) -> EngineResult<SectionProperties> {
    let (bottom, girder_top, top) = extents;
    let area: f64 = parts.iter().map(|p| p.area).sum();
    if !(area > 0.0 && area.is_finite()) {
        return Err(EngineError::degenerate(
            "section properties",
            location,
            format!("net transformed area {} is not positive", area),
        ));
    }
    let cx = parts.iter().map(|p| p.area * p.x).sum::<f64>() / area;
    let cy = parts.iter().map(|p| p.area * p.y).sum::<f64>() / area;
    let ixx = parts
        .iter()
        .map(|p| p.ixx_own + p.area * (p.y - cy).powi(2))
        .sum::<f64>();
    let iyy = parts
        .iter()
        .map(|p| p.iyy_own + p.area * (p.x - cx).powi(2))
        .sum::<f64>();
    let ixy = parts
        .iter()
        .map(|p| p.area * (p.x - cx) * (p.y - cy))
        .sum::<f64>();
    if !(ixx > 0.0 && ixx.is_finite()) {
        return Err(EngineError::degenerate(
            "section properties",
            location,
            format!("moment of inertia {} is not positive", ixx),
        ));
    }
    let q_deck = parts
        .iter()
        .filter(|p| p.is_deck)
        .map(|p| p.area * (p.y - cy))
        .sum::<f64>();
    Ok(SectionProperties {
        mode,
        interval,
        e_ref_ksi,
        area_in2: area,
        ixx_in4: ixx,
        iyy_in4: iyy,
        ixy_in4: ixy,
        centroid_x_in: cx,
        centroid_y_in: cy,
        y_bottom_in: cy - bottom,
        y_top_girder_in: girder_top - cy,
        y_top_in: top - cy,
        q_deck_in3: q_deck,
        is_composite: parts.iter().any(|p| p.is_deck),
    })
}

/// Source of section properties, normally backed by the bridge model.
///
/// For a fixed (interval, POI, mode) repeated calls return identical values.
pub trait SectionPropertyProvider: Send + Sync {
    fn section_properties(
        &self,
        interval: IntervalIndex,
        poi: &PointOfInterest,
        mode: PropertyMode,
    ) -> EngineResult<SectionProperties>;

    /// Concrete parts and bonded steel that exist at `poi` in `interval`.
    fn section_geometry(&self, interval: IntervalIndex, poi: &PointOfInterest) -> EngineResult<SectionGeometry>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(width: f64, height: f64, bottom: f64) -> WeightedArea {
        WeightedArea {
            area: width * height,
            x: 0.0,
            y: bottom + height / 2.0,
            ixx_own: width * height.powi(3) / 12.0,
            iyy_own: height * width.powi(3) / 12.0,
            is_deck: false,
        }
    }

    #[test]
    fn test_rectangle_properties() {
        let props = combine(
            &[rect(12.0, 24.0, 0.0)],
            PropertyMode::Gross,
            IntervalIndex(0),
            4000.0,
            (0.0, 24.0, 24.0),
            AnalysisLocation::unknown(),
        )
        .unwrap();
        assert_eq!(props.area_in2, 288.0);
        assert_eq!(props.centroid_y_in, 12.0);
        assert!((props.ixx_in4 - 13824.0).abs() < 1e-9);
        assert!((props.s_bottom_in3() - 1152.0).abs() < 1e-9);
        assert_eq!(props.ixy_in4, 0.0);
        assert_eq!(props.eccentricity_of(4.0), 8.0);
    }

    #[test]
    fn test_tee_section_parallel_axis() {
        // 48x6 flange on a 12x30 web
        let props = combine(
            &[rect(12.0, 30.0, 0.0), rect(48.0, 6.0, 30.0)],
            PropertyMode::Gross,
            IntervalIndex(0),
            4000.0,
            (0.0, 36.0, 36.0),
            AnalysisLocation::unknown(),
        )
        .unwrap();
        let area = 360.0 + 288.0;
        let cy = (360.0 * 15.0 + 288.0 * 33.0) / area;
        assert!((props.centroid_y_in - cy).abs() < 1e-9);
        let ixx = 12.0 * 27000.0 / 12.0 + 360.0 * (15.0 - cy).powi(2) + 48.0 * 216.0 / 12.0 + 288.0 * (33.0 - cy).powi(2);
        assert!((props.ixx_in4 - ixx).abs() < 1e-6);
    }

    #[test]
    fn test_asymmetric_section_has_product_of_inertia() {
        let mut offset = rect(12.0, 6.0, 24.0);
        offset.x = 10.0;
        let props = combine(
            &[rect(12.0, 24.0, 0.0), offset],
            PropertyMode::Gross,
            IntervalIndex(0),
            4000.0,
            (0.0, 30.0, 30.0),
            AnalysisLocation::unknown(),
        )
        .unwrap();
        assert!(props.ixy_in4.abs() > 1.0);
        assert!(props.centroid_x_in > 0.0);
    }

    #[test]
    fn test_negative_area_is_degenerate() {
        let mut bad = rect(12.0, 24.0, 0.0);
        bad.area = -288.0;
        let result = combine(
            &[bad],
            PropertyMode::Gross,
            IntervalIndex(0),
            4000.0,
            (0.0, 24.0, 24.0),
            AnalysisLocation::unknown(),
        );
        assert!(matches!(result, Err(EngineError::DegenerateInput { .. })));
    }
}
