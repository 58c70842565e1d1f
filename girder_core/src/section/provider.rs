//! Section property provider backed by the segment geometry and the aging
//! material model, memoized per (interval, POI, mode).

use std::sync::Arc;

use super::cache::MemoCache;
use super::geometry::{BridgeGeometry, LayerKind, SectionGeometry};
use super::{combine, PropertyMode, SectionProperties, SectionPropertyProvider, WeightedArea};
use crate::errors::{AnalysisLocation, EngineError, EngineResult};
use crate::keys::PoiId;
use crate::materials::{ConcreteRole, MaterialModel};
use crate::poi::PointOfInterest;
use crate::timeline::{IntervalIndex, IntervalTimeline};

type PropertyKey = (IntervalIndex, PoiId, PropertyMode);

/// Builds section properties from rectangles and steel layers, homogenized
/// to the modulus of the girder (or closure) concrete in each interval.
pub struct TransformedSectionProvider {
    timeline: Arc<IntervalTimeline>,
    materials: Arc<dyn MaterialModel>,
    geometry: Arc<BridgeGeometry>,
    cache: MemoCache<PropertyKey, SectionProperties>,
}

impl TransformedSectionProvider {
    pub fn new(timeline: Arc<IntervalTimeline>, materials: Arc<dyn MaterialModel>, geometry: Arc<BridgeGeometry>) -> Self {
        TransformedSectionProvider {
            timeline,
            materials,
            geometry,
            cache: MemoCache::new(),
        }
    }

    /// Number of memoized property sets.
    pub fn cached_entries(&self) -> usize {
        self.cache.len()
    }

    fn reference_role(poi: &PointOfInterest) -> ConcreteRole {
        if poi.is_closure_joint() {
            ConcreteRole::ClosureJoint
        } else {
            ConcreteRole::Segment
        }
    }

    fn layer_is_bonded(&self, kind: &LayerKind, poi: &PointOfInterest, interval: IntervalIndex) -> EngineResult<bool> {
        let segment = poi.segment;
        Ok(match kind {
            LayerKind::Strand { group } => {
                let release = self.timeline.release_interval(segment)?;
                if interval < release {
                    false
                } else if group.is_permanent() {
                    true
                } else {
                    self.timeline
                        .temporary_strand_removal_interval(segment)
                        .map(|removal| interval < removal)
                        .unwrap_or(true)
                }
            }
            // grouted once the stressing interval is over
            LayerKind::Tendon { tendon } => interval > self.timeline.tendon_stressing_interval(*tendon)?,
            LayerKind::Rebar { in_deck } => !in_deck || self.timeline.is_composite(interval),
        })
    }

    fn compute(&self, interval: IntervalIndex, poi: &PointOfInterest, mode: PropertyMode) -> EngineResult<SectionProperties> {
        let location = AnalysisLocation::at_poi(poi.segment, poi.id).with_interval(interval);
        let geometry = self.section_geometry(interval, poi)?;
        let ref_role = Self::reference_role(poi);
        let e_ref = self.materials.modulus(ref_role, poi.segment, interval)?;
        if e_ref <= 0.0 {
            return Err(EngineError::degenerate(
                "section properties",
                location,
                format!("{} concrete has no stiffness in this interval", ref_role),
            ));
        }

        let mut parts = Vec::with_capacity(geometry.components.len() + geometry.layers.len());
        for component in &geometry.components {
            let e = self.materials.modulus(component.role, poi.segment, interval)?;
            let n = e / e_ref;
            let is_deck = matches!(component.role, ConcreteRole::Deck | ConcreteRole::LongitudinalJoint);
            parts.push(WeightedArea {
                area: n * component.area_in2(),
                x: component.center_x_in,
                y: component.centroid_y_in(),
                ixx_own: n * component.width_in * component.height_in.powi(3) / 12.0,
                iyy_own: n * component.height_in * component.width_in.powi(3) / 12.0,
                is_deck,
            });
        }

        if mode == PropertyMode::Transformed {
            for layer in &geometry.layers {
                let e_steel = match layer.kind {
                    LayerKind::Strand { .. } => self.materials.strand().ep_ksi,
                    LayerKind::Tendon { .. } => self.materials.tendon().ep_ksi,
                    LayerKind::Rebar { .. } => self.materials.rebar().es_ksi,
                };
                let in_deck = matches!(layer.kind, LayerKind::Rebar { in_deck: true });
                // steel displaces the concrete it sits in
                let e_host = if in_deck {
                    self.materials.modulus(ConcreteRole::Deck, poi.segment, interval)?
                } else {
                    e_ref
                };
                parts.push(WeightedArea {
                    area: (e_steel - e_host) / e_ref * layer.area_in2,
                    x: layer.x_in,
                    y: layer.y_in,
                    ixx_own: 0.0,
                    iyy_own: 0.0,
                    is_deck: in_deck,
                });
            }
        }

        let extents = (geometry.bottom_in(), geometry.girder_top_in(), geometry.top_in());
        combine(&parts, mode, interval, e_ref, extents, location)
    }
}

impl SectionPropertyProvider for TransformedSectionProvider {
    fn section_properties(
        &self,
        interval: IntervalIndex,
        poi: &PointOfInterest,
        mode: PropertyMode,
    ) -> EngineResult<SectionProperties> {
        self.cache
            .get_or_try_compute(&(interval, poi.id, mode), || self.compute(interval, poi, mode))
    }

    fn section_geometry(&self, interval: IntervalIndex, poi: &PointOfInterest) -> EngineResult<SectionGeometry> {
        let segment = self.geometry.segment(poi.segment)?;
        let full = segment.section_at(
            poi.location_in,
            poi.is_closure_joint(),
            self.materials.strand().area_in2,
            self.materials.tendon().area_in2,
        );
        let composite = self.timeline.is_composite(interval);
        let closure_cast = if poi.is_closure_joint() {
            self.timeline
                .closure_intervals(crate::keys::ClosureKey(poi.segment))
                .map(|c| interval >= c.composite)
                .unwrap_or(false)
        } else {
            true
        };
        if !closure_cast {
            return Err(EngineError::missing_data(format!(
                "closure joint at {} has not hardened in interval {}",
                poi, interval
            )));
        }

        let components = full
            .components
            .into_iter()
            .filter(|c| composite || !matches!(c.role, ConcreteRole::Deck | ConcreteRole::LongitudinalJoint))
            .collect();
        let mut layers = Vec::with_capacity(full.layers.len());
        for layer in full.layers {
            if self.layer_is_bonded(&layer.kind, poi, interval)? {
                layers.push(layer);
            }
        }
        Ok(SectionGeometry { components, layers })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::SegmentKey;
    use crate::materials::{BridgeMaterials, ConcreteMaterial};
    use crate::section::geometry::{ConcreteComponent, Profile, SegmentModel, StrandGroup, StrandPattern};
    use crate::timeline::{Activity, TimelineBuilder, TimelineEvent};

    fn seg() -> SegmentKey {
        SegmentKey::new(0, 0, 0)
    }

    fn provider() -> (TransformedSectionProvider, Arc<IntervalTimeline>) {
        let timeline = Arc::new(
            TimelineBuilder::new(2000.0)
                .event(TimelineEvent::new(0.0).with(Activity::ConstructSegments {
                    segments: vec![seg()],
                    relaxation_time_days: 1.0,
                }))
                .event(TimelineEvent::new(60.0).with(Activity::ErectSegments {
                    segments: vec![seg()],
                    remove_temporary_strands: false,
                }))
                .event(TimelineEvent::new(90.0).with(Activity::CastDeck {
                    age_at_continuity_days: 7.0,
                }))
                .build()
                .unwrap(),
        );
        let materials = Arc::new(
            BridgeMaterials::new(
                timeline.clone(),
                ConcreteMaterial::from_release_strength(5.5, 7.0, 1.0, 3.5).unwrap(),
            )
            .with_deck_concrete(ConcreteMaterial::cast_in_place(4.0, 4.0)),
        );
        let geometry = Arc::new(
            BridgeGeometry::new(vec![SegmentModel {
                key: seg(),
                length_in: 1200.0,
                girder_offset_in: 0.0,
                girder: vec![
                    ConcreteComponent::new("bottom flange", ConcreteRole::Segment, 26.0, 8.0, 0.0),
                    ConcreteComponent::new("web", ConcreteRole::Segment, 6.0, 38.0, 8.0),
                    ConcreteComponent::new("top flange", ConcreteRole::Segment, 16.0, 8.0, 46.0),
                ],
                closure: vec![],
                deck: vec![ConcreteComponent::new("deck", ConcreteRole::Deck, 96.0, 8.0, 54.0)],
                strands: vec![StrandPattern {
                    group: StrandGroup::Straight,
                    strand_count: 20,
                    fpj_ksi: 202.5,
                    profile: Profile::straight(4.0),
                }],
                tendons: vec![],
                rebar: vec![],
                development_kappa: 1.6,
            }])
            .unwrap(),
        );
        (TransformedSectionProvider::new(timeline.clone(), materials, geometry), timeline)
    }

    fn poi() -> PointOfInterest {
        PointOfInterest::new(PoiId(1), seg(), 600.0)
    }

    #[test]
    fn test_transformed_is_stiffer_than_gross() {
        let (p, timeline) = provider();
        let release = timeline.release_interval(seg()).unwrap();
        let gross = p.section_properties(release, &poi(), PropertyMode::Gross).unwrap();
        let transformed = p.section_properties(release, &poi(), PropertyMode::Transformed).unwrap();
        assert!(transformed.area_in2 > gross.area_in2);
        assert!(transformed.centroid_y_in < gross.centroid_y_in);
        assert_eq!(gross.area_in2, 26.0 * 8.0 + 6.0 * 38.0 + 16.0 * 8.0);
    }

    #[test]
    fn test_deck_joins_at_composite_interval() {
        let (p, timeline) = provider();
        let cast = timeline.cast_deck_interval().unwrap();
        let composite = timeline.composite_deck_interval().unwrap();
        let before = p.section_properties(cast, &poi(), PropertyMode::Gross).unwrap();
        let after = p.section_properties(composite, &poi(), PropertyMode::Gross).unwrap();
        assert!(!before.is_composite);
        assert!(after.is_composite);
        assert!(after.ixx_in4 > 2.0 * before.ixx_in4);
        assert!(after.q_deck_in3 > 0.0);
    }

    #[test]
    fn test_transformed_properties_vary_with_age() {
        let (p, timeline) = provider();
        let release = timeline.release_interval(seg()).unwrap();
        let last = timeline.last_interval();
        let early = p.section_properties(release, &poi(), PropertyMode::Transformed).unwrap();
        let late = p.section_properties(last, &poi(), PropertyMode::Transformed).unwrap();
        assert!(late.e_ref_ksi > early.e_ref_ksi);
    }

    #[test]
    fn test_repeated_calls_are_identical_and_cached() {
        let (p, timeline) = provider();
        let release = timeline.release_interval(seg()).unwrap();
        let a = p.section_properties(release, &poi(), PropertyMode::Transformed).unwrap();
        let b = p.section_properties(release, &poi(), PropertyMode::Transformed).unwrap();
        assert_eq!(a, b);
        assert_eq!(p.cached_entries(), 1);
    }

    #[test]
    fn test_strands_unbonded_before_release() {
        let (p, _) = provider();
        let result = p.section_properties(IntervalIndex(0), &poi(), PropertyMode::Gross);
        assert!(result.is_ok());
        let geometry = p.section_geometry(IntervalIndex(0), &poi()).unwrap();
        assert!(geometry.layers.is_empty());
    }
}
