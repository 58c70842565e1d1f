//! Test bridges shared by the engine tests: a 100 ft pretensioned I-girder
//! with a composite deck, and a variant with a draped girder tendon.

use std::sync::Arc;

use crate::criteria::AnalysisCriteria;
use crate::forces::{LiveLoadEnvelope, ProductForceEntry, ProductForceTable, ProductLoad};
use crate::keys::{GirderKey, PoiId, SegmentKey, TendonKey};
use crate::context::AnalysisContext;
use crate::materials::{BridgeMaterials, ConcreteMaterial, ConcreteRole, ConcreteType, RebarMaterial, UhpcTension};
use crate::poi::{PoiAttribute, PointOfInterest};
use crate::section::geometry::{
    BridgeGeometry, ConcreteComponent, JackingEnd, LayerKind, Profile, ReinforcementLayer, SegmentModel,
    StrandGroup, StrandPattern, TendonDescription,
};
use crate::section::TransformedSectionProvider;
use crate::timeline::{Activity, IntervalTimeline, TimelineBuilder, TimelineEvent};

pub const LENGTH_IN: f64 = 1200.0;

pub fn seg() -> SegmentKey {
    SegmentKey::new(0, 0, 0)
}

pub fn tendon_key() -> TendonKey {
    TendonKey::Girder {
        girder: GirderKey::new(0, 0),
        duct: 0,
    }
}

pub struct Fixture {
    pub timeline: Arc<IntervalTimeline>,
    pub materials: Arc<BridgeMaterials>,
    pub geometry: Arc<BridgeGeometry>,
    pub sections: Arc<TransformedSectionProvider>,
    pub forces: Arc<ProductForceTable>,
    pub criteria: AnalysisCriteria,
    pub pois: Vec<PointOfInterest>,
    pub entries: Vec<ProductForceEntry>,
    pub live_load: Vec<LiveLoadEnvelope>,
}

impl Fixture {
    pub fn context(&self) -> AnalysisContext<'_> {
        AnalysisContext {
            timeline: &self.timeline,
            materials: self.materials.as_ref(),
            sections: self.sections.as_ref(),
            forces: self.forces.as_ref(),
            segment: self.segment(),
            criteria: &self.criteria,
        }
    }

    pub fn segment(&self) -> &SegmentModel {
        self.geometry.segment(seg()).unwrap()
    }

    pub fn poi(&self, id: u32) -> &PointOfInterest {
        self.pois.iter().find(|p| p.id == PoiId(id)).unwrap()
    }

    pub fn midspan(&self) -> &PointOfInterest {
        self.poi(3)
    }
}

fn girder_components() -> Vec<ConcreteComponent> {
    vec![
        ConcreteComponent::new("bottom flange", ConcreteRole::Segment, 26.0, 8.0, 0.0),
        ConcreteComponent::new("web", ConcreteRole::Segment, 6.0, 38.0, 8.0),
        ConcreteComponent::new("top flange", ConcreteRole::Segment, 16.0, 8.0, 46.0),
    ]
}

fn deck_rebar() -> Vec<ReinforcementLayer> {
    vec![
        ReinforcementLayer {
            kind: LayerKind::Rebar { in_deck: true },
            area_in2: 2.48,
            y_in: 60.0,
            x_in: 0.0,
        },
        ReinforcementLayer {
            kind: LayerKind::Rebar { in_deck: true },
            area_in2: 2.48,
            y_in: 56.0,
            x_in: 0.0,
        },
    ]
}

fn pretensioned_segment(temporary_strands: u32) -> SegmentModel {
    let mut strands = vec![
        StrandPattern {
            group: StrandGroup::Straight,
            strand_count: 16,
            fpj_ksi: 202.5,
            profile: Profile::straight(3.0),
        },
        StrandPattern {
            group: StrandGroup::Harped,
            strand_count: 6,
            fpj_ksi: 202.5,
            profile: Profile::harped(LENGTH_IN, 480.0, 40.0, 5.0),
        },
    ];
    if temporary_strands > 0 {
        strands.push(StrandPattern {
            group: StrandGroup::Temporary,
            strand_count: temporary_strands,
            fpj_ksi: 150.0,
            profile: Profile::straight(50.0),
        });
    }
    SegmentModel {
        key: seg(),
        length_in: LENGTH_IN,
        girder_offset_in: 0.0,
        girder: girder_components(),
        closure: vec![],
        deck: vec![ConcreteComponent::new("deck", ConcreteRole::Deck, 96.0, 8.0, 54.0)],
        strands,
        tendons: vec![],
        rebar: deck_rebar(),
        development_kappa: 1.6,
    }
}

fn girder_tendon() -> TendonDescription {
    TendonDescription {
        key: tendon_key(),
        strand_count: 12,
        fpj_ksi: 216.0,
        profile: Profile::new(vec![(0.0, 40.0), (600.0, 5.0), (LENGTH_IN, 40.0)]).unwrap(),
        length_in: LENGTH_IN,
        jacking_end: JackingEnd::Left,
        friction_coefficient: 0.25,
        wobble_per_in: 0.0002 / 12.0,
        anchor_set_in: 0.25,
    }
}

fn pois() -> Vec<PointOfInterest> {
    vec![
        PointOfInterest::new(PoiId(1), seg(), 12.0).with_attribute(PoiAttribute::PsTransfer),
        PointOfInterest::new(PoiId(2), seg(), 360.0).with_attribute(PoiAttribute::TenthPoint),
        PointOfInterest::new(PoiId(3), seg(), 600.0).with_attribute(PoiAttribute::Midspan),
    ]
}

/// (load, midspan moment kip-in, uniform load kip/in, midspan deflection in)
const LOADS: [(ProductLoad, f64, f64, f64); 6] = [
    (ProductLoad::GirderSelfWeight, 8_812.0, 0.04896, -0.90),
    (ProductLoad::Pretension, 0.0, 0.0, 2.20),
    (ProductLoad::Slab, 12_000.0, 0.06667, -1.20),
    (ProductLoad::Diaphragm, 600.0, 0.0, -0.06),
    (ProductLoad::RailingSystem, 1_500.0, 0.00833, -0.05),
    (ProductLoad::Overlay, 1_800.0, 0.01, -0.06),
];

fn product_forces(pois: &[PointOfInterest], with_tendon: bool) -> (Vec<ProductForceEntry>, Vec<LiveLoadEnvelope>) {
    let mut entries = Vec::new();
    let mut live_load = Vec::new();
    for poi in pois {
        let x = poi.location_in;
        let shape = x * (LENGTH_IN - x) / (LENGTH_IN * LENGTH_IN / 4.0);
        for (load, moment, w, deflection) in LOADS {
            entries.push(ProductForceEntry {
                poi: poi.id,
                load,
                interval: None,
                moment_kip_in: moment * shape,
                shear_kip: w * (LENGTH_IN / 2.0 - x),
                deflection_in: deflection * shape,
            });
        }
        if with_tendon {
            entries.push(ProductForceEntry {
                poi: poi.id,
                load: ProductLoad::PostTensioning,
                interval: None,
                moment_kip_in: 0.0,
                shear_kip: 0.0,
                deflection_in: 0.8 * shape,
            });
        }
        live_load.push(LiveLoadEnvelope {
            poi: poi.id,
            moment_max_kip_in: 20_000.0 * shape,
            moment_min_kip_in: 0.0,
            shear_kip: 25.0 + 35.0 * (1.0 - x / (LENGTH_IN / 2.0)).max(0.0),
        });
    }
    (entries, live_load)
}

fn girder_concrete() -> ConcreteMaterial {
    ConcreteMaterial::from_release_strength(5.5, 7.0, 1.0, 3.5).unwrap()
}

fn assemble(
    segment: SegmentModel,
    events: Vec<TimelineEvent>,
    with_tendon: bool,
    girder: ConcreteMaterial,
) -> Fixture {
    let timeline = Arc::new(TimelineBuilder::new(2000.0).events(events).build().unwrap());
    let materials = Arc::new(
        BridgeMaterials::new(timeline.clone(), girder)
        .with_deck_concrete(ConcreteMaterial::cast_in_place(4.0, 4.0))
        .with_rebar(RebarMaterial::default()),
    );
    let geometry = Arc::new(BridgeGeometry::new(vec![segment]).unwrap());
    let sections = Arc::new(TransformedSectionProvider::new(
        timeline.clone(),
        materials.clone(),
        geometry.clone(),
    ));
    let pois = pois();
    let (entries, live_load) = product_forces(&pois, with_tendon);
    let forces = Arc::new(ProductForceTable::new(&timeline, &pois, &entries, &live_load).unwrap());
    Fixture {
        timeline,
        materials,
        geometry,
        sections,
        forces,
        criteria: AnalysisCriteria::default(),
        pois,
        entries,
        live_load,
    }
}

fn construct() -> TimelineEvent {
    TimelineEvent::new(0.0).with(Activity::ConstructSegments {
        segments: vec![seg()],
        relaxation_time_days: 1.0,
    })
}

fn deck_and_service() -> [TimelineEvent; 2] {
    [
        TimelineEvent::new(90.0).with(Activity::CastDeck {
            age_at_continuity_days: 7.0,
        }),
        TimelineEvent::new(120.0).with(Activity::ApplyLoads {
            railing_system: true,
            overlay: true,
            user_loads: false,
            live_load: true,
        }),
    ]
}

/// Pretensioned girder; temporary strands are removed at erection when
/// `temporary_strands > 0`.
pub fn pretensioned_girder(temporary_strands: u32) -> Fixture {
    let mut events = vec![
        construct(),
        TimelineEvent::new(60.0).with(Activity::ErectSegments {
            segments: vec![seg()],
            remove_temporary_strands: temporary_strands > 0,
        }),
    ];
    events.extend(deck_and_service());
    assemble(pretensioned_segment(temporary_strands), events, false, girder_concrete())
}

/// The pretensioned girder cast in UHPC.
pub fn uhpc_girder() -> Fixture {
    let mut events = vec![
        construct(),
        TimelineEvent::new(60.0).with(Activity::ErectSegments {
            segments: vec![seg()],
            remove_temporary_strands: false,
        }),
    ];
    events.extend(deck_and_service());
    let concrete = ConcreteMaterial::from_release_strength(14.0, 22.0, 1.0, 3.5)
        .unwrap()
        .with_uhpc(ConcreteType::Uhpc, UhpcTension::default());
    assemble(pretensioned_segment(0), events, false, concrete)
}

/// Pretensioned girder with a girder tendon jacked on day 75.
pub fn post_tensioned_girder() -> Fixture {
    let mut segment = pretensioned_segment(0);
    segment.strands.truncate(1);
    segment.tendons.push(girder_tendon());
    let mut events = vec![
        construct(),
        TimelineEvent::new(60.0).with(Activity::ErectSegments {
            segments: vec![seg()],
            remove_temporary_strands: false,
        }),
        TimelineEvent::new(75.0).with(Activity::StressTendons {
            tendons: vec![tendon_key()],
        }),
    ];
    events.extend(deck_and_service());
    assemble(segment, events, true, girder_concrete())
}
