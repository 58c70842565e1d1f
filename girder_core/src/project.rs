//! # Bridge Project Files
//!
//! A [`BridgeProject`] is the serializable description of one girder line:
//! construction events, materials, segment models, points of interest,
//! product load effects and rating vehicles. Projects are stored as
//! human-readable JSON and turned into a ready-to-run [`GirderAnalysis`]
//! with [`BridgeProject::build`].
//!
//! ## Structure
//!
//! ```text
//! BridgeProject
//! ├── meta: ProjectMetadata (schema version, engineer, job, timestamps)
//! ├── criteria: AnalysisCriteria (method selectors, factors)
//! ├── timeline: TimelineInput (events, final day)
//! ├── materials: MaterialInput (concretes, strand, rebar, environment)
//! ├── segments / segment_checks
//! ├── pois
//! ├── product_forces / live_load / nominal_shear
//! ├── time_dependent_effects
//! └── vehicles
//! ```
//!
//! Saves are atomic: the JSON is written to a sibling `.tmp` file, synced,
//! then renamed over the target.

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::criteria::AnalysisCriteria;
use crate::engine::{GirderAnalysis, SegmentChecks};
use crate::errors::{EngineError, EngineResult};
use crate::forces::{LiveLoadEnvelope, ProductForceEntry, ProductForceTable};
use crate::keys::{PoiId, SegmentKey};
use crate::materials::{BridgeMaterials, ConcreteMaterial, RebarMaterial, StrandMaterial};
use crate::poi::PointOfInterest;
use crate::rating::{RatingVehicle, TimeDependentEffects};
use crate::section::{BridgeGeometry, SegmentModel, TransformedSectionProvider};
use crate::timeline::{IntervalTimeline, TimelineBuilder, TimelineEvent};

/// Current schema version of project files
pub const SCHEMA_VERSION: &str = "0.1.0";

/// Who, what and when of a project file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectMetadata {
    /// Schema version the file was written with
    pub version: String,
    pub engineer: String,
    pub job_id: String,
    /// Bridge or structure name
    pub bridge: String,
    pub id: Uuid,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

/// Construction and service events of the girder line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineInput {
    /// Day the final (service) interval ends
    pub final_day: f64,
    /// Split long intervals into time-step intervals
    #[serde(default = "default_time_step")]
    pub time_step: bool,
    pub events: Vec<TimelineEvent>,
}

fn default_time_step() -> bool {
    true
}

/// Concrete override for one segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentConcrete {
    pub segment: SegmentKey,
    pub concrete: ConcreteMaterial,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialInput {
    /// Concrete of every precast segment without an override
    pub segment_concrete: ConcreteMaterial,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub segment_overrides: Vec<SegmentConcrete>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closure_concrete: Option<ConcreteMaterial>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deck_concrete: Option<ConcreteMaterial>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub joint_concrete: Option<ConcreteMaterial>,
    #[serde(default)]
    pub strand: StrandMaterial,
    #[serde(default)]
    pub tendon: StrandMaterial,
    #[serde(default)]
    pub rebar: RebarMaterial,
    #[serde(default = "default_humidity")]
    pub relative_humidity_pct: f64,
    #[serde(default = "default_cure")]
    pub cure_duration_days: f64,
}

fn default_humidity() -> f64 {
    70.0
}

fn default_cure() -> f64 {
    1.0
}

impl MaterialInput {
    pub fn new(segment_concrete: ConcreteMaterial) -> Self {
        MaterialInput {
            segment_concrete,
            segment_overrides: Vec::new(),
            closure_concrete: None,
            deck_concrete: None,
            joint_concrete: None,
            strand: StrandMaterial::default(),
            tendon: StrandMaterial::default(),
            rebar: RebarMaterial::default(),
            relative_humidity_pct: default_humidity(),
            cure_duration_days: default_cure(),
        }
    }

    fn assemble(&self, timeline: Arc<IntervalTimeline>) -> EngineResult<BridgeMaterials> {
        if !(0.0..=100.0).contains(&self.relative_humidity_pct) {
            return Err(EngineError::invalid_input(
                "materials.relative_humidity_pct",
                self.relative_humidity_pct.to_string(),
                "must be between 0 and 100",
            ));
        }
        let mut materials = BridgeMaterials::new(timeline, self.segment_concrete.clone())
            .with_environment(self.relative_humidity_pct, self.cure_duration_days)
            .with_strand(self.strand)
            .with_tendon(self.tendon)
            .with_rebar(self.rebar);
        for o in &self.segment_overrides {
            materials = materials.with_segment_concrete(o.segment, o.concrete.clone());
        }
        if let Some(c) = &self.closure_concrete {
            materials = materials.with_closure_concrete(c.clone());
        }
        if let Some(c) = &self.deck_concrete {
            materials = materials.with_deck_concrete(c.clone());
        }
        if let Some(c) = &self.joint_concrete {
            materials = materials.with_joint_concrete(c.clone());
        }
        materials.validate()?;
        Ok(materials)
    }
}

/// Interface shear and camber inputs of one segment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SegmentCheckInput {
    pub segment: SegmentKey,
    #[serde(default)]
    pub checks: SegmentChecks,
}

/// Nominal vertical shear resistance at a POI.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NominalShear {
    pub poi: PoiId,
    pub vn_kip: f64,
}

/// Root of a project file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeProject {
    pub meta: ProjectMetadata,
    #[serde(default)]
    pub criteria: AnalysisCriteria,
    pub timeline: TimelineInput,
    pub materials: MaterialInput,
    pub segments: Vec<SegmentModel>,
    #[serde(default)]
    pub segment_checks: Vec<SegmentCheckInput>,
    pub pois: Vec<PointOfInterest>,
    #[serde(default)]
    pub product_forces: Vec<ProductForceEntry>,
    #[serde(default)]
    pub live_load: Vec<LiveLoadEnvelope>,
    #[serde(default)]
    pub nominal_shear: Vec<NominalShear>,
    /// Restraint effects of spliced girders
    #[serde(default)]
    pub time_dependent_effects: Vec<TimeDependentEffects>,
    #[serde(default)]
    pub vehicles: Vec<RatingVehicle>,
}

impl BridgeProject {
    /// Create a project with no segments, POIs or loads.
    ///
    /// ```rust
    /// use girder_core::materials::ConcreteMaterial;
    /// use girder_core::project::{BridgeProject, MaterialInput, TimelineInput};
    ///
    /// let concrete = ConcreteMaterial::from_release_strength(5.5, 7.0, 1.0, 3.5).unwrap();
    /// let project = BridgeProject::new(
    ///     "J. Engineer",
    ///     "26-014",
    ///     "Bridge 7",
    ///     TimelineInput { final_day: 2000.0, time_step: true, events: vec![] },
    ///     MaterialInput::new(concrete),
    /// );
    /// assert_eq!(project.meta.job_id, "26-014");
    /// assert!(project.segments.is_empty());
    /// ```
    pub fn new(
        engineer: impl Into<String>,
        job_id: impl Into<String>,
        bridge: impl Into<String>,
        timeline: TimelineInput,
        materials: MaterialInput,
    ) -> Self {
        let now = Utc::now();
        BridgeProject {
            meta: ProjectMetadata {
                version: SCHEMA_VERSION.to_string(),
                engineer: engineer.into(),
                job_id: job_id.into(),
                bridge: bridge.into(),
                id: Uuid::new_v4(),
                created: now,
                modified: now,
            },
            criteria: AnalysisCriteria::default(),
            timeline,
            materials,
            segments: Vec::new(),
            segment_checks: Vec::new(),
            pois: Vec::new(),
            product_forces: Vec::new(),
            live_load: Vec::new(),
            nominal_shear: Vec::new(),
            time_dependent_effects: Vec::new(),
            vehicles: Vec::new(),
        }
    }

    /// Update the modified timestamp.
    pub fn touch(&mut self) {
        self.meta.modified = Utc::now();
    }

    pub fn from_json_str(text: &str) -> EngineResult<Self> {
        let project: BridgeProject =
            serde_json::from_str(text).map_err(|e| EngineError::Serialization { reason: e.to_string() })?;
        validate_version(&project.meta.version)?;
        Ok(project)
    }

    pub fn to_json_string(&self) -> EngineResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| EngineError::Serialization { reason: e.to_string() })
    }

    pub fn load(path: impl AsRef<Path>) -> EngineResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| EngineError::file_error("read", path.display().to_string(), e.to_string()))?;
        let project = Self::from_json_str(&text).map_err(|e| match e {
            EngineError::Serialization { reason } => EngineError::Serialization {
                reason: format!("invalid project file {}: {}", path.display(), reason),
            },
            other => other,
        })?;
        debug!(path = %path.display(), job = %project.meta.job_id, "project loaded");
        Ok(project)
    }

    /// Write the project through a temporary file and rename it into place.
    pub fn save(&self, path: impl AsRef<Path>) -> EngineResult<()> {
        let path = path.as_ref();
        let json = self.to_json_string()?;
        let tmp_path = path.with_extension("json.tmp");

        let mut tmp = File::create(&tmp_path)
            .map_err(|e| EngineError::file_error("create temp file", tmp_path.display().to_string(), e.to_string()))?;
        tmp.write_all(json.as_bytes())
            .map_err(|e| EngineError::file_error("write temp file", tmp_path.display().to_string(), e.to_string()))?;
        tmp.sync_all()
            .map_err(|e| EngineError::file_error("sync temp file", tmp_path.display().to_string(), e.to_string()))?;

        fs::rename(&tmp_path, path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            EngineError::file_error("rename to final", path.display().to_string(), e.to_string())
        })?;
        Ok(())
    }

    /// Build the timeline and every collaborator, and hand them to a new
    /// [`GirderAnalysis`].
    pub fn build(&self) -> EngineResult<GirderAnalysis> {
        let timeline = Arc::new(
            TimelineBuilder::new(self.timeline.final_day)
                .with_time_step(self.timeline.time_step)
                .events(self.timeline.events.iter().cloned())
                .build()?,
        );
        let materials = Arc::new(self.materials.assemble(timeline.clone())?);
        let geometry = Arc::new(BridgeGeometry::new(self.segments.clone())?);
        let sections = Arc::new(TransformedSectionProvider::new(
            timeline.clone(),
            materials.clone(),
            geometry.clone(),
        ));
        let forces = Arc::new(ProductForceTable::new(
            &timeline,
            &self.pois,
            &self.product_forces,
            &self.live_load,
        )?);

        let mut analysis = GirderAnalysis::new(
            timeline,
            materials,
            sections,
            forces,
            geometry,
            self.pois.clone(),
            self.criteria.clone(),
        )?;
        for entry in &self.segment_checks {
            analysis = analysis.with_segment_checks(entry.segment, entry.checks);
        }
        for vn in &self.nominal_shear {
            if !vn.vn_kip.is_finite() || vn.vn_kip < 0.0 {
                return Err(EngineError::invalid_input(
                    format!("nominal_shear[{}]", vn.poi),
                    vn.vn_kip.to_string(),
                    "must be finite and non-negative",
                ));
            }
            analysis = analysis.with_nominal_shear(vn.poi, vn.vn_kip);
        }
        for effects in &self.time_dependent_effects {
            analysis = analysis.with_time_dependent_effects(*effects)?;
        }
        for vehicle in &self.vehicles {
            analysis = analysis.with_vehicle(vehicle.clone())?;
        }
        info!(
            job = %self.meta.job_id,
            bridge = %self.meta.bridge,
            segments = self.segments.len(),
            vehicles = self.vehicles.len(),
            "project assembled"
        );
        Ok(analysis)
    }
}

/// Files are readable when their major schema version matches.
fn validate_version(file_version: &str) -> EngineResult<()> {
    let major = |v: &str| v.split('.').next().and_then(|p| p.parse::<u32>().ok());
    match (major(file_version), major(SCHEMA_VERSION)) {
        (Some(file), Some(current)) if file == current => Ok(()),
        _ => Err(EngineError::configuration(
            "meta.version",
            format!("file version {} is not compatible with {}", file_version, SCHEMA_VERSION),
        )),
    }
}
