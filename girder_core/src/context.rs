//! Collaborators shared by the per-POI engines.

use crate::criteria::{AnalysisCriteria, EditionPolicy};
use crate::forces::ProductForces;
use crate::materials::MaterialModel;
use crate::section::{SectionPropertyProvider, SegmentModel};
use crate::timeline::IntervalTimeline;

/// Everything an engine reads while analysing one segment.
///
/// The context only borrows; callers own the collaborators (usually behind
/// `Arc` in [`crate::engine::GirderAnalysis`]).
#[derive(Clone, Copy)]
pub struct AnalysisContext<'a> {
    pub timeline: &'a IntervalTimeline,
    pub materials: &'a dyn MaterialModel,
    pub sections: &'a dyn SectionPropertyProvider,
    pub forces: &'a dyn ProductForces,
    pub segment: &'a SegmentModel,
    pub criteria: &'a AnalysisCriteria,
}

impl AnalysisContext<'_> {
    pub fn policy(&self) -> EditionPolicy {
        self.criteria.edition_policy()
    }
}
