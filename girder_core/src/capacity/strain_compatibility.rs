//! # Strain Compatibility Solver
//!
//! Plane sections remain plane. Depths are measured down from the
//! compression face, so the same solver handles positive moment (deck on
//! top) and negative moment (section mirrored, girder bottom on top).
//!
//! ```text
//! concrete strain  εc(d) = κ·(c − d)            compression positive
//! steel strain     εs(d) = εpe + κ·(d − c)      tension positive
//! ```
//!
//! A [`StrainLimit`] fixes the strain at one fiber, which ties the curvature
//! κ to the neutral axis depth `c`. The solver bisects on `c` until the net
//! axial force `C − T` is within the force tolerance.
//!
//! Concrete is integrated in horizontal slices, split at the neutral axis.
//! When requested, conventional concrete uses the rectangular stress block
//! α1·f'c over β1·c instead.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::stress_strain::{ConcreteLaw, SteelLaw};
use crate::criteria::SolverSettings;
use crate::errors::{AnalysisLocation, EngineError, EngineResult};
use crate::materials::ConcreteRole;
use crate::section::LayerKind;

const SLICES_PER_PART: usize = 20;

/// Rectangle of concrete in compression-face coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConcreteBlock {
    pub role: ConcreteRole,
    /// Depth of the block's top below the compression face
    pub top_in: f64,
    pub height_in: f64,
    pub width_in: f64,
    pub law: ConcreteLaw,
    /// Stress block intensity α1
    pub alpha1: f64,
    /// Stress block depth factor β1
    pub beta1: f64,
}

impl ConcreteBlock {
    pub fn bottom_in(&self) -> f64 {
        self.top_in + self.height_in
    }
}

/// One layer of bonded steel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SteelLayer {
    pub kind: LayerKind,
    pub depth_in: f64,
    pub area_in2: f64,
    pub law: SteelLaw,
    /// Strain locked in by the effective prestress, fpe/Ep
    pub prestrain: f64,
    /// Effective prestress (ksi)
    pub fpe_ksi: f64,
    /// Upper bound on the tensile stress from incomplete development
    pub stress_cap_ksi: Option<f64>,
}

/// Section ready for strain compatibility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlexuralSection {
    pub concrete: Vec<ConcreteBlock>,
    pub steel: Vec<SteelLayer>,
}

impl FlexuralSection {
    pub fn height_in(&self) -> f64 {
        self.concrete.iter().map(ConcreteBlock::bottom_in).fold(0.0, f64::max)
    }

    /// The concrete at the compression face.
    pub fn face_block(&self) -> Option<&ConcreteBlock> {
        self.concrete.iter().min_by(|a, b| a.top_in.total_cmp(&b.top_in))
    }

    pub fn has_uhpc(&self) -> bool {
        self.concrete.iter().any(|b| b.law.is_uhpc())
    }
}

/// Which strain a limit fixes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum LimitKind {
    ConcreteCompression { strain: f64 },
    ConcreteTension { strain: f64 },
    /// Total strain in a steel layer
    SteelTension { strain: f64, prestrain: f64 },
}

/// A fiber strain that defines one candidate state at capacity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrainLimit {
    pub depth_in: f64,
    pub kind: LimitKind,
}

impl StrainLimit {
    /// Curvature that puts the limit strain at the limit fiber for neutral
    /// axis depth `c`.
    fn curvature(&self, c: f64) -> f64 {
        match self.kind {
            LimitKind::ConcreteCompression { strain } => strain / (c - self.depth_in),
            LimitKind::ConcreteTension { strain } => strain / (self.depth_in - c),
            LimitKind::SteelTension { strain, prestrain } => (strain - prestrain) / (self.depth_in - c),
        }
    }

    /// Range of `c` in which the limit can be reached with the face strain
    /// at most `face_crushing_strain`.
    fn bracket(&self, height: f64, face_crushing_strain: f64) -> Option<(f64, f64)> {
        let eps = 1e-6 * height.max(1.0);
        match self.kind {
            LimitKind::ConcreteCompression { .. } => Some((self.depth_in + eps, 10.0 * height.max(self.depth_in + eps))),
            LimitKind::ConcreteTension { strain } => tension_bracket(self.depth_in, strain, face_crushing_strain, eps),
            LimitKind::SteelTension { strain, prestrain } => {
                if strain <= prestrain {
                    return None;
                }
                tension_bracket(self.depth_in, strain - prestrain, face_crushing_strain, eps)
            }
        }
    }
}

/// Beyond `c = εcu·d/(ε + εcu)` the face would crush first.
fn tension_bracket(depth: f64, strain: f64, face_crushing_strain: f64, eps: f64) -> Option<(f64, f64)> {
    let hi = face_crushing_strain * depth / (strain + face_crushing_strain);
    (hi > eps).then_some((eps, hi))
}

/// Stress state of one steel layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayerState {
    pub kind: LayerKind,
    pub depth_in: f64,
    pub area_in2: f64,
    /// Total strain including prestrain
    pub strain: f64,
    pub stress_ksi: f64,
    /// Tension positive
    pub force_kip: f64,
    /// The development cap limited the stress
    pub capped: bool,
}

/// Equilibrium state of a section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionState {
    pub c_in: f64,
    pub curvature_per_in: f64,
    pub rectangular_block: bool,
    pub compression_kip: f64,
    pub tension_kip: f64,
    /// Depth of the compression resultant
    pub compression_depth_in: f64,
    pub moment_kip_in: f64,
    pub layers: Vec<LayerState>,
    pub iterations: usize,
}

impl SectionState {
    /// `C − T`; zero at equilibrium.
    pub fn net_force_kip(&self) -> f64 {
        self.compression_kip - self.tension_kip
    }

    /// Strain at the compression face.
    pub fn face_strain(&self) -> f64 {
        self.curvature_per_in * self.c_in
    }
}

/// Forces in the section for neutral axis `c` and curvature `kappa`.
pub fn evaluate(section: &FlexuralSection, c: f64, kappa: f64, rectangular_block: bool) -> SectionState {
    let mut compression = 0.0;
    let mut tension = 0.0;
    let mut compression_moment = 0.0;
    let mut moment = 0.0;

    let mut add = |force: f64, depth: f64| {
        // force is compression positive
        if force >= 0.0 {
            compression += force;
            compression_moment += force * depth;
        } else {
            tension -= force;
        }
        moment -= force * depth;
    };

    for block in &section.concrete {
        match block.law {
            ConcreteLaw::Conventional { fc_ksi, .. } if rectangular_block => {
                let a = block.beta1 * c;
                let bottom = block.bottom_in().min(a);
                if bottom > block.top_in {
                    let h = bottom - block.top_in;
                    add(block.alpha1 * fc_ksi * block.width_in * h, block.top_in + 0.5 * h);
                }
            }
            _ => {
                let split = c.clamp(block.top_in, block.bottom_in());
                for (from, to) in [(block.top_in, split), (split, block.bottom_in())] {
                    if to <= from {
                        continue;
                    }
                    let dy = (to - from) / SLICES_PER_PART as f64;
                    for i in 0..SLICES_PER_PART {
                        let d = from + (i as f64 + 0.5) * dy;
                        let stress = block.law.stress(kappa * (c - d));
                        add(stress * block.width_in * dy, d);
                    }
                }
            }
        }
    }

    let mut layers = Vec::with_capacity(section.steel.len());
    for layer in &section.steel {
        let strain = layer.prestrain + kappa * (layer.depth_in - c);
        let raw = layer.law.stress(strain);
        let (stress, capped) = match layer.stress_cap_ksi {
            Some(cap) if raw > cap => (cap, true),
            _ => (raw, false),
        };
        let force = stress * layer.area_in2;
        add(-force, layer.depth_in);
        layers.push(LayerState {
            kind: layer.kind,
            depth_in: layer.depth_in,
            area_in2: layer.area_in2,
            strain,
            stress_ksi: stress,
            force_kip: force,
            capped,
        });
    }

    SectionState {
        c_in: c,
        curvature_per_in: kappa,
        rectangular_block,
        compression_kip: compression,
        tension_kip: tension,
        compression_depth_in: if compression > 0.0 { compression_moment / compression } else { 0.0 },
        moment_kip_in: moment,
        layers,
        iterations: 0,
    }
}

/// Find the equilibrium state in which `limit` is just reached.
///
/// Returns `Ok(None)` when no neutral axis inside the admissible range
/// balances the section, meaning another limit is reached first.
pub fn solve(
    section: &FlexuralSection,
    limit: &StrainLimit,
    rectangular_block: bool,
    settings: &SolverSettings,
    location: AnalysisLocation,
) -> EngineResult<Option<SectionState>> {
    let height = section.height_in();
    if height <= 0.0 {
        return Err(EngineError::degenerate("strain compatibility", location, "section has no concrete"));
    }
    let face_crushing = section.face_block().map(|b| b.law.crushing_strain()).unwrap_or(0.003);
    let Some((mut lo, mut hi)) = limit.bracket(height, face_crushing) else {
        return Ok(None);
    };
    let at = |c: f64| evaluate(section, c, limit.curvature(c), rectangular_block);

    let low = at(lo);
    let high = at(hi);
    if low.net_force_kip() > 0.0 || high.net_force_kip() < 0.0 {
        return Ok(None);
    }

    let mut residual = f64::INFINITY;
    for iteration in 1..=settings.max_iterations {
        let c = 0.5 * (lo + hi);
        let mut state = at(c);
        let net = state.net_force_kip();
        residual = net.abs();
        if residual <= settings.force_tolerance_kip {
            state.iterations = iteration;
            debug!(c_in = c, iterations = iteration, "neutral axis converged");
            return Ok(Some(state));
        }
        if net < 0.0 {
            lo = c;
        } else {
            hi = c;
        }
    }
    Err(EngineError::non_convergence(
        "strain compatibility neutral axis search",
        location,
        settings.max_iterations,
        residual,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::materials::{RebarMaterial, StrandMaterial};
    use crate::section::StrandGroup;
    use proptest::prelude::*;

    fn slab(width: f64, height: f64, fc: f64) -> ConcreteBlock {
        ConcreteBlock {
            role: ConcreteRole::Segment,
            top_in: 0.0,
            height_in: height,
            width_in: width,
            law: ConcreteLaw::Conventional {
                fc_ksi: fc,
                ec_ksi: 57.0 * (fc * 1000.0).sqrt(),
            },
            alpha1: 0.85,
            beta1: 0.85,
        }
    }

    fn bars(area: f64, depth: f64) -> SteelLayer {
        SteelLayer {
            kind: LayerKind::Rebar { in_deck: false },
            depth_in: depth,
            area_in2: area,
            law: SteelLaw::Rebar(RebarMaterial::default()),
            prestrain: 0.0,
            fpe_ksi: 0.0,
            stress_cap_ksi: None,
        }
    }

    fn crushing() -> StrainLimit {
        StrainLimit {
            depth_in: 0.0,
            kind: LimitKind::ConcreteCompression { strain: 0.003 },
        }
    }

    fn settings() -> SolverSettings {
        SolverSettings::default()
    }

    #[test]
    fn test_rectangular_beam_matches_hand_calculation() {
        // 12 x 24 beam, 3 in² grade 60 at d = 21.5 in, f'c = 4 ksi
        let section = FlexuralSection {
            concrete: vec![slab(12.0, 24.0, 4.0)],
            steel: vec![bars(3.0, 21.5)],
        };
        let state = solve(&section, &crushing(), true, &settings(), AnalysisLocation::unknown())
            .unwrap()
            .unwrap();
        let a = 3.0 * 60.0 / (0.85 * 4.0 * 12.0);
        let mn = 3.0 * 60.0 * (21.5 - a / 2.0);
        assert!((state.c_in - a / 0.85).abs() < 1e-3);
        assert!((state.moment_kip_in - mn).abs() / mn < 1e-4);
        assert!(state.layers[0].stress_ksi == 60.0);
        assert!((state.face_strain() - 0.003).abs() < 1e-12);
    }

    #[test]
    fn test_parabolic_close_to_block() {
        let section = FlexuralSection {
            concrete: vec![slab(12.0, 24.0, 4.0)],
            steel: vec![bars(3.0, 21.5)],
        };
        let block = solve(&section, &crushing(), true, &settings(), AnalysisLocation::unknown())
            .unwrap()
            .unwrap();
        let fibers = solve(&section, &crushing(), false, &settings(), AnalysisLocation::unknown())
            .unwrap()
            .unwrap();
        assert!(!fibers.rectangular_block);
        assert!((block.moment_kip_in - fibers.moment_kip_in).abs() / block.moment_kip_in < 0.02);
    }

    #[test]
    fn test_prestrain_raises_strand_stress() {
        let strand = StrandMaterial::grade_270(0.5);
        let layer = SteelLayer {
            kind: LayerKind::Strand {
                group: StrandGroup::Straight,
            },
            depth_in: 50.0,
            area_in2: 3.06,
            law: SteelLaw::Strand(strand),
            prestrain: 160.0 / strand.ep_ksi,
            fpe_ksi: 160.0,
            stress_cap_ksi: None,
        };
        let section = FlexuralSection {
            concrete: vec![slab(48.0, 54.0, 8.0)],
            steel: vec![layer],
        };
        let state = solve(&section, &crushing(), false, &settings(), AnalysisLocation::unknown())
            .unwrap()
            .unwrap();
        assert!(state.layers[0].stress_ksi > 250.0);
        assert!(state.layers[0].stress_ksi <= 270.0);
    }

    #[test]
    fn test_cap_limits_steel_stress() {
        let mut layer = bars(3.0, 21.5);
        layer.stress_cap_ksi = Some(30.0);
        let section = FlexuralSection {
            concrete: vec![slab(12.0, 24.0, 4.0)],
            steel: vec![layer],
        };
        let state = solve(&section, &crushing(), true, &settings(), AnalysisLocation::unknown())
            .unwrap()
            .unwrap();
        assert!(state.layers[0].capped);
        assert_eq!(state.layers[0].stress_ksi, 30.0);
    }

    #[test]
    fn test_unreachable_tension_limit() {
        // heavily reinforced: the face crushes before the bars reach 9 %
        let section = FlexuralSection {
            concrete: vec![slab(12.0, 24.0, 4.0)],
            steel: vec![bars(12.0, 21.5)],
        };
        let limit = StrainLimit {
            depth_in: 21.5,
            kind: LimitKind::SteelTension {
                strain: 0.09,
                prestrain: 0.0,
            },
        };
        let state = solve(&section, &limit, false, &settings(), AnalysisLocation::unknown()).unwrap();
        assert!(state.is_none());
    }

    #[test]
    fn test_iteration_bound_is_reported() {
        let section = FlexuralSection {
            concrete: vec![slab(12.0, 24.0, 4.0)],
            steel: vec![bars(3.0, 21.5)],
        };
        let tight = SolverSettings {
            max_iterations: 3,
            force_tolerance_kip: 1e-12,
        };
        let result = solve(&section, &crushing(), true, &tight, AnalysisLocation::unknown());
        assert!(matches!(result, Err(EngineError::NonConvergence { iterations: 3, .. })));
    }

    proptest! {
        #[test]
        fn test_force_balance(area in 0.5f64..8.0, depth in 12.0f64..22.0, fc in 3.0f64..10.0, block in any::<bool>()) {
            let section = FlexuralSection {
                concrete: vec![slab(12.0, 24.0, fc)],
                steel: vec![bars(area, depth)],
            };
            let settings = settings();
            let state = solve(&section, &crushing(), block, &settings, AnalysisLocation::unknown()).unwrap().unwrap();
            prop_assert!(state.net_force_kip().abs() <= settings.force_tolerance_kip);
            prop_assert!(state.moment_kip_in > 0.0);
        }
    }
}
