//! # girder_core - Time-Step Analysis of Prestressed Girders
//!
//! `girder_core` follows a precast, pretensioned or post-tensioned concrete
//! girder through its construction sequence and service life. The sequence is
//! broken into analysis intervals; section properties, prestress losses,
//! moment capacity, interface shear, camber and load ratings are evaluated per
//! (interval, point of interest).
//!
//! ## Design Philosophy
//!
//! - **Interval recurrence**: interval *n* depends only on the cumulative
//!   state at *n − 1* plus loads applied in *n*
//! - **JSON-First**: inputs and results implement Serialize/Deserialize
//! - **Rich Errors**: every numerical failure names its segment, POI and interval
//! - **Collaborators behind traits**: materials, section properties and
//!   product forces are supplied through [`materials::MaterialModel`],
//!   [`section::SectionPropertyProvider`] and [`forces::ProductForces`]
//!
//! ## Units
//!
//! kip, inch, ksi and day throughout. Heights are measured up from the bottom
//! of the girder, sagging moment and upward deflection are positive.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use girder_core::BridgeProject;
//!
//! let project = BridgeProject::load("bridge.json")?;
//! let analysis = project.build()?;
//! let report = analysis.run(None)?;
//! println!("{} POIs analysed", report.pois.len());
//! # Ok::<(), girder_core::EngineError>(())
//! ```
//!
//! ## Modules
//!
//! - [`timeline`] - Construction events expanded into analysis intervals
//! - [`materials`] - Concrete aging, strand and rebar models
//! - [`section`] - Gross and transformed section properties per interval
//! - [`losses`] - Elastic shortening, time-dependent and post-tensioning losses
//! - [`capacity`] - Strain-compatibility moment capacity and cracking moment
//! - [`interface_shear`] - Horizontal shear across the girder/deck interface
//! - [`camber`] - Deflection history, screed and excess camber
//! - [`rating`] - Load rating factors and posting loads
//! - [`engine`] - The [`GirderAnalysis`] façade
//! - [`project`] - Serializable project files
//! - [`criteria`] - Specification edition and method selectors
//! - [`errors`] - Structured error types

pub mod camber;
pub mod capacity;
pub mod context;
pub mod criteria;
pub mod diagnostics;
pub mod engine;
pub mod errors;
pub mod forces;
pub mod interface_shear;
pub mod keys;
pub mod losses;
pub mod materials;
pub mod poi;
pub mod project;
pub mod rating;
pub mod section;
pub mod timeline;
pub mod units;

#[cfg(test)]
mod fixtures;

// Re-export commonly used types at crate root for convenience
pub use criteria::AnalysisCriteria;
pub use engine::{AnalysisReport, GirderAnalysis};
pub use errors::{EngineError, EngineResult};
pub use project::BridgeProject;
