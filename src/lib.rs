#![deny(missing_docs)]

//! isofrac - Equilibrium Isotope Fractionation from Gaussian Frequency Logs
//!
//! isofrac computes the reduced partition function ratio (RPFR, reported as
//! 1000·ln β) between a light and a heavy isotopologue of the same molecule
//! from two Gaussian frequency-calculation log files.
//!
//! # Overview
//!
//! For each isotopologue the harmonic vibrational frequencies are extracted,
//! checked against the atom count (3N-5 for linear, 3N-6 for non-linear
//! molecules) and fed into the harmonic partition function
//!
//! ```text
//! 1000·ln β = 1000 · ( Σ ln(ν_heavy / ν_light) + ln Q_heavy - ln Q_light )
//! ```
//!
//! A second RPFR is computed over the subset of modes in which the
//! substituted atom actually moves, located through the normal-mode
//! displacement tables Gaussian prints under each block of frequencies.
//!
//! Alongside the numbers, the optimization quality of each log is
//! inspected: the last fully converged item table, and the residual low
//! frequencies against a ±30 cm⁻¹ threshold. Those findings are advisory.
//!
//! # Quick Start
//!
//! ```no_run
//! use isofrac::analysis::{analyze_pair, AnalysisOptions};
//! use isofrac::isotope::PeriodicTable;
//! use isofrac::parser::LogFile;
//! use isofrac::validation::MoleculeShape;
//! use std::path::Path;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let light = LogFile::read(Path::new("zncl4_64.log"))?;
//!     let heavy = LogFile::read(Path::new("zncl4_66.log"))?;
//!
//!     let report = analyze_pair(
//!         &light,
//!         &heavy,
//!         MoleculeShape::NonLinear,
//!         &AnalysisOptions::default(),
//!         &PeriodicTable,
//!     )?;
//!     println!("1000 ln(beta) = {}", report.primary.beta);
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! - [`parser`]: field extraction from log text
//! - [`validation`]: frequency count and temperature checks
//! - [`convergence`]: optimization tables and low frequencies
//! - [`isotope`]: element table and per-mode displacement of the substituted atom
//! - [`partition`]: partition functions and the RPFR
//! - [`analysis`]: light/heavy comparison producing a [`analysis::FractionationReport`]
//! - [`report`]: text and JSON output
//! - [`settings`]: `isofrac_config.cfg` handling
//!
//! # References
//!
//! - Bigeleisen, J. and Mayer, M.G. (1947), J. Chem. Phys. 15, 261-267
//! - Urey, H.C. (1947), J. Chem. Soc., 562-581
//! - Blanchard, M., Balan, E. and Schauble, E.A. (2017), Rev. Mineral.
//!   Geochem. 82, 27-63

pub mod analysis;
pub mod convergence;
pub mod isotope;
pub mod parser;
pub mod partition;
pub mod report;
pub mod settings;
pub mod validation;

pub use analysis::{analyze_pair, AnalysisOptions, FractionationReport};
pub use parser::LogFile;
pub use partition::{PartitionFunctionEngine, RpfrResult};
pub use validation::MoleculeShape;
