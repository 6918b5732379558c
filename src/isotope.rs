//! Per-mode motion of the substituted atom.
//!
//! Gaussian prints the normal-mode displacements in blocks of up to three
//! modes, directly under the `Frequencies --` row of each block:
//!
//! ```text
//!   Atom  AN      X      Y      Z        X      Y      Z        X      Y      Z
//!      1  30     0.00   0.00   0.00     0.00   0.00   0.00     0.31   0.00   0.00
//!      2  17     0.34   0.19   0.35    -0.19   0.34   0.00    -0.44   0.00   0.00
//! ```
//!
//! For the atom with the requested atomic number each `(X, Y, Z)` triple is
//! summed and rounded to three decimals, giving one value per vibrational
//! frequency. A non-zero value marks the mode as "isotope-active"; those modes
//! feed the secondary RPFR calculation.

use crate::parser::{Field, ParseError};
use lazy_static::lazy_static;
use log::debug;
use nalgebra::Vector3;
use regex::Regex;
use std::collections::HashMap;
use thiserror::Error;

/// Error type for the coordinate aggregation path.
#[derive(Error, Debug)]
pub enum IsotopeError {
    /// Element symbol missing from the atomic number table
    #[error("element '{0}' is not in the atomic number table; add it under [elements] in isofrac_config.cfg")]
    UnknownElement(String),
    /// Coordinate sums and frequencies have different lengths
    #[error("coordinate block yields {coordinates} modes but {frequencies} frequencies were extracted")]
    StructuralMismatch {
        /// Number of aggregated displacement values
        coordinates: usize,
        /// Number of extracted frequencies
        frequencies: usize,
    },
    /// Extraction failure
    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// Type alias for isotope operation results
pub type Result<T> = std::result::Result<T, IsotopeError>;

/// Element symbols indexed by atomic number minus one.
const ELEMENT_SYMBOLS: [&str; 118] = [
    "H", "He", "Li", "Be", "B", "C", "N", "O", "F", "Ne", "Na", "Mg", "Al", "Si", "P", "S", "Cl",
    "Ar", "K", "Ca", "Sc", "Ti", "V", "Cr", "Mn", "Fe", "Co", "Ni", "Cu", "Zn", "Ga", "Ge", "As",
    "Se", "Br", "Kr", "Rb", "Sr", "Y", "Zr", "Nb", "Mo", "Tc", "Ru", "Rh", "Pd", "Ag", "Cd", "In",
    "Sn", "Sb", "Te", "I", "Xe", "Cs", "Ba", "La", "Ce", "Pr", "Nd", "Pm", "Sm", "Eu", "Gd", "Tb",
    "Dy", "Ho", "Er", "Tm", "Yb", "Lu", "Hf", "Ta", "W", "Re", "Os", "Ir", "Pt", "Au", "Hg", "Tl",
    "Pb", "Bi", "Po", "At", "Rn", "Fr", "Ra", "Ac", "Th", "Pa", "U", "Np", "Pu", "Am", "Cm", "Bk",
    "Cf", "Es", "Fm", "Md", "No", "Lr", "Rf", "Db", "Sg", "Bh", "Hs", "Mt", "Ds", "Rg", "Cn", "Nh",
    "Fl", "Mc", "Lv", "Ts", "Og",
];

/// Symbol to atomic number lookup.
///
/// The aggregation only needs an atomic number; where it comes from is up
/// to the implementation.
pub trait ElementTable {
    /// Returns the atomic number for `symbol`, or `None` if unknown.
    fn atomic_number(&self, symbol: &str) -> Option<u32>;
}

/// The periodic table, H through Og.
#[derive(Debug, Clone, Copy, Default)]
pub struct PeriodicTable;

impl ElementTable for PeriodicTable {
    fn atomic_number(&self, symbol: &str) -> Option<u32> {
        let symbol = symbol.trim();
        ELEMENT_SYMBOLS
            .iter()
            .position(|s| *s == symbol)
            .or_else(|| {
                ELEMENT_SYMBOLS
                    .iter()
                    .position(|s| s.eq_ignore_ascii_case(symbol))
            })
            .map(|i| i as u32 + 1)
    }
}

/// User-supplied entries layered over another table.
#[derive(Debug, Clone, Default)]
pub struct ExtendedElementTable<T: ElementTable = PeriodicTable> {
    entries: HashMap<String, u32>,
    base: T,
}

impl ExtendedElementTable<PeriodicTable> {
    /// Extends the periodic table with `entries` (symbol → atomic number).
    pub fn new(entries: HashMap<String, u32>) -> Self {
        Self::with_base(entries, PeriodicTable)
    }
}

impl<T: ElementTable> ExtendedElementTable<T> {
    /// Extends `base` with `entries`; entries take precedence.
    pub fn with_base(entries: HashMap<String, u32>, base: T) -> Self {
        Self { entries, base }
    }
}

impl<T: ElementTable> ElementTable for ExtendedElementTable<T> {
    fn atomic_number(&self, symbol: &str) -> Option<u32> {
        self.entries
            .get(symbol.trim())
            .copied()
            .or_else(|| self.base.atomic_number(symbol))
    }
}

/// Looks up `symbol` in `table`.
///
/// # Errors
///
/// [`IsotopeError::UnknownElement`] if the table has no entry.
pub fn atomic_number(table: &dyn ElementTable, symbol: &str) -> Result<u32> {
    table
        .atomic_number(symbol)
        .ok_or_else(|| IsotopeError::UnknownElement(symbol.to_string()))
}

lazy_static! {
    // "     1  30     0.00   0.00   0.00     0.00   0.00   0.00     0.31   0.00   0.00"
    static ref ATOM_ROW_RE: Regex =
        Regex::new(r"^\s*\d+\s+(\d+)((?:\s+-?\d+\.\d+)+)\s*$").unwrap();
}

fn is_block_header(line: &str) -> bool {
    line.split_whitespace().last() == Some("Z")
}

/// Displacement of one atom in one normal mode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModeDisplacement {
    /// Cartesian displacement (x, y, z) as printed
    pub vector: Vector3<f64>,
}

impl ModeDisplacement {
    /// Sum of the three components, rounded to three decimals.
    pub fn component_sum(&self) -> f64 {
        round3(self.vector.sum())
    }

    /// Euclidean length of the displacement.
    pub fn magnitude(&self) -> f64 {
        self.vector.norm()
    }
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Returns whether `text` contains at least one normal-mode coordinate block.
pub fn has_coordinate_block(text: &str) -> bool {
    let mut after_header = false;
    for line in text.lines() {
        if after_header && ATOM_ROW_RE.is_match(line) {
            return true;
        }
        after_header = is_block_header(line);
    }
    false
}

/// Collects the displacements of every atom with `atomic_number`, block by
/// block, in the order the modes appear in the file.
pub fn extract_mode_displacements(text: &str, atomic_number: u32) -> Vec<ModeDisplacement> {
    let mut displacements = Vec::new();
    let mut in_block = false;
    let mut blocks = 0;
    for line in text.lines() {
        if is_block_header(line) {
            in_block = true;
            blocks += 1;
            continue;
        }
        if !in_block {
            continue;
        }
        let Some(caps) = ATOM_ROW_RE.captures(line) else {
            in_block = false;
            continue;
        };
        if caps[1].parse::<u32>().ok() != Some(atomic_number) {
            continue;
        }
        let values: Vec<f64> = caps[2]
            .split_whitespace()
            .filter_map(|token| token.parse().ok())
            .collect();
        displacements.extend(values.chunks_exact(3).map(|xyz| ModeDisplacement {
            vector: Vector3::new(xyz[0], xyz[1], xyz[2]),
        }));
    }
    debug!(
        "Found {} displacement triples for Z={} in {} candidate blocks",
        displacements.len(),
        atomic_number,
        blocks
    );
    displacements
}

/// Sums and rounds the displacement of the atom with `atomic_number` for
/// every mode.
///
/// # Errors
///
/// [`ParseError::NotFound`] (wrapped) when the text contains no coordinate block.
pub fn aggregate_displacement(text: &str, atomic_number: u32) -> Result<Vec<f64>> {
    if !has_coordinate_block(text) {
        return Err(ParseError::NotFound(Field::CoordinateBlock).into());
    }
    Ok(extract_mode_displacements(text, atomic_number)
        .iter()
        .map(ModeDisplacement::component_sum)
        .collect())
}

/// Checks that there is exactly one coordinate sum per frequency.
pub fn check_alignment(sums: &[f64], frequencies: &[f64]) -> Result<()> {
    if sums.len() != frequencies.len() {
        return Err(IsotopeError::StructuralMismatch {
            coordinates: sums.len(),
            frequencies: frequencies.len(),
        });
    }
    Ok(())
}

/// Indices of the modes in which the atom moves.
pub fn active_indices(sums: &[f64]) -> Vec<usize> {
    sums.iter()
        .enumerate()
        .filter(|(_, sum)| **sum != 0.0)
        .map(|(i, _)| i)
        .collect()
}

/// Frequencies of the isotope-active modes, in their original order.
pub fn select_active(frequencies: &[f64], sums: &[f64]) -> Result<Vec<f64>> {
    check_alignment(sums, frequencies)?;
    Ok(active_indices(sums)
        .into_iter()
        .map(|i| frequencies[i])
        .collect())
}
