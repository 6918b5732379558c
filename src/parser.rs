//! Field extraction from Gaussian frequency log files.
//!
//! Gaussian logs are loosely formatted, human-readable text. This module
//! provides a small set of named extractors, each keyed on one textual
//! trigger and each returning either a typed value or
//! [`ParseError::NotFound`]:
//!
//! | Field | Trigger | Policy |
//! |-------|---------|--------|
//! | [`Field::AtomCount`] | `NAtoms=    5` | last match wins |
//! | [`Field::Temperature`] | `Temperature   298.150` or `Temperature=298.15` | last match wins |
//! | [`Field::IsotopeLabel`] | `Zn(Iso=66)` | last match wins |
//! | [`Field::Frequencies`] | ` Frequencies --  78.5452  78.5452  126.6746` | every row, concatenated |
//! | [`Field::LowFrequencies`] | ` Low frequencies ---  -1.93  -0.01  0.00` | every row, concatenated |
//!
//! Convergence tables and normal-mode coordinate blocks are multi-line
//! structures and live in [`crate::convergence`] and [`crate::isotope`];
//! [`has_pattern`] still checks for them so callers can decide up front
//! whether to attempt an extraction.
//!
//! # Examples
//!
//! ```
//! use isofrac::parser::{self, Field, LogFile};
//!
//! let text = "\
//!  NAtoms=      3 NQM=        3
//!  Frequencies --   1595.1234   3657.0101
//!  Frequencies --   3756.2222
//!  Temperature   298.150 Kelvin.  Pressure   1.00000 Atm.
//! ";
//! let log = LogFile::from_text("water.log", text);
//!
//! assert_eq!(log.atom_count().unwrap(), 3);
//! assert_eq!(log.frequencies().unwrap().len(), 3);
//! assert_eq!(log.temperature().unwrap(), 298.15);
//! assert!(!parser::has_pattern(log.content(), Field::IsotopeLabel));
//! ```

use lazy_static::lazy_static;
use log::debug;
use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Error type for field extraction.
#[derive(Error, Debug)]
pub enum ParseError {
    /// The log file could not be read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// The requested field does not occur in the text
    #[error("{0} not found")]
    NotFound(Field),
    /// The field occurs but a token could not be converted
    #[error("invalid {field} value '{token}'")]
    InvalidValue {
        /// Field being extracted
        field: Field,
        /// Offending token
        token: String,
    },
}

/// Type alias for extraction results
pub type Result<T> = std::result::Result<T, ParseError>;

/// Selector for the structured fields the extractors know about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Field {
    /// `NAtoms=` declaration
    AtomCount,
    /// Thermochemistry temperature in Kelvin
    Temperature,
    /// `<Element>(Iso=<N>)` annotation
    IsotopeLabel,
    /// Harmonic `Frequencies --` rows
    Frequencies,
    /// `Low frequencies ---` rows
    LowFrequencies,
    /// Optimization `Converged?` table with four YES markers
    ConvergenceTable,
    /// Normal-mode displacement table (`Atom  AN  X  Y  Z`)
    CoordinateBlock,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Field::AtomCount => "atom count",
            Field::Temperature => "temperature",
            Field::IsotopeLabel => "isotope label",
            Field::Frequencies => "frequencies",
            Field::LowFrequencies => "low frequencies",
            Field::ConvergenceTable => "convergence table",
            Field::CoordinateBlock => "normal-mode coordinate block",
        };
        f.write_str(name)
    }
}

/// Element symbol and mass number of the substituted atom.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IsotopeLabel {
    /// Element symbol as written in the log (e.g. `Zn`)
    pub element: String,
    /// Isotope mass number (e.g. `66`)
    pub mass_number: u32,
}

impl fmt::Display for IsotopeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.mass_number, self.element)
    }
}

lazy_static! {
    // " NAtoms=      5 NQM=        5 NQMF=       0"
    static ref NATOMS_RE: Regex = Regex::new(r"NAtoms=\s*(\d+)").unwrap();

    // " Temperature   298.150 Kelvin." / "Temperature=298.15"
    static ref TEMPERATURE_RE: Regex =
        Regex::new(r"Temperature(?:\s|=)*(\d+(?:\.\d*)?)").unwrap();

    // " Zn(Iso=66)   0   0.000000   0.000000   0.000000"
    static ref ISOTOPE_RE: Regex = Regex::new(r"([A-Za-z]+)\(Iso=(\d+)\)").unwrap();

    // " Frequencies --     78.5452                78.5452               126.6746"
    static ref FREQUENCIES_RE: Regex =
        Regex::new(r"(?m)^[ \t]*Frequencies[ \t]+--[ \t](.*)$").unwrap();

    // " Low frequencies ---   -1.9329   -0.0010   -0.0007    0.0007    2.4501    3.1345"
    static ref LOW_FREQUENCIES_RE: Regex =
        Regex::new(r"(?m)^[ \t]*Low frequencies[ \t]+---(.*)$").unwrap();
}

/// A Gaussian log file held fully in memory.
///
/// The whole file is read once; every extractor then works on the same
/// buffer. Line endings are normalised to `\n`.
#[derive(Debug, Clone)]
pub struct LogFile {
    path: PathBuf,
    content: String,
}

impl LogFile {
    /// Reads a log file from disk.
    pub fn read(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        debug!("Read {} bytes from {}", raw.len(), path.display());
        Ok(Self::from_text(path, &raw))
    }

    /// Wraps already-loaded text, using `name` as the file identity in messages.
    pub fn from_text(name: impl AsRef<Path>, text: &str) -> Self {
        Self {
            path: name.as_ref().to_path_buf(),
            content: text.replace("\r\n", "\n"),
        }
    }

    /// Path (or name) this log was loaded from
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Full text of the log
    pub fn content(&self) -> &str {
        &self.content
    }

    /// See [`extract_atom_count`].
    pub fn atom_count(&self) -> Result<usize> {
        extract_atom_count(&self.content)
    }

    /// See [`extract_temperature`].
    pub fn temperature(&self) -> Result<f64> {
        extract_temperature(&self.content)
    }

    /// See [`extract_all_temperatures`].
    pub fn temperatures(&self) -> Result<Vec<f64>> {
        extract_all_temperatures(&self.content)
    }

    /// See [`extract_isotope_label`].
    pub fn isotope_label(&self) -> Result<IsotopeLabel> {
        extract_isotope_label(&self.content)
    }

    /// See [`extract_frequency_line`].
    pub fn frequencies(&self) -> Result<Vec<f64>> {
        extract_frequency_line(&self.content)
    }

    /// See [`extract_low_frequency_line`].
    pub fn low_frequencies(&self) -> Result<Vec<f64>> {
        extract_low_frequency_line(&self.content)
    }

    /// See [`has_pattern`].
    pub fn has(&self, field: Field) -> bool {
        has_pattern(&self.content, field)
    }
}

/// Returns whether `field` occurs anywhere in `text`.
///
/// Presence is binary: a `true` result means the matching extractor will
/// find at least one occurrence, not that every token in it parses.
pub fn has_pattern(text: &str, field: Field) -> bool {
    match field {
        Field::AtomCount => NATOMS_RE.is_match(text),
        Field::Temperature => TEMPERATURE_RE.is_match(text),
        Field::IsotopeLabel => ISOTOPE_RE.is_match(text),
        Field::Frequencies => FREQUENCIES_RE.is_match(text),
        Field::LowFrequencies => LOW_FREQUENCIES_RE.is_match(text),
        Field::ConvergenceTable => crate::convergence::has_convergence_table(text),
        Field::CoordinateBlock => crate::isotope::has_coordinate_block(text),
    }
}

/// Extracts the number of atoms from the last `NAtoms=` declaration.
pub fn extract_atom_count(text: &str) -> Result<usize> {
    let caps = NATOMS_RE
        .captures_iter(text)
        .last()
        .ok_or(ParseError::NotFound(Field::AtomCount))?;
    parse_token(Field::AtomCount, &caps[1])
}

/// Extracts the temperature in Kelvin.
///
/// When the declaration occurs more than once the last occurrence wins;
/// earlier values are not checked here (see [`extract_all_temperatures`]).
pub fn extract_temperature(text: &str) -> Result<f64> {
    extract_all_temperatures(text)?
        .pop()
        .ok_or(ParseError::NotFound(Field::Temperature))
}

/// Extracts every temperature declaration in file order.
pub fn extract_all_temperatures(text: &str) -> Result<Vec<f64>> {
    let values = TEMPERATURE_RE
        .captures_iter(text)
        .map(|caps| parse_token(Field::Temperature, &caps[1]))
        .collect::<Result<Vec<f64>>>()?;
    if values.is_empty() {
        return Err(ParseError::NotFound(Field::Temperature));
    }
    Ok(values)
}

/// Extracts the `<Element>(Iso=<N>)` annotation; the last occurrence wins.
pub fn extract_isotope_label(text: &str) -> Result<IsotopeLabel> {
    let caps = ISOTOPE_RE
        .captures_iter(text)
        .last()
        .ok_or(ParseError::NotFound(Field::IsotopeLabel))?;
    Ok(IsotopeLabel {
        element: caps[1].to_string(),
        mass_number: parse_token(Field::IsotopeLabel, &caps[2])?,
    })
}

/// Extracts the harmonic frequencies (cm⁻¹).
///
/// Gaussian prints frequencies three per row, one row per normal-mode
/// block, so every `Frequencies --` row in the document is concatenated
/// in file order.
pub fn extract_frequency_line(text: &str) -> Result<Vec<f64>> {
    collect_rows(&FREQUENCIES_RE, text, Field::Frequencies)
}

/// Extracts the values of every `Low frequencies ---` row (cm⁻¹).
pub fn extract_low_frequency_line(text: &str) -> Result<Vec<f64>> {
    collect_rows(&LOW_FREQUENCIES_RE, text, Field::LowFrequencies)
}

fn collect_rows(re: &Regex, text: &str, field: Field) -> Result<Vec<f64>> {
    let mut values = Vec::new();
    let mut rows = 0;
    for caps in re.captures_iter(text) {
        rows += 1;
        for token in caps[1].split_whitespace() {
            values.push(parse_token(field, token)?);
        }
    }
    if rows == 0 {
        return Err(ParseError::NotFound(field));
    }
    debug!("Extracted {} {} values from {} rows", values.len(), field, rows);
    Ok(values)
}

fn parse_token<T: std::str::FromStr>(field: Field, token: &str) -> Result<T> {
    token.parse().map_err(|_| ParseError::InvalidValue {
        field,
        token: token.to_string(),
    })
}
