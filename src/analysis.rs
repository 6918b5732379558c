//! Light/heavy isotopologue comparison.
//!
//! [`analyze_pair`] runs the whole single-pair computation on two loaded
//! logs:
//!
//! 1. Temperatures are extracted from both files and must be identical.
//! 2. Each file is inspected: isotope label, convergence table and low
//!    frequencies are diagnostics; frequencies must be present and their
//!    count must match the atom count for the given [`MoleculeShape`].
//! 3. The primary RPFR is computed over the full frequency sets.
//! 4. The substituted atom's per-mode displacement selects the
//!    isotope-active modes, and a secondary RPFR is computed over those when
//!    both files have the same number of active modes.
//!
//! Fatal conditions come back as [`AnalysisError`]. Everything else is
//! recorded as an [`Advisory`] in the returned [`FractionationReport`], so
//! the caller decides how to present it; nothing here prompts.

use crate::convergence::{self, ConvergenceTable, LowFrequencyReport};
use crate::isotope::{self, ElementTable, IsotopeError};
use crate::parser::{Field, IsotopeLabel, LogFile, ParseError};
use crate::partition::{CalcError, PartitionFunctionEngine, RpfrResult};
use crate::validation::{self, MoleculeShape, ValidationError};
use log::{info, warn};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Which side of the comparison a file is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileRole {
    /// Light isotopologue
    Light,
    /// Heavy isotopologue
    Heavy,
}

impl fmt::Display for FileRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileRole::Light => f.write_str("light"),
            FileRole::Heavy => f.write_str("heavy"),
        }
    }
}

/// Fatal errors of a pair analysis.
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// A required field could not be extracted
    #[error("{role} isotope file {}: {source}", .path.display())]
    Extraction {
        /// Side of the comparison
        role: FileRole,
        /// File the field was missing from
        path: PathBuf,
        /// Underlying extraction error
        #[source]
        source: ParseError,
    },
    /// Extracted frequencies failed the count check
    #[error("{role} isotope file {}: {source}", .path.display())]
    Validation {
        /// Side of the comparison
        role: FileRole,
        /// File that failed the check
        path: PathBuf,
        /// Underlying validation error
        #[source]
        source: ValidationError,
    },
    /// The two files report different temperatures
    #[error("{0}")]
    TemperatureMismatch(#[source] ValidationError),
    /// The RPFR calculation rejected its inputs
    #[error(transparent)]
    Calculation(#[from] CalcError),
    /// The normal-mode coordinate block could not be read
    #[error("{role} isotope file {}: {source}", .path.display())]
    Coordinates {
        /// Side of the comparison
        role: FileRole,
        /// File with the unreadable coordinate block
        path: PathBuf,
        /// Underlying aggregation error
        #[source]
        source: IsotopeError,
    },
}

/// Type alias for analysis results
pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Non-fatal findings, reported alongside the results.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Advisory {
    /// No fully converged optimization table; the geometry may be unoptimised
    ConvergenceTableMissing {
        /// Side of the comparison
        role: FileRole,
    },
    /// No `Low frequencies ---` rows
    LowFrequenciesMissing {
        /// Side of the comparison
        role: FileRole,
    },
    /// Some low frequencies lie outside the threshold
    LowFrequencyThresholdExceeded {
        /// Side of the comparison
        role: FileRole,
        /// Offending values (cm⁻¹)
        values: Vec<f64>,
        /// Threshold used (cm⁻¹)
        threshold: f64,
    },
    /// No `<Element>(Iso=<N>)` annotation
    IsotopeLabelMissing {
        /// Side of the comparison
        role: FileRole,
    },
    /// The two files label different elements
    IsotopeElementMismatch {
        /// Element of the light file
        light: String,
        /// Element of the heavy file
        heavy: String,
    },
    /// A file declares several different temperatures; the last one is used
    InconsistentTemperatures {
        /// Side of the comparison
        role: FileRole,
        /// Every declared value, in file order
        values: Vec<f64>,
    },
    /// An optional field is present but its value could not be read
    FieldUnreadable {
        /// Side of the comparison
        role: FileRole,
        /// Field being extracted
        field: Field,
        /// Extraction error
        error: String,
    },
}

impl fmt::Display for Advisory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Advisory::ConvergenceTableMissing { role } => write!(
                f,
                "Convergence table for the optimised {} molecule not found; frequencies may be from an unoptimised structure",
                role
            ),
            Advisory::LowFrequenciesMissing { role } => {
                write!(f, "Low frequencies not found in the {} isotope file", role)
            }
            Advisory::LowFrequencyThresholdExceeded {
                role,
                values,
                threshold,
            } => write!(
                f,
                "Some {} isotope low frequencies exceed the +/- {} cm-1 threshold ({:?}); treat results with caution",
                role, threshold, values
            ),
            Advisory::IsotopeLabelMissing { role } => {
                write!(f, "No isotope information in the {} isotope file", role)
            }
            Advisory::IsotopeElementMismatch { light, heavy } => write!(
                f,
                "Light and heavy files label different elements ({} vs {})",
                light, heavy
            ),
            Advisory::InconsistentTemperatures { role, values } => write!(
                f,
                "The {} isotope file declares several temperatures {:?}; the last one is used",
                role, values
            ),
            Advisory::FieldUnreadable { role, field, error } => write!(
                f,
                "The {} isotope file has an unreadable {} entry ({}); it is ignored",
                role, field, error
            ),
        }
    }
}

/// Everything extracted from one isotopologue log.
#[derive(Debug, Clone, Serialize)]
pub struct IsotopologueData {
    /// Side of the comparison
    pub role: FileRole,
    /// Source file
    pub path: PathBuf,
    /// Number of atoms
    pub atom_count: usize,
    /// Temperature (K)
    pub temperature: f64,
    /// Isotope annotation, if present
    pub isotope: Option<IsotopeLabel>,
    /// Last fully converged optimization table, if present
    pub convergence: Option<ConvergenceTable>,
    /// Low frequencies, if present
    pub low_frequencies: Option<LowFrequencyReport>,
    /// Harmonic frequencies (cm⁻¹), count-checked
    pub frequencies: Vec<f64>,
}

/// Per-mode motion of the substituted atom in both isotopologues.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IsotopeMotion {
    /// Element symbol used for the lookup
    pub element: String,
    /// Its atomic number
    pub atomic_number: u32,
    /// Rounded displacement sums, one per light frequency
    pub light_displacements: Vec<f64>,
    /// Rounded displacement sums, one per heavy frequency
    pub heavy_displacements: Vec<f64>,
    /// Light frequencies with non-zero displacement
    pub light_active: Vec<f64>,
    /// Heavy frequencies with non-zero displacement
    pub heavy_active: Vec<f64>,
}

/// Why the secondary RPFR was not computed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    /// Neither file carries an isotope annotation
    NoIsotopeLabel,
    /// The labelled element is not in the atomic number table
    UnknownElement {
        /// Symbol that failed the lookup
        element: String,
    },
    /// A file has no normal-mode coordinate block
    CoordinatesMissing {
        /// Side of the comparison
        role: FileRole,
    },
    /// The coordinate block and the frequency list of a file are out of step
    StructuralMismatch {
        /// Side of the comparison
        role: FileRole,
        /// Number of aggregated displacement values
        coordinates: usize,
        /// Number of extracted frequencies
        frequencies: usize,
    },
    /// Light and heavy files have different numbers of active modes
    ActiveCountMismatch {
        /// Active light modes
        light: usize,
        /// Active heavy modes
        heavy: usize,
    },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NoIsotopeLabel => {
                f.write_str("no isotope information in either file")
            }
            SkipReason::UnknownElement { element } => write!(
                f,
                "element '{}' is not in the atomic number table; add it under [elements] in the configuration",
                element
            ),
            SkipReason::CoordinatesMissing { role } => write!(
                f,
                "no normal-mode coordinates in the {} isotope file",
                role
            ),
            SkipReason::StructuralMismatch {
                role,
                coordinates,
                frequencies,
            } => write!(
                f,
                "the {} isotope file's coordinate block yields {} modes but {} frequencies were extracted",
                role, coordinates, frequencies
            ),
            SkipReason::ActiveCountMismatch { light, heavy } => write!(
                f,
                "the number of light ({}) and heavy ({}) frequencies that contain isotope movement are not the same",
                light, heavy
            ),
        }
    }
}

/// Outcome of the RPFR over isotope-active modes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SecondaryRpfr {
    /// Calculated over the active subsets
    Computed {
        /// Displacements and active subsets
        motion: IsotopeMotion,
        /// RPFR over the active subsets
        result: RpfrResult,
    },
    /// Not calculated
    Skipped {
        /// Displacements, when they were obtained
        motion: Option<IsotopeMotion>,
        /// Why the calculation was skipped
        reason: SkipReason,
    },
}

impl SecondaryRpfr {
    /// The secondary result, if computed.
    pub fn result(&self) -> Option<&RpfrResult> {
        match self {
            SecondaryRpfr::Computed { result, .. } => Some(result),
            SecondaryRpfr::Skipped { .. } => None,
        }
    }

    /// The displacement data, if obtained.
    pub fn motion(&self) -> Option<&IsotopeMotion> {
        match self {
            SecondaryRpfr::Computed { motion, .. } => Some(motion),
            SecondaryRpfr::Skipped { motion, .. } => motion.as_ref(),
        }
    }
}

/// Complete result of one light/heavy comparison.
#[derive(Debug, Clone, Serialize)]
pub struct FractionationReport {
    /// Geometry class used for the count checks
    pub shape: MoleculeShape,
    /// Common temperature (K)
    pub temperature: f64,
    /// Light isotopologue data
    pub light: IsotopologueData,
    /// Heavy isotopologue data
    pub heavy: IsotopologueData,
    /// RPFR over all frequencies
    pub primary: RpfrResult,
    /// RPFR over isotope-active frequencies
    pub secondary: SecondaryRpfr,
    /// Non-fatal findings
    pub advisories: Vec<Advisory>,
}

/// Tunables of a pair analysis.
#[derive(Debug, Clone, Copy)]
pub struct AnalysisOptions {
    /// Symmetric low-frequency bound (cm⁻¹)
    pub low_frequency_threshold: f64,
    /// Partition function engine
    pub engine: PartitionFunctionEngine,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            low_frequency_threshold: convergence::DEFAULT_LOW_FREQUENCY_THRESHOLD,
            engine: PartitionFunctionEngine::default(),
        }
    }
}

/// Compares a light and a heavy isotopologue log.
///
/// # Errors
///
/// Missing temperature, atom count or frequencies, a frequency count
/// mismatch, differing temperatures and unequal frequency set lengths are
/// fatal. A coordinate block out of step with its frequencies only skips
/// the secondary RPFR.
pub fn analyze_pair(
    light: &LogFile,
    heavy: &LogFile,
    shape: MoleculeShape,
    options: &AnalysisOptions,
    elements: &dyn ElementTable,
) -> Result<FractionationReport> {
    let mut advisories = Vec::new();

    info!("Checking the temperature values in both log files are equal");
    let light_temperature = file_temperature(light, FileRole::Light, &mut advisories)?;
    let heavy_temperature = file_temperature(heavy, FileRole::Heavy, &mut advisories)?;
    let temperature = validation::validate_temperatures(light_temperature, heavy_temperature)
        .map_err(AnalysisError::TemperatureMismatch)?;
    info!("Temperature: {} K", temperature);

    let light_data = inspect_file(
        light,
        FileRole::Light,
        temperature,
        shape,
        options,
        &mut advisories,
    )?;
    let heavy_data = inspect_file(
        heavy,
        FileRole::Heavy,
        temperature,
        shape,
        options,
        &mut advisories,
    )?;

    if let (Some(l), Some(h)) = (&light_data.isotope, &heavy_data.isotope) {
        if l.element != h.element {
            let advisory = Advisory::IsotopeElementMismatch {
                light: l.element.clone(),
                heavy: h.element.clone(),
            };
            warn!("{}", advisory);
            advisories.push(advisory);
        }
    }

    info!("Calculating the reduced partition function ratio");
    let primary = options.engine.reduced_partition_function_ratio(
        &light_data.frequencies,
        &heavy_data.frequencies,
        temperature,
    )?;
    info!("1000*lnB: {}", primary.beta);

    let secondary = secondary_rpfr(
        (light, &light_data),
        (heavy, &heavy_data),
        temperature,
        options,
        elements,
    )?;
    match &secondary {
        SecondaryRpfr::Computed { result, .. } => {
            info!("1000*lnB over isotope-active frequencies: {}", result.beta)
        }
        SecondaryRpfr::Skipped { reason, .. } => {
            warn!("Secondary RPFR not calculated: {}", reason)
        }
    }

    Ok(FractionationReport {
        shape,
        temperature,
        light: light_data,
        heavy: heavy_data,
        primary,
        secondary,
        advisories,
    })
}

fn file_temperature(
    log: &LogFile,
    role: FileRole,
    advisories: &mut Vec<Advisory>,
) -> Result<f64> {
    let extraction = |source: ParseError| AnalysisError::Extraction {
        role,
        path: log.path().to_path_buf(),
        source,
    };
    let values = log.temperatures().map_err(extraction)?;
    let last = values
        .last()
        .copied()
        .ok_or_else(|| extraction(ParseError::NotFound(Field::Temperature)))?;
    if values.iter().any(|&t| t != last) {
        let advisory = Advisory::InconsistentTemperatures { role, values };
        warn!("{}", advisory);
        advisories.push(advisory);
    }
    Ok(last)
}

fn inspect_file(
    log: &LogFile,
    role: FileRole,
    temperature: f64,
    shape: MoleculeShape,
    options: &AnalysisOptions,
    advisories: &mut Vec<Advisory>,
) -> Result<IsotopologueData> {
    let path = log.path().to_path_buf();
    info!("The {} isotope log file is: {}", role, path.display());
    let mut advise = |advisory: Advisory| {
        warn!("{}", advisory);
        advisories.push(advisory);
    };

    let isotope = optional_field(
        log.isotope_label(),
        Advisory::IsotopeLabelMissing { role },
        role,
        Field::IsotopeLabel,
        &mut advise,
    );
    if let Some(label) = &isotope {
        info!("Isotope: {}", label);
    }

    let convergence = optional_field(
        convergence::extract_convergence_table(log.content()),
        Advisory::ConvergenceTableMissing { role },
        role,
        Field::ConvergenceTable,
        &mut advise,
    );

    let low_frequencies = optional_field(
        convergence::extract_low_frequencies(log.content(), options.low_frequency_threshold),
        Advisory::LowFrequenciesMissing { role },
        role,
        Field::LowFrequencies,
        &mut advise,
    );
    if let Some(report) = low_frequencies.as_ref().filter(|r| r.exceeds_threshold()) {
        advise(Advisory::LowFrequencyThresholdExceeded {
            role,
            values: report.out_of_range.clone(),
            threshold: report.threshold,
        });
    }

    let extraction = |source: ParseError| AnalysisError::Extraction {
        role,
        path: path.clone(),
        source,
    };
    let atom_count = log.atom_count().map_err(extraction)?;
    let frequencies = log.frequencies().map_err(extraction)?;
    validation::validate_frequency_count(&frequencies, atom_count, shape).map_err(|source| {
        AnalysisError::Validation {
            role,
            path: path.clone(),
            source,
        }
    })?;

    Ok(IsotopologueData {
        role,
        path,
        atom_count,
        temperature,
        isotope,
        convergence,
        low_frequencies,
        frequencies,
    })
}

/// Absent or unreadable optional fields become advisories.
fn optional_field<T>(
    result: std::result::Result<T, ParseError>,
    missing: Advisory,
    role: FileRole,
    field: Field,
    advise: &mut impl FnMut(Advisory),
) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(ParseError::NotFound(_)) => {
            advise(missing);
            None
        }
        Err(e) => {
            advise(Advisory::FieldUnreadable {
                role,
                field,
                error: e.to_string(),
            });
            None
        }
    }
}

fn secondary_rpfr(
    (light, light_data): (&LogFile, &IsotopologueData),
    (heavy, heavy_data): (&LogFile, &IsotopologueData),
    temperature: f64,
    options: &AnalysisOptions,
    elements: &dyn ElementTable,
) -> Result<SecondaryRpfr> {
    let skipped = |reason| SecondaryRpfr::Skipped {
        motion: None,
        reason,
    };

    let Some(label) = heavy_data.isotope.as_ref().or(light_data.isotope.as_ref()) else {
        return Ok(skipped(SkipReason::NoIsotopeLabel));
    };
    let atomic_number = match isotope::atomic_number(elements, &label.element) {
        Ok(z) => z,
        Err(_) => {
            return Ok(skipped(SkipReason::UnknownElement {
                element: label.element.clone(),
            }))
        }
    };
    info!("The atomic number of {} is {}", label.element, atomic_number);

    let (light_displacements, light_active) =
        match file_motion(light, light_data, atomic_number)? {
            Ok(motion) => motion,
            Err(reason) => return Ok(skipped(reason)),
        };
    let (heavy_displacements, heavy_active) =
        match file_motion(heavy, heavy_data, atomic_number)? {
            Ok(motion) => motion,
            Err(reason) => return Ok(skipped(reason)),
        };

    info!(
        "Frequencies with light isotope movement: {}, with heavy isotope movement: {}",
        light_active.len(),
        heavy_active.len()
    );
    let motion = IsotopeMotion {
        element: label.element.clone(),
        atomic_number,
        light_displacements,
        heavy_displacements,
        light_active,
        heavy_active,
    };

    if motion.light_active.len() != motion.heavy_active.len() {
        let reason = SkipReason::ActiveCountMismatch {
            light: motion.light_active.len(),
            heavy: motion.heavy_active.len(),
        };
        return Ok(SecondaryRpfr::Skipped {
            motion: Some(motion),
            reason,
        });
    }

    let result = options.engine.reduced_partition_function_ratio(
        &motion.light_active,
        &motion.heavy_active,
        temperature,
    )?;
    Ok(SecondaryRpfr::Computed { motion, result })
}

/// Displacement sums and active frequencies of one file, or the reason the
/// secondary RPFR cannot use it.
fn file_motion(
    log: &LogFile,
    data: &IsotopologueData,
    atomic_number: u32,
) -> Result<std::result::Result<(Vec<f64>, Vec<f64>), SkipReason>> {
    let role = data.role;
    let unreadable = |source: IsotopeError| AnalysisError::Coordinates {
        role,
        path: data.path.clone(),
        source,
    };
    let sums = match isotope::aggregate_displacement(log.content(), atomic_number) {
        Ok(sums) => sums,
        Err(IsotopeError::Parse(ParseError::NotFound(Field::CoordinateBlock))) => {
            return Ok(Err(SkipReason::CoordinatesMissing { role }))
        }
        Err(e) => return Err(unreadable(e)),
    };
    match isotope::select_active(&data.frequencies, &sums) {
        Ok(active) => Ok(Ok((sums, active))),
        Err(IsotopeError::StructuralMismatch {
            coordinates,
            frequencies,
        }) => Ok(Err(SkipReason::StructuralMismatch {
            role,
            coordinates,
            frequencies,
        })),
        Err(e) => Err(unreadable(e)),
    }
}
