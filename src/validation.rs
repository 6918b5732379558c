//! Consistency gates for extracted isotopologue data.
//!
//! Two checks decide whether extracted data can be trusted at all:
//!
//! - **Frequency count**: a molecule of N atoms has `3N-6` vibrational modes
//!   (`3N-5` if linear). Any other count means the extraction picked up too
//!   many or too few `Frequencies --` rows.
//! - **Temperature agreement**: the two isotopologues of a comparison must
//!   carry exactly the same temperature.
//!
//! Both failures are fatal and carry a suggestion for the user.

use log::info;
use serde::Serialize;
use std::fmt;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validation failure with user guidance.
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// Error category for programmatic handling
    pub category: ErrorCategory,
    /// Human-readable error message
    pub message: String,
    /// Optional suggestion for fixing the issue
    pub suggestion: Option<String>,
}

/// Categories of validation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Extracted frequency count disagrees with the geometry-derived count
    CountMismatch,
    /// The two isotopologue logs report different temperatures
    TemperatureMismatch,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(suggestion) = &self.suggestion {
            write!(f, "\n\nSuggestion: {}", suggestion)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

/// Molecular geometry class, which fixes the number of vibrational modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MoleculeShape {
    /// Linear molecule: `3N-5` modes
    Linear,
    /// Non-linear molecule: `3N-6` modes
    NonLinear,
}

impl MoleculeShape {
    /// Maps a "is linear" flag onto a shape.
    pub fn from_linear_flag(linear: bool) -> Self {
        if linear {
            MoleculeShape::Linear
        } else {
            MoleculeShape::NonLinear
        }
    }
}

impl fmt::Display for MoleculeShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MoleculeShape::Linear => f.write_str("linear"),
            MoleculeShape::NonLinear => f.write_str("non-linear"),
        }
    }
}

/// Returns the number of vibrational modes for `atom_count` atoms.
///
/// Saturates at zero for atom counts too small to vibrate.
///
/// # Examples
///
/// ```
/// use isofrac::validation::{expected_frequency_count, MoleculeShape};
///
/// assert_eq!(expected_frequency_count(5, MoleculeShape::NonLinear), 9);
/// assert_eq!(expected_frequency_count(3, MoleculeShape::Linear), 4);
/// ```
pub fn expected_frequency_count(atom_count: usize, shape: MoleculeShape) -> usize {
    let removed = match shape {
        MoleculeShape::Linear => 5,
        MoleculeShape::NonLinear => 6,
    };
    (3 * atom_count).saturating_sub(removed)
}

/// Checks that `frequencies` holds exactly the expected number of modes.
///
/// # Errors
///
/// Returns a [`ErrorCategory::CountMismatch`] error when the counts differ;
/// downstream calculations must not use the frequencies in that case.
pub fn validate_frequency_count(
    frequencies: &[f64],
    atom_count: usize,
    shape: MoleculeShape,
) -> ValidationResult<usize> {
    let expected = expected_frequency_count(atom_count, shape);
    if frequencies.len() != expected {
        return Err(ValidationError {
            category: ErrorCategory::CountMismatch,
            message: format!(
                "The number of extracted frequencies ({}) is not equal to the expected number ({}) for a {} molecule of {} atoms",
                frequencies.len(),
                expected,
                shape,
                atom_count
            ),
            suggestion: Some(
                "Check the log file for repeated or truncated frequency sections, and check the linear flag"
                    .to_string(),
            ),
        });
    }
    info!("{} frequencies extracted ({} expected)", frequencies.len(), expected);
    Ok(expected)
}

/// Checks that both isotopologues were computed at the same temperature.
///
/// Equality is exact: both values come from the same printed field and any
/// difference means the logs are inconsistent.
pub fn validate_temperatures(light: f64, heavy: f64) -> ValidationResult<f64> {
    if light != heavy {
        return Err(ValidationError {
            category: ErrorCategory::TemperatureMismatch,
            message: format!(
                "The temperatures are not the same (light: {} K, heavy: {} K)",
                light, heavy
            ),
            suggestion: Some(
                "Rerun the frequency calculations at a common temperature".to_string(),
            ),
        });
    }
    Ok(light)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expected_count_non_linear() {
        assert_eq!(expected_frequency_count(3, MoleculeShape::NonLinear), 3);
        assert_eq!(expected_frequency_count(5, MoleculeShape::NonLinear), 9);
    }

    #[test]
    fn test_expected_count_linear() {
        assert_eq!(expected_frequency_count(2, MoleculeShape::Linear), 1);
        assert_eq!(expected_frequency_count(3, MoleculeShape::Linear), 4);
    }

    #[test]
    fn test_expected_count_saturates() {
        assert_eq!(expected_frequency_count(1, MoleculeShape::NonLinear), 0);
        assert_eq!(expected_frequency_count(0, MoleculeShape::Linear), 0);
    }

    #[test]
    fn test_count_mismatch_for_any_other_length() {
        for n in 0..12 {
            let freqs = vec![100.0; n];
            let result = validate_frequency_count(&freqs, 5, MoleculeShape::NonLinear);
            if n == 9 {
                assert_eq!(result.unwrap(), 9);
            } else {
                assert_eq!(result.unwrap_err().category, ErrorCategory::CountMismatch);
            }
        }
    }

    #[test]
    fn test_count_mismatch_message() {
        let err = validate_frequency_count(&[1.0, 2.0], 3, MoleculeShape::Linear).unwrap_err();
        assert!(err.message.contains("(2)"));
        assert!(err.message.contains("(4)"));
        assert!(err.to_string().contains("Suggestion:"));
    }

    #[test]
    fn test_temperatures() {
        assert_eq!(validate_temperatures(298.15, 298.15).unwrap(), 298.15);
        let err = validate_temperatures(298.15, 298.16).unwrap_err();
        assert_eq!(err.category, ErrorCategory::TemperatureMismatch);
    }

    #[test]
    fn test_shape_from_flag() {
        assert_eq!(MoleculeShape::from_linear_flag(true), MoleculeShape::Linear);
        assert_eq!(MoleculeShape::from_linear_flag(false), MoleculeShape::NonLinear);
    }
}
