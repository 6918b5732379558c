//! Optimization diagnostics: convergence tables and low frequencies.
//!
//! A Gaussian optimization prints an item table after every step:
//!
//! ```text
//!          Item               Value     Threshold  Converged?
//!  Maximum Force            0.000012     0.000450     YES
//!  RMS     Force            0.000004     0.000300     YES
//!  Maximum Displacement     0.000231     0.001800     YES
//!  RMS     Displacement     0.000118     0.001200     YES
//! ```
//!
//! Only tables whose four rows all read `YES` count, and the last such table
//! in the file is the one reported, since later optimization attempts
//! supersede earlier ones. Nothing here is fatal: an unconverged or missing
//! table is advisory and the caller decides whether to proceed.

use crate::parser::{self, Field, ParseError};
use lazy_static::lazy_static;
use log::{info, warn};
use regex::Regex;
use serde::Serialize;
use std::fmt;

/// Symmetric bound (cm⁻¹) for the residual low frequencies.
pub const DEFAULT_LOW_FREQUENCY_THRESHOLD: f64 = 30.0;

lazy_static! {
    // Header line containing "Converged?" followed by four lines carrying YES
    static ref CONVERGED_TABLE_RE: Regex =
        Regex::new(r"(?m)^.*?Converged\?(?:\n.*YES){4}").unwrap();

    // " Maximum Force            0.000012     0.000450     YES"
    static ref ROW_RE: Regex = Regex::new(
        r"(?m)^[ \t]*(Maximum|RMS)\b.*?\b(Force|Displacement)\b.*?\b(YES|NO)[ \t]*$"
    )
    .unwrap();
}

/// Statistic reported by a convergence row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Metric {
    /// `Maximum`
    Maximum,
    /// `RMS`
    Rms,
}

/// Quantity reported by a convergence row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Quantity {
    /// `Force`
    Force,
    /// `Displacement`
    Displacement,
}

/// One classified row of a convergence table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConvergenceRow {
    /// Maximum or RMS
    pub metric: Metric,
    /// Force or displacement
    pub quantity: Quantity,
    /// Whether the row reads `YES`
    pub converged: bool,
}

impl fmt::Display for ConvergenceRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let metric = match self.metric {
            Metric::Maximum => "Maximum",
            Metric::Rms => "RMS",
        };
        let quantity = match self.quantity {
            Quantity::Force => "Force",
            Quantity::Displacement => "Displacement",
        };
        let status = if self.converged { "converged" } else { "did not converge" };
        write!(f, "{} {} {}", metric, quantity, status)
    }
}

/// The last fully converged item table of a log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConvergenceTable {
    /// Raw text of the table, header included
    pub text: String,
    /// Classified rows
    pub rows: Vec<ConvergenceRow>,
}

impl ConvergenceTable {
    /// Rows that read `YES`.
    pub fn confirmations(&self) -> impl Iterator<Item = &ConvergenceRow> {
        self.rows.iter().filter(|row| row.converged)
    }

    /// True when every classified row converged.
    pub fn is_fully_converged(&self) -> bool {
        !self.rows.is_empty() && self.rows.iter().all(|row| row.converged)
    }
}

/// Returns whether `text` contains a fully converged item table.
pub fn has_convergence_table(text: &str) -> bool {
    CONVERGED_TABLE_RE.is_match(text)
}

/// Extracts the last fully converged item table in `text`.
///
/// # Errors
///
/// [`ParseError::NotFound`] when no header is followed by four `YES` rows.
pub fn extract_convergence_table(text: &str) -> Result<ConvergenceTable, ParseError> {
    let block = CONVERGED_TABLE_RE
        .find_iter(text)
        .last()
        .ok_or(ParseError::NotFound(Field::ConvergenceTable))?
        .as_str();
    let table = ConvergenceTable {
        text: block.to_string(),
        rows: classify_rows(block),
    };
    for row in table.confirmations() {
        info!("{}.", row);
    }
    Ok(table)
}

/// Classifies the `(Maximum|RMS) x (Force|Displacement)` rows of a block.
pub fn classify_rows(block: &str) -> Vec<ConvergenceRow> {
    ROW_RE
        .captures_iter(block)
        .map(|caps| ConvergenceRow {
            metric: if &caps[1] == "Maximum" {
                Metric::Maximum
            } else {
                Metric::Rms
            },
            quantity: if &caps[2] == "Force" {
                Quantity::Force
            } else {
                Quantity::Displacement
            },
            converged: &caps[3] == "YES",
        })
        .collect()
}

/// Low frequencies of a log and how they compare to the threshold.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LowFrequencyReport {
    /// Every value from the `Low frequencies ---` rows, in file order
    pub values: Vec<f64>,
    /// Symmetric bound used for the check (cm⁻¹)
    pub threshold: f64,
    /// Values outside `[-threshold, threshold]`
    pub out_of_range: Vec<f64>,
}

impl LowFrequencyReport {
    /// Builds the report for `values` against `threshold`.
    pub fn new(values: Vec<f64>, threshold: f64) -> Self {
        let out_of_range = values
            .iter()
            .copied()
            .filter(|v| v.abs() > threshold)
            .collect();
        Self {
            values,
            threshold,
            out_of_range,
        }
    }

    /// True when any value lies outside `[-threshold, threshold]`.
    pub fn exceeds_threshold(&self) -> bool {
        !self.out_of_range.is_empty()
    }
}

/// Extracts the low frequencies and checks them against `threshold`.
///
/// A breach is logged as a warning and recorded in the report; it never
/// turns into an error.
pub fn extract_low_frequencies(
    text: &str,
    threshold: f64,
) -> Result<LowFrequencyReport, ParseError> {
    let report = LowFrequencyReport::new(parser::extract_low_frequency_line(text)?, threshold);
    info!("Low frequencies: {:?}", report.values);
    if report.exceeds_threshold() {
        warn!(
            "Some low frequencies exceed the +/- {} cm-1 threshold: {:?}. Treat results with caution.",
            threshold, report.out_of_range
        );
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    const OPT_LOG: &str = "\
         Item               Value     Threshold  Converged?
 Maximum Force            0.002100     0.000450     NO
 RMS     Force            0.000800     0.000300     NO
 Maximum Displacement     0.012000     0.001800     NO
 RMS     Displacement     0.006000     0.001200     NO
 Predicted change in Energy=-2.113447D-06
         Item               Value     Threshold  Converged?
 Maximum Force            0.000040     0.000450     YES
 RMS     Force            0.000020     0.000300     YES
 Maximum Displacement     0.000900     0.001800     YES
 RMS     Displacement     0.000500     0.001200     YES
 Predicted change in Energy=-1.000000D-09
 Optimization completed.
         Item               Value     Threshold  Converged?
 Maximum Force            0.000011     0.000450     YES
 RMS     Force            0.000005     0.000300     YES
 Maximum Displacement     0.000123     0.001800     YES
 RMS     Displacement     0.000056     0.001200     YES
 Predicted change in Energy=-4.000000D-11
";

    #[test]
    fn test_last_converged_table_is_selected() {
        let table = extract_convergence_table(OPT_LOG).unwrap();
        assert!(table.text.contains("0.000011"));
        assert!(!table.text.contains("0.000040"));
        assert!(!table.text.contains("Predicted"));
        assert_eq!(table.rows.len(), 4);
        assert!(table.is_fully_converged());
        assert_eq!(table.confirmations().count(), 4);
    }

    #[test]
    fn test_unconverged_table_is_not_found() {
        let text = OPT_LOG.split(" Predicted").next().unwrap();
        assert!(!has_convergence_table(text));
        assert!(matches!(
            extract_convergence_table(text),
            Err(ParseError::NotFound(Field::ConvergenceTable))
        ));
    }

    #[test]
    fn test_classify_rows_records_no() {
        let rows = classify_rows(
            " Maximum Force            0.000011     0.000450     YES\n RMS     Displacement     0.006000     0.001200     NO \n",
        );
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].metric, Metric::Maximum);
        assert_eq!(rows[0].quantity, Quantity::Force);
        assert!(rows[0].converged);
        assert_eq!(rows[1].metric, Metric::Rms);
        assert_eq!(rows[1].quantity, Quantity::Displacement);
        assert!(!rows[1].converged);
        assert_eq!(rows[1].to_string(), "RMS Displacement did not converge");
    }

    #[test]
    fn test_low_frequencies_within_threshold() {
        let report = extract_low_frequencies(
            " Low frequencies ---   -1.9329   -0.0010    0.0007    2.4501\n",
            DEFAULT_LOW_FREQUENCY_THRESHOLD,
        )
        .unwrap();
        assert_eq!(report.values.len(), 4);
        assert!(!report.exceeds_threshold());
    }

    #[test]
    fn test_low_frequency_above_threshold_is_advisory() {
        let report = extract_low_frequencies(
            " Low frequencies ---   -1.9329   -0.0010    0.0007   35.0000\n",
            DEFAULT_LOW_FREQUENCY_THRESHOLD,
        )
        .unwrap();
        assert!(report.exceeds_threshold());
        assert_eq!(report.out_of_range, vec![35.0]);
    }

    #[test]
    fn test_low_frequency_below_negative_threshold() {
        let report = LowFrequencyReport::new(vec![-30.0, -30.5, 30.0], 30.0);
        assert_eq!(report.out_of_range, vec![-30.5]);
    }
}
