//! Text and JSON output of a [`FractionationReport`].
//!
//! The text report always lists the input files, isotope information,
//! temperature, primary and secondary RPFR and the frequency lists. The
//! full variant adds the RPFR components, per-mode displacement sums,
//! convergence tables, low frequencies and advisories.

use crate::analysis::{FractionationReport, IsotopologueData, SecondaryRpfr};
use crate::partition::RpfrResult;
use log::info;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Default output file of the `run` command.
pub const DEFAULT_REPORT_PATH: &str = "isofrac_report.txt";

/// Error type for report writing.
#[derive(Error, Debug)]
pub enum ReportError {
    /// Output file or directory could not be written
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Report could not be serialized
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Type alias for report results
pub type Result<T> = std::result::Result<T, ReportError>;

/// How much of the report to write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Detail {
    /// Inputs, temperature, RPFR values and frequency lists
    #[default]
    Basic,
    /// Everything extracted
    Full,
}

impl Detail {
    /// `Full` when `full` is set.
    pub fn from_full_flag(full: bool) -> Self {
        if full {
            Detail::Full
        } else {
            Detail::Basic
        }
    }
}

/// Renders the text report.
pub fn render_text(report: &FractionationReport, detail: Detail) -> String {
    let full = detail == Detail::Full;
    let mut out = String::new();
    let light = &report.light;
    let heavy = &report.heavy;

    out.push_str("This output file is generated from the following files:\n");
    let _ = writeln!(out, "Light isotope file: {}", light.path.display());
    let _ = writeln!(out, "Heavy isotope file: {}", heavy.path.display());
    let _ = writeln!(out, "Molecule: {}\n", report.shape);

    match (&light.isotope, &heavy.isotope) {
        (Some(l), Some(h)) => {
            let _ = writeln!(out, "{} isotopes extracted: {} and {}", h.element, l, h);
        }
        (Some(label), None) | (None, Some(label)) => {
            let _ = writeln!(out, "{} isotope extracted: {}", label.element, label);
        }
        (None, None) => out.push_str("No isotope information extracted\n"),
    }
    let _ = writeln!(out, "Temperature = {} K\n", report.temperature);

    let _ = writeln!(
        out,
        "Number of frequencies used in calculating FULL RPFR: {}",
        light.frequencies.len()
    );
    write_rpfr(&mut out, &report.primary, full);
    out.push('\n');

    match &report.secondary {
        SecondaryRpfr::Computed { motion, result } => {
            let _ = writeln!(
                out,
                "Number of frequencies used in calculating secondary RPFR: {}",
                motion.light_active.len()
            );
            out.push_str(
                "This is the RPFR calculated using the frequencies that contain isotope movement.\n",
            );
            write_rpfr(&mut out, result, full);
        }
        SecondaryRpfr::Skipped { reason, .. } => {
            let _ = writeln!(out, "Secondary RPFR not calculated: {}", reason);
        }
    }

    let motion = report.secondary.motion();
    write_frequencies(
        &mut out,
        light,
        motion.map(|m| (&m.light_displacements, &m.light_active)),
        full,
    );
    write_frequencies(
        &mut out,
        heavy,
        motion.map(|m| (&m.heavy_displacements, &m.heavy_active)),
        full,
    );

    if full {
        for data in [light, heavy] {
            write_diagnostics(&mut out, data);
        }
        if !report.advisories.is_empty() {
            out.push_str("\nAdvisories:\n");
            for advisory in &report.advisories {
                let _ = writeln!(out, "- {}", advisory);
            }
        }
    }
    out
}

fn write_rpfr(out: &mut String, result: &RpfrResult, full: bool) {
    if full {
        let _ = writeln!(out, "ln(v/v'): {}", result.ratio_sum);
        let _ = writeln!(out, "lnQ: {}", result.ln_q_heavy);
        let _ = writeln!(out, "lnQ': {}", result.ln_q_light);
    }
    let _ = writeln!(out, "RPFR: {}", result.beta);
}

fn write_frequencies(
    out: &mut String,
    data: &IsotopologueData,
    motion: Option<(&Vec<f64>, &Vec<f64>)>,
    full: bool,
) {
    let role = capitalize(&data.role.to_string());
    let _ = writeln!(out, "\n{} isotope frequencies:\n{:?}", role, data.frequencies);
    if let Some((sums, active)) = motion {
        if full {
            let _ = writeln!(
                out,
                "\nIsotope contributions - estimation of isotope movement in each frequency:\n{:?}",
                sums
            );
        }
        let _ = writeln!(
            out,
            "\nThe frequencies that contain movement of the isotope:\n{:?}",
            active
        );
    }
}

fn write_diagnostics(out: &mut String, data: &IsotopologueData) {
    let role = capitalize(&data.role.to_string());
    match &data.convergence {
        Some(table) => {
            let _ = writeln!(out, "\n{} isotope convergence table:\n{}", role, table.text);
        }
        None => {
            let _ = writeln!(out, "\n{} isotope convergence table: not found", role);
        }
    }
    match &data.low_frequencies {
        Some(low) => {
            let _ = writeln!(out, "\nLow frequencies: {:?}", low.values);
        }
        None => out.push_str("\nLow frequencies: not found\n"),
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Short summary printed to the terminal after a run.
pub fn render_summary(report: &FractionationReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Temperature: {} K", report.temperature);
    let _ = writeln!(
        out,
        "1000 ln(beta), all {} frequencies: {:.6}",
        report.light.frequencies.len(),
        report.primary.beta
    );
    match &report.secondary {
        SecondaryRpfr::Computed { motion, result } => {
            let _ = writeln!(
                out,
                "1000 ln(beta), {} isotope-active frequencies: {:.6}",
                motion.light_active.len(),
                result.beta
            );
        }
        SecondaryRpfr::Skipped { reason, .. } => {
            let _ = writeln!(out, "Secondary RPFR not calculated: {}", reason);
        }
    }
    if !report.advisories.is_empty() {
        let _ = writeln!(out, "{} advisories:", report.advisories.len());
        for advisory in &report.advisories {
            let _ = writeln!(out, "  - {}", advisory);
        }
    }
    out
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            info!("Creating output directory {}", parent.display());
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Writes the text report to `path`, creating missing parent directories.
pub fn write_text(report: &FractionationReport, path: &Path, detail: Detail) -> Result<()> {
    ensure_parent(path)?;
    fs::write(path, render_text(report, detail))?;
    info!("Report written to {}", path.display());
    Ok(())
}

/// Writes the whole report as pretty-printed JSON.
pub fn write_json(report: &FractionationReport, path: &Path) -> Result<()> {
    ensure_parent(path)?;
    let json = serde_json::to_string_pretty(report)?;
    fs::write(path, json)?;
    info!("JSON report written to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{analyze_pair, AnalysisOptions};
    use crate::isotope::PeriodicTable;
    use crate::parser::LogFile;
    use crate::validation::MoleculeShape;
    use tempfile::TempDir;

    const LIGHT: &str = "\
 NAtoms=      2
 Cu(Iso=63)  0  0.0 0.0 0.0
 Low frequencies ---   -0.1000    0.2000
 Frequencies --    300.0000
  Atom  AN      X      Y      Z
     1  29     0.40   0.00   0.00
     2   9    -0.90   0.00   0.00
 Temperature   298.150 Kelvin.
";

    fn sample_report() -> FractionationReport {
        let light = LogFile::from_text("light/cuf_63.log", LIGHT);
        let heavy = LogFile::from_text(
            "heavy/cuf_65.log",
            &LIGHT
                .replace("Cu(Iso=63)", "Cu(Iso=65)")
                .replace("300.0000", "298.5000"),
        );
        analyze_pair(
            &light,
            &heavy,
            MoleculeShape::Linear,
            &AnalysisOptions::default(),
            &PeriodicTable,
        )
        .unwrap()
    }

    #[test]
    fn test_basic_text_report() {
        let text = render_text(&sample_report(), Detail::Basic);
        assert!(text.contains("Light isotope file: light/cuf_63.log"));
        assert!(text.contains("Cu isotopes extracted: 63Cu and 65Cu"));
        assert!(text.contains("Temperature = 298.15 K"));
        assert!(text.contains("Number of frequencies used in calculating FULL RPFR: 1"));
        assert!(text.contains("Number of frequencies used in calculating secondary RPFR: 1"));
        assert!(text.contains("[300.0]"));
        assert!(!text.contains("lnQ:"));
        assert!(!text.contains("Isotope contributions"));
    }

    #[test]
    fn test_full_text_report() {
        let text = render_text(&sample_report(), Detail::Full);
        assert!(text.contains("ln(v/v'):"));
        assert!(text.contains("lnQ':"));
        assert!(text.contains("Isotope contributions"));
        assert!(text.contains("[0.4]"));
        assert!(text.contains("Low frequencies: [-0.1, 0.2]"));
        assert!(text.contains("Light isotope convergence table: not found"));
        assert!(text.contains("Advisories:"));
    }

    #[test]
    fn test_write_creates_directories() {
        let temp = TempDir::new().unwrap();
        let report = sample_report();
        let text_path = temp.path().join("out/nested/report.txt");
        let json_path = temp.path().join("json/report.json");
        write_text(&report, &text_path, Detail::Basic).unwrap();
        write_json(&report, &json_path).unwrap();

        assert!(fs::read_to_string(&text_path).unwrap().contains("RPFR:"));
        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&json_path).unwrap()).unwrap();
        assert_eq!(value["temperature"], 298.15);
        assert_eq!(value["secondary"]["status"], "computed");
        assert_eq!(value["light"]["isotope"]["mass_number"], 63);
    }

    #[test]
    fn test_summary_lists_advisories() {
        let summary = render_summary(&sample_report());
        assert!(summary.contains("1000 ln(beta), all 1 frequencies"));
        assert!(summary.contains("2 advisories:"));
    }
}
